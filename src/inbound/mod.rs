//! Inbound SMS webhook processing.
//!
//! Every inbound message is logged, matched or not. Only recognized
//! approval keywords mutate ticket state; everything else is audit trail.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::post;
use axum::{Form, Json, Router};
use chrono::Utc;
use log::info;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::channels::Channel;
use crate::messages::{Direction, MessageEntry, MessageStore};
use crate::shared::errors::EngineError;
use crate::shared::phone::normalize_phone;
use crate::shared::state::AppState;
use crate::shared::utils::timing_safe_eq;
use crate::tickets::lifecycle::{self, LifecycleEvent};
use crate::tickets::store::TicketStore;

const AFFIRMATIVE_KEYWORDS: &[&str] = &["ja", "yes", "j", "y"];
const NEGATIVE_KEYWORDS: &[&str] = &["nej", "no", "n"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyIntent {
    Affirmative,
    Negative,
}

/// Classifies a reply body after trimming and lower-casing. Anything that
/// is not an exact keyword is treated as free text.
pub fn parse_reply(body: &str) -> Option<ReplyIntent> {
    let normalized = body.trim().to_lowercase();
    if AFFIRMATIVE_KEYWORDS.contains(&normalized.as_str()) {
        Some(ReplyIntent::Affirmative)
    } else if NEGATIVE_KEYWORDS.contains(&normalized.as_str()) {
        Some(ReplyIntent::Negative)
    } else {
        None
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum InboundOutcome {
    /// No ticket matched the sender; the message was logged anyway.
    Unmatched,
    /// A ticket matched but the body was free text or the ticket is closed.
    Logged(Uuid),
    Approved(Uuid),
    Declined(Uuid),
}

pub struct InboundProcessor {
    tickets: Arc<dyn TicketStore>,
    messages: Arc<dyn MessageStore>,
    webhook_secret: Option<String>,
    shop_number: String,
}

impl InboundProcessor {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        messages: Arc<dyn MessageStore>,
        webhook_secret: Option<String>,
        shop_number: String,
    ) -> Self {
        Self {
            tickets,
            messages,
            webhook_secret,
            shop_number,
        }
    }

    pub async fn handle_inbound(
        &self,
        from: &str,
        body: &str,
        provider_id: Option<String>,
        secret: Option<&str>,
    ) -> Result<InboundOutcome, EngineError> {
        if let Some(expected) = &self.webhook_secret {
            if !timing_safe_eq(secret.unwrap_or(""), expected) {
                return Err(EngineError::Unauthorized);
            }
        }

        let from = from.trim();
        let body = body.trim();
        if from.is_empty() || body.is_empty() {
            return Err(EngineError::BadRequest(
                "missing sender or message body".to_string(),
            ));
        }

        let key = normalize_phone(from);
        let ticket = self.tickets.find_most_recent_by_phone(&key).await?;

        self.messages
            .append(MessageEntry {
                id: Uuid::new_v4(),
                ticket_id: ticket.as_ref().map(|t| t.id),
                channel: Channel::Sms.as_str().to_string(),
                direction: Direction::Inbound.as_str().to_string(),
                from_address: from.to_string(),
                to_address: self.shop_number.clone(),
                subject: None,
                body: body.to_string(),
                provider: "twilio".to_string(),
                provider_id,
                created_at: Utc::now(),
            })
            .await?;

        let Some(ticket) = ticket else {
            info!("inbound SMS from {key} matched no ticket");
            return Ok(InboundOutcome::Unmatched);
        };

        let event = match parse_reply(body) {
            Some(ReplyIntent::Affirmative) => LifecycleEvent::Approved,
            Some(ReplyIntent::Negative) => LifecycleEvent::Declined,
            None => return Ok(InboundOutcome::Logged(ticket.id)),
        };

        match lifecycle::plan(&ticket, event, Utc::now()) {
            Ok(mutation) => {
                self.tickets.apply(ticket.id, mutation).await?;
                info!(
                    "ticket {}: inbound reply applied {event:?}",
                    ticket.ticket_number
                );
                Ok(match event {
                    LifecycleEvent::Approved => InboundOutcome::Approved(ticket.id),
                    _ => InboundOutcome::Declined(ticket.id),
                })
            }
            // A keyword reply to a terminal ticket stays audit-only.
            Err(EngineError::InvalidTransition(_)) => {
                info!(
                    "ticket {}: inbound reply ignored, ticket is closed",
                    ticket.ticket_number
                );
                Ok(InboundOutcome::Logged(ticket.id))
            }
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InboundSmsForm {
    #[serde(alias = "sender", alias = "From")]
    pub from: Option<String>,
    #[serde(alias = "text", alias = "Body")]
    pub message: Option<String>,
    #[serde(alias = "MessageSid")]
    pub message_sid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InboundQuery {
    pub secret: Option<String>,
}

pub async fn receive_sms(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InboundQuery>,
    Form(form): Form<InboundSmsForm>,
) -> Result<Json<Value>, EngineError> {
    state
        .inbound
        .handle_inbound(
            form.from.as_deref().unwrap_or(""),
            form.message.as_deref().unwrap_or(""),
            form.message_sid,
            query.secret.as_deref(),
        )
        .await?;
    Ok(Json(json!({ "ok": true })))
}

pub fn configure_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/webhooks/sms", post(receive_sms))
}
