//! Notification dispatcher: the outbound write path.
//!
//! Ordering matters here. The transition is planned before anything leaves
//! the building, the provider send happens before any mutation, and the
//! message-log append lands before the status transition so a successfully
//! sent message is never un-recorded. A store failure after a successful
//! send is surfaced as a distinct partial failure for staff to reconcile.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::channels::translate::Translator;
use crate::channels::{Channel, EmailSender, SmsSender};
use crate::messages::{Direction, MessageEntry, MessageStore};
use crate::shared::errors::EngineError;
use crate::shared::state::AppState;
use crate::templates::{self, NotificationKind};
use crate::tickets::lifecycle::{self, LifecycleEvent};
use crate::tickets::store::TicketStore;
use crate::tickets::ServiceTicket;

pub struct Dispatcher {
    tickets: Arc<dyn TicketStore>,
    messages: Arc<dyn MessageStore>,
    sms: Option<Arc<dyn SmsSender>>,
    email: Option<Arc<dyn EmailSender>>,
    translator: Translator,
    sms_from: String,
    email_from: String,
}

#[derive(Debug)]
pub struct NotifyOutcome {
    pub ticket: ServiceTicket,
    pub provider_id: Option<String>,
}

impl Dispatcher {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        messages: Arc<dyn MessageStore>,
        sms: Option<Arc<dyn SmsSender>>,
        email: Option<Arc<dyn EmailSender>>,
        translator: Translator,
        sms_from: String,
        email_from: String,
    ) -> Self {
        Self {
            tickets,
            messages,
            sms,
            email,
            translator,
            sms_from,
            email_from,
        }
    }

    /// Sends exactly one outbound message and applies at most one ticket
    /// mutation.
    pub async fn notify(
        &self,
        ticket_id: Uuid,
        kind: NotificationKind,
        channel: Channel,
    ) -> Result<NotifyOutcome, EngineError> {
        let ticket = self
            .tickets
            .get(ticket_id)
            .await?
            .ok_or(EngineError::NotFound)?;

        let event = match kind {
            NotificationKind::CostProposal => LifecycleEvent::CostProposalSent,
            NotificationKind::RepairReady => LifecycleEvent::RepairReadySent,
        };
        let now = Utc::now();
        // Validates the transition (closed tickets included) before the
        // provider is touched.
        let mutation = lifecycle::plan(&ticket, event, now)?;

        let rendered = templates::resolve(&ticket, kind, &ticket.language);

        let (to_address, from_address, subject, body, provider, provider_id) = match channel {
            Channel::Sms => {
                let to = ticket.customer_phone.trim().to_string();
                if to.is_empty() {
                    return Err(EngineError::MissingContact(channel));
                }
                let sender = self.sms.as_ref().ok_or_else(|| {
                    EngineError::SendFailed("no SMS provider configured".to_string())
                })?;
                let body = self.translator.translate(&rendered.body, &ticket.language).await;
                let sid = sender
                    .send_sms(&to, &body)
                    .await
                    .map_err(|e| EngineError::SendFailed(e.to_string()))?;
                (to, self.sms_from.clone(), None, body, "twilio", Some(sid))
            }
            Channel::Email => {
                let Some(to) = ticket
                    .customer_email
                    .as_deref()
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(str::to_string)
                else {
                    return Err(EngineError::MissingContact(channel));
                };
                let sender = self.email.as_ref().ok_or_else(|| {
                    EngineError::SendFailed("no email provider configured".to_string())
                })?;
                let subject = self
                    .translator
                    .translate(&rendered.subject, &ticket.language)
                    .await;
                let body = self.translator.translate(&rendered.body, &ticket.language).await;
                sender
                    .send_email(&to, &subject, &body)
                    .await
                    .map_err(|e| EngineError::SendFailed(e.to_string()))?;
                (to, self.email_from.clone(), Some(subject), body, "smtp", None)
            }
        };

        let entry = MessageEntry {
            id: Uuid::new_v4(),
            ticket_id: Some(ticket.id),
            channel: channel.as_str().to_string(),
            direction: Direction::Outbound.as_str().to_string(),
            from_address,
            to_address,
            subject,
            body,
            provider: provider.to_string(),
            provider_id: provider_id.clone(),
            created_at: now,
        };
        if let Err(e) = self.messages.append(entry).await {
            warn!("ticket {}: message sent but log append failed: {e}", ticket.ticket_number);
            return Err(EngineError::PartialFailure(format!(
                "message log write failed: {e}"
            )));
        }

        let updated = match self.tickets.apply(ticket.id, mutation).await {
            Ok(updated) => updated,
            Err(e) => {
                warn!(
                    "ticket {}: message sent but status transition failed: {e}",
                    ticket.ticket_number
                );
                return Err(EngineError::PartialFailure(format!(
                    "status transition failed: {e}"
                )));
            }
        };

        info!(
            "ticket {}: sent {:?} notification over {channel}",
            updated.ticket_number, kind
        );
        Ok(NotifyOutcome {
            ticket: updated,
            provider_id,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct NotifyRequest {
    pub kind: NotificationKind,
    pub channel: Channel,
}

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub ok: bool,
    pub status: String,
    pub provider_id: Option<String>,
}

pub async fn notify_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<NotifyRequest>,
) -> Result<Json<NotifyResponse>, EngineError> {
    let outcome = state.dispatcher.notify(id, req.kind, req.channel).await?;
    Ok(Json(NotifyResponse {
        ok: true,
        status: outcome.ticket.status.clone(),
        provider_id: outcome.provider_id,
    }))
}

pub fn configure_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/tickets/:id/notify", post(notify_ticket))
}
