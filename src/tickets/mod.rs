pub mod lifecycle;
pub mod store;

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::errors::EngineError;
use crate::shared::phone::normalize_phone;
use crate::shared::state::AppState;

/// One customer repair case. Status values are stored under their Swedish,
/// human-facing names; see [`TicketStatus`].
#[derive(Debug, Clone, Serialize, Deserialize, Queryable)]
pub struct ServiceTicket {
    pub id: Uuid,
    pub ticket_number: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub phone_normalized: String,
    pub customer_email: Option<String>,
    pub language: String,
    pub device_type: String,
    pub device_model: Option<String>,
    pub issue_description: String,
    pub additional_notes: Option<String>,
    pub status: String,
    pub cost_proposal_approved: Option<bool>,
    pub diagnosis: Option<String>,
    pub final_cost: Option<String>,
    pub work_done_summary: Option<String>,
    pub internal_notes: Option<String>,
    pub is_hidden: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub customer_notified_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    New,
    InProgress,
    AwaitingCustomer,
    CostApproved,
    Ready,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "Nytt",
            Self::InProgress => "Pågående",
            Self::AwaitingCustomer => "Väntar på kund",
            Self::CostApproved => "Kostnadsförslag godkänt",
            Self::Ready => "Färdig",
            Self::Closed => "Avslutad",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Nytt" => Some(Self::New),
            "Pågående" => Some(Self::InProgress),
            "Väntar på kund" => Some(Self::AwaitingCustomer),
            "Kostnadsförslag godkänt" => Some(Self::CostApproved),
            "Färdig" => Some(Self::Ready),
            "Avslutad" => Some(Self::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write instruction for `customer_notified_at`, which is first-write-wins
/// on the cost-proposal path but refreshed on every repair-ready send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stamp {
    IfUnset(DateTime<Utc>),
    Refresh(DateTime<Utc>),
}

/// A partial update against one ticket, restricted to the fields staff and
/// the lifecycle are allowed to touch. `completed_at`, `picked_up_at` and
/// `closed_at` are applied only when currently null.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TicketMutation {
    pub status: Option<TicketStatus>,
    pub cost_proposal_approved: Option<bool>,
    pub diagnosis: Option<Option<String>>,
    pub work_done_summary: Option<String>,
    pub final_cost: Option<String>,
    pub internal_notes: Option<String>,
    pub additional_notes: Option<String>,
    pub device_model: Option<String>,
    pub customer_phone: Option<String>,
    pub language: Option<String>,
    pub is_hidden: Option<bool>,
    pub completed_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub customer_notified_at: Option<Stamp>,
}

impl TicketMutation {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the mutation to an in-memory ticket with the same semantics
    /// the SQL store implements: first-write-wins timestamps and re-derived
    /// phone key on phone edits.
    pub fn apply_to(&self, ticket: &mut ServiceTicket) {
        if let Some(status) = self.status {
            ticket.status = status.as_str().to_string();
        }
        if let Some(approved) = self.cost_proposal_approved {
            ticket.cost_proposal_approved = Some(approved);
        }
        if let Some(diagnosis) = &self.diagnosis {
            ticket.diagnosis = diagnosis.clone();
        }
        if let Some(summary) = &self.work_done_summary {
            ticket.work_done_summary = Some(summary.clone());
        }
        if let Some(cost) = &self.final_cost {
            ticket.final_cost = Some(cost.clone());
        }
        if let Some(notes) = &self.internal_notes {
            ticket.internal_notes = Some(notes.clone());
        }
        if let Some(notes) = &self.additional_notes {
            ticket.additional_notes = Some(notes.clone());
        }
        if let Some(model) = &self.device_model {
            ticket.device_model = Some(model.clone());
        }
        if let Some(phone) = &self.customer_phone {
            ticket.customer_phone = phone.clone();
            ticket.phone_normalized = normalize_phone(phone);
        }
        if let Some(language) = &self.language {
            ticket.language = language.clone();
        }
        if let Some(hidden) = self.is_hidden {
            ticket.is_hidden = hidden;
        }
        if let Some(ts) = self.completed_at {
            if ticket.completed_at.is_none() {
                ticket.completed_at = Some(ts);
            }
        }
        if let Some(ts) = self.picked_up_at {
            if ticket.picked_up_at.is_none() {
                ticket.picked_up_at = Some(ts);
            }
        }
        if let Some(ts) = self.closed_at {
            if ticket.closed_at.is_none() {
                ticket.closed_at = Some(ts);
            }
        }
        match self.customer_notified_at {
            Some(Stamp::IfUnset(ts)) => {
                if ticket.customer_notified_at.is_none() {
                    ticket.customer_notified_at = Some(ts);
                }
            }
            Some(Stamp::Refresh(ts)) => ticket.customer_notified_at = Some(ts),
            None => {}
        }
    }
}

/// Input for ticket creation; `phone_normalized`, id, number and timestamps
/// are derived by the store.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub language: String,
    pub device_type: String,
    pub device_model: Option<String>,
    pub issue_description: String,
    pub additional_notes: Option<String>,
    pub status: TicketStatus,
}

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub device_type: Option<String>,
    pub device_model: Option<String>,
    pub issue_description: Option<String>,
    pub additional_notes: Option<String>,
    pub language: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTicketRequest {
    pub status: Option<String>,
    pub cost_proposal_approved: Option<bool>,
    #[serde(default)]
    pub diagnosis: Option<Option<String>>,
    pub work_done_summary: Option<String>,
    pub final_cost: Option<String>,
    pub internal_notes: Option<String>,
    pub additional_notes: Option<String>,
    pub device_model: Option<String>,
    pub customer_phone: Option<String>,
    pub language: Option<String>,
    pub is_hidden: Option<bool>,
}

impl UpdateTicketRequest {
    fn into_mutation(self) -> Result<TicketMutation, EngineError> {
        let status = match self.status {
            Some(raw) => Some(TicketStatus::parse(&raw).ok_or_else(|| {
                EngineError::BadRequest(format!("unknown ticket status: {raw}"))
            })?),
            None => None,
        };
        Ok(TicketMutation {
            status,
            cost_proposal_approved: self.cost_proposal_approved,
            diagnosis: self.diagnosis,
            work_done_summary: self.work_done_summary,
            final_cost: self.final_cost,
            internal_notes: self.internal_notes,
            additional_notes: self.additional_notes,
            device_model: self.device_model,
            customer_phone: self.customer_phone,
            language: self.language,
            is_hidden: self.is_hidden,
            ..TicketMutation::default()
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SetApprovalRequest {
    pub approved: bool,
}

pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ServiceTicket>>, EngineError> {
    let tickets = state.tickets.list().await?;
    Ok(Json(tickets))
}

pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<ServiceTicket>), EngineError> {
    let required = |value: Option<String>| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let (Some(customer_name), Some(customer_phone), Some(device_type), Some(issue_description)) = (
        required(req.customer_name),
        required(req.customer_phone),
        required(req.device_type),
        required(req.issue_description),
    ) else {
        return Err(EngineError::BadRequest(
            "missing required fields".to_string(),
        ));
    };

    let status = match req.status.as_deref() {
        Some(raw) => TicketStatus::parse(raw)
            .ok_or_else(|| EngineError::BadRequest(format!("unknown ticket status: {raw}")))?,
        None => TicketStatus::New,
    };

    let ticket = state
        .tickets
        .insert(NewTicket {
            customer_name,
            customer_phone,
            customer_email: req.customer_email.filter(|e| !e.trim().is_empty()),
            language: req.language.unwrap_or_else(|| "sv".to_string()),
            device_type,
            device_model: req.device_model.filter(|m| !m.trim().is_empty()),
            issue_description,
            additional_notes: req.additional_notes.filter(|n| !n.trim().is_empty()),
            status,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ServiceTicket>, EngineError> {
    let ticket = state.tickets.get(id).await?.ok_or(EngineError::NotFound)?;
    Ok(Json(ticket))
}

pub async fn update_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTicketRequest>,
) -> Result<Json<ServiceTicket>, EngineError> {
    let mutation = req.into_mutation()?;
    if mutation.is_empty() {
        return Err(EngineError::BadRequest(
            "no valid fields to update".to_string(),
        ));
    }

    // Raw status edits must still respect the terminal-ticket invariant.
    if mutation.status.is_some() {
        let current = state.tickets.get(id).await?.ok_or(EngineError::NotFound)?;
        if current.closed_at.is_some() {
            return Err(EngineError::InvalidTransition(
                "ticket is closed".to_string(),
            ));
        }
    }

    let ticket = state.tickets.apply(id, mutation).await?;
    Ok(Json(ticket))
}

pub async fn set_approval(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetApprovalRequest>,
) -> Result<Json<ServiceTicket>, EngineError> {
    let ticket = state.tickets.get(id).await?.ok_or(EngineError::NotFound)?;
    let event = if req.approved {
        lifecycle::LifecycleEvent::Approved
    } else {
        lifecycle::LifecycleEvent::Declined
    };
    let mutation = lifecycle::plan(&ticket, event, Utc::now())?;
    let ticket = state.tickets.apply(id, mutation).await?;
    Ok(Json(ticket))
}

pub async fn finalize_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ServiceTicket>, EngineError> {
    let ticket = state.tickets.get(id).await?.ok_or(EngineError::NotFound)?;
    let mutation = lifecycle::plan(&ticket, lifecycle::LifecycleEvent::Finalized, Utc::now())?;
    let ticket = state.tickets.apply(id, mutation).await?;
    Ok(Json(ticket))
}

pub fn configure_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tickets", get(list_tickets).post(create_ticket))
        .route("/api/tickets/:id", get(get_ticket).patch(update_ticket))
        .route("/api/tickets/:id/approval", put(set_approval))
        .route("/api/tickets/:id/finalize", put(finalize_ticket))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::sample_ticket;

    #[test]
    fn test_status_round_trip() {
        for status in [
            TicketStatus::New,
            TicketStatus::InProgress,
            TicketStatus::AwaitingCustomer,
            TicketStatus::CostApproved,
            TicketStatus::Ready,
            TicketStatus::Closed,
        ] {
            assert_eq!(TicketStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TicketStatus::parse("open"), None);
    }

    #[test]
    fn test_first_write_wins_timestamps() {
        let mut ticket = sample_ticket();
        let first = Utc::now();
        let mutation = TicketMutation {
            completed_at: Some(first),
            ..TicketMutation::default()
        };
        mutation.apply_to(&mut ticket);
        assert_eq!(ticket.completed_at, Some(first));

        let later = first + chrono::Duration::hours(1);
        let mutation = TicketMutation {
            completed_at: Some(later),
            ..TicketMutation::default()
        };
        mutation.apply_to(&mut ticket);
        assert_eq!(ticket.completed_at, Some(first));
    }

    #[test]
    fn test_notified_at_refresh_overwrites() {
        let mut ticket = sample_ticket();
        let first = Utc::now();
        TicketMutation {
            customer_notified_at: Some(Stamp::IfUnset(first)),
            ..TicketMutation::default()
        }
        .apply_to(&mut ticket);

        let later = first + chrono::Duration::hours(2);
        TicketMutation {
            customer_notified_at: Some(Stamp::IfUnset(later)),
            ..TicketMutation::default()
        }
        .apply_to(&mut ticket);
        assert_eq!(ticket.customer_notified_at, Some(first));

        TicketMutation {
            customer_notified_at: Some(Stamp::Refresh(later)),
            ..TicketMutation::default()
        }
        .apply_to(&mut ticket);
        assert_eq!(ticket.customer_notified_at, Some(later));
    }

    #[test]
    fn test_phone_edit_rederives_matching_key() {
        let mut ticket = sample_ticket();
        TicketMutation {
            customer_phone: Some("+46 70-123 45 67".to_string()),
            ..TicketMutation::default()
        }
        .apply_to(&mut ticket);
        assert_eq!(ticket.phone_normalized, "+46701234567");
    }
}
