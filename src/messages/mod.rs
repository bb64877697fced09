use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::errors::EngineError;
use crate::shared::schema::message_log;
use crate::shared::state::AppState;
use crate::shared::utils::DbPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

/// One sent or received message. Rows are written once and never touched
/// again; unmatched inbound messages carry no ticket id.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = message_log)]
pub struct MessageEntry {
    pub id: Uuid,
    pub ticket_id: Option<Uuid>,
    pub channel: String,
    pub direction: String,
    pub from_address: String,
    pub to_address: String,
    pub subject: Option<String>,
    pub body: String,
    pub provider: String,
    pub provider_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Append-only audit trail. There is deliberately no update or delete.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(&self, entry: MessageEntry) -> Result<(), EngineError>;
    async fn list_for_ticket(&self, ticket_id: Uuid) -> Result<Vec<MessageEntry>, EngineError>;
}

pub struct PgMessageStore {
    pool: DbPool,
}

impl PgMessageStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn append(&self, entry: MessageEntry) -> Result<(), EngineError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(message_log::table)
            .values(&entry)
            .execute(&mut conn)?;
        Ok(())
    }

    async fn list_for_ticket(&self, ticket_id: Uuid) -> Result<Vec<MessageEntry>, EngineError> {
        let mut conn = self.pool.get()?;
        let entries = message_log::table
            .filter(message_log::ticket_id.eq(ticket_id))
            .order(message_log::created_at.asc())
            .load(&mut conn)?;
        Ok(entries)
    }
}

pub async fn list_ticket_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MessageEntry>>, EngineError> {
    state.tickets.get(id).await?.ok_or(EngineError::NotFound)?;
    let entries = state.messages.list_for_ticket(id).await?;
    Ok(Json(entries))
}

pub fn configure_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/tickets/:id/messages", get(list_ticket_messages))
}
