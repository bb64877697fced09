use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::{NewTicket, ServiceTicket, Stamp, TicketMutation};
use crate::shared::errors::EngineError;
use crate::shared::phone::normalize_phone;
use crate::shared::schema::service_tickets;
use crate::shared::utils::DbPool;

/// Durable home of [`ServiceTicket`] rows.
///
/// `apply` is the single mutation path: it takes an allow-listed partial
/// update and is responsible for per-ticket mutual exclusion and for the
/// first-write-wins timestamp semantics.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn insert(&self, ticket: NewTicket) -> Result<ServiceTicket, EngineError>;
    async fn get(&self, id: Uuid) -> Result<Option<ServiceTicket>, EngineError>;
    async fn list(&self) -> Result<Vec<ServiceTicket>, EngineError>;
    async fn find_most_recent_by_phone(
        &self,
        phone_normalized: &str,
    ) -> Result<Option<ServiceTicket>, EngineError>;
    async fn apply(&self, id: Uuid, mutation: TicketMutation) -> Result<ServiceTicket, EngineError>;
}

#[derive(Debug, Insertable)]
#[diesel(table_name = service_tickets)]
struct InsertTicket {
    id: Uuid,
    customer_name: String,
    customer_phone: String,
    phone_normalized: String,
    customer_email: Option<String>,
    language: String,
    device_type: String,
    device_model: Option<String>,
    issue_description: String,
    additional_notes: Option<String>,
    status: String,
    is_hidden: bool,
    created_at: DateTime<Utc>,
}

pub struct PgTicketStore {
    pool: DbPool,
}

impl PgTicketStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn insert(&self, ticket: NewTicket) -> Result<ServiceTicket, EngineError> {
        let mut conn = self.pool.get()?;
        let row = InsertTicket {
            id: Uuid::new_v4(),
            phone_normalized: normalize_phone(&ticket.customer_phone),
            customer_name: ticket.customer_name,
            customer_phone: ticket.customer_phone,
            customer_email: ticket.customer_email,
            language: ticket.language,
            device_type: ticket.device_type,
            device_model: ticket.device_model,
            issue_description: ticket.issue_description,
            additional_notes: ticket.additional_notes,
            status: ticket.status.as_str().to_string(),
            is_hidden: false,
            created_at: Utc::now(),
        };

        // ticket_number is left to the sequence so numbers stay strictly
        // increasing and are never reused, whatever this process does.
        let inserted: ServiceTicket = diesel::insert_into(service_tickets::table)
            .values(&row)
            .get_result(&mut conn)?;
        Ok(inserted)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ServiceTicket>, EngineError> {
        let mut conn = self.pool.get()?;
        let ticket = service_tickets::table
            .find(id)
            .first(&mut conn)
            .optional()?;
        Ok(ticket)
    }

    async fn list(&self) -> Result<Vec<ServiceTicket>, EngineError> {
        let mut conn = self.pool.get()?;
        let tickets = service_tickets::table
            .order(service_tickets::created_at.desc())
            .load(&mut conn)?;
        Ok(tickets)
    }

    async fn find_most_recent_by_phone(
        &self,
        phone_normalized: &str,
    ) -> Result<Option<ServiceTicket>, EngineError> {
        let mut conn = self.pool.get()?;
        let ticket = service_tickets::table
            .filter(service_tickets::phone_normalized.eq(phone_normalized))
            .order(service_tickets::created_at.desc())
            .then_order_by(service_tickets::ticket_number.desc())
            .first(&mut conn)
            .optional()?;
        Ok(ticket)
    }

    async fn apply(&self, id: Uuid, mutation: TicketMutation) -> Result<ServiceTicket, EngineError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<ServiceTicket, EngineError, _>(|conn| {
            // Row lock: concurrent transitions on the same ticket serialize
            // here instead of interleaving their field writes.
            let _current: ServiceTicket = service_tickets::table
                .find(id)
                .for_update()
                .first(conn)
                .optional()?
                .ok_or(EngineError::NotFound)?;

            if let Some(status) = mutation.status {
                diesel::update(service_tickets::table.find(id))
                    .set(service_tickets::status.eq(status.as_str()))
                    .execute(conn)?;
            }
            if let Some(approved) = mutation.cost_proposal_approved {
                diesel::update(service_tickets::table.find(id))
                    .set(service_tickets::cost_proposal_approved.eq(Some(approved)))
                    .execute(conn)?;
            }
            if let Some(diagnosis) = &mutation.diagnosis {
                diesel::update(service_tickets::table.find(id))
                    .set(service_tickets::diagnosis.eq(diagnosis.as_deref()))
                    .execute(conn)?;
            }
            if let Some(summary) = &mutation.work_done_summary {
                diesel::update(service_tickets::table.find(id))
                    .set(service_tickets::work_done_summary.eq(summary))
                    .execute(conn)?;
            }
            if let Some(cost) = &mutation.final_cost {
                diesel::update(service_tickets::table.find(id))
                    .set(service_tickets::final_cost.eq(cost))
                    .execute(conn)?;
            }
            if let Some(notes) = &mutation.internal_notes {
                diesel::update(service_tickets::table.find(id))
                    .set(service_tickets::internal_notes.eq(notes))
                    .execute(conn)?;
            }
            if let Some(notes) = &mutation.additional_notes {
                diesel::update(service_tickets::table.find(id))
                    .set(service_tickets::additional_notes.eq(notes))
                    .execute(conn)?;
            }
            if let Some(model) = &mutation.device_model {
                diesel::update(service_tickets::table.find(id))
                    .set(service_tickets::device_model.eq(model))
                    .execute(conn)?;
            }
            if let Some(phone) = &mutation.customer_phone {
                diesel::update(service_tickets::table.find(id))
                    .set((
                        service_tickets::customer_phone.eq(phone),
                        service_tickets::phone_normalized.eq(normalize_phone(phone)),
                    ))
                    .execute(conn)?;
            }
            if let Some(language) = &mutation.language {
                diesel::update(service_tickets::table.find(id))
                    .set(service_tickets::language.eq(language))
                    .execute(conn)?;
            }
            if let Some(hidden) = mutation.is_hidden {
                diesel::update(service_tickets::table.find(id))
                    .set(service_tickets::is_hidden.eq(hidden))
                    .execute(conn)?;
            }

            // First-write-wins timestamps: the IS NULL guard lives in the
            // UPDATE itself, not in application conditionals.
            if let Some(ts) = mutation.completed_at {
                diesel::update(
                    service_tickets::table
                        .find(id)
                        .filter(service_tickets::completed_at.is_null()),
                )
                .set(service_tickets::completed_at.eq(ts))
                .execute(conn)?;
            }
            if let Some(ts) = mutation.picked_up_at {
                diesel::update(
                    service_tickets::table
                        .find(id)
                        .filter(service_tickets::picked_up_at.is_null()),
                )
                .set(service_tickets::picked_up_at.eq(ts))
                .execute(conn)?;
            }
            if let Some(ts) = mutation.closed_at {
                diesel::update(
                    service_tickets::table
                        .find(id)
                        .filter(service_tickets::closed_at.is_null()),
                )
                .set(service_tickets::closed_at.eq(ts))
                .execute(conn)?;
            }
            match mutation.customer_notified_at {
                Some(Stamp::IfUnset(ts)) => {
                    diesel::update(
                        service_tickets::table
                            .find(id)
                            .filter(service_tickets::customer_notified_at.is_null()),
                    )
                    .set(service_tickets::customer_notified_at.eq(ts))
                    .execute(conn)?;
                }
                Some(Stamp::Refresh(ts)) => {
                    diesel::update(service_tickets::table.find(id))
                        .set(service_tickets::customer_notified_at.eq(ts))
                        .execute(conn)?;
                }
                None => {}
            }

            Ok(service_tickets::table.find(id).first(conn)?)
        })
    }
}
