//! In-memory engine collaborators.
//!
//! These mirror the store contracts closely enough to exercise the
//! lifecycle, dispatcher and inbound processor without a database: ticket
//! numbers come from a monotonic counter, mutations share the production
//! first-write-wins semantics via [`TicketMutation::apply_to`].

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::channels::translate::Translator;
use crate::channels::{EmailSender, SendError, SmsSender};
use crate::config::{AppConfig, ServerConfig};
use crate::inbound::InboundProcessor;
use crate::messages::{MessageEntry, MessageStore};
use crate::notify::Dispatcher;
use crate::shared::errors::EngineError;
use crate::shared::phone::normalize_phone;
use crate::shared::state::AppState;
use crate::tickets::store::TicketStore;
use crate::tickets::{NewTicket, ServiceTicket, TicketMutation, TicketStatus};

#[derive(Default)]
pub struct MemoryTicketStore {
    tickets: Mutex<Vec<ServiceTicket>>,
    next_number: AtomicI64,
    fail_applies: AtomicBool,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `apply` fail, for partial-failure paths.
    pub fn poison_applies(&self) {
        self.fail_applies.store(true, Ordering::SeqCst);
    }

    pub async fn seed(&self, ticket: NewTicket) -> ServiceTicket {
        self.insert(ticket)
            .await
            .expect("memory insert cannot fail")
    }

    pub async fn close(&self, id: Uuid) {
        let mut tickets = self.tickets.lock().expect("ticket store lock");
        if let Some(ticket) = tickets.iter_mut().find(|t| t.id == id) {
            ticket.status = TicketStatus::Closed.as_str().to_string();
            ticket.closed_at = Some(Utc::now());
        }
    }

    pub async fn set_diagnosis(&self, id: Uuid, diagnosis: &str) {
        let mut tickets = self.tickets.lock().expect("ticket store lock");
        if let Some(ticket) = tickets.iter_mut().find(|t| t.id == id) {
            ticket.diagnosis = Some(diagnosis.to_string());
        }
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn insert(&self, ticket: NewTicket) -> Result<ServiceTicket, EngineError> {
        let mut tickets = self.tickets.lock().expect("ticket store lock");
        let ticket = ServiceTicket {
            id: Uuid::new_v4(),
            ticket_number: self.next_number.fetch_add(1, Ordering::SeqCst) + 1,
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
            cost_proposal_approved: None,
            diagnosis: None,
            final_cost: None,
            work_done_summary: None,
            internal_notes: None,
            is_hidden: false,
            created_at: Utc::now(),
            completed_at: None,
            customer_notified_at: None,
            picked_up_at: None,
            closed_at: None,
        };
        tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ServiceTicket>, EngineError> {
        let tickets = self.tickets.lock().expect("ticket store lock");
        Ok(tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<ServiceTicket>, EngineError> {
        let tickets = self.tickets.lock().expect("ticket store lock");
        let mut all = tickets.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn find_most_recent_by_phone(
        &self,
        phone_normalized: &str,
    ) -> Result<Option<ServiceTicket>, EngineError> {
        let tickets = self.tickets.lock().expect("ticket store lock");
        Ok(tickets
            .iter()
            .filter(|t| t.phone_normalized == phone_normalized)
            .max_by_key(|t| (t.created_at, t.ticket_number))
            .cloned())
    }

    async fn apply(&self, id: Uuid, mutation: TicketMutation) -> Result<ServiceTicket, EngineError> {
        if self.fail_applies.load(Ordering::SeqCst) {
            return Err(EngineError::Store("injected store failure".to_string()));
        }
        let mut tickets = self.tickets.lock().expect("ticket store lock");
        let ticket = tickets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(EngineError::NotFound)?;
        mutation.apply_to(ticket);
        Ok(ticket.clone())
    }
}

#[derive(Default)]
pub struct MemoryMessageStore {
    entries: Mutex<Vec<MessageEntry>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<MessageEntry> {
        self.entries.lock().expect("message store lock").clone()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn append(&self, entry: MessageEntry) -> Result<(), EngineError> {
        self.entries.lock().expect("message store lock").push(entry);
        Ok(())
    }

    async fn list_for_ticket(&self, ticket_id: Uuid) -> Result<Vec<MessageEntry>, EngineError> {
        let entries = self.entries.lock().expect("message store lock");
        Ok(entries
            .iter()
            .filter(|e| e.ticket_id == Some(ticket_id))
            .cloned()
            .collect())
    }
}

pub struct MockSmsSender {
    calls: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl MockSmsSender {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> usize {
        self.calls.lock().expect("sms sender lock").len()
    }

    pub fn last_body(&self) -> Option<String> {
        self.calls
            .lock()
            .expect("sms sender lock")
            .last()
            .map(|(_, body)| body.clone())
    }
}

impl Default for MockSmsSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SmsSender for MockSmsSender {
    async fn send_sms(&self, to: &str, body: &str) -> Result<String, SendError> {
        if self.fail {
            return Err(SendError::Provider("provider unavailable".to_string()));
        }
        let mut calls = self.calls.lock().expect("sms sender lock");
        calls.push((to.to_string(), body.to_string()));
        Ok(format!("SM{:04}", calls.len()))
    }
}

pub struct MockEmailSender {
    calls: Mutex<Vec<(String, String, String)>>,
    fail: bool,
}

impl MockEmailSender {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> usize {
        self.calls.lock().expect("email sender lock").len()
    }
}

impl Default for MockEmailSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailSender for MockEmailSender {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), SendError> {
        if self.fail {
            return Err(SendError::Provider("provider unavailable".to_string()));
        }
        self.calls.lock().expect("email sender lock").push((
            to.to_string(),
            subject.to_string(),
            body.to_string(),
        ));
        Ok(())
    }
}

pub fn new_ticket(name: &str, phone: &str) -> NewTicket {
    NewTicket {
        customer_name: name.to_string(),
        customer_phone: phone.to_string(),
        customer_email: None,
        language: "sv".to_string(),
        device_type: "Mobiltelefon".to_string(),
        device_model: Some("iPhone 13".to_string()),
        issue_description: "Skärmen är sprucken".to_string(),
        additional_notes: None,
        status: TicketStatus::New,
    }
}

pub fn sample_ticket() -> ServiceTicket {
    ServiceTicket {
        id: Uuid::new_v4(),
        ticket_number: 42,
        customer_name: "Anna Svensson".to_string(),
        customer_phone: "070-123 45 67".to_string(),
        phone_normalized: "0701234567".to_string(),
        customer_email: Some("anna@example.test".to_string()),
        language: "sv".to_string(),
        device_type: "Mobiltelefon".to_string(),
        device_model: Some("iPhone 13".to_string()),
        issue_description: "Skärmen är sprucken".to_string(),
        additional_notes: None,
        status: TicketStatus::New.as_str().to_string(),
        cost_proposal_approved: None,
        diagnosis: None,
        final_cost: None,
        work_done_summary: None,
        internal_notes: None,
        is_hidden: false,
        created_at: Utc::now(),
        completed_at: None,
        customer_notified_at: None,
        picked_up_at: None,
        closed_at: None,
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database_url: "postgres://unused".to_string(),
        api_key: Some("test-key".to_string()),
        webhook_secret: None,
        sms: None,
        smtp: None,
        translate: None,
    }
}

/// Full application state on in-memory stores and mock senders, for tests
/// that drive the HTTP surface.
pub fn state_with_mocks(
    config: AppConfig,
) -> (
    Arc<AppState>,
    Arc<MemoryTicketStore>,
    Arc<MemoryMessageStore>,
    Arc<MockSmsSender>,
    Arc<MockEmailSender>,
) {
    let tickets = Arc::new(MemoryTicketStore::new());
    let messages = Arc::new(MemoryMessageStore::new());
    let sms = Arc::new(MockSmsSender::new());
    let email = Arc::new(MockEmailSender::new());

    let dispatcher = Dispatcher::new(
        tickets.clone(),
        messages.clone(),
        Some(sms.clone()),
        Some(email.clone()),
        Translator::new(config.translate.clone()),
        "+46700000000".to_string(),
        "service@example.test".to_string(),
    );
    let inbound = InboundProcessor::new(
        tickets.clone(),
        messages.clone(),
        config.webhook_secret.clone(),
        "+46700000000".to_string(),
    );
    let state = Arc::new(AppState::with_engines(
        config,
        tickets.clone(),
        messages.clone(),
        dispatcher,
        inbound,
    ));
    (state, tickets, messages, sms, email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ticket_numbers_are_strictly_increasing() {
        let store = MemoryTicketStore::new();
        let mut previous = 0;
        for _ in 0..5 {
            let ticket = store.seed(new_ticket("Anna Svensson", "0701234567")).await;
            assert!(ticket.ticket_number > previous);
            previous = ticket.ticket_number;
        }
    }
}
