use std::sync::Arc;

use crate::channels::email::SmtpEmailSender;
use crate::channels::sms::TwilioSmsSender;
use crate::channels::translate::Translator;
use crate::channels::{EmailSender, SmsSender};
use crate::config::AppConfig;
use crate::inbound::InboundProcessor;
use crate::messages::MessageStore;
use crate::notify::Dispatcher;
use crate::tickets::store::TicketStore;

pub struct AppState {
    pub config: AppConfig,
    pub tickets: Arc<dyn TicketStore>,
    pub messages: Arc<dyn MessageStore>,
    pub dispatcher: Dispatcher,
    pub inbound: InboundProcessor,
}

impl AppState {
    /// Wires the engine from configuration: provider senders exist only
    /// when their config sections do.
    pub fn new(
        config: AppConfig,
        tickets: Arc<dyn TicketStore>,
        messages: Arc<dyn MessageStore>,
    ) -> Self {
        let sms: Option<Arc<dyn SmsSender>> = config
            .sms
            .clone()
            .map(|c| Arc::new(TwilioSmsSender::new(c)) as Arc<dyn SmsSender>);
        let email: Option<Arc<dyn EmailSender>> = config
            .smtp
            .clone()
            .map(|c| Arc::new(SmtpEmailSender::new(c)) as Arc<dyn EmailSender>);
        let sms_from = config
            .sms
            .as_ref()
            .map(|c| c.from_number.clone())
            .unwrap_or_default();
        let email_from = config
            .smtp
            .as_ref()
            .map(|c| c.from.clone())
            .unwrap_or_default();

        let dispatcher = Dispatcher::new(
            tickets.clone(),
            messages.clone(),
            sms,
            email,
            Translator::new(config.translate.clone()),
            sms_from.clone(),
            email_from,
        );
        let inbound = InboundProcessor::new(
            tickets.clone(),
            messages.clone(),
            config.webhook_secret.clone(),
            sms_from,
        );

        Self {
            config,
            tickets,
            messages,
            dispatcher,
            inbound,
        }
    }

    /// Assembles a state with pre-built engine components. Used by tests
    /// that substitute mock senders.
    pub fn with_engines(
        config: AppConfig,
        tickets: Arc<dyn TicketStore>,
        messages: Arc<dyn MessageStore>,
        dispatcher: Dispatcher,
        inbound: InboundProcessor,
    ) -> Self {
        Self {
            config,
            tickets,
            messages,
            dispatcher,
            inbound,
        }
    }
}
