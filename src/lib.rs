pub mod api_router;
pub mod auth;
pub mod channels;
pub mod config;
pub mod inbound;
pub mod messages;
pub mod notify;
pub mod shared;
pub mod templates;
pub mod tickets;
