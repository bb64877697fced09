use std::sync::Arc;

use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use dotenvy::dotenv;
use log::info;

use verkstad::api_router;
use verkstad::config::AppConfig;
use verkstad::messages::{MessageStore, PgMessageStore};
use verkstad::shared::state::AppState;
use verkstad::shared::utils::{create_pool, DbPool};
use verkstad::tickets::store::{PgTicketStore, TicketStore};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    let pool = create_pool(&config.database_url)?;
    run_migrations(&pool)?;

    let tickets: Arc<dyn TicketStore> = Arc::new(PgTicketStore::new(pool.clone()));
    let messages: Arc<dyn MessageStore> = Arc::new(PgMessageStore::new(pool));
    let state = Arc::new(AppState::new(config.clone(), tickets, messages));
    let app = api_router::configure_routes(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("migrations failed: {e}"))?;
    Ok(())
}
