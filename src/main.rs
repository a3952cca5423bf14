//! Maintenance entry point.
//!
//! Loads configuration, prepares the database and runs one inactivity
//! sweep. The scheduler that invokes this binary lives outside the crate.

use std::error::Error;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use tattoo_intake::adapters::PostgresLeadRepository;
use tattoo_intake::application::{SweepInactiveLeadsCommand, SweepInactiveLeadsHandler};
use tattoo_intake::config::{AppConfig, LoggingConfig};
use tattoo_intake::domain::foundation::Timestamp;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.logging);

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Migrations applied");
    }

    let leads = Arc::new(PostgresLeadRepository::new(pool.clone()));
    let sweep = SweepInactiveLeadsHandler::new(leads, config.conversation.inactivity_days);
    let result = sweep
        .handle(SweepInactiveLeadsCommand {
            now: Timestamp::now(),
        })
        .await?;

    tracing::info!(
        abandoned = result.abandoned.len(),
        stale = result.stale.len(),
        "Maintenance run complete"
    );

    pool.close().await;
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(logging.env_filter())
        .with_target(true);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
