mod config;
mod repos;
mod services;
mod system;

pub use config::{next_backoff, Config};
pub use repos::{Change, IScheduleDescriptorRepo, ModifyError, Repos, UpdateError};
pub use services::*;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
pub use system::{ISys, RealSys, StaticTimeSys};
use tracing::info;

const PSQL_CONNECTION_STRING: &str = "DATABASE_URL";
const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";

#[derive(Clone)]
pub struct NudgeContext {
    pub repos: Repos,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
    pub delivery: Arc<dyn IDelivery>,
}

impl NudgeContext {
    /// Context that keeps everything in memory and only logs deliveries
    pub fn create_inmemory() -> Self {
        Self {
            repos: Repos::create_inmemory(),
            config: Config::new(),
            sys: Arc::new(RealSys {}),
            delivery: Arc::new(LogDelivery {}),
        }
    }
}

/// Will setup the infrastructure context given the environment
pub async fn setup_context() -> anyhow::Result<NudgeContext> {
    let repos = match get_psql_connection_string() {
        Some(connection_string) => Repos::create_postgres(&connection_string).await?,
        None => {
            info!(
                "Did not find {} environment variable. Reminders are kept in memory.",
                PSQL_CONNECTION_STRING
            );
            Repos::create_inmemory()
        }
    };
    let delivery: Arc<dyn IDelivery> = match std::env::var(TELEGRAM_BOT_TOKEN) {
        Ok(token) if !token.is_empty() => Arc::new(TelegramDelivery::new(token)),
        _ => {
            info!(
                "Did not find {} environment variable. Reminders are only logged.",
                TELEGRAM_BOT_TOKEN
            );
            Arc::new(LogDelivery {})
        }
    };

    Ok(NudgeContext {
        repos,
        config: Config::new(),
        sys: Arc::new(RealSys {}),
        delivery,
    })
}

fn get_psql_connection_string() -> Option<String> {
    std::env::var(PSQL_CONNECTION_STRING)
        .ok()
        .filter(|connection_string| !connection_string.is_empty())
}

/// Runs the database migrations, a no-op when reminders are kept in memory
pub async fn run_migration() -> anyhow::Result<()> {
    let connection_string = match get_psql_connection_string() {
        Some(connection_string) => connection_string,
        None => return Ok(()),
    };
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&connection_string)
        .await?;

    sqlx::migrate!().run(&pool).await?;
    Ok(())
}
