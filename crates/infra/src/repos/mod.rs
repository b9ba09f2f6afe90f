mod schedule_descriptor;
mod shared;

use schedule_descriptor::{InMemoryScheduleDescriptorRepo, PostgresScheduleDescriptorRepo};
pub use schedule_descriptor::{Change, IScheduleDescriptorRepo, ModifyError, UpdateError};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct Repos {
    pub schedule_descriptors: Arc<dyn IScheduleDescriptorRepo>,
}

impl Repos {
    pub async fn create_postgres(connection_string: &str) -> anyhow::Result<Self> {
        info!("DB CHECKING CONNECTION ...");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await?;
        info!("DB CHECKING CONNECTION ... [done]");
        Ok(Self {
            schedule_descriptors: Arc::new(PostgresScheduleDescriptorRepo::new(pool)),
        })
    }

    pub fn create_inmemory() -> Self {
        Self {
            schedule_descriptors: Arc::new(InMemoryScheduleDescriptorRepo::new()),
        }
    }
}
