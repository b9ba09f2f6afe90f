mod telegram;

pub use telegram::TelegramDelivery;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeliveryError {
    /// Worth retrying later, e.g. rate limits, timeouts and network failures
    #[error("Transient delivery failure: {0}")]
    Transient(String),
    /// Retrying will never succeed, e.g. the user blocked the bot
    #[error("Permanent delivery failure: {0}")]
    Permanent(String),
}

/// Sends fired reminders to their owners
#[async_trait::async_trait]
pub trait IDelivery: Send + Sync {
    async fn deliver(&self, owner_id: &str, text: &str) -> Result<(), DeliveryError>;
}

/// Delivery used when no messaging channel is configured, it only logs
pub struct LogDelivery {}

#[async_trait::async_trait]
impl IDelivery for LogDelivery {
    async fn deliver(&self, owner_id: &str, text: &str) -> Result<(), DeliveryError> {
        info!(owner_id, text, "Delivering reminder");
        Ok(())
    }
}
