use super::{DeliveryError, IDelivery};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

const TELEGRAM_API_BASE_URL: &str = "https://api.telegram.org";

/// Delivers reminders as Telegram messages, the owner id being the chat id
pub struct TelegramDelivery {
    client: Client,
    bot_token: String,
}

impl TelegramDelivery {
    pub fn new(bot_token: String) -> Self {
        Self {
            client: Client::new(),
            bot_token,
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TelegramErrorResponse {
    #[serde(default)]
    description: String,
}

fn classify_failure(status: StatusCode, description: &str) -> DeliveryError {
    let reason = format!("Telegram responded {}: {}", status.as_u16(), description);
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return DeliveryError::Transient(reason);
    }
    if status == StatusCode::FORBIDDEN
        || description.to_lowercase().contains("chat not found")
        || status.is_client_error()
    {
        return DeliveryError::Permanent(reason);
    }
    DeliveryError::Transient(reason)
}

#[async_trait::async_trait]
impl IDelivery for TelegramDelivery {
    async fn deliver(&self, owner_id: &str, text: &str) -> Result<(), DeliveryError> {
        let res = self
            .client
            .post(&format!(
                "{}/bot{}/sendMessage",
                TELEGRAM_API_BASE_URL, self.bot_token
            ))
            .json(&SendMessageBody {
                chat_id: owner_id,
                text,
            })
            .send()
            .await
            .map_err(|e| {
                warn!(
                    "[Network Error] Telegram sendMessage error. Error message: {:?}",
                    e
                );
                DeliveryError::Transient(e.to_string())
            })?;

        let status = res.status();
        if status.is_success() {
            return Ok(());
        }
        let description = res
            .json::<TelegramErrorResponse>()
            .await
            .map(|body| body.description)
            .unwrap_or_default();
        let failure = classify_failure(status, &description);
        error!(
            "[Unexpected Response] Telegram sendMessage error. Error message: {:?}",
            failure
        );
        Err(failure)
    }
}
