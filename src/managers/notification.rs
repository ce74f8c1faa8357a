//! Telegram notification channel
//!
//! Sends the run report through the Bot API `sendMessage` method. An empty
//! bot token or chat id disables the channel.

use crate::config::TelegramConfig;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Upper bound for one notification attempt
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("notification timed out after {0:?}")]
    Timeout(Duration),
}

/// Delivers a plain-text report to operators
#[async_trait]
pub trait Notifier: Send + Sync {
    fn is_enabled(&self) -> bool;

    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Notification manager for the Telegram Bot API
pub struct TelegramNotifier {
    config: TelegramConfig,
    client: reqwest::Client,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(NOTIFY_TIMEOUT).build()?;
        Ok(Self {
            config,
            client,
            api_base: TELEGRAM_API_BASE.to_string(),
        })
    }

    /// Point the notifier at another Bot API server
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.config.bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn is_enabled(&self) -> bool {
        !self.config.bot_token.is_empty() && !self.config.chat_id.is_empty()
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        if !self.is_enabled() {
            debug!("Telegram not configured, skipping notification");
            return Ok(());
        }

        let payload = SendMessage {
            chat_id: &self.config.chat_id,
            text,
        };
        let response = self.client.post(self.endpoint()).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        info!("Sent Telegram notification");
        Ok(())
    }
}

/// Mock notifier for testing
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct MockNotifier {
        pub messages: Arc<Mutex<Vec<String>>>,
        should_fail: Arc<Mutex<bool>>,
        should_hang: Arc<Mutex<bool>>,
    }

    impl MockNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_failure(self) -> Self {
            *self.should_fail.lock().unwrap() = true;
            self
        }

        /// Never answer, to exercise the caller's time bound
        pub fn with_hang(self) -> Self {
            *self.should_hang.lock().unwrap() = true;
            self
        }

        pub fn get_messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for MockNotifier {
        fn is_enabled(&self) -> bool {
            true
        }

        async fn send(&self, text: &str) -> Result<(), NotifyError> {
            if *self.should_hang.lock().unwrap() {
                std::future::pending::<()>().await;
            }
            self.messages.lock().unwrap().push(text.to_string());
            if *self.should_fail.lock().unwrap() {
                return Err(NotifyError::Api {
                    status: 401,
                    body: "Unauthorized".to_string(),
                });
            }
            Ok(())
        }
    }
}
