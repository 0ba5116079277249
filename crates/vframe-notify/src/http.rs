//! HTTP implementation of the notification port.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use vframe_core::{JobNotification, Notifier, NotifyError};

/// Notifier configuration.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Base URL of the notification listener
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retry attempts after the initial one
    pub max_retries: u32,
    /// Base delay for exponential backoff (doubles each attempt)
    pub base_delay: Duration,
    /// Cap on the backoff delay
    pub max_delay: Duration,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000".to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(4),
        }
    }
}

impl NotifierConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("NOTIFIER_URL")
                .unwrap_or_else(|_| "http://localhost:9000".to_string()),
            timeout: Duration::from_secs(
                std::env::var("NOTIFIER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            max_retries: std::env::var("NOTIFIER_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(4),
        }
    }

    /// Backoff delay for a given attempt number.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }
}

/// HTTP client for the notification listener.
pub struct HttpNotifier {
    client: reqwest::Client,
    config: NotifierConfig,
}

impl HttpNotifier {
    pub fn new(config: NotifierConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotifyError::delivery(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/notify", self.config.base_url.trim_end_matches('/'))
    }

    async fn send_once(&self, notification: &JobNotification) -> Result<(), String> {
        let response = self
            .client
            .post(self.endpoint())
            .json(notification)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("listener returned {}", response.status()))
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    /// Deliver one notification, retrying transient failures with capped
    /// exponential backoff. After the retries are exhausted the error is
    /// returned for the caller to log; it carries no obligation beyond
    /// that.
    async fn notify(&self, notification: &JobNotification) -> Result<(), NotifyError> {
        let mut attempt = 0u32;
        loop {
            match self.send_once(notification).await {
                Ok(()) => {
                    debug!(
                        job_id = %notification.job_id,
                        status = notification.status.as_str(),
                        "notification delivered"
                    );
                    return Ok(());
                }
                Err(message) if attempt < self.config.max_retries => {
                    let delay = self.config.delay_for_attempt(attempt);
                    attempt += 1;
                    debug!(
                        job_id = %notification.job_id,
                        "notification attempt {} failed, retrying in {:?}: {}",
                        attempt, delay, message
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(message) => {
                    warn!(job_id = %notification.job_id, "giving up on notification: {}", message);
                    return Err(NotifyError::Exhausted {
                        attempts: attempt + 1,
                        message,
                    });
                }
            }
        }
    }
}
