//! SMS notification gateway.
//!
//! The queue service only knows the [`NotificationGateway`] contract. Three
//! implementations ship here:
//!
//! - [`TwilioGateway`]: posts to the Twilio Messages REST endpoint.
//! - [`LogOnlyGateway`]: logs the message and reports it as not delivered.
//! - [`RecordingGateway`]: keeps every message in memory, for tests.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

mod e164;
mod log_only;
mod recording;
mod twilio;

pub use e164::is_e164;
pub use log_only::LogOnlyGateway;
pub use recording::{RecordingGateway, SentMessage};
pub use twilio::{TwilioConfig, TwilioGateway};

/// Proof that a provider accepted a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReceipt {
    /// Provider-side message id (Twilio SID), when the provider returns one.
    pub provider_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification provider is not configured")]
    NotConfigured,
    #[error("invalid gateway configuration: {0}")]
    InvalidConfig(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("provider rejected message (status {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("failed to parse provider response: {0}")]
    Parse(String),
}

/// Outbound SMS contract. Implementations make a single attempt and never retry.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(&self, to_e164: &str, message: &str) -> Result<SendReceipt, NotifyError>;

    /// Short provider name used in log fields.
    fn name(&self) -> &'static str;
}
