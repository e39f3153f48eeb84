use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{NotificationGateway, NotifyError, SendReceipt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: String,
    pub body: String,
}

/// In-memory gateway that records every send attempt.
///
/// When `failing` is set, attempts are still recorded but reported as rejected.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<SentMessage>>,
    failing: AtomicBool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let gw = Self::default();
        gw.set_failing(true);
        gw
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of every attempt so far, in order.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

#[async_trait]
impl NotificationGateway for RecordingGateway {
    async fn send(&self, to_e164: &str, message: &str) -> Result<SendReceipt, NotifyError> {
        let index = {
            let mut guard = self
                .sent
                .lock()
                .map_err(|_| NotifyError::Network("recorder lock poisoned".into()))?;
            guard.push(SentMessage {
                to: to_e164.to_string(),
                body: message.to_string(),
            });
            guard.len()
        };

        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Rejected {
                status: 503,
                message: "recording gateway set to fail".into(),
            });
        }
        Ok(SendReceipt {
            provider_id: Some(format!("REC{index}")),
        })
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
