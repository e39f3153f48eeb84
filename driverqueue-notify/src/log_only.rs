use async_trait::async_trait;
use tracing::info;

use crate::{NotificationGateway, NotifyError, SendReceipt};

/// Stand-in used when no SMS provider is configured.
#[derive(Debug, Clone, Default)]
pub struct LogOnlyGateway;

#[async_trait]
impl NotificationGateway for LogOnlyGateway {
    async fn send(&self, to_e164: &str, message: &str) -> Result<SendReceipt, NotifyError> {
        info!(to = %to_e164, message = %message, "sms provider not configured; message not sent");
        Err(NotifyError::NotConfigured)
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_not_configured() {
        let gw = LogOnlyGateway;
        let err = gw.send("+5511999990000", "hi").await.unwrap_err();
        assert!(matches!(err, NotifyError::NotConfigured));
    }
}
