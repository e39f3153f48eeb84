use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{is_e164, NotificationGateway, NotifyError, SendReceipt};

pub const DEFAULT_API_BASE: &str = "https://api.twilio.com";

#[derive(Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_number", &self.from_number)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
}

/// Sends SMS through the Twilio Messages API.
#[derive(Debug, Clone)]
pub struct TwilioGateway {
    client: Client,
    config: TwilioConfig,
    endpoint: String,
}

impl TwilioGateway {
    pub fn new(config: TwilioConfig) -> Result<Self, NotifyError> {
        if config.account_sid.trim().is_empty() || config.auth_token.trim().is_empty() {
            return Err(NotifyError::InvalidConfig(
                "account sid and auth token are required".into(),
            ));
        }
        if !is_e164(&config.from_number) {
            return Err(NotifyError::InvalidConfig(format!(
                "sender number is not E.164: {}",
                config.from_number
            )));
        }

        let client = Client::builder()
            .user_agent(concat!("driverqueue/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotifyError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        let endpoint = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            config.api_base.trim_end_matches('/'),
            config.account_sid
        );

        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl NotificationGateway for TwilioGateway {
    async fn send(&self, to_e164: &str, message: &str) -> Result<SendReceipt, NotifyError> {
        debug!(to = %to_e164, "sending sms via twilio");

        let params = [
            ("To", to_e164),
            ("From", self.config.from_number.as_str()),
            ("Body", message),
        ];

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach twilio: {}", e);
                NotifyError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(body);
            warn!("Twilio returned error: {} - {}", status, message);
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MessageResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse twilio response: {}", e);
            NotifyError::Parse(e.to_string())
        })?;

        Ok(SendReceipt {
            provider_id: parsed.sid,
        })
    }

    fn name(&self) -> &'static str {
        "twilio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Form, Path};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use std::collections::HashMap;

    fn config(api_base: String) -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC123".into(),
            auth_token: "token".into(),
            from_number: "+15550001111".into(),
            api_base,
            timeout: Duration::from_secs(5),
        }
    }

    async fn fake_twilio(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn rejects_bad_sender() {
        let mut cfg = config(DEFAULT_API_BASE.into());
        cfg.from_number = "5550001111".into();
        assert!(matches!(
            TwilioGateway::new(cfg),
            Err(NotifyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn builds_messages_endpoint() {
        let gw = TwilioGateway::new(config("https://api.twilio.com/".into())).unwrap();
        assert_eq!(
            gw.endpoint(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[tokio::test]
    async fn posts_form_with_basic_auth() {
        let router = Router::new().route(
            "/2010-04-01/Accounts/{sid}/Messages.json",
            post(
                |Path(sid): Path<String>,
                 headers: HeaderMap,
                 Form(form): Form<HashMap<String, String>>| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    // base64("AC123:token")
                    if sid != "AC123" || auth != "Basic QUMxMjM6dG9rZW4=" {
                        return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({"message": "auth"})));
                    }
                    if form.get("To").map(String::as_str) != Some("+5511999990000")
                        || form.get("From").map(String::as_str) != Some("+15550001111")
                        || form.get("Body").map(String::as_str) != Some("your turn")
                    {
                        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"message": "form"})));
                    }
                    (StatusCode::CREATED, Json(serde_json::json!({"sid": "SM42"})))
                },
            ),
        );
        let base = fake_twilio(router).await;
        let gw = TwilioGateway::new(config(base)).unwrap();

        let receipt = gw.send("+5511999990000", "your turn").await.unwrap();
        assert_eq!(receipt.provider_id.as_deref(), Some("SM42"));
    }

    #[tokio::test]
    async fn surfaces_provider_rejection() {
        let router = Router::new().route(
            "/2010-04-01/Accounts/{sid}/Messages.json",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"code": 21211, "message": "Invalid 'To' Phone Number"})),
                )
            }),
        );
        let base = fake_twilio(router).await;
        let gw = TwilioGateway::new(config(base)).unwrap();

        match gw.send("+5511999990000", "hi").await {
            Err(NotifyError::Rejected { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid 'To' Phone Number");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_provider_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let gw = TwilioGateway::new(config(format!("http://{addr}"))).unwrap();
        assert!(matches!(
            gw.send("+5511999990000", "hi").await,
            Err(NotifyError::Network(_))
        ));
    }
}
