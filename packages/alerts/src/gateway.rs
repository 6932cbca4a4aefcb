//! SMS gateway abstraction and the Fast2SMS implementation.

use std::time::Duration;

use serde::Deserialize;

use crate::SmsError;

/// Default Fast2SMS bulk endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.fast2sms.com/dev/bulkV2";

/// Timeout for a single gateway request.
pub const SMS_TIMEOUT: Duration = Duration::from_secs(10);

/// Fast2SMS route tag.
pub const ROUTE: &str = "q";

/// Registered sender id.
pub const SENDER_ID: &str = "FXPTHL";

/// Gateway acknowledgement of a send request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayAck {
    /// Whether the gateway accepted the messages.
    pub accepted: bool,
    /// Gateway message, joined when it sent several.
    pub detail: String,
}

/// Trait for SMS gateways.
#[async_trait::async_trait]
pub trait SmsGateway: Send + Sync {
    /// Sends `message` to every number in `numbers`.
    ///
    /// # Errors
    ///
    /// Returns [`SmsError`] on timeout, a non-OK HTTP status, transport
    /// failure, or an unreadable acknowledgement. A rejection the gateway
    /// reports in its body is an `Ok` with `accepted == false`.
    async fn send_bulk(&self, message: &str, numbers: &[String]) -> Result<GatewayAck, SmsError>;
}

/// SMS settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsConfig {
    /// `FAST2SMS_API_KEY`; `None` disables SMS.
    pub api_key: Option<String>,
    /// `FAST2SMS_BASE_URL`, default [`DEFAULT_BASE_URL`].
    pub base_url: String,
}

impl SmsConfig {
    /// Reads `FAST2SMS_API_KEY` and `FAST2SMS_BASE_URL`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("FAST2SMS_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            base_url: std::env::var("FAST2SMS_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        }
    }
}

/// Creates a gateway from `config`, or `None` when no API key is set.
#[must_use]
pub fn create_gateway(config: &SmsConfig) -> Option<Box<dyn SmsGateway>> {
    let Some(api_key) = &config.api_key else {
        log::warn!("Fast2SMS API key not configured - SMS alerts disabled");
        return None;
    };

    Some(Box::new(Fast2SmsGateway::new(
        api_key.clone(),
        config.base_url.clone(),
    )))
}

/// Fast2SMS bulk API gateway.
pub struct Fast2SmsGateway {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl Fast2SmsGateway {
    /// Creates a new Fast2SMS gateway.
    #[must_use]
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

/// Fast2SMS response body.
#[derive(Deserialize)]
struct Fast2SmsResponse {
    #[serde(rename = "return", default)]
    accepted: bool,
    #[serde(default)]
    message: Option<Fast2SmsMessage>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Fast2SmsMessage {
    Text(String),
    Lines(Vec<String>),
}

impl From<Fast2SmsResponse> for GatewayAck {
    fn from(value: Fast2SmsResponse) -> Self {
        let detail = match value.message {
            Some(Fast2SmsMessage::Text(text)) => text,
            Some(Fast2SmsMessage::Lines(lines)) => lines.join("; "),
            None => "Unknown error".to_string(),
        };
        Self {
            accepted: value.accepted,
            detail,
        }
    }
}

fn parse_ack(body: &str) -> Result<GatewayAck, SmsError> {
    serde_json::from_str::<Fast2SmsResponse>(body)
        .map(GatewayAck::from)
        .map_err(|e| SmsError::InvalidResponse {
            message: format!("invalid gateway response: {e}"),
        })
}

fn transport_error(e: reqwest::Error) -> SmsError {
    if e.is_timeout() {
        SmsError::Timeout
    } else {
        SmsError::Request(e)
    }
}

#[async_trait::async_trait]
impl SmsGateway for Fast2SmsGateway {
    async fn send_bulk(&self, message: &str, numbers: &[String]) -> Result<GatewayAck, SmsError> {
        let numbers = numbers.join(",");
        let form = [
            ("authorization", self.api_key.as_str()),
            ("message", message),
            ("numbers", numbers.as_str()),
            ("route", ROUTE),
            ("sender_id", SENDER_ID),
        ];

        let resp = self
            .client
            .post(&self.base_url)
            .timeout(SMS_TIMEOUT)
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(SmsError::Status {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(transport_error)?;
        parse_ack(&body)
    }
}
