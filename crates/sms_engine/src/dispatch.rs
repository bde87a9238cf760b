use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use sms_core::SendOutcome;
use sms_logging::{redact, sms_debug, sms_info, sms_warn};

use crate::Recipient;

pub const PUSHBULLET_TEXTS_URL: &str = "https://api.pushbullet.com/v2/texts";
pub const FAILED_TO_SEND_MESSAGE: &str = "Failed to send message";
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

const ACCESS_TOKEN_HEADER: &str = "Access-Token";

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub endpoint: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            endpoint: PUSHBULLET_TEXTS_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Sends one message. Every failure is folded into the returned outcome.
#[async_trait::async_trait]
pub trait Dispatcher: Send + Sync {
    async fn send(
        &self,
        credential: &str,
        device_target: &str,
        recipient: &Recipient<'_>,
        message: &str,
    ) -> SendOutcome;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The provider answered with a non-success status.
    #[error("{message}")]
    Provider { status: u16, message: String },
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    MalformedBody(String),
}

impl DispatchError {
    fn into_message(self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            UNKNOWN_ERROR_MESSAGE.to_string()
        } else {
            message
        }
    }
}

#[derive(Serialize)]
struct TextRequest<'a> {
    data: TextData<'a>,
}

#[derive(Serialize)]
struct TextData<'a> {
    target_device_iden: &'a str,
    addresses: [&'a str; 1],
    message: &'a str,
}

/// Pushbullet `/v2/texts` client.
#[derive(Debug, Clone, Default)]
pub struct PushbulletClient {
    settings: DispatchSettings,
}

impl PushbulletClient {
    pub fn new(settings: DispatchSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, DispatchError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| DispatchError::Transport(err.to_string()))
    }

    async fn try_send(
        &self,
        credential: &str,
        device_target: &str,
        phone: &str,
        message: &str,
    ) -> Result<(), DispatchError> {
        let client = self.build_client()?;
        let body = serde_json::to_vec(&TextRequest {
            data: TextData {
                target_device_iden: device_target,
                addresses: [phone],
                message,
            },
        })
        .map_err(|err| DispatchError::Transport(err.to_string()))?;

        let response = client
            .post(&self.settings.endpoint)
            .header(ACCESS_TOKEN_HEADER, credential)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        // The body must be JSON whatever the status.
        let parsed = serde_json::from_slice::<serde_json::Value>(&bytes)
            .map_err(|err| DispatchError::MalformedBody(err.to_string()))?;

        if status.is_success() {
            return Ok(());
        }

        let message =
            provider_error_message(&parsed).unwrap_or_else(|| FAILED_TO_SEND_MESSAGE.to_string());
        Err(DispatchError::Provider {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait::async_trait]
impl Dispatcher for PushbulletClient {
    async fn send(
        &self,
        credential: &str,
        device_target: &str,
        recipient: &Recipient<'_>,
        message: &str,
    ) -> SendOutcome {
        sms_debug!(
            "POST {} device={} token={} to={}",
            self.settings.endpoint,
            device_target,
            redact(credential),
            recipient.phone
        );
        match self
            .try_send(credential, device_target, recipient.phone, message)
            .await
        {
            Ok(()) => {
                sms_info!("Message sent to {} ({})", recipient.name, recipient.phone);
                SendOutcome::success(
                    recipient.name,
                    recipient.phone,
                    format!("Message sent: \"{message}\""),
                )
            }
            Err(err) => {
                sms_warn!(
                    "Send to {} ({}) failed: {:?}",
                    recipient.name,
                    recipient.phone,
                    err
                );
                SendOutcome::error(recipient.name, recipient.phone, err.into_message())
            }
        }
    }
}

fn provider_error_message(body: &serde_json::Value) -> Option<String> {
    body.get("error")?
        .get("message")?
        .as_str()
        .filter(|message| !message.is_empty())
        .map(ToOwned::to_owned)
}

fn map_reqwest_error(err: reqwest::Error) -> DispatchError {
    if err.is_timeout() {
        return DispatchError::Transport(format!("request timed out: {err}"));
    }
    DispatchError::Transport(err.to_string())
}
