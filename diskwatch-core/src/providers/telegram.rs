use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::SinkError;
use crate::notifier::{NotificationSink, ParseMode};
use crate::secret::Secret;

use super::USER_AGENT;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org/";

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: Secret,
    pub api_base: Url,
    pub timeout: Duration,
}

impl TelegramConfig {
    pub fn new(bot_token: Secret) -> Self {
        Self {
            bot_token,
            api_base: Url::parse(TELEGRAM_API_BASE)
                .expect("static URL is valid"),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Telegram Bot API sink. The bot token is part of every request path, so
/// transport errors are stripped of their URL before they are surfaced.
pub struct TelegramSink {
    http: reqwest::Client,
    bot_token: Secret,
    api_base: Url,
}

impl fmt::Debug for TelegramSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramSink")
            .field("api_base", &self.api_base.as_str())
            .finish_non_exhaustive()
    }
}

/// The bot account behind a token, as reported by `getMe`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

impl TelegramSink {
    pub fn new(config: TelegramConfig) -> Result<Self, SinkError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|err| SinkError::Network(err.without_url()))?;

        Ok(Self {
            http,
            bot_token: config.bot_token,
            api_base: config.api_base,
        })
    }

    /// Identify the bot behind the configured token.
    pub async fn get_me(&self) -> Result<BotIdentity, SinkError> {
        let url = self.method_url("getMe")?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| SinkError::Network(err.without_url()))?;

        let status = response.status();
        let body = decode::<BotIdentity>(response).await?;
        match (body.ok, body.result) {
            (true, Some(identity)) => Ok(identity),
            (_, _) => Err(rejection(status, body.description, body.parameters)),
        }
    }

    // Built segment-wise: `Url::join` would read "bot123:abc" as a scheme.
    fn method_url(&self, method: &str) -> Result<Url, SinkError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                SinkError::Decode(format!(
                    "invalid API base {}: cannot hold a path",
                    self.api_base
                ))
            })?
            .pop_if_empty()
            .push(&format!("bot{}", self.bot_token.expose()))
            .push(method);
        Ok(url)
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn send(
        &self,
        destination: &str,
        text: &str,
        mode: ParseMode,
    ) -> Result<(), SinkError> {
        let url = self.method_url("sendMessage")?;
        let payload = SendMessage {
            chat_id: destination,
            text,
            parse_mode: mode.as_api_str(),
            disable_web_page_preview: true,
        };

        let response = self
            .http
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| SinkError::Network(err.without_url()))?;

        let status = response.status();
        let body = decode::<serde_json::Value>(response).await?;
        if status.is_success() && body.ok {
            return Ok(());
        }
        Err(rejection(status, body.description, body.parameters))
    }
}

async fn decode<T>(
    response: reqwest::Response,
) -> Result<ApiResponse<T>, SinkError>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();
    response.json::<ApiResponse<T>>().await.map_err(|err| {
        SinkError::Decode(format!(
            "unexpected response body (status {status}): {}",
            err.without_url()
        ))
    })
}

fn rejection(
    status: StatusCode,
    description: Option<String>,
    parameters: Option<ResponseParameters>,
) -> SinkError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return SinkError::RateLimited {
            retry_after: parameters.and_then(|p| p.retry_after),
        };
    }

    SinkError::Rejected {
        status: status.as_u16(),
        description: description.unwrap_or_else(|| {
            format!("Telegram request failed with status {}", status)
        }),
    }
}
