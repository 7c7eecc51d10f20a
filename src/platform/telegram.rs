use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{BotApi, Identity, ReplySender};
use crate::error::BotError;

/// Telegram caps a single message at 4096 characters
const MAX_MESSAGE_LEN: usize = 4096;

/// Uniform `{ok, result}` envelope every Bot API method answers with
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    ok: Option<bool>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

/// Split long messages for Telegram's 4096 char limit
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

/// Bot API client over HTTPS
pub struct TelegramApi {
    client: Client,
    base_url: String,
}

impl TelegramApi {
    pub fn new(api_base_url: &str, token: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client for Telegram API")?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", api_base_url.trim_end_matches('/'), token),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn get(&self, method: &str, query: &[(&str, String)]) -> Result<Value, BotError> {
        debug!("Calling {}", method);
        let response = self
            .client
            .get(self.url(method))
            .query(query)
            .send()
            .await
            .map_err(|source| BotError::Request {
                method: method.to_string(),
                source,
            })?;
        read_envelope(method, response).await
    }

    async fn post<T: Serialize + ?Sized>(&self, method: &str, body: &T) -> Result<Value, BotError> {
        debug!("Calling {}", method);
        let response = self
            .client
            .post(self.url(method))
            .json(body)
            .send()
            .await
            .map_err(|source| BotError::Request {
                method: method.to_string(),
                source,
            })?;
        read_envelope(method, response).await
    }
}

async fn read_envelope(method: &str, response: Response) -> Result<Value, BotError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BotError::Transport {
            method: method.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    let envelope: ApiEnvelope = response.json().await.map_err(|e| BotError::Protocol {
        method: method.to_string(),
        description: format!("unreadable body: {}", e),
    })?;
    envelope_result(method, envelope)
}

fn envelope_result(method: &str, envelope: ApiEnvelope) -> Result<Value, BotError> {
    if envelope.ok != Some(true) {
        return Err(BotError::Protocol {
            method: method.to_string(),
            description: envelope
                .description
                .unwrap_or_else(|| "ok is not true".to_string()),
        });
    }
    envelope.result.ok_or_else(|| BotError::Protocol {
        method: method.to_string(),
        description: "missing result".to_string(),
    })
}

#[async_trait]
impl ReplySender for TelegramApi {
    async fn send_reply(&self, chat_id: i64, text: &str) -> Result<(), BotError> {
        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            self.post(
                "sendMessage",
                &SendMessageRequest {
                    chat_id,
                    text: &chunk,
                },
            )
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BotApi for TelegramApi {
    async fn get_me(&self) -> Result<Identity, BotError> {
        let result = self.get("getMe", &[]).await?;
        serde_json::from_value(result).map_err(|e| BotError::Protocol {
            method: "getMe".to_string(),
            description: format!("unexpected identity: {}", e),
        })
    }

    async fn get_updates(&self, offset: Option<i64>, limit: u32) -> Result<Vec<Value>, BotError> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }

        match self.get("getUpdates", &query).await? {
            Value::Array(updates) => Ok(updates),
            other => Err(BotError::Protocol {
                method: "getUpdates".to_string(),
                description: format!("result is not a list: {}", other),
            }),
        }
    }
}
