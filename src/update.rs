use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::BotError;

/// One inbound chat message, normalized from a raw `getUpdates` envelope.
///
/// Fields the envelope did not carry stay `None`; only `text` falls back
/// to an empty string.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub update_id: i64,
    pub text: String,
    /// `first_name`, or `first_name_last_name` when both are present
    pub user: Option<String>,
    pub user_id: Option<i64>,
    pub chat_id: Option<i64>,
    pub chat_type: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl Update {
    /// Build an update from a raw envelope.
    ///
    /// Fails only when `update_id` or the `message` object is missing;
    /// every other field is extracted best-effort.
    pub fn from_envelope(envelope: &Value) -> Result<Self, BotError> {
        let update_id = update_id_of(envelope)
            .ok_or_else(|| BotError::MalformedUpdate("missing update_id".into()))?;
        let message = envelope
            .get("message")
            .filter(|m| m.is_object())
            .ok_or_else(|| {
                BotError::MalformedUpdate(format!("update #{} has no message", update_id))
            })?;

        let text = message
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let from = message.get("from");
        let user = from.and_then(display_name);
        let user_id = from.and_then(|f| f.get("id")).and_then(Value::as_i64);

        let chat = message.get("chat");
        let chat_id = chat.and_then(|c| c.get("id")).and_then(Value::as_i64);
        let chat_type = chat
            .and_then(|c| c.get("type"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let date = message
            .get("date")
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

        Ok(Self {
            update_id,
            text,
            user,
            user_id,
            chat_id,
            chat_type,
            date,
        })
    }
}

/// The envelope's `update_id`, if it has a usable one.
pub fn update_id_of(envelope: &Value) -> Option<i64> {
    envelope.get("update_id").and_then(Value::as_i64)
}

fn display_name(from: &Value) -> Option<String> {
    let first = from.get("first_name").and_then(Value::as_str);
    let last = from.get("last_name").and_then(Value::as_str);
    match (first, last) {
        (Some(first), Some(last)) => Some(format!("{}_{}", first, last)),
        (Some(first), None) => Some(first.to_string()),
        (None, Some(last)) => Some(last.to_string()),
        (None, None) => None,
    }
}
