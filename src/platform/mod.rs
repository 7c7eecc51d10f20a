pub mod telegram;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::BotError;
use crate::update::Update;

/// The bot's own identity as reported by `getMe`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub first_name: String,
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (#{})", self.username, self.id)
    }
}

/// Capability handed to command handlers for answering a chat.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn send_reply(&self, chat_id: i64, text: &str) -> Result<(), BotError>;
}

/// Request/response boundary to the messaging service.
#[async_trait]
pub trait BotApi: ReplySender {
    async fn get_me(&self) -> Result<Identity, BotError>;

    /// Fetch raw update envelopes. `offset` of `None` returns the backlog.
    async fn get_updates(&self, offset: Option<i64>, limit: u32)
        -> Result<Vec<Value>, BotError>;
}

/// Reply to the chat an update came from. Updates without a chat id are
/// skipped, since there is nowhere to send the reply.
pub async fn reply_to(
    replies: &dyn ReplySender,
    update: &Update,
    text: &str,
) -> Result<(), BotError> {
    match update.chat_id {
        Some(chat_id) => replies.send_reply(chat_id, text).await,
        None => {
            debug!("Update #{} has no chat, reply dropped", update.update_id);
            Ok(())
        }
    }
}
