use tracing::{debug, info};

use crate::bot::Session;
use crate::commands::{normalize, CommandRegistry, HandlerContext};
use crate::error::BotError;
use crate::peripheral::PeripheralController;
use crate::platform::{reply_to, Identity, ReplySender};
use crate::update::Update;

pub const ACK_REPLY: &str = "ok.";
pub const UNRECOGNIZED_REPLY: &str = "Say what?";

/// Resolves command text to a registered handler, with a local fallback
/// for the echo-mode toggle and anything unrecognized.
pub struct Dispatcher {
    registry: CommandRegistry,
    peripheral: PeripheralController,
    version: String,
}

impl Dispatcher {
    pub fn new(
        registry: CommandRegistry,
        peripheral: PeripheralController,
        version: String,
    ) -> Self {
        Self {
            registry,
            peripheral,
            version,
        }
    }

    /// Run the registered handler for `command`.
    ///
    /// Returns `Ok(false)` when no handler matches, leaving the caller to
    /// apply [`Dispatcher::fallback`].
    pub async fn handle(
        &self,
        command: &str,
        update: &Update,
        replies: &dyn ReplySender,
        identity: Option<&Identity>,
    ) -> Result<bool, BotError> {
        let command = normalize(command);
        let Some(handler) = self.registry.lookup(&command) else {
            return Ok(false);
        };

        debug!("Dispatching '{}' for update #{}", command, update.update_id);
        let ctx = HandlerContext {
            update,
            replies,
            peripheral: &self.peripheral,
            registry: &self.registry,
            identity,
            version: &self.version,
        };
        handler
            .handle(&ctx)
            .await
            .map_err(|source| BotError::Handler { command, source })?;
        Ok(true)
    }

    /// Local handling for commands the registry does not know.
    pub async fn fallback(
        &self,
        command: &str,
        update: &Update,
        replies: &dyn ReplySender,
        session: &mut Session,
    ) -> Result<(), BotError> {
        match parse_echo_mode(&normalize(command)) {
            Some(enabled) => {
                if session.echo_mode() != enabled {
                    info!("Echo mode {}", if enabled { "on" } else { "off" });
                }
                session.set_echo_mode(enabled);
                reply_to(replies, update, ACK_REPLY).await
            }
            None => reply_to(replies, update, UNRECOGNIZED_REPLY).await,
        }
    }
}

/// `echo mode on|off` → the requested state
fn parse_echo_mode(command: &str) -> Option<bool> {
    if !command.starts_with("echo mode") {
        return None;
    }
    match command.split_whitespace().nth(2) {
        Some("on") => Some(true),
        Some("off") => Some(false),
        _ => None,
    }
}
