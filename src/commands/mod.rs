pub mod builtin;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::peripheral::PeripheralController;
use crate::platform::{self, Identity, ReplySender};
use crate::update::Update;

/// Everything a command handler may touch while answering one update
pub struct HandlerContext<'a> {
    pub update: &'a Update,
    pub replies: &'a dyn ReplySender,
    pub peripheral: &'a PeripheralController,
    pub registry: &'a CommandRegistry,
    /// Filled in once the identity check has passed
    pub identity: Option<&'a Identity>,
    pub version: &'a str,
}

impl HandlerContext<'_> {
    /// Reply to the chat the update came from.
    pub async fn reply(&self, text: &str) -> Result<()> {
        platform::reply_to(self.replies, self.update, text).await?;
        Ok(())
    }
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, ctx: &HandlerContext<'_>) -> Result<()>;
}

/// Lower-case, trimmed form used as the registry key.
pub fn normalize(command: &str) -> String {
    command.trim().to_lowercase()
}

/// Registry of exact-match chat commands
pub struct CommandRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry preloaded with the built-in commands
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (command, handler) in builtin::BUILTINS {
            registry.register(command, Arc::new(handler));
        }
        registry
    }

    /// Register a handler, replacing any previous one for the same command.
    pub fn register(&mut self, command: &str, handler: Arc<dyn CommandHandler>) {
        let key = normalize(command);
        debug!("Registered command: {}", key);
        self.handlers.insert(key, handler);
    }

    pub fn lookup(&self, command: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(&normalize(command)).cloned()
    }

    /// Registered commands in alphabetical order
    pub fn list_commands(&self) -> Vec<&str> {
        let mut commands: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        commands.sort_unstable();
        commands
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl CommandHandler for Noop {
        async fn handle(&self, _ctx: &HandlerContext<'_>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_builtins_registered() {
        let registry = CommandRegistry::with_builtins();
        assert_eq!(
            registry.list_commands(),
            vec![
                "/start",
                "blink",
                "chat info",
                "cpu temp",
                "hello",
                "help",
                "hi",
                "led off",
                "led on",
                "version",
                "who am i?",
                "who are you?",
            ]
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = CommandRegistry::with_builtins();
        let upper = registry.lookup("BLINK").unwrap();
        let lower = registry.lookup("blink").unwrap();
        assert!(Arc::ptr_eq(&upper, &lower));
        assert!(registry.lookup("  Led On ").is_some());
    }

    #[test]
    fn test_lookup_is_exact_match() {
        let registry = CommandRegistry::with_builtins();
        assert!(registry.lookup("blinking").is_none());
        assert!(registry.lookup("hi there").is_none());
        assert!(registry.lookup("").is_none());
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = CommandRegistry::new();
        assert!(registry.is_empty());
        let first: Arc<dyn CommandHandler> = Arc::new(Noop);
        let second: Arc<dyn CommandHandler> = Arc::new(Noop);
        registry.register("Ping", first.clone());
        registry.register("ping", second.clone());

        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(&registry.lookup("PING").unwrap(), &second));
    }
}
