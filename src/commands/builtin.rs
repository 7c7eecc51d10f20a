use anyhow::Result;
use async_trait::async_trait;

use super::{CommandHandler, HandlerContext};

/// Commands every bot answers out of the box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Hello,
    Start,
    Version,
    WhoAmI,
    ChatInfo,
    Blink,
    LedOn,
    LedOff,
    Help,
    CpuTemp,
    WhoAreYou,
}

pub const BUILTINS: [(&str, Builtin); 12] = [
    ("hi", Builtin::Hello),
    ("hello", Builtin::Hello),
    ("/start", Builtin::Start),
    ("version", Builtin::Version),
    ("who am i?", Builtin::WhoAmI),
    ("chat info", Builtin::ChatInfo),
    ("blink", Builtin::Blink),
    ("led on", Builtin::LedOn),
    ("led off", Builtin::LedOff),
    ("help", Builtin::Help),
    ("cpu temp", Builtin::CpuTemp),
    ("who are you?", Builtin::WhoAreYou),
];

const UNKNOWN: &str = "unknown";

fn or_unknown<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| UNKNOWN.to_string(), |v| v.to_string())
}

#[async_trait]
impl CommandHandler for Builtin {
    async fn handle(&self, ctx: &HandlerContext<'_>) -> Result<()> {
        let update = ctx.update;
        match self {
            Builtin::Hello => {
                let user = update.user.as_deref().unwrap_or("stranger");
                ctx.reply(&format!("Hello to you too, {}", user)).await
            }
            Builtin::Start => {
                ctx.reply(&format!(
                    "Hi, i'm {}. type 'help' to get the command list.",
                    ctx.version
                ))
                .await
            }
            Builtin::Version => ctx.reply(ctx.version).await,
            Builtin::WhoAmI => {
                ctx.reply(&format!(
                    "you're @{}, (#{})",
                    or_unknown(update.user.as_deref()),
                    or_unknown(update.user_id)
                ))
                .await
            }
            Builtin::ChatInfo => {
                ctx.reply(&format!(
                    "chat #{}, {}",
                    or_unknown(update.chat_id),
                    or_unknown(update.chat_type.as_deref())
                ))
                .await
            }
            // The LED acts even when the acknowledgement cannot be sent.
            Builtin::Blink => {
                ctx.peripheral.blink_start().await;
                ctx.reply("let's do this!").await
            }
            Builtin::LedOn => {
                ctx.peripheral.turn_on().await;
                ctx.reply("sure. it's on.").await
            }
            Builtin::LedOff => {
                ctx.peripheral.turn_off().await;
                ctx.reply("sure. it's off.").await
            }
            Builtin::Help => {
                let commands = ctx.registry.list_commands();
                ctx.reply(&format!("available commands:\n > {}", commands.join("\n > ")))
                    .await
            }
            Builtin::CpuTemp => ctx.reply(&ctx.peripheral.read_temperature()).await,
            Builtin::WhoAreYou => {
                let me = or_unknown(ctx.identity);
                ctx.reply(&format!("I'm {}", me)).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandRegistry;
    use crate::error::BotError;
    use crate::peripheral::{OutputPin, PeripheralController, TEMPERATURE_UNAVAILABLE};
    use crate::platform::{Identity, ReplySender};
    use crate::update::Update;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait]
    impl ReplySender for Outbox {
        async fn send_reply(&self, chat_id: i64, text: &str) -> Result<(), BotError> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }
    }

    /// Every send fails as if Telegram were down
    struct Offline;

    #[async_trait]
    impl ReplySender for Offline {
        async fn send_reply(&self, _chat_id: i64, _text: &str) -> Result<(), BotError> {
            Err(BotError::Transport {
                method: "sendMessage".into(),
                status: 502,
                body: String::new(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingPin {
        levels: Mutex<Vec<bool>>,
    }

    impl OutputPin for RecordingPin {
        fn set_level(&self, on: bool) -> Result<()> {
            self.levels.lock().unwrap().push(on);
            Ok(())
        }
    }

    fn update(user: Option<&str>) -> Update {
        Update {
            update_id: 1,
            text: String::new(),
            user: user.map(str::to_string),
            user_id: Some(77),
            chat_id: Some(5),
            chat_type: Some("private".into()),
            date: None,
        }
    }

    async fn run(command: &str, update: &Update, identity: Option<&Identity>) -> Vec<String> {
        let outbox = Outbox::default();
        let registry = CommandRegistry::with_builtins();
        let peripheral = PeripheralController::degraded(Duration::from_millis(20));
        let ctx = HandlerContext {
            update,
            replies: &outbox,
            peripheral: &peripheral,
            registry: &registry,
            identity,
            version: "@pibot v0.1.0 running on test",
        };
        registry.lookup(command).unwrap().handle(&ctx).await.unwrap();
        let sent = outbox.sent.lock().unwrap();
        sent.iter().map(|(_, text)| text.clone()).collect()
    }

    #[tokio::test]
    async fn test_greeting_uses_display_name() {
        let replies = run("hello", &update(Some("Ada_Lovelace")), None).await;
        assert_eq!(replies, vec!["Hello to you too, Ada_Lovelace"]);
    }

    #[tokio::test]
    async fn test_greeting_without_user() {
        let replies = run("hi", &update(None), None).await;
        assert_eq!(replies, vec!["Hello to you too, stranger"]);
    }

    #[tokio::test]
    async fn test_start_mentions_version() {
        let replies = run("/start", &update(None), None).await;
        assert_eq!(
            replies,
            vec!["Hi, i'm @pibot v0.1.0 running on test. type 'help' to get the command list."]
        );
    }

    #[tokio::test]
    async fn test_who_am_i_and_chat_info() {
        let u = update(Some("Ada"));
        assert_eq!(run("who am i?", &u, None).await, vec!["you're @Ada, (#77)"]);
        assert_eq!(run("chat info", &u, None).await, vec!["chat #5, private"]);
    }

    #[tokio::test]
    async fn test_help_lists_sorted_commands() {
        let replies = run("help", &update(None), None).await;
        let expected = format!(
            "available commands:\n > {}",
            CommandRegistry::with_builtins().list_commands().join("\n > ")
        );
        assert_eq!(replies, vec![expected]);
        assert!(replies[0].starts_with("available commands:\n > /start\n > blink\n"));
    }

    #[tokio::test]
    async fn test_cpu_temp_in_degraded_mode() {
        let replies = run("cpu temp", &update(None), None).await;
        assert_eq!(replies, vec![TEMPERATURE_UNAVAILABLE]);
    }

    #[tokio::test]
    async fn test_led_commands_reply_without_hardware() {
        assert_eq!(run("blink", &update(None), None).await, vec!["let's do this!"]);
        assert_eq!(run("led on", &update(None), None).await, vec!["sure. it's on."]);
        assert_eq!(run("led off", &update(None), None).await, vec!["sure. it's off."]);
    }

    #[tokio::test]
    async fn test_who_are_you_reports_identity() {
        let me = Identity {
            id: 99,
            username: "pibot".into(),
            first_name: "Pi".into(),
        };
        let replies = run("who are you?", &update(None), Some(&me)).await;
        assert_eq!(replies, vec!["I'm pibot (#99)"]);
    }

    #[tokio::test]
    async fn test_led_acts_when_reply_fails() {
        let pin = Arc::new(RecordingPin::default());
        let peripheral =
            PeripheralController::new(Some(pin.clone()), None, Duration::from_millis(20));
        let registry = CommandRegistry::with_builtins();
        let u = update(None);
        let ctx = HandlerContext {
            update: &u,
            replies: &Offline,
            peripheral: &peripheral,
            registry: &registry,
            identity: None,
            version: "@pibot v0.1.0 running on test",
        };

        let led_on = registry.lookup("led on").unwrap();
        assert!(led_on.handle(&ctx).await.is_err());
        assert_eq!(*pin.levels.lock().unwrap(), vec![true]);

        let blink = registry.lookup("blink").unwrap();
        assert!(blink.handle(&ctx).await.is_err());
        assert!(peripheral.is_blinking().await);

        let led_off = registry.lookup("led off").unwrap();
        assert!(led_off.handle(&ctx).await.is_err());
        assert!(!peripheral.is_blinking().await);
        assert_eq!(pin.levels.lock().unwrap().last(), Some(&false));
    }
}
