use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "pibot")]
#[command(about = "Telegram command bot for a Raspberry Pi: polls for messages, answers them, drives an LED.")]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub mode: Option<Mode>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Answer the pending backlog, then exit.
    Once,
    /// Poll for messages until interrupted (default).
    Run,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        self.mode.unwrap_or(Mode::Run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_run_forever() {
        let cli = Cli::parse_from(["pibot"]);
        assert_eq!(cli.mode(), Mode::Run);
        assert_eq!(cli.config, PathBuf::from("config.toml"));
    }

    #[test]
    fn test_once_with_config_path() {
        let cli = Cli::parse_from(["pibot", "--config", "/etc/pibot.toml", "once"]);
        assert_eq!(cli.mode(), Mode::Once);
        assert_eq!(cli.config, PathBuf::from("/etc/pibot.toml"));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Cli::try_parse_from(["pibot", "forever"]).is_err());
    }
}
