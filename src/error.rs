use thiserror::Error;

/// Failures the bot distinguishes between.
///
/// Only `Config` and `IdentityCheck` are fatal; everything else is logged
/// by the polling loop and isolated to the update or fetch that caused it.
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Identity check failed: {0}")]
    IdentityCheck(String),

    #[error("{method} request failed: {source}")]
    Request {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} returned HTTP {status}: {body}")]
    Transport {
        method: String,
        status: u16,
        body: String,
    },

    #[error("{method} returned an invalid envelope: {description}")]
    Protocol { method: String, description: String },

    #[error("Malformed update: {0}")]
    MalformedUpdate(String),

    #[error("Handler for '{command}' failed: {source}")]
    Handler {
        command: String,
        #[source]
        source: anyhow::Error,
    },
}

impl BotError {
    #[cfg(test)]
    pub fn is_fatal(&self) -> bool {
        matches!(self, BotError::Config(_) | BotError::IdentityCheck(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_config_and_identity_are_fatal() {
        assert!(BotError::Config("name".into()).is_fatal());
        assert!(BotError::IdentityCheck("ok=false".into()).is_fatal());
        assert!(!BotError::MalformedUpdate("no message".into()).is_fatal());
        assert!(!BotError::Protocol {
            method: "getUpdates".into(),
            description: "missing result".into(),
        }
        .is_fatal());
    }

    #[test]
    fn test_transport_message_names_method_and_status() {
        let err = BotError::Transport {
            method: "sendMessage".into(),
            status: 502,
            body: "Bad Gateway".into(),
        };
        assert_eq!(err.to_string(), "sendMessage returned HTTP 502: Bad Gateway");
    }
}
