use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::commands::normalize;
use crate::dispatch::Dispatcher;
use crate::error::BotError;
use crate::platform::{reply_to, BotApi, Identity};
use crate::update::{update_id_of, Update};

/// Updates requested per `getUpdates` call
pub const PAGE_SIZE: u32 = 10;

/// Marker prepended to mirrored text while echo mode is on
pub const ECHO_PREFIX: &str = "you said: ";

/// Process-wide state for one run of the bot.
///
/// The dispatcher toggles echo mode; only the polling loop moves the cursor.
#[derive(Debug, Default)]
pub struct Session {
    identity: Option<Identity>,
    echo_mode: bool,
    last_update_id: Option<i64>,
}

impl Session {
    pub fn new(echo_mode: bool) -> Self {
        Self {
            echo_mode,
            ..Default::default()
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn echo_mode(&self) -> bool {
        self.echo_mode
    }

    pub(crate) fn set_echo_mode(&mut self, enabled: bool) {
        self.echo_mode = enabled;
    }

    pub fn last_update_id(&self) -> Option<i64> {
        self.last_update_id
    }

    /// Offset for the next fetch; `None` until an update has been seen.
    pub fn next_offset(&self) -> Option<i64> {
        self.last_update_id.map(|id| id.saturating_add(1))
    }

    fn advance(&mut self, update_id: i64) {
        if self.last_update_id.map_or(true, |last| update_id > last) {
            self.last_update_id = Some(update_id);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Uninitialized,
    IdentityChecked,
    Polling,
    Terminated,
}

/// Fetch → parse → dispatch driver around a [`BotApi`].
pub struct PollingLoop<A: BotApi> {
    api: A,
    dispatcher: Dispatcher,
    session: Session,
    polling_period: Duration,
    state: LoopState,
}

impl<A: BotApi> PollingLoop<A> {
    pub fn new(
        api: A,
        dispatcher: Dispatcher,
        echo_mode: bool,
        polling_period: Duration,
    ) -> Self {
        Self {
            api,
            dispatcher,
            session: Session::new(echo_mode),
            polling_period,
            state: LoopState::Uninitialized,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Ask the service who we are. Failure is fatal: the loop never polls.
    pub async fn check_identity(&mut self) -> Result<(), BotError> {
        match self.api.get_me().await {
            Ok(me) => {
                info!("{} is alive! [#{}]", me.first_name, me.id);
                self.session.identity = Some(me);
                self.state = LoopState::IdentityChecked;
                Ok(())
            }
            Err(e) => {
                self.state = LoopState::Terminated;
                Err(BotError::IdentityCheck(e.to_string()))
            }
        }
    }

    /// Drain the pending backlog page by page, then return.
    pub async fn run_once(&mut self) -> Result<(), BotError> {
        self.check_identity().await?;
        self.state = LoopState::Polling;

        loop {
            let Some(batch) = self.fetch().await else {
                break;
            };
            let full_page = batch.len() >= PAGE_SIZE as usize;
            let cursor = self.session.last_update_id();
            for raw in &batch {
                self.process(raw).await;
            }
            tokio::time::sleep(self.polling_period).await;
            if !full_page {
                break;
            }
            if self.session.last_update_id() == cursor {
                warn!("Full page did not move the cursor, stopping");
                break;
            }
        }

        info!(
            "last_update: {}",
            self.session
                .last_update_id()
                .map_or_else(|| "none".to_string(), |id| id.to_string())
        );
        Ok(())
    }

    /// Poll until the task is dropped. Only the identity check can fail.
    pub async fn run_forever(&mut self) -> Result<(), BotError> {
        self.check_identity().await?;
        self.state = LoopState::Polling;

        loop {
            match self.fetch().await {
                Some(batch) if !batch.is_empty() => {
                    for raw in &batch {
                        self.process(raw).await;
                        tokio::time::sleep(self.polling_period).await;
                    }
                }
                _ => tokio::time::sleep(self.polling_period).await,
            }
        }
    }

    /// One `getUpdates` call; `None` when the call failed.
    async fn fetch(&self) -> Option<Vec<Value>> {
        let offset = self.session.next_offset();
        match self.api.get_updates(offset, PAGE_SIZE).await {
            Ok(batch) => {
                if !batch.is_empty() {
                    info!("got [{}] updates", batch.len());
                }
                Some(batch)
            }
            Err(e) => {
                warn!(
                    "Fetching updates (offset {:?}) failed, retrying in {:?}: {}",
                    offset, self.polling_period, e
                );
                None
            }
        }
    }

    /// Handle one raw envelope. Never fails: every error is logged here.
    async fn process(&mut self, raw: &Value) {
        let update = match Update::from_envelope(raw) {
            Ok(update) => update,
            Err(e) => {
                warn!("Cannot read update, skipping: {} ({})", e, raw);
                if let Some(id) = update_id_of(raw) {
                    self.session.advance(id);
                }
                return;
            }
        };

        info!(
            "update [#{}]: {} (@{})",
            update.update_id,
            update.text,
            update.user.as_deref().unwrap_or("unknown")
        );
        if let Some(date) = update.date {
            debug!("Update #{} sent at {}", update.update_id, date);
        }

        match AssertUnwindSafe(self.dispatch(&update)).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Update #{} failed: {}", update.update_id, e),
            Err(_) => error!("Update #{} panicked in its handler", update.update_id),
        }

        self.session.advance(update.update_id);
    }

    async fn dispatch(&mut self, update: &Update) -> Result<(), BotError> {
        if self.session.echo_mode {
            let echo = format!("{}{}", ECHO_PREFIX, update.text);
            if let Err(e) = reply_to(&self.api, update, &echo).await {
                warn!("Echo for update #{} not sent: {}", update.update_id, e);
            }
        }

        let command = normalize(&update.text);
        let handled = self
            .dispatcher
            .handle(&command, update, &self.api, self.session.identity())
            .await?;
        if !handled {
            debug!("No handler for '{}', using local dispatch", command);
            self.dispatcher
                .fallback(&command, update, &self.api, &mut self.session)
                .await?;
        }
        Ok(())
    }
}
