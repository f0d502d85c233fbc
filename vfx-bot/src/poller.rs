//! Long-polling update loop
//!
//! Fetches updates in order, advances the offset past every update seen
//! (handled or not) and hands each event to a per-user queue. One user's
//! events run strictly in arrival order; different users run in parallel.
//! Transport errors back off exponentially instead of ending the loop.

use crate::error::Result;
use crate::handlers::Bot;
use crate::telegram::{TelegramClient, Update};
use crate::transport::ChatTransport;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vfx_common::{TransformInvoker, UserId};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Source of raw updates
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Updates with `update_id >= offset`, waiting up to `timeout` for one
    async fn fetch_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>>;
}

#[async_trait]
impl UpdateSource for TelegramClient {
    async fn fetch_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>> {
        self.get_updates(offset, timeout).await
    }
}

/// Capped exponential backoff
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    initial: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            current: initial,
            initial,
            max,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(INITIAL_BACKOFF, MAX_BACKOFF)
    }
}

/// In-flight work, chained per user
///
/// Each new task first awaits the previous task of the same user, so a
/// user's events never overlap.
#[derive(Debug, Default)]
pub struct UserQueues {
    tails: HashMap<UserId, JoinHandle<()>>,
}

impl UserQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `work` behind everything already queued for `user_id`
    pub fn push<F>(&mut self, user_id: UserId, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let previous = self.tails.remove(&user_id);
        let handle = tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            work.await
        });
        self.tails.insert(user_id, handle);
    }

    /// Forget users whose queue has run dry
    pub fn prune(&mut self) {
        self.tails.retain(|_, handle| !handle.is_finished());
    }

    /// Users with queued or running work
    pub fn len(&self) -> usize {
        self.tails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tails.is_empty()
    }

    /// Wait for all queued work
    pub async fn drain(self) {
        for (_, handle) in self.tails {
            let _ = handle.await;
        }
    }
}

/// Poll until `shutdown` flips to true, then wait up to `drain_timeout`
/// for in-flight updates
pub async fn run<T, I>(
    bot: Arc<Bot<T, I>>,
    poll_timeout: Duration,
    drain_timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) where
    T: ChatTransport + UpdateSource + 'static,
    I: TransformInvoker + 'static,
{
    let mut offset: i64 = 0;
    let mut backoff = Backoff::default();
    let mut queues = UserQueues::new();

    info!("Polling for updates");

    while !*shutdown.borrow() {
        let result = tokio::select! {
            _ = shutdown.changed() => break,
            result = bot.transport().fetch_updates(offset, poll_timeout) => result,
        };

        let updates = match result {
            Ok(updates) => {
                backoff.reset();
                updates
            }
            Err(e) => {
                let delay = backoff.next_delay();
                warn!(error = %e, retry_in_secs = delay.as_secs(), "Failed to fetch updates");
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = tokio::time::sleep(delay) => continue,
                }
            }
        };

        queues.prune();

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let update_id = update.update_id;
            match update.into_event() {
                Some(event) => {
                    let bot = Arc::clone(&bot);
                    queues.push(event.user_id, async move { bot.handle(event).await });
                }
                None => debug!(update_id, "Skipping unsupported update"),
            }
        }
    }

    queues.prune();
    if queues.is_empty() {
        info!("Poller stopped");
        return;
    }

    info!(users = queues.len(), "Poller stopped, waiting for in-flight updates");
    if tokio::time::timeout(drain_timeout, queues.drain()).await.is_err() {
        warn!("In-flight updates did not finish within {:?}", drain_timeout);
    }
}
