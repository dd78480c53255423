//! Named redirect channels
//!
//! The authorization window publishes a [`RedirectMessage`] on a channel named
//! after the provider; the initiating view holds a [`RedirectSubscription`]
//! for as long as it cares. Dropping the subscription releases it, and the
//! hub forgets a channel once its last subscriber is gone.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::broadcast;

use crate::models::RedirectMessage;

const CHANNEL_CAPACITY: usize = 16;

/// Channel name used for a provider target, e.g. `github_oauth_channel`
#[must_use]
pub fn channel_name(target: &str) -> String {
    format!("{}_oauth_channel", target.to_lowercase())
}

struct ChannelEntry {
    sender: broadcast::Sender<RedirectMessage>,
    subscribers: usize,
    generation: u64,
}

#[derive(Default)]
struct HubInner {
    channels: HashMap<String, ChannelEntry>,
    next_generation: u64,
}

/// Registry of named redirect channels
#[derive(Clone, Default)]
pub struct RedirectHub {
    inner: Arc<Mutex<HubInner>>,
}

impl RedirectHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a subscription on `name`, creating the channel on first use
    #[must_use]
    pub fn subscribe(&self, name: &str) -> RedirectSubscription {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let fresh_generation = inner.next_generation + 1;
        let entry = inner
            .channels
            .entry(name.to_string())
            .or_insert_with(|| ChannelEntry {
                sender: broadcast::channel(CHANNEL_CAPACITY).0,
                subscribers: 0,
                generation: fresh_generation,
            });
        entry.subscribers += 1;

        let subscription = RedirectSubscription {
            name: name.to_string(),
            generation: entry.generation,
            receiver: entry.sender.subscribe(),
            hub: Arc::downgrade(&self.inner),
        };
        if subscription.generation == fresh_generation {
            inner.next_generation = fresh_generation;
        }
        subscription
    }

    /// Post a message; returns how many subscribers received it
    ///
    /// Messages on a channel nobody listens to are dropped.
    pub fn publish(&self, name: &str, message: RedirectMessage) -> usize {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match inner.channels.get(name) {
            Some(entry) => entry.sender.send(message).unwrap_or(0),
            None => {
                log::debug!("No listener on {name}, redirect dropped");
                0
            }
        }
    }

    /// Close a channel; subscribers drain buffered messages and then end
    pub fn close(&self, name: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.channels.remove(name);
    }

    /// Live subscriptions on `name`
    #[must_use]
    pub fn subscriber_count(&self, name: &str) -> usize {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.channels.get(name).map_or(0, |entry| entry.subscribers)
    }
}

/// Scoped listener on one redirect channel
pub struct RedirectSubscription {
    name: String,
    generation: u64,
    receiver: broadcast::Receiver<RedirectMessage>,
    hub: Weak<Mutex<HubInner>>,
}

impl RedirectSubscription {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the next message; `None` once the channel is closed
    pub async fn recv(&mut self) -> Option<RedirectMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Redirect listener on {} skipped {skipped} messages", self.name);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Release the subscription explicitly
    pub fn close(self) {}
}

impl Drop for RedirectSubscription {
    fn drop(&mut self) {
        let Some(inner) = self.hub.upgrade() else {
            return;
        };
        let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
        let remove = match inner.channels.get_mut(&self.name) {
            // a closed and recreated channel is not ours to decrement
            Some(entry) if entry.generation == self.generation => {
                entry.subscribers = entry.subscribers.saturating_sub(1);
                entry.subscribers == 0
            }
            _ => false,
        };
        if remove {
            inner.channels.remove(&self.name);
        }
    }
}
