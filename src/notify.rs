use dashmap::DashMap;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;
use ulid::Ulid;

use crate::model::BookingEvent;

const DEFAULT_CAPACITY: usize = 256;

/// Fan-out of [`BookingEvent`]s to downstream collaborators (reminders,
/// calendar sync, conversation threads). One broadcast channel per tenant.
pub struct NotifyHub {
    capacity: usize,
    tenants: DashMap<Ulid, broadcast::Sender<BookingEvent>>,
}

impl NotifyHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Events buffered per tenant before slow subscribers start lagging.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tenants: DashMap::new(),
        }
    }

    fn sender(&self, tenant: Ulid) -> broadcast::Sender<BookingEvent> {
        self.tenants
            .entry(tenant)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Every event of `tenant`.
    pub fn subscribe(&self, tenant: Ulid) -> Subscription {
        Subscription {
            rx: self.sender(tenant).subscribe(),
            provider: None,
        }
    }

    /// Events of `tenant` that concern `provider` only.
    pub fn subscribe_provider(&self, tenant: Ulid, provider: Ulid) -> Subscription {
        Subscription {
            rx: self.sender(tenant).subscribe(),
            provider: Some(provider),
        }
    }

    /// Publish to the tenant's subscribers. Returns how many received it;
    /// 0 when nobody is listening.
    pub fn send(&self, tenant: Ulid, event: &BookingEvent) -> usize {
        self.tenants
            .get(&tenant)
            .and_then(|tx| tx.send(event.clone()).ok())
            .unwrap_or(0)
    }

    pub fn subscriber_count(&self, tenant: Ulid) -> usize {
        self.tenants.get(&tenant).map_or(0, |tx| tx.receiver_count())
    }

    /// Drop the tenant's channel. Existing subscriptions end after draining.
    pub fn remove(&self, tenant: &Ulid) {
        self.tenants.remove(tenant);
    }
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Subscription {
    rx: broadcast::Receiver<BookingEvent>,
    provider: Option<Ulid>,
}

impl Subscription {
    /// Next matching event, or `None` once the tenant channel is gone. Events
    /// lost to lag are skipped with a warning.
    pub async fn next(&mut self) -> Option<BookingEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    if self.provider.is_none_or(|p| event.provider() == p) {
                        return Some(event);
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!("event subscriber lagged, {missed} event(s) dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
