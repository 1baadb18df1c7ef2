mod availability;
mod conflict;
mod error;
mod harmonic;
mod mutations;
mod queries;
mod slots;
mod validate;

pub use availability::{applicable_rules, blocking_exception};
pub use conflict::booking_conflicts;
pub use error::EngineError;
pub use harmonic::{calculate_harmonic_score, AlternativeSlot, HarmonicResolution};
pub use slots::{generate_time_slots, merge_overlapping_slots, SlotParams};

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::notify::NotifyHub;
use crate::store::DocumentStore;

/// Availability, conflict detection and booking creation over a
/// [`DocumentStore`]. Stateless apart from its collaborators; every call is
/// scoped to the tenant named in its arguments.
pub struct BookingEngine {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    pub notify: Arc<NotifyHub>,
}

impl BookingEngine {
    pub fn new(store: Arc<dyn DocumentStore>, config: EngineConfig) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            config,
            notify: Arc::new(NotifyHub::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notify(mut self, notify: Arc<NotifyHub>) -> Self {
        self.notify = notify;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
