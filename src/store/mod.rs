//! Persistence seam. The engine talks to storage only through [`DocumentStore`];
//! any backend must enforce the no-overlap constraint on booking writes.

mod memory;

pub use memory::{InMemoryStore, ProviderCalendar};

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::model::{AvailabilityRule, Booking, BookingStatus, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Availability,
    Bookings,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Availability => "availability",
            Collection::Bookings => "bookings",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFilter {
    pub tenant: Ulid,
    pub provider: Option<Ulid>,
    pub active_only: bool,
}

impl RuleFilter {
    pub fn tenant(tenant: Ulid) -> Self {
        Self {
            tenant,
            provider: None,
            active_only: false,
        }
    }

    /// Active rules of one provider.
    pub fn active_for(tenant: Ulid, provider: Ulid) -> Self {
        Self {
            tenant,
            provider: Some(provider),
            active_only: true,
        }
    }

    pub fn matches(&self, rule: &AvailabilityRule) -> bool {
        rule.tenant == self.tenant
            && self.provider.is_none_or(|p| p == rule.provider)
            && (!self.active_only || rule.is_active)
    }
}

/// Booking query. Tenant is mandatory; every other clause narrows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingFilter {
    pub tenant: Ulid,
    pub provider: Option<Ulid>,
    /// Empty means any status.
    pub statuses: Vec<BookingStatus>,
    /// Inclusive bounds on `start_date_time`.
    pub start_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub overlapping: Option<Span>,
    pub limit: Option<usize>,
}

impl BookingFilter {
    pub fn tenant(tenant: Ulid) -> Self {
        Self {
            tenant,
            provider: None,
            statuses: Vec::new(),
            start_between: None,
            overlapping: None,
            limit: None,
        }
    }

    pub fn provider(mut self, provider: Ulid) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Only bookings that occupy the calendar.
    pub fn active(mut self) -> Self {
        self.statuses = BookingStatus::ACTIVE.to_vec();
        self
    }

    pub fn statuses(mut self, statuses: &[BookingStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub fn start_between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.start_between = Some((from, to));
        self
    }

    pub fn overlapping(mut self, span: Span) -> Self {
        self.overlapping = Some(span);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Every clause except `limit`.
    pub fn matches(&self, booking: &Booking) -> bool {
        booking.tenant == self.tenant
            && self.provider.is_none_or(|p| p == booking.provider)
            && (self.statuses.is_empty() || self.statuses.contains(&booking.status))
            && self
                .start_between
                .is_none_or(|(from, to)| from <= booking.start_date_time && booking.start_date_time <= to)
            && self
                .overlapping
                .is_none_or(|span| span.overlaps(&booking.span()))
    }
}

#[derive(Debug, Clone)]
pub enum StoreError {
    NotFound { collection: Collection, id: Ulid },
    AlreadyExists { collection: Collection, id: Ulid },
    /// The write would put two active bookings of one provider on overlapping time.
    Overlap(Vec<Booking>),
    /// The booking's stored status moved on since it was read.
    StatusChanged { id: Ulid, current: BookingStatus },
    /// The write is not allowed by the backend (e.g. moving a booking between providers).
    Rejected(String),
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { collection, id } => {
                write!(f, "{} document not found: {id}", collection.as_str())
            }
            StoreError::AlreadyExists { collection, id } => {
                write!(f, "{} document already exists: {id}", collection.as_str())
            }
            StoreError::Overlap(existing) => {
                write!(f, "overlaps {} active booking(s)", existing.len())
            }
            StoreError::StatusChanged { id, current } => {
                write!(f, "booking {id} is now {current}")
            }
            StoreError::Rejected(msg) => write!(f, "write rejected: {msg}"),
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_rules(&self, filter: &RuleFilter) -> Result<Vec<AvailabilityRule>, StoreError>;

    async fn get_rule(&self, tenant: Ulid, id: Ulid) -> Result<Option<AvailabilityRule>, StoreError>;

    async fn create_rule(&self, rule: AvailabilityRule) -> Result<AvailabilityRule, StoreError>;

    /// Replace an existing rule of the same tenant.
    async fn update_rule(&self, rule: AvailabilityRule) -> Result<AvailabilityRule, StoreError>;

    /// Matching bookings ordered by start time.
    async fn find_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, StoreError>;

    async fn get_booking(&self, tenant: Ulid, id: Ulid) -> Result<Option<Booking>, StoreError>;

    /// Insert a booking. When it is active, the check against other active
    /// bookings of the same tenant and provider and the insert happen atomically;
    /// an overlap fails with [`StoreError::Overlap`].
    async fn create_booking(&self, booking: Booking) -> Result<Booking, StoreError>;

    /// Replace an existing booking under the same overlap constraint,
    /// ignoring the booking's own previous version. The write only happens
    /// while the stored status is still `expected`; otherwise it fails with
    /// [`StoreError::StatusChanged`].
    async fn update_booking(&self, booking: Booking, expected: BookingStatus) -> Result<Booking, StoreError>;
}
