use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::{AvailabilityRule, Booking, BookingStatus, Span};

use super::{BookingFilter, Collection, DocumentStore, RuleFilter, StoreError};

/// `(tenant, provider)`.
type CalendarKey = (Ulid, Ulid);

pub type SharedCalendar = Arc<RwLock<ProviderCalendar>>;

/// All bookings of one provider within one tenant, sorted by start.
#[derive(Debug, Clone)]
pub struct ProviderCalendar {
    pub tenant: Ulid,
    pub provider: Ulid,
    bookings: Vec<Booking>,
}

impl ProviderCalendar {
    pub fn new(tenant: Ulid, provider: Ulid) -> Self {
        Self {
            tenant,
            provider,
            bookings: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    /// Insert maintaining sort order by start.
    pub fn insert_booking(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .binary_search_by_key(&booking.start_date_time, |b| b.start_date_time)
            .unwrap_or_else(|e| e);
        self.bookings.insert(pos, booking);
    }

    pub fn remove_booking(&mut self, id: Ulid) -> Option<Booking> {
        let pos = self.bookings.iter().position(|b| b.id == id)?;
        Some(self.bookings.remove(pos))
    }

    /// Bookings overlapping `query`. Binary search skips everything starting
    /// at or after `query.end`.
    pub fn overlapping<'a>(&'a self, query: &'a Span) -> impl Iterator<Item = &'a Booking> {
        let right_bound = self
            .bookings
            .partition_point(|b| b.start_date_time < query.end);
        self.bookings[..right_bound]
            .iter()
            .filter(move |b| query.overlaps(&b.span()))
    }

    /// Active bookings overlapping `query`, other than `exclude`.
    pub fn active_overlapping(&self, query: &Span, exclude: Option<Ulid>) -> Vec<Booking> {
        self.overlapping(query)
            .filter(|b| b.status.is_active() && Some(b.id) != exclude)
            .cloned()
            .collect()
    }
}

/// Process-local [`DocumentStore`]. One lock per provider calendar serializes
/// the overlap check with the write.
pub struct InMemoryStore {
    rules: DashMap<Ulid, AvailabilityRule>,
    calendars: DashMap<CalendarKey, SharedCalendar>,
    booking_to_calendar: DashMap<Ulid, CalendarKey>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            rules: DashMap::new(),
            calendars: DashMap::new(),
            booking_to_calendar: DashMap::new(),
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn booking_count(&self) -> usize {
        self.booking_to_calendar.len()
    }

    fn calendar(&self, key: &CalendarKey) -> Option<SharedCalendar> {
        self.calendars.get(key).map(|e| e.value().clone())
    }

    fn calendar_or_create(&self, key: CalendarKey) -> SharedCalendar {
        self.calendars
            .entry(key)
            .or_insert_with(|| Arc::new(RwLock::new(ProviderCalendar::new(key.0, key.1))))
            .value()
            .clone()
    }

    /// Calendars a filter can touch. Clones the handles so no map guard is held
    /// across an await.
    fn calendars_for(&self, filter: &BookingFilter) -> Vec<SharedCalendar> {
        match filter.provider {
            Some(provider) => self.calendar(&(filter.tenant, provider)).into_iter().collect(),
            None => self
                .calendars
                .iter()
                .filter(|e| e.key().0 == filter.tenant)
                .map(|e| e.value().clone())
                .collect(),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find_rules(&self, filter: &RuleFilter) -> Result<Vec<AvailabilityRule>, StoreError> {
        let mut rules: Vec<AvailabilityRule> = self
            .rules
            .iter()
            .filter(|e| filter.matches(e.value()))
            .map(|e| e.value().clone())
            .collect();
        rules.sort_by_key(|r| r.id);
        Ok(rules)
    }

    async fn get_rule(&self, tenant: Ulid, id: Ulid) -> Result<Option<AvailabilityRule>, StoreError> {
        Ok(self
            .rules
            .get(&id)
            .filter(|r| r.tenant == tenant)
            .map(|r| r.value().clone()))
    }

    async fn create_rule(&self, rule: AvailabilityRule) -> Result<AvailabilityRule, StoreError> {
        match self.rules.entry(rule.id) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists {
                collection: Collection::Availability,
                id: rule.id,
            }),
            Entry::Vacant(slot) => {
                slot.insert(rule.clone());
                Ok(rule)
            }
        }
    }

    async fn update_rule(&self, rule: AvailabilityRule) -> Result<AvailabilityRule, StoreError> {
        match self.rules.get_mut(&rule.id) {
            Some(mut existing) if existing.tenant == rule.tenant => {
                *existing = rule.clone();
                Ok(rule)
            }
            _ => Err(StoreError::NotFound {
                collection: Collection::Availability,
                id: rule.id,
            }),
        }
    }

    async fn find_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, StoreError> {
        let mut out = Vec::new();
        for calendar in self.calendars_for(filter) {
            let guard = calendar.read().await;
            match &filter.overlapping {
                Some(span) => out.extend(guard.overlapping(span).filter(|b| filter.matches(b)).cloned()),
                None => out.extend(guard.bookings().iter().filter(|b| filter.matches(b)).cloned()),
            }
        }
        out.sort_by_key(|b| b.start_date_time);
        if let Some(limit) = filter.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    async fn get_booking(&self, tenant: Ulid, id: Ulid) -> Result<Option<Booking>, StoreError> {
        let Some(key) = self.booking_to_calendar.get(&id).map(|e| *e.value()) else {
            return Ok(None);
        };
        if key.0 != tenant {
            return Ok(None);
        }
        let Some(calendar) = self.calendar(&key) else {
            return Ok(None);
        };
        let guard = calendar.read().await;
        Ok(guard.bookings().iter().find(|b| b.id == id).cloned())
    }

    async fn create_booking(&self, booking: Booking) -> Result<Booking, StoreError> {
        if self.booking_to_calendar.contains_key(&booking.id) {
            return Err(StoreError::AlreadyExists {
                collection: Collection::Bookings,
                id: booking.id,
            });
        }
        let key = (booking.tenant, booking.provider);
        let calendar = self.calendar_or_create(key);
        let mut guard = calendar.write().await;

        if booking.status.is_active() {
            let clashes = guard.active_overlapping(&booking.span(), None);
            if !clashes.is_empty() {
                return Err(StoreError::Overlap(clashes));
            }
        }

        guard.insert_booking(booking.clone());
        self.booking_to_calendar.insert(booking.id, key);
        Ok(booking)
    }

    async fn update_booking(&self, booking: Booking, expected: BookingStatus) -> Result<Booking, StoreError> {
        let not_found = || StoreError::NotFound {
            collection: Collection::Bookings,
            id: booking.id,
        };
        let key = self
            .booking_to_calendar
            .get(&booking.id)
            .map(|e| *e.value())
            .ok_or_else(not_found)?;
        if key.0 != booking.tenant {
            return Err(not_found());
        }
        if key.1 != booking.provider {
            return Err(StoreError::Rejected(format!(
                "booking {} cannot move to another provider",
                booking.id
            )));
        }
        let calendar = self.calendar(&key).ok_or_else(not_found)?;
        let mut guard = calendar.write().await;

        let current = guard
            .bookings()
            .iter()
            .find(|b| b.id == booking.id)
            .map(|b| b.status)
            .ok_or_else(not_found)?;
        if current != expected {
            return Err(StoreError::StatusChanged {
                id: booking.id,
                current,
            });
        }

        if booking.status.is_active() {
            let clashes = guard.active_overlapping(&booking.span(), Some(booking.id));
            if !clashes.is_empty() {
                return Err(StoreError::Overlap(clashes));
            }
        }

        guard.remove_booking(booking.id).ok_or_else(not_found)?;
        guard.insert_booking(booking.clone());
        Ok(booking)
    }
}
