use std::time::Instant;

use chrono::Duration;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::store::{BookingFilter, RuleFilter};

use super::availability::{daily_slots, DayContext};
use super::conflict::booking_conflicts;
use super::validate;
use super::{BookingEngine, EngineError};

impl BookingEngine {
    /// Bookable slots for one provider, one calendar day at a time from the
    /// date of `start_date` through the date of `end_date`, sorted by start.
    pub async fn get_available_slots(&self, query: &AvailabilityQuery) -> Result<Vec<TimeSlot>, EngineError> {
        let started = Instant::now();
        let result = self.compute_slots(query).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(crate::observability::AVAILABILITY_QUERIES_TOTAL, "status" => status).increment(1);
        metrics::histogram!(crate::observability::AVAILABILITY_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        if let Ok(slots) = &result {
            metrics::counter!(crate::observability::SLOTS_GENERATED_TOTAL).increment(slots.len() as u64);
        }
        result
    }

    async fn compute_slots(&self, query: &AvailabilityQuery) -> Result<Vec<TimeSlot>, EngineError> {
        if query.start_date > query.end_date {
            return Err(EngineError::Validation("startDate must not be after endDate".into()));
        }
        let first_day = query.start_date.date_naive();
        let last_day = query.end_date.date_naive();
        if (last_day - first_day).num_days() + 1 > MAX_QUERY_DAYS {
            return Err(EngineError::LimitExceeded("query window too wide"));
        }

        // One extra day catches one-time windows that run past midnight.
        let horizon = Span::new(
            start_of_day(first_day),
            start_of_day(last_day) + Duration::days(2),
        );
        let rule_filter = RuleFilter::active_for(query.tenant_id, query.provider_id);
        let booking_filter = BookingFilter::tenant(query.tenant_id)
            .provider(query.provider_id)
            .active()
            .overlapping(horizon);
        let (rules, bookings) = futures::future::try_join(
            self.store.find_rules(&rule_filter),
            self.store.find_bookings(&booking_filter),
        )
        .await?;

        let ctx = DayContext {
            fallback_slot_duration: query.slot_duration.unwrap_or(self.config.default_slot_duration),
            default_min_advance_hours: self.config.default_min_advance_hours,
            service_type: query.service_type,
            now: self.now(),
        };
        let mut slots: Vec<TimeSlot> = first_day
            .iter_days()
            .take_while(|day| *day <= last_day)
            .flat_map(|day| daily_slots(day, &rules, &bookings, &ctx))
            .collect();
        slots.sort_by_key(|s| s.start_time);

        tracing::debug!(
            "availability for provider {} ({} rules, {} bookings): {} slots",
            query.provider_id,
            rules.len(),
            bookings.len(),
            slots.len()
        );
        Ok(slots)
    }

    /// Active bookings of the same provider and tenant overlapping the request.
    pub async fn check_booking_conflicts(
        &self,
        request: &BookingRequest,
    ) -> Result<Vec<BookingConflict>, EngineError> {
        validate::booking_duration(request.duration)?;
        let span = request.span();
        let filter = BookingFilter::tenant(request.tenant_id)
            .provider(request.provider_id)
            .active()
            .overlapping(span);
        let existing = self.store.find_bookings(&filter).await?;
        Ok(booking_conflicts(&span, &existing))
    }

    pub async fn get_booking(&self, tenant: Ulid, id: Ulid) -> Result<Booking, EngineError> {
        self.store
            .get_booking(tenant, id)
            .await?
            .ok_or(EngineError::NotFound { kind: "booking", id })
    }

    pub async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, EngineError> {
        Ok(self.store.find_bookings(filter).await?)
    }

    pub async fn get_availability_rule(&self, tenant: Ulid, id: Ulid) -> Result<AvailabilityRule, EngineError> {
        self.store
            .get_rule(tenant, id)
            .await?
            .ok_or(EngineError::NotFound { kind: "availability rule", id })
    }

    pub async fn list_availability_rules(&self, filter: &RuleFilter) -> Result<Vec<AvailabilityRule>, EngineError> {
        Ok(self.store.find_rules(filter).await?)
    }
}
