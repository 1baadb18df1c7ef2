use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::model::*;

use super::slots::{generate_time_slots, merge_overlapping_slots, SlotParams};

// ── Per-day rule resolution ───────────────────────────────────────

/// Inputs shared by every day of one availability query.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DayContext {
    pub fallback_slot_duration: u32,
    pub default_min_advance_hours: u32,
    pub service_type: Option<ServiceType>,
    pub now: DateTime<Utc>,
}

/// First exception on `date` across all of the provider's active rules. Any
/// exception closes the whole day for that provider.
pub fn blocking_exception(rules: &[AvailabilityRule], date: NaiveDate) -> Option<&AvailabilityException> {
    rules
        .iter()
        .filter(|r| r.is_active)
        .find_map(|r| r.exception_on(date))
}

/// Active rules whose schedule opens on `date` and that accept `service_type`.
pub fn applicable_rules(
    rules: &[AvailabilityRule],
    date: NaiveDate,
    service_type: Option<ServiceType>,
) -> impl Iterator<Item = &AvailabilityRule> {
    rules
        .iter()
        .filter(move |r| r.is_active && r.schedule.applies_on(date) && r.accepts_service(service_type))
}

/// Merged slots for one calendar date.
pub(crate) fn daily_slots(
    date: NaiveDate,
    rules: &[AvailabilityRule],
    bookings: &[Booking],
    ctx: &DayContext,
) -> Vec<TimeSlot> {
    if let Some(exception) = blocking_exception(rules, date) {
        if exception.alternative_availability.is_some() {
            debug!("{date}: exception carries alternative hours; day stays closed");
        }
        return Vec::new();
    }

    let mut slots = Vec::new();
    for rule in applicable_rules(rules, date, ctx.service_type) {
        let Some(window) = rule.schedule.window_on(date) else {
            continue;
        };
        let params = SlotParams::from_rule(rule, ctx.fallback_slot_duration, ctx.default_min_advance_hours);
        slots.extend(generate_time_slots(&window, &params, bookings, ctx.now));
    }
    merge_overlapping_slots(slots)
}
