use chrono::{DateTime, Duration, Utc};

use crate::model::*;

// ── Slot generation ───────────────────────────────────────────────

/// Per-window generation parameters, resolved from a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotParams {
    /// Minutes per slot.
    pub slot_duration: u32,
    /// Minutes reserved after every slot.
    pub buffer_time: u32,
    /// Hours of notice before a slot may start.
    pub min_advance_hours: u32,
    /// Days ahead a slot may start. `None` or 0 means unbounded.
    pub max_advance_days: Option<u32>,
}

impl SlotParams {
    /// `fallback_duration` applies when the rule's own slot length is 0;
    /// `default_min_advance` when it leaves the notice period unset.
    pub fn from_rule(rule: &AvailabilityRule, fallback_duration: u32, default_min_advance: u32) -> Self {
        Self {
            slot_duration: if rule.slot_duration > 0 {
                rule.slot_duration
            } else {
                fallback_duration
            },
            buffer_time: rule.buffer_time,
            min_advance_hours: rule.min_advance_booking.unwrap_or(default_min_advance),
            max_advance_days: rule.max_advance_booking,
        }
    }
}

/// Cut `window` into fixed-length slots.
///
/// A slot is emitted only if it fits entirely inside the window. Slots starting
/// before `now + min_advance` or after `now + max_advance` are skipped, advancing
/// the cursor by the slot length alone. A slot that overlaps an active booking is
/// `booked`; otherwise it is `available` and followed by a `buffer` slot when one
/// is configured and fits. Either way the cursor then advances by slot + buffer.
pub fn generate_time_slots(
    window: &Span,
    params: &SlotParams,
    existing: &[Booking],
    now: DateTime<Utc>,
) -> Vec<TimeSlot> {
    if params.slot_duration == 0 {
        return Vec::new();
    }
    let step = Duration::minutes(i64::from(params.slot_duration));
    let buffer = Duration::minutes(i64::from(params.buffer_time));
    // Notice past the calendar's end admits nothing; a horizon past it admits everything.
    let Some(earliest) = now.checked_add_signed(Duration::hours(i64::from(params.min_advance_hours))) else {
        return Vec::new();
    };
    let latest = params
        .max_advance_days
        .filter(|days| *days > 0)
        .and_then(|days| now.checked_add_signed(Duration::days(i64::from(days))));

    let mut slots = Vec::new();
    let mut cursor = window.start;
    while cursor < window.end {
        let slot_end = cursor + step;
        if slot_end > window.end {
            break;
        }
        if cursor < earliest || latest.is_some_and(|latest| cursor > latest) {
            cursor = slot_end;
            continue;
        }

        let span = Span::new(cursor, slot_end);
        let clash = existing
            .iter()
            .find(|b| b.status.is_active() && span.overlaps(&b.span()));
        match clash {
            Some(booking) => slots.push(TimeSlot::booked(span, booking.id)),
            None => {
                slots.push(TimeSlot::available(span));
                let buffer_end = slot_end + buffer;
                if params.buffer_time > 0 && buffer_end <= window.end {
                    slots.push(TimeSlot::buffer(Span::new(slot_end, buffer_end)));
                }
            }
        }
        cursor = slot_end + buffer;
    }
    slots
}

// ── Merging ───────────────────────────────────────────────────────

/// Sort by start and coalesce back-to-back open slots. Booked, blocked and
/// buffer slots pass through untouched.
pub fn merge_overlapping_slots(mut slots: Vec<TimeSlot>) -> Vec<TimeSlot> {
    if slots.len() <= 1 {
        return slots;
    }
    slots.sort_by_key(|s| s.start_time);

    let mut merged: Vec<TimeSlot> = Vec::with_capacity(slots.len());
    for slot in slots {
        if let Some(last) = merged.last_mut()
            && last.is_open()
            && slot.is_open()
            && last.end_time == slot.start_time
        {
            last.end_time = slot.end_time;
            continue;
        }
        merged.push(slot);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use ulid::Ulid;

    use crate::split::SplitConfiguration;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, h, m, 0).unwrap()
    }

    fn params(slot: u32, buffer: u32) -> SlotParams {
        SlotParams {
            slot_duration: slot,
            buffer_time: buffer,
            min_advance_hours: 0,
            max_advance_days: None,
        }
    }

    fn booking(start: DateTime<Utc>, minutes: u32, status: BookingStatus) -> Booking {
        let span = Span::from_minutes(start, minutes);
        Booking {
            id: Ulid::new(),
            tenant: Ulid::new(),
            provider: Ulid::new(),
            client: Ulid::new(),
            title: "Existing".into(),
            description: None,
            booking_type: ServiceType::Service,
            start_date_time: span.start,
            end_date_time: span.end,
            duration: minutes,
            pricing: Pricing {
                amount: 0.0,
                currency: "usd".into(),
                split_configuration: SplitConfiguration::ULTIMATE_FAIR,
            },
            status,
            location: None,
            notifications: NotificationFlags::default(),
            metadata: None,
            created_at: at(0, 0),
            updated_at: at(0, 0),
        }
    }

    fn shape(slots: &[TimeSlot]) -> Vec<(DateTime<Utc>, DateTime<Utc>, SlotType)> {
        slots.iter().map(|s| (s.start_time, s.end_time, s.slot_type)).collect()
    }

    #[test]
    fn eight_hour_window_gives_eight_hourly_slots() {
        let window = Span::new(at(9, 0), at(17, 0));
        let now = at(0, 0) - Duration::days(7);
        let slots = generate_time_slots(&window, &params(60, 0), &[], now);
        assert_eq!(slots.len(), 8);
        assert!(slots.iter().all(|s| s.is_open()));
        assert_eq!(slots[0].start_time, at(9, 0));
        assert_eq!(slots[7].end_time, at(17, 0));
    }

    #[test]
    fn partial_trailing_slot_dropped() {
        let window = Span::new(at(9, 0), at(10, 30));
        let slots = generate_time_slots(&window, &params(60, 0), &[], at(0, 0));
        assert_eq!(shape(&slots), vec![(at(9, 0), at(10, 0), SlotType::Available)]);
    }

    #[test]
    fn buffer_follows_available_slots_when_it_fits() {
        let window = Span::new(at(9, 0), at(10, 50));
        let slots = generate_time_slots(&window, &params(50, 10), &[], at(0, 0));
        assert_eq!(
            shape(&slots),
            vec![
                (at(9, 0), at(9, 50), SlotType::Available),
                (at(9, 50), at(10, 0), SlotType::Buffer),
                (at(10, 0), at(10, 50), SlotType::Available),
            ]
        );
    }

    #[test]
    fn booked_slot_has_no_buffer_but_consumes_it() {
        let window = Span::new(at(9, 0), at(11, 0));
        let existing = booking(at(9, 15), 15, BookingStatus::Confirmed);
        let slots = generate_time_slots(&window, &params(45, 15), std::slice::from_ref(&existing), at(0, 0));
        assert_eq!(
            shape(&slots),
            vec![
                (at(9, 0), at(9, 45), SlotType::Booked),
                (at(10, 0), at(10, 45), SlotType::Available),
                (at(10, 45), at(11, 0), SlotType::Buffer),
            ]
        );
        assert_eq!(slots[0].booking_id, Some(existing.id));
    }

    #[test]
    fn terminal_bookings_are_ignored() {
        let window = Span::new(at(9, 0), at(10, 0));
        let existing = booking(at(9, 0), 60, BookingStatus::Cancelled);
        let slots = generate_time_slots(&window, &params(60, 0), &[existing], at(0, 0));
        assert!(slots[0].is_open());
    }

    #[test]
    fn min_advance_skips_early_slots() {
        let window = Span::new(at(9, 0), at(17, 0));
        let p = SlotParams {
            min_advance_hours: 2,
            ..params(60, 0)
        };
        // now 10:30 → earliest start 12:30
        let slots = generate_time_slots(&window, &p, &[], at(10, 30));
        assert_eq!(slots.first().map(|s| s.start_time), Some(at(13, 0)));
        assert_eq!(slots.len(), 4);
    }

    #[test]
    fn max_advance_caps_far_slots() {
        let window = Span::new(at(9, 0), at(17, 0));
        let p = SlotParams {
            max_advance_days: Some(1),
            ..params(60, 0)
        };
        // now is the previous day at 12:00 → latest start today 12:00
        let now = at(12, 0) - Duration::days(1);
        let slots = generate_time_slots(&window, &p, &[], now);
        assert_eq!(slots.last().map(|s| s.start_time), Some(at(12, 0)));
        assert!(slots.iter().all(|s| s.start_time <= at(12, 0)));
    }

    #[test]
    fn zero_max_advance_is_unbounded() {
        let window = Span::new(at(9, 0), at(11, 0));
        let p = SlotParams {
            max_advance_days: Some(0),
            ..params(60, 0)
        };
        let now = at(0, 0) - Duration::days(400);
        assert_eq!(generate_time_slots(&window, &p, &[], now).len(), 2);
    }

    #[test]
    fn advance_past_the_calendar_end_does_not_overflow() {
        let window = Span::new(at(9, 0), at(11, 0));
        let now = at(0, 0);
        let notice = SlotParams {
            min_advance_hours: u32::MAX,
            ..params(60, 0)
        };
        assert!(generate_time_slots(&window, &notice, &[], now).is_empty());

        let horizon = SlotParams {
            max_advance_days: Some(u32::MAX),
            ..params(60, 0)
        };
        assert_eq!(generate_time_slots(&window, &horizon, &[], now).len(), 2);
    }

    #[test]
    fn zero_slot_duration_yields_nothing() {
        let window = Span::new(at(9, 0), at(10, 0));
        assert!(generate_time_slots(&window, &params(0, 0), &[], at(0, 0)).is_empty());
    }

    #[test]
    fn merge_joins_back_to_back_open_slots() {
        let window = Span::new(at(9, 0), at(17, 0));
        let slots = generate_time_slots(&window, &params(60, 0), &[], at(0, 0));
        let merged = merge_overlapping_slots(slots);
        assert_eq!(shape(&merged), vec![(at(9, 0), at(17, 0), SlotType::Available)]);
    }

    #[test]
    fn merge_stops_at_booked_slot() {
        let window = Span::new(at(9, 0), at(17, 0));
        let existing = booking(at(11, 0), 60, BookingStatus::Confirmed);
        let slots = generate_time_slots(&window, &params(60, 0), &[existing], at(0, 0));
        let merged = merge_overlapping_slots(slots);
        assert_eq!(
            shape(&merged),
            vec![
                (at(9, 0), at(11, 0), SlotType::Available),
                (at(11, 0), at(12, 0), SlotType::Booked),
                (at(12, 0), at(17, 0), SlotType::Available),
            ]
        );
    }

    #[test]
    fn merge_does_not_join_across_gaps_or_buffers() {
        let slots = vec![
            TimeSlot::available(Span::new(at(9, 0), at(9, 50))),
            TimeSlot::buffer(Span::new(at(9, 50), at(10, 0))),
            TimeSlot::available(Span::new(at(10, 0), at(10, 50))),
            TimeSlot::available(Span::new(at(11, 0), at(12, 0))),
        ];
        let merged = merge_overlapping_slots(slots.clone());
        assert_eq!(merged, slots);
    }

    #[test]
    fn merge_sorts_unordered_input() {
        let merged = merge_overlapping_slots(vec![
            TimeSlot::available(Span::new(at(10, 0), at(11, 0))),
            TimeSlot::available(Span::new(at(9, 0), at(10, 0))),
        ]);
        assert_eq!(shape(&merged), vec![(at(9, 0), at(11, 0), SlotType::Available)]);
    }

    #[test]
    fn merge_is_idempotent() {
        let window = Span::new(at(8, 0), at(18, 0));
        let existing = booking(at(12, 0), 30, BookingStatus::Pending);
        let once = merge_overlapping_slots(generate_time_slots(&window, &params(30, 10), &[existing], at(0, 0)));
        let twice = merge_overlapping_slots(once.clone());
        assert_eq!(once, twice);
    }
}
