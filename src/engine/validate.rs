use crate::limits::*;
use crate::model::*;
use crate::split::SplitConfiguration;

use super::EngineError;

fn invalid(msg: impl Into<String>) -> EngineError {
    EngineError::Validation(msg.into())
}

pub(crate) fn booking_duration(minutes: u32) -> Result<(), EngineError> {
    if minutes == 0 {
        return Err(invalid("duration must be positive"));
    }
    if minutes > MAX_BOOKING_MINUTES {
        return Err(EngineError::LimitExceeded("booking too long"));
    }
    Ok(())
}

fn title(title: &str) -> Result<(), EngineError> {
    if title.trim().is_empty() {
        return Err(invalid("title is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(EngineError::LimitExceeded("title too long"));
    }
    Ok(())
}

/// Everything checkable without touching storage.
pub(crate) fn booking_request(
    request: &BookingRequest,
    split: &SplitConfiguration,
) -> Result<(), EngineError> {
    booking_duration(request.duration)?;
    title(&request.title)?;
    let amount = request.pricing.amount;
    if !amount.is_finite() || amount < 0.0 {
        return Err(invalid("amount must be a non-negative number"));
    }
    if request.pricing.currency.trim().is_empty() {
        return Err(invalid("currency is required"));
    }
    split.validate().map_err(|e| invalid(e.to_string()))?;
    Ok(())
}

pub(crate) fn availability_rule(rule: &AvailabilityRule) -> Result<(), EngineError> {
    title(&rule.title)?;
    match &rule.schedule {
        Schedule::Weekly {
            day_of_week,
            start_time,
            end_time,
        } => {
            if *day_of_week > 6 {
                return Err(invalid("dayOfWeek must be 0 (Sunday) through 6 (Saturday)"));
            }
            if start_time >= end_time {
                return Err(invalid("start time must be before end time"));
            }
        }
        Schedule::DateRange {
            start_date,
            end_date,
            start_time,
            end_time,
        } => {
            if start_date > end_date {
                return Err(invalid("start date must be before or equal to end date"));
            }
            if start_time >= end_time {
                return Err(invalid("start time must be before end time"));
            }
        }
        Schedule::OneTime {
            start_date_time,
            end_date_time,
        } => {
            if start_date_time >= end_date_time {
                return Err(invalid("start datetime must be before end datetime"));
            }
        }
    }
    if rule.slot_duration == 0 {
        return Err(invalid("slotDuration must be positive"));
    }
    if rule.slot_duration > MAX_SLOT_MINUTES {
        return Err(EngineError::LimitExceeded("slot too long"));
    }
    if rule.buffer_time > MAX_BUFFER_MINUTES {
        return Err(EngineError::LimitExceeded("buffer too long"));
    }
    if rule.min_advance_booking.is_some_and(|h| h > MAX_MIN_ADVANCE_HOURS) {
        return Err(EngineError::LimitExceeded("minAdvanceBooking too large"));
    }
    if rule.max_advance_booking.is_some_and(|d| d > MAX_ADVANCE_DAYS) {
        return Err(EngineError::LimitExceeded("maxAdvanceBooking too large"));
    }
    if rule.exceptions.len() > MAX_EXCEPTIONS_PER_RULE {
        return Err(EngineError::LimitExceeded("too many exceptions"));
    }
    if rule.service_types.len() > MAX_SERVICE_TYPES_PER_RULE {
        return Err(EngineError::LimitExceeded("too many service types"));
    }
    for exception in &rule.exceptions {
        if let Some(alt) = &exception.alternative_availability
            && alt.start_time >= alt.end_time
        {
            return Err(invalid(format!(
                "alternative availability on {} must start before it ends",
                exception.date
            )));
        }
    }
    Ok(())
}
