use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::*;

use super::{BookingEngine, EngineError};

const HOURLY_PENALTY: f64 = 2.0;
const SAME_DAY_BONUS: f64 = 20.0;
const NEAR_TIME_BONUS: f64 = 15.0;
const NEAR_TIME_HOURS: f64 = 4.0;
const LEAD_TIME_BONUS: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// 0..=100, higher is closer to what was asked for.
    pub harmonic_score: f64,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmonicResolution {
    pub solution: String,
    pub alternatives: Vec<AlternativeSlot>,
}

fn distance(a: DateTime<Utc>, b: DateTime<Utc>) -> Duration {
    if a > b { a - b } else { b - a }
}

/// Proximity score in `[0, 100]`: 100 minus 2 per hour away, plus bonuses for
/// the same UTC day, being within four hours, and leaving at least
/// `lead_time` before the alternative starts.
pub fn calculate_harmonic_score(
    requested: DateTime<Utc>,
    alternative: DateTime<Utc>,
    now: DateTime<Utc>,
    lead_time: Duration,
) -> f64 {
    let hours = distance(requested, alternative).num_minutes() as f64 / 60.0;
    let mut score = 100.0 - hours * HOURLY_PENALTY;
    if requested.date_naive() == alternative.date_naive() {
        score += SAME_DAY_BONUS;
    }
    if hours < NEAR_TIME_HOURS {
        score += NEAR_TIME_BONUS;
    }
    if alternative - now >= lead_time {
        score += LEAD_TIME_BONUS;
    }
    score.clamp(0.0, 100.0)
}

impl BookingEngine {
    /// Rank open times near a request that could not be booked. Best effort:
    /// an empty list is a valid answer.
    pub async fn resolve_booking_harmonically(
        &self,
        request: &BookingRequest,
        conflicts: &[BookingConflict],
    ) -> Result<HarmonicResolution, EngineError> {
        super::validate::booking_duration(request.duration)?;
        let requested = request.start_date_time;
        let before = Duration::days(i64::from(self.config.harmonic_days_before));
        let after = Duration::days(i64::from(self.config.harmonic_days_after));
        let query = AvailabilityQuery::new(
            request.provider_id,
            request.tenant_id,
            requested - before,
            requested + after,
        )
        .service_type(request.booking_type)
        .slot_duration(request.duration);

        let slots = self.get_available_slots(&query).await?;
        let now = self.now();
        let needed = Duration::minutes(i64::from(request.duration));
        let lead_time = Duration::hours(i64::from(self.config.harmonic_lead_hours));

        let mut alternatives: Vec<AlternativeSlot> = slots
            .iter()
            .filter(|s| s.is_open())
            .filter(|s| distance(s.start_time, requested) < after)
            .filter(|s| s.end_time - s.start_time >= needed)
            .map(|s| AlternativeSlot {
                start_time: s.start_time,
                end_time: s.start_time + needed,
                harmonic_score: calculate_harmonic_score(requested, s.start_time, now, lead_time),
                suggestion: format!("Alternative time: {}", s.start_time.format("%a %b %-d %Y %H:%M UTC")),
            })
            .collect();
        alternatives.sort_by(|a, b| {
            b.harmonic_score
                .total_cmp(&a.harmonic_score)
                .then_with(|| distance(a.start_time, requested).cmp(&distance(b.start_time, requested)))
        });
        alternatives.truncate(self.config.harmonic_max_alternatives);

        metrics::histogram!(crate::observability::HARMONIC_ALTERNATIVES).record(alternatives.len() as f64);
        let solution = match (conflicts.len(), alternatives.len()) {
            (0, _) => "Requested time has no conflicts".to_string(),
            (_, 0) => format!(
                "Requested time conflicts with {} booking(s); no open alternatives nearby",
                conflicts.len()
            ),
            (c, a) => format!("Requested time conflicts with {c} booking(s); {a} alternative(s) found"),
        };
        Ok(HarmonicResolution {
            solution,
            alternatives,
        })
    }
}
