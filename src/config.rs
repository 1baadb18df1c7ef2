use std::fmt;

use crate::limits::{MAX_ADVANCE_DAYS, MAX_MIN_ADVANCE_HOURS};
use crate::split::{InvalidSplit, SplitConfiguration};

/// Engine tunables. Every field has a default; `from_env` overrides from
/// `SLOTBOOK_*` variables.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Minutes; used when neither the rule nor the query sets a slot length.
    pub default_slot_duration: u32,
    /// Hours of notice required when a rule leaves `minAdvanceBooking` unset.
    pub default_min_advance_hours: u32,
    /// Days ahead a new rule accepts bookings when created without a limit.
    pub default_max_advance_days: u32,
    pub default_split: SplitConfiguration,
    pub harmonic_days_before: u32,
    pub harmonic_days_after: u32,
    pub harmonic_max_alternatives: usize,
    /// Alternatives at least this far from now score a lead-time bonus.
    pub harmonic_lead_hours: u32,
    pub metrics_port: Option<u16>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_slot_duration: 60,
            default_min_advance_hours: 1,
            default_max_advance_days: 30,
            default_split: SplitConfiguration::ULTIMATE_FAIR,
            harmonic_days_before: 3,
            harmonic_days_after: 7,
            harmonic_max_alternatives: 5,
            harmonic_lead_hours: 24,
            metrics_port: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// `SLOTBOOK_DEFAULT_SPLIT` is not four comma-separated numbers.
    MalformedSplit(String),
    InvalidSplit(InvalidSplit),
    /// A duration setting of zero would stall slot generation.
    Zero(&'static str),
    /// A default above the cap every rule is validated against.
    TooLarge { name: &'static str, max: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MalformedSplit(raw) => write!(
                f,
                "SLOTBOOK_DEFAULT_SPLIT must be four comma-separated percentages, got {raw:?}"
            ),
            ConfigError::InvalidSplit(e) => write!(f, "SLOTBOOK_DEFAULT_SPLIT: {e}"),
            ConfigError::Zero(name) => write!(f, "{name} must be greater than zero"),
            ConfigError::TooLarge { name, max } => write!(f, "{name} must be at most {max}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable numbers fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        fn num<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
            default: T,
        ) -> T {
            lookup(key)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(default)
        }

        let d = Self::default();
        let default_split = match lookup("SLOTBOOK_DEFAULT_SPLIT") {
            Some(raw) => parse_split(&raw)?,
            None => d.default_split,
        };
        let config = Self {
            default_slot_duration: num(&lookup, "SLOTBOOK_DEFAULT_SLOT_MINUTES", d.default_slot_duration),
            default_min_advance_hours: num(&lookup, "SLOTBOOK_MIN_ADVANCE_HOURS", d.default_min_advance_hours),
            default_max_advance_days: num(&lookup, "SLOTBOOK_MAX_ADVANCE_DAYS", d.default_max_advance_days),
            default_split,
            harmonic_days_before: num(&lookup, "SLOTBOOK_HARMONIC_DAYS_BEFORE", d.harmonic_days_before),
            harmonic_days_after: num(&lookup, "SLOTBOOK_HARMONIC_DAYS_AFTER", d.harmonic_days_after),
            harmonic_max_alternatives: num(
                &lookup,
                "SLOTBOOK_HARMONIC_MAX_ALTERNATIVES",
                d.harmonic_max_alternatives,
            ),
            harmonic_lead_hours: num(&lookup, "SLOTBOOK_HARMONIC_LEAD_HOURS", d.harmonic_lead_hours),
            metrics_port: lookup("SLOTBOOK_METRICS_PORT").and_then(|s| s.trim().parse().ok()),
        };
        if config.default_slot_duration == 0 {
            return Err(ConfigError::Zero("SLOTBOOK_DEFAULT_SLOT_MINUTES"));
        }
        if config.default_min_advance_hours > MAX_MIN_ADVANCE_HOURS {
            return Err(ConfigError::TooLarge {
                name: "SLOTBOOK_MIN_ADVANCE_HOURS",
                max: MAX_MIN_ADVANCE_HOURS,
            });
        }
        if config.default_max_advance_days > MAX_ADVANCE_DAYS {
            return Err(ConfigError::TooLarge {
                name: "SLOTBOOK_MAX_ADVANCE_DAYS",
                max: MAX_ADVANCE_DAYS,
            });
        }
        Ok(config)
    }
}

fn parse_split(raw: &str) -> Result<SplitConfiguration, ConfigError> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| ConfigError::MalformedSplit(raw.to_string()))?;
    let &[provider_share, platform_share, operations_share, justice_share] = parts.as_slice() else {
        return Err(ConfigError::MalformedSplit(raw.to_string()));
    };
    let split = SplitConfiguration {
        provider_share,
        platform_share,
        operations_share,
        justice_share,
    };
    split.validate().map_err(ConfigError::InvalidSplit)?;
    Ok(split)
}
