use std::fmt;

use serde::{Deserialize, Serialize};

/// Percentage split of a booking's revenue. Shares sum to 100 within
/// [`SplitConfiguration::TOLERANCE`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitConfiguration {
    pub provider_share: f64,
    pub platform_share: f64,
    pub operations_share: f64,
    pub justice_share: f64,
}

impl SplitConfiguration {
    /// 60 / 20 / 15 / 5.
    pub const ULTIMATE_FAIR: Self = Self {
        provider_share: 60.0,
        platform_share: 20.0,
        operations_share: 15.0,
        justice_share: 5.0,
    };

    pub const TOLERANCE: f64 = 0.01;

    pub fn total(&self) -> f64 {
        self.provider_share + self.platform_share + self.operations_share + self.justice_share
    }

    pub fn validate(&self) -> Result<(), InvalidSplit> {
        for (name, share) in [
            ("providerShare", self.provider_share),
            ("platformShare", self.platform_share),
            ("operationsShare", self.operations_share),
            ("justiceShare", self.justice_share),
        ] {
            if !share.is_finite() || share < 0.0 {
                return Err(InvalidSplit::Share { name, value: share });
            }
        }
        let total = self.total();
        if (total - 100.0).abs() > Self::TOLERANCE {
            return Err(InvalidSplit::Total(total));
        }
        Ok(())
    }
}

impl Default for SplitConfiguration {
    fn default() -> Self {
        Self::ULTIMATE_FAIR
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InvalidSplit {
    Share { name: &'static str, value: f64 },
    Total(f64),
}

impl fmt::Display for InvalidSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidSplit::Share { name, value } => {
                write!(f, "{name} must be a non-negative percentage, got {value}")
            }
            InvalidSplit::Total(total) => write!(
                f,
                "payment split percentages must sum to 100%, current total: {total}%"
            ),
        }
    }
}

impl std::error::Error for InvalidSplit {}

/// Currencies without a minor unit.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &["jpy", "krw"];

fn minor_units_per_major(currency: &str) -> f64 {
    if ZERO_DECIMAL_CURRENCIES
        .iter()
        .any(|c| c.eq_ignore_ascii_case(currency))
    {
        1.0
    } else {
        100.0
    }
}

/// Concrete amounts for one booking. Amounts are in major units, each share
/// rounded to the currency's minor unit independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSplit {
    pub total_amount: f64,
    pub currency: String,
    pub provider_amount: f64,
    pub platform_amount: f64,
    pub operations_amount: f64,
    pub justice_amount: f64,
    /// Everything that does not go to the provider.
    pub application_fee: f64,
    pub net_to_provider: f64,
}

impl PaymentSplit {
    pub fn calculate(amount: f64, currency: &str, split: &SplitConfiguration) -> Self {
        let unit = minor_units_per_major(currency);
        let share = |pct: f64| (amount * unit * pct / 100.0).round() / unit;
        let provider_amount = share(split.provider_share);
        let platform_amount = share(split.platform_share);
        let operations_amount = share(split.operations_share);
        let justice_amount = share(split.justice_share);
        let application_fee =
            ((platform_amount + operations_amount + justice_amount) * unit).round() / unit;
        Self {
            total_amount: amount,
            currency: currency.to_ascii_lowercase(),
            provider_amount,
            platform_amount,
            operations_amount,
            justice_amount,
            application_fee,
            net_to_provider: provider_amount,
        }
    }

    pub fn breakdown(&self) -> SplitBreakdown {
        let line = |amount: f64, description: &str| ShareLine {
            amount,
            percentage: if self.total_amount > 0.0 {
                (amount / self.total_amount * 100.0).round()
            } else {
                0.0
            },
            description: description.to_string(),
        };
        SplitBreakdown {
            provider: line(self.provider_amount, "Service provider earnings"),
            platform: line(self.platform_amount, "Platform development and maintenance"),
            operations: line(self.operations_amount, "Operations and support"),
            justice: line(self.justice_amount, "Community justice fund"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareLine {
    pub amount: f64,
    pub percentage: f64,
    pub description: String,
}

/// Human-facing view of a [`PaymentSplit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitBreakdown {
    pub provider: ShareLine,
    pub platform: ShareLine,
    pub operations: ShareLine,
    pub justice: ShareLine,
}
