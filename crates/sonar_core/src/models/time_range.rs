//! Query time ranges and their resolution to epoch milliseconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SonarError;

/// Unit of a relative time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    /// Thirty days.
    Month,
    /// 365 days.
    Year,
}

impl TimeUnit {
    /// Length of one unit in seconds.
    pub fn seconds(&self) -> i64 {
        match self {
            Self::Second => 1,
            Self::Minute => 60,
            Self::Hour => 60 * 60,
            Self::Day => 60 * 60 * 24,
            Self::Week => 60 * 60 * 24 * 7,
            Self::Month => 60 * 60 * 24 * 30,
            Self::Year => 60 * 60 * 24 * 365,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Second => "second",
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

/// A time range as picked by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TimeRange {
    /// The last `amount` units up to now.
    Relative { amount: i64, unit: TimeUnit },
    /// Fixed endpoints; either may be missing while the picker is incomplete.
    Absolute { start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>> },
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::Relative { amount: 5, unit: TimeUnit::Minute }
    }
}

/// A range resolved to epoch milliseconds. Missing endpoints stay `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolvedTimeRange {
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
}

impl TimeRange {
    /// Preset relative options offered by the picker.
    pub fn presets() -> Vec<TimeRange> {
        vec![
            Self::Relative { amount: 5, unit: TimeUnit::Minute },
            Self::Relative { amount: 30, unit: TimeUnit::Minute },
            Self::Relative { amount: 1, unit: TimeUnit::Hour },
            Self::Relative { amount: 6, unit: TimeUnit::Hour },
        ]
    }

    /// Resolve against `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> ResolvedTimeRange {
        match self {
            Self::Relative { amount, unit } => {
                let end = now.timestamp_millis();
                // An unrepresentable start is left unset and fails validation.
                let start = span_millis(*amount, *unit).and_then(|span| end.checked_sub(span));
                ResolvedTimeRange { start_time: start, end_time: Some(end) }
            }
            Self::Absolute { start, end } => ResolvedTimeRange {
                start_time: start.map(|s| s.timestamp_millis()),
                end_time: end.map(|e| e.timestamp_millis()),
            },
        }
    }

    /// Parse a relative shorthand such as `5m`, `1h` or `7d`.
    pub fn parse_relative(text: &str) -> Result<Self, SonarError> {
        let text = text.trim();
        let split = text
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| SonarError::validation(format!("Missing unit in time range '{text}'")))?;
        let (digits, suffix) = text.split_at(split);

        let amount: i64 = digits
            .parse()
            .map_err(|_| SonarError::validation(format!("Invalid amount in time range '{text}'")))?;
        if amount <= 0 {
            return Err(SonarError::validation("Invalid date range."));
        }

        let unit = match suffix {
            "s" => TimeUnit::Second,
            "m" => TimeUnit::Minute,
            "h" => TimeUnit::Hour,
            "d" => TimeUnit::Day,
            "w" => TimeUnit::Week,
            other => {
                return Err(SonarError::validation(format!("Unknown time unit '{other}'")));
            }
        };

        if span_millis(amount, unit).is_none() {
            return Err(SonarError::validation("Invalid date range."));
        }

        Ok(Self::Relative { amount, unit })
    }

    /// Human-readable description.
    pub fn describe(&self) -> String {
        match self {
            Self::Relative { amount, unit } => {
                let plural = if *amount == 1 { "" } else { "s" };
                format!("last {amount} {}{plural}", unit.label())
            }
            Self::Absolute { start, end } => {
                let fmt = |d: &Option<DateTime<Utc>>| {
                    d.map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| "?".to_string())
                };
                format!("{} to {}", fmt(start), fmt(end))
            }
        }
    }
}

fn span_millis(amount: i64, unit: TimeUnit) -> Option<i64> {
    amount.checked_mul(unit.seconds())?.checked_mul(1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_relative_resolution() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap();
        let resolved = TimeRange::default().resolve(now);
        assert_eq!(resolved.end_time, Some(now.timestamp_millis()));
        assert_eq!(resolved.start_time, Some(now.timestamp_millis() - 300_000));
    }

    #[test]
    fn test_absolute_with_missing_endpoint() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let range = TimeRange::Absolute { start: Some(start), end: None };
        let resolved = range.resolve(Utc::now());
        assert_eq!(resolved.start_time, Some(start.timestamp_millis()));
        assert_eq!(resolved.end_time, None);
    }

    #[test]
    fn test_unit_multipliers() {
        assert_eq!(TimeUnit::Month.seconds(), 2_592_000);
        assert_eq!(TimeUnit::Year.seconds(), 31_536_000);
    }

    #[test]
    fn test_parse_relative() {
        assert_eq!(
            TimeRange::parse_relative("30m").unwrap(),
            TimeRange::Relative { amount: 30, unit: TimeUnit::Minute }
        );
        assert_eq!(
            TimeRange::parse_relative("6h").unwrap(),
            TimeRange::Relative { amount: 6, unit: TimeUnit::Hour }
        );
        assert!(TimeRange::parse_relative("15").is_err());
        assert!(TimeRange::parse_relative("0m").is_err());
        assert!(TimeRange::parse_relative("3y").is_err());
    }

    #[test]
    fn test_oversized_relative_range() {
        let err = TimeRange::parse_relative("99999999999999w").unwrap_err();
        assert_eq!(err.to_string(), "Invalid date range.");
        assert!(TimeRange::parse_relative("99999999999999m").is_ok());

        let range = TimeRange::Relative { amount: i64::MAX / 1000, unit: TimeUnit::Week };
        let resolved = range.resolve(Utc::now());
        assert_eq!(resolved.start_time, None);
        assert!(resolved.end_time.is_some());
    }

    #[test]
    fn test_describe() {
        assert_eq!(TimeRange::default().describe(), "last 5 minutes");
        assert_eq!(TimeRange::presets()[2].describe(), "last 1 hour");
    }
}
