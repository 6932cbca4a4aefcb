#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types for hazard report analytics.
//!
//! Hotspots and trends are derived on every prediction call and never
//! persisted. Summary types feed the AI prompts.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use fixmypothole_report_models::Severity;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Lookback window used for "recent reports" statistics.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum TimeRange {
    /// Last 24 hours.
    #[strum(to_string = "day", serialize = "24h", serialize = "1d")]
    Day,
    /// Last 7 days.
    #[default]
    #[strum(to_string = "week", serialize = "7d", serialize = "1w")]
    Week,
    /// Last 30 days.
    #[strum(to_string = "month", serialize = "30d")]
    Month,
    /// Last 365 days.
    #[strum(to_string = "year", serialize = "365d")]
    Year,
}

impl TimeRange {
    /// Length of the lookback window.
    #[must_use]
    pub fn duration(self) -> Duration {
        match self {
            Self::Day => Duration::days(1),
            Self::Week => Duration::days(7),
            Self::Month => Duration::days(30),
            Self::Year => Duration::days(365),
        }
    }
}

/// Direction of the weekly report count over time.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Trend {
    /// Slope above `+0.1` reports/week per week.
    #[serde(alias = "Increasing", alias = "INCREASING")]
    Increasing,
    /// Slope below `-0.1` reports/week per week.
    #[serde(alias = "Decreasing", alias = "DECREASING")]
    Decreasing,
    /// Anything in between, or too little data to tell.
    #[serde(alias = "Stable", alias = "STABLE")]
    Stable,
}

/// A dense cluster of reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    /// Centroid latitude.
    pub lat: f64,
    /// Centroid longitude.
    pub lng: f64,
    /// `min(1.0, count / 10)`.
    pub intensity: f64,
    /// Number of member reports (at least the clustering `min_samples`).
    pub count: usize,
}

/// Statistical trend over weekly report counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendResult {
    /// Fitted direction.
    pub trend: Trend,
    /// Mean reports per week over the trailing four weeks.
    pub frequency: f64,
    /// Severity implied by frequency and trend.
    pub prediction: Severity,
}

impl TrendResult {
    /// The answer used when there is nothing to analyze.
    #[must_use]
    pub const fn stable_low(frequency: f64) -> Self {
        Self {
            trend: Trend::Stable,
            frequency,
            prediction: Severity::Low,
        }
    }
}

impl Default for TrendResult {
    fn default() -> Self {
        Self::stable_low(0.0)
    }
}

/// Report count for one calendar week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyCount {
    /// The Sunday that closes the week (the bucket label).
    pub week_ending: NaiveDate,
    /// Reports created in `(week_ending - 7 days, week_ending]`.
    pub count: u64,
}

/// Counts of reports per severity level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityDistribution {
    /// High severity count.
    pub high: u64,
    /// Medium severity count.
    pub medium: u64,
    /// Low severity count.
    pub low: u64,
}

impl SeverityDistribution {
    /// Adds one report of the given severity.
    pub const fn record(&mut self, severity: Severity) {
        match severity {
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }
}

impl std::fmt::Display for SeverityDistribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "High: {}, Medium: {}, Low: {}",
            self.high, self.medium, self.low
        )
    }
}

/// Report counts keyed by `YYYY-MM`, in chronological order.
pub type MonthlyCounts = BTreeMap<String, u64>;

/// Aggregate statistics over a filtered report subset, used to build the
/// free-text analysis prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    /// All reports in the subset.
    pub total_reports: u64,
    /// Reports inside the requested [`TimeRange`].
    pub recent_reports: u64,
    /// Reports with [`Severity::High`].
    pub high_severity: u64,
    /// Verified reports.
    pub verified_reports: u64,
    /// Reports whose hazard has been resolved.
    pub resolved_reports: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_range_accepts_aliases() {
        assert_eq!("WEEK".parse::<TimeRange>().unwrap(), TimeRange::Week);
        assert_eq!("7d".parse::<TimeRange>().unwrap(), TimeRange::Week);
        assert_eq!("30d".parse::<TimeRange>().unwrap(), TimeRange::Month);
        assert_eq!(TimeRange::Day.to_string(), "day");
        assert!("fortnight".parse::<TimeRange>().is_err());
    }

    #[test]
    fn severity_distribution_counts() {
        let mut dist = SeverityDistribution::default();
        dist.record(Severity::High);
        dist.record(Severity::Low);
        dist.record(Severity::Low);
        assert_eq!((dist.high, dist.medium, dist.low), (1, 0, 2));
        assert_eq!(dist.to_string(), "High: 1, Medium: 0, Low: 2");
    }
}
