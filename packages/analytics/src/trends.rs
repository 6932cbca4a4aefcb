//! Weekly report-frequency trend analysis.
//!
//! Reports are bucketed into calendar weeks that close on Sunday (the
//! Sunday itself belongs to the week it closes, and the bucket is labelled
//! by that Sunday). Empty weeks between the first and last report count
//! as zero. A least-squares line over the bucket counts gives the trend,
//! and the trailing four weeks give the frequency.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike as _, Days, NaiveDate, Utc};
use fixmypothole_analytics_models::{Trend, TrendResult, WeeklyCount};
use fixmypothole_report_models::{Report, Severity};

use crate::AnalyticsError;

/// Slope magnitude (reports/week per week) above which the series is
/// considered to be moving.
pub const SLOPE_THRESHOLD: f64 = 0.1;

/// Number of trailing weeks averaged into the frequency.
pub const RECENT_WEEKS: usize = 4;

/// Returns the Sunday closing the calendar week that contains `ts`.
#[must_use]
pub fn week_ending(ts: DateTime<Utc>) -> Option<NaiveDate> {
    let date = ts.date_naive();
    let days_to_sunday = (7 - date.weekday().num_days_from_sunday()) % 7;
    date.checked_add_days(Days::new(u64::from(days_to_sunday)))
}

/// Buckets reports into a contiguous weekly series.
///
/// # Errors
///
/// Returns [`AnalyticsError::DateOutOfRange`] if a report date is too close
/// to the end of chrono's calendar to compute its week.
pub fn weekly_counts(reports: &[Report]) -> Result<Vec<WeeklyCount>, AnalyticsError> {
    let mut counts: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for report in reports {
        let label = week_ending(report.created_at).ok_or_else(|| AnalyticsError::DateOutOfRange {
            date: report.created_at.to_rfc3339(),
        })?;
        *counts.entry(label).or_default() += 1;
    }

    let (Some(&first), Some(&last)) = (counts.keys().next(), counts.keys().next_back()) else {
        return Ok(vec![]);
    };

    let mut series = Vec::new();
    let mut week = first;
    loop {
        series.push(WeeklyCount {
            week_ending: week,
            count: counts.get(&week).copied().unwrap_or(0),
        });
        if week >= last {
            break;
        }
        week = week
            .checked_add_days(Days::new(7))
            .ok_or_else(|| AnalyticsError::DateOutOfRange {
                date: week.to_string(),
            })?;
    }

    Ok(series)
}

/// Slope of the first-degree least-squares fit of `ys` against
/// `x = 0..ys.len()`. `None` with fewer than two points.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn linear_slope(ys: &[f64]) -> Option<f64> {
    if ys.len() < 2 {
        return None;
    }

    let n = ys.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = ys.iter().sum::<f64>() / n;

    let (num, den) = ys
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, y)| {
            let dx = i as f64 - mean_x;
            (dx.mul_add(*y - mean_y, num), dx.mul_add(dx, den))
        });

    let slope = num / den;
    slope.is_finite().then_some(slope)
}

/// Maps a fitted slope to a [`Trend`].
#[must_use]
pub fn classify_slope(slope: f64) -> Trend {
    if slope > SLOPE_THRESHOLD {
        Trend::Increasing
    } else if slope < -SLOPE_THRESHOLD {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

/// Severity heuristic over recent frequency and trend.
///
/// Evaluated in this order:
/// 1. `frequency > 5`, or increasing with `frequency > 3` => high
/// 2. `frequency > 2`, or increasing => medium
/// 3. otherwise low
#[must_use]
pub fn predict_severity(frequency: f64, trend: Trend) -> Severity {
    let increasing = trend == Trend::Increasing;
    if frequency > 5.0 || (increasing && frequency > 3.0) {
        Severity::High
    } else if frequency > 2.0 || increasing {
        Severity::Medium
    } else {
        Severity::Low
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Analyzes the weekly reporting trend of a report subset.
///
/// Fewer than two weekly buckets yields a stable/low result whose
/// frequency is the mean of whatever buckets exist (0 for none).
///
/// # Errors
///
/// Returns [`AnalyticsError`] if bucketing fails or the fit is degenerate.
#[allow(clippy::cast_precision_loss)]
pub fn analyze_trends(reports: &[Report]) -> Result<TrendResult, AnalyticsError> {
    let series = weekly_counts(reports)?;
    let counts: Vec<f64> = series.iter().map(|w| w.count as f64).collect();

    if counts.len() < 2 {
        return Ok(TrendResult::stable_low(mean(&counts)));
    }

    let slope = linear_slope(&counts).ok_or(AnalyticsError::DegenerateFit {
        points: counts.len(),
    })?;
    let trend = classify_slope(slope);

    let recent = &counts[counts.len().saturating_sub(RECENT_WEEKS)..];
    let frequency = mean(recent);

    log::debug!(
        "Trend over {} weeks: slope={slope:.3} trend={trend} frequency={frequency:.2}",
        counts.len()
    );

    Ok(TrendResult {
        trend,
        frequency,
        prediction: predict_severity(frequency, trend),
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use fixmypothole_report_models::{FixingStatus, VerificationStatus};

    use super::*;

    fn at(y: i32, m: u32, d: u32) -> Report {
        Report {
            latitude: 12.97,
            longitude: 77.59,
            severity: Severity::Low,
            created_at: Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap(),
            report_type: "pothole".to_string(),
            verified: VerificationStatus::Pending,
            fixing_status: FixingStatus::Pending,
        }
    }

    /// Reports spread over consecutive weeks starting Monday 2024-01-01,
    /// `counts[i]` of them in week `i`.
    fn weekly(counts: &[u32]) -> Vec<Report> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        counts
            .iter()
            .enumerate()
            .flat_map(|(week, &n)| {
                (0..n).map(move |_| {
                    let mut r = at(2024, 1, 1);
                    r.created_at = start + chrono::Duration::weeks(i64::try_from(week).unwrap());
                    r
                })
            })
            .collect()
    }

    #[test]
    fn weeks_close_on_sunday() {
        let monday = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let sunday = Utc.with_ymd_and_hms(2024, 1, 7, 23, 59, 0).unwrap();
        let next_monday = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();

        assert_eq!(week_ending(monday), Some(expected));
        assert_eq!(week_ending(sunday), Some(expected));
        assert_eq!(
            week_ending(next_monday),
            NaiveDate::from_ymd_opt(2024, 1, 14)
        );
    }

    #[test]
    fn empty_weeks_are_filled_with_zero() {
        let reports = vec![at(2024, 1, 2), at(2024, 1, 3), at(2024, 1, 24)];
        let series = weekly_counts(&reports).unwrap();
        let counts: Vec<u64> = series.iter().map(|w| w.count).collect();
        assert_eq!(counts, vec![2, 0, 0, 1]);
    }

    #[test]
    fn no_reports_is_stable_low_zero() {
        let result = analyze_trends(&[]).unwrap();
        assert_eq!(result, TrendResult::stable_low(0.0));
    }

    #[test]
    fn single_bucket_is_stable_low_with_its_count() {
        let result = analyze_trends(&weekly(&[7])).unwrap();
        assert_eq!(result.trend, Trend::Stable);
        assert_eq!(result.prediction, Severity::Low);
        assert!((result.frequency - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rising_counts_are_increasing() {
        let result = analyze_trends(&weekly(&[1, 2, 3, 4, 5])).unwrap();
        assert_eq!(result.trend, Trend::Increasing);
        // last four weeks: 2,3,4,5
        assert!((result.frequency - 3.5).abs() < 1e-12);
        assert_eq!(result.prediction, Severity::High);
    }

    #[test]
    fn falling_counts_are_decreasing() {
        let result = analyze_trends(&weekly(&[6, 4, 2, 1, 1])).unwrap();
        assert_eq!(result.trend, Trend::Decreasing);
        assert!((result.frequency - 2.0).abs() < 1e-12);
        assert_eq!(result.prediction, Severity::Low);
    }

    #[test]
    fn flat_counts_are_stable() {
        let result = analyze_trends(&weekly(&[3, 3, 3])).unwrap();
        assert_eq!(result.trend, Trend::Stable);
        assert!((result.frequency - 3.0).abs() < 1e-12);
        assert_eq!(result.prediction, Severity::Medium);
    }

    #[test]
    fn slope_matches_least_squares() {
        let slope = linear_slope(&[1.0, 3.0, 5.0]).unwrap();
        assert!((slope - 2.0).abs() < 1e-12);
        assert!(linear_slope(&[4.0]).is_none());
        assert!(classify_slope(0.1) == Trend::Stable);
        assert!(classify_slope(-0.1) == Trend::Stable);
    }

    #[test]
    fn severity_heuristic_precedence() {
        assert_eq!(predict_severity(6.0, Trend::Stable), Severity::High);
        assert_eq!(predict_severity(6.0, Trend::Decreasing), Severity::High);
        assert_eq!(predict_severity(4.0, Trend::Increasing), Severity::High);
        assert_eq!(predict_severity(4.0, Trend::Stable), Severity::Medium);
        assert_eq!(predict_severity(2.5, Trend::Stable), Severity::Medium);
        assert_eq!(predict_severity(0.5, Trend::Increasing), Severity::Medium);
        assert_eq!(predict_severity(1.0, Trend::Stable), Severity::Low);
        assert_eq!(predict_severity(2.0, Trend::Decreasing), Severity::Low);
    }

    #[test]
    fn last_calendar_week_is_out_of_range() {
        // chrono's last representable date is a Monday, so its closing
        // Sunday cannot be computed.
        let mut report = at(2024, 1, 1);
        report.created_at = NaiveDate::MAX.and_hms_opt(12, 0, 0).unwrap().and_utc();

        assert!(matches!(
            analyze_trends(&[report]),
            Err(AnalyticsError::DateOutOfRange { .. })
        ));
    }
}
