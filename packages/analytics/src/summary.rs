//! Aggregate report statistics used to build AI prompts.
//!
//! The raw-report helpers here are lenient: they count what they can and
//! skip what they cannot read, since a summary line is never worth
//! failing a forecast over.

use chrono::{DateTime, Utc};
use fixmypothole_analytics_models::{MonthlyCounts, ReportStats, SeverityDistribution, TimeRange};
use fixmypothole_report_models::{FixingStatus, RawReport, Report, Severity, VerificationStatus};

/// Age (in whole days) up to which a report counts as recent activity.
pub const RECENT_ACTIVITY_DAYS: i64 = 30;

/// Counts raw reports per severity; missing or unknown severity counts
/// as medium.
#[must_use]
pub fn severity_distribution(reports: &[RawReport]) -> SeverityDistribution {
    let mut dist = SeverityDistribution::default();
    for report in reports {
        dist.record(report.severity_or_default());
    }
    dist
}

/// Counts raw reports per calendar month (`YYYY-MM`).
#[must_use]
pub fn monthly_patterns(reports: &[RawReport]) -> MonthlyCounts {
    let mut counts = MonthlyCounts::new();
    for (idx, report) in reports.iter().enumerate() {
        let Some(created) = report.created_at_parsed() else {
            log::debug!("Skipping report #{idx} in monthly pattern: unreadable timestamp");
            continue;
        };
        *counts
            .entry(created.format("%Y-%m").to_string())
            .or_default() += 1;
    }
    counts
}

/// Whether `ts` is at most [`RECENT_ACTIVITY_DAYS`] whole days before `now`.
#[must_use]
pub fn is_recent(ts: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    (now - ts).num_days() <= RECENT_ACTIVITY_DAYS
}

/// One-line textual summary of raw reports for the forecast prompt.
#[must_use]
pub fn summarize_reports(reports: &[RawReport], now: DateTime<Utc>) -> String {
    if reports.is_empty() {
        return "No historical data available".to_string();
    }

    let dist = severity_distribution(reports);
    let recent = reports
        .iter()
        .filter_map(RawReport::created_at_parsed)
        .filter(|ts| is_recent(*ts, now))
        .count();

    format!("{dist}. Recent activity: {recent} reports in last {RECENT_ACTIVITY_DAYS} days.")
}

/// Aggregate statistics over a validated report subset.
#[must_use]
pub fn report_stats(reports: &[Report], time_range: TimeRange, now: DateTime<Utc>) -> ReportStats {
    let cutoff = now - time_range.duration();

    ReportStats {
        total_reports: reports.len() as u64,
        recent_reports: count_where(reports, |r| r.created_at >= cutoff),
        high_severity: count_where(reports, |r| r.severity == Severity::High),
        verified_reports: count_where(reports, |r| r.verified == VerificationStatus::Verified),
        resolved_reports: count_where(reports, |r| r.fixing_status == FixingStatus::Resolved),
    }
}

fn count_where(reports: &[Report], pred: impl Fn(&Report) -> bool) -> u64 {
    reports.iter().filter(|r| pred(r)).count() as u64
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use fixmypothole_report_models::{RawLocation, RawVerification};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap()
    }

    fn raw(severity: Option<&str>, created_at: Option<&str>) -> RawReport {
        RawReport {
            location: Some(RawLocation {
                lat: Some(12.97),
                lng: Some(77.59),
            }),
            severity: severity.map(String::from),
            created_at: created_at.map(String::from),
            report_type: None,
            verified: Some(RawVerification::Status("verified".to_string())),
            fixing_status: Some("resolved".to_string()),
        }
    }

    #[test]
    fn distribution_defaults_unknown_to_medium() {
        let reports = vec![
            raw(Some("high"), None),
            raw(Some("bogus"), None),
            raw(None, None),
            raw(Some("low"), None),
        ];
        let dist = severity_distribution(&reports);
        assert_eq!((dist.high, dist.medium, dist.low), (1, 2, 1));
    }

    #[test]
    fn monthly_patterns_skip_unreadable_dates() {
        let reports = vec![
            raw(None, Some("2024-06-03T10:00:00Z")),
            raw(None, Some("2024-06-20")),
            raw(None, Some("garbage")),
            raw(None, Some("2024-07-01T00:00:00")),
        ];
        let months = monthly_patterns(&reports);
        assert_eq!(months.len(), 2);
        assert_eq!(months["2024-06"], 2);
        assert_eq!(months["2024-07"], 1);
    }

    #[test]
    fn summary_line_counts_recent_activity() {
        let reports = vec![
            raw(Some("high"), Some("2024-07-10T00:00:00Z")),
            raw(Some("low"), Some("2024-01-10T00:00:00Z")),
            raw(Some("medium"), Some("2024-06-20T00:00:00Z")),
        ];
        assert_eq!(
            summarize_reports(&reports, now()),
            "High: 1, Medium: 1, Low: 1. Recent activity: 2 reports in last 30 days."
        );
        assert_eq!(
            summarize_reports(&[], now()),
            "No historical data available"
        );
    }

    #[test]
    fn stats_over_subset() {
        let reports: Vec<Report> = [
            raw(Some("high"), Some("2024-07-14T00:00:00Z")),
            raw(Some("high"), Some("2024-05-01T00:00:00Z")),
            raw(Some("low"), Some("2024-07-12T00:00:00Z")),
        ]
        .iter()
        .map(|r| Report::try_from(r).unwrap())
        .collect();

        let stats = report_stats(&reports, TimeRange::Week, now());

        assert_eq!(stats.total_reports, 3);
        assert_eq!(stats.recent_reports, 2);
        assert_eq!(stats.high_severity, 2);
        assert_eq!(stats.verified_reports, 3);
        assert_eq!(stats.resolved_reports, 3);
    }
}
