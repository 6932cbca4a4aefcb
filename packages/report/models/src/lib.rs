#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Road hazard report types and report record validation.
//!
//! Reports arrive from the external report store as loosely-shaped JSON
//! records ([`RawReport`]). Analysis code only ever works on validated
//! [`Report`] snapshots; a record that fails validation is skipped on its
//! own and never aborts the batch it came in.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Hazard severity as reported by citizens and as predicted by analysis.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Severity {
    /// Cosmetic or minor surface damage.
    #[serde(alias = "Low", alias = "LOW")]
    Low,
    /// Noticeable damage that should be scheduled for repair.
    #[serde(alias = "Medium", alias = "MEDIUM")]
    Medium,
    /// Dangerous damage needing immediate attention.
    #[serde(alias = "High", alias = "HIGH")]
    High,
}

/// Moderation state of a report.
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
pub enum VerificationStatus {
    /// Not yet reviewed.
    Pending,
    /// Confirmed by a moderator or by corroborating reports.
    Verified,
    /// Reviewed and rejected.
    Rejected,
}

/// Repair progress of a reported hazard.
///
/// Unrecognised values from the report store are kept verbatim in
/// [`FixingStatus::Other`] rather than rejecting the record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FixingStatus {
    /// Reported, no work scheduled.
    Pending,
    /// Repair work underway.
    InProgress,
    /// Repaired.
    Resolved,
    /// Any other status string.
    Other(String),
}

impl FixingStatus {
    /// Returns the canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for FixingStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "pending" => Self::Pending,
            "in_progress" => Self::InProgress,
            "resolved" => Self::Resolved,
            _ => Self::Other(value.to_string()),
        }
    }
}

impl From<String> for FixingStatus {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<FixingStatus> for String {
    fn from(value: FixingStatus) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for FixingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A geographic point, optionally with a human-readable address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
    /// Street address, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Location {
    /// Creates a location without an address.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            address: None,
        }
    }

    /// Attaches a street address.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// The address if present, otherwise a `Lat: .., Lng: ..` label.
    #[must_use]
    pub fn display_address(&self) -> String {
        self.address
            .clone()
            .unwrap_or_else(|| format!("Lat: {}, Lng: {}", self.lat, self.lng))
    }
}

/// A validated hazard report snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Reported severity.
    pub severity: Severity,
    /// When the report was filed.
    pub created_at: DateTime<Utc>,
    /// Hazard type, `"pothole"` unless the store says otherwise.
    #[serde(rename = "type")]
    pub report_type: String,
    /// Moderation state.
    pub verified: VerificationStatus,
    /// Repair progress.
    pub fixing_status: FixingStatus,
}

/// Coordinates as delivered by the report store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLocation {
    /// Latitude.
    pub lat: Option<f64>,
    /// Longitude.
    pub lng: Option<f64>,
}

/// Verification flag as delivered by the report store: either a plain
/// boolean or a status string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawVerification {
    /// `true` means verified, `false` means pending.
    Flag(bool),
    /// A status string such as `"verified"`.
    Status(String),
}

/// An unvalidated report record from the report store.
///
/// Every field is optional so that one malformed row can be deserialized
/// and then rejected individually by [`Report::try_from`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReport {
    /// Report coordinates.
    pub location: Option<RawLocation>,
    /// Severity string (`low`, `medium`, `high`).
    pub severity: Option<String>,
    /// Creation timestamp string.
    pub created_at: Option<String>,
    /// Hazard type.
    #[serde(rename = "type")]
    pub report_type: Option<String>,
    /// Verification flag or status.
    pub verified: Option<RawVerification>,
    /// Repair status string.
    pub fixing_status: Option<String>,
}

impl RawReport {
    /// Severity for aggregate statistics: missing or unparseable values
    /// count as [`Severity::Medium`].
    #[must_use]
    pub fn severity_or_default(&self) -> Severity {
        self.severity
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Severity::Medium)
    }

    /// Parsed creation timestamp, if present and well-formed.
    #[must_use]
    pub fn created_at_parsed(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

/// Reasons a [`RawReport`] cannot be turned into a [`Report`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// A required field is absent.
    #[error("missing required field '{field}'")]
    MissingField {
        /// Field name as it appears on the wire.
        field: &'static str,
    },

    /// Coordinates are present but not finite numbers.
    #[error("coordinates are not finite")]
    InvalidCoordinates,

    /// Severity string is not one of `low`, `medium`, `high`.
    #[error("invalid severity '{value}'")]
    InvalidSeverity {
        /// The rejected value.
        value: String,
    },

    /// Timestamp string could not be parsed.
    #[error("invalid timestamp '{value}'")]
    InvalidTimestamp {
        /// The rejected value.
        value: String,
    },

    /// Verification string is not a known status.
    #[error("invalid verification status '{value}'")]
    InvalidVerification {
        /// The rejected value.
        value: String,
    },
}

impl TryFrom<&RawReport> for Report {
    type Error = ReportError;

    fn try_from(raw: &RawReport) -> Result<Self, Self::Error> {
        let location = raw
            .location
            .as_ref()
            .ok_or(ReportError::MissingField { field: "location" })?;
        let latitude = location
            .lat
            .ok_or(ReportError::MissingField { field: "location.lat" })?;
        let longitude = location
            .lng
            .ok_or(ReportError::MissingField { field: "location.lng" })?;
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(ReportError::InvalidCoordinates);
        }

        let severity_str = raw
            .severity
            .as_deref()
            .ok_or(ReportError::MissingField { field: "severity" })?;
        let severity = severity_str
            .parse()
            .map_err(|_| ReportError::InvalidSeverity {
                value: severity_str.to_string(),
            })?;

        let created_str = raw
            .created_at
            .as_deref()
            .ok_or(ReportError::MissingField { field: "createdAt" })?;
        let created_at = parse_timestamp(created_str).ok_or_else(|| ReportError::InvalidTimestamp {
            value: created_str.to_string(),
        })?;

        let verified = match raw
            .verified
            .as_ref()
            .ok_or(ReportError::MissingField { field: "verified" })?
        {
            RawVerification::Flag(true) => VerificationStatus::Verified,
            RawVerification::Flag(false) => VerificationStatus::Pending,
            RawVerification::Status(s) => {
                s.parse()
                    .map_err(|_| ReportError::InvalidVerification { value: s.clone() })?
            }
        };

        let fixing_status = raw
            .fixing_status
            .as_deref()
            .map(FixingStatus::from)
            .ok_or(ReportError::MissingField {
                field: "fixingStatus",
            })?;

        Ok(Self {
            latitude,
            longitude,
            severity,
            created_at,
            report_type: raw
                .report_type
                .clone()
                .unwrap_or_else(|| "pothole".to_string()),
            verified,
            fixing_status,
        })
    }
}

/// Parses a report timestamp.
///
/// Accepts RFC 3339 (including a trailing `Z`), naive ISO 8601 with or
/// without fractional seconds (interpreted as UTC), and bare dates
/// (midnight UTC).
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parses a JSON array of report records.
///
/// Elements that cannot be read as a report object are skipped with a
/// debug note; only a document that is not a JSON array is an error.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] if `json` is not a JSON array.
pub fn parse_report_batch(json: &str) -> Result<Vec<RawReport>, serde_json::Error> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let total = values.len();

    let reports: Vec<RawReport> = values
        .into_iter()
        .enumerate()
        .filter_map(|(idx, value)| match serde_json::from_value(value) {
            Ok(raw) => Some(raw),
            Err(e) => {
                log::debug!("Skipping unreadable report record #{idx}: {e}");
                None
            }
        })
        .collect();

    if reports.len() < total {
        log::debug!("Read {} of {total} report records", reports.len());
    }

    Ok(reports)
}
