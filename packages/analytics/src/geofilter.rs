//! Radius filtering of raw report records around a target point.

use fixmypothole_report_models::{Location, RawReport, Report};

use crate::KM_PER_DEGREE;

/// Default search radius around the target point.
pub const DEFAULT_RADIUS_KM: f64 = 5.0;

/// Euclidean distance in degrees scaled to kilometres.
///
/// Not geodesically exact; longitude degrees shrink away from the equator
/// and this ignores that.
#[must_use]
pub fn degree_distance_km(lat_a: f64, lng_a: f64, lat_b: f64, lng_b: f64) -> f64 {
    (lat_a - lat_b).hypot(lng_a - lng_b) * KM_PER_DEGREE
}

/// Selects the reports within `radius_km` of `center`.
///
/// Each record is validated on its own. A record that is missing a
/// required field or has malformed values is skipped with a debug note
/// and the rest of the batch is still processed.
#[must_use]
pub fn filter_reports(reports: &[RawReport], center: &Location, radius_km: f64) -> Vec<Report> {
    let mut skipped = 0usize;

    let subset: Vec<Report> = reports
        .iter()
        .enumerate()
        .filter_map(|(idx, raw)| match Report::try_from(raw) {
            Ok(report) => Some(report),
            Err(e) => {
                skipped += 1;
                log::debug!("Skipping report #{idx}: {e}");
                None
            }
        })
        .filter(|report| {
            degree_distance_km(report.latitude, report.longitude, center.lat, center.lng)
                <= radius_km
        })
        .collect();

    log::debug!(
        "Geofilter kept {} of {} reports within {radius_km} km of ({}, {}) ({skipped} malformed)",
        subset.len(),
        reports.len(),
        center.lat,
        center.lng,
    );

    subset
}
