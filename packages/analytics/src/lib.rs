#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Statistical analysis over hazard reports.
//!
//! The pipeline is: [`geofilter`] narrows raw reports to a validated subset
//! around a target point, then [`hotspots`] and [`trends`] run
//! independently over that subset. [`summary`] holds the lenient aggregate
//! statistics that feed the AI prompts.
//!
//! Distances use a flat-earth approximation of 111 km per degree. That is
//! only good enough for radii up to a few tens of kilometres, which is all
//! this crate is used for.

pub mod geofilter;
pub mod hotspots;
pub mod summary;
pub mod trends;

use thiserror::Error;

/// Kilometres per degree of latitude (and, loosely, longitude).
pub const KM_PER_DEGREE: f64 = 111.0;

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Calendar arithmetic left chrono's supported date range.
    #[error("Date out of range while bucketing: {date}")]
    DateOutOfRange {
        /// The date being bucketed.
        date: String,
    },

    /// The least-squares fit produced a non-finite slope.
    #[error("Trend fit is degenerate over {points} points")]
    DegenerateFit {
        /// Number of weekly buckets in the series.
        points: usize,
    },
}
