#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! AI-assisted hazard prediction.
//!
//! [`predictor::PredictiveAnalytics`] combines the statistical pipeline from
//! `fixmypothole_analytics` with an optional generative model reached
//! through the [`providers::CompletionProvider`] boundary. The model is
//! never load-bearing: when it is not configured, times out, errors, or
//! answers with something unusable, every flow degrades to a statistical
//! or mock answer instead of surfacing an error.

pub mod mock;
pub mod parser;
pub mod predictor;
pub mod prompts;
pub mod providers;

use thiserror::Error;

/// Errors that can occur during AI operations.
///
/// These never escape the public prediction flows; they are logged and
/// turned into fallback results.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to the model provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// The completion did not arrive in time.
    #[error("Completion timed out after {seconds}s")]
    Timeout {
        /// Configured timeout.
        seconds: u64,
    },

    /// The model answered with no text.
    #[error("Empty response from model")]
    EmptyResponse,

    /// The model's answer could not be read as the requested structure.
    #[error("Malformed response: {0}")]
    Parse(#[from] parser::ParseError),

    /// Statistical analysis failed.
    #[error("Analytics error: {0}")]
    Analytics(#[from] fixmypothole_analytics::AnalyticsError),
}
