#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Rate-limited SMS alerts for high-priority hazard clusters.
//!
//! [`dispatcher::AlertDispatcher`] gates every send on an
//! [`ledger::AlertLedger`] keyed by location quantized to roughly 100 m,
//! allowing at most one alert per key per trailing 24 hours. The SMS
//! provider sits behind [`gateway::SmsGateway`]; Fast2SMS is the hosted
//! implementation.

pub mod clock;
pub mod dispatcher;
pub mod gateway;
pub mod ledger;
pub mod phone;

use thiserror::Error;

/// Errors from the SMS gateway.
///
/// The display text of each variant is the failure message reported to
/// alert callers.
#[derive(Debug, Error)]
pub enum SmsError {
    /// The gateway did not answer within the request timeout.
    #[error("SMS request timeout")]
    Timeout,

    /// The gateway answered with a non-OK HTTP status.
    #[error("SMS service error: {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The request could not be sent or its body could not be read.
    #[error("SMS request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The gateway answered OK with a body that is not an acknowledgement.
    #[error("Unexpected error: {message}")]
    InvalidResponse {
        /// What was wrong with the body.
        message: String,
    },
}
