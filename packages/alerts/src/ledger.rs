//! Per-location alert history.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use fixmypothole_report_models::Location;

/// Rate-limit key: a location rounded to three decimal degrees (~100 m).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationKey {
    lat_milli: i64,
    lng_milli: i64,
}

impl LocationKey {
    /// Quantizes a coordinate pair.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_coords(lat: f64, lng: f64) -> Self {
        Self {
            lat_milli: (lat * 1000.0).round() as i64,
            lng_milli: (lng * 1000.0).round() as i64,
        }
    }

    /// Quantizes a [`Location`].
    #[must_use]
    pub fn from_location(location: &Location) -> Self {
        Self::from_coords(location.lat, location.lng)
    }
}

impl std::fmt::Display for LocationKey {
    #[allow(clippy::cast_precision_loss)]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.3}_{:.3}",
            self.lat_milli as f64 / 1000.0,
            self.lng_milli as f64 / 1000.0
        )
    }
}

/// Storage for alert send times.
///
/// Implementations must be safe to share across tasks. The dispatcher
/// serialises the check-then-record sequence per key, so implementations
/// only need each call to be atomic on its own.
pub trait AlertLedger: Send + Sync {
    /// Records a confirmed send for `key` at `at`.
    fn record_send(&self, key: &LocationKey, at: DateTime<Utc>);

    /// Number of sends for `key` strictly after `cutoff`.
    fn count_since(&self, key: &LocationKey, cutoff: DateTime<Utc>) -> usize;
}

/// Process-local ledger. Entries older than the last checked cutoff are
/// pruned on each [`AlertLedger::count_since`] call.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    entries: Mutex<BTreeMap<LocationKey, Vec<DateTime<Utc>>>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Number of timestamps currently held for `key`, pruned or not.
    #[must_use]
    pub fn stored(&self, key: &LocationKey) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map_or(0, Vec::len)
    }
}

impl AlertLedger for InMemoryLedger {
    fn record_send(&self, key: &LocationKey, at: DateTime<Utc>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(*key)
            .or_default()
            .push(at);
    }

    fn count_since(&self, key: &LocationKey, cutoff: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sends) = entries.get_mut(key) else {
            return 0;
        };
        sends.retain(|ts| *ts > cutoff);
        let count = sends.len();
        if count == 0 {
            entries.remove(key);
        }
        count
    }
}
