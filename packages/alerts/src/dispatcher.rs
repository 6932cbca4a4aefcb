//! Rate-limited alert dispatch.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Duration;
use fixmypothole_report_models::Location;
use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::gateway::{SmsConfig, SmsGateway, create_gateway};
use crate::ledger::{AlertLedger, InMemoryLedger, LocationKey};
use crate::phone::{normalize_numbers, normalize_phone};

/// Alerts allowed per location key per trailing window.
pub const MAX_ALERTS_PER_DAY: usize = 1;

/// Message sent by [`AlertDispatcher::send_test`] when none is given.
pub const DEFAULT_TEST_MESSAGE: &str = "Test message from FixMyPothole.AI";

/// Result of an alert attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertOutcome {
    /// Whether the gateway accepted the alert.
    pub sent: bool,
    /// Human-readable result.
    pub message: String,
}

impl AlertOutcome {
    fn sent(message: impl Into<String>) -> Self {
        Self {
            sent: true,
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            sent: false,
            message: message.into(),
        }
    }
}

/// Text of a high-priority alert.
#[must_use]
pub fn alert_message(location: &Location, report_count: usize) -> String {
    format!(
        "HIGH PRIORITY ALERT: {report_count} pothole reports received at {}. \
         Immediate attention required. - FixMyPothole.AI",
        location.display_address()
    )
}

/// Sends high-priority alerts, at most [`MAX_ALERTS_PER_DAY`] per
/// location key in any trailing 24 hours.
pub struct AlertDispatcher {
    gateway: Option<Box<dyn SmsGateway>>,
    ledger: Arc<dyn AlertLedger>,
    clock: Arc<dyn Clock>,
    max_alerts_per_day: usize,
    key_locks: Mutex<BTreeMap<LocationKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl AlertDispatcher {
    /// Creates a dispatcher with an in-memory ledger and the system clock.
    #[must_use]
    pub fn new(gateway: Option<Box<dyn SmsGateway>>) -> Self {
        Self {
            gateway,
            ledger: Arc::new(InMemoryLedger::new()),
            clock: Arc::new(SystemClock),
            max_alerts_per_day: MAX_ALERTS_PER_DAY,
            key_locks: Mutex::new(BTreeMap::new()),
        }
    }

    /// Creates a dispatcher configured from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(create_gateway(&SmsConfig::from_env()))
    }

    /// Replaces the alert ledger.
    #[must_use]
    pub fn with_ledger(mut self, ledger: Arc<dyn AlertLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Whether an SMS gateway is configured.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.gateway.is_some()
    }

    /// Sends a high-priority alert for `location` to `numbers`.
    ///
    /// Never fails: every problem is reported through
    /// [`AlertOutcome::message`] with `sent == false`. A send is recorded in
    /// the ledger only after the gateway accepts it.
    pub async fn try_send(
        &self,
        numbers: &[String],
        location: &Location,
        report_count: usize,
    ) -> AlertOutcome {
        let Some(gateway) = self.gateway.as_deref() else {
            log::warn!("SMS service not enabled - skipping alert");
            return AlertOutcome::failed("SMS service not configured");
        };

        if numbers.is_empty() {
            return AlertOutcome::failed("No phone numbers provided");
        }

        let key = LocationKey::from_location(location);
        let lock = self.key_lock(key);
        let outcome = {
            let _guard = lock.lock().await;
            self.send_alert(gateway, key, numbers, location, report_count).await
        };
        drop(lock);
        self.release_key_lock(key);
        outcome
    }

    async fn send_alert(
        &self,
        gateway: &dyn SmsGateway,
        key: LocationKey,
        numbers: &[String],
        location: &Location,
        report_count: usize,
    ) -> AlertOutcome {
        let cutoff = self.clock.now() - Duration::days(1);
        if self.ledger.count_since(&key, cutoff) >= self.max_alerts_per_day {
            log::info!("Rate limit reached for location {key}");
            return AlertOutcome::failed("Daily alert limit reached for this location");
        }

        let recipients = normalize_numbers(numbers);
        if recipients.is_empty() {
            return AlertOutcome::failed("No valid phone numbers found");
        }

        let message = alert_message(location, report_count);
        match gateway.send_bulk(&message, &recipients).await {
            Ok(ack) if ack.accepted => {
                self.ledger.record_send(&key, self.clock.now());
                log::info!(
                    "SMS alert sent successfully to {} numbers for {key}",
                    recipients.len()
                );
                AlertOutcome::sent(format!("Alert sent to {} recipients", recipients.len()))
            }
            Ok(ack) => {
                log::error!("Fast2SMS API error: {}", ack.detail);
                AlertOutcome::failed(format!("SMS API error: {}", ack.detail))
            }
            Err(e) => {
                log::error!("SMS alert for {key} failed: {e}");
                AlertOutcome::failed(e.to_string())
            }
        }
    }

    /// Sends a single message to check the gateway configuration.
    ///
    /// Not rate-limited and not recorded in the ledger.
    pub async fn send_test(&self, number: &str, message: Option<&str>) -> AlertOutcome {
        let Some(gateway) = self.gateway.as_deref() else {
            return AlertOutcome::failed("SMS service not configured");
        };

        let Some(number) = normalize_phone(number) else {
            return AlertOutcome::failed("Invalid phone number format");
        };

        let message = message.unwrap_or(DEFAULT_TEST_MESSAGE);
        match gateway.send_bulk(message, &[number]).await {
            Ok(ack) if ack.accepted => AlertOutcome::sent("Test SMS sent successfully"),
            Ok(ack) => AlertOutcome::failed(ack.detail),
            Err(e) => {
                log::error!("Test SMS failed: {e}");
                AlertOutcome::failed(e.to_string())
            }
        }
    }

    /// The async mutex serialising check, send and record for `key`.
    fn key_lock(&self, key: LocationKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.key_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key).or_default())
    }

    /// Drops the lock entry for `key` once no caller holds or awaits it.
    fn release_key_lock(&self, key: LocationKey) {
        let mut locks = self.key_locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(&key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&key);
        }
    }
}
