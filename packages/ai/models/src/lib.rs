#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types for the AI-assisted prediction flows.
//!
//! Each flow has its own explicit result type:
//!
//! * [`PredictionResult`] for the severity prediction, which always
//!   carries the statistical trend next to any AI-derived insight.
//! * [`ConditionForecast`] for the structured condition forecast.
//! * [`TrendForecast`] for the structured reporting-trend forecast.
//!
//! The two forecast types wrap an "outlook" (the part the AI fills in,
//! with documented defaults for anything it leaves out) together with
//! generation metadata.

use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use fixmypothole_analytics_models::{Hotspot, Trend, TrendResult};
use fixmypothole_report_models::{Location, Severity};
use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::ser::SerializeMap as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{AsRefStr, Display, EnumString};

/// Confidence reported for a purely statistical prediction.
pub const STATISTICAL_CONFIDENCE: f64 = 0.6;

/// Confidence reported when even the statistical pipeline failed.
pub const DEFAULT_CONFIDENCE: f64 = 0.3;

/// Confidence assumed when the AI does not state one.
pub const AI_DEFAULT_CONFIDENCE: f64 = 0.7;

/// Model identifier recorded on mock payloads.
pub const MOCK_MODEL: &str = "mock-fallback";

/// Narrative trend insight extracted from free-text AI output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiTrendInsight {
    /// Text following the first mention of "trend", up to the line end.
    pub description: String,
    /// Lines that read like recommendations, trimmed, in order.
    pub recommendations: Vec<String>,
}

/// Structured fields extracted from a free-text AI analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiInsights {
    /// Severity keyword group that matched first, or medium.
    pub severity: Severity,
    /// Stated confidence clamped to `[0, 1]`, or `0.7`.
    pub confidence: f64,
    /// Narrative trend and recommendations.
    pub trends: AiTrendInsight,
    /// Fraction of the extractable fields that were actually found in the
    /// text, in `[0, 1]`. `0.0` means everything above is a default.
    pub extraction_confidence: f64,
}

/// Both views of the trend: AI narrative (when available) and the
/// statistical fit (always).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionTrends {
    /// AI narrative; absent when AI is disabled or failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiTrendInsight>,
    /// Statistical trend over the filtered reports.
    pub statistical: TrendResult,
}

/// Severity prediction for a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    /// AI severity when available, otherwise the statistical prediction.
    pub predicted_severity: Severity,
    /// Confidence in `predicted_severity`, in `[0, 1]`.
    pub confidence: f64,
    /// Report clusters near the location.
    pub hotspots: Vec<Hotspot>,
    /// AI and statistical trend views.
    pub trends: PredictionTrends,
}

impl PredictionResult {
    /// A purely statistical prediction.
    #[must_use]
    pub fn statistical(hotspots: Vec<Hotspot>, statistical: TrendResult) -> Self {
        Self {
            predicted_severity: statistical.prediction,
            confidence: STATISTICAL_CONFIDENCE,
            hotspots,
            trends: PredictionTrends {
                ai: None,
                statistical,
            },
        }
    }

    /// An AI-led prediction with the statistical trend attached for
    /// comparison.
    #[must_use]
    pub fn from_ai(insights: AiInsights, hotspots: Vec<Hotspot>, statistical: TrendResult) -> Self {
        Self {
            predicted_severity: insights.severity,
            confidence: insights.confidence.clamp(0.0, 1.0),
            hotspots,
            trends: PredictionTrends {
                ai: Some(insights.trends),
                statistical,
            },
        }
    }

    /// The all-default low-confidence answer used when nothing else could
    /// be computed.
    #[must_use]
    pub fn all_default() -> Self {
        Self {
            predicted_severity: Severity::Low,
            confidence: DEFAULT_CONFIDENCE,
            hotspots: vec![],
            trends: PredictionTrends {
                ai: None,
                statistical: TrendResult::default(),
            },
        }
    }
}

/// Where a forecast payload came from.
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
#[strum(serialize_all = "lowercase")]
pub enum ForecastSource {
    /// Parsed from a generative model response.
    Ai,
    /// Fixed fallback content.
    Mock,
}

/// Provenance attached to every forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    /// When the forecast was produced.
    pub generated_at: DateTime<Utc>,
    /// Number of input reports the forecast was based on.
    pub data_points: usize,
    /// Model identifier, or [`MOCK_MODEL`].
    pub model: String,
    /// AI or mock.
    pub source: ForecastSource,
}

impl GenerationMetadata {
    /// Metadata for a mock payload.
    #[must_use]
    pub fn mock(generated_at: DateTime<Utc>, data_points: usize) -> Self {
        Self {
            generated_at,
            data_points,
            model: MOCK_MODEL.to_string(),
            source: ForecastSource::Mock,
        }
    }
}

/// Seasonal view inside a [`ConditionOutlook`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    rename_all(serialize = "camelCase", deserialize = "snake_case"),
    default
)]
pub struct SeasonalTrend {
    /// Whether reports are expected to rise.
    pub increasing: bool,
    /// Months with the most expected damage.
    pub peak_months: Vec<String>,
    /// Free-text description of the seasonal pattern.
    pub seasonal_pattern: String,
}

fn default_ai_confidence() -> f64 {
    AI_DEFAULT_CONFIDENCE
}

fn default_timeframe() -> String {
    "Next 30 days".to_string()
}

/// The AI-filled part of a condition forecast.
///
/// Read from the model's JSON in `snake_case`; only `predicted_severity`
/// is required. Missing fields take the defaults noted on each field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct ConditionOutlook {
    /// Expected severity.
    pub predicted_severity: Severity,
    /// Model confidence, default `0.7`, clamped to `[0, 1]`.
    #[serde(default = "default_ai_confidence")]
    pub confidence: f64,
    /// Contributing risk factors, default empty.
    #[serde(default)]
    pub risk_factors: Vec<String>,
    /// Forecast horizon, default `"Next 30 days"`.
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
    /// Seasonal view, default all-empty.
    #[serde(default)]
    pub trend_analysis: SeasonalTrend,
    /// Suggested actions, default empty.
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Weather impact narrative, default empty.
    #[serde(default)]
    pub weather_impact: String,
}

impl ConditionOutlook {
    /// Clamps numeric fields into range.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.confidence = clamp_unit(self.confidence, AI_DEFAULT_CONFIDENCE);
        self
    }
}

/// Condition forecast for a location.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionForecast {
    /// Forecast content.
    #[serde(flatten)]
    pub outlook: ConditionOutlook,
    /// The location the forecast was requested for.
    pub location: Location,
    /// Provenance.
    #[serde(flatten)]
    pub metadata: GenerationMetadata,
}

/// A string-keyed map that keeps entries in the order they were written.
///
/// Deserializing is lenient: an entry whose value does not fit `V` is
/// skipped instead of failing the whole map. A repeated key keeps its first
/// position and its last value.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V>(Vec<(String, V)>);

impl<V> OrderedMap<V> {
    /// Value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Inserts or replaces `key`, keeping the position of an existing entry.
    pub fn insert(&mut self, key: String, value: V) {
        if let Some(idx) = self.0.iter().position(|(k, _)| *k == key) {
            self.0[idx].1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        for (key, value) in iter {
            map.insert(key.into(), value);
        }
        map
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de, V: DeserializeOwned> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<V>(PhantomData<V>);

        impl<'de, V: DeserializeOwned> Visitor<'de> for EntriesVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = OrderedMap::default();
                while let Some((key, raw)) = access.next_entry::<String, serde_json::Value>()? {
                    match serde_json::from_value(raw) {
                        Ok(value) => map.insert(key, value),
                        Err(e) => log::debug!("Skipping map entry {key:?}: {e}"),
                    }
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

fn default_forecast_period() -> String {
    "Next 6 months".to_string()
}

const fn default_trend_direction() -> Trend {
    Trend::Stable
}

/// Reads a trend word case-insensitively; anything unreadable is stable.
fn lenient_trend<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Trend, D::Error> {
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw
        .as_str()
        .and_then(|word| word.trim().parse().ok())
        .unwrap_or_else(default_trend_direction))
}

fn default_trend_confidence() -> f64 {
    STATISTICAL_CONFIDENCE
}

/// The AI-filled part of a reporting-trend forecast.
///
/// Read from the model's JSON in `snake_case`; every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct TrendOutlook {
    /// Forecast horizon, default `"Next 6 months"`.
    #[serde(default = "default_forecast_period")]
    pub forecast_period: String,
    /// Expected report counts per period label in the order given,
    /// default empty. Non-numeric counts are dropped.
    #[serde(default)]
    pub predicted_reports: OrderedMap<f64>,
    /// Expected direction, default stable. Unknown words read as stable.
    #[serde(
        default = "default_trend_direction",
        deserialize_with = "lenient_trend"
    )]
    pub trend_direction: Trend,
    /// Seasons with the most reports, default empty.
    #[serde(default)]
    pub peak_periods: Vec<String>,
    /// Direction per issue type as the model worded it, default empty.
    #[serde(default)]
    pub issue_type_trends: OrderedMap<String>,
    /// Suggested actions, default empty.
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Model confidence, default `0.6`, clamped to `[0, 1]`.
    #[serde(default = "default_trend_confidence")]
    pub confidence_level: f64,
}

impl TrendOutlook {
    /// Clamps numeric fields into range.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.confidence_level = clamp_unit(self.confidence_level, STATISTICAL_CONFIDENCE);
        self
    }
}

/// Reporting-trend forecast for a named area.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendForecast {
    /// Forecast content.
    #[serde(flatten)]
    pub outlook: TrendOutlook,
    /// Name of the area the forecast covers.
    pub area_name: String,
    /// Provenance.
    #[serde(flatten)]
    pub metadata: GenerationMetadata,
}

fn clamp_unit(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}
