//! Fixed fallback forecasts used when the model is disabled or unusable.

use chrono::{DateTime, Utc};
use fixmypothole_ai_models::{
    ConditionForecast, ConditionOutlook, GenerationMetadata, OrderedMap, SeasonalTrend,
    TrendForecast, TrendOutlook,
};
use fixmypothole_analytics_models::Trend;
use fixmypothole_report_models::{Location, Severity};

/// Confidence reported by the mock condition forecast.
pub const MOCK_CONDITION_CONFIDENCE: f64 = 0.65;

/// Monthly report counts reported by the mock trend forecast.
pub const MOCK_MONTHLY_REPORTS: [f64; 6] = [12.0, 15.0, 18.0, 14.0, 16.0, 13.0];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

/// Monsoon-themed condition outlook.
#[must_use]
pub fn mock_condition_outlook() -> ConditionOutlook {
    ConditionOutlook {
        predicted_severity: Severity::Medium,
        confidence: MOCK_CONDITION_CONFIDENCE,
        risk_factors: strings(&["Heavy traffic", "Monsoon season", "Road age"]),
        timeframe: "Next 30 days".to_string(),
        trend_analysis: SeasonalTrend {
            increasing: true,
            peak_months: strings(&["July", "August"]),
            seasonal_pattern: "Higher activity during monsoon season".to_string(),
        },
        recommendations: strings(&[
            "Increase monitoring during monsoon",
            "Schedule preventive maintenance",
        ]),
        weather_impact: "Monsoon rains likely to worsen existing potholes".to_string(),
    }
}

/// Mock condition forecast for `location`. Always reports zero data points.
#[must_use]
pub fn mock_condition_forecast(location: &Location, now: DateTime<Utc>) -> ConditionForecast {
    ConditionForecast {
        outlook: mock_condition_outlook(),
        location: location.clone(),
        metadata: GenerationMetadata::mock(now, 0),
    }
}

/// Six-month stable trend outlook.
#[must_use]
pub fn mock_trend_outlook() -> TrendOutlook {
    let predicted_reports: OrderedMap<f64> = MOCK_MONTHLY_REPORTS
        .iter()
        .enumerate()
        .map(|(idx, count)| (format!("month{}", idx + 1), *count))
        .collect();

    let issue_type_trends: OrderedMap<String> = [
        ("potholes", Trend::Stable),
        ("drainage", Trend::Increasing),
        ("street_lamps", Trend::Stable),
    ]
    .into_iter()
    .map(|(issue, trend)| (issue, trend.to_string()))
    .collect();

    TrendOutlook {
        forecast_period: "Next 6 months".to_string(),
        predicted_reports,
        trend_direction: Trend::Stable,
        peak_periods: strings(&["monsoon", "post-winter"]),
        issue_type_trends,
        recommendations: strings(&[
            "Monitor during peak seasons",
            "Focus on preventive maintenance",
        ]),
        confidence_level: 0.6,
    }
}

/// Mock trend forecast for `area_name` built over `data_points` reports.
#[must_use]
pub fn mock_trend_forecast(
    area_name: &str,
    data_points: usize,
    now: DateTime<Utc>,
) -> TrendForecast {
    TrendForecast {
        outlook: mock_trend_outlook(),
        area_name: area_name.to_string(),
        metadata: GenerationMetadata::mock(now, data_points),
    }
}
