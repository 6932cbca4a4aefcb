//! Prompt builders for the three AI flows.

use fixmypothole_analytics_models::{MonthlyCounts, ReportStats, SeverityDistribution, TimeRange};
use fixmypothole_report_models::Location;

/// Free-text analysis prompt for the severity prediction flow.
#[must_use]
pub fn analysis_prompt(location: &Location, stats: &ReportStats, time_range: TimeRange) -> String {
    format!(
        "Analyze road hazard conditions for location ({lat}, {lng}).

Historical data summary:
- Total reports: {total}
- Recent reports ({time_range}): {recent}
- High severity reports: {high}
- Verified reports: {verified}
- Resolved issues: {resolved}

Based on this data, predict:
1. Expected hazard severity (high/medium/low)
2. Confidence level (0-1)
3. Reporting trends and patterns
4. Recommendations for monitoring/intervention",
        lat = location.lat,
        lng = location.lng,
        total = stats.total_reports,
        recent = stats.recent_reports,
        high = stats.high_severity,
        verified = stats.verified_reports,
        resolved = stats.resolved_reports,
    )
}

/// JSON-requesting prompt for the condition forecast flow.
#[must_use]
pub fn condition_forecast_prompt(
    location: &Location,
    total_reports: usize,
    summary: &str,
) -> String {
    format!(
        r#"Analyze the following data to predict pothole conditions and trends:

Location: {address}
Coordinates: {lat}, {lng}

Historical Report Data:
- Total reports in area: {total_reports}
- Report summary: {summary}

Please provide predictions in the following JSON format:
{{
    "predicted_severity": "high|medium|low",
    "confidence": 0.75,
    "risk_factors": ["factor1", "factor2", "factor3"],
    "timeframe": "Next 30 days",
    "trend_analysis": {{
        "increasing": true,
        "peak_months": ["month1", "month2"],
        "seasonal_pattern": "description"
    }},
    "recommendations": ["recommendation1", "recommendation2"],
    "weather_impact": "description of how weather affects potholes in this area"
}}

Base your predictions on:
1. Historical report frequency and severity
2. Seasonal patterns (monsoon, winter effects)
3. Traffic density implications
4. Road infrastructure age
5. Weather patterns typical for the region"#,
        address = location.address.as_deref().unwrap_or("Unknown location"),
        lat = location.lat,
        lng = location.lng,
    )
}

/// JSON-requesting prompt for the reporting-trend forecast flow.
///
/// # Errors
///
/// * If the monthly or severity counts fail to serialize
pub fn trend_forecast_prompt(
    area_name: &str,
    total_reports: usize,
    monthly: &MonthlyCounts,
    severity: &SeverityDistribution,
) -> Result<String, serde_json::Error> {
    let monthly = serde_json::to_string(monthly)?;
    let severity = serde_json::to_string(severity)?;

    Ok(format!(
        r#"Analyze pothole reporting trends for {area_name} and provide forecasts:

Historical Data:
- Total reports: {total_reports}
- Monthly distribution: {monthly}
- Severity distribution: {severity}

Provide trend analysis in JSON format:
{{
    "forecast_period": "Next 6 months",
    "predicted_reports": {{
        "month1": 15,
        "month2": 18,
        "month3": 22
    }},
    "trend_direction": "increasing|decreasing|stable",
    "peak_periods": ["monsoon", "post-winter"],
    "issue_type_trends": {{
        "potholes": "increasing",
        "drainage": "stable",
        "street_lamps": "decreasing"
    }},
    "recommendations": [
        "Increase maintenance before monsoon",
        "Focus on high-traffic areas"
    ],
    "confidence_level": 0.8
}}"#
    ))
}
