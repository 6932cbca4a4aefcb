//! Extraction of structured fields from model output.
//!
//! Two separate paths with different failure semantics:
//!
//! * [`extract_insights`] is a best-effort keyword scan over free text. It
//!   never fails; it reports how much it actually found through
//!   [`AiInsights::extraction_confidence`].
//! * [`extract_json_block`] is strict. The text between the first `{` and
//!   the last `}` must deserialize into the requested type, otherwise the
//!   caller falls back.

use std::sync::LazyLock;

use fixmypothole_ai_models::{AI_DEFAULT_CONFIDENCE, AiInsights, AiTrendInsight};
use fixmypothole_report_models::Severity;
use regex::Regex;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Severity keyword groups, checked in order. The first group with any
/// keyword present wins.
const SEVERITY_KEYWORDS: &[(Severity, &[&str])] = &[
    (Severity::High, &["high", "severe", "critical", "dangerous"]),
    (Severity::Medium, &["medium", "moderate", "intermediate"]),
    (Severity::Low, &["low", "minor", "minimal"]),
];

const RECOMMENDATION_KEYWORDS: &[&str] = &["recommend", "suggest", "should", "need to"];

const TREND_KEYWORD: &str = "trend";

/// Number of fields [`extract_insights`] tries to find.
const EXTRACTABLE_FIELDS: u8 = 4;

static CONFIDENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"confidence[\s:]+([0-9.]+)").unwrap_or_else(|_| unreachable!())
});

/// Errors from strict JSON-block extraction.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The response text was empty.
    #[error("Response text is empty")]
    Empty,

    /// No `{ ... }` span was found.
    #[error("No JSON object found in response")]
    NoJsonBlock,

    /// The span was found but did not deserialize.
    #[error("Invalid JSON block: {0}")]
    Json(#[from] serde_json::Error),
}

/// Scans free text for severity, confidence, a trend line, and
/// recommendation lines.
///
/// Matching is ASCII case-insensitive. Missing fields fall back to medium
/// severity, confidence `0.7`, an empty trend description, and no
/// recommendations.
#[must_use]
pub fn extract_insights(text: &str) -> AiInsights {
    // ASCII lowering keeps byte offsets aligned with `text`.
    let lower = text.to_ascii_lowercase();
    let mut found = 0u8;

    let severity = match severity_keyword(&lower) {
        Some(severity) => {
            found += 1;
            severity
        }
        None => Severity::Medium,
    };

    let confidence = match confidence_value(&lower) {
        Some(confidence) => {
            found += 1;
            confidence.clamp(0.0, 1.0)
        }
        None => AI_DEFAULT_CONFIDENCE,
    };

    let description = match trend_line(text, &lower) {
        Some(line) => {
            found += 1;
            line
        }
        None => String::new(),
    };

    let recommendations = recommendation_lines(text);
    if !recommendations.is_empty() {
        found += 1;
    }

    if found == 0 {
        log::warn!("No recognisable fields in AI response; using defaults");
    }

    AiInsights {
        severity,
        confidence,
        trends: AiTrendInsight {
            description,
            recommendations,
        },
        extraction_confidence: f64::from(found) / f64::from(EXTRACTABLE_FIELDS),
    }
}

fn severity_keyword(lower: &str) -> Option<Severity> {
    SEVERITY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(severity, _)| *severity)
}

fn confidence_value(lower: &str) -> Option<f64> {
    let raw = CONFIDENCE_RE.captures(lower)?.get(1)?.as_str();
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            log::debug!("Unreadable confidence value in AI response: {raw}");
            None
        }
    }
}

/// Text after the first "trend" up to the end of that line.
fn trend_line(text: &str, lower: &str) -> Option<String> {
    let start = lower.find(TREND_KEYWORD)? + TREND_KEYWORD.len();
    let rest = &text[start..];
    let line = rest.split('\n').next().unwrap_or_default();
    Some(line.trim().to_string())
}

fn recommendation_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| {
            let lower = line.to_ascii_lowercase();
            RECOMMENDATION_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .map(|line| line.trim().to_string())
        .collect()
}

/// Parses the span from the first `{` to the last `}` as `T`.
///
/// # Errors
///
/// * [`ParseError::Empty`] for blank text
/// * [`ParseError::NoJsonBlock`] when there is no such span
/// * [`ParseError::Json`] when the span does not deserialize into `T`
pub fn extract_json_block<T: DeserializeOwned>(text: &str) -> Result<T, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(ParseError::NoJsonBlock);
    };
    if end < start {
        return Err(ParseError::NoJsonBlock);
    }

    Ok(serde_json::from_str(&text[start..=end])?)
}

#[cfg(test)]
mod tests {
    use fixmypothole_ai_models::{ConditionOutlook, TrendOutlook};
    use fixmypothole_analytics_models::Trend;

    use super::*;

    const SAMPLE: &str = "Expected severity: HIGH for this stretch.\n\
        Confidence: 0.85\n\
        Reporting trend: steadily rising since May\n\
        We recommend weekly inspections.\n\
        The council should resurface the junction.\n\
        Nothing else to add.";

    #[test]
    fn extracts_all_fields() {
        let insights = extract_insights(SAMPLE);

        assert_eq!(insights.severity, Severity::High);
        assert!((insights.confidence - 0.85).abs() < 1e-12);
        assert_eq!(insights.trends.description, ": steadily rising since May");
        assert_eq!(
            insights.trends.recommendations,
            vec![
                "We recommend weekly inspections.".to_string(),
                "The council should resurface the junction.".to_string(),
            ]
        );
        assert!((insights.extraction_confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn first_matching_group_wins() {
        // Both "minor" and "critical" appear; the high group is checked first.
        let insights = extract_insights("Minor cracks, but one critical crater.");
        assert_eq!(insights.severity, Severity::High);

        let insights = extract_insights("Moderate wear with minimal risk.");
        assert_eq!(insights.severity, Severity::Medium);

        let insights = extract_insights("Only minor issues.");
        assert_eq!(insights.severity, Severity::Low);
    }

    #[test]
    fn defaults_when_nothing_matches() {
        let insights = extract_insights("Nothing useful here.");

        assert_eq!(insights.severity, Severity::Medium);
        assert!((insights.confidence - AI_DEFAULT_CONFIDENCE).abs() < f64::EPSILON);
        assert!(insights.trends.description.is_empty());
        assert!(insights.trends.recommendations.is_empty());
        assert!(insights.extraction_confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn confidence_is_clamped() {
        let insights = extract_insights("confidence: 7.5");
        assert!((insights.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unreadable_confidence_falls_back() {
        let insights = extract_insights("Confidence: 0.8.1 overall");
        assert!((insights.confidence - AI_DEFAULT_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn trend_match_is_case_insensitive() {
        let insights = extract_insights("TRENDS upward\nsecond line");
        assert_eq!(insights.trends.description, "S upward");
    }

    #[test]
    fn partial_extraction_is_reported() {
        let insights = extract_insights("Severity looks low.\nConfidence 0.4");
        assert_eq!(insights.severity, Severity::Low);
        assert!((insights.confidence - 0.4).abs() < 1e-12);
        assert!((insights.extraction_confidence - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn json_block_with_surrounding_prose() {
        let text = "Here is the forecast:\n```json\n{\"predicted_severity\": \"High\", \
                    \"confidence\": 0.9, \"risk_factors\": [\"Rain\"]}\n```\nThanks!";
        let outlook: ConditionOutlook = extract_json_block(text).unwrap();

        assert_eq!(outlook.predicted_severity, Severity::High);
        assert!((outlook.confidence - 0.9).abs() < 1e-12);
        assert_eq!(outlook.risk_factors, vec!["Rain".to_string()]);
        assert_eq!(outlook.timeframe, "Next 30 days");
    }

    #[test]
    fn json_block_defaults_missing_trend_fields() {
        let outlook: TrendOutlook =
            extract_json_block(r#"{"trend_direction": "increasing"}"#).unwrap();
        assert_eq!(outlook.trend_direction, Trend::Increasing);
        assert_eq!(outlook.forecast_period, "Next 6 months");
        assert!((outlook.confidence_level - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn json_block_failures() {
        assert!(matches!(
            extract_json_block::<TrendOutlook>("   "),
            Err(ParseError::Empty)
        ));
        assert!(matches!(
            extract_json_block::<TrendOutlook>("no braces at all"),
            Err(ParseError::NoJsonBlock)
        ));
        assert!(matches!(
            extract_json_block::<TrendOutlook>("} backwards {"),
            Err(ParseError::NoJsonBlock)
        ));
        assert!(matches!(
            extract_json_block::<TrendOutlook>("{ not json }"),
            Err(ParseError::Json(_))
        ));
        // predicted_severity is required for condition forecasts.
        assert!(matches!(
            extract_json_block::<ConditionOutlook>(r#"{"confidence": 0.5}"#),
            Err(ParseError::Json(_))
        ));
    }
}
