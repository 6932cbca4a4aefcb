//! Prediction blender.
//!
//! Every public method here is total. Statistical results are computed
//! first and always attached. The model is consulted only when a provider
//! is configured, and any failure on that path (transport, timeout, empty
//! answer, malformed JSON) is logged and replaced by the statistical or
//! mock answer.

use std::time::Duration;

use chrono::Utc;
use fixmypothole_ai_models::{
    ConditionForecast, ConditionOutlook, ForecastSource, GenerationMetadata, PredictionResult,
    TrendForecast, TrendOutlook,
};
use fixmypothole_analytics::geofilter::{DEFAULT_RADIUS_KM, filter_reports};
use fixmypothole_analytics::hotspots::identify_hotspots;
use fixmypothole_analytics::summary::{
    monthly_patterns, report_stats, severity_distribution, summarize_reports,
};
use fixmypothole_analytics::trends::analyze_trends;
use fixmypothole_analytics_models::TimeRange;
use fixmypothole_report_models::{Location, RawReport, Report};

use crate::providers::{AiConfig, CompletionProvider, DEFAULT_TIMEOUT, create_provider};
use crate::{AiError, mock, parser, prompts};

/// Severity prediction and forecasting over hazard reports.
pub struct PredictiveAnalytics {
    provider: Option<Box<dyn CompletionProvider>>,
    timeout: Duration,
    radius_km: f64,
}

impl PredictiveAnalytics {
    /// Creates a predictor around an optional provider.
    #[must_use]
    pub fn new(provider: Option<Box<dyn CompletionProvider>>) -> Self {
        Self {
            provider,
            timeout: DEFAULT_TIMEOUT,
            radius_km: DEFAULT_RADIUS_KM,
        }
    }

    /// Creates a predictor configured from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let config = AiConfig::from_env();
        Self::new(create_provider(&config)).with_timeout(config.timeout)
    }

    /// Overrides the completion timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the geofilter radius.
    #[must_use]
    pub fn with_radius_km(mut self, radius_km: f64) -> Self {
        self.radius_km = radius_km;
        self
    }

    /// Whether a model provider is configured.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Predicts hazard severity around `location`.
    ///
    /// Reports outside the geofilter radius or with malformed fields are
    /// ignored.
    pub async fn predict(
        &self,
        location: &Location,
        reports: &[RawReport],
        time_range: TimeRange,
    ) -> PredictionResult {
        let subset = filter_reports(reports, location, self.radius_km);
        self.predict_subset(location, &subset, time_range).await
    }

    /// Predicts hazard severity over an already filtered report subset.
    ///
    /// Returns confidence `0.6` when the model is disabled, fails, or there
    /// are no reports to analyse, and the all-default `0.3` result when the
    /// statistical analysis itself cannot be computed.
    pub async fn predict_subset(
        &self,
        location: &Location,
        subset: &[Report],
        time_range: TimeRange,
    ) -> PredictionResult {
        let hotspots = identify_hotspots(subset);
        let trend = match analyze_trends(subset) {
            Ok(trend) => trend,
            Err(e) => {
                log::error!("Statistical analysis failed, returning default prediction: {e}");
                return PredictionResult::all_default();
            }
        };

        let Some(provider) = self.provider.as_deref() else {
            return PredictionResult::statistical(hotspots, trend);
        };

        if subset.is_empty() {
            log::debug!("No reports within range, skipping AI analysis");
            return PredictionResult::statistical(hotspots, trend);
        }

        let stats = report_stats(subset, time_range, Utc::now());
        let prompt = prompts::analysis_prompt(location, &stats, time_range);

        match self.complete(provider, &prompt).await {
            Ok(text) => {
                let insights = parser::extract_insights(&text);
                log::debug!(
                    "AI prediction: severity={} confidence={:.2} extraction={:.2}",
                    insights.severity,
                    insights.confidence,
                    insights.extraction_confidence,
                );
                PredictionResult::from_ai(insights, hotspots, trend)
            }
            Err(e) => {
                log::error!("AI prediction failed, using statistical fallback: {e}");
                PredictionResult::statistical(hotspots, trend)
            }
        }
    }

    /// Forecasts road conditions at `location` from all given reports.
    pub async fn forecast_conditions(
        &self,
        location: &Location,
        reports: &[RawReport],
    ) -> ConditionForecast {
        let Some(provider) = self.provider.as_deref() else {
            return mock::mock_condition_forecast(location, Utc::now());
        };

        let summary = summarize_reports(reports, Utc::now());
        let prompt = prompts::condition_forecast_prompt(location, reports.len(), &summary);

        match self.structured::<ConditionOutlook>(provider, &prompt).await {
            Ok(outlook) => ConditionForecast {
                outlook: outlook.normalized(),
                location: location.clone(),
                metadata: ai_metadata(provider, reports.len()),
            },
            Err(e) => {
                log::error!("Condition forecast failed, using mock forecast: {e}");
                mock::mock_condition_forecast(location, Utc::now())
            }
        }
    }

    /// Forecasts reporting trends for a named area.
    pub async fn trend_forecast(&self, reports: &[RawReport], area_name: &str) -> TrendForecast {
        let Some(provider) = self.provider.as_deref() else {
            return mock::mock_trend_forecast(area_name, reports.len(), Utc::now());
        };

        match self.trend_outlook(provider, reports, area_name).await {
            Ok(outlook) => TrendForecast {
                outlook: outlook.normalized(),
                area_name: area_name.to_string(),
                metadata: ai_metadata(provider, reports.len()),
            },
            Err(e) => {
                log::error!("Trend forecast failed, using mock forecast: {e}");
                mock::mock_trend_forecast(area_name, reports.len(), Utc::now())
            }
        }
    }

    /// Runs one completion under the configured timeout.
    async fn complete(
        &self,
        provider: &dyn CompletionProvider,
        prompt: &str,
    ) -> Result<String, AiError> {
        let text = tokio::time::timeout(self.timeout, provider.complete(prompt))
            .await
            .map_err(|_| AiError::Timeout {
                seconds: self.timeout.as_secs(),
            })??;

        if text.trim().is_empty() {
            return Err(AiError::EmptyResponse);
        }

        Ok(text)
    }

    async fn structured<T: serde::de::DeserializeOwned>(
        &self,
        provider: &dyn CompletionProvider,
        prompt: &str,
    ) -> Result<T, AiError> {
        let text = self.complete(provider, prompt).await?;
        Ok(parser::extract_json_block(&text)?)
    }

    async fn trend_outlook(
        &self,
        provider: &dyn CompletionProvider,
        reports: &[RawReport],
        area_name: &str,
    ) -> Result<TrendOutlook, AiError> {
        let prompt = prompts::trend_forecast_prompt(
            area_name,
            reports.len(),
            &monthly_patterns(reports),
            &severity_distribution(reports),
        )?;
        self.structured(provider, &prompt).await
    }
}

fn ai_metadata(provider: &dyn CompletionProvider, data_points: usize) -> GenerationMetadata {
    GenerationMetadata {
        generated_at: Utc::now(),
        data_points,
        model: provider.model().to_string(),
        source: ForecastSource::Ai,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::NaiveDate;
    use fixmypothole_ai_models::{DEFAULT_CONFIDENCE, MOCK_MODEL, STATISTICAL_CONFIDENCE};
    use fixmypothole_analytics_models::Trend;
    use fixmypothole_report_models::{
        FixingStatus, Severity, VerificationStatus, parse_report_batch,
    };

    use super::*;

    /// Replies with a fixed answer and records every prompt.
    struct ScriptedProvider {
        reply: Result<String, String>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedProvider {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                prompts: Arc::default(),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                prompts: Arc::default(),
            }
        }
    }

    #[async_trait::async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(&self, prompt: &str) -> Result<String, AiError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .clone()
                .map_err(|message| AiError::Provider { message })
        }

        fn model(&self) -> &str {
            "scripted-model"
        }
    }

    struct HangingProvider;

    #[async_trait::async_trait]
    impl CompletionProvider for HangingProvider {
        async fn complete(&self, _prompt: &str) -> Result<String, AiError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }

        fn model(&self) -> &str {
            "hanging"
        }
    }

    fn with(provider: impl CompletionProvider + 'static) -> PredictiveAnalytics {
        PredictiveAnalytics::new(Some(Box::new(provider)))
    }

    fn center() -> Location {
        Location::new(12.97, 77.59)
    }

    /// Three reports around the center plus one far away and one broken.
    fn reports() -> Vec<RawReport> {
        parse_report_batch(
            r#"[
                {"location": {"lat": 12.9700, "lng": 77.5900}, "severity": "high",
                 "createdAt": "2024-06-03T10:00:00Z", "verified": true, "fixingStatus": "pending"},
                {"location": {"lat": 12.9701, "lng": 77.5900}, "severity": "medium",
                 "createdAt": "2024-06-12T10:00:00Z", "verified": "verified", "fixingStatus": "resolved"},
                {"location": {"lat": 12.9700, "lng": 77.5901}, "severity": "low",
                 "createdAt": "2024-06-20T10:00:00Z", "verified": false, "fixingStatus": "pending"},
                {"location": {"lat": 13.5000, "lng": 78.0000}, "severity": "high",
                 "createdAt": "2024-06-20T10:00:00Z", "verified": true, "fixingStatus": "pending"},
                {"severity": "high"}
            ]"#,
        )
        .unwrap()
    }

    const ANALYSIS_REPLY: &str = "Severity: high\n\
        Confidence: 0.82\n\
        The trend is upward\n\
        We recommend resurfacing soon.";

    #[tokio::test]
    async fn disabled_ai_is_statistical() {
        let analytics = PredictiveAnalytics::new(None);
        assert!(!analytics.is_enabled());

        let result = analytics
            .predict(&center(), &reports(), TimeRange::Week)
            .await;

        assert!((result.confidence - STATISTICAL_CONFIDENCE).abs() < f64::EPSILON);
        assert!(result.trends.ai.is_none());
        assert_eq!(result.predicted_severity, result.trends.statistical.prediction);
        assert_eq!(result.hotspots.len(), 1);
        assert_eq!(result.hotspots[0].count, 3);
    }

    #[tokio::test]
    async fn disabled_ai_with_no_reports() {
        let result = PredictiveAnalytics::new(None)
            .predict(&center(), &[], TimeRange::Week)
            .await;

        assert!((result.confidence - STATISTICAL_CONFIDENCE).abs() < f64::EPSILON);
        assert_eq!(result.predicted_severity, Severity::Low);
        assert_eq!(result.trends.statistical.trend, Trend::Stable);
        assert!(result.hotspots.is_empty());
    }

    #[tokio::test]
    async fn no_nearby_reports_skips_the_model() {
        let provider = ScriptedProvider::replying("Severity: critical\nConfidence: 0.95");
        let prompts = Arc::clone(&provider.prompts);

        let result = with(provider)
            .predict(&Location::new(1.0, 1.0), &reports(), TimeRange::Week)
            .await;

        assert!(prompts.lock().unwrap().is_empty());
        assert!((result.confidence - STATISTICAL_CONFIDENCE).abs() < f64::EPSILON);
        assert_eq!(result.predicted_severity, Severity::Low);
        assert_eq!(result.trends.statistical.trend, Trend::Stable);
        assert!(result.trends.ai.is_none());
        assert!(result.hotspots.is_empty());
    }

    #[tokio::test]
    async fn ai_values_take_precedence() {
        let analytics = with(ScriptedProvider::replying(ANALYSIS_REPLY));
        assert!(analytics.is_enabled());

        let result = analytics
            .predict(&center(), &reports(), TimeRange::Year)
            .await;

        assert_eq!(result.predicted_severity, Severity::High);
        assert!((result.confidence - 0.82).abs() < 1e-12);
        let ai = result.trends.ai.unwrap();
        assert_eq!(ai.description, "is upward");
        assert_eq!(ai.recommendations, vec!["We recommend resurfacing soon."]);
        // Statistical view is attached alongside.
        assert_eq!(result.trends.statistical.trend, Trend::Stable);
    }

    #[tokio::test]
    async fn analysis_prompt_uses_filtered_subset() {
        let provider = ScriptedProvider::replying(ANALYSIS_REPLY);
        let prompts = Arc::clone(&provider.prompts);

        with(provider)
            .predict(&center(), &reports(), TimeRange::Year)
            .await;

        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        // Only the three nearby, well-formed reports are counted.
        assert!(prompts[0].contains("- Total reports: 3\n"));
        assert!(prompts[0].contains("- High severity reports: 1\n"));
        assert!(prompts[0].contains("- Verified reports: 2\n"));
        assert!(prompts[0].contains("- Resolved issues: 1\n"));
    }

    #[tokio::test]
    async fn ai_failure_falls_back_to_statistical() {
        let result = with(ScriptedProvider::failing("quota exceeded"))
            .predict(&center(), &reports(), TimeRange::Week)
            .await;

        assert!((result.confidence - STATISTICAL_CONFIDENCE).abs() < f64::EPSILON);
        assert!(result.trends.ai.is_none());
    }

    #[tokio::test]
    async fn blank_ai_answer_falls_back() {
        let result = with(ScriptedProvider::replying("  \n "))
            .predict(&center(), &reports(), TimeRange::Week)
            .await;

        assert!((result.confidence - STATISTICAL_CONFIDENCE).abs() < f64::EPSILON);
        assert!(result.trends.ai.is_none());
    }

    #[tokio::test]
    async fn slow_ai_times_out() {
        let result = with(HangingProvider)
            .with_timeout(Duration::from_millis(20))
            .predict(&center(), &reports(), TimeRange::Week)
            .await;

        assert!((result.confidence - STATISTICAL_CONFIDENCE).abs() < f64::EPSILON);
        assert!(result.trends.ai.is_none());
    }

    #[tokio::test]
    async fn statistical_failure_is_all_default() {
        let Some(created_at) = NaiveDate::MAX.and_hms_opt(12, 0, 0) else {
            panic!("invalid time");
        };
        let subset = vec![Report {
            latitude: 12.97,
            longitude: 77.59,
            severity: Severity::High,
            created_at: created_at.and_utc(),
            report_type: "pothole".to_string(),
            verified: VerificationStatus::Verified,
            fixing_status: FixingStatus::Pending,
        }];

        let result = with(ScriptedProvider::replying(ANALYSIS_REPLY))
            .predict_subset(&center(), &subset, TimeRange::Week)
            .await;

        assert_eq!(result, PredictionResult::all_default());
        assert!((result.confidence - DEFAULT_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn condition_forecast_from_ai_json() {
        let reply = r#"Sure! {"predicted_severity": "high", "confidence": 1.4,
            "risk_factors": ["Monsoon"], "trend_analysis": {"increasing": true}} Hope this helps."#;
        let location = center().with_address("MG Road");

        let forecast = with(ScriptedProvider::replying(reply))
            .forecast_conditions(&location, &reports())
            .await;

        assert_eq!(forecast.outlook.predicted_severity, Severity::High);
        assert!((forecast.outlook.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(forecast.outlook.timeframe, "Next 30 days");
        assert!(forecast.outlook.trend_analysis.increasing);
        assert_eq!(forecast.location, location);
        assert_eq!(forecast.metadata.source, ForecastSource::Ai);
        assert_eq!(forecast.metadata.model, "scripted-model");
        assert_eq!(forecast.metadata.data_points, 5);
    }

    #[tokio::test]
    async fn condition_forecast_malformed_json_is_mock() {
        let forecast = with(ScriptedProvider::replying("{ definitely not json"))
            .forecast_conditions(&center(), &reports())
            .await;

        assert_eq!(forecast.metadata.source, ForecastSource::Mock);
        assert_eq!(forecast.metadata.model, MOCK_MODEL);
        assert_eq!(forecast.metadata.data_points, 0);
        assert!((forecast.outlook.confidence - 0.65).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn condition_forecast_disabled_is_mock() {
        let forecast = PredictiveAnalytics::new(None)
            .forecast_conditions(&center(), &reports())
            .await;

        assert_eq!(forecast.metadata.source, ForecastSource::Mock);
        assert_eq!(forecast.outlook.predicted_severity, Severity::Medium);
    }

    #[tokio::test]
    async fn trend_forecast_from_ai_json() {
        let reply = r#"{"forecast_period": "Next 3 months",
            "predicted_reports": {"month1": 4, "month2": 6},
            "trend_direction": "increasing",
            "confidence_level": 0.75}"#;

        let forecast = with(ScriptedProvider::replying(reply))
            .trend_forecast(&reports(), "Indiranagar")
            .await;

        assert_eq!(forecast.outlook.forecast_period, "Next 3 months");
        assert_eq!(forecast.outlook.predicted_reports.get("month2"), Some(&6.0));
        assert_eq!(forecast.outlook.trend_direction, Trend::Increasing);
        assert!((forecast.outlook.confidence_level - 0.75).abs() < 1e-12);
        assert_eq!(forecast.area_name, "Indiranagar");
        assert_eq!(forecast.metadata.source, ForecastSource::Ai);
        assert_eq!(forecast.metadata.data_points, 5);
    }

    #[tokio::test]
    async fn trend_forecast_accepts_loose_json() {
        let reply = r#"{"trend_direction": "Increasing",
            "predicted_reports": {"month1": 15.5, "month2": 18},
            "issue_type_trends": {"potholes": "rising"}}"#;

        let forecast = with(ScriptedProvider::replying(reply))
            .trend_forecast(&reports(), "Indiranagar")
            .await;

        assert_eq!(forecast.metadata.source, ForecastSource::Ai);
        assert_eq!(forecast.outlook.trend_direction, Trend::Increasing);
        assert_eq!(forecast.outlook.predicted_reports.len(), 2);
        assert_eq!(
            forecast.outlook.issue_type_trends.get("potholes").map(String::as_str),
            Some("rising")
        );
    }

    #[tokio::test]
    async fn trend_forecast_failure_is_mock_with_counts() {
        let forecast = with(ScriptedProvider::failing("unavailable"))
            .trend_forecast(&reports(), "Indiranagar")
            .await;

        assert_eq!(forecast.metadata.source, ForecastSource::Mock);
        assert_eq!(forecast.metadata.data_points, 5);
        assert_eq!(forecast.outlook.predicted_reports.len(), 6);
    }
}
