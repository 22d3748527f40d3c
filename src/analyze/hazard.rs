// src/analyze/hazard.rs
//! Hazard analyzer: one prompt, one oracle call, defensive parse, two-tier fallback.

use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use serde::Serialize;
use tracing::{debug, warn};

use crate::analyze::ai_adapter::{generate_with_timeout, DynOracle};
use crate::analyze::schema::{coerce_analysis, extract_json_object};
use crate::model::{AnalysisResult, Sentiment};

/// Confidence of the result returned when the oracle call itself failed.
pub const HARD_FAILURE_CONFIDENCE: f32 = 0.0;
/// Confidence of the result returned when the reply could not be parsed.
pub const SOFT_FAILURE_CONFIDENCE: f32 = 0.1;

/// How an analysis (or trend synthesis) ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Success,
    /// Oracle answered, reply unparsable.
    SoftFailure,
    /// Oracle unreachable, errored or timed out.
    HardFailure,
}

impl AnalysisOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisOutcome::Success => "success",
            AnalysisOutcome::SoftFailure => "soft_failure",
            AnalysisOutcome::HardFailure => "hard_failure",
        }
    }

    /// Best-effort reading of a result that is already stored, based on its sentinel
    /// confidence. An oracle answer that itself carries 0.0/0.1 and no findings reads
    /// as a failure, so this is for display only. Alerting, retries and counters take
    /// the outcome returned by [`HazardAnalyzer::analyze_detailed`].
    pub fn of(result: &AnalysisResult) -> Self {
        if result.hazard_detected || !result.key_phrases.is_empty() {
            return AnalysisOutcome::Success;
        }
        if result.confidence_score == HARD_FAILURE_CONFIDENCE {
            AnalysisOutcome::HardFailure
        } else if (result.confidence_score - SOFT_FAILURE_CONFIDENCE).abs() < f32::EPSILON {
            AnalysisOutcome::SoftFailure
        } else {
            AnalysisOutcome::Success
        }
    }
}

#[derive(Clone)]
pub struct HazardAnalyzer {
    oracle: DynOracle,
    timeout: Duration,
}

impl HazardAnalyzer {
    pub fn new(oracle: DynOracle, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    /// Never fails; failures degrade to a sentinel result.
    pub async fn analyze(&self, text: &str, language: &str) -> AnalysisResult {
        self.analyze_detailed(text, language).await.1
    }

    pub async fn analyze_detailed(
        &self,
        text: &str,
        language: &str,
    ) -> (AnalysisOutcome, AnalysisResult) {
        let prompt = build_prompt(text, language);
        let (outcome, result) =
            match generate_with_timeout(self.oracle.as_ref(), &prompt, self.timeout).await {
                Err(e) => {
                    warn!(
                        target: "analyze",
                        error = %e,
                        oracle = self.oracle.name(),
                        text_len = text.len(),
                        "hazard analysis failed"
                    );
                    (
                        AnalysisOutcome::HardFailure,
                        fallback_result(text, language, HARD_FAILURE_CONFIDENCE),
                    )
                }
                Ok(reply) => match extract_json_object(&reply) {
                    Some(obj) => (
                        AnalysisOutcome::Success,
                        coerce_analysis(&obj, text, language, Utc::now()),
                    ),
                    None => {
                        warn!(
                            target: "analyze",
                            reply_len = reply.len(),
                            "oracle reply is not a JSON object"
                        );
                        (
                            AnalysisOutcome::SoftFailure,
                            fallback_result(text, language, SOFT_FAILURE_CONFIDENCE),
                        )
                    }
                },
            };

        counter!("hazard_analysis_total", "outcome" => outcome.as_str()).increment(1);
        debug!(
            target: "analyze",
            outcome = outcome.as_str(),
            detected = result.hazard_detected,
            confidence = result.confidence_score,
            "hazard analysis done"
        );
        (outcome, result)
    }
}

/// Neutral "no hazard" result carrying the sentinel confidence.
pub fn fallback_result(text: &str, language: &str, confidence: f32) -> AnalysisResult {
    AnalysisResult {
        source_text: text.to_string(),
        hazard_detected: false,
        hazard_types: Vec::new(),
        severity_prediction: None,
        location_mentioned: None,
        sentiment: Sentiment::Neutral,
        sentiment_score: 0.0,
        confidence_score: confidence,
        key_phrases: Vec::new(),
        language: language.to_string(),
        analyzed_at: Utc::now(),
    }
}

pub fn build_prompt(text: &str, language: &str) -> String {
    format!(
        r#"Analyze the following text for ocean and coastal hazards. The text is in language: {language}

Text to analyze: "{text}"

Please provide analysis in the following JSON format:
{{
    "hazard_detected": boolean,
    "hazard_types": ["tsunami_warning", "high_waves", "unusual_marine_life", "water_pollution", "oil_spill", "coastal_erosion", "unusual_weather", "debris", "other"],
    "severity_prediction": "low|medium|high|critical",
    "location_mentioned": "extracted location or null",
    "sentiment": "positive|negative|neutral",
    "sentiment_score": float between -1 and 1,
    "confidence_score": float between 0 and 1,
    "key_phrases": ["list", "of", "key", "phrases"],
    "language": "detected language code"
}}

Focus on marine and coastal hazards. Be conservative in hazard detection to avoid false positives.
Respond with the JSON object only."#
    )
}
