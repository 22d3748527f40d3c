// tests/analyzer_fallbacks.rs
//
// Two-tier fallback behaviour of the hazard analyzer with stub oracles.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use ocean_hazard_sentinel::analyze::ai_adapter::{FailingOracle, FixedOracle, Oracle};
use ocean_hazard_sentinel::analyze::{
    AnalysisOutcome, HazardAnalyzer, HARD_FAILURE_CONFIDENCE, SOFT_FAILURE_CONFIDENCE,
};
use ocean_hazard_sentinel::model::{HazardType, Sentiment, Severity};

/// Never answers within the analyzer's bound.
struct SlowOracle;

#[async_trait::async_trait]
impl Oracle for SlowOracle {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("{}".into())
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

fn analyzer(oracle: impl Oracle + 'static) -> HazardAnalyzer {
    HazardAnalyzer::new(Arc::new(oracle), Duration::from_millis(200))
}

#[tokio::test]
async fn well_formed_reply_is_coerced() {
    let reply = r#"{"hazard_detected": true, "hazard_types": ["oil_spill", "volcano"],
        "severity_prediction": "high", "location_mentioned": "Goa",
        "sentiment": "negative", "sentiment_score": -0.6, "confidence_score": 0.85,
        "key_phrases": ["oil spill"], "language": "en"}"#;
    let a = analyzer(FixedOracle::new(reply));
    let (outcome, r) = a.analyze_detailed("Oil spill spotted off Goa coast", "en").await;

    assert_eq!(outcome, AnalysisOutcome::Success);
    assert!(r.hazard_detected);
    assert_eq!(r.hazard_types, vec![HazardType::OilSpill]);
    assert_eq!(r.severity_prediction, Some(Severity::High));
    assert_eq!(r.location_mentioned.as_deref(), Some("Goa"));
    assert_eq!(r.sentiment, Sentiment::Negative);
    assert!((r.confidence_score - 0.85).abs() < 1e-6);
    assert_eq!(r.source_text, "Oil spill spotted off Goa coast");
}

#[tokio::test]
async fn prose_reply_is_soft_failure() {
    let a = analyzer(FixedOracle::new("I think there may be waves."));
    let (outcome, r) = a.analyze_detailed("waves at Juhu", "en").await;

    assert_eq!(outcome, AnalysisOutcome::SoftFailure);
    assert!(!r.hazard_detected);
    assert!(r.hazard_types.is_empty());
    assert_eq!(r.severity_prediction, None);
    assert_eq!(r.sentiment, Sentiment::Neutral);
    assert_eq!(r.sentiment_score, 0.0);
    assert_eq!(r.confidence_score, SOFT_FAILURE_CONFIDENCE);
}

#[tokio::test]
async fn fenced_json_is_accepted() {
    let reply = "```json\n{\"hazard_detected\": false, \"confidence_score\": 0.4}\n```";
    let a = analyzer(FixedOracle::new(reply));
    let (outcome, r) = a.analyze_detailed("calm sea today", "en").await;
    assert_eq!(outcome, AnalysisOutcome::Success);
    assert!((r.confidence_score - 0.4).abs() < 1e-6);
}

#[tokio::test]
async fn oracle_error_is_hard_failure() {
    let a = analyzer(FailingOracle::new("connection refused"));
    let (outcome, r) = a.analyze_detailed("tsunami warning", "ta").await;

    assert_eq!(outcome, AnalysisOutcome::HardFailure);
    assert_eq!(r.confidence_score, HARD_FAILURE_CONFIDENCE);
    assert!(!r.hazard_detected);
    assert_eq!(r.language, "ta");
}

#[tokio::test]
async fn slow_oracle_is_hard_failure() {
    let a = analyzer(SlowOracle);
    let r = a.analyze("tsunami warning", "en").await;
    assert_eq!(r.confidence_score, HARD_FAILURE_CONFIDENCE);
    assert_eq!(AnalysisOutcome::of(&r), AnalysisOutcome::HardFailure);
}
