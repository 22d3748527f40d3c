// src/analyze/schema.rs
//! Defensive parsing of oracle replies into typed results.
//!
//! The oracle enforces no schema. Everything here is total: a reply is either not
//! a JSON object (caller takes the soft-failure path) or it is coerced field by
//! field, with unknown enum values dropped and scores clamped into range.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::model::{AnalysisResult, HazardType, Sentiment, Severity, TrendSummary};

pub const DEFAULT_CONFIDENCE: f32 = 0.5;

static RE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z0-9_-]*\s*\n?(.*?)\n?\s*```$").expect("fence regex")
});

/// Parse the reply as a JSON object, unwrapping a Markdown code fence if present.
/// Anything that is not an object yields `None`.
pub fn extract_json_object(reply: &str) -> Option<Map<String, Value>> {
    let trimmed = reply.trim();
    let body = RE_FENCE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(trimmed);
    match serde_json::from_str::<Value>(body).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Coerce a parsed analysis object. Missing or wrongly-typed fields take defaults.
pub fn coerce_analysis(
    obj: &Map<String, Value>,
    source_text: &str,
    language: &str,
    now: DateTime<Utc>,
) -> AnalysisResult {
    let hazard_detected = obj
        .get("hazard_detected")
        .and_then(bool_value)
        .unwrap_or(false);

    let mut hazard_types: Vec<HazardType> = Vec::new();
    for raw in string_list(obj.get("hazard_types")) {
        if let Some(h) = HazardType::parse(&raw) {
            if !hazard_types.contains(&h) {
                hazard_types.push(h);
            }
        }
    }

    let severity_prediction = obj
        .get("severity_prediction")
        .and_then(Value::as_str)
        .and_then(Severity::parse);

    let location_mentioned = obj
        .get("location_mentioned")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
        .map(str::to_string);

    let sentiment = obj
        .get("sentiment")
        .and_then(Value::as_str)
        .and_then(Sentiment::parse)
        .unwrap_or_default();

    let language = obj
        .get("language")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(language)
        .to_string();

    AnalysisResult {
        source_text: source_text.to_string(),
        hazard_detected,
        hazard_types,
        severity_prediction,
        location_mentioned,
        sentiment,
        sentiment_score: score_field(obj, "sentiment_score", 0.0, -1.0, 1.0),
        confidence_score: score_field(obj, "confidence_score", DEFAULT_CONFIDENCE, 0.0, 1.0),
        key_phrases: string_list(obj.get("key_phrases")),
        language,
        analyzed_at: now,
    }
}

/// Coerce a parsed trend object. Unknown risk level → low.
pub fn coerce_trend(obj: &Map<String, Value>) -> TrendSummary {
    TrendSummary {
        trending_keywords: string_list(obj.get("trending_keywords")),
        emerging_patterns: string_list(obj.get("emerging_patterns")),
        risk_assessment: obj
            .get("risk_assessment")
            .and_then(Value::as_str)
            .and_then(Severity::parse)
            .unwrap_or(Severity::Low),
        regional_hotspots: string_list(obj.get("regional_hotspots")),
        recommendations: string_list(obj.get("recommendations")),
        confidence_level: score_field(obj, "confidence_level", DEFAULT_CONFIDENCE, 0.0, 1.0),
    }
}

/// Clamp into `[min, max]`; NaN becomes `default`.
pub fn clamp_score(x: f32, default: f32, min: f32, max: f32) -> f32 {
    if x.is_nan() {
        default
    } else {
        x.clamp(min, max)
    }
}

fn score_field(obj: &Map<String, Value>, key: &str, default: f32, min: f32, max: f32) -> f32 {
    let raw = obj.get(key).and_then(number_value).unwrap_or(default);
    clamp_score(raw, default, min, max)
}

fn number_value(v: &Value) -> Option<f32> {
    match v {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().parse::<f32>().ok(),
        _ => None,
    }
}

fn bool_value(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Array of strings; non-string entries are skipped, blanks trimmed away.
fn string_list(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
