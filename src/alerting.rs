//! # Alert Decision Engine
//! Maps a new report or an analyzed post to zero-or-one [`Alert`].
//!
//! Policy: user-declared `high`/`critical` reports always alert, regardless of
//! analysis confidence; posts alert when the analysis detected a hazard with
//! confidence strictly above 0.7. The engine does not deduplicate.

use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analyze::ai_adapter::{generate_with_timeout, sanitize_message, DynOracle};
use crate::model::{
    Alert, AlertSource, AlertType, AnalysisResult, HazardReport, HazardType, Severity,
    SocialMediaPost, UserRole,
};

/// Strict lower bound on post-analysis confidence for a social media alert.
pub const POST_CONFIDENCE_THRESHOLD: f32 = 0.7;
/// Characters of post content quoted in the alert message.
pub const POST_EXCERPT_CHARS: usize = 100;
const MESSAGE_MAX_CHARS: usize = 200;
const ALERT_TARGETS: [UserRole; 2] = [UserRole::Official, UserRole::Admin];

/// Report rule, without the message: does this report warrant an alert?
pub fn report_needs_alert(report: &HazardReport) -> bool {
    report.severity >= Severity::High
}

/// Post rule: detected hazard and confidence strictly above the threshold.
pub fn post_needs_alert(analysis: &AnalysisResult) -> bool {
    analysis.hazard_detected && analysis.confidence_score > POST_CONFIDENCE_THRESHOLD
}

/// Deterministic message used whenever the oracle cannot write one.
pub fn fallback_alert_message(hazard: HazardType, severity: Severity, location: &str) -> String {
    format!(
        "Ocean hazard alert: {hazard} reported in {location}. Severity: {severity}. Please stay alert and follow local guidelines."
    )
}

fn report_location_label(report: &HazardReport) -> &str {
    report
        .location
        .city
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or("Unknown location")
}

/// First `n` characters (not bytes) of `s`.
pub fn excerpt(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

/// Social media alert, no oracle involved. `None` unless [`post_needs_alert`].
pub fn alert_for_post(post: &SocialMediaPost, analysis: &AnalysisResult) -> Option<Alert> {
    if !post_needs_alert(analysis) {
        return None;
    }
    let message = format!(
        "Potential hazard detected on {}: {}...",
        post.platform,
        excerpt(&post.content, POST_EXCERPT_CHARS)
    );
    counter!("alerts_raised_total", "source" => "social_media").increment(1);
    Some(Alert {
        id: Uuid::new_v4().to_string(),
        title: "Social Media Hazard Detection".to_string(),
        message,
        alert_type: AlertType::SocialMediaDetection,
        severity: analysis.severity_prediction.unwrap_or(Severity::Medium),
        location: post.location.clone(),
        affected_area_radius_km: None,
        source_type: AlertSource::SocialMedia,
        source_id: post.id.clone(),
        created_at: Utc::now(),
        expires_at: None,
        is_active: true,
        target_roles: ALERT_TARGETS.to_vec(),
    })
}

/// Report-side engine; needs the oracle for the alert prose.
#[derive(Clone)]
pub struct AlertEngine {
    oracle: DynOracle,
    timeout: Duration,
}

impl AlertEngine {
    pub fn new(oracle: DynOracle, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    /// `None` for low/medium reports. High/critical always yield an alert,
    /// with a templated message if the oracle fails.
    pub async fn alert_for_report(&self, report: &HazardReport) -> Option<Alert> {
        if !report_needs_alert(report) {
            return None;
        }
        let location = report_location_label(report);
        let message = self
            .alert_message(report.hazard_type, report.severity, location)
            .await;

        counter!("alerts_raised_total", "source" => "citizen_report").increment(1);
        info!(
            target: "alerting",
            report_id = %report.id,
            severity = %report.severity,
            hazard = %report.hazard_type,
            "raising report alert"
        );
        Some(Alert {
            id: Uuid::new_v4().to_string(),
            title: "High Severity Hazard Alert".to_string(),
            message,
            alert_type: AlertType::HazardDetected,
            severity: report.severity,
            location: Some(report.location.clone()),
            affected_area_radius_km: None,
            source_type: AlertSource::CitizenReport,
            source_id: report.id.clone(),
            created_at: Utc::now(),
            expires_at: None,
            is_active: true,
            target_roles: ALERT_TARGETS.to_vec(),
        })
    }

    /// Oracle-written prose, falling back to [`fallback_alert_message`].
    pub async fn alert_message(
        &self,
        hazard: HazardType,
        severity: Severity,
        location: &str,
    ) -> String {
        let prompt = format!(
            "Generate a clear, urgent alert message for the following ocean hazard:\n\n\
             Hazard Type: {hazard}\nSeverity: {severity}\nLocation: {location}\n\n\
             The message should be:\n\
             - Clear and actionable\n\
             - Appropriate for the severity level\n\
             - Include safety recommendations\n\
             - Be under 200 characters\n\
             - Suitable for both citizens and officials\n\n\
             Reply with the message text only."
        );
        match generate_with_timeout(self.oracle.as_ref(), &prompt, self.timeout).await {
            Ok(reply) => {
                let cleaned = sanitize_message(&reply, MESSAGE_MAX_CHARS);
                if cleaned.is_empty() {
                    fallback_alert_message(hazard, severity, location)
                } else {
                    cleaned
                }
            }
            Err(e) => {
                warn!(target: "alerting", error = %e, "alert message generation failed");
                fallback_alert_message(hazard, severity, location)
            }
        }
    }
}
