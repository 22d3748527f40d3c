//! Entity shapes shared by the analyzer, alert engine, trends and stats.
//!
//! Enumerations serialize as snake_case strings so stored documents and the
//! oracle's JSON use the same vocabulary.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed hazard taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardType {
    TsunamiWarning,
    HighWaves,
    UnusualMarineLife,
    WaterPollution,
    OilSpill,
    CoastalErosion,
    UnusualWeather,
    Debris,
    Other,
}

impl HazardType {
    pub const ALL: [HazardType; 9] = [
        HazardType::TsunamiWarning,
        HazardType::HighWaves,
        HazardType::UnusualMarineLife,
        HazardType::WaterPollution,
        HazardType::OilSpill,
        HazardType::CoastalErosion,
        HazardType::UnusualWeather,
        HazardType::Debris,
        HazardType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HazardType::TsunamiWarning => "tsunami_warning",
            HazardType::HighWaves => "high_waves",
            HazardType::UnusualMarineLife => "unusual_marine_life",
            HazardType::WaterPollution => "water_pollution",
            HazardType::OilSpill => "oil_spill",
            HazardType::CoastalErosion => "coastal_erosion",
            HazardType::UnusualWeather => "unusual_weather",
            HazardType::Debris => "debris",
            HazardType::Other => "other",
        }
    }

    /// Total mapping: unknown strings yield `None`, never an error.
    pub fn parse(s: &str) -> Option<Self> {
        let needle = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|h| h.as_str().eq_ignore_ascii_case(needle))
    }
}

impl fmt::Display for HazardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered severity; comparisons drive alert thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let needle = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(needle))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            "neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Citizen,
    Official,
    Researcher,
    Admin,
}

impl UserRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "citizen" => Some(UserRole::Citizen),
            "official" => Some(UserRole::Official),
            "researcher" => Some(UserRole::Researcher),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }

    /// Roles allowed to verify reports, run batch analysis and deactivate alerts.
    pub fn is_verifier(&self) -> bool {
        matches!(self, UserRole::Official | UserRole::Admin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
    Investigating,
}

fn default_country() -> Option<String> {
    Some("India".to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default = "default_country")]
    pub country: Option<String>,
}

impl Location {
    /// Validating constructor; coordinates outside the WGS84 range are rejected.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let loc = Self {
            latitude,
            longitude,
            address: None,
            city: None,
            state: None,
            country: default_country(),
        };
        loc.validate()?;
        Ok(loc)
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            bail!("latitude {} out of range [-90, 90]", self.latitude);
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            bail!("longitude {} out of range [-180, 180]", self.longitude);
        }
        Ok(())
    }
}

/// Structured hazard assessment produced by the analyzer.
///
/// `confidence_score == 0.0` marks an oracle hard failure, `0.1` an unparsable reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(rename = "text")]
    pub source_text: String,
    pub hazard_detected: bool,
    #[serde(default)]
    pub hazard_types: Vec<HazardType>,
    #[serde(default)]
    pub severity_prediction: Option<Severity>,
    #[serde(default)]
    pub location_mentioned: Option<String>,
    pub sentiment: Sentiment,
    pub sentiment_score: f32,
    pub confidence_score: f32,
    #[serde(default)]
    pub key_phrases: Vec<String>,
    pub language: String,
    #[serde(rename = "analysis_timestamp")]
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardReport {
    pub id: String,
    pub title: String,
    pub description: String,
    pub hazard_type: HazardType,
    pub severity: Severity,
    pub location: Location,
    pub reporter_id: String,
    #[serde(default)]
    pub reporter_name: Option<String>,
    #[serde(default)]
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub verified_by: Option<String>,
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub verification_notes: Option<String>,
    #[serde(default)]
    pub ai_analysis: Option<AnalysisResult>,
    pub language: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub contact_info: Option<String>,
}

fn default_language() -> String {
    "en".to_string()
}

/// Creation payload submitted by a citizen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHazardReport {
    pub title: String,
    pub description: String,
    pub hazard_type: HazardType,
    pub severity: Severity,
    pub location: Location,
    #[serde(default)]
    pub contact_info: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Identity of whoever submits or verifies. Authentication is out of scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reporter {
    pub id: String,
    pub full_name: Option<String>,
    pub role: UserRole,
}

impl HazardReport {
    /// Fresh pending report with a random id.
    pub fn from_submission(new: NewHazardReport, reporter: &Reporter, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: new.title,
            description: new.description,
            hazard_type: new.hazard_type,
            severity: new.severity,
            location: new.location,
            reporter_id: reporter.id.clone(),
            reporter_name: reporter.full_name.clone(),
            status: ReportStatus::Pending,
            created_at: now,
            updated_at: now,
            verified_by: None,
            verified_at: None,
            verification_notes: None,
            ai_analysis: None,
            language: new.language,
            tags: new.tags,
            contact_info: new.contact_info,
        }
    }

    /// Text handed to the analyzer: title and description joined by a space.
    pub fn analysis_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialMediaPost {
    pub id: String,
    /// twitter, facebook, youtube, instagram, ...
    pub platform: String,
    pub post_id: String,
    pub content: String,
    pub author: String,
    pub author_handle: String,
    #[serde(default)]
    pub location: Option<Location>,
    pub created_at: DateTime<Utc>,
    pub collected_at: DateTime<Utc>,
    #[serde(default)]
    pub engagement_metrics: BTreeMap<String, u64>,
    #[serde(default)]
    pub ai_analysis: Option<AnalysisResult>,
    #[serde(default)]
    pub hazard_relevance_score: Option<f32>,
    #[serde(default)]
    pub sentiment_score: Option<f32>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub mentions: Vec<String>,
}

impl SocialMediaPost {
    pub fn new(
        platform: impl Into<String>,
        post_id: impl Into<String>,
        content: impl Into<String>,
        author: impl Into<String>,
        author_handle: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            platform: platform.into(),
            post_id: post_id.into(),
            content: content.into(),
            author: author.into(),
            author_handle: author_handle.into(),
            location: None,
            created_at,
            collected_at: Utc::now(),
            engagement_metrics: BTreeMap::new(),
            ai_analysis: None,
            hazard_relevance_score: None,
            sentiment_score: None,
            language: default_language(),
            hashtags: Vec::new(),
            mentions: Vec::new(),
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Attach an analysis and derive the relevance/sentiment scores from it.
    pub fn attach_analysis(&mut self, analysis: AnalysisResult) {
        self.hazard_relevance_score = Some(relevance_score(&analysis));
        self.sentiment_score = Some(analysis.sentiment_score);
        self.ai_analysis = Some(analysis);
    }
}

/// Confidence when a hazard was detected, otherwise zero.
pub fn relevance_score(analysis: &AnalysisResult) -> f32 {
    if analysis.hazard_detected {
        analysis.confidence_score
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    HazardDetected,
    SocialMediaDetection,
    TrendAlert,
    SystemAlert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSource {
    CitizenReport,
    SocialMedia,
    AiDetection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub title: String,
    pub message: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    #[serde(default)]
    pub location: Option<Location>,
    /// Kilometres.
    #[serde(default)]
    pub affected_area_radius_km: Option<f64>,
    pub source_type: AlertSource,
    /// Weak reference to the originating report/post; may dangle.
    pub source_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Empty means broadcast to every role.
    #[serde(default)]
    pub target_roles: Vec<UserRole>,
}

impl Alert {
    /// One-way: an alert is never reactivated.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    pub fn is_visible_to(&self, role: UserRole) -> bool {
        self.is_active && (self.target_roles.is_empty() || self.target_roles.contains(&role))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub trending_keywords: Vec<String>,
    pub emerging_patterns: Vec<String>,
    pub risk_assessment: Severity,
    pub regional_hotspots: Vec<String>,
    pub recommendations: Vec<String>,
    pub confidence_level: f32,
}

impl TrendSummary {
    /// Empty summary with low risk and the given sentinel confidence.
    pub fn empty(confidence_level: f32) -> Self {
        Self {
            trending_keywords: Vec::new(),
            emerging_patterns: Vec::new(),
            risk_assessment: Severity::Low,
            regional_hotspots: Vec::new(),
            recommendations: Vec::new(),
            confidence_level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_reports: usize,
    pub verified_reports: usize,
    pub pending_reports: usize,
    pub active_alerts: usize,
    pub social_media_posts_analyzed: usize,
    pub reports_last_24h: usize,
    pub most_common_hazard: Option<HazardType>,
    #[serde(default)]
    pub regional_distribution: BTreeMap<String, usize>,
}
