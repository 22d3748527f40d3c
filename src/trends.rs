//! # Trend Aggregator
//! Summarizes a time window of reports and posts. Only a compact digest
//! (counts plus a few truncated excerpts) is sent to the oracle, never raw full text.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analyze::ai_adapter::{generate_with_timeout, DynOracle};
use crate::analyze::hazard::{AnalysisOutcome, HARD_FAILURE_CONFIDENCE, SOFT_FAILURE_CONFIDENCE};
use crate::analyze::schema::{coerce_trend, extract_json_object};
use crate::model::{HazardReport, SocialMediaPost, TrendSummary};

/// Characters kept from each sampled description/content.
pub const EXCERPT_CHARS: usize = 200;

/// Inclusive time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// `[now - days, now]`.
    pub fn last_days(days: i64, now: DateTime<Utc>) -> Self {
        Self::new(now - ChronoDuration::days(days), now)
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDigest {
    pub total_reports: usize,
    pub hazard_types: BTreeMap<String, usize>,
    pub severities: BTreeMap<String, usize>,
    pub recent_descriptions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocialDigest {
    pub total_posts: usize,
    pub platforms: BTreeMap<String, usize>,
    pub recent_content: Vec<String>,
}

/// Statistical digest handed to the oracle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendDigest {
    pub reports: ReportDigest,
    pub social: SocialDigest,
}

/// What the trends job returns to its caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    pub window: TimeWindow,
    pub total_reports: usize,
    pub total_social_posts: usize,
    pub outcome: AnalysisOutcome,
    pub summary: TrendSummary,
}

fn truncate_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

/// Build the digest from already-windowed entities; `sample` bounds the excerpts.
pub fn build_digest(
    reports: &[&HazardReport],
    posts: &[&SocialMediaPost],
    sample: usize,
) -> TrendDigest {
    let mut hazard_types = BTreeMap::new();
    let mut severities = BTreeMap::new();
    for r in reports {
        *hazard_types.entry(r.hazard_type.to_string()).or_insert(0) += 1;
        *severities.entry(r.severity.to_string()).or_insert(0) += 1;
    }
    let mut platforms = BTreeMap::new();
    for p in posts {
        *platforms.entry(p.platform.to_ascii_lowercase()).or_insert(0) += 1;
    }

    TrendDigest {
        reports: ReportDigest {
            total_reports: reports.len(),
            hazard_types,
            severities,
            recent_descriptions: reports
                .iter()
                .take(sample)
                .map(|r| truncate_chars(&r.description, EXCERPT_CHARS))
                .collect(),
        },
        social: SocialDigest {
            total_posts: posts.len(),
            platforms,
            recent_content: posts
                .iter()
                .take(sample)
                .map(|p| truncate_chars(&p.content, EXCERPT_CHARS))
                .collect(),
        },
    }
}

pub fn build_prompt(digest: &TrendDigest) -> String {
    let reports = serde_json::to_string(&digest.reports).unwrap_or_else(|_| "{}".to_string());
    let social = serde_json::to_string(&digest.social).unwrap_or_else(|_| "{}".to_string());
    format!(
        r#"Analyze the following ocean hazard data and generate insights:

Reports Summary: {reports}
Social Media Summary: {social}

Please provide trend analysis in JSON format:
{{
    "trending_keywords": ["list of trending keywords"],
    "emerging_patterns": ["list of emerging patterns"],
    "risk_assessment": "low|medium|high|critical",
    "regional_hotspots": ["list of areas with high activity"],
    "recommendations": ["list of actionable recommendations"],
    "confidence_level": float between 0 and 1
}}

Respond with the JSON object only."#
    )
}

#[derive(Clone)]
pub struct TrendAggregator {
    oracle: DynOracle,
    timeout: Duration,
    sample: usize,
}

impl TrendAggregator {
    pub fn new(oracle: DynOracle, timeout: Duration, sample: usize) -> Self {
        Self {
            oracle,
            timeout,
            sample,
        }
    }

    /// Never fails; oracle failures become an empty low-risk summary.
    /// Input order is kept, so pass newest-first collections to sample the latest entries.
    pub async fn summarize(
        &self,
        reports: &[HazardReport],
        posts: &[SocialMediaPost],
        window: TimeWindow,
    ) -> TrendReport {
        let reports: Vec<&HazardReport> = reports
            .iter()
            .filter(|r| window.contains(r.created_at))
            .collect();
        let posts: Vec<&SocialMediaPost> = posts
            .iter()
            .filter(|p| window.contains(p.created_at))
            .collect();

        let digest = build_digest(&reports, &posts, self.sample);
        let prompt = build_prompt(&digest);

        let (outcome, summary) =
            match generate_with_timeout(self.oracle.as_ref(), &prompt, self.timeout).await {
                Err(e) => {
                    warn!(target: "trends", error = %e, "trend synthesis failed");
                    (
                        AnalysisOutcome::HardFailure,
                        TrendSummary::empty(HARD_FAILURE_CONFIDENCE),
                    )
                }
                Ok(reply) => match extract_json_object(&reply) {
                    Some(obj) => (AnalysisOutcome::Success, coerce_trend(&obj)),
                    None => {
                        warn!(
                            target: "trends",
                            reply_len = reply.len(),
                            "trend reply is not a JSON object"
                        );
                        (
                            AnalysisOutcome::SoftFailure,
                            TrendSummary::empty(SOFT_FAILURE_CONFIDENCE),
                        )
                    }
                },
            };

        counter!("trend_summaries_total", "outcome" => outcome.as_str()).increment(1);
        info!(
            target: "trends",
            reports = reports.len(),
            posts = posts.len(),
            outcome = outcome.as_str(),
            risk = %summary.risk_assessment,
            "trend summary built"
        );

        TrendReport {
            window,
            total_reports: reports.len(),
            total_social_posts: posts.len(),
            outcome,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::ai_adapter::{FailingOracle, FixedOracle};
    use crate::model::{HazardType, Location, NewHazardReport, Reporter, Severity, UserRole};
    use std::sync::Arc;

    fn report_at(created: DateTime<Utc>, hazard: HazardType, desc: &str) -> HazardReport {
        let new = NewHazardReport {
            title: "t".into(),
            description: desc.into(),
            hazard_type: hazard,
            severity: Severity::Medium,
            location: Location::new(19.1, 72.8).unwrap(),
            contact_info: None,
            language: "en".into(),
            tags: vec![],
        };
        let who = Reporter {
            id: "c".into(),
            full_name: None,
            role: UserRole::Citizen,
        };
        HazardReport::from_submission(new, &who, created)
    }

    #[test]
    fn digest_counts_and_truncates() {
        let now = Utc::now();
        let long = "x".repeat(500);
        let r1 = report_at(now, HazardType::HighWaves, &long);
        let r2 = report_at(now, HazardType::HighWaves, "short");
        let r3 = report_at(now, HazardType::Debris, "nets");
        let p = SocialMediaPost::new("Twitter", "1", "waves", "a", "@a", now);
        let d = build_digest(&[&r1, &r2, &r3], &[&p], 2);
        assert_eq!(d.reports.total_reports, 3);
        assert_eq!(d.reports.hazard_types.get("high_waves"), Some(&2));
        assert_eq!(d.reports.severities.get("medium"), Some(&3));
        assert_eq!(d.reports.recent_descriptions.len(), 2);
        assert_eq!(d.reports.recent_descriptions[0].chars().count(), 200);
        assert_eq!(d.social.platforms.get("twitter"), Some(&1));
    }

    #[tokio::test]
    async fn window_filters_entities() {
        let now = Utc::now();
        let inside = report_at(now - ChronoDuration::days(2), HazardType::OilSpill, "in");
        let outside = report_at(now - ChronoDuration::days(9), HazardType::OilSpill, "out");
        let agg = TrendAggregator::new(
            Arc::new(FailingOracle::new("x")),
            Duration::from_secs(1),
            10,
        );
        let t = agg
            .summarize(&[inside, outside], &[], TimeWindow::last_days(7, now))
            .await;
        assert_eq!(t.total_reports, 1);
        assert_eq!(t.total_social_posts, 0);
    }

    #[tokio::test]
    async fn two_tier_sentinels() {
        fn aggregator(oracle: DynOracle) -> TrendAggregator {
            TrendAggregator::new(oracle, Duration::from_secs(1), 10)
        }

        let now = Utc::now();
        let w = TimeWindow::last_days(7, now);

        let hard = aggregator(Arc::new(FailingOracle::new("x")))
            .summarize(&[], &[], w)
            .await;
        assert_eq!(hard.outcome, AnalysisOutcome::HardFailure);
        assert_eq!(hard.summary, TrendSummary::empty(0.0));

        let soft = aggregator(Arc::new(FixedOracle::new("no idea")))
            .summarize(&[], &[], w)
            .await;
        assert_eq!(soft.outcome, AnalysisOutcome::SoftFailure);
        assert_eq!(soft.summary.risk_assessment, Severity::Low);
        assert!((soft.summary.confidence_level - 0.1).abs() < 1e-6);
        assert!(soft.summary.trending_keywords.is_empty());
    }

    #[tokio::test]
    async fn parsed_summary_is_returned() {
        let reply = r#"{"trending_keywords": ["oil"], "emerging_patterns": [],
            "risk_assessment": "high", "regional_hotspots": ["Goa"],
            "recommendations": ["Close beaches"], "confidence_level": 0.8}"#;
        let t = TrendAggregator::new(Arc::new(FixedOracle::new(reply)), Duration::from_secs(1), 10)
            .summarize(&[], &[], TimeWindow::last_days(7, Utc::now()))
            .await;
        assert_eq!(t.outcome, AnalysisOutcome::Success);
        assert_eq!(t.summary.risk_assessment, Severity::High);
        assert_eq!(t.summary.regional_hotspots, vec!["Goa".to_string()]);
    }
}
