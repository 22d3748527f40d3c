//! Store capability consumed by the pipeline, plus an in-memory implementation.
//!
//! The analyzer never persists; the pipeline hands results to a [`Store`].

use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::model::{
    AnalysisResult, Alert, HazardReport, HazardType, ReportStatus, Severity, SocialMediaPost,
    UserRole,
};

/// Half-width of the nearby-reports box in degrees (roughly 10 km).
pub const NEARBY_BOX_DEGREES: f64 = 0.1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportFilter {
    pub hazard_type: Option<HazardType>,
    pub severity: Option<Severity>,
    pub status: Option<ReportStatus>,
    /// Only reports created at or after this instant.
    pub since: Option<DateTime<Utc>>,
}

impl ReportFilter {
    pub fn matches(&self, r: &HazardReport) -> bool {
        self.hazard_type.is_none_or(|h| r.hazard_type == h)
            && self.severity.is_none_or(|s| r.severity == s)
            && self.status.is_none_or(|s| r.status == s)
            && self.since.is_none_or(|t| r.created_at >= t)
    }
}

/// Verification decision applied by an official/admin.
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub status: ReportStatus,
    pub verifier_id: String,
    pub notes: Option<String>,
    pub at: DateTime<Utc>,
}

/// Result of attaching an analysis to a stored post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostUpdate {
    Attached,
    /// Another sweep got there first; the existing analysis is kept.
    AlreadyAnalyzed,
    Missing,
}

#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn create_report(&self, report: HazardReport) -> Result<HazardReport>;
    async fn get_report(&self, id: &str) -> Result<Option<HazardReport>>;
    /// Newest first.
    async fn list_reports(
        &self,
        filter: &ReportFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<HazardReport>>;
    /// `false` when no report has this id.
    async fn verify_report(&self, id: &str, verification: Verification) -> Result<bool>;
    /// Reports inside the fixed ±0.1° box; `radius_km` is accepted but not used.
    async fn reports_near(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> Result<Vec<HazardReport>>;

    /// `false` when a post with the same `(platform, post_id)` already exists.
    async fn create_post(&self, post: SocialMediaPost) -> Result<bool>;
    /// Newest first, optionally restricted to one platform.
    async fn list_posts(
        &self,
        platform: Option<&str>,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<SocialMediaPost>>;
    /// Posts without an analysis, oldest first, at most `limit`.
    async fn unanalyzed_posts(&self, limit: usize) -> Result<Vec<SocialMediaPost>>;
    /// Attaches only when the post has no analysis yet.
    async fn set_post_analysis(&self, id: &str, analysis: AnalysisResult) -> Result<PostUpdate>;

    async fn create_alert(&self, alert: Alert) -> Result<Alert>;
    /// Active alerts visible to `role` (all active ones when `None`), newest first.
    async fn active_alerts(&self, role: Option<UserRole>) -> Result<Vec<Alert>>;
    async fn all_alerts(&self) -> Result<Vec<Alert>>;
    /// One-way; `false` when no alert has this id.
    async fn deactivate_alert(&self, id: &str) -> Result<bool>;
}

pub type DynStore = Arc<dyn Store>;

#[derive(Debug, Default)]
struct Collections {
    reports: Vec<HazardReport>,
    posts: Vec<SocialMediaPost>,
    alerts: Vec<Alert>,
}

/// Process-local store; good for demos and tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Collections>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T: Clone>(items: &[T], ts: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut v = items.to_vec();
    v.sort_by_key(|b| std::cmp::Reverse(ts(b)));
    v
}

fn within_box(r: &HazardReport, latitude: f64, longitude: f64) -> bool {
    (r.location.latitude - latitude).abs() <= NEARBY_BOX_DEGREES
        && (r.location.longitude - longitude).abs() <= NEARBY_BOX_DEGREES
}

#[async_trait::async_trait]
impl Store for InMemoryStore {
    async fn create_report(&self, report: HazardReport) -> Result<HazardReport> {
        report.location.validate()?;
        let mut g = self.inner.write().await;
        if g.reports.iter().any(|r| r.id == report.id) {
            bail!("report {} already exists", report.id);
        }
        g.reports.push(report.clone());
        Ok(report)
    }

    async fn get_report(&self, id: &str) -> Result<Option<HazardReport>> {
        let g = self.inner.read().await;
        Ok(g.reports.iter().find(|r| r.id == id).cloned())
    }

    async fn list_reports(
        &self,
        filter: &ReportFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<HazardReport>> {
        let g = self.inner.read().await;
        let sorted = newest_first(&g.reports, |r| r.created_at);
        Ok(sorted
            .into_iter()
            .filter(|r| filter.matches(r))
            .skip(skip)
            .take(limit)
            .collect())
    }

    async fn verify_report(&self, id: &str, v: Verification) -> Result<bool> {
        let mut g = self.inner.write().await;
        let Some(r) = g.reports.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        r.status = v.status;
        r.verified_by = Some(v.verifier_id);
        r.verified_at = Some(v.at);
        r.verification_notes = v.notes;
        r.updated_at = v.at;
        Ok(true)
    }

    async fn reports_near(
        &self,
        latitude: f64,
        longitude: f64,
        _radius_km: f64,
    ) -> Result<Vec<HazardReport>> {
        let g = self.inner.read().await;
        let hits: Vec<HazardReport> = g
            .reports
            .iter()
            .filter(|r| within_box(r, latitude, longitude))
            .cloned()
            .collect();
        Ok(newest_first(&hits, |r| r.created_at))
    }

    async fn create_post(&self, post: SocialMediaPost) -> Result<bool> {
        let mut g = self.inner.write().await;
        let dup = g
            .posts
            .iter()
            .any(|p| p.platform == post.platform && p.post_id == post.post_id);
        if dup {
            return Ok(false);
        }
        g.posts.push(post);
        Ok(true)
    }

    async fn list_posts(
        &self,
        platform: Option<&str>,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<SocialMediaPost>> {
        let g = self.inner.read().await;
        let sorted = newest_first(&g.posts, |p| p.created_at);
        Ok(sorted
            .into_iter()
            .filter(|p| platform.is_none_or(|pl| p.platform.eq_ignore_ascii_case(pl)))
            .skip(skip)
            .take(limit)
            .collect())
    }

    async fn unanalyzed_posts(&self, limit: usize) -> Result<Vec<SocialMediaPost>> {
        let g = self.inner.read().await;
        let mut pending: Vec<SocialMediaPost> = g
            .posts
            .iter()
            .filter(|p| p.ai_analysis.is_none())
            .cloned()
            .collect();
        pending.sort_by_key(|p| p.created_at);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn set_post_analysis(&self, id: &str, analysis: AnalysisResult) -> Result<PostUpdate> {
        let mut g = self.inner.write().await;
        let Some(p) = g.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(PostUpdate::Missing);
        };
        if p.ai_analysis.is_some() {
            return Ok(PostUpdate::AlreadyAnalyzed);
        }
        p.attach_analysis(analysis);
        Ok(PostUpdate::Attached)
    }

    async fn create_alert(&self, alert: Alert) -> Result<Alert> {
        let mut g = self.inner.write().await;
        g.alerts.push(alert.clone());
        Ok(alert)
    }

    async fn active_alerts(&self, role: Option<UserRole>) -> Result<Vec<Alert>> {
        let g = self.inner.read().await;
        let visible: Vec<Alert> = g
            .alerts
            .iter()
            .filter(|a| match role {
                Some(role) => a.is_visible_to(role),
                None => a.is_active,
            })
            .cloned()
            .collect();
        Ok(newest_first(&visible, |a| a.created_at))
    }

    async fn all_alerts(&self) -> Result<Vec<Alert>> {
        let g = self.inner.read().await;
        Ok(g.alerts.clone())
    }

    async fn deactivate_alert(&self, id: &str) -> Result<bool> {
        let mut g = self.inner.write().await;
        match g.alerts.iter_mut().find(|a| a.id == id) {
            Some(a) => {
                a.deactivate();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Location, NewHazardReport, Reporter};
    use chrono::Duration;

    fn report(lat: f64, lon: f64, created: DateTime<Utc>) -> HazardReport {
        let new = NewHazardReport {
            title: "t".into(),
            description: "d".into(),
            hazard_type: HazardType::HighWaves,
            severity: Severity::Low,
            location: Location::new(lat, lon).unwrap(),
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

    #[tokio::test]
    async fn nearby_uses_fixed_box_regardless_of_radius() {
        let s = InMemoryStore::new();
        let now = Utc::now();
        s.create_report(report(19.10, 72.82, now)).await.unwrap();
        s.create_report(report(19.19, 72.90, now)).await.unwrap();
        s.create_report(report(19.25, 72.82, now)).await.unwrap();

        let near = s.reports_near(19.10, 72.82, 10.0).await.unwrap();
        assert_eq!(near.len(), 2);
        let wide = s.reports_near(19.10, 72.82, 500.0).await.unwrap();
        assert_eq!(wide.len(), 2, "radius does not widen the box");
    }

    #[tokio::test]
    async fn list_is_newest_first_and_filtered() {
        let s = InMemoryStore::new();
        let now = Utc::now();
        let old = report(10.0, 76.0, now - Duration::days(3));
        let new = report(10.0, 76.0, now);
        s.create_report(old.clone()).await.unwrap();
        s.create_report(new.clone()).await.unwrap();

        let all = s.list_reports(&ReportFilter::default(), 0, 10).await.unwrap();
        assert_eq!(all[0].id, new.id);

        let recent = ReportFilter {
            since: Some(now - Duration::days(1)),
            ..Default::default()
        };
        let got = s.list_reports(&recent, 0, 10).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, new.id);
    }

    #[tokio::test]
    async fn duplicate_posts_are_ignored() {
        let s = InMemoryStore::new();
        let now = Utc::now();
        let a = SocialMediaPost::new("twitter", "42", "waves", "a", "@a", now);
        let b = SocialMediaPost::new("twitter", "42", "waves again", "a", "@a", now);
        assert!(s.create_post(a).await.unwrap());
        assert!(!s.create_post(b).await.unwrap());
        assert_eq!(s.list_posts(None, 0, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn analysis_attaches_once_and_pending_is_oldest_first() {
        use crate::analyze::hazard::fallback_result;

        let s = InMemoryStore::new();
        let now = Utc::now();
        let old = SocialMediaPost::new("twitter", "1", "old", "a", "@a", now - Duration::hours(3));
        let mid = SocialMediaPost::new("twitter", "2", "mid", "a", "@a", now - Duration::hours(2));
        let new = SocialMediaPost::new("twitter", "3", "new", "a", "@a", now);
        let (old_id, new_id) = (old.id.clone(), new.id.clone());
        for p in [new, mid, old] {
            s.create_post(p).await.unwrap();
        }

        let first = s.unanalyzed_posts(2).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].id, old_id);

        let a = fallback_result("new", "en", 0.4);
        assert_eq!(s.set_post_analysis(&new_id, a.clone()).await.unwrap(), PostUpdate::Attached);
        assert_eq!(
            s.set_post_analysis(&new_id, a.clone()).await.unwrap(),
            PostUpdate::AlreadyAnalyzed
        );
        assert_eq!(s.set_post_analysis("missing", a).await.unwrap(), PostUpdate::Missing);
        assert_eq!(s.unanalyzed_posts(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn verification_updates_status() {
        let s = InMemoryStore::new();
        let r = s.create_report(report(10.0, 76.0, Utc::now())).await.unwrap();
        let v = Verification {
            status: ReportStatus::Verified,
            verifier_id: "official_1".into(),
            notes: Some("confirmed by coast guard".into()),
            at: Utc::now(),
        };
        assert!(s.verify_report(&r.id, v.clone()).await.unwrap());
        assert!(!s.verify_report("missing", v).await.unwrap());
        let got = s.get_report(&r.id).await.unwrap().unwrap();
        assert_eq!(got.status, ReportStatus::Verified);
        assert_eq!(got.verified_by.as_deref(), Some("official_1"));
    }
}
