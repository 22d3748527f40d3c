//! Pipeline: wires analyzer, alert engine, trends and stats to a [`Store`].
//!
//! Report submission never fails because analysis or alert prose failed. The
//! social media sweep isolates failures per post.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use metrics::counter;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::alerting::{alert_for_post, AlertEngine};
use crate::analyze::ai_adapter::{build_oracle, DynOracle};
use crate::analyze::hazard::{AnalysisOutcome, HazardAnalyzer};
use crate::analyze::translate::Translator;
use crate::config::{AiConfig, PipelineConfig};
use crate::model::{
    Alert, AnalysisResult, DashboardStats, HazardReport, NewHazardReport, ReportStatus, Reporter,
    SocialMediaPost,
};
use crate::stats::reduce_dashboard_stats;
use crate::store::{DynStore, PostUpdate, ReportFilter, Verification};
use crate::trends::{TimeWindow, TrendAggregator, TrendReport};

/// Actor lacks the official/admin role for a verifier-only action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forbidden(pub &'static str);

impl fmt::Display for Forbidden {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "forbidden: {}", self.0)
    }
}

impl std::error::Error for Forbidden {}

#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub report: HazardReport,
    pub analysis_outcome: AnalysisOutcome,
    pub alert: Option<Alert>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub analyzed_posts: usize,
    pub alerts_raised: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct Pipeline {
    store: DynStore,
    analyzer: HazardAnalyzer,
    alerts: AlertEngine,
    trends: TrendAggregator,
    translator: Translator,
    cfg: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        oracle: DynOracle,
        store: DynStore,
        oracle_timeout: Duration,
        cfg: PipelineConfig,
    ) -> Self {
        Self {
            analyzer: HazardAnalyzer::new(oracle.clone(), oracle_timeout),
            alerts: AlertEngine::new(oracle.clone(), oracle_timeout),
            trends: TrendAggregator::new(oracle.clone(), oracle_timeout, cfg.trend_sample),
            translator: Translator::new(oracle, oracle_timeout),
            store,
            cfg,
        }
    }

    /// Oracle chosen by [`build_oracle`] from the AI config and env.
    pub fn from_config(ai: &AiConfig, cfg: PipelineConfig, store: DynStore) -> Self {
        let oracle = build_oracle(ai);
        info!(oracle = oracle.name(), enabled = ai.enabled, "pipeline oracle ready");
        Self::new(oracle, store, ai.timeout(), cfg)
    }

    pub fn store(&self) -> &DynStore {
        &self.store
    }

    pub fn analyzer(&self) -> &HazardAnalyzer {
        &self.analyzer
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Create a pending report, attach its analysis, persist it and raise the report alert.
    /// Errors only on invalid input or when the report itself cannot be stored.
    pub async fn submit_report(
        &self,
        new: NewHazardReport,
        reporter: &Reporter,
    ) -> Result<Submission> {
        new.location.validate().context("invalid report location")?;

        let mut report = HazardReport::from_submission(new, reporter, Utc::now());
        let (analysis_outcome, analysis) = self
            .analyzer
            .analyze_detailed(&report.analysis_text(), &report.language)
            .await;
        report.ai_analysis = Some(analysis);

        let report = self
            .store
            .create_report(report)
            .await
            .context("storing hazard report")?;

        let mut alert = None;
        if let Some(candidate) = self.alerts.alert_for_report(&report).await {
            match self.store.create_alert(candidate).await {
                Ok(a) => alert = Some(a),
                Err(e) => error!(report_id = %report.id, error = ?e, "storing report alert failed"),
            }
        }

        info!(
            target: "pipeline",
            report_id = %report.id,
            outcome = analysis_outcome.as_str(),
            alerted = alert.is_some(),
            "report submitted"
        );
        Ok(Submission {
            report,
            analysis_outcome,
            alert,
        })
    }

    /// Analyze up to `batch_limit` stored posts that have no analysis yet, oldest first.
    ///
    /// Posts whose oracle call hard-failed stay unanalyzed so a later sweep retries them.
    /// When sweeps overlap, only the one that attaches the analysis raises the alert.
    pub async fn analyze_pending_posts(&self) -> Result<BatchReport> {
        let posts = self
            .store
            .unanalyzed_posts(self.cfg.batch_limit)
            .await
            .context("listing unanalyzed social media posts")?;

        let permits = Arc::new(Semaphore::new(self.cfg.batch_concurrency.max(1)));
        let mut set = JoinSet::new();
        for post in posts {
            let analyzer = self.analyzer.clone();
            let store = self.store.clone();
            let permits = permits.clone();
            set.spawn(async move {
                let _permit = permits.acquire_owned().await?;
                analyze_one(&analyzer, &store, post).await
            });
        }

        let mut report = BatchReport::default();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(PostOutcome::Analyzed { alert })) => {
                    report.analyzed_posts += 1;
                    if alert {
                        report.alerts_raised += 1;
                    }
                }
                Ok(Ok(PostOutcome::AlreadyAnalyzed)) => {}
                Ok(Ok(PostOutcome::OracleDown)) => report.failed += 1,
                Ok(Err(e)) => {
                    warn!(target: "pipeline", error = ?e, "post analysis failed");
                    report.failed += 1;
                }
                Err(e) => {
                    warn!(target: "pipeline", error = %e, "post analysis task aborted");
                    report.failed += 1;
                }
            }
        }
        if report.failed > 0 {
            counter!("post_batch_failures_total").increment(report.failed as u64);
        }

        info!(
            target: "pipeline",
            analyzed = report.analyzed_posts,
            alerts = report.alerts_raised,
            failed = report.failed,
            "social media sweep done"
        );
        Ok(report)
    }

    /// Trend summary over the last `days` (config default when `None`).
    pub async fn trends(&self, days: Option<i64>) -> Result<TrendReport> {
        let now = Utc::now();
        let days = days.filter(|d| *d > 0).unwrap_or(self.cfg.trend_days);
        let window = TimeWindow::last_days(days, now);
        let filter = ReportFilter {
            since: Some(window.start),
            ..Default::default()
        };
        let reports = self.store.list_reports(&filter, 0, usize::MAX).await?;
        let posts = self.store.list_posts(None, 0, usize::MAX).await?;
        Ok(self.trends.summarize(&reports, &posts, window).await)
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let reports = self
            .store
            .list_reports(&ReportFilter::default(), 0, usize::MAX)
            .await?;
        let posts = self.store.list_posts(None, 0, usize::MAX).await?;
        let alerts = self.store.all_alerts().await?;
        Ok(reduce_dashboard_stats(&reports, &posts, &alerts, Utc::now()))
    }

    /// Move a report out of `pending`. Only officials and admins may do this.
    pub async fn verify_report(
        &self,
        id: &str,
        actor: &Reporter,
        status: ReportStatus,
        notes: Option<String>,
    ) -> Result<bool> {
        if !actor.role.is_verifier() {
            return Err(Forbidden("verifying reports requires official or admin").into());
        }
        let v = Verification {
            status,
            verifier_id: actor.id.clone(),
            notes,
            at: Utc::now(),
        };
        self.store.verify_report(id, v).await
    }

    pub async fn deactivate_alert(&self, id: &str, actor: &Reporter) -> Result<bool> {
        if !actor.role.is_verifier() {
            return Err(Forbidden("deactivating alerts requires official or admin").into());
        }
        self.store.deactivate_alert(id).await
    }

    pub async fn analyze_text(&self, text: &str, language: &str) -> AnalysisResult {
        self.analyzer.analyze(text, language).await
    }

    pub async fn translate(&self, text: &str, target_language: &str) -> String {
        self.translator.translate(text, target_language).await
    }
}

enum PostOutcome {
    Analyzed { alert: bool },
    AlreadyAnalyzed,
    OracleDown,
}

async fn analyze_one(
    analyzer: &HazardAnalyzer,
    store: &DynStore,
    mut post: SocialMediaPost,
) -> Result<PostOutcome> {
    let (outcome, analysis) = analyzer
        .analyze_detailed(&post.content, &post.language)
        .await;
    if outcome == AnalysisOutcome::HardFailure {
        return Ok(PostOutcome::OracleDown);
    }

    let update = store
        .set_post_analysis(&post.id, analysis.clone())
        .await
        .with_context(|| format!("storing analysis for post {}", post.id))?;
    match update {
        PostUpdate::Attached => {}
        PostUpdate::AlreadyAnalyzed => return Ok(PostOutcome::AlreadyAnalyzed),
        PostUpdate::Missing => anyhow::bail!("post {} vanished during analysis", post.id),
    }
    post.attach_analysis(analysis);

    let Some(alert) = post.ai_analysis.as_ref().and_then(|a| alert_for_post(&post, a)) else {
        return Ok(PostOutcome::Analyzed { alert: false });
    };
    store
        .create_alert(alert)
        .await
        .with_context(|| format!("storing alert for post {}", post.id))?;
    Ok(PostOutcome::Analyzed { alert: true })
}
