//! Dashboard stats reducer. Pure aggregation, no oracle, no I/O.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::model::{Alert, DashboardStats, HazardReport, HazardType, ReportStatus, SocialMediaPost};

/// Most frequent hazard type; ties go to the type encountered first.
pub fn most_common_hazard(reports: &[HazardReport]) -> Option<HazardType> {
    // group-by in first-seen order
    let mut groups: Vec<(HazardType, usize)> = Vec::new();
    for r in reports {
        match groups.iter_mut().find(|(h, _)| *h == r.hazard_type) {
            Some((_, n)) => *n += 1,
            None => groups.push((r.hazard_type, 1)),
        }
    }
    // stable sort keeps first-seen order among equal counts
    groups.sort_by(|a, b| b.1.cmp(&a.1));
    groups.first().map(|(h, _)| *h)
}

fn region_key(report: &HazardReport) -> String {
    let loc = &report.location;
    loc.state
        .as_deref()
        .or(loc.city.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

pub fn reduce_dashboard_stats(
    reports: &[HazardReport],
    posts: &[SocialMediaPost],
    alerts: &[Alert],
    now: DateTime<Utc>,
) -> DashboardStats {
    let cutoff = now - Duration::hours(24);

    let mut regional_distribution = BTreeMap::new();
    for r in reports {
        *regional_distribution.entry(region_key(r)).or_insert(0) += 1;
    }

    DashboardStats {
        total_reports: reports.len(),
        verified_reports: reports
            .iter()
            .filter(|r| r.status == ReportStatus::Verified)
            .count(),
        pending_reports: reports
            .iter()
            .filter(|r| r.status == ReportStatus::Pending)
            .count(),
        active_alerts: alerts.iter().filter(|a| a.is_active).count(),
        social_media_posts_analyzed: posts.len(),
        reports_last_24h: reports.iter().filter(|r| r.created_at >= cutoff).count(),
        most_common_hazard: most_common_hazard(reports),
        regional_distribution,
    }
}
