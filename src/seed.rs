//! Demo data loaded at startup so the dashboard is not empty.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{Duration, Utc};
use tracing::{debug, info};

use crate::model::{
    HazardReport, HazardType, Location, NewHazardReport, ReportStatus, Reporter, Severity,
    SocialMediaPost, UserRole,
};
use crate::store::Store;

fn metrics(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn tags(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn demo_posts() -> Result<Vec<SocialMediaPost>> {
    let now = Utc::now();

    let mut chennai = SocialMediaPost::new(
        "twitter",
        "mock_tweet_1",
        "Unusual high waves observed near Marina Beach Chennai. Fishermen advised to stay away. #ChennaiWeather #MarineAlert",
        "Local Fisher",
        "@chennai_fisher",
        now - Duration::hours(2),
    )
    .with_location(
        Location::new(13.0522, 80.2613)?
            .with_city("Chennai")
            .with_state("Tamil Nadu"),
    );
    chennai.hashtags = tags(&["#ChennaiWeather", "#MarineAlert"]);
    chennai.engagement_metrics = metrics(&[("likes", 45), ("retweets", 23), ("comments", 12)]);

    let mut goa = SocialMediaPost::new(
        "facebook",
        "mock_fb_1",
        "Oil spill spotted off Goa coast. Marine life seems affected. Authorities should take immediate action!",
        "Environmental Activist",
        "@goa_environment",
        now - Duration::hours(5),
    )
    .with_location(Location::new(15.2993, 74.1240)?.with_city("Panaji").with_state("Goa"));
    goa.hashtags = tags(&["#OilSpill", "#Goa", "#MarinePollution"]);
    goa.engagement_metrics = metrics(&[("likes", 156), ("shares", 89), ("comments", 34)]);

    let mut kerala = SocialMediaPost::new(
        "youtube",
        "mock_yt_1",
        "Tsunami warning issued for Kerala coast. All coastal residents must evacuate immediately. This is not a drill!",
        "Kerala Disaster Management",
        "@kerala_disaster",
        now - Duration::minutes(30),
    )
    .with_location(Location::new(10.8505, 76.2711)?.with_city("Kochi").with_state("Kerala"));
    kerala.hashtags = tags(&["#TsunamiAlert", "#Kerala", "#Emergency"]);
    kerala.engagement_metrics = metrics(&[("likes", 892), ("shares", 567), ("comments", 234)]);

    Ok(vec![chennai, goa, kerala])
}

pub fn demo_reports() -> Result<Vec<HazardReport>> {
    let now = Utc::now();

    let ravi = Reporter {
        id: "citizen_1".into(),
        full_name: Some("Ravi Kumar".into()),
        role: UserRole::Citizen,
    };
    let mut juhu = HazardReport::from_submission(
        NewHazardReport {
            title: "High Waves at Juhu Beach".into(),
            description: "Observed unusually high waves at Juhu Beach. Waves reaching 8-10 feet high. Many people still in water despite warnings.".into(),
            hazard_type: HazardType::HighWaves,
            severity: Severity::High,
            location: Location::new(19.1076, 72.8262)?
                .with_city("Mumbai")
                .with_state("Maharashtra"),
            contact_info: Some("9876543210".into()),
            language: "en".into(),
            tags: tags(&["waves", "beach", "safety"]),
        },
        &ravi,
        now,
    );
    juhu.status = ReportStatus::Verified;

    let priya = Reporter {
        id: "citizen_2".into(),
        full_name: Some("Priya Sharma".into()),
        role: UserRole::Citizen,
    };
    let debris = HazardReport::from_submission(
        NewHazardReport {
            title: "Marine Debris Accumulation".into(),
            description: "Large amounts of plastic and fishing nets washed ashore. Affecting turtle nesting sites.".into(),
            hazard_type: HazardType::Debris,
            severity: Severity::Medium,
            location: Location::new(11.9416, 79.8083)?
                .with_city("Pondicherry")
                .with_state("Pondicherry"),
            contact_info: Some("priya.sharma@email.com".into()),
            language: "en".into(),
            tags: tags(&["debris", "pollution", "marine_life"]),
        },
        &priya,
        now,
    );

    Ok(vec![juhu, debris])
}

/// Insert demo entities; individual insert failures are skipped.
pub async fn seed_demo_data(store: &dyn Store) -> Result<()> {
    let mut inserted = 0usize;
    for post in demo_posts()? {
        match store.create_post(post).await {
            Ok(true) => inserted += 1,
            Ok(false) => {}
            Err(e) => debug!(error = ?e, "skipping demo post"),
        }
    }
    for report in demo_reports()? {
        match store.create_report(report).await {
            Ok(_) => inserted += 1,
            Err(e) => debug!(error = ?e, "skipping demo report"),
        }
    }
    info!(inserted, "demo data initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, ReportFilter};

    #[tokio::test]
    async fn seeding_twice_does_not_duplicate_posts() {
        let s = InMemoryStore::new();
        seed_demo_data(&s).await.unwrap();
        seed_demo_data(&s).await.unwrap();
        assert_eq!(s.list_posts(None, 0, 100).await.unwrap().len(), 3);
        // reports get fresh ids on every build, so they do accumulate
        assert_eq!(
            s.list_reports(&ReportFilter::default(), 0, 100).await.unwrap().len(),
            4
        );
    }
}
