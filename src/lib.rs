// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod alerting;
pub mod analyze;
pub mod api;
pub mod config;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod seed;
pub mod stats;
pub mod store;
pub mod trends;

use std::sync::Arc;

use axum::Router;
use tracing::{info, warn};

pub use crate::analyze::ai_adapter;
pub use crate::api::{router, AppState};
pub use crate::pipeline::{Pipeline, Submission};

use crate::config::{AiConfig, PipelineConfig};
use crate::store::InMemoryStore;

/// Build the full in-process app: configs, in-memory store with demo data,
/// HTTP routes and `/metrics`.
pub async fn app() -> anyhow::Result<Router> {
    let ai = AiConfig::load_or_default(config::ai::DEFAULT_AI_CONFIG_PATH)?;
    let cfg = PipelineConfig::load_default()?;

    let store = Arc::new(InMemoryStore::new());
    if let Err(e) = seed::seed_demo_data(store.as_ref()).await {
        warn!(error = ?e, "demo data not loaded");
    }

    let metrics = crate::metrics::Metrics::init(ai.timeout().as_secs())?;
    let pipeline = Pipeline::from_config(&ai, cfg, store);
    info!(
        batch_limit = pipeline.config().batch_limit,
        trend_days = pipeline.config().trend_days,
        "pipeline configured"
    );

    Ok(router(AppState { pipeline }).merge(metrics.router()))
}
