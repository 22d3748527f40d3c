//! Ocean hazard sentinel: binary entrypoint.
//! Boots the Axum HTTP server through Shuttle with the in-process pipeline.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact tracing logs; `RUST_LOG` overrides the default filter.
/// Set `SENTINEL_LOG_JSON=1` for JSON lines instead.
fn enable_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ocean_hazard_sentinel=info,warn"));

    let json = std::env::var("SENTINEL_LOG_JSON").is_ok_and(|v| v == "1");
    let registry = tracing_subscriber::registry().with(filter);
    // Shuttle may already have installed a subscriber.
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    enable_tracing();

    let router = ocean_hazard_sentinel::app().await?;
    Ok(router.into())
}
