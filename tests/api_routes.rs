// tests/api_routes.rs
//
// HTTP-level tests for the public Router without opening sockets.
// The router is exercised directly via tower::ServiceExt::oneshot with the mock oracle.

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as Json};
use serial_test::serial;
use tower::ServiceExt as _;

const BODY_LIMIT: usize = 1024 * 1024;

async fn test_app() -> Router {
    // the shipped config keeps the oracle disabled, so no key is needed
    std::env::remove_var("OPENAI_API_KEY");
    std::env::set_var("AI_TEST_MODE", "mock");
    ocean_hazard_sentinel::app()
        .await
        .expect("app() should build Router in tests")
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Json) {
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, v)
}

fn get(uri: &str, role: Option<&str>) -> Request<Body> {
    let mut b = Request::builder().method("GET").uri(uri);
    if let Some(r) = role {
        b = b.header("x-user-role", r);
    }
    b.body(Body::empty()).unwrap()
}

fn send_json(method: &str, uri: &str, role: Option<&str>, payload: Json) -> Request<Body> {
    let mut b = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(r) = role {
        b = b.header("x-user-role", r);
    }
    b.body(Body::from(payload.to_string())).unwrap()
}

fn report_payload(severity: &str, latitude: f64) -> Json {
    json!({
        "title": "High waves at Kovalam",
        "description": "Waves breaking over the promenade",
        "hazard_type": "high_waves",
        "severity": severity,
        "location": {
            "latitude": latitude,
            "longitude": 76.98,
            "city": "Kovalam",
            "state": "Kerala"
        }
    })
}

#[tokio::test]
#[serial]
async fn health_reports_healthy() {
    let app = test_app().await;
    let (status, v) = send(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"], "healthy");
}

#[tokio::test]
#[serial]
async fn analyze_returns_result_fields() {
    let app = test_app().await;
    let (status, v) = send(
        &app,
        send_json("POST", "/analyze", None, json!({ "text": "Sea looks calm today" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["text"], "Sea looks calm today");
    assert_eq!(v["hazard_detected"], false);
    assert!(v.get("confidence_score").is_some());
    assert!(v.get("analysis_timestamp").is_some());
}

#[tokio::test]
#[serial]
async fn report_submission_and_alert_visibility() {
    let app = test_app().await;
    let (status, report) = send(
        &app,
        send_json("POST", "/reports", None, report_payload("critical", 8.40)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "pending");
    assert!(report["ai_analysis"].is_object());

    let (_, citizen_alerts) = send(&app, get("/alerts", None)).await;
    assert_eq!(citizen_alerts.as_array().unwrap().len(), 0);

    let (_, official_alerts) = send(&app, get("/alerts", Some("official"))).await;
    let alerts = official_alerts.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["source_id"], report["id"]);
    assert_eq!(alerts[0]["title"], "High Severity Hazard Alert");
}

#[tokio::test]
#[serial]
async fn invalid_location_is_400() {
    let app = test_app().await;
    let (status, _) = send(
        &app,
        send_json("POST", "/reports", None, report_payload("low", 95.0)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
async fn verification_requires_official_role() {
    let app = test_app().await;
    let (_, report) = send(
        &app,
        send_json("POST", "/reports", None, report_payload("low", 8.40)),
    )
    .await;
    let uri = format!("/reports/{}/verify", report["id"].as_str().unwrap());

    let (status, _) = send(&app, send_json("PUT", &uri, None, json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        send_json("PUT", &uri, Some("official"), json!({ "notes": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let report_uri = format!("/reports/{}", report["id"].as_str().unwrap());
    let (_, got) = send(&app, get(&report_uri, None)).await;
    assert_eq!(got["status"], "verified");
    assert_eq!(got["verification_notes"], "confirmed");

    let (status, _) = send(
        &app,
        send_json("PUT", "/reports/nope/verify", Some("admin"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[serial]
async fn social_sweep_and_dashboard() {
    let app = test_app().await;

    let (status, _) = send(&app, send_json("POST", "/social-media/analyze", None, json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, batch) = send(
        &app,
        send_json("POST", "/social-media/analyze", Some("admin"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(batch["analyzed_posts"], 3);
    assert_eq!(batch["failed"], 0);

    let (_, posts) = send(&app, get("/social-media?platform=twitter", None)).await;
    let posts = posts.as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert!(posts[0]["ai_analysis"].is_object());

    let (status, stats) = send(&app, get("/dashboard/stats", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_reports"], 2);
    assert_eq!(stats["verified_reports"], 1);
    assert_eq!(stats["social_media_posts_analyzed"], 3);
}

#[tokio::test]
#[serial]
async fn trends_map_and_nearby() {
    let app = test_app().await;

    let (status, trends) = send(&app, get("/dashboard/trends?days=3", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trends["outcome"], "success");
    assert_eq!(trends["summary"]["risk_assessment"], "medium");

    let (_, map) = send(&app, get("/map/hazards?severity=high", None)).await;
    let map = map.as_array().unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map[0]["city"], "Mumbai");

    let (_, near) = send(&app, get("/reports/nearby/19.15/72.80", None)).await;
    assert_eq!(near.as_array().unwrap().len(), 1);
    let (_, far) = send(&app, get("/reports/nearby/19.25/72.80?radius=100", None)).await;
    assert_eq!(far.as_array().unwrap().len(), 0);
}

#[tokio::test]
#[serial]
async fn metrics_expose_pipeline_series() {
    let app = test_app().await;
    send(
        &app,
        send_json("POST", "/analyze", None, json!({ "text": "Debris on the beach" })),
    )
    .await;

    let resp = app
        .clone()
        .oneshot(get("/metrics", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("hazard_analysis_total"), "metrics:\n{text}");
}
