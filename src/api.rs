//! Thin HTTP adapter over [`Pipeline`]. Authentication is out of scope: the caller
//! identity comes from `x-user-id` / `x-user-role` headers.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::model::{
    AnalysisResult, HazardReport, HazardType, NewHazardReport, ReportStatus, Reporter, Severity,
    SocialMediaPost, UserRole,
};
use crate::pipeline::{BatchReport, Forbidden, Pipeline};
use crate::store::ReportFilter;
use crate::trends::TrendReport;

const MAP_LIMIT: usize = 500;
const MAP_DESCRIPTION_CHARS: usize = 200;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route("/reports", post(create_report).get(list_reports))
        .route("/reports/{id}", get(get_report))
        .route("/reports/{id}/verify", put(verify_report))
        .route("/reports/nearby/{latitude}/{longitude}", get(nearby_reports))
        .route("/social-media", get(list_posts))
        .route("/social-media/analyze", post(analyze_posts))
        .route("/alerts", get(list_alerts))
        .route("/alerts/{id}/deactivate", post(deactivate_alert))
        .route("/dashboard/stats", get(dashboard_stats))
        .route("/dashboard/trends", get(dashboard_trends))
        .route("/map/hazards", get(map_hazards))
        .route("/translate", post(translate))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    NotFound(&'static str),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast_ref::<Forbidden>() {
            Some(f) => ApiError::Forbidden(f.to_string()),
            None => ApiError::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(d) => (StatusCode::BAD_REQUEST, d),
            ApiError::Forbidden(d) => (StatusCode::FORBIDDEN, d),
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            ApiError::Internal(e) => {
                tracing::error!(error = ?e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn caller(headers: &HeaderMap) -> Reporter {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    Reporter {
        id: header("x-user-id").unwrap_or_else(|| "anonymous".to_string()),
        full_name: header("x-user-name"),
        role: header("x-user-role")
            .and_then(|r| UserRole::parse(&r))
            .unwrap_or(UserRole::Citizen),
    }
}

fn require_verifier(who: &Reporter) -> Result<(), ApiError> {
    if who.role.is_verifier() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Admin access required".to_string()))
    }
}

#[derive(Serialize)]
struct Message {
    message: &'static str,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResp {
    status: &'static str,
    timestamp: DateTime<Utc>,
}

async fn health() -> Json<HealthResp> {
    Json(HealthResp {
        status: "healthy",
        timestamp: Utc::now(),
    })
}

#[derive(Deserialize)]
struct AnalyzeReq {
    text: String,
    #[serde(default)]
    language: Option<String>,
}

async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeReq>,
) -> ApiResult<AnalysisResult> {
    if body.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text must not be empty".to_string()));
    }
    let lang = body.language.as_deref().unwrap_or("en");
    Ok(Json(state.pipeline.analyze_text(&body.text, lang).await))
}

async fn create_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NewHazardReport>,
) -> ApiResult<HazardReport> {
    body.location
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let who = caller(&headers);
    let submission = state.pipeline.submit_report(body, &who).await?;
    Ok(Json(submission.report))
}

#[derive(Deserialize)]
struct ReportQuery {
    #[serde(default)]
    skip: Option<usize>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    hazard_type: Option<HazardType>,
    #[serde(default)]
    severity: Option<Severity>,
    #[serde(default)]
    status: Option<ReportStatus>,
}

async fn list_reports(
    State(state): State<AppState>,
    Query(q): Query<ReportQuery>,
) -> ApiResult<Vec<HazardReport>> {
    let filter = ReportFilter {
        hazard_type: q.hazard_type,
        severity: q.severity,
        status: q.status,
        since: None,
    };
    let reports = state
        .pipeline
        .store()
        .list_reports(&filter, q.skip.unwrap_or(0), q.limit.unwrap_or(100))
        .await?;
    Ok(Json(reports))
}

async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<HazardReport> {
    state
        .pipeline
        .store()
        .get_report(&id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Report"))
}

#[derive(Deserialize, Default)]
struct VerifyReq {
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    status: Option<ReportStatus>,
}

async fn verify_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<VerifyReq>,
) -> ApiResult<Message> {
    let who = caller(&headers);
    let status = body.status.unwrap_or(ReportStatus::Verified);
    if status == ReportStatus::Pending {
        return Err(ApiError::BadRequest("cannot move a report back to pending".to_string()));
    }
    if !state
        .pipeline
        .verify_report(&id, &who, status, body.notes)
        .await?
    {
        return Err(ApiError::NotFound("Report"));
    }
    Ok(Json(Message {
        message: "Report verified successfully",
    }))
}

#[derive(Deserialize)]
struct NearbyQuery {
    #[serde(default)]
    radius: Option<f64>,
}

async fn nearby_reports(
    State(state): State<AppState>,
    Path((latitude, longitude)): Path<(f64, f64)>,
    Query(q): Query<NearbyQuery>,
) -> ApiResult<Vec<HazardReport>> {
    let reports = state
        .pipeline
        .store()
        .reports_near(latitude, longitude, q.radius.unwrap_or(10.0))
        .await?;
    Ok(Json(reports))
}

#[derive(Deserialize)]
struct PostQuery {
    #[serde(default)]
    skip: Option<usize>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    platform: Option<String>,
}

async fn list_posts(
    State(state): State<AppState>,
    Query(q): Query<PostQuery>,
) -> ApiResult<Vec<SocialMediaPost>> {
    let posts = state
        .pipeline
        .store()
        .list_posts(q.platform.as_deref(), q.skip.unwrap_or(0), q.limit.unwrap_or(50))
        .await?;
    Ok(Json(posts))
}

async fn analyze_posts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<BatchReport> {
    require_verifier(&caller(&headers))?;
    Ok(Json(state.pipeline.analyze_pending_posts().await?))
}

async fn list_alerts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Vec<crate::model::Alert>> {
    let who = caller(&headers);
    Ok(Json(state.pipeline.store().active_alerts(Some(who.role)).await?))
}

async fn deactivate_alert(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Message> {
    let who = caller(&headers);
    if !state.pipeline.deactivate_alert(&id, &who).await? {
        return Err(ApiError::NotFound("Alert"));
    }
    Ok(Json(Message {
        message: "Alert deactivated successfully",
    }))
}

async fn dashboard_stats(State(state): State<AppState>) -> ApiResult<crate::model::DashboardStats> {
    Ok(Json(state.pipeline.dashboard_stats().await?))
}

#[derive(Deserialize)]
struct TrendQuery {
    #[serde(default)]
    days: Option<i64>,
}

async fn dashboard_trends(
    State(state): State<AppState>,
    Query(q): Query<TrendQuery>,
) -> ApiResult<TrendReport> {
    Ok(Json(state.pipeline.trends(q.days).await?))
}

#[derive(Deserialize)]
struct MapQuery {
    #[serde(default)]
    hazard_type: Option<HazardType>,
    #[serde(default)]
    severity: Option<Severity>,
}

#[derive(Serialize)]
struct MapItem {
    id: String,
    title: String,
    description: String,
    hazard_type: HazardType,
    severity: Severity,
    status: ReportStatus,
    latitude: f64,
    longitude: f64,
    address: Option<String>,
    city: Option<String>,
    created_at: DateTime<Utc>,
    reporter_name: Option<String>,
    tags: Vec<String>,
}

fn map_description(s: &str) -> String {
    if s.chars().count() > MAP_DESCRIPTION_CHARS {
        let head: String = s.chars().take(MAP_DESCRIPTION_CHARS).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

async fn map_hazards(
    State(state): State<AppState>,
    Query(q): Query<MapQuery>,
) -> ApiResult<Vec<MapItem>> {
    let filter = ReportFilter {
        hazard_type: q.hazard_type,
        severity: q.severity,
        ..Default::default()
    };
    let reports = state
        .pipeline
        .store()
        .list_reports(&filter, 0, MAP_LIMIT)
        .await?;
    let items = reports
        .into_iter()
        .map(|r| MapItem {
            description: map_description(&r.description),
            latitude: r.location.latitude,
            longitude: r.location.longitude,
            address: r.location.address,
            city: r.location.city,
            id: r.id,
            title: r.title,
            hazard_type: r.hazard_type,
            severity: r.severity,
            status: r.status,
            created_at: r.created_at,
            reporter_name: r.reporter_name,
            tags: r.tags,
        })
        .collect();
    Ok(Json(items))
}

#[derive(Deserialize)]
struct TranslateReq {
    text: String,
    target_language: String,
}

#[derive(Serialize)]
struct TranslateResp {
    translated_text: String,
}

async fn translate(
    State(state): State<AppState>,
    Json(body): Json<TranslateReq>,
) -> ApiResult<TranslateResp> {
    let translated_text = state
        .pipeline
        .translate(&body.text, &body.target_language)
        .await;
    Ok(Json(TranslateResp { translated_text }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_defaults_to_anonymous_citizen() {
        let who = caller(&HeaderMap::new());
        assert_eq!(who.id, "anonymous");
        assert_eq!(who.role, UserRole::Citizen);

        let mut h = HeaderMap::new();
        h.insert("x-user-role", "Official".parse().unwrap());
        h.insert("x-user-id", "off_7".parse().unwrap());
        let who = caller(&h);
        assert_eq!(who.role, UserRole::Official);
        assert_eq!(who.id, "off_7");
    }

    #[test]
    fn map_description_is_capped() {
        assert_eq!(map_description("short"), "short");
        let long = "y".repeat(250);
        assert_eq!(map_description(&long).chars().count(), 203);
    }

    #[test]
    fn forbidden_maps_to_403() {
        let err: ApiError = anyhow::Error::new(Forbidden("nope")).into();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }
}
