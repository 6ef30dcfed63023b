//! HTTP surface for the browser extension.
//!
//! Routes are mounted twice, at `/` and under `/api` (the prefix the
//! extension uses):
//!   - POST /analyze-screenshot — analyze + store one screenshot
//!   - GET  /health             — liveness + collaborator status
//!   - GET  /stats              — aggregate prospect statistics
//!
//! Handlers never fail as a fault: every error becomes a
//! `{success: false, error}` body with a 4xx/5xx status.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::error::StoreError;
use crate::llm::{AnalysisContext, MODEL_LABEL};
use crate::pipeline::AnalysisService;
use crate::sheets::RecordStore;

/// Collaborators shared by every request; both are built once at startup.
#[derive(Clone, Default)]
pub struct AppState {
    pub analyzer: Option<Arc<AnalysisService>>,
    pub store: RecordStore,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub screenshot: Option<String>,
    #[serde(default)]
    pub context: Option<AnalysisContext>,
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    let routes = Router::new()
        .route("/analyze-screenshot", post(analyze_screenshot))
        .route("/health", get(health))
        .route("/stats", get(stats));

    Router::new()
        .nest("/api", routes.clone())
        .merge(routes)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn failure(status: StatusCode, error: impl std::fmt::Display) -> Response {
    (
        status,
        Json(json!({ "success": false, "error": error.to_string() })),
    )
        .into_response()
}

async fn analyze_screenshot(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let Some(analyzer) = state.analyzer.as_ref() else {
        return failure(StatusCode::INTERNAL_SERVER_ERROR, "Vision analyzer not initialized");
    };

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let status = match rejection {
                JsonRejection::JsonSyntaxError(_) | JsonRejection::JsonDataError(_) => {
                    StatusCode::BAD_REQUEST
                }
                ref other => other.status(),
            };
            log::warn!("[API] Rejected analyze request ({}): {}", status, rejection.body_text());
            return failure(status, rejection.body_text());
        }
    };

    let screenshot = match request.screenshot.as_deref() {
        Some(s) if !s.trim().is_empty() => s,
        _ => return failure(StatusCode::BAD_REQUEST, "Screenshot data required"),
    };
    let context = request.context.unwrap_or_default();

    log::info!(
        "[API] Analyzing screenshot for {}",
        context.field("url").as_deref().unwrap_or("unknown URL")
    );

    let outcome = analyzer.analyze_screenshot(screenshot, &context).await;
    if !outcome.success {
        log::error!(
            "[API] Analysis failed: {}",
            outcome.error.as_deref().unwrap_or("unknown error")
        );
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(outcome)).into_response();
    }
    let Some(analysis) = outcome.analysis.as_ref() else {
        return failure(StatusCode::INTERNAL_SERVER_ERROR, "Analysis produced no record");
    };

    log::info!(
        "[API] Analysis successful for {}",
        analysis.get_str("person_name").unwrap_or("unknown person")
    );
    let storage = state
        .store
        .add_prospect(analysis, &outcome.model_used, &context)
        .await;

    Json(json!({
        "success": true,
        "analysis": outcome,
        "storage": storage,
        "timestamp": crate::iso_timestamp(chrono::Local::now()),
    }))
    .into_response()
}

async fn health(State(state): State<AppState>) -> Response {
    Json(json!({
        "status": "healthy",
        "vision_model": MODEL_LABEL,
        "sheets_connected": state.store.is_connected(),
        "timestamp": crate::iso_timestamp(chrono::Local::now()),
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}

async fn stats(State(state): State<AppState>) -> Response {
    match state.store.get_stats().await {
        Ok(stats) => Json(json!({ "success": true, "stats": stats })).into_response(),
        Err(StoreError::NotConfigured) => {
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Google Sheets not available")
        }
        Err(e) => {
            log::error!("[API] Stats unavailable: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::MemorySheet;
    use crate::test_support::{png_base64, ScriptedModel};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    const LIMIT: usize = 1024 * 1024;

    fn state_with(reply: &str, sheet: Option<Arc<MemorySheet>>) -> AppState {
        AppState {
            analyzer: Some(Arc::new(AnalysisService::new(ScriptedModel::replying(reply)))),
            store: RecordStore::new(sheet.map(|s| s as Arc<dyn crate::sheets::SheetBackend>)),
        }
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), LIMIT).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_always_ok() {
        let (status, body) = call(router(AppState::default(), LIMIT), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["vision_model"], "google_gemini_vision");
        assert_eq!(body["sheets_connected"], false);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn api_prefix_serves_the_same_routes() {
        let state = state_with("{}", Some(Arc::new(MemorySheet::with_headers())));
        let (status, body) = call(router(state, LIMIT), get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sheets_connected"], true);
    }

    #[tokio::test]
    async fn analyze_without_analyzer_is_500() {
        let request = post_json("/analyze-screenshot", json!({"screenshot": "abc"}));
        let (status, body) = call(router(AppState::default(), LIMIT), request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Vision analyzer not initialized");
    }

    #[tokio::test]
    async fn analyze_without_screenshot_is_400() {
        let state = state_with("{}", None);
        let request = post_json("/analyze-screenshot", json!({"context": {"platform": "linkedin"}}));
        let (status, body) = call(router(state, LIMIT), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Screenshot data required");
    }

    #[tokio::test]
    async fn analyze_with_bad_base64_is_500_envelope() {
        let state = state_with("{}", None);
        let request = post_json("/api/analyze-screenshot", json!({"screenshot": "not-base64!!"}));
        let (status, body) = call(router(state, LIMIT), request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("base64"));
    }

    #[tokio::test]
    async fn analyze_stores_the_prospect() {
        let sheet = Arc::new(MemorySheet::with_headers());
        let state = state_with(
            r#"{"person_name": "Jane Doe", "company": "Acme", "decision_maker_score": 8}"#,
            Some(sheet.clone()),
        );
        let request = post_json(
            "/api/analyze-screenshot",
            json!({
                "screenshot": format!("data:image/png;base64,{}", png_base64(2, 2)),
                "context": {"platform": "linkedin", "url": "https://linkedin.com/in/jane"}
            }),
        );

        let (status, body) = call(router(state, LIMIT), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["analysis"]["analysis"]["person_name"], "Jane Doe");
        assert_eq!(body["analysis"]["analysis"]["job_title"], "");
        assert_eq!(body["storage"]["success"], true);
        assert_eq!(body["storage"]["row_number"], 2);
        assert_eq!(body["storage"]["prospect_name"], "Jane Doe");

        let rows = sheet.snapshot();
        assert_eq!(rows[1][5], json!("linkedin"));
        assert_eq!(rows[1][6], json!("https://linkedin.com/in/jane"));
    }

    #[tokio::test]
    async fn analyze_without_store_still_succeeds() {
        let state = state_with("no json here", None);
        let request = post_json("/analyze-screenshot", json!({"screenshot": png_base64(1, 1)}));
        let (status, body) = call(router(state, LIMIT), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["analysis"]["analysis"]["parsing_failed"], true);
        assert_eq!(body["storage"]["success"], false);
        assert_eq!(body["storage"]["error"], "Google Sheets not configured");
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let state = state_with("{}", None);
        let request = Request::builder()
            .method("POST")
            .uri("/analyze-screenshot")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = call(router(state, LIMIT), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn stats_require_a_store() {
        let (status, body) = call(router(AppState::default(), LIMIT), get("/stats")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Google Sheets not available");
    }

    #[tokio::test]
    async fn oversized_body_is_413() {
        let state = state_with("{}", None);
        let request = post_json(
            "/analyze-screenshot",
            json!({"screenshot": "A".repeat(4096)}),
        );
        let (status, body) = call(router(state, 1024), request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn numeric_context_values_reach_the_prompt() {
        let model = ScriptedModel::replying(r#"{"person_name": "Jane Doe"}"#);
        let state = AppState {
            analyzer: Some(Arc::new(AnalysisService::new(model.clone()))),
            store: RecordStore::default(),
        };
        let request = post_json(
            "/api/analyze-screenshot",
            json!({
                "screenshot": png_base64(1, 1),
                "context": {"platform": "linkedin", "timestamp": 1697040000000u64, "url": 42}
            }),
        );
        let (status, body) = call(router(state, LIMIT), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["analysis"]["analysis"]["person_name"], "Jane Doe");

        let prompt = model.last_prompt().unwrap();
        assert!(prompt.contains("- Timestamp: 1697040000000"));
        assert!(prompt.contains("- URL: 42"));
    }

    #[tokio::test]
    async fn stats_on_empty_sheet_are_zero() {
        let state = state_with("{}", Some(Arc::new(MemorySheet::with_headers())));
        let (status, body) = call(router(state, LIMIT), get("/api/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stats"]["total_prospects"], 0);
        assert_eq!(body["stats"]["avg_decision_score"], 0.0);
        assert_eq!(body["stats"]["avg_response_likelihood"], 0.0);
    }
}
