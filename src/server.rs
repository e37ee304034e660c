//! HTTP query server.
//!
//! Exposes the query operations and corpus inspection as a JSON HTTP API.
//! The token store is re-read on every request, so a new `medprep tokenize`
//! run is visible without a restart. Handlers share nothing mutable.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | API description |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/content/{topic}` | Aggregated content for a topic |
//! | `POST` | `/summarize` | High-yield points, body `{"topic": "..."}` |
//! | `GET`  | `/predict?limit=N` | Ranked likely exam topics (`limit` is clamped, never rejected) |
//! | `GET`  | `/files` | Corpus files per category |
//! | `GET`  | `/token-data?category=&filename=` | Raw token records |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "Topic 'x' not found. ..." } }
//! ```
//!
//! Error codes: `not_found` (404), `internal` (500).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::corpus::scan_corpus;
use crate::predict::{clamp_limit, StdRandom, MAX_LIMIT};
use crate::query::{ContentResponse, PredictionResponse, QueryService, SummaryResponse};
use crate::store::TokenStore;

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
}

/// Build the application router. Exposed for in-process tests.
pub fn router(config: Arc<Config>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/content/{topic}", get(handle_content))
        .route("/summarize", post(handle_summarize))
        .route("/predict", get(handle_predict))
        .route("/files", get(handle_files))
        .route("/token-data", get(handle_token_data))
        .layer(cors)
        .with_state(AppState { config })
}

/// Starts the HTTP server on `[server].bind` and runs until terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(Arc::new(config.clone()));

    info!(bind = %bind_addr, store = %config.store.path.display(), "starting server");
    println!("medprep server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ GET / and /health ============

async fn handle_root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Medical exam preparation API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /content/{topic}": "Aggregated corpus content for a topic",
            "POST /summarize": "High-yield points for a topic",
            "GET /predict": "Likely exam topics, ranked",
            "GET /files": "Corpus files per category",
            "GET /token-data": "Token records from the last tokenization run",
            "GET /health": "Health check"
        }
    }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Queries ============

async fn handle_content(
    State(state): State<AppState>,
    Path(topic): Path<String>,
) -> Result<Json<ContentResponse>, AppError> {
    let service = QueryService::from_config(&state.config);
    service
        .content(&topic)
        .map(Json)
        .map_err(|e| not_found(e.to_string()))
}

#[derive(Deserialize)]
struct SummarizeRequest {
    topic: String,
}

async fn handle_summarize(
    State(state): State<AppState>,
    Json(req): Json<SummarizeRequest>,
) -> Json<SummaryResponse> {
    let service = QueryService::from_config(&state.config);
    Json(service.summarize(&req.topic))
}

#[derive(Deserialize)]
struct PredictParams {
    limit: Option<String>,
}

/// Reads `limit` without rejecting the request: negative, zero or oversized
/// values clamp to `1..=MAX_LIMIT`, and a non-numeric value uses `default`.
fn parse_limit(raw: Option<&str>, default: usize) -> usize {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return clamp_limit(default);
    };
    match raw.parse::<i64>() {
        Ok(n) if n < 1 => 1,
        Ok(n) => usize::try_from(n).map(clamp_limit).unwrap_or(MAX_LIMIT),
        Err(_) => {
            let digits = raw.trim_start_matches(['+', '-']);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                clamp_limit(default)
            } else if raw.starts_with('-') {
                1
            } else {
                MAX_LIMIT
            }
        }
    }
}

async fn handle_predict(
    State(state): State<AppState>,
    Query(params): Query<PredictParams>,
) -> Json<PredictionResponse> {
    let service = QueryService::from_config(&state.config);
    let limit = parse_limit(params.limit.as_deref(), state.config.predict.default_limit);
    let mut rng = StdRandom::from_seed_option(state.config.predict.seed);
    Json(service.predict(limit, &mut rng))
}

// ============ Corpus inspection ============

#[derive(Serialize)]
struct FileEntry {
    filename: String,
    file_type: String,
    size_bytes: u64,
}

#[derive(Serialize)]
struct FilesResponse {
    categories: BTreeMap<String, Vec<FileEntry>>,
    missing_folders: Vec<String>,
}

async fn handle_files(State(state): State<AppState>) -> Result<Json<FilesResponse>, AppError> {
    let scan = scan_corpus(&state.config.corpus).map_err(|e| internal(format!("{:#}", e)))?;
    let mut categories: BTreeMap<String, Vec<FileEntry>> = scan
        .categories
        .iter()
        .map(|c| (c.clone(), Vec::new()))
        .collect();
    for file in scan.files {
        categories.entry(file.category).or_default().push(FileEntry {
            filename: file.filename,
            file_type: file.file_type.to_string(),
            size_bytes: file.size_bytes,
        });
    }
    Ok(Json(FilesResponse {
        categories,
        missing_folders: scan.missing_folders,
    }))
}

#[derive(Deserialize)]
struct TokenDataParams {
    category: Option<String>,
    filename: Option<String>,
}

async fn handle_token_data(
    State(state): State<AppState>,
    Query(params): Query<TokenDataParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = TokenStore::load_or_empty(&state.config.store.path);
    let to_value = |v: serde_json::Result<serde_json::Value>| v.map_err(|e| internal(e.to_string()));

    match (params.category, params.filename) {
        (Some(category), Some(filename)) => {
            let record = store.find(&category, &filename).ok_or_else(|| {
                not_found(format!("No token data for {}/{}", category, filename))
            })?;
            Ok(Json(to_value(serde_json::to_value(record))?))
        }
        (Some(category), None) => {
            let (_, records) = store
                .categories()
                .find(|(c, _)| *c == category)
                .ok_or_else(|| not_found(format!("Unknown category: {}", category)))?;
            Ok(Json(to_value(serde_json::to_value(records))?))
        }
        _ => {
            let json = store.to_json().map_err(|e| internal(e.to_string()))?;
            Ok(Json(to_value(serde_json::from_str(&json))?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn config_with_store(tmp: &TempDir, body: &str) -> Arc<Config> {
        let mut config = Config::minimal();
        config.store.path = tmp.path().join("tokenized_content.json");
        config.corpus.root = tmp.path().join("PDFs");
        config.predict.seed = Some(11);
        std::fs::write(&config.store.path, body).unwrap();
        Arc::new(config)
    }

    async fn json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const STORE: &str = r#"{
        "guidelines": [
            {"filename": "CHF_guidelines.pdf", "file_type": ".pdf",
             "chunks": ["Heart failure management and staging criteria are discussed here."]}
        ],
        "question_papers": []
    }"#;

    #[tokio::test]
    async fn health_reports_version() {
        let tmp = TempDir::new().unwrap();
        let app = router(config_with_store(&tmp, "{}"));
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json(resp).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn content_hit_and_miss() {
        let tmp = TempDir::new().unwrap();
        let app = router(config_with_store(&tmp, STORE));

        let resp = app
            .clone()
            .oneshot(Request::get("/content/heart_failure").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json(resp).await;
        let content = body["content"].as_str().unwrap();
        assert!(content.starts_with("From CHF_guidelines.pdf:"));
        assert!(content.contains("staging criteria"));

        let resp = app
            .oneshot(Request::get("/content/oncology").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = json(resp).await;
        assert_eq!(body["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn summarize_and_predict() {
        let tmp = TempDir::new().unwrap();
        let app = router(config_with_store(&tmp, STORE));

        let resp = app
            .clone()
            .oneshot(
                Request::post("/summarize")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"topic": "heart failure"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json(resp).await;
        let points = body["summary"].as_array().unwrap();
        assert!(!points.is_empty() && points.len() <= 5);

        let resp = app
            .oneshot(Request::get("/predict?limit=1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json(resp).await;
        assert_eq!(body["predictions"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_store_serves_fallback() {
        let tmp = TempDir::new().unwrap();
        let app = router(config_with_store(&tmp, "not json"));
        let resp = app
            .oneshot(Request::get("/predict?limit=5").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json(resp).await;
        let topics: Vec<&str> = body["predictions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["topic"].as_str().unwrap())
            .collect();
        assert_eq!(
            topics,
            vec![
                "cardiovascular_disease",
                "diabetes_management",
                "respiratory_conditions"
            ]
        );
    }

    #[tokio::test]
    async fn token_data_lookup() {
        let tmp = TempDir::new().unwrap();
        let app = router(config_with_store(&tmp, STORE));

        let resp = app
            .clone()
            .oneshot(
                Request::get("/token-data?category=guidelines&filename=CHF_guidelines.pdf")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json(resp).await["file_type"], ".pdf");

        let resp = app
            .oneshot(
                Request::get("/token-data?category=guidelines&filename=nope.pdf")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn out_of_range_limits_are_clamped() {
        let tmp = TempDir::new().unwrap();
        let app = router(config_with_store(&tmp, STORE));

        for query in ["limit=-1", "limit=0", "limit=-99999999999999999999"] {
            let resp = app
                .clone()
                .oneshot(
                    Request::get(format!("/predict?{}", query))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK, "{}", query);
            assert_eq!(json(resp).await["predictions"].as_array().unwrap().len(), 1);
        }

        let resp = app
            .oneshot(
                Request::get("/predict?limit=99999999999999999999999")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let predictions = json(resp).await["predictions"].as_array().unwrap().len();
        assert!((1..=MAX_LIMIT).contains(&predictions));
    }

    #[test]
    fn limit_parsing() {
        assert_eq!(parse_limit(None, 3), 3);
        assert_eq!(parse_limit(Some(""), 3), 3);
        assert_eq!(parse_limit(Some("abc"), 3), 3);
        assert_eq!(parse_limit(Some("-"), 3), 3);
        assert_eq!(parse_limit(Some("-1"), 3), 1);
        assert_eq!(parse_limit(Some("0"), 3), 1);
        assert_eq!(parse_limit(Some("7"), 3), 7);
        assert_eq!(parse_limit(Some("51"), 3), MAX_LIMIT);
        assert_eq!(parse_limit(Some("99999999999999999999999"), 3), MAX_LIMIT);
        assert_eq!(parse_limit(Some("-99999999999999999999999"), 3), 1);
    }
}
