use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::MissionError;
use crate::service::MissionService;

impl IntoResponse for MissionError {
    fn into_response(self) -> Response {
        let status = match &self {
            MissionError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            MissionError::NotFound(_) => StatusCode::NOT_FOUND,
            MissionError::UpstreamUnavailable(_) | MissionError::UpstreamMalformed(_) => {
                StatusCode::BAD_GATEWAY
            }
            MissionError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

type ApiResult = Result<Json<serde_json::Value>, MissionError>;

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
    page: Option<u32>,
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Stats endpoint - service info and cache occupancy
async fn stats(State(service): State<MissionService>) -> impl IntoResponse {
    Json(json!({
        "status": "running",
        "service": "mission-backend",
        "version": env!("CARGO_PKG_VERSION"),
        "cache": service.cache_stats().await,
    }))
}

async fn upcoming(State(service): State<MissionService>) -> ApiResult {
    let launches = service.upcoming_launches().await?;
    Ok(Json(json!({ "launches": launches })))
}

async fn previous(State(service): State<MissionService>) -> ApiResult {
    let launches = service.previous_launches().await?;
    Ok(Json(json!({ "launches": launches })))
}

async fn launch_by_id(State(service): State<MissionService>, Path(id): Path<String>) -> ApiResult {
    let launch = service.launch_by_id(&id).await?;
    Ok(Json(json!({ "launch": launch })))
}

async fn all_missions(State(service): State<MissionService>) -> ApiResult {
    let missions = service.all_missions().await?;
    Ok(Json(json!({ "missions": missions })))
}

async fn apod(State(service): State<MissionService>) -> ApiResult {
    let apod = service.picture_of_day().await?;
    Ok(Json(json!({ "apod": apod })))
}

async fn search(
    State(service): State<MissionService>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) =
        params.map_err(|rejection| MissionError::InvalidRequest(rejection.body_text()))?;
    let query = params.q.unwrap_or_default();
    let page = service
        .search_images(&query, params.page.unwrap_or(1))
        .await?;
    Ok(Json(serde_json::to_value(page).map_err(MissionError::from)?))
}

async fn epic(State(service): State<MissionService>) -> ApiResult {
    let images = service.earth_imagery().await?;
    Ok(Json(json!({ "epic": images })))
}

fn launch_routes() -> Router<MissionService> {
    Router::new()
        .route("/", get(all_missions))
        .route("/upcoming", get(upcoming))
        .route("/previous", get(previous))
        .route("/{id}", get(launch_by_id))
}

fn nasa_routes() -> Router<MissionService> {
    Router::new()
        .route("/apod", get(apod))
        .route("/search", get(search))
        .route("/epic", get(epic))
}

/// All HTTP routes. `/api/missions` shares the launch routes.
pub fn router(service: MissionService) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(stats))
        .nest("/api/launches", launch_routes())
        .nest("/api/missions", launch_routes())
        .nest("/api/nasa", nasa_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::error::Result;
    use crate::upstream::{LaunchLibrary, NasaApi, Upstream};
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct StubUpstream {
        responses: HashMap<String, Value>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Upstream for StubUpstream {
        async fn get_json(&self, url: &str) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.responses.get(url) {
                Some(value) => Ok(value.clone()),
                None if url.contains("/launch/") => Err(MissionError::NotFound(url.to_string())),
                None => Err(MissionError::UpstreamUnavailable(format!(
                    "HTTP error 503 for {}",
                    url
                ))),
            }
        }
    }

    fn app() -> (Router, Arc<StubUpstream>) {
        let config = BackendConfig {
            launch_library_url: "http://ll.test".to_string(),
            nasa_api_url: "http://nasa.test".to_string(),
            nasa_images_url: "http://images.test".to_string(),
            ..BackendConfig::default()
        };
        let ll = LaunchLibrary::from(&config);
        let nasa = NasaApi::from(&config);

        let launch = json!({
            "id": "abc",
            "name": "Artemis II",
            "status": { "name": "Go for Launch" },
            "launch_service_provider": { "name": "NASA" }
        });
        let mut responses = HashMap::new();
        responses.insert(ll.upcoming(), json!({ "results": [launch.clone()] }));
        responses.insert(ll.previous(), json!({ "results": [] }));
        responses.insert(ll.launch("abc"), launch);
        responses.insert(
            nasa.apod(),
            json!({ "title": "M31", "url": "https://example.org/m31.jpg" }),
        );
        responses.insert(
            nasa.image_search("apollo 11", 1),
            json!({
                "collection": {
                    "items": [{ "data": [{ "nasa_id": "as11", "title": "Eagle" }] }],
                    "metadata": { "total_hits": 1 }
                }
            }),
        );

        let upstream = Arc::new(StubUpstream {
            responses,
            calls: AtomicUsize::new(0),
        });
        let service = MissionService::new(&config, upstream.clone());
        (router(service), upstream)
    }

    async fn request(app: &Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_launch_routes() {
        let (app, upstream) = app();

        let (status, body) = request(&app, "/api/launches/upcoming").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["launches"][0]["name"], "Artemis II");
        assert_eq!(body["launches"][0]["agency"], "NASA");
        assert_eq!(body["launches"][0]["missionType"], "Unknown");

        let (status, body) = request(&app, "/api/launches/abc").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["launch"]["id"], "abc");
        assert_eq!(body["launch"]["rocket"], "Unknown");

        let (status, body) = request(&app, "/api/missions").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["missions"].as_array().map(Vec::len), Some(1));

        // upcoming, launch/abc, previous
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 3);

        let (status, _) = request(&app, "/api/missions/upcoming").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unknown_launch_is_404() {
        let (app, _) = app();
        let (status, body) = request(&app, "/api/launches/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["message"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_nasa_routes() {
        let (app, _) = app();

        let (status, body) = request(&app, "/api/nasa/apod").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["apod"]["title"], "M31");
        assert_eq!(body["apod"]["mediaType"], "image");

        let (status, body) = request(&app, "/api/nasa/search?q=apollo%2011").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"][0]["id"], "as11");
        assert_eq!(body["pagination"]["totalPages"], 1);
        assert_eq!(body["pagination"]["currentPage"], 1);

        let (status, body) = request(&app, "/api/nasa/epic").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["message"].as_str().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_search_without_query_is_400() {
        let (app, upstream) = app();
        let (status, body) = request(&app, "/api/nasa/search").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid request: Search query is required");
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_page_is_400_with_message() {
        let (app, upstream) = app();
        let (status, body) = request(&app, "/api/nasa/search?q=mars&page=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = body["message"].as_str().unwrap();
        assert!(message.starts_with("Invalid request:"));
        assert!(message.contains("page"));
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_health_and_stats() {
        let (app, _) = app();
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        request(&app, "/api/nasa/apod").await;
        let (status, body) = request(&app, "/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "mission-backend");
        assert_eq!(body["cache"]["entries"], 1);
        assert_eq!(body["cache"]["inFlight"], 0);
    }
}
