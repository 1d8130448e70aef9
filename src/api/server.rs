//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use super::{handlers, models::ErrorResponse};
use crate::config::Config;
use crate::engine::{BrowseRequest, Recommender};
use crate::error::RecommendError;
use crate::models::RecommendRequest;
use crate::store::CatalogStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    pub recommender: Recommender,
    pub config: Arc<Config>,
}

fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/health", get(health_handler))
        .route("/api/recommend", post(recommend_handler))
        .route("/api/browse", post(browse_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Configure and start the HTTP server
pub async fn start_http_server(
    store: Arc<dyn CatalogStore>,
    recommender: Recommender,
    config: Arc<Config>,
) -> Result<()> {
    let address = format!("{}:{}", config.server.host, config.server.port);
    let app = router(AppState {
        store,
        recommender,
        config,
    });

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("🌐 API server listening on http://{}", address);

    axum::serve(listener, app).await?;

    Ok(())
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

/// Upstream read failures are the only expected errors; they map to 502.
fn recommend_error_response(e: RecommendError) -> Response {
    if e.is_upstream() {
        error!("Catalog read failed: {}", e);
        error_response(StatusCode::BAD_GATEWAY, "Catalog unavailable, please retry")
    } else {
        error!("Request failed: {}", e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

/// Health check handler
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(handlers::health_check(state.store.as_ref()).await))
}

/// Recommendation handler
async fn recommend_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RecommendRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match handlers::recommend(state.store.as_ref(), &state.recommender, &state.config, request).await {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => recommend_error_response(e),
    }
}

/// Browse handler
async fn browse_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<BrowseRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match handlers::browse_catalog(state.store.as_ref(), request).await {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => recommend_error_response(e),
    }
}
