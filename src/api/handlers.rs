//! API request handlers

use serde_json::Value;
use tracing::debug;

use super::models::{BrowseResponse, RecommendResponse};
use crate::config::Config;
use crate::engine::{browse, BrowseRequest, BrowseSelection, Recommender};
use crate::error::Result;
use crate::models::{Query, RecommendRequest};
use crate::store::{load_catalog, CatalogStore};

/// Handle health check requests
pub async fn health_check(store: &dyn CatalogStore) -> Value {
    serde_json::json!({
        "status": "healthy",
        "service": "showreel-recommender",
        "store": store.name(),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    })
}

/// Turn a request body into a query, applying the configured default limit
/// when the caller sent none.
pub fn query_from_request(request: RecommendRequest, config: &Config) -> Query {
    let explicit_limit = request.limit.is_some();
    let query = Query::from(request);
    if explicit_limit {
        query
    } else {
        query.with_limit(config.recommend.default_limit as i64)
    }
}

/// Handle recommendation requests
pub async fn recommend(
    store: &dyn CatalogStore,
    recommender: &Recommender,
    config: &Config,
    request: RecommendRequest,
) -> Result<RecommendResponse> {
    let query = query_from_request(request, config);
    debug!(
        "Recommend: objectives={:?} audiences={:?} budget={:?} durations={:?} excluded={}",
        query.objectives,
        query.audiences,
        query.budget,
        query.durations,
        query.exclude_ids.len()
    );

    let recommendation = recommender.recommend_from_store(store, &query).await?;
    Ok(RecommendResponse::from_recommendation(
        recommendation,
        config.server.debug_payload,
    ))
}

/// Handle browse requests
pub async fn browse_catalog(store: &dyn CatalogStore, request: BrowseRequest) -> Result<BrowseResponse> {
    let selection = BrowseSelection::from(request);
    let catalog = load_catalog(store).await?;
    Ok(BrowseResponse::from(browse(&catalog, &selection)))
}
