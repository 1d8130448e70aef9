//! API data models

use serde::Serialize;

use crate::engine::{BrowseView, Recommendation, RecommendationDebug};
use crate::models::VideoSummary;

/// Body of a successful recommendation
#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub videos: Vec<VideoSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<RecommendationDebug>,
}

impl RecommendResponse {
    pub fn from_recommendation(recommendation: Recommendation, include_debug: bool) -> Self {
        Self {
            videos: recommendation.videos,
            debug: include_debug.then_some(recommendation.debug),
        }
    }
}

/// Body of a successful browse
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseResponse {
    #[serde(flatten)]
    pub view: BrowseView,
    pub full_match_count: usize,
}

impl From<BrowseView> for BrowseResponse {
    fn from(view: BrowseView) -> Self {
        Self {
            full_match_count: view.full.len(),
            view,
        }
    }
}

/// Body of every failed request
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: message.into() }
    }
}
