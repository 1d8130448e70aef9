/// Result type for recommendation operations
pub type Result<T> = std::result::Result<T, RecommendError>;

/// Error types surfaced by the recommendation core.
///
/// Keyword extraction failures never appear here: they degrade to the
/// substring fallback inside the keyword module.
#[derive(thiserror::Error, Debug)]
pub enum RecommendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Upstream read failed for {source_name}: {message}")]
    UpstreamRead { source_name: String, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RecommendError {
    pub fn upstream(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamRead {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Whether the failure comes from the catalog or settings store
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            RecommendError::UpstreamRead { .. } | RecommendError::Http(_) | RecommendError::Io(_) | RecommendError::Json(_)
        )
    }
}
