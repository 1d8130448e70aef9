//! Showreel Recommender
//!
//! Tag-based recommendation engine for a video production studio's showreel:
//! matches a prospective client's declared intent against the tagged catalog
//! and returns a short ranked list of reference videos.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod keywords;
pub mod llm;
pub mod models;
pub mod ranges;
pub mod settings;
pub mod store;
pub mod taxonomy;
pub mod text;

#[cfg(feature = "api")]
pub mod api;

// Re-export main types for easy access
pub use crate::catalog::{CatalogSnapshot, CatalogStats};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::engine::{browse, BrowseSelection, BrowseView, Recommendation, Recommender};
pub use crate::error::{RecommendError, Result};
pub use crate::keywords::{ExternalKeywordExtractor, KeywordExtractor, SubstringKeywordFallback};
pub use crate::llm::{LLMConfig, LLMProvider};
pub use crate::models::{Query, RecommendRequest, Video, VideoRecord, VideoSummary, VideoTagLink};
pub use crate::settings::RuleSettings;
pub use crate::store::{create_store, CatalogStore, MemoryStore, RestStore, SnapshotStore};
pub use crate::taxonomy::{KindMap, Tag, TaxonomyKind};
pub use crate::text::normalize;
