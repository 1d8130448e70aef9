//! Read-only access to the hosted data backend.
//!
//! The catalog is read as three flat lists (videos, tag definitions and
//! video/tag links) and joined in memory. Rule settings are a single object.

pub mod rest;
pub mod snapshot;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog::CatalogSnapshot;
use crate::config::{StoreBackend, StoreConfig};
use crate::error::{RecommendError, Result};
use crate::models::{VideoRecord, VideoTagLink};
use crate::settings::RuleSettings;
use crate::taxonomy::Tag;

pub use rest::RestStore;
pub use snapshot::SnapshotStore;

/// Trait for catalog backends
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn fetch_videos(&self) -> Result<Vec<VideoRecord>>;
    async fn fetch_tags(&self) -> Result<Vec<Tag>>;
    async fn fetch_video_tags(&self) -> Result<Vec<VideoTagLink>>;
    /// Stored rule settings object, `None` when nothing was ever saved
    async fn fetch_settings(&self) -> Result<Option<Value>>;
    fn name(&self) -> &str;
}

/// Create a store based on configuration
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn CatalogStore>> {
    match config.backend {
        StoreBackend::Snapshot => Ok(Arc::new(SnapshotStore::new(config.snapshot_dir.clone()))),
        StoreBackend::Rest => Ok(Arc::new(RestStore::new(config)?)),
    }
}

/// Read and join the catalog. The three reads run concurrently; any failure
/// fails the whole load.
pub async fn load_catalog(store: &dyn CatalogStore) -> Result<CatalogSnapshot> {
    debug!("Loading catalog from {}", store.name());
    let (videos, tags, links) =
        futures::try_join!(store.fetch_videos(), store.fetch_tags(), store.fetch_video_tags())?;

    let snapshot = CatalogSnapshot::join(videos, tags, links);
    info!("Catalog snapshot ready from {} ({} videos)", store.name(), snapshot.videos().len());
    Ok(snapshot)
}

/// Read the rule settings, falling back to defaults when none are stored
pub async fn load_settings(store: &dyn CatalogStore) -> Result<RuleSettings> {
    let stored = store.fetch_settings().await?;
    Ok(RuleSettings::parse_or_default(stored.as_ref()))
}

/// Load catalog and settings together
pub async fn load_all(store: &dyn CatalogStore) -> Result<(CatalogSnapshot, RuleSettings)> {
    futures::try_join!(load_catalog(store), load_settings(store))
}

/// In-memory store, used by tests and benchmarks
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub videos: Vec<VideoRecord>,
    pub tags: Vec<Tag>,
    pub links: Vec<VideoTagLink>,
    pub settings: Option<Value>,
    /// When set every read fails with this message
    pub fail_with: Option<String>,
}

impl MemoryStore {
    fn check(&self, source: &str) -> Result<()> {
        match &self.fail_with {
            Some(message) => Err(RecommendError::upstream(source, message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn fetch_videos(&self) -> Result<Vec<VideoRecord>> {
        self.check("videos")?;
        Ok(self.videos.clone())
    }

    async fn fetch_tags(&self) -> Result<Vec<Tag>> {
        self.check("tags")?;
        Ok(self.tags.clone())
    }

    async fn fetch_video_tags(&self) -> Result<Vec<VideoTagLink>> {
        self.check("video_tags")?;
        Ok(self.links.clone())
    }

    async fn fetch_settings(&self) -> Result<Option<Value>> {
        self.check("settings")?;
        Ok(self.settings.clone())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
