use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use super::CatalogStore;
use crate::error::{RecommendError, Result};
use crate::models::{VideoRecord, VideoTagLink};
use crate::taxonomy::Tag;

const VIDEOS_FILE: &str = "videos.json";
const TAGS_FILE: &str = "tags.json";
const LINKS_FILE: &str = "video_tags.json";
const SETTINGS_FILE: &str = "settings.json";

/// Catalog exported as JSON files in a directory
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_list<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>> {
        let path = self.dir.join(file);
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| RecommendError::upstream(file, format!("{}: {}", path.display(), e)))?;
        let items: Vec<T> = serde_json::from_str(&content)
            .map_err(|e| RecommendError::upstream(file, format!("invalid JSON: {}", e)))?;
        debug!("Read {} records from {}", items.len(), path.display());
        Ok(items)
    }

    /// Write a snapshot to disk, used by exports and tests
    pub async fn write(
        dir: &Path,
        videos: &[VideoRecord],
        tags: &[Tag],
        links: &[VideoTagLink],
        settings: Option<&Value>,
    ) -> Result<()> {
        fs::create_dir_all(dir).await?;
        fs::write(dir.join(VIDEOS_FILE), serde_json::to_string_pretty(videos)?).await?;
        fs::write(dir.join(TAGS_FILE), serde_json::to_string_pretty(tags)?).await?;
        fs::write(dir.join(LINKS_FILE), serde_json::to_string_pretty(links)?).await?;
        if let Some(settings) = settings {
            fs::write(dir.join(SETTINGS_FILE), serde_json::to_string_pretty(settings)?).await?;
        }
        info!("💾 Catalog snapshot written to {}", dir.display());
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for SnapshotStore {
    async fn fetch_videos(&self) -> Result<Vec<VideoRecord>> {
        self.read_list(VIDEOS_FILE).await
    }

    async fn fetch_tags(&self) -> Result<Vec<Tag>> {
        self.read_list(TAGS_FILE).await
    }

    async fn fetch_video_tags(&self) -> Result<Vec<VideoTagLink>> {
        self.read_list(LINKS_FILE).await
    }

    async fn fetch_settings(&self) -> Result<Option<Value>> {
        let path = self.dir.join(SETTINGS_FILE);
        if !path.exists() {
            debug!("No settings file at {}", path.display());
            return Ok(None);
        }
        let content = fs::read_to_string(&path).await?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| RecommendError::upstream(SETTINGS_FILE, format!("invalid JSON: {}", e)))?;
        Ok(Some(value))
    }

    fn name(&self) -> &str {
        "snapshot"
    }
}
