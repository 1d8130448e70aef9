use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::CatalogStore;
use crate::config::StoreConfig;
use crate::error::{RecommendError, Result};
use crate::models::{VideoRecord, VideoTagLink};
use crate::taxonomy::Tag;

/// PostgREST-style hosted backend (`GET {base}/rest/v1/{table}?select=*`)
pub struct RestStore {
    base: Url,
    api_key: Option<String>,
    tables: RestTables,
    settings_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Clone)]
struct RestTables {
    videos: String,
    tags: String,
    links: String,
    settings: String,
}

#[derive(Debug, Deserialize)]
struct SettingsRow {
    value: Value,
}

impl RestStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let raw = config
            .rest_url
            .as_ref()
            .ok_or_else(|| RecommendError::Configuration("REST store URL not configured".to_string()))?;

        let mut base = Url::parse(raw)
            .map_err(|e| RecommendError::Configuration(format!("invalid REST store URL {}: {}", raw, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            base,
            api_key: config.api_key.clone(),
            tables: RestTables {
                videos: config.videos_table.clone(),
                tags: config.tags_table.clone(),
                links: config.links_table.clone(),
                settings: config.settings_table.clone(),
            },
            settings_key: config.settings_key.clone(),
            client,
        })
    }

    fn table_url(&self, table: &str, filter: Option<(&str, String)>) -> Result<Url> {
        let mut url = self
            .base
            .join(&format!("rest/v1/{}", table))
            .map_err(|e| RecommendError::Configuration(format!("invalid table name {}: {}", table, e)))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            if let Some((column, value)) = filter {
                pairs.append_pair(column, &value);
            }
        }
        Ok(url)
    }

    async fn get_rows<T: DeserializeOwned>(&self, table: &str, filter: Option<(&str, String)>) -> Result<Vec<T>> {
        let url = self.table_url(table, filter)?;
        debug!("Fetching {} from {}", table, url);

        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request
                .header("apikey", key)
                .header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(RecommendError::upstream(table, format!("{}: {}", status, text)));
        }

        let rows: Vec<T> = response
            .json()
            .await
            .map_err(|e| RecommendError::upstream(table, format!("unexpected payload: {}", e)))?;
        Ok(rows)
    }
}

#[async_trait]
impl CatalogStore for RestStore {
    async fn fetch_videos(&self) -> Result<Vec<VideoRecord>> {
        self.get_rows(&self.tables.videos, None).await
    }

    async fn fetch_tags(&self) -> Result<Vec<Tag>> {
        self.get_rows(&self.tables.tags, None).await
    }

    async fn fetch_video_tags(&self) -> Result<Vec<VideoTagLink>> {
        self.get_rows(&self.tables.links, None).await
    }

    async fn fetch_settings(&self) -> Result<Option<Value>> {
        let rows: Vec<SettingsRow> = self
            .get_rows(&self.tables.settings, Some(("key", format!("eq.{}", self.settings_key))))
            .await?;
        Ok(rows.into_iter().next().map(|row| row.value).filter(|v| !v.is_null()))
    }

    fn name(&self) -> &str {
        "rest"
    }
}
