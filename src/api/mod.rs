//! HTTP boundary of the recommender
//!
//! Exposes the recommendation and browsing calls to the showreel front end.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::engine::Recommender;
use crate::store::CatalogStore;

pub mod handlers;
pub mod models;
pub mod server;

/// API server answering recommendation and browse requests
pub struct ApiServer {
    store: Arc<dyn CatalogStore>,
    recommender: Recommender,
    config: Arc<Config>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(store: Arc<dyn CatalogStore>, recommender: Recommender, config: Arc<Config>) -> Self {
        Self {
            store,
            recommender,
            config,
        }
    }

    /// Start the API server
    pub async fn start(self) -> Result<()> {
        info!(
            "🚀 Starting API server on {}:{} (store: {})",
            self.config.server.host,
            self.config.server.port,
            self.store.name()
        );

        server::start_http_server(self.store, self.recommender, self.config).await
    }
}
