use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::llm::{LLMConfig, LLMProvider};
use crate::models::{DEFAULT_LIMIT, MAX_LIMIT};

/// Configuration for the showreel recommender
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Catalog and settings store
    pub store: StoreConfig,

    /// LLM provider used for keyword extraction
    pub llm: LLMConfig,

    /// Keyword extraction settings
    pub keywords: KeywordConfig,

    /// Recommendation defaults
    pub recommend: RecommendConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Listening port
    pub port: u16,

    /// Include the debug payload in recommendation responses
    pub debug_payload: bool,

    /// Allowed CORS origins (empty = any)
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StoreBackend {
    /// JSON files exported in a directory
    Snapshot,
    /// Hosted PostgREST-style backend
    Rest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Which backend to read from
    pub backend: StoreBackend,

    /// Directory holding videos.json, tags.json, video_tags.json, settings.json
    pub snapshot_dir: PathBuf,

    /// Base URL of the hosted backend
    pub rest_url: Option<String>,

    /// API key for the hosted backend
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    pub videos_table: String,
    pub tags_table: String,
    pub links_table: String,
    pub settings_table: String,

    /// Row key of the recommendation settings object
    pub settings_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    /// Call the LLM for keyword extraction (substring fallback otherwise)
    pub enable_extraction: bool,

    /// Hard timeout around the extraction call in milliseconds
    pub timeout_ms: u64,

    /// Path to a custom extraction prompt
    pub prompt_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    /// Result size when the request has none
    pub default_limit: usize,

    /// Upper bound applied to requested limits
    pub max_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            debug_payload: false,
            cors_origins: Vec::new(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Snapshot,
            snapshot_dir: PathBuf::from("data"),
            rest_url: None,
            api_key: None,
            timeout_seconds: 15,
            videos_table: "videos".to_string(),
            tags_table: "tags".to_string(),
            links_table: "video_tags".to_string(),
            settings_table: "settings".to_string(),
            settings_key: "recommendation".to_string(),
        }
    }
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            enable_extraction: true,
            timeout_ms: 8_000,
            prompt_file: None,
        }
    }
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            llm: LLMConfig::default(),
            keywords: KeywordConfig::default(),
            recommend: RecommendConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn env_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl Config {
    /// Load configuration from the first readable file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let config_paths = [
            "showreel.toml",
            "config/showreel.toml",
            "/etc/showreel/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        config.apply_env();
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load a specific configuration file
    pub fn from_file(path: &str) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read config file {}: {}", path, e))?;
        let mut config: Config = toml::from_str(&config_str)?;
        config.apply_env();
        Ok(config)
    }

    /// Defaults with environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(port) = std::env::var("SHOWREEL_PORT") {
            self.server.port = port.parse().unwrap_or(self.server.port);
        }

        if let Ok(debug) = std::env::var("SHOWREEL_DEBUG") {
            self.server.debug_payload = env_flag(&debug);
        }

        if let Ok(dir) = std::env::var("SHOWREEL_SNAPSHOT_DIR") {
            self.store.snapshot_dir = PathBuf::from(dir);
            self.store.backend = StoreBackend::Snapshot;
        }

        if let Ok(url) = std::env::var("SHOWREEL_STORE_URL") {
            self.store.rest_url = Some(url);
            self.store.backend = StoreBackend::Rest;
        }

        if let Ok(key) = std::env::var("SHOWREEL_STORE_KEY") {
            self.store.api_key = Some(key);
        }

        if let Ok(provider) = std::env::var("SHOWREEL_LLM_PROVIDER") {
            match provider.to_lowercase().as_str() {
                "openai" => self.llm.provider = LLMProvider::OpenAI,
                "gemini" => self.llm.provider = LLMProvider::Gemini,
                "lmstudio" => self.llm.provider = LLMProvider::LMStudio,
                other => tracing::warn!("Unknown LLM provider in environment: {}", other),
            }
        }

        if let Ok(api_key) = std::env::var("SHOWREEL_LLM_API_KEY") {
            self.llm.api_key = Some(api_key);
        }

        if let Ok(model) = std::env::var("SHOWREEL_LLM_MODEL") {
            self.llm.model = model;
        }

        if let Ok(log_level) = std::env::var("SHOWREEL_LOG_LEVEL") {
            self.logging.log_level = log_level;
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.recommend.max_limit == 0 || self.recommend.max_limit > MAX_LIMIT {
            return Err(anyhow!("max_limit must be within 1..={}", MAX_LIMIT));
        }

        if self.recommend.default_limit == 0 || self.recommend.default_limit > self.recommend.max_limit {
            return Err(anyhow!("default_limit must be within 1..=max_limit"));
        }

        match self.store.backend {
            StoreBackend::Rest => {
                if self.store.rest_url.is_none() {
                    return Err(anyhow!("rest_url required for the REST store backend"));
                }
            }
            StoreBackend::Snapshot => {
                if self.store.snapshot_dir.as_os_str().is_empty() {
                    return Err(anyhow!("snapshot_dir required for the snapshot store backend"));
                }
            }
        }

        if self.keywords.enable_extraction {
            match self.llm.provider {
                LLMProvider::OpenAI | LLMProvider::Gemini => {
                    if self.llm.api_key.is_none() {
                        return Err(anyhow!("API key required for {:?} keyword extraction", self.llm.provider));
                    }
                }
                LLMProvider::LMStudio => {
                    if self.llm.endpoint.is_none() {
                        return Err(anyhow!("Endpoint required for LMStudio keyword extraction"));
                    }
                }
            }
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Showreel Recommender Configuration:\n\
            - Listen: {}:{}\n\
            - Store: {:?}\n\
            - Keyword extraction: {} ({:?}, {}ms timeout)\n\
            - Default limit: {}\n\
            - Debug payload: {}",
            self.server.host,
            self.server.port,
            self.store.backend,
            self.keywords.enable_extraction,
            self.llm.provider,
            self.keywords.timeout_ms,
            self.recommend.default_limit,
            self.server.debug_payload
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_snapshot_dir(mut self, dir: PathBuf) -> Self {
        self.config.store.backend = StoreBackend::Snapshot;
        self.config.store.snapshot_dir = dir;
        self
    }

    pub fn with_rest_store(mut self, url: String, api_key: Option<String>) -> Self {
        self.config.store.backend = StoreBackend::Rest;
        self.config.store.rest_url = Some(url);
        self.config.store.api_key = api_key;
        self
    }

    pub fn with_llm_provider(mut self, provider: LLMProvider) -> Self {
        self.config.llm.provider = provider;
        self
    }

    pub fn with_llm_api_key(mut self, api_key: String) -> Self {
        self.config.llm.api_key = Some(api_key);
        self
    }

    pub fn enable_extraction(mut self, enable: bool) -> Self {
        self.config.keywords.enable_extraction = enable;
        self
    }

    pub fn enable_debug_payload(mut self, enable: bool) -> Self {
        self.config.server.debug_payload = enable;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.recommend.default_limit, 6);
        assert_eq!(config.store.backend, StoreBackend::Snapshot);
        assert!(!config.server.debug_payload);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_port(9000)
            .with_rest_store("https://db.example.com".to_string(), Some("key".to_string()))
            .enable_extraction(false)
            .build();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.store.backend, StoreBackend::Rest);
        assert!(!config.keywords.enable_extraction);
    }

    #[test]
    fn test_config_validation() {
        let config = ConfigBuilder::new().enable_extraction(false).build();
        assert!(config.validate().is_ok());

        let config = ConfigBuilder::new()
            .with_llm_provider(LLMProvider::OpenAI)
            .enable_extraction(true)
            .build();
        assert!(config.validate().is_err());

        let mut config = ConfigBuilder::new().enable_extraction(false).build();
        config.store.backend = StoreBackend::Rest;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 3000

            [keywords]
            timeout_ms = 2500
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.keywords.timeout_ms, 2500);
        assert!(config.keywords.enable_extraction);
    }
}
