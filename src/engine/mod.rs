//! Recommendation entry point.
//!
//! A call takes one catalog snapshot, one [`RuleSettings`] value and one
//! [`Query`], and is a pure function of them apart from the keyword
//! extraction round trip. Nothing is cached between calls.

pub mod browse;
pub mod filter;
pub mod rank;

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::catalog::CatalogSnapshot;
use crate::config::Config;
use crate::error::Result;
use crate::keywords::{ExternalKeywordExtractor, KeywordExtractor, KeywordSource, LlmKeywordExtractor};
use crate::models::{Query, VideoSummary, MAX_LIMIT};
use crate::ranges::{resolve_budget_bucket, resolve_duration_buckets, NumericRange};
use crate::settings::{ResolvedRules, RuleSettings};
use crate::store::{load_all, CatalogStore};

pub use browse::{browse, BrowseDivider, BrowseEntry, BrowseRequest, BrowseSelection, BrowseView, Facet};
pub use filter::filter_videos;
pub use rank::{rank, Reason, Score, ScoredVideo};

/// Declared intent resolved into normalized sets and numeric ranges
#[derive(Debug, Clone, Default)]
pub struct MatchContext {
    pub rules: ResolvedRules,
    /// `None` when no budget or an unknown/unsure bucket was declared
    pub budget: Option<NumericRange>,
    /// Concrete duration buckets only
    pub durations: Vec<(String, NumericRange)>,
    pub exclude_ids: HashSet<String>,
}

impl MatchContext {
    pub fn resolve(query: &Query, settings: &RuleSettings) -> Self {
        Self {
            rules: settings.resolve(&query.objectives, &query.audiences),
            budget: query.budget.as_deref().and_then(resolve_budget_bucket),
            durations: resolve_duration_buckets(&query.durations),
            exclude_ids: query.exclude_ids.clone(),
        }
    }
}

/// Per-result explanation in the debug payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultExplanation {
    pub id: String,
    pub score: Score,
    pub reasons: Vec<Reason>,
}

/// What was resolved and why each result was picked
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationDebug {
    pub allowed_types: Vec<String>,
    pub allowed_objectifs: Vec<String>,
    pub priority_objectifs: Vec<String>,
    pub removed_types: Vec<String>,
    pub budget: Option<NumericRange>,
    pub durations: Vec<String>,
    pub matched_keywords: Vec<String>,
    pub keyword_source: KeywordSource,
    pub full_match_count: usize,
    pub used_fallback: bool,
    pub results: Vec<ResultExplanation>,
    pub settings_version: String,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub videos: Vec<VideoSummary>,
    #[serde(skip)]
    pub debug: RecommendationDebug,
}

impl Recommendation {
    pub fn ids(&self) -> Vec<String> {
        self.videos.iter().map(|v| v.id.clone()).collect()
    }

    pub fn full_match_count(&self) -> usize {
        self.debug.full_match_count
    }
}

fn sorted(set: &HashSet<String>) -> Vec<String> {
    let mut items: Vec<String> = set.iter().cloned().collect();
    items.sort();
    items
}

/// Filter, keyword extraction and ranking composed behind one call
#[derive(Clone)]
pub struct Recommender {
    extractor: KeywordExtractor,
    max_limit: usize,
}

impl Recommender {
    pub fn new(extractor: KeywordExtractor) -> Self {
        Self {
            extractor,
            max_limit: MAX_LIMIT,
        }
    }

    /// Cap results below the hard maximum
    pub fn with_max_limit(mut self, max_limit: usize) -> Self {
        self.max_limit = max_limit.clamp(1, MAX_LIMIT);
        self
    }

    /// Build from configuration. A provider that cannot be initialised leaves
    /// the recommender on substring matching only.
    pub async fn from_config(config: &Config) -> Self {
        let timeout = Duration::from_millis(config.keywords.timeout_ms);

        let external: Option<Arc<dyn ExternalKeywordExtractor>> = if config.keywords.enable_extraction {
            match LlmKeywordExtractor::new(&config.llm, config.keywords.prompt_file.as_deref()).await {
                Ok(extractor) => {
                    info!("🤖 Keyword extraction via {:?} ({})", config.llm.provider, config.llm.model);
                    Some(Arc::new(extractor))
                }
                Err(e) => {
                    warn!("Keyword extraction disabled: {}", e);
                    None
                }
            }
        } else {
            info!("Keyword extraction disabled, substring matching only");
            None
        };

        Self::new(KeywordExtractor::new(external, timeout)).with_max_limit(config.recommend.max_limit)
    }

    /// Rank `catalog` against `query`. Never fails: an empty catalog gives an
    /// empty list and keyword extraction degrades on its own.
    pub async fn recommend(&self, catalog: &CatalogSnapshot, query: &Query, settings: &RuleSettings) -> Recommendation {
        let started = Instant::now();
        let ctx = MatchContext::resolve(query, settings);

        let vocabulary = catalog.keyword_vocabulary();
        let keywords = self
            .extractor
            .extract(&query.description, &vocabulary, settings.keyword_limit())
            .await;
        let matched_keys: BTreeSet<String> = keywords.keys();

        let candidates = filter_videos(catalog.videos(), &ctx);
        let limit = query.limit().min(self.max_limit);
        let ranking = rank(catalog.videos(), candidates, &ctx, &matched_keys, settings, limit);

        let results: Vec<ResultExplanation> = ranking
            .results
            .iter()
            .map(|scored| ResultExplanation {
                id: scored.video.id().to_string(),
                score: scored.score,
                reasons: scored.reasons(),
            })
            .collect();
        let videos: Vec<VideoSummary> = ranking.results.iter().map(|scored| scored.video.summary()).collect();

        let explanation = RecommendationDebug {
            allowed_types: sorted(&ctx.rules.allowed_types),
            allowed_objectifs: sorted(&ctx.rules.allowed_objectifs),
            priority_objectifs: sorted(&ctx.rules.priority_objectifs),
            removed_types: sorted(&ctx.rules.removed_types),
            budget: ctx.budget,
            durations: ctx.durations.iter().map(|(id, _)| id.clone()).collect(),
            matched_keywords: keywords.labels,
            keyword_source: keywords.source,
            full_match_count: ranking.full_match_count,
            used_fallback: ranking.used_fallback,
            results,
            settings_version: settings.fingerprint(),
            elapsed_ms: started.elapsed().as_millis(),
        };

        info!(
            "🎬 Recommended {} videos ({} full matches, keywords: {:?})",
            videos.len(),
            explanation.full_match_count,
            explanation.keyword_source
        );

        Recommendation {
            videos,
            debug: explanation,
        }
    }

    /// Load catalog and settings from `store`, then recommend. Upstream read
    /// failures are returned, never partially answered.
    pub async fn recommend_from_store(&self, store: &dyn CatalogStore, query: &Query) -> Result<Recommendation> {
        let (catalog, settings) = load_all(store).await?;
        Ok(self.recommend(&catalog, query, &settings).await)
    }
}

impl Default for Recommender {
    fn default() -> Self {
        Self::new(KeywordExtractor::fallback_only())
    }
}
