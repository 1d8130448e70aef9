//! Free-text description to catalog keyword labels.
//!
//! [`KeywordExtractor`] tries the external extractor once, under a timeout,
//! and degrades to [`SubstringKeywordFallback`] on any failure. It never
//! returns an error.

pub mod external;
pub mod fallback;

use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::text::{contains_word_run, normalize};

pub use external::{ExternalKeywordExtractor, LlmKeywordExtractor};
pub use fallback::SubstringKeywordFallback;

/// Descriptions whose normalized form is this short carry too little signal.
pub const MIN_DESCRIPTION_LEN: usize = 8;

/// Which path produced the matched keywords
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeywordSource {
    External,
    Fallback,
    None,
}

/// Matched labels, always a subset of the supplied vocabulary
#[derive(Debug, Clone, Serialize)]
pub struct KeywordMatch {
    pub labels: Vec<String>,
    pub source: KeywordSource,
}

impl KeywordMatch {
    fn none() -> Self {
        Self {
            labels: Vec::new(),
            source: KeywordSource::None,
        }
    }

    /// Normalized labels, for scoring
    pub fn keys(&self) -> BTreeSet<String> {
        self.labels.iter().map(|l| normalize(l)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Map labels returned by the external service back onto the vocabulary.
///
/// Exact normalized match first, otherwise the vocabulary label whose
/// normalized form contains the returned one as a whole word run (or the
/// other way round) with the smallest length difference. Fragments inside a
/// word never match. Unmatched labels are discarded, duplicates collapse, and
/// the result is capped at `limit`.
pub fn match_to_vocabulary(returned: &[String], available: &[String], limit: usize) -> Vec<String> {
    let keyed: Vec<(String, &String)> = available.iter().map(|l| (normalize(l), l)).collect();
    let mut seen = BTreeSet::new();
    let mut matched = Vec::new();

    for raw in returned {
        let key = normalize(raw);
        if key.is_empty() {
            continue;
        }

        let exact = keyed.iter().find(|(k, _)| *k == key);
        let closest = exact.or_else(|| {
            keyed
                .iter()
                .filter(|(k, _)| contains_word_run(k, &key) || contains_word_run(&key, k))
                .min_by_key(|(k, _)| k.len().abs_diff(key.len()))
        });

        match closest {
            Some((k, label)) if seen.insert(k.clone()) => matched.push((*label).clone()),
            Some(_) => {}
            None => debug!("Discarding keyword outside vocabulary: {}", raw),
        }

        if matched.len() >= limit {
            break;
        }
    }

    matched
}

/// Orchestrates external extraction and the deterministic fallback
#[derive(Clone)]
pub struct KeywordExtractor {
    external: Option<Arc<dyn ExternalKeywordExtractor>>,
    fallback: SubstringKeywordFallback,
    timeout: Duration,
}

impl KeywordExtractor {
    pub fn new(external: Option<Arc<dyn ExternalKeywordExtractor>>, timeout: Duration) -> Self {
        Self {
            external,
            fallback: SubstringKeywordFallback,
            timeout,
        }
    }

    /// Substring matching only
    pub fn fallback_only() -> Self {
        Self::new(None, Duration::from_secs(0))
    }

    /// Resolve `description` to at most `limit` labels from `available`.
    pub async fn extract(&self, description: &str, available: &[String], limit: usize) -> KeywordMatch {
        let limit = limit.max(1);
        if normalize(description).len() <= MIN_DESCRIPTION_LEN || available.is_empty() {
            return KeywordMatch::none();
        }

        if let Some(external) = &self.external {
            match tokio::time::timeout(self.timeout, external.extract(description, available, limit)).await {
                Ok(Ok(returned)) => {
                    let labels = match_to_vocabulary(&returned, available, limit);
                    if !labels.is_empty() {
                        info!("🔑 {} extracted {} keywords", external.name(), labels.len());
                        return KeywordMatch {
                            labels,
                            source: KeywordSource::External,
                        };
                    }
                    debug!("{} returned no usable keywords, using substring fallback", external.name());
                }
                Ok(Err(e)) => warn!("Keyword extraction via {} failed: {}, using substring fallback", external.name(), e),
                Err(_) => warn!(
                    "Keyword extraction via {} timed out after {:?}, using substring fallback",
                    external.name(),
                    self.timeout
                ),
            }
        }

        let labels = self.fallback.extract(description, available, limit);
        if labels.is_empty() {
            return KeywordMatch::none();
        }
        KeywordMatch {
            labels,
            source: KeywordSource::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    enum Behaviour {
        Answer(Vec<&'static str>),
        Fail,
        Hang,
    }

    struct FakeExtractor(Behaviour);

    #[async_trait]
    impl ExternalKeywordExtractor for FakeExtractor {
        async fn extract(&self, _description: &str, _available: &[String], _limit: usize) -> Result<Vec<String>> {
            match &self.0 {
                Behaviour::Answer(labels) => Ok(labels.iter().map(|s| s.to_string()).collect()),
                Behaviour::Fail => Err(anyhow!("service unavailable")),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(vec![])
                }
            }
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn vocabulary() -> Vec<String> {
        ["café", "Drone", "motion design", "Restaurant"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn extractor(behaviour: Behaviour) -> KeywordExtractor {
        KeywordExtractor::new(Some(Arc::new(FakeExtractor(behaviour))), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_short_description_yields_nothing() {
        let found = extractor(Behaviour::Answer(vec!["café"])).extract("café", &vocabulary(), 4).await;
        assert!(found.is_empty());
        assert_eq!(found.source, KeywordSource::None);
    }

    #[tokio::test]
    async fn test_external_labels_mapped_to_vocabulary() {
        let found = extractor(Behaviour::Answer(vec!["CAFE", "motion", "pizza", "drone", "Drone"]))
            .extract("une vidéo pour notre restaurant", &vocabulary(), 4)
            .await;
        assert_eq!(found.source, KeywordSource::External);
        assert_eq!(found.labels, vec!["café", "motion design", "Drone"]);
    }

    #[test]
    fn test_fragments_inside_words_are_discarded() {
        let available = vec!["Cartoon".to_string(), "Drone".to_string(), "Food truck".to_string()];
        let returned: Vec<String> = ["art", "one", "truck"].iter().map(|s| s.to_string()).collect();
        assert_eq!(match_to_vocabulary(&returned, &available, 4), vec!["Food truck"]);

        let returned = vec!["art".to_string(), "one".to_string()];
        assert!(match_to_vocabulary(&returned, &available, 4).is_empty());
    }

    #[tokio::test]
    async fn test_external_result_is_capped() {
        let found = extractor(Behaviour::Answer(vec!["café", "drone", "restaurant"]))
            .extract("une vidéo pour notre restaurant", &vocabulary(), 2)
            .await;
        assert_eq!(found.labels.len(), 2);
    }

    #[tokio::test]
    async fn test_failure_degrades_to_fallback() {
        let found = extractor(Behaviour::Fail)
            .extract("vidéo promo pour un café", &vocabulary(), 4)
            .await;
        assert_eq!(found.source, KeywordSource::Fallback);
        assert!(found.labels.contains(&"café".to_string()));
    }

    #[tokio::test]
    async fn test_timeout_degrades_to_fallback() {
        let found = extractor(Behaviour::Hang)
            .extract("tournage au drone pour un restaurant", &vocabulary(), 4)
            .await;
        assert_eq!(found.source, KeywordSource::Fallback);
        assert_eq!(found.labels, vec!["Drone", "Restaurant"]);
    }

    #[tokio::test]
    async fn test_empty_external_answer_degrades_to_fallback() {
        let found = extractor(Behaviour::Answer(vec!["pizza"]))
            .extract("vidéo promo pour un café", &vocabulary(), 4)
            .await;
        assert_eq!(found.source, KeywordSource::Fallback);
    }

    #[tokio::test]
    async fn test_fallback_only_without_external() {
        let found = KeywordExtractor::fallback_only()
            .extract("vidéo promo pour un café", &vocabulary(), 4)
            .await;
        assert_eq!(found.labels, vec!["café"]);
        assert_eq!(found.keys().into_iter().collect::<Vec<_>>(), vec!["cafe"]);
    }
}
