use crate::text::{find_word_run, normalize};

/// Deterministic keyword matching: a label matches when its normalized form
/// appears as a whole word run in the normalized description.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringKeywordFallback;

impl SubstringKeywordFallback {
    /// Labels found in `description`, ordered by first occurrence (longer
    /// label first on ties) and capped at `limit`.
    pub fn extract(&self, description: &str, available: &[String], limit: usize) -> Vec<String> {
        let haystack = normalize(description);
        if haystack.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut hits: Vec<(usize, usize, &String)> = available
            .iter()
            .filter_map(|label| {
                let key = normalize(label);
                find_word_run(&haystack, &key).map(|pos| (pos, key.len(), label))
            })
            .collect();

        hits.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)));
        hits.into_iter().take(limit).map(|(_, _, label)| label.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_matches_accented_label() {
        let found = SubstringKeywordFallback.extract(
            "vidéo promo pour un café",
            &labels(&["café", "drone", "Restaurant"]),
            4,
        );
        assert_eq!(found, vec!["café"]);
    }

    #[test]
    fn test_requires_whole_word_run() {
        let found = SubstringKeywordFallback.extract(
            "un reportage caféine et cafétéria",
            &labels(&["café", "reportage"]),
            4,
        );
        assert_eq!(found, vec!["reportage"]);
    }

    #[test]
    fn test_ordering_and_cap() {
        let found = SubstringKeywordFallback.extract(
            "Interview en drone puis motion design et interview croisée",
            &labels(&["motion design", "Drone", "interview", "motion"]),
            3,
        );
        assert_eq!(found, vec!["interview", "Drone", "motion design"]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(SubstringKeywordFallback.extract("", &labels(&["café"]), 4).is_empty());
        assert!(SubstringKeywordFallback.extract("café", &[], 4).is_empty());
        assert!(SubstringKeywordFallback.extract("café", &labels(&["café"]), 0).is_empty());
    }
}
