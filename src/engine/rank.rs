//! Multi-key scoring and ordering of candidate videos

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, info};

use super::filter::{budget_matches, duration_matches, is_eligible};
use super::MatchContext;
use crate::models::Video;
use crate::settings::RuleSettings;
use crate::taxonomy::TaxonomyKind;

/// Per-video match counts against the declared intent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub keyword_matches: usize,
    pub priority_objectif_match: u8,
    pub objectif_matches: usize,
    pub type_matches: usize,
    pub duration_match: u8,
    pub budget_match: u8,
}

impl Score {
    pub fn compute(video: &Video, ctx: &MatchContext, matched_keywords: &BTreeSet<String>) -> Self {
        let rules = &ctx.rules;

        let keyword_matches = TaxonomyKind::KEYWORD_LIKE
            .iter()
            .flat_map(|kind| video.keys_of(*kind))
            .filter(|key| matched_keywords.contains(key))
            .count();

        let type_matches = video
            .keys_of(TaxonomyKind::Type)
            .filter(|key| rules.allowed_types.contains(key))
            .count();

        let objectif_keys: Vec<String> = video.keys_of(TaxonomyKind::Objectif).collect();
        let priority_objectif_match = objectif_keys
            .iter()
            .any(|key| rules.priority_objectifs.contains(key)) as u8;
        let objectif_matches = objectif_keys
            .iter()
            .filter(|key| rules.allowed_objectifs.contains(*key))
            .count();

        let duration_match = (!ctx.durations.is_empty() && duration_matches(video, &ctx.durations)) as u8;
        let budget_match = ctx
            .budget
            .as_ref()
            .map(|bucket| budget_matches(video, bucket))
            .unwrap_or(false) as u8;

        Self {
            keyword_matches,
            priority_objectif_match,
            objectif_matches,
            type_matches,
            duration_match,
            budget_match,
        }
    }

    /// Keys in precedence order
    fn key(&self) -> (usize, u8, usize, usize, u8, u8) {
        (
            self.keyword_matches,
            self.priority_objectif_match,
            self.objectif_matches,
            self.type_matches,
            self.duration_match,
            self.budget_match,
        )
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Why a video was selected, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reason {
    Keyword,
    PriorityObjective,
    Objective,
    Type,
    Duration,
    Budget,
    Featured,
}

#[derive(Debug, Clone)]
pub struct ScoredVideo<'a> {
    pub video: &'a Video,
    pub score: Score,
}

impl<'a> ScoredVideo<'a> {
    pub fn reasons(&self) -> Vec<Reason> {
        let s = &self.score;
        let mut reasons = Vec::new();
        if s.keyword_matches > 0 {
            reasons.push(Reason::Keyword);
        }
        if s.priority_objectif_match > 0 {
            reasons.push(Reason::PriorityObjective);
        }
        if s.objectif_matches > 0 {
            reasons.push(Reason::Objective);
        }
        if s.type_matches > 0 {
            reasons.push(Reason::Type);
        }
        if s.duration_match > 0 {
            reasons.push(Reason::Duration);
        }
        if s.budget_match > 0 {
            reasons.push(Reason::Budget);
        }
        if self.video.record.featured {
            reasons.push(Reason::Featured);
        }
        reasons
    }
}

/// Score descending, then most recent first
pub fn compare_scored(a: &ScoredVideo, b: &ScoredVideo) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.video.record.created_at.cmp(&a.video.record.created_at))
}

/// Ranked, truncated output
#[derive(Debug, Clone)]
pub struct Ranking<'a> {
    pub results: Vec<ScoredVideo<'a>>,
    /// Size of the true filtered set
    pub full_match_count: usize,
    /// The results come from the unfiltered catalog
    pub used_fallback: bool,
}

/// Order `candidates` (the filter output) and keep the first `limit`.
///
/// With an empty candidate set and `fallback_to_best`, every eligible video
/// of `catalog` is ranked instead.
pub fn rank<'a>(
    catalog: &'a [Video],
    candidates: Vec<&'a Video>,
    ctx: &MatchContext,
    matched_keywords: &BTreeSet<String>,
    settings: &RuleSettings,
    limit: usize,
) -> Ranking<'a> {
    let full_match_count = candidates.len();
    let used_fallback = candidates.is_empty() && settings.fallback_to_best;

    let pool: Vec<&Video> = if used_fallback {
        catalog
            .iter()
            .filter(|video| is_eligible(video, &ctx.exclude_ids))
            .collect()
    } else {
        candidates
    };

    if used_fallback {
        info!("No full match, ranking {} videos as best effort", pool.len());
    }

    let mut scored: Vec<ScoredVideo> = pool
        .into_iter()
        .map(|video| ScoredVideo {
            video,
            score: Score::compute(video, ctx, matched_keywords),
        })
        .collect();

    scored.sort_by(compare_scored);
    scored.truncate(limit);

    debug!(
        "Ranked {} results ({} full matches, fallback: {})",
        scored.len(),
        full_match_count,
        used_fallback
    );

    Ranking {
        results: scored,
        full_match_count,
        used_fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::filter::filter_videos;
    use crate::engine::test_support::{ctx, video};
    use crate::models::Query;
    use serde_json::json;

    fn keys(labels: &[&str]) -> BTreeSet<String> {
        labels.iter().map(|l| crate::text::normalize(l)).collect()
    }

    fn promo_settings() -> RuleSettings {
        RuleSettings::parse_or_default(Some(&json!({
            "objectives": {
                "promotion": {
                    "types": ["Spot", "Publicité"],
                    "objectifs": ["Vendre", "Promouvoir"],
                    "priorityObjectifs": ["Promouvoir"]
                }
            }
        })))
    }

    #[test]
    fn test_budget_match_score() {
        let v1 = video("v1", &[]).budget(Some(5_000), Some(10_000)).build();
        let query = Query::new().with_budget("5000-10000");
        let score = Score::compute(&v1, &ctx(&query, &RuleSettings::default()), &BTreeSet::new());
        assert_eq!(score.budget_match, 1);
        assert_eq!(score.duration_match, 0);
    }

    #[test]
    fn test_score_dimensions() {
        let v = video(
            "v",
            &[
                ("keyword", "Café"),
                ("style", "Épuré"),
                ("parametre", "Drone"),
                ("type", "Spot"),
                ("objectif", "Promouvoir"),
                ("objectif", "Vendre"),
            ],
        )
        .duration(Some(25))
        .build();
        let query = Query::new().with_objectives(["promotion"]).with_durations(["clip"]);
        let score = Score::compute(&v, &ctx(&query, &promo_settings()), &keys(&["cafe", "drone"]));

        assert_eq!(
            score,
            Score {
                keyword_matches: 2,
                priority_objectif_match: 1,
                objectif_matches: 2,
                type_matches: 1,
                duration_match: 1,
                budget_match: 0,
            }
        );
    }

    #[test]
    fn test_precedence_keyword_beats_everything() {
        let catalog = vec![
            video("objectives", &[("type", "Spot"), ("objectif", "Promouvoir"), ("objectif", "Vendre")]).build(),
            video("keyword", &[("type", "Spot"), ("keyword", "café"), ("objectif", "Vendre")]).build(),
        ];
        let query = Query::new().with_objectives(["promotion"]);
        let settings = promo_settings();
        let ctx = ctx(&query, &settings);
        let candidates = filter_videos(&catalog, &ctx);
        let ranking = rank(&catalog, candidates, &ctx, &keys(&["café"]), &settings, 6);

        let ids: Vec<&str> = ranking.results.iter().map(|r| r.video.id()).collect();
        assert_eq!(ids, vec!["keyword", "objectives"]);
        assert_eq!(ranking.full_match_count, 2);
    }

    #[test]
    fn test_priority_objectif_beats_objectif_count() {
        let catalog = vec![
            video("two-objectifs", &[("type", "Spot"), ("objectif", "Vendre"), ("objectif", "Vendre bis")]).build(),
            video("priority", &[("type", "Spot"), ("objectif", "Promouvoir")]).build(),
        ];
        let settings = promo_settings();
        let query = Query::new().with_objectives(["promotion"]);
        let ctx = ctx(&query, &settings);
        let candidates = filter_videos(&catalog, &ctx);
        let ranking = rank(&catalog, candidates, &ctx, &BTreeSet::new(), &settings, 6);
        assert_eq!(ranking.results[0].video.id(), "priority");
    }

    #[test]
    fn test_recency_breaks_ties() {
        let catalog = vec![
            video("old", &[]).created_days_ago(30).build(),
            video("new", &[]).created_days_ago(1).build(),
            video("mid", &[]).created_days_ago(10).build(),
        ];
        let settings = RuleSettings::default();
        let ctx = ctx(&Query::new(), &settings);
        let candidates = filter_videos(&catalog, &ctx);
        let ranking = rank(&catalog, candidates, &ctx, &BTreeSet::new(), &settings, 6);
        let ids: Vec<&str> = ranking.results.iter().map(|r| r.video.id()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_fallback_to_best_when_nothing_matches() {
        let catalog = vec![
            video("a", &[]).build(),
            video("b", &[]).budget(Some(1_000), None).build(),
            video("pending", &[]).playback("pending:1").build(),
        ];
        let query = Query::new().with_budget("20000+");
        let settings = RuleSettings::default();
        let ctx = ctx(&query, &settings);
        let candidates = filter_videos(&catalog, &ctx);
        assert!(candidates.is_empty());

        let ranking = rank(&catalog, candidates, &ctx, &BTreeSet::new(), &settings, 6);
        assert!(ranking.used_fallback);
        assert_eq!(ranking.full_match_count, 0);
        assert_eq!(ranking.results.len(), 2);
        assert!(ranking.results.iter().all(|r| !r.video.is_pending()));
    }

    #[test]
    fn test_no_fallback_when_disabled() {
        let catalog = vec![video("a", &[]).build()];
        let query = Query::new().with_budget("20000+");
        let settings = RuleSettings::parse_or_default(Some(&json!({ "fallbackToBest": false })));
        let ctx = ctx(&query, &settings);
        let candidates = filter_videos(&catalog, &ctx);
        let ranking = rank(&catalog, candidates, &ctx, &BTreeSet::new(), &settings, 6);
        assert!(ranking.results.is_empty());
        assert!(!ranking.used_fallback);
    }

    #[test]
    fn test_truncates_to_limit_and_sorted() {
        let catalog: Vec<Video> = (0..20)
            .map(|i| {
                let tags: &[(&str, &str)] = if i % 3 == 0 { &[("keyword", "café")] } else { &[] };
                video(&format!("v{}", i), tags)
                    .duration(Some(10 + i as u64 * 7))
                    .created_days_ago(i)
                    .build()
            })
            .collect();
        let query = Query::new().with_durations(["short"]);
        let settings = RuleSettings::default();
        let ctx = ctx(&query, &settings);
        let ranking = rank(&catalog, catalog.iter().collect(), &ctx, &keys(&["café"]), &settings, 5);

        assert_eq!(ranking.results.len(), 5);
        for pair in ranking.results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_reasons() {
        let v = video("v", &[("keyword", "café")]).featured().budget(Some(6_000), None).build();
        let query = Query::new().with_budget("5000-10000");
        let settings = RuleSettings::default();
        let ctx = ctx(&query, &settings);
        let scored = ScoredVideo {
            video: &v,
            score: Score::compute(&v, &ctx, &keys(&["café"])),
        };
        assert_eq!(scored.reasons(), vec![Reason::Keyword, Reason::Budget, Reason::Featured]);
    }
}
