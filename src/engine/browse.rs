//! Portfolio browsing: the whole catalog reordered by facet toggles.
//!
//! Unlike [`Recommender`](super::Recommender) nothing is hidden. Videos
//! passing every active facet come first, the rest follow ordered by the
//! most important facet they still match.

use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

use super::filter::{budget_matches, duration_matches};
use super::rank::{compare_scored, Score, ScoredVideo};
use super::MatchContext;
use crate::catalog::CatalogSnapshot;
use crate::models::{Video, VideoSummary};
use crate::ranges::{resolve_budget_bucket, resolve_duration_buckets};
use crate::settings::ResolvedRules;
use crate::taxonomy::{KindMap, TaxonomyKind};
use crate::text::normalize;

/// A toggleable dimension of the browsing view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    Tag(TaxonomyKind),
    Budget,
    Duration,
}

/// Partial matches are grouped by the first facet of this list they match.
pub const FACET_PRIORITY: [Facet; 8] = [
    Facet::Tag(TaxonomyKind::Keyword),
    Facet::Tag(TaxonomyKind::Type),
    Facet::Budget,
    Facet::Duration,
    Facet::Tag(TaxonomyKind::Objectif),
    Facet::Tag(TaxonomyKind::Feel),
    Facet::Tag(TaxonomyKind::Style),
    Facet::Tag(TaxonomyKind::Parametre),
];

impl Facet {
    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::Tag(kind) => kind.as_str(),
            Facet::Budget => "budget",
            Facet::Duration => "duration",
        }
    }

    fn priority(&self) -> usize {
        FACET_PRIORITY
            .iter()
            .position(|facet| facet == self)
            .unwrap_or(FACET_PRIORITY.len())
    }
}

impl Serialize for Facet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Current state of the facet toggles
#[derive(Debug, Clone, Default)]
pub struct BrowseSelection {
    pub tags: KindMap<Vec<String>>,
    pub budget: Option<String>,
    pub durations: Vec<String>,
}

impl BrowseSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(mut self, kind: TaxonomyKind, label: impl Into<String>) -> Self {
        self.tags[kind].push(label.into());
        self
    }

    pub fn with_budget(mut self, bucket: impl Into<String>) -> Self {
        self.budget = Some(bucket.into());
        self
    }

    pub fn with_durations<I, S>(mut self, durations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.durations = durations.into_iter().map(Into::into).collect();
        self
    }
}

/// JSON body of a browse request: tag labels keyed by kind
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrowseRequest {
    pub tags: BTreeMap<TaxonomyKind, Vec<String>>,
    pub budget: Option<String>,
    pub durations: Vec<String>,
}

impl From<BrowseRequest> for BrowseSelection {
    fn from(req: BrowseRequest) -> Self {
        let mut tags = req.tags;
        Self {
            tags: KindMap::from_fn(|kind| tags.remove(&kind).unwrap_or_default()),
            budget: req.budget.filter(|b| !b.trim().is_empty()),
            durations: req.durations,
        }
    }
}

/// Message shown between the full and partial groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BrowseDivider {
    /// Nothing passes every active facet
    NoFullMatch,
    /// Some full matches, the rest follows
    NoMoreFullMatches,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseEntry {
    pub video: VideoSummary,
    pub matched_facets: Vec<Facet>,
    pub score: Score,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseView {
    pub full: Vec<BrowseEntry>,
    pub partial: Vec<BrowseEntry>,
    pub divider: Option<BrowseDivider>,
}

impl BrowseView {
    pub fn ids(&self) -> Vec<&str> {
        self.full
            .iter()
            .chain(self.partial.iter())
            .map(|entry| entry.video.id.as_str())
            .collect()
    }
}

/// Selection resolved once per toggle event
struct ResolvedSelection {
    tags: KindMap<HashSet<String>>,
    ctx: MatchContext,
    keyword_keys: BTreeSet<String>,
}

impl ResolvedSelection {
    fn new(selection: &BrowseSelection) -> Self {
        let tags: KindMap<HashSet<String>> = selection
            .tags
            .map(|_, labels| labels.iter().map(|l| normalize(l)).filter(|k| !k.is_empty()).collect());

        let keyword_keys = TaxonomyKind::KEYWORD_LIKE
            .iter()
            .flat_map(|kind| tags[*kind].iter().cloned())
            .collect();

        let ctx = MatchContext {
            rules: ResolvedRules {
                allowed_types: tags[TaxonomyKind::Type].clone(),
                allowed_objectifs: tags[TaxonomyKind::Objectif].clone(),
                ..Default::default()
            },
            budget: selection.budget.as_deref().and_then(resolve_budget_bucket),
            durations: resolve_duration_buckets(&selection.durations),
            exclude_ids: HashSet::new(),
        };

        Self { tags, ctx, keyword_keys }
    }

    fn active_facets(&self) -> Vec<Facet> {
        FACET_PRIORITY
            .iter()
            .copied()
            .filter(|facet| match facet {
                Facet::Tag(kind) => !self.tags[*kind].is_empty(),
                Facet::Budget => self.ctx.budget.is_some(),
                Facet::Duration => !self.ctx.durations.is_empty(),
            })
            .collect()
    }

    fn matches(&self, video: &Video, facet: Facet) -> bool {
        match facet {
            Facet::Tag(kind) => video.keys_of(kind).any(|key| self.tags[kind].contains(&key)),
            Facet::Budget => self
                .ctx
                .budget
                .as_ref()
                .map(|bucket| budget_matches(video, bucket))
                .unwrap_or(false),
            Facet::Duration => duration_matches(video, &self.ctx.durations),
        }
    }
}

fn compare_partial(a: &(ScoredVideo, usize), b: &(ScoredVideo, usize)) -> Ordering {
    a.1.cmp(&b.1).then_with(|| compare_scored(&a.0, &b.0))
}

/// Partition and order the playable catalog for the current selection.
///
/// Linear in catalog size apart from the two sorts.
pub fn browse(catalog: &CatalogSnapshot, selection: &BrowseSelection) -> BrowseView {
    let resolved = ResolvedSelection::new(selection);
    let active = resolved.active_facets();

    let mut full: Vec<(ScoredVideo, Vec<Facet>)> = Vec::new();
    let mut partial: Vec<((ScoredVideo, usize), Vec<Facet>)> = Vec::new();

    for video in catalog.playable() {
        let matched: Vec<Facet> = active
            .iter()
            .copied()
            .filter(|facet| resolved.matches(video, *facet))
            .collect();
        let scored = ScoredVideo {
            video,
            score: Score::compute(video, &resolved.ctx, &resolved.keyword_keys),
        };

        if matched.len() == active.len() {
            full.push((scored, matched));
        } else {
            let best = matched
                .iter()
                .map(Facet::priority)
                .min()
                .unwrap_or(FACET_PRIORITY.len());
            partial.push(((scored, best), matched));
        }
    }

    full.sort_by(|a, b| compare_scored(&a.0, &b.0));
    partial.sort_by(|a, b| compare_partial(&a.0, &b.0));

    let divider = match (full.is_empty(), partial.is_empty()) {
        (_, true) => None,
        (true, false) => Some(BrowseDivider::NoFullMatch),
        (false, false) => Some(BrowseDivider::NoMoreFullMatches),
    };

    debug!(
        "Browse: {} active facets, {} full, {} partial",
        active.len(),
        full.len(),
        partial.len()
    );

    let entry = |scored: ScoredVideo, matched_facets: Vec<Facet>| BrowseEntry {
        video: scored.video.summary(),
        matched_facets,
        score: scored.score,
    };

    BrowseView {
        full: full.into_iter().map(|(scored, matched)| entry(scored, matched)).collect(),
        partial: partial
            .into_iter()
            .map(|((scored, _), matched)| entry(scored, matched))
            .collect(),
        divider,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::video;

    fn catalog() -> CatalogSnapshot {
        CatalogSnapshot::from_videos(vec![
            video("spot-cafe", &[("type", "Spot"), ("keyword", "café")])
                .budget(Some(6_000), Some(8_000))
                .created_days_ago(3)
                .build(),
            video("spot", &[("type", "Spot")]).created_days_ago(1).build(),
            video("cafe-portrait", &[("type", "Portrait"), ("keyword", "Café")])
                .created_days_ago(5)
                .build(),
            video("feel-only", &[("feel", "Chaleureux")]).duration(Some(45)).build(),
            video("pending", &[("type", "Spot"), ("keyword", "café")])
                .playback("pending:upload")
                .build(),
        ])
    }

    #[test]
    fn test_no_active_facet_everything_is_full() {
        let view = browse(&catalog(), &BrowseSelection::new());
        assert_eq!(view.full.len(), 4);
        assert!(view.partial.is_empty());
        assert_eq!(view.divider, None);
        // most recent first
        assert_eq!(view.full[0].video.id, "feel-only");
    }

    #[test]
    fn test_full_then_partial_by_facet_priority() {
        let selection = BrowseSelection::new()
            .with_tag(TaxonomyKind::Keyword, "cafe")
            .with_tag(TaxonomyKind::Type, "spot")
            .with_tag(TaxonomyKind::Feel, "chaleureux");
        let view = browse(&catalog(), &selection);

        assert!(view.full.is_empty());
        assert_eq!(view.divider, Some(BrowseDivider::NoFullMatch));
        // spot-cafe and cafe-portrait match keyword, spot matches type, feel-only matches feel
        assert_eq!(view.ids(), vec!["spot-cafe", "cafe-portrait", "spot", "feel-only"]);
        assert_eq!(
            view.partial[0].matched_facets,
            vec![Facet::Tag(TaxonomyKind::Keyword), Facet::Tag(TaxonomyKind::Type)]
        );
    }

    #[test]
    fn test_divider_when_some_full_matches() {
        let selection = BrowseSelection::new()
            .with_tag(TaxonomyKind::Type, "Spot")
            .with_budget("5000-10000");
        let view = browse(&catalog(), &selection);

        let full: Vec<&str> = view.full.iter().map(|e| e.video.id.as_str()).collect();
        assert_eq!(full, vec!["spot-cafe"]);
        assert_eq!(view.divider, Some(BrowseDivider::NoMoreFullMatches));
        assert_eq!(view.partial[0].video.id, "spot");
        assert_eq!(view.partial.last().map(|e| e.video.id.as_str()), Some("cafe-portrait"));
    }

    #[test]
    fn test_duration_facet_outranks_feel() {
        let selection = BrowseSelection::new()
            .with_durations(["short"])
            .with_tag(TaxonomyKind::Feel, "Inexistant");
        let view = browse(&catalog(), &selection);
        assert_eq!(view.partial[0].video.id, "feel-only");
        assert_eq!(view.partial[0].matched_facets, vec![Facet::Duration]);
    }

    #[test]
    fn test_pending_never_shown() {
        let view = browse(&catalog(), &BrowseSelection::new().with_tag(TaxonomyKind::Type, "Spot"));
        assert!(!view.ids().contains(&"pending"));
    }

    #[test]
    fn test_request_conversion() {
        let req: BrowseRequest = serde_json::from_str(
            r#"{"tags":{"keyword":["café"],"style":["Épuré"]},"budget":"","durations":["clip"]}"#,
        )
        .unwrap();
        let selection = BrowseSelection::from(req);
        assert_eq!(selection.tags[TaxonomyKind::Keyword], vec!["café"]);
        assert!(selection.tags[TaxonomyKind::Type].is_empty());
        assert!(selection.budget.is_none());

        let json = serde_json::to_value(browse(&catalog(), &selection)).unwrap();
        assert!(json["full"].is_array());
    }
}
