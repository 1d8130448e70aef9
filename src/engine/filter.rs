//! Hard predicates narrowing the catalog to full matches

use std::collections::HashSet;
use tracing::debug;

use super::MatchContext;
use crate::models::Video;
use crate::ranges::NumericRange;
use crate::taxonomy::TaxonomyKind;

/// Not pending and not excluded by the caller
pub fn is_eligible(video: &Video, exclude_ids: &HashSet<String>) -> bool {
    !video.is_pending() && !exclude_ids.contains(video.id())
}

/// The video declares a budget overlapping `bucket`
pub fn budget_matches(video: &Video, bucket: &NumericRange) -> bool {
    video
        .budget_range()
        .map(|range| range.overlaps(bucket))
        .unwrap_or(false)
}

/// The video has a known duration inside at least one of `buckets`
pub fn duration_matches(video: &Video, buckets: &[(String, NumericRange)]) -> bool {
    match video.record.duration {
        Some(seconds) => buckets.iter().any(|(_, range)| range.contains(seconds)),
        None => false,
    }
}

fn has_tag_in(video: &Video, kind: TaxonomyKind, allowed: &HashSet<String>) -> bool {
    video.keys_of(kind).any(|key| allowed.contains(&key))
}

/// Every active clause must pass
pub fn passes(video: &Video, ctx: &MatchContext) -> bool {
    let rules = &ctx.rules;

    if rules.has_allow_list() {
        let type_ok = rules.allowed_types.is_empty() || has_tag_in(video, TaxonomyKind::Type, &rules.allowed_types);
        let objectif_ok = rules.allowed_objectifs.is_empty()
            || has_tag_in(video, TaxonomyKind::Objectif, &rules.allowed_objectifs);
        if !(type_ok && objectif_ok) {
            return false;
        }
    }

    if !rules.removed_types.is_empty() && has_tag_in(video, TaxonomyKind::Type, &rules.removed_types) {
        return false;
    }

    if let Some(bucket) = &ctx.budget {
        if !budget_matches(video, bucket) {
            return false;
        }
    }

    if !ctx.durations.is_empty() && !duration_matches(video, &ctx.durations) {
        return false;
    }

    true
}

/// Eligible videos passing every active predicate, in catalog order
pub fn filter_videos<'a>(catalog: &'a [Video], ctx: &MatchContext) -> Vec<&'a Video> {
    let filtered: Vec<&Video> = catalog
        .iter()
        .filter(|video| is_eligible(video, &ctx.exclude_ids))
        .filter(|video| passes(video, ctx))
        .collect();

    debug!("Filter kept {} of {} videos", filtered.len(), catalog.len());
    filtered
}
