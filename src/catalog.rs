use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::models::{Video, VideoRecord, VideoTagLink};
use crate::taxonomy::{KindMap, Tag};

/// In-memory join of videos, tag definitions and video/tag links
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    videos: Vec<Video>,
    tags: Vec<Tag>,
}

impl CatalogSnapshot {
    /// Join the three flat reads. Links pointing at unknown videos or tags
    /// are dropped; a video whose budget bounds are inverted gets them swapped.
    pub fn join(records: Vec<VideoRecord>, tags: Vec<Tag>, links: Vec<VideoTagLink>) -> Self {
        let tag_index: HashMap<&str, &Tag> = tags.iter().map(|t| (t.id.as_str(), t)).collect();
        let video_ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();

        let mut tags_by_video: HashMap<&str, Vec<Tag>> = HashMap::new();
        let mut unknown_tags = 0usize;
        let mut unknown_videos = 0usize;
        for link in &links {
            if !video_ids.contains(link.video_id.as_str()) {
                unknown_videos += 1;
                continue;
            }
            match tag_index.get(link.tag_id.as_str()) {
                Some(tag) => {
                    let entry = tags_by_video.entry(link.video_id.as_str()).or_default();
                    if !entry.iter().any(|t| t.id == tag.id) {
                        entry.push((*tag).clone());
                    }
                }
                None => unknown_tags += 1,
            }
        }
        if unknown_tags + unknown_videos > 0 {
            warn!(
                "Dropped {} video/tag links ({} to unknown tags, {} to unknown videos)",
                unknown_tags + unknown_videos,
                unknown_tags,
                unknown_videos
            );
        }

        let videos: Vec<Video> = records
            .into_iter()
            .map(|mut record| {
                if let (Some(min), Some(max)) = (record.budget_min, record.budget_max) {
                    if min > max {
                        warn!("Video {} has budget_min > budget_max, swapping", record.id);
                        record.budget_min = Some(max);
                        record.budget_max = Some(min);
                    }
                }
                let video_tags = tags_by_video.remove(record.id.as_str()).unwrap_or_default();
                Video::new(record, video_tags)
            })
            .collect();

        debug!(
            "Joined catalog: {} videos, {} tags, {} links",
            videos.len(),
            tags.len(),
            links.len()
        );

        Self { videos, tags }
    }

    pub fn from_videos(videos: Vec<Video>) -> Self {
        let mut seen = HashSet::new();
        let tags = videos
            .iter()
            .flat_map(|v| v.tags.iter())
            .filter(|t| seen.insert(t.id.clone()))
            .cloned()
            .collect();
        Self { videos, tags }
    }

    pub fn videos(&self) -> &[Video] {
        &self.videos
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    /// Playable videos
    pub fn playable(&self) -> impl Iterator<Item = &Video> {
        self.videos.iter().filter(|v| !v.is_pending())
    }

    /// Distinct labels of keyword, style and parametre tags, first spelling
    /// wins when several share a normalized form.
    pub fn keyword_vocabulary(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.tags
            .iter()
            .filter(|t| t.kind.is_keyword_like())
            .filter(|t| {
                let key = t.key();
                !key.is_empty() && seen.insert(key)
            })
            .map(|t| t.label.clone())
            .collect()
    }

    /// Tag definitions grouped by kind
    pub fn taxonomy(&self) -> KindMap<Vec<&Tag>> {
        crate::taxonomy::group_by_kind(&self.tags)
    }

    pub fn stats(&self) -> CatalogStats {
        let pending_videos = self.videos.iter().filter(|v| v.is_pending()).count();
        let untagged_videos = self.videos.iter().filter(|v| v.tags.is_empty()).count();
        let tags_per_kind = self.taxonomy().map(|_, tags| tags.len());

        CatalogStats {
            total_videos: self.videos.len(),
            pending_videos,
            untagged_videos,
            total_tags: self.tags.len(),
            tags_per_kind,
        }
    }
}

/// Statistics about a catalog snapshot
#[derive(Debug, Clone, Serialize)]
pub struct CatalogStats {
    pub total_videos: usize,
    pub pending_videos: usize,
    pub untagged_videos: usize,
    pub total_tags: usize,
    pub tags_per_kind: KindMap<usize>,
}

impl CatalogStats {
    /// Generate a summary string
    pub fn summary(&self) -> String {
        let per_kind = self
            .tags_per_kind
            .iter()
            .map(|(kind, n)| format!("{}={}", kind, n))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "Catalog Stats:\n\
            - Videos: {} ({} pending, {} untagged)\n\
            - Tags: {}\n\
            - Per kind: {}",
            self.total_videos, self.pending_videos, self.untagged_videos, self.total_tags, per_kind
        )
    }

    pub fn log(&self) {
        info!(
            "📚 Catalog loaded: {} videos ({} pending), {} tags",
            self.total_videos, self.pending_videos, self.total_tags
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::TaxonomyKind;
    use chrono::Utc;

    fn record(id: &str, min: Option<u64>, max: Option<u64>) -> VideoRecord {
        VideoRecord {
            id: id.to_string(),
            title: id.to_string(),
            playback_id: format!("mux-{}", id),
            duration: None,
            budget_min: min,
            budget_max: max,
            featured: false,
            thumbnail_time: None,
            created_at: Utc::now(),
        }
    }

    fn link(video_id: &str, tag_id: &str) -> VideoTagLink {
        VideoTagLink {
            video_id: video_id.to_string(),
            tag_id: tag_id.to_string(),
        }
    }

    #[test]
    fn test_join_attaches_tags_and_drops_dangling_links() {
        let tags = vec![
            Tag::new("t1", TaxonomyKind::Type, "Publicité"),
            Tag::new("t2", TaxonomyKind::Keyword, "café"),
        ];
        let links = vec![
            link("v1", "t1"),
            link("v1", "t2"),
            link("v1", "t1"),
            link("v2", "missing"),
            link("ghost", "t2"),
        ];
        let snapshot = CatalogSnapshot::join(vec![record("v1", None, None), record("v2", None, None)], tags, links);

        assert_eq!(snapshot.videos().len(), 2);
        assert_eq!(snapshot.videos()[0].tags.len(), 2);
        assert!(snapshot.videos()[1].tags.is_empty());
    }

    #[test]
    fn test_join_swaps_inverted_budget() {
        let snapshot = CatalogSnapshot::join(vec![record("v1", Some(9_000), Some(3_000))], vec![], vec![]);
        let video = &snapshot.videos()[0];
        assert_eq!(video.record.budget_min, Some(3_000));
        assert_eq!(video.record.budget_max, Some(9_000));
    }

    #[test]
    fn test_keyword_vocabulary_dedups_by_normalized_label() {
        let tags = vec![
            Tag::new("t1", TaxonomyKind::Keyword, "Café"),
            Tag::new("t2", TaxonomyKind::Style, "cafe"),
            Tag::new("t3", TaxonomyKind::Parametre, "Drone"),
            Tag::new("t4", TaxonomyKind::Type, "Portrait"),
            Tag::new("t5", TaxonomyKind::Feel, "Chaleureux"),
        ];
        let snapshot = CatalogSnapshot::join(vec![], tags, vec![]);
        assert_eq!(snapshot.keyword_vocabulary(), vec!["Café", "Drone"]);
    }

    #[test]
    fn test_stats() {
        let mut pending = record("v2", None, None);
        pending.playback_id = "pending:abc".to_string();
        let tags = vec![Tag::new("t1", TaxonomyKind::Style, "Épuré")];
        let snapshot = CatalogSnapshot::join(vec![record("v1", None, None), pending], tags, vec![link("v1", "t1")]);
        let stats = snapshot.stats();

        assert_eq!(stats.total_videos, 2);
        assert_eq!(stats.pending_videos, 1);
        assert_eq!(stats.untagged_videos, 1);
        assert_eq!(stats.tags_per_kind[TaxonomyKind::Style], 1);
        assert!(stats.summary().contains("style=1"));
        assert_eq!(snapshot.playable().count(), 1);
    }
}
