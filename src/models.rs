//! Catalog entries and the per-call recommendation query

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::ranges::{video_budget_range, NumericRange};
use crate::taxonomy::{Tag, TaxonomyKind};

/// Media references starting with this prefix are not playable yet.
pub const PENDING_PREFIX: &str = "pending:";

pub const DEFAULT_LIMIT: usize = 6;
pub const MAX_LIMIT: usize = 12;

/// Flat video row as returned by the data store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    /// Playback reference on the streaming service
    pub playback_id: String,
    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub budget_min: Option<u64>,
    #[serde(default)]
    pub budget_max: Option<u64>,
    #[serde(default)]
    pub featured: bool,
    /// Poster frame hint in seconds
    #[serde(default)]
    pub thumbnail_time: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Video <-> tag association row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoTagLink {
    pub video_id: String,
    pub tag_id: String,
}

/// A catalog entry joined with its tags
#[derive(Debug, Clone, Serialize)]
pub struct Video {
    #[serde(flatten)]
    pub record: VideoRecord,
    pub tags: Vec<Tag>,
}

impl Video {
    pub fn new(record: VideoRecord, tags: Vec<Tag>) -> Self {
        Self { record, tags }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn is_pending(&self) -> bool {
        self.record.playback_id.starts_with(PENDING_PREFIX)
    }

    pub fn tags_of(&self, kind: TaxonomyKind) -> impl Iterator<Item = &Tag> {
        self.tags.iter().filter(move |tag| tag.kind == kind)
    }

    /// Normalized labels of this video's tags of `kind`
    pub fn keys_of(&self, kind: TaxonomyKind) -> impl Iterator<Item = String> + '_ {
        self.tags_of(kind).map(Tag::key)
    }

    pub fn budget_range(&self) -> Option<NumericRange> {
        video_budget_range(self.record.budget_min, self.record.budget_max)
    }

    pub fn summary(&self) -> VideoSummary {
        VideoSummary {
            id: self.record.id.clone(),
            title: self.record.title.clone(),
            playback_id: self.record.playback_id.clone(),
            thumbnail_time: self.record.thumbnail_time,
            budget_min: self.record.budget_min,
            budget_max: self.record.budget_max,
        }
    }
}

/// What the caller renders for each recommended video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub id: String,
    pub title: String,
    pub playback_id: String,
    pub thumbnail_time: Option<f64>,
    pub budget_min: Option<u64>,
    pub budget_max: Option<u64>,
}

/// Input of one recommendation call
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub objectives: Vec<String>,
    pub audiences: Vec<String>,
    pub budget: Option<String>,
    pub durations: Vec<String>,
    pub description: String,
    pub exclude_ids: HashSet<String>,
    limit: usize,
}

impl Query {
    pub fn new() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            ..Default::default()
        }
    }

    pub fn with_objectives<I, S>(mut self, objectives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.objectives = objectives.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_audiences<I, S>(mut self, audiences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audiences = audiences.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_budget(mut self, budget: impl Into<String>) -> Self {
        self.budget = Some(budget.into());
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

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn excluding<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = clamp_limit(Some(limit));
        self
    }

    /// Result size, always within `[1, MAX_LIMIT]`
    pub fn limit(&self) -> usize {
        self.limit.clamp(1, MAX_LIMIT)
    }
}

pub fn clamp_limit(limit: Option<i64>) -> usize {
    match limit {
        Some(n) => n.clamp(1, MAX_LIMIT as i64) as usize,
        None => DEFAULT_LIMIT,
    }
}

/// JSON body of a recommendation request; every field optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecommendRequest {
    pub objectives: Option<Vec<String>>,
    pub audiences: Option<Vec<String>>,
    pub budget: Option<String>,
    pub durations: Option<Vec<String>>,
    pub description: Option<String>,
    pub exclude_ids: Option<Vec<String>>,
    pub limit: Option<f64>,
}

impl From<RecommendRequest> for Query {
    fn from(req: RecommendRequest) -> Self {
        let mut query = Query::new()
            .with_objectives(req.objectives.unwrap_or_default())
            .with_audiences(req.audiences.unwrap_or_default())
            .with_durations(req.durations.unwrap_or_default())
            .with_description(req.description.unwrap_or_default())
            .excluding(req.exclude_ids.unwrap_or_default());

        query.budget = req.budget.filter(|b| !b.trim().is_empty());
        query.limit = clamp_limit(req.limit.filter(|n| n.is_finite()).map(|n| n.trunc() as i64));
        query
    }
}
