use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use crate::text::normalize;

/// The six tag facets of the catalog taxonomy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomyKind {
    Type,
    Objectif,
    Keyword,
    Style,
    Feel,
    Parametre,
}

impl TaxonomyKind {
    pub const ALL: [TaxonomyKind; 6] = [
        TaxonomyKind::Type,
        TaxonomyKind::Objectif,
        TaxonomyKind::Keyword,
        TaxonomyKind::Style,
        TaxonomyKind::Feel,
        TaxonomyKind::Parametre,
    ];

    /// Kinds whose labels feed keyword extraction and keyword scoring.
    pub const KEYWORD_LIKE: [TaxonomyKind; 3] = [
        TaxonomyKind::Keyword,
        TaxonomyKind::Style,
        TaxonomyKind::Parametre,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxonomyKind::Type => "type",
            TaxonomyKind::Objectif => "objectif",
            TaxonomyKind::Keyword => "keyword",
            TaxonomyKind::Style => "style",
            TaxonomyKind::Feel => "feel",
            TaxonomyKind::Parametre => "parametre",
        }
    }

    fn slot(&self) -> usize {
        match self {
            TaxonomyKind::Type => 0,
            TaxonomyKind::Objectif => 1,
            TaxonomyKind::Keyword => 2,
            TaxonomyKind::Style => 3,
            TaxonomyKind::Feel => 4,
            TaxonomyKind::Parametre => 5,
        }
    }

    pub fn is_keyword_like(&self) -> bool {
        Self::KEYWORD_LIKE.contains(self)
    }
}

impl fmt::Display for TaxonomyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxonomyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize(s);
        TaxonomyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == key)
            .ok_or_else(|| format!("unknown taxonomy kind: {}", s))
    }
}

/// A taxonomy entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: String,
    pub kind: TaxonomyKind,
    pub label: String,
}

impl Tag {
    pub fn new(id: impl Into<String>, kind: TaxonomyKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
        }
    }

    /// Normalized label used for every comparison
    pub fn key(&self) -> String {
        normalize(&self.label)
    }
}

/// One value per taxonomy kind, every kind always present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindMap<T> {
    slots: [T; 6],
}

impl<T> KindMap<T> {
    pub fn from_fn(mut f: impl FnMut(TaxonomyKind) -> T) -> Self {
        Self {
            slots: TaxonomyKind::ALL.map(&mut f),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaxonomyKind, &T)> {
        TaxonomyKind::ALL.into_iter().map(move |kind| (kind, &self[kind]))
    }

    pub fn map<U>(&self, mut f: impl FnMut(TaxonomyKind, &T) -> U) -> KindMap<U> {
        KindMap::from_fn(|kind| f(kind, &self[kind]))
    }
}

impl<T> Index<TaxonomyKind> for KindMap<T> {
    type Output = T;

    fn index(&self, kind: TaxonomyKind) -> &T {
        &self.slots[kind.slot()]
    }
}

impl<T> IndexMut<TaxonomyKind> for KindMap<T> {
    fn index_mut(&mut self, kind: TaxonomyKind) -> &mut T {
        &mut self.slots[kind.slot()]
    }
}

/// Group tags by kind, keeping input order inside each kind.
pub fn group_by_kind<'a>(tags: impl IntoIterator<Item = &'a Tag>) -> KindMap<Vec<&'a Tag>> {
    let mut grouped: KindMap<Vec<&Tag>> = KindMap::default();
    for tag in tags {
        grouped[tag.kind].push(tag);
    }
    grouped
}
