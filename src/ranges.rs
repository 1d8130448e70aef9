//! Fixed budget and duration scales and bucket resolution.
//!
//! The UI represents "how much" and "how long" as indices into fixed scales or
//! as named buckets; the engine only ever works on the resolved numeric range.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::text::normalize;

/// Budget breakpoints in euros.
pub const BUDGET_SCALE: [u64; 11] = [
    0, 1_000, 2_000, 3_000, 5_000, 7_500, 10_000, 15_000, 20_000, 30_000, 50_000,
];

/// Duration breakpoints in seconds.
pub const DURATION_SCALE: [u64; 9] = [0, 10, 30, 60, 90, 120, 180, 300, 600];

/// Bucket identifiers meaning "no idea", never a constraint.
pub const UNSURE_SENTINELS: [&str; 3] = ["incertain", "unsure", "je ne sais pas"];

/// Budget bucket table: identifier, min, max (`None` = unbounded above).
const BUDGET_BUCKETS: [(&str, u64, Option<u64>); 5] = [
    ("0-2000", 0, Some(2_000)),
    ("2000-5000", 2_000, Some(5_000)),
    ("5000-10000", 5_000, Some(10_000)),
    ("10000-20000", 10_000, Some(20_000)),
    ("20000+", 20_000, None),
];

/// Duration bucket table in seconds.
const DURATION_BUCKETS: [(&str, u64, Option<u64>); 5] = [
    ("clip", 10, Some(30)),
    ("short", 30, Some(60)),
    ("standard", 60, Some(120)),
    ("long", 120, Some(300)),
    ("extended", 300, None),
];

/// Inclusive numeric range, `max = None` meaning unbounded above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: u64,
    pub max: Option<u64>,
}

impl NumericRange {
    pub fn new(min: u64, max: Option<u64>) -> Self {
        Self { min, max }
    }

    /// Single-point range.
    pub fn point(value: u64) -> Self {
        Self {
            min: value,
            max: Some(value),
        }
    }

    fn upper(&self) -> u64 {
        self.max.unwrap_or(u64::MAX)
    }

    /// `a.max >= b.min && a.min <= b.max`, unbounded max treated as +inf.
    pub fn overlaps(&self, other: &NumericRange) -> bool {
        self.upper() >= other.min && self.min <= other.upper()
    }

    pub fn contains(&self, value: u64) -> bool {
        value >= self.min && value <= self.upper()
    }
}

/// A video's declared budget resolved to a range.
///
/// Missing-bound rule: when only one of `budget_min` / `budget_max` is set the
/// missing bound takes the present one, collapsing the budget to a point.
/// Returns `None` when neither bound is set.
pub fn video_budget_range(budget_min: Option<u64>, budget_max: Option<u64>) -> Option<NumericRange> {
    match (budget_min, budget_max) {
        (Some(min), Some(max)) => Some(NumericRange::new(min.min(max), Some(min.max(max)))),
        (Some(only), None) | (None, Some(only)) => Some(NumericRange::point(only)),
        (None, None) => None,
    }
}

fn is_unsure(id: &str) -> bool {
    let id = normalize(id);
    UNSURE_SENTINELS.iter().any(|s| normalize(s) == id)
}

fn lookup(table: &[(&str, u64, Option<u64>)], id: &str) -> Option<NumericRange> {
    let id = id.trim();
    if id.is_empty() || is_unsure(id) {
        return None;
    }
    table
        .iter()
        .find(|(key, _, _)| key.eq_ignore_ascii_case(id))
        .map(|(_, min, max)| NumericRange::new(*min, *max))
}

/// Resolve a budget bucket identifier. Unknown or "unsure" means no constraint.
pub fn resolve_budget_bucket(id: &str) -> Option<NumericRange> {
    lookup(&BUDGET_BUCKETS, id)
}

/// Resolve a duration bucket identifier. Unknown or "unsure" means no constraint.
pub fn resolve_duration_bucket(id: &str) -> Option<NumericRange> {
    lookup(&DURATION_BUCKETS, id)
}

/// Resolve every concrete duration bucket, skipping unknown ids and sentinels.
pub fn resolve_duration_buckets<S: AsRef<str>>(ids: &[S]) -> Vec<(String, NumericRange)> {
    ids.iter()
        .filter_map(|id| {
            resolve_duration_bucket(id.as_ref()).map(|range| (id.as_ref().trim().to_string(), range))
        })
        .collect()
}

/// Value of the budget slider at `index`.
pub fn budget_at_index(index: usize) -> Option<u64> {
    BUDGET_SCALE.get(index).copied()
}

/// Value of the duration slider at `index`.
pub fn duration_at_index(index: usize) -> Option<u64> {
    DURATION_SCALE.get(index).copied()
}

/// Budget bucket containing `amount`. Shared boundaries go to the higher bucket.
pub fn bucket_for_amount(amount: u64) -> &'static str {
    BUDGET_BUCKETS
        .iter()
        .rev()
        .find(|(_, min, _)| amount >= *min)
        .map(|(id, _, _)| *id)
        .unwrap_or(BUDGET_BUCKETS[0].0)
}

/// Pull the first monetary amount out of free text ("8 000 €", "7k", "12.5k€").
pub fn parse_amount(text: &str) -> Option<u64> {
    let caps = amount_regex().captures(text)?;
    let digits: String = caps
        .name("num")?
        .as_str()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{00A0}' && *c != '\u{202F}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    let has_k = caps.name("k").is_some();
    let value: f64 = if has_k {
        digits.parse().ok()?
    } else {
        // Without a "k" suffix dots and commas are thousand separators.
        digits.replace('.', "").parse().ok()?
    };

    let amount = if has_k { value * 1_000.0 } else { value };
    if amount.is_finite() && amount >= 0.0 {
        Some(amount.round() as u64)
    } else {
        None
    }
}

/// Map a free-text budget mention to a bucket identifier.
pub fn budget_bucket_from_text(text: &str) -> Option<&'static str> {
    parse_amount(text).map(bucket_for_amount)
}

fn amount_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?P<num>\d{1,3}(?:[ \u{00A0}\u{202F}.,]\d{3})+|\d+(?:[.,]\d+)?)\s*(?P<k>k)?")
            .expect("amount regex is valid")
    })
}
