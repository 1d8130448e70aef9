//! Rule settings: objective allow-lists, audience deny-lists and global knobs.
//!
//! Settings are stored externally and edited through the back office. The
//! engine receives a [`RuleSettings`] value built once per request by
//! [`RuleSettings::parse_or_default`] and never mutates it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use crate::text::normalize;

/// Objective / audience identifier meaning "other", never a constraint.
pub const OTHER_SENTINEL: &str = "autre";

pub const DEFAULT_KEYWORD_LIMIT: usize = 4;
pub const MAX_KEYWORD_LIMIT: usize = 8;

/// Tags unlocked by one declared objective
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectiveRule {
    pub types: Vec<String>,
    pub objectifs: Vec<String>,
    pub priority_objectifs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub objectives: BTreeMap<String, ObjectiveRule>,
    /// Audience id -> video "type" labels to remove
    pub audiences: BTreeMap<String, Vec<String>>,
    pub keyword_limit: usize,
    pub fallback_to_best: bool,
}

/// Normalized tag sets derived from the declared objectives and audiences
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRules {
    pub allowed_types: HashSet<String>,
    pub allowed_objectifs: HashSet<String>,
    pub priority_objectifs: HashSet<String>,
    pub removed_types: HashSet<String>,
}

impl ResolvedRules {
    pub fn has_allow_list(&self) -> bool {
        !self.allowed_types.is_empty() || !self.allowed_objectifs.is_empty()
    }
}

fn objective(types: &[&str], objectifs: &[&str], priority: &[&str]) -> ObjectiveRule {
    let owned = |labels: &[&str]| labels.iter().map(|s| s.to_string()).collect();
    ObjectiveRule {
        types: owned(types),
        objectifs: owned(objectifs),
        priority_objectifs: owned(priority),
    }
}

impl Default for RuleSettings {
    fn default() -> Self {
        let mut objectives = BTreeMap::new();
        objectives.insert(
            "promotion".to_string(),
            objective(&["Publicité", "Spot"], &["Vendre", "Promouvoir"], &["Promouvoir"]),
        );
        objectives.insert(
            "notoriete".to_string(),
            objective(&["Film de marque", "Portrait"], &["Notoriété"], &["Notoriété"]),
        );
        objectives.insert(
            "recrutement".to_string(),
            objective(&["Marque employeur", "Portrait"], &["Recruter"], &["Recruter"]),
        );
        objectives.insert(
            "formation".to_string(),
            objective(&["Tutoriel", "Motion design"], &["Former", "Expliquer"], &["Former"]),
        );
        objectives.insert(
            "evenement".to_string(),
            objective(&["Aftermovie", "Captation"], &["Couvrir un événement"], &[]),
        );

        let mut audiences = BTreeMap::new();
        audiences.insert("interne".to_string(), vec!["Publicité".to_string(), "Spot".to_string()]);
        audiences.insert("grand-public".to_string(), vec!["Tutoriel".to_string()]);
        audiences.insert("b2b".to_string(), vec!["Aftermovie".to_string()]);

        Self {
            version: None,
            objectives,
            audiences,
            keyword_limit: DEFAULT_KEYWORD_LIMIT,
            fallback_to_best: true,
        }
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value.as_array().map(|items| {
        items
            .iter()
            .filter_map(|item| item.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
}

fn parse_objectives(value: &Value) -> Option<BTreeMap<String, ObjectiveRule>> {
    let map = value.as_object()?;
    let parsed = map
        .iter()
        .map(|(id, rule)| {
            let field = |name: &str| rule.get(name).and_then(string_list).unwrap_or_default();
            (
                id.clone(),
                ObjectiveRule {
                    types: field("types"),
                    objectifs: field("objectifs"),
                    priority_objectifs: field("priorityObjectifs"),
                },
            )
        })
        .collect();
    Some(parsed)
}

fn parse_audiences(value: &Value) -> Option<BTreeMap<String, Vec<String>>> {
    let map = value.as_object()?;
    Some(
        map.iter()
            .map(|(id, labels)| (id.clone(), string_list(labels).unwrap_or_default()))
            .collect(),
    )
}

impl RuleSettings {
    /// Build settings from the stored JSON object, field by field, falling back
    /// to defaults for anything missing or malformed. `keywordLimit` is clamped
    /// to `[1, MAX_KEYWORD_LIMIT]`.
    pub fn parse_or_default(stored: Option<&Value>) -> Self {
        let mut settings = Self::default();

        let Some(stored) = stored.filter(|v| v.is_object()) else {
            debug!("No stored rule settings, using defaults");
            return settings;
        };

        if let Some(version) = stored.get("version") {
            settings.version = match version {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            };
        }

        match stored.get("objectives").map(parse_objectives) {
            Some(Some(objectives)) => settings.objectives = objectives,
            Some(None) => warn!("Ignoring malformed objectives in rule settings"),
            None => {}
        }

        match stored.get("audiences").map(parse_audiences) {
            Some(Some(audiences)) => settings.audiences = audiences,
            Some(None) => warn!("Ignoring malformed audiences in rule settings"),
            None => {}
        }

        if let Some(limit) = stored.get("keywordLimit").and_then(Value::as_f64) {
            if limit.is_finite() {
                settings.keyword_limit = (limit.trunc() as i64).clamp(1, MAX_KEYWORD_LIMIT as i64) as usize;
            }
        }

        if let Some(fallback) = stored.get("fallbackToBest").and_then(Value::as_bool) {
            settings.fallback_to_best = fallback;
        }

        settings
    }

    /// Keyword cap, clamped even if the struct was built by hand
    pub fn keyword_limit(&self) -> usize {
        self.keyword_limit.clamp(1, MAX_KEYWORD_LIMIT)
    }

    /// Stored version, or a content digest when the store has none
    pub fn fingerprint(&self) -> String {
        if let Some(version) = &self.version {
            return version.clone();
        }
        let canonical = serde_json::to_string(self).unwrap_or_default();
        format!("{:x}", md5::compute(canonical.as_bytes()))
    }

    fn find_objective(&self, id: &str) -> Option<&ObjectiveRule> {
        let key = normalize(id);
        self.objectives
            .iter()
            .find(|(name, _)| normalize(name) == key)
            .map(|(_, rule)| rule)
    }

    fn find_audience(&self, id: &str) -> Option<&Vec<String>> {
        let key = normalize(id);
        self.audiences
            .iter()
            .find(|(name, _)| normalize(name) == key)
            .map(|(_, labels)| labels)
    }

    /// Turn declared objectives and audiences into normalized tag sets.
    ///
    /// A list containing the "autre" sentinel contributes nothing. Unknown
    /// identifiers are ignored.
    pub fn resolve<S: AsRef<str>>(&self, objectives: &[S], audiences: &[S]) -> ResolvedRules {
        let mut rules = ResolvedRules::default();
        let is_other = |id: &S| normalize(id.as_ref()) == OTHER_SENTINEL;

        if !objectives.is_empty() && !objectives.iter().any(is_other) {
            for id in objectives {
                match self.find_objective(id.as_ref()) {
                    Some(rule) => {
                        rules.allowed_types.extend(rule.types.iter().map(|l| normalize(l)));
                        rules.allowed_objectifs.extend(rule.objectifs.iter().map(|l| normalize(l)));
                        rules
                            .priority_objectifs
                            .extend(rule.priority_objectifs.iter().map(|l| normalize(l)));
                    }
                    None => debug!("Unknown objective ignored: {}", id.as_ref()),
                }
            }
        }

        if !audiences.is_empty() && !audiences.iter().any(is_other) {
            for id in audiences {
                match self.find_audience(id.as_ref()) {
                    Some(labels) => rules.removed_types.extend(labels.iter().map(|l| normalize(l))),
                    None => debug!("Unknown audience ignored: {}", id.as_ref()),
                }
            }
        }

        for set in [
            &mut rules.allowed_types,
            &mut rules.allowed_objectifs,
            &mut rules.priority_objectifs,
            &mut rules.removed_types,
        ] {
            set.remove("");
        }

        rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_when_nothing_stored() {
        let settings = RuleSettings::parse_or_default(None);
        assert_eq!(settings.keyword_limit, 4);
        assert!(settings.fallback_to_best);
        assert!(settings.objectives.contains_key("promotion"));
    }

    #[test]
    fn test_partial_settings_keep_other_defaults() {
        let stored = json!({ "keywordLimit": 20, "fallbackToBest": false });
        let settings = RuleSettings::parse_or_default(Some(&stored));
        assert_eq!(settings.keyword_limit, MAX_KEYWORD_LIMIT);
        assert!(!settings.fallback_to_best);
        assert_eq!(settings.objectives, RuleSettings::default().objectives);

        let stored = json!({ "keywordLimit": 0, "objectives": "nope" });
        let settings = RuleSettings::parse_or_default(Some(&stored));
        assert_eq!(settings.keyword_limit, 1);
        assert_eq!(settings.objectives, RuleSettings::default().objectives);
    }

    #[test]
    fn test_objective_resolution_is_normalized() {
        let stored = json!({
            "objectives": {
                "promotion": { "types": ["Publicité"], "objectifs": ["Vendre"], "priorityObjectifs": ["Vendre"] },
                "formation": { "types": ["Tutoriel"] }
            }
        });
        let settings = RuleSettings::parse_or_default(Some(&stored));
        let rules = settings.resolve(&["Promotion", "formation", "unknown"], &[]);

        assert!(rules.allowed_types.contains("publicite"));
        assert!(rules.allowed_types.contains("tutoriel"));
        assert!(rules.allowed_objectifs.contains("vendre"));
        assert!(rules.priority_objectifs.contains("vendre"));
        assert!(rules.removed_types.is_empty());
    }

    #[test]
    fn test_other_sentinel_disables_constraints() {
        let settings = RuleSettings::default();
        let rules = settings.resolve(&["promotion", "autre"], &["Autre", "interne"]);
        assert!(!rules.has_allow_list());
        assert!(rules.removed_types.is_empty());
    }

    #[test]
    fn test_audience_removal_list() {
        let stored = json!({ "audiences": { "interne": ["Événement"] } });
        let settings = RuleSettings::parse_or_default(Some(&stored));
        let rules = settings.resolve::<&str>(&[], &["interne"]);
        assert!(rules.removed_types.contains("evenement"));
    }

    #[test]
    fn test_fingerprint_prefers_stored_version() {
        let stored = json!({ "version": 3 });
        assert_eq!(RuleSettings::parse_or_default(Some(&stored)).fingerprint(), "3");

        let a = RuleSettings::default().fingerprint();
        let b = RuleSettings::default().fingerprint();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }
}
