//! Competency name alignment between benchmark profiles, passports and the bank.
//!
//! Exact matches use a normalized key; when none exists the closest key by
//! Jaccard similarity over lowercase alphanumeric tokens is used, provided it
//! reaches the configured threshold.

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

/// Default minimum token similarity for a fuzzy match.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.5;

pub fn normalize_key(value: &str) -> String {
    tokens(value).into_iter().collect::<Vec<_>>().join(" ")
}

fn tokens(value: &str) -> BTreeSet<String> {
    value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// `|A ∩ B| / |A ∪ B|` over token sets; 0.0 when both are empty.
pub fn token_similarity(left: &str, right: &str) -> f64 {
    let left = tokens(left);
    let right = tokens(right);
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}

/// Alias table mapping normalized names to values, with fuzzy fallback.
#[derive(Debug, Clone)]
pub struct AliasIndex<V> {
    entries: BTreeMap<String, V>,
    threshold: f64,
}

impl<V: Clone> AliasIndex<V> {
    pub fn new(threshold: f64) -> Self {
        Self {
            entries: BTreeMap::new(),
            threshold,
        }
    }

    /// Registers `alias` unless an earlier alias already claimed the same key.
    pub fn insert(&mut self, alias: &str, value: V) {
        let key = normalize_key(alias);
        if key.is_empty() {
            return;
        }
        self.entries.entry(key).or_insert(value);
    }

    pub fn resolve(&self, name: &str) -> Option<V> {
        let key = normalize_key(name);
        if let Some(value) = self.entries.get(&key) {
            return Some(value.clone());
        }

        let mut best: Option<(&String, f64)> = None;
        for candidate in self.entries.keys() {
            let similarity = token_similarity(&key, candidate);
            if similarity >= self.threshold
                && best.map_or(true, |(_, best_similarity)| similarity > best_similarity)
            {
                best = Some((candidate, similarity));
            }
        }

        best.map(|(candidate, similarity)| {
            info!(
                requested = name,
                matched = candidate.as_str(),
                similarity,
                "fuzzy competency match used"
            );
            self.entries[candidate].clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn similarity_is_token_jaccard() {
        assert_eq!(token_similarity("Critical Thinking", "critical thinking"), 1.0);
        assert!((token_similarity("Active Listening", "Listening") - 0.5).abs() < 1e-12);
        assert_eq!(token_similarity("Writing", "Speaking"), 0.0);
        assert_eq!(token_similarity("", "  "), 0.0);
    }

    #[test]
    fn exact_keys_ignore_case_and_punctuation() {
        let mut index = AliasIndex::new(DEFAULT_FUZZY_THRESHOLD);
        index.insert("Problem-Solving", 1);
        assert_eq!(index.resolve("problem solving"), Some(1));
    }

    #[test]
    fn fuzzy_match_requires_threshold() {
        let mut index = AliasIndex::new(DEFAULT_FUZZY_THRESHOLD);
        index.insert("Complex Problem Solving", 7);
        assert_eq!(index.resolve("Problem Solving"), Some(7));
        assert_eq!(index.resolve("Negotiation"), None);
    }

    #[test]
    fn best_fuzzy_candidate_wins() {
        let mut index = AliasIndex::new(DEFAULT_FUZZY_THRESHOLD);
        index.insert("Team Leadership", "leadership");
        index.insert("Team Work Collaboration", "teamwork");
        assert_eq!(index.resolve("Leadership of Team"), Some("leadership"));
    }

    #[test]
    fn first_alias_registered_wins() {
        let mut index = AliasIndex::new(DEFAULT_FUZZY_THRESHOLD);
        index.insert("Coordination", "first");
        index.insert("coordination", "second");
        assert_eq!(index.resolve("Coordination"), Some("first"));
    }
}
