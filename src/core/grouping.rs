// File: src/core/grouping.rs
//! Pluggable clustering of near-duplicate meanings.
//!
//! Grouping is a heuristic, so it lives behind a trait that callers can swap.
//! Every strategy must keep meanings in order of first appearance, both
//! across groups and within each group.
use crate::core::normalize::derive_target_word;
use crate::core::types::Meaning;
use std::collections::HashSet;

pub trait MeaningGrouper: Send + Sync {
    fn group_meanings(&self, meanings: &[Meaning]) -> Vec<Vec<Meaning>>;
}

/// One group per meaning.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGrouping;

impl MeaningGrouper for NoGrouping {
    fn group_meanings(&self, meanings: &[Meaning]) -> Vec<Vec<Meaning>> {
        meanings.iter().cloned().map(|m| vec![m]).collect()
    }
}

/// Merges meanings that share a head word, or whose content tokens overlap
/// by at least `min_overlap` (Jaccard). A meaning joins the first earlier
/// group it matches any member of.
#[derive(Debug, Clone)]
pub struct TokenOverlapGrouper {
    min_overlap: f64,
}

/// Function words ignored when comparing glosses.
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "to", "of", "in", "on", "at", "for", "by", "with", "or", "and", "be",
    "something", "someone", "somebody", "one", "oneself",
];

impl TokenOverlapGrouper {
    pub fn new(min_overlap: f64) -> Self {
        Self { min_overlap: min_overlap.clamp(0.0, 1.0) }
    }

    fn content_tokens(text: &str) -> HashSet<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphabetic())
            .filter(|t| t.chars().count() > 1 && !STOP_WORDS.contains(t))
            .map(str::to_string)
            .collect()
    }

    fn related(&self, a: &Meaning, b: &Meaning) -> bool {
        let head_a = derive_target_word(&a.target_meaning);
        if head_a.is_some() && head_a == derive_target_word(&b.target_meaning) {
            return true;
        }
        let tokens_a = Self::content_tokens(&a.target_meaning);
        let tokens_b = Self::content_tokens(&b.target_meaning);
        if tokens_a.is_empty() || tokens_b.is_empty() {
            return false;
        }
        let shared = tokens_a.intersection(&tokens_b).count() as f64;
        let union = tokens_a.union(&tokens_b).count() as f64;
        shared / union >= self.min_overlap
    }
}

impl Default for TokenOverlapGrouper {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl MeaningGrouper for TokenOverlapGrouper {
    fn group_meanings(&self, meanings: &[Meaning]) -> Vec<Vec<Meaning>> {
        let mut groups: Vec<Vec<Meaning>> = Vec::new();
        for meaning in meanings {
            match groups
                .iter_mut()
                .find(|group| group.iter().any(|member| self.related(member, meaning)))
            {
                Some(group) => group.push(meaning.clone()),
                None => groups.push(vec![meaning.clone()]),
            }
        }
        groups
    }
}
