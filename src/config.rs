// File: src/config.rs
//! Tunables for the lexicon builder, scorer, grouper and review scheduler.
//!
//! Loaded from a JSON file. Every section falls back to its defaults, so a
//! config file only needs the keys it overrides.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexiconConfig {
    pub builder: BuilderConfig,
    pub scoring: ScoringConfig,
    pub review: ReviewConfig,
    pub grouping: GroupingConfig,
}

/// Lemma validation and rejection-log settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Lemmas shorter than this (in chars) are rejected.
    pub min_lemma_chars: usize,
    /// Cap on rejected records kept verbatim in the build report.
    pub max_logged_rejections: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            min_lemma_chars: 2,
            max_logged_rejections: 1000,
        }
    }
}

/// Weights for reverse-lookup quality scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub base: i32,
    pub primary_bonus: i32,
    pub archaic_penalty: i32,
    pub slang_penalty: i32,
    pub colloquial_penalty: i32,
    /// Applied once per regional marker.
    pub regional_penalty: i32,
    pub long_gloss_penalty: i32,
    pub short_gloss_bonus: i32,
    /// Glosses longer than this many chars take the long-gloss penalty.
    pub long_gloss_chars: usize,
    /// Purely alphabetic glosses up to this many chars get the bonus.
    pub short_gloss_chars: usize,
    pub floor: i32,
    /// Context labels treated as regional markers (matched case-insensitively).
    pub regional_markers: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let regional_markers = [
            "spain", "mexico", "latin america", "argentina", "chile", "colombia", "cuba",
            "peru", "venezuela", "caribbean", "central america", "rioplatense", "andes",
            "uk", "us", "british", "american", "australia", "canada", "ireland", "scotland",
            "brazil", "portugal", "france", "quebec", "belgium", "switzerland", "austria",
            "regional", "dialectal", "dialect",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        Self {
            base: 100,
            primary_bonus: 50,
            archaic_penalty: 40,
            slang_penalty: 20,
            colloquial_penalty: 10,
            regional_penalty: 5,
            long_gloss_penalty: 20,
            short_gloss_bonus: 10,
            long_gloss_chars: 50,
            short_gloss_chars: 10,
            floor: 10,
            regional_markers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Easiness factor given to newly saved words.
    pub default_easiness: f64,
    /// How many due items the CLI pulls per review session.
    pub due_batch_size: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            default_easiness: 2.5,
            due_batch_size: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    /// Jaccard overlap of content tokens at which two meanings merge.
    pub min_token_overlap: f64,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self { min_token_overlap: 0.5 }
    }
}

impl LexiconConfig {
    /// Reads config from `path`. A missing file is not an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: LexiconConfig = serde_json::from_str(&content)?;
        info!("Loaded lexicon config from {:?}", path);
        Ok(config)
    }
}
