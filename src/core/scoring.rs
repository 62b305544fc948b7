// File: src/core/scoring.rs
//! Quality scores for reverse-lookup candidates.
use crate::config::ScoringConfig;
use crate::core::normalize::is_purely_alphabetic;
use serde::{Deserialize, Serialize};

/// Lowest score a candidate can end up with under the default weights.
pub const MIN_QUALITY_SCORE: u32 = 10;
/// Primary, short, purely alphabetic, no penalties: 100 + 50 + 10.
pub const MAX_QUALITY_SCORE: u32 = 160;

/// Register or region qualifier found in a sense's parentheticals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextMarker {
    /// archaic, obsolete, rare, dated
    Archaic,
    Slang,
    Colloquial,
    Regional(String),
    Other(String),
}

impl ContextMarker {
    /// Classifies every comma-separated label inside each context group.
    pub fn classify_all(contexts: &[String], config: &ScoringConfig) -> Vec<ContextMarker> {
        contexts
            .iter()
            .flat_map(|group| group.split(|c: char| c == ',' || c == ';'))
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(|label| Self::classify(label, config))
            .collect()
    }

    pub fn classify(label: &str, config: &ScoringConfig) -> ContextMarker {
        let lower = label.to_lowercase();
        let has = |word: &str| lower.split(|c: char| !c.is_alphabetic()).any(|w| w == word);

        if ["archaic", "obsolete", "rare", "dated"].iter().any(|w| has(*w)) {
            ContextMarker::Archaic
        } else if has("slang") || has("vulgar") {
            ContextMarker::Slang
        } else if ["colloquial", "informal", "familiar"].iter().any(|w| has(*w)) {
            ContextMarker::Colloquial
        } else if config.regional_markers.iter().any(|region| {
            let region = region.to_lowercase();
            lower == region || (region.contains(' ') && lower.contains(&region)) || has(region.as_str())
        }) {
            ContextMarker::Regional(label.to_string())
        } else {
            ContextMarker::Other(label.to_string())
        }
    }
}

/// Scores one reverse-lookup candidate.
///
/// Register penalties apply once each; the regional penalty applies per
/// regional marker. The result never drops below `config.floor`.
pub fn quality_score(core: &str, markers: &[ContextMarker], is_primary: bool, config: &ScoringConfig) -> u32 {
    let mut score = config.base;
    if is_primary {
        score += config.primary_bonus;
    }
    if markers.contains(&ContextMarker::Archaic) {
        score -= config.archaic_penalty;
    }
    if markers.contains(&ContextMarker::Slang) {
        score -= config.slang_penalty;
    }
    if markers.contains(&ContextMarker::Colloquial) {
        score -= config.colloquial_penalty;
    }
    let regional = markers
        .iter()
        .filter(|m| matches!(m, ContextMarker::Regional(_)))
        .count() as i32;
    score -= config.regional_penalty * regional;

    let length = core.chars().count();
    if length > config.long_gloss_chars {
        score -= config.long_gloss_penalty;
    }
    if length <= config.short_gloss_chars && is_purely_alphabetic(core) {
        score += config.short_gloss_bonus;
    }
    score.max(config.floor).max(0) as u32
}

/// Coarse quality indicator shown next to reverse translations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QualityBand {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl QualityBand {
    /// >= 140 excellent, >= 100 good, >= 60 fair, else poor.
    pub fn from_score(score: u32) -> Self {
        match score {
            140.. => QualityBand::Excellent,
            100..=139 => QualityBand::Good,
            60..=99 => QualityBand::Fair,
            _ => QualityBand::Poor,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityBand::Excellent => "excellent",
            QualityBand::Good => "good",
            QualityBand::Fair => "fair",
            QualityBand::Poor => "poor",
        }
    }
}
