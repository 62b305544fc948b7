// src/core/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a WordGroup inside `LexiconIndex::word_groups`.
pub type WordGroupId = usize;

/// Index of a Meaning inside `LexiconIndex::meanings`.
pub type MeaningId = usize;

/// A (source, target) language pair, stored as lower-cased ISO codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl LanguagePair {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.trim().to_lowercase(),
            target: target.trim().to_lowercase(),
        }
    }

    /// Pack id in the usual `es-en` form.
    pub fn pack_id(&self) -> String {
        format!("{}-{}", self.source, self.target)
    }

    /// True when the given codes name this pair (case-insensitive).
    pub fn matches(&self, source: &str, target: &str) -> bool {
        self.source.eq_ignore_ascii_case(source.trim()) && self.target.eq_ignore_ascii_case(target.trim())
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// Part-of-speech heading of a gloss section.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartOfSpeech {
    Noun,
    ProperNoun,
    Verb,
    Adjective,
    Adverb,
    Pronoun,
    Preposition,
    Conjunction,
    Interjection,
    Determiner,
    Numeral,
    Phrase,
}

impl PartOfSpeech {
    /// Maps a free-form heading ("noun", "Adj.", "proper noun") to a variant.
    /// Register and usage labels such as "fig." are not parts of speech.
    pub fn parse(heading: &str) -> Option<Self> {
        let key = heading
            .trim()
            .trim_end_matches('.')
            .to_lowercase();
        let pos = match key.as_str() {
            "noun" | "n" | "nm" | "nf" | "masculine noun" | "feminine noun" => PartOfSpeech::Noun,
            "proper noun" | "prop" | "name" => PartOfSpeech::ProperNoun,
            "verb" | "v" | "vt" | "vi" | "transitive verb" | "intransitive verb" => PartOfSpeech::Verb,
            "adjective" | "adj" => PartOfSpeech::Adjective,
            "adverb" | "adv" => PartOfSpeech::Adverb,
            "pronoun" | "pron" => PartOfSpeech::Pronoun,
            "preposition" | "prep" => PartOfSpeech::Preposition,
            "conjunction" | "conj" => PartOfSpeech::Conjunction,
            "interjection" | "interj" => PartOfSpeech::Interjection,
            "determiner" | "article" | "det" => PartOfSpeech::Determiner,
            "numeral" | "num" | "number" => PartOfSpeech::Numeral,
            "phrase" | "idiom" | "proverb" => PartOfSpeech::Phrase,
            _ => return None,
        };
        Some(pos)
    }

    pub fn abbreviation(&self) -> &'static str {
        match self {
            PartOfSpeech::Noun => "n.",
            PartOfSpeech::ProperNoun => "prop. n.",
            PartOfSpeech::Verb => "v.",
            PartOfSpeech::Adjective => "adj.",
            PartOfSpeech::Adverb => "adv.",
            PartOfSpeech::Pronoun => "pron.",
            PartOfSpeech::Preposition => "prep.",
            PartOfSpeech::Conjunction => "conj.",
            PartOfSpeech::Interjection => "interj.",
            PartOfSpeech::Determiner => "det.",
            PartOfSpeech::Numeral => "num.",
            PartOfSpeech::Phrase => "phr.",
        }
    }
}

impl fmt::Display for PartOfSpeech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

/// Canonical source-language entry spanning all of its inflected forms.
/// `base_word` is always `word_forms[0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordGroup {
    pub id: WordGroupId,
    pub base_word: String,
    pub word_forms: Vec<String>,
    pub part_of_speech: Option<PartOfSpeech>,
    pub source_language: String,
    pub target_language: String,
}

/// One sense of a WordGroup in the target language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meaning {
    pub id: MeaningId,
    pub word_group_id: WordGroupId,
    /// 1-based cycling position, contiguous within the group.
    pub meaning_order: u32,
    pub target_meaning: String,
    pub context: Option<String>,
    pub part_of_speech: Option<PartOfSpeech>,
    pub is_primary: bool,
}

/// Maps a normalized target-language word back to a source sense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseLookupEntry {
    pub target_word: String,
    pub source_word_group_id: WordGroupId,
    pub source_meaning_id: MeaningId,
    /// 1 = best candidate for `target_word`.
    pub lookup_order: u32,
    pub quality_score: u32,
}
