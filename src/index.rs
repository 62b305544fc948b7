// File: src/index.rs
//! The built, read-only lexicon: WordGroup, Meaning and ReverseLookupEntry
//! tables plus pack metadata and a surface-form trie.
use crate::core::scoring::{MAX_QUALITY_SCORE, MIN_QUALITY_SCORE};
use crate::core::trie::FormTrie;
use crate::core::types::{LanguagePair, Meaning, MeaningId, ReverseLookupEntry, WordGroup, WordGroupId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Layout version written into every pack.
pub const INDEX_SCHEMA_VERSION: u32 = 4;

/// Descriptive header carried by every built index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackMetadata {
    pub pack_id: String,
    pub source_language: String,
    pub target_language: String,
    pub pack_type: String,
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    pub word_group_count: usize,
    pub meaning_count: usize,
    pub reverse_entry_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexiconIndex {
    metadata: PackMetadata,
    word_groups: Vec<WordGroup>,
    meanings: Vec<Meaning>,
    /// Meaning ids of each group, ordered by `meaning_order`.
    group_meanings: Vec<Vec<MeaningId>>,
    /// Sorted by `(target_word, lookup_order)`.
    reverse_entries: Vec<ReverseLookupEntry>,
    /// `target_word` -> (start, len) into `reverse_entries`. Derived, so it
    /// is rebuilt after loading rather than trusted from disk.
    #[serde(skip)]
    reverse_spans: BTreeMap<String, (usize, usize)>,
    forms: FormTrie,
}

impl LexiconIndex {
    /// Assembles an index from finished tables. `reverse_entries` must already
    /// be grouped by target word and ranked.
    pub(crate) fn assemble(
        pair: &LanguagePair,
        word_groups: Vec<WordGroup>,
        meanings: Vec<Meaning>,
        group_meanings: Vec<Vec<MeaningId>>,
        reverse_entries: Vec<ReverseLookupEntry>,
    ) -> Self {
        let mut forms = FormTrie::new();
        for group in &word_groups {
            for form in &group.word_forms {
                forms.insert(form, group.id);
            }
        }

        let reverse_spans = span_table(&reverse_entries);
        let metadata = PackMetadata {
            pack_id: pair.pack_id(),
            source_language: pair.source.clone(),
            target_language: pair.target.clone(),
            pack_type: "bidirectional".to_string(),
            schema_version: INDEX_SCHEMA_VERSION,
            created_at: Utc::now(),
            word_group_count: word_groups.len(),
            meaning_count: meanings.len(),
            reverse_entry_count: reverse_entries.len(),
        };

        Self { metadata, word_groups, meanings, group_meanings, reverse_entries, reverse_spans, forms }
    }

    /// Recomputes tables that are not persisted.
    pub(crate) fn rebuild_derived(&mut self) {
        self.reverse_spans = span_table(&self.reverse_entries);
    }

    pub fn metadata(&self) -> &PackMetadata {
        &self.metadata
    }

    pub fn language_pair(&self) -> LanguagePair {
        LanguagePair::new(&self.metadata.source_language, &self.metadata.target_language)
    }

    pub fn word_groups(&self) -> &[WordGroup] {
        &self.word_groups
    }

    pub fn meanings(&self) -> &[Meaning] {
        &self.meanings
    }

    pub fn reverse_entries(&self) -> &[ReverseLookupEntry] {
        &self.reverse_entries
    }

    pub fn word_group(&self, id: WordGroupId) -> Option<&WordGroup> {
        self.word_groups.get(id)
    }

    pub fn meaning(&self, id: MeaningId) -> Option<&Meaning> {
        self.meanings.get(id)
    }

    /// Meanings of a group in cycling order.
    pub fn meanings_of(&self, id: WordGroupId) -> impl Iterator<Item = &Meaning> + '_ {
        self.group_meanings
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(move |&meaning_id| self.meanings.get(meaning_id))
    }

    /// Groups listing `word` among their surface forms, in id order.
    pub fn groups_with_form(&self, word: &str) -> impl Iterator<Item = &WordGroup> + '_ {
        self.forms.get(word).iter().filter_map(move |&id| self.word_groups.get(id))
    }

    /// Ranked reverse entries for a normalized target word.
    pub fn reverse_entries_for(&self, target_word: &str) -> &[ReverseLookupEntry] {
        self.reverse_spans
            .get(target_word)
            .and_then(|&(start, len)| self.reverse_entries.get(start..start.saturating_add(len)))
            .unwrap_or(&[])
    }

    /// Checks every structural invariant of the tables.
    pub fn verify(&self) -> VerificationReport {
        let mut issues = Vec::new();

        let counts = (self.word_groups.len(), self.meanings.len(), self.reverse_entries.len());
        let declared = (
            self.metadata.word_group_count,
            self.metadata.meaning_count,
            self.metadata.reverse_entry_count,
        );
        if counts != declared {
            issues.push(IndexIssue::CountMismatch { declared, actual: counts });
        }

        for (position, group) in self.word_groups.iter().enumerate() {
            if group.id != position {
                issues.push(IndexIssue::DanglingReference(format!("word group {} stored at {}", group.id, position)));
            }
            if group.base_word.trim().is_empty() {
                issues.push(IndexIssue::EmptyLemma(group.id));
            }
            if group.word_forms.first() != Some(&group.base_word) {
                issues.push(IndexIssue::BaseWordMismatch(group.id));
            }

            let orders: Vec<(u32, bool)> = self
                .meanings_of(group.id)
                .map(|m| (m.meaning_order, m.is_primary))
                .collect();
            let contiguous = orders
                .iter()
                .enumerate()
                .all(|(i, &(order, _))| order as usize == i + 1);
            if orders.is_empty() || !contiguous {
                issues.push(IndexIssue::MeaningOrderGap(group.id));
            }
            let primaries: Vec<u32> = orders.iter().filter(|(_, p)| *p).map(|(o, _)| *o).collect();
            if primaries != [1] {
                issues.push(IndexIssue::WrongPrimary(group.id));
            }
        }

        for meaning in &self.meanings {
            if meaning.target_meaning.trim().is_empty() {
                issues.push(IndexIssue::EmptyMeaning(meaning.id));
            }
            if self.word_groups.get(meaning.word_group_id).is_none() {
                issues.push(IndexIssue::DanglingReference(format!("meaning {} -> group {}", meaning.id, meaning.word_group_id)));
            }
        }

        for (word, &(start, len)) in &self.reverse_spans {
            let Some(entries) = self.reverse_entries.get(start..start.saturating_add(len)) else {
                issues.push(IndexIssue::DanglingReference(format!(
                    "'{}' spans entries {}..{} of {}",
                    word,
                    start,
                    start.saturating_add(len),
                    self.reverse_entries.len()
                )));
                continue;
            };
            if entries.iter().any(|e| &e.target_word != word) {
                issues.push(IndexIssue::LookupOrderBroken(word.clone()));
                continue;
            }
            let dense = entries
                .iter()
                .enumerate()
                .all(|(i, e)| e.lookup_order as usize == i + 1);
            let descending = entries
                .windows(2)
                .all(|pair| pair[0].quality_score >= pair[1].quality_score);
            if !dense || !descending {
                issues.push(IndexIssue::LookupOrderBroken(word.clone()));
            }
            for entry in entries {
                if !(MIN_QUALITY_SCORE..=MAX_QUALITY_SCORE).contains(&entry.quality_score) {
                    issues.push(IndexIssue::ScoreOutOfRange { target_word: word.clone(), score: entry.quality_score });
                }
                let owner = self.meanings.get(entry.source_meaning_id).map(|m| m.word_group_id);
                if owner != Some(entry.source_word_group_id) {
                    issues.push(IndexIssue::DanglingReference(format!(
                        "reverse entry {} -> meaning {}",
                        word, entry.source_meaning_id
                    )));
                }
            }
        }

        VerificationReport { issues }
    }
}

/// Groups entries sorted by target word into `(start, len)` runs.
fn span_table(entries: &[ReverseLookupEntry]) -> BTreeMap<String, (usize, usize)> {
    let mut spans = BTreeMap::new();
    let mut start = 0;
    while start < entries.len() {
        let word = &entries[start].target_word;
        let len = entries[start..]
            .iter()
            .take_while(|entry| &entry.target_word == word)
            .count();
        spans.insert(word.clone(), (start, len));
        start += len;
    }
    spans
}

/// One broken invariant found by `LexiconIndex::verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IndexIssue {
    CountMismatch { declared: (usize, usize, usize), actual: (usize, usize, usize) },
    EmptyLemma(WordGroupId),
    EmptyMeaning(MeaningId),
    BaseWordMismatch(WordGroupId),
    MeaningOrderGap(WordGroupId),
    WrongPrimary(WordGroupId),
    LookupOrderBroken(String),
    ScoreOutOfRange { target_word: String, score: u32 },
    DanglingReference(String),
}

impl fmt::Display for IndexIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexIssue::CountMismatch { declared, actual } => {
                write!(f, "metadata declares {:?} rows, tables hold {:?}", declared, actual)
            }
            IndexIssue::EmptyLemma(id) => write!(f, "word group {} has an empty lemma", id),
            IndexIssue::EmptyMeaning(id) => write!(f, "meaning {} has empty text", id),
            IndexIssue::BaseWordMismatch(id) => write!(f, "word group {}: base word is not its first form", id),
            IndexIssue::MeaningOrderGap(id) => write!(f, "word group {}: meaning order is not 1..N", id),
            IndexIssue::WrongPrimary(id) => write!(f, "word group {}: primary meaning is not order 1", id),
            IndexIssue::LookupOrderBroken(word) => write!(f, "'{}': lookup order is not a descending ranking", word),
            IndexIssue::ScoreOutOfRange { target_word, score } => {
                write!(f, "'{}': quality score {} out of range", target_word, score)
            }
            IndexIssue::DanglingReference(what) => write!(f, "dangling reference: {}", what),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationReport {
    pub issues: Vec<IndexIssue>,
}

impl VerificationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}
