// File: src/builder.rs
//! Streams a delimited source file into a `LexiconIndex`.
//!
//! One record per line: pipe-separated surface forms, a tab, then gloss
//! markup. The first form is the lemma.
//!
//! ```text
//! frío|fría|fríos|frías\t<i>adj</i><ol><li>cold</li><li>(figuratively) unfriendly</li></ol>
//! ```
//!
//! Bad records never abort the build; they are counted in the `BuildReport`.
use crate::config::{BuilderConfig, LexiconConfig, ScoringConfig};
use crate::core::markup::parse_gloss;
use crate::core::normalize::{clean_sense, derive_target_word};
use crate::core::scoring::{quality_score, ContextMarker};
use crate::core::types::{LanguagePair, Meaning, MeaningId, PartOfSpeech, ReverseLookupEntry, WordGroup, WordGroupId};
use crate::error::Result;
use crate::index::LexiconIndex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

/// Why a source record was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum RejectReason {
    #[error("line is not `forms<TAB>gloss`")]
    MalformedLine,
    #[error("lemma is too short")]
    TooShort,
    #[error("lemma contains a period")]
    ContainsPeriod,
    #[error("lemma is an all-uppercase acronym")]
    Acronym,
    #[error("lemma is a capitalized multi-word phrase")]
    CapitalizedPhrase,
    #[error("entry is tagged as a proper noun")]
    ProperNoun,
    #[error("gloss has no usable senses")]
    NoSenses,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub line_number: usize,
    pub lemma: String,
    pub reason: RejectReason,
}

/// Outcome of a build, returned as a value alongside the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub accepted: usize,
    pub rejected: usize,
    /// Accepted records folded into an existing WordGroup.
    pub merged: usize,
    pub word_groups: usize,
    pub meanings: usize,
    pub reverse_entries: usize,
    /// Senses kept as meanings but not indexed for reverse lookup.
    pub senses_without_target_word: usize,
    pub rejected_by_reason: BTreeMap<RejectReason, usize>,
    /// First `max_logged_rejections` rejected records.
    pub rejections: Vec<Rejection>,
}

/// One parsed line of the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub word_forms: Vec<String>,
    pub gloss_markup: String,
}

impl SourceRecord {
    pub fn parse_line(line: &str) -> std::result::Result<Self, RejectReason> {
        let (forms, gloss) = line.split_once('\t').ok_or(RejectReason::MalformedLine)?;
        let word_forms: Vec<String> = forms
            .split('|')
            .map(str::trim)
            .filter(|form| !form.is_empty())
            .map(str::to_string)
            .collect();
        if word_forms.is_empty() || gloss.trim().is_empty() {
            return Err(RejectReason::MalformedLine);
        }
        Ok(Self { word_forms, gloss_markup: gloss.to_string() })
    }
}

/// Rejects lemmas that are too short, dotted abbreviations, acronyms, or
/// capitalized multi-word phrases (likely proper nouns).
pub fn validate_lemma(lemma: &str, config: &BuilderConfig) -> std::result::Result<(), RejectReason> {
    if lemma.chars().count() < config.min_lemma_chars {
        return Err(RejectReason::TooShort);
    }
    if lemma.contains('.') {
        return Err(RejectReason::ContainsPeriod);
    }
    let letters: Vec<char> = lemma.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase()) {
        return Err(RejectReason::Acronym);
    }
    let multi_word = lemma.split_whitespace().nth(1).is_some();
    if multi_word && lemma.chars().next().is_some_and(char::is_uppercase) {
        return Err(RejectReason::CapitalizedPhrase);
    }
    Ok(())
}

struct PendingSense {
    core: String,
    context: Option<String>,
    markers: Vec<ContextMarker>,
    pos: Option<PartOfSpeech>,
}

struct Candidate {
    word_group_id: WordGroupId,
    meaning_id: MeaningId,
    quality_score: u32,
}

pub struct LexiconBuilder {
    pair: LanguagePair,
    config: BuilderConfig,
    scoring: ScoringConfig,
    word_groups: Vec<WordGroup>,
    meanings: Vec<Meaning>,
    group_meanings: Vec<Vec<MeaningId>>,
    group_by_lemma: HashMap<String, WordGroupId>,
    /// Target word -> candidates in discovery order.
    candidates: HashMap<String, Vec<Candidate>>,
    report: BuildReport,
}

impl LexiconBuilder {
    pub fn new(pair: LanguagePair, config: &LexiconConfig) -> Self {
        Self {
            pair,
            config: config.builder.clone(),
            scoring: config.scoring.clone(),
            word_groups: Vec::new(),
            meanings: Vec::new(),
            group_meanings: Vec::new(),
            group_by_lemma: HashMap::new(),
            candidates: HashMap::new(),
            report: BuildReport::default(),
        }
    }

    /// Builds from any line source. Only read errors abort.
    pub fn build_from_reader<R: BufRead>(
        pair: LanguagePair,
        config: &LexiconConfig,
        reader: R,
    ) -> Result<(LexiconIndex, BuildReport)> {
        let mut builder = Self::new(pair, config);
        info!("Building {} lexicon", builder.pair);
        for (i, line) in reader.lines().enumerate() {
            builder.add_line(i + 1, &line?);
        }
        Ok(builder.finish())
    }

    pub fn build_from_path(pair: LanguagePair, config: &LexiconConfig, path: &Path) -> Result<(LexiconIndex, BuildReport)> {
        let file = File::open(path)?;
        Self::build_from_reader(pair, config, BufReader::new(file))
    }

    /// Adds one raw source line. Blank lines and `#` comments are ignored.
    pub fn add_line(&mut self, line_number: usize, line: &str) {
        if line.trim().is_empty() || line.starts_with('#') {
            return;
        }
        let outcome = SourceRecord::parse_line(line).and_then(|record| self.add_record(&record));
        if let Err(reason) = outcome {
            let lemma = line
                .split(['|', '\t'])
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
            self.reject(line_number, lemma, reason);
        }
    }

    fn reject(&mut self, line_number: usize, lemma: String, reason: RejectReason) {
        debug!("Rejected line {} ({:?}): {}", line_number, lemma, reason);
        self.report.rejected += 1;
        *self.report.rejected_by_reason.entry(reason).or_insert(0) += 1;
        if self.report.rejections.len() < self.config.max_logged_rejections {
            self.report.rejections.push(Rejection { line_number, lemma, reason });
        }
    }

    /// Validates and indexes one record, returning the owning group.
    pub fn add_record(&mut self, record: &SourceRecord) -> std::result::Result<WordGroupId, RejectReason> {
        let lemma = record.word_forms.first().ok_or(RejectReason::MalformedLine)?;
        validate_lemma(lemma, &self.config)?;

        let sections = parse_gloss(&record.gloss_markup);
        let had_sections = !sections.is_empty();
        let sections: Vec<_> = sections
            .into_iter()
            .filter(|s| s.pos != Some(PartOfSpeech::ProperNoun))
            .collect();
        if had_sections && sections.is_empty() {
            return Err(RejectReason::ProperNoun);
        }

        let scoring = &self.scoring;
        let pending: Vec<PendingSense> = sections
            .iter()
            .flat_map(|section| {
                section.senses.iter().filter_map(move |raw| {
                    clean_sense(raw).map(|sense| PendingSense {
                        context: sense.context_label(),
                        markers: ContextMarker::classify_all(&sense.contexts, scoring),
                        core: sense.core,
                        pos: section.pos.clone(),
                    })
                })
            })
            .collect();
        if pending.is_empty() {
            return Err(RejectReason::NoSenses);
        }

        let group_id = self.group_for(record, sections.first().and_then(|s| s.pos.clone()));
        for sense in pending {
            self.push_meaning(group_id, sense);
        }
        self.report.accepted += 1;
        Ok(group_id)
    }

    fn group_for(&mut self, record: &SourceRecord, pos: Option<PartOfSpeech>) -> WordGroupId {
        let lemma = &record.word_forms[0];
        if let Some(&id) = self.group_by_lemma.get(lemma) {
            let group = &mut self.word_groups[id];
            for form in &record.word_forms[1..] {
                if !group.word_forms.contains(form) {
                    group.word_forms.push(form.clone());
                }
            }
            if group.part_of_speech.is_none() {
                group.part_of_speech = pos;
            }
            self.report.merged += 1;
            return id;
        }

        let mut word_forms: Vec<String> = Vec::with_capacity(record.word_forms.len());
        for form in &record.word_forms {
            if !word_forms.contains(form) {
                word_forms.push(form.clone());
            }
        }
        let id = self.word_groups.len();
        self.word_groups.push(WordGroup {
            id,
            base_word: lemma.clone(),
            word_forms,
            part_of_speech: pos,
            source_language: self.pair.source.clone(),
            target_language: self.pair.target.clone(),
        });
        self.group_meanings.push(Vec::new());
        self.group_by_lemma.insert(lemma.clone(), id);
        id
    }

    fn push_meaning(&mut self, word_group_id: WordGroupId, sense: PendingSense) {
        let meaning_id = self.meanings.len();
        let meaning_order = self.group_meanings[word_group_id].len() as u32 + 1;
        let is_primary = meaning_order == 1;

        match derive_target_word(&sense.core) {
            Some(target_word) => {
                let score = quality_score(&sense.core, &sense.markers, is_primary, &self.scoring);
                self.candidates.entry(target_word).or_default().push(Candidate {
                    word_group_id,
                    meaning_id,
                    quality_score: score,
                });
            }
            None => self.report.senses_without_target_word += 1,
        }

        self.meanings.push(Meaning {
            id: meaning_id,
            word_group_id,
            meaning_order,
            target_meaning: sense.core,
            context: sense.context,
            part_of_speech: sense.pos,
            is_primary,
        });
        self.group_meanings[word_group_id].push(meaning_id);
    }

    /// Ranks reverse candidates and freezes the tables.
    pub fn finish(self) -> (LexiconIndex, BuildReport) {
        let Self { pair, word_groups, meanings, group_meanings, candidates, mut report, .. } = self;

        let ranked: BTreeMap<String, Vec<Candidate>> = candidates.into_iter().collect();
        let mut reverse_entries = Vec::with_capacity(ranked.values().map(Vec::len).sum());
        for (target_word, mut list) in ranked {
            // Stable: ties keep discovery order.
            list.sort_by(|a, b| b.quality_score.cmp(&a.quality_score));
            for (i, candidate) in list.into_iter().enumerate() {
                reverse_entries.push(ReverseLookupEntry {
                    target_word: target_word.clone(),
                    source_word_group_id: candidate.word_group_id,
                    source_meaning_id: candidate.meaning_id,
                    lookup_order: i as u32 + 1,
                    quality_score: candidate.quality_score,
                });
            }
        }

        report.word_groups = word_groups.len();
        report.meanings = meanings.len();
        report.reverse_entries = reverse_entries.len();
        info!(
            "Built {}: {} accepted, {} rejected, {} groups, {} meanings, {} reverse entries",
            pair, report.accepted, report.rejected, report.word_groups, report.meanings, report.reverse_entries
        );

        let index = LexiconIndex::assemble(&pair, word_groups, meanings, group_meanings, reverse_entries);
        (index, report)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::core::scoring::{MAX_QUALITY_SCORE, MIN_QUALITY_SCORE};
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    const SENSES: &[&str] = &[
        "water",
        "(archaic) water",
        "(slang) cold",
        "cold, chill",
        "(colloquial) house",
        "house",
        "(Mexico) bench",
        "a long and winding description of something wet",
        "rain",
        "3",
    ];

    fn record() -> impl Strategy<Value = String> {
        (
            "[a-zñ]{2,8}",
            prop::option::of(prop::sample::select(vec!["noun", "verb", "adj"])),
            prop::collection::vec(prop::sample::select(SENSES.to_vec()), 1..5),
        )
            .prop_map(|(lemma, pos, senses)| {
                let heading = pos.map(|p| format!("<i>{}</i>", p)).unwrap_or_default();
                let items: String = senses.iter().map(|s| format!("<li>{}</li>", s)).collect();
                format!("{}\t{}<ol>{}</ol>", lemma, heading, items)
            })
    }

    proptest! {
        #[test]
        fn built_indexes_hold_their_invariants(records in prop::collection::vec(record(), 1..25)) {
            let source = records.join("\n");
            let (index, report) = LexiconBuilder::build_from_reader(
                LanguagePair::new("es", "en"),
                &LexiconConfig::default(),
                source.as_bytes(),
            )
            .unwrap();

            let verification = index.verify();
            prop_assert!(verification.is_valid(), "{:?}", verification.issues);
            prop_assert_eq!(report.word_groups, index.word_groups().len());

            for group in index.word_groups() {
                let orders: Vec<u32> = index.meanings_of(group.id).map(|m| m.meaning_order).collect();
                prop_assert_eq!(orders, (1..=index.meanings_of(group.id).count() as u32).collect::<Vec<_>>());
                let primaries: Vec<u32> =
                    index.meanings_of(group.id).filter(|m| m.is_primary).map(|m| m.meaning_order).collect();
                prop_assert_eq!(primaries, vec![1]);
            }

            let targets: BTreeSet<&str> = index.reverse_entries().iter().map(|e| e.target_word.as_str()).collect();
            for target in targets {
                let entries = index.reverse_entries_for(target);
                let orders: Vec<u32> = entries.iter().map(|e| e.lookup_order).collect();
                prop_assert_eq!(orders, (1..=entries.len() as u32).collect::<Vec<_>>());
                for pair in entries.windows(2) {
                    prop_assert!(pair[0].quality_score >= pair[1].quality_score);
                }
            }

            for entry in index.reverse_entries() {
                prop_assert!((MIN_QUALITY_SCORE..=MAX_QUALITY_SCORE).contains(&entry.quality_score));
            }
        }
    }
}
