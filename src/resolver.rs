// File: src/resolver.rs
//! Read-only queries over installed lexicon indexes.
//!
//! Every query is a pure function of its arguments and the installed
//! indexes, so repeated calls return identical sequences in identical order.
//! Callers keep their own cycling cursor over those sequences.
use crate::core::grouping::MeaningGrouper;
use crate::core::normalize::collapse_whitespace;
use crate::core::scoring::QualityBand;
use crate::core::types::{LanguagePair, Meaning, MeaningId, WordGroup, WordGroupId};
use crate::error::{LexiconError, Result};
use crate::index::{LexiconIndex, PackMetadata, INDEX_SCHEMA_VERSION};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Oldest index layout this resolver can read.
pub const MIN_SCHEMA_VERSION: u32 = 4;

/// Fails with `SchemaMismatch` for layouts older than `MIN_SCHEMA_VERSION`
/// or newer than this build writes.
pub fn ensure_supported_schema(found: u32) -> Result<()> {
    if (MIN_SCHEMA_VERSION..=INDEX_SCHEMA_VERSION).contains(&found) {
        Ok(())
    } else {
        Err(LexiconError::SchemaMismatch { found, required: MIN_SCHEMA_VERSION })
    }
}

/// One meaning of a looked-up word, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeaningResult {
    pub word_group_id: WordGroupId,
    pub meaning_id: MeaningId,
    pub base_word: String,
    /// `target_meaning` alone.
    pub display_text: String,
    /// `target_meaning` followed by its context in parentheses.
    pub expanded_text: String,
    pub part_of_speech_tag: Option<String>,
    pub is_primary: bool,
    /// 1-based cycling position.
    pub position: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceLookup {
    pub query: String,
    pub meanings: Vec<MeaningResult>,
}

impl SourceLookup {
    pub fn has_results(&self) -> bool {
        !self.meanings.is_empty()
    }

    /// Result at a 1-based position.
    pub fn at(&self, position: usize) -> Option<&MeaningResult> {
        position.checked_sub(1).and_then(|i| self.meanings.get(i))
    }

    /// Position after `position`, wrapping to 1.
    pub fn next_position(&self, position: usize) -> usize {
        cycle(position, self.meanings.len(), true)
    }

    /// Position before `position`, wrapping to the last.
    pub fn previous_position(&self, position: usize) -> usize {
        cycle(position, self.meanings.len(), false)
    }
}

/// A ranked source-language candidate for a target-language word.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationResult {
    pub source_word: String,
    pub word_group_id: WordGroupId,
    pub meaning_id: MeaningId,
    pub meaning_text: String,
    pub context: Option<String>,
    pub lookup_order: u32,
    pub quality_score: u32,
    pub quality: QualityBand,
    pub position: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TargetLookup {
    pub query: String,
    pub translations: Vec<TranslationResult>,
}

impl TargetLookup {
    pub fn has_results(&self) -> bool {
        !self.translations.is_empty()
    }

    pub fn at(&self, position: usize) -> Option<&TranslationResult> {
        position.checked_sub(1).and_then(|i| self.translations.get(i))
    }

    pub fn next_position(&self, position: usize) -> usize {
        cycle(position, self.translations.len(), true)
    }

    pub fn previous_position(&self, position: usize) -> usize {
        cycle(position, self.translations.len(), false)
    }
}

fn cycle(position: usize, total: usize, forward: bool) -> usize {
    if total == 0 {
        return 0;
    }
    let current = position.clamp(1, total);
    match (forward, current) {
        (true, p) if p == total => 1,
        (true, p) => p + 1,
        (false, 1) => total,
        (false, p) => p - 1,
    }
}

fn meaning_result(group: &WordGroup, meaning: &Meaning, position: usize, total: usize) -> MeaningResult {
    let expanded_text = match &meaning.context {
        Some(context) => format!("{} ({})", meaning.target_meaning, context),
        None => meaning.target_meaning.clone(),
    };
    MeaningResult {
        word_group_id: group.id,
        meaning_id: meaning.id,
        base_word: group.base_word.clone(),
        display_text: meaning.target_meaning.clone(),
        expanded_text,
        part_of_speech_tag: meaning
            .part_of_speech
            .as_ref()
            .or(group.part_of_speech.as_ref())
            .map(|pos| format!("({})", pos.abbreviation())),
        is_primary: meaning.is_primary,
        position,
        total,
    }
}

/// Query engine over one index per language pair.
#[derive(Debug, Clone, Default)]
pub struct MeaningResolver {
    indexes: HashMap<LanguagePair, Arc<LexiconIndex>>,
}

impl MeaningResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_index(index: impl Into<Arc<LexiconIndex>>) -> Result<Self> {
        let mut resolver = Self::new();
        resolver.install(index)?;
        Ok(resolver)
    }

    /// Rejects packs whose layout this resolver does not understand.
    pub fn check_schema(metadata: &PackMetadata) -> Result<()> {
        ensure_supported_schema(metadata.schema_version).inspect_err(|_| {
            warn!("Refusing pack {} with schema version {}", metadata.pack_id, metadata.schema_version)
        })
    }

    /// Installs an index for its language pair, replacing any previous one
    /// wholesale. Returns the replaced index.
    pub fn install(&mut self, index: impl Into<Arc<LexiconIndex>>) -> Result<Option<Arc<LexiconIndex>>> {
        let index = index.into();
        Self::check_schema(index.metadata())?;
        info!(
            "Installed pack {} ({} word groups)",
            index.metadata().pack_id,
            index.metadata().word_group_count
        );
        Ok(self.indexes.insert(index.language_pair(), index))
    }

    pub fn uninstall(&mut self, source_lang: &str, target_lang: &str) -> Option<Arc<LexiconIndex>> {
        self.indexes.remove(&LanguagePair::new(source_lang, target_lang))
    }

    pub fn installed_pairs(&self) -> Vec<LanguagePair> {
        let mut pairs: Vec<_> = self.indexes.keys().cloned().collect();
        pairs.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));
        pairs
    }

    fn index_for(&self, source_lang: &str, target_lang: &str) -> Option<&LexiconIndex> {
        self.indexes
            .get(&LanguagePair::new(source_lang, target_lang))
            .map(Arc::as_ref)
    }

    /// Meanings of every WordGroup listing `word` as a surface form, ordered
    /// by group and then `meaning_order`.
    pub fn lookup_source_meanings(&self, word: &str, source_lang: &str, target_lang: &str) -> SourceLookup {
        let query = collapse_whitespace(word);
        let Some(index) = self.index_for(source_lang, target_lang) else {
            return SourceLookup { query, meanings: Vec::new() };
        };

        let pairs: Vec<(&WordGroup, &Meaning)> = index
            .groups_with_form(&query)
            .flat_map(|group| index.meanings_of(group.id).map(move |meaning| (group, meaning)))
            .collect();
        let total = pairs.len();
        let meanings = pairs
            .into_iter()
            .enumerate()
            .map(|(i, (group, meaning))| meaning_result(group, meaning, i + 1, total))
            .collect();
        SourceLookup { query, meanings }
    }

    /// Source meanings clustered by `grouper`, one clustering per WordGroup.
    /// Positions still refer to the flat `lookup_source_meanings` sequence.
    pub fn lookup_grouped_meanings(
        &self,
        word: &str,
        source_lang: &str,
        target_lang: &str,
        grouper: &dyn MeaningGrouper,
    ) -> Vec<Vec<MeaningResult>> {
        let flat = self.lookup_source_meanings(word, source_lang, target_lang);
        let Some(index) = self.index_for(source_lang, target_lang) else {
            return Vec::new();
        };
        let by_meaning: HashMap<MeaningId, &MeaningResult> =
            flat.meanings.iter().map(|r| (r.meaning_id, r)).collect();

        let mut group_ids: Vec<WordGroupId> = flat.meanings.iter().map(|r| r.word_group_id).collect();
        group_ids.dedup();

        let mut clusters = Vec::new();
        for group_id in group_ids {
            let meanings: Vec<Meaning> = index.meanings_of(group_id).cloned().collect();
            for cluster in grouper.group_meanings(&meanings) {
                let results: Vec<MeaningResult> = cluster
                    .iter()
                    .filter_map(|m| by_meaning.get(&m.id).map(|r| (*r).clone()))
                    .collect();
                if !results.is_empty() {
                    clusters.push(results);
                }
            }
        }
        clusters
    }

    /// Source-language candidates for a target-language word, best first.
    pub fn lookup_target_translations(&self, word: &str, source_lang: &str, target_lang: &str) -> TargetLookup {
        let query = collapse_whitespace(word).to_lowercase();
        let Some(index) = self.index_for(source_lang, target_lang) else {
            return TargetLookup { query, translations: Vec::new() };
        };

        let mut translations: Vec<TranslationResult> = index
            .reverse_entries_for(&query)
            .iter()
            .filter_map(|entry| {
                let group = index.word_group(entry.source_word_group_id)?;
                let meaning = index.meaning(entry.source_meaning_id)?;
                Some(TranslationResult {
                    source_word: group.base_word.clone(),
                    word_group_id: group.id,
                    meaning_id: meaning.id,
                    meaning_text: meaning.target_meaning.clone(),
                    context: meaning.context.clone(),
                    lookup_order: entry.lookup_order,
                    quality_score: entry.quality_score,
                    quality: QualityBand::from_score(entry.quality_score),
                    position: 0,
                    total: 0,
                })
            })
            .collect();
        // Positions count only the entries that resolved.
        let total = translations.len();
        for (i, translation) in translations.iter_mut().enumerate() {
            translation.position = i + 1;
            translation.total = total;
        }
        TargetLookup { query, translations }
    }

    /// Lazily yields distinct base words whose forms contain `fragment`
    /// (case-insensitive), at most `limit` of them.
    pub fn search_words(&self, fragment: &str, source_lang: &str, target_lang: &str, limit: usize) -> Result<WordSearch<'_>> {
        if limit == 0 {
            return Err(LexiconError::InvalidInput("search limit must be positive".to_string()));
        }
        Ok(WordSearch::new(
            self.index_for(source_lang, target_lang),
            collapse_whitespace(fragment).to_lowercase(),
            limit,
        ))
    }

    pub fn word_exists(&self, word: &str, source_lang: &str, target_lang: &str) -> bool {
        self.index_for(source_lang, target_lang)
            .is_some_and(|index| index.groups_with_form(&collapse_whitespace(word)).next().is_some())
    }
}

/// Restartable, lazily evaluated word search. Clone it (or call `restart`)
/// to iterate again from the beginning.
#[derive(Debug, Clone)]
pub struct WordSearch<'a> {
    index: Option<&'a LexiconIndex>,
    fragment: String,
    limit: usize,
    next_group: usize,
    yielded: usize,
}

impl<'a> WordSearch<'a> {
    fn new(index: Option<&'a LexiconIndex>, fragment: String, limit: usize) -> Self {
        Self { index, fragment, limit, next_group: 0, yielded: 0 }
    }

    pub fn restart(&self) -> Self {
        Self::new(self.index, self.fragment.clone(), self.limit)
    }
}

impl<'a> Iterator for WordSearch<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.index?;
        if self.fragment.is_empty() || self.yielded >= self.limit {
            return None;
        }
        // Base words are unique per index, so each group yields at most once.
        while let Some(group) = index.word_groups().get(self.next_group) {
            self.next_group += 1;
            if group
                .word_forms
                .iter()
                .any(|form| form.to_lowercase().contains(&self.fragment))
            {
                self.yielded += 1;
                return Some(group.base_word.as_str());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::LexiconBuilder;
    use crate::config::LexiconConfig;
    use crate::core::grouping::{NoGrouping, TokenOverlapGrouper};
    use crate::core::types::ReverseLookupEntry;

    const SOURCE: &str = "frío|fría|fríos|frías\t<i>adj</i><ol><li>cold</li><li>(figuratively) unfriendly</li></ol>\
                          <i>noun</i><ol><li>cold, chill</li></ol>\n\
                          agua|aguas\t<i>noun</i><ol><li>water</li></ol>\n\
                          líquido|líquidos\t<i>noun</i><ol><li>liquid</li><li>water</li></ol>\n\
                          friolero|friolera\t<i>adj</i><ol><li>sensitive to cold</li></ol>\n";

    fn resolver() -> MeaningResolver {
        let (index, _) =
            LexiconBuilder::build_from_reader(LanguagePair::new("es", "en"), &LexiconConfig::default(), SOURCE.as_bytes())
                .unwrap();
        MeaningResolver::from_index(index).unwrap()
    }

    #[test]
    fn source_meanings_come_in_cycling_order() {
        let lookup = resolver().lookup_source_meanings("Frías", "es", "en");
        assert!(lookup.has_results());
        let texts: Vec<_> = lookup.meanings.iter().map(|m| m.display_text.as_str()).collect();
        assert_eq!(texts, vec!["cold", "unfriendly", "cold, chill"]);

        let second = lookup.at(2).unwrap();
        assert_eq!(second.expanded_text, "unfriendly (figuratively)");
        assert_eq!(second.part_of_speech_tag.as_deref(), Some("(adj.)"));
        assert_eq!((second.position, second.total), (2, 3));
        assert!(lookup.at(1).unwrap().is_primary);
        assert_eq!(lookup.at(3).unwrap().part_of_speech_tag.as_deref(), Some("(n.)"));
    }

    #[test]
    fn cursor_helpers_wrap_around() {
        let lookup = resolver().lookup_source_meanings("frío", "es", "en");
        assert_eq!(lookup.next_position(3), 1);
        assert_eq!(lookup.next_position(1), 2);
        assert_eq!(lookup.previous_position(1), 3);
        assert!(lookup.at(0).is_none());
        assert_eq!(SourceLookup::default().next_position(1), 0);
    }

    #[test]
    fn repeated_queries_are_identical() {
        let resolver = resolver();
        assert_eq!(
            resolver.lookup_source_meanings("frío", "es", "en"),
            resolver.lookup_source_meanings("frío", "es", "en")
        );
        assert_eq!(
            resolver.lookup_target_translations("water", "es", "en"),
            resolver.lookup_target_translations("water", "es", "en")
        );
    }

    #[test]
    fn target_translations_are_ranked() {
        let lookup = resolver().lookup_target_translations("  Water ", "es", "en");
        let ranked: Vec<_> = lookup
            .translations
            .iter()
            .map(|t| (t.source_word.as_str(), t.lookup_order, t.quality_score, t.quality))
            .collect();
        assert_eq!(
            ranked,
            vec![("agua", 1, 160, QualityBand::Excellent), ("líquido", 2, 110, QualityBand::Good)]
        );
    }

    #[test]
    fn positions_skip_entries_that_do_not_resolve() {
        let pair = LanguagePair::new("es", "en");
        let group = WordGroup {
            id: 0,
            base_word: "agua".to_string(),
            word_forms: vec!["agua".to_string()],
            part_of_speech: None,
            source_language: "es".to_string(),
            target_language: "en".to_string(),
        };
        let meaning = |id: MeaningId, text: &str| Meaning {
            id,
            word_group_id: 0,
            meaning_order: id as u32 + 1,
            target_meaning: text.to_string(),
            context: None,
            part_of_speech: None,
            is_primary: id == 0,
        };
        let entry = |group: WordGroupId, meaning: MeaningId, order: u32, score: u32| ReverseLookupEntry {
            target_word: "water".to_string(),
            source_word_group_id: group,
            source_meaning_id: meaning,
            lookup_order: order,
            quality_score: score,
        };
        let index = LexiconIndex::assemble(
            &pair,
            vec![group],
            vec![meaning(0, "water"), meaning(1, "water supply")],
            vec![vec![0, 1]],
            vec![entry(0, 0, 1, 160), entry(5, 9, 2, 110), entry(0, 1, 3, 100)],
        );
        let lookup = MeaningResolver::from_index(index).unwrap().lookup_target_translations("water", "es", "en");

        let positions: Vec<_> = lookup.translations.iter().map(|t| (t.meaning_id, t.position, t.total)).collect();
        assert_eq!(positions, vec![(0, 1, 2), (1, 2, 2)]);
        assert_eq!(lookup.next_position(2), 1);
    }

    #[test]
    fn misses_and_unknown_pairs_are_empty() {
        let resolver = resolver();
        assert!(!resolver.word_exists("xyzzznotaword", "es", "en"));
        let lookup = resolver.lookup_source_meanings("xyzzznotaword", "es", "en");
        assert!(!lookup.has_results());
        assert!(lookup.meanings.is_empty());
        assert!(!resolver.lookup_source_meanings("frío", "zz", "en").has_results());
        assert!(!resolver.lookup_target_translations("water", "en", "es").has_results());
        assert!(resolver.word_exists("AGUAS", "ES", "EN"));
    }

    #[test]
    fn search_is_lazy_capped_and_restartable() {
        let resolver = resolver();
        let search = resolver.search_words("FR", "es", "en", 10).unwrap();
        let all: Vec<_> = search.clone().collect();
        assert_eq!(all, vec!["frío", "friolero"]);

        let mut capped = resolver.search_words("fr", "es", "en", 1).unwrap();
        assert_eq!(capped.next(), Some("frío"));
        assert_eq!(capped.next(), None);
        assert_eq!(capped.restart().collect::<Vec<_>>(), vec!["frío"]);

        assert!(resolver.search_words("", "es", "en", 5).unwrap().next().is_none());
        assert!(matches!(
            resolver.search_words("fr", "es", "en", 0),
            Err(LexiconError::InvalidInput(_))
        ));
    }

    #[test]
    fn grouped_meanings_use_the_strategy() {
        let resolver = resolver();
        let grouped = resolver.lookup_grouped_meanings("frío", "es", "en", &TokenOverlapGrouper::default());
        let positions: Vec<Vec<usize>> = grouped.iter().map(|g| g.iter().map(|m| m.position).collect()).collect();
        assert_eq!(positions, vec![vec![1, 3], vec![2]]);

        let ungrouped = resolver.lookup_grouped_meanings("frío", "es", "en", &NoGrouping);
        assert_eq!(ungrouped.len(), 3);
        assert!(resolver.lookup_grouped_meanings("nada", "es", "en", &NoGrouping).is_empty());
    }

    #[test]
    fn install_replaces_and_checks_schema() {
        let mut resolver = resolver();
        let (replacement, _) = LexiconBuilder::build_from_reader(
            LanguagePair::new("es", "en"),
            &LexiconConfig::default(),
            "casa\t<ol><li>house</li></ol>\n".as_bytes(),
        )
        .unwrap();
        let previous = resolver.install(replacement).unwrap();
        assert!(previous.is_some());
        assert!(resolver.word_exists("casa", "es", "en"));
        assert!(!resolver.word_exists("agua", "es", "en"));
        assert_eq!(resolver.installed_pairs(), vec![LanguagePair::new("es", "en")]);

        let mut stale = resolver.uninstall("es", "en").unwrap().metadata().clone();
        stale.schema_version = 2;
        assert!(matches!(
            MeaningResolver::check_schema(&stale),
            Err(LexiconError::SchemaMismatch { found: 2, required: MIN_SCHEMA_VERSION })
        ));
        assert!(resolver.installed_pairs().is_empty());
    }
}
