use chrono::{Duration, TimeZone, Utc};
use lexicon_core::config::ReviewConfig;
use lexicon_core::persistence::{load_index, save_index};
use lexicon_core::{
    LanguagePair, LexiconBuilder, LexiconConfig, LexiconError, MeaningResolver, NewVocabularyItem, VocabularyStore,
};
use tempfile::TempDir;

const ES_EN: &str = "\
# es-en sample
agua|aguas\t<i>noun</i><ol><li>water</li><li>(figuratively) rain</li></ol>
líquido|líquidos\t<i>noun</i><ol><li>liquid</li><li>water</li></ol>
frío|fría|fríos\t<i>adj</i><ol><li>cold</li><li>(figuratively) unfriendly</li></ol><i>noun</i><ol><li>cold, chill</li></ol>
friolero\t<i>adj</i><ol><li>sensitive to cold</li></ol>
ONU\t<ol><li>UN</li></ol>
";

fn build_es_en() -> lexicon_core::LexiconIndex {
    let (index, report) =
        LexiconBuilder::build_from_reader(LanguagePair::new("es", "en"), &LexiconConfig::default(), ES_EN.as_bytes())
            .unwrap();
    assert_eq!(report.accepted, 4);
    assert_eq!(report.rejected, 1);
    index
}

#[test]
fn built_index_survives_disk_and_answers_both_directions() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("es-en.lexidx");
    save_index(&build_es_en(), &path).unwrap();

    let index = load_index(&path).unwrap();
    assert!(index.verify().is_valid());
    let resolver = MeaningResolver::from_index(index).unwrap();

    let frio = resolver.lookup_source_meanings("Fríos", "es", "en");
    assert!(frio.has_results());
    assert_eq!(frio.meanings.len(), 3);
    assert_eq!(frio.meanings[0].display_text, "cold");
    assert!(frio.meanings[0].is_primary);
    assert_eq!(frio.meanings[1].expanded_text, "unfriendly (figuratively)");
    assert_eq!(frio.meanings[2].part_of_speech_tag.as_deref(), Some("(n.)"));

    let water = resolver.lookup_target_translations("Water", "es", "en");
    let ranked: Vec<(&str, u32)> = water.translations.iter().map(|t| (t.source_word.as_str(), t.lookup_order)).collect();
    assert_eq!(ranked, vec![("agua", 1), ("líquido", 2)]);
    assert!(water.translations[0].quality_score > water.translations[1].quality_score);

    let cold = resolver.lookup_target_translations("cold", "es", "en");
    assert_eq!(cold.translations[0].source_word, "frío");
}

#[test]
fn english_headword_round_trip_keeps_source_order() {
    let source = "cold\t<i>adj</i><ol><li>frío</li><li>helado</li><li>gélido</li></ol>\n";
    let (index, _) =
        LexiconBuilder::build_from_reader(LanguagePair::new("en", "es"), &LexiconConfig::default(), source.as_bytes())
            .unwrap();
    let resolver = MeaningResolver::from_index(index).unwrap();

    let lookup = resolver.lookup_source_meanings("cold", "en", "es");
    let texts: Vec<&str> = lookup.meanings.iter().map(|m| m.display_text.as_str()).collect();
    assert_eq!(texts, vec!["frío", "helado", "gélido"]);
    assert!(lookup.meanings[0].is_primary);
    assert!(lookup.meanings[1..].iter().all(|m| !m.is_primary));
}

#[test]
fn misses_are_empty_values() {
    let resolver = MeaningResolver::from_index(build_es_en()).unwrap();
    assert!(!resolver.word_exists("xyzzznotaword", "es", "en"));

    let lookup = resolver.lookup_source_meanings("xyzzznotaword", "es", "en");
    assert!(!lookup.has_results());
    assert!(lookup.meanings.is_empty());

    assert!(!resolver.lookup_target_translations("xyzzznotaword", "es", "en").has_results());
    assert!(!resolver.lookup_source_meanings("agua", "fr", "en").has_results());
}

#[test]
fn promoted_meaning_is_scheduled_and_persisted() {
    let dir = TempDir::new().unwrap();
    let vocab_path = dir.path().join("vocabulary.json");
    let config = ReviewConfig::default();
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();

    let resolver = MeaningResolver::from_index(build_es_en()).unwrap();
    let lookup = resolver.lookup_source_meanings("agua", "es", "en");
    let agua = lookup.at(1).unwrap();

    let store = VocabularyStore::open(&vocab_path, &config).unwrap();
    let saved = store
        .add_vocabulary_item_at(NewVocabularyItem::from_meaning(agua, "es", "en").with_book_reference("ch. 3"), now)
        .unwrap();
    assert_eq!(saved.source_text, "agua");
    assert_eq!(saved.translation, "water");
    assert_eq!(saved.srs.repetitions, 0);

    let later = now + Duration::days(1);
    let reviewed = store.record_review_at(saved.id, true, 5, later).unwrap();
    assert_eq!(reviewed.srs.repetitions, 1);
    assert!((reviewed.srs.easiness - 2.6).abs() < 1e-9);
    assert_eq!(reviewed.srs.next_review_at, later + Duration::days(1));

    drop(store);
    let reopened = VocabularyStore::open(&vocab_path, &config).unwrap();
    let item = reopened.get(saved.id).unwrap();
    assert_eq!(item.srs, reviewed.srs);
    assert_eq!(item.book_reference.as_deref(), Some("ch. 3"));
}

#[test]
fn reverse_candidate_can_be_saved() {
    let resolver = MeaningResolver::from_index(build_es_en()).unwrap();
    let water = resolver.lookup_target_translations("water", "es", "en");
    let runner_up = water.at(2).unwrap();

    let store = VocabularyStore::in_memory(&ReviewConfig::default());
    let saved = store
        .add_vocabulary_item(NewVocabularyItem::from_translation(runner_up, "es", "en").with_context("un vaso de agua"))
        .unwrap();
    assert_eq!(saved.source_text, "líquido");
    assert_eq!(saved.translation, "water");
    assert_eq!((saved.source_language.as_str(), saved.target_language.as_str()), ("es", "en"));
    assert_eq!(saved.context.as_deref(), Some("un vaso de agua"));
}

#[test]
fn due_list_prefers_the_earliest_item() {
    let store = VocabularyStore::in_memory(&ReviewConfig::default());
    let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let first = store
        .add_vocabulary_item_at(
            NewVocabularyItem { source_text: "agua".into(), translation: "water".into(), ..Default::default() },
            t0,
        )
        .unwrap();
    store
        .add_vocabulary_item_at(
            NewVocabularyItem { source_text: "frío".into(), translation: "cold".into(), ..Default::default() },
            t0 + Duration::hours(2),
        )
        .unwrap();

    let due = store.get_items_due_for_review_at(1, t0 + Duration::days(3)).unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, first.id);

    assert!(matches!(
        store.record_review_at(uuid::Uuid::new_v4(), true, 4, t0),
        Err(LexiconError::NotFound(_))
    ));
}
