// File: src/vocabulary.rs
//! The learner's saved words and their review state.
//!
//! Items copy their text out of the lexicon instead of pointing at index
//! rows, so replacing or upgrading a language pack never invalidates them.
use crate::config::ReviewConfig;
use crate::error::{LexiconError, Result};
use crate::learning::{ReviewScheduler, SrsState};
use crate::persistence::{load_json, save_json};
use crate::resolver::{MeaningResult, TranslationResult};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub type ItemId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyItem {
    pub id: ItemId,
    pub source_text: String,
    pub translation: String,
    pub source_language: String,
    pub target_language: String,
    /// Sentence or snippet the word was saved from.
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub book_reference: Option<String>,
    #[serde(flatten)]
    pub srs: SrsState,
    #[serde(default)]
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the caller when saving a word.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewVocabularyItem {
    pub source_text: String,
    pub translation: String,
    pub source_language: String,
    pub target_language: String,
    pub context: Option<String>,
    pub book_reference: Option<String>,
}

impl NewVocabularyItem {
    /// Promotes a source-meaning lookup result.
    pub fn from_meaning(result: &MeaningResult, source_language: &str, target_language: &str) -> Self {
        Self {
            source_text: result.base_word.clone(),
            translation: result.display_text.clone(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            ..Self::default()
        }
    }

    /// Promotes a reverse-translation result.
    pub fn from_translation(result: &TranslationResult, source_language: &str, target_language: &str) -> Self {
        Self {
            source_text: result.source_word.clone(),
            translation: result.meaning_text.clone(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            ..Self::default()
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_book_reference(mut self, reference: impl Into<String>) -> Self {
        self.book_reference = Some(reference.into());
        self
    }
}

/// A mutation to write out before it is applied in memory.
enum Change<'a> {
    Upsert(&'a VocabularyItem),
    Remove(ItemId),
}

impl Change<'_> {
    fn id(&self) -> ItemId {
        match self {
            Change::Upsert(item) => item.id,
            Change::Remove(id) => *id,
        }
    }
}

/// Thread-safe vocabulary store.
///
/// Each item sits behind its own mutex so readers see whole items. Mutations
/// run one at a time under `write_lock`. When opened with a path, a mutation
/// is written to disk first and applied in memory only if the write
/// succeeded, so a failed call leaves the store unchanged and can be retried.
pub struct VocabularyStore {
    items: RwLock<HashMap<ItemId, Arc<Mutex<VocabularyItem>>>>,
    scheduler: ReviewScheduler,
    path: Option<PathBuf>,
    /// Taken before any item lock.
    write_lock: Mutex<()>,
}

impl VocabularyStore {
    pub fn in_memory(config: &ReviewConfig) -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            scheduler: ReviewScheduler::new(config),
            path: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Opens a file-backed store, loading it if the file exists.
    pub fn open(path: &Path, config: &ReviewConfig) -> Result<Self> {
        let mut store = Self::in_memory(config);
        store.path = Some(path.to_path_buf());

        if path.exists() {
            let items: Vec<VocabularyItem> = load_json(path)?;
            let map = store.items.get_mut();
            for item in items {
                map.insert(item.id, Arc::new(Mutex::new(item)));
            }
            info!("Loaded {} vocabulary items from {:?}", map.len(), path);
        } else {
            debug!("No vocabulary file at {:?}, starting empty", path);
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    fn handle(&self, id: ItemId) -> Result<Arc<Mutex<VocabularyItem>>> {
        self.items
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| LexiconError::NotFound(format!("vocabulary item {}", id)))
    }

    /// Snapshot of every item, oldest first.
    pub fn list(&self) -> Vec<VocabularyItem> {
        let mut items: Vec<VocabularyItem> = self.items.read().values().map(|item| item.lock().clone()).collect();
        sort_by_creation(&mut items);
        items
    }

    pub fn get(&self, id: ItemId) -> Option<VocabularyItem> {
        self.items.read().get(&id).map(|item| item.lock().clone())
    }

    pub fn add_vocabulary_item(&self, new_item: NewVocabularyItem) -> Result<VocabularyItem> {
        self.add_vocabulary_item_at(new_item, Utc::now())
    }

    pub fn add_vocabulary_item_at(&self, new_item: NewVocabularyItem, now: DateTime<Utc>) -> Result<VocabularyItem> {
        if new_item.source_text.trim().is_empty() || new_item.translation.trim().is_empty() {
            return Err(LexiconError::InvalidInput("source text and translation are required".to_string()));
        }
        let item = VocabularyItem {
            id: Uuid::new_v4(),
            source_text: new_item.source_text.trim().to_string(),
            translation: new_item.translation.trim().to_string(),
            source_language: new_item.source_language,
            target_language: new_item.target_language,
            context: new_item.context,
            book_reference: new_item.book_reference,
            srs: self.scheduler.initial_state(now),
            is_favorite: false,
            created_at: now,
        };

        let _write = self.write_lock.lock();
        self.write_through(&Change::Upsert(&item))?;
        self.items.write().insert(item.id, Arc::new(Mutex::new(item.clone())));
        debug!("Saved vocabulary item {} ({})", item.id, item.source_text);
        Ok(item)
    }

    pub fn get_items_due_for_review(&self, limit: usize) -> Result<Vec<VocabularyItem>> {
        self.get_items_due_for_review_at(limit, Utc::now())
    }

    /// Due items, earliest `next_review_at` first.
    pub fn get_items_due_for_review_at(&self, limit: usize, now: DateTime<Utc>) -> Result<Vec<VocabularyItem>> {
        if limit == 0 {
            return Err(LexiconError::InvalidInput("due-item limit must be positive".to_string()));
        }
        let mut due: Vec<VocabularyItem> = self
            .items
            .read()
            .values()
            .map(|item| item.lock().clone())
            .filter(|item| item.srs.is_due(now))
            .collect();
        due.sort_by(|a, b| {
            a.srs
                .next_review_at
                .cmp(&b.srs.next_review_at)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        due.truncate(limit);
        Ok(due)
    }

    pub fn record_review(&self, id: ItemId, correct: bool, quality: u8) -> Result<VocabularyItem> {
        self.record_review_at(id, correct, quality, Utc::now())
    }

    pub fn record_review_at(&self, id: ItemId, correct: bool, quality: u8, now: DateTime<Utc>) -> Result<VocabularyItem> {
        let _write = self.write_lock.lock();
        let handle = self.handle(id)?;
        let mut item = handle.lock();
        let mut updated = item.clone();
        updated.srs = self.scheduler.schedule(&item.srs, correct, quality, now)?;
        self.write_through(&Change::Upsert(&updated))?;
        *item = updated.clone();
        drop(item);

        debug!(
            "Reviewed {}: repetitions={} easiness={:.2} next={}",
            id, updated.srs.repetitions, updated.srs.easiness, updated.srs.next_review_at
        );
        Ok(updated)
    }

    pub fn toggle_favorite(&self, id: ItemId) -> Result<VocabularyItem> {
        let _write = self.write_lock.lock();
        let handle = self.handle(id)?;
        let mut item = handle.lock();
        let mut updated = item.clone();
        updated.is_favorite = !updated.is_favorite;
        self.write_through(&Change::Upsert(&updated))?;
        *item = updated.clone();
        Ok(updated)
    }

    pub fn delete(&self, id: ItemId) -> Result<()> {
        let _write = self.write_lock.lock();
        self.handle(id)?;
        self.write_through(&Change::Remove(id))?;
        self.items.write().remove(&id);
        Ok(())
    }

    /// Saves the store as it will look once `change` is applied. The item
    /// being changed is never locked here; its caller may hold that lock.
    fn write_through(&self, change: &Change<'_>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let changed = change.id();
        let mut snapshot: Vec<VocabularyItem> = self
            .items
            .read()
            .iter()
            .filter(|(id, _)| **id != changed)
            .map(|(_, item)| item.lock().clone())
            .collect();
        if let Change::Upsert(item) = change {
            snapshot.push((*item).clone());
        }
        sort_by_creation(&mut snapshot);
        save_json(&snapshot, path)
    }
}

fn sort_by_creation(items: &mut [VocabularyItem]) {
    items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}
