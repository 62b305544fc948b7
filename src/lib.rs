// src/lib.rs

pub mod builder;
pub mod config;
pub mod core;
pub mod error;
pub mod index;
pub mod learning;
pub mod persistence;
pub mod resolver;
pub mod vocabulary;

pub use crate::builder::{BuildReport, LexiconBuilder, RejectReason};
pub use crate::config::LexiconConfig;
pub use crate::core::grouping::{MeaningGrouper, NoGrouping, TokenOverlapGrouper};
pub use crate::core::types::{LanguagePair, Meaning, PartOfSpeech, ReverseLookupEntry, WordGroup};
pub use crate::error::{LexiconError, Result};
pub use crate::index::LexiconIndex;
pub use crate::learning::ReviewScheduler;
pub use crate::resolver::MeaningResolver;
pub use crate::vocabulary::{NewVocabularyItem, VocabularyItem, VocabularyStore};
