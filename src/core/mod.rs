// src/core/mod.rs
pub mod grouping;
pub mod markup;
pub mod normalize;
pub mod scoring;
pub mod trie;
pub mod types;
