// --- File: src/core/trie.rs
use crate::core::types::WordGroupId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct FormNode {
    children: BTreeMap<u8, usize>,
    /// Groups that own the form ending at this node, in insertion order.
    word_group_ids: Vec<WordGroupId>,
}

/// Byte trie from lower-cased surface form to the WordGroups that list it.
///
/// Built once by the lexicon builder and read concurrently afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FormTrie {
    nodes: Vec<FormNode>,
    form_count: usize,
}

impl Default for FormTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl FormTrie {
    pub fn new() -> Self {
        Self { nodes: vec![FormNode::default()], form_count: 0 }
    }

    /// Number of distinct forms stored.
    pub fn len(&self) -> usize {
        self.form_count
    }

    pub fn is_empty(&self) -> bool {
        self.form_count == 0
    }

    /// Registers `form` (case-insensitively) as a surface form of `word_group_id`.
    /// O(k) in the key length.
    pub fn insert(&mut self, form: &str, word_group_id: WordGroupId) {
        let key = form.to_lowercase();
        let mut node_idx = 0;
        for &byte in key.as_bytes() {
            let next_idx = if let Some(&id) = self.nodes[node_idx].children.get(&byte) {
                id
            } else {
                let new_node_id = self.nodes.len();
                self.nodes.push(FormNode::default());
                self.nodes[node_idx].children.insert(byte, new_node_id);
                new_node_id
            };
            node_idx = next_idx;
        }

        let ids = &mut self.nodes[node_idx].word_group_ids;
        if ids.is_empty() {
            self.form_count += 1;
        }
        if !ids.contains(&word_group_id) {
            ids.push(word_group_id);
        }
    }

    fn find(&self, key: &str) -> Option<&FormNode> {
        let mut node_idx = 0;
        for &byte in key.as_bytes() {
            node_idx = *self.nodes.get(node_idx)?.children.get(&byte)?;
        }
        self.nodes.get(node_idx)
    }

    /// Groups listing `form` as a surface form, case-insensitively.
    pub fn get(&self, form: &str) -> &[WordGroupId] {
        self.find(&form.to_lowercase())
            .map(|node| node.word_group_ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, form: &str) -> bool {
        !self.get(form).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_ignore_case() {
        let mut trie = FormTrie::new();
        trie.insert("Frío", 0);
        trie.insert("fría", 0);
        trie.insert("frío", 3);

        assert_eq!(trie.get("FRÍO"), &[0, 3]);
        assert_eq!(trie.get("fría"), &[0]);
        assert_eq!(trie.len(), 2);
    }

    #[test]
    fn prefixes_and_misses_are_empty() {
        let mut trie = FormTrie::new();
        trie.insert("casa", 1);

        assert!(trie.get("cas").is_empty());
        assert!(trie.get("casas").is_empty());
        assert!(!trie.contains("xyz"));
        assert!(trie.contains("CASA"));
    }

    #[test]
    fn duplicate_insert_is_idempotent() {
        let mut trie = FormTrie::new();
        trie.insert("agua", 2);
        trie.insert("AGUA", 2);
        assert_eq!(trie.get("agua"), &[2]);
        assert_eq!(trie.len(), 1);
        assert!(!trie.is_empty());
    }

    #[test]
    fn dangling_child_links_read_as_misses() {
        let mut trie = FormTrie::new();
        trie.insert("agua", 2);
        trie.nodes[0].children.insert(b'z', 99);
        assert!(trie.get("zorro").is_empty());
        assert!(trie.get("z").is_empty());
    }
}
