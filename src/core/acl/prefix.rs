//! Prefix-indexed rule storage.
//!
//! Offers exact lookup and longest-prefix lookup over string keys.

use std::collections::BTreeMap;

/// Ordered map keyed by path prefix.
#[derive(Debug, Clone)]
pub struct PrefixTree<V> {
    entries: BTreeMap<String, V>,
}

impl<V> PrefixTree<V> {
    pub fn new() -> Self {
        PrefixTree {
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        self.entries.insert(key.into(), value)
    }

    /// Finds the entry whose key is the longest prefix of `key`.
    ///
    /// An entry keyed by the empty string is a prefix of every key.
    pub fn longest_prefix(&self, key: &str) -> Option<(&str, &V)> {
        if self.entries.is_empty() {
            return None;
        }

        let mut end = key.len();
        loop {
            if key.is_char_boundary(end) {
                if let Some((k, v)) = self.entries.get_key_value(&key[..end]) {
                    return Some((k.as_str(), v));
                }
            }
            if end == 0 {
                return None;
            }
            end -= 1;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<V> Default for PrefixTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_lookup() {
        let mut tree = PrefixTree::new();
        tree.insert("secret/foo", 1);

        assert_eq!(tree.get("secret/foo"), Some(&1));
        assert_eq!(tree.get("secret/fo"), None);
        assert_eq!(tree.get("secret/foo/bar"), None);
    }

    #[test]
    fn test_longest_prefix_wins() {
        let mut tree = PrefixTree::new();
        tree.insert("a/", "short");
        tree.insert("a/b/", "long");

        assert_eq!(tree.longest_prefix("a/b/c"), Some(("a/b/", &"long")));
        assert_eq!(tree.longest_prefix("a/c"), Some(("a/", &"short")));
        assert_eq!(tree.longest_prefix("a/b/"), Some(("a/b/", &"long")));
        assert_eq!(tree.longest_prefix("b/"), None);
    }

    #[test]
    fn test_prefix_is_not_segment_aware() {
        let mut tree = PrefixTree::new();
        tree.insert("secret/fo", ());

        assert!(tree.longest_prefix("secret/foo").is_some());
        assert!(tree.longest_prefix("secret/f").is_none());
    }

    #[test]
    fn test_empty_key_matches_everything() {
        let mut tree = PrefixTree::new();
        tree.insert("", 0);
        tree.insert("sys/", 1);

        assert_eq!(tree.longest_prefix("anything"), Some(("", &0)));
        assert_eq!(tree.longest_prefix("sys/mounts"), Some(("sys/", &1)));
        assert_eq!(tree.longest_prefix(""), Some(("", &0)));
    }

    #[test]
    fn test_multibyte_keys() {
        let mut tree = PrefixTree::new();
        tree.insert("kv/日本", 1);

        assert_eq!(tree.longest_prefix("kv/日本語"), Some(("kv/日本", &1)));
        assert_eq!(tree.longest_prefix("kv/日"), None);
    }

    #[test]
    fn test_insert_replaces() {
        let mut tree = PrefixTree::new();
        assert_eq!(tree.insert("k", 1), None);
        assert_eq!(tree.insert("k", 2), Some(1));
        assert_eq!(tree.len(), 1);
        assert!(!tree.is_empty());
    }
}
