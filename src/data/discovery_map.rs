//! This module contains the definition of a map-like structure that remembers
//! the order in which its entries were first inserted.

use std::collections::HashMap;

/// A string-keyed map that preserves insertion order and keeps the _first_
/// value inserted for any given key.
///
/// Symbol tables built from flattened multi-file source commonly encounter
/// the same declaration repeatedly (identical interface structs pasted into
/// every file). The first definition wins, matching the order in which a
/// reader encounters the source, and iteration yields entries in insertion
/// order so that downstream output remains deterministic.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DiscoveryMap<V> {
    /// The entries, in the order in which they were first inserted.
    entries: Vec<(String, V)>,

    /// An index from key to position in `entries`.
    index: HashMap<String, usize>,
}

impl<V> DiscoveryMap<V> {
    /// Creates a new, empty, `DiscoveryMap`.
    #[must_use]
    pub fn new() -> Self {
        let entries = Vec::new();
        let index = HashMap::new();
        Self { entries, index }
    }

    /// Inserts `value` under `key` if no entry for `key` exists yet.
    ///
    /// Returns `true` if the value was inserted, and `false` if an earlier
    /// entry for `key` was kept instead.
    pub fn insert_first(&mut self, key: impl Into<String>, value: V) -> bool {
        let key = key.into();
        if self.index.contains_key(&key) {
            return false;
        }

        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        true
    }

    /// Gets the value stored under `key`, or [`None`] if there is no entry
    /// for `key` in the map.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|position| &self.entries[*position].1)
    }

    /// Checks whether the map contains an entry for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Iterates over the entries in the order in which they were first
    /// inserted.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Iterates over the keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Iterates over the values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, value)| value)
    }

    /// Gets the number of entries in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::DiscoveryMap;

    #[test]
    fn keeps_the_first_value_for_a_key() {
        let mut map = DiscoveryMap::new();
        assert!(map.insert_first("Order", "struct Order { uint256 a; }"));
        assert!(!map.insert_first("Order", "struct Order { bool b; }"));

        assert_eq!(map.get("Order"), Some(&"struct Order { uint256 a; }"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn iterates_in_insertion_order() {
        let mut map = DiscoveryMap::new();
        map.insert_first("c", 3);
        map.insert_first("a", 1);
        map.insert_first("b", 2);

        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
    }

    #[test]
    fn missing_keys_return_none() {
        let map: DiscoveryMap<u8> = DiscoveryMap::new();
        assert!(map.get("missing").is_none());
        assert!(!map.contains("missing"));
        assert!(map.is_empty());
    }
}
