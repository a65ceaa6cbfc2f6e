//! An insertion-ordered keyed table.
//!
//! Every mapping returned by this crate (policies, value functions, reward and
//! transition tables) iterates in the order the model declares its states and
//! actions, while still supporting keyed lookup. Storage is an [`IndexMap`];
//! unlike `IndexMap` itself, two tables are only equal if their entries also
//! appear in the same order.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::hash::Hash;

/// A map that remembers insertion order.
#[derive(Debug, Clone)]
pub struct KeyedTable<K, V>(IndexMap<K, V>);

impl<K, V> KeyedTable<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(IndexMap::with_capacity(capacity))
    }

    /// Inserts a value. Replacing an existing key keeps its original position
    /// and returns the previous value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.0.insert(key, value)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.0.get(key)
    }

    /// Entry at `index` in insertion order.
    pub fn get_index(&self, index: usize) -> Option<(&K, &V)> {
        self.0.get_index(index)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, K, V> {
        self.0.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, K, V> {
        self.0.keys()
    }

    pub fn values(&self) -> indexmap::map::Values<'_, K, V> {
        self.0.values()
    }

    pub fn as_index_map(&self) -> &IndexMap<K, V> {
        &self.0
    }

    pub fn into_index_map(self) -> IndexMap<K, V> {
        self.0
    }

    /// Drops the ordering and returns a plain `HashMap`.
    pub fn into_hash_map(self) -> HashMap<K, V> {
        self.0.into_iter().collect()
    }
}

impl<K, V> Default for KeyedTable<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> PartialEq for KeyedTable<K, V>
where
    K: PartialEq,
    V: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().eq(other.0.iter())
    }
}

impl<K, V> From<IndexMap<K, V>> for KeyedTable<K, V> {
    fn from(map: IndexMap<K, V>) -> Self {
        Self(map)
    }
}

impl<K, V> FromIterator<(K, V)> for KeyedTable<K, V>
where
    K: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(IndexMap::from_iter(iter))
    }
}

impl<K, V> IntoIterator for KeyedTable<K, V> {
    type Item = (K, V);
    type IntoIter = indexmap::map::IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, K, V> IntoIterator for &'a KeyedTable<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = indexmap::map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
