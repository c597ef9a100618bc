//! Sparse sums: maps whose missing entries read as the identity.
//!
//! A [`SparseSum<K, V>`] stores only the keys that were explicitly
//! mentioned. Every lookup through [`SparseSum::get_or_empty`] answers
//! `V::empty()` for the rest, so two sums over different key sets can
//! be combined without first aligning them:
//!
//! - `(a ⊕ b)[k] = a[k] ⊕ b[k]` over the union of keys
//! - `(-a)[k] = -(a[k])`
//!
//! Keys are kept sorted, so iteration order is deterministic.

use std::collections::btree_map;
use std::collections::BTreeMap;

use crate::{AbelianGroup, CommutativeMonoid, Group, Monoid, Semigroup};

/// A sparse, sorted map with an implicit identity for absent keys.
///
/// # Examples
///
/// ```rust
/// use algebra_core::{Semigroup, SparseSum};
///
/// let mut a = SparseSum::new();
/// a.insert('x', 1.0);
///
/// let mut b = SparseSum::new();
/// b.insert('x', 2.0);
/// b.insert('y', -1.0);
///
/// let c = a.combine(&b);
/// assert_eq!(c.get_or_empty(&'x'), 3.0);
/// assert_eq!(c.get_or_empty(&'y'), -1.0);
/// assert_eq!(c.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SparseSum<K, V> {
    entries: BTreeMap<K, V>,
}

impl<K: Ord, V> SparseSum<K, V> {
    /// An empty sum (every key reads as the identity).
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Store `value` under `key`, returning the previous entry.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    /// The explicitly stored entry for `key`, if any.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Whether `key` has an explicit entry.
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of explicit entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no key has an explicit entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Explicit keys in ascending order.
    pub fn keys(&self) -> btree_map::Keys<'_, K, V> {
        self.entries.keys()
    }

    /// Explicit entries in ascending key order.
    pub fn iter(&self) -> btree_map::Iter<'_, K, V> {
        self.entries.iter()
    }

    /// Apply `f` to every explicit entry, keeping the key set.
    pub fn map_values<W>(&self, mut f: impl FnMut(&V) -> W) -> SparseSum<K, W>
    where
        K: Clone,
    {
        SparseSum {
            entries: self
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), f(v)))
                .collect(),
        }
    }
}

impl<K: Ord, V: Monoid + Clone> SparseSum<K, V> {
    /// The entry for `key`, or the identity when it is absent.
    pub fn get_or_empty(&self, key: &K) -> V {
        self.entries.get(key).cloned().unwrap_or_else(V::empty)
    }
}

impl<K: Ord, V> Default for SparseSum<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for SparseSum<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<K, V> IntoIterator for SparseSum<K, V> {
    type Item = (K, V);
    type IntoIter = btree_map::IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, K, V> IntoIterator for &'a SparseSum<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = btree_map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K: Ord + Clone, V: Semigroup + Clone> Semigroup for SparseSum<K, V> {
    fn combine(&self, other: &Self) -> Self {
        let mut entries = self.entries.clone();
        for (k, v) in &other.entries {
            match entries.get_mut(k) {
                Some(existing) => existing.combine_assign(v),
                None => {
                    entries.insert(k.clone(), v.clone());
                }
            }
        }
        Self { entries }
    }
}

impl<K: Ord + Clone, V: Semigroup + Clone> Monoid for SparseSum<K, V> {
    fn empty() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V: CommutativeMonoid + Clone> CommutativeMonoid for SparseSum<K, V> {}

impl<K: Ord + Clone, V: Group + Clone> Group for SparseSum<K, V> {
    fn inverse(&self) -> Self {
        self.map_values(V::inverse)
    }
}

impl<K: Ord + Clone, V: AbelianGroup + Clone> AbelianGroup for SparseSum<K, V> {}
