//! Insertion-ordered weighted tally.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::ops::AddAssign;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Mapping from key to accumulated weight that remembers the order in
/// which each key was first seen.
///
/// First-seen order is the tie-break for [`Tally::ranked`], so two
/// tallies built from the same input always rank identically.
#[derive(Debug, Clone, PartialEq)]
pub struct Tally<K, V> {
    entries: Vec<(K, V)>,
}

impl<K, V> Default for Tally<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: PartialEq, V> Tally<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tally with every key present at the zero weight.
    pub fn seeded(keys: impl IntoIterator<Item = K>) -> Self
    where
        V: Default,
    {
        Self {
            entries: keys.into_iter().map(|k| (k, V::default())).collect(),
        }
    }

    /// Add `weight` to `key`, inserting it at the end if unseen.
    pub fn add(&mut self, key: K, weight: V)
    where
        V: AddAssign,
    {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, total)) => *total += weight,
            None => self.entries.push((key, weight)),
        }
    }

    /// Builder form of [`Tally::add`] for folds.
    pub fn with(mut self, key: K, weight: V) -> Self
    where
        V: AddAssign,
    {
        self.add(key, weight);
        self
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: PartialEq + ?Sized,
    {
        self.entries
            .iter()
            .find(|(k, _)| k.borrow() == key)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Entries by descending weight. The sort is stable: equal weights
    /// stay in first-seen order.
    pub fn ranked(&self) -> Vec<(&K, &V)>
    where
        V: PartialOrd,
    {
        let mut ranked: Vec<(&K, &V)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(Ordering::Equal));
        ranked
    }

    /// Key with the highest weight, earliest on ties.
    pub fn top(&self) -> Option<&K>
    where
        V: PartialOrd,
    {
        self.ranked().first().map(|(k, _)| *k)
    }

    /// Transform every weight, dropping entries mapped to `None`.
    pub fn filter_map_values<W>(self, mut f: impl FnMut(V) -> Option<W>) -> Tally<K, W> {
        Tally {
            entries: self
                .entries
                .into_iter()
                .filter_map(|(k, v)| f(v).map(|w| (k, w)))
                .collect(),
        }
    }

    pub fn into_entries(self) -> Vec<(K, V)> {
        self.entries
    }
}

impl<K: PartialEq, V: AddAssign> FromIterator<(K, V)> for Tally<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Tally::new(), |tally, (k, v)| tally.with(k, v))
    }
}

impl<K: Serialize, V: Serialize> Serialize for Tally<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de, K, V> Deserialize<'de> for Tally<K, V>
where
    K: Deserialize<'de>,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TallyVisitor<K, V>(PhantomData<(K, V)>);

        impl<'de, K, V> Visitor<'de> for TallyVisitor<K, V>
        where
            K: Deserialize<'de>,
            V: Deserialize<'de>,
        {
            type Value = Tally<K, V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of weights")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
                let mut entries = Vec::new();
                while let Some(entry) = access.next_entry()? {
                    entries.push(entry);
                }
                Ok(Tally { entries })
            }
        }

        deserializer.deserialize_map(TallyVisitor(PhantomData))
    }
}
