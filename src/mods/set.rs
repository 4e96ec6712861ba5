//! Unordered collections of mod IDs.
//!
//! Backed by a `BTreeSet` so that every iteration and every serialized form comes out in
//! lexicographic byte order. All of the search layers above rely on that determinism.

use crate::mods::ModId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display};

/// An unordered set of mod or capability IDs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModSet(BTreeSet<ModId>);

impl ModSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_slice(ids: &[ModId]) -> Self {
        ids.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    /// Insert an ID. Returns `true` if it was not already present.
    pub fn insert(&mut self, id: ModId) -> bool {
        self.0.insert(id)
    }

    /// Remove an ID. Returns `true` if it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        self.0.remove(id)
    }

    /// Iterate in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &ModId> {
        self.0.iter()
    }

    /// The IDs as a lexicographically sorted list.
    pub fn to_sorted_vec(&self) -> Vec<ModId> {
        self.0.iter().cloned().collect()
    }

    pub fn union(&self, other: &Self) -> Self {
        Self(self.0.union(&other.0).cloned().collect())
    }

    pub fn intersect(&self, other: &Self) -> Self {
        Self(self.0.intersection(&other.0).cloned().collect())
    }

    pub fn subtract(&self, other: &Self) -> Self {
        Self(self.0.difference(&other.0).cloned().collect())
    }
}

impl FromIterator<ModId> for ModSet {
    fn from_iter<I: IntoIterator<Item = ModId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a ModId> for ModSet {
    fn from_iter<I: IntoIterator<Item = &'a ModId>>(iter: I) -> Self {
        Self(iter.into_iter().cloned().collect())
    }
}

impl Extend<ModId> for ModSet {
    fn extend<I: IntoIterator<Item = ModId>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for ModSet {
    type Item = ModId;
    type IntoIter = std::collections::btree_set::IntoIter<ModId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Display for ModSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, id) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            f.write_str(id)?;
        }
        Ok(())
    }
}

/// Split an ordered candidate list into a leading half of `ceil(n/2)` elements and a trailing
/// half of `floor(n/2)` elements, preserving order.
pub fn split_half(ids: &[ModId]) -> (&[ModId], &[ModId]) {
    ids.split_at(ids.len().div_ceil(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(text: &str) -> Vec<ModId> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn sorted_output_is_lexicographic() {
        let set = ModSet::from_slice(&ids("zebra apple mango"));
        assert_eq!(set.to_sorted_vec(), ids("apple mango zebra"));
    }

    #[test]
    fn union_intersect_subtract() {
        let a = ModSet::from_slice(&ids("a b c"));
        let b = ModSet::from_slice(&ids("b c d"));

        assert_eq!(a.union(&b).to_sorted_vec(), ids("a b c d"));
        assert_eq!(a.intersect(&b).to_sorted_vec(), ids("b c"));
        assert_eq!(a.subtract(&b).to_sorted_vec(), ids("a"));
        assert_eq!(b.subtract(&a).to_sorted_vec(), ids("d"));
    }

    #[test]
    fn insert_and_remove_report_membership() {
        let mut set = ModSet::new();
        assert!(set.insert("a".to_string()));
        assert!(!set.insert("a".to_string()));
        assert!(set.remove("a"));
        assert!(!set.remove("a"));
    }

    #[test]
    fn split_is_balanced_and_stable() {
        for n in 1..=9usize {
            let list: Vec<ModId> = (0..n).map(|i| format!("mod_{i}")).collect();
            let (first, second) = split_half(&list);

            assert_eq!(first.len(), n.div_ceil(2));
            assert_eq!(second.len(), n / 2);
            assert_eq!([first, second].concat(), list);
        }
    }

    #[test]
    fn split_of_singleton() {
        let list = ids("only");
        let (first, second) = split_half(&list);
        assert_eq!(first, ids("only"));
        assert!(second.is_empty());
    }

    #[test]
    fn split_of_empty() {
        let (first, second) = split_half(&[]);
        assert!(first.is_empty());
        assert!(second.is_empty());
    }
}
