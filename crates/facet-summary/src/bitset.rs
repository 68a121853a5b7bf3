//! Roaring bitmap-based entity id sets.
//!
//! Candidate entities, the entities referencing a facet and the ids selected
//! in a facet filter are all kept as [`EntityIdSet`]s, so predicate
//! evaluation over a whole candidate set reduces to bitmap AND / OR / MINUS.
//!
//! # Example
//!
//! ```rust
//! use facet_summary::EntityIdSet;
//!
//! let red: EntityIdSet = [1, 2, 3].into_iter().collect();
//! let cheap: EntityIdSet = [2, 3, 4].into_iter().collect();
//!
//! assert_eq!(red.intersection(&cheap).to_vec(), vec![2, 3]);
//! assert_eq!(red.union(&cheap).len(), 4);
//! assert_eq!(red.difference(&cheap).to_vec(), vec![1]);
//! ```

use std::fmt;

use facet_query::PrimaryKey;
use roaring::RoaringBitmap;

/// A set of entity primary keys stored as a Roaring Bitmap.
#[derive(Clone, Default, PartialEq)]
pub struct EntityIdSet {
    bitmap: RoaringBitmap,
}

impl EntityIdSet {
    /// Creates a new empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set holding a single id.
    pub fn single(id: PrimaryKey) -> Self {
        let mut set = Self::new();
        set.insert(id);
        set
    }

    /// Inserts an id.
    ///
    /// Returns `true` if the id was newly inserted.
    pub fn insert(&mut self, id: PrimaryKey) -> bool {
        self.bitmap.insert(id)
    }

    /// Removes an id.
    ///
    /// Returns `true` if the id was present.
    pub fn remove(&mut self, id: PrimaryKey) -> bool {
        self.bitmap.remove(id)
    }

    /// Checks if an id is in the set.
    #[inline]
    pub fn contains(&self, id: PrimaryKey) -> bool {
        self.bitmap.contains(id)
    }

    /// Returns the number of ids in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.bitmap.len() as usize
    }

    /// Returns true if the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bitmap.is_empty()
    }

    /// Computes the intersection (AND) of two sets.
    pub fn intersection(&self, other: &EntityIdSet) -> EntityIdSet {
        Self {
            bitmap: &self.bitmap & &other.bitmap,
        }
    }

    /// Computes the union (OR) of two sets.
    pub fn union(&self, other: &EntityIdSet) -> EntityIdSet {
        Self {
            bitmap: &self.bitmap | &other.bitmap,
        }
    }

    /// Computes the difference (MINUS) of two sets.
    pub fn difference(&self, other: &EntityIdSet) -> EntityIdSet {
        Self {
            bitmap: &self.bitmap - &other.bitmap,
        }
    }

    /// In-place union.
    pub fn union_with(&mut self, other: &EntityIdSet) {
        self.bitmap |= &other.bitmap;
    }

    /// In-place intersection.
    pub fn intersect_with(&mut self, other: &EntityIdSet) {
        self.bitmap &= &other.bitmap;
    }

    /// Returns true if every id of `self` is also in `other`.
    pub fn is_subset(&self, other: &EntityIdSet) -> bool {
        self.bitmap.is_subset(&other.bitmap)
    }

    /// Returns the smallest id of the set.
    pub fn min(&self) -> Option<PrimaryKey> {
        self.bitmap.min()
    }

    /// Iterates ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = PrimaryKey> + '_ {
        self.bitmap.iter()
    }

    /// Returns the ids as a sorted Vec.
    pub fn to_vec(&self) -> Vec<PrimaryKey> {
        self.bitmap.iter().collect()
    }
}

impl fmt::Debug for EntityIdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.bitmap.iter()).finish()
    }
}

impl FromIterator<PrimaryKey> for EntityIdSet {
    fn from_iter<I: IntoIterator<Item = PrimaryKey>>(iter: I) -> Self {
        Self {
            bitmap: iter.into_iter().collect(),
        }
    }
}

impl Extend<PrimaryKey> for EntityIdSet {
    fn extend<I: IntoIterator<Item = PrimaryKey>>(&mut self, iter: I) {
        self.bitmap.extend(iter);
    }
}

impl<'a> IntoIterator for &'a EntityIdSet {
    type Item = PrimaryKey;
    type IntoIter = roaring::bitmap::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.bitmap.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[PrimaryKey]) -> EntityIdSet {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_insert_and_contains() {
        let mut ids = EntityIdSet::new();
        assert!(ids.insert(7));
        assert!(!ids.insert(7));
        assert!(ids.contains(7));
        assert!(!ids.contains(8));
        assert_eq!(ids.len(), 1);
        assert!(ids.remove(7));
        assert!(ids.is_empty());
    }

    #[test]
    fn test_set_operations() {
        let a = set(&[1, 2, 3, 10]);
        let b = set(&[3, 10, 11]);

        assert_eq!(a.intersection(&b).to_vec(), vec![3, 10]);
        assert_eq!(a.union(&b).to_vec(), vec![1, 2, 3, 10, 11]);
        assert_eq!(a.difference(&b).to_vec(), vec![1, 2]);
        assert!(set(&[3]).is_subset(&b));
        assert!(!a.is_subset(&b));
    }

    #[test]
    fn test_in_place_operations() {
        let mut a = set(&[1, 2]);
        a.union_with(&set(&[5]));
        assert_eq!(a.to_vec(), vec![1, 2, 5]);
        a.intersect_with(&set(&[2, 5, 9]));
        assert_eq!(a.to_vec(), vec![2, 5]);
        assert_eq!(a.min(), Some(2));
    }

    #[test]
    fn test_debug_lists_ids() {
        assert_eq!(format!("{:?}", set(&[4, 1])), "{1, 4}");
    }
}
