//! Keys identifying facets and facet groups.

use std::cmp::Ordering;
use std::fmt;

use facet_query::PrimaryKey;

/// Identifies one facet: a reference name plus the referenced primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferenceKey {
    /// Reference name.
    pub reference_name: String,
    /// Referenced entity primary key.
    pub primary_key: PrimaryKey,
}

impl ReferenceKey {
    /// Creates a new key.
    pub fn new(reference_name: impl Into<String>, primary_key: PrimaryKey) -> Self {
        Self {
            reference_name: reference_name.into(),
            primary_key,
        }
    }
}

impl fmt::Display for ReferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.reference_name, self.primary_key)
    }
}

/// Identifies one facet group. `group_id == None` stands for the facets of
/// an ungrouped reference, or, in relation overrides, for every group of the
/// reference.
///
/// Ordered by reference name, then present group ids ascending, then `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupReference {
    /// Reference name.
    pub reference_name: String,
    /// Group entity primary key.
    pub group_id: Option<PrimaryKey>,
}

impl GroupReference {
    /// Creates a new group reference.
    pub fn new(reference_name: impl Into<String>, group_id: Option<PrimaryKey>) -> Self {
        Self {
            reference_name: reference_name.into(),
            group_id,
        }
    }

    /// Group reference covering every group of the reference.
    pub fn any_group(reference_name: impl Into<String>) -> Self {
        Self::new(reference_name, None)
    }

    /// Returns the same reference with the group id dropped.
    pub fn without_group(&self) -> Self {
        Self::new(self.reference_name.clone(), None)
    }
}

/// Orders optional group ids so that a missing group sorts last.
pub fn compare_group_ids(left: Option<PrimaryKey>, right: Option<PrimaryKey>) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl Ord for GroupReference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.reference_name
            .cmp(&other.reference_name)
            .then_with(|| compare_group_ids(self.group_id, other.group_id))
    }
}

impl PartialOrd for GroupReference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for GroupReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.group_id {
            Some(group_id) => write!(f, "{}[{}]", self.reference_name, group_id),
            None => write!(f, "{}[*]", self.reference_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_reference_none_sorts_last() {
        let mut groups = vec![
            GroupReference::new("parameter", None),
            GroupReference::new("parameter", Some(9)),
            GroupReference::new("brand", None),
            GroupReference::new("parameter", Some(2)),
        ];
        groups.sort();
        assert_eq!(
            groups,
            vec![
                GroupReference::new("brand", None),
                GroupReference::new("parameter", Some(2)),
                GroupReference::new("parameter", Some(9)),
                GroupReference::new("parameter", None),
            ]
        );
    }

    #[test]
    fn test_compare_group_ids_is_symmetric() {
        assert_eq!(compare_group_ids(Some(1), None), Ordering::Less);
        assert_eq!(compare_group_ids(None, Some(1)), Ordering::Greater);
        assert_eq!(compare_group_ids(None, None), Ordering::Equal);
    }

    #[test]
    fn test_reference_key_order() {
        let mut keys = vec![
            ReferenceKey::new("brand", 5),
            ReferenceKey::new("assortment", 9),
            ReferenceKey::new("brand", 1),
        ];
        keys.sort();
        assert_eq!(keys[0], ReferenceKey::new("assortment", 9));
        assert_eq!(keys[1], ReferenceKey::new("brand", 1));
        assert_eq!(keys[2].to_string(), "brand:5");
    }
}
