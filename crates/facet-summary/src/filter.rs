//! Primary key filters compiled from `filterBy` / `filterGroupBy` clauses.

use facet_query::{FilterConstraint, PrimaryKey};

use crate::bitset::EntityIdSet;
use crate::error::{FacetResult, FacetSummaryError};

/// A boolean test on a single primary key.
#[derive(Debug, Clone, PartialEq)]
pub enum IdFilter {
    /// Key is one of the ids.
    Ids(EntityIdSet),
    /// All children match.
    And(Vec<IdFilter>),
    /// Any child matches.
    Or(Vec<IdFilter>),
    /// Child does not match.
    Not(Box<IdFilter>),
}

impl IdFilter {
    /// Compiles a filter constraint.
    ///
    /// Only `entityPrimaryKeyInSet`, `and`, `or` and `not` can be evaluated
    /// without entity bodies; anything else is rejected.
    pub fn compile(constraint: &FilterConstraint) -> FacetResult<Self> {
        match constraint {
            FilterConstraint::EntityPrimaryKeyInSet(ids) => {
                Ok(IdFilter::Ids(ids.iter().copied().collect()))
            }
            FilterConstraint::And(children) => Ok(IdFilter::And(Self::compile_all(children)?)),
            FilterConstraint::Or(children) => Ok(IdFilter::Or(Self::compile_all(children)?)),
            FilterConstraint::Not(child) => Ok(IdFilter::Not(Box::new(Self::compile(child)?))),
            other => Err(FacetSummaryError::UnsupportedConstraint(other.to_string())),
        }
    }

    fn compile_all(children: &[FilterConstraint]) -> FacetResult<Vec<IdFilter>> {
        children.iter().map(Self::compile).collect()
    }

    /// Tests a primary key.
    pub fn matches(&self, primary_key: PrimaryKey) -> bool {
        match self {
            IdFilter::Ids(ids) => ids.contains(primary_key),
            IdFilter::And(children) => children.iter().all(|child| child.matches(primary_key)),
            IdFilter::Or(children) => children.iter().any(|child| child.matches(primary_key)),
            IdFilter::Not(child) => !child.matches(primary_key),
        }
    }

    /// Enumerates the matching ids when the filter is bounded.
    ///
    /// Returns `None` for filters that match an unbounded key space, such as
    /// a top-level `not`.
    pub fn enumerate(&self) -> Option<EntityIdSet> {
        match self {
            IdFilter::Ids(ids) => Some(ids.clone()),
            IdFilter::Or(children) => {
                let mut result = EntityIdSet::new();
                for child in children {
                    result.union_with(&child.enumerate()?);
                }
                Some(result)
            }
            IdFilter::And(children) => {
                let (bounded, unbounded): (Vec<_>, Vec<_>) = children
                    .iter()
                    .map(|child| (child, child.enumerate()))
                    .partition(|(_, ids)| ids.is_some());
                let mut bounded = bounded.into_iter().filter_map(|(_, ids)| ids);
                let mut result = bounded.next()?;
                for ids in bounded {
                    result.intersect_with(&ids);
                }
                for (child, _) in unbounded {
                    result = result.iter().filter(|id| child.matches(*id)).collect();
                }
                Some(result)
            }
            IdFilter::Not(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_and_match() {
        let filter = IdFilter::compile(&FilterConstraint::And(vec![
            FilterConstraint::primary_keys([1, 2, 3]),
            FilterConstraint::Not(Box::new(FilterConstraint::primary_keys([2]))),
        ]))
        .unwrap();
        assert!(filter.matches(1));
        assert!(!filter.matches(2));
        assert!(!filter.matches(4));
    }

    #[test]
    fn test_compile_rejects_attribute_filter() {
        let result = IdFilter::compile(&FilterConstraint::attribute_equals("code", "x"));
        assert!(matches!(
            result,
            Err(FacetSummaryError::UnsupportedConstraint(text)) if text == "attributeEquals('code', 'x')"
        ));
    }

    #[test]
    fn test_enumerate() {
        let bounded = IdFilter::compile(&FilterConstraint::Or(vec![
            FilterConstraint::primary_keys([1]),
            FilterConstraint::primary_keys([5]),
        ]))
        .unwrap();
        assert_eq!(bounded.enumerate().map(|ids| ids.to_vec()), Some(vec![1, 5]));

        let narrowed = IdFilter::compile(&FilterConstraint::And(vec![
            FilterConstraint::primary_keys([1, 2, 3]),
            FilterConstraint::Not(Box::new(FilterConstraint::primary_keys([2]))),
        ]))
        .unwrap();
        assert_eq!(narrowed.enumerate().map(|ids| ids.to_vec()), Some(vec![1, 3]));

        let unbounded = IdFilter::compile(&FilterConstraint::Not(Box::new(
            FilterConstraint::primary_keys([2]),
        )))
        .unwrap();
        assert!(unbounded.enumerate().is_none());
    }
}
