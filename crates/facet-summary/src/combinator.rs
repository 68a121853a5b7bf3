//! Combination of single-group predicates into one entity predicate.

use facet_query::{RelationLevel, RelationType};

use crate::predicate::{EntityPredicate, FacetPredicate};
use crate::relation::RelationConfiguration;

/// Combines facet predicates of different groups.
///
/// Predicates are bucketed by the across-groups relation of their group and
/// reduced in a fixed order:
///
/// ```text
/// (AND(conjunctive) AND AND(negated) AND OR(exclusive)) OR OR(disjunctive)
/// ```
///
/// Exclusivity among groups is only approximated by the OR of the exclusive
/// bucket; keeping a single exclusive group selected is up to the client.
#[derive(Debug, Clone, Copy)]
pub struct PredicateCombinator<'a> {
    relations: &'a RelationConfiguration,
}

impl<'a> PredicateCombinator<'a> {
    /// Creates a combinator over the relation configuration.
    pub fn new(relations: &'a RelationConfiguration) -> Self {
        Self { relations }
    }

    /// Combines the predicates into a single entity predicate.
    ///
    /// An absent term is neutral for its operator, so with no predicates at
    /// all, or with only disjunctive groups, the result is
    /// [`EntityPredicate::Always`] (`TRUE OR ...` holds for every entity).
    pub fn combine<I>(&self, predicates: I) -> EntityPredicate
    where
        I: IntoIterator<Item = FacetPredicate>,
    {
        let mut conjunctive = Vec::new();
        let mut negated = Vec::new();
        let mut exclusive = Vec::new();
        let mut disjunctive = Vec::new();

        for predicate in predicates {
            let bucket = match self
                .relations
                .relation_type(RelationLevel::AcrossGroups, predicate.group())
            {
                RelationType::Conjunction => &mut conjunctive,
                RelationType::Negation => &mut negated,
                RelationType::Exclusivity => &mut exclusive,
                RelationType::Disjunction => &mut disjunctive,
            };
            bucket.push(EntityPredicate::Facet(predicate));
        }

        let mut required = conjunctive;
        required.append(&mut negated);
        if !exclusive.is_empty() {
            required.push(or_of(exclusive));
        }

        match (required.is_empty(), disjunctive.is_empty()) {
            (true, _) => EntityPredicate::Always,
            (false, true) => and_of(required),
            (false, false) => EntityPredicate::Or(vec![and_of(required), or_of(disjunctive)]),
        }
    }
}

fn and_of(mut predicates: Vec<EntityPredicate>) -> EntityPredicate {
    if predicates.len() == 1 {
        predicates.remove(0)
    } else {
        EntityPredicate::And(predicates)
    }
}

fn or_of(mut predicates: Vec<EntityPredicate>) -> EntityPredicate {
    if predicates.len() == 1 {
        predicates.remove(0)
    } else {
        EntityPredicate::Or(predicates)
    }
}
