//! Facet predicates.
//!
//! A [`FacetPredicate`] tests one facet group of an entity; an
//! [`EntityPredicate`] is the boolean tree the combinator builds from them.
//! Both are plain values with two evaluation modes that must agree:
//!
//! - [`matches`](EntityPredicate::matches) tests one entity,
//! - [`evaluate`](EntityPredicate::evaluate) computes the matching subset of
//!   a whole [`CandidateIndex`] with bitmap operations.

use std::fmt;

use facet_query::{PrimaryKey, RelationLevel, RelationType};

use crate::bitset::EntityIdSet;
use crate::index::CandidateIndex;
use crate::key::GroupReference;
use crate::relation::RelationConfiguration;
use crate::traits::FacetedEntity;

// =============================================================================
// Single group predicate
// =============================================================================

/// Selected facets of one group together with the within-group relation
/// they are combined with.
///
/// An entity is tested against all its references of the predicate's
/// reference name, regardless of the group they are held under.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetPredicate {
    relation: RelationType,
    group: GroupReference,
    facet_ids: EntityIdSet,
}

impl FacetPredicate {
    /// Creates a predicate with an explicit relation type.
    pub fn new(relation: RelationType, group: GroupReference, facet_ids: EntityIdSet) -> Self {
        Self {
            relation,
            group,
            facet_ids,
        }
    }

    /// Within-group relation type.
    pub fn relation(&self) -> RelationType {
        self.relation
    }

    /// Group the predicate covers.
    pub fn group(&self) -> &GroupReference {
        &self.group
    }

    /// Selected facet ids.
    pub fn facet_ids(&self) -> &EntityIdSet {
        &self.facet_ids
    }

    /// Returns a predicate with the additional facet ids.
    ///
    /// Ids are unioned and the relation kept, except for EXCLUSIVITY: only
    /// one facet of an exclusive group can be selected, so the new ids
    /// replace the old ones and the result is a plain DISJUNCTION.
    pub fn combine(&self, facet_ids: &EntityIdSet) -> FacetPredicate {
        match self.relation {
            RelationType::Exclusivity => FacetPredicate::new(
                RelationType::Disjunction,
                self.group.clone(),
                facet_ids.clone(),
            ),
            relation => {
                FacetPredicate::new(relation, self.group.clone(), self.facet_ids.union(facet_ids))
            }
        }
    }

    /// Tests one entity.
    pub fn matches<E: FacetedEntity + ?Sized>(&self, entity: &E) -> bool {
        let reference_name = self.group.reference_name.as_str();
        let mut referenced = entity
            .references()
            .iter()
            .filter(|reference| reference.reference_name == reference_name)
            .map(|reference| reference.referenced_primary_key);

        match self.relation {
            RelationType::Conjunction => {
                let held: EntityIdSet = referenced
                    .filter(|id| self.facet_ids.contains(*id))
                    .collect();
                held.len() == self.facet_ids.len()
            }
            RelationType::Disjunction | RelationType::Exclusivity => {
                referenced.any(|id| self.facet_ids.contains(id))
            }
            RelationType::Negation => !referenced.any(|id| self.facet_ids.contains(id)),
        }
    }

    /// Computes the matching subset of the candidate index.
    pub fn evaluate(&self, index: &CandidateIndex) -> EntityIdSet {
        let reference_name = self.group.reference_name.as_str();
        match self.relation {
            RelationType::Conjunction => {
                index.entities_referencing_all(reference_name, &self.facet_ids)
            }
            RelationType::Disjunction | RelationType::Exclusivity => {
                index.entities_referencing_any(reference_name, &self.facet_ids)
            }
            RelationType::Negation => index
                .all()
                .difference(&index.entities_referencing_any(reference_name, &self.facet_ids)),
        }
    }
}

impl fmt::Display for FacetPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operator = match self.relation {
            RelationType::Conjunction => "AND",
            RelationType::Disjunction => "OR",
            RelationType::Negation => "NOT",
            RelationType::Exclusivity => "XOR",
        };
        write!(f, "{} {} {:?}", self.group, operator, self.facet_ids)
    }
}

/// Creates single-group predicates tagged with the group's within-group
/// relation type.
#[derive(Debug, Clone, Copy)]
pub struct FacetPredicateFactory<'a> {
    relations: &'a RelationConfiguration,
}

impl<'a> FacetPredicateFactory<'a> {
    /// Creates a factory over the relation configuration.
    pub fn new(relations: &'a RelationConfiguration) -> Self {
        Self { relations }
    }

    /// Relation configuration the factory reads.
    pub fn relations(&self) -> &'a RelationConfiguration {
        self.relations
    }

    /// Creates the predicate for the given group and facet ids.
    pub fn create_predicate(&self, group: GroupReference, facet_ids: EntityIdSet) -> FacetPredicate {
        let relation = self
            .relations
            .relation_type(RelationLevel::WithinGroup, &group);
        FacetPredicate::new(relation, group, facet_ids)
    }

    /// Creates the predicate for a single facet.
    pub fn create_single(&self, group: GroupReference, facet_id: PrimaryKey) -> FacetPredicate {
        self.create_predicate(group, EntityIdSet::single(facet_id))
    }
}

// =============================================================================
// Whole entity predicate
// =============================================================================

/// Boolean combination of facet predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityPredicate {
    /// Matches every entity.
    Always,
    /// A single group predicate.
    Facet(FacetPredicate),
    /// All children match (empty = always).
    And(Vec<EntityPredicate>),
    /// Any child matches (empty = never).
    Or(Vec<EntityPredicate>),
}

impl EntityPredicate {
    /// Tests one entity.
    pub fn matches<E: FacetedEntity + ?Sized>(&self, entity: &E) -> bool {
        match self {
            EntityPredicate::Always => true,
            EntityPredicate::Facet(predicate) => predicate.matches(entity),
            EntityPredicate::And(children) => children.iter().all(|child| child.matches(entity)),
            EntityPredicate::Or(children) => children.iter().any(|child| child.matches(entity)),
        }
    }

    /// Computes the matching subset of the candidate index.
    pub fn evaluate(&self, index: &CandidateIndex) -> EntityIdSet {
        match self {
            EntityPredicate::Always => index.all().clone(),
            EntityPredicate::Facet(predicate) => predicate.evaluate(index),
            EntityPredicate::And(children) => {
                let mut result = index.all().clone();
                for child in children {
                    if result.is_empty() {
                        break;
                    }
                    result.intersect_with(&child.evaluate(index));
                }
                result
            }
            EntityPredicate::Or(children) => {
                let mut result = EntityIdSet::new();
                for child in children {
                    result.union_with(&child.evaluate(index));
                }
                result
            }
        }
    }
}

impl fmt::Display for EntityPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityPredicate::Always => write!(f, "TRUE"),
            EntityPredicate::Facet(predicate) => write!(f, "({})", predicate),
            EntityPredicate::And(children) | EntityPredicate::Or(children) => {
                let operator = if matches!(self, EntityPredicate::And(_)) {
                    " AND "
                } else {
                    " OR "
                };
                write!(f, "[")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(operator)?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, "]")
            }
        }
    }
}
