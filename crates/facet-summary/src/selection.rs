//! Facet selection of the query.
//!
//! The selection context reads every `facetHaving` constraint of the filter,
//! expands hierarchical selections, partitions the selected ids by facet
//! group and keeps one predicate per group. Everything downstream (base
//! predicate, impact tests, `requested` flags) is answered from here.

use std::collections::{BTreeMap, HashMap};

use facet_query::{FilterConstraint, PrimaryKey};
use tracing::{debug, warn};

use crate::bitset::EntityIdSet;
use crate::combinator::PredicateCombinator;
use crate::error::{FacetResult, FacetSummaryError};
use crate::key::{GroupReference, ReferenceKey};
use crate::predicate::{EntityPredicate, FacetPredicate, FacetPredicateFactory};
use crate::relation::RelationConfiguration;
use crate::schema::{EntitySchema, ReferenceSchema};
use crate::traits::{FacetGroupLookup, HierarchyLookup};
use crate::traverser::{HierarchyRefinement, HierarchyTraverser};

/// Facet selection of one query.
pub struct SelectionContext<'a> {
    factory: FacetPredicateFactory<'a>,
    combinator: PredicateCombinator<'a>,
    selected: BTreeMap<String, EntityIdSet>,
    existing: Vec<FacetPredicate>,
}

impl<'a> SelectionContext<'a> {
    /// Extracts the selection from the filter.
    ///
    /// # Errors
    ///
    /// - [`FacetSummaryError::UnknownReferenceSchema`] for a `facetHaving`
    ///   naming an undeclared reference
    /// - [`FacetSummaryError::MalformedFacetFilter`] for children other than
    ///   id sets and one hierarchy refinement, or for refinements on
    ///   non-hierarchical references
    pub fn new(
        schema: &EntitySchema,
        filter: Option<&FilterConstraint>,
        relations: &'a RelationConfiguration,
        groups: &dyn FacetGroupLookup,
        hierarchy: &dyn HierarchyLookup,
    ) -> FacetResult<Self> {
        let factory = FacetPredicateFactory::new(relations);
        let combinator = PredicateCombinator::new(relations);

        let mut selected: BTreeMap<String, EntityIdSet> = BTreeMap::new();
        if let Some(filter) = filter {
            for constraint in filter.facet_having_constraints() {
                if let FilterConstraint::FacetHaving {
                    reference_name,
                    children,
                } = constraint
                {
                    let reference = schema.reference_or_err(reference_name)?;
                    let ids = extract_facet_ids(reference, children, hierarchy)?;
                    selected
                        .entry(reference_name.clone())
                        .or_default()
                        .union_with(&ids);
                }
            }
        }

        let mut existing = Vec::new();
        for (reference_name, ids) in &selected {
            if ids.is_empty() {
                continue;
            }
            let reference = schema.reference_or_err(reference_name)?;
            for (group_id, facet_ids) in partition_by_group(reference, ids, groups) {
                existing.push(
                    factory.create_predicate(
                        GroupReference::new(reference_name.as_str(), group_id),
                        facet_ids,
                    ),
                );
            }
        }

        debug!(
            references = selected.len(),
            predicates = existing.len(),
            "extracted facet selection"
        );

        Ok(Self {
            factory,
            combinator,
            selected,
            existing,
        })
    }

    /// One predicate per selected (reference, group) pair.
    pub fn existing_predicates(&self) -> &[FacetPredicate] {
        &self.existing
    }

    /// Existing predicate of the group, if any of its facets is selected.
    pub fn existing_predicate(&self, group: &GroupReference) -> Option<&FacetPredicate> {
        self.existing
            .iter()
            .find(|predicate| predicate.group() == group)
    }

    /// Existing predicates of all other groups.
    pub fn other_predicates<'s>(
        &'s self,
        group: &'s GroupReference,
    ) -> impl Iterator<Item = &'s FacetPredicate> + 's {
        self.existing
            .iter()
            .filter(move |predicate| predicate.group() != group)
    }

    /// Predicate matching the entities the query's facet selection accepts.
    pub fn base_predicate(&self) -> EntityPredicate {
        self.combinator.combine(self.existing.iter().cloned())
    }

    /// Returns true if the facet is part of the selection (after hierarchy
    /// expansion).
    pub fn was_requested(&self, key: &ReferenceKey) -> bool {
        self.selected
            .get(&key.reference_name)
            .is_some_and(|ids| ids.contains(key.primary_key))
    }

    /// Selected ids of a reference.
    pub fn selected_ids(&self, reference_name: &str) -> Option<&EntityIdSet> {
        self.selected.get(reference_name)
    }

    /// Predicate selecting only `key` in its own group, combined with the
    /// selection of every other group.
    pub fn predicate_excluding_group(
        &self,
        key: &ReferenceKey,
        group: &GroupReference,
    ) -> EntityPredicate {
        let fresh = self.factory.create_single(group.clone(), key.primary_key);
        self.combinator.combine(
            self.other_predicates(group)
                .cloned()
                .chain(std::iter::once(fresh)),
        )
    }

    /// Predicate factory bound to the query's relations.
    pub fn factory(&self) -> &FacetPredicateFactory<'a> {
        &self.factory
    }

    /// Predicate combinator bound to the query's relations.
    pub fn combinator(&self) -> &PredicateCombinator<'a> {
        &self.combinator
    }
}

/// Reads the selected ids of one `facetHaving` constraint.
///
/// Accepted children are any number of `entityPrimaryKeyInSet` and at most
/// one hierarchy refinement, the latter only on hierarchical references.
pub fn extract_facet_ids(
    reference: &ReferenceSchema,
    children: &[FilterConstraint],
    hierarchy: &dyn HierarchyLookup,
) -> FacetResult<EntityIdSet> {
    let malformed = |message: String| FacetSummaryError::MalformedFacetFilter {
        reference_name: reference.name.clone(),
        message,
    };

    let mut ids = EntityIdSet::new();
    let mut refinement = None;
    for child in children {
        match child {
            FilterConstraint::EntityPrimaryKeyInSet(keys) => ids.extend(keys.iter().copied()),
            FilterConstraint::IncludingChildren
            | FilterConstraint::IncludingChildrenHaving(_)
            | FilterConstraint::IncludingChildrenExcept(_) => {
                if !reference.hierarchical {
                    return Err(malformed(format!(
                        "{} requires a hierarchical reference",
                        child.name()
                    )));
                }
                if refinement.is_some() {
                    return Err(malformed(
                        "at most one hierarchy refinement is allowed".to_string(),
                    ));
                }
                refinement = Some(compile_refinement(child, &malformed)?);
            }
            other => {
                return Err(malformed(format!(
                    "unexpected {}, expected entityPrimaryKeyInSet",
                    other
                )))
            }
        }
    }

    match refinement {
        Some(refinement) => {
            let traverser = HierarchyTraverser::new(hierarchy, &reference.referenced_entity_type);
            Ok(traverser.expand(&ids, &refinement))
        }
        None => Ok(ids),
    }
}

fn compile_refinement(
    constraint: &FilterConstraint,
    malformed: &dyn Fn(String) -> FacetSummaryError,
) -> FacetResult<HierarchyRefinement> {
    let collect = |children: &[FilterConstraint]| -> FacetResult<EntityIdSet> {
        let mut ids = EntityIdSet::new();
        for child in children {
            match child {
                FilterConstraint::EntityPrimaryKeyInSet(keys) => ids.extend(keys.iter().copied()),
                other => {
                    return Err(malformed(format!(
                        "unexpected {} in {}, expected entityPrimaryKeyInSet",
                        other,
                        constraint.name()
                    )))
                }
            }
        }
        Ok(ids)
    };

    match constraint {
        FilterConstraint::IncludingChildrenHaving(children) => {
            Ok(HierarchyRefinement::Having(collect(children)?))
        }
        FilterConstraint::IncludingChildrenExcept(children) => {
            Ok(HierarchyRefinement::Except(collect(children)?))
        }
        _ => Ok(HierarchyRefinement::All),
    }
}

/// Splits selected ids of a reference by facet group.
///
/// Ungrouped references produce a single `None` group.
fn partition_by_group(
    reference: &ReferenceSchema,
    ids: &EntityIdSet,
    groups: &dyn FacetGroupLookup,
) -> Vec<(Option<PrimaryKey>, EntityIdSet)> {
    if !reference.is_grouped() {
        return vec![(None, ids.clone())];
    }

    let mut partitions: HashMap<Option<PrimaryKey>, EntityIdSet> = HashMap::new();
    for facet_id in ids {
        let group_id = groups.group_of(&reference.name, facet_id);
        if group_id.is_none() {
            warn!(
                reference = %reference.name,
                facet_id,
                "selected facet has no resolvable group"
            );
        }
        partitions.entry(group_id).or_default().insert(facet_id);
    }

    let mut partitions: Vec<_> = partitions.into_iter().collect();
    partitions.sort_by(|(left, _), (right, _)| crate::key::compare_group_ids(*left, *right));
    partitions
}
