//! Counterfactual facet impact.
//!
//! For every facet the calculator answers: how many candidates would match
//! if this facet were added to the current selection?

use tracing::trace;

use crate::bitset::EntityIdSet;
use crate::index::CandidateIndex;
use crate::key::{GroupReference, ReferenceKey};
use crate::predicate::{EntityPredicate, FacetPredicate};
use crate::result::Impact;
use crate::selection::SelectionContext;

/// Computes [`Impact`] values against a fixed candidate index.
///
/// The base result (entities matching the current selection) is computed
/// once in [`new`](Self::new) and reused for every facet.
pub struct ImpactCalculator<'s, 'a> {
    selection: &'s SelectionContext<'a>,
    index: &'s CandidateIndex,
    base: EntityIdSet,
}

impl<'s, 'a> ImpactCalculator<'s, 'a> {
    /// Creates the calculator and evaluates the base predicate.
    pub fn new(selection: &'s SelectionContext<'a>, index: &'s CandidateIndex) -> Self {
        let base = selection.base_predicate().evaluate(index);
        Self {
            selection,
            index,
            base,
        }
    }

    /// Entities matching the current selection.
    pub fn base(&self) -> &EntityIdSet {
        &self.base
    }

    /// Predicate the facet is tested with.
    ///
    /// The facet joins the existing predicate of its group (or starts a new
    /// one). A group exclusive among other groups replaces the whole
    /// selection; otherwise the selection of the other groups is kept, apart
    /// from groups that are themselves exclusive among others, since adding
    /// this facet would deselect them.
    pub fn test_predicate(&self, key: &ReferenceKey, group: &GroupReference) -> EntityPredicate {
        let addition = EntityIdSet::single(key.primary_key);
        let hypothetical = match self.selection.existing_predicate(group) {
            Some(existing) => existing.combine(&addition),
            None => self.selection.factory().create_predicate(group.clone(), addition),
        };

        let relations = self.selection.factory().relations();
        if relations.is_exclusive_among_other_groups(group) {
            return EntityPredicate::Facet(hypothetical);
        }

        // exclusive groups are dropped, not OR-ed in as the combinator would
        let others: Vec<FacetPredicate> = self
            .selection
            .other_predicates(group)
            .filter(|predicate| !relations.is_exclusive_among_other_groups(predicate.group()))
            .cloned()
            .collect();
        self.selection
            .combinator()
            .combine(others.into_iter().chain(std::iter::once(hypothetical)))
    }

    /// Computes the impact of adding `key` (a facet of `group`) to the
    /// selection.
    pub fn impact_of(&self, key: &ReferenceKey, group: &GroupReference) -> Impact {
        let matching = self.test_predicate(key, group).evaluate(self.index);
        let new_count = matching.len();
        let delta = new_count as i64 - self.base.len() as i64;

        let has_sense = new_count > 0
            && (delta != 0
                || !self
                    .selection
                    .predicate_excluding_group(key, group)
                    .evaluate(self.index)
                    .is_empty());

        trace!(
            facet = %key,
            %group,
            delta,
            new_count,
            has_sense,
            "facet impact"
        );
        Impact {
            delta,
            new_count,
            has_sense,
        }
    }
}
