//! Resolution of facet relation types.
//!
//! A relation type is looked up for a (level, group) pair in three steps:
//!
//! 1. explicit override for the exact group,
//! 2. explicit override for the whole reference (`group_id == None`),
//! 3. the default of the level.
//!
//! Overrides come from `facetGroups*` directives of the query, defaults from
//! `facetCalculationRules` or, without it, from [`SummaryConfig`].

use std::collections::HashMap;

use facet_query::{RelationLevel, RelationType, RequireConstraint};
use tracing::{debug, trace};

use crate::config::SummaryConfig;
use crate::error::{FacetResult, FacetSummaryError};
use crate::filter::IdFilter;
use crate::key::GroupReference;
use crate::schema::EntitySchema;

/// Relation types of facet groups for one computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationConfiguration {
    within_group_default: RelationType,
    across_groups_default: RelationType,
    overrides: HashMap<(RelationLevel, GroupReference), RelationType>,
}

impl Default for RelationConfiguration {
    fn default() -> Self {
        Self::new(RelationType::Disjunction, RelationType::Conjunction)
    }
}

impl RelationConfiguration {
    /// Creates a configuration with the given level defaults and no overrides.
    pub fn new(within_group_default: RelationType, across_groups_default: RelationType) -> Self {
        Self {
            within_group_default,
            across_groups_default,
            overrides: HashMap::new(),
        }
    }

    /// Builds the configuration from the require constraints of a query.
    ///
    /// # Errors
    ///
    /// - [`FacetSummaryError::UnknownReferenceSchema`] for a directive naming
    ///   an undeclared reference
    /// - [`FacetSummaryError::UnsupportedConstraint`] for a group filter that
    ///   does not reduce to a bounded id set
    pub fn from_require(
        require: &[RequireConstraint],
        schema: &EntitySchema,
        config: &SummaryConfig,
    ) -> FacetResult<Self> {
        let mut relations = Self::new(config.default_facet_relation, config.default_group_relation);

        for constraint in require {
            match constraint {
                RequireConstraint::FacetCalculationRules {
                    facets_with_same_group,
                    facets_with_different_groups,
                } => {
                    relations.within_group_default = *facets_with_same_group;
                    relations.across_groups_default = *facets_with_different_groups;
                }
                RequireConstraint::FacetGroupsRelation {
                    reference_name,
                    relation,
                    level,
                    group_filter,
                } => {
                    schema.reference_or_err(reference_name)?;
                    match group_filter {
                        None => relations.add_override(
                            *level,
                            GroupReference::any_group(reference_name.as_str()),
                            *relation,
                        ),
                        Some(filter) => {
                            let group_ids = IdFilter::compile(filter)?.enumerate().ok_or_else(
                                || FacetSummaryError::UnsupportedConstraint(filter.to_string()),
                            )?;
                            // an empty id set targets every group, like no filter at all
                            if group_ids.is_empty() {
                                relations.add_override(
                                    *level,
                                    GroupReference::any_group(reference_name.as_str()),
                                    *relation,
                                );
                            }
                            for group_id in &group_ids {
                                relations.add_override(
                                    *level,
                                    GroupReference::new(reference_name.as_str(), Some(group_id)),
                                    *relation,
                                );
                            }
                        }
                    }
                }
                RequireConstraint::FacetSummary(_)
                | RequireConstraint::FacetSummaryOfReference { .. } => {}
            }
        }

        debug!(
            within_group = %relations.within_group_default,
            across_groups = %relations.across_groups_default,
            overrides = relations.overrides.len(),
            "resolved facet relation configuration"
        );
        Ok(relations)
    }

    /// Adds an explicit override.
    ///
    /// When the (level, group) pair is already overridden the stronger
    /// relation is kept: CONJUNCTION, then NEGATION, then EXCLUSIVITY, then
    /// DISJUNCTION.
    pub fn add_override(
        &mut self,
        level: RelationLevel,
        group: GroupReference,
        relation: RelationType,
    ) {
        trace!(%level, %group, %relation, "relation override");
        self.overrides
            .entry((level, group))
            .and_modify(|existing| {
                if relation.precedence() < existing.precedence() {
                    *existing = relation;
                }
            })
            .or_insert(relation);
    }

    /// Builder-style variant of [`add_override`](Self::add_override).
    pub fn with_override(
        mut self,
        level: RelationLevel,
        group: GroupReference,
        relation: RelationType,
    ) -> Self {
        self.add_override(level, group, relation);
        self
    }

    /// Default relation of a level.
    pub fn default_for(&self, level: RelationLevel) -> RelationType {
        match level {
            RelationLevel::WithinGroup => self.within_group_default,
            RelationLevel::AcrossGroups => self.across_groups_default,
        }
    }

    /// Explicit override of the exact (level, group) pair, if any.
    pub fn explicit(&self, level: RelationLevel, group: &GroupReference) -> Option<RelationType> {
        self.overrides.get(&(level, group.clone())).copied()
    }

    /// Resolves the relation type active for the group at the level.
    pub fn relation_type(&self, level: RelationLevel, group: &GroupReference) -> RelationType {
        self.explicit(level, group)
            .or_else(|| {
                group
                    .group_id
                    .and_then(|_| self.explicit(level, &group.without_group()))
            })
            .unwrap_or_else(|| self.default_for(level))
    }

    /// Returns true if the group excludes every other group, so that
    /// selecting one of its facets replaces the selection elsewhere.
    pub fn is_exclusive_among_other_groups(&self, group: &GroupReference) -> bool {
        self.relation_type(RelationLevel::AcrossGroups, group) == RelationType::Exclusivity
    }

    /// Returns true if facet counts of the group are published inverted.
    pub fn is_negated_within_group(&self, group: &GroupReference) -> bool {
        self.relation_type(RelationLevel::WithinGroup, group) == RelationType::Negation
    }
}
