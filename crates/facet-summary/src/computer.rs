//! Facet summary computer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use facet_query::Query;
use tracing::debug;

use crate::aggregator::StatisticsAggregator;
use crate::config::SummaryConfig;
use crate::error::FacetResult;
use crate::index::CandidateIndex;
use crate::relation::RelationConfiguration;
use crate::request::StatisticsRequests;
use crate::result::{FacetGroupStatistics, FacetStatistics, FacetSummary};
use crate::schema::EntitySchema;
use crate::selection::SelectionContext;
use crate::sorter::{FacetComparator, GroupComparator, StatisticsSorter};
use crate::traits::{
    EntityFetcher, FacetGroupLookup, FacetGroupMapping, FacetedEntity, HierarchyLookup,
    NoHierarchy,
};

/// Main facet statistics engine.
///
/// The computer takes the entity schema of the queried collection, the
/// query and the candidate entities (the result of the non-facet part of
/// the filter) and produces the [`FacetSummary`].
///
/// Collaborators are optional:
///
/// - an [`EntityFetcher`] is needed only when a request asks for bodies,
/// - a [`HierarchyLookup`] is needed only for `includingChildren*` selections,
/// - a [`FacetGroupLookup`] resolves groups of selected facets; without one
///   the groups are read from the candidates' own references.
///
/// # Example
///
/// ```rust
/// use facet_query::{FilterConstraint, Query, RequireConstraint, StatisticsDepth};
/// use facet_summary::{Entity, EntitySchema, FacetSummaryComputer, ReferenceSchema};
///
/// let schema = EntitySchema::new("Product")
///     .with_reference(ReferenceSchema::new("brand", "Brand"));
/// let candidates = vec![
///     Entity::new(1).with_reference("brand", 1),
///     Entity::new(2).with_reference("brand", 2),
/// ];
/// let query = Query::builder()
///     .filter(FilterConstraint::facet_having("brand", [1]))
///     .require(RequireConstraint::facet_summary(StatisticsDepth::Impact))
///     .build();
///
/// let summary = FacetSummaryComputer::new(&schema).compute(&query, &candidates)?;
/// let brand = summary.facet("brand", 2).unwrap();
/// assert_eq!(brand.count, 1);
/// assert_eq!(brand.impact.unwrap().delta, 1);
/// # Ok::<(), facet_summary::FacetSummaryError>(())
/// ```
pub struct FacetSummaryComputer<'a> {
    schema: &'a EntitySchema,
    config: SummaryConfig,
    fetcher: Option<&'a dyn EntityFetcher>,
    hierarchy: Option<&'a dyn HierarchyLookup>,
    group_lookup: Option<&'a dyn FacetGroupLookup>,
    facet_comparators: HashMap<String, FacetComparator>,
    group_comparators: HashMap<String, GroupComparator>,
}

impl<'a> FacetSummaryComputer<'a> {
    /// Creates a computer with default configuration and no collaborators.
    pub fn new(schema: &'a EntitySchema) -> Self {
        Self {
            schema,
            config: SummaryConfig::default(),
            fetcher: None,
            hierarchy: None,
            group_lookup: None,
            facet_comparators: HashMap::new(),
            group_comparators: HashMap::new(),
        }
    }

    /// Sets the configuration.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let config = SummaryConfig::builder()
    ///     .with_skip_empty_facets(true)
    ///     .build();
    ///
    /// let computer = FacetSummaryComputer::new(&schema).with_config(config);
    /// ```
    pub fn with_config(mut self, config: SummaryConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the entity body fetcher.
    pub fn with_fetcher(mut self, fetcher: &'a dyn EntityFetcher) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Sets the hierarchy used to expand `includingChildren*` selections.
    pub fn with_hierarchy(mut self, hierarchy: &'a dyn HierarchyLookup) -> Self {
        self.hierarchy = Some(hierarchy);
        self
    }

    /// Sets the facet to group lookup.
    pub fn with_group_lookup(mut self, group_lookup: &'a dyn FacetGroupLookup) -> Self {
        self.group_lookup = Some(group_lookup);
        self
    }

    /// Registers a facet comparator for a reference, overriding `orderBy`.
    pub fn with_facet_comparator<F>(mut self, reference_name: impl Into<String>, comparator: F) -> Self
    where
        F: Fn(&FacetStatistics, &FacetStatistics) -> std::cmp::Ordering + Send + Sync + 'static,
    {
        self.facet_comparators
            .insert(reference_name.into(), Arc::new(comparator));
        self
    }

    /// Registers a group comparator for a reference, overriding `orderGroupBy`.
    pub fn with_group_comparator<F>(mut self, reference_name: impl Into<String>, comparator: F) -> Self
    where
        F: Fn(&FacetGroupStatistics, &FacetGroupStatistics) -> std::cmp::Ordering
            + Send
            + Sync
            + 'static,
    {
        self.group_comparators
            .insert(reference_name.into(), Arc::new(comparator));
        self
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &SummaryConfig {
        &self.config
    }

    /// Parses the query text and computes its facet summary.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let summary = computer.compute_str(
    ///     "query(filterBy(facetHaving('brand', entityPrimaryKeyInSet(1))), require(facetSummary(IMPACT)))",
    ///     &candidates,
    /// )?;
    /// ```
    pub fn compute_str<E: FacetedEntity>(
        &self,
        query: &str,
        candidates: &[E],
    ) -> FacetResult<FacetSummary> {
        let query = facet_query::parse(query)?;
        self.compute(&query, candidates)
    }

    /// Computes the facet summary of the query over the candidates.
    ///
    /// Returns an empty summary when the query requests no statistics.
    ///
    /// # Errors
    ///
    /// Any [`FacetSummaryError`](crate::FacetSummaryError) raised while
    /// resolving directives, extracting the selection or fetching bodies.
    pub fn compute<E: FacetedEntity>(
        &self,
        query: &Query,
        candidates: &[E],
    ) -> FacetResult<FacetSummary> {
        let start = Instant::now();

        let relations = RelationConfiguration::from_require(&query.require, self.schema, &self.config)?;
        let requests = StatisticsRequests::resolve(&query.require, self.schema)?;
        if requests.is_empty() {
            debug!("no facet statistics requested");
            return Ok(FacetSummary::default());
        }

        let derived_groups;
        let group_lookup: &dyn FacetGroupLookup = match self.group_lookup {
            Some(group_lookup) => group_lookup,
            None => {
                derived_groups = FacetGroupMapping::from_entities(candidates);
                &derived_groups
            }
        };
        let hierarchy: &dyn HierarchyLookup = self.hierarchy.unwrap_or(&NoHierarchy);

        let selection = SelectionContext::new(
            self.schema,
            query.filter_by.as_ref(),
            &relations,
            group_lookup,
            hierarchy,
        )?;
        let index = CandidateIndex::from_entities(candidates);

        let mut groups = StatisticsAggregator::new(
            self.schema,
            &relations,
            &selection,
            &index,
            self.fetcher,
            &self.config,
        )
        .aggregate(&requests, candidates)?;

        StatisticsSorter::new(
            &requests,
            &self.facet_comparators,
            &self.group_comparators,
            self.config.max_facets_per_group,
        )
        .sort(&mut groups);

        debug!(
            candidates = index.len(),
            references = requests.len(),
            groups = groups.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "computed facet summary"
        );
        Ok(FacetSummary::new(groups))
    }
}
