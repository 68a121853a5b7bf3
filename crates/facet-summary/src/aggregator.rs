//! Aggregation of facet statistics over the candidate set.
//!
//! For every requested faceted reference the aggregator walks the candidate
//! references once, grouping them by facet group and facet id, then turns
//! the collected entity sets into counts, selection flags and impacts and
//! finally resolves facet and group bodies.

use std::collections::{BTreeMap, HashMap};

use facet_query::{EntityFetch, PrimaryKey};
use tracing::debug;

use crate::bitset::EntityIdSet;
use crate::config::SummaryConfig;
use crate::error::{FacetResult, FacetSummaryError};
use crate::impact::ImpactCalculator;
use crate::index::CandidateIndex;
use crate::key::{GroupReference, ReferenceKey};
use crate::relation::RelationConfiguration;
use crate::request::{StatisticsRequest, StatisticsRequests};
use crate::result::{EntityBody, FacetGroupStatistics, FacetStatistics, Impact};
use crate::schema::{EntitySchema, ReferenceSchema};
use crate::selection::SelectionContext;
use crate::traits::{EntityFetcher, FacetedEntity};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Entities referencing one facet group, and per facet of the group.
#[derive(Debug, Default)]
struct GroupAccumulator {
    entities: EntityIdSet,
    facets: BTreeMap<PrimaryKey, EntityIdSet>,
}

/// Statistics of a group before bodies are resolved.
struct PendingGroup {
    group_id: Option<PrimaryKey>,
    count: usize,
    facets: Vec<PendingFacet>,
}

struct PendingFacet {
    primary_key: PrimaryKey,
    requested: bool,
    count: usize,
    impact: Option<Impact>,
}

/// Computes unordered group statistics for the requested references.
pub struct StatisticsAggregator<'s, 'a> {
    schema: &'s EntitySchema,
    relations: &'s RelationConfiguration,
    selection: &'s SelectionContext<'a>,
    index: &'s CandidateIndex,
    fetcher: Option<&'s dyn EntityFetcher>,
    config: &'s SummaryConfig,
}

impl<'s, 'a> StatisticsAggregator<'s, 'a> {
    /// Creates an aggregator.
    pub fn new(
        schema: &'s EntitySchema,
        relations: &'s RelationConfiguration,
        selection: &'s SelectionContext<'a>,
        index: &'s CandidateIndex,
        fetcher: Option<&'s dyn EntityFetcher>,
        config: &'s SummaryConfig,
    ) -> Self {
        Self {
            schema,
            relations,
            selection,
            index,
            fetcher,
            config,
        }
    }

    /// Aggregates statistics of every requested reference.
    ///
    /// # Errors
    ///
    /// - [`FacetSummaryError::DanglingReference`] when the fetcher does not
    ///   return a requested body
    /// - [`FacetSummaryError::Store`] when bodies are requested but no
    ///   fetcher is configured, or the fetcher fails
    pub fn aggregate<E: FacetedEntity>(
        &self,
        requests: &StatisticsRequests,
        candidates: &[E],
    ) -> FacetResult<Vec<FacetGroupStatistics>> {
        let calculator = requests
            .computes_impact()
            .then(|| ImpactCalculator::new(self.selection, self.index));

        let mut result = Vec::new();
        for request in requests.iter() {
            let reference = self.schema.reference_or_err(&request.reference_name)?;
            let accumulated = accumulate(reference, candidates);
            let impacts = calculator.as_ref().filter(|_| request.computes_impact());

            let pending: Vec<PendingGroup> = accumulated
                .into_iter()
                .filter_map(|(group_id, accumulator)| {
                    self.group_statistics(reference, request, group_id, accumulator, impacts)
                })
                .collect();

            debug!(
                reference = %reference.name,
                groups = pending.len(),
                facets = pending.iter().map(|group| group.facets.len()).sum::<usize>(),
                "aggregated facet statistics"
            );

            result.extend(self.resolve_bodies(reference, request, pending)?);
        }
        Ok(result)
    }

    fn group_statistics(
        &self,
        reference: &ReferenceSchema,
        request: &StatisticsRequest,
        group_id: Option<PrimaryKey>,
        accumulator: GroupAccumulator,
        impacts: Option<&ImpactCalculator<'_, '_>>,
    ) -> Option<PendingGroup> {
        if let (Some(filter), Some(id)) = (&request.group_filter, group_id) {
            if !filter.matches(id) {
                return None;
            }
        }

        let group = GroupReference::new(reference.name.as_str(), group_id);
        let negated = self.relations.is_negated_within_group(&group);
        let candidate_count = self.index.len();

        let counted: Vec<(PrimaryKey, usize)> = accumulator
            .facets
            .iter()
            .filter(|(facet_id, _)| {
                request
                    .facet_filter
                    .as_ref()
                    .map_or(true, |filter| filter.matches(**facet_id))
            })
            .map(|(facet_id, entities)| {
                let raw = entities.len();
                let count = if negated {
                    candidate_count.saturating_sub(raw)
                } else {
                    raw
                };
                (*facet_id, count)
            })
            .filter(|(_, count)| !self.config.skip_empty_facets || *count > 0)
            .collect();

        if counted.is_empty() {
            return None;
        }

        let facet_impacts = match impacts {
            Some(calculator) => compute_impacts(calculator, &reference.name, &group, &counted),
            None => vec![None; counted.len()],
        };

        let facets = counted
            .into_iter()
            .zip(facet_impacts)
            .map(|((primary_key, count), impact)| PendingFacet {
                primary_key,
                requested: self
                    .selection
                    .was_requested(&ReferenceKey::new(reference.name.as_str(), primary_key)),
                count,
                impact,
            })
            .collect();

        Some(PendingGroup {
            group_id,
            count: accumulator.entities.len(),
            facets,
        })
    }

    fn resolve_bodies(
        &self,
        reference: &ReferenceSchema,
        request: &StatisticsRequest,
        pending: Vec<PendingGroup>,
    ) -> FacetResult<Vec<FacetGroupStatistics>> {
        let facet_ids: EntityIdSet = pending
            .iter()
            .flat_map(|group| group.facets.iter().map(|facet| facet.primary_key))
            .collect();
        let facet_bodies = self.fetch_bodies(
            &reference.referenced_entity_type,
            reference.referenced_entity_type_managed,
            request.entity_fetch.as_ref(),
            &facet_ids,
        )?;

        let group_bodies = match &reference.referenced_group_type {
            Some(group_type) => {
                let group_ids: EntityIdSet =
                    pending.iter().filter_map(|group| group.group_id).collect();
                self.fetch_bodies(
                    group_type,
                    reference.referenced_group_type_managed,
                    request.group_fetch.as_ref(),
                    &group_ids,
                )?
            }
            None => HashMap::new(),
        };

        let mut result = Vec::with_capacity(pending.len());
        for group in pending {
            let group_body = match group.group_id {
                Some(group_id) => Some(body_of(
                    &group_bodies,
                    reference.referenced_group_type.as_deref().unwrap_or_default(),
                    group_id,
                )?),
                None => None,
            };
            let facets = group
                .facets
                .into_iter()
                .map(|facet| {
                    Ok(FacetStatistics {
                        facet: body_of(
                            &facet_bodies,
                            &reference.referenced_entity_type,
                            facet.primary_key,
                        )?,
                        requested: facet.requested,
                        count: facet.count,
                        impact: facet.impact,
                    })
                })
                .collect::<FacetResult<Vec<_>>>()?;
            result.push(FacetGroupStatistics {
                reference_name: reference.name.clone(),
                group: group_body,
                count: group.count,
                facets,
            });
        }
        Ok(result)
    }

    /// Fetches bodies of the ids, or returns stubs when no body is required
    /// or the entity type is not managed.
    fn fetch_bodies(
        &self,
        entity_type: &str,
        managed: bool,
        requirement: Option<&EntityFetch>,
        primary_keys: &EntityIdSet,
    ) -> FacetResult<HashMap<PrimaryKey, EntityBody>> {
        let requirement = match requirement {
            Some(requirement) if managed && !primary_keys.is_empty() => requirement,
            _ => {
                return Ok(primary_keys
                    .iter()
                    .map(|primary_key| (primary_key, EntityBody::reference(entity_type, primary_key)))
                    .collect())
            }
        };

        let fetcher = self.fetcher.ok_or_else(|| {
            FacetSummaryError::Store(format!(
                "entity bodies of {} requested but no entity fetcher is configured",
                entity_type
            ))
        })?;

        let primary_keys = primary_keys.to_vec();
        debug!(entity_type, count = primary_keys.len(), "fetching entity bodies");
        let fetched = fetcher.fetch_entities(entity_type, &primary_keys, requirement)?;

        let bodies: HashMap<PrimaryKey, EntityBody> = fetched
            .into_iter()
            .map(|entity| (entity.primary_key, EntityBody::Entity(entity)))
            .collect();
        for primary_key in primary_keys {
            if !bodies.contains_key(&primary_key) {
                return Err(FacetSummaryError::DanglingReference {
                    entity_type: entity_type.to_string(),
                    primary_key,
                });
            }
        }
        Ok(bodies)
    }
}

/// Groups the candidates' references of one reference name by facet group.
fn accumulate<E: FacetedEntity>(
    reference: &ReferenceSchema,
    candidates: &[E],
) -> BTreeMap<Option<PrimaryKey>, GroupAccumulator> {
    let grouped = reference.is_grouped();
    let mut groups: BTreeMap<Option<PrimaryKey>, GroupAccumulator> = BTreeMap::new();
    for entity in candidates {
        let primary_key = entity.primary_key();
        for entity_reference in entity
            .references()
            .iter()
            .filter(|it| it.reference_name == reference.name)
        {
            let group_id = if grouped {
                entity_reference.group_primary_key
            } else {
                None
            };
            let group = groups.entry(group_id).or_default();
            group.entities.insert(primary_key);
            group
                .facets
                .entry(entity_reference.referenced_primary_key)
                .or_default()
                .insert(primary_key);
        }
    }
    groups
}

fn body_of(
    bodies: &HashMap<PrimaryKey, EntityBody>,
    entity_type: &str,
    primary_key: PrimaryKey,
) -> FacetResult<EntityBody> {
    bodies
        .get(&primary_key)
        .cloned()
        .ok_or_else(|| FacetSummaryError::DanglingReference {
            entity_type: entity_type.to_string(),
            primary_key,
        })
}

#[cfg(not(feature = "parallel"))]
fn compute_impacts(
    calculator: &ImpactCalculator<'_, '_>,
    reference_name: &str,
    group: &GroupReference,
    facets: &[(PrimaryKey, usize)],
) -> Vec<Option<Impact>> {
    facets
        .iter()
        .map(|(primary_key, _)| {
            Some(calculator.impact_of(&ReferenceKey::new(reference_name, *primary_key), group))
        })
        .collect()
}

#[cfg(feature = "parallel")]
fn compute_impacts(
    calculator: &ImpactCalculator<'_, '_>,
    reference_name: &str,
    group: &GroupReference,
    facets: &[(PrimaryKey, usize)],
) -> Vec<Option<Impact>> {
    facets
        .par_iter()
        .map(|(primary_key, _)| {
            Some(calculator.impact_of(&ReferenceKey::new(reference_name, *primary_key), group))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use facet_query::{RelationLevel, RelationType, RequireConstraint, StatisticsDepth};

    use super::*;
    use crate::result::FetchedEntity;
    use crate::traits::{Entity, FacetGroupMapping, NoHierarchy};

    fn schema() -> EntitySchema {
        EntitySchema::new("Product")
            .with_reference(ReferenceSchema::new("brand", "Brand"))
            .with_reference(
                ReferenceSchema::new("parameter", "ParameterValue")
                    .with_group_type("Parameter", true),
            )
    }

    fn candidates() -> Vec<Entity> {
        vec![
            Entity::new(1)
                .with_reference("brand", 1)
                .with_grouped_reference("parameter", 10, 100)
                .with_grouped_reference("parameter", 11, 100),
            Entity::new(2)
                .with_reference("brand", 1)
                .with_grouped_reference("parameter", 20, 200),
            Entity::new(3).with_reference("brand", 2),
        ]
    }

    fn aggregate(
        relations: &RelationConfiguration,
        config: &SummaryConfig,
        depth: StatisticsDepth,
    ) -> Vec<FacetGroupStatistics> {
        let schema = schema();
        let candidates = candidates();
        let selection = SelectionContext::new(
            &schema,
            None,
            relations,
            &FacetGroupMapping::from_entities(&candidates),
            &NoHierarchy,
        )
        .unwrap();
        let index = CandidateIndex::from_entities(&candidates);
        let requests =
            StatisticsRequests::resolve(&[RequireConstraint::facet_summary(depth)], &schema)
                .unwrap();
        StatisticsAggregator::new(&schema, relations, &selection, &index, None, config)
            .aggregate(&requests, &candidates)
            .unwrap()
    }

    fn find<'r>(
        groups: &'r [FacetGroupStatistics],
        reference_name: &str,
        group_id: Option<PrimaryKey>,
    ) -> &'r FacetGroupStatistics {
        groups
            .iter()
            .find(|group| group.reference_name == reference_name && group.group_id() == group_id)
            .unwrap()
    }

    #[test]
    fn test_group_count_is_distinct_entities() {
        let groups = aggregate(
            &RelationConfiguration::default(),
            &SummaryConfig::default(),
            StatisticsDepth::Counts,
        );
        assert_eq!(groups.len(), 3);

        let parameter = find(&groups, "parameter", Some(100));
        assert_eq!(parameter.count, 1);
        assert_eq!(parameter.facets.len(), 2);

        let brand = find(&groups, "brand", None);
        assert_eq!(brand.count, 3);
        assert_eq!(brand.facet(1).unwrap().count, 2);
        assert!(brand.facet(1).unwrap().impact.is_none());
        assert!(!brand.facet(1).unwrap().facet.is_fetched());
    }

    #[test]
    fn test_negated_group_counts_are_inverted() {
        let relations = RelationConfiguration::default().with_override(
            RelationLevel::WithinGroup,
            GroupReference::any_group("brand"),
            RelationType::Negation,
        );
        let groups = aggregate(&relations, &SummaryConfig::default(), StatisticsDepth::Counts);
        let brand = find(&groups, "brand", None);
        assert_eq!(brand.facet(1).unwrap().count, 1);
        assert_eq!(brand.facet(2).unwrap().count, 2);
    }

    #[test]
    fn test_skip_empty_facets_drops_group() {
        let relations = RelationConfiguration::default().with_override(
            RelationLevel::WithinGroup,
            GroupReference::any_group("brand"),
            RelationType::Negation,
        );
        let config = SummaryConfig::builder().with_skip_empty_facets(true).build();
        let candidates = vec![Entity::new(1).with_reference("brand", 1)];
        let schema = schema();
        let selection = SelectionContext::new(
            &schema,
            None,
            &relations,
            &FacetGroupMapping::new(),
            &NoHierarchy,
        )
        .unwrap();
        let index = CandidateIndex::from_entities(&candidates);
        let requests = StatisticsRequests::resolve(
            &[RequireConstraint::facet_summary(StatisticsDepth::Counts)],
            &schema,
        )
        .unwrap();
        let groups = StatisticsAggregator::new(&schema, &relations, &selection, &index, None, &config)
            .aggregate(&requests, &candidates)
            .unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_impact_depth() {
        let groups = aggregate(
            &RelationConfiguration::default(),
            &SummaryConfig::default(),
            StatisticsDepth::Impact,
        );
        let impact = find(&groups, "brand", None).facet(2).unwrap().impact.unwrap();
        assert_eq!(impact.new_count, 1);
        assert_eq!(impact.delta, -2);
    }

    struct PartialFetcher;

    impl EntityFetcher for PartialFetcher {
        fn fetch_entities(
            &self,
            entity_type: &str,
            primary_keys: &[PrimaryKey],
            _requirement: &EntityFetch,
        ) -> FacetResult<Vec<FetchedEntity>> {
            Ok(primary_keys
                .iter()
                .filter(|primary_key| **primary_key != 2)
                .map(|primary_key| FetchedEntity::new(entity_type, *primary_key))
                .collect())
        }
    }

    #[test]
    fn test_missing_body_is_dangling() {
        let schema = schema();
        let candidates = candidates();
        let relations = RelationConfiguration::default();
        let config = SummaryConfig::default();
        let selection =
            SelectionContext::new(&schema, None, &relations, &FacetGroupMapping::new(), &NoHierarchy)
                .unwrap();
        let index = CandidateIndex::from_entities(&candidates);
        let requirement = facet_query::FacetSummaryRequirement::default()
            .entity_fetch(EntityFetch::all_attributes());
        let requests = StatisticsRequests::resolve(
            &[RequireConstraint::facet_summary_of_reference("brand", requirement)],
            &schema,
        )
        .unwrap();

        let fetcher = PartialFetcher;
        let result = StatisticsAggregator::new(
            &schema,
            &relations,
            &selection,
            &index,
            Some(&fetcher as &dyn EntityFetcher),
            &config,
        )
        .aggregate(&requests, &candidates);
        assert!(matches!(
            result,
            Err(FacetSummaryError::DanglingReference { primary_key: 2, .. })
        ));

        let result = StatisticsAggregator::new(&schema, &relations, &selection, &index, None, &config)
            .aggregate(&requests, &candidates);
        assert!(matches!(result, Err(FacetSummaryError::Store(_))));
    }
}
