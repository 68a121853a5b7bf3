//! Statistics requests.
//!
//! `facetSummary(...)` is the default request for every faceted reference and
//! `facetSummaryOfReference('ref', ...)` refines it for one reference. This
//! module merges the two into one resolved [`StatisticsRequest`] per
//! reference that statistics are computed for.

use std::collections::BTreeMap;

use facet_query::{
    EntityFetch, FacetSummaryRequirement, OrderConstraint, RequireConstraint, StatisticsDepth,
};
use tracing::{debug, warn};

use crate::error::FacetResult;
use crate::filter::IdFilter;
use crate::schema::EntitySchema;

/// Resolved statistics settings of one reference.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsRequest {
    /// Reference name.
    pub reference_name: String,
    /// Statistics depth.
    pub depth: StatisticsDepth,
    /// Facets not matching the filter are left out.
    pub facet_filter: Option<IdFilter>,
    /// Groups not matching the filter are left out.
    pub group_filter: Option<IdFilter>,
    /// Facet ordering rules.
    pub facet_order: Vec<OrderConstraint>,
    /// Group ordering rules.
    pub group_order: Vec<OrderConstraint>,
    /// Facet body requirement.
    pub entity_fetch: Option<EntityFetch>,
    /// Group body requirement.
    pub group_fetch: Option<EntityFetch>,
}

impl StatisticsRequest {
    /// Returns true if impacts are computed.
    pub fn computes_impact(&self) -> bool {
        self.depth == StatisticsDepth::Impact
    }

    fn resolve(
        reference_name: &str,
        specific: Option<&FacetSummaryRequirement>,
        default: Option<&FacetSummaryRequirement>,
    ) -> FacetResult<Self> {
        let depth = specific
            .and_then(|requirement| requirement.depth)
            .or_else(|| default.and_then(|requirement| requirement.depth))
            .unwrap_or_default();
        let facet_filter = specific
            .and_then(|requirement| requirement.facet_filter.as_ref())
            .or_else(|| default.and_then(|requirement| requirement.facet_filter.as_ref()))
            .map(IdFilter::compile)
            .transpose()?;
        let group_filter = specific
            .and_then(|requirement| requirement.group_filter.as_ref())
            .or_else(|| default.and_then(|requirement| requirement.group_filter.as_ref()))
            .map(IdFilter::compile)
            .transpose()?;

        Ok(Self {
            reference_name: reference_name.to_string(),
            depth,
            facet_filter,
            group_filter,
            facet_order: order_of(
                specific.map(|requirement| requirement.facet_order.as_slice()),
                default.map(|requirement| requirement.facet_order.as_slice()),
            ),
            group_order: order_of(
                specific.map(|requirement| requirement.group_order.as_slice()),
                default.map(|requirement| requirement.group_order.as_slice()),
            ),
            entity_fetch: merge_fetch(
                specific.and_then(|requirement| requirement.entity_fetch.as_ref()),
                default.and_then(|requirement| requirement.entity_fetch.as_ref()),
            ),
            group_fetch: merge_fetch(
                specific.and_then(|requirement| requirement.group_fetch.as_ref()),
                default.and_then(|requirement| requirement.group_fetch.as_ref()),
            ),
        })
    }
}

fn order_of(
    specific: Option<&[OrderConstraint]>,
    default: Option<&[OrderConstraint]>,
) -> Vec<OrderConstraint> {
    specific
        .filter(|order| !order.is_empty())
        .or(default)
        .map(<[OrderConstraint]>::to_vec)
        .unwrap_or_default()
}

fn merge_fetch(specific: Option<&EntityFetch>, default: Option<&EntityFetch>) -> Option<EntityFetch> {
    match (specific, default) {
        (Some(specific), Some(default)) => Some(specific.combine_with(default)),
        (Some(fetch), None) | (None, Some(fetch)) => Some(fetch.clone()),
        (None, None) => None,
    }
}

/// Resolved statistics requests of a query, keyed by reference name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticsRequests {
    requests: BTreeMap<String, StatisticsRequest>,
}

impl StatisticsRequests {
    /// Resolves the statistics requests of the require constraints.
    ///
    /// With a default `facetSummary` every faceted reference of the schema is
    /// computed; without it only references with their own request are.
    /// Requests for non-faceted references are ignored.
    ///
    /// # Errors
    ///
    /// - [`FacetSummaryError::UnknownReferenceSchema`](crate::FacetSummaryError::UnknownReferenceSchema)
    ///   for a per-reference request naming an undeclared reference
    /// - [`FacetSummaryError::UnsupportedConstraint`](crate::FacetSummaryError::UnsupportedConstraint)
    ///   for a facet or group filter that is not a primary key filter
    pub fn resolve(require: &[RequireConstraint], schema: &EntitySchema) -> FacetResult<Self> {
        let mut default: Option<&FacetSummaryRequirement> = None;
        let mut specific: BTreeMap<&str, &FacetSummaryRequirement> = BTreeMap::new();

        for constraint in require {
            match constraint {
                RequireConstraint::FacetSummary(requirement) => {
                    if default.is_some() {
                        warn!("query contains more than one facetSummary, keeping the first");
                    } else {
                        default = Some(requirement);
                    }
                }
                RequireConstraint::FacetSummaryOfReference {
                    reference_name,
                    requirement,
                } => {
                    schema.reference_or_err(reference_name)?;
                    if specific.contains_key(reference_name.as_str()) {
                        warn!(
                            reference = %reference_name,
                            "query contains more than one facetSummaryOfReference, keeping the first"
                        );
                    } else {
                        specific.insert(reference_name.as_str(), requirement);
                    }
                }
                RequireConstraint::FacetGroupsRelation { .. }
                | RequireConstraint::FacetCalculationRules { .. } => {}
            }
        }

        let mut requests = BTreeMap::new();
        for reference in schema.faceted_references() {
            let name = reference.name.as_str();
            let own = specific.get(name).copied();
            if default.is_none() && own.is_none() {
                continue;
            }
            requests.insert(name.to_string(), StatisticsRequest::resolve(name, own, default)?);
        }

        for name in specific.keys() {
            if !requests.contains_key(*name) {
                debug!(reference = %name, "statistics requested for non-faceted reference, ignored");
            }
        }

        Ok(Self { requests })
    }

    /// Returns true if no statistics are requested.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Number of references statistics are computed for.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Request of a reference.
    pub fn get(&self, reference_name: &str) -> Option<&StatisticsRequest> {
        self.requests.get(reference_name)
    }

    /// Requests in reference name order.
    pub fn iter(&self) -> impl Iterator<Item = &StatisticsRequest> {
        self.requests.values()
    }

    /// Returns true if any request computes impacts.
    pub fn computes_impact(&self) -> bool {
        self.iter().any(StatisticsRequest::computes_impact)
    }
}

#[cfg(test)]
mod tests {
    use facet_query::{AttributeContent, FilterConstraint, OrderDirection};

    use super::*;
    use crate::error::FacetSummaryError;
    use crate::schema::ReferenceSchema;

    fn schema() -> EntitySchema {
        EntitySchema::new("Product")
            .with_reference(ReferenceSchema::new("brand", "Brand"))
            .with_reference(ReferenceSchema::new("store", "Store"))
            .with_reference(ReferenceSchema::new("tag", "Tag").with_faceted(false))
    }

    #[test]
    fn test_no_request() {
        let requests = StatisticsRequests::resolve(&[], &schema()).unwrap();
        assert!(requests.is_empty());
    }

    #[test]
    fn test_default_covers_faceted_references() {
        let require = vec![RequireConstraint::facet_summary(StatisticsDepth::Impact)];
        let requests = StatisticsRequests::resolve(&require, &schema()).unwrap();
        let names: Vec<_> = requests.iter().map(|it| it.reference_name.as_str()).collect();
        assert_eq!(names, vec!["brand", "store"]);
        assert!(requests.computes_impact());
    }

    #[test]
    fn test_specific_only_limits_references() {
        let require = vec![RequireConstraint::facet_summary_of_reference(
            "store",
            FacetSummaryRequirement::default(),
        )];
        let requests = StatisticsRequests::resolve(&require, &schema()).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests.get("store").unwrap().depth, StatisticsDepth::Counts);
        assert!(requests.get("brand").is_none());
    }

    #[test]
    fn test_specific_falls_back_to_default() {
        let default = FacetSummaryRequirement::with_depth(StatisticsDepth::Impact)
            .order_by(OrderConstraint::EntityPrimaryKeyNatural(OrderDirection::Desc))
            .entity_fetch(EntityFetch::attributes(["name"]));
        let specific = FacetSummaryRequirement::default()
            .filter_by(FilterConstraint::primary_keys([1, 2]))
            .entity_fetch(EntityFetch::attributes(["code"]).with_locale("en"));
        let require = vec![
            RequireConstraint::FacetSummary(default),
            RequireConstraint::facet_summary_of_reference("brand", specific),
        ];
        let requests = StatisticsRequests::resolve(&require, &schema()).unwrap();

        let brand = requests.get("brand").unwrap();
        assert_eq!(brand.depth, StatisticsDepth::Impact);
        assert_eq!(brand.facet_order.len(), 1);
        assert!(brand.facet_filter.as_ref().unwrap().matches(2));
        let fetch = brand.entity_fetch.as_ref().unwrap();
        assert_eq!(
            fetch.attribute_content,
            Some(AttributeContent::Named(vec!["code".into(), "name".into()]))
        );
        assert_eq!(fetch.locales, vec!["en".to_string()]);

        let store = requests.get("store").unwrap();
        assert!(store.facet_filter.is_none());
    }

    #[test]
    fn test_unknown_reference() {
        let require = vec![RequireConstraint::facet_summary_of_reference(
            "color",
            FacetSummaryRequirement::default(),
        )];
        assert!(matches!(
            StatisticsRequests::resolve(&require, &schema()),
            Err(FacetSummaryError::UnknownReferenceSchema(name)) if name == "color"
        ));
    }

    #[test]
    fn test_non_faceted_reference_is_ignored() {
        let require = vec![RequireConstraint::facet_summary_of_reference(
            "tag",
            FacetSummaryRequirement::default(),
        )];
        assert!(StatisticsRequests::resolve(&require, &schema()).unwrap().is_empty());
    }

    #[test]
    fn test_unsupported_facet_filter() {
        let require = vec![RequireConstraint::FacetSummary(
            FacetSummaryRequirement::default()
                .filter_by(FilterConstraint::attribute_equals("code", "x")),
        )];
        assert!(matches!(
            StatisticsRequests::resolve(&require, &schema()),
            Err(FacetSummaryError::UnsupportedConstraint(_))
        ));
    }
}
