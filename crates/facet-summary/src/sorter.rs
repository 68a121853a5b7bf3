//! Output ordering of groups and facets.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use facet_query::{OrderConstraint, OrderDirection};

use crate::request::StatisticsRequests;
use crate::result::{EntityBody, FacetGroupStatistics, FacetStatistics};

/// Custom facet ordering registered for a reference.
pub type FacetComparator =
    Arc<dyn Fn(&FacetStatistics, &FacetStatistics) -> Ordering + Send + Sync>;

/// Custom group ordering registered for a reference.
pub type GroupComparator =
    Arc<dyn Fn(&FacetGroupStatistics, &FacetGroupStatistics) -> Ordering + Send + Sync>;

/// Orders groups and facets of a computed summary.
///
/// Groups are ordered by reference name, groups with an id before the
/// ungrouped one, then by the reference's group comparator. Facets are
/// ordered by the reference's facet comparator. A comparator is, in order
/// of preference, a custom one registered on the computer, one derived from
/// `orderBy` / `orderGroupBy`, or ascending primary key. Sorts are stable.
pub struct StatisticsSorter {
    facet_comparators: HashMap<String, FacetComparator>,
    group_comparators: HashMap<String, GroupComparator>,
    max_facets_per_group: Option<usize>,
}

impl StatisticsSorter {
    /// Builds the comparator table for the requests.
    pub fn new(
        requests: &StatisticsRequests,
        custom_facet_comparators: &HashMap<String, FacetComparator>,
        custom_group_comparators: &HashMap<String, GroupComparator>,
        max_facets_per_group: Option<usize>,
    ) -> Self {
        let mut facet_comparators = HashMap::new();
        let mut group_comparators = HashMap::new();

        for request in requests.iter() {
            let name = &request.reference_name;

            let facet_comparator = match custom_facet_comparators.get(name) {
                Some(custom) => Some(custom.clone()),
                None if !request.facet_order.is_empty() => {
                    let order = request.facet_order.clone();
                    let comparator: FacetComparator =
                        Arc::new(move |left: &FacetStatistics, right: &FacetStatistics| {
                            compare_bodies(&order, &left.facet, &right.facet)
                        });
                    Some(comparator)
                }
                None => None,
            };
            if let Some(comparator) = facet_comparator {
                facet_comparators.insert(name.clone(), comparator);
            }

            let group_comparator = match custom_group_comparators.get(name) {
                Some(custom) => Some(custom.clone()),
                None if !request.group_order.is_empty() => {
                    let order = request.group_order.clone();
                    let comparator: GroupComparator = Arc::new(
                        move |left: &FacetGroupStatistics, right: &FacetGroupStatistics| {
                            match (&left.group, &right.group) {
                                (Some(left), Some(right)) => compare_bodies(&order, left, right),
                                (left, right) => left.is_none().cmp(&right.is_none()),
                            }
                        },
                    );
                    Some(comparator)
                }
                None => None,
            };
            if let Some(comparator) = group_comparator {
                group_comparators.insert(name.clone(), comparator);
            }
        }

        Self {
            facet_comparators,
            group_comparators,
            max_facets_per_group,
        }
    }

    /// Sorts the groups and their facets in place and applies the facet limit.
    pub fn sort(&self, groups: &mut [FacetGroupStatistics]) {
        groups.sort_by(|left, right| self.compare_groups(left, right));

        for group in groups.iter_mut() {
            match self.facet_comparators.get(&group.reference_name) {
                Some(comparator) => group.facets.sort_by(|left, right| comparator(left, right)),
                None => group.facets.sort_by_key(FacetStatistics::primary_key),
            }
            if let Some(limit) = self.max_facets_per_group {
                group.facets.truncate(limit);
            }
        }
    }

    fn compare_groups(&self, left: &FacetGroupStatistics, right: &FacetGroupStatistics) -> Ordering {
        left.reference_name
            .cmp(&right.reference_name)
            .then_with(|| match (left.group_id(), right.group_id()) {
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
                (Some(left_id), Some(right_id)) => {
                    match self.group_comparators.get(&left.reference_name) {
                        Some(comparator) => comparator(left, right),
                        None => left_id.cmp(&right_id),
                    }
                }
            })
    }
}

/// Compares two entity bodies by the ordering rules, falling back to
/// ascending primary key.
///
/// Bodies without the ordered attribute sort last in both directions.
pub fn compare_bodies(order: &[OrderConstraint], left: &EntityBody, right: &EntityBody) -> Ordering {
    order
        .iter()
        .map(|constraint| match constraint {
            OrderConstraint::EntityPrimaryKeyNatural(direction) => {
                directed(left.primary_key().cmp(&right.primary_key()), *direction)
            }
            OrderConstraint::AttributeNatural {
                attribute_name,
                direction,
            } => match (left.attribute(attribute_name), right.attribute(attribute_name)) {
                (Some(left), Some(right)) => directed(left.cmp(right), *direction),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| left.primary_key().cmp(&right.primary_key()))
}

fn directed(ordering: Ordering, direction: OrderDirection) -> Ordering {
    match direction {
        OrderDirection::Asc => ordering,
        OrderDirection::Desc => ordering.reverse(),
    }
}
