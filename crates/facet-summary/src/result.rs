//! Facet summary result types.

use std::collections::BTreeMap;
use std::fmt;

use facet_query::{PrimaryKey, Value};

/// Entity body returned by an [`EntityFetcher`](crate::EntityFetcher).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FetchedEntity {
    /// Entity type.
    pub entity_type: String,
    /// Primary key.
    pub primary_key: PrimaryKey,
    /// Fetched attributes.
    pub attributes: BTreeMap<String, Value>,
    /// Locales the body was fetched in.
    pub locales: Vec<String>,
}

impl FetchedEntity {
    /// Creates a body without attributes.
    pub fn new(entity_type: impl Into<String>, primary_key: PrimaryKey) -> Self {
        Self {
            entity_type: entity_type.into(),
            primary_key,
            attributes: BTreeMap::new(),
            locales: Vec::new(),
        }
    }

    /// Adds an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Facet or group entity: either a fetched body or a lightweight stub.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityBody {
    /// Only type and primary key are known.
    Reference {
        /// Entity type.
        entity_type: String,
        /// Primary key.
        primary_key: PrimaryKey,
    },
    /// Body resolved through the entity fetcher.
    Entity(FetchedEntity),
}

impl EntityBody {
    /// Creates a stub.
    pub fn reference(entity_type: impl Into<String>, primary_key: PrimaryKey) -> Self {
        EntityBody::Reference {
            entity_type: entity_type.into(),
            primary_key,
        }
    }

    /// Primary key of the entity.
    pub fn primary_key(&self) -> PrimaryKey {
        match self {
            EntityBody::Reference { primary_key, .. } => *primary_key,
            EntityBody::Entity(entity) => entity.primary_key,
        }
    }

    /// Entity type of the entity.
    pub fn entity_type(&self) -> &str {
        match self {
            EntityBody::Reference { entity_type, .. } => entity_type,
            EntityBody::Entity(entity) => &entity.entity_type,
        }
    }

    /// Attribute value, if the body was fetched with it.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        match self {
            EntityBody::Reference { .. } => None,
            EntityBody::Entity(entity) => entity.attributes.get(name),
        }
    }

    /// Returns true if the body was fetched.
    pub fn is_fetched(&self) -> bool {
        matches!(self, EntityBody::Entity(_))
    }
}

/// Counterfactual effect of adding a facet to the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Impact {
    /// Change of the matching entity count.
    pub delta: i64,
    /// Matching entity count with the facet added.
    pub new_count: usize,
    /// False when selecting the facet cannot change the outcome.
    pub has_sense: bool,
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.delta > 0 {
            write!(f, "+{}", self.delta)
        } else {
            write!(f, "{}", self.delta)
        }
    }
}

/// Statistics of a single facet.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FacetStatistics {
    /// Facet entity.
    pub facet: EntityBody,
    /// Whether the facet is selected in the query filter.
    pub requested: bool,
    /// Number of candidates referencing the facet (inverted for negated groups).
    pub count: usize,
    /// Impact, computed for `IMPACT` depth only.
    pub impact: Option<Impact>,
}

impl FacetStatistics {
    /// Primary key of the facet.
    pub fn primary_key(&self) -> PrimaryKey {
        self.facet.primary_key()
    }
}

/// Statistics of one facet group.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FacetGroupStatistics {
    /// Reference name.
    pub reference_name: String,
    /// Group entity, `None` for ungrouped facets.
    pub group: Option<EntityBody>,
    /// Number of distinct candidates referencing any facet of the group.
    pub count: usize,
    /// Facet statistics in output order.
    pub facets: Vec<FacetStatistics>,
}

impl FacetGroupStatistics {
    /// Primary key of the group entity.
    pub fn group_id(&self) -> Option<PrimaryKey> {
        self.group.as_ref().map(EntityBody::primary_key)
    }

    /// Looks up a facet by primary key.
    pub fn facet(&self, primary_key: PrimaryKey) -> Option<&FacetStatistics> {
        self.facets
            .iter()
            .find(|facet| facet.primary_key() == primary_key)
    }
}

/// Result of a facet summary computation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FacetSummary {
    /// Groups in output order.
    pub groups: Vec<FacetGroupStatistics>,
}

impl FacetSummary {
    /// Creates a summary from ordered groups.
    pub fn new(groups: Vec<FacetGroupStatistics>) -> Self {
        Self { groups }
    }

    /// Returns true if no group has been produced.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterates the groups of one reference.
    pub fn groups_of<'a>(
        &'a self,
        reference_name: &'a str,
    ) -> impl Iterator<Item = &'a FacetGroupStatistics> + 'a {
        self.groups
            .iter()
            .filter(move |group| group.reference_name == reference_name)
    }

    /// Looks up one group.
    pub fn group(
        &self,
        reference_name: &str,
        group_id: Option<PrimaryKey>,
    ) -> Option<&FacetGroupStatistics> {
        self.groups
            .iter()
            .find(|group| group.reference_name == reference_name && group.group_id() == group_id)
    }

    /// Looks up a facet in any group of the reference.
    pub fn facet(&self, reference_name: &str, primary_key: PrimaryKey) -> Option<&FacetStatistics> {
        self.groups
            .iter()
            .filter(|group| group.reference_name == reference_name)
            .find_map(|group| group.facet(primary_key))
    }
}

impl fmt::Display for FacetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Facet summary:")?;
        for group in &self.groups {
            match group.group_id() {
                Some(group_id) => writeln!(
                    f,
                    "\t{} (group {}): {}",
                    group.reference_name, group_id, group.count
                )?,
                None => writeln!(f, "\t{}: {}", group.reference_name, group.count)?,
            }
            for facet in &group.facets {
                let marker = if facet.requested { "[X]" } else { "[ ]" };
                write!(f, "\t\t{} {}: {}", marker, facet.primary_key(), facet.count)?;
                if let Some(impact) = &facet.impact {
                    write!(f, " ({})", impact)?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facet(primary_key: PrimaryKey, requested: bool, count: usize, delta: Option<i64>) -> FacetStatistics {
        FacetStatistics {
            facet: EntityBody::reference("Brand", primary_key),
            requested,
            count,
            impact: delta.map(|delta| Impact {
                delta,
                new_count: (count as i64 + delta) as usize,
                has_sense: delta != 0,
            }),
        }
    }

    #[test]
    fn test_impact_display_is_signed() {
        let impact = |delta| Impact {
            delta,
            new_count: 0,
            has_sense: true,
        };
        assert_eq!(impact(5).to_string(), "+5");
        assert_eq!(impact(-3).to_string(), "-3");
        assert_eq!(impact(0).to_string(), "0");
    }

    #[test]
    fn test_entity_body_attribute() {
        let fetched = EntityBody::Entity(FetchedEntity::new("Brand", 1).with_attribute("name", "Acme"));
        assert_eq!(fetched.attribute("name"), Some(&Value::from("Acme")));
        assert!(fetched.is_fetched());
        assert_eq!(EntityBody::reference("Brand", 1).attribute("name"), None);
        assert_eq!(fetched.entity_type(), "Brand");
    }

    #[test]
    fn test_summary_lookup() {
        let summary = FacetSummary::new(vec![
            FacetGroupStatistics {
                reference_name: "brand".to_string(),
                group: None,
                count: 4,
                facets: vec![facet(1, true, 3, None), facet(2, false, 1, None)],
            },
            FacetGroupStatistics {
                reference_name: "parameter".to_string(),
                group: Some(EntityBody::reference("Parameter", 7)),
                count: 2,
                facets: vec![facet(20, false, 2, None)],
            },
        ]);
        assert_eq!(summary.groups_of("brand").count(), 1);
        assert!(summary.group("parameter", Some(7)).is_some());
        assert!(summary.group("parameter", None).is_none());
        assert_eq!(summary.facet("brand", 2).map(|it| it.count), Some(1));
        assert!(summary.facet("parameter", 1).is_none());

        // the found facet borrows the summary, not the looked up name
        let found = {
            let reference_name = String::from("brand");
            summary.facet(&reference_name, 1)
        };
        assert_eq!(found.map(|it| it.count), Some(3));
    }

    #[test]
    fn test_summary_display() {
        let summary = FacetSummary::new(vec![
            FacetGroupStatistics {
                reference_name: "brand".to_string(),
                group: None,
                count: 4,
                facets: vec![facet(1, true, 3, Some(0)), facet(2, false, 1, Some(1))],
            },
            FacetGroupStatistics {
                reference_name: "parameter".to_string(),
                group: Some(EntityBody::reference("Parameter", 7)),
                count: 2,
                facets: vec![facet(20, false, 2, None)],
            },
        ]);
        assert_eq!(
            summary.to_string(),
            "Facet summary:\n\
             \tbrand: 4\n\
             \t\t[X] 1: 3 (0)\n\
             \t\t[ ] 2: 1 (+1)\n\
             \tparameter (group 7): 2\n\
             \t\t[ ] 20: 2\n"
        );
    }
}
