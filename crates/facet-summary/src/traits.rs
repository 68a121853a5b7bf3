//! Collaborator traits for facet statistics computation.
//!
//! The engine never owns data. Candidate entities, entity bodies, hierarchy
//! structure and facet group membership are all supplied by the caller
//! through the traits in this module.
//!
//! # Example: wiring a store
//!
//! ```ignore
//! use facet_summary::{EntityFetcher, FacetResult, FetchedEntity, HierarchyLookup};
//! use facet_query::{EntityFetch, PrimaryKey};
//!
//! impl EntityFetcher for MyStore {
//!     fn fetch_entities(
//!         &self,
//!         entity_type: &str,
//!         primary_keys: &[PrimaryKey],
//!         requirement: &EntityFetch,
//!     ) -> FacetResult<Vec<FetchedEntity>> {
//!         self.load_bodies(entity_type, primary_keys, requirement)
//!     }
//! }
//!
//! impl HierarchyLookup for MyStore {
//!     fn children_of(&self, entity_type: &str, primary_key: PrimaryKey) -> Vec<PrimaryKey> {
//!         self.hierarchy(entity_type).children(primary_key)
//!     }
//! }
//! ```

use std::collections::HashMap;

use facet_query::{EntityFetch, PrimaryKey};
use tracing::warn;

use crate::error::FacetResult;
use crate::result::FetchedEntity;

// =============================================================================
// Candidate entities
// =============================================================================

/// One reference held by a candidate entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityReference {
    /// Reference name.
    pub reference_name: String,
    /// Referenced (facet) entity primary key.
    pub referenced_primary_key: PrimaryKey,
    /// Group the facet belongs to, if the reference is grouped.
    pub group_primary_key: Option<PrimaryKey>,
}

impl EntityReference {
    /// Creates an ungrouped reference.
    pub fn new(reference_name: impl Into<String>, referenced_primary_key: PrimaryKey) -> Self {
        Self {
            reference_name: reference_name.into(),
            referenced_primary_key,
            group_primary_key: None,
        }
    }

    /// Creates a reference whose facet belongs to a group.
    pub fn grouped(
        reference_name: impl Into<String>,
        referenced_primary_key: PrimaryKey,
        group_primary_key: PrimaryKey,
    ) -> Self {
        Self {
            reference_name: reference_name.into(),
            referenced_primary_key,
            group_primary_key: Some(group_primary_key),
        }
    }
}

/// An entity of the candidate set as seen by the engine.
pub trait FacetedEntity {
    /// Entity primary key, unique within the candidate set.
    fn primary_key(&self) -> PrimaryKey;

    /// All references of the entity.
    fn references(&self) -> &[EntityReference];

    /// Returns true if the entity references `primary_key` through `reference_name`.
    fn has_reference(&self, reference_name: &str, primary_key: PrimaryKey) -> bool {
        self.references().iter().any(|reference| {
            reference.referenced_primary_key == primary_key
                && reference.reference_name == reference_name
        })
    }
}

/// Plain candidate entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Entity primary key.
    pub primary_key: PrimaryKey,
    /// References of the entity.
    pub references: Vec<EntityReference>,
}

impl Entity {
    /// Creates an entity without references.
    pub fn new(primary_key: PrimaryKey) -> Self {
        Self {
            primary_key,
            references: Vec::new(),
        }
    }

    /// Adds an ungrouped reference.
    pub fn with_reference(mut self, reference_name: &str, primary_key: PrimaryKey) -> Self {
        self.references
            .push(EntityReference::new(reference_name, primary_key));
        self
    }

    /// Adds a grouped reference.
    pub fn with_grouped_reference(
        mut self,
        reference_name: &str,
        primary_key: PrimaryKey,
        group_primary_key: PrimaryKey,
    ) -> Self {
        self.references.push(EntityReference::grouped(
            reference_name,
            primary_key,
            group_primary_key,
        ));
        self
    }
}

impl FacetedEntity for Entity {
    fn primary_key(&self) -> PrimaryKey {
        self.primary_key
    }

    fn references(&self) -> &[EntityReference] {
        &self.references
    }
}

impl<T: FacetedEntity + ?Sized> FacetedEntity for &T {
    fn primary_key(&self) -> PrimaryKey {
        (**self).primary_key()
    }

    fn references(&self) -> &[EntityReference] {
        (**self).references()
    }
}

// =============================================================================
// Entity bodies
// =============================================================================

/// Resolves facet and group entity bodies.
///
/// Implementations should return one body per requested key they know.
/// Keys they do not return are reported as dangling references.
pub trait EntityFetcher: Send + Sync {
    /// Fetches bodies of `entity_type` entities with the given primary keys,
    /// projected according to `requirement`.
    fn fetch_entities(
        &self,
        entity_type: &str,
        primary_keys: &[PrimaryKey],
        requirement: &EntityFetch,
    ) -> FacetResult<Vec<FetchedEntity>>;
}

// =============================================================================
// Hierarchy
// =============================================================================

/// Parent/child structure of hierarchical entity types.
pub trait HierarchyLookup: Send + Sync {
    /// Gets direct children of an entity.
    ///
    /// Returns an empty Vec if the entity has no children or doesn't exist.
    fn children_of(&self, entity_type: &str, primary_key: PrimaryKey) -> Vec<PrimaryKey>;
}

/// Hierarchy without any parent/child links.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHierarchy;

impl HierarchyLookup for NoHierarchy {
    fn children_of(&self, _entity_type: &str, _primary_key: PrimaryKey) -> Vec<PrimaryKey> {
        Vec::new()
    }
}

// =============================================================================
// Facet groups
// =============================================================================

/// Resolves the group a facet of a grouped reference belongs to.
pub trait FacetGroupLookup: Send + Sync {
    /// Returns the group of the facet, or `None` when the facet is ungrouped
    /// or unknown.
    fn group_of(&self, reference_name: &str, facet_id: PrimaryKey) -> Option<PrimaryKey>;
}

/// Facet to group mapping collected from entity references.
#[derive(Debug, Clone, Default)]
pub struct FacetGroupMapping {
    groups: HashMap<String, HashMap<PrimaryKey, PrimaryKey>>,
}

impl FacetGroupMapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `facet_id` of `reference_name` belongs to `group_id`.
    ///
    /// The first recorded group wins; conflicting later records are logged
    /// and ignored.
    pub fn insert(&mut self, reference_name: &str, facet_id: PrimaryKey, group_id: PrimaryKey) {
        let facets = self.groups.entry(reference_name.to_string()).or_default();
        let existing = *facets.entry(facet_id).or_insert(group_id);
        if existing != group_id {
            warn!(
                reference = reference_name,
                facet_id,
                group_id,
                existing,
                "facet is referenced under more than one group, keeping the first"
            );
        }
    }

    /// Builds the mapping from grouped references of the given entities.
    pub fn from_entities<E: FacetedEntity>(entities: &[E]) -> Self {
        let mut mapping = Self::new();
        for entity in entities {
            for reference in entity.references() {
                if let Some(group_id) = reference.group_primary_key {
                    mapping.insert(
                        &reference.reference_name,
                        reference.referenced_primary_key,
                        group_id,
                    );
                }
            }
        }
        mapping
    }
}

impl FacetGroupLookup for FacetGroupMapping {
    fn group_of(&self, reference_name: &str, facet_id: PrimaryKey) -> Option<PrimaryKey> {
        self.groups
            .get(reference_name)
            .and_then(|facets| facets.get(&facet_id))
            .copied()
    }
}
