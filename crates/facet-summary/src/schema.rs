//! Entity and reference schema metadata consumed by the engine.

use std::collections::BTreeMap;

use crate::error::{FacetResult, FacetSummaryError};

/// Schema of one reference of an entity type (e.g. `brand`, `parameter`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSchema {
    /// Reference name.
    pub name: String,
    /// Entity type of the referenced entities (the facets).
    pub referenced_entity_type: String,
    /// Whether referenced entities are stored in this database and can be fetched.
    pub referenced_entity_type_managed: bool,
    /// Entity type of the facet groups, `None` for ungrouped references.
    pub referenced_group_type: Option<String>,
    /// Whether group entities are stored in this database and can be fetched.
    pub referenced_group_type_managed: bool,
    /// Whether the reference takes part in faceted navigation.
    pub faceted: bool,
    /// Whether referenced entities form a hierarchy (categories and the like).
    pub hierarchical: bool,
}

impl ReferenceSchema {
    /// Creates a faceted, ungrouped reference to a managed entity type.
    pub fn new(name: impl Into<String>, referenced_entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            referenced_entity_type: referenced_entity_type.into(),
            referenced_entity_type_managed: true,
            referenced_group_type: None,
            referenced_group_type_managed: true,
            faceted: true,
            hierarchical: false,
        }
    }

    /// Declares the group entity type.
    pub fn with_group_type(mut self, group_type: impl Into<String>, managed: bool) -> Self {
        self.referenced_group_type = Some(group_type.into());
        self.referenced_group_type_managed = managed;
        self
    }

    /// Marks referenced entities as managed or external.
    pub fn with_managed(mut self, managed: bool) -> Self {
        self.referenced_entity_type_managed = managed;
        self
    }

    /// Marks the reference as faceted or not.
    pub fn with_faceted(mut self, faceted: bool) -> Self {
        self.faceted = faceted;
        self
    }

    /// Marks referenced entities as hierarchical.
    pub fn with_hierarchical(mut self, hierarchical: bool) -> Self {
        self.hierarchical = hierarchical;
        self
    }

    /// Returns true if facets of this reference are partitioned into groups.
    pub fn is_grouped(&self) -> bool {
        self.referenced_group_type.is_some()
    }
}

/// Schema of the queried entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    /// Entity type name.
    pub name: String,
    references: BTreeMap<String, ReferenceSchema>,
}

impl EntitySchema {
    /// Creates a schema without references.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            references: BTreeMap::new(),
        }
    }

    /// Adds a reference schema, replacing one with the same name.
    pub fn with_reference(mut self, reference: ReferenceSchema) -> Self {
        self.references.insert(reference.name.clone(), reference);
        self
    }

    /// Looks up a reference schema.
    pub fn reference(&self, name: &str) -> Option<&ReferenceSchema> {
        self.references.get(name)
    }

    /// Looks up a reference schema, failing with
    /// [`FacetSummaryError::UnknownReferenceSchema`] when absent.
    pub fn reference_or_err(&self, name: &str) -> FacetResult<&ReferenceSchema> {
        self.reference(name)
            .ok_or_else(|| FacetSummaryError::UnknownReferenceSchema(name.to_string()))
    }

    /// Iterates all references in name order.
    pub fn references(&self) -> impl Iterator<Item = &ReferenceSchema> {
        self.references.values()
    }

    /// Iterates faceted references in name order.
    pub fn faceted_references(&self) -> impl Iterator<Item = &ReferenceSchema> {
        self.references.values().filter(|reference| reference.faceted)
    }
}
