//! Inverted index of the candidate set.
//!
//! Built once per computation: for each reference name and facet id the
//! bitmap of candidate entities referencing it. Predicates evaluate against
//! this index with bitmap operations instead of re-scanning entities for
//! every facet whose impact is computed.

use std::collections::HashMap;

use facet_query::PrimaryKey;

use crate::bitset::EntityIdSet;
use crate::traits::FacetedEntity;

/// Candidate entity ids plus reference name → facet id → entity ids.
#[derive(Debug, Clone, Default)]
pub struct CandidateIndex {
    all: EntityIdSet,
    facets: HashMap<String, HashMap<PrimaryKey, EntityIdSet>>,
}

impl CandidateIndex {
    /// Builds the index from the candidate entities.
    pub fn from_entities<E: FacetedEntity>(entities: &[E]) -> Self {
        let mut index = Self::default();
        for entity in entities {
            let primary_key = entity.primary_key();
            index.all.insert(primary_key);
            for reference in entity.references() {
                index
                    .facets
                    .entry(reference.reference_name.clone())
                    .or_default()
                    .entry(reference.referenced_primary_key)
                    .or_default()
                    .insert(primary_key);
            }
        }
        index
    }

    /// All candidate entity ids.
    pub fn all(&self) -> &EntityIdSet {
        &self.all
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.all.len()
    }

    /// Returns true if there are no candidates.
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Candidates referencing the facet, if any.
    pub fn entities_referencing(
        &self,
        reference_name: &str,
        facet_id: PrimaryKey,
    ) -> Option<&EntityIdSet> {
        self.facets
            .get(reference_name)
            .and_then(|facets| facets.get(&facet_id))
    }

    /// Union of candidates referencing any of the facets.
    pub fn entities_referencing_any(
        &self,
        reference_name: &str,
        facet_ids: &EntityIdSet,
    ) -> EntityIdSet {
        let mut result = EntityIdSet::new();
        if let Some(facets) = self.facets.get(reference_name) {
            for facet_id in facet_ids {
                if let Some(entities) = facets.get(&facet_id) {
                    result.union_with(entities);
                }
            }
        }
        result
    }

    /// Intersection of candidates referencing every one of the facets.
    ///
    /// An empty facet set yields all candidates.
    pub fn entities_referencing_all(
        &self,
        reference_name: &str,
        facet_ids: &EntityIdSet,
    ) -> EntityIdSet {
        let mut result = self.all.clone();
        for facet_id in facet_ids {
            match self.entities_referencing(reference_name, facet_id) {
                Some(entities) => result.intersect_with(entities),
                None => return EntityIdSet::new(),
            }
            if result.is_empty() {
                break;
            }
        }
        result
    }
}
