//! # facet-summary
//!
//! Faceted navigation statistics for a document database query layer.
//!
//! Given the candidate entities of a query (the result of its non-facet
//! filter) and the facet selection of the query, this crate computes for
//! every facet of every faceted reference:
//!
//! - how many candidates reference it,
//! - whether it is selected in the query,
//! - optionally its **impact**: how the result would change if the facet
//!   were added to the selection.
//!
//! Facets are organized in groups. How selected facets combine is configured
//! at two levels, among facets of one group and among groups, with one of
//! four relation types (AND, OR, NOT and exclusive).
//!
//! ## Quick Start
//!
//! ```rust
//! use facet_summary::{Entity, EntitySchema, FacetSummaryComputer, ReferenceSchema};
//!
//! let schema = EntitySchema::new("Product")
//!     .with_reference(ReferenceSchema::new("brand", "Brand"))
//!     .with_reference(
//!         ReferenceSchema::new("parameter", "ParameterValue").with_group_type("Parameter", true),
//!     );
//!
//! let candidates = vec![
//!     Entity::new(1).with_reference("brand", 1).with_grouped_reference("parameter", 2, 7),
//!     Entity::new(2).with_reference("brand", 1).with_grouped_reference("parameter", 3, 7),
//!     Entity::new(3).with_reference("brand", 2),
//! ];
//!
//! let computer = FacetSummaryComputer::new(&schema);
//! let summary = computer.compute_str(
//!     "query(filterBy(facetHaving('brand', entityPrimaryKeyInSet(1))), require(facetSummary(IMPACT)))",
//!     &candidates,
//! )?;
//!
//! assert!(summary.facet("brand", 1).unwrap().requested);
//! assert_eq!(summary.group("parameter", Some(7)).unwrap().count, 2);
//! println!("{}", summary);
//! # Ok::<(), facet_summary::FacetSummaryError>(())
//! ```
//!
//! ## Relation Types
//!
//! | Relation | Within a group | Among groups |
//! |----------|----------------|--------------|
//! | Conjunction | entity references all selected facets | all groups must match |
//! | Disjunction | entity references any selected facet | alternative to the required groups (alone it matches everything) |
//! | Negation | entity references none of the selected facets (counts inverted) | group must match |
//! | Exclusivity | one facet at a time (matches like Disjunction) | one group at a time |
//!
//! Defaults are Disjunction within a group and Conjunction among groups,
//! see [`SummaryConfig`].
//!
//! ## Feature Flags
//!
//! - `serde` - Serialize/Deserialize for the query model and the result types
//! - `parallel` - Computes facet impacts in parallel using rayon
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        facet-summary                          │
//! │                                                               │
//! │  FacetSummaryComputer                                         │
//! │  ├── RelationConfiguration  facetGroups* / calculation rules  │
//! │  ├── StatisticsRequests     facetSummary / ...OfReference     │
//! │  ├── SelectionContext       facetHaving → FacetPredicates     │
//! │  │   └── HierarchyTraverser includingChildren* expansion      │
//! │  ├── CandidateIndex         facet → candidates (roaring)      │
//! │  ├── StatisticsAggregator   counts, negation, bodies          │
//! │  │   └── ImpactCalculator   PredicateCombinator per facet     │
//! │  └── StatisticsSorter       group / facet ordering            │
//! │                                                               │
//! │  Collaborators (traits):                                      │
//! │  ├── EntityFetcher      - facet and group bodies              │
//! │  ├── HierarchyLookup    - children of hierarchical entities   │
//! │  └── FacetGroupLookup   - group of a selected facet           │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod aggregator;
mod bitset;
mod combinator;
mod computer;
mod config;
mod error;
mod filter;
mod impact;
mod index;
mod key;
mod predicate;
mod relation;
mod request;
mod result;
mod schema;
mod selection;
mod sorter;
mod traits;
mod traverser;

// Public re-exports
pub use aggregator::StatisticsAggregator;
pub use bitset::EntityIdSet;
pub use combinator::PredicateCombinator;
pub use computer::FacetSummaryComputer;
pub use config::{SummaryConfig, SummaryConfigBuilder};
pub use error::{FacetResult, FacetSummaryError};
pub use filter::IdFilter;
pub use impact::ImpactCalculator;
pub use index::CandidateIndex;
pub use key::{compare_group_ids, GroupReference, ReferenceKey};
pub use predicate::{EntityPredicate, FacetPredicate, FacetPredicateFactory};
pub use relation::RelationConfiguration;
pub use request::{StatisticsRequest, StatisticsRequests};
pub use result::{
    EntityBody, FacetGroupStatistics, FacetStatistics, FacetSummary, FetchedEntity, Impact,
};
pub use schema::{EntitySchema, ReferenceSchema};
pub use selection::{extract_facet_ids, SelectionContext};
pub use sorter::{compare_bodies, FacetComparator, GroupComparator, StatisticsSorter};
pub use traits::{
    Entity, EntityFetcher, EntityReference, FacetGroupLookup, FacetGroupMapping, FacetedEntity,
    HierarchyLookup, NoHierarchy,
};
pub use traverser::{HierarchyRefinement, HierarchyTraverser};

// Re-export commonly used types from the query crate for convenience
pub use facet_query::{PrimaryKey, Query, RelationLevel, RelationType, StatisticsDepth};
