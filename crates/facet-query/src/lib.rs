//! # facet-query
//!
//! Constraint model and text parser for the facet-related part of a
//! document database query.
//!
//! This crate provides:
//! - **Constraint tree**: typed filter, order and require constraints with
//!   convenience constructors and a `Display` form that parses back
//! - **Parser**: a nom based parser for the textual query language
//!
//! ## Usage
//!
//! ```rust
//! use facet_query::{parse, FilterConstraint, Query, RequireConstraint, StatisticsDepth};
//!
//! // Parse a query
//! let query = parse(
//!     "query(collection('product'), \
//!      filterBy(userFilter(facetHaving('brand', entityPrimaryKeyInSet(1, 2)))), \
//!      require(facetSummary(IMPACT)))",
//! )
//! .unwrap();
//!
//! // Build the same query in code
//! let built = Query::builder()
//!     .collection("product")
//!     .filter(FilterConstraint::UserFilter(vec![
//!         FilterConstraint::facet_having("brand", [1, 2]),
//!     ]))
//!     .require(RequireConstraint::facet_summary(StatisticsDepth::Impact))
//!     .build();
//!
//! assert_eq!(query, built);
//! ```
//!
//! ## Facet Constraint Quick Reference
//!
//! | Constraint | Meaning |
//! |------------|---------|
//! | `facetHaving('ref', entityPrimaryKeyInSet(..))` | Selects facets of a reference |
//! | `includingChildren()` | Selection covers all descendants |
//! | `includingChildrenHaving(..)` | Selection covers matching descendants |
//! | `includingChildrenExcept(..)` | Selection covers descendants outside matching subtrees |
//! | `facetGroupsConjunction('ref', level, ..)` | AND relation for groups |
//! | `facetGroupsDisjunction('ref', level, ..)` | OR relation for groups |
//! | `facetGroupsNegation('ref', level, ..)` | NOT relation for groups |
//! | `facetGroupsExclusivity('ref', level, ..)` | Exclusive relation for groups |
//! | `facetCalculationRules(same, different)` | Default relation types |
//! | `facetSummary(depth, ..)` | Statistics for every faceted reference |
//! | `facetSummaryOfReference('ref', depth, ..)` | Statistics settings of one reference |

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod ast;
mod error;
mod parser;

pub use ast::{
    AttributeContent, EntityFetch, FacetSummaryRequirement, FilterConstraint, OrderConstraint,
    OrderDirection, Query, QueryBuilder, RelationLevel, RelationType, RequireConstraint,
    StatisticsDepth, Value,
};
pub use error::{QueryError, QueryResult};
pub use parser::{parse, parse_filter, parse_require};

/// Entity primary key.
pub type PrimaryKey = u32;
