//! Error types for facet statistics computation.

use facet_query::{PrimaryKey, QueryError};
use thiserror::Error;

/// Errors that can occur while computing a facet summary.
///
/// Every variant is fatal for the whole computation; nothing is retried.
#[derive(Error, Debug)]
pub enum FacetSummaryError {
    /// Query text could not be parsed.
    #[error("Query parse error: {0}")]
    Query(#[from] QueryError),

    /// A facet selection carries a child the engine cannot interpret.
    #[error("Malformed facet filter for reference `{reference_name}`: {message}")]
    MalformedFacetFilter {
        /// Reference named by the offending `facetHaving`.
        reference_name: String,
        /// Description of the problem.
        message: String,
    },

    /// A selection, directive or statistics request names a reference the
    /// entity schema does not declare.
    #[error("Unknown reference schema: {0}")]
    UnknownReferenceSchema(String),

    /// A facet or group id present in the candidate set could not be resolved
    /// by the entity fetcher.
    #[error("Dangling reference: {entity_type} with primary key {primary_key} not found")]
    DanglingReference {
        /// Referenced entity type.
        entity_type: String,
        /// Missing primary key.
        primary_key: PrimaryKey,
    },

    /// A facet or group filter clause that cannot be reduced to a primary key test.
    #[error("Unsupported constraint in facet or group filter: {0}")]
    UnsupportedConstraint(String),

    /// Error reported by a collaborator.
    #[error("Store error: {0}")]
    Store(String),
}

/// Result type for facet summary operations.
pub type FacetResult<T> = std::result::Result<T, FacetSummaryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_unknown_reference() {
        let err = FacetSummaryError::UnknownReferenceSchema("brand".to_string());
        assert_eq!(err.to_string(), "Unknown reference schema: brand");
    }

    #[test]
    fn test_error_display_dangling_reference() {
        let err = FacetSummaryError::DanglingReference {
            entity_type: "Brand".to_string(),
            primary_key: 42,
        };
        assert_eq!(
            err.to_string(),
            "Dangling reference: Brand with primary key 42 not found"
        );
    }

    #[test]
    fn test_error_display_malformed_filter() {
        let err = FacetSummaryError::MalformedFacetFilter {
            reference_name: "brand".to_string(),
            message: "unexpected attributeEquals".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed facet filter for reference `brand`: unexpected attributeEquals"
        );
    }

    #[test]
    fn test_error_from_query_error() {
        let err: FacetSummaryError = QueryError::EmptyQuery.into();
        assert!(matches!(err, FacetSummaryError::Query(_)));
        assert_eq!(err.to_string(), "Query parse error: empty query");
    }
}
