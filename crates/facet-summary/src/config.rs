//! Configuration types for the facet summary computer.

use facet_query::RelationType;

/// Configuration for the facet summary computer.
///
/// The relation defaults apply when the query carries no
/// `facetCalculationRules` directive; a directive in the query always wins.
///
/// # Example
///
/// ```rust
/// use facet_query::RelationType;
/// use facet_summary::SummaryConfig;
///
/// let config = SummaryConfig::builder()
///     .with_default_facet_relation(RelationType::Conjunction)
///     .with_skip_empty_facets(true)
///     .with_max_facets_per_group(20)
///     .build();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryConfig {
    /// Relation of facets inside one group.
    pub default_facet_relation: RelationType,
    /// Relation of different groups.
    pub default_group_relation: RelationType,
    /// Drop facets whose published count is zero.
    pub skip_empty_facets: bool,
    /// Maximum number of facets kept per group after sorting (None = unlimited).
    pub max_facets_per_group: Option<usize>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            default_facet_relation: RelationType::Disjunction,
            default_group_relation: RelationType::Conjunction,
            skip_empty_facets: false,
            max_facets_per_group: None,
        }
    }
}

impl SummaryConfig {
    /// Creates a new builder for SummaryConfig.
    pub fn builder() -> SummaryConfigBuilder {
        SummaryConfigBuilder::default()
    }
}

/// Builder for SummaryConfig.
#[derive(Debug, Clone, Default)]
pub struct SummaryConfigBuilder {
    config: SummaryConfig,
}

impl SummaryConfigBuilder {
    /// Sets the relation of facets inside one group.
    pub fn with_default_facet_relation(mut self, relation: RelationType) -> Self {
        self.config.default_facet_relation = relation;
        self
    }

    /// Sets the relation of different groups.
    pub fn with_default_group_relation(mut self, relation: RelationType) -> Self {
        self.config.default_group_relation = relation;
        self
    }

    /// Enables or disables dropping of facets with zero count.
    pub fn with_skip_empty_facets(mut self, skip: bool) -> Self {
        self.config.skip_empty_facets = skip;
        self
    }

    /// Limits the number of facets per group.
    pub fn with_max_facets_per_group(mut self, max_facets: usize) -> Self {
        self.config.max_facets_per_group = Some(max_facets);
        self
    }

    /// Builds the SummaryConfig.
    pub fn build(self) -> SummaryConfig {
        self.config
    }
}
