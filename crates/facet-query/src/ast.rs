//! Constraint tree types for facet-aware queries.

use std::fmt;

use crate::PrimaryKey;

// =============================================================================
// Vocabulary
// =============================================================================

/// Boolean combination rule applied to facets or facet groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RelationType {
    /// All selected facets must be referenced: `CONJUNCTION`
    Conjunction,
    /// At least one selected facet must be referenced: `DISJUNCTION`
    Disjunction,
    /// None of the selected facets may be referenced: `NEGATION`
    Negation,
    /// Only one facet (group) may be selected at a time: `EXCLUSIVITY`
    Exclusivity,
}

impl RelationType {
    /// All relation types in directive precedence order.
    pub const ALL: [RelationType; 4] = [
        RelationType::Conjunction,
        RelationType::Negation,
        RelationType::Exclusivity,
        RelationType::Disjunction,
    ];

    /// Precedence used when several directives target the same group.
    ///
    /// Lower value wins.
    pub fn precedence(self) -> u8 {
        match self {
            RelationType::Conjunction => 0,
            RelationType::Negation => 1,
            RelationType::Exclusivity => 2,
            RelationType::Disjunction => 3,
        }
    }

    /// Keyword used in the textual query form.
    pub fn keyword(self) -> &'static str {
        match self {
            RelationType::Conjunction => "CONJUNCTION",
            RelationType::Disjunction => "DISJUNCTION",
            RelationType::Negation => "NEGATION",
            RelationType::Exclusivity => "EXCLUSIVITY",
        }
    }

    /// Name of the group-relation directive that selects this type.
    pub fn directive_name(self) -> &'static str {
        match self {
            RelationType::Conjunction => "facetGroupsConjunction",
            RelationType::Disjunction => "facetGroupsDisjunction",
            RelationType::Negation => "facetGroupsNegation",
            RelationType::Exclusivity => "facetGroupsExclusivity",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Level at which a relation type applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RelationLevel {
    /// Facets inside one group: `WITH_DIFFERENT_FACETS_IN_GROUP`
    WithinGroup,
    /// Groups combined with each other: `WITH_DIFFERENT_GROUPS`
    AcrossGroups,
}

impl RelationLevel {
    /// Keyword used in the textual query form.
    pub fn keyword(self) -> &'static str {
        match self {
            RelationLevel::WithinGroup => "WITH_DIFFERENT_FACETS_IN_GROUP",
            RelationLevel::AcrossGroups => "WITH_DIFFERENT_GROUPS",
        }
    }
}

impl fmt::Display for RelationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// How much detail facet statistics carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StatisticsDepth {
    /// Occurrence counts only.
    #[default]
    Counts,
    /// Counts plus the counterfactual impact of selecting each facet.
    Impact,
}

impl fmt::Display for StatisticsDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatisticsDepth::Counts => f.write_str("COUNTS"),
            StatisticsDepth::Impact => f.write_str("IMPACT"),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OrderDirection {
    /// Ascending: `ASC`
    #[default]
    Asc,
    /// Descending: `DESC`
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => f.write_str("ASC"),
            OrderDirection::Desc => f.write_str("DESC"),
        }
    }
}

/// Literal value used in attribute constraints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Text value.
    Text(String),
    /// Integer value.
    Integer(i64),
    /// Boolean value.
    Boolean(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => write!(f, "'{}'", text),
            Value::Integer(number) => write!(f, "{}", number),
            Value::Boolean(flag) => write!(f, "{}", flag),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

// =============================================================================
// Filter constraints
// =============================================================================

/// A node of the filter tree.
///
/// Facet selection lives in [`FilterConstraint::FacetHaving`]; the other
/// variants are carried so the selection can be found wherever it is nested.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FilterConstraint {
    /// All children must match: `and(...)`
    And(Vec<FilterConstraint>),
    /// Any child must match: `or(...)`
    Or(Vec<FilterConstraint>),
    /// Child must not match: `not(...)`
    Not(Box<FilterConstraint>),
    /// Part of the filter controlled by the end user: `userFilter(...)`
    UserFilter(Vec<FilterConstraint>),
    /// Primary key membership: `entityPrimaryKeyInSet(1, 2, 3)`
    EntityPrimaryKeyInSet(Vec<PrimaryKey>),
    /// Facet selection: `facetHaving('brand', entityPrimaryKeyInSet(1, 2))`
    FacetHaving {
        /// Name of the faceted reference.
        reference_name: String,
        /// Id set and optional hierarchy refinement.
        children: Vec<FilterConstraint>,
    },
    /// Expands selected hierarchical facets by all their descendants.
    IncludingChildren,
    /// Expands selected hierarchical facets by descendants matching the children.
    IncludingChildrenHaving(Vec<FilterConstraint>),
    /// Expands selected hierarchical facets by descendants except the matching subtrees.
    IncludingChildrenExcept(Vec<FilterConstraint>),
    /// Attribute equality: `attributeEquals('code', 'abc')`
    AttributeEquals {
        /// Attribute name.
        attribute_name: String,
        /// Compared value.
        value: Value,
    },
}

impl FilterConstraint {
    /// Creates `entityPrimaryKeyInSet(...)`.
    pub fn primary_keys(ids: impl IntoIterator<Item = PrimaryKey>) -> Self {
        FilterConstraint::EntityPrimaryKeyInSet(ids.into_iter().collect())
    }

    /// Creates `facetHaving(reference, entityPrimaryKeyInSet(ids))`.
    pub fn facet_having(
        reference_name: impl Into<String>,
        ids: impl IntoIterator<Item = PrimaryKey>,
    ) -> Self {
        FilterConstraint::FacetHaving {
            reference_name: reference_name.into(),
            children: vec![FilterConstraint::primary_keys(ids)],
        }
    }

    /// Creates `facetHaving(reference, children...)` with arbitrary children.
    pub fn facet_having_with(
        reference_name: impl Into<String>,
        children: Vec<FilterConstraint>,
    ) -> Self {
        FilterConstraint::FacetHaving {
            reference_name: reference_name.into(),
            children,
        }
    }

    /// Creates `attributeEquals(name, value)`.
    pub fn attribute_equals(attribute_name: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterConstraint::AttributeEquals {
            attribute_name: attribute_name.into(),
            value: value.into(),
        }
    }

    /// Returns the constraint name used in the textual form.
    pub fn name(&self) -> &'static str {
        match self {
            FilterConstraint::And(_) => "and",
            FilterConstraint::Or(_) => "or",
            FilterConstraint::Not(_) => "not",
            FilterConstraint::UserFilter(_) => "userFilter",
            FilterConstraint::EntityPrimaryKeyInSet(_) => "entityPrimaryKeyInSet",
            FilterConstraint::FacetHaving { .. } => "facetHaving",
            FilterConstraint::IncludingChildren => "includingChildren",
            FilterConstraint::IncludingChildrenHaving(_) => "includingChildrenHaving",
            FilterConstraint::IncludingChildrenExcept(_) => "includingChildrenExcept",
            FilterConstraint::AttributeEquals { .. } => "attributeEquals",
        }
    }

    /// Returns the direct child constraints.
    pub fn children(&self) -> &[FilterConstraint] {
        match self {
            FilterConstraint::And(children)
            | FilterConstraint::Or(children)
            | FilterConstraint::UserFilter(children)
            | FilterConstraint::IncludingChildrenHaving(children)
            | FilterConstraint::IncludingChildrenExcept(children)
            | FilterConstraint::FacetHaving { children, .. } => children,
            FilterConstraint::Not(child) => std::slice::from_ref(child.as_ref()),
            FilterConstraint::EntityPrimaryKeyInSet(_)
            | FilterConstraint::IncludingChildren
            | FilterConstraint::AttributeEquals { .. } => &[],
        }
    }

    /// Collects all `facetHaving` nodes in depth-first order.
    pub fn facet_having_constraints(&self) -> Vec<&FilterConstraint> {
        let mut found = Vec::new();
        self.collect_facet_having(&mut found);
        found
    }

    fn collect_facet_having<'a>(&'a self, found: &mut Vec<&'a FilterConstraint>) {
        if let FilterConstraint::FacetHaving { .. } = self {
            found.push(self);
            return;
        }
        for child in self.children() {
            child.collect_facet_having(found);
        }
    }
}

impl fmt::Display for FilterConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterConstraint::EntityPrimaryKeyInSet(ids) => {
                write!(f, "entityPrimaryKeyInSet(")?;
                write_joined(f, ids)?;
                write!(f, ")")
            }
            FilterConstraint::FacetHaving {
                reference_name,
                children,
            } => {
                write!(f, "facetHaving('{}'", reference_name)?;
                for child in children {
                    write!(f, ", {}", child)?;
                }
                write!(f, ")")
            }
            FilterConstraint::Not(child) => write!(f, "not({})", child),
            FilterConstraint::IncludingChildren => write!(f, "includingChildren()"),
            FilterConstraint::AttributeEquals {
                attribute_name,
                value,
            } => write!(f, "attributeEquals('{}', {})", attribute_name, value),
            FilterConstraint::And(children)
            | FilterConstraint::Or(children)
            | FilterConstraint::UserFilter(children)
            | FilterConstraint::IncludingChildrenHaving(children)
            | FilterConstraint::IncludingChildrenExcept(children) => {
                write!(f, "{}(", self.name())?;
                write_joined(f, children)?;
                write!(f, ")")
            }
        }
    }
}

// =============================================================================
// Order constraints
// =============================================================================

/// Ordering rule for facets or facet groups in the statistics output.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OrderConstraint {
    /// Order by primary key: `entityPrimaryKeyNatural(ASC)`
    EntityPrimaryKeyNatural(OrderDirection),
    /// Order by attribute of the fetched entity: `attributeNatural('name', DESC)`
    AttributeNatural {
        /// Attribute name.
        attribute_name: String,
        /// Sort direction.
        direction: OrderDirection,
    },
}

impl fmt::Display for OrderConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderConstraint::EntityPrimaryKeyNatural(direction) => {
                write!(f, "entityPrimaryKeyNatural({})", direction)
            }
            OrderConstraint::AttributeNatural {
                attribute_name,
                direction,
            } => write!(f, "attributeNatural('{}', {})", attribute_name, direction),
        }
    }
}

// =============================================================================
// Require constraints
// =============================================================================

/// Which attributes of a fetched entity body are requested.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeContent {
    /// Every attribute: `attributeContent()` / `attributeContentAll()`
    All,
    /// Only the named attributes: `attributeContent('name', 'code')`
    Named(Vec<String>),
}

/// Entity body fetch requirement: `entityFetch(...)` / `entityGroupFetch(...)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityFetch {
    /// Requested attributes (None = body without attributes).
    pub attribute_content: Option<AttributeContent>,
    /// Requested locales.
    pub locales: Vec<String>,
}

impl EntityFetch {
    /// Requirement fetching every attribute.
    pub fn all_attributes() -> Self {
        Self {
            attribute_content: Some(AttributeContent::All),
            locales: Vec::new(),
        }
    }

    /// Requirement fetching the named attributes.
    pub fn attributes<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attribute_content: Some(AttributeContent::Named(
                names.into_iter().map(Into::into).collect(),
            )),
            locales: Vec::new(),
        }
    }

    /// Adds a locale.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locales.push(locale.into());
        self
    }

    /// Returns true if the attribute is part of the requirement.
    pub fn requires_attribute(&self, attribute_name: &str) -> bool {
        match &self.attribute_content {
            Some(AttributeContent::All) => true,
            Some(AttributeContent::Named(names)) => names.iter().any(|it| it == attribute_name),
            None => false,
        }
    }

    /// Merges two requirements into one that is at least as rich as both.
    pub fn combine_with(&self, other: &EntityFetch) -> EntityFetch {
        let attribute_content = match (&self.attribute_content, &other.attribute_content) {
            (Some(AttributeContent::All), _) | (_, Some(AttributeContent::All)) => {
                Some(AttributeContent::All)
            }
            (Some(AttributeContent::Named(left)), Some(AttributeContent::Named(right))) => {
                let mut names = left.clone();
                for name in right {
                    if !names.contains(name) {
                        names.push(name.clone());
                    }
                }
                Some(AttributeContent::Named(names))
            }
            (Some(content), None) | (None, Some(content)) => Some(content.clone()),
            (None, None) => None,
        };
        let mut locales = self.locales.clone();
        for locale in &other.locales {
            if !locales.contains(locale) {
                locales.push(locale.clone());
            }
        }
        EntityFetch {
            attribute_content,
            locales,
        }
    }

    fn fmt_with_name(&self, f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
        write!(f, "{}(", name)?;
        let mut first = true;
        match &self.attribute_content {
            Some(AttributeContent::All) => {
                write!(f, "attributeContentAll()")?;
                first = false;
            }
            Some(AttributeContent::Named(names)) => {
                write!(f, "attributeContent(")?;
                write_quoted_joined(f, names)?;
                write!(f, ")")?;
                first = false;
            }
            None => {}
        }
        if !self.locales.is_empty() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "dataInLocales(")?;
            write_quoted_joined(f, &self.locales)?;
            write!(f, ")")?;
        }
        write!(f, ")")
    }
}

/// Settings of a statistics request, shared by `facetSummary` and
/// `facetSummaryOfReference`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FacetSummaryRequirement {
    /// Statistics depth (None = inherit, ultimately `COUNTS`).
    pub depth: Option<StatisticsDepth>,
    /// Restricts which facets are returned: `filterBy(...)`
    pub facet_filter: Option<FilterConstraint>,
    /// Restricts which groups are returned: `filterGroupBy(...)`
    pub group_filter: Option<FilterConstraint>,
    /// Facet ordering: `orderBy(...)`
    pub facet_order: Vec<OrderConstraint>,
    /// Group ordering: `orderGroupBy(...)`
    pub group_order: Vec<OrderConstraint>,
    /// Facet entity body requirement: `entityFetch(...)`
    pub entity_fetch: Option<EntityFetch>,
    /// Group entity body requirement: `entityGroupFetch(...)`
    pub group_fetch: Option<EntityFetch>,
}

impl FacetSummaryRequirement {
    /// Creates a requirement with the given depth.
    pub fn with_depth(depth: StatisticsDepth) -> Self {
        Self {
            depth: Some(depth),
            ..Self::default()
        }
    }

    /// Sets the facet filter.
    pub fn filter_by(mut self, filter: FilterConstraint) -> Self {
        self.facet_filter = Some(filter);
        self
    }

    /// Sets the group filter.
    pub fn filter_group_by(mut self, filter: FilterConstraint) -> Self {
        self.group_filter = Some(filter);
        self
    }

    /// Appends a facet ordering rule.
    pub fn order_by(mut self, order: OrderConstraint) -> Self {
        self.facet_order.push(order);
        self
    }

    /// Appends a group ordering rule.
    pub fn order_group_by(mut self, order: OrderConstraint) -> Self {
        self.group_order.push(order);
        self
    }

    /// Sets the facet entity requirement.
    pub fn entity_fetch(mut self, fetch: EntityFetch) -> Self {
        self.entity_fetch = Some(fetch);
        self
    }

    /// Sets the group entity requirement.
    pub fn entity_group_fetch(mut self, fetch: EntityFetch) -> Self {
        self.group_fetch = Some(fetch);
        self
    }

    fn fmt_arguments(&self, f: &mut fmt::Formatter<'_>, mut first: bool) -> fmt::Result {
        let mut separator = |f: &mut fmt::Formatter<'_>| -> fmt::Result {
            if first {
                first = false;
                Ok(())
            } else {
                write!(f, ", ")
            }
        };
        if let Some(depth) = self.depth {
            separator(f)?;
            write!(f, "{}", depth)?;
        }
        if let Some(filter) = &self.facet_filter {
            separator(f)?;
            write!(f, "filterBy({})", filter)?;
        }
        if let Some(filter) = &self.group_filter {
            separator(f)?;
            write!(f, "filterGroupBy({})", filter)?;
        }
        if !self.facet_order.is_empty() {
            separator(f)?;
            write!(f, "orderBy(")?;
            write_joined(f, &self.facet_order)?;
            write!(f, ")")?;
        }
        if !self.group_order.is_empty() {
            separator(f)?;
            write!(f, "orderGroupBy(")?;
            write_joined(f, &self.group_order)?;
            write!(f, ")")?;
        }
        if let Some(fetch) = &self.entity_fetch {
            separator(f)?;
            fetch.fmt_with_name(f, "entityFetch")?;
        }
        if let Some(fetch) = &self.group_fetch {
            separator(f)?;
            fetch.fmt_with_name(f, "entityGroupFetch")?;
        }
        Ok(())
    }
}

/// A node of the require tree relevant to facet statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RequireConstraint {
    /// Statistics for all faceted references: `facetSummary(...)`
    FacetSummary(FacetSummaryRequirement),
    /// Statistics settings for one reference: `facetSummaryOfReference('brand', ...)`
    FacetSummaryOfReference {
        /// Reference name.
        reference_name: String,
        /// Settings overriding the default `facetSummary`.
        requirement: FacetSummaryRequirement,
    },
    /// Group relation override, e.g. `facetGroupsNegation('brand', WITH_DIFFERENT_GROUPS)`.
    FacetGroupsRelation {
        /// Reference name.
        reference_name: String,
        /// The relation type imposed.
        relation: RelationType,
        /// The level the relation applies to.
        level: RelationLevel,
        /// Group id filter (None = every group of the reference).
        group_filter: Option<FilterConstraint>,
    },
    /// Global default relation types: `facetCalculationRules(DISJUNCTION, CONJUNCTION)`
    FacetCalculationRules {
        /// Relation of facets within one group.
        facets_with_same_group: RelationType,
        /// Relation of different groups.
        facets_with_different_groups: RelationType,
    },
}

impl RequireConstraint {
    /// Creates `facetSummary(depth)`.
    pub fn facet_summary(depth: StatisticsDepth) -> Self {
        RequireConstraint::FacetSummary(FacetSummaryRequirement::with_depth(depth))
    }

    /// Creates `facetSummaryOfReference(reference, requirement...)`.
    pub fn facet_summary_of_reference(
        reference_name: impl Into<String>,
        requirement: FacetSummaryRequirement,
    ) -> Self {
        RequireConstraint::FacetSummaryOfReference {
            reference_name: reference_name.into(),
            requirement,
        }
    }

    /// Creates a group relation directive.
    ///
    /// Empty `group_ids` targets every group of the reference.
    pub fn facet_groups(
        relation: RelationType,
        reference_name: impl Into<String>,
        level: RelationLevel,
        group_ids: impl IntoIterator<Item = PrimaryKey>,
    ) -> Self {
        let ids: Vec<PrimaryKey> = group_ids.into_iter().collect();
        RequireConstraint::FacetGroupsRelation {
            reference_name: reference_name.into(),
            relation,
            level,
            group_filter: if ids.is_empty() {
                None
            } else {
                Some(FilterConstraint::EntityPrimaryKeyInSet(ids))
            },
        }
    }

    /// Creates `facetCalculationRules(within, across)`.
    pub fn facet_calculation_rules(within: RelationType, across: RelationType) -> Self {
        RequireConstraint::FacetCalculationRules {
            facets_with_same_group: within,
            facets_with_different_groups: across,
        }
    }
}

impl fmt::Display for RequireConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequireConstraint::FacetSummary(requirement) => {
                write!(f, "facetSummary(")?;
                requirement.fmt_arguments(f, true)?;
                write!(f, ")")
            }
            RequireConstraint::FacetSummaryOfReference {
                reference_name,
                requirement,
            } => {
                write!(f, "facetSummaryOfReference('{}'", reference_name)?;
                requirement.fmt_arguments(f, false)?;
                write!(f, ")")
            }
            RequireConstraint::FacetGroupsRelation {
                reference_name,
                relation,
                level,
                group_filter,
            } => {
                write!(
                    f,
                    "{}('{}', {}",
                    relation.directive_name(),
                    reference_name,
                    level
                )?;
                if let Some(filter) = group_filter {
                    write!(f, ", filterBy({})", filter)?;
                }
                write!(f, ")")
            }
            RequireConstraint::FacetCalculationRules {
                facets_with_same_group,
                facets_with_different_groups,
            } => write!(
                f,
                "facetCalculationRules({}, {})",
                facets_with_same_group, facets_with_different_groups
            ),
        }
    }
}

// =============================================================================
// Query
// =============================================================================

/// A complete query: target collection, filter tree and requirements.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Query {
    /// Queried entity collection.
    pub collection: Option<String>,
    /// Root of the filter tree (several roots are wrapped in `and`).
    pub filter_by: Option<FilterConstraint>,
    /// Requirements.
    pub require: Vec<RequireConstraint>,
}

impl Query {
    /// Returns a fluent builder.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }

    /// Collects all `facetHaving` nodes of the filter tree.
    pub fn facet_having_constraints(&self) -> Vec<&FilterConstraint> {
        self.filter_by
            .as_ref()
            .map(FilterConstraint::facet_having_constraints)
            .unwrap_or_default()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query(")?;
        let mut first = true;
        if let Some(collection) = &self.collection {
            write!(f, "collection('{}')", collection)?;
            first = false;
        }
        if let Some(filter) = &self.filter_by {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "filterBy({})", filter)?;
            first = false;
        }
        if !self.require.is_empty() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "require(")?;
            write_joined(f, &self.require)?;
            write!(f, ")")?;
        }
        write!(f, ")")
    }
}

/// Fluent builder for [`Query`].
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    collection: Option<String>,
    filters: Vec<FilterConstraint>,
    require: Vec<RequireConstraint>,
}

impl QueryBuilder {
    /// Sets the queried collection.
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Adds a filter root; several roots are combined with `and`.
    pub fn filter(mut self, constraint: FilterConstraint) -> Self {
        self.filters.push(constraint);
        self
    }

    /// Adds a requirement.
    pub fn require(mut self, constraint: RequireConstraint) -> Self {
        self.require.push(constraint);
        self
    }

    /// Builds the query.
    pub fn build(mut self) -> Query {
        let filter_by = match self.filters.len() {
            0 => None,
            1 => self.filters.pop(),
            _ => Some(FilterConstraint::And(self.filters)),
        };
        Query {
            collection: self.collection,
            filter_by,
            require: self.require,
        }
    }
}

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_quoted_joined(f: &mut fmt::Formatter<'_>, items: &[String]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "'{}'", item)?;
    }
    Ok(())
}
