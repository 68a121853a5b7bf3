//! Integration tests for the query parser.
//!
//! These tests parse complete queries and verify the lowered constraint tree
//! and the textual round trip through `Display`.

use facet_query::{
    parse, parse_filter, EntityFetch, FacetSummaryRequirement, FilterConstraint, OrderConstraint,
    OrderDirection, Query, QueryError, RelationLevel, RelationType, RequireConstraint,
    StatisticsDepth,
};

const FULL_QUERY: &str = r#"
query(
  collection('product'),
  filterBy(and(userFilter(
     facetHaving('brand', entityPrimaryKeyInSet(1, 2)),
     facetHaving('category', entityPrimaryKeyInSet(5), includingChildrenExcept(entityPrimaryKeyInSet(9)))
  ), attributeEquals('visible', true))),
  require(
     facetSummary(IMPACT, entityFetch(attributeContent('name')), orderBy(attributeNatural('name', ASC))),
     facetSummaryOfReference('brand', COUNTS, filterBy(entityPrimaryKeyInSet(1,2,3))),
     facetGroupsConjunction('parameter', WITH_DIFFERENT_FACETS_IN_GROUP, filterBy(entityPrimaryKeyInSet(7))),
     facetGroupsExclusivity('brand', WITH_DIFFERENT_GROUPS),
     facetCalculationRules(DISJUNCTION, CONJUNCTION)
  )
)
"#;

fn expected_full_query() -> Query {
    Query::builder()
        .collection("product")
        .filter(FilterConstraint::And(vec![
            FilterConstraint::UserFilter(vec![
                FilterConstraint::facet_having("brand", [1, 2]),
                FilterConstraint::facet_having_with(
                    "category",
                    vec![
                        FilterConstraint::primary_keys([5]),
                        FilterConstraint::IncludingChildrenExcept(vec![
                            FilterConstraint::primary_keys([9]),
                        ]),
                    ],
                ),
            ]),
            FilterConstraint::attribute_equals("visible", true),
        ]))
        .require(RequireConstraint::FacetSummary(
            FacetSummaryRequirement::with_depth(StatisticsDepth::Impact)
                .entity_fetch(EntityFetch::attributes(["name"]))
                .order_by(OrderConstraint::AttributeNatural {
                    attribute_name: "name".to_string(),
                    direction: OrderDirection::Asc,
                }),
        ))
        .require(RequireConstraint::facet_summary_of_reference(
            "brand",
            FacetSummaryRequirement::with_depth(StatisticsDepth::Counts)
                .filter_by(FilterConstraint::primary_keys([1, 2, 3])),
        ))
        .require(RequireConstraint::facet_groups(
            RelationType::Conjunction,
            "parameter",
            RelationLevel::WithinGroup,
            [7],
        ))
        .require(RequireConstraint::facet_groups(
            RelationType::Exclusivity,
            "brand",
            RelationLevel::AcrossGroups,
            [],
        ))
        .require(RequireConstraint::facet_calculation_rules(
            RelationType::Disjunction,
            RelationType::Conjunction,
        ))
        .build()
}

#[test]
fn test_parse_full_query() {
    let query = parse(FULL_QUERY).unwrap();
    assert_eq!(query, expected_full_query());
}

#[test]
fn test_display_parses_back() {
    let query = expected_full_query();
    let text = query.to_string();
    let reparsed = parse(&text).unwrap();
    assert_eq!(reparsed, query, "display form: {}", text);
}

#[test]
fn test_facet_having_constraints_are_found_in_user_filter() {
    let query = parse(FULL_QUERY).unwrap();
    let names: Vec<&str> = query
        .facet_having_constraints()
        .into_iter()
        .filter_map(|constraint| match constraint {
            FilterConstraint::FacetHaving { reference_name, .. } => Some(reference_name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["brand", "category"]);
}

#[test]
fn test_multiple_filter_roots_are_combined_with_and() {
    let query = parse(
        "query(filterBy(facetHaving('brand', entityPrimaryKeyInSet(1)), \
         attributeEquals('code', 42)))",
    )
    .unwrap();
    assert!(matches!(query.filter_by, Some(FilterConstraint::And(ref children)) if children.len() == 2));
}

#[test]
fn test_double_quoted_strings() {
    let filter = parse_filter(r#"facetHaving("brand", entityPrimaryKeyInSet(3))"#).unwrap();
    assert_eq!(filter, FilterConstraint::facet_having("brand", [3]));
}

#[test]
fn test_unknown_require_constraint() {
    let error = parse("query(require(priceType(WITH_TAX)))").unwrap_err();
    assert_eq!(error, QueryError::UnknownConstraint("priceType".to_string()));
}

#[test]
fn test_unknown_level_keyword() {
    let error = parse("query(require(facetGroupsNegation('brand', EVERYWHERE)))").unwrap_err();
    assert!(matches!(
        error,
        QueryError::InvalidArgument { ref constraint, .. } if constraint == "facetGroupsNegation"
    ));
}

#[test]
fn test_trailing_garbage_is_rejected() {
    let error = parse("query(collection('product')) extra").unwrap_err();
    assert!(matches!(error, QueryError::ParseError { .. }));
}
