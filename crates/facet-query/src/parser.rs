//! Query parser implementation using nom.
//!
//! Parsing happens in two passes. The nom grammar only knows the generic
//! shape of the language (`name(arg, arg, ...)` calls whose arguments are
//! nested calls, quoted strings, integers or bare keywords); a lowering pass
//! then maps the call tree onto the typed constraint model, so that unknown
//! constraint names and misplaced arguments get precise errors.

use nom::{
    branch::alt,
    bytes::complete::take_while,
    character::complete::{alpha1, char, digit1, multispace0},
    combinator::{all_consuming, map, map_res, opt, recognize},
    multi::separated_list0,
    sequence::{delimited, pair, preceded},
    IResult,
};

use crate::ast::{
    AttributeContent, EntityFetch, FacetSummaryRequirement, FilterConstraint, OrderConstraint,
    OrderDirection, Query, RelationLevel, RelationType, RequireConstraint, StatisticsDepth, Value,
};
use crate::error::{QueryError, QueryResult};
use crate::PrimaryKey;

/// Parse a complete `query(...)` string.
///
/// # Examples
///
/// ```rust
/// use facet_query::{parse, FilterConstraint};
///
/// let query = parse(
///     "query(collection('product'), \
///      filterBy(facetHaving('brand', entityPrimaryKeyInSet(1, 2))), \
///      require(facetSummary(IMPACT)))",
/// )
/// .unwrap();
///
/// assert_eq!(query.collection.as_deref(), Some("product"));
/// assert_eq!(
///     query.filter_by,
///     Some(FilterConstraint::facet_having("brand", [1, 2]))
/// );
/// ```
pub fn parse(input: &str) -> QueryResult<Query> {
    let tree = parse_tree(input)?;
    lower_query(&tree)
}

/// Parse a single filter constraint, e.g. `facetHaving('brand', entityPrimaryKeyInSet(1))`.
pub fn parse_filter(input: &str) -> QueryResult<FilterConstraint> {
    let tree = parse_tree(input)?;
    lower_filter(&tree)
}

/// Parse a single require constraint, e.g. `facetSummary(IMPACT)`.
pub fn parse_require(input: &str) -> QueryResult<RequireConstraint> {
    let tree = parse_tree(input)?;
    lower_require(&tree)
}

fn parse_tree(input: &str) -> QueryResult<Argument<'_>> {
    let input = input.trim();
    if input.is_empty() {
        return Err(QueryError::EmptyQuery);
    }

    match all_consuming(delimited(ws, call, ws))(input) {
        Ok((_, tree)) => Ok(tree),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let position = input.len() - e.input.len();
            if e.input.is_empty() {
                return Err(QueryError::Incomplete(format!(
                    "input ended at position {}",
                    position
                )));
            }
            Err(QueryError::ParseError {
                position,
                message: format!("unexpected input at: '{}'", truncate(e.input, 20)),
            })
        }
        Err(nom::Err::Incomplete(_)) => Err(QueryError::Incomplete("query".to_string())),
    }
}

fn truncate(s: &str, max_len: usize) -> &str {
    match s.char_indices().nth(max_len) {
        Some((index, _)) => &s[..index],
        None => s,
    }
}

// ============================================================================
// Generic call tree
// ============================================================================

/// Untyped syntax node produced by the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Argument<'a> {
    Call {
        name: &'a str,
        args: Vec<Argument<'a>>,
    },
    Text(&'a str),
    Integer(i64),
    Keyword(&'a str),
}

impl Argument<'_> {
    fn describe(&self) -> String {
        match self {
            Argument::Call { name, .. } => format!("constraint {}(..)", name),
            Argument::Text(text) => format!("string '{}'", text),
            Argument::Integer(number) => format!("integer {}", number),
            Argument::Keyword(keyword) => format!("keyword {}", keyword),
        }
    }
}

fn ws(input: &str) -> IResult<&str, &str> {
    multispace0(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alpha1,
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn call(input: &str) -> IResult<&str, Argument<'_>> {
    map(
        pair(
            identifier,
            preceded(
                ws,
                delimited(
                    pair(char('('), ws),
                    separated_list0(delimited(ws, char(','), ws), argument),
                    pair(ws, char(')')),
                ),
            ),
        ),
        |(name, args)| Argument::Call { name, args },
    )(input)
}

fn argument(input: &str) -> IResult<&str, Argument<'_>> {
    alt((call, quoted_text, integer, keyword))(input)
}

fn quoted_text(input: &str) -> IResult<&str, Argument<'_>> {
    map(
        alt((
            delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        )),
        Argument::Text,
    )(input)
}

fn integer(input: &str) -> IResult<&str, Argument<'_>> {
    map(
        map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| {
            s.parse::<i64>()
        }),
        Argument::Integer,
    )(input)
}

fn keyword(input: &str) -> IResult<&str, Argument<'_>> {
    map(identifier, Argument::Keyword)(input)
}

// ============================================================================
// Lowering helpers
// ============================================================================

fn expect_call<'b, 'a>(
    arg: &'b Argument<'a>,
    context: &str,
) -> QueryResult<(&'a str, &'b [Argument<'a>])> {
    match arg {
        Argument::Call { name, args } => Ok((*name, args.as_slice())),
        other => Err(QueryError::invalid(
            context,
            format!("expected a constraint, found {}", other.describe()),
        )),
    }
}

fn expect_text(arg: &Argument<'_>, constraint: &str) -> QueryResult<String> {
    match arg {
        Argument::Text(text) => Ok((*text).to_string()),
        other => Err(QueryError::invalid(
            constraint,
            format!("expected a string, found {}", other.describe()),
        )),
    }
}

fn expect_texts(args: &[Argument<'_>], constraint: &str) -> QueryResult<Vec<String>> {
    args.iter().map(|arg| expect_text(arg, constraint)).collect()
}

fn expect_primary_key(arg: &Argument<'_>, constraint: &str) -> QueryResult<PrimaryKey> {
    match arg {
        Argument::Integer(number) => PrimaryKey::try_from(*number).map_err(|_| {
            QueryError::invalid(constraint, format!("{} is not a valid primary key", number))
        }),
        other => Err(QueryError::invalid(
            constraint,
            format!("expected a primary key, found {}", other.describe()),
        )),
    }
}

fn expect_keyword<'a>(arg: &Argument<'a>, constraint: &str) -> QueryResult<&'a str> {
    match arg {
        Argument::Keyword(keyword) => Ok(*keyword),
        other => Err(QueryError::invalid(
            constraint,
            format!("expected a keyword, found {}", other.describe()),
        )),
    }
}

fn lower_relation_type(keyword: &str, constraint: &str) -> QueryResult<RelationType> {
    RelationType::ALL
        .into_iter()
        .find(|relation| relation.keyword() == keyword)
        .ok_or_else(|| {
            QueryError::invalid(constraint, format!("unknown relation type {}", keyword))
        })
}

fn lower_level(keyword: &str, constraint: &str) -> QueryResult<RelationLevel> {
    match keyword {
        "WITH_DIFFERENT_FACETS_IN_GROUP" => Ok(RelationLevel::WithinGroup),
        "WITH_DIFFERENT_GROUPS" => Ok(RelationLevel::AcrossGroups),
        other => Err(QueryError::invalid(
            constraint,
            format!("unknown relation level {}", other),
        )),
    }
}

fn lower_depth(keyword: &str, constraint: &str) -> QueryResult<StatisticsDepth> {
    match keyword {
        "COUNTS" => Ok(StatisticsDepth::Counts),
        "IMPACT" => Ok(StatisticsDepth::Impact),
        other => Err(QueryError::invalid(
            constraint,
            format!("unknown statistics depth {}", other),
        )),
    }
}

fn lower_direction(args: &[Argument<'_>], constraint: &str) -> QueryResult<OrderDirection> {
    match args {
        [] => Ok(OrderDirection::Asc),
        [arg] => match expect_keyword(arg, constraint)? {
            "ASC" => Ok(OrderDirection::Asc),
            "DESC" => Ok(OrderDirection::Desc),
            other => Err(QueryError::invalid(
                constraint,
                format!("unknown order direction {}", other),
            )),
        },
        _ => Err(QueryError::invalid(constraint, "expects at most one direction")),
    }
}

fn lower_value(arg: &Argument<'_>, constraint: &str) -> QueryResult<Value> {
    match arg {
        Argument::Text(text) => Ok(Value::Text((*text).to_string())),
        Argument::Integer(number) => Ok(Value::Integer(*number)),
        Argument::Keyword("true") => Ok(Value::Boolean(true)),
        Argument::Keyword("false") => Ok(Value::Boolean(false)),
        other => Err(QueryError::invalid(
            constraint,
            format!("expected a value, found {}", other.describe()),
        )),
    }
}

// ============================================================================
// Query
// ============================================================================

fn lower_query(tree: &Argument<'_>) -> QueryResult<Query> {
    let (name, args) = expect_call(tree, "query")?;
    if name != "query" {
        return Err(QueryError::invalid(
            "query",
            format!("expected query(..) at the root, found {}(..)", name),
        ));
    }

    let mut query = Query::default();
    for arg in args {
        let (part, children) = expect_call(arg, "query")?;
        match part {
            "collection" => match children {
                [single] => query.collection = Some(expect_text(single, part)?),
                _ => return Err(QueryError::invalid(part, "expects exactly one entity type")),
            },
            "filterBy" => query.filter_by = Some(lower_filter_root(children, part)?),
            "require" => {
                for child in children {
                    query.require.push(lower_require(child)?);
                }
            }
            other => return Err(QueryError::UnknownConstraint(other.to_string())),
        }
    }
    Ok(query)
}

// ============================================================================
// Filter constraints
// ============================================================================

/// Lowers the children of a `filterBy`-like container; several children are
/// implicitly combined with `and`.
fn lower_filter_root(args: &[Argument<'_>], constraint: &str) -> QueryResult<FilterConstraint> {
    match args {
        [] => Err(QueryError::invalid(constraint, "expects at least one constraint")),
        [single] => lower_filter(single),
        many => Ok(FilterConstraint::And(lower_filters(many)?)),
    }
}

fn lower_filters(args: &[Argument<'_>]) -> QueryResult<Vec<FilterConstraint>> {
    args.iter().map(lower_filter).collect()
}

fn lower_filter(arg: &Argument<'_>) -> QueryResult<FilterConstraint> {
    let (name, args) = expect_call(arg, "filterBy")?;
    match name {
        "and" => Ok(FilterConstraint::And(lower_filters(args)?)),
        "or" => Ok(FilterConstraint::Or(lower_filters(args)?)),
        "userFilter" => Ok(FilterConstraint::UserFilter(lower_filters(args)?)),
        "not" => match args {
            [single] => Ok(FilterConstraint::Not(Box::new(lower_filter(single)?))),
            _ => Err(QueryError::invalid(name, "expects exactly one constraint")),
        },
        "entityPrimaryKeyInSet" => args
            .iter()
            .map(|arg| expect_primary_key(arg, name))
            .collect::<QueryResult<Vec<_>>>()
            .map(FilterConstraint::EntityPrimaryKeyInSet),
        "facetHaving" => {
            let (first, rest) = args
                .split_first()
                .ok_or_else(|| QueryError::invalid(name, "missing reference name"))?;
            Ok(FilterConstraint::FacetHaving {
                reference_name: expect_text(first, name)?,
                children: lower_filters(rest)?,
            })
        }
        "includingChildren" => {
            if args.is_empty() {
                Ok(FilterConstraint::IncludingChildren)
            } else {
                Err(QueryError::invalid(name, "takes no arguments"))
            }
        }
        "includingChildrenHaving" => Ok(FilterConstraint::IncludingChildrenHaving(
            lower_filters(args)?,
        )),
        "includingChildrenExcept" => Ok(FilterConstraint::IncludingChildrenExcept(
            lower_filters(args)?,
        )),
        "attributeEquals" => match args {
            [attribute, value] => Ok(FilterConstraint::AttributeEquals {
                attribute_name: expect_text(attribute, name)?,
                value: lower_value(value, name)?,
            }),
            _ => Err(QueryError::invalid(name, "expects an attribute name and a value")),
        },
        other => Err(QueryError::UnknownConstraint(other.to_string())),
    }
}

// ============================================================================
// Order constraints
// ============================================================================

fn lower_orders(args: &[Argument<'_>]) -> QueryResult<Vec<OrderConstraint>> {
    args.iter().map(lower_order).collect()
}

fn lower_order(arg: &Argument<'_>) -> QueryResult<OrderConstraint> {
    let (name, args) = expect_call(arg, "orderBy")?;
    match name {
        "entityPrimaryKeyNatural" => Ok(OrderConstraint::EntityPrimaryKeyNatural(
            lower_direction(args, name)?,
        )),
        "attributeNatural" => {
            let (first, rest) = args
                .split_first()
                .ok_or_else(|| QueryError::invalid(name, "missing attribute name"))?;
            Ok(OrderConstraint::AttributeNatural {
                attribute_name: expect_text(first, name)?,
                direction: lower_direction(rest, name)?,
            })
        }
        other => Err(QueryError::UnknownConstraint(other.to_string())),
    }
}

// ============================================================================
// Require constraints
// ============================================================================

fn lower_require(arg: &Argument<'_>) -> QueryResult<RequireConstraint> {
    let (name, args) = expect_call(arg, "require")?;
    match name {
        "facetSummary" => {
            let mut requirement = FacetSummaryRequirement::default();
            lower_requirement(name, args, &mut requirement)?;
            Ok(RequireConstraint::FacetSummary(requirement))
        }
        "facetSummaryOfReference" => {
            let (first, rest) = args
                .split_first()
                .ok_or_else(|| QueryError::invalid(name, "missing reference name"))?;
            let mut requirement = FacetSummaryRequirement::default();
            lower_requirement(name, rest, &mut requirement)?;
            Ok(RequireConstraint::FacetSummaryOfReference {
                reference_name: expect_text(first, name)?,
                requirement,
            })
        }
        "facetGroupsConjunction"
        | "facetGroupsDisjunction"
        | "facetGroupsNegation"
        | "facetGroupsExclusivity" => lower_group_relation(name, args),
        "facetCalculationRules" => match args {
            [within, across] => Ok(RequireConstraint::FacetCalculationRules {
                facets_with_same_group: lower_relation_type(expect_keyword(within, name)?, name)?,
                facets_with_different_groups: lower_relation_type(
                    expect_keyword(across, name)?,
                    name,
                )?,
            }),
            _ => Err(QueryError::invalid(
                name,
                "expects relation types for the same group and for different groups",
            )),
        },
        other => Err(QueryError::UnknownConstraint(other.to_string())),
    }
}

fn lower_group_relation(name: &str, args: &[Argument<'_>]) -> QueryResult<RequireConstraint> {
    let relation = RelationType::ALL
        .into_iter()
        .find(|relation| relation.directive_name() == name)
        .ok_or_else(|| QueryError::UnknownConstraint(name.to_string()))?;
    let (first, rest) = args
        .split_first()
        .ok_or_else(|| QueryError::invalid(name, "missing reference name"))?;

    let mut level = RelationLevel::WithinGroup;
    let mut group_filter = None;
    for arg in rest {
        match arg {
            Argument::Keyword(keyword) => level = lower_level(keyword, name)?,
            Argument::Call {
                name: "filterBy",
                args,
            } => group_filter = Some(lower_filter_root(args, "filterBy")?),
            other => {
                return Err(QueryError::invalid(
                    name,
                    format!("unexpected argument {}", other.describe()),
                ))
            }
        }
    }

    Ok(RequireConstraint::FacetGroupsRelation {
        reference_name: expect_text(first, name)?,
        relation,
        level,
        group_filter,
    })
}

fn lower_requirement(
    name: &str,
    args: &[Argument<'_>],
    requirement: &mut FacetSummaryRequirement,
) -> QueryResult<()> {
    for arg in args {
        match arg {
            Argument::Keyword(keyword) => requirement.depth = Some(lower_depth(keyword, name)?),
            Argument::Call {
                name: child,
                args: children,
            } => match *child {
                "filterBy" => requirement.facet_filter = Some(lower_filter_root(children, child)?),
                "filterGroupBy" => {
                    requirement.group_filter = Some(lower_filter_root(children, child)?)
                }
                "orderBy" => requirement.facet_order = lower_orders(children)?,
                "orderGroupBy" => requirement.group_order = lower_orders(children)?,
                "entityFetch" => requirement.entity_fetch = Some(lower_fetch(child, children)?),
                "entityGroupFetch" => {
                    requirement.group_fetch = Some(lower_fetch(child, children)?)
                }
                other => return Err(QueryError::UnknownConstraint(other.to_string())),
            },
            other => {
                return Err(QueryError::invalid(
                    name,
                    format!("unexpected argument {}", other.describe()),
                ))
            }
        }
    }
    Ok(())
}

fn lower_fetch(name: &str, args: &[Argument<'_>]) -> QueryResult<EntityFetch> {
    let mut fetch = EntityFetch::default();
    for arg in args {
        let (part, children) = expect_call(arg, name)?;
        match part {
            "attributeContent" if children.is_empty() => {
                fetch.attribute_content = Some(AttributeContent::All)
            }
            "attributeContent" => {
                let requested = EntityFetch::attributes(expect_texts(children, part)?);
                fetch = fetch.combine_with(&requested);
            }
            "attributeContentAll" => fetch.attribute_content = Some(AttributeContent::All),
            "dataInLocales" => {
                for locale in expect_texts(children, part)? {
                    if !fetch.locales.contains(&locale) {
                        fetch.locales.push(locale);
                    }
                }
            }
            other => return Err(QueryError::UnknownConstraint(other.to_string())),
        }
    }
    Ok(fetch)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Grammar
    // ========================================================================

    #[test]
    fn test_parse_empty_input() {
        assert_eq!(parse("   "), Err(QueryError::EmptyQuery));
    }

    #[test]
    fn test_parse_call_tree_with_all_argument_kinds() {
        let (rest, tree) = call("x(  'a', \"b\" , -3, KW, y())").unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            tree,
            Argument::Call {
                name: "x",
                args: vec![
                    Argument::Text("a"),
                    Argument::Text("b"),
                    Argument::Integer(-3),
                    Argument::Keyword("KW"),
                    Argument::Call {
                        name: "y",
                        args: vec![]
                    },
                ],
            }
        );
    }

    #[test]
    fn test_parse_error_reports_position() {
        let error = parse_filter("entityPrimaryKeyInSet(1, 2]").unwrap_err();
        assert!(matches!(error, QueryError::ParseError { position: 26, .. }), "{error:?}");
    }

    #[test]
    fn test_parse_unclosed_call_is_incomplete() {
        let error = parse_filter("entityPrimaryKeyInSet(1, 2").unwrap_err();
        assert!(matches!(error, QueryError::Incomplete(_)), "{error:?}");
    }

    // ========================================================================
    // Filter lowering
    // ========================================================================

    #[test]
    fn test_facet_having_with_refinement() {
        let filter = parse_filter(
            "facetHaving('category', entityPrimaryKeyInSet(5), \
             includingChildrenExcept(entityPrimaryKeyInSet(9)))",
        )
        .unwrap();
        assert_eq!(
            filter,
            FilterConstraint::facet_having_with(
                "category",
                vec![
                    FilterConstraint::primary_keys([5]),
                    FilterConstraint::IncludingChildrenExcept(vec![
                        FilterConstraint::primary_keys([9])
                    ]),
                ],
            )
        );
    }

    #[test]
    fn test_negative_primary_key_is_rejected() {
        let error = parse_filter("entityPrimaryKeyInSet(-1)").unwrap_err();
        assert!(matches!(
            error,
            QueryError::InvalidArgument { ref constraint, .. } if constraint == "entityPrimaryKeyInSet"
        ));
    }

    #[test]
    fn test_unknown_filter_constraint() {
        let error = parse_filter("priceBetween(1, 2)").unwrap_err();
        assert_eq!(error, QueryError::UnknownConstraint("priceBetween".to_string()));
    }

    #[test]
    fn test_attribute_equals_boolean() {
        let filter = parse_filter("attributeEquals('visible', true)").unwrap();
        assert_eq!(filter, FilterConstraint::attribute_equals("visible", true));
    }

    // ========================================================================
    // Require lowering
    // ========================================================================

    #[test]
    fn test_group_relation_defaults_to_within_group() {
        let require = parse_require("facetGroupsConjunction('parameter', filterBy(entityPrimaryKeyInSet(7)))")
            .unwrap();
        assert_eq!(
            require,
            RequireConstraint::facet_groups(
                RelationType::Conjunction,
                "parameter",
                RelationLevel::WithinGroup,
                [7],
            )
        );
    }

    #[test]
    fn test_calculation_rules() {
        let require = parse_require("facetCalculationRules(CONJUNCTION, EXCLUSIVITY)").unwrap();
        assert_eq!(
            require,
            RequireConstraint::facet_calculation_rules(
                RelationType::Conjunction,
                RelationType::Exclusivity
            )
        );
    }

    #[test]
    fn test_calculation_rules_rejects_unknown_keyword() {
        assert!(parse_require("facetCalculationRules(AND, OR)").is_err());
    }

    #[test]
    fn test_facet_summary_of_reference_full() {
        let require = parse_require(
            "facetSummaryOfReference('brand', IMPACT, \
             filterBy(entityPrimaryKeyInSet(1, 2)), \
             orderBy(attributeNatural('name', DESC)), \
             entityFetch(attributeContent('name'), dataInLocales('en')))",
        )
        .unwrap();
        let RequireConstraint::FacetSummaryOfReference {
            reference_name,
            requirement,
        } = require
        else {
            panic!("Expected FacetSummaryOfReference");
        };
        assert_eq!(reference_name, "brand");
        assert_eq!(requirement.depth, Some(StatisticsDepth::Impact));
        assert_eq!(
            requirement.facet_filter,
            Some(FilterConstraint::primary_keys([1, 2]))
        );
        assert_eq!(
            requirement.facet_order,
            vec![OrderConstraint::AttributeNatural {
                attribute_name: "name".to_string(),
                direction: OrderDirection::Desc,
            }]
        );
        let fetch = requirement.entity_fetch.unwrap();
        assert!(fetch.requires_attribute("name"));
        assert!(!fetch.requires_attribute("code"));
        assert_eq!(fetch.locales, vec!["en".to_string()]);
    }

    #[test]
    fn test_empty_attribute_content_means_all() {
        let require = parse_require("facetSummary(COUNTS, entityGroupFetch(attributeContent()))")
            .unwrap();
        let RequireConstraint::FacetSummary(requirement) = require else {
            panic!("Expected FacetSummary");
        };
        assert_eq!(
            requirement.group_fetch,
            Some(EntityFetch::all_attributes())
        );
    }

    #[test]
    fn test_root_must_be_query() {
        let error = parse("facetSummary()").unwrap_err();
        assert!(matches!(error, QueryError::InvalidArgument { .. }));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("žluťoučký kůň", 4), "žluť");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
