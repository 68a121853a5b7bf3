//! Property tests over randomly generated catalogues.

use std::collections::BTreeSet;

use facet_query::{FilterConstraint, Query, RequireConstraint};
use facet_summary::{
    CandidateIndex, Entity, EntityIdSet, EntitySchema, FacetPredicate, FacetSummary,
    FacetSummaryComputer, FacetedEntity, GroupReference, PredicateCombinator, PrimaryKey,
    ReferenceSchema, RelationConfiguration, RelationLevel, RelationType, StatisticsDepth,
};
use proptest::prelude::*;

const BRANDS: PrimaryKey = 4;
const PARAMETERS: PrimaryKey = 6;

fn schema() -> EntitySchema {
    EntitySchema::new("Product")
        .with_reference(ReferenceSchema::new("brand", "Brand"))
        .with_reference(
            ReferenceSchema::new("parameter", "ParameterValue").with_group_type("Parameter", true),
        )
}

/// Parameter values 1..=3 belong to group 1, 4..=6 to group 2.
fn parameter_group(value: PrimaryKey) -> PrimaryKey {
    (value - 1) / 3 + 1
}

fn arb_candidates() -> impl Strategy<Value = Vec<Entity>> {
    prop::collection::vec(
        (
            prop::collection::btree_set(1..=BRANDS, 0..3),
            prop::collection::btree_set(1..=PARAMETERS, 0..4),
        ),
        1..40,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(index, (brands, parameters))| {
                let mut entity = Entity::new(index as PrimaryKey + 1);
                for brand in brands {
                    entity = entity.with_reference("brand", brand);
                }
                for value in parameters {
                    entity = entity.with_grouped_reference("parameter", value, parameter_group(value));
                }
                entity
            })
            .collect()
    })
}

fn arb_relation() -> impl Strategy<Value = RelationType> {
    prop_oneof![
        Just(RelationType::Conjunction),
        Just(RelationType::Disjunction),
        Just(RelationType::Negation),
        Just(RelationType::Exclusivity),
    ]
}

fn arb_selection(max: PrimaryKey) -> impl Strategy<Value = BTreeSet<PrimaryKey>> {
    prop::collection::btree_set(1..=max, 0..3)
}

fn id_set(ids: &BTreeSet<PrimaryKey>) -> EntityIdSet {
    ids.iter().copied().collect()
}

fn matching(candidates: &[Entity], test: impl Fn(&Entity) -> bool) -> EntityIdSet {
    candidates
        .iter()
        .filter(|entity| test(entity))
        .map(FacetedEntity::primary_key)
        .collect()
}

fn selection_query(
    brands: &BTreeSet<PrimaryKey>,
    parameters: &BTreeSet<PrimaryKey>,
    extra: Vec<RequireConstraint>,
) -> Query {
    let mut builder = Query::builder();
    if !brands.is_empty() {
        builder = builder.filter(FilterConstraint::facet_having("brand", brands.iter().copied()));
    }
    if !parameters.is_empty() {
        builder = builder.filter(FilterConstraint::facet_having(
            "parameter",
            parameters.iter().copied(),
        ));
    }
    builder = builder.require(RequireConstraint::facet_summary(StatisticsDepth::Impact));
    for constraint in extra {
        builder = builder.require(constraint);
    }
    builder.build()
}

fn summarize(query: &Query, candidates: &[Entity]) -> FacetSummary {
    let schema = schema();
    FacetSummaryComputer::new(&schema)
        .compute(query, candidates)
        .unwrap()
}

proptest! {
    #[test]
    fn facet_predicate_matches_agrees_with_evaluate(
        candidates in arb_candidates(),
        relation in arb_relation(),
        selected in arb_selection(BRANDS),
    ) {
        let index = CandidateIndex::from_entities(&candidates);
        let predicate = FacetPredicate::new(relation, GroupReference::new("brand", None), id_set(&selected));

        let expected = matching(&candidates, |entity| predicate.matches(entity));
        prop_assert_eq!(predicate.evaluate(&index), expected);
    }

    #[test]
    fn combined_predicate_matches_agrees_with_evaluate(
        candidates in arb_candidates(),
        within in arb_relation(),
        across in arb_relation(),
        first_group in arb_relation(),
        brands in arb_selection(BRANDS),
        group_1 in arb_selection(3),
        group_2 in arb_selection(3),
    ) {
        let relations = RelationConfiguration::new(within, across).with_override(
            RelationLevel::AcrossGroups,
            GroupReference::new("parameter", Some(1)),
            first_group,
        );
        let group_2: BTreeSet<PrimaryKey> = group_2.iter().map(|value| value + 3).collect();
        let predicates = vec![
            FacetPredicate::new(within, GroupReference::new("brand", None), id_set(&brands)),
            FacetPredicate::new(within, GroupReference::new("parameter", Some(1)), id_set(&group_1)),
            FacetPredicate::new(within, GroupReference::new("parameter", Some(2)), id_set(&group_2)),
        ];
        let combined = PredicateCombinator::new(&relations).combine(predicates);

        let index = CandidateIndex::from_entities(&candidates);
        let expected = matching(&candidates, |entity| combined.matches(entity));
        prop_assert_eq!(combined.evaluate(&index), expected);
    }

    #[test]
    fn only_disjunctive_groups_match_every_candidate(
        candidates in arb_candidates(),
        within in arb_relation(),
        brands in arb_selection(BRANDS),
        group_1 in arb_selection(3),
    ) {
        let relations = RelationConfiguration::new(within, RelationType::Disjunction);
        let predicates = vec![
            FacetPredicate::new(within, GroupReference::new("brand", None), id_set(&brands)),
            FacetPredicate::new(within, GroupReference::new("parameter", Some(1)), id_set(&group_1)),
        ];
        let combined = PredicateCombinator::new(&relations).combine(predicates);

        let index = CandidateIndex::from_entities(&candidates);
        prop_assert_eq!(combined.evaluate(&index), index.all().clone());
    }

    #[test]
    fn combine_unions_ids_except_for_exclusivity(
        relation in arb_relation(),
        existing in arb_selection(BRANDS),
        added in arb_selection(BRANDS),
    ) {
        let predicate = FacetPredicate::new(relation, GroupReference::new("brand", None), id_set(&existing));
        let combined = predicate.combine(&id_set(&added));

        if relation == RelationType::Exclusivity {
            prop_assert_eq!(combined.relation(), RelationType::Disjunction);
            prop_assert_eq!(combined.facet_ids(), &id_set(&added));
        } else {
            prop_assert_eq!(combined.relation(), relation);
            let union: BTreeSet<PrimaryKey> = existing.union(&added).copied().collect();
            prop_assert_eq!(combined.facet_ids(), &id_set(&union));
        }
    }

    #[test]
    fn summary_is_deterministic(
        candidates in arb_candidates(),
        brands in arb_selection(BRANDS),
        parameters in arb_selection(PARAMETERS),
    ) {
        let query = selection_query(&brands, &parameters, Vec::new());
        prop_assert_eq!(summarize(&query, &candidates), summarize(&query, &candidates));

        // selecting a facet twice is the same as selecting it once
        let mut doubled = query.clone();
        if let Some(first) = brands.iter().next() {
            doubled.filter_by = Some(FilterConstraint::And(vec![
                query.filter_by.clone().unwrap(),
                FilterConstraint::facet_having("brand", [*first]),
            ]));
        }
        prop_assert_eq!(summarize(&doubled, &candidates), summarize(&query, &candidates));
    }

    #[test]
    fn counts_are_consistent(
        candidates in arb_candidates(),
        brands in arb_selection(BRANDS),
        parameters in arb_selection(PARAMETERS),
    ) {
        let query = selection_query(&brands, &parameters, Vec::new());
        let summary = summarize(&query, &candidates);

        for group in &summary.groups {
            prop_assert!(group.count <= candidates.len());
            prop_assert!(!group.facets.is_empty());
            for facet in &group.facets {
                let referencing = candidates
                    .iter()
                    .filter(|entity| entity.has_reference(&group.reference_name, facet.primary_key()))
                    .count();
                prop_assert_eq!(facet.count, referencing);
                prop_assert!(facet.count >= 1);
                prop_assert!(facet.count <= group.count);

                let selected = if group.reference_name == "brand" { &brands } else { &parameters };
                prop_assert_eq!(facet.requested, selected.contains(&facet.primary_key()));
            }
        }
    }

    #[test]
    fn negated_counts_complement_raw_counts(
        candidates in arb_candidates(),
        brands in arb_selection(BRANDS),
    ) {
        let plain = summarize(&selection_query(&brands, &BTreeSet::new(), Vec::new()), &candidates);
        let negated = summarize(
            &selection_query(
                &brands,
                &BTreeSet::new(),
                vec![RequireConstraint::facet_groups(
                    RelationType::Negation,
                    "brand",
                    RelationLevel::WithinGroup,
                    [],
                )],
            ),
            &candidates,
        );

        for facet in plain.groups_of("brand").flat_map(|group| group.facets.iter()) {
            let inverted = negated.facet("brand", facet.primary_key()).unwrap();
            prop_assert_eq!(inverted.count + facet.count, candidates.len());
        }
    }

    #[test]
    fn impact_is_consistent(
        candidates in arb_candidates(),
        brands in arb_selection(BRANDS),
        parameters in arb_selection(PARAMETERS),
        across in arb_relation(),
    ) {
        let query = selection_query(
            &brands,
            &parameters,
            vec![RequireConstraint::facet_groups(across, "parameter", RelationLevel::AcrossGroups, [])],
        );
        let summary = summarize(&query, &candidates);

        let mut bases = BTreeSet::new();
        for facet in summary.groups.iter().flat_map(|group| group.facets.iter()) {
            let impact = facet.impact.unwrap();
            prop_assert!(impact.new_count <= candidates.len());
            if !impact.has_sense {
                prop_assert!(impact.delta == 0 || impact.new_count == 0);
            }
            bases.insert(impact.new_count as i64 - impact.delta);
        }
        // every delta is measured against the same base result
        prop_assert!(bases.len() <= 1);
    }

    #[test]
    fn disjunction_never_yields_less_than_conjunction(
        candidates in arb_candidates(),
        brands in arb_selection(BRANDS),
    ) {
        let disjunctive = summarize(&selection_query(&brands, &BTreeSet::new(), Vec::new()), &candidates);
        let conjunctive = summarize(
            &selection_query(
                &brands,
                &BTreeSet::new(),
                vec![RequireConstraint::facet_groups(
                    RelationType::Conjunction,
                    "brand",
                    RelationLevel::WithinGroup,
                    [],
                )],
            ),
            &candidates,
        );

        for facet in disjunctive.groups_of("brand").flat_map(|group| group.facets.iter()) {
            let other = conjunctive.facet("brand", facet.primary_key()).unwrap();
            prop_assert!(facet.impact.unwrap().new_count >= other.impact.unwrap().new_count);
        }
    }
}
