//! A minimal local search driven through the model API.
//!
//! Picks a violated variable weighted by its attributed violation, tries a
//! random value and keeps it when the total violation does not grow.

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use tarn_constraint::ViolationContainer;
use tarn_tests::prelude::*;

fn all_different(values: &[i64]) -> (Model, Vec<NodeId>) {
    let mut model = Model::default();
    let domain = AnyDomain::int_range(1, values.len() as i64).unwrap();
    let vars: Vec<NodeId> = values
        .iter()
        .map(|v| model.add_variable(domain.clone(), Literal::Int(*v)).unwrap())
        .collect();
    let g = model.graph_mut();
    let terms = g.sequence_lit(vars.clone()).unwrap();
    let distinct = g.all_diff(terms).unwrap();
    model.add_constraint(distinct).unwrap();
    model.start().unwrap();
    (model, vars)
}

fn violated(container: &ViolationContainer, model: &Model, vars: &[NodeId]) -> usize {
    vars.iter()
        .filter_map(|v| model.graph().value_base(*v))
        .filter(|base| container.var_violation(base.id) > 0)
        .count()
}

// ========== TEST: duplicates_are_credited_to_every_copy ==========
#[test]
fn test_duplicates_are_credited_to_every_copy() {
    // GIVEN [1, 1, 2, 2, 5]
    let (mut model, vars) = all_different(&[1, 1, 2, 2, 5]);
    assert_eq!(model.violation(), 2);

    // WHEN violations are attributed
    let container = model.update_var_violations().unwrap().clone();

    // THEN the four duplicated variables are credited, the unique one is not
    assert_eq!(violated(&container, &model, &vars), 4);
    let last = model.graph().value_base(vars[4]).unwrap().id;
    assert_eq!(container.var_violation(last), 0);
}

// ========== TEST: hill_climbing_reaches_a_permutation ==========
#[test]
fn test_hill_climbing_reaches_a_permutation() {
    init_tracing();

    // GIVEN five variables over 1..5, all equal
    let (mut model, vars) = all_different(&[1, 1, 1, 1, 1]);
    let mut rng = StdRng::seed_from_u64(11);

    // WHEN searching with sideways moves allowed
    for _ in 0..5_000 {
        if model.violation() == 0 {
            break;
        }
        model.update_var_violations().unwrap();
        let Some(var) = model.select_violating_var(&mut rng) else {
            break;
        };
        let before = model.violation();
        let value = Literal::Int(rng.gen_range(1..=5));
        model
            .try_assign(var, value, |m| m.violation() <= before)
            .unwrap();
    }

    // THEN the assignment is a permutation and the caches agree
    assert_eq!(model.violation(), 0);
    let values: HashSet<i64> = vars.iter().map(|v| model.graph().int(*v)).collect();
    assert_eq!(values.len(), 5);
    model.assert_sane();
}

#[test]
fn test_satisfied_model_offers_no_variable() {
    let (mut model, _) = all_different(&[3, 1, 2]);
    model.update_var_violations().unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    assert_eq!(model.select_violating_var(&mut rng), None);
}
