//! Property: incremental propagation agrees with evaluation from scratch.
//!
//! A model is driven through a random sequence of moves. After every move
//! its violation and objective must equal those of a fresh model built from
//! the current variable values, and the sanity pass must hold.

use proptest::prelude::*;
use tarn_tests::prelude::*;

/// Variables of the model under test.
struct Handles {
    x: NodeId,
    q: NodeId,
    s: NodeId,
}

fn ints(lower: i64, upper: i64) -> AnyDomain {
    AnyDomain::int_range(lower, upper).unwrap()
}

/// Constraints:
/// - all members of Q differ
/// - every member of S is below x
/// - some member of Q equals x
///
/// Objective: sum of the members of S above 2, plus the number of Q members
/// that also lie in S.
fn build(x: Literal, q: Literal, s: Literal) -> (Model, Handles) {
    let mut model = Model::default();
    let x = model.add_variable(ints(0, 9), x).unwrap();
    let q = model
        .add_variable(AnyDomain::sequence(SizeAttr::NoSize, ints(0, 9), false), q)
        .unwrap();
    let s = model
        .add_variable(AnyDomain::set(SizeAttr::NoSize, ints(0, 9)), s)
        .unwrap();

    let g = model.graph_mut();
    let distinct = g.all_diff(q).unwrap();
    let below = g.forall(s, |g, i| g.less(i, x)).unwrap();
    let hit = g.exists(q, |g, j| g.int_eq(j, x)).unwrap();

    let two = g.constant(Literal::Int(2));
    let large = g.quantify_where(s, |g, i| g.less(two, i), |_, i| Ok(i)).unwrap();
    let large_total = g.sum(large).unwrap();
    let shared = g
        .sum_over(q, |g, j| {
            let member = g.member_of(j, s)?;
            g.to_int(member)
        })
        .unwrap();
    let terms = g.sequence_lit(vec![large_total, shared]).unwrap();
    let objective = g.sum(terms).unwrap();

    for constraint in [distinct, below, hit] {
        model.add_constraint(constraint).unwrap();
    }
    model.set_objective(OptimiseMode::Minimise, objective).unwrap();
    model.start().unwrap();
    (model, Handles { x, q, s })
}

/// A move described by raw indices, resolved against the current sizes.
#[derive(Debug, Clone)]
enum Step {
    AssignX(i64),
    AssignQ(usize, i64),
    InsertQ(usize, i64),
    RemoveQ(usize),
    SwapQ(usize, usize),
    AddS(i64),
    /// Reassign a member of S in place, possibly crossing the `> 2` guard.
    AssignS(usize, i64),
    RemoveS(usize),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0i64..=9).prop_map(Step::AssignX),
        (any::<usize>(), 0i64..=9).prop_map(|(i, v)| Step::AssignQ(i, v)),
        (any::<usize>(), 0i64..=9).prop_map(|(i, v)| Step::InsertQ(i, v)),
        any::<usize>().prop_map(Step::RemoveQ),
        (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Step::SwapQ(a, b)),
        (0i64..=9).prop_map(Step::AddS),
        (any::<usize>(), 0i64..=9).prop_map(|(i, v)| Step::AssignS(i, v)),
        any::<usize>().prop_map(Step::RemoveS),
    ]
}

/// The concrete move for `step`, or `None` when the container is empty.
fn resolve(step: &Step, model: &Model, h: &Handles) -> Option<Move> {
    let g = model.graph();
    let q_len = g.size(h.q);
    let s_len = g.size(h.s);
    let mv = match *step {
        Step::AssignX(value) => Move::Assign {
            target: h.x,
            value: Literal::Int(value),
        },
        Step::AssignQ(index, value) if q_len > 0 => Move::Assign {
            target: g.member(h.q, index % q_len).ok()?,
            value: Literal::Int(value),
        },
        Step::InsertQ(index, value) => Move::SequenceInsert {
            sequence: h.q,
            index: index % (q_len + 1),
            value: Literal::Int(value),
        },
        Step::RemoveQ(index) if q_len > 0 => Move::RemoveMember {
            container: h.q,
            index: index % q_len,
        },
        Step::SwapQ(a, b) if q_len > 0 => Move::SequenceSwap {
            sequence: h.q,
            a: a % q_len,
            b: b % q_len,
        },
        Step::AddS(value) => Move::AddMember {
            container: h.s,
            value: Literal::Int(value),
        },
        Step::AssignS(index, value) if s_len > 0 => Move::Assign {
            target: g.member(h.s, index % s_len).ok()?,
            value: Literal::Int(value),
        },
        Step::RemoveS(index) if s_len > 0 => Move::RemoveMember {
            container: h.s,
            index: index % s_len,
        },
        _ => return None,
    };
    Some(mv)
}

/// Rebuild from the current values and compare.
fn agrees_with_fresh(model: &Model, h: &Handles) -> Result<(), TestCaseError> {
    let g = model.graph();
    let (fresh, _) = build(
        g.literal_of(h.x).unwrap(),
        g.literal_of(h.q).unwrap(),
        g.literal_of(h.s).unwrap(),
    );
    prop_assert_eq!(model.violation(), fresh.violation());
    prop_assert_eq!(model.objective_value(), fresh.objective_value());
    Ok(())
}

fn initial_values() -> impl Strategy<Value = (i64, Vec<i64>, Vec<i64>)> {
    (
        0i64..=9,
        prop::collection::vec(0i64..=9, 0..6),
        prop::collection::btree_set(0i64..=9, 0..5).prop_map(|s| s.into_iter().collect()),
    )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn moves_agree_with_full_evaluation(
        (x, q, s) in initial_values(),
        steps in prop::collection::vec(step_strategy(), 1..25),
    ) {
        let (mut model, h) = build(
            Literal::Int(x),
            Literal::sequence(Literal::ints(q)),
            Literal::set(Literal::ints(s)),
        );
        agrees_with_fresh(&model, &h)?;

        for step in &steps {
            let Some(mv) = resolve(step, &model, &h) else {
                continue;
            };
            // duplicate set members, added or assigned, are rejected
            // without touching the state
            let _ = model.apply(&mv);
            prop_assert!(model.check_sanity().is_ok(), "insane after {}", mv);
            agrees_with_fresh(&model, &h)?;
        }
    }

    #[test]
    fn rejected_moves_leave_no_trace(
        (x, q, s) in initial_values(),
        steps in prop::collection::vec(step_strategy(), 1..15),
    ) {
        let (mut model, h) = build(
            Literal::Int(x),
            Literal::sequence(Literal::ints(q)),
            Literal::set(Literal::ints(s)),
        );
        let violation = model.violation();
        let objective = model.objective_value();

        for step in &steps {
            let Some(mv) = resolve(step, &model, &h) else {
                continue;
            };
            let kept = model.try_move(&mv, |_| false);
            prop_assert!(matches!(kept, Ok(false) | Err(_)));
            prop_assert_eq!(model.violation(), violation);
            prop_assert_eq!(model.objective_value(), objective);
            prop_assert!(model.check_sanity().is_ok());
        }
    }
}
