//! Quantifier scenarios.
//!
//! These tests drive quantifiers through container moves:
//! - Unrolling and rolling as set members come and go
//! - Guarded comprehensions over sequences with inserts, swaps and removals
//! - Existential quantification and nested quantifiers

use tarn_tests::prelude::*;

fn int_set(lower: i64, upper: i64) -> AnyDomain {
    AnyDomain::set(SizeAttr::NoSize, AnyDomain::int_range(lower, upper).unwrap())
}

fn int_sequence(lower: i64, upper: i64) -> AnyDomain {
    AnyDomain::sequence(SizeAttr::NoSize, AnyDomain::int_range(lower, upper).unwrap(), false)
}

mod forall_even {
    use super::*;

    /// forall i in S: i mod 2 = 0, S = {1, 2, 3} over 1..5.
    pub fn scenario() -> Scenario {
        Scenario::new("forall_even")
            .setup(|model, names| {
                let s = model.add_variable(int_set(1, 5), Literal::set(Literal::ints([1, 2, 3])))?;
                names.bind("S", s);
                let g = model.graph_mut();
                let two = g.constant(Literal::Int(2));
                let zero = g.constant(Literal::Int(0));
                let forall = g.forall(s, |g, i| {
                    let m = g.modulo(i, two)?;
                    g.int_eq(m, zero)
                })?;
                model.add_constraint(forall)?;
                Ok(())
            })
            .initially(|a| a.violation(2).var_violation("S", 2))
            .remove_value("remove_1", "S", Literal::Int(1), |a| {
                a.violation(1).size("S", 2).var_violation("S", 1)
            })
            .add_member("add_4", "S", Literal::Int(4), |a| a.violation(1).size("S", 3))
            .add_member("add_5", "S", Literal::Int(5), |a| a.violation(2).size("S", 4))
            .add_member("add_existing", "S", Literal::Int(4), |a| a.error("Duplicate"))
            .remove_value("remove_3", "S", Literal::Int(3), |a| a.violation(1))
            .remove_value("remove_5", "S", Literal::Int(5), |a| a.satisfied())
    }

    #[test]
    fn test_forall_follows_membership() {
        init_tracing();
        scenario().run().unwrap();
    }

    #[test]
    fn test_forall_with_minimal_config() {
        scenario().config(EngineConfig::minimal()).run().unwrap();
    }
}

mod guarded_sum {
    use super::*;

    /// Objective: sum of x in Q where x > 2, Q = [1, 5, 2, 7].
    pub fn scenario() -> Scenario {
        Scenario::new("guarded_sum")
            .setup(|model, names| {
                let q = model.add_variable(int_sequence(0, 9), Literal::sequence(Literal::ints([1, 5, 2, 7])))?;
                names.bind("Q", q);
                let g = model.graph_mut();
                let two = g.constant(Literal::Int(2));
                let picked = g.quantify_where(q, |g, x| g.less(two, x), |_, x| Ok(x))?;
                let total = g.sum(picked)?;
                names.bind("total", total);
                model.set_objective(OptimiseMode::Maximise, total)?;
                Ok(())
            })
            .initially(|a| a.satisfied().objective(12))
            .swap("swap_front", "Q", 0, 1, |a| a.objective(12))
            .insert("insert_9", "Q", 0, Literal::Int(9), |a| a.objective(21).size("Q", 5))
            .assign_member("raise_2", "Q", 3, Literal::Int(4), |a| a.objective(25))
            .remove_at("drop_last", "Q", 4, |a| a.objective(18))
            .assign_member("lower_9", "Q", 0, Literal::Int(0), |a| a.objective(9))
            .swap("swap_guarded", "Q", 0, 2, |a| a.objective(9))
            .insert("insert_end", "Q", 4, Literal::Int(3), |a| a.objective(12))
    }

    #[test]
    fn test_guarded_sum_tracks_sequence_moves() {
        scenario().run().unwrap();
    }
}

mod exists_four {
    use super::*;

    #[test]
    fn test_exists_takes_closest_member() {
        Scenario::new("exists_four")
            .setup(|model, names| {
                let s = model.add_variable(int_set(1, 5), Literal::set(Literal::ints([1, 2])))?;
                names.bind("S", s);
                let g = model.graph_mut();
                let four = g.constant(Literal::Int(4));
                let exists = g.exists(s, |g, i| g.int_eq(i, four))?;
                model.add_constraint(exists)?;
                Ok(())
            })
            .initially(|a| a.violation(2))
            .add_member("add_4", "S", Literal::Int(4), |a| a.satisfied())
            .add_member("add_5", "S", Literal::Int(5), |a| a.satisfied())
            .remove_value("remove_4", "S", Literal::Int(4), |a| a.violation(1))
            .run()
            .unwrap();
    }
}

mod nested {
    use super::*;

    // ========== TEST: nested_quantifier_counts_ordered_pairs ==========
    #[test]
    fn test_nested_quantifier_counts_ordered_pairs() {
        // GIVEN the number of pairs i < j drawn from S
        Scenario::new("ordered_pairs")
            .setup(|model, names| {
                let s = model.add_variable(int_set(1, 9), Literal::set(Literal::ints([1, 4, 6])))?;
                names.bind("S", s);
                let g = model.graph_mut();
                let pairs = g.sum_over(s, |g, i| {
                    g.sum_over(s, |g, j| {
                        let less = g.less(i, j)?;
                        g.to_int(less)
                    })
                })?;
                names.bind("pairs", pairs);
                model.set_objective(OptimiseMode::Minimise, pairs)?;
                Ok(())
            })
            // WHEN members are added and removed
            // THEN the count is n(n-1)/2 each time
            .initially(|a| a.objective(3))
            .add_member("add_2", "S", Literal::Int(2), |a| a.objective(6))
            .remove_value("remove_4", "S", Literal::Int(4), |a| a.objective(3))
            .remove_value("remove_1", "S", Literal::Int(1), |a| a.objective(1))
            .run()
            .unwrap();
    }
}

mod all_different {
    use super::*;

    #[test]
    fn test_all_diff_over_sequence_members() {
        Scenario::new("all_diff")
            .setup(|model, names| {
                let q = model.add_variable(int_sequence(0, 9), Literal::sequence(Literal::ints([1, 1, 2, 1])))?;
                names.bind("Q", q);
                let distinct = model.graph_mut().all_diff(q)?;
                model.add_constraint(distinct)?;
                Ok(())
            })
            .initially(|a| a.violation(2).var_violation("Q", 6))
            .assign_member("fix_second", "Q", 1, Literal::Int(3), |a| a.violation(1))
            .remove_at("drop_last", "Q", 3, |a| a.satisfied())
            .insert("duplicate_2", "Q", 0, Literal::Int(2), |a| a.violation(1))
            .swap("swap", "Q", 0, 3, |a| a.violation(1))
            .run()
            .unwrap();
    }
}

mod function_pairs {
    use super::*;

    // ========== TEST: function_quantifier_follows_remaps ==========
    #[test]
    fn test_function_quantifier_follows_remaps() {
        // GIVEN forall (x, y) in f: x <= y, with f = [3, 0, 1] over 0..2
        Scenario::new("function_pairs")
            .setup(|model, names| {
                let domain = AnyDomain::function(
                    AnyDomain::int_range(0, 2).unwrap(),
                    AnyDomain::int_range(0, 9).unwrap(),
                    false,
                )?;
                let f = model.add_variable(
                    domain,
                    Literal::Function(vec![
                        Some(Literal::Int(3)),
                        Some(Literal::Int(0)),
                        Some(Literal::Int(1)),
                    ]),
                )?;
                names.bind("f", f);
                let g = model.graph_mut();
                let rising = g.forall(f, |g, pair| {
                    let x = g.tuple_index(pair, 0)?;
                    let y = g.tuple_index(pair, 1)?;
                    g.less_eq(x, y)
                })?;
                model.add_constraint(rising)?;
                Ok(())
            })
            // WHEN slots are remapped one by one
            // THEN each pair is judged on its own preimage and image
            .initially(|a| a.violation(2))
            .function_assign("lift_1", "f", 1, Literal::Int(4), |a| a.violation(1))
            .function_assign("lift_2", "f", 2, Literal::Int(2), |a| a.satisfied())
            .function_assign("drop_0", "f", 0, Literal::Int(0), |a| a.satisfied())
            .function_assign("drop_2", "f", 2, Literal::Int(0), |a| a.violation(2))
            .run()
            .unwrap();
    }
}

mod windows {
    use super::*;

    // ========== TEST: windows_follow_sequence_moves ==========
    #[test]
    fn test_windows_follow_sequence_moves() {
        // GIVEN the sum of every window of three in Q = [1, 2, 3, 4]
        Scenario::new("windows")
            .setup(|model, names| {
                let q = model.add_variable(int_sequence(0, 9), Literal::sequence(Literal::ints([1, 2, 3, 4])))?;
                names.bind("Q", q);
                let g = model.graph_mut();
                let three = g.constant(Literal::Int(3));
                let length = g.size_of(q)?;
                let totals = g.quantify_windows(q, three, length, 3, |g, window| {
                    let members: Vec<NodeId> = (0..3)
                        .map(|k| g.tuple_index(window, k))
                        .collect::<Result<_, _>>()?;
                    let terms = g.sequence_lit(members)?;
                    g.sum(terms)
                })?;
                let total = g.sum(totals)?;
                model.set_objective(OptimiseMode::Maximise, total)?;
                Ok(())
            })
            // WHEN members change, arrive and leave
            // THEN inner members count once per window that covers them
            .initially(|a| a.objective(15))
            .assign_member("raise_first", "Q", 0, Literal::Int(5), |a| a.objective(19))
            .insert("append", "Q", 4, Literal::Int(1), |a| a.objective(27))
            .remove_at("drop_front", "Q", 0, |a| a.objective(17))
            .swap("swap_ends", "Q", 0, 3, |a| a.objective(17))
            .run()
            .unwrap();
    }
}
