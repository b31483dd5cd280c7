//! Operator scenarios.
//!
//! Each scenario builds a small model around one operator family and moves
//! its inputs, checking values, definedness and attributed violations.

use tarn_tests::prelude::*;

fn ints(lower: i64, upper: i64) -> AnyDomain {
    AnyDomain::int_range(lower, upper).unwrap()
}

mod in_domain {
    use super::*;
    use tarn_core::Reason;

    // ========== TEST: distance_to_split_domain ==========
    #[test]
    fn test_distance_to_split_domain() {
        // GIVEN the domain {1..3, 7..9}
        let domain = IntDomain::new([(1, 3), (7, 9)]).unwrap();

        // WHEN measuring 5
        let distance = domain.distance(5);

        // THEN it is 2 from both bounds and the upper one wins
        assert_eq!(distance.violation, 2);
        assert_eq!(distance.bound, 1);
        assert_eq!(distance.reason, Reason::TooSmall);
    }

    #[test]
    fn test_in_domain_follows_assignments() {
        Scenario::new("in_domain")
            .setup(|model, names| {
                let x = model.add_variable(ints(0, 12), Literal::Int(5))?;
                names.bind("x", x);
                let g = model.graph_mut();
                let inside = g.in_domain(x, IntDomain::new([(1, 3), (7, 9)])?)?;
                model.add_constraint(inside)?;
                Ok(())
            })
            .initially(|a| a.violation(2).var_violation("x", 2))
            .assign("move_up", "x", Literal::Int(8), |a| a.satisfied())
            .assign("overshoot", "x", Literal::Int(12), |a| a.violation(3).var_violation("x", 3))
            .assign("below", "x", Literal::Int(0), |a| a.violation(1))
            .run()
            .unwrap();
    }
}

mod arithmetic {
    use super::*;

    // ========== TEST: catch_undef_covers_division_by_zero ==========
    #[test]
    fn test_catch_undef_covers_division_by_zero() {
        // GIVEN objective = (x / y) catching undefined as -1
        Scenario::new("safe_division")
            .setup(|model, names| {
                let x = model.add_variable(ints(-9, 9), Literal::Int(7))?;
                let y = model.add_variable(ints(-3, 3), Literal::Int(0))?;
                names.bind("x", x);
                names.bind("y", y);
                let g = model.graph_mut();
                let quotient = g.div(x, y)?;
                names.bind("quotient", quotient);
                let fallback = g.constant(Literal::Int(-1));
                let safe = g.catch_undef(quotient, fallback)?;
                model.set_objective(OptimiseMode::Minimise, safe)?;
                Ok(())
            })
            // THEN division by zero falls back, and floor division rounds down
            .initially(|a| a.objective(-1).undefined("quotient"))
            .assign("divide_by_2", "y", Literal::Int(2), |a| a.objective(3).defined("quotient"))
            .assign("divide_by_minus_2", "y", Literal::Int(-2), |a| a.objective(-4))
            .assign("zero_again", "y", Literal::Int(0), |a| a.objective(-1))
            .run()
            .unwrap();
    }

    #[test]
    fn test_undefined_operand_maximally_violates() {
        let model = Scenario::new("undefined_less")
            .setup(|model, names| {
                let x = model.add_variable(ints(0, 9), Literal::Int(4))?;
                let y = model.add_variable(ints(0, 9), Literal::Int(0))?;
                names.bind("y", y);
                let g = model.graph_mut();
                let m = g.modulo(x, y)?;
                let three = g.constant(Literal::Int(3));
                let less = g.less(m, three)?;
                model.add_constraint(less)?;
                Ok(())
            })
            .initially(|a| a.violation(tarn_core::LARGE_VIOLATION))
            .assign("nonzero", "y", Literal::Int(3), |a| a.satisfied())
            .run()
            .unwrap();
        assert_eq!(model.violation(), 0);
    }

    #[test]
    fn test_min_max_and_product() {
        Scenario::new("folds")
            .setup(|model, names| {
                let vars: Vec<NodeId> = [3, 8, 5]
                    .into_iter()
                    .map(|v| model.add_variable(ints(0, 9), Literal::Int(v)))
                    .collect::<Result<_, _>>()?;
                names.bind("a", vars[0]);
                let g = model.graph_mut();
                let terms = g.sequence_lit(vars.clone())?;
                let low = g.min(terms)?;
                let terms = g.sequence_lit(vars.clone())?;
                let high = g.max(terms)?;
                let terms = g.sequence_lit(vars)?;
                let product = g.prod(terms)?;
                names.bind("low", low);
                names.bind("high", high);
                names.bind("product", product);
                let spread = g.minus(high, low)?;
                model.set_objective(OptimiseMode::Minimise, spread)?;
                Ok(())
            })
            .initially(|a| a.objective(5).int("low", 3).int("high", 8).int("product", 120))
            .assign("raise_a", "a", Literal::Int(9), |a| {
                a.objective(4).int("low", 5).int("high", 9).int("product", 360)
            })
            .assign("zero_a", "a", Literal::Int(0), |a| a.objective(8).int("product", 0))
            .run()
            .unwrap();
    }
}

mod containers {
    use super::*;

    // ========== TEST: set_equality_ignores_insertion_order ==========
    #[test]
    fn test_set_equality_ignores_insertion_order() {
        // GIVEN A = {1, 2, 3} and B = {3, 1} with A = B as mutual inclusion
        Scenario::new("set_equality")
            .setup(|model, names| {
                let domain = AnyDomain::set(SizeAttr::NoSize, ints(0, 9));
                let a = model.add_variable(domain.clone(), Literal::set(Literal::ints([1, 2, 3])))?;
                let b = model.add_variable(domain, Literal::set(Literal::ints([3, 1])))?;
                names.bind("A", a);
                names.bind("B", b);
                let g = model.graph_mut();
                let left = g.subset_eq(a, b)?;
                let right = g.subset_eq(b, a)?;
                model.add_constraint(left)?;
                model.add_constraint(right)?;
                Ok(())
            })
            .initially(|a| a.violation(1))
            // WHEN B gains the missing member
            .add_member("add_2", "B", Literal::Int(2), |a| {
                a.satisfied().assert_fn(|model, names| {
                    let g = model.graph();
                    match (names.get("A"), names.get("B")) {
                        (Some(a), Some(b)) => g.hash_of(a) == g.hash_of(b),
                        _ => false,
                    }
                })
            })
            // THEN extra members on either side are violations again
            .add_member("add_7", "A", Literal::Int(7), |a| a.violation(1))
            .run()
            .unwrap();
    }

    #[test]
    fn test_membership_and_intersection() {
        Scenario::new("intersection")
            .setup(|model, names| {
                let domain = AnyDomain::set(SizeAttr::NoSize, ints(0, 9));
                let a = model.add_variable(domain.clone(), Literal::set(Literal::ints([1, 2, 3, 4])))?;
                let b = model.add_variable(domain, Literal::set(Literal::ints([3, 4, 5])))?;
                let x = model.add_variable(ints(0, 9), Literal::Int(5))?;
                names.bind("A", a);
                names.bind("B", b);
                names.bind("x", x);
                let g = model.graph_mut();
                let common = g.intersect(a, b)?;
                names.bind("common", common);
                let member = g.member_of(x, common)?;
                let size = g.size_of(common)?;
                model.add_constraint(member)?;
                model.set_objective(OptimiseMode::Maximise, size)?;
                Ok(())
            })
            .initially(|a| a.violation(1).objective(2))
            .assign("x_to_3", "x", Literal::Int(3), |a| a.satisfied())
            .remove_value("drop_3", "B", Literal::Int(3), |a| a.violation(1).objective(1))
            .add_member("add_5", "A", Literal::Int(5), |a| a.objective(2))
            .run()
            .unwrap();
    }

    #[test]
    fn test_int_range_size() {
        Scenario::new("int_range")
            .setup(|model, names| {
                let lo = model.add_variable(ints(0, 9), Literal::Int(2))?;
                let hi = model.add_variable(ints(0, 9), Literal::Int(5))?;
                names.bind("lo", lo);
                let g = model.graph_mut();
                let range = g.int_range(lo, hi)?;
                let size = g.size_of(range)?;
                model.set_objective(OptimiseMode::Maximise, size)?;
                Ok(())
            })
            .initially(|a| a.objective(4))
            .assign("raise_lo", "lo", Literal::Int(5), |a| a.objective(1))
            .assign("cross", "lo", Literal::Int(7), |a| a.objective(0))
            .run()
            .unwrap();
    }

    #[test]
    fn test_tuple_index() {
        Scenario::new("tuple_index")
            .setup(|model, names| {
                let x = model.add_variable(ints(0, 9), Literal::Int(4))?;
                names.bind("x", x);
                let g = model.graph_mut();
                let one = g.constant(Literal::Int(1));
                let pair = g.tuple_lit(vec![one, x])?;
                let second = g.tuple_index(pair, 1)?;
                model.set_objective(OptimiseMode::Minimise, second)?;
                Ok(())
            })
            .initially(|a| a.objective(4))
            .assign("change", "x", Literal::Int(6), |a| a.objective(6))
            .run()
            .unwrap();
    }
}

mod functions {
    use super::*;

    /// f: 0..2 -> 0..9 with f = [1, 5, 1], read at x.
    fn scenario() -> Scenario {
        Scenario::new("function")
            .setup(|model, names| {
                let domain = AnyDomain::function(ints(0, 2), ints(0, 9), false)?;
                let f = model.add_variable(
                    domain,
                    Literal::Function(vec![
                        Some(Literal::Int(1)),
                        Some(Literal::Int(5)),
                        Some(Literal::Int(1)),
                    ]),
                )?;
                let x = model.add_variable(ints(0, 2), Literal::Int(1))?;
                names.bind("f", f);
                names.bind("x", x);
                let g = model.graph_mut();
                let image = g.function_image(f, x)?;
                names.bind("image", image);
                let one = g.constant(Literal::Int(1));
                let preimage = g.function_preimage(f, one)?;
                let ones = g.size_of(preimage)?;
                names.bind("ones", ones);
                model.set_objective(OptimiseMode::Minimise, image)?;
                Ok(())
            })
    }

    #[test]
    fn test_image_and_preimage_follow_moves() {
        scenario()
            .initially(|a| a.objective(5))
            .function_assign("remap_1", "f", 1, Literal::Int(7), |a| a.objective(7))
            .assign("read_2", "x", Literal::Int(2), |a| a.objective(1))
            .function_assign("remap_2", "f", 2, Literal::Int(3), |a| a.objective(3))
            .function_assign("out_of_domain", "f", 0, Literal::Int(12), |a| a.error("outside the domain"))
            .run()
            .unwrap();
    }

    #[test]
    fn test_preimage_counts_matching_slots() {
        scenario()
            .initially(|a| a.int("ones", 2))
            .function_assign("remap_0", "f", 0, Literal::Int(4), |a| a.int("ones", 1))
            .function_assign("remap_1", "f", 1, Literal::Int(1), |a| a.int("ones", 2))
            .run()
            .unwrap();
    }
}

mod partitions {
    use super::*;

    #[test]
    fn test_together_counts_members_to_move() {
        Scenario::new("together")
            .setup(|model, names| {
                let domain = AnyDomain::partition(ints(1, 4), SizeAttr::NoSize, SizeAttr::NoSize, false)?;
                let p = model.add_variable(
                    domain,
                    Literal::Partition(vec![Literal::ints([1, 2]), Literal::ints([3, 4])]),
                )?;
                names.bind("P", p);
                let g = model.graph_mut();
                let one = g.constant(Literal::Int(1));
                let three = g.constant(Literal::Int(3));
                let pair = g.set_lit(vec![one, three])?;
                let together = g.together(pair, p)?;
                let parts = g.parts(p)?;
                let count = g.size_of(parts)?;
                model.add_constraint(together)?;
                model.set_objective(OptimiseMode::Minimise, count)?;
                Ok(())
            })
            .initially(|a| a.violation(1).objective(2).var_violation("P", 1))
            // member 2 holds the value 3
            .partition_move("join", "P", 2, 0, |a| a.satisfied().objective(2))
            .partition_move("gather", "P", 3, 0, |a| a.satisfied().objective(1))
            .run()
            .unwrap();
    }
}
