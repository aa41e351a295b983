//! End-to-end scenarios across all three evaluation modes.

use ziria_eval::{
    approximate, eval_bool, eval_full, eval_int, eval_partial, eval_src_bool, eval_src_int,
    implies, provable, satisfiable, EvalError, TypeChecker,
};
use ziria_ir::{build, pretty_print_exp, ArrayLen, Exp, Name, RangeKind, Ty, UniqGen};

fn int_name(uniq: u64, n: &str) -> Name {
    Name::new(uniq, n, Ty::int32())
}

fn complex_ty() -> Ty {
    Ty::Struct(
        "complex".to_string(),
        vec![
            ("re".to_string(), Ty::int32()),
            ("im".to_string(), Ty::int32()),
        ],
    )
}

#[test]
fn ground_arithmetic_evaluates_fully() {
    let e = build::mult(
        build::add(build::int32(1), build::int32(2)),
        build::add(build::int32(3), build::int32(4)),
    );
    assert_eq!(eval_int(&e).unwrap(), (21, String::new()));
}

#[test]
fn partial_mode_residualizes_around_free_variables() {
    let a = int_name(0, "a");
    let e = build::add(
        build::var(&a),
        build::mult(build::int32(2), build::int32(3)),
    );
    let (v, prints) = eval_partial(&e).unwrap();
    assert_eq!(prints, "");
    assert_eq!(pretty_print_exp(&v), "a + 6");
}

#[test]
fn full_mode_rejects_free_variables() {
    let a = int_name(0, "a");
    let e = build::add(
        build::var(&a),
        build::mult(build::int32(2), build::int32(3)),
    );
    let err = eval_full(&e).unwrap_err();
    assert_eq!(err.error, EvalError::FreeVariables);
    assert_eq!(err.prints, "");
}

#[test]
fn nested_lets_evaluate_in_partial_mode() {
    let x = int_name(0, "x");
    let y = int_name(1, "y");
    let e = build::let_(
        x.clone(),
        build::int32(5),
        build::let_(
            y.clone(),
            build::int32(7),
            build::add(build::var(&x), build::var(&y)),
        ),
    );
    let (v, prints) = eval_partial(&e).unwrap();
    assert_eq!(v.as_int(), Some(12));
    assert_eq!(prints, "");
}

#[test]
fn mutable_reference_updates_accumulate() {
    let r = int_name(0, "r");
    let incr = build::assign(
        build::var(&r),
        build::add(build::var(&r), build::int32(1)),
    );
    let e = build::let_ref(
        r.clone(),
        build::int32(0),
        build::seqs(vec![incr.clone(), incr, build::var(&r)]),
    );
    let (v, _) = eval_partial(&e).unwrap();
    assert_eq!(v.as_int(), Some(2));
}

#[test]
fn non_simple_binding_keeps_both_call_sites() {
    // let x = complex{re = f(); im = f()} in x.re must keep the binding:
    // collapsing it would drop or duplicate the opaque calls.
    let f = Name::new(
        0,
        "f",
        Ty::Arrow(Vec::new(), Box::new(Ty::int32())),
    );
    let x = Name::new(1, "x", complex_ty());
    let bound = build::struct_(
        "complex",
        vec![
            ("re".to_string(), build::call(&f, Vec::new())),
            ("im".to_string(), build::call(&f, Vec::new())),
        ],
    );
    let e = build::let_(x.clone(), bound, build::proj(build::var(&x), "re"));
    let (v, prints) = eval_partial(&e).unwrap();
    assert_eq!(prints, "");
    let printed = pretty_print_exp(&v);
    assert_eq!(printed.matches("f()").count(), 2, "residual: {printed}");
    // The binding itself must survive.
    assert!(printed.starts_with("let x = "), "residual: {printed}");
}

#[test]
fn unconstrained_doubling_is_not_provable_but_its_guard_fixes_it() {
    let x = int_name(0, "x");
    let doubled = build::geq(
        build::mult(build::var(&x), build::int32(2)),
        build::var(&x),
    );
    // x * 2 >= x fails at x = -1.
    assert!(!provable(&doubled));
    // (x < 0) || (x * 2 >= x) holds everywhere.
    let guarded = build::or(build::lt(build::var(&x), build::int32(0)), doubled);
    assert!(provable(&guarded));
}

#[test]
fn slice_update_round_trips() {
    let a = Name::new(
        0,
        "a",
        Ty::Array(ArrayLen::Literal(5), Box::new(Ty::int32())),
    );
    let e = build::let_ref(
        a.clone(),
        build::arr((1..=5).map(build::int32).collect()),
        build::seq(
            build::arr_write(
                build::var(&a),
                build::int32(1),
                RangeKind::Length(2),
                build::arr(vec![build::int32(20), build::int32(30)]),
            ),
            build::var(&a),
        ),
    );
    let (v, prints) = eval_partial(&e).unwrap();
    assert_eq!(prints, "");
    assert_eq!(pretty_print_exp(&v), "{1, 20, 30, 4, 5}");
}

#[test]
fn out_of_bounds_read_fails_in_every_mode() {
    let arr = build::arr(vec![build::int32(10), build::int32(20), build::int32(30)]);
    let e = build::arr_read(arr, build::int32(5), RangeKind::Singleton);
    let expected = EvalError::OutOfBounds {
        index: 5,
        length: 3,
    };
    assert_eq!(eval_partial(&e).unwrap_err().error, expected);
    assert_eq!(eval_full(&e).unwrap_err().error, expected);
    assert!(approximate(&e).is_empty());
}

#[test]
fn provability_duality() {
    let x = int_name(0, "x");
    let e = build::bin(ziria_ir::BinOp::Gt, build::var(&x), build::int32(0));
    assert!(satisfiable(&e));
    assert!(!provable(&e));
    // provable(!e) == !satisfiable(e)
    assert_eq!(provable(&build::not(e.clone())), !satisfiable(&e));
    // provable(e) == !satisfiable(!e)
    assert_eq!(provable(&e), !satisfiable(&build::not(e)));
}

#[test]
fn guessed_domains_stay_consistent_across_comparisons() {
    let x = int_name(0, "x");
    // x == 5 and x == 6 cannot hold together.
    let e = build::and(
        build::eq(build::var(&x), build::int32(5)),
        build::eq(build::var(&x), build::int32(6)),
    );
    assert!(!satisfiable(&e));
    // 0 <= x <= 0 can.
    let e = build::and(
        build::geq(build::var(&x), build::int32(0)),
        build::bin(ziria_ir::BinOp::Leq, build::var(&x), build::int32(0)),
    );
    assert!(satisfiable(&e));
    // A tautology over a guessed comparison is provable.
    let e = build::or(
        build::lt(build::var(&x), build::int32(0)),
        build::geq(build::var(&x), build::int32(0)),
    );
    assert!(provable(&e));
}

#[test]
fn boolean_guesses_are_memoized_per_branch() {
    let b = Name::new(0, "b", Ty::Bool);
    let e = build::and(build::var(&b), build::not(build::var(&b)));
    assert!(!satisfiable(&e));
    let e = build::or(build::var(&b), build::not(build::var(&b)));
    assert!(provable(&e));
}

#[test]
fn comparison_implications() {
    let x = int_name(0, "x");
    let gt4 = build::bin(ziria_ir::BinOp::Gt, build::var(&x), build::int32(4));
    let gt0 = build::bin(ziria_ir::BinOp::Gt, build::var(&x), build::int32(0));
    let eq5 = build::eq(build::var(&x), build::int32(5));
    assert!(implies(&gt4, &gt0));
    assert!(!implies(&gt0, &gt4));
    assert!(implies(&eq5, &gt4));
    // x > 4 does not pin x to 5.
    assert!(!implies(&gt4, &eq5));
}

#[test]
fn branches_own_their_prints() {
    let x = int_name(0, "x");
    let e = build::if_(
        build::bin(ziria_ir::BinOp::Gt, build::var(&x), build::int32(0)),
        build::seq(build::println(build::string("pos")), build::int32(1)),
        build::seq(build::println(build::string("neg")), build::int32(0)),
    );
    let mut branches = approximate(&e);
    branches.sort_by_key(|(v, _)| v.as_int());
    let summary: Vec<(Option<i64>, String)> = branches
        .into_iter()
        .map(|(v, p)| (v.as_int(), p))
        .collect();
    assert_eq!(
        summary,
        vec![
            (Some(0), "\"neg\"\n".to_string()),
            (Some(1), "\"pos\"\n".to_string()),
        ]
    );
}

#[test]
fn scope_ends_when_the_binder_exits() {
    let x = int_name(0, "x");
    // The write happens after the let has exited.
    let e = build::seq(
        build::let_(x.clone(), build::int32(1), build::var(&x)),
        build::assign(build::var(&x), build::int32(2)),
    );
    let err = eval_partial(&e).unwrap_err();
    assert_eq!(
        err.error,
        EvalError::NotInScope {
            name: "x".to_string()
        }
    );
}

#[test]
fn struct_field_assignment_round_trips() {
    let s = Name::new(0, "s", complex_ty());
    let e = build::let_ref(
        s.clone(),
        build::struct_(
            "complex",
            vec![
                ("re".to_string(), build::int32(1)),
                ("im".to_string(), build::int32(2)),
            ],
        ),
        build::seq(
            build::assign(build::proj(build::var(&s), "im"), build::int32(9)),
            build::proj(build::var(&s), "im"),
        ),
    );
    assert_eq!(eval_int(&e).unwrap().0, 9);
}

#[test]
fn unknown_field_is_reported() {
    let e = build::proj(
        build::struct_("complex", vec![("re".to_string(), build::int32(1))]),
        "re",
    );
    assert_eq!(eval_int(&e).unwrap().0, 1);
    // Construct the bad projection by hand; the builder would panic.
    let base = build::struct_("complex", vec![("re".to_string(), build::int32(1))]);
    let bad = Exp::new(
        ziria_ir::ExpKind::Proj {
            base: Box::new(base),
            field: "xy".to_string(),
        },
        Ty::int32(),
        ziria_ir::Span::synthetic(),
    );
    let err = eval_full(&bad).unwrap_err();
    assert_eq!(
        err.error,
        EvalError::UnknownField {
            struct_name: "complex".to_string(),
            field: "xy".to_string()
        }
    );
}

// === Source-expression entry points ===

/// A stand-in for the real type checker: elaborates integer literals only.
struct LiteralChecker;

impl TypeChecker for LiteralChecker {
    type Source = String;

    fn elaborate(&mut self, src: &String, _gen: &mut UniqGen) -> Result<(Exp, Ty), String> {
        src.parse::<i64>()
            .map(|n| (build::int32(n), Ty::int32()))
            .map_err(|_| format!("not an integer literal: {src}"))
    }
}

#[test]
fn src_entry_points_go_through_the_checker() {
    let mut checker = LiteralChecker;
    assert_eq!(
        eval_src_int(&mut checker, &"21".to_string()).unwrap(),
        (21, String::new())
    );

    let err = eval_src_int(&mut checker, &"nope".to_string()).unwrap_err();
    assert_eq!(
        err.error,
        EvalError::TypeCheck("not an integer literal: nope".to_string())
    );

    // A well-typed integer is still not a boolean result.
    let err = eval_src_bool(&mut checker, &"1".to_string()).unwrap_err();
    assert!(matches!(
        err.error,
        EvalError::ResultShape {
            expected: "a boolean",
            ..
        }
    ));
}

#[test]
fn result_projections_have_distinct_shapes() {
    let err = eval_bool(&build::int32(1)).unwrap_err();
    assert!(matches!(
        err.error,
        EvalError::ResultShape {
            expected: "a boolean",
            ..
        }
    ));
    let err = eval_int(&build::bool_(true)).unwrap_err();
    assert!(matches!(
        err.error,
        EvalError::ResultShape {
            expected: "an integer",
            ..
        }
    ));
}
