// SPDX: CC0-1.0

use curve_plot::{
    curve::{CurveSet, Outcome},
    eval, namespace, parse, Number, XRange,
};
use proptest::prelude::*;
use std::sync::Arc;

/// Compiles `expr` and evaluates it at `x` against the sandboxed namespace,
/// flattening both fault levels into a printable error.
fn call(expr: &str, x: Number) -> Result<Number, String> {
    let src = Arc::new(String::from(expr));
    let idents = namespace::sandbox();
    let prog = parse::compile(&src, &idents).map_err(|err| err.typ.to_string())?;
    let mut stack = Vec::new();
    eval::eval(&prog, &idents, x, &mut stack).map_err(|err| err.to_string())
}

fn eval_ok(expr: &str, x: Number) -> Number {
    call(expr, x).unwrap_or_else(|err| panic!("'{expr}' at x={x}: {err}"))
}

#[test]
fn power_and_trig_values() {
    assert_eq!(eval_ok("x^2", 3.0), 9.0);
    assert_eq!(eval_ok("pow(2, 10)", 0.0), 1024.0);
    assert_eq!(eval_ok("sin(x)", 0.0), 0.0);
    assert_eq!(eval_ok("cos(x)", 0.0), 1.0);
    assert!((eval_ok("sin(x) + x^2", 3.0) - (3.0f64.sin() + 9.0)).abs() < 1e-12);
}

#[test]
fn unary_minus_and_helpers() {
    assert_eq!(eval_ok("-x", 3.0), -3.0);
    assert_eq!(eval_ok("2*-3", 0.0), -6.0);
    assert_eq!(eval_ok("abs(-x)", 3.0), 3.0);
    assert_eq!(eval_ok("min(x, 0)", -5.0), -5.0);
    assert_eq!(eval_ok("max(2, 3)", 0.0), 3.0);
    assert_eq!(eval_ok("floor(x)", 2.7), 2.0);
    assert_eq!(eval_ok("ceil(x)", 2.1), 3.0);
}

#[test]
fn constants_resolve() {
    assert!((eval_ok("pi", 0.0) - core::f64::consts::PI).abs() < 1e-15);
    assert_eq!(eval_ok("tau", 0.0), 2.0 * core::f64::consts::PI);
    assert!(eval_ok("inf", 0.0).is_infinite());
    assert!(eval_ok("nan", 0.0).is_nan());
}

#[test]
fn arithmetic_faults_are_nan_sentinels() {
    assert!(eval_ok("1/x", 0.0).is_nan());
    assert!(eval_ok("sqrt(x)", -1.0).is_nan());
    assert!(eval_ok("log(x)", 0.0).is_nan());
    assert!(eval_ok("log(x)", -3.0).is_nan());
    // overflow of finite operands
    assert!(eval_ok("pow(10, x)", 1000.0).is_nan());
    assert!(eval_ok("x*x", Number::MAX).is_nan());
}

#[test]
fn names_outside_the_table_never_execute() {
    let err = call("open(x)", 1.0).unwrap_err();
    assert!(err.contains("undefined identifier 'open'"), "{err}");

    // not even lexable, let alone resolvable
    assert!(call("__import__(x)", 1.0).is_err());
    assert!(call("x.sqrt", 1.0).is_err());
}

#[test]
fn nested_calls() {
    assert!((eval_ok("sin(cos(x))", 0.0) - 1.0f64.sin()).abs() < 1e-15);
    assert_eq!(eval_ok("sqrt(sqrt(x))", 16.0), 2.0);
}

#[test]
fn a_gap_does_not_end_the_curve() {
    let idents = namespace::sandbox();
    let mut curves = CurveSet::new();
    curves.push(String::from("sqrt(x)"));
    let range = XRange::new(-2.0, 2.0, 4);

    let results = curve_plot::curve::evaluate_all(&curves, &idents, &range);
    match &results[0].outcome {
        Outcome::Samples(points) => {
            let ys: Vec<Number> = points.iter().map(|p| p.y).collect();
            assert_eq!(ys.len(), 5);
            assert!(ys[0].is_nan() && ys[1].is_nan());
            assert_eq!(ys[2], 0.0);
            assert_eq!(ys[3], 1.0);
            assert!((ys[4] - 2.0f64.sqrt()).abs() < 1e-15);
        }
        other => panic!("expected samples, got {other:?}"),
    }
}

proptest! {
    #[test]
    fn in_grammar_expressions_never_raise(x in -1.0e6..1.0e6f64) {
        for expr in [
            "1/x",
            "sqrt(x)",
            "log(x)",
            "x^2",
            "sin(x) + cos(x)",
            "pow(x, 2) - min(x, 0)",
            "(x+1)/(x-1)",
            "abs(x)^0.5",
        ] {
            let y = eval_ok(expr, x);
            prop_assert!(y.is_finite() || y.is_nan(), "'{expr}' at x={x} gave {y}");
        }
    }
}
