// SPDX: CC0-1.0

use crate::{
    eval::{Fun, Ident, Idents},
    Number,
};
use core::f64::consts;
use std::collections::HashMap; // assumes Number = f64

/// The free variable. Resolved directly by `eval`, never present in the table.
pub const X: &str = "x";

/// The closed set of names a user expression can reach besides `x`. Nothing
/// else is resolvable: no I/O, no attribute access, no imports, no assignment.
/// The operator implementations below are deliberately not registered here.
pub fn sandbox() -> Idents {
    let mut ret = HashMap::new();

    ret.insert("sqrt".into(), Ident::Fun(Fun::new(1, sqrt)));
    ret.insert("floor".into(), Ident::Fun(Fun::new(1, floor)));
    ret.insert("ceil".into(), Ident::Fun(Fun::new(1, ceil)));
    ret.insert("log".into(), Ident::Fun(Fun::new(1, log)));
    ret.insert("sin".into(), Ident::Fun(Fun::new(1, sin)));
    ret.insert("cos".into(), Ident::Fun(Fun::new(1, cos)));

    ret.insert("pow".into(), Ident::Fun(Fun::new(2, exp)));
    ret.insert("abs".into(), Ident::Fun(Fun::new(1, abs)));
    ret.insert("min".into(), Ident::Fun(Fun::new(2, min)));
    ret.insert("max".into(), Ident::Fun(Fun::new(2, max)));

    ret.insert("pi".into(), Ident::Const(consts::PI));
    ret.insert("tau".into(), Ident::Const(consts::TAU));
    ret.insert("e".into(), Ident::Const(consts::E));
    ret.insert("inf".into(), Ident::Const(Number::INFINITY));
    ret.insert("nan".into(), Ident::Const(Number::NAN));

    ret
}

#[track_caller]
fn expect_n<const N: usize>(args: &mut [Number]) -> [Number; N] {
    assert_eq!(args.len(), N);
    args[..N].try_into().unwrap()
}

/// Folds overflow back to the not-a-number sentinel: an infinite result is
/// only kept when an operand already carried infinity.
fn guard_overflow(ret: Number, args: &[Number]) -> Number {
    if ret.is_infinite() && args.iter().all(|arg| arg.is_finite()) {
        Number::NAN
    } else {
        ret
    }
}

pub fn neg(mut args: Vec<Number>) -> Number {
    let [x] = expect_n::<1>(&mut args);
    -x
}

pub fn add(mut args: Vec<Number>) -> Number {
    let [x, y] = expect_n::<2>(&mut args);
    guard_overflow(x + y, &[x, y])
}

pub fn sub(mut args: Vec<Number>) -> Number {
    let [x, y] = expect_n::<2>(&mut args);
    guard_overflow(x - y, &[x, y])
}

pub fn mul(mut args: Vec<Number>) -> Number {
    let [x, y] = expect_n::<2>(&mut args);
    guard_overflow(x * y, &[x, y])
}

pub fn div(mut args: Vec<Number>) -> Number {
    let [x, y] = expect_n::<2>(&mut args);
    if y == 0.0 {
        Number::NAN
    } else {
        guard_overflow(x / y, &[x, y])
    }
}

pub fn exp(mut args: Vec<Number>) -> Number {
    let [x, exp] = expect_n::<2>(&mut args);
    guard_overflow(x.powf(exp), &[x, exp])
}

pub fn sqrt(mut args: Vec<Number>) -> Number {
    let [x] = expect_n::<1>(&mut args);
    if x < 0.0 {
        Number::NAN
    } else {
        x.sqrt()
    }
}

pub fn floor(mut args: Vec<Number>) -> Number {
    let [x] = expect_n::<1>(&mut args);
    x.floor()
}

pub fn ceil(mut args: Vec<Number>) -> Number {
    let [x] = expect_n::<1>(&mut args);
    x.ceil()
}

pub fn log(mut args: Vec<Number>) -> Number {
    let [x] = expect_n::<1>(&mut args);
    if x <= 0.0 {
        Number::NAN
    } else {
        x.ln()
    }
}

pub fn sin(mut args: Vec<Number>) -> Number {
    let [x] = expect_n::<1>(&mut args);
    x.sin()
}

pub fn cos(mut args: Vec<Number>) -> Number {
    let [x] = expect_n::<1>(&mut args);
    x.cos()
}

pub fn abs(mut args: Vec<Number>) -> Number {
    let [x] = expect_n::<1>(&mut args);
    x.abs()
}

pub fn min(mut args: Vec<Number>) -> Number {
    let [x, y] = expect_n::<2>(&mut args);
    x.min(y)
}

pub fn max(mut args: Vec<Number>) -> Number {
    let [x, y] = expect_n::<2>(&mut args);
    x.max(y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::IdentKey;

    #[test]
    fn table_is_closed() {
        let idents = sandbox();
        assert_eq!(idents.len(), 15);
        for name in [
            "sqrt", "floor", "ceil", "log", "sin", "cos", "pow", "abs", "min", "max", "pi", "tau",
            "e", "inf", "nan",
        ] {
            assert!(idents.contains_key(&IdentKey::from(name)), "{name} missing");
        }
        // the free variable is bound by eval, not by the table
        assert!(!idents.contains_key(&IdentKey::from(X)));
    }

    #[test]
    fn division_by_zero_is_nan() {
        assert!(div(vec![1.0, 0.0]).is_nan());
        assert!(div(vec![0.0, 0.0]).is_nan());
    }

    #[test]
    fn negative_sqrt_is_nan() {
        assert!(sqrt(vec![-1.0]).is_nan());
        assert_eq!(sqrt(vec![9.0]), 3.0);
    }

    #[test]
    fn non_positive_log_is_nan() {
        assert!(log(vec![0.0]).is_nan());
        assert!(log(vec![-2.0]).is_nan());
        assert!((log(vec![consts::E]) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn overflow_is_nan() {
        assert!(add(vec![Number::MAX, Number::MAX]).is_nan());
        assert!(exp(vec![1e200, 2.0]).is_nan());
        // infinity fed in on purpose stays infinity
        assert_eq!(add(vec![Number::INFINITY, 1.0]), Number::INFINITY);
    }
}
