// SPDX: CC0-1.0

use crate::{
    eval::{self, EvalErr, Idents},
    parse::{self, ParseErr},
    sample, NoStepErr, Number, Point, XRange,
};
use core::fmt;
use std::sync::Arc;

/// Display name of the curve at position `nth`. Names are a projection of
/// position, never stored, so renumbering after insertion or removal is
/// automatic.
pub fn name(nth: usize) -> String {
    format!("f{}(x)", nth + 1)
}

/// Ordered collection of expression slots.
#[derive(Debug, Default)]
pub struct CurveSet {
    exprs: Vec<Arc<String>>,
}

impl CurveSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    pub fn push(&mut self, expr: String) {
        self.exprs.push(Arc::new(expr));
    }

    pub fn set(&mut self, nth: usize, expr: String) -> bool {
        match self.exprs.get_mut(nth) {
            Some(slot) => {
                *slot = Arc::new(expr);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, nth: usize) -> Option<Arc<String>> {
        if nth < self.exprs.len() {
            Some(self.exprs.remove(nth))
        } else {
            None
        }
    }

    pub fn get(&self, nth: usize) -> Option<&Arc<String>> {
        self.exprs.get(nth)
    }

    pub fn clear(&mut self) {
        self.exprs.clear();
    }

    /// Curves in display order, paired with their derived names.
    pub fn iter(&self) -> impl Iterator<Item = (String, &Arc<String>)> + '_ {
        self.exprs.iter().enumerate().map(|(nth, expr)| (name(nth), expr))
    }
}

#[derive(Debug)]
pub enum CurveErrTyp {
    Parse(ParseErr),
    Eval(EvalErr),
    NoStep(NoStepErr),
}

impl fmt::Display for CurveErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "{}", err.typ),
            Self::Eval(err) => write!(f, "{err}"),
            Self::NoStep(err) => write!(f, "{err}"),
        }
    }
}

#[derive(Debug)]
pub struct CurveErr {
    pub curve: String,
    pub typ: CurveErrTyp,
}

impl fmt::Display for CurveErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "in {}: {}", self.curve, self.typ)
    }
}

#[derive(Debug)]
pub enum Outcome {
    Samples(Vec<Point<Number>>),
    Skipped, // empty expression slot
    Fault(CurveErr),
}

#[derive(Debug)]
pub struct Evaluated {
    pub name: String,
    pub expr: Arc<String>,
    pub outcome: Outcome,
}

/// Evaluates every curve over `range`. A fault in one curve never interrupts
/// its siblings; the faulty curve simply reports itself by name.
pub fn evaluate_all(curves: &CurveSet, idents: &Idents, range: &XRange) -> Vec<Evaluated> {
    let mut stack: Vec<Number> = Vec::new();
    curves
        .iter()
        .map(|(name, expr)| {
            let outcome = match evaluate_one(expr, idents, range, &mut stack) {
                Ok(outcome) => outcome,
                Err(typ) => Outcome::Fault(CurveErr {
                    curve: name.clone(),
                    typ,
                }),
            };
            Evaluated {
                name,
                expr: Arc::clone(expr),
                outcome,
            }
        })
        .collect()
}

fn evaluate_one(
    expr: &Arc<String>,
    idents: &Idents,
    range: &XRange,
    stack: &mut Vec<Number>,
) -> Result<Outcome, CurveErrTyp> {
    if expr.trim().is_empty() {
        return Ok(Outcome::Skipped);
    }
    let prog = parse::compile(expr, idents).map_err(CurveErrTyp::Parse)?;
    let xs = range.xs().map_err(CurveErrTyp::NoStep)?;
    let points = sample(|x| eval::eval(&prog, idents, x, stack), xs).map_err(CurveErrTyp::Eval)?;
    Ok(Outcome::Samples(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace;

    #[test]
    fn names_follow_position() {
        let mut curves = CurveSet::new();
        curves.push(String::from("x"));
        curves.push(String::from("x^2"));
        curves.push(String::from("x^3"));
        curves.remove(0);
        let names: Vec<_> = curves.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["f1(x)", "f2(x)"]);
        assert_eq!(curves.get(0).unwrap().as_str(), "x^2");
    }

    #[test]
    fn faulty_curve_does_not_stop_siblings() {
        let idents = namespace::sandbox();
        let range = XRange::new(0.0, 2.0, 2);
        let mut curves = CurveSet::new();
        curves.push(String::from("nosuch(x)"));
        curves.push(String::from("x+1"));

        let results = evaluate_all(&curves, &idents, &range);
        assert!(matches!(&results[0].outcome, Outcome::Fault(err) if err.curve == "f1(x)"));
        match &results[1].outcome {
            Outcome::Samples(points) => {
                assert_eq!(points.len(), 3);
                assert_eq!(points[2], Point { x: 2.0, y: 3.0 });
            }
            other => panic!("expected samples, got {other:?}"),
        }
    }

    #[test]
    fn empty_slot_is_skipped() {
        let idents = namespace::sandbox();
        let range = XRange::default();
        let mut curves = CurveSet::new();
        curves.push(String::new());
        let results = evaluate_all(&curves, &idents, &range);
        assert!(matches!(results[0].outcome, Outcome::Skipped));
    }

    #[test]
    fn sentinel_sample_is_a_gap_not_a_fault() {
        let idents = namespace::sandbox();
        let range = XRange::new(-1.0, 1.0, 2);
        let mut curves = CurveSet::new();
        curves.push(String::from("1/x"));
        let results = evaluate_all(&curves, &idents, &range);
        match &results[0].outcome {
            Outcome::Samples(points) => {
                assert_eq!(points.len(), 3);
                assert_eq!(points[0].y, -1.0);
                assert!(points[1].y.is_nan());
                assert_eq!(points[2].y, 1.0);
            }
            other => panic!("expected samples, got {other:?}"),
        }
    }

    #[test]
    fn zero_step_faults_the_curve() {
        let idents = namespace::sandbox();
        let range = XRange::new(3.0, 3.0, 10);
        let mut curves = CurveSet::new();
        curves.push(String::from("x"));
        let results = evaluate_all(&curves, &idents, &range);
        match &results[0].outcome {
            Outcome::Fault(err) => assert!(matches!(err.typ, CurveErrTyp::NoStep(_))),
            other => panic!("expected fault, got {other:?}"),
        }
    }
}
