// SPDX: CC0-1.0

use crate::{curve::CurveSet, XRange};
use core::{fmt, num::ParseFloatError};
use std::io::{self, Write};

pub const KEY_START: &str = "start";
pub const KEY_END: &str = "end";
pub const KEY_POINTS: &str = "n_points";

#[derive(Debug)]
pub enum FileErrTyp {
    MissingEquals,
    BadNumber(ParseFloatError),
}

impl fmt::Display for FileErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEquals => write!(f, "missing '='"),
            Self::BadNumber(err) => write!(f, "invalid number: {err}"),
        }
    }
}

#[derive(Debug)]
pub struct FileErr {
    pub line_no: usize, // 1-based
    pub line: String,
    pub typ: FileErrTyp,
}

impl fmt::Display for FileErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line_no, self.typ)
    }
}

#[derive(Debug)]
pub struct Loaded {
    pub curves: CurveSet,
    pub range: XRange,
}

/// Writes curves (one `name=expression` line each, in display order) followed
/// by the range settings.
pub fn write<W: Write>(mut out: W, curves: &CurveSet, range: &XRange) -> io::Result<()> {
    for (name, expr) in curves.iter() {
        writeln!(out, "{name}={expr}")?;
    }
    writeln!(out, "{KEY_START}={}", range.start)?;
    writeln!(out, "{KEY_END}={}", range.end)?;
    writeln!(out, "{KEY_POINTS}={}", range.n_points())?;
    Ok(())
}

/// Parses a saved document. Any malformed line aborts the whole load and is
/// reported with its content; nothing parsed so far leaks out on failure.
/// Line order does not matter: range keys are recognized anywhere, every
/// other line is a curve in order of appearance (stored names are ignored,
/// display names are regenerated from position).
pub fn parse(text: &str) -> Result<Loaded, FileErr> {
    let mut curves = CurveSet::new();
    let mut range = XRange::default();

    for (idx, line) in text.lines().enumerate() {
        let fail = |typ| FileErr {
            line_no: idx + 1,
            line: line.to_string(),
            typ,
        };
        let (key, value) = line.split_once('=').ok_or_else(|| fail(FileErrTyp::MissingEquals))?;
        let (key, value) = (key.trim(), value.trim());
        match key {
            KEY_START => range.start = value.parse().map_err(|err| fail(FileErrTyp::BadNumber(err)))?,
            KEY_END => range.end = value.parse().map_err(|err| fail(FileErrTyp::BadNumber(err)))?,
            KEY_POINTS => {
                let n: f64 = value.parse().map_err(|err| fail(FileErrTyp::BadNumber(err)))?;
                range.set_n_points(n as u32);
            }
            _ => curves.push(value.to_string()),
        }
    }

    Ok(Loaded { curves, range })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let mut curves = CurveSet::new();
        curves.push(String::from("sin(x)"));
        curves.push(String::from("x^2"));
        let range = XRange::new(0.0, 10.0, 5);

        let mut buf = Vec::new();
        write(&mut buf, &curves, &range).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "f1(x)=sin(x)\nf2(x)=x^2\nstart=0\nend=10\nn_points=5\n"
        );

        let loaded = parse(&text).unwrap();
        let exprs: Vec<_> = loaded.curves.iter().map(|(_, e)| e.to_string()).collect();
        assert_eq!(exprs, ["sin(x)", "x^2"]);
        assert_eq!(loaded.range, range);
    }

    #[test]
    fn line_order_does_not_matter() {
        let loaded = parse("start=1\nf1(x)=x\nend=2\nf2(x)=x+1\nn_points=4\n").unwrap();
        assert_eq!(loaded.curves.len(), 2);
        assert_eq!(loaded.range, XRange::new(1.0, 2.0, 4));
    }

    #[test]
    fn missing_equals_aborts_the_load() {
        let err = parse("f1(x)=x\nbogus line\nstart=0\n").unwrap_err();
        assert_eq!(err.line_no, 2);
        assert_eq!(err.line, "bogus line");
        assert!(matches!(err.typ, FileErrTyp::MissingEquals));
    }

    #[test]
    fn bad_range_number_aborts_the_load() {
        let err = parse("start=zero\n").unwrap_err();
        assert!(matches!(err.typ, FileErrTyp::BadNumber(_)));
        assert_eq!(err.line, "start=zero");
    }

    #[test]
    fn zero_points_in_file_coerced_to_one() {
        let loaded = parse("n_points=0\n").unwrap();
        assert_eq!(loaded.range.n_points().get(), 1);
    }
}
