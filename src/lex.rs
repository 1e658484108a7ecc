// SPDX: CC0-1.0

use crate::eval::OperatorTyp;
use core::{fmt, iter::Peekable, str::CharIndices};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubStr {
    // yes, silly, but atomic operations are cheap for this use case
    src: Arc<String>,
    start: usize,
    len: usize,
}

impl SubStr {
    #[inline]
    pub const fn new(src: Arc<String>, start: usize, len: usize) -> Self {
        Self { src, start, len }
    }

    #[inline]
    pub fn all(src: Arc<String>) -> Self {
        let len = src.len();
        Self::new(src, 0, len)
    }

    pub fn src(&self) -> Arc<String> {
        Arc::clone(&self.src)
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self) -> &str {
        &self.src[self.start..self.start + self.len]
    }

    pub fn shift_right(&mut self, by: usize) {
        self.len += by;
    }
}

impl fmt::Display for SubStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokTyp {
    Ident,
    Number,
    Op(OperatorTyp),
    Comma,
    OpenParen,
    CloseParen,

    // unsupported tokens
    XGreater,
    XLess,
    XEqual,
    XPipe,
    XOpenSquareBracket,
    XCloseSquareBracket,
    XOpenCurly,
    XCloseCurly,
}

impl TokTyp {
    pub const fn is_unsupported(&self) -> bool {
        match self {
            Self::Ident
            | Self::Number
            | Self::Op(_)
            | Self::Comma
            | Self::OpenParen
            | Self::CloseParen => false,

            // unsupported tokens
            Self::XGreater
            | Self::XLess
            | Self::XEqual
            | Self::XPipe
            | Self::XOpenSquareBracket
            | Self::XCloseSquareBracket
            | Self::XOpenCurly
            | Self::XCloseCurly => true,
        }
    }

    /// A token that can end a value, which makes a following `-` a
    /// subtraction rather than a negation.
    const fn ends_value(&self) -> bool {
        matches!(self, Self::Number | Self::Ident | Self::CloseParen)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tok {
    pub typ: TokTyp,
    pub loc: SubStr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LexErrTyp {
    InvalidChar,
    Unsupported(TokTyp),
}

impl fmt::Display for LexErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChar => write!(f, "invalid character"),
            Self::Unsupported(_) => write!(f, "unsupported character"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LexErr {
    pub typ: LexErrTyp,
    pub loc: SubStr,
}

#[derive(Debug)]
pub struct Lexer<'src> {
    src: &'src Arc<String>, // contains only ascii characters
    cur: Peekable<CharIndices<'src>>,
    prev: Option<TokTyp>,
    has_errored: bool, // tells iter to yield None after error
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src Arc<String>) -> Self {
        Self {
            src,
            cur: src.char_indices().peekable(),
            prev: None,
            has_errored: false,
        }
    }

    fn trim_whitespace(&mut self) {
        while let Some((_, chr)) = self.cur.peek() {
            if chr.is_ascii_whitespace() {
                self.cur.next();
            } else {
                break;
            }
        }
    }

    fn consume_unambiguous(&mut self) -> Option<Tok> {
        let (idx, chr) = self.cur.peek().copied()?;
        let typ = match chr {
            '+' => TokTyp::Op(OperatorTyp::Add),
            '*' => TokTyp::Op(OperatorTyp::Mul),
            '/' => TokTyp::Op(OperatorTyp::Div),
            '^' => TokTyp::Op(OperatorTyp::Exp),
            ',' => TokTyp::Comma,
            '(' => TokTyp::OpenParen,
            ')' => TokTyp::CloseParen,

            '>' => TokTyp::XGreater,
            '<' => TokTyp::XLess,
            '=' => TokTyp::XEqual,
            '|' => TokTyp::XPipe,
            '[' => TokTyp::XOpenSquareBracket,
            ']' => TokTyp::XCloseSquareBracket,
            '{' => TokTyp::XOpenCurly,
            '}' => TokTyp::XCloseCurly,
            _ => return None,
        };
        self.cur.next().unwrap(); // consume because we only peeked
        Some(Tok {
            typ,
            // @unicode
            loc: SubStr::new(Arc::clone(self.src), idx, 1),
        })
    }

    fn consume_by<P>(&mut self, next_idx: usize, typ: TokTyp, predicate: P) -> Option<Tok>
    where
        P: Fn(char) -> bool,
    {
        let mut tok = Tok {
            typ,
            // @unicode
            loc: SubStr::new(Arc::clone(self.src), next_idx, 0),
        };
        while let Some((_, chr)) = self.cur.peek().copied() {
            if predicate(chr) {
                // @unicode
                tok.loc.shift_right(1);
                self.cur.next().unwrap();
            } else {
                break;
            }
        }
        if tok.loc.is_empty() {
            // there is no next token of type `typ`
            None
        } else {
            Some(tok)
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Tok, LexErr>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_errored {
            return None;
        }

        self.trim_whitespace();

        let (next_idx, next_chr) = self.cur.peek().copied()?;
        let tok = if let Some(tok) = self.consume_unambiguous() {
            tok
        } else if next_chr == '-' {
            // distinguish subtraction from negation by what came before
            self.cur.next().unwrap();
            let typ = if self.prev.map(|typ| typ.ends_value()).unwrap_or(false) {
                TokTyp::Op(OperatorTyp::Sub)
            } else {
                TokTyp::Op(OperatorTyp::Neg)
            };
            Tok {
                typ,
                // @unicode
                loc: SubStr::new(Arc::clone(self.src), next_idx, 1),
            }
        } else if let Some(tok) =
            // parse identifiers
            self.consume_by(next_idx, TokTyp::Ident, |chr| chr.is_ascii_alphabetic())
        {
            tok
        } else if let Some(tok) = self.consume_by(next_idx, TokTyp::Number, |chr| {
            chr.is_ascii_digit() || chr == '.'
        }) {
            // parse numbers
            tok
        } else {
            self.has_errored = true;
            return Some(Err(LexErr {
                typ: LexErrTyp::InvalidChar,
                // @unicode
                loc: SubStr::new(Arc::clone(self.src), next_idx, 1),
            }));
        };

        if tok.typ.is_unsupported() {
            self.has_errored = true;
            return Some(Err(LexErr {
                typ: LexErrTyp::Unsupported(tok.typ),
                // @unicode
                loc: SubStr::new(Arc::clone(self.src), next_idx, 1),
            }));
        }
        self.prev = Some(tok.typ);
        Some(Ok(tok))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Result<TokTyp, LexErrTyp>> {
        let src = Arc::new(String::from(src));
        Lexer::new(&src)
            .map(|tok| tok.map(|tok| tok.typ).map_err(|err| err.typ))
            .collect()
    }

    #[test]
    fn minus_after_value_is_subtraction() {
        use OperatorTyp::{Neg, Sub};
        assert_eq!(
            lex("x-1"),
            [
                Ok(TokTyp::Ident),
                Ok(TokTyp::Op(Sub)),
                Ok(TokTyp::Number)
            ]
        );
        assert_eq!(lex("-x"), [Ok(TokTyp::Op(Neg)), Ok(TokTyp::Ident)]);
        assert_eq!(
            lex("(x)-1"),
            [
                Ok(TokTyp::OpenParen),
                Ok(TokTyp::Ident),
                Ok(TokTyp::CloseParen),
                Ok(TokTyp::Op(Sub)),
                Ok(TokTyp::Number)
            ]
        );
        assert_eq!(
            lex("2*-x"),
            [
                Ok(TokTyp::Number),
                Ok(TokTyp::Op(OperatorTyp::Mul)),
                Ok(TokTyp::Op(Neg)),
                Ok(TokTyp::Ident)
            ]
        );
    }

    #[test]
    fn spans_cover_multichar_tokens() {
        let src = Arc::new(String::from("sqrt(12.5)"));
        let toks: Vec<_> = Lexer::new(&src).map(Result::unwrap).collect();
        assert_eq!(toks[0].loc.get(), "sqrt");
        assert_eq!(toks[2].loc.get(), "12.5");
    }

    #[test]
    fn unsupported_symbols_are_rejected() {
        assert_eq!(
            lex("x = 1").last().unwrap(),
            &Err(LexErrTyp::Unsupported(TokTyp::XEqual))
        );
        assert_eq!(
            lex("x & 1").last().unwrap(),
            &Err(LexErrTyp::InvalidChar)
        );
    }

    #[test]
    fn lexing_stops_after_an_error() {
        let toks = lex("# + 1");
        assert_eq!(toks, [Err(LexErrTyp::InvalidChar)]);
    }
}
