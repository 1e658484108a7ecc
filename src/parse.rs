// SPDX: CC0-1.0

// implementation of shunting yard algorithm by dijkstra (see https://en.wikipedia.org/wiki/Shunting_yard_algorithm)

use crate::{
    eval::{Associativity, Ident, Idents, Operation, OperationTyp, OperatorTyp, Program},
    lex::{LexErr, LexErrTyp, Lexer, SubStr, TokTyp},
    Number,
};
use core::{fmt, num::ParseFloatError};
use std::sync::Arc;

#[derive(Debug)]
pub enum ParseErrTyp {
    LexErr(LexErrTyp),
    ParseNum(ParseFloatError),
    ParenMismatch,
}

impl fmt::Display for ParseErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LexErr(err) => write!(f, "{err}"),
            Self::ParseNum(err) => write!(f, "invalid number: {err}"),
            Self::ParenMismatch => write!(f, "mismatched parentheses"),
        }
    }
}

#[derive(Debug)]
pub struct ParseErr {
    pub typ: ParseErrTyp,
    pub loc: SubStr,
}

impl From<LexErr> for ParseErr {
    fn from(err: LexErr) -> Self {
        Self {
            typ: ParseErrTyp::LexErr(err.typ),
            loc: err.loc,
        }
    }
}

/// Compiles an expression into an evaluatable program. Undefined names are not
/// rejected here: they flow through to evaluation so the fault carries the
/// identifier's span.
pub fn compile(src: &Arc<String>, idents: &Idents) -> Result<Program, ParseErr> {
    parse(Lexer::new(src), idents)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ShuntOpTyp {
    Operator(OperatorTyp),
    Ident,
    OpenParen,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ShuntOp {
    typ: ShuntOpTyp,
    loc: SubStr,
}

impl ShuntOp {
    pub fn precedence(&self) -> i8 {
        match self.typ {
            ShuntOpTyp::Operator(op) => op.precedence(),
            // function application binds tighter than any operator
            ShuntOpTyp::Ident => i8::MAX,
            ShuntOpTyp::OpenParen => unreachable!("open paren is never compared"),
        }
    }

    pub fn into_output(self) -> Operation {
        let typ = match self.typ {
            ShuntOpTyp::Operator(typ) => OperationTyp::Operator(typ),
            ShuntOpTyp::Ident => OperationTyp::Ident,
            ShuntOpTyp::OpenParen => {
                unreachable!("no parentheses in the output stack")
            }
        };
        Operation { typ, loc: self.loc }
    }
}

pub fn parse(lex: Lexer<'_>, idents: &Idents) -> Result<Program, ParseErr> {
    let mut out: Vec<Operation> = Vec::new(); // output
    let mut ops: Vec<ShuntOp> = Vec::new(); // operator stack

    for tok in lex {
        let tok = tok?;
        match tok.typ {
            TokTyp::Number => {
                let num: Number = match tok.loc.get().parse() {
                    Ok(val) => val,
                    Err(err) => {
                        return Err(ParseErr {
                            typ: ParseErrTyp::ParseNum(err),
                            loc: tok.loc,
                        })?
                    }
                };
                out.push(Operation {
                    typ: OperationTyp::Val(num),
                    loc: tok.loc,
                });
            }

            TokTyp::Ident => {
                let as_val = Operation {
                    typ: OperationTyp::Ident,
                    loc: tok.loc.clone(),
                };
                let as_op = ShuntOp {
                    typ: ShuntOpTyp::Ident,
                    loc: tok.loc.clone(),
                };
                match idents.get(&tok.loc.into()) {
                    Some(Ident::Fun(_)) => ops.push(as_op),
                    // constants, the free variable, and anything undefined
                    // (caught at evaluation) read as values
                    Some(Ident::Const(_)) | None => out.push(as_val),
                }
            }

            TokTyp::Op(o1) => {
                while let Some(o2) = ops.last().cloned() {
                    if (o2.typ != ShuntOpTyp::OpenParen)
                        && ((o2.precedence() > o1.precedence())
                            || ((o1.precedence() == o2.precedence())
                                && (o1.associativity() == Associativity::Left)))
                    {
                        ops.pop().unwrap();
                        out.push(o2.into_output());
                    } else {
                        break;
                    }
                }
                ops.push(ShuntOp {
                    typ: ShuntOpTyp::Operator(o1),
                    loc: tok.loc,
                });
            }

            TokTyp::Comma => {
                while let Some(op) = ops.last() {
                    if op.typ != ShuntOpTyp::OpenParen {
                        let op = ops.pop().unwrap();
                        out.push(op.into_output());
                    } else {
                        break;
                    }
                }
            }

            TokTyp::OpenParen => {
                ops.push(ShuntOp {
                    typ: ShuntOpTyp::OpenParen,
                    loc: tok.loc,
                });
            }

            TokTyp::CloseParen => {
                while let Some(op) = ops.last() {
                    if op.typ != ShuntOpTyp::OpenParen {
                        let op = ops.pop().unwrap();
                        out.push(op.into_output());
                    } else {
                        break;
                    }
                }

                if let Some(op) = ops.pop() {
                    if op.typ != ShuntOpTyp::OpenParen {
                        return Err(ParseErr {
                            typ: ParseErrTyp::ParenMismatch,
                            loc: op.loc,
                        });
                    }
                } else {
                    return Err(ParseErr {
                        typ: ParseErrTyp::ParenMismatch,
                        loc: tok.loc,
                    });
                }

                // handle functions
                if let Some(op) = ops.last() {
                    if let ShuntOpTyp::Ident = op.typ {
                        if let Some(Ident::Fun(_)) = idents.get(&op.loc.clone().into()) {
                            let op = ops.pop().unwrap();
                            out.push(op.into_output());
                        }
                    }
                }
            }

            TokTyp::XGreater
            | TokTyp::XLess
            | TokTyp::XEqual
            | TokTyp::XPipe
            | TokTyp::XOpenSquareBracket
            | TokTyp::XCloseSquareBracket
            | TokTyp::XOpenCurly
            | TokTyp::XCloseCurly => unreachable!("unsupported token survived until parsing"),
        }
    }

    while let Some(op) = ops.pop() {
        if let ShuntOpTyp::OpenParen = op.typ {
            return Err(ParseErr {
                typ: ParseErrTyp::ParenMismatch,
                loc: op.loc,
            });
        }
        out.push(op.into_output());
    }

    Ok(Program::new(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace;

    fn dump(src: &str) -> Result<Vec<String>, ParseErrTyp> {
        let src = Arc::new(String::from(src));
        let idents = namespace::sandbox();
        compile(&src, &idents)
            .map(|prog| prog.ops().map(|op| op.to_string()).collect())
            .map_err(|err| err.typ)
    }

    #[test]
    fn precedence_orders_output() {
        assert_eq!(
            dump("1+2*3").unwrap(),
            ["push 1", "push 2", "push 3", "call 'mul'", "call 'add'"]
        );
    }

    #[test]
    fn exponent_is_right_associative() {
        assert_eq!(
            dump("2^3^2").unwrap(),
            ["push 2", "push 3", "push 2", "call 'exp'", "call 'exp'"]
        );
    }

    #[test]
    fn function_binds_tighter_than_operators() {
        assert_eq!(
            dump("sin(x)^2").unwrap(),
            ["call 'x'", "call 'sin'", "push 2", "call 'exp'"]
        );
    }

    #[test]
    fn mismatched_parens_are_rejected() {
        assert!(matches!(dump("(x"), Err(ParseErrTyp::ParenMismatch)));
        assert!(matches!(dump("x)"), Err(ParseErrTyp::ParenMismatch)));
    }

    #[test]
    fn bad_number_literal_is_rejected() {
        assert!(matches!(dump("1.2.3"), Err(ParseErrTyp::ParseNum(_))));
    }

    #[test]
    fn unknown_names_parse_and_fail_later() {
        // resolution happens at evaluation so the fault can name the span
        assert_eq!(dump("nosuch").unwrap(), ["call 'nosuch'"]);
    }
}
