use std::fmt::{Formatter, Result};

use crate::{
    codegen, parser,
    token::{Spanned, TokenKind},
    util::fmt::{Context, Show},
};

impl Show for Spanned<parser::Error> {
    fn show(&self, f: &mut Formatter<'_>, ctx: &Context<'_>) -> Result {
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            write!(f, "line {}: ", span.line)?;
        }

        use parser::Error::*;
        match error {
            Lexer(TokenKind::ErrorUnexpectedChar) => write!(f, "unexpected character"),
            Lexer(TokenKind::ErrorUnclosedString) => write!(f, "unclosed string"),
            Lexer(kind) => write!(f, "invalid token {kind:?}"),
            IntegerOutOfRange => write!(f, "integer literal out of range"),
            Unexpected { actual, expected } => {
                write!(f, "expected token {expected:?}, but got {actual:?}")
            }
            UnexpectedTokenInExpr { token } => {
                write!(f, "unexpected token {token:?} in expression")
            }
            ExpectedType { actual } => write!(f, "expected a type, but got {actual:?}"),
            ChainedRelational { actual } => {
                write!(f, "relational operators can't be chained, found {actual:?}")
            }
            UndefinedName(name) => write!(f, "unknown identifier {}", ctx.name(*name)),
            NotAFunction(name) => write!(f, "{} is not a function", ctx.name(*name)),
            NotAVariable(name) => {
                write!(f, "{} is a function, not a variable", ctx.name(*name))
            }
            CannotCapture(name) => write!(
                f,
                "cannot capture variable {} from an enclosing function",
                ctx.name(*name)
            ),
            InvalidAssignmentTarget => write!(f, "invalid assignment target"),
            Mismatch { expected, actual } => {
                write!(f, "expected type {expected}, but got {actual}")
            }
            InvalidOperand(ty) => write!(f, "invalid operand of type {ty}"),
            NonIntegerCondition(ty) => {
                write!(f, "condition must be an integer, but got {ty}")
            }
            IncorrectNumberOfArguments {
                name,
                expected,
                actual,
            } => write!(
                f,
                "{} expects {expected} argument(s), but got {actual}",
                ctx.name(*name)
            ),
            IllegalNothingType => write!(f, "nothing is only allowed as a return type"),
            MissingReturn(name) => {
                write!(f, "missing return in function {}", ctx.name(*name))
            }
            ReturnInNothingFunction => {
                write!(f, "can't return a value from a nothing function")
            }
        }
    }
}

impl Show for Spanned<codegen::Error> {
    fn show(&self, f: &mut Formatter<'_>, ctx: &Context<'_>) -> Result {
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            write!(f, "line {}: ", span.line)?;
        }

        match error {
            codegen::Error::MissingSlot(name) => {
                write!(f, "no stack slot for variable {}", ctx.name(*name))
            }
            codegen::Error::MissingFunction(name) => {
                write!(f, "function {} has not been generated", ctx.name(*name))
            }
        }
    }
}
