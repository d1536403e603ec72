use std::fmt;

use thiserror::Error;

use crate::{
    token::Spanned,
    util::{
        fmt::{Context, Show},
        intern::Interner,
    },
};

/// The compilation stage a [`Diagnostic`] comes from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Lexical,
    Syntax,
    Semantic,
    Codegen,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Lexical => "lexical",
            ErrorKind::Syntax => "syntax",
            ErrorKind::Semantic => "semantic",
            ErrorKind::Codegen => "codegen",
        })
    }
}

/// The first error found while compiling a program.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("line {line}: {kind} error: {message}")]
pub struct Diagnostic {
    pub kind: ErrorKind,
    /// The 1-based source line the error was detected on.
    pub line: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, line: u32, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            kind,
            line,
            message: message.into(),
        }
    }

    /// Renders a stage error, using the interner to resolve the names it
    /// mentions.
    pub fn from_spanned<E>(
        kind: ErrorKind,
        error: &Spanned<E>,
        ident_interner: &Interner<str>,
    ) -> Diagnostic
    where
        Spanned<E>: Show,
    {
        let ctx = Context { ident_interner };
        let message = error.display(&ctx).to_string();
        Diagnostic::new(kind, error.span.line, message)
    }
}
