use std::{fmt, ops::Range};

#[derive(Copy, Clone)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct Token {
    pub kind: TokenKind,
    lo: usize,
    len: u32,
    line: u32,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Token {
        Token {
            kind,
            lo: span.lo,
            len: span.len,
            line: span.line,
        }
    }

    pub fn span(&self) -> Span {
        Span {
            lo: self.lo,
            len: self.len,
            line: self.line,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?}, {}, line {})", self.kind, self.span(), self.line)
    }
}

/// A byte range into the source, tagged with the 1-based line it starts on.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Span {
    pub lo: usize,
    pub len: u32,
    pub line: u32,
}

impl Span {
    pub fn new_of_bounds(Range { start: lo, end: hi }: Range<usize>, line: u32) -> Span {
        debug_assert!(hi >= lo);
        Self::new_of_length(lo, u32::try_from(hi - lo).unwrap(), line)
    }

    pub fn new_of_length(lo: usize, len: u32, line: u32) -> Span {
        Span { lo, len, line }
    }

    pub fn hi(&self) -> usize {
        self.lo + self.len as usize
    }

    /// Returns a span that starts at `self` and ends at `other`. The line is
    /// always the starting one.
    pub fn to(self, other: Span) -> Span {
        Span::new_of_bounds(self.lo..other.hi().max(self.lo), self.line)
    }

    /// Shrinks (or grows) both ends of the span.
    pub fn offset(self, lo: isize, hi: isize) -> Span {
        let new_lo = self.lo.saturating_add_signed(lo);
        let new_hi = self.hi().saturating_add_signed(hi).max(new_lo);
        Span::new_of_bounds(new_lo..new_hi, self.line)
    }

    pub fn substr(self, src: &str) -> &str {
        &src[self.lo..self.hi()]
    }

    pub fn wrap<T>(self, inner: T) -> Spanned<T> {
        Spanned { span: self, inner }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({self}, line {})", self.line)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lo = self.lo;
        let hi = self.hi();
        write!(f, "{lo}..{hi}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub inner: T,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    If,
    Do,
    Alive,
    By,
    War,
    Tren,
    Return,

    True,
    False,

    IntType,
    BoolType,
    StrType,
    ArrayType,
    /// The `nothing` return type.
    NothingType,

    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Colon,
    Semicolon,
    Comma,

    Plus,
    Minus,
    Star,
    Slash,
    /// `=`
    Assign,
    /// `==`
    Eq,
    /// `!`, reserved.
    Not,
    /// `!=`
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,

    Identifier,
    Number,
    String,

    Eof,

    ErrorUnclosedString,
    ErrorUnexpectedChar,
}

impl TokenKind {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            TokenKind::ErrorUnclosedString | TokenKind::ErrorUnexpectedChar
        )
    }
}

pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "if" => TokenKind::If,
    "do" => TokenKind::Do,
    "alive" => TokenKind::Alive,
    "by" => TokenKind::By,
    "war" => TokenKind::War,
    "tren" => TokenKind::Tren,
    "return" => TokenKind::Return,
    "true" => TokenKind::True,
    "false" => TokenKind::False,
    "int" => TokenKind::IntType,
    "bool" => TokenKind::BoolType,
    "str" => TokenKind::StrType,
    "array" => TokenKind::ArrayType,
    "nothing" => TokenKind::NothingType,
};
