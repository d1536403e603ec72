use std::{iter::Peekable, num::ParseIntError, str::Chars};

use tracing::trace;

use crate::token::{Span, Token, TokenKind, KEYWORDS};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 1_024;

/// A convenience function that lexes the whole input into a new buffer. The
/// last token is always [`TokenKind::Eof`].
pub fn lex_in_new(src: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY);
    tokens.extend(Lexer::new(src));
    tokens
}

/// The war lexer.
///
/// Tokens are pulled one at a time through [`Lexer::next_token`]. Once the
/// input is exhausted every further call yields [`TokenKind::Eof`]; the
/// [`Iterator`] implementation stops right after the first one.
///
/// The lexer never fails. Malformed input is reported through error tokens
/// (see [`TokenKind::is_error`]), which the parser turns into diagnostics.
pub struct Lexer<'src> {
    src: &'src str,
    iter: Peekable<Chars<'src>>,
    cursor: usize,
    current_lo: usize,
    line: u32,
    current_line: u32,
    finished: bool,
}

impl<'src> Lexer<'src> {
    /// Constructs a new lexer positioned at the first line.
    pub fn new(src: &'src str) -> Lexer<'src> {
        Lexer {
            src,
            iter: src.chars().peekable(),
            cursor: 0,
            current_lo: 0,
            line: 1,
            current_line: 1,
            finished: false,
        }
    }

    /// Scans the next token, skipping any leading whitespace.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        let kind = self.scan_token_kind();
        let token = Token::new(kind, self.span());
        if kind.is_error() {
            trace!(?token, "lexical error token");
        }
        token
    }

    /// Tries to scan the current character.
    fn scan_token_kind(&mut self) -> TokenKind {
        use TokenKind::*;
        let Some(c) = self.mark_advance() else {
            return Eof;
        };
        match c {
            '+' => Plus,
            '-' => Minus,
            '*' => Star,
            '/' => Slash,
            '=' => match self.peek() {
                Some('=') => self.advance_with(Eq),
                _ => Assign,
            },
            '!' => match self.peek() {
                Some('=') => self.advance_with(NotEq),
                _ => Not,
            },
            '<' => match self.peek() {
                Some('=') => self.advance_with(LessEq),
                _ => Less,
            },
            '>' => match self.peek() {
                Some('=') => self.advance_with(GreaterEq),
                _ => Greater,
            },
            ':' => Colon,
            ';' => Semicolon,
            ',' => Comma,
            '(' => LParen,
            ')' => RParen,
            '[' => LBracket,
            ']' => RBracket,
            '{' => LBrace,
            '}' => RBrace,
            '"' => self.string(),
            c if c.is_ascii_alphabetic() => self.identifier_or_keyword(),
            c if c.is_ascii_digit() => self.number(),
            _ => ErrorUnexpectedChar,
        }
    }

    /// Strings have no escape sequences and may span several lines. The
    /// token's line is the one holding the opening quote.
    fn string(&mut self) -> TokenKind {
        loop {
            match self.advance() {
                Some('"') => return TokenKind::String,
                Some(_) => (),
                None => return TokenKind::ErrorUnclosedString,
            }
        }
    }

    fn identifier_or_keyword(&mut self) -> TokenKind {
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric()) {
            self.advance();
        }
        KEYWORDS
            .get(self.substr())
            .copied()
            .unwrap_or(TokenKind::Identifier)
    }

    fn number(&mut self) -> TokenKind {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        TokenKind::Number
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.advance();
        }
    }
}

impl<'src> Lexer<'src> {
    /// Starts a new token "mark" and advances the iterator.
    fn mark_advance(&mut self) -> Option<char> {
        self.current_lo = self.cursor;
        self.current_line = self.line;
        self.advance()
    }

    /// Returns the next character and advances the iterator, keeping track of
    /// line breaks.
    fn advance(&mut self) -> Option<char> {
        let c = self.iter.next()?;
        self.cursor += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Advances and returns the provided value.
    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    /// Returns the next character without advancing the iterator.
    fn peek(&mut self) -> Option<char> {
        self.iter.peek().copied()
    }

    /// Returns the current span.
    fn span(&self) -> Span {
        Span::new_of_bounds(self.current_lo..self.cursor, self.current_line)
    }

    /// Returns the substring of the current marked bounds.
    fn substr(&self) -> &'src str {
        let span = self.span();
        &self.src[span.lo..span.hi()]
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        self.finished = token.is_eof();
        Some(token)
    }
}

pub mod extract {
    use super::*;

    pub fn int(token: Token, src: &str) -> Result<i64, ParseIntError> {
        debug_assert_eq!(token.kind, TokenKind::Number);
        token.span().substr(src).parse()
    }

    pub fn ident(token: Token, src: &str) -> &str {
        debug_assert_eq!(token.kind, TokenKind::Identifier);
        token.span().substr(src)
    }

    /// Returns the string contents, without the surrounding quotes.
    pub fn string(token: Token, src: &str) -> &str {
        debug_assert_eq!(token.kind, TokenKind::String);
        token.span().offset(1, -1).substr(src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_demos_have_no_errors() {
        for input in [
            include_str!("../demos/fib.war"),
            include_str!("../demos/arrays.war"),
            include_str!("../demos/counter.war"),
        ] {
            let has_errors = lex_in_new(input).into_iter().any(|t| t.kind.is_error());
            assert!(!has_errors);
        }
    }

    #[test]
    fn test_eof_is_sticky() {
        let mut lexer = Lexer::new("x");
        assert_eq!(lexer.next_token().kind, TokenKind::Identifier);
        for _ in 0..3 {
            assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        }
    }

    #[test]
    fn test_iterator_stops_after_eof() {
        let kinds: Vec<_> = Lexer::new("a b").map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            [TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn test_extract() {
        let src = r#"42 name "some text""#;
        let tokens = lex_in_new(src);
        assert_eq!(extract::int(tokens[0], src), Ok(42));
        assert_eq!(extract::ident(tokens[1], src), "name");
        assert_eq!(extract::string(tokens[2], src), "some text");

        let src = "99999999999999999999";
        let tokens = lex_in_new(src);
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert!(extract::int(tokens[0], src).is_err());
    }

    #[test]
    fn tests_with_span() {
        use TokenKind::*;
        let cases = cases!(match .. {
            "+-*/" => [
                (Plus, 0..1, 1),
                (Minus, 1..2, 1),
                (Star, 2..3, 1),
                (Slash, 3..4, 1),
                (Eof, 4..4, 1),
            ],
            "war x : int = 1;" => [
                (War, 0..3, 1),
                (Identifier, 4..5, 1),
                (Colon, 6..7, 1),
                (IntType, 8..11, 1),
                (Assign, 12..13, 1),
                (Number, 14..15, 1),
                (Semicolon, 15..16, 1),
                (Eof, 16..16, 1),
            ],
            "If if IF alive1 tren" => [
                (Identifier, 0..2, 1),
                (If, 3..5, 1),
                (Identifier, 6..8, 1),
                (Identifier, 9..15, 1),
                (Tren, 16..20, 1),
                (Eof, 20..20, 1),
            ],
            "array<str> bool nothing" => [
                (ArrayType, 0..5, 1),
                (Less, 5..6, 1),
                (StrType, 6..9, 1),
                (Greater, 9..10, 1),
                (BoolType, 11..15, 1),
                (NothingType, 16..23, 1),
                (Eof, 23..23, 1),
            ],
            "= == ! != < <= > >= <<=>>==" => [
                (Assign, 0..1, 1),
                (Eq, 2..4, 1),
                (Not, 5..6, 1),
                (NotEq, 7..9, 1),
                (Less, 10..11, 1),
                (LessEq, 12..14, 1),
                (Greater, 15..16, 1),
                (GreaterEq, 17..19, 1),
                (Less, 20..21, 1),
                (LessEq, 21..23, 1),
                (Greater, 23..24, 1),
                (GreaterEq, 24..26, 1),
                (Assign, 26..27, 1),
                (Eof, 27..27, 1),
            ],
            "{}()[]:;," => [
                (LBrace, 0..1, 1),
                (RBrace, 1..2, 1),
                (LParen, 2..3, 1),
                (RParen, 3..4, 1),
                (LBracket, 4..5, 1),
                (RBracket, 5..6, 1),
                (Colon, 6..7, 1),
                (Semicolon, 7..8, 1),
                (Comma, 8..9, 1),
                (Eof, 9..9, 1),
            ],
            "1/11/0042/a123z" => [
                (Number, 0..1, 1),
                (Slash, 1..2, 1),
                (Number, 2..4, 1),
                (Slash, 4..5, 1),
                (Number, 5..9, 1),
                (Slash, 9..10, 1),
                (Identifier, 10..15, 1),
                (Eof, 15..15, 1),
            ],
            "a\nb\n\n  c\n" => [
                (Identifier, 0..1, 1),
                (Identifier, 2..3, 2),
                (Identifier, 7..8, 4),
                (Eof, 9..9, 5),
            ],
            "\"two\nlines\" x" => [
                (String, 0..11, 1),
                (Identifier, 12..13, 2),
                (Eof, 13..13, 2),
            ],
            r#""" "abc" "oops"# => [
                (String, 0..2, 1),
                (String, 3..8, 1),
                (ErrorUnclosedString, 9..14, 1),
                (Eof, 14..14, 1),
            ],
            "x\n @ y" => [
                (Identifier, 0..1, 1),
                (ErrorUnexpectedChar, 3..4, 2),
                (Identifier, 5..6, 2),
                (Eof, 6..6, 2),
            ],
        });

        for (input, tokens) in cases {
            let lexed = lex_in_new(input);
            assert_eq!(lexed, tokens.as_slice(), "input: {input:?}");
        }
    }

    macro_rules! cases {
        (match .. {
            $($str:expr => [$(($kind:expr, $range:expr, $line:expr)),* $(,)?]),* $(,)?
        }) => {{
            &[$((
                $str,
                vec![
                    $(Token::new($kind, Span::new_of_bounds($range.start..$range.end, $line))),*
                ],
            )),*]
        }};
    }
    use cases;
}
