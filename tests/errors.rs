use pretty_assertions::assert_eq;
use warc::{compile, error::ErrorKind, CompileOptions};

#[track_caller]
fn assert_fails(src: &str, kind: ErrorKind, expected: &str) {
    let diagnostic = compile(src, &CompileOptions::default())
        .expect_err("program should have been rejected");
    assert_eq!(diagnostic.to_string(), expected);
    assert_eq!(diagnostic.kind, kind);
}

#[test]
fn test_lexical_errors() {
    assert_fails(
        "war x : int = 1;\nwar y : int = 2 @ 3;",
        ErrorKind::Lexical,
        "line 2: lexical error: unexpected character",
    );
    assert_fails(
        "war s : str = \"abc",
        ErrorKind::Lexical,
        "line 1: lexical error: unclosed string",
    );
    assert_fails(
        "war x : int = 99999999999999999999;",
        ErrorKind::Lexical,
        "line 1: lexical error: integer literal out of range",
    );
}

#[test]
fn test_syntax_errors() {
    assert_fails(
        "war x : int = 1",
        ErrorKind::Syntax,
        "line 1: syntax error: expected token Semicolon, but got Eof",
    );
    assert_fails(
        "war a : int = 1;\n\nwar b : int = a +;",
        ErrorKind::Syntax,
        "line 3: syntax error: unexpected token Semicolon in expression",
    );
    assert_fails(
        "war x : foo = 1;",
        ErrorKind::Syntax,
        "line 1: syntax error: expected a type, but got Identifier",
    );
    assert_fails(
        "war b : int = 1 < 2 < 3;",
        ErrorKind::Syntax,
        "line 1: syntax error: relational operators can't be chained, found Less",
    );
    assert_fails(
        "{ print[1];",
        ErrorKind::Syntax,
        "line 1: syntax error: expected token RBrace, but got Eof",
    );
}

#[test]
fn test_name_errors() {
    assert_fails(
        "war a : int = 0;\nwar x : int = y + 1;",
        ErrorKind::Semantic,
        "line 2: semantic error: unknown identifier y",
    );
    assert_fails(
        "{ war inner : int = 1; } inner = 2;",
        ErrorKind::Semantic,
        "line 1: semantic error: unknown identifier inner",
    );
    assert_fails(
        "war x : int = x;",
        ErrorKind::Semantic,
        "line 1: semantic error: unknown identifier x",
    );
    assert_fails(
        "war x : int = 1; x[1];",
        ErrorKind::Semantic,
        "line 1: semantic error: x is not a function",
    );
    assert_fails(
        "tren int f[] return 1; war y : int = f;",
        ErrorKind::Semantic,
        "line 1: semantic error: f is a function, not a variable",
    );
    assert_fails(
        "war x : int = 1;\ntren int f[] return x;",
        ErrorKind::Semantic,
        "line 2: semantic error: cannot capture variable x from an enclosing function",
    );
}

#[test]
fn test_type_errors() {
    assert_fails(
        "war arr : array<int> = [1, true];",
        ErrorKind::Semantic,
        "line 1: semantic error: expected type int, but got bool",
    );
    assert_fails(
        "war s : str = \"a\"; war t : str = s + s;",
        ErrorKind::Semantic,
        "line 1: semantic error: invalid operand of type str",
    );
    assert_fails(
        "war x : int = 1 + true;",
        ErrorKind::Semantic,
        "line 1: semantic error: expected type int, but got bool",
    );
    assert_fails(
        "if (\"a\") do print[1];",
        ErrorKind::Semantic,
        "line 1: semantic error: condition must be an integer, but got str",
    );
    assert_fails(
        "war x : int = 1; x = \"one\";",
        ErrorKind::Semantic,
        "line 1: semantic error: expected type int, but got str",
    );
    assert_fails(
        "war x : nothing = 1;",
        ErrorKind::Semantic,
        "line 1: semantic error: nothing is only allowed as a return type",
    );
}

#[test]
fn test_assignment_targets() {
    assert_fails(
        "war x : int = 1; (x) = 2;",
        ErrorKind::Semantic,
        "line 1: semantic error: invalid assignment target",
    );
    assert_fails(
        "1 = 2;",
        ErrorKind::Semantic,
        "line 1: semantic error: invalid assignment target",
    );
}

#[test]
fn test_call_errors() {
    assert_fails(
        "print[1, 2];",
        ErrorKind::Semantic,
        "line 1: semantic error: print expects 1 argument(s), but got 2",
    );
    assert_fails(
        "print[true];",
        ErrorKind::Semantic,
        "line 1: semantic error: expected type int, but got bool",
    );
}

#[test]
fn test_return_errors() {
    assert_fails(
        "tren int count[int n] {\n    alive by [n] { n = n - 1; }\n}",
        ErrorKind::Semantic,
        "line 1: semantic error: missing return in function count",
    );
    assert_fails(
        "tren int f[int n] { if (n) do return 1; }",
        ErrorKind::Semantic,
        "line 1: semantic error: missing return in function f",
    );
    assert_fails(
        "tren nothing f[] return 1;",
        ErrorKind::Semantic,
        "line 1: semantic error: can't return a value from a nothing function",
    );
    assert_fails(
        "return true;",
        ErrorKind::Semantic,
        "line 1: semantic error: expected type int, but got bool",
    );
}

#[test]
fn test_unknown_identifier_and_missing_return_wording() {
    let diagnostic = compile("war x : int = y + 1;", &CompileOptions::default()).unwrap_err();
    assert!(diagnostic.message.contains("unknown identifier"), "{diagnostic}");

    let diagnostic = compile(
        "tren int f[int n] { alive by [n] { n = n - 1; } }",
        &CompileOptions::default(),
    )
    .unwrap_err();
    assert!(diagnostic.message.contains("missing return"), "{diagnostic}");
}
