use std::io::Write;

use crate::{ast::*, util::intern::Interner};

const INDENT_WIDTH: usize = 2;

pub fn print_program_string(idents: &Interner<str>, program: &Program) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_program(&mut buf, idents, program).unwrap();
    String::from_utf8(buf).unwrap()
}

pub fn print_expr_string(idents: &Interner<str>, expr: &Expr) -> String {
    let mut buf = Vec::with_capacity(512);
    print_expr(&mut buf, idents, 0, expr).unwrap();
    String::from_utf8(buf).unwrap()
}

pub fn print_program(
    w: &mut impl Write,
    idents: &Interner<str>,
    program: &Program,
) -> std::io::Result<()> {
    for stmt in &program.stmts {
        print_stmt(w, idents, 0, stmt)?;
    }
    Ok(())
}

fn print_stmt(
    w: &mut impl Write,
    idents: &Interner<str>,
    i: usize,
    stmt: &Stmt,
) -> std::io::Result<()> {
    sp(w, i)?;
    let span = stmt.span;
    match &stmt.kind {
        StmtKind::War(bindings) => {
            writeln!(w, "war ({span})")?;
            for binding in bindings {
                sp(w, i + 1)?;
                writeln!(w, "binding {}: {}", idents.get(binding.name.name), binding.ty)?;
                print_expr(w, idents, i + 2, &binding.initializer)?;
            }
        }
        StmtKind::Tren(function) => {
            write!(w, "tren {}[", idents.get(function.name.name))?;
            for (idx, param) in function.params.iter().enumerate() {
                if idx > 0 {
                    write!(w, ", ")?;
                }
                write!(w, "{} {}", param.ty, idents.get(param.name.name))?;
            }
            writeln!(w, "] -> {} ({span})", function.return_ty)?;
            print_stmt(w, idents, i + 1, &function.body)?;
        }
        StmtKind::Ret(expr) => {
            writeln!(w, "return ({span})")?;
            print_expr(w, idents, i + 1, expr)?;
        }
        StmtKind::If { predicate, body } => {
            writeln!(w, "if ({span})")?;
            print_expr(w, idents, i + 1, predicate)?;
            print_stmt(w, idents, i + 1, body)?;
        }
        StmtKind::Alive { predicate, body } => {
            writeln!(w, "alive ({span})")?;
            print_expr(w, idents, i + 1, predicate)?;
            print_stmt(w, idents, i + 1, body)?;
        }
        StmtKind::Block(block) => {
            if block.has_return {
                writeln!(w, "block returns ({span})")?;
            } else {
                writeln!(w, "block ({span})")?;
            }
            for stmt in &block.body {
                print_stmt(w, idents, i + 1, stmt)?;
            }
        }
        StmtKind::Expr(expr) => {
            writeln!(w, "expr ({span})")?;
            print_expr(w, idents, i + 1, expr)?;
        }
    }
    Ok(())
}

pub fn print_expr(
    w: &mut impl Write,
    idents: &Interner<str>,
    i: usize,
    expr: &Expr,
) -> std::io::Result<()> {
    sp(w, i)?;
    let info = Info(expr);
    match &expr.kind {
        ExprKind::Assignment { target, value } => {
            writeln!(w, "assignment {} {info}", idents.get(target.name.name))?;
            print_expr(w, idents, i + 1, value)?;
        }
        ExprKind::Relational { op, lhs, rhs } => {
            writeln!(w, "relational {op:?} {info}")?;
            print_expr(w, idents, i + 1, lhs)?;
            print_expr(w, idents, i + 1, rhs)?;
        }
        ExprKind::Additive { op, lhs, rhs } => {
            writeln!(w, "additive {op:?} {info}")?;
            print_expr(w, idents, i + 1, lhs)?;
            print_expr(w, idents, i + 1, rhs)?;
        }
        ExprKind::Multiplicative { op, lhs, rhs } => {
            writeln!(w, "multiplicative {op:?} {info}")?;
            print_expr(w, idents, i + 1, lhs)?;
            print_expr(w, idents, i + 1, rhs)?;
        }
        ExprKind::Array(elements) => {
            writeln!(w, "array {info}")?;
            for element in elements {
                print_expr(w, idents, i + 1, element)?;
            }
        }
        ExprKind::Call { callee, args } => {
            writeln!(w, "call {} {info}", idents.get(callee.name.name))?;
            for arg in args {
                print_expr(w, idents, i + 1, arg)?;
            }
        }
        ExprKind::Paren(inner) => {
            writeln!(w, "paren {info}")?;
            print_expr(w, idents, i + 1, inner)?;
        }
        ExprKind::Id(reference) => {
            writeln!(w, "ident {} {info}", idents.get(reference.name.name))?;
        }
        ExprKind::Int(val) => writeln!(w, "int {val} {info}")?,
        ExprKind::Bool(val) => writeln!(w, "bool {val} {info}")?,
        ExprKind::String(val) => writeln!(w, "string {val:?} {info}")?,
    }
    Ok(())
}

/// Writes the span and the type of an expression.
struct Info<'a>(&'a Expr);

impl std::fmt::Display for Info<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} %: {})", self.0.span, self.0.ty)
    }
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}
