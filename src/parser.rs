use tracing::{debug, trace};

use crate::{
    ast::{
        AdditiveOperator, Binding, Block, Expr, ExprKind, Function, Ident, MultiplicativeOperator,
        Param, Program, Reference, RelationalOperator, Stmt, StmtKind,
    },
    error::ErrorKind,
    lexer::{extract, Lexer},
    scope::{Builtin, FrameId, ScopeId, Scopes, Symbol, SymbolId, SymbolKind},
    token::{Span, Spanned, Token, TokenKind},
    types::Type,
    util::intern::{Interned, Interner},
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Parses and checks a whole program.
///
/// Names are resolved and types are checked while parsing, so the returned
/// tree is fully typed. Parsing stops at the first error.
pub fn parse_program(
    src: &str,
    ident_interner: &mut Interner<str>,
    scopes: &mut Scopes,
) -> Result<Program> {
    Parser::new(src, ident_interner, scopes).parse_program()
}

/// Parses a single expression in the context of an empty program.
pub fn parse_expr(
    src: &str,
    ident_interner: &mut Interner<str>,
    scopes: &mut Scopes,
) -> Result<Expr> {
    let mut p = Parser::new(src, ident_interner, scopes);
    let expr = p.parse_expr()?;
    p.consume(TokenKind::Eof)?;
    Ok(expr)
}

/// A function activation being parsed.
struct Frame {
    id: FrameId,
    return_ty: Type,
    locals: Vec<SymbolId>,
}

struct Parser<'src, 'ident, 'scope> {
    src: &'src str,
    lexer: Lexer<'src>,
    token: Token,
    ident_interner: &'ident mut Interner<str>,
    scopes: &'scope mut Scopes,
    scope: ScopeId,
    frames: Vec<Frame>,
    frame_count: u32,
}

impl Parser<'_, '_, '_> {
    fn parse_program(mut self) -> Result<Program> {
        let mut stmts = Vec::new();
        while !self.is(TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        debug_assert_eq!(self.frames.len(), 1, "unbalanced frames");
        let locals = self.frames.pop().map(|frame| frame.locals).unwrap_or_default();
        debug!(
            statements = stmts.len(),
            locals = locals.len(),
            scopes = self.scopes.scope_count(),
            "parsed program"
        );
        Ok(Program { stmts, locals })
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        match self.peek().kind {
            TokenKind::If => self.parse_if(),
            TokenKind::Alive => self.parse_alive(),
            TokenKind::War => self.parse_war(),
            TokenKind::Tren => self.parse_tren(),
            TokenKind::Return => self.parse_return(),
            TokenKind::LBrace => self.parse_block(),
            _ => self.parse_expr_stmt(),
        }
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        let lo = self.consume(TokenKind::If)?.span();
        self.consume(TokenKind::LParen)?;
        let predicate = self.parse_condition()?;
        self.consume(TokenKind::RParen)?;
        self.consume(TokenKind::Do)?;
        let body = self.parse_stmt()?;
        Ok(Stmt {
            span: lo.to(body.span),
            kind: StmtKind::If {
                predicate,
                body: Box::new(body),
            },
        })
    }

    fn parse_alive(&mut self) -> Result<Stmt> {
        let lo = self.consume(TokenKind::Alive)?.span();
        self.consume(TokenKind::By)?;
        self.consume(TokenKind::LBracket)?;
        let predicate = self.parse_condition()?;
        self.consume(TokenKind::RBracket)?;
        let body = self.parse_stmt()?;
        Ok(Stmt {
            span: lo.to(body.span),
            kind: StmtKind::Alive {
                predicate,
                body: Box::new(body),
            },
        })
    }

    fn parse_condition(&mut self) -> Result<Expr> {
        let predicate = self.parse_expr()?;
        if !predicate.ty.is_scalar() {
            return Err(predicate
                .span
                .wrap(Error::NonIntegerCondition(predicate.ty)));
        }
        Ok(predicate)
    }

    fn parse_war(&mut self) -> Result<Stmt> {
        let lo = self.consume(TokenKind::War)?.span();
        let mut bindings = Vec::with_capacity(1);
        loop {
            bindings.push(self.parse_binding()?);
            if !self.take(TokenKind::Comma) {
                break;
            }
        }
        let hi = self.consume(TokenKind::Semicolon)?.span();
        Ok(Stmt {
            kind: StmtKind::War(bindings),
            span: lo.to(hi),
        })
    }

    fn parse_binding(&mut self) -> Result<Binding> {
        let name = self.parse_ident()?;
        self.consume(TokenKind::Colon)?;
        let ty = self.parse_value_type()?;
        self.consume(TokenKind::Assign)?;
        let initializer = self.parse_expr()?;
        check_compatible(&ty, &initializer)?;
        // Only defined after the initializer, which can't see the new name.
        let symbol = self.define_variable(name, ty.clone());
        Ok(Binding {
            name,
            symbol,
            ty,
            initializer,
        })
    }

    fn parse_tren(&mut self) -> Result<Stmt> {
        let lo = self.consume(TokenKind::Tren)?.span();
        let (return_ty, _) = self.parse_type()?;
        let name = self.parse_ident()?;

        let enclosing_scope = self.scope;
        let enclosing_frame = self.frame().id;
        let scope = self.enter_scope();
        self.enter_frame(return_ty.clone());

        self.consume(TokenKind::LBracket)?;
        let mut params = Vec::new();
        while !self.is(TokenKind::RBracket) {
            if !params.is_empty() {
                self.consume(TokenKind::Comma)?;
            }
            let ty = self.parse_value_type()?;
            let name = self.parse_ident()?;
            let symbol = self.define_variable(name, ty.clone());
            params.push(Param { name, symbol, ty });
        }
        self.consume(TokenKind::RBracket)?;

        // The function is visible to its own body, so it is defined before
        // the body is parsed.
        let symbol = self.scopes.define(
            enclosing_scope,
            Symbol {
                name: name.name,
                ty: return_ty.clone(),
                kind: SymbolKind::Function {
                    params: params.iter().map(|param| param.ty.clone()).collect(),
                    builtin: None,
                },
                frame: enclosing_frame,
            },
        );

        let body = self.parse_stmt()?;
        if !return_ty.is_none() && !body.has_return() {
            return Err(name.span.wrap(Error::MissingReturn(name.name)));
        }

        let locals = self.leave_frame();
        self.leave_scope(scope);
        debug!(
            name = self.ident_interner.get(name.name),
            params = params.len(),
            locals = locals.len(),
            "parsed function"
        );

        Ok(Stmt {
            span: lo.to(body.span),
            kind: StmtKind::Tren(Function {
                name,
                symbol,
                params,
                return_ty,
                body: Box::new(body),
                scope,
                locals,
            }),
        })
    }

    fn parse_return(&mut self) -> Result<Stmt> {
        let lo = self.consume(TokenKind::Return)?.span();
        let expr = self.parse_expr()?;
        let return_ty = &self.frame().return_ty;
        if return_ty.is_none() {
            return Err(lo.to(expr.span).wrap(Error::ReturnInNothingFunction));
        }
        check_compatible(return_ty, &expr)?;
        let hi = self.consume(TokenKind::Semicolon)?.span();
        Ok(Stmt {
            kind: StmtKind::Ret(expr),
            span: lo.to(hi),
        })
    }

    fn parse_block(&mut self) -> Result<Stmt> {
        let lo = self.consume(TokenKind::LBrace)?.span();
        let scope = self.enter_scope();
        let mut body = Vec::new();
        while !self.is(TokenKind::RBrace) {
            if self.is(TokenKind::Eof) {
                return Err(self.unexpected(TokenKind::RBrace));
            }
            body.push(self.parse_stmt()?);
        }
        let hi = self.consume(TokenKind::RBrace)?.span();
        self.leave_scope(scope);
        let has_return = body.iter().any(Stmt::has_return);
        Ok(Stmt {
            kind: StmtKind::Block(Block {
                body,
                scope,
                has_return,
            }),
            span: lo.to(hi),
        })
    }

    fn parse_expr_stmt(&mut self) -> Result<Stmt> {
        let expr = self.parse_expr()?;
        let hi = self.consume(TokenKind::Semicolon)?.span();
        Ok(Stmt {
            span: expr.span.to(hi),
            kind: StmtKind::Expr(expr),
        })
    }

    /// Parses a type which may hold a value, i.e., anything but `nothing`.
    fn parse_value_type(&mut self) -> Result<Type> {
        let (ty, span) = self.parse_type()?;
        if ty.is_none() {
            return Err(span.wrap(Error::IllegalNothingType));
        }
        Ok(ty)
    }

    fn parse_type(&mut self) -> Result<(Type, Span)> {
        let token = self.peek();
        let ty = match token.kind {
            TokenKind::IntType => Type::Int,
            TokenKind::BoolType => Type::Bool,
            TokenKind::StrType => Type::String,
            TokenKind::NothingType => Type::None,
            TokenKind::ArrayType => {
                self.advance();
                self.consume(TokenKind::Less)?;
                let element = self.parse_value_type()?;
                let hi = self.consume(TokenKind::Greater)?.span();
                return Ok((Type::array_of(element), token.span().to(hi)));
            }
            actual => {
                return Err(self.error_at(token, Error::ExpectedType { actual }));
            }
        };
        self.advance();
        Ok((ty, token.span()))
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.consume(TokenKind::Identifier)?;
        let name = self.ident_interner.intern(extract::ident(token, self.src));
        Ok(Ident {
            name,
            span: token.span(),
        })
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        let lhs = self.parse_relational()?;
        if !self.is(TokenKind::Assign) {
            return Ok(lhs);
        }
        let Expr { kind, span, ty } = lhs;
        let ExprKind::Id(target) = kind else {
            return Err(span.wrap(Error::InvalidAssignmentTarget));
        };
        self.advance();
        // Right-associative: `a = b = 1` assigns `b` first.
        let value = self.parse_expr()?;
        check_compatible(&ty, &value)?;
        Ok(Expr {
            span: span.to(value.span),
            kind: ExprKind::Assignment {
                target,
                value: Box::new(value),
            },
            ty,
        })
    }

    fn parse_relational(&mut self) -> Result<Expr> {
        let lhs = self.parse_additive()?;
        let Some(op) = RelationalOperator::from_token(self.peek().kind) else {
            return Ok(lhs);
        };
        self.advance();
        let rhs = self.parse_additive()?;
        check_operands(&lhs, &rhs)?;

        let next = self.peek();
        if RelationalOperator::from_token(next.kind).is_some() {
            return Err(next.span().wrap(Error::ChainedRelational { actual: next.kind }));
        }

        Ok(Expr {
            span: lhs.span.to(rhs.span),
            kind: ExprKind::Relational {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty: Type::Int,
        })
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        while let Some(op) = AdditiveOperator::from_token(self.peek().kind) {
            self.advance();
            let rhs = self.parse_multiplicative()?;
            check_operands(&lhs, &rhs)?;
            lhs = Expr {
                span: lhs.span.to(rhs.span),
                ty: lhs.ty.clone(),
                kind: ExprKind::Additive {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            };
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_factor()?;
        while let Some(op) = MultiplicativeOperator::from_token(self.peek().kind) {
            self.advance();
            let rhs = self.parse_factor()?;
            check_operands(&lhs, &rhs)?;
            lhs = Expr {
                span: lhs.span.to(rhs.span),
                ty: lhs.ty.clone(),
                kind: ExprKind::Multiplicative {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            };
        }
        Ok(lhs)
    }

    fn parse_factor(&mut self) -> Result<Expr> {
        let token = self.peek();
        let span = token.span();
        let (kind, ty) = match token.kind {
            TokenKind::Number => {
                self.advance();
                let value = extract::int(token, self.src)
                    .map_err(|_| span.wrap(Error::IntegerOutOfRange))?;
                (ExprKind::Int(value), Type::Int)
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                (ExprKind::Bool(token.kind == TokenKind::True), Type::Bool)
            }
            TokenKind::String => {
                self.advance();
                let value = extract::string(token, self.src);
                (ExprKind::String(value.into()), Type::String)
            }
            TokenKind::Identifier => return self.parse_name(),
            TokenKind::LBracket => return self.parse_array(),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                let hi = self.consume(TokenKind::RParen)?.span();
                return Ok(Expr {
                    span: span.to(hi),
                    ty: inner.ty.clone(),
                    kind: ExprKind::Paren(Box::new(inner)),
                });
            }
            actual => {
                return Err(self.error_at(token, Error::UnexpectedTokenInExpr { token: actual }));
            }
        };
        Ok(Expr { kind, span, ty })
    }

    /// Parses a variable reference or a call.
    fn parse_name(&mut self) -> Result<Expr> {
        let name = self.parse_ident()?;
        let Some(symbol_id) = self.scopes.resolve(self.scope, name.name) else {
            return Err(name.span.wrap(Error::UndefinedName(name.name)));
        };
        let reference = Reference {
            name,
            scope: self.scope,
            symbol: symbol_id,
        };
        let symbol = self.scopes.symbol(symbol_id);

        if !self.is(TokenKind::LBracket) {
            if symbol.is_function() {
                return Err(name.span.wrap(Error::NotAVariable(name.name)));
            }
            if symbol.frame != self.frame().id {
                return Err(name.span.wrap(Error::CannotCapture(name.name)));
            }
            return Ok(Expr {
                kind: ExprKind::Id(reference),
                span: name.span,
                ty: symbol.ty.clone(),
            });
        }

        if !symbol.is_function() {
            return Err(name.span.wrap(Error::NotAFunction(name.name)));
        }
        let params = symbol.params().to_vec();
        let return_ty = symbol.ty.clone();

        self.consume(TokenKind::LBracket)?;
        let mut args = Vec::with_capacity(params.len());
        while !self.is(TokenKind::RBracket) {
            if !args.is_empty() {
                self.consume(TokenKind::Comma)?;
            }
            args.push(self.parse_expr()?);
        }
        let hi = self.consume(TokenKind::RBracket)?.span();
        let span = name.span.to(hi);

        if args.len() != params.len() {
            return Err(span.wrap(Error::IncorrectNumberOfArguments {
                name: name.name,
                expected: params.len(),
                actual: args.len(),
            }));
        }
        for (param, arg) in params.iter().zip(&args) {
            check_compatible(param, arg)?;
        }

        Ok(Expr {
            kind: ExprKind::Call {
                callee: reference,
                args,
            },
            span,
            ty: return_ty,
        })
    }

    fn parse_array(&mut self) -> Result<Expr> {
        let lo = self.consume(TokenKind::LBracket)?.span();
        let first = self.parse_expr()?;
        if first.ty.is_none() {
            return Err(first.span.wrap(Error::InvalidOperand(first.ty)));
        }
        let element_ty = first.ty.clone();
        let mut elements = vec![first];
        while self.take(TokenKind::Comma) {
            let element = self.parse_expr()?;
            check_compatible(&element_ty, &element)?;
            elements.push(element);
        }
        let hi = self.consume(TokenKind::RBracket)?.span();
        Ok(Expr {
            kind: ExprKind::Array(elements),
            span: lo.to(hi),
            ty: Type::array_of(element_ty),
        })
    }
}

fn check_compatible(expected: &Type, expr: &Expr) -> Result<()> {
    if expected.is_compatible_with(&expr.ty) {
        return Ok(());
    }
    Err(expr.span.wrap(Error::Mismatch {
        expected: expected.clone(),
        actual: expr.ty.clone(),
    }))
}

fn check_operands(lhs: &Expr, rhs: &Expr) -> Result<()> {
    for operand in [lhs, rhs] {
        if !operand.ty.is_scalar() {
            return Err(operand.span.wrap(Error::InvalidOperand(operand.ty.clone())));
        }
    }
    check_compatible(&lhs.ty, rhs)
}

impl Parser<'_, '_, '_> {
    pub fn new<'src, 'ident, 'scope>(
        src: &'src str,
        ident_interner: &'ident mut Interner<str>,
        scopes: &'scope mut Scopes,
    ) -> Parser<'src, 'ident, 'scope> {
        for builtin in Builtin::ALL {
            let name = ident_interner.intern(builtin.name());
            scopes.define(
                Scopes::ROOT,
                Symbol {
                    name,
                    ty: builtin.return_ty(),
                    kind: SymbolKind::Function {
                        params: builtin.params(),
                        builtin: Some(builtin),
                    },
                    frame: FrameId::MAIN,
                },
            );
        }

        let mut lexer = Lexer::new(src);
        let token = lexer.next_token();
        Parser {
            src,
            lexer,
            token,
            ident_interner,
            scopes,
            scope: Scopes::ROOT,
            frames: vec![Frame {
                id: FrameId::MAIN,
                return_ty: Type::Int,
                locals: Vec::new(),
            }],
            frame_count: 1,
        }
    }

    /// Returns the current token.
    fn peek(&self) -> Token {
        self.token
    }

    /// Returns the current token and advances.
    fn advance(&mut self) -> Token {
        let current = self.token;
        self.token = self.lexer.next_token();
        current
    }

    /// Checks whether the current token matches the given one.
    fn is(&self, expect: TokenKind) -> bool {
        self.peek().kind == expect
    }

    /// Advances if the current token matches the provided one, returning true.
    /// If not, returns false and doesn't advance.
    fn take(&mut self, expect: TokenKind) -> bool {
        if self.is(expect) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advances if the current token matches the provided one. If not,
    /// returns an error.
    fn consume(&mut self, expect: TokenKind) -> Result<Token> {
        if self.is(expect) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expect))
        }
    }

    fn unexpected(&self, expected: TokenKind) -> Spanned<Error> {
        let current = self.peek();
        self.error_at(
            current,
            Error::Unexpected {
                actual: current.kind,
                expected,
            },
        )
    }

    /// Builds an error located at `token`. Lexical error tokens take
    /// precedence over whatever the parser expected.
    fn error_at(&self, token: Token, error: Error) -> Spanned<Error> {
        let error = if token.kind.is_error() {
            Error::Lexer(token.kind)
        } else {
            error
        };
        let error = token.span().wrap(error);
        debug!(?error, "parse failed");
        error
    }

    fn frame(&self) -> &Frame {
        self.frames.last().expect("main frame is never popped")
    }

    fn enter_frame(&mut self, return_ty: Type) {
        let id = FrameId(self.frame_count);
        self.frame_count += 1;
        self.frames.push(Frame {
            id,
            return_ty,
            locals: Vec::new(),
        });
    }

    fn leave_frame(&mut self) -> Vec<SymbolId> {
        debug_assert!(self.frames.len() > 1, "can't leave the main frame");
        self.frames.pop().map(|frame| frame.locals).unwrap_or_default()
    }

    fn enter_scope(&mut self) -> ScopeId {
        let scope = self.scopes.push(self.scope);
        trace!(?scope, parent = ?self.scope, "enter scope");
        self.scope = scope;
        scope
    }

    fn leave_scope(&mut self, scope: ScopeId) {
        debug_assert_eq!(self.scope, scope, "unbalanced scopes");
        trace!(?scope, "leave scope");
        self.scope = self.scopes.parent(scope).unwrap_or(Scopes::ROOT);
    }

    fn define_variable(&mut self, name: Ident, ty: Type) -> SymbolId {
        let frame = self.frame().id;
        let symbol = self.scopes.define(
            self.scope,
            Symbol {
                name: name.name,
                ty,
                kind: SymbolKind::Variable,
                frame,
            },
        );
        if let Some(frame) = self.frames.last_mut() {
            frame.locals.push(symbol);
        }
        symbol
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    // Lexical
    /// A token kind which holds the [`TokenKind::is_error`] property.
    Lexer(TokenKind),
    IntegerOutOfRange,

    // Syntax
    Unexpected {
        actual: TokenKind,
        expected: TokenKind,
    },
    UnexpectedTokenInExpr {
        token: TokenKind,
    },
    ExpectedType {
        actual: TokenKind,
    },
    ChainedRelational {
        actual: TokenKind,
    },

    // Semantic
    UndefinedName(Interned<str>),
    NotAFunction(Interned<str>),
    NotAVariable(Interned<str>),
    CannotCapture(Interned<str>),
    InvalidAssignmentTarget,
    Mismatch {
        expected: Type,
        actual: Type,
    },
    InvalidOperand(Type),
    NonIntegerCondition(Type),
    IncorrectNumberOfArguments {
        name: Interned<str>,
        expected: usize,
        actual: usize,
    },
    IllegalNothingType,
    MissingReturn(Interned<str>),
    ReturnInNothingFunction,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            Lexer(_) | IntegerOutOfRange => ErrorKind::Lexical,
            Unexpected { .. }
            | UnexpectedTokenInExpr { .. }
            | ExpectedType { .. }
            | ChainedRelational { .. } => ErrorKind::Syntax,
            UndefinedName(_)
            | NotAFunction(_)
            | NotAVariable(_)
            | CannotCapture(_)
            | InvalidAssignmentTarget
            | Mismatch { .. }
            | InvalidOperand(_)
            | NonIntegerCondition(_)
            | IncorrectNumberOfArguments { .. }
            | IllegalNothingType
            | MissingReturn(_)
            | ReturnInNothingFunction => ErrorKind::Semantic,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;

    pub fn parse_program(src: &str) -> (Interner<str>, Scopes, Program) {
        let mut i = Interner::with_capacity(32);
        let mut scopes = Scopes::with_capacity(16);
        let prog = super::parse_program(src, &mut i, &mut scopes).expect("failed to parse");
        (i, scopes, prog)
    }
}
