// program ::= stmt* EOF
// stmt ::= if '(' expr ')' do stmt
//        | alive by '[' expr ']' stmt
//        | war ID ':' type '=' expr (',' ID ':' type '=' expr)* ';'
//        | tren type ID '[' [type ID (',' type ID)*] ']' stmt
//        | return expr ';'
//        | '{' stmt* '}'
//        | expr ';'
// type ::= int | bool | str | nothing | array '<' type '>'
// expr ::= ID '=' expr
//        | additive [relop additive]
// additive ::= multiplicative (('+' | '-') multiplicative)*
// multiplicative ::= factor (('*' | '/') factor)*
// factor ::= ID '[' [expr (',' expr)*] ']'
//          | ID
//          | '[' expr (',' expr)* ']'
//          | '(' expr ')'
//          | integer
//          | string
//          | true
//          | false
// relop ::= '<' | '<=' | '>' | '>=' | '==' | '!='

// Precedence
//
// * /
// + -
// < <= > >= == != (non-associative)
// = (right-associative)

use crate::{
    scope::{ScopeId, SymbolId},
    token::{Span, TokenKind},
    types::Type,
    util::intern::Interned,
};

#[derive(Debug)]
pub struct Program {
    pub stmts: Vec<Stmt>,
    /// Every variable living in the `main` frame, in definition order.
    pub locals: Vec<SymbolId>,
}

#[derive(Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    /// Whether every path through this statement ends in a `return`.
    ///
    /// Conditionals and loops never qualify since their body may be skipped.
    pub fn has_return(&self) -> bool {
        match &self.kind {
            StmtKind::Ret(_) => true,
            StmtKind::Block(block) => block.has_return,
            StmtKind::If { .. }
            | StmtKind::Alive { .. }
            | StmtKind::War(_)
            | StmtKind::Tren(_)
            | StmtKind::Expr(_) => false,
        }
    }
}

#[derive(Debug)]
pub enum StmtKind {
    /// A `war` declaration, with one or more bindings.
    War(Vec<Binding>),
    /// A `tren` function definition.
    Tren(Function),
    Ret(Expr),
    If {
        predicate: Expr,
        body: Box<Stmt>,
    },
    Alive {
        predicate: Expr,
        body: Box<Stmt>,
    },
    Block(Block),
    Expr(Expr),
}

#[derive(Debug)]
pub struct Binding {
    pub name: Ident,
    pub symbol: SymbolId,
    pub ty: Type,
    pub initializer: Expr,
}

#[derive(Debug)]
pub struct Function {
    pub name: Ident,
    pub symbol: SymbolId,
    pub params: Vec<Param>,
    pub return_ty: Type,
    pub body: Box<Stmt>,
    /// The scope holding the parameters.
    pub scope: ScopeId,
    /// Every variable living in this function's frame (parameters first).
    pub locals: Vec<SymbolId>,
}

#[derive(Debug)]
pub struct Param {
    pub name: Ident,
    pub symbol: SymbolId,
    pub ty: Type,
}

#[derive(Debug)]
pub struct Block {
    pub body: Vec<Stmt>,
    pub scope: ScopeId,
    /// Whether any statement of the body has a return on all of its paths.
    pub has_return: bool,
}

/// A typed expression.
#[derive(Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub ty: Type,
}

#[derive(Debug)]
pub enum ExprKind {
    Assignment {
        target: Reference,
        value: Box<Expr>,
    },
    Relational {
        op: RelationalOperator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Additive {
        op: AdditiveOperator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Multiplicative {
        op: MultiplicativeOperator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// An array literal. The element type is the one of the first element.
    Array(Vec<Expr>),
    Call {
        callee: Reference,
        args: Vec<Expr>,
    },
    Paren(Box<Expr>),
    Id(Reference),
    Int(i64),
    Bool(bool),
    String(Box<str>),
}

/// A resolved use of a name.
#[derive(Copy, Clone, Debug)]
pub struct Reference {
    pub name: Ident,
    /// The innermost scope at the point of use.
    pub scope: ScopeId,
    pub symbol: SymbolId,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RelationalOperator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl RelationalOperator {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        Some(match kind {
            TokenKind::Less => Self::Lt,
            TokenKind::LessEq => Self::Le,
            TokenKind::Greater => Self::Gt,
            TokenKind::GreaterEq => Self::Ge,
            TokenKind::Eq => Self::Eq,
            TokenKind::NotEq => Self::Ne,
            _ => return None,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AdditiveOperator {
    Add,
    Sub,
}

impl AdditiveOperator {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Plus => Some(Self::Add),
            TokenKind::Minus => Some(Self::Sub),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MultiplicativeOperator {
    Mul,
    Div,
}

impl MultiplicativeOperator {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Star => Some(Self::Mul),
            TokenKind::Slash => Some(Self::Div),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Ident {
    pub name: Interned<str>,
    pub span: Span,
}

impl From<Ident> for Interned<str> {
    fn from(value: Ident) -> Self {
        value.name
    }
}
