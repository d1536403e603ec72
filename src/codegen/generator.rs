use std::collections::HashMap;

use tracing::{debug, trace};

use crate::{
    ast::{
        self, AdditiveOperator, Expr, ExprKind, Ident, MultiplicativeOperator, RelationalOperator,
        Stmt, StmtKind,
    },
    codegen::interface::{Builder, IntPredicate, IrType},
    error::ErrorKind,
    scope::{Builtin, Scopes, SymbolId},
    token::Spanned,
    types::Type,
    util::intern::{Interned, Interner},
    Compilation,
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Lowers the typed tree through a [`Builder`].
///
/// Variables live in stack slots allocated in the entry block of the function
/// owning them. Slots and function handles are kept in side tables indexed by
/// symbol, so the tree itself is never mutated.
pub struct Generator<'a, B: Builder> {
    builder: &'a mut B,
    scopes: &'a Scopes,
    ident_interner: &'a Interner<str>,
    slots: HashMap<SymbolId, B::Value>,
    functions: HashMap<SymbolId, B::Function>,
    function: Option<B::Function>,
}

impl<'a, B: Builder> Generator<'a, B> {
    pub fn new(builder: &'a mut B, compilation: &'a Compilation) -> Generator<'a, B> {
        Generator {
            builder,
            scopes: &compilation.scopes,
            ident_interner: &compilation.ident_interner,
            slots: HashMap::new(),
            functions: HashMap::new(),
            function: None,
        }
    }

    pub fn generate(mut self, program: &ast::Program) -> Result<()> {
        self.g_builtins();

        let main = self.builder.create_function("main", &[], IrType::I64);
        let entry = self.builder.create_block(main, "entry");
        self.builder.set_insertion_point(entry);
        self.function = Some(main);

        self.g_slots(&program.locals);
        for stmt in &program.stmts {
            self.g_stmt(stmt)?;
        }
        self.g_function_end(&Type::Int, true);

        debug!(
            functions = self.functions.len(),
            slots = self.slots.len(),
            "generated program"
        );
        Ok(())
    }
}

impl<B: Builder> Generator<'_, B> {
    fn g_builtins(&mut self) {
        let scopes = self.scopes;
        for (id, symbol) in scopes.symbols() {
            let Some(builtin) = symbol.builtin() else {
                continue;
            };
            let function = match builtin {
                Builtin::Print => self.g_print(),
            };
            self.functions.insert(id, function);
        }
    }

    /// `print[value]` forwards to `printf` and returns its result.
    fn g_print(&mut self) -> B::Function {
        let printf = self
            .builder
            .declare_function("printf", &[IrType::Ptr], IrType::I32, true);
        let print = self.builder.create_function(
            Builtin::Print.name(),
            &[(IrType::I64, "value")],
            IrType::I64,
        );
        let entry = self.builder.create_block(print, "entry");
        self.builder.set_insertion_point(entry);

        let format = self.builder.const_str("out: %lld\n");
        let value = self.builder.param(print, 0);
        let written = self.builder.create_call(printf, &[format, value], "written");
        let result = self
            .builder
            .create_int_cast(written, IrType::I64, true, "result");
        self.builder.create_return(Some(result));
        print
    }

    /// Allocates one stack slot per variable, in the current block.
    fn g_slots(&mut self, locals: &[SymbolId]) {
        for &local in locals {
            let symbol = self.scopes.symbol(local);
            let name = format!("{}.addr", self.ident(symbol.name));
            let slot = self.builder.create_alloca(lower(&symbol.ty), None, &name);
            self.slots.insert(local, slot);
        }
    }

    fn g_function(&mut self, function: &ast::Function) -> Result<()> {
        let saved_block = self.builder.current_block();
        let saved_function = self.function;

        let name = self.ident(function.name.name);
        let params: Vec<_> = function
            .params
            .iter()
            .map(|param| (lower(&param.ty), self.ident(param.name.name)))
            .collect();
        let handle = self
            .builder
            .create_function(name, &params, lower(&function.return_ty));
        // Registered before the body, which may call itself.
        self.functions.insert(function.symbol, handle);

        let entry = self.builder.create_block(handle, "entry");
        self.builder.set_insertion_point(entry);
        self.function = Some(handle);

        self.g_slots(&function.locals);
        for (index, param) in function.params.iter().enumerate() {
            let value = self.builder.param(handle, index);
            let slot = self.slot(param.symbol, param.name)?;
            self.builder.create_store(value, slot);
        }
        self.g_stmt(&function.body)?;
        self.g_function_end(&function.return_ty, false);
        debug!(function = name, params = params.len(), "generated function");

        self.function = saved_function;
        if let Some(block) = saved_block {
            self.builder.set_insertion_point(block);
        }
        Ok(())
    }

    /// Closes the last block of the current function, if still open.
    fn g_function_end(&mut self, return_ty: &Type, is_main: bool) {
        if !self.is_open() {
            return;
        }
        if is_main {
            let zero = self.builder.const_int(IrType::I64, 0);
            self.builder.create_return(Some(zero));
        } else if return_ty.is_none() {
            self.builder.create_return(None);
        } else {
            self.builder.create_unreachable();
        }
    }

    fn g_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        self.g_reachable_block();
        match &stmt.kind {
            StmtKind::War(bindings) => {
                for binding in bindings {
                    let value = self.g_expr(&binding.initializer)?;
                    let slot = self.slot(binding.symbol, binding.name)?;
                    self.builder.create_store(value, slot);
                }
            }
            StmtKind::Tren(function) => self.g_function(function)?,
            StmtKind::Ret(expr) => {
                let value = self.g_expr(expr)?;
                self.builder.create_return(Some(value));
            }
            StmtKind::If { predicate, body } => {
                let cond = self.g_condition(predicate)?;
                let function = self.current_function();
                let then_block = self.builder.create_block(function, "then");
                let next_block = self.builder.create_block(function, "next");
                self.builder.create_cond_branch(cond, then_block, next_block);

                self.builder.set_insertion_point(then_block);
                self.g_stmt(body)?;
                self.g_branch_if_open(next_block);

                self.builder.set_insertion_point(next_block);
            }
            StmtKind::Alive { predicate, body } => {
                let function = self.current_function();
                let header = self.builder.create_block(function, "loop.header");
                let body_block = self.builder.create_block(function, "loop.body");
                let exit = self.builder.create_block(function, "loop.exit");
                self.builder.create_branch(header);

                self.builder.set_insertion_point(header);
                let cond = self.g_condition(predicate)?;
                self.builder.create_cond_branch(cond, body_block, exit);

                self.builder.set_insertion_point(body_block);
                self.g_stmt(body)?;
                self.g_branch_if_open(header);

                self.builder.set_insertion_point(exit);
            }
            StmtKind::Block(block) => {
                for stmt in &block.body {
                    self.g_stmt(stmt)?;
                }
            }
            StmtKind::Expr(expr) => {
                self.g_expr(expr)?;
            }
        }
        Ok(())
    }

    fn g_condition(&mut self, predicate: &Expr) -> Result<B::Value> {
        let value = self.g_expr(predicate)?;
        let zero = self.builder.const_int(IrType::I64, 0);
        Ok(self
            .builder
            .create_icmp(IntPredicate::Ne, value, zero, "cond"))
    }

    fn g_expr(&mut self, expr: &Expr) -> Result<B::Value> {
        let value = match &expr.kind {
            ExprKind::Int(value) => self.builder.const_int(IrType::I64, *value),
            ExprKind::Bool(value) => self.builder.const_int(IrType::I64, i64::from(*value)),
            ExprKind::String(value) => self.builder.const_str(value),
            ExprKind::Array(elements) => {
                let element_ty = expr.ty.element().map_or(IrType::I64, lower);
                let count = self.builder.const_int(IrType::I64, to_i64(elements.len()));
                let base = self
                    .builder
                    .create_alloca(element_ty, Some(count), "array");
                for (index, element) in elements.iter().enumerate() {
                    let value = self.g_expr(element)?;
                    let index = self.builder.const_int(IrType::I64, to_i64(index));
                    let address =
                        self.builder
                            .create_indexed_address(element_ty, base, index, "element");
                    self.builder.create_store(value, address);
                }
                base
            }
            ExprKind::Id(reference) => {
                let slot = self.slot(reference.symbol, reference.name)?;
                let name = self.ident(reference.name.name);
                self.builder.create_load(lower(&expr.ty), slot, name)
            }
            ExprKind::Assignment { target, value } => {
                let value = self.g_expr(value)?;
                let slot = self.slot(target.symbol, target.name)?;
                self.builder.create_store(value, slot);
                value
            }
            ExprKind::Relational { op, lhs, rhs } => {
                let lhs = self.g_expr(lhs)?;
                let rhs = self.g_expr(rhs)?;
                let cmp = self.builder.create_icmp(predicate(*op), lhs, rhs, "cmp");
                self.builder.create_int_cast(cmp, IrType::I64, false, "rel")
            }
            ExprKind::Additive { op, lhs, rhs } => {
                let lhs = self.g_expr(lhs)?;
                let rhs = self.g_expr(rhs)?;
                match op {
                    AdditiveOperator::Add => self.builder.create_add(lhs, rhs, "add"),
                    AdditiveOperator::Sub => self.builder.create_sub(lhs, rhs, "sub"),
                }
            }
            ExprKind::Multiplicative { op, lhs, rhs } => {
                let lhs = self.g_expr(lhs)?;
                let rhs = self.g_expr(rhs)?;
                match op {
                    MultiplicativeOperator::Mul => self.builder.create_mul(lhs, rhs, "mul"),
                    MultiplicativeOperator::Div => self.builder.create_sdiv(lhs, rhs, "div"),
                }
            }
            ExprKind::Call { callee, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.g_expr(arg))
                    .collect::<Result<Vec<_>>>()?;
                let Some(&function) = self.functions.get(&callee.symbol) else {
                    return Err(callee
                        .name
                        .span
                        .wrap(Error::MissingFunction(callee.name.name)));
                };
                self.builder.create_call(function, &args, "call")
            }
            ExprKind::Paren(inner) => self.g_expr(inner)?,
        };
        Ok(value)
    }
}

impl<'a, B: Builder> Generator<'a, B> {
    fn ident(&self, name: Interned<str>) -> &'a str {
        self.ident_interner.get(name)
    }

    fn slot(&self, symbol: SymbolId, name: Ident) -> Result<B::Value> {
        self.slots
            .get(&symbol)
            .copied()
            .ok_or_else(|| name.span.wrap(Error::MissingSlot(name.name)))
    }

    fn current_function(&self) -> B::Function {
        self.function.expect("statements are always generated inside a function")
    }

    fn is_open(&self) -> bool {
        self.builder
            .current_block()
            .is_some_and(|block| !self.builder.is_terminated(block))
    }

    /// Statements following a terminator are still generated, in a fresh
    /// block with no predecessors.
    fn g_reachable_block(&mut self) {
        if self.builder.current_block().is_none() || self.is_open() {
            return;
        }
        let block = self.builder.create_block(self.current_function(), "dead");
        trace!("continuing in unreachable block");
        self.builder.set_insertion_point(block);
    }

    fn g_branch_if_open(&mut self, target: B::Block) {
        if self.is_open() {
            self.builder.create_branch(target);
        }
    }
}

/// Maps a source type to its backend representation.
pub fn lower(ty: &Type) -> IrType {
    match ty {
        Type::Int | Type::Bool => IrType::I64,
        Type::String | Type::Array(_) => IrType::Ptr,
        Type::None => IrType::Void,
    }
}

fn predicate(op: RelationalOperator) -> IntPredicate {
    match op {
        RelationalOperator::Lt => IntPredicate::Slt,
        RelationalOperator::Le => IntPredicate::Sle,
        RelationalOperator::Gt => IntPredicate::Sgt,
        RelationalOperator::Ge => IntPredicate::Sge,
        RelationalOperator::Eq => IntPredicate::Eq,
        RelationalOperator::Ne => IntPredicate::Ne,
    }
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A variable was used without a stack slot in the current function.
    MissingSlot(Interned<str>),
    /// A function was called before its definition was lowered.
    MissingFunction(Interned<str>),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Codegen
    }
}
