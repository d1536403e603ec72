use std::fmt;

use crate::{
    codegen::{generator::Generator, Error},
    token::Spanned,
    Compilation,
};

/// Lowers a checked program through the provided backend builder.
///
/// Top-level statements are emitted into a `main` function returning `0`;
/// each `tren` becomes a backend function of its own.
pub fn generate<B: Builder>(
    builder: &mut B,
    compilation: &Compilation,
) -> Result<(), Spanned<Error>> {
    Generator::new(builder, compilation).generate(&compilation.program)
}

/// Backend value types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IrType {
    /// A comparison result.
    I1,
    I32,
    I64,
    Ptr,
    Void,
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IrType::I1 => "i1",
            IrType::I32 => "i32",
            IrType::I64 => "i64",
            IrType::Ptr => "ptr",
            IrType::Void => "void",
        })
    }
}

/// Signed integer comparisons.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IntPredicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
}

impl fmt::Display for IntPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IntPredicate::Eq => "eq",
            IntPredicate::Ne => "ne",
            IntPredicate::Slt => "slt",
            IntPredicate::Sle => "sle",
            IntPredicate::Sgt => "sgt",
            IntPredicate::Sge => "sge",
        })
    }
}

/// The instruction-building facility a backend exposes to the generator.
///
/// Instructions are appended to the block selected by
/// [`Builder::set_insertion_point`]. Blocks belong to the function they were
/// created for. Emitting into a block which already ends in a terminator is a
/// contract violation; use [`Builder::is_terminated`] to check first.
///
/// `name` arguments are hints for printing and may be uniqued by the backend.
pub trait Builder {
    type Value: Copy;
    type Block: Copy + PartialEq;
    type Function: Copy;

    /// Declares an external function, defined elsewhere.
    fn declare_function(
        &mut self,
        name: &str,
        params: &[IrType],
        ret: IrType,
        variadic: bool,
    ) -> Self::Function;

    /// Creates a function with an empty body.
    fn create_function(
        &mut self,
        name: &str,
        params: &[(IrType, &str)],
        ret: IrType,
    ) -> Self::Function;

    fn param(&self, function: Self::Function, index: usize) -> Self::Value;

    fn create_block(&mut self, function: Self::Function, name: &str) -> Self::Block;
    fn set_insertion_point(&mut self, block: Self::Block);
    fn current_block(&self) -> Option<Self::Block>;
    fn is_terminated(&self, block: Self::Block) -> bool;

    fn const_int(&mut self, ty: IrType, value: i64) -> Self::Value;
    /// Creates a module-level constant string, returning a pointer to it.
    fn const_str(&mut self, value: &str) -> Self::Value;

    /// Reserves stack space for `count` values of type `ty` (one if `None`).
    ///
    /// The alloca is placed at the top of the current function's entry block,
    /// after the ones created before it, wherever the insertion point is.
    fn create_alloca(
        &mut self,
        ty: IrType,
        count: Option<Self::Value>,
        name: &str,
    ) -> Self::Value;
    fn create_load(&mut self, ty: IrType, ptr: Self::Value, name: &str) -> Self::Value;
    fn create_store(&mut self, value: Self::Value, ptr: Self::Value);
    /// Computes the address of the `index`-th element of type `element` in the
    /// buffer pointed to by `base`.
    fn create_indexed_address(
        &mut self,
        element: IrType,
        base: Self::Value,
        index: Self::Value,
        name: &str,
    ) -> Self::Value;

    fn create_add(&mut self, lhs: Self::Value, rhs: Self::Value, name: &str) -> Self::Value;
    fn create_sub(&mut self, lhs: Self::Value, rhs: Self::Value, name: &str) -> Self::Value;
    fn create_mul(&mut self, lhs: Self::Value, rhs: Self::Value, name: &str) -> Self::Value;
    fn create_sdiv(&mut self, lhs: Self::Value, rhs: Self::Value, name: &str) -> Self::Value;
    /// Produces an [`IrType::I1`].
    fn create_icmp(
        &mut self,
        predicate: IntPredicate,
        lhs: Self::Value,
        rhs: Self::Value,
        name: &str,
    ) -> Self::Value;
    /// Resizes an integer, sign-extending if `signed`.
    fn create_int_cast(
        &mut self,
        value: Self::Value,
        ty: IrType,
        signed: bool,
        name: &str,
    ) -> Self::Value;

    fn create_cond_branch(
        &mut self,
        cond: Self::Value,
        then_block: Self::Block,
        else_block: Self::Block,
    );
    fn create_branch(&mut self, target: Self::Block);
    /// Calls `function`. The returned value must not be used if the function
    /// returns [`IrType::Void`].
    fn create_call(
        &mut self,
        function: Self::Function,
        args: &[Self::Value],
        name: &str,
    ) -> Self::Value;
    fn create_return(&mut self, value: Option<Self::Value>);
    fn create_unreachable(&mut self);
}
