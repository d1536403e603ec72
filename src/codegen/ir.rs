//! An in-memory, LLVM-flavoured IR.
//!
//! [`Module`] implements [`Builder`] and records every instruction it is
//! asked to build. The result is printed through [`fmt::Display`] in a
//! textual form close to LLVM's own.

use std::{
    collections::HashSet,
    fmt::{self, Write},
};

use tracing::trace;

use crate::codegen::interface::{Builder, IntPredicate, IrType};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FunctionRef(usize);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockRef {
    function: usize,
    block: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Const { ty: IrType, value: i64 },
    /// A parameter or an instruction result of the enclosing function.
    Local { ty: IrType, id: usize },
    /// A pointer to a module-level constant string.
    Str(usize),
    /// The result of calling a function returning `void`.
    Void,
}

impl Value {
    pub fn ty(&self) -> IrType {
        match self {
            Value::Const { ty, .. } | Value::Local { ty, .. } => *ty,
            Value::Str(_) => IrType::Ptr,
            Value::Void => IrType::Void,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    SDiv,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum CastOp {
    Sext,
    Zext,
    Trunc,
}

#[derive(Clone, Debug)]
enum Instruction {
    Alloca {
        dest: usize,
        ty: IrType,
        count: Option<Value>,
    },
    Load {
        dest: usize,
        ty: IrType,
        ptr: Value,
    },
    Store {
        value: Value,
        ptr: Value,
    },
    Gep {
        dest: usize,
        element: IrType,
        base: Value,
        index: Value,
    },
    Binary {
        dest: usize,
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
    },
    Icmp {
        dest: usize,
        predicate: IntPredicate,
        lhs: Value,
        rhs: Value,
    },
    Cast {
        dest: usize,
        op: CastOp,
        value: Value,
        ty: IrType,
    },
    Call {
        dest: Option<usize>,
        callee: FunctionRef,
        args: Vec<Value>,
    },
    CondBr {
        cond: Value,
        then_block: usize,
        else_block: usize,
    },
    Br {
        target: usize,
    },
    Ret(Option<Value>),
    Unreachable,
}

impl Instruction {
    fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::CondBr { .. }
                | Instruction::Br { .. }
                | Instruction::Ret(_)
                | Instruction::Unreachable
        )
    }
}

/// Hands out unique names, suffixing a counter on collisions.
#[derive(Debug, Default)]
struct Names {
    names: Vec<Box<str>>,
    taken: HashSet<Box<str>>,
}

impl Names {
    fn fresh(&mut self, hint: &str) -> usize {
        let hint = if hint.is_empty() { "tmp" } else { hint };
        let mut name: Box<str> = hint.into();
        let mut n = 1;
        while self.taken.contains(&name) {
            name = format!("{hint}{n}").into();
            n += 1;
        }
        self.taken.insert(name.clone());
        self.names.push(name);
        self.names.len() - 1
    }

    fn get(&self, id: usize) -> &str {
        &self.names[id]
    }
}

#[derive(Debug)]
struct BasicBlock {
    label: usize,
    instructions: Vec<Instruction>,
}

#[derive(Debug)]
struct Function {
    name: Box<str>,
    param_types: Vec<IrType>,
    params: Vec<Value>,
    ret: IrType,
    variadic: bool,
    /// Declarations have no body.
    declaration: bool,
    blocks: Vec<BasicBlock>,
    /// Values and block labels share a single namespace.
    names: Names,
    /// Number of allocas at the start of the entry block.
    allocas: usize,
}

#[derive(Debug)]
pub struct Module {
    name: String,
    strings: Vec<Box<str>>,
    functions: Vec<Function>,
    function_names: Names,
    insertion: Option<BlockRef>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Module {
        Module {
            name: name.into(),
            strings: Vec::new(),
            functions: Vec::new(),
            function_names: Names::default(),
            insertion: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of every declared or defined function, in creation order.
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|function| &*function.name)
    }

    /// Returns the printed form of a single function.
    pub fn function_text(&self, name: &str) -> Option<String> {
        let function = self.functions.iter().find(|f| &*f.name == name)?;
        let mut buf = String::new();
        self.fmt_function(&mut buf, function).ok()?;
        Some(buf)
    }

    fn add_function(&mut self, function: Function) -> FunctionRef {
        trace!(name = &*function.name, "created function");
        self.functions.push(function);
        FunctionRef(self.functions.len() - 1)
    }

    fn insertion(&self) -> BlockRef {
        self.insertion.expect("no insertion point set")
    }

    fn push(&mut self, instruction: Instruction) {
        let BlockRef { function, block } = self.insertion();
        let instructions = &mut self.functions[function].blocks[block].instructions;
        debug_assert!(
            !instructions.last().is_some_and(Instruction::is_terminator),
            "instruction emitted after a terminator"
        );
        instructions.push(instruction);
    }

    /// Pushes an instruction producing a value of type `ty`.
    fn define(
        &mut self,
        ty: IrType,
        name: &str,
        build: impl FnOnce(usize) -> Instruction,
    ) -> Value {
        let function = self.insertion().function;
        let id = self.functions[function].names.fresh(name);
        self.push(build(id));
        Value::Local { ty, id }
    }

    fn binary(&mut self, op: BinaryOp, lhs: Value, rhs: Value, name: &str) -> Value {
        debug_assert_eq!(lhs.ty(), rhs.ty());
        self.define(lhs.ty(), name, |dest| Instruction::Binary { dest, op, lhs, rhs })
    }
}

impl Builder for Module {
    type Value = Value;
    type Block = BlockRef;
    type Function = FunctionRef;

    fn declare_function(
        &mut self,
        name: &str,
        params: &[IrType],
        ret: IrType,
        variadic: bool,
    ) -> FunctionRef {
        let id = self.function_names.fresh(name);
        self.add_function(Function {
            name: self.function_names.get(id).into(),
            param_types: params.to_vec(),
            params: Vec::new(),
            ret,
            variadic,
            declaration: true,
            blocks: Vec::new(),
            names: Names::default(),
            allocas: 0,
        })
    }

    fn create_function(&mut self, name: &str, params: &[(IrType, &str)], ret: IrType) -> FunctionRef {
        let id = self.function_names.fresh(name);
        let mut names = Names::default();
        let params_values = params
            .iter()
            .map(|&(ty, name)| Value::Local {
                ty,
                id: names.fresh(name),
            })
            .collect();
        self.add_function(Function {
            name: self.function_names.get(id).into(),
            param_types: params.iter().map(|&(ty, _)| ty).collect(),
            params: params_values,
            ret,
            variadic: false,
            declaration: false,
            blocks: Vec::new(),
            names,
            allocas: 0,
        })
    }

    fn param(&self, function: FunctionRef, index: usize) -> Value {
        self.functions[function.0].params[index]
    }

    fn create_block(&mut self, function: FunctionRef, name: &str) -> BlockRef {
        let f = &mut self.functions[function.0];
        let label = f.names.fresh(name);
        f.blocks.push(BasicBlock {
            label,
            instructions: Vec::new(),
        });
        trace!(function = &*f.name, label = f.names.get(label), "created block");
        BlockRef {
            function: function.0,
            block: f.blocks.len() - 1,
        }
    }

    fn set_insertion_point(&mut self, block: BlockRef) {
        self.insertion = Some(block);
    }

    fn current_block(&self) -> Option<BlockRef> {
        self.insertion
    }

    fn is_terminated(&self, block: BlockRef) -> bool {
        self.functions[block.function].blocks[block.block]
            .instructions
            .last()
            .is_some_and(Instruction::is_terminator)
    }

    fn const_int(&mut self, ty: IrType, value: i64) -> Value {
        Value::Const { ty, value }
    }

    fn const_str(&mut self, value: &str) -> Value {
        self.strings.push(value.into());
        Value::Str(self.strings.len() - 1)
    }

    fn create_alloca(&mut self, ty: IrType, count: Option<Value>, name: &str) -> Value {
        let index = self.insertion().function;
        let function = &mut self.functions[index];
        let dest = function.names.fresh(name);
        let entry = function
            .blocks
            .first_mut()
            .expect("allocas need an entry block");
        entry
            .instructions
            .insert(function.allocas, Instruction::Alloca { dest, ty, count });
        function.allocas += 1;
        Value::Local {
            ty: IrType::Ptr,
            id: dest,
        }
    }

    fn create_load(&mut self, ty: IrType, ptr: Value, name: &str) -> Value {
        self.define(ty, name, |dest| Instruction::Load { dest, ty, ptr })
    }

    fn create_store(&mut self, value: Value, ptr: Value) {
        self.push(Instruction::Store { value, ptr });
    }

    fn create_indexed_address(
        &mut self,
        element: IrType,
        base: Value,
        index: Value,
        name: &str,
    ) -> Value {
        self.define(IrType::Ptr, name, |dest| Instruction::Gep {
            dest,
            element,
            base,
            index,
        })
    }

    fn create_add(&mut self, lhs: Value, rhs: Value, name: &str) -> Value {
        self.binary(BinaryOp::Add, lhs, rhs, name)
    }

    fn create_sub(&mut self, lhs: Value, rhs: Value, name: &str) -> Value {
        self.binary(BinaryOp::Sub, lhs, rhs, name)
    }

    fn create_mul(&mut self, lhs: Value, rhs: Value, name: &str) -> Value {
        self.binary(BinaryOp::Mul, lhs, rhs, name)
    }

    fn create_sdiv(&mut self, lhs: Value, rhs: Value, name: &str) -> Value {
        self.binary(BinaryOp::SDiv, lhs, rhs, name)
    }

    fn create_icmp(&mut self, predicate: IntPredicate, lhs: Value, rhs: Value, name: &str) -> Value {
        self.define(IrType::I1, name, |dest| Instruction::Icmp {
            dest,
            predicate,
            lhs,
            rhs,
        })
    }

    fn create_int_cast(&mut self, value: Value, ty: IrType, signed: bool, name: &str) -> Value {
        let from = bit_width(value.ty());
        let to = bit_width(ty);
        let op = match from.cmp(&to) {
            std::cmp::Ordering::Equal => return value,
            std::cmp::Ordering::Less if signed => CastOp::Sext,
            std::cmp::Ordering::Less => CastOp::Zext,
            std::cmp::Ordering::Greater => CastOp::Trunc,
        };
        self.define(ty, name, |dest| Instruction::Cast {
            dest,
            op,
            value,
            ty,
        })
    }

    fn create_cond_branch(&mut self, cond: Value, then_block: BlockRef, else_block: BlockRef) {
        debug_assert_eq!(then_block.function, else_block.function);
        self.push(Instruction::CondBr {
            cond,
            then_block: then_block.block,
            else_block: else_block.block,
        });
    }

    fn create_branch(&mut self, target: BlockRef) {
        self.push(Instruction::Br {
            target: target.block,
        });
    }

    fn create_call(&mut self, function: FunctionRef, args: &[Value], name: &str) -> Value {
        let ret = self.functions[function.0].ret;
        let args = args.to_vec();
        if ret == IrType::Void {
            self.push(Instruction::Call {
                dest: None,
                callee: function,
                args,
            });
            return Value::Void;
        }
        self.define(ret, name, |dest| Instruction::Call {
            dest: Some(dest),
            callee: function,
            args,
        })
    }

    fn create_return(&mut self, value: Option<Value>) {
        self.push(Instruction::Ret(value));
    }

    fn create_unreachable(&mut self) {
        self.push(Instruction::Unreachable);
    }
}

fn bit_width(ty: IrType) -> u32 {
    match ty {
        IrType::I1 => 1,
        IrType::I32 => 32,
        IrType::I64 | IrType::Ptr => 64,
        IrType::Void => 0,
    }
}

impl Module {
    fn fmt_function(&self, w: &mut impl Write, function: &Function) -> fmt::Result {
        if function.declaration {
            write!(w, "declare {} @{}(", function.ret, function.name)?;
            for (i, ty) in function.param_types.iter().enumerate() {
                if i > 0 {
                    write!(w, ", ")?;
                }
                write!(w, "{ty}")?;
            }
            if function.variadic {
                write!(w, ", ...")?;
            }
            return writeln!(w, ")");
        }

        write!(w, "define {} @{}(", function.ret, function.name)?;
        for (i, param) in function.params.iter().enumerate() {
            if i > 0 {
                write!(w, ", ")?;
            }
            write!(w, "{}", self.typed(function, *param))?;
        }
        writeln!(w, ") {{")?;
        for (i, block) in function.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(w)?;
            }
            writeln!(w, "{}:", function.names.get(block.label))?;
            for instruction in &block.instructions {
                write!(w, "  ")?;
                self.fmt_instruction(w, function, instruction)?;
                writeln!(w)?;
            }
        }
        writeln!(w, "}}")
    }

    fn fmt_instruction(
        &self,
        w: &mut impl Write,
        function: &Function,
        instruction: &Instruction,
    ) -> fmt::Result {
        let local = |id: usize| function.names.get(id);
        let label = |block: usize| function.names.get(function.blocks[block].label);
        let value = |v: Value| self.operand(function, v);
        let typed = |v: Value| self.typed(function, v);

        match instruction {
            Instruction::Alloca { dest, ty, count } => {
                write!(w, "%{} = alloca {ty}", local(*dest))?;
                if let Some(count) = count {
                    write!(w, ", {}", typed(*count))?;
                }
                Ok(())
            }
            Instruction::Load { dest, ty, ptr } => {
                write!(w, "%{} = load {ty}, {}", local(*dest), typed(*ptr))
            }
            Instruction::Store { value, ptr } => {
                write!(w, "store {}, {}", typed(*value), typed(*ptr))
            }
            Instruction::Gep {
                dest,
                element,
                base,
                index,
            } => write!(
                w,
                "%{} = getelementptr {element}, {}, {}",
                local(*dest),
                typed(*base),
                typed(*index)
            ),
            Instruction::Binary { dest, op, lhs, rhs } => {
                let op = match op {
                    BinaryOp::Add => "add",
                    BinaryOp::Sub => "sub",
                    BinaryOp::Mul => "mul",
                    BinaryOp::SDiv => "sdiv",
                };
                write!(
                    w,
                    "%{} = {op} {}, {}",
                    local(*dest),
                    typed(*lhs),
                    value(*rhs)
                )
            }
            Instruction::Icmp {
                dest,
                predicate,
                lhs,
                rhs,
            } => write!(
                w,
                "%{} = icmp {predicate} {}, {}",
                local(*dest),
                typed(*lhs),
                value(*rhs)
            ),
            Instruction::Cast {
                dest,
                op,
                value: operand,
                ty,
            } => {
                let op = match op {
                    CastOp::Sext => "sext",
                    CastOp::Zext => "zext",
                    CastOp::Trunc => "trunc",
                };
                write!(w, "%{} = {op} {} to {ty}", local(*dest), typed(*operand))
            }
            Instruction::Call { dest, callee, args } => {
                let callee = &self.functions[callee.0];
                if let Some(dest) = dest {
                    write!(w, "%{} = ", local(*dest))?;
                }
                write!(w, "call {} ", callee.ret)?;
                if callee.variadic {
                    write!(w, "(")?;
                    for ty in &callee.param_types {
                        write!(w, "{ty}, ")?;
                    }
                    write!(w, "...) ")?;
                }
                write!(w, "@{}(", callee.name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(w, ", ")?;
                    }
                    write!(w, "{}", typed(*arg))?;
                }
                write!(w, ")")
            }
            Instruction::CondBr {
                cond,
                then_block,
                else_block,
            } => write!(
                w,
                "br {}, label %{}, label %{}",
                typed(*cond),
                label(*then_block),
                label(*else_block)
            ),
            Instruction::Br { target } => write!(w, "br label %{}", label(*target)),
            Instruction::Ret(Some(v)) => write!(w, "ret {}", typed(*v)),
            Instruction::Ret(None) => write!(w, "ret void"),
            Instruction::Unreachable => write!(w, "unreachable"),
        }
    }

    fn operand(&self, function: &Function, value: Value) -> String {
        match value {
            Value::Const { value, .. } => value.to_string(),
            Value::Local { id, .. } => format!("%{}", function.names.get(id)),
            Value::Str(id) => format!("@.str.{id}"),
            Value::Void => "void".to_string(),
        }
    }

    fn typed(&self, function: &Function, value: Value) -> String {
        format!("{} {}", value.ty(), self.operand(function, value))
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        if !self.strings.is_empty() {
            writeln!(f)?;
        }
        for (i, string) in self.strings.iter().enumerate() {
            writeln!(
                f,
                "@.str.{i} = private unnamed_addr constant [{} x i8] c\"{}\\00\"",
                string.len() + 1,
                Escaped(string)
            )?;
        }
        for function in &self.functions {
            writeln!(f)?;
            self.fmt_function(f, function)?;
        }
        Ok(())
    }
}

/// Escapes a string the way LLVM prints `c"..."` constants.
struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.bytes() {
            if (byte.is_ascii_graphic() || byte == b' ') && byte != b'"' && byte != b'\\' {
                f.write_char(char::from(byte))?;
            } else {
                write!(f, "\\{byte:02X}")?;
            }
        }
        Ok(())
    }
}
