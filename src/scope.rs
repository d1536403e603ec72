//! Lexical scopes and the symbols they define.
//!
//! Scopes and symbols live in two arenas owned by [`Scopes`] and are referred
//! to by index. A scope only knows its parent; the parser keeps track of the
//! innermost one while it descends into blocks and functions, so the arena
//! never needs to be unwound.

use indexmap::IndexMap;

use crate::{types::Type, util::intern::Interned};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SymbolId(u32);

/// Identifies the function body a variable lives in. Variables may only be
/// referenced from their own frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FrameId(pub(crate) u32);

impl FrameId {
    /// The frame of top-level statements, which are lowered into `main`.
    pub const MAIN: FrameId = FrameId(0);
}

/// Functions provided by the compiler itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Builtin {
    /// `print[int]`: writes its argument to standard output.
    Print,
}

impl Builtin {
    pub const ALL: [Builtin; 1] = [Builtin::Print];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
        }
    }

    pub fn params(self) -> Vec<Type> {
        match self {
            Builtin::Print => vec![Type::Int],
        }
    }

    pub fn return_ty(self) -> Type {
        match self {
            Builtin::Print => Type::Int,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function {
        params: Vec<Type>,
        builtin: Option<Builtin>,
    },
}

#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: Interned<str>,
    /// The variable type, or the return type for functions.
    pub ty: Type,
    pub kind: SymbolKind,
    pub frame: FrameId,
}

impl Symbol {
    pub fn is_function(&self) -> bool {
        matches!(self.kind, SymbolKind::Function { .. })
    }

    pub fn params(&self) -> &[Type] {
        match &self.kind {
            SymbolKind::Function { params, .. } => params,
            SymbolKind::Variable => &[],
        }
    }

    pub fn builtin(&self) -> Option<Builtin> {
        match self.kind {
            SymbolKind::Function { builtin, .. } => builtin,
            SymbolKind::Variable => None,
        }
    }
}

#[derive(Debug)]
struct Scope {
    parent: Option<ScopeId>,
    symbols: IndexMap<Interned<str>, SymbolId>,
}

#[derive(Debug)]
pub struct Scopes {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
}

impl Scopes {
    /// The outermost scope, holding top-level definitions and builtins.
    pub const ROOT: ScopeId = ScopeId(0);

    pub fn with_capacity(capacity: usize) -> Scopes {
        let mut scopes = Vec::with_capacity(capacity.max(1));
        scopes.push(Scope {
            parent: None,
            symbols: IndexMap::new(),
        });
        Scopes {
            scopes,
            symbols: Vec::with_capacity(capacity),
        }
    }

    /// Creates a new, empty scope nested in `parent`.
    pub fn push(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(u32::try_from(self.scopes.len()).expect("too many scopes"));
        self.scopes.push(Scope {
            parent: Some(parent),
            symbols: IndexMap::new(),
        });
        id
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.0 as usize].parent
    }

    /// Defines `symbol` in `scope`. A previous definition with the same name
    /// in that same scope is replaced; definitions in enclosing scopes are
    /// shadowed.
    pub fn define(&mut self, scope: ScopeId, symbol: Symbol) -> SymbolId {
        let id = SymbolId(u32::try_from(self.symbols.len()).expect("too many symbols"));
        let name = symbol.name;
        self.symbols.push(symbol);
        self.scopes[scope.0 as usize].symbols.insert(name, id);
        id
    }

    /// Looks `name` up in `scope` only.
    pub fn lookup_local(&self, scope: ScopeId, name: Interned<str>) -> Option<SymbolId> {
        self.scopes[scope.0 as usize].symbols.get(&name).copied()
    }

    /// Looks `name` up in `scope` and then in each enclosing scope, returning
    /// the innermost definition.
    pub fn resolve(&self, scope: ScopeId, name: Interned<str>) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(scope) = current {
            if let Some(id) = self.lookup_local(scope, name) {
                return Some(id);
            }
            current = self.parent(scope);
        }
        None
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    /// Every symbol ever defined, including replaced ones, in definition order.
    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, symbol)| (SymbolId(i as u32), symbol))
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::intern::Interner;

    fn variable(name: Interned<str>, ty: Type) -> Symbol {
        Symbol {
            name,
            ty,
            kind: SymbolKind::Variable,
            frame: FrameId::MAIN,
        }
    }

    #[test]
    fn test_resolution_walks_outwards() {
        let mut idents = Interner::with_capacity(4);
        let x = idents.intern("x");
        let y = idents.intern("y");
        let z = idents.intern("z");

        let mut scopes = Scopes::with_capacity(4);
        let outer_x = scopes.define(Scopes::ROOT, variable(x, Type::Int));
        let inner = scopes.push(Scopes::ROOT);
        let inner_y = scopes.define(inner, variable(y, Type::String));

        assert_eq!(scopes.resolve(inner, x), Some(outer_x));
        assert_eq!(scopes.resolve(inner, y), Some(inner_y));
        assert_eq!(scopes.resolve(Scopes::ROOT, y), None);
        assert_eq!(scopes.resolve(inner, z), None);
    }

    #[test]
    fn test_shadowing_and_redefinition() {
        let mut idents = Interner::with_capacity(1);
        let x = idents.intern("x");

        let mut scopes = Scopes::with_capacity(4);
        let first = scopes.define(Scopes::ROOT, variable(x, Type::Int));
        let inner = scopes.push(Scopes::ROOT);
        let shadow = scopes.define(inner, variable(x, Type::Bool));

        assert_eq!(scopes.resolve(inner, x), Some(shadow));
        assert_eq!(scopes.resolve(Scopes::ROOT, x), Some(first));

        let second = scopes.define(Scopes::ROOT, variable(x, Type::String));
        assert_eq!(scopes.resolve(Scopes::ROOT, x), Some(second));
        assert_eq!(scopes.symbol(second).ty, Type::String);
        assert_eq!(scopes.lookup_local(Scopes::ROOT, x), Some(second));
        assert_eq!(scopes.symbols().count(), 3);
    }
}
