use std::fmt;

use crate::util::intern::{Interned, Interner};

pub mod error;
pub mod tree;

/// What a [`Show`] implementation may consult while rendering.
pub struct Context<'ident> {
    pub ident_interner: &'ident Interner<str>,
}

impl<'ident> Context<'ident> {
    pub fn new(ident_interner: &'ident Interner<str>) -> Context<'ident> {
        Context { ident_interner }
    }

    /// Resolves an interned identifier.
    pub fn name(&self, name: Interned<str>) -> &'ident str {
        self.ident_interner.get(name)
    }
}

/// Analogous to [`fmt::Display`], but also receives a [`Context`], so that
/// interned names can be printed back.
///
/// The alternate flag (`{:#}`) prefixes the output with the source line.
pub trait Show {
    fn show(&self, f: &mut fmt::Formatter<'_>, ctx: &Context<'_>) -> fmt::Result;

    /// Returns a type which can be displayed.
    fn display(&self, ctx: &Context<'_>) -> impl fmt::Display
    where
        Self: Sized,
    {
        Shown(self, ctx)
    }
}

struct Shown<'this, 'ctx, 'ident, T: Show>(&'this T, &'ctx Context<'ident>);

impl<T: Show> fmt::Display for Shown<'_, '_, '_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Shown(this, ctx) = self;
        this.show(f, ctx)
    }
}
