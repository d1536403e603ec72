use tracing::debug;

use crate::{
    codegen::{generate, ir},
    error::Diagnostic,
    scope::Scopes,
    util::intern::Interner,
};

/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into a typed AST. Names
/// are resolved and types are checked along the way.
pub mod parser;

/// Code generation lowers the typed AST through a backend builder.
pub mod codegen {
    mod generator;
    pub mod interface;
    pub mod ir;

    pub use generator::{lower, Error};
    pub use interface::generate;
}

pub mod ast;
pub mod error;
pub mod scope;
pub mod token;
pub mod types;

pub mod util {
    pub mod fmt;
    pub mod intern;
    #[cfg(test)]
    pub(crate) mod test_utils;
}

#[derive(Clone, Debug)]
pub struct CompileOptions {
    /// The name given to the produced backend module.
    pub module_name: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            module_name: "main".to_string(),
        }
    }
}

/// A parsed and checked program, together with the arenas it refers to.
#[derive(Debug)]
pub struct Compilation {
    pub program: ast::Program,
    pub scopes: Scopes,
    pub ident_interner: Interner<str>,
}

/// Parses and checks the source, stopping at the first error.
pub fn parse(src: &str) -> Result<Compilation, Diagnostic> {
    let mut ident_interner = Interner::with_capacity(128);
    let mut scopes = Scopes::with_capacity(64);
    match parser::parse_program(src, &mut ident_interner, &mut scopes) {
        Ok(program) => Ok(Compilation {
            program,
            scopes,
            ident_interner,
        }),
        Err(error) => {
            let diagnostic = Diagnostic::from_spanned(error.inner.kind(), &error, &ident_interner);
            debug!(%diagnostic, "front end failed");
            Err(diagnostic)
        }
    }
}

/// Compiles the source into a backend module.
pub fn compile(src: &str, options: &CompileOptions) -> Result<ir::Module, Diagnostic> {
    let compilation = parse(src)?;
    let mut module = ir::Module::new(options.module_name.as_str());
    if let Err(error) = generate(&mut module, &compilation) {
        let diagnostic =
            Diagnostic::from_spanned(error.inner.kind(), &error, &compilation.ident_interner);
        debug!(%diagnostic, "code generation failed");
        return Err(diagnostic);
    }
    debug!(
        module = module.name(),
        functions = module.function_names().count(),
        "compiled"
    );
    Ok(module)
}
