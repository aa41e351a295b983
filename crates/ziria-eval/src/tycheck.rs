//! Boundary to the type checker.
//!
//! The `eval_src_*` entry points accept an unelaborated source expression
//! and hand it to this service together with a fresh unique-name generator.
//! The interpreter treats the service as a black box: it either returns the
//! typed expression (plus its type, which the interpreter ignores) or an
//! error message that is forwarded verbatim.

use ziria_ir::{Exp, Ty, UniqGen};

/// A type-checking service for source expressions.
pub trait TypeChecker {
    /// The front end's unelaborated expression representation.
    type Source;

    /// Elaborate a source expression into the typed IR.
    fn elaborate(&mut self, src: &Self::Source, gen: &mut UniqGen) -> Result<(Exp, Ty), String>;
}
