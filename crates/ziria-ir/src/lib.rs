//! Typed expression IR for the Ziria optimizer.
//!
//! The type checker elaborates surface expressions into this representation;
//! the interpreter in `ziria-eval` consumes it. Nodes carry their type and a
//! source span. Spans are used for diagnostics only and are erased
//! (`Exp::strip_spans`) when expressions serve as memo keys.

pub mod build;
pub mod exp;
pub mod pretty;
pub mod span;
pub mod ty;
pub mod value;

pub use exp::{BinOp, Exp, ExpKind, Name, RangeKind, UnOp, UniqGen, UniqId};
pub use pretty::{pretty_print_exp, pretty_print_ty};
pub use span::Span;
pub use ty::{ArrayLen, IntWidth, Ty};
pub use value::Value;
