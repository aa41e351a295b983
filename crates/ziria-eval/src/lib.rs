//! Expression interpreter for the Ziria optimizer.
//!
//! One term representation, three evaluation modes: partial evaluation
//! under an open environment, full evaluation to a ground value, and an
//! approximation mode that guesses the outcomes of non-ground subterms so
//! the optimizer can ask whether a predicate is provable.

pub mod domain;
pub mod error;
pub mod heap;
pub mod interp;
pub mod ops;
pub mod tycheck;

pub use error::{EvalError, EvalFailure, EvalResult};
pub use heap::Heap;
pub use interp::{
    approximate, eval_bool, eval_full, eval_full_env, eval_int, eval_partial, eval_partial_env,
    eval_src_bool, eval_src_int, implies, provable, satisfiable, EvalCtx, EvalMode, EvalOutcome,
};
pub use tycheck::TypeChecker;
