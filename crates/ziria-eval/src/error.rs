//! Evaluation error types.

use thiserror::Error;

/// An evaluation error.
///
/// Every variant aborts the current branch; nothing is recovered inside the
/// interpreter. The approximation mode drops errored branches wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("Out of bounds: index {index}, length {length}")]
    OutOfBounds { index: i64, length: usize },

    #[error("unknown field {field} in struct {struct_name}")]
    UnknownField { struct_name: String, field: String },

    #[error("not in scope: {name}")]
    NotInScope { name: String },

    #[error("Free variables")]
    FreeVariables,

    #[error("Partial evaluation not supported for control flow")]
    ControlFlowNotGround,

    #[error("unsupported construct: {0}")]
    Unsupported(&'static str),

    #[error("no instance of {op} for operand type(s) {operands}")]
    OpDomain { op: String, operands: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("negative shift amount: {0}")]
    NegativeShift(i64),

    #[error("negative exponent: {0}")]
    NegativeExponent(i64),

    #[error("Partial assignment for arrays/structs not supported")]
    PartialAssignment,

    #[error("cannot default-initialize array of symbolic length {0}")]
    SymbolicLength(String),

    #[error("{0}")]
    User(String),

    #[error("expected {expected} result, got {actual}")]
    ResultShape {
        expected: &'static str,
        actual: String,
    },

    #[error("type checker: {0}")]
    TypeCheck(String),

    /// A guessed integer domain became empty: the branch has no consistent
    /// instantiation and is pruned, not reported.
    #[error("dead branch")]
    DeadBranch,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type EvalResult<T> = Result<T, EvalError>;

/// A top-level failure: the error plus the prints emitted before it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct EvalFailure {
    pub error: EvalError,
    /// Output emitted before the failure, in program order.
    pub prints: String,
}
