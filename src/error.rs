use thiserror::Error;

/// Everything that can go wrong while building or running a circuit against
/// the core engines.
///
/// Internal invariant breaks that a caller cannot trigger without violating a
/// documented precondition (mismatched Pauli-string lengths, multiplying
/// non-commuting operands through `mul_commuting_assign`, …) stay as panics;
/// this type is only for conditions a caller legitimately needs to recover
/// from.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("parse error at operation {op_index}: {message}")]
    Parse { op_index: usize, message: String },

    #[error("algebra violation: {0}")]
    AlgebraViolation(String),

    #[error("numeric-range error: {0}")]
    NumericRange(String),

    #[error("postselection failure on qubit {qubit}: forced outcome {forced} contradicts the deterministic value")]
    PostselectionFailure { qubit: usize, forced: bool },

    #[error("I/O error: {0}")]
    Io(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
