//! Engine error taxonomy.
//!
//! Every variant is recoverable at the method boundary: the driver logs
//! it and moves to the next method, keeping no partial yields.
//! Invariant violations (operand stack underflow, malformed CFGs) are
//! programming bugs and panic immediately with context instead of
//! appearing here.

use thiserror::Error;

use crate::base::Name;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The exploration exceeded the step bound.
    #[error("exceeded {limit} exploration steps in method '{method}'")]
    StepsExceeded { method: Name, limit: usize },

    /// A busy exploration carried an oversized constraint set.
    #[error("program state outgrew the constraint threshold in method '{method}'")]
    OversizeState { method: Name },

    /// Nested boolean expressions split past the state budget.
    #[error("boolean expressions produced more than {limit} states in method '{method}'")]
    NestedBooleanOverflow { method: Name, limit: usize },
}
