//! Walker bounds.
//!
//! Four integer knobs guarantee termination and bound memory. The
//! defaults are the engine's contract; they are injectable per analyzer
//! for experimentation, not per-user configuration.

/// Total interpreted steps per method.
pub const MAX_STEPS: usize = 10_000;
/// Distinct visits to one program point along one path.
pub const MAX_EXEC_PROGRAM_POINT: u32 = 2;
/// States produced by boolean splitting during one assume.
pub const MAX_NESTED_BOOLEAN_STATES: usize = 10_000;
/// Constrained-value count above which a busy exploration aborts.
pub const OVERSIZE_CONSTRAINTS: usize = 75;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WalkerLimits {
    pub max_steps: usize,
    pub max_visits_per_point: u32,
    pub max_nested_boolean_states: usize,
    pub oversize_constraints: usize,
}

impl Default for WalkerLimits {
    fn default() -> Self {
        Self {
            max_steps: MAX_STEPS,
            max_visits_per_point: MAX_EXEC_PROGRAM_POINT,
            max_nested_boolean_states: MAX_NESTED_BOOLEAN_STATES,
            oversize_constraints: OVERSIZE_CONSTRAINTS,
        }
    }
}
