//! The symbolic execution engine.
//!
//! Module layering (dependency order):
//!
//! ```text
//! walker      → worklist driver: interprets CFG nodes, branches, calls,
//!               exceptions, enforces the exploration bounds
//! exceptions  → handler/finally lookup for a thrown value
//! graph       → exploded-graph node interning
//! behavior    → method summaries (yields) and the shared registry
//! manager     → value minting, assume_dual, constraint propagation
//! state       → immutable program state algebra
//! constraint  → constraint domain and the custom-kind registry
//! value       → symbolic value identities and their computed-from data
//! ```

mod behavior;
mod constraint;
mod exceptions;
mod graph;
mod manager;
mod state;
mod value;
mod walker;

pub use behavior::{BehaviorRegistry, MethodBehavior, MethodYield, YieldResult};
pub use constraint::{Constraint, ConstraintKey, ConstraintKinds, KindId, MeetFn, Nullness};
pub use exceptions::ExceptionRoute;
pub use graph::{ExplodedGraph, Node};
pub use manager::{BooleanBudget, ConstraintManager, NestedBooleanOverflow};
pub use state::ProgramState;
pub use value::{ValueId, ValueKind, ValueTable};
pub use walker::Walker;
