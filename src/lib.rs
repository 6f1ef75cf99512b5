//! # sedge
//!
//! Symbolic execution core for bug finding on per-method control-flow
//! graphs.
//!
//! The engine explores the reachable states of one method body at a
//! time: program states (symbol bindings, value constraints, operand
//! stack) flow through the CFG under a LIFO worklist, split at branches
//! through constraint assumption, compose across calls through method
//! behavior summaries, and feed abstract events to a pluggable checker
//! pipeline that reports issues. It is a bug finder, not a verifier:
//! exploration is bounded, deliberately unsound, and recovers per
//! method.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! driver    → batch analysis, behavior registry population
//! checks    → checker pipeline and the built-in checkers
//! engine    → values, constraints, states, behaviors, the walker
//! report    → issue model and collector
//! cfg       → control-flow graph model and builder
//! syntax    → tree arena and symbol/type oracle
//! config    → exploration bounds
//! error     → engine error taxonomy
//! base      → primitives (ids, persistent structures)
//! ```
//!
//! Parsing, CFG construction, and name resolution are external
//! collaborators: providers populate the `syntax` and `cfg` models and
//! hand them to the [`driver::Analyzer`].

// ============================================================================
// MODULES (dependency order: base → syntax/cfg → engine → checks → driver)
// ============================================================================

/// Foundation types: ids, names, persistent structures
pub mod base;

/// Exploration bounds
pub mod config;

/// Engine error taxonomy
pub mod error;

/// Tree arena and symbol/type oracle
pub mod syntax;

/// Control-flow graph model and builder
pub mod cfg;

/// Issue model and collector
pub mod report;

/// Symbolic values, constraints, program states, the walker
pub mod engine;

/// Checker pipeline and built-in checkers
pub mod checks;

/// Batch analysis driver
pub mod driver;

// Re-export the commonly needed items
pub use base::{BlockId, MethodId, Name, SymbolId, TreeId};
pub use cfg::{Cfg, CfgBuilder, ProgramPoint};
pub use checks::{Checker, CheckerDispatcher};
pub use config::WalkerLimits;
pub use driver::{AnalysisOutcome, Analyzer, MethodBody};
pub use engine::{
    BehaviorRegistry, Constraint, ConstraintManager, MethodBehavior, ProgramState, ValueId, Walker,
};
pub use error::EngineError;
pub use report::{Issue, IssueCollector, Severity};
pub use syntax::{SymbolTable, TreeArena, TreeKind};
