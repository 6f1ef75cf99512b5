//! Method behaviors — per-method summaries built from completed paths.
//!
//! Each path that reaches the method exit contributes one [`MethodYield`]:
//! the constraints observed on every parameter plus the result (a
//! constrained return value, or a thrown exception). At a call site the
//! walker replays the callee's yields instead of inlining its CFG: each
//! yield whose parameter constraints are compatible with the caller's
//! arguments produces one successor state.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::base::{MethodId, Name, SymbolId};

use super::constraint::Constraint;
use super::state::ProgramState;
use super::value::ValueId;

// ============================================================================
// YIELDS
// ============================================================================

/// Outcome of one completed path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum YieldResult {
    /// Normal completion; constraints observed on the return value.
    Normal { constraints: Vec<Constraint> },
    /// The path left the method with an exception in flight.
    Exception { thrown: Option<Name> },
}

/// One replayable summary of a completed path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodYield {
    /// Constraints observed per parameter, in declaration order.
    pub parameters: Vec<Vec<Constraint>>,
    pub result: YieldResult,
}

impl MethodYield {
    /// Unify this yield's parameter constraints with the caller's
    /// argument values. `None` when any meet is bottom: the yield is
    /// incompatible with the calling state and produces no successor.
    pub fn apply_parameters(
        &self,
        state: &ProgramState,
        arguments: &[ValueId],
        kinds: &super::constraint::ConstraintKinds,
    ) -> Option<ProgramState> {
        let mut state = state.clone();
        for (constraints, &argument) in self.parameters.iter().zip(arguments) {
            for &constraint in constraints {
                state = state.add_constraint(argument, constraint, kinds)?;
            }
        }
        Some(state)
    }

    pub fn is_exceptional(&self) -> bool {
        matches!(self.result, YieldResult::Exception { .. })
    }
}

// ============================================================================
// BEHAVIOR
// ============================================================================

/// Summary of one analyzed method: its interface symbols and the yields
/// collected while walking it.
#[derive(Clone, Debug)]
pub struct MethodBehavior {
    method: MethodId,
    parameters: Vec<SymbolId>,
    yields: Vec<MethodYield>,
    pub is_constructor: bool,
    pub is_void: bool,
    complete: bool,
    havocs_fields: bool,
}

impl MethodBehavior {
    pub fn new(
        method: MethodId,
        parameters: Vec<SymbolId>,
        is_constructor: bool,
        is_void: bool,
    ) -> Self {
        Self {
            method,
            parameters,
            yields: Vec::new(),
            is_constructor,
            is_void,
            complete: false,
            havocs_fields: false,
        }
    }

    pub fn method(&self) -> MethodId {
        self.method
    }

    /// The interface symbols protected from dead-symbol cleanup.
    pub fn parameters(&self) -> &[SymbolId] {
        &self.parameters
    }

    /// Record a completed path, deduplicating identical yields.
    pub fn add_yield(&mut self, y: MethodYield) {
        if !self.yields.contains(&y) {
            self.yields.push(y);
        }
    }

    pub fn yields(&self) -> &[MethodYield] {
        &self.yields
    }

    pub fn exceptional_yields(&self) -> impl Iterator<Item = &MethodYield> {
        self.yields.iter().filter(|y| y.is_exceptional())
    }

    /// Mark the analysis of this method as finished; only complete
    /// behaviors are replayed at call sites.
    pub fn mark_complete(&mut self) {
        self.complete = true;
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// The analyzed body performs a local call or synchronized block;
    /// callers must forget their field values when replaying.
    pub fn set_havocs_fields(&mut self) {
        self.havocs_fields = true;
    }

    pub fn havocs_fields(&self) -> bool {
        self.havocs_fields
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Shared store of completed behaviors. Reads during an in-progress
/// analysis are answered with `None`, which callers treat as "unknown
/// method" — usable even while the registry is being populated.
#[derive(Debug, Default)]
pub struct BehaviorRegistry {
    inner: RwLock<FxHashMap<MethodId, Arc<MethodBehavior>>>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, method: MethodId) -> Option<Arc<MethodBehavior>> {
        self.inner
            .read()
            .get(&method)
            .filter(|b| b.is_complete())
            .cloned()
    }

    pub fn publish(&self, behavior: MethodBehavior) {
        self.inner
            .write()
            .insert(behavior.method(), Arc::new(behavior));
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
