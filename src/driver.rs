//! Batch driver — analyze a sequence of methods.
//!
//! One walker runs per method, to completion, before the next method
//! starts. Bound failures abandon only the offending method: the driver
//! logs them and moves on, keeping no partial yields. Completed
//! behaviors are published into the shared registry so later methods
//! replay earlier methods' summaries at their call sites.

use tracing::debug;

use crate::base::{MethodId, SymbolId};
use crate::cfg::Cfg;
use crate::checks::{Checker, CheckerDispatcher};
use crate::config::WalkerLimits;
use crate::engine::{BehaviorRegistry, Walker};
use crate::report::Issue;
use crate::syntax::{SymbolTable, TreeArena};

/// One method handed to the driver: its symbol, parameter symbols in
/// declaration order, and its CFG.
#[derive(Clone, Debug)]
pub struct MethodBody {
    pub method: MethodId,
    pub parameters: Vec<SymbolId>,
    pub cfg: Cfg,
}

/// Analysis summary returned by [`Analyzer::analyze`].
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub issues: Vec<Issue>,
    pub analyzed: usize,
    /// Methods abandoned on a bound failure.
    pub aborted: usize,
}

/// Drives the walker over a batch of methods.
pub struct Analyzer<'a> {
    arena: &'a TreeArena,
    oracle: &'a SymbolTable,
    registry: BehaviorRegistry,
    dispatcher: CheckerDispatcher,
    limits: WalkerLimits,
}

impl<'a> Analyzer<'a> {
    /// Analyzer with the built-in checker pipeline and default bounds.
    pub fn new(arena: &'a TreeArena, oracle: &'a SymbolTable) -> Self {
        Self {
            arena,
            oracle,
            registry: BehaviorRegistry::new(),
            dispatcher: CheckerDispatcher::with_default_checkers(),
            limits: WalkerLimits::default(),
        }
    }

    /// Analyzer with an empty pipeline, for targeted tests.
    pub fn without_checkers(arena: &'a TreeArena, oracle: &'a SymbolTable) -> Self {
        Self {
            arena,
            oracle,
            registry: BehaviorRegistry::new(),
            dispatcher: CheckerDispatcher::new(),
            limits: WalkerLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: WalkerLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Append a user-supplied checker after the built-ins.
    pub fn add_checker(&mut self, checker: Box<dyn Checker>) {
        self.dispatcher.add_checker(checker);
    }

    pub fn registry(&self) -> &BehaviorRegistry {
        &self.registry
    }

    /// Analyze `methods` in order. Behaviors of completed methods are
    /// replayed at call sites in later methods.
    pub fn analyze(&mut self, methods: &[MethodBody]) -> AnalysisOutcome {
        let mut aborted = 0;
        for body in methods {
            let walker = Walker::new(
                body.method,
                body.parameters.clone(),
                &body.cfg,
                self.arena,
                self.oracle,
                &self.registry,
                &mut self.dispatcher,
                self.limits,
            );
            match walker.execute() {
                Ok(behavior) => self.registry.publish(behavior),
                Err(error) => {
                    debug!(%error, "method abandoned");
                    aborted += 1;
                }
            }
        }
        AnalysisOutcome {
            issues: self.dispatcher.take_issues(),
            analyzed: methods.len() - aborted,
            aborted,
        }
    }
}
