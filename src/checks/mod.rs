//! Checker pipeline.
//!
//! Checkers observe the walker through a fixed set of hooks and report
//! issues. The pipeline order is part of the observable contract:
//! safety-critical checkers run first so the constraints they learn
//! (e.g. a dereferenced receiver is not null) precede later decisions.
//! User-supplied checkers append after the built-ins.
//!
//! Checkers must treat path visitation order as arbitrary: the walker's
//! LIFO traversal is not observable, only the within-step checker order
//! is.

mod always_true_false;
mod endless_loop;
mod locks;
mod non_null;
mod null_deref;
mod resources;

pub use always_true_false::AlwaysTrueFalseCheck;
pub use endless_loop::EndlessLoopCheck;
pub use locks::LockedResourceCheck;
pub use non_null::NonNullSetToNullCheck;
pub use null_deref::NullDereferenceCheck;
pub use resources::UnclosedResourceCheck;

use crate::base::{MethodId, TreeId};
use crate::cfg::Cfg;
use crate::engine::{ConstraintManager, KindId, MeetFn, ProgramState};
use crate::report::{Issue, IssueCollector};
use crate::syntax::{SymbolTable, TreeArena};

// ============================================================================
// HOOK CONTEXTS
// ============================================================================

/// Read-only analysis surroundings, shared by every hook.
#[derive(Clone, Copy)]
pub struct AnalysisEnv<'a> {
    pub method: MethodId,
    pub arena: &'a TreeArena,
    pub oracle: &'a SymbolTable,
}

/// Context for `init`, once per method before exploration starts.
pub struct InitContext<'a> {
    pub env: AnalysisEnv<'a>,
    pub cfg: &'a Cfg,
    manager: &'a mut ConstraintManager,
    issues: &'a mut IssueCollector,
}

impl InitContext<'_> {
    /// Register (or re-fetch) a checker-private constraint kind.
    pub fn register_kind(&mut self, name: &'static str, meet: MeetFn) -> KindId {
        self.manager.register_kind(name, meet)
    }

    pub fn report(&mut self, issue: Issue) {
        self.issues.add(issue);
    }
}

/// Context for the per-statement hooks. The checker may replace the
/// current state and may end the path with [`CheckerContext::sink`].
pub struct CheckerContext<'a> {
    pub env: AnalysisEnv<'a>,
    pub manager: &'a ConstraintManager,
    state: ProgramState,
    issues: &'a mut IssueCollector,
    sink: bool,
}

impl CheckerContext<'_> {
    pub fn state(&self) -> &ProgramState {
        &self.state
    }

    pub fn set_state(&mut self, state: ProgramState) {
        self.state = state;
    }

    pub fn report(&mut self, issue: Issue) {
        self.issues.add(issue);
    }

    /// End the current path here. The walker synthesizes an exceptional
    /// outcome and registers a yield.
    pub fn sink(&mut self) {
        self.sink = true;
    }
}

/// Context for `end_of_execution_path`: the final state of one path.
pub struct PathContext<'a> {
    pub env: AnalysisEnv<'a>,
    pub manager: &'a ConstraintManager,
    pub state: &'a ProgramState,
    issues: &'a mut IssueCollector,
}

impl PathContext<'_> {
    pub fn report(&mut self, issue: Issue) {
        self.issues.add(issue);
    }
}

/// Context for the end-of-method hooks.
pub struct EndContext<'a> {
    pub env: AnalysisEnv<'a>,
    issues: &'a mut IssueCollector,
}

impl EndContext<'_> {
    pub fn report(&mut self, issue: Issue) {
        self.issues.add(issue);
    }
}

// ============================================================================
// CHECKER ABI
// ============================================================================

/// A plug-in observing the walker. Every hook has an empty default.
pub trait Checker {
    /// Stable identity, used in issue attribution.
    fn name(&self) -> &'static str;

    /// Once per method, before exploration.
    fn init(&mut self, _ctx: &mut InitContext<'_>) {}

    /// Before an element or terminator is interpreted.
    fn pre_statement(&mut self, _ctx: &mut CheckerContext<'_>, _tree: TreeId) {}

    /// After an element or terminator is interpreted.
    fn post_statement(&mut self, _ctx: &mut CheckerContext<'_>, _tree: TreeId) {}

    /// A condition was split; which sides were feasible.
    fn condition_evaluated(
        &mut self,
        _tree: TreeId,
        _true_feasible: bool,
        _false_feasible: bool,
    ) {
    }

    /// One execution path ended.
    fn end_of_execution_path(&mut self, _ctx: &mut PathContext<'_>) {}

    /// The method's exploration completed normally.
    fn end_of_execution(&mut self, _ctx: &mut EndContext<'_>) {}

    /// The exploration aborted on a bound; accumulated per-method facts
    /// are unreliable and should be discarded.
    fn exception_end_of_execution(&mut self, _ctx: &mut EndContext<'_>) {}
}

// ============================================================================
// DISPATCHER
// ============================================================================

/// Ordered pipeline of checkers plus the issue sink.
#[derive(Default)]
pub struct CheckerDispatcher {
    checkers: Vec<Box<dyn Checker>>,
    issues: IssueCollector,
}

impl CheckerDispatcher {
    /// Empty pipeline, for targeted tests.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in pipeline in its contractual order.
    pub fn with_default_checkers() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.add_checker(Box::new(AlwaysTrueFalseCheck::new()));
        dispatcher.add_checker(Box::new(NullDereferenceCheck::new()));
        dispatcher.add_checker(Box::new(UnclosedResourceCheck::new()));
        dispatcher.add_checker(Box::new(LockedResourceCheck::new()));
        dispatcher.add_checker(Box::new(NonNullSetToNullCheck::new()));
        dispatcher.add_checker(Box::new(EndlessLoopCheck::new()));
        dispatcher
    }

    /// Append a checker; user-supplied checkers run after the
    /// built-ins.
    pub fn add_checker(&mut self, checker: Box<dyn Checker>) {
        self.checkers.push(checker);
    }

    pub fn issues(&self) -> &IssueCollector {
        &self.issues
    }

    pub fn take_issues(&mut self) -> Vec<Issue> {
        self.issues.take()
    }

    pub fn init(
        &mut self,
        env: AnalysisEnv<'_>,
        cfg: &Cfg,
        manager: &mut ConstraintManager,
    ) {
        let mut ctx = InitContext {
            env,
            cfg,
            manager,
            issues: &mut self.issues,
        };
        for checker in &mut self.checkers {
            checker.init(&mut ctx);
        }
    }

    /// Run the pre-statement hooks. Returns the (possibly rewritten)
    /// state and whether any checker requested a sink.
    pub fn pre_statement(
        &mut self,
        env: AnalysisEnv<'_>,
        manager: &ConstraintManager,
        tree: TreeId,
        state: ProgramState,
    ) -> (ProgramState, bool) {
        let mut ctx = CheckerContext {
            env,
            manager,
            state,
            issues: &mut self.issues,
            sink: false,
        };
        for checker in &mut self.checkers {
            checker.pre_statement(&mut ctx, tree);
            if ctx.sink {
                break;
            }
        }
        (ctx.state, ctx.sink)
    }

    pub fn post_statement(
        &mut self,
        env: AnalysisEnv<'_>,
        manager: &ConstraintManager,
        tree: TreeId,
        state: ProgramState,
    ) -> (ProgramState, bool) {
        let mut ctx = CheckerContext {
            env,
            manager,
            state,
            issues: &mut self.issues,
            sink: false,
        };
        for checker in &mut self.checkers {
            checker.post_statement(&mut ctx, tree);
            if ctx.sink {
                break;
            }
        }
        (ctx.state, ctx.sink)
    }

    pub fn condition_evaluated(&mut self, tree: TreeId, true_feasible: bool, false_feasible: bool) {
        for checker in &mut self.checkers {
            checker.condition_evaluated(tree, true_feasible, false_feasible);
        }
    }

    pub fn end_of_execution_path(
        &mut self,
        env: AnalysisEnv<'_>,
        manager: &ConstraintManager,
        state: &ProgramState,
    ) {
        let mut ctx = PathContext {
            env,
            manager,
            state,
            issues: &mut self.issues,
        };
        for checker in &mut self.checkers {
            checker.end_of_execution_path(&mut ctx);
        }
    }

    pub fn end_of_execution(&mut self, env: AnalysisEnv<'_>) {
        let mut ctx = EndContext {
            env,
            issues: &mut self.issues,
        };
        for checker in &mut self.checkers {
            checker.end_of_execution(&mut ctx);
        }
    }

    pub fn exception_end_of_execution(&mut self, env: AnalysisEnv<'_>) {
        let mut ctx = EndContext {
            env,
            issues: &mut self.issues,
        };
        for checker in &mut self.checkers {
            checker.exception_end_of_execution(&mut ctx);
        }
    }
}
