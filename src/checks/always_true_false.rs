//! Conditions that can only evaluate one way.
//!
//! The walker reports which sides of every split condition were
//! feasible; this checker accumulates those verdicts across all paths
//! of a method and reports at the end of the exploration. A condition
//! that never once evaluated to false is always true, and vice versa.
//! Literal conditions never reach this checker (the walker skips them),
//! so `while (true)` is not reported.

use indexmap::IndexMap;

use crate::base::TreeId;
use crate::report::{Issue, codes};

use super::{Checker, EndContext, InitContext};

#[derive(Clone, Copy, Debug, Default)]
struct ConditionEvaluation {
    true_feasible: bool,
    false_feasible: bool,
}

#[derive(Debug, Default)]
pub struct AlwaysTrueFalseCheck {
    /// Verdicts per condition tree, in first-evaluation order so issue
    /// output is deterministic.
    conditions: IndexMap<TreeId, ConditionEvaluation>,
}

impl AlwaysTrueFalseCheck {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Checker for AlwaysTrueFalseCheck {
    fn name(&self) -> &'static str {
        "always-true-false"
    }

    fn init(&mut self, _ctx: &mut InitContext<'_>) {
        self.conditions.clear();
    }

    fn condition_evaluated(&mut self, tree: TreeId, true_feasible: bool, false_feasible: bool) {
        let entry = self.conditions.entry(tree).or_default();
        entry.true_feasible |= true_feasible;
        entry.false_feasible |= false_feasible;
    }

    fn end_of_execution(&mut self, ctx: &mut EndContext<'_>) {
        for (&tree, evaluation) in &self.conditions {
            match (evaluation.true_feasible, evaluation.false_feasible) {
                (true, false) => ctx.report(Issue::warning(
                    tree,
                    "always-true-false",
                    codes::CONDITION_ALWAYS_TRUE,
                    "this condition is always true",
                )),
                (false, true) => ctx.report(Issue::warning(
                    tree,
                    "always-true-false",
                    codes::CONDITION_ALWAYS_FALSE,
                    "this condition is always false",
                )),
                _ => {}
            }
        }
        self.conditions.clear();
    }

    fn exception_end_of_execution(&mut self, _ctx: &mut EndContext<'_>) {
        // the exploration was cut short; one-sided verdicts would be
        // guesses, not facts
        self.conditions.clear();
    }
}
