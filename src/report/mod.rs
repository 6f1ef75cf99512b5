//! Issue reporting — the engine's outbound interface.
//!
//! Checkers report [`Issue`]s into an [`IssueCollector`]; the driver
//! hands the collected set to whatever consumes the analysis. An issue
//! points at the offending tree and may carry flow steps (secondary
//! locations explaining how the state arose).

use std::sync::Arc;

use crate::base::TreeId;

// ============================================================================
// ISSUE TYPES
// ============================================================================

/// Severity level of an issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A secondary location on an issue's explanation path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowStep {
    pub tree: TreeId,
    pub message: Arc<str>,
}

/// One reported finding.
#[derive(Clone, Debug)]
pub struct Issue {
    /// The tree the issue is anchored on.
    pub tree: TreeId,
    /// Stable identity of the reporting checker.
    pub checker: &'static str,
    /// Issue code (e.g. "W0101").
    pub code: &'static str,
    pub severity: Severity,
    pub message: Arc<str>,
    /// Optional flow steps, ordered from cause to report site.
    pub flow: Vec<FlowStep>,
}

impl Issue {
    pub fn warning(
        tree: TreeId,
        checker: &'static str,
        code: &'static str,
        message: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            tree,
            checker,
            code,
            severity: Severity::Warning,
            message: message.into(),
            flow: Vec::new(),
        }
    }

    pub fn with_flow_step(mut self, tree: TreeId, message: impl Into<Arc<str>>) -> Self {
        self.flow.push(FlowStep {
            tree,
            message: message.into(),
        });
        self
    }
}

// ============================================================================
// ISSUE CODES
// ============================================================================

/// Stable codes for the built-in checkers.
///
/// The `W01xx` range is reserved for path-sensitive findings.
pub mod codes {
    /// Condition can only evaluate one way.
    pub const CONDITION_ALWAYS_TRUE: &str = "W0101";
    pub const CONDITION_ALWAYS_FALSE: &str = "W0102";
    /// Null pointer dereference.
    pub const NULL_DEREFERENCE: &str = "W0103";
    /// Resource opened but never closed.
    pub const UNCLOSED_RESOURCE: &str = "W0104";
    /// Lock acquired but never released.
    pub const LOCK_NOT_RELEASED: &str = "W0105";
    /// Null stored into a non-null annotated symbol.
    pub const NONNULL_SET_TO_NULL: &str = "W0106";
    /// Loop without a reachable exit.
    pub const NO_WAY_OUT_LOOP: &str = "W0107";
}

// ============================================================================
// COLLECTOR
// ============================================================================

/// Collects issues during analysis.
#[derive(Clone, Debug, Default)]
pub struct IssueCollector {
    issues: Vec<Issue>,
}

impl IssueCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an issue, dropping exact `(tree, code)` duplicates: the same
    /// finding is frequently rediscovered along sibling paths.
    pub fn add(&mut self, issue: Issue) {
        let duplicate = self
            .issues
            .iter()
            .any(|i| i.tree == issue.tree && i.code == issue.code);
        if !duplicate {
            self.issues.push(issue);
        }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn by_checker(&self, checker: &str) -> Vec<&Issue> {
        self.issues.iter().filter(|i| i.checker == checker).collect()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Take all issues, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Issue> {
        std::mem::take(&mut self.issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_deduplicates_by_tree_and_code() {
        let mut collector = IssueCollector::new();
        let tree = TreeId::new(3);
        collector.add(Issue::warning(tree, "nulls", codes::NULL_DEREFERENCE, "a"));
        collector.add(Issue::warning(tree, "nulls", codes::NULL_DEREFERENCE, "b"));
        collector.add(Issue::warning(
            tree,
            "conditions",
            codes::CONDITION_ALWAYS_TRUE,
            "c",
        ));
        assert_eq!(collector.len(), 2);
    }

    #[test]
    fn test_flow_steps_accumulate() {
        let issue = Issue::warning(TreeId::new(0), "nulls", codes::NULL_DEREFERENCE, "deref")
            .with_flow_step(TreeId::new(1), "assigned null here");
        assert_eq!(issue.flow.len(), 1);
        assert_eq!(issue.flow[0].tree, TreeId::new(1));
    }

    #[test]
    fn test_take_empties_collector() {
        let mut collector = IssueCollector::new();
        collector.add(Issue::warning(
            TreeId::new(0),
            "locks",
            codes::LOCK_NOT_RELEASED,
            "leak",
        ));
        let taken = collector.take();
        assert_eq!(taken.len(), 1);
        assert!(collector.is_empty());
    }
}
