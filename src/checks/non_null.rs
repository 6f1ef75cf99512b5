//! Null stored into a non-null annotated symbol.
//!
//! Fires before assignments and initialized declarations whose target
//! carries a non-null annotation when the stored value is constrained
//! `NULL` on the current path.

use crate::base::{SymbolId, TreeId};
use crate::engine::{Constraint, ConstraintKey, Nullness};
use crate::report::{Issue, codes};
use crate::syntax::TreeKind;

use super::{Checker, CheckerContext};

#[derive(Debug, Default)]
pub struct NonNullSetToNullCheck;

impl NonNullSetToNullCheck {
    pub fn new() -> Self {
        Self
    }

    /// The annotated target of a store, when `tree` is one. The stored
    /// value is on top of the stack in both shapes.
    fn store_target(ctx: &CheckerContext<'_>, tree: TreeId) -> Option<SymbolId> {
        match ctx.env.arena.kind(tree) {
            TreeKind::Assign {
                target: Some(symbol),
            } => Some(*symbol),
            TreeKind::VarDecl {
                symbol,
                initialized: true,
                ..
            } => Some(*symbol),
            _ => None,
        }
    }
}

impl Checker for NonNullSetToNullCheck {
    fn name(&self) -> &'static str {
        "non-null-set-to-null"
    }

    fn pre_statement(&mut self, ctx: &mut CheckerContext<'_>, tree: TreeId) {
        let Some(symbol) = Self::store_target(ctx, tree) else {
            return;
        };
        if !ctx.env.oracle.symbol(symbol).is_nonnull() {
            return;
        }
        let Some(stored) = ctx.state().peek() else {
            return;
        };
        if ctx.state().constraint(stored, ConstraintKey::Nullness)
            == Some(Constraint::Nullness(Nullness::Null))
        {
            let name = ctx.env.oracle.symbol(symbol).name.clone();
            ctx.report(Issue::warning(
                tree,
                "non-null-set-to-null",
                codes::NONNULL_SET_TO_NULL,
                format!("'{name}' is annotated non-null but is assigned null here"),
            ));
        }
    }
}
