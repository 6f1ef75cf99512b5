//! Null dereference detection.
//!
//! Fires before field reads, array accesses, and explicit-receiver
//! invocations: a receiver constrained `NULL` is reported and the path
//! is sunk (the walker synthesizes a `NullPointerException` outcome).
//! An unconstrained receiver that survives the dereference is learned
//! `NOT_NULL`, so a later `x == null` comparison evaluates one-sided.

use crate::base::TreeId;
use crate::engine::{Constraint, ConstraintKey, Nullness, ValueId};
use crate::report::{Issue, codes};
use crate::syntax::{Receiver, TreeKind};

use super::{Checker, CheckerContext};

#[derive(Debug, Default)]
pub struct NullDereferenceCheck;

impl NullDereferenceCheck {
    pub fn new() -> Self {
        Self
    }

    /// Stack depth of the dereferenced receiver for `tree`, when the
    /// element dereferences one.
    fn receiver_depth(ctx: &CheckerContext<'_>, tree: TreeId) -> Option<usize> {
        match ctx.env.arena.kind(tree) {
            TreeKind::MemberSelect {
                class_literal: false,
            } => Some(0),
            TreeKind::ArrayAccess => Some(1),
            TreeKind::Invoke {
                argc,
                receiver: Receiver::Expression,
                ..
            } => Some(*argc),
            _ => None,
        }
    }

    fn describe(ctx: &CheckerContext<'_>, value: ValueId) -> String {
        let named = ctx
            .manager
            .values()
            .origin(value)
            .and_then(|origin| match ctx.env.arena.kind(origin) {
                TreeKind::Identifier(symbol) => {
                    Some(ctx.env.oracle.symbol(*symbol).name.clone())
                }
                _ => None,
            });
        match named {
            Some(name) => format!("'{name}' can only be null here"),
            None => "the dereferenced value can only be null here".to_string(),
        }
    }
}

impl Checker for NullDereferenceCheck {
    fn name(&self) -> &'static str {
        "null-dereference"
    }

    fn pre_statement(&mut self, ctx: &mut CheckerContext<'_>, tree: TreeId) {
        let Some(depth) = Self::receiver_depth(ctx, tree) else {
            return;
        };
        let Some(receiver) = ctx.state().peek_nth(depth) else {
            return;
        };
        match ctx.state().constraint(receiver, ConstraintKey::Nullness) {
            Some(Constraint::Nullness(Nullness::Null)) => {
                let message = format!(
                    "null pointer dereference: {}",
                    Self::describe(ctx, receiver)
                );
                let mut issue =
                    Issue::warning(tree, "null-dereference", codes::NULL_DEREFERENCE, message);
                if let Some(origin) = ctx.manager.values().origin(receiver) {
                    issue = issue.with_flow_step(origin, "this value is null");
                }
                ctx.report(issue);
                ctx.sink();
            }
            Some(_) => {}
            None => {
                // the dereference succeeded on this path, so the
                // receiver cannot have been null
                if let Some(learned) =
                    ctx.state()
                        .add_constraint(receiver, Constraint::NOT_NULL, ctx.manager.kinds())
                {
                    ctx.set_state(learned);
                }
            }
        }
    }
}
