//! Unclosed resource detection.
//!
//! Creating an object of a resource type marks its value `open` under a
//! checker-private constraint kind; invoking `close()` on it flips the
//! mark to `closed`. Any value still open when an execution path ends
//! is reported at its creation site.

use crate::base::TreeId;
use crate::engine::{Constraint, ConstraintKey, ConstraintKinds, KindId};
use crate::report::{Issue, codes};
use crate::syntax::{Receiver, TreeKind, WellKnown};

use super::{Checker, CheckerContext, InitContext, PathContext};

const OPEN: u8 = 0;
const CLOSED: u8 = 1;

#[derive(Debug, Default)]
pub struct UnclosedResourceCheck {
    kind: Option<KindId>,
}

impl UnclosedResourceCheck {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Checker for UnclosedResourceCheck {
    fn name(&self) -> &'static str {
        "unclosed-resources"
    }

    fn init(&mut self, ctx: &mut InitContext<'_>) {
        self.kind = Some(ctx.register_kind("resource", ConstraintKinds::equal_or_bottom));
    }

    fn post_statement(&mut self, ctx: &mut CheckerContext<'_>, tree: TreeId) {
        let Some(kind) = self.kind else { return };
        let TreeKind::NewObject { class, .. } = ctx.env.arena.kind(tree) else {
            return;
        };
        if !ctx.env.oracle.is_resource_type(class) {
            return;
        }
        // the freshly created value is on top of the stack
        let Some(created) = ctx.state().peek() else {
            return;
        };
        let marked = ctx
            .state()
            .set_constraint(created, Constraint::Custom { kind, value: OPEN });
        ctx.set_state(marked);
    }

    fn pre_statement(&mut self, ctx: &mut CheckerContext<'_>, tree: TreeId) {
        let Some(kind) = self.kind else { return };
        let TreeKind::Invoke {
            method,
            argc,
            receiver: Receiver::Expression,
        } = ctx.env.arena.kind(tree)
        else {
            return;
        };
        if ctx.env.oracle.method(*method).well_known != Some(WellKnown::ResourceClose) {
            return;
        }
        let Some(receiver) = ctx.state().peek_nth(*argc) else {
            return;
        };
        let closed = ctx.state().set_constraint(
            receiver,
            Constraint::Custom {
                kind,
                value: CLOSED,
            },
        );
        ctx.set_state(closed);
    }

    fn end_of_execution_path(&mut self, ctx: &mut PathContext<'_>) {
        let Some(kind) = self.kind else { return };
        for (value, constraint) in ctx.state.values_with_constraint(ConstraintKey::Custom(kind)) {
            if constraint != (Constraint::Custom { kind, value: OPEN }) {
                continue;
            }
            let Some(origin) = ctx.manager.values().origin(value) else {
                continue;
            };
            ctx.report(Issue::warning(
                origin,
                "unclosed-resources",
                codes::UNCLOSED_RESOURCE,
                "this resource is never closed on some execution path",
            ));
        }
    }
}
