//! Locks acquired but not released.
//!
//! `lock()` on a lock-typed receiver marks its value `held`;
//! `unlock()` releases it. A value still held when an execution path
//! ends is reported at the acquisition site.

use rustc_hash::FxHashMap;

use crate::base::TreeId;
use crate::engine::{Constraint, ConstraintKey, ConstraintKinds, KindId, ValueId};
use crate::report::{Issue, codes};
use crate::syntax::{Receiver, TreeKind, WellKnown};

use super::{Checker, CheckerContext, InitContext, PathContext};

const HELD: u8 = 0;
const RELEASED: u8 = 1;

#[derive(Debug, Default)]
pub struct LockedResourceCheck {
    kind: Option<KindId>,
    /// Acquisition site per value, the report anchor when a held value
    /// has no creation tree.
    acquire_sites: FxHashMap<ValueId, TreeId>,
}

impl LockedResourceCheck {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Checker for LockedResourceCheck {
    fn name(&self) -> &'static str {
        "locks-not-unlocked"
    }

    fn init(&mut self, ctx: &mut InitContext<'_>) {
        self.kind = Some(ctx.register_kind("lock", ConstraintKinds::equal_or_bottom));
        self.acquire_sites.clear();
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
        let transition = match ctx.env.oracle.method(*method).well_known {
            Some(WellKnown::LockAcquire) => HELD,
            Some(WellKnown::LockRelease) => RELEASED,
            _ => return,
        };
        let Some(receiver) = ctx.state().peek_nth(*argc) else {
            return;
        };
        if transition == HELD {
            self.acquire_sites.insert(receiver, tree);
        }
        let updated = ctx.state().set_constraint(
            receiver,
            Constraint::Custom {
                kind,
                value: transition,
            },
        );
        ctx.set_state(updated);
    }

    fn end_of_execution_path(&mut self, ctx: &mut PathContext<'_>) {
        let Some(kind) = self.kind else { return };
        for (value, constraint) in ctx.state.values_with_constraint(ConstraintKey::Custom(kind)) {
            if constraint != (Constraint::Custom { kind, value: HELD }) {
                continue;
            }
            let anchor = ctx
                .manager
                .values()
                .origin(value)
                .or_else(|| self.acquire_sites.get(&value).copied());
            let Some(anchor) = anchor else { continue };
            ctx.report(Issue::warning(
                anchor,
                "locks-not-unlocked",
                codes::LOCK_NOT_RELEASED,
                "this lock is not released on some execution path",
            ));
        }
    }
}
