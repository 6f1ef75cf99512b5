//! Loops with no way out.
//!
//! A pure CFG check, run once per method at `init`: for every loop
//! whose condition is the literal `true` (or a condition-less `for`),
//! walk the graph from the loop body. If neither the loop's false
//! successor nor the method exit block is reachable — honoring that a
//! literal-true condition only ever takes its true edge — the loop can
//! never terminate.

use rustc_hash::FxHashSet;

use crate::base::BlockId;
use crate::cfg::Cfg;
use crate::report::{Issue, codes};
use crate::syntax::{LiteralKind, TreeArena, TreeKind};

use super::{Checker, InitContext};

#[derive(Debug, Default)]
pub struct EndlessLoopCheck;

impl EndlessLoopCheck {
    pub fn new() -> Self {
        Self
    }

    /// Is `block` the head of a loop that is entered unconditionally?
    fn literal_loop_head(arena: &TreeArena, cfg: &Cfg, block: BlockId) -> bool {
        let b = cfg.block(block);
        let Some(terminator) = b.terminator else {
            return false;
        };
        match arena.kind(terminator) {
            TreeKind::For { condition: false } => true,
            TreeKind::While | TreeKind::DoWhile | TreeKind::For { condition: true } => b
                .elements
                .last()
                .is_some_and(|&tree| {
                    matches!(arena.kind(tree), TreeKind::Literal(LiteralKind::Bool(true)))
                }),
            _ => false,
        }
    }

    /// Can control starting in the loop body leave the method? Heads of
    /// literal-true loops only follow their true edge.
    fn escapes(arena: &TreeArena, cfg: &Cfg, head: BlockId) -> bool {
        let body = cfg
            .block(head)
            .true_successor
            .or_else(|| cfg.block(head).successors.first().copied());
        let Some(body) = body else {
            return true;
        };
        let loop_exit = cfg.block(head).false_successor;

        let mut seen: FxHashSet<BlockId> = FxHashSet::default();
        let mut pending = vec![body];
        while let Some(block) = pending.pop() {
            if !seen.insert(block) {
                continue;
            }
            if Some(block) == loop_exit || block == cfg.exit() {
                return true;
            }
            let b = cfg.block(block);
            if Self::literal_loop_head(arena, cfg, block) {
                if let Some(next) = b.true_successor.or_else(|| b.successors.first().copied()) {
                    pending.push(next);
                }
            } else {
                pending.extend(b.successors.iter().copied());
            }
        }
        false
    }
}

impl Checker for EndlessLoopCheck {
    fn name(&self) -> &'static str {
        "no-way-out-loop"
    }

    fn init(&mut self, ctx: &mut InitContext<'_>) {
        let cfg = ctx.cfg;
        let arena = ctx.env.arena;
        let heads: Vec<BlockId> = cfg
            .block_ids()
            .filter(|&b| Self::literal_loop_head(arena, cfg, b))
            .filter(|&b| !Self::escapes(arena, cfg, b))
            .collect();
        for head in heads {
            let terminator = cfg
                .block(head)
                .terminator
                .expect("loop head has a terminator");
            ctx.report(Issue::warning(
                terminator,
                "no-way-out-loop",
                codes::NO_WAY_OUT_LOOP,
                "this loop has no reachable exit",
            ));
        }
    }
}
