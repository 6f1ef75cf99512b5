//! Control-flow graph model.
//!
//! The engine consumes CFGs, it does not build them from source: a
//! provider (parser front end, bytecode reader, test fixture) constructs
//! one [`Cfg`] per method through [`CfgBuilder`]. Blocks hold ordered
//! element trees, an optional terminator tree, successor edges with
//! distinguished true/false successors for conditionals, and the
//! finally-block attributes the exit-path logic consumes.

use rustc_hash::FxHashSet;

use crate::base::{BlockId, SymbolId, TreeId};

// ============================================================================
// PROGRAM POINT
// ============================================================================

/// A position inside one method: `(block, index)` where `index` is a
/// zero-based element position, one past the last element for the
/// terminator's post hook, or two past for the terminator's pre hook
/// and block exit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramPoint {
    pub block: BlockId,
    pub index: u32,
}

impl ProgramPoint {
    pub fn new(block: BlockId, index: u32) -> Self {
        Self { block, index }
    }

    /// The first program point of a block.
    pub fn block_entry(block: BlockId) -> Self {
        Self { block, index: 0 }
    }

    pub fn next(self) -> Self {
        Self {
            block: self.block,
            index: self.index + 1,
        }
    }
}

// ============================================================================
// BLOCKS
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct Block {
    pub elements: Vec<TreeId>,
    pub terminator: Option<TreeId>,
    pub successors: Vec<BlockId>,
    pub true_successor: Option<BlockId>,
    pub false_successor: Option<BlockId>,
    /// For finally blocks: the successor taken when control is leaving
    /// the method (exceptional or early-exit route).
    pub exit_successor: Option<BlockId>,
    pub is_finally: bool,
    pub is_method_exit: bool,
    /// Symbols live on exit from this block. `None` when the provider
    /// has no liveness oracle; dead-symbol cleanup is skipped then.
    pub live_out: Option<FxHashSet<SymbolId>>,
}

// ============================================================================
// CFG
// ============================================================================

/// One method's control-flow graph.
#[derive(Clone, Debug)]
pub struct Cfg {
    blocks: Vec<Block>,
    entry: BlockId,
    exit: BlockId,
}

impl Cfg {
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    /// The designated method exit block.
    pub fn exit(&self) -> BlockId {
        self.exit
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.blocks.len() as u32).map(BlockId::new)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Builder used by CFG providers and test fixtures.
#[derive(Debug, Default)]
pub struct CfgBuilder {
    blocks: Vec<Block>,
    entry: Option<BlockId>,
    exit: Option<BlockId>,
}

impl CfgBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_block(&mut self) -> BlockId {
        let id = BlockId::new(self.blocks.len() as u32);
        self.blocks.push(Block::default());
        id
    }

    pub fn entry(&mut self, block: BlockId) -> &mut Self {
        self.entry = Some(block);
        self
    }

    /// Mark `block` as the method exit block. It must keep an empty
    /// successor list.
    pub fn exit(&mut self, block: BlockId) -> &mut Self {
        self.blocks[block.index()].is_method_exit = true;
        self.exit = Some(block);
        self
    }

    pub fn element(&mut self, block: BlockId, tree: TreeId) -> &mut Self {
        self.blocks[block.index()].elements.push(tree);
        self
    }

    pub fn terminator(&mut self, block: BlockId, tree: TreeId) -> &mut Self {
        self.blocks[block.index()].terminator = Some(tree);
        self
    }

    /// Plain successor edge.
    pub fn successor(&mut self, block: BlockId, succ: BlockId) -> &mut Self {
        self.blocks[block.index()].successors.push(succ);
        self
    }

    /// Conditional edges: both successors are recorded and
    /// distinguished.
    pub fn branch(&mut self, block: BlockId, on_true: BlockId, on_false: BlockId) -> &mut Self {
        let b = &mut self.blocks[block.index()];
        b.true_successor = Some(on_true);
        b.false_successor = Some(on_false);
        b.successors.push(on_true);
        b.successors.push(on_false);
        self
    }

    /// Mark `block` as a finally block whose leaving-the-method route
    /// continues at `exit_successor`.
    pub fn finally(&mut self, block: BlockId, exit_successor: BlockId) -> &mut Self {
        let b = &mut self.blocks[block.index()];
        b.is_finally = true;
        b.exit_successor = Some(exit_successor);
        if !b.successors.contains(&exit_successor) {
            b.successors.push(exit_successor);
        }
        self
    }

    pub fn live_out(
        &mut self,
        block: BlockId,
        symbols: impl IntoIterator<Item = SymbolId>,
    ) -> &mut Self {
        self.blocks[block.index()].live_out = Some(symbols.into_iter().collect());
        self
    }

    /// Validate and freeze. Panics on a malformed graph: a CFG is
    /// produced by tooling, not user input, so inconsistency is a bug.
    pub fn finish(self) -> Cfg {
        let entry = self.entry.expect("CFG has no entry block");
        let exit = self.exit.expect("CFG has no exit block");
        let blocks = self.blocks;
        assert!(
            blocks[exit.index()].successors.is_empty(),
            "method exit block must not have successors"
        );
        for (i, block) in blocks.iter().enumerate() {
            for succ in &block.successors {
                assert!(
                    succ.index() < blocks.len(),
                    "block {i} references unknown successor {succ:?}"
                );
            }
        }
        Cfg {
            blocks,
            entry,
            exit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_graph() {
        let mut builder = CfgBuilder::new();
        let b0 = builder.add_block();
        let exit = builder.add_block();
        builder.entry(b0).exit(exit).successor(b0, exit);
        let cfg = builder.finish();

        assert_eq!(cfg.entry(), b0);
        assert_eq!(cfg.exit(), exit);
        assert!(cfg.block(exit).is_method_exit);
        assert_eq!(cfg.block(b0).successors, vec![exit]);
    }

    #[test]
    fn test_branch_records_both_edges() {
        let mut builder = CfgBuilder::new();
        let cond = builder.add_block();
        let then = builder.add_block();
        let exit = builder.add_block();
        builder
            .entry(cond)
            .exit(exit)
            .branch(cond, then, exit)
            .successor(then, exit);
        let cfg = builder.finish();

        let block = cfg.block(cond);
        assert_eq!(block.true_successor, Some(then));
        assert_eq!(block.false_successor, Some(exit));
        assert_eq!(block.successors.len(), 2);
    }

    #[test]
    #[should_panic(expected = "must not have successors")]
    fn test_exit_with_successors_rejected() {
        let mut builder = CfgBuilder::new();
        let b0 = builder.add_block();
        let exit = builder.add_block();
        builder.entry(b0).exit(exit).successor(exit, b0);
        builder.finish();
    }

    #[test]
    fn test_program_point_next() {
        let pp = ProgramPoint::block_entry(BlockId::new(3));
        assert_eq!(pp.next(), ProgramPoint::new(BlockId::new(3), 1));
    }
}
