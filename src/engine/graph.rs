//! Exploded graph — interned `(program point, state)` nodes.
//!
//! The graph is a cache: enqueuing an already-seen pair maps to the
//! existing node. Interning uses the state's forgetful equality, so
//! paths differing only in consumed operands or visit counts collapse.
//! Re-enqueuing an existing node with the same `exit_path` flag is a
//! no-op — the core state-space deduplication mechanism.

use rustc_hash::FxHashMap;

use crate::cfg::ProgramPoint;

use super::state::ProgramState;

#[derive(Clone, Debug)]
pub struct Node {
    pub point: ProgramPoint,
    pub state: ProgramState,
    pub exit_path: bool,
}

#[derive(Debug, Default)]
pub struct ExplodedGraph {
    nodes: Vec<Node>,
    index: FxHashMap<(ProgramPoint, ProgramState), usize>,
}

impl ExplodedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `(point, state)`. Returns the node index and whether the
    /// node was newly created.
    pub fn node(&mut self, point: ProgramPoint, state: ProgramState) -> (usize, bool) {
        if let Some(&existing) = self.index.get(&(point, state.clone())) {
            return (existing, false);
        }
        let id = self.nodes.len();
        self.nodes.push(Node {
            point,
            state: state.clone(),
            exit_path: false,
        });
        self.index.insert((point, state), id);
        (id, true)
    }

    pub fn get(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    pub fn set_exit_path(&mut self, id: usize, exit_path: bool) {
        self.nodes[id].exit_path = exit_path;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
