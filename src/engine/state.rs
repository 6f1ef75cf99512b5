//! Program state — an immutable snapshot of one execution path.
//!
//! Four fields: symbol bindings, per-value constraints, the operand
//! stack, and the visit-count map. Every operation returns a new state;
//! bindings and constraints are `Arc`-shared maps cloned only on write,
//! the stack and visit map are persistent structures sharing tails.
//!
//! Equality and hashing are deliberately forgetful: two states compare
//! equal when their bindings, constraints, and top-of-stack agree —
//! already-consumed operands and visit counts are ignored. This is the
//! engine's main state-space reducer: paths that differ only in dead
//! stack slots collapse to one exploded-graph node.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet, FxHasher};

use crate::base::{PMap, PStack, SymbolId};
use crate::cfg::ProgramPoint;
use crate::syntax::SymbolTable;

use super::constraint::{Constraint, ConstraintKey, ConstraintKinds};
use super::value::{ValueId, ValueTable};

/// Constraints of one value, sorted by key, never empty when stored.
type ConstraintCell = Vec<(ConstraintKey, Constraint)>;

#[derive(Clone, Debug, Default)]
pub struct ProgramState {
    bindings: Arc<FxHashMap<SymbolId, ValueId>>,
    constraints: Arc<FxHashMap<ValueId, ConstraintCell>>,
    stack: PStack<ValueId>,
    visits: PMap<ProgramPoint, u32>,
}

/// Intrinsic constraints of the three singletons (always present, never
/// stored).
fn intrinsic(value: ValueId, key: ConstraintKey) -> Option<Constraint> {
    match (value, key) {
        (ValueId::NULL, ConstraintKey::Nullness) => Some(Constraint::NULL),
        (ValueId::TRUE, ConstraintKey::Boolean) => Some(Constraint::TRUE),
        (ValueId::FALSE, ConstraintKey::Boolean) => Some(Constraint::FALSE),
        _ => None,
    }
}

impl ProgramState {
    pub fn empty() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Operand stack
    // ------------------------------------------------------------------

    /// Push `value` on the operand stack.
    pub fn stack_value(&self, value: ValueId) -> Self {
        Self {
            stack: self.stack.push(value),
            ..self.clone()
        }
    }

    /// Pop `n` values, top-first.
    ///
    /// Panics when the stack holds fewer than `n` values: the CFG
    /// promised operands that were never produced, which is a
    /// programming bug, not a recoverable condition.
    pub fn unstack(&self, n: usize) -> (Self, Vec<ValueId>) {
        let mut stack = self.stack.clone();
        let mut popped = Vec::with_capacity(n);
        for _ in 0..n {
            let (top, rest) = stack
                .pop()
                .unwrap_or_else(|| panic!("operand stack underflow: needed {n} values"));
            popped.push(top);
            stack = rest;
        }
        (
            Self {
                stack,
                ..self.clone()
            },
            popped,
        )
    }

    /// Non-mutating top of stack.
    pub fn peek(&self) -> Option<ValueId> {
        self.stack.peek().copied()
    }

    /// Value at depth `n` (0 = top).
    pub fn peek_nth(&self, n: usize) -> Option<ValueId> {
        self.stack.iter().nth(n).copied()
    }

    /// Empty the operand stack (after expression statements).
    pub fn clear_stack(&self) -> Self {
        Self {
            stack: PStack::new(),
            ..self.clone()
        }
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    // ------------------------------------------------------------------
    // Bindings
    // ------------------------------------------------------------------

    /// Bind `symbol` to `value`. Returns a cheap clone when the binding
    /// is already in place.
    pub fn put(&self, symbol: SymbolId, value: ValueId) -> Self {
        if self.bindings.get(&symbol) == Some(&value) {
            return self.clone();
        }
        let mut bindings = (*self.bindings).clone();
        bindings.insert(symbol, value);
        Self {
            bindings: Arc::new(bindings),
            ..self.clone()
        }
    }

    pub fn get(&self, symbol: SymbolId) -> Option<ValueId> {
        self.bindings.get(&symbol).copied()
    }

    pub fn bindings(&self) -> impl Iterator<Item = (SymbolId, ValueId)> + '_ {
        self.bindings.iter().map(|(&s, &v)| (s, v))
    }

    // ------------------------------------------------------------------
    // Constraints
    // ------------------------------------------------------------------

    /// The constraint stored (or intrinsic) for `value` under `key`.
    pub fn constraint(&self, value: ValueId, key: ConstraintKey) -> Option<Constraint> {
        if let Some(c) = intrinsic(value, key) {
            return Some(c);
        }
        let cell = self.constraints.get(&value)?;
        cell.binary_search_by_key(&key, |(k, _)| *k)
            .ok()
            .map(|i| cell[i].1)
    }

    /// All constraints of `value`, intrinsics included.
    pub fn constraints_of(&self, value: ValueId) -> Vec<Constraint> {
        let mut out = Vec::new();
        if let Some(c) = intrinsic(value, ConstraintKey::Nullness) {
            out.push(c);
        }
        if let Some(c) = intrinsic(value, ConstraintKey::Boolean) {
            out.push(c);
        }
        if let Some(cell) = self.constraints.get(&value) {
            out.extend(cell.iter().map(|(_, c)| *c));
        }
        out
    }

    /// Meet `constraint` into the value's cell. `None` when the meet is
    /// bottom (state infeasible); a cheap clone when the constraint is
    /// already entailed.
    pub fn add_constraint(
        &self,
        value: ValueId,
        constraint: Constraint,
        kinds: &ConstraintKinds,
    ) -> Option<Self> {
        let key = constraint.key();
        let merged = match self.constraint(value, key) {
            Some(existing) => {
                let met = kinds.meet(existing, constraint)?;
                if met == existing {
                    return Some(self.clone());
                }
                met
            }
            None => constraint,
        };
        Some(self.store_constraint(value, key, merged))
    }

    /// Overwrite the value's constraint under the constraint's key.
    /// Used for checker state transitions (open → closed), which are
    /// reassignments, not refinements.
    pub fn set_constraint(&self, value: ValueId, constraint: Constraint) -> Self {
        self.store_constraint(value, constraint.key(), constraint)
    }

    fn store_constraint(&self, value: ValueId, key: ConstraintKey, constraint: Constraint) -> Self {
        let mut constraints = (*self.constraints).clone();
        let cell = constraints.entry(value).or_default();
        match cell.binary_search_by_key(&key, |(k, _)| *k) {
            Ok(i) => cell[i].1 = constraint,
            Err(i) => cell.insert(i, (key, constraint)),
        }
        Self {
            constraints: Arc::new(constraints),
            ..self.clone()
        }
    }

    /// Number of values carrying at least one constraint. Consulted by
    /// the oversize guard.
    pub fn constraints_size(&self) -> usize {
        self.constraints.len()
    }

    /// Every value currently carrying a constraint under `key`.
    /// Iteration order is arbitrary.
    pub fn values_with_constraint(&self, key: ConstraintKey) -> Vec<(ValueId, Constraint)> {
        self.constraints
            .iter()
            .filter_map(|(&value, cell)| {
                cell.binary_search_by_key(&key, |(k, _)| *k)
                    .ok()
                    .map(|i| (value, cell[i].1))
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Heap effects
    // ------------------------------------------------------------------

    /// Forget everything known about fields: each field binding is
    /// replaced with a fresh unconstrained value. Invoked on local
    /// calls and synchronized blocks.
    pub fn reset_field_values(&self, values: &mut ValueTable, oracle: &SymbolTable) -> Self {
        let fields: Vec<SymbolId> = self
            .bindings
            .keys()
            .copied()
            .filter(|&s| oracle.is_field(s))
            .collect();
        if fields.is_empty() {
            return self.clone();
        }
        let mut bindings = (*self.bindings).clone();
        for symbol in fields {
            bindings.insert(
                symbol,
                values.fresh(super::value::ValueKind::Plain, Vec::new(), None),
            );
        }
        Self {
            bindings: Arc::new(bindings),
            ..self.clone()
        }
    }

    // ------------------------------------------------------------------
    // Cleanup
    // ------------------------------------------------------------------

    /// Drop bindings for symbols outside `keep` (the block's live-out
    /// set united with the method behavior's interface symbols).
    pub fn cleanup_dead_symbols(&self, keep: &FxHashSet<SymbolId>) -> Self {
        if self.bindings.keys().all(|s| keep.contains(s)) {
            return self.clone();
        }
        let bindings: FxHashMap<SymbolId, ValueId> = self
            .bindings
            .iter()
            .filter(|(s, _)| keep.contains(s))
            .map(|(&s, &v)| (s, v))
            .collect();
        Self {
            bindings: Arc::new(bindings),
            ..self.clone()
        }
    }

    /// Drop constraints on values no longer reachable from bindings or
    /// stack through the computed-from relation.
    pub fn cleanup_constraints(&self, values: &ValueTable) -> Self {
        let mut reachable: FxHashSet<ValueId> = FxHashSet::default();
        let mut pending: Vec<ValueId> = self
            .bindings
            .values()
            .copied()
            .chain(self.stack.iter().copied())
            .collect();
        while let Some(v) = pending.pop() {
            if reachable.insert(v) {
                pending.extend_from_slice(values.operands(v));
            }
        }
        if self.constraints.keys().all(|v| reachable.contains(v)) {
            return self.clone();
        }
        let constraints: FxHashMap<ValueId, ConstraintCell> = self
            .constraints
            .iter()
            .filter(|(v, _)| reachable.contains(v))
            .map(|(&v, cell)| (v, cell.clone()))
            .collect();
        Self {
            constraints: Arc::new(constraints),
            ..self.clone()
        }
    }

    // ------------------------------------------------------------------
    // Visit counts
    // ------------------------------------------------------------------

    pub fn visited_point(&self, point: ProgramPoint, count: u32) -> Self {
        Self {
            visits: self.visits.insert(point, count),
            ..self.clone()
        }
    }

    pub fn times_visited(&self, point: ProgramPoint) -> u32 {
        self.visits.get(point).unwrap_or(0)
    }
}

// ============================================================================
// FORGETFUL EQUALITY
// ============================================================================

fn entry_hash<K: Hash, V: Hash>(key: &K, value: &V) -> u64 {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    value.hash(&mut hasher);
    hasher.finish()
}

/// Commutative combine over unordered map entries.
fn map_hash<K: Hash, V: Hash>(map: &FxHashMap<K, V>) -> u64 {
    map.iter()
        .fold(0u64, |acc, (k, v)| acc.wrapping_add(entry_hash(k, v)))
}

impl PartialEq for ProgramState {
    fn eq(&self, other: &Self) -> bool {
        self.peek() == other.peek()
            && (Arc::ptr_eq(&self.bindings, &other.bindings)
                || *self.bindings == *other.bindings)
            && (Arc::ptr_eq(&self.constraints, &other.constraints)
                || *self.constraints == *other.constraints)
    }
}

impl Eq for ProgramState {}

impl Hash for ProgramState {
    fn hash<H: Hasher>(&self, hasher: &mut H) {
        self.peek().hash(hasher);
        map_hash(&self.bindings).hash(hasher);
        map_hash(&self.constraints).hash(hasher);
    }
}
