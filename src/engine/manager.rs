//! Constraint manager — value minting and the `assume_dual` primitive.
//!
//! Splitting lives here rather than in the walker: the walker's branch
//! handler stays uniform, and checker-registered constraints branch
//! through the same machinery. Asserting a boolean constraint on a
//! composite value refines its operands recursively; `&`/`|`/`^`
//! assertions may split one state into several, bounded by a per-assume
//! budget.

use crate::base::{Name, TreeId};
use crate::syntax::{BinaryOp, UnaryOp};

use super::constraint::{Constraint, ConstraintKey, ConstraintKinds, KindId, MeetFn, Nullness};
use super::state::ProgramState;
use super::value::{ValueId, ValueKind, ValueTable};

/// Raised when nested boolean expressions split past the configured
/// budget. The walker converts it into an oversize abort.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NestedBooleanOverflow;

/// Counts states produced by boolean splitting during one assume.
#[derive(Debug)]
pub struct BooleanBudget {
    produced: usize,
    limit: usize,
}

impl BooleanBudget {
    pub fn new(limit: usize) -> Self {
        Self { produced: 0, limit }
    }

    fn charge(&mut self, states: usize) -> Result<(), NestedBooleanOverflow> {
        self.produced += states;
        if self.produced > self.limit {
            Err(NestedBooleanOverflow)
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// MANAGER
// ============================================================================

#[derive(Debug, Default)]
pub struct ConstraintManager {
    values: ValueTable,
    kinds: ConstraintKinds,
}

impl ConstraintManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> &ValueTable {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut ValueTable {
        &mut self.values
    }

    pub fn kinds(&self) -> &ConstraintKinds {
        &self.kinds
    }

    pub fn register_kind(&mut self, name: impl Into<Name>, meet: MeetFn) -> KindId {
        self.kinds.register(name, meet)
    }

    // ------------------------------------------------------------------
    // Value creation
    // ------------------------------------------------------------------

    pub fn fresh(&mut self, origin: Option<TreeId>) -> ValueId {
        self.values.fresh(ValueKind::Plain, Vec::new(), origin)
    }

    /// A plain fresh value carrying computed-from provenance
    /// (increments, compound assignments).
    pub fn fresh_computed(&mut self, operands: Vec<ValueId>, origin: Option<TreeId>) -> ValueId {
        self.values.fresh(ValueKind::Plain, operands, origin)
    }

    /// Mint the value of a binary expression. Equality operators become
    /// relational values; `&`/`|`/`^` become boolean-composite values
    /// (only boolean contexts ever assert boolean constraints on them);
    /// everything else is a plain value with operand provenance.
    pub fn create_binary(
        &mut self,
        op: BinaryOp,
        lhs: ValueId,
        rhs: ValueId,
        origin: TreeId,
    ) -> ValueId {
        let kind = match op {
            BinaryOp::Equal => ValueKind::Equality {
                negated: false,
                lhs,
                rhs,
            },
            BinaryOp::NotEqual => ValueKind::Equality {
                negated: true,
                lhs,
                rhs,
            },
            BinaryOp::BitAnd => ValueKind::BoolAnd { lhs, rhs },
            BinaryOp::BitOr => ValueKind::BoolOr { lhs, rhs },
            BinaryOp::BitXor => ValueKind::BoolXor { lhs, rhs },
            _ => ValueKind::Plain,
        };
        self.values.fresh(kind, vec![lhs, rhs], Some(origin))
    }

    pub fn create_unary(&mut self, op: UnaryOp, operand: ValueId, origin: TreeId) -> ValueId {
        let kind = match op {
            UnaryOp::Not => ValueKind::Not { operand },
            _ => ValueKind::Plain,
        };
        self.values.fresh(kind, vec![operand], Some(origin))
    }

    pub fn create_instance_of(&mut self, operand: ValueId, origin: TreeId) -> ValueId {
        self.values
            .fresh(ValueKind::InstanceOf { operand }, vec![operand], Some(origin))
    }

    /// A dedicated value carrying a thrown exception type; the walker
    /// detects it on top of the stack to start exceptional propagation.
    pub fn create_exception(&mut self, thrown: Option<Name>, origin: Option<TreeId>) -> ValueId {
        self.values
            .fresh(ValueKind::Exception { thrown }, Vec::new(), origin)
    }

    // ------------------------------------------------------------------
    // Constraint propagation
    // ------------------------------------------------------------------

    /// Assert `constraint` on `value`, refining operands of composite
    /// values. Returns every feasible successor state: empty when the
    /// assertion contradicts the state, one state in the common case,
    /// several when a boolean composite admits alternatives.
    ///
    /// Idempotent and monotonic: an entailed assertion returns the
    /// input state unchanged.
    pub fn set_constraint(
        &self,
        state: &ProgramState,
        value: ValueId,
        constraint: Constraint,
        budget: &mut BooleanBudget,
    ) -> Result<Vec<ProgramState>, NestedBooleanOverflow> {
        // record the fact on the value itself first; bottom here means
        // the whole assertion is infeasible
        let Some(state) = state.add_constraint(value, constraint, &self.kinds) else {
            return Ok(Vec::new());
        };

        let Constraint::Boolean(truth) = constraint else {
            return Ok(vec![state]);
        };

        match self.values.kind(value).clone() {
            ValueKind::Plain | ValueKind::Exception { .. } => Ok(vec![state]),
            ValueKind::Not { operand } => {
                self.set_constraint(&state, operand, Constraint::Boolean(!truth), budget)
            }
            ValueKind::Equality { negated, lhs, rhs } => {
                if truth != negated {
                    self.unify(&state, lhs, rhs, budget)
                } else {
                    self.distinguish(&state, lhs, rhs, budget)
                }
            }
            ValueKind::BoolAnd { lhs, rhs } => {
                if truth {
                    self.assert_pair(&state, lhs, rhs, &[(true, true)], budget)
                } else {
                    self.assert_pair(
                        &state,
                        lhs,
                        rhs,
                        &[(false, true), (true, false), (false, false)],
                        budget,
                    )
                }
            }
            ValueKind::BoolOr { lhs, rhs } => {
                if truth {
                    self.assert_pair(
                        &state,
                        lhs,
                        rhs,
                        &[(true, false), (false, true), (true, true)],
                        budget,
                    )
                } else {
                    self.assert_pair(&state, lhs, rhs, &[(false, false)], budget)
                }
            }
            ValueKind::BoolXor { lhs, rhs } => {
                let combos: &[(bool, bool)] = if truth {
                    &[(true, false), (false, true)]
                } else {
                    &[(true, true), (false, false)]
                };
                self.assert_pair(&state, lhs, rhs, combos, budget)
            }
            ValueKind::InstanceOf { operand } => {
                if truth {
                    // a successful instanceof implies a non-null operand
                    Ok(state
                        .add_constraint(operand, Constraint::NOT_NULL, &self.kinds)
                        .into_iter()
                        .collect())
                } else {
                    Ok(vec![state])
                }
            }
        }
    }

    /// `set_constraint` for callers that know no branching can occur
    /// (fresh values, object creation). Panics on contradiction: the
    /// caller asserted an impossibility, which is a bug.
    pub fn set_single_constraint(
        &self,
        state: &ProgramState,
        value: ValueId,
        constraint: Constraint,
    ) -> ProgramState {
        state
            .add_constraint(value, constraint, &self.kinds)
            .unwrap_or_else(|| {
                panic!("single-constraint assertion contradicted the state: {constraint:?}")
            })
    }

    /// Assert each truth combination on `(lhs, rhs)`, keeping the
    /// feasible outcomes.
    fn assert_pair(
        &self,
        state: &ProgramState,
        lhs: ValueId,
        rhs: ValueId,
        combos: &[(bool, bool)],
        budget: &mut BooleanBudget,
    ) -> Result<Vec<ProgramState>, NestedBooleanOverflow> {
        let mut out = Vec::new();
        for &(l, r) in combos {
            for s in self.set_constraint(state, lhs, Constraint::Boolean(l), budget)? {
                let states = self.set_constraint(&s, rhs, Constraint::Boolean(r), budget)?;
                budget.charge(states.len())?;
                out.extend(states);
            }
        }
        Ok(out)
    }

    /// Equality holds: both operands satisfy the meet of their
    /// constraint sets, propagated through composites.
    fn unify(
        &self,
        state: &ProgramState,
        lhs: ValueId,
        rhs: ValueId,
        budget: &mut BooleanBudget,
    ) -> Result<Vec<ProgramState>, NestedBooleanOverflow> {
        if lhs == rhs {
            return Ok(vec![state.clone()]);
        }
        let mut shared: Vec<Constraint> = state.constraints_of(lhs);
        for c in state.constraints_of(rhs) {
            if !shared.iter().any(|s| s.key() == c.key()) {
                shared.push(c);
            }
        }
        let mut states = vec![state.clone()];
        for constraint in shared {
            let mut next = Vec::new();
            for s in &states {
                for refined in self.set_constraint(s, lhs, constraint, budget)? {
                    next.extend(self.set_constraint(&refined, rhs, constraint, budget)?);
                }
            }
            if next.is_empty() {
                return Ok(Vec::new());
            }
            states = next;
        }
        Ok(states)
    }

    /// Equality fails: identical values are infeasible, a null operand
    /// implies the other is not null, a known boolean operand implies
    /// the other's negation.
    fn distinguish(
        &self,
        state: &ProgramState,
        lhs: ValueId,
        rhs: ValueId,
        budget: &mut BooleanBudget,
    ) -> Result<Vec<ProgramState>, NestedBooleanOverflow> {
        if lhs == rhs {
            return Ok(Vec::new());
        }
        let mut states = vec![state.clone()];
        let null_of = |s: &ProgramState, v: ValueId| s.constraint(v, ConstraintKey::Nullness);
        for (a, b) in [(lhs, rhs), (rhs, lhs)] {
            let mut next = Vec::new();
            for s in &states {
                if null_of(s, a) == Some(Constraint::Nullness(Nullness::Null)) {
                    next.extend(self.set_constraint(s, b, Constraint::NOT_NULL, budget)?);
                } else if let Some(Constraint::Boolean(truth)) =
                    s.constraint(a, ConstraintKey::Boolean)
                {
                    next.extend(self.set_constraint(s, b, Constraint::Boolean(!truth), budget)?);
                } else {
                    next.push(s.clone());
                }
            }
            states = next;
            if states.is_empty() {
                break;
            }
        }
        Ok(states)
    }

    // ------------------------------------------------------------------
    // Assume
    // ------------------------------------------------------------------

    /// Split `state` on its top-of-stack condition: pop it, assert it
    /// false for the first returned set and true for the second. Either
    /// set may be empty (that side of the branch is infeasible).
    pub fn assume_dual(
        &self,
        state: &ProgramState,
        budget_limit: usize,
    ) -> Result<(Vec<ProgramState>, Vec<ProgramState>), NestedBooleanOverflow> {
        let (popped, values) = state.unstack(1);
        let condition = values[0];
        let mut budget = BooleanBudget::new(budget_limit);
        let false_states =
            self.set_constraint(&popped, condition, Constraint::FALSE, &mut budget)?;
        let true_states = self.set_constraint(&popped, condition, Constraint::TRUE, &mut budget)?;
        Ok((false_states, true_states))
    }

    /// Non-destructive feasibility probe of `value` in `state`. Returns
    /// `(false_feasible, true_feasible)`.
    pub fn probe_dual(
        &self,
        state: &ProgramState,
        value: ValueId,
        budget_limit: usize,
    ) -> Result<(bool, bool), NestedBooleanOverflow> {
        let mut budget = BooleanBudget::new(budget_limit);
        let false_states = self.set_constraint(state, value, Constraint::FALSE, &mut budget)?;
        let true_states = self.set_constraint(state, value, Constraint::TRUE, &mut budget)?;
        Ok((!false_states.is_empty(), !true_states.is_empty()))
    }
}
