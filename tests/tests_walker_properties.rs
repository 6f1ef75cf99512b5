//! Property tests for the engine's quantified invariants: termination
//! on arbitrary branchy CFGs, state immutability, forgetful equality,
//! branch completeness, and cleanup transparency.

mod helpers;

use std::hash::{Hash, Hasher};

use helpers::Fixture;
use proptest::prelude::*;
use sedge::base::SymbolId;
use sedge::cfg::CfgBuilder;
use sedge::driver::{Analyzer, MethodBody};
use sedge::engine::{Constraint, ConstraintKey, ConstraintManager, ProgramState};
use sedge::syntax::TreeKind;

fn state_hash(state: &ProgramState) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    state.hash(&mut hasher);
    hasher.finish()
}

// ============================================================================
// TERMINATION (P1)
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Chains of conditional blocks with arbitrary back edges explore
    /// to completion without tripping any bound.
    #[test]
    fn prop_branchy_cfgs_terminate(back_targets in proptest::collection::vec(0usize..8, 1..7)) {
        let mut fx = Fixture::new();
        let method = fx.void_method("f", back_targets.len());

        let mut parameters = Vec::new();
        let mut conditions = Vec::new();
        let mut terminators = Vec::new();
        for i in 0..back_targets.len() {
            let p = fx.boolean_param(&format!("p{i}"));
            parameters.push(p);
            conditions.push(fx.ident(p));
            terminators.push(fx.terminator(TreeKind::If));
        }

        let mut cfg = CfgBuilder::new();
        let blocks: Vec<_> = (0..back_targets.len()).map(|_| cfg.add_block()).collect();
        let exit = cfg.add_block();
        cfg.entry(blocks[0]).exit(exit);
        for (i, &block) in blocks.iter().enumerate() {
            cfg.element(block, conditions[i]).terminator(block, terminators[i]);
            let next = blocks.get(i + 1).copied().unwrap_or(exit);
            // the false edge may jump back to any earlier block,
            // closing a loop
            let back = blocks[back_targets[i] % (i + 1)];
            cfg.branch(block, next, back);
        }

        let mut analyzer = Analyzer::new(&fx.arena, &fx.oracle);
        let outcome = analyzer.analyze(&[MethodBody {
            method,
            parameters,
            cfg: cfg.finish(),
        }]);

        prop_assert_eq!(outcome.aborted, 0);
    }
}

// ============================================================================
// STATE ALGEBRA (P3, P4, P7)
// ============================================================================

proptest! {
    /// Every state-transforming operation leaves the input state equal
    /// to a snapshot taken before the call.
    #[test]
    fn prop_state_operations_are_immutable(op in 0usize..4, symbol in 0u32..4) {
        let mut cm = ConstraintManager::new();
        let v = cm.fresh(None);
        let base = ProgramState::empty()
            .put(SymbolId::new(symbol), v)
            .stack_value(v);
        let snapshot = base.clone();

        match op {
            0 => { let _ = base.stack_value(v); }
            1 => { let _ = base.unstack(1); }
            2 => { let _ = base.put(SymbolId::new(symbol + 1), v); }
            3 => { let _ = base.add_constraint(v, Constraint::NOT_NULL, cm.kinds()); }
            _ => unreachable!(),
        }

        prop_assert_eq!(base, snapshot);
    }

    /// Equality and hashing ignore consumed stack slots and visit
    /// counts; they observe bindings, constraints, and the top value.
    #[test]
    fn prop_equality_is_forgetful(junk_depth in 0usize..5) {
        let mut cm = ConstraintManager::new();
        let top = cm.fresh(None);
        let junk: Vec<_> = (0..junk_depth).map(|_| cm.fresh(None)).collect();

        let mut deep = ProgramState::empty();
        for &j in &junk {
            deep = deep.stack_value(j);
        }
        let deep = deep.stack_value(top);
        let shallow = ProgramState::empty().stack_value(top);

        prop_assert_eq!(&deep, &shallow);
        prop_assert_eq!(state_hash(&deep), state_hash(&shallow));
    }

    /// Asserting an already-entailed constraint returns an equal state
    /// (idempotence half of the set-constraint contract).
    #[test]
    fn prop_add_constraint_is_idempotent(not_null in proptest::bool::ANY) {
        let mut cm = ConstraintManager::new();
        let v = cm.fresh(None);
        let constraint = if not_null { Constraint::NOT_NULL } else { Constraint::NULL };

        let once = ProgramState::empty()
            .add_constraint(v, constraint, cm.kinds())
            .expect("first assertion is feasible");
        let twice = once
            .add_constraint(v, constraint, cm.kinds())
            .expect("entailed assertion is feasible");

        prop_assert_eq!(once, twice);
    }

    /// Cleanup drops only what is unobservable: live bindings and the
    /// constraints of values reachable from them survive unchanged.
    #[test]
    fn prop_cleanup_preserves_live_observables(live_mask in 0u32..16) {
        let mut cm = ConstraintManager::new();
        let symbols: Vec<_> = (0..4).map(SymbolId::new).collect();
        let values: Vec<_> = (0..4).map(|_| cm.fresh(None)).collect();

        let mut state = ProgramState::empty();
        for (i, (&s, &v)) in symbols.iter().zip(&values).enumerate() {
            state = state.put(s, v);
            if i % 2 == 0 {
                state = state
                    .add_constraint(v, Constraint::NOT_NULL, cm.kinds())
                    .expect("fresh value accepts a constraint");
            }
        }

        let live: rustc_hash::FxHashSet<SymbolId> = symbols
            .iter()
            .enumerate()
            .filter(|(i, _)| live_mask & (1 << i) != 0)
            .map(|(_, &s)| s)
            .collect();

        let cleaned = state
            .cleanup_dead_symbols(&live)
            .cleanup_constraints(cm.values());

        for (i, (&s, &v)) in symbols.iter().zip(&values).enumerate() {
            if live.contains(&s) {
                prop_assert_eq!(cleaned.get(s), Some(v));
                prop_assert_eq!(
                    cleaned.constraint(v, ConstraintKey::Nullness),
                    state.constraint(v, ConstraintKey::Nullness)
                );
            } else {
                prop_assert_eq!(cleaned.get(s), None);
                if i % 2 == 0 {
                    // constraint on the dropped value is gone too
                    prop_assert_eq!(cleaned.constraint(v, ConstraintKey::Nullness), None);
                }
            }
        }
    }

    /// Branch completeness: for an unconstrained condition both sides
    /// are feasible; a pre-constrained condition loses exactly the
    /// contradicted side.
    #[test]
    fn prop_assume_dual_covers_feasible_sides(pre in proptest::option::of(proptest::bool::ANY)) {
        let mut cm = ConstraintManager::new();
        let condition = cm.fresh(None);
        let mut state = ProgramState::empty();
        if let Some(truth) = pre {
            state = state
                .add_constraint(condition, Constraint::Boolean(truth), cm.kinds())
                .expect("fresh value accepts a constraint");
        }
        let state = state.stack_value(condition);

        let (false_states, true_states) = cm
            .assume_dual(&state, 10_000)
            .expect("no boolean splitting on a plain value");

        match pre {
            None => {
                prop_assert_eq!(false_states.len(), 1);
                prop_assert_eq!(true_states.len(), 1);
            }
            Some(true) => {
                prop_assert!(false_states.is_empty());
                prop_assert_eq!(true_states.len(), 1);
            }
            Some(false) => {
                prop_assert_eq!(false_states.len(), 1);
                prop_assert!(true_states.is_empty());
            }
        }

        // the condition is popped on every produced state
        for s in false_states.iter().chain(true_states.iter()) {
            prop_assert!(s.peek().is_none());
        }
    }
}
