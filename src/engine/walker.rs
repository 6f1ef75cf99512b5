//! Exploded-graph walker — the worklist driver.
//!
//! One walker explores one method to completion: it pops `(program
//! point, state)` nodes off a LIFO worklist, interprets the element at
//! the point, notifies the checker pipeline around each step, splits
//! states at branches through the constraint manager, replays callee
//! behaviors at invocations, routes exceptions, and enforces the
//! exploration bounds. Completed paths register yields on the method's
//! behavior.
//!
//! The walker owns its exploded graph, worklist, and constraint manager
//! and releases all of them when `execute` returns, so no per-method
//! state outlives the analysis.

use tracing::{debug, trace};

use crate::base::{MethodId, SymbolId, TreeId};
use crate::cfg::{Block, Cfg, ProgramPoint};
use crate::checks::{AnalysisEnv, CheckerDispatcher};
use crate::config::WalkerLimits;
use crate::error::EngineError;
use crate::report::IssueCollector;
use crate::syntax::{LiteralKind, Receiver, SymbolTable, TreeArena, TreeKind, WellKnown};

use super::behavior::{BehaviorRegistry, MethodBehavior, MethodYield, YieldResult};
use super::constraint::Constraint;
use super::exceptions::{ExceptionRoute, exception_routes};
use super::graph::ExplodedGraph;
use super::manager::{ConstraintManager, NestedBooleanOverflow};
use super::state::ProgramState;
use super::value::ValueId;

pub struct Walker<'a> {
    method: MethodId,
    cfg: &'a Cfg,
    arena: &'a TreeArena,
    oracle: &'a SymbolTable,
    registry: &'a BehaviorRegistry,
    dispatcher: &'a mut CheckerDispatcher,
    limits: WalkerLimits,

    manager: ConstraintManager,
    graph: ExplodedGraph,
    worklist: Vec<usize>,
    behavior: MethodBehavior,
    steps: usize,
}

impl<'a> Walker<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        method: MethodId,
        parameters: Vec<SymbolId>,
        cfg: &'a Cfg,
        arena: &'a TreeArena,
        oracle: &'a SymbolTable,
        registry: &'a BehaviorRegistry,
        dispatcher: &'a mut CheckerDispatcher,
        limits: WalkerLimits,
    ) -> Self {
        let info = oracle.method(method);
        let behavior =
            MethodBehavior::new(method, parameters, info.is_constructor, info.returns_void);
        Self {
            method,
            cfg,
            arena,
            oracle,
            registry,
            dispatcher,
            limits,
            manager: ConstraintManager::new(),
            graph: ExplodedGraph::new(),
            worklist: Vec::new(),
            behavior,
            steps: 0,
        }
    }

    fn env(&self) -> AnalysisEnv<'a> {
        AnalysisEnv {
            method: self.method,
            arena: self.arena,
            oracle: self.oracle,
        }
    }

    /// Explore the method to a fixed point and return its behavior.
    ///
    /// On a bound failure the checkers are notified through
    /// `exception_end_of_execution` and no partial behavior is kept.
    pub fn execute(mut self) -> Result<MethodBehavior, EngineError> {
        let method_name = self.oracle.method(self.method).name.clone();
        debug!(method = %method_name, "exploring method");

        let env = self.env();
        self.dispatcher.init(env, self.cfg, &mut self.manager);

        let entry = ProgramPoint::block_entry(self.cfg.entry());
        for state in self.starting_states() {
            self.enqueue(entry, state, false);
        }

        while let Some(node_id) = self.worklist.pop() {
            self.steps += 1;
            if self.steps > self.limits.max_steps {
                let error = EngineError::StepsExceeded {
                    method: method_name.clone(),
                    limit: self.limits.max_steps,
                };
                return self.abort(error);
            }
            let node = self.graph.get(node_id).clone();
            if self.steps + self.worklist.len() > self.limits.max_steps / 2
                && node.state.constraints_size() > self.limits.oversize_constraints
            {
                return self.abort(EngineError::OversizeState {
                    method: method_name.clone(),
                });
            }

            let block = self.cfg.block(node.point.block);
            let index = node.point.index as usize;

            let outcome = if block.successors.is_empty() {
                self.end_of_path(&node.state);
                Ok(())
            } else if index < block.elements.len() {
                let element = block.elements[index];
                self.interpret_element(node.point, element, node.state.clone(), node.exit_path)
            } else if block.terminator.is_none() {
                self.block_exit(node.point, node.state.clone(), node.exit_path)
            } else if index == block.elements.len() {
                let terminator = block.terminator.expect("checked above");
                let (state, sink) = self.dispatcher.post_statement(
                    env,
                    &self.manager,
                    terminator,
                    node.state.clone(),
                );
                if sink {
                    trace!("path sunk at terminator post hook");
                } else {
                    self.enqueue(node.point.next(), state, node.exit_path);
                }
                Ok(())
            } else {
                let terminator = block.terminator.expect("checked above");
                let (state, sink) =
                    self.dispatcher
                        .pre_statement(env, &self.manager, terminator, node.state.clone());
                if sink {
                    self.sink_exceptional(terminator, state);
                    Ok(())
                } else {
                    self.block_exit(node.point, state, node.exit_path)
                }
            };

            if outcome.is_err() {
                let error = EngineError::NestedBooleanOverflow {
                    method: method_name.clone(),
                    limit: self.limits.max_nested_boolean_states,
                };
                return self.abort(error);
            }
        }

        debug!(
            steps = self.steps,
            nodes = self.graph.len(),
            yields = self.behavior.yields().len(),
            "method exploration complete"
        );
        self.behavior.mark_complete();
        self.dispatcher.end_of_execution(env);
        Ok(self.behavior)
    }

    fn abort(self, error: EngineError) -> Result<MethodBehavior, EngineError> {
        debug!(%error, "aborting method exploration");
        let env = self.env();
        self.dispatcher.exception_end_of_execution(env);
        Err(error)
    }

    /// Convenience access to the issues collected so far; used by
    /// in-crate tests.
    pub fn issues(&self) -> &IssueCollector {
        self.dispatcher.issues()
    }

    // ------------------------------------------------------------------
    // Starting states
    // ------------------------------------------------------------------

    /// One state per combination of parameter assumptions: non-null
    /// annotated parameters start not-null; nullable ones (and the
    /// parameter of `equals(Object)`) split into a null and a not-null
    /// start.
    fn starting_states(&mut self) -> Vec<ProgramState> {
        let info = self.oracle.method(self.method);
        let equals_method = info.is_object_equals();
        let parameters = self.behavior.parameters().to_vec();

        let mut states = vec![ProgramState::empty()];
        for symbol in parameters {
            let value = self.manager.fresh(None);
            let sym = self.oracle.symbol(symbol);
            let mut next = Vec::with_capacity(states.len() * 2);
            for state in &states {
                let bound = state.put(symbol, value);
                if sym.is_nonnull() {
                    next.push(
                        self.manager
                            .set_single_constraint(&bound, value, Constraint::NOT_NULL),
                    );
                } else if sym.ty.is_reference() && (sym.is_nullable() || equals_method) {
                    next.push(
                        self.manager
                            .set_single_constraint(&bound, value, Constraint::NULL),
                    );
                    next.push(
                        self.manager
                            .set_single_constraint(&bound, value, Constraint::NOT_NULL),
                    );
                } else {
                    next.push(bound);
                }
            }
            states = next;
        }
        states
    }

    // ------------------------------------------------------------------
    // Worklist
    // ------------------------------------------------------------------

    /// Intern and enqueue. Block-entry visits are counted against the
    /// per-path bound; enqueues past it are silently dropped — the
    /// primary termination guarantee for loops.
    fn enqueue(&mut self, point: ProgramPoint, state: ProgramState, exit_path: bool) {
        let mut state = state;
        if point.index == 0 {
            let visits = state.times_visited(point);
            if visits >= self.limits.max_visits_per_point {
                trace!(?point, visits, "visit bound reached, dropping enqueue");
                return;
            }
            state = state.visited_point(point, visits + 1);
        }
        let (id, is_new) = self.graph.node(point, state);
        if is_new || self.graph.get(id).exit_path != exit_path {
            self.graph.set_exit_path(id, exit_path);
            self.worklist.push(id);
        }
    }

    fn enqueue_successors(&mut self, block: &Block, state: ProgramState, exit_path: bool) {
        if block.is_finally {
            let exit_successor = block
                .exit_successor
                .unwrap_or_else(|| self.invariant("finally block without exit successor"));
            if exit_path {
                // only the route matching the originating control
                self.enqueue(ProgramPoint::block_entry(exit_successor), state, true);
            } else {
                for &succ in &block.successors {
                    if succ != exit_successor {
                        self.enqueue(ProgramPoint::block_entry(succ), state.clone(), false);
                    }
                }
            }
        } else {
            for &succ in &block.successors {
                self.enqueue(ProgramPoint::block_entry(succ), state.clone(), exit_path);
            }
        }
    }

    // ------------------------------------------------------------------
    // Block exit
    // ------------------------------------------------------------------

    fn cleanup(&mut self, block: &Block, state: ProgramState) -> ProgramState {
        let mut state = state;
        if let Some(live) = &block.live_out {
            let mut keep = live.clone();
            keep.extend(self.behavior.parameters().iter().copied());
            state = state.cleanup_dead_symbols(&keep);
        }
        state.cleanup_constraints(self.manager.values())
    }

    fn block_exit(
        &mut self,
        point: ProgramPoint,
        state: ProgramState,
        exit_path: bool,
    ) -> Result<(), NestedBooleanOverflow> {
        let block = self.cfg.block(point.block);
        let state = self.cleanup(block, state);

        let Some(terminator) = block.terminator else {
            self.enqueue_successors(block, state, exit_path);
            return Ok(());
        };

        let kind = self.arena.kind(terminator).clone();
        match kind {
            _ if kind.is_branch_terminator() => {
                self.handle_branch(block, state, exit_path)?;
            }
            TreeKind::For { condition: false } | TreeKind::Break | TreeKind::Continue => {
                self.enqueue_successors(block, state, exit_path);
            }
            TreeKind::Return { value } => {
                self.handle_return(block, terminator, state, value)?;
            }
            TreeKind::Throw { exception } => {
                let (state, _thrown) = state.unstack(1);
                let value = self.manager.create_exception(exception, Some(terminator));
                let state = state.clear_stack().stack_value(value);
                self.route_exception(terminator, state);
            }
            TreeKind::Synchronized => {
                let state = state.reset_field_values(self.manager.values_mut(), self.oracle);
                self.behavior.set_havocs_fields();
                self.enqueue_successors(block, state, exit_path);
            }
            other => self.invariant(&format!("unexpected terminator kind {other:?}")),
        }
        Ok(())
    }

    fn handle_branch(
        &mut self,
        block: &Block,
        state: ProgramState,
        exit_path: bool,
    ) -> Result<(), NestedBooleanOverflow> {
        // the condition value was produced by the block's last element
        let condition_tree = block.elements.last().copied();
        let check_path = condition_tree.is_some_and(|tree| {
            !matches!(
                self.arena.kind(tree),
                TreeKind::Literal(LiteralKind::Bool(_))
            )
        });

        let (false_states, true_states) = self
            .manager
            .assume_dual(&state, self.limits.max_nested_boolean_states)?;

        if check_path {
            self.dispatcher.condition_evaluated(
                condition_tree.expect("check_path implies a condition tree"),
                !true_states.is_empty(),
                !false_states.is_empty(),
            );
        }

        let on_true = block
            .true_successor
            .unwrap_or_else(|| self.invariant("branch terminator without true successor"));
        let on_false = block
            .false_successor
            .unwrap_or_else(|| self.invariant("branch terminator without false successor"));

        for state in false_states {
            self.enqueue(
                ProgramPoint::block_entry(on_false),
                state.stack_value(ValueId::FALSE),
                exit_path,
            );
        }
        for state in true_states {
            self.enqueue(
                ProgramPoint::block_entry(on_true),
                state.stack_value(ValueId::TRUE),
                exit_path,
            );
        }
        Ok(())
    }

    fn handle_return(
        &mut self,
        block: &Block,
        terminator: TreeId,
        state: ProgramState,
        has_value: bool,
    ) -> Result<(), NestedBooleanOverflow> {
        let mut state = state;
        if self.behavior.is_constructor {
            let this_value = self.manager.fresh(Some(terminator));
            state = self
                .manager
                .set_single_constraint(&state, this_value, Constraint::NOT_NULL)
                .stack_value(this_value);
        } else if has_value {
            // a returned boolean expression gets the same feasibility
            // probe a branch condition would
            if let Some(value) = state.peek() {
                if self.manager.values().kind(value).is_boolean_expression() {
                    if let Some(origin) = self.manager.values().origin(value) {
                        let (false_ok, true_ok) = self.manager.probe_dual(
                            &state,
                            value,
                            self.limits.max_nested_boolean_states,
                        )?;
                        self.dispatcher.condition_evaluated(origin, true_ok, false_ok);
                    }
                }
            }
        }
        self.enqueue_successors(block, state, true);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Exceptions
    // ------------------------------------------------------------------

    /// Dispatch a state whose top of stack is an exception value.
    fn route_exception(&mut self, site: TreeId, state: ProgramState) {
        let top = state
            .peek()
            .unwrap_or_else(|| self.invariant("exception routing without a thrown value"));
        let thrown = match self.manager.values().kind(top) {
            super::value::ValueKind::Exception { thrown } => thrown.clone(),
            _ => self.invariant("exception routing on a non-exception value"),
        };
        for route in exception_routes(self.arena, self.oracle, site, thrown.as_ref()) {
            match route {
                ExceptionRoute::Catch(handler) => {
                    self.enqueue(ProgramPoint::block_entry(handler), state.clone(), false);
                }
                ExceptionRoute::Finally(finally) => {
                    self.enqueue(ProgramPoint::block_entry(finally), state.clone(), true);
                }
                ExceptionRoute::MethodExit => {
                    self.enqueue(
                        ProgramPoint::block_entry(self.cfg.exit()),
                        state.clone(),
                        true,
                    );
                }
            }
        }
    }

    /// A checker sank the path: synthesize a null-pointer exception and
    /// propagate it.
    fn sink_exceptional(&mut self, tree: TreeId, state: ProgramState) {
        let value = self.manager.create_exception(
            Some("java.lang.NullPointerException".into()),
            Some(tree),
        );
        let state = state.clear_stack().stack_value(value);
        self.route_exception(tree, state);
    }

    // ------------------------------------------------------------------
    // End of path
    // ------------------------------------------------------------------

    fn end_of_path(&mut self, state: &ProgramState) {
        let env = self.env();
        self.dispatcher
            .end_of_execution_path(env, &self.manager, state);

        let parameters = self
            .behavior
            .parameters()
            .iter()
            .map(|&symbol| {
                state
                    .get(symbol)
                    .map(|value| state.constraints_of(value))
                    .unwrap_or_default()
            })
            .collect();

        let result = match state.peek() {
            Some(top) => match self.manager.values().kind(top) {
                super::value::ValueKind::Exception { thrown } => YieldResult::Exception {
                    thrown: thrown.clone(),
                },
                _ if self.behavior.is_constructor => YieldResult::Normal {
                    constraints: vec![Constraint::NOT_NULL],
                },
                _ if self.behavior.is_void => YieldResult::Normal {
                    constraints: vec![Constraint::NULL],
                },
                _ => YieldResult::Normal {
                    constraints: state.constraints_of(top),
                },
            },
            None if self.behavior.is_constructor => YieldResult::Normal {
                constraints: vec![Constraint::NOT_NULL],
            },
            None => YieldResult::Normal {
                constraints: vec![Constraint::NULL],
            },
        };

        self.behavior.add_yield(MethodYield { parameters, result });
    }

    // ------------------------------------------------------------------
    // Element interpretation
    // ------------------------------------------------------------------

    fn interpret_element(
        &mut self,
        point: ProgramPoint,
        element: TreeId,
        state: ProgramState,
        exit_path: bool,
    ) -> Result<(), NestedBooleanOverflow> {
        let env = self.env();
        let (state, sink) = self
            .dispatcher
            .pre_statement(env, &self.manager, element, state);
        if sink {
            self.sink_exceptional(element, state);
            return Ok(());
        }

        let outcomes = self.transform(element, state);

        for state in outcomes {
            let (state, sink) = self
                .dispatcher
                .post_statement(env, &self.manager, element, state);
            if sink {
                trace!("path sunk at post hook");
                continue;
            }
            let is_exception = state
                .peek()
                .is_some_and(|v| self.manager.values().kind(v).is_exception());
            if is_exception {
                self.route_exception(element, state);
            } else {
                let state = if self.arena.ends_expression_statement(element) {
                    state.clear_stack()
                } else {
                    state
                };
                self.enqueue(point.next(), state, exit_path);
            }
        }
        Ok(())
    }

    /// The element transfer function: stack/binding effects of one
    /// tree. Returns every successor state; an empty result ends the
    /// path (infeasible call, `System.exit`).
    fn transform(&mut self, element: TreeId, state: ProgramState) -> Vec<ProgramState> {
        let kind = self.arena.kind(element).clone();
        match kind {
            TreeKind::Literal(literal) => vec![match literal {
                LiteralKind::Bool(true) => state.stack_value(ValueId::TRUE),
                LiteralKind::Bool(false) => state.stack_value(ValueId::FALSE),
                LiteralKind::Null => state.stack_value(ValueId::NULL),
                _ => {
                    let value = self.manager.fresh(Some(element));
                    let state = self
                        .manager
                        .set_single_constraint(&state, value, Constraint::NOT_NULL);
                    state.stack_value(value)
                }
            }],
            TreeKind::Identifier(symbol) => vec![match state.get(symbol) {
                Some(value) => state.stack_value(value),
                None => {
                    let value = self.manager.fresh(Some(element));
                    state.put(symbol, value).stack_value(value)
                }
            }],
            TreeKind::MemberSelect { class_literal } => {
                let state = if class_literal {
                    state
                } else {
                    state.unstack(1).0
                };
                let value = self.manager.fresh(Some(element));
                vec![state.stack_value(value)]
            }
            TreeKind::ArrayAccess => {
                let (state, _) = state.unstack(2);
                let value = self.manager.fresh(Some(element));
                vec![state.stack_value(value)]
            }
            TreeKind::NewObject { argc, .. } => {
                let (state, _) = state.unstack(argc);
                let value = self.manager.fresh(Some(element));
                let state = self
                    .manager
                    .set_single_constraint(&state, value, Constraint::NOT_NULL);
                vec![state.stack_value(value)]
            }
            TreeKind::NewArray { inits } => {
                let (state, _) = state.unstack(inits);
                let value = self.manager.fresh(Some(element));
                let state = self
                    .manager
                    .set_single_constraint(&state, value, Constraint::NOT_NULL);
                vec![state.stack_value(value)]
            }
            TreeKind::Binary(op) => {
                let (state, operands) = state.unstack(2);
                let (rhs, lhs) = (operands[0], operands[1]);
                let value = self.manager.create_binary(op, lhs, rhs, element);
                vec![state.stack_value(value)]
            }
            TreeKind::Unary(op) => {
                let (state, operands) = state.unstack(1);
                let value = self.manager.create_unary(op, operands[0], element);
                vec![state.stack_value(value)]
            }
            TreeKind::InstanceOf => {
                let (state, operands) = state.unstack(1);
                let value = self.manager.create_instance_of(operands[0], element);
                vec![state.stack_value(value)]
            }
            TreeKind::IncDec {
                target, prefix, ..
            } => {
                let (state, operands) = state.unstack(1);
                let old = operands[0];
                let new = self.manager.fresh_computed(vec![old], Some(element));
                let state = state.put(target, new);
                vec![state.stack_value(if prefix { new } else { old })]
            }
            TreeKind::Assign { target } => {
                let (state, operands) = state.unstack(2);
                let rhs = operands[0];
                let state = match target {
                    Some(symbol) => state.put(symbol, rhs),
                    None => state,
                };
                vec![state.stack_value(rhs)]
            }
            TreeKind::CompoundAssign { target, .. } => {
                let (state, operands) = state.unstack(2);
                let (rhs, current) = (operands[0], operands[1]);
                let value = self
                    .manager
                    .fresh_computed(vec![current, rhs], Some(element));
                let state = state.put(target, value);
                vec![state.stack_value(value)]
            }
            TreeKind::Cast { primitive } => {
                if primitive {
                    let (state, _) = state.unstack(1);
                    let value = self.manager.fresh(Some(element));
                    vec![state.stack_value(value)]
                } else {
                    // reference casts pass the value through
                    vec![state]
                }
            }
            TreeKind::VarDecl {
                symbol,
                initialized,
                foreach,
            } => {
                if initialized {
                    let (state, operands) = state.unstack(1);
                    vec![state.put(symbol, operands[0])]
                } else if foreach {
                    let value = self.manager.fresh(Some(element));
                    vec![state.put(symbol, value)]
                } else {
                    let ty = &self.oracle.symbol(symbol).ty;
                    vec![if ty.is_boolean() {
                        state.put(symbol, ValueId::FALSE)
                    } else if ty.is_reference() {
                        state.put(symbol, ValueId::NULL)
                    } else {
                        state
                    }]
                }
            }
            TreeKind::Invoke {
                method,
                argc,
                receiver,
            } => self.invoke(element, state, method, argc, receiver),
            TreeKind::Lambda | TreeKind::MethodRef => {
                let value = self.manager.fresh(Some(element));
                vec![state.stack_value(value)]
            }
            other => self.invariant(&format!("element kind {other:?} cannot be interpreted")),
        }
    }

    fn invoke(
        &mut self,
        element: TreeId,
        state: ProgramState,
        method: MethodId,
        argc: usize,
        receiver: Receiver,
    ) -> Vec<ProgramState> {
        let info = self.oracle.method(method).clone();
        if info.well_known == Some(WellKnown::SystemExit) {
            trace!("path terminated by System.exit");
            return Vec::new();
        }

        let mut state = state;
        if receiver.is_local() {
            // a call on the current instance may touch any field
            state = state.reset_field_values(self.manager.values_mut(), self.oracle);
            self.behavior.set_havocs_fields();
        }

        let pops = argc + usize::from(receiver == Receiver::Expression);
        let (state, popped) = state.unstack(pops);
        let arguments: Vec<ValueId> = popped[..argc].iter().rev().copied().collect();

        match self.registry.get(method) {
            Some(callee) => {
                let mut state = state;
                if callee.havocs_fields() {
                    state = state.reset_field_values(self.manager.values_mut(), self.oracle);
                    self.behavior.set_havocs_fields();
                }
                let mut outcomes = Vec::new();
                for y in callee.yields() {
                    let Some(applied) =
                        y.apply_parameters(&state, &arguments, self.manager.kinds())
                    else {
                        continue;
                    };
                    match &y.result {
                        YieldResult::Normal { constraints } => {
                            let result = self.manager.fresh(Some(element));
                            let mut applied = applied;
                            let mut feasible = true;
                            for &constraint in constraints {
                                match applied.add_constraint(
                                    result,
                                    constraint,
                                    self.manager.kinds(),
                                ) {
                                    Some(next) => applied = next,
                                    None => {
                                        feasible = false;
                                        break;
                                    }
                                }
                            }
                            if feasible {
                                outcomes.push(applied.stack_value(result));
                            }
                        }
                        YieldResult::Exception { thrown } => {
                            let value = self
                                .manager
                                .create_exception(thrown.clone(), Some(element));
                            outcomes.push(applied.clear_stack().stack_value(value));
                        }
                    }
                }
                if outcomes.is_empty() {
                    trace!(callee = %info.name, "no compatible yield, path is infeasible");
                }
                outcomes
            }
            None => {
                // unknown method: default result
                let mut state = state;
                if info.well_known == Some(WellKnown::ObjectWait) {
                    state = state.reset_field_values(self.manager.values_mut(), self.oracle);
                    self.behavior.set_havocs_fields();
                }
                let result = self.manager.fresh(Some(element));
                let state = state.stack_value(result);
                let state = if info.returns_nonnull() {
                    self.manager
                        .set_single_constraint(&state, result, Constraint::NOT_NULL)
                } else {
                    state
                };
                vec![state]
            }
        }
    }

    // ------------------------------------------------------------------
    // Invariant violations
    // ------------------------------------------------------------------

    /// A programming bug, not an analysis outcome: crash fast with
    /// method context.
    fn invariant(&self, message: &str) -> ! {
        panic!(
            "invariant violation in method '{}': {message}",
            self.oracle.method(self.method).name
        );
    }
}
