//! End-to-end walker scenarios: analyzed-language snippets built as
//! trees + CFG, run through the default checker pipeline, asserting the
//! exact issues reported.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use helpers::Fixture;
use sedge::base::TreeId;
use sedge::cfg::CfgBuilder;
use sedge::checks::{Checker, CheckerContext};
use sedge::driver::{Analyzer, MethodBody};
use sedge::report::codes;
use sedge::syntax::{BinaryOp, Receiver, TreeKind, WellKnown};

/// `void f(boolean a) { if (a) { if (a) { } } }`
///
/// The inner condition is always true; the outer one is genuinely
/// two-sided.
#[test]
fn test_nested_condition_always_true() {
    let mut fx = Fixture::new();
    let a = fx.boolean_param("a");
    let method = fx.void_method("f", 1);

    let outer_cond = fx.ident(a);
    let outer_if = fx.terminator(TreeKind::If);
    let inner_cond = fx.ident(a);
    let inner_if = fx.terminator(TreeKind::If);

    let mut cfg = CfgBuilder::new();
    let b0 = cfg.add_block();
    let b1 = cfg.add_block();
    let b2 = cfg.add_block();
    let exit = cfg.add_block();
    cfg.entry(b0).exit(exit);
    cfg.element(b0, outer_cond).terminator(b0, outer_if);
    cfg.branch(b0, b1, exit);
    cfg.element(b1, inner_cond).terminator(b1, inner_if);
    cfg.branch(b1, b2, exit);
    cfg.successor(b2, exit);

    let mut analyzer = Analyzer::new(&fx.arena, &fx.oracle);
    let outcome = analyzer.analyze(&[MethodBody {
        method,
        parameters: vec![a],
        cfg: cfg.finish(),
    }]);

    assert_eq!(outcome.aborted, 0);
    assert_eq!(outcome.issues.len(), 1);
    let issue = &outcome.issues[0];
    assert_eq!(issue.code, codes::CONDITION_ALWAYS_TRUE);
    assert_eq!(issue.tree, inner_cond);
}

/// `void f() { Object a = new Object(); a = null; a.toString(); }`
#[test]
fn test_null_reassignment_then_dereference() {
    let mut fx = Fixture::new();
    let a = fx.object_local("a");
    let method = fx.void_method("f", 0);
    let to_string = fx.library_method("toString", None);

    let new_tree = fx.new_object("java.lang.Object");
    let decl = fx.var_decl(a);
    let lvalue = fx.ident(a);
    let null_lit = fx.null_literal();
    let assign = fx.assign(a);
    fx.as_statement(assign);
    let receiver = fx.ident(a);
    let call = fx.invoke(to_string, 0, Receiver::Expression);
    fx.as_statement(call);

    let mut cfg = CfgBuilder::new();
    let b0 = cfg.add_block();
    let exit = cfg.add_block();
    cfg.entry(b0).exit(exit).successor(b0, exit);
    for tree in [new_tree, decl, lvalue, null_lit, assign, receiver, call] {
        cfg.element(b0, tree);
    }

    let mut analyzer = Analyzer::new(&fx.arena, &fx.oracle);
    let outcome = analyzer.analyze(&[MethodBody {
        method,
        parameters: vec![],
        cfg: cfg.finish(),
    }]);

    assert_eq!(outcome.aborted, 0);
    assert_eq!(outcome.issues.len(), 1);
    let issue = &outcome.issues[0];
    assert_eq!(issue.code, codes::NULL_DEREFERENCE);
    assert_eq!(issue.tree, call);
}

/// `void f(Object a) { Object b = new Object(); if (a == null) { b = a; b.toString(); } }`
#[test]
fn test_flow_combined_null_dereference() {
    let mut fx = Fixture::new();
    let a = fx.object_param("a");
    let b = fx.object_local("b");
    let method = fx.void_method("f", 1);
    let to_string = fx.library_method("toString", None);

    let new_tree = fx.new_object("java.lang.Object");
    let decl_b = fx.var_decl(b);
    let read_a = fx.ident(a);
    let null_lit = fx.null_literal();
    let eq = fx.binary(BinaryOp::Equal);
    let if_term = fx.terminator(TreeKind::If);

    let lvalue_b = fx.ident(b);
    let read_a2 = fx.ident(a);
    let assign = fx.assign(b);
    fx.as_statement(assign);
    let receiver_b = fx.ident(b);
    let call = fx.invoke(to_string, 0, Receiver::Expression);
    fx.as_statement(call);

    let mut cfg = CfgBuilder::new();
    let b0 = cfg.add_block();
    let b1 = cfg.add_block();
    let exit = cfg.add_block();
    cfg.entry(b0).exit(exit);
    for tree in [new_tree, decl_b, read_a, null_lit, eq] {
        cfg.element(b0, tree);
    }
    cfg.terminator(b0, if_term).branch(b0, b1, exit);
    for tree in [lvalue_b, read_a2, assign, receiver_b, call] {
        cfg.element(b1, tree);
    }
    cfg.successor(b1, exit);

    let mut analyzer = Analyzer::new(&fx.arena, &fx.oracle);
    let outcome = analyzer.analyze(&[MethodBody {
        method,
        parameters: vec![a],
        cfg: cfg.finish(),
    }]);

    assert_eq!(outcome.aborted, 0);
    assert_eq!(outcome.issues.len(), 1);
    let issue = &outcome.issues[0];
    assert_eq!(issue.code, codes::NULL_DEREFERENCE);
    assert_eq!(issue.tree, call);
}

/// `void f(boolean a) { if (!a) if (a); }`
#[test]
fn test_unary_reasserting_always_false() {
    let mut fx = Fixture::new();
    let a = fx.boolean_param("a");
    let method = fx.void_method("f", 1);

    let read_a = fx.ident(a);
    let not_a = fx.not();
    let outer_if = fx.terminator(TreeKind::If);
    let inner_cond = fx.ident(a);
    let inner_if = fx.terminator(TreeKind::If);

    let mut cfg = CfgBuilder::new();
    let b0 = cfg.add_block();
    let b1 = cfg.add_block();
    let b2 = cfg.add_block();
    let exit = cfg.add_block();
    cfg.entry(b0).exit(exit);
    cfg.element(b0, read_a).element(b0, not_a);
    cfg.terminator(b0, outer_if).branch(b0, b1, exit);
    cfg.element(b1, inner_cond);
    cfg.terminator(b1, inner_if).branch(b1, b2, exit);
    cfg.successor(b2, exit);

    let mut analyzer = Analyzer::new(&fx.arena, &fx.oracle);
    let outcome = analyzer.analyze(&[MethodBody {
        method,
        parameters: vec![a],
        cfg: cfg.finish(),
    }]);

    assert_eq!(outcome.aborted, 0);
    assert_eq!(outcome.issues.len(), 1);
    let issue = &outcome.issues[0];
    assert_eq!(issue.code, codes::CONDITION_ALWAYS_FALSE);
    assert_eq!(issue.tree, inner_cond);
}

/// `boolean f(Object a) { return !(a == a); }`
#[test]
fn test_equals_on_self_always_false() {
    let mut fx = Fixture::new();
    let a = fx.object_param("a");
    let method = fx.value_method("f", 1);

    let read_a1 = fx.ident(a);
    let read_a2 = fx.ident(a);
    let eq = fx.binary(BinaryOp::Equal);
    let negation = fx.not();
    let ret = fx.terminator(TreeKind::Return { value: true });

    let mut cfg = CfgBuilder::new();
    let b0 = cfg.add_block();
    let exit = cfg.add_block();
    cfg.entry(b0).exit(exit);
    for tree in [read_a1, read_a2, eq, negation] {
        cfg.element(b0, tree);
    }
    cfg.terminator(b0, ret).successor(b0, exit);

    let mut analyzer = Analyzer::new(&fx.arena, &fx.oracle);
    let outcome = analyzer.analyze(&[MethodBody {
        method,
        parameters: vec![a],
        cfg: cfg.finish(),
    }]);

    assert_eq!(outcome.aborted, 0);
    assert_eq!(outcome.issues.len(), 1);
    let issue = &outcome.issues[0];
    assert_eq!(issue.code, codes::CONDITION_ALWAYS_FALSE);
    assert_eq!(issue.tree, negation);
}

/// Counts how often one tree reaches the pre-statement hook.
struct HitCounter {
    target: TreeId,
    hits: Arc<AtomicUsize>,
}

impl Checker for HitCounter {
    fn name(&self) -> &'static str {
        "hit-counter"
    }

    fn pre_statement(&mut self, _ctx: &mut CheckerContext<'_>, tree: TreeId) {
        if tree == self.target {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// A `while (true)` over a 50-statement body terminates within the
/// bounds: the loop head is entered at most twice per path, and the
/// literal condition is never reported as always-true.
#[test]
fn test_endless_loop_terminates_within_bounds() {
    let mut fx = Fixture::new();
    let x = fx.object_local("x");
    let method = fx.void_method("f", 0);

    let condition = fx.bool_literal(true);
    let while_term = fx.terminator(TreeKind::While);

    let mut body = Vec::new();
    for _ in 0..25 {
        body.push(fx.new_object("java.lang.Object"));
        body.push(fx.var_decl(x));
    }

    let mut cfg = CfgBuilder::new();
    let head = cfg.add_block();
    let b1 = cfg.add_block();
    let exit = cfg.add_block();
    cfg.entry(head).exit(exit);
    cfg.element(head, condition);
    cfg.terminator(head, while_term).branch(head, b1, exit);
    for tree in &body {
        cfg.element(b1, *tree);
    }
    cfg.successor(b1, head);

    let hits = Arc::new(AtomicUsize::new(0));
    let mut analyzer = Analyzer::new(&fx.arena, &fx.oracle);
    analyzer.add_checker(Box::new(HitCounter {
        target: condition,
        hits: Arc::clone(&hits),
    }));
    let outcome = analyzer.analyze(&[MethodBody {
        method,
        parameters: vec![],
        cfg: cfg.finish(),
    }]);

    // terminates without tripping any bound
    assert_eq!(outcome.aborted, 0);
    // the loop head runs at most twice along the single path
    assert!(hits.load(Ordering::SeqCst) <= 2);
    // the literal condition is not reported, but the loop itself is
    assert!(
        outcome
            .issues
            .iter()
            .all(|i| i.code != codes::CONDITION_ALWAYS_TRUE)
    );
    assert!(
        outcome
            .issues
            .iter()
            .any(|i| i.code == codes::NO_WAY_OUT_LOOP)
    );
}

/// A throw caught by a matching catch clause continues normally: the
/// method keeps a normal yield and reports nothing.
#[test]
fn test_throw_caught_by_matching_clause() {
    let mut fx = Fixture::new();
    let e = fx.typed_local("e", "java.lang.RuntimeException");
    let method = fx.void_method("f", 0);

    let new_npe = fx.new_object("java.lang.NullPointerException");
    let throw_term = fx.terminator(TreeKind::Throw {
        exception: Some("java.lang.NullPointerException".into()),
    });
    let catch_decl = fx.var_decl(e);

    let mut cfg = CfgBuilder::new();
    let b0 = cfg.add_block();
    let handler = cfg.add_block();
    let exit = cfg.add_block();
    cfg.entry(b0).exit(exit);
    cfg.element(b0, new_npe).terminator(b0, throw_term);
    cfg.successor(b0, handler);
    cfg.element(handler, catch_decl).successor(handler, exit);

    // wrap the throw in the try statement
    let try_stmt = fx.arena.add(TreeKind::Try {
        catches: vec![sedge::syntax::CatchClause {
            exception: Some("java.lang.RuntimeException".into()),
            block: handler,
        }],
        finally: None,
    });
    fx.arena.set_parent(throw_term, try_stmt);
    fx.arena.set_parent(new_npe, try_stmt);

    let mut analyzer = Analyzer::new(&fx.arena, &fx.oracle);
    let outcome = analyzer.analyze(&[MethodBody {
        method,
        parameters: vec![],
        cfg: cfg.finish(),
    }]);

    assert_eq!(outcome.aborted, 0);
    assert!(outcome.issues.is_empty());
    let behavior = analyzer.registry().get(method).expect("behavior published");
    assert!(behavior.exceptional_yields().next().is_none());
    assert_eq!(behavior.yields().len(), 1);
}

/// A throw with no matching clause routes through the finally block on
/// the exit path and leaves the method exceptionally.
#[test]
fn test_throw_routes_through_finally() {
    let mut fx = Fixture::new();
    let method = fx.void_method("f", 0);

    let new_ise = fx.new_object("java.lang.IllegalStateException");
    let throw_term = fx.terminator(TreeKind::Throw {
        exception: Some("java.lang.IllegalStateException".into()),
    });

    let mut cfg = CfgBuilder::new();
    let b0 = cfg.add_block();
    let finally_block = cfg.add_block();
    let after = cfg.add_block();
    let exit = cfg.add_block();
    cfg.entry(b0).exit(exit);
    cfg.element(b0, new_ise).terminator(b0, throw_term);
    cfg.successor(b0, finally_block);
    cfg.successor(finally_block, after);
    cfg.finally(finally_block, exit);
    cfg.successor(after, exit);

    let try_stmt = fx.arena.add(TreeKind::Try {
        catches: vec![],
        finally: Some(finally_block),
    });
    fx.arena.set_parent(throw_term, try_stmt);
    fx.arena.set_parent(new_ise, try_stmt);

    let mut analyzer = Analyzer::new(&fx.arena, &fx.oracle);
    let outcome = analyzer.analyze(&[MethodBody {
        method,
        parameters: vec![],
        cfg: cfg.finish(),
    }]);

    assert_eq!(outcome.aborted, 0);
    let behavior = analyzer.registry().get(method).expect("behavior published");
    let exceptional: Vec<_> = behavior.exceptional_yields().collect();
    assert_eq!(exceptional.len(), 1);
}

/// `void f() { FileInputStream s = new FileInputStream(); }` leaks;
/// closing it does not.
#[test]
fn test_unclosed_resource_reported() {
    let mut fx = Fixture::new();
    fx.oracle.register_resource_type("java.io.FileInputStream");
    let s = fx.typed_local("s", "java.io.FileInputStream");
    let method = fx.void_method("f", 0);

    let new_stream = fx.new_object("java.io.FileInputStream");
    let decl = fx.var_decl(s);

    let mut cfg = CfgBuilder::new();
    let b0 = cfg.add_block();
    let exit = cfg.add_block();
    cfg.entry(b0).exit(exit).successor(b0, exit);
    cfg.element(b0, new_stream).element(b0, decl);

    let mut analyzer = Analyzer::new(&fx.arena, &fx.oracle);
    let outcome = analyzer.analyze(&[MethodBody {
        method,
        parameters: vec![],
        cfg: cfg.finish(),
    }]);

    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(outcome.issues[0].code, codes::UNCLOSED_RESOURCE);
    assert_eq!(outcome.issues[0].tree, new_stream);
}

#[test]
fn test_closed_resource_not_reported() {
    let mut fx = Fixture::new();
    fx.oracle.register_resource_type("java.io.FileInputStream");
    let s = fx.typed_local("s", "java.io.FileInputStream");
    let method = fx.void_method("f", 0);
    let close = fx.library_method("close", Some(WellKnown::ResourceClose));

    let new_stream = fx.new_object("java.io.FileInputStream");
    let decl = fx.var_decl(s);
    let receiver = fx.ident(s);
    let call = fx.invoke(close, 0, Receiver::Expression);
    fx.as_statement(call);

    let mut cfg = CfgBuilder::new();
    let b0 = cfg.add_block();
    let exit = cfg.add_block();
    cfg.entry(b0).exit(exit).successor(b0, exit);
    for tree in [new_stream, decl, receiver, call] {
        cfg.element(b0, tree);
    }

    let mut analyzer = Analyzer::new(&fx.arena, &fx.oracle);
    let outcome = analyzer.analyze(&[MethodBody {
        method,
        parameters: vec![],
        cfg: cfg.finish(),
    }]);

    assert!(outcome.issues.is_empty());
}

/// `l.lock()` without `unlock()` on one path.
#[test]
fn test_lock_not_released_reported() {
    let mut fx = Fixture::new();
    let l = fx.typed_local("l", "java.util.concurrent.locks.ReentrantLock");
    let method = fx.void_method("f", 0);
    let lock = fx.library_method("lock", Some(WellKnown::LockAcquire));

    let receiver = fx.ident(l);
    let call = fx.invoke(lock, 0, Receiver::Expression);
    fx.as_statement(call);

    let mut cfg = CfgBuilder::new();
    let b0 = cfg.add_block();
    let exit = cfg.add_block();
    cfg.entry(b0).exit(exit).successor(b0, exit);
    cfg.element(b0, receiver).element(b0, call);

    let mut analyzer = Analyzer::new(&fx.arena, &fx.oracle);
    let outcome = analyzer.analyze(&[MethodBody {
        method,
        parameters: vec![],
        cfg: cfg.finish(),
    }]);

    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(outcome.issues[0].code, codes::LOCK_NOT_RELEASED);
}

#[test]
fn test_lock_released_not_reported() {
    let mut fx = Fixture::new();
    let l = fx.typed_local("l", "java.util.concurrent.locks.ReentrantLock");
    let method = fx.void_method("f", 0);
    let lock = fx.library_method("lock", Some(WellKnown::LockAcquire));
    let unlock = fx.library_method("unlock", Some(WellKnown::LockRelease));

    let r1 = fx.ident(l);
    let lock_call = fx.invoke(lock, 0, Receiver::Expression);
    fx.as_statement(lock_call);
    let r2 = fx.ident(l);
    let unlock_call = fx.invoke(unlock, 0, Receiver::Expression);
    fx.as_statement(unlock_call);

    let mut cfg = CfgBuilder::new();
    let b0 = cfg.add_block();
    let exit = cfg.add_block();
    cfg.entry(b0).exit(exit).successor(b0, exit);
    for tree in [r1, lock_call, r2, unlock_call] {
        cfg.element(b0, tree);
    }

    let mut analyzer = Analyzer::new(&fx.arena, &fx.oracle);
    let outcome = analyzer.analyze(&[MethodBody {
        method,
        parameters: vec![],
        cfg: cfg.finish(),
    }]);

    assert!(outcome.issues.is_empty());
}

/// `@Nonnull Object x; ... x = null;`
#[test]
fn test_nonnull_assigned_null_reported() {
    let mut fx = Fixture::new();
    let x = fx.nonnull_local("x");
    let method = fx.void_method("f", 0);

    let lvalue = fx.ident(x);
    let null_lit = fx.null_literal();
    let assign = fx.assign(x);
    fx.as_statement(assign);

    let mut cfg = CfgBuilder::new();
    let b0 = cfg.add_block();
    let exit = cfg.add_block();
    cfg.entry(b0).exit(exit).successor(b0, exit);
    for tree in [lvalue, null_lit, assign] {
        cfg.element(b0, tree);
    }

    let mut analyzer = Analyzer::new(&fx.arena, &fx.oracle);
    let outcome = analyzer.analyze(&[MethodBody {
        method,
        parameters: vec![],
        cfg: cfg.finish(),
    }]);

    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(outcome.issues[0].code, codes::NONNULL_SET_TO_NULL);
    assert_eq!(outcome.issues[0].tree, assign);
}

/// A nullable parameter starts split: dereferencing it unchecked is
/// reported on the null start.
#[test]
fn test_nullable_parameter_dereference() {
    let mut fx = Fixture::new();
    let a = fx.nullable_param("a");
    let method = fx.void_method("f", 1);
    let to_string = fx.library_method("toString", None);

    let receiver = fx.ident(a);
    let call = fx.invoke(to_string, 0, Receiver::Expression);
    fx.as_statement(call);

    let mut cfg = CfgBuilder::new();
    let b0 = cfg.add_block();
    let exit = cfg.add_block();
    cfg.entry(b0).exit(exit).successor(b0, exit);
    cfg.element(b0, receiver).element(b0, call);

    let mut analyzer = Analyzer::new(&fx.arena, &fx.oracle);
    let outcome = analyzer.analyze(&[MethodBody {
        method,
        parameters: vec![a],
        cfg: cfg.finish(),
    }]);

    assert_eq!(outcome.aborted, 0);
    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(outcome.issues[0].code, codes::NULL_DEREFERENCE);
}
