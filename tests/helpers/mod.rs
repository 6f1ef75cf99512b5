//! Shared fixtures for the engine integration tests.
//!
//! Tests build analyzed-language snippets by hand: symbols and methods
//! go into the oracle, trees into the arena, and blocks into a
//! `CfgBuilder`. The [`Fixture`] wraps the arena and oracle with
//! shorthand constructors for the shapes the scenarios need.

#![allow(dead_code)]

use once_cell::sync::Lazy;
use sedge::base::{MethodId, SymbolId, TreeId};
use sedge::syntax::{
    BinaryOp, LiteralKind, MethodInfo, Receiver, SymbolInfo, SymbolKind, SymbolTable, TreeArena,
    TreeKind, TypeKind, UnaryOp, WellKnown, annotations,
};

/// Subtype edges every fixture oracle starts with.
static EXCEPTION_HIERARCHY: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("java.lang.NullPointerException", "java.lang.RuntimeException"),
        ("java.lang.IllegalStateException", "java.lang.RuntimeException"),
        ("java.lang.RuntimeException", "java.lang.Exception"),
        ("java.io.IOException", "java.lang.Exception"),
    ]
});

pub struct Fixture {
    pub arena: TreeArena,
    pub oracle: SymbolTable,
}

impl Fixture {
    pub fn new() -> Self {
        let mut oracle = SymbolTable::new();
        for &(sub, sup) in EXCEPTION_HIERARCHY.iter() {
            oracle.register_supertype(sub, sup);
        }
        Self {
            arena: TreeArena::new(),
            oracle,
        }
    }

    // ------------------------------------------------------------------
    // Symbols
    // ------------------------------------------------------------------

    fn symbol(&mut self, name: &str, kind: SymbolKind, ty: TypeKind, notes: &[&str]) -> SymbolId {
        self.oracle.add_symbol(SymbolInfo {
            name: name.into(),
            kind,
            ty,
            annotations: notes.iter().map(|&n| n.into()).collect(),
        })
    }

    pub fn object_local(&mut self, name: &str) -> SymbolId {
        self.symbol(
            name,
            SymbolKind::Local,
            TypeKind::Reference("java.lang.Object".into()),
            &[],
        )
    }

    pub fn object_param(&mut self, name: &str) -> SymbolId {
        self.symbol(
            name,
            SymbolKind::Parameter,
            TypeKind::Reference("java.lang.Object".into()),
            &[],
        )
    }

    pub fn nullable_param(&mut self, name: &str) -> SymbolId {
        self.symbol(
            name,
            SymbolKind::Parameter,
            TypeKind::Reference("java.lang.Object".into()),
            &[annotations::NULLABLE],
        )
    }

    pub fn nonnull_local(&mut self, name: &str) -> SymbolId {
        self.symbol(
            name,
            SymbolKind::Local,
            TypeKind::Reference("java.lang.Object".into()),
            &[annotations::NONNULL],
        )
    }

    pub fn boolean_param(&mut self, name: &str) -> SymbolId {
        self.symbol(
            name,
            SymbolKind::Parameter,
            TypeKind::Primitive(sedge::syntax::PrimitiveKind::Boolean),
            &[],
        )
    }

    pub fn typed_local(&mut self, name: &str, class: &str) -> SymbolId {
        self.symbol(
            name,
            SymbolKind::Local,
            TypeKind::Reference(class.into()),
            &[],
        )
    }

    // ------------------------------------------------------------------
    // Methods
    // ------------------------------------------------------------------

    pub fn void_method(&mut self, name: &str, param_count: usize) -> MethodId {
        self.oracle.add_method(MethodInfo {
            name: name.into(),
            owner: "Test".into(),
            param_count,
            annotations: Vec::new(),
            is_constructor: false,
            returns_void: true,
            well_known: None,
        })
    }

    pub fn value_method(&mut self, name: &str, param_count: usize) -> MethodId {
        self.oracle.add_method(MethodInfo {
            name: name.into(),
            owner: "Test".into(),
            param_count,
            annotations: Vec::new(),
            is_constructor: false,
            returns_void: false,
            well_known: None,
        })
    }

    pub fn library_method(&mut self, name: &str, well_known: Option<WellKnown>) -> MethodId {
        self.oracle.add_method(MethodInfo {
            name: name.into(),
            owner: "java.lang.Object".into(),
            param_count: 0,
            annotations: Vec::new(),
            is_constructor: false,
            returns_void: false,
            well_known,
        })
    }

    // ------------------------------------------------------------------
    // Trees
    // ------------------------------------------------------------------

    pub fn ident(&mut self, symbol: SymbolId) -> TreeId {
        self.arena.add(TreeKind::Identifier(symbol))
    }

    pub fn null_literal(&mut self) -> TreeId {
        self.arena.add(TreeKind::Literal(LiteralKind::Null))
    }

    pub fn bool_literal(&mut self, value: bool) -> TreeId {
        self.arena.add(TreeKind::Literal(LiteralKind::Bool(value)))
    }

    pub fn int_literal(&mut self) -> TreeId {
        self.arena.add(TreeKind::Literal(LiteralKind::Int))
    }

    pub fn binary(&mut self, op: BinaryOp) -> TreeId {
        self.arena.add(TreeKind::Binary(op))
    }

    pub fn not(&mut self) -> TreeId {
        self.arena.add(TreeKind::Unary(UnaryOp::Not))
    }

    pub fn new_object(&mut self, class: &str) -> TreeId {
        self.arena.add(TreeKind::NewObject {
            class: class.into(),
            argc: 0,
        })
    }

    pub fn var_decl(&mut self, symbol: SymbolId) -> TreeId {
        self.arena.add(TreeKind::VarDecl {
            symbol,
            initialized: true,
            foreach: false,
        })
    }

    pub fn assign(&mut self, symbol: SymbolId) -> TreeId {
        self.arena.add(TreeKind::Assign {
            target: Some(symbol),
        })
    }

    pub fn invoke(&mut self, method: MethodId, argc: usize, receiver: Receiver) -> TreeId {
        self.arena.add(TreeKind::Invoke {
            method,
            argc,
            receiver,
        })
    }

    pub fn terminator(&mut self, kind: TreeKind) -> TreeId {
        self.arena.add(kind)
    }

    /// Wrap `expr` in an expression statement; the walker clears the
    /// operand stack after interpreting it.
    pub fn as_statement(&mut self, expr: TreeId) -> TreeId {
        let stmt = self.arena.add(TreeKind::ExprStatement);
        self.arena.set_parent(expr, stmt);
        expr
    }
}
