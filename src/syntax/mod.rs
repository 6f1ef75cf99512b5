//! Syntax model consumed by the engine.
//!
//! The engine never sees source text. A CFG provider hands it trees —
//! nodes in a [`TreeArena`] classified by [`TreeKind`], a closed union
//! of every element and terminator the walker interprets — plus a
//! [`SymbolTable`] oracle that classifies symbols, types, annotations,
//! and well-known library methods.

mod symbols;
mod tree;

pub use symbols::{
    MethodInfo, PrimitiveKind, SymbolInfo, SymbolKind, SymbolTable, TypeKind, WellKnown,
    annotations,
};
pub use tree::{
    BinaryOp, CatchClause, LiteralKind, Receiver, TreeArena, TreeKind, TreeNode, UnaryOp,
};
