//! Foundation types for the sedge engine.
//!
//! This module provides fundamental types used throughout the crate:
//! - Id newtypes ([`SymbolId`], [`MethodId`], [`BlockId`], [`TreeId`])
//! - [`Name`] - cheap-to-clone identifier strings
//! - [`PStack`], [`PMap`] - persistent structures with shared tails
//!
//! This module has NO dependencies on other sedge modules.

mod ids;
mod persist;

pub use ids::{BlockId, MethodId, SymbolId, TreeId};
pub use persist::{PMap, PStack};

/// Identifier, class, and method names. Cheap to clone, inline for
/// short strings.
pub type Name = smol_str::SmolStr;
