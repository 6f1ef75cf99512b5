//! Symbol and type oracle.
//!
//! The engine is handed resolved symbols: it never performs name
//! resolution. [`SymbolTable`] answers the classification questions the
//! walker and the checkers ask — symbol kind, type shape, annotations,
//! exception subtyping, and the well-known library methods with
//! engine-visible semantics.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::base::{MethodId, Name, SymbolId};

/// Fully-qualified annotation names the engine understands.
pub mod annotations {
    pub const NONNULL: &str = "javax.annotation.Nonnull";
    pub const NULLABLE: &str = "javax.annotation.Nullable";
    pub const CHECK_FOR_NULL: &str = "javax.annotation.CheckForNull";
}

// ============================================================================
// SYMBOLS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Local,
    Parameter,
    Field,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Char,
    Float,
    Double,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Primitive(PrimitiveKind),
    Reference(Name),
}

impl TypeKind {
    pub fn is_boolean(&self) -> bool {
        matches!(self, TypeKind::Primitive(PrimitiveKind::Boolean))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, TypeKind::Reference(_))
    }
}

#[derive(Clone, Debug)]
pub struct SymbolInfo {
    pub name: Name,
    pub kind: SymbolKind,
    pub ty: TypeKind,
    /// Fully-qualified annotation names.
    pub annotations: Vec<Name>,
}

impl SymbolInfo {
    pub fn has_annotation(&self, fqn: &str) -> bool {
        self.annotations.iter().any(|a| a == fqn)
    }

    /// Annotated to never hold null.
    pub fn is_nonnull(&self) -> bool {
        self.has_annotation(annotations::NONNULL)
    }

    /// Annotated to possibly hold null.
    pub fn is_nullable(&self) -> bool {
        self.has_annotation(annotations::NULLABLE)
            || self.has_annotation(annotations::CHECK_FOR_NULL)
    }
}

// ============================================================================
// METHODS
// ============================================================================

/// Library methods with semantics the walker applies without a
/// behavior summary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WellKnown {
    /// `System.exit` — the path terminates.
    SystemExit,
    /// `Object.wait` and friends — another thread may mutate the heap.
    ObjectWait,
    /// `close()` on a resource type.
    ResourceClose,
    /// `lock()` on a lock type.
    LockAcquire,
    /// `unlock()` on a lock type.
    LockRelease,
}

#[derive(Clone, Debug)]
pub struct MethodInfo {
    pub name: Name,
    pub owner: Name,
    pub param_count: usize,
    pub annotations: Vec<Name>,
    pub is_constructor: bool,
    pub returns_void: bool,
    pub well_known: Option<WellKnown>,
}

impl MethodInfo {
    /// Declared to never return null.
    pub fn returns_nonnull(&self) -> bool {
        self.annotations.iter().any(|a| a == annotations::NONNULL)
    }

    /// `equals(Object)` — its parameter is assumed possibly null even
    /// without an annotation.
    pub fn is_object_equals(&self) -> bool {
        self.name == "equals" && self.param_count == 1
    }
}

// ============================================================================
// ORACLE
// ============================================================================

/// Arena of symbols and methods plus the type facts the engine needs.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<SymbolInfo>,
    methods: Vec<MethodInfo>,
    /// Direct supertype per class name.
    supertypes: FxHashMap<Name, Name>,
    /// Class names that own a releasable resource.
    resource_types: FxHashSet<Name>,
    /// Class names with lock semantics.
    lock_types: FxHashSet<Name>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_symbol(&mut self, info: SymbolInfo) -> SymbolId {
        let id = SymbolId::new(self.symbols.len() as u32);
        self.symbols.push(info);
        id
    }

    pub fn add_method(&mut self, info: MethodInfo) -> MethodId {
        let id = MethodId::new(self.methods.len() as u32);
        self.methods.push(info);
        id
    }

    pub fn symbol(&self, id: SymbolId) -> &SymbolInfo {
        &self.symbols[id.index()]
    }

    pub fn method(&self, id: MethodId) -> &MethodInfo {
        &self.methods[id.index()]
    }

    pub fn is_field(&self, id: SymbolId) -> bool {
        self.symbol(id).kind == SymbolKind::Field
    }

    /// Register `sub`'s direct supertype.
    pub fn register_supertype(&mut self, sub: impl Into<Name>, sup: impl Into<Name>) {
        self.supertypes.insert(sub.into(), sup.into());
    }

    /// Reflexive, transitive subtype test over registered supertypes.
    pub fn is_subtype(&self, sub: &Name, sup: &Name) -> bool {
        let mut cur = sub.clone();
        loop {
            if &cur == sup {
                return true;
            }
            match self.supertypes.get(&cur) {
                Some(next) => cur = next.clone(),
                None => return false,
            }
        }
    }

    pub fn register_resource_type(&mut self, class: impl Into<Name>) {
        self.resource_types.insert(class.into());
    }

    pub fn is_resource_type(&self, class: &Name) -> bool {
        self.resource_types.contains(class)
    }

    pub fn register_lock_type(&mut self, class: impl Into<Name>) {
        self.lock_types.insert(class.into());
    }

    pub fn is_lock_type(&self, class: &Name) -> bool {
        self.lock_types.contains(class)
    }
}
