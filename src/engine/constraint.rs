//! Constraint domain — tagged facts attachable to symbolic values.
//!
//! A state stores at most one constraint per (value, kind). Nullness
//! and boolean are fixed kinds; checkers register additional kinds with
//! their own meet function over an opaque `u8` payload. Merging two
//! constraints of one kind applies the kind's meet; a bottom meet makes
//! the state infeasible.

use indexmap::IndexMap;

use crate::base::Name;

// ============================================================================
// CONSTRAINTS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Nullness {
    Null,
    NotNull,
}

/// Identity of a checker-registered constraint kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KindId(u16);

impl KindId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The kind tag under which a constraint is stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstraintKey {
    Nullness,
    Boolean,
    Custom(KindId),
}

/// A single fact about a symbolic value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Constraint {
    Nullness(Nullness),
    Boolean(bool),
    Custom { kind: KindId, value: u8 },
}

impl Constraint {
    pub const NULL: Constraint = Constraint::Nullness(Nullness::Null);
    pub const NOT_NULL: Constraint = Constraint::Nullness(Nullness::NotNull);
    pub const TRUE: Constraint = Constraint::Boolean(true);
    pub const FALSE: Constraint = Constraint::Boolean(false);

    pub fn key(&self) -> ConstraintKey {
        match self {
            Constraint::Nullness(_) => ConstraintKey::Nullness,
            Constraint::Boolean(_) => ConstraintKey::Boolean,
            Constraint::Custom { kind, .. } => ConstraintKey::Custom(*kind),
        }
    }
}

// ============================================================================
// KIND REGISTRY
// ============================================================================

/// Meet of two payloads of one custom kind. `None` is bottom.
pub type MeetFn = fn(u8, u8) -> Option<u8>;

/// Registry of checker-supplied constraint kinds.
///
/// Registration is idempotent by name, so a checker re-registering its
/// kind on every method gets a stable [`KindId`] back. Iteration order
/// is registration order.
#[derive(Clone, Debug, Default)]
pub struct ConstraintKinds {
    kinds: IndexMap<Name, MeetFn>,
}

impl ConstraintKinds {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default meet: identical payloads survive, anything else is
    /// bottom.
    pub fn equal_or_bottom(a: u8, b: u8) -> Option<u8> {
        (a == b).then_some(a)
    }

    pub fn register(&mut self, name: impl Into<Name>, meet: MeetFn) -> KindId {
        let entry = self.kinds.entry(name.into());
        let index = entry.index();
        entry.or_insert(meet);
        KindId(index as u16)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Meet two constraints stored under the same key. `None` is
    /// bottom: the state asserting both is infeasible.
    ///
    /// Panics when the keys differ; pairing constraints of different
    /// kinds is a programming error.
    pub fn meet(&self, a: Constraint, b: Constraint) -> Option<Constraint> {
        match (a, b) {
            (Constraint::Nullness(x), Constraint::Nullness(y)) => {
                (x == y).then_some(a)
            }
            (Constraint::Boolean(x), Constraint::Boolean(y)) => (x == y).then_some(a),
            (Constraint::Custom { kind, value: x }, Constraint::Custom { kind: k2, value: y })
                if kind == k2 =>
            {
                let meet = self.kinds[kind.index()];
                meet(x, y).map(|value| Constraint::Custom { kind, value })
            }
            _ => panic!("meet of mismatched constraint kinds: {a:?} vs {b:?}"),
        }
    }
}
