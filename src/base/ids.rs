//! Interned identifiers for the entities the engine manipulates.
//!
//! All ids are dense `u32` indices into the arena that owns the entity:
//! symbols and methods index the symbol oracle, trees index the tree
//! arena, blocks index a method's CFG.

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub fn raw(self) -> u32 {
                self.0
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }
    };
}

define_id! {
    /// A variable, parameter, or field symbol in the symbol oracle.
    SymbolId
}

define_id! {
    /// A method symbol in the symbol oracle.
    MethodId
}

define_id! {
    /// A basic block inside one method's CFG.
    BlockId
}

define_id! {
    /// A node in the tree arena.
    TreeId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id = SymbolId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id.index(), 42);
        assert_eq!(SymbolId::from(42), id);
    }

    #[test]
    fn test_id_ordering() {
        assert!(BlockId::new(0) < BlockId::new(1));
    }
}
