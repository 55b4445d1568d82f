//! Core types for circuit representation.

use std::fmt;

/// A unique identifier for a net in the flattened circuit.
/// Net 0 is always ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetId(pub usize);

impl NetId {
    /// The ground net (always index 0).
    pub const GROUND: NetId = NetId(0);

    /// Check if this is the ground net.
    pub fn is_ground(&self) -> bool {
        self.0 == 0
    }

    /// Row/column of this net in the MNA system, `None` for ground.
    pub fn matrix_index(&self) -> Option<usize> {
        if self.is_ground() {
            None
        } else {
            Some(self.0 - 1)
        }
    }
}

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ground() {
            write!(f, "ground")
        } else {
            write!(f, "_n{}", self.0)
        }
    }
}

/// Index of a component in [`Circuit::components`](super::Circuit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub usize);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
