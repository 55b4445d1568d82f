//! Flattened circuit representation and validation.
//!
//! Semantic analysis produces a [`Circuit`]: every subcircuit expanded,
//! every terminal bound to a [`NetId`], net 0 being ground. The same
//! structure feeds the simulator and the source printer.

mod graph;
mod printer;
mod types;
mod validate;

pub use graph::{Circuit, FlatComponent};
pub use printer::same_topology;
pub use types::*;
pub use validate::{reachable_from_ground, validate_circuit};
