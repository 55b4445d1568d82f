//! # Circuit DSL
//!
//! A compiler and simulator for a small circuit-description language.
//!
//! This library provides:
//! - A tokenizer and recursive-descent parser for the DSL
//! - Semantic analysis with subcircuit flattening and union-find net unification
//! - Modified Nodal Analysis (MNA) based DC, AC and transient simulation
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`dsl`] - Tokenizer, AST and parser for the circuit description language
//! - [`semantic`] - Symbol resolution, subcircuit expansion, net unification
//! - [`circuit`] - Flattened circuit representation, validation and printing
//! - [`components`] - Component kinds, parameters and companion models
//! - [`solver`] - MNA matrix assembly and the three analyses
//! - [`output`] - CSV formatting of results
//!
//! ## Usage
//!
//! ```
//! let circuit = circuit_dsl::compile(
//!     "VoltageSource V1(5 V);
//!      Resistor R1(1 kohm);
//!      Resistor R2(2 kohm);
//!      Connect(V1.positive, R1.positive);
//!      Connect(R1.negative, R2.positive, out);
//!      Connect(V1.negative, R2.negative, ground);
//!      Simulate { dc; plot(V(out)); }",
//! )?;
//! let results = circuit_dsl::simulate(&circuit, &circuit.directives)?;
//! let v_out = results.dc().and_then(|dc| dc.probe("V(out)")).unwrap_or_default();
//! assert!((v_out - 10.0 / 3.0).abs() < 1e-9);
//! # Ok::<(), circuit_dsl::Error>(())
//! ```
//!
//! Every call is self-contained: no state is shared between compiles or
//! simulations, so independent circuits can be processed concurrently.

pub mod circuit;
pub mod components;
pub mod dsl;
pub mod error;
pub mod output;
pub mod semantic;
pub mod solver;

// Re-export main types for convenience
pub use circuit::Circuit;
pub use dsl::{parse, tokenize, Directive, Program};
pub use error::{CompileError, Error, Result, SemanticError, SemanticErrorKind, SimulationError};
pub use semantic::analyze;
pub use solver::{ResultSet, Simulator, SimulatorConfig};

/// Compile source text into a flattened, validated circuit.
pub fn compile(source: &str) -> std::result::Result<Circuit, CompileError> {
    let program = dsl::parse_source(source)?;
    Ok(analyze(&program)?)
}

/// Run analysis directives against a circuit with the default configuration.
pub fn simulate(
    circuit: &Circuit,
    directives: &[Directive],
) -> std::result::Result<ResultSet, SimulationError> {
    Simulator::new().simulate(circuit, directives)
}
