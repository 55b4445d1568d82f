//! MNA (Modified Nodal Analysis) simulation engine.
//!
//! ## Modified Nodal Analysis
//!
//! MNA assembles a system of equations Ax = z where:
//! - x contains node voltages and branch currents
//! - A is the conductance/coefficient matrix
//! - z is the source vector
//!
//! The matrix structure is:
//! ```text
//! [ G   B ] [ v ]   [ i ]
//! [ C   D ] [ j ] = [ e ]
//! ```
//!
//! where:
//! - G is the admittance matrix (node equations)
//! - B, C connect branch currents to nodes
//! - D holds branch impedances (`jωL` for AC inductors, otherwise 0)
//! - v is the vector of node voltages (ground excluded)
//! - j is the vector of branch currents, each entering its element's positive terminal
//! - i is the sum of current sources into each node
//! - e is the vector of branch source values
//!
//! DC and transient solve over `f64`, AC over `Complex64`, with the same
//! LU routine. Per-kind stamps live in one place, see [`stamp`].

mod ac;
mod dc;
mod layout;
mod mna;
mod probe;
mod results;
mod simulator;
pub mod stamp;
mod transient;

pub use ac::generate_frequencies;
pub use layout::{AnalysisMode, MnaLayout};
pub use mna::{MnaMatrix, Scalar, SingularPivot};
pub use probe::{bind_probes, resolve_probe, BoundProbe, ResolvedProbe};
pub use results::{
    AcResult, AnalysisResult, DcResult, DirectiveId, ResultSet, Series, TransientResult,
};
pub use simulator::{Simulator, SimulatorConfig, DEFAULT_MAX_POINTS, DEFAULT_PIVOT_TOLERANCE};
