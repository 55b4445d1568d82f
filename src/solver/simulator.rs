//! Directive dispatch for a flattened circuit.

use tracing::info;

use super::probe::{bind_probes, BoundProbe};
use super::results::{AnalysisResult, DirectiveId, ResultSet};
use super::{ac, dc, transient};
use crate::circuit::Circuit;
use crate::dsl::{Directive, Probe};
use crate::error::SimulationError;

/// Default smallest acceptable LU pivot, relative to the largest entry of
/// the pivot's row.
pub const DEFAULT_PIVOT_TOLERANCE: f64 = 1e-15;

/// Default upper bound on AC frequency points or transient time points.
pub const DEFAULT_MAX_POINTS: usize = 1_000_000;

/// Configuration for the simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// Pivots smaller than this times their row's largest entry make the
    /// system singular. Zero pivots are always singular.
    pub pivot_tolerance: f64,
    /// Longest sweep or time march accepted per directive.
    pub max_points: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            pivot_tolerance: DEFAULT_PIVOT_TOLERANCE,
            max_points: DEFAULT_MAX_POINTS,
        }
    }
}

impl SimulatorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the singular-pivot threshold.
    pub fn with_pivot_tolerance(mut self, pivot_tolerance: f64) -> Self {
        self.pivot_tolerance = pivot_tolerance;
        self
    }

    /// Set the per-directive point limit.
    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }
}

/// Runs simulation directives against a circuit.
///
/// Holds no per-circuit state, so one simulator can serve any number of
/// circuits, concurrently or not.
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    config: SimulatorConfig,
}

impl Simulator {
    /// Create a new simulator with default configuration.
    pub fn new() -> Self {
        Self::with_config(SimulatorConfig::default())
    }

    /// Create a new simulator with custom configuration.
    pub fn with_config(config: SimulatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Run every analysis directive, in order.
    ///
    /// Probes from all `plot` directives apply to every analysis and are
    /// resolved before anything is solved. Without any `plot`, every
    /// non-ground net voltage is recorded. The first failing directive
    /// aborts the call.
    pub fn simulate(
        &self,
        circuit: &Circuit,
        directives: &[Directive],
    ) -> Result<ResultSet, SimulationError> {
        let requested: Vec<Probe> = directives
            .iter()
            .filter_map(|d| match d {
                Directive::Plot(probes) => Some(probes.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect();
        let probes: Vec<BoundProbe> = bind_probes(circuit, &requested)?;

        let mut results = ResultSet::default();
        for (index, directive) in directives.iter().enumerate() {
            let id = DirectiveId(index);
            let result = match directive {
                Directive::Dc => AnalysisResult::Dc(dc::run(circuit, &probes, &self.config, id)?),
                Directive::Ac(sweep) => {
                    AnalysisResult::Ac(ac::run(circuit, &probes, sweep, &self.config, id)?)
                }
                Directive::Transient { start, stop, step } => {
                    AnalysisResult::Transient(transient::run(
                        circuit,
                        &probes,
                        (*start, *stop, *step),
                        &self.config,
                        id,
                    )?)
                }
                Directive::Plot(_) => continue,
            };
            results.insert(id, result);
        }

        info!(analyses = results.len(), probes = probes.len(), "simulation complete");
        Ok(results)
    }
}
