//! Transient analysis with backward-Euler companion models.
//!
//! At each time point every capacitor and inductor is replaced by its
//! companion conductance and history source, the real system is re-stamped
//! and solved, and the solved voltages become the next step's history.
//! History starts at zero: no DC operating point is chained in.

use tracing::debug;

use super::layout::{AnalysisMode, MnaLayout};
use super::mna::MnaMatrix;
use super::probe::BoundProbe;
use super::results::{DirectiveId, Series, TransientResult};
use super::simulator::SimulatorConfig;
use super::stamp::{assemble, initial_companion, transient_stamp, Stamp};
use crate::circuit::{Circuit, NetId};
use crate::components::Companion;
use crate::error::SimulationError;

/// Slack on the stop time when counting steps.
const STOP_TOLERANCE: f64 = 1e-9;

/// Number of time points of a march, or why it is invalid.
pub fn point_count(start: f64, stop: f64, step: f64) -> Result<usize, String> {
    if !start.is_finite() || !stop.is_finite() || !step.is_finite() {
        return Err("times must be finite".to_string());
    }
    if step <= 0.0 {
        return Err(format!("step {} must be positive", step));
    }
    if start < 0.0 {
        return Err(format!("start time {} must not be negative", start));
    }
    if stop < start {
        return Err(format!("stop time {} is before start time {}", stop, start));
    }
    let steps = ((stop - start) / step + STOP_TOLERANCE).floor();
    if !(steps < usize::MAX as f64) {
        return Err(format!(
            "march from {} to {} in steps of {} has too many time points",
            start, stop, step
        ));
    }
    Ok(steps as usize + 1)
}

/// March from `start` to `stop` inclusive in increments of `step`.
pub fn run(
    circuit: &Circuit,
    probes: &[BoundProbe],
    (start, stop, step): (f64, f64, f64),
    config: &SimulatorConfig,
    directive: DirectiveId,
) -> Result<TransientResult, SimulationError> {
    let count = point_count(start, stop, step)
        .map_err(|msg| SimulationError::invalid_directive(directive.0, msg))?;
    if count > config.max_points {
        return Err(SimulationError::invalid_directive(
            directive.0,
            format!("march has {} time points, limit is {}", count, config.max_points),
        ));
    }
    let _span = tracing::info_span!("transient_analysis", n_steps = count, step).entered();

    let layout = MnaLayout::new(circuit, AnalysisMode::Transient);
    let mut matrix: MnaMatrix<f64> = MnaMatrix::new(layout.size, config.pivot_tolerance);
    let mut companions: Vec<Option<Companion>> =
        circuit.components.iter().map(initial_companion).collect();

    let times: Vec<f64> = (0..count).map(|k| start + k as f64 * step).collect();
    let mut series: Vec<Series<f64>> = probes
        .iter()
        .map(|probe| Series {
            label: probe.label.clone(),
            values: Vec::with_capacity(count),
        })
        .collect();

    for k in 0..count {
        let stamps: Vec<Stamp<f64>> = circuit
            .components
            .iter()
            .zip(&companions)
            .map(|(comp, model)| transient_stamp(comp, model.as_ref(), step))
            .collect();
        assemble(circuit, &layout, &stamps, &mut matrix);
        let x = matrix.factor_and_solve().map_err(|err| {
            debug!(%err, step = k, "transient solve failed");
            SimulationError::singular(directive.0, Some(k))
        })?;

        // Record before the history moves on, so currents use this step's stamps
        for (probe, out) in probes.iter().zip(series.iter_mut()) {
            out.values
                .push(probe.target.evaluate(circuit, &layout, x, &stamps));
        }

        let voltage = |net: NetId| layout.node(net).map_or(0.0, |row| x[row]);
        for (comp, model) in circuit.components.iter().zip(companions.iter_mut()) {
            if let Some(model) = model {
                let [pos, neg] = comp.terminals;
                model.update_state(voltage(pos) - voltage(neg), step);
            }
        }
    }

    Ok(TransientResult { times, series })
}
