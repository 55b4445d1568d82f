//! AC frequency sweep analysis.
//!
//! For each frequency point:
//!   1. Stamp every element over the complex field at ω = 2πf
//!   2. Solve Ax = z once
//!   3. Record each probe's complex value
//!
//! Frequency points are generated according to sweep type:
//!   - DEC: logarithmic, `points` per decade
//!   - OCT: logarithmic, `points` per octave
//!   - LIN: linear, `points` total including both ends

use num_complex::Complex64;
use tracing::debug;

use super::layout::{AnalysisMode, MnaLayout};
use super::mna::MnaMatrix;
use super::probe::BoundProbe;
use super::results::{AcResult, DirectiveId, Series};
use super::simulator::SimulatorConfig;
use super::stamp::{ac_stamp, angular_frequency, assemble, Stamp};
use crate::circuit::Circuit;
use crate::dsl::{AcSweep, SweepKind};
use crate::error::SimulationError;

/// Slack on the stop frequency of logarithmic sweeps.
const STOP_TOLERANCE: f64 = 1e-9;

/// Run one AC sweep.
pub fn run(
    circuit: &Circuit,
    probes: &[BoundProbe],
    sweep: &AcSweep,
    config: &SimulatorConfig,
    directive: DirectiveId,
) -> Result<AcResult, SimulationError> {
    let count = point_count(sweep).map_err(|msg| SimulationError::invalid_directive(directive.0, msg))?;
    if count > config.max_points {
        return Err(SimulationError::invalid_directive(
            directive.0,
            format!("sweep has {} points, limit is {}", count, config.max_points),
        ));
    }
    let frequencies = generate_frequencies(sweep, count);
    let _span = tracing::info_span!("ac_analysis", n_points = frequencies.len()).entered();

    let layout = MnaLayout::new(circuit, AnalysisMode::Ac);
    let mut matrix: MnaMatrix<Complex64> = MnaMatrix::new(layout.size, config.pivot_tolerance);
    let mut series: Vec<Series<Complex64>> = probes
        .iter()
        .map(|probe| Series {
            label: probe.label.clone(),
            values: Vec::with_capacity(frequencies.len()),
        })
        .collect();

    for (i, &f) in frequencies.iter().enumerate() {
        let omega = angular_frequency(f);
        let stamps: Vec<Stamp<Complex64>> = circuit
            .components
            .iter()
            .map(|comp| ac_stamp(comp, omega))
            .collect();
        assemble(circuit, &layout, &stamps, &mut matrix);
        let x = matrix.factor_and_solve().map_err(|err| {
            debug!(%err, frequency = f, "ac solve failed");
            SimulationError::singular(directive.0, Some(i))
        })?;

        for (probe, out) in probes.iter().zip(series.iter_mut()) {
            out.values
                .push(probe.target.evaluate(circuit, &layout, x, &stamps));
        }
    }

    Ok(AcResult {
        frequencies,
        series,
    })
}

/// Number of frequency points a sweep produces, or why it is invalid.
pub fn point_count(sweep: &AcSweep) -> Result<usize, String> {
    if sweep.points == 0 {
        return Err("point count must be at least 1".to_string());
    }
    if !sweep.start.is_finite() || !sweep.stop.is_finite() {
        return Err("frequencies must be finite".to_string());
    }
    if sweep.stop < sweep.start {
        return Err(format!(
            "stop frequency {} is below start frequency {}",
            sweep.stop, sweep.start
        ));
    }
    let base = match sweep.kind {
        SweepKind::Lin => {
            if sweep.start < 0.0 {
                return Err("frequencies must not be negative".to_string());
            }
            return Ok(sweep.points);
        }
        SweepKind::Dec => 10.0_f64,
        SweepKind::Oct => 2.0_f64,
    };
    if sweep.start <= 0.0 {
        return Err(format!("{} sweep must start above 0 Hz", sweep.kind));
    }
    let span = (sweep.stop / sweep.start).log(base);
    let steps = (sweep.points as f64 * span + STOP_TOLERANCE).floor();
    if !(steps < usize::MAX as f64) {
        return Err(format!("{} sweep has too many points", sweep.kind));
    }
    Ok(steps as usize + 1)
}

/// Frequency points of a validated sweep.
pub fn generate_frequencies(sweep: &AcSweep, count: usize) -> Vec<f64> {
    let n = sweep.points as f64;
    match sweep.kind {
        SweepKind::Dec => (0..count)
            .map(|i| sweep.start * 10.0_f64.powf(i as f64 / n))
            .collect(),
        SweepKind::Oct => (0..count)
            .map(|i| sweep.start * 2.0_f64.powf(i as f64 / n))
            .collect(),
        SweepKind::Lin => {
            if count <= 1 {
                return vec![sweep.start];
            }
            let step = (sweep.stop - sweep.start) / (count - 1) as f64;
            (0..count).map(|i| sweep.start + step * i as f64).collect()
        }
    }
}
