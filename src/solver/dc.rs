//! DC operating point: capacitors open, inductors shorted, one real solve.

use tracing::debug;

use super::layout::{AnalysisMode, MnaLayout};
use super::mna::MnaMatrix;
use super::probe::BoundProbe;
use super::results::{DcResult, DirectiveId};
use super::simulator::SimulatorConfig;
use super::stamp::{assemble, dc_stamp, Stamp};
use crate::circuit::{Circuit, ComponentId};
use crate::error::SimulationError;

/// Solve the operating point and read every net, branch and probe.
pub fn run(
    circuit: &Circuit,
    probes: &[BoundProbe],
    config: &SimulatorConfig,
    directive: DirectiveId,
) -> Result<DcResult, SimulationError> {
    let layout = MnaLayout::new(circuit, AnalysisMode::Dc);
    let _span = tracing::info_span!("dc_analysis", size = layout.size).entered();

    let stamps: Vec<Stamp<f64>> = circuit.components.iter().map(dc_stamp).collect();
    let mut matrix = MnaMatrix::new(layout.size, config.pivot_tolerance);
    assemble(circuit, &layout, &stamps, &mut matrix);
    let x = matrix.factor_and_solve().map_err(|err| {
        debug!(%err, "dc solve failed");
        SimulationError::singular(directive.0, None)
    })?;

    let labels = circuit.net_labels();
    let node_voltages = circuit
        .nets()
        .filter_map(|net| {
            layout
                .node(net)
                .map(|row| (labels[net.0].clone(), x[row]))
        })
        .collect();

    let branch_currents = circuit
        .components
        .iter()
        .enumerate()
        .filter_map(|(i, comp)| {
            layout
                .branch(ComponentId(i))
                .map(|row| (format!("I({})", comp.id), x[row]))
        })
        .collect();

    let probes = probes
        .iter()
        .map(|probe| {
            let value = probe.target.evaluate(circuit, &layout, x, &stamps);
            (probe.label.clone(), value)
        })
        .collect();

    Ok(DcResult {
        node_voltages,
        branch_currents,
        probes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;
    use crate::solver::probe::bind_probes;
    use approx::assert_relative_eq;

    fn solve(src: &str) -> DcResult {
        let circuit = compile(src).unwrap();
        let probes = bind_probes(&circuit, &[]).unwrap();
        run(&circuit, &probes, &SimulatorConfig::default(), DirectiveId(0)).unwrap()
    }

    #[test]
    fn test_inductor_shorts_and_capacitor_opens() {
        let result = solve(
            "VoltageSource V1(10 V);
             Resistor R1(1 kohm);
             Inductor L1(10 mH);
             Capacitor C1(1 uF);
             Resistor R2(1 kohm);
             Connect(V1.positive, R1.positive);
             Connect(R1.negative, L1.positive, a);
             Connect(L1.negative, R2.positive, C1.positive, b);
             Connect(V1.negative, R2.negative, C1.negative, ground);",
        );
        assert_relative_eq!(result.voltage("a").unwrap(), 5.0, epsilon = 1e-9);
        assert_relative_eq!(result.voltage("b").unwrap(), 5.0, epsilon = 1e-9);

        let branches: Vec<&str> = result
            .branch_currents
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(branches, vec!["I(V1)", "I(L1)"]);
        // 5 mA flows out of V1's positive terminal and into L1's
        assert_relative_eq!(result.branch_currents[0].1, -5e-3, epsilon = 1e-12);
        assert_relative_eq!(result.branch_currents[1].1, 5e-3, epsilon = 1e-12);
    }

    #[test]
    fn test_current_source_drives_positive_terminal() {
        let result = solve(
            "CurrentSource I1(2 mA);
             Resistor R1(1 kohm);
             Connect(I1.positive, R1.positive, top);
             Connect(I1.negative, R1.negative, ground);",
        );
        assert_relative_eq!(result.voltage("top").unwrap(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gigaohm_divider_solves() {
        let result = solve(
            "VoltageSource V1(10 V);
             Resistor R1(1e7 Gohm);
             Resistor R2(1e7 Gohm);
             Connect(V1.positive, R1.positive);
             Connect(R1.negative, R2.positive, mid);
             Connect(V1.negative, R2.negative, ground);",
        );
        assert_relative_eq!(result.voltage("mid").unwrap(), 5.0, epsilon = 1e-9);
        assert_relative_eq!(result.branch_currents[0].1, -5e-16, max_relative = 1e-9);
    }

    #[test]
    fn test_source_loop_is_singular() {
        let circuit = compile(
            "VoltageSource V1(1 V);
             VoltageSource V2(2 V);
             Resistor R1(1 kohm);
             Connect(V1.positive, V2.positive, R1.positive);
             Connect(V1.negative, V2.negative, R1.negative, ground);",
        )
        .unwrap();
        let err = run(&circuit, &[], &SimulatorConfig::default(), DirectiveId(3)).unwrap_err();
        assert_eq!(err, SimulationError::singular(3, None));
    }
}
