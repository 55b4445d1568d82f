//! Assignment of MNA unknowns to nets and branch currents.

use crate::circuit::{Circuit, ComponentId, NetId};
use crate::components::ComponentKind;

/// Which analysis a system is being built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMode {
    Dc,
    Ac,
    Transient,
}

/// Unknown layout of one MNA system: node voltages first (ground excluded),
/// then one branch current per element that needs one.
#[derive(Debug, Clone, PartialEq)]
pub struct MnaLayout {
    /// Non-ground nets
    pub num_nodes: usize,
    /// Branch row per component, `None` for elements without a branch unknown
    branches: Vec<Option<usize>>,
    /// Total system dimension
    pub size: usize,
}

impl MnaLayout {
    pub fn new(circuit: &Circuit, mode: AnalysisMode) -> Self {
        let num_nodes = circuit.num_free_nets();
        let mut next = num_nodes;
        let branches = circuit
            .components
            .iter()
            .map(|comp| {
                if needs_branch(comp.kind, mode) {
                    next += 1;
                    Some(next - 1)
                } else {
                    None
                }
            })
            .collect();
        Self {
            num_nodes,
            branches,
            size: next,
        }
    }

    /// Matrix row of a net voltage, `None` for ground.
    pub fn node(&self, net: NetId) -> Option<usize> {
        net.matrix_index()
    }

    /// Matrix row of a component's branch current.
    pub fn branch(&self, id: ComponentId) -> Option<usize> {
        self.branches.get(id.0).copied().flatten()
    }

    /// Number of branch unknowns.
    pub fn num_branches(&self) -> usize {
        self.size - self.num_nodes
    }
}

/// Voltage-defined elements get a branch current unknown. Inductors are
/// voltage-defined (a short at DC, `jωL` in AC) except under their
/// transient companion model.
fn needs_branch(kind: ComponentKind, mode: AnalysisMode) -> bool {
    match kind {
        ComponentKind::VoltageSource | ComponentKind::Ammeter => true,
        ComponentKind::Inductor => mode != AnalysisMode::Transient,
        ComponentKind::Resistor | ComponentKind::Capacitor | ComponentKind::CurrentSource => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::FlatComponent;
    use crate::dsl::Quantity;

    fn comp(kind: ComponentKind, a: usize, b: usize) -> FlatComponent {
        FlatComponent {
            kind,
            id: kind.type_name().to_string(),
            value: Quantity::new(1.0, kind.value_unit()),
            amplitude: None,
            terminals: [NetId(a), NetId(b)],
            origin: Vec::new(),
        }
    }

    #[test]
    fn test_branches_follow_nodes() {
        let circuit = Circuit {
            components: vec![
                comp(ComponentKind::VoltageSource, 1, 0),
                comp(ComponentKind::Resistor, 1, 2),
                comp(ComponentKind::Inductor, 2, 0),
            ],
            num_nets: 3,
            ..Default::default()
        };

        let dc = MnaLayout::new(&circuit, AnalysisMode::Dc);
        assert_eq!(dc.size, 4);
        assert_eq!(dc.branch(ComponentId(0)), Some(2));
        assert_eq!(dc.branch(ComponentId(1)), None);
        assert_eq!(dc.branch(ComponentId(2)), Some(3));

        let tran = MnaLayout::new(&circuit, AnalysisMode::Transient);
        assert_eq!(tran.size, 3);
        assert_eq!(tran.branch(ComponentId(2)), None);
        assert_eq!(tran.num_branches(), 1);
        assert_eq!(tran.node(NetId(2)), Some(1));
    }
}
