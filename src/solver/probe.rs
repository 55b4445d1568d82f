//! Resolution of `plot` expressions against a flattened circuit.

use super::layout::MnaLayout;
use super::mna::Scalar;
use super::stamp::Stamp;
use crate::circuit::{Circuit, ComponentId, NetId};
use crate::dsl::{Probe, ProbeKind, ProbeTarget};
use crate::error::SimulationError;

/// What a probe reads from a solved system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedProbe {
    /// `V(pos) - V(neg)`
    Voltage { pos: NetId, neg: NetId },
    /// Current entering a component's positive terminal
    Current { component: ComponentId },
}

/// A probe bound to the circuit, with its display label.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundProbe {
    pub label: String,
    pub target: ResolvedProbe,
}

impl ResolvedProbe {
    /// Read the probe from a solution vector. `stamps` must be the ones the
    /// system was assembled from.
    pub fn evaluate<T: Scalar>(
        &self,
        circuit: &Circuit,
        layout: &MnaLayout,
        x: &[T],
        stamps: &[Stamp<T>],
    ) -> T {
        let voltage = |net: NetId| layout.node(net).map_or(T::zero(), |i| x[i]);
        match *self {
            Self::Voltage { pos, neg } => voltage(pos) - voltage(neg),
            Self::Current { component } => {
                let [pos, neg] = circuit.component(component).terminals;
                let branch = layout.branch(component).map(|b| x[b]);
                stamps[component.0].current(voltage(pos) - voltage(neg), branch)
            }
        }
    }
}

/// Resolve one probe expression.
///
/// `V(a.b)` tries component `a` terminal `b`, then the net named `a.b`,
/// then the voltage across component `a.b`.
pub fn resolve_probe(circuit: &Circuit, probe: &Probe) -> Result<ResolvedProbe, SimulationError> {
    let unknown = || SimulationError::UnknownProbe {
        probe: probe.to_string(),
    };
    let path = match &probe.target {
        ProbeTarget::Ground => {
            return match probe.kind {
                ProbeKind::Voltage => Ok(ResolvedProbe::Voltage {
                    pos: NetId::GROUND,
                    neg: NetId::GROUND,
                }),
                ProbeKind::Current => Err(unknown()),
            };
        }
        ProbeTarget::Path(path) if !path.is_empty() => path,
        ProbeTarget::Path(_) => return Err(unknown()),
    };
    let full = path.join(".");

    match probe.kind {
        ProbeKind::Current => circuit
            .find_component(&full)
            .map(|(component, _)| ResolvedProbe::Current { component })
            .ok_or_else(unknown),
        ProbeKind::Voltage => {
            if let Some((terminal, owner)) = path.split_last().filter(|(_, owner)| !owner.is_empty()) {
                let terminal_net = circuit
                    .find_component(&owner.join("."))
                    .and_then(|(_, comp)| comp.terminal_net(terminal));
                if let Some(net) = terminal_net {
                    return Ok(ResolvedProbe::Voltage {
                        pos: net,
                        neg: NetId::GROUND,
                    });
                }
            }
            if let Some(net) = circuit.find_net(&full) {
                return Ok(ResolvedProbe::Voltage {
                    pos: net,
                    neg: NetId::GROUND,
                });
            }
            circuit
                .find_component(&full)
                .map(|(_, comp)| ResolvedProbe::Voltage {
                    pos: comp.terminals[0],
                    neg: comp.terminals[1],
                })
                .ok_or_else(unknown)
        }
    }
}

/// Resolve every probe, or default to the voltage of each non-ground net.
pub fn bind_probes(circuit: &Circuit, probes: &[Probe]) -> Result<Vec<BoundProbe>, SimulationError> {
    if probes.is_empty() {
        let labels = circuit.net_labels();
        return Ok(circuit
            .nets()
            .filter(|net| !net.is_ground())
            .map(|net| BoundProbe {
                label: format!("V({})", labels[net.0]),
                target: ResolvedProbe::Voltage {
                    pos: net,
                    neg: NetId::GROUND,
                },
            })
            .collect());
    }
    probes
        .iter()
        .map(|probe| {
            resolve_probe(circuit, probe).map(|target| BoundProbe {
                label: probe.to_string(),
                target,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;

    fn divider() -> Circuit {
        compile(
            "VoltageSource V1(5 V);
             Resistor R1(1 kohm);
             Resistor R2(2 kohm);
             Connect(V1.positive, R1.positive);
             Connect(R1.negative, R2.positive, out);
             Connect(V1.negative, R2.negative, ground);",
        )
        .unwrap()
    }

    #[test]
    fn test_resolution_order() {
        let circuit = divider();
        let out = circuit.find_net("out").unwrap();

        assert_eq!(
            resolve_probe(&circuit, &Probe::voltage("out")).unwrap(),
            ResolvedProbe::Voltage {
                pos: out,
                neg: NetId::GROUND
            }
        );
        assert_eq!(
            resolve_probe(&circuit, &Probe::voltage("R2.positive")).unwrap(),
            ResolvedProbe::Voltage {
                pos: out,
                neg: NetId::GROUND
            }
        );
        assert_eq!(
            resolve_probe(&circuit, &Probe::voltage("R2")).unwrap(),
            ResolvedProbe::Voltage {
                pos: out,
                neg: NetId::GROUND
            }
        );
        assert_eq!(
            resolve_probe(&circuit, &Probe::current("V1")).unwrap(),
            ResolvedProbe::Current {
                component: ComponentId(0)
            }
        );
    }

    #[test]
    fn test_unknown_probes() {
        let circuit = divider();
        for probe in [
            Probe::voltage("missing"),
            Probe::voltage("R1.middle"),
            Probe::current("out"),
            Probe {
                kind: ProbeKind::Current,
                target: ProbeTarget::Ground,
            },
        ] {
            let err = resolve_probe(&circuit, &probe).unwrap_err();
            assert!(matches!(err, SimulationError::UnknownProbe { .. }));
        }
    }

    #[test]
    fn test_default_probes_cover_every_net() {
        let circuit = divider();
        let bound = bind_probes(&circuit, &[]).unwrap();
        assert_eq!(bound.len(), circuit.num_free_nets());
        assert!(bound.iter().any(|p| p.label == "V(out)"));
    }
}
