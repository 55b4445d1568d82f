//! Rendering a flattened circuit back to source text.
//!
//! The output declares every component at top level and joins each net with
//! one `Connect`, so compiling it again gives the same components and the
//! same net partition. Dotted ids become `_`-joined identifiers.

use std::collections::HashSet;

use super::graph::Circuit;
use super::types::NetId;
use crate::components::TERMINALS;
use crate::dsl::{Directive, Probe, ProbeTarget};
use crate::solver::{resolve_probe, ResolvedProbe};

/// Identifiers chosen for the printed source.
struct PrintedNames {
    components: Vec<String>,
    nets: Vec<String>,
}

impl PrintedNames {
    fn assign(circuit: &Circuit) -> Self {
        let mut used = HashSet::new();
        let components = circuit
            .components
            .iter()
            .map(|comp| claim(&mut used, mangle(&comp.id)))
            .collect();

        let mut preferred: Vec<Option<&str>> = vec![None; circuit.num_nets];
        for (name, net) in &circuit.net_names {
            if let Some(slot) = preferred.get_mut(net.0) {
                if slot.is_none() {
                    *slot = Some(name.as_str());
                }
            }
        }
        let nets = circuit
            .nets()
            .map(|net| {
                if net.is_ground() {
                    return "ground".to_string();
                }
                match preferred[net.0] {
                    Some(name) => claim(&mut used, mangle(name)),
                    None => claim(&mut used, net.to_string()),
                }
            })
            .collect();

        Self { components, nets }
    }

    /// Re-target a probe at the printed names, keeping what it measures.
    fn probe(&self, circuit: &Circuit, probe: &Probe) -> String {
        let Ok(resolved) = resolve_probe(circuit, probe) else {
            return probe.to_string();
        };
        match resolved {
            ResolvedProbe::Voltage { pos, neg } if neg.is_ground() => {
                format!("V({})", self.nets[pos.0])
            }
            ResolvedProbe::Voltage { .. } => match &probe.target {
                ProbeTarget::Path(path) => circuit
                    .find_component(&path.join("."))
                    .map(|(id, _)| format!("V({})", self.components[id.0]))
                    .unwrap_or_else(|| probe.to_string()),
                ProbeTarget::Ground => probe.to_string(),
            },
            ResolvedProbe::Current { component } => {
                format!("I({})", self.components[component.0])
            }
        }
    }
}

/// `D1.Ra` -> `D1_Ra`
fn mangle(name: &str) -> String {
    name.replace('.', "_")
}

fn claim(used: &mut HashSet<String>, base: String) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    let mut k = 1;
    loop {
        let candidate = format!("{}_{}", base, k);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        k += 1;
    }
}

impl Circuit {
    /// Render as source text that compiles back to an equivalent circuit.
    pub fn to_source(&self) -> String {
        let names = PrintedNames::assign(self);
        let mut lines = vec![format!(
            "# flattened: {} components, {} nets",
            self.components.len(),
            self.num_nets
        )];

        for (comp, name) in self.components.iter().zip(&names.components) {
            let specs = comp.kind.params();
            let mut params = Vec::new();
            if let Some(spec) = specs.first() {
                params.push(format!("{}={}", spec.name, comp.value));
            }
            if let (Some(spec), Some(amplitude)) = (specs.get(1), comp.amplitude) {
                params.push(format!("{}={}", spec.name, amplitude));
            }
            if params.is_empty() {
                lines.push(format!("{} {};", comp.kind, name));
            } else {
                lines.push(format!("{} {}({});", comp.kind, name, params.join(", ")));
            }
        }

        for net in self.nets() {
            let mut endpoints = vec![names.nets[net.0].clone()];
            for (id, terminal) in self.net_members(net) {
                endpoints.push(format!("{}.{}", names.components[id.0], TERMINALS[terminal]));
            }
            if endpoints.len() > 1 {
                lines.push(format!("Connect({});", endpoints.join(", ")));
            }
        }

        if !self.directives.is_empty() {
            lines.push("Simulate {".to_string());
            for directive in &self.directives {
                let line = match directive {
                    Directive::Plot(probes) => {
                        let list: Vec<String> =
                            probes.iter().map(|p| names.probe(self, p)).collect();
                        format!("plot({});", list.join(", "))
                    }
                    other => other.to_string(),
                };
                lines.push(format!("    {}", line));
            }
            lines.push("}".to_string());
        }

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    /// Name a net would get in [`Circuit::to_source`] output.
    pub fn printed_net_name(&self, net: NetId) -> Option<String> {
        PrintedNames::assign(self).nets.get(net.0).cloned()
    }
}

/// Whether two circuits have the same components, in order, wired into the
/// same net partition (net ids may differ).
pub fn same_topology(a: &Circuit, b: &Circuit) -> bool {
    if a.components.len() != b.components.len() || a.num_nets != b.num_nets {
        return false;
    }
    let mut forward = vec![None; a.num_nets];
    let mut backward = vec![None; b.num_nets];
    for (ca, cb) in a.components.iter().zip(&b.components) {
        if ca.kind != cb.kind || ca.value != cb.value || ca.amplitude != cb.amplitude {
            return false;
        }
        for (na, nb) in ca.terminals.iter().zip(&cb.terminals) {
            let (Some(fwd), Some(bwd)) = (forward.get_mut(na.0), backward.get_mut(nb.0)) else {
                return false;
            };
            if *fwd.get_or_insert(*nb) != *nb || *bwd.get_or_insert(*na) != *na {
                return false;
            }
        }
    }
    forward.first().copied().flatten().map_or(true, |g: NetId| g.is_ground())
}
