//! The flattened circuit produced by semantic analysis.

use std::collections::BTreeMap;

use super::types::{ComponentId, NetId};
use crate::components::ComponentKind;
use crate::dsl::{Directive, Quantity};

/// One component after subcircuit expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatComponent {
    pub kind: ComponentKind,
    /// Globally unique id, dotted by instance path (`D1.Ra`)
    pub id: String,
    /// Primary value in base SI units
    pub value: Quantity,
    /// AC excitation of a source, if declared separately from its DC value
    pub amplitude: Option<Quantity>,
    /// Nets of `[positive, negative]`
    pub terminals: [NetId; 2],
    /// Instance ids leading to this component; empty at top level
    pub origin: Vec<String>,
}

impl FlatComponent {
    /// Net bound to a terminal name.
    pub fn terminal_net(&self, terminal: &str) -> Option<NetId> {
        self.kind.terminal_index(terminal).map(|i| self.terminals[i])
    }

    /// Excitation used by the AC analysis.
    pub fn ac_value(&self) -> f64 {
        self.amplitude.unwrap_or(self.value).value()
    }
}

/// A complete flattened circuit ready for simulation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Circuit {
    /// All components, in expansion order
    pub components: Vec<FlatComponent>,

    /// Number of nets (including ground)
    pub num_nets: usize,

    /// User-visible net names, dotted by instance path
    pub net_names: BTreeMap<String, NetId>,

    /// Directives of the top-level `Simulate` blocks, in source order
    pub directives: Vec<Directive>,
}

impl Circuit {
    /// Iterate over every net id, ground first.
    pub fn nets(&self) -> impl Iterator<Item = NetId> {
        (0..self.num_nets).map(NetId)
    }

    /// Number of nets excluding ground.
    pub fn num_free_nets(&self) -> usize {
        self.num_nets.saturating_sub(1)
    }

    /// Find a net by name. `ground` always resolves.
    pub fn find_net(&self, name: &str) -> Option<NetId> {
        if name == "ground" {
            return Some(NetId::GROUND);
        }
        self.net_names.get(name).copied()
    }

    /// Find a component by its flattened id.
    pub fn find_component(&self, id: &str) -> Option<(ComponentId, &FlatComponent)> {
        self.components
            .iter()
            .enumerate()
            .find(|(_, c)| c.id == id)
            .map(|(i, c)| (ComponentId(i), c))
    }

    /// Get a component by index.
    pub fn component(&self, id: ComponentId) -> &FlatComponent {
        &self.components[id.0]
    }

    /// Terminals attached to a net, as `(component, terminal index)`.
    pub fn net_members(&self, net: NetId) -> Vec<(ComponentId, usize)> {
        let mut members = Vec::new();
        for (i, comp) in self.components.iter().enumerate() {
            for (t, n) in comp.terminals.iter().enumerate() {
                if *n == net {
                    members.push((ComponentId(i), t));
                }
            }
        }
        members
    }

    /// Display label of every net, indexed by net id.
    ///
    /// Preference: `ground`, then the smallest user name, then the first
    /// terminal on the net (`R1.negative`), then `_n<k>`.
    pub fn net_labels(&self) -> Vec<String> {
        let mut labels: Vec<Option<String>> = vec![None; self.num_nets];
        if let Some(first) = labels.first_mut() {
            *first = Some("ground".to_string());
        }
        for (name, net) in &self.net_names {
            let slot = &mut labels[net.0];
            if slot.is_none() {
                *slot = Some(name.clone());
            }
        }
        for comp in &self.components {
            for (terminal, net) in comp.kind.terminals().iter().zip(comp.terminals) {
                let slot = &mut labels[net.0];
                if slot.is_none() {
                    *slot = Some(format!("{}.{}", comp.id, terminal));
                }
            }
        }
        labels
            .into_iter()
            .enumerate()
            .map(|(i, label)| label.unwrap_or_else(|| NetId(i).to_string()))
            .collect()
    }

    /// Display label of one net.
    pub fn net_label(&self, net: NetId) -> String {
        self.net_labels()
            .into_iter()
            .nth(net.0)
            .unwrap_or_else(|| net.to_string())
    }
}
