//! Circuit validation.

use std::collections::VecDeque;

use super::{Circuit, NetId};
use crate::error::{SemanticError, SemanticErrorKind};

/// Validate the connectivity of a flattened circuit.
///
/// Checks:
/// - every component terminal refers to an existing net
/// - every net reaches ground through the component graph
pub fn validate_circuit(circuit: &Circuit) -> Result<(), SemanticError> {
    for comp in &circuit.components {
        if let Some(net) = comp.terminals.iter().find(|n| n.0 >= circuit.num_nets) {
            return Err(SemanticError::new(
                SemanticErrorKind::UnboundTerminal,
                format!("component '{}' refers to unknown net {}", comp.id, net),
            ));
        }
    }

    let reachable = reachable_from_ground(circuit);
    if let Some(floating) = circuit.nets().find(|n| !reachable[n.0]) {
        return Err(SemanticError::new(
            SemanticErrorKind::FloatingNet,
            format!(
                "net '{}' has no path to ground",
                circuit.net_label(floating)
            ),
        ));
    }

    Ok(())
}

/// Breadth-first search from ground, treating each component as an edge
/// between its terminal nets.
pub fn reachable_from_ground(circuit: &Circuit) -> Vec<bool> {
    let mut adjacency: Vec<Vec<NetId>> = vec![Vec::new(); circuit.num_nets];
    for comp in &circuit.components {
        let [a, b] = comp.terminals;
        adjacency[a.0].push(b);
        adjacency[b.0].push(a);
    }

    let mut reachable = vec![false; circuit.num_nets];
    if circuit.num_nets == 0 {
        return reachable;
    }
    reachable[NetId::GROUND.0] = true;
    let mut queue = VecDeque::from([NetId::GROUND]);
    while let Some(net) = queue.pop_front() {
        for &next in &adjacency[net.0] {
            if !reachable[next.0] {
                reachable[next.0] = true;
                queue.push_back(next);
            }
        }
    }
    reachable
}
