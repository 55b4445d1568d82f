//! Component kinds supported by the circuit language.
//!
//! Every component is a two-terminal element with the terminals `positive`
//! and `negative`:
//! - Passive: Resistor, Capacitor, Inductor
//! - Sources: VoltageSource, CurrentSource
//! - Measurement: Ammeter (a zero-volt source reporting its branch current)
//!
//! Kinds are a closed set; the MNA stamping for all of them lives in one
//! place (`solver::stamp`). This module owns the parameter tables used to
//! validate declarations and the backward-Euler companion state used by the
//! transient analysis.

mod companion;

pub use companion::Companion;

use std::fmt;

use crate::dsl::{Literal, ParamList, Quantity, Unit};
use crate::error::{Position, SemanticError, SemanticErrorKind};

/// Terminal names shared by every component kind, in stamping order.
pub const TERMINALS: [&str; 2] = ["positive", "negative"];

/// A closed set of component kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    Resistor,
    Capacitor,
    Inductor,
    VoltageSource,
    CurrentSource,
    Ammeter,
}

/// One declarable parameter of a component kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub unit: Unit,
    pub required: bool,
    /// Value must be strictly positive
    pub positive: bool,
}

const RESISTOR_PARAMS: &[ParamSpec] = &[ParamSpec {
    name: "resistance",
    unit: Unit::Ohm,
    required: true,
    positive: true,
}];

const CAPACITOR_PARAMS: &[ParamSpec] = &[ParamSpec {
    name: "capacitance",
    unit: Unit::Farad,
    required: true,
    positive: true,
}];

const INDUCTOR_PARAMS: &[ParamSpec] = &[ParamSpec {
    name: "inductance",
    unit: Unit::Henry,
    required: true,
    positive: true,
}];

const VOLTAGE_SOURCE_PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "voltage",
        unit: Unit::Volt,
        required: true,
        positive: false,
    },
    ParamSpec {
        name: "amplitude",
        unit: Unit::Volt,
        required: false,
        positive: false,
    },
];

const CURRENT_SOURCE_PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "current",
        unit: Unit::Ampere,
        required: true,
        positive: false,
    },
    ParamSpec {
        name: "amplitude",
        unit: Unit::Ampere,
        required: false,
        positive: false,
    },
];

impl ComponentKind {
    /// Every kind, in declaration order.
    pub const ALL: [ComponentKind; 6] = [
        Self::Resistor,
        Self::Capacitor,
        Self::Inductor,
        Self::VoltageSource,
        Self::CurrentSource,
        Self::Ammeter,
    ];

    /// Look up a kind by the type name used in source.
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_name() == name)
    }

    /// Type name as written in source.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Resistor => "Resistor",
            Self::Capacitor => "Capacitor",
            Self::Inductor => "Inductor",
            Self::VoltageSource => "VoltageSource",
            Self::CurrentSource => "CurrentSource",
            Self::Ammeter => "Ammeter",
        }
    }

    /// Terminal names of this kind.
    pub fn terminals(&self) -> &'static [&'static str] {
        &TERMINALS
    }

    /// Index of a terminal name, if the kind has it.
    pub fn terminal_index(&self, terminal: &str) -> Option<usize> {
        self.terminals().iter().position(|t| *t == terminal)
    }

    /// Parameter table, in positional order.
    pub fn params(&self) -> &'static [ParamSpec] {
        match self {
            Self::Resistor => RESISTOR_PARAMS,
            Self::Capacitor => CAPACITOR_PARAMS,
            Self::Inductor => INDUCTOR_PARAMS,
            Self::VoltageSource => VOLTAGE_SOURCE_PARAMS,
            Self::CurrentSource => CURRENT_SOURCE_PARAMS,
            Self::Ammeter => &[],
        }
    }

    /// Unit of the primary value. An ammeter reads as a zero-volt source.
    pub fn value_unit(&self) -> Unit {
        self.params().first().map(|p| p.unit).unwrap_or(Unit::Volt)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Validated parameters of one declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedParams {
    /// Primary value (resistance, capacitance, inductance, DC voltage/current)
    pub value: Quantity,
    /// AC excitation of a source, when given
    pub amplitude: Option<Quantity>,
}

/// Check a parameter list against the kind's table and bind every literal to
/// its base unit.
pub fn resolve_params(
    kind: ComponentKind,
    id: &str,
    params: &ParamList,
    position: Position,
) -> Result<ResolvedParams, SemanticError> {
    let specs = kind.params();
    let mut slots: Vec<Option<(Literal, Position)>> = vec![None; specs.len()];

    match params {
        ParamList::Positional(values) => {
            if values.len() > specs.len() {
                return Err(SemanticError::at(
                    SemanticErrorKind::InvalidParameter,
                    position,
                    format!(
                        "{} '{}' takes at most {} parameter(s), got {}",
                        kind,
                        id,
                        specs.len(),
                        values.len()
                    ),
                ));
            }
            for (slot, value) in slots.iter_mut().zip(values) {
                *slot = Some((*value, position));
            }
        }
        ParamList::Named(named) => {
            for param in named {
                let index = specs
                    .iter()
                    .position(|s| s.name == param.name)
                    .ok_or_else(|| {
                        SemanticError::at(
                            SemanticErrorKind::InvalidParameter,
                            param.position,
                            format!("{} has no parameter '{}'", kind, param.name),
                        )
                    })?;
                if slots[index].is_some() {
                    return Err(SemanticError::at(
                        SemanticErrorKind::InvalidParameter,
                        param.position,
                        format!("parameter '{}' of '{}' given twice", param.name, id),
                    ));
                }
                slots[index] = Some((param.value, param.position));
            }
        }
    }

    let mut resolved = Vec::with_capacity(specs.len());
    for (spec, slot) in specs.iter().zip(slots) {
        let Some((literal, at)) = slot else {
            if spec.required {
                return Err(SemanticError::at(
                    SemanticErrorKind::InvalidParameter,
                    position,
                    format!("{} '{}' requires parameter '{}'", kind, id, spec.name),
                ));
            }
            resolved.push(None);
            continue;
        };

        if let Some(unit) = literal.unit {
            if unit != spec.unit {
                return Err(SemanticError::at(
                    SemanticErrorKind::UnitMismatch,
                    at,
                    format!(
                        "parameter '{}' of '{}' expects {}, got {}",
                        spec.name, id, spec.unit, unit
                    ),
                ));
            }
        }
        if !literal.value.is_finite() || (spec.positive && literal.value <= 0.0) {
            return Err(SemanticError::at(
                SemanticErrorKind::InvalidParameter,
                at,
                format!(
                    "parameter '{}' of '{}' must be positive, got {}",
                    spec.name, id, literal.value
                ),
            ));
        }
        resolved.push(Some(Quantity::new(literal.value, spec.unit)));
    }

    let value = resolved
        .first()
        .copied()
        .flatten()
        .unwrap_or(Quantity::new(0.0, kind.value_unit()));
    let amplitude = resolved.get(1).copied().flatten();
    Ok(ResolvedParams { value, amplitude })
}
