//! Per-kind MNA stamps for each analysis, and their assembly.
//!
//! All numeric behavior of the component kinds lives here, as one match per
//! analysis:
//!
//! | Kind | DC | AC | Transient |
//! |------|----|----|-----------|
//! | Resistor | `1/R` | `1/R` | `1/R` |
//! | Capacitor | open | `jωC` | `C/h` + history |
//! | Inductor | short (branch) | branch, `Z = jωL` | `h/L` + history |
//! | VoltageSource | branch, `E = V` | branch, `E = amplitude` | branch, `E = V` |
//! | CurrentSource | `I` into positive | `amplitude` into positive | `I` into positive |
//! | Ammeter | branch, `E = 0` | branch, `E = 0` | branch, `E = 0` |

use std::f64::consts::PI;

use num_complex::Complex64;

use super::layout::MnaLayout;
use super::mna::{MnaMatrix, Scalar};
use crate::circuit::{Circuit, ComponentId, FlatComponent};
use crate::components::{Companion, ComponentKind};

/// How one component enters the system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stamp<T> {
    /// Admittance between the terminals
    Admittance(T),
    /// No contribution
    Open,
    /// Branch current unknown with `V+ - V- - Z*I = E`
    Branch { impedance: T, source: T },
    /// Current driven out of the positive terminal into the circuit
    Injection(T),
    /// Backward-Euler conductance plus history current into the positive terminal
    Companion { conductance: T, history: T },
}

impl<T: Scalar> Stamp<T> {
    /// Current entering the positive terminal, given the solved terminal
    /// voltage and the branch unknown (if the element has one).
    pub fn current(&self, voltage: T, branch: Option<T>) -> T {
        match *self {
            Self::Admittance(y) => y * voltage,
            Self::Open => T::zero(),
            Self::Branch { .. } => branch.unwrap_or(T::zero()),
            Self::Injection(i) => -i,
            Self::Companion {
                conductance,
                history,
            } => conductance * voltage - history,
        }
    }
}

/// Angular frequency of a frequency in hertz.
pub fn angular_frequency(frequency: f64) -> f64 {
    2.0 * PI * frequency
}

/// DC operating point: capacitors open, inductors shorted.
pub fn dc_stamp(comp: &FlatComponent) -> Stamp<f64> {
    let value = comp.value.value();
    match comp.kind {
        ComponentKind::Resistor => Stamp::Admittance(1.0 / value),
        ComponentKind::Capacitor => Stamp::Open,
        ComponentKind::Inductor | ComponentKind::Ammeter => Stamp::Branch {
            impedance: 0.0,
            source: 0.0,
        },
        ComponentKind::VoltageSource => Stamp::Branch {
            impedance: 0.0,
            source: value,
        },
        ComponentKind::CurrentSource => Stamp::Injection(value),
    }
}

/// Small-signal stamp at angular frequency `omega`.
pub fn ac_stamp(comp: &FlatComponent, omega: f64) -> Stamp<Complex64> {
    let value = comp.value.value();
    let zero = Complex64::zero();
    match comp.kind {
        ComponentKind::Resistor => Stamp::Admittance(Complex64::from_real(1.0 / value)),
        ComponentKind::Capacitor => Stamp::Admittance(Complex64::new(0.0, omega * value)),
        ComponentKind::Inductor => Stamp::Branch {
            impedance: Complex64::new(0.0, omega * value),
            source: zero,
        },
        ComponentKind::VoltageSource => Stamp::Branch {
            impedance: zero,
            source: Complex64::from_real(comp.ac_value()),
        },
        ComponentKind::Ammeter => Stamp::Branch {
            impedance: zero,
            source: zero,
        },
        ComponentKind::CurrentSource => Stamp::Injection(Complex64::from_real(comp.ac_value())),
    }
}

/// Transient stamp for step size `h`. Storage elements use their companion
/// state; everything else stamps as at DC.
pub fn transient_stamp(comp: &FlatComponent, companion: Option<&Companion>, h: f64) -> Stamp<f64> {
    let companion = companion
        .copied()
        .or_else(|| initial_companion(comp));
    match (comp.kind, companion) {
        (ComponentKind::Capacitor | ComponentKind::Inductor, Some(model)) => Stamp::Companion {
            conductance: model.conductance(h),
            history: model.history_injection(h),
        },
        _ => dc_stamp(comp),
    }
}

/// Zero-history companion model for a storage element.
pub fn initial_companion(comp: &FlatComponent) -> Option<Companion> {
    match comp.kind {
        ComponentKind::Capacitor => Some(Companion::capacitor(comp.value.value())),
        ComponentKind::Inductor => Some(Companion::inductor(comp.value.value())),
        _ => None,
    }
}

/// Clear the system and stamp every component.
pub fn assemble<T: Scalar>(
    circuit: &Circuit,
    layout: &MnaLayout,
    stamps: &[Stamp<T>],
    matrix: &mut MnaMatrix<T>,
) {
    matrix.clear();
    for (index, (comp, stamp)) in circuit.components.iter().zip(stamps).enumerate() {
        let [pos, neg] = comp.terminals;
        let n1 = layout.node(pos);
        let n2 = layout.node(neg);
        match *stamp {
            Stamp::Admittance(y) => matrix.stamp_admittance(n1, n2, y),
            Stamp::Open => {}
            Stamp::Branch { impedance, source } => {
                if let Some(br) = layout.branch(ComponentId(index)) {
                    matrix.stamp_branch(n1, n2, br, impedance, source);
                }
            }
            Stamp::Injection(current) => matrix.inject_current(n1, n2, current),
            Stamp::Companion {
                conductance,
                history,
            } => {
                matrix.stamp_admittance(n1, n2, conductance);
                matrix.inject_current(n1, n2, history);
            }
        }
    }
}
