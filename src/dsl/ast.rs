//! Abstract Syntax Tree types for the circuit DSL.

use std::fmt;

use super::units::Literal;
use crate::components::ComponentKind;
use crate::error::Position;

/// Default `ac;` sweep: decade sweep, 10 points per decade.
pub const DEFAULT_AC_POINTS: usize = 10;
/// Default `ac;` start frequency (Hz).
pub const DEFAULT_AC_START: f64 = 1.0;
/// Default `ac;` stop frequency (Hz).
pub const DEFAULT_AC_STOP: f64 = 1e6;

/// Complete AST of one compile unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

/// A top-level or subcircuit-body statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Component(ComponentDecl),
    Connect(Connect),
    SubcircuitDef(SubcircuitDef),
    SubcircuitInstance(SubcircuitInstance),
    Simulate(SimulateBlock),
}

impl Statement {
    pub fn position(&self) -> Position {
        match self {
            Self::Component(s) => s.position,
            Self::Connect(s) => s.position,
            Self::SubcircuitDef(s) => s.position,
            Self::SubcircuitInstance(s) => s.position,
            Self::Simulate(s) => s.position,
        }
    }
}

/// `Resistor R1(1 kohm);`
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDecl {
    pub kind: ComponentKind,
    pub id: String,
    pub params: ParamList,
    pub position: Position,
}

/// Parameter list of a component declaration. Styles never mix.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamList {
    Positional(Vec<Literal>),
    Named(Vec<NamedParam>),
}

impl ParamList {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Positional(v) => v.is_empty(),
            Self::Named(v) => v.is_empty(),
        }
    }
}

/// `name=value`
#[derive(Debug, Clone, PartialEq)]
pub struct NamedParam {
    pub name: String,
    pub value: Literal,
    pub position: Position,
}

/// `Connect(a, b, ...);`: all endpoints join one net.
#[derive(Debug, Clone, PartialEq)]
pub struct Connect {
    pub endpoints: Vec<Endpoint>,
    pub position: Position,
}

/// One side of a connection or the target of a port binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `ref.terminal`
    Terminal { reference: String, terminal: String },
    /// A bare identifier naming a net
    Net(String),
    /// The `ground` keyword
    Ground,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal {
                reference,
                terminal,
            } => write!(f, "{}.{}", reference, terminal),
            Self::Net(name) => f.write_str(name),
            Self::Ground => f.write_str("ground"),
        }
    }
}

/// `Subcircuit Name(port, ...) { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct SubcircuitDef {
    pub name: String,
    pub ports: Vec<String>,
    pub body: Vec<Statement>,
    pub position: Position,
}

/// `Name Inst(port=net, ...);` or `Name port=net ...;`
#[derive(Debug, Clone, PartialEq)]
pub struct SubcircuitInstance {
    /// Name of the instantiated definition
    pub definition: String,
    /// Explicit instance id, if written
    pub id: Option<String>,
    pub bindings: Vec<PortBinding>,
    pub position: Position,
}

/// `port=net`
#[derive(Debug, Clone, PartialEq)]
pub struct PortBinding {
    pub port: String,
    pub net: Endpoint,
    pub position: Position,
}

/// `Simulate { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct SimulateBlock {
    pub directives: Vec<Directive>,
    pub position: Position,
}

/// One analysis request or plot list.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// DC operating point
    Dc,
    /// AC sweep; `ac(f)` is a one-point linear sweep
    Ac(AcSweep),
    /// Backward-Euler time march
    Transient { start: f64, stop: f64, step: f64 },
    /// Probe expressions extracted by the other directives
    Plot(Vec<Probe>),
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dc => f.write_str("dc;"),
            Self::Ac(sweep) => write!(
                f,
                "ac({}, {}, {}, {});",
                sweep.kind, sweep.points, sweep.start, sweep.stop
            ),
            Self::Transient { start, stop, step } => {
                write!(f, "transient({}, {}, {});", start, stop, step)
            }
            Self::Plot(probes) => {
                let list: Vec<String> = probes.iter().map(|p| p.to_string()).collect();
                write!(f, "plot({});", list.join(", "))
            }
        }
    }
}

/// Frequency point distribution of an AC sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SweepKind {
    /// `points` per decade
    Dec,
    /// `points` per octave
    Oct,
    /// `points` in total, evenly spaced
    Lin,
}

impl SweepKind {
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "dec" => Some(Self::Dec),
            "oct" => Some(Self::Oct),
            "lin" => Some(Self::Lin),
            _ => None,
        }
    }
}

impl fmt::Display for SweepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dec => "dec",
            Self::Oct => "oct",
            Self::Lin => "lin",
        })
    }
}

/// Parameters of an AC sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcSweep {
    pub kind: SweepKind,
    pub points: usize,
    pub start: f64,
    pub stop: f64,
}

impl AcSweep {
    /// Sweep at exactly one frequency.
    pub fn single(frequency: f64) -> Self {
        Self {
            kind: SweepKind::Lin,
            points: 1,
            start: frequency,
            stop: frequency,
        }
    }
}

impl Default for AcSweep {
    fn default() -> Self {
        Self {
            kind: SweepKind::Dec,
            points: DEFAULT_AC_POINTS,
            start: DEFAULT_AC_START,
            stop: DEFAULT_AC_STOP,
        }
    }
}

/// What a probe measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    /// `V(...)`
    Voltage,
    /// `I(...)`
    Current,
}

/// Target of a probe expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProbeTarget {
    Ground,
    /// Dotted path, e.g. `out`, `R1.positive`, `F1.mid`
    Path(Vec<String>),
}

/// A plot expression such as `V(out)` or `I(R1)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Probe {
    pub kind: ProbeKind,
    pub target: ProbeTarget,
}

impl Probe {
    pub fn voltage(path: &str) -> Self {
        Self {
            kind: ProbeKind::Voltage,
            target: ProbeTarget::Path(path.split('.').map(str::to_string).collect()),
        }
    }

    pub fn current(path: &str) -> Self {
        Self {
            kind: ProbeKind::Current,
            target: ProbeTarget::Path(path.split('.').map(str::to_string).collect()),
        }
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self.kind {
            ProbeKind::Voltage => 'V',
            ProbeKind::Current => 'I',
        };
        match &self.target {
            ProbeTarget::Ground => write!(f, "{}(ground)", letter),
            ProbeTarget::Path(path) => write!(f, "{}({})", letter, path.join(".")),
        }
    }
}
