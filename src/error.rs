//! Error types for the circuit compiler and simulator.
//!
//! Each pipeline stage fails with its own error type so callers can match on
//! exactly the failures a stage can produce:
//!
//! - [`LexError`] from the tokenizer
//! - [`SyntaxError`] from the parser
//! - [`SemanticError`] from the analyzer
//! - [`SimulationError`] from the engine
//!
//! [`CompileError`] groups the three front-end errors behind `compile`, and
//! [`Error`] unifies everything for the command-line front end.

use std::fmt;

use thiserror::Error;

/// Result type alias using the unified [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// A 1-based source location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

// ============ Front-end errors ============

/// Unrecognized character or malformed number.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Lexer error at {position}: {message}")]
pub struct LexError {
    pub position: Position,
    pub message: String,
}

impl LexError {
    pub fn new(position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// Grammar violation: the parser expected one thing and found another.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Syntax error at {position}: expected {expected}, found {found}")]
pub struct SyntaxError {
    pub position: Position,
    pub expected: String,
    pub found: String,
}

impl SyntaxError {
    pub fn new(position: Position, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self {
            position,
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Category of a [`SemanticError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticErrorKind {
    /// An identifier is declared twice in one scope, or a net name collides with an id
    DuplicateId,
    /// A subcircuit definition instantiates itself, directly or through others
    RecursiveSubcircuit,
    /// An instantiation binds an unknown port, binds a port twice, or misses one
    PortMismatch,
    /// A net has no path to ground through the component graph
    FloatingNet,
    /// A component terminal never appears in any connection
    UnboundTerminal,
    /// A referenced component or subcircuit does not exist
    UndefinedReference,
    /// A terminal name that the component kind does not have
    UnknownTerminal,
    /// Unknown, duplicate, missing, excess or out-of-range parameter
    InvalidParameter,
    /// A value literal carries a unit the parameter does not accept
    UnitMismatch,
    /// A statement that is not allowed in the scope it appears in
    MisplacedStatement,
}

impl fmt::Display for SemanticErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DuplicateId => "duplicate identifier",
            Self::RecursiveSubcircuit => "recursive subcircuit",
            Self::PortMismatch => "port mismatch",
            Self::FloatingNet => "floating net",
            Self::UnboundTerminal => "unbound terminal",
            Self::UndefinedReference => "undefined reference",
            Self::UnknownTerminal => "unknown terminal",
            Self::InvalidParameter => "invalid parameter",
            Self::UnitMismatch => "unit mismatch",
            Self::MisplacedStatement => "misplaced statement",
        };
        f.write_str(name)
    }
}

/// Resolution, flattening or connectivity failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    pub detail: String,
    pub position: Option<Position>,
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(f, "Semantic error ({}) at {}: {}", self.kind, pos, self.detail),
            None => write!(f, "Semantic error ({}): {}", self.kind, self.detail),
        }
    }
}

impl SemanticError {
    /// Create a semantic error without a source location.
    pub fn new(kind: SemanticErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            position: None,
        }
    }

    /// Create a semantic error anchored at a source location.
    pub fn at(kind: SemanticErrorKind, position: Position, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            position: Some(position),
        }
    }
}

/// Any failure of `compile`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),
}

impl CompileError {
    /// Source location of the failure, when the stage knows one.
    pub fn position(&self) -> Option<Position> {
        match self {
            Self::Lex(e) => Some(e.position),
            Self::Syntax(e) => Some(e.position),
            Self::Semantic(e) => e.position,
        }
    }

    /// The semantic error category, if this is a semantic failure.
    pub fn semantic_kind(&self) -> Option<SemanticErrorKind> {
        match self {
            Self::Semantic(e) => Some(e.kind),
            _ => None,
        }
    }
}

// ============ Simulation errors ============

/// Failure of `simulate`. A failing directive aborts the whole call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Pivot below tolerance while factoring the system matrix
    #[error("{}", singular_message(.directive, .point))]
    SingularSystem {
        /// Index of the directive in the list passed to `simulate`
        directive: usize,
        /// Frequency index (AC) or time-step index (transient); `None` for DC
        point: Option<usize>,
    },

    /// A plot expression names a net or component the circuit does not have
    #[error("Unknown probe '{probe}'")]
    UnknownProbe { probe: String },

    /// Sweep or time-march parameters that cannot be simulated
    #[error("Invalid directive #{directive}: {message}")]
    InvalidDirective { directive: usize, message: String },
}

fn singular_message(directive: &usize, point: &Option<usize>) -> String {
    match point {
        Some(p) => format!(
            "Singular matrix in directive #{directive} at point {p} - circuit may have a floating node or a source loop"
        ),
        None => format!(
            "Singular matrix in directive #{directive} - circuit may have a floating node or a source loop"
        ),
    }
}

impl SimulationError {
    pub fn singular(directive: usize, point: Option<usize>) -> Self {
        Self::SingularSystem { directive, point }
    }

    pub fn invalid_directive(directive: usize, message: impl Into<String>) -> Self {
        Self::InvalidDirective {
            directive,
            message: message.into(),
        }
    }
}

// ============ Unified error ============

/// Unified error type for front ends driving the whole pipeline.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    /// Error reading a circuit file
    #[error("Failed to read circuit file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error writing results
    #[error("Failed to write results: {0}")]
    Output(#[from] std::io::Error),
}
