//! Front end of the circuit description language: tokenizer, unit literals,
//! AST and parser.
//!
//! # Grammar Overview
//!
//! ```text
//! program        = { statement }
//! statement      = componentDecl | connect | subcircuitDef | subcircuitInst | simulateBlock
//! componentDecl  = TypeName Ident [ "(" [ paramList ] ")" ] ";"
//! paramList      = namedParam { "," namedParam } | literal { "," literal }
//! namedParam     = Ident "=" literal
//! literal        = Number [ Unit ]
//! connect        = "Connect" "(" endpoint "," endpoint { "," endpoint } ")" ";"
//! endpoint       = Ident [ "." Ident ] | "ground"
//! subcircuitDef  = "Subcircuit" Ident "(" Ident { "," Ident } ")" "{" { statement } "}" [ ";" ]
//! subcircuitInst = Ident [ Ident ] ( "(" [ binding { "," binding } ] ")" | { binding } ) ";"
//! binding        = Ident "=" endpoint
//! simulateBlock  = "Simulate" "{" { directive } "}" [ ";" ]
//! directive      = "dc" ";"
//!                | "ac" [ "(" ( literal | SweepKind "," Number "," literal "," literal ) ")" ] ";"
//!                | "transient" "(" literal "," literal "," literal ")" ";"
//!                | "plot" "(" probe { "," probe } ")" ";"
//! probe          = ( "V" | "I" ) "(" ( "ground" | Ident { "." Ident } ) ")"
//! ```
//!
//! # Component Types
//!
//! | Type | Parameters | Unit |
//! |------|------------|------|
//! | `Resistor` | `resistance` | ohm |
//! | `Capacitor` | `capacitance` | F |
//! | `Inductor` | `inductance` | H |
//! | `VoltageSource` | `voltage`, `amplitude`? | V |
//! | `CurrentSource` | `current`, `amplitude`? | A |
//! | `Ammeter` | none | |
//!
//! Every component has the terminals `positive` and `negative`.
//!
//! # Example
//!
//! ```text
//! # RC low-pass filter
//! VoltageSource Vin(1 V);
//! Resistor R1(1 kohm);
//! Capacitor C1(100 nF);
//!
//! Connect(Vin.positive, R1.positive);
//! Connect(R1.negative, C1.positive, out);
//! Connect(Vin.negative, C1.negative, ground);
//!
//! Simulate {
//!     ac(dec, 10, 10 Hz, 100 kHz);
//!     plot(V(out));
//! }
//! ```

mod ast;
mod lexer;
mod parser;
mod units;

pub use ast::*;
pub use lexer::{tokenize, Keyword, Lexer, Token, TokenKind};
pub use parser::{parse, Parser};
pub use units::{parse_unit, prefix_scale, Literal, Quantity, Unit};

use crate::error::CompileError;

/// Tokenize and parse a source text into a [`Program`].
pub fn parse_source(input: &str) -> Result<Program, CompileError> {
    let tokens = tokenize(input)?;
    Ok(parse(&tokens)?)
}
