//! circuitc - circuit DSL compiler and simulator
//!
//! Compiles a circuit description and runs the analyses of its `Simulate`
//! blocks, writing CSV tables.
//!
//! # Usage
//!
//! ```bash
//! circuitc filter.cir                   # CSV results on stdout
//! circuitc filter.cir -o results.csv    # CSV results to a file
//! circuitc filter.cir --emit-flat       # print the flattened circuit
//! RUST_LOG=debug circuitc filter.cir    # diagnostics on stderr
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use circuit_dsl::{compile, error::Error, output, Result, Simulator};
use clap::Parser;

/// Circuit DSL compiler and simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the circuit description file
    #[arg(value_name = "CIRCUIT_FILE")]
    circuit_file: PathBuf,

    /// Print the flattened circuit as source instead of simulating
    #[arg(long)]
    emit_flat: bool,

    /// Write results here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let source = std::fs::read_to_string(&args.circuit_file).map_err(|source| Error::FileRead {
        path: args.circuit_file.display().to_string(),
        source,
    })?;

    // Compile: tokenize, parse, flatten, validate
    let circuit = compile(&source)?;

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    if args.emit_flat {
        writer.write_all(circuit.to_source().as_bytes())?;
    } else {
        let results = Simulator::new().simulate(&circuit, &circuit.directives)?;
        output::write_results(&results, &mut writer)?;
    }
    writer.flush()?;

    Ok(())
}
