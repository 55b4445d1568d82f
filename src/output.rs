//! Results output formatting (CSV).

use std::io::Write;

use crate::error::Result;
use crate::solver::{AcResult, AnalysisResult, DcResult, ResultSet, TransientResult};

/// Write DC operating point results as CSV.
///
/// Format:
/// ```csv
/// Variable,Value
/// V(out),3.3333333333333335
/// I(V1),-0.0016666666666666668
/// ```
///
/// Net voltages come first, then branch currents, then any probe not
/// already listed.
pub fn write_dc_csv<W: Write>(result: &DcResult, writer: &mut W) -> Result<()> {
    writeln!(writer, "Variable,Value")?;
    let mut written = Vec::new();
    for (name, voltage) in &result.node_voltages {
        let label = format!("V({})", name);
        writeln!(writer, "{},{}", label, voltage)?;
        written.push(label);
    }
    for (label, current) in &result.branch_currents {
        writeln!(writer, "{},{}", label, current)?;
        written.push(label.clone());
    }
    for (label, value) in &result.probes {
        if !written.contains(label) {
            writeln!(writer, "{},{}", label, value)?;
        }
    }
    Ok(())
}

/// Write AC sweep results as CSV.
///
/// Format:
/// ```csv
/// Frequency,V(out)_mag,V(out)_phase_deg
/// 1,0.9999802609,-0.3599
/// ```
pub fn write_ac_csv<W: Write>(result: &AcResult, writer: &mut W) -> Result<()> {
    write!(writer, "Frequency")?;
    for series in &result.series {
        write!(writer, ",{}_mag,{}_phase_deg", series.label, series.label)?;
    }
    writeln!(writer)?;

    for (fi, freq) in result.frequencies.iter().enumerate() {
        write!(writer, "{}", freq)?;
        for series in &result.series {
            let v = series.values[fi];
            write!(writer, ",{},{}", v.norm(), v.arg().to_degrees())?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Write a transient march as CSV, one row per time point.
pub fn write_transient_csv<W: Write>(result: &TransientResult, writer: &mut W) -> Result<()> {
    write!(writer, "Time")?;
    for series in &result.series {
        write!(writer, ",{}", series.label)?;
    }
    writeln!(writer)?;

    for (ti, time) in result.times.iter().enumerate() {
        write!(writer, "{}", time)?;
        for series in &result.series {
            write!(writer, ",{}", series.values[ti])?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Write every analysis in directive order, each table preceded by a
/// `# directive N: kind` comment line and followed by a blank line.
pub fn write_results<W: Write>(results: &ResultSet, writer: &mut W) -> Result<()> {
    for (id, result) in results.iter() {
        match result {
            AnalysisResult::Dc(dc) => {
                writeln!(writer, "# directive {}: dc", id.0)?;
                write_dc_csv(dc, writer)?;
            }
            AnalysisResult::Ac(ac) => {
                writeln!(writer, "# directive {}: ac", id.0)?;
                write_ac_csv(ac, writer)?;
            }
            AnalysisResult::Transient(tran) => {
                writeln!(writer, "# directive {}: transient", id.0)?;
                write_transient_csv(tran, writer)?;
            }
        }
        writeln!(writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Series;
    use num_complex::Complex64;

    #[test]
    fn test_dc_csv_skips_repeated_probes() {
        let result = DcResult {
            node_voltages: vec![("out".to_string(), 2.5)],
            branch_currents: vec![("I(V1)".to_string(), -0.001)],
            probes: vec![("V(out)".to_string(), 2.5), ("V(R1)".to_string(), 2.5)],
        };
        let mut buf = Vec::new();
        write_dc_csv(&result, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "Variable,Value\nV(out),2.5\nI(V1),-0.001\nV(R1),2.5\n");
    }

    #[test]
    fn test_ac_csv_layout() {
        let result = AcResult {
            frequencies: vec![10.0, 100.0],
            series: vec![Series {
                label: "V(out)".to_string(),
                values: vec![Complex64::new(1.0, 0.0), Complex64::new(2.0, 0.0)],
            }],
        };
        let mut buf = Vec::new();
        write_ac_csv(&result, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Frequency,V(out)_mag,V(out)_phase_deg");
        assert_eq!(lines[1], "10,1,0");
        assert_eq!(lines[2], "100,2,0");
    }

    #[test]
    fn test_transient_csv_layout() {
        let result = TransientResult {
            times: vec![0.0, 0.5],
            series: vec![Series {
                label: "V(c)".to_string(),
                values: vec![0.25, 0.75],
            }],
        };
        let mut buf = Vec::new();
        write_transient_csv(&result, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Time,V(c)\n0,0.25\n0.5,0.75\n");
    }
}
