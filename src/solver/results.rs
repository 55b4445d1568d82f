//! Typed results of a `simulate` call.

use std::collections::BTreeMap;
use std::fmt;

use num_complex::Complex64;

/// Index of a directive in the list passed to `simulate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirectiveId(pub usize);

impl fmt::Display for DirectiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "directive {}", self.0)
    }
}

/// One probe's values, aligned with the analysis' sweep or time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Series<T> {
    pub label: String,
    pub values: Vec<T>,
}

fn find_series<'s, T>(series: &'s [Series<T>], label: &str) -> Option<&'s Series<T>> {
    series.iter().find(|s| s.label == label)
}

/// DC operating point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DcResult {
    /// Voltage of every non-ground net, by net label
    pub node_voltages: Vec<(String, f64)>,
    /// Branch current of every source, ammeter and inductor, as `I(id)`
    pub branch_currents: Vec<(String, f64)>,
    /// Requested probe values
    pub probes: Vec<(String, f64)>,
}

impl DcResult {
    /// Look up a probe value by its label, e.g. `V(out)`.
    pub fn probe(&self, label: &str) -> Option<f64> {
        self.probes
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, value)| *value)
    }

    /// Look up a net voltage by net label.
    pub fn voltage(&self, net: &str) -> Option<f64> {
        self.node_voltages
            .iter()
            .find(|(name, _)| name == net)
            .map(|(_, value)| *value)
    }
}

/// Frequency sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcResult {
    pub frequencies: Vec<f64>,
    pub series: Vec<Series<Complex64>>,
}

impl AcResult {
    pub fn get(&self, label: &str) -> Option<&Series<Complex64>> {
        find_series(&self.series, label)
    }

    /// Magnitude of a probe at every frequency.
    pub fn magnitude(&self, label: &str) -> Option<Vec<f64>> {
        self.get(label)
            .map(|s| s.values.iter().map(|v| v.norm()).collect())
    }

    /// Phase of a probe in degrees at every frequency.
    pub fn phase_degrees(&self, label: &str) -> Option<Vec<f64>> {
        self.get(label)
            .map(|s| s.values.iter().map(|v| v.arg().to_degrees()).collect())
    }
}

/// Time-domain march.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransientResult {
    pub times: Vec<f64>,
    pub series: Vec<Series<f64>>,
}

impl TransientResult {
    pub fn get(&self, label: &str) -> Option<&Series<f64>> {
        find_series(&self.series, label)
    }
}

/// Result of one analysis directive.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResult {
    Dc(DcResult),
    Ac(AcResult),
    Transient(TransientResult),
}

impl AnalysisResult {
    pub fn as_dc(&self) -> Option<&DcResult> {
        match self {
            Self::Dc(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_ac(&self) -> Option<&AcResult> {
        match self {
            Self::Ac(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_transient(&self) -> Option<&TransientResult> {
        match self {
            Self::Transient(r) => Some(r),
            _ => None,
        }
    }
}

/// Every analysis result of one `simulate` call, keyed by directive.
///
/// `plot` directives produce no entry of their own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    entries: BTreeMap<DirectiveId, AnalysisResult>,
}

impl ResultSet {
    pub(crate) fn insert(&mut self, id: DirectiveId, result: AnalysisResult) {
        self.entries.insert(id, result);
    }

    pub fn get(&self, id: DirectiveId) -> Option<&AnalysisResult> {
        self.entries.get(&id)
    }

    /// Results in directive order.
    pub fn iter(&self) -> impl Iterator<Item = (DirectiveId, &AnalysisResult)> {
        self.entries.iter().map(|(id, result)| (*id, result))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First DC result, if any.
    pub fn dc(&self) -> Option<&DcResult> {
        self.entries.values().find_map(AnalysisResult::as_dc)
    }

    /// First AC result, if any.
    pub fn ac(&self) -> Option<&AcResult> {
        self.entries.values().find_map(AnalysisResult::as_ac)
    }

    /// First transient result, if any.
    pub fn transient(&self) -> Option<&TransientResult> {
        self.entries.values().find_map(AnalysisResult::as_transient)
    }
}
