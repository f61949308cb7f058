//! Typed views over the raw measurement-table key namespace.
//!
//! The upstream pipeline emits flat string-keyed scalar maps; the key
//! spellings are its contract and stay untouched at the boundary. Each view
//! here parses one estimator's key subset into a structured record so the
//! estimators never handle ad hoc prefixes themselves.

use dh_core::MeasurementTable;
use std::collections::BTreeMap;

/// Migration counts for one bin: events generated in this bin, split by the
/// bin they were reconstructed in.
///
/// Parsed from `entries` (total generated), `primary___<stem>` (stayed in
/// this bin) and `other___<stem>` (reconstructed in bin `<stem>`).
#[derive(Debug, Clone, Default)]
pub struct MigrationCounts {
    /// Total generated events for this bin.
    pub generated: f64,
    /// Events generated and reconstructed in this bin.
    pub own: f64,
    /// Events reconstructed in another bin, keyed by that bin's name.
    pub flows: BTreeMap<String, f64>,
}

impl MigrationCounts {
    /// Parse from a `binMigration` table. `None` when the total is absent.
    pub fn parse(table: &MeasurementTable) -> Option<Self> {
        let generated = table.get("entries")?;
        let own = table
            .with_prefix("primary___")
            .next()
            .map(|(_, v)| v)
            .unwrap_or(0.0);
        let flows = table
            .with_prefix("other___")
            .map(|(k, v)| (k["other___".len()..].to_string(), v))
            .collect();
        Some(Self { generated, own, flows })
    }

    /// Fraction of this bin's generated events reconstructed in `other`.
    /// Zero when the flow is absent or the generated total is not positive.
    pub fn fraction_to(&self, other: &str) -> f64 {
        if self.generated <= 0.0 {
            return 0.0;
        }
        self.flows.get(other).copied().unwrap_or(0.0) / self.generated
    }
}

/// PID-keyed count spectrum for one histogram section, e.g.
/// `trueparentpid_1` or `truepid_21`.
#[derive(Debug, Clone, Default)]
pub struct PidSpectrum {
    /// Counts per PDG code.
    pub counts: BTreeMap<i32, f64>,
}

impl PidSpectrum {
    /// Parse the `<section>_<pid>` entries of a table.
    pub fn parse(table: &MeasurementTable, section: &str) -> Self {
        let prefix = format!("{section}_");
        let counts = table
            .with_prefix(&prefix)
            .filter_map(|(k, v)| k[prefix.len()..].parse::<i32>().ok().map(|pid| (pid, v)))
            .collect();
        Self { counts }
    }

    /// Sum of all counts in the section.
    pub fn total(&self) -> f64 {
        self.counts.values().sum()
    }

    /// Sum of counts whose PID satisfies `pred`.
    pub fn sum_where(&self, mut pred: impl FnMut(i32) -> bool) -> f64 {
        self.counts.iter().filter(|(pid, _)| pred(**pid)).map(|(_, v)| v).sum()
    }

    /// Whether the section is empty.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Same-term fit values across the sideband samples of a combined
/// `sidebandRegion` table. Keys look like `<sample>___<region>.b_<term>`.
pub fn sideband_values(table: &MeasurementTable, region: &str, term: usize) -> Vec<f64> {
    let suffix = format!("___{region}.b_{term}");
    table
        .scalars
        .iter()
        .filter(|(k, _)| k.ends_with(&suffix))
        .map(|(_, v)| *v)
        .collect()
}

/// Same-term fit values across the purity-grid regions of an `asymmetryPW`
/// table. Keys look like `signal_purity_<N>_<M>.b_<term>`.
pub fn purity_values(table: &MeasurementTable, term: usize) -> Vec<f64> {
    let suffix = format!(".b_{term}");
    table
        .with_prefix("signal_purity_")
        .filter(|(k, _)| k.ends_with(suffix.as_str()))
        .map(|(_, v)| v)
        .collect()
}
