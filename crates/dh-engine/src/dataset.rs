//! In-memory snapshot of one (channel, run-period) combination.

use dh_core::{BinConfig, HadronPair, MeasurementTable};
use std::collections::BTreeMap;

/// Upstream module names. These spellings are part of the on-disk contract.
pub mod modules {
    /// Partial-wave asymmetry fit results.
    pub const ASYMMETRY: &str = "asymmetryPW";
    /// Bin-migration counts from matched Monte Carlo.
    pub const BIN_MIGRATION: &str = "binMigration";
    /// True-parent PID spectra.
    pub const BARYON_CONTAMINATION: &str = "baryonContamination";
    /// True PID spectra per final-state slot.
    pub const PARTICLE_MISID: &str = "particleMisidentification";
    /// Per-bin kinematic summaries.
    pub const KINEMATIC_BINS: &str = "kinematicBins";
    /// Combined sideband-variant fit results.
    pub const SIDEBAND_REGION: &str = "sidebandRegion";
}

/// All bins and their per-module measurement tables for one channel and
/// run period. Immutable once loaded; every downstream component reads
/// from the same snapshot.
#[derive(Debug, Clone)]
pub struct Dataset {
    pair: HadronPair,
    run_period: String,
    bins: BTreeMap<String, BinConfig>,
    tables: BTreeMap<String, BTreeMap<String, MeasurementTable>>,
}

impl Dataset {
    /// Create an empty dataset for one channel and run period.
    pub fn new(pair: HadronPair, run_period: impl Into<String>) -> Self {
        Self { pair, run_period: run_period.into(), bins: BTreeMap::new(), tables: BTreeMap::new() }
    }

    /// Channel of this dataset.
    pub fn pair(&self) -> HadronPair {
        self.pair
    }

    /// Run period of this dataset.
    pub fn run_period(&self) -> &str {
        &self.run_period
    }

    /// Register a bin configuration.
    pub fn insert_bin(&mut self, bin: BinConfig) {
        self.bins.insert(bin.name.clone(), bin);
    }

    /// Attach one module's table to a bin.
    pub fn insert_table(&mut self, bin: &str, table: MeasurementTable) {
        self.tables.entry(bin.to_string()).or_default().insert(table.module.clone(), table);
    }

    /// Bin configuration by name.
    pub fn bin(&self, name: &str) -> Option<&BinConfig> {
        self.bins.get(name)
    }

    /// All bin configurations, ordered by name.
    pub fn bins(&self) -> impl Iterator<Item = &BinConfig> {
        self.bins.values()
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.bins.len()
    }

    /// One module's table for one bin, if present.
    pub fn table(&self, bin: &str, module: &str) -> Option<&MeasurementTable> {
        self.tables.get(bin)?.get(module)
    }

    /// Whether any bin carries a fit-result table. A dataset without any is
    /// structurally unusable and should be skipped by the caller.
    pub fn has_fit_results(&self) -> bool {
        self.bins.keys().any(|b| self.table(b, modules::ASYMMETRY).is_some())
    }
}
