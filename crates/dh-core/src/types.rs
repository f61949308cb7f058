//! Common data types for the dihadron analysis.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Final-state hadron pair of a channel.
///
/// The `pi0_pi0` combination is excluded upstream; every supported channel
/// has a charged pion first and at most one neutral pion, always second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HadronPair {
    /// pi+ pi+
    PiplusPiplus,
    /// pi+ pi-
    PiplusPiminus,
    /// pi+ pi0
    PiplusPi0,
    /// pi- pi-
    PiminusPiminus,
    /// pi- pi0
    PiminusPi0,
}

impl HadronPair {
    /// Parse the upstream directory-name spelling, e.g. `piplus_pi0`.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "piplus_piplus" => Ok(Self::PiplusPiplus),
            "piplus_piminus" => Ok(Self::PiplusPiminus),
            "piplus_pi0" => Ok(Self::PiplusPi0),
            "piminus_piminus" => Ok(Self::PiminusPiminus),
            "piminus_pi0" => Ok(Self::PiminusPi0),
            other => Err(Error::Validation(format!("unknown hadron pair: {other}"))),
        }
    }

    /// Upstream spelling of the pair name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PiplusPiplus => "piplus_piplus",
            Self::PiplusPiminus => "piplus_piminus",
            Self::PiplusPi0 => "piplus_pi0",
            Self::PiminusPiminus => "piminus_piminus",
            Self::PiminusPi0 => "piminus_pi0",
        }
    }

    /// Whether the second hadron is a neutral pion.
    ///
    /// Drives several branch choices: region naming, sideband/purity
    /// systematics, and which PID slots are physically meaningful.
    pub fn contains_pi0(&self) -> bool {
        matches!(self, Self::PiplusPi0 | Self::PiminusPi0)
    }

    /// PDG codes of the two final-state hadrons.
    pub fn pids(&self) -> (i32, i32) {
        match self {
            Self::PiplusPiplus => (211, 211),
            Self::PiplusPiminus => (211, -211),
            Self::PiplusPi0 => (211, 111),
            Self::PiminusPiminus => (-211, -211),
            Self::PiminusPi0 => (-211, 111),
        }
    }
}

impl fmt::Display for HadronPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named kinematic bin configuration.
///
/// Immutable once loaded; identity plus the metadata the estimators need to
/// pick their branches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinConfig {
    /// Configuration name, e.g. `x0.1-0.3`.
    pub name: String,
    /// Final-state hadron pair.
    pub pair: HadronPair,
    /// Run period identifier, e.g. `Fall2018_RGA_inbending`.
    pub run_period: String,
    /// Kinematic binning variable, e.g. `x` or `Mh`.
    pub bin_variable: String,
}

/// Flattened output of one upstream module for one bin: an open-ended map
/// from string keys to numeric scalars.
///
/// The key namespace (`region.b_<i>`, `entries`, `other___<stem>`,
/// `truepid_<slot>_<pid>`, ...) is the boundary contract with the upstream
/// data-reduction pipeline; consumers go through the typed views in
/// `dh-engine` rather than parsing prefixes ad hoc.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeasurementTable {
    /// Name of the module that produced this table.
    pub module: String,
    /// Scalar entries, ordered by key.
    pub scalars: BTreeMap<String, f64>,
}

impl MeasurementTable {
    /// Create an empty table for a module.
    pub fn new(module: impl Into<String>) -> Self {
        Self { module: module.into(), scalars: BTreeMap::new() }
    }

    /// Look up a scalar by exact key.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.scalars.get(key).copied()
    }

    /// Insert a scalar.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.scalars.insert(key.into(), value);
    }

    /// Iterate entries whose key starts with `prefix`.
    pub fn with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        self.scalars
            .range(prefix.to_string()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), *v))
    }
}

/// Read-only view of an `asymmetryPW` table, keyed by (region, term).
#[derive(Debug, Clone, Copy)]
pub struct FitTable<'a>(pub &'a MeasurementTable);

impl FitTable<'_> {
    /// Fitted asymmetry value for `(region, term)`, if the fit produced one.
    pub fn value(&self, region: &str, term: usize) -> Option<f64> {
        self.0.get(&format!("{region}.b_{term}"))
    }

    /// Statistical error for `(region, term)`.
    pub fn stat_error(&self, region: &str, term: usize) -> Option<f64> {
        self.0.get(&format!("{region}.b_{term}_err"))
    }
}

/// A systematic contribution as a `[relative, absolute]` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceError(pub f64, pub f64);

impl SourceError {
    /// Build from a relative error and the asymmetry it applies to.
    pub fn from_relative(relative: f64, asym: f64) -> Self {
        Self(relative, asym.abs() * relative)
    }

    /// Relative (dimensionless) error.
    pub fn relative(&self) -> f64 {
        self.0
    }

    /// Absolute error, `|A| * relative`.
    pub fn absolute(&self) -> f64 {
        self.1
    }
}

/// Per-source systematic breakdown of one output record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystematicsBreakdown {
    /// Bin-migration contribution (zero when global unfolding ran).
    pub bin_migration: SourceError,
    /// Baryonic parent contamination.
    pub baryon_contamination: SourceError,
    /// Final-state particle misidentification.
    pub particle_misid: SourceError,
    /// Invariant-mass sideband variation (pi0 channels only).
    pub sideband_region: SourceError,
    /// Purity-binning variation (pi0 channels only).
    pub purity_binning: SourceError,
    /// Named normalization components, each `[relative, absolute]`.
    pub normalization: BTreeMap<String, SourceError>,
    /// Quadrature total of the normalization components.
    pub normalization_total: SourceError,
}

/// The final per-(bin, region, term) result.
///
/// Created once during aggregation, appended in registry order, serialized
/// at the end of a run; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputRecord {
    /// Bin configuration name.
    pub config: String,
    /// Hadron pair of the channel.
    pub pair: HadronPair,
    /// Run period identifier.
    pub run_period: String,
    /// Binning variable name.
    pub bin_variable: String,
    /// Representative value of the binning variable for this bin.
    pub bin_value: f64,
    /// Fit region name.
    pub region: String,
    /// Partial-wave term index (0..11).
    pub term: usize,
    /// Orbital angular momentum of the term.
    pub l: i32,
    /// Magnetic quantum number of the term.
    pub m: i32,
    /// Twist order of the term.
    pub twist: i32,
    /// Modulation the amplitude multiplies.
    pub modulation: String,
    /// Fitted asymmetry.
    pub value: f64,
    /// Statistical error from the fit.
    pub stat_error: f64,
    /// Total systematic error (quadrature over the breakdown).
    pub sys_error: f64,
    /// Per-source breakdown.
    pub systematics: SystematicsBreakdown,
}
