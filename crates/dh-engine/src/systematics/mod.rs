//! The systematic-error estimator family.
//!
//! A closed set of sources, one module each, dispatched by
//! [`SystematicSource`] rather than open-ended subclassing. Every estimator
//! is pure with respect to its declared inputs and returns a non-negative
//! relative error, using a documented fallback when its inputs are missing.
//! NaN is reserved for data-integrity violations the caller must not
//! aggregate silently.

pub mod baryon_contamination;
pub mod bin_migration;
pub mod dispersion;
pub mod normalization;
pub mod particle_misid;

use dh_core::HadronPair;

/// Asymmetry magnitudes below this are treated as zero when forming
/// ratio-based relative errors.
pub const ASYM_EPSILON: f64 = 1e-9;

/// The closed set of systematic sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystematicSource {
    /// Cross-talk between adjacent kinematic bins.
    BinMigration,
    /// Baryonic parent contamination of the hadron sample.
    BaryonContamination,
    /// Final-state particle misidentification.
    ParticleMisid,
    /// Preset normalization uncertainties (polarization, backgrounds, ...).
    Normalization,
    /// Invariant-mass sideband variation.
    SidebandRegion,
    /// Purity-binning granularity variation.
    PurityBinning,
}

impl SystematicSource {
    /// All sources, in breakdown order.
    pub const ALL: [SystematicSource; 6] = [
        SystematicSource::BinMigration,
        SystematicSource::BaryonContamination,
        SystematicSource::ParticleMisid,
        SystematicSource::Normalization,
        SystematicSource::SidebandRegion,
        SystematicSource::PurityBinning,
    ];

    /// Stable name used in logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BinMigration => "bin_migration",
            Self::BaryonContamination => "baryon_contamination",
            Self::ParticleMisid => "particle_misid",
            Self::Normalization => "normalization",
            Self::SidebandRegion => "sideband_region",
            Self::PurityBinning => "purity_binning",
        }
    }

    /// Whether this source contributes to the given channel. The sideband
    /// and purity estimators only exist for neutral-pion final states.
    pub fn applies_to(&self, pair: HadronPair) -> bool {
        match self {
            Self::SidebandRegion | Self::PurityBinning => pair.contains_pi0(),
            _ => true,
        }
    }
}
