//! Baryonic parent contamination estimator.
//!
//! Pions feeding down from baryon decays carry a different spin structure
//! than the directly produced sample. The contamination fraction is read
//! off the true-parent PID spectra of matched Monte Carlo and propagated
//! as `ratio / (1 - ratio)`.

use crate::tables::PidSpectrum;
use dh_core::{HadronPair, MeasurementTable};

/// PDG code of the target proton; a proton parent is the beam/target
/// baryon itself, not contamination.
const PROTON: i32 = 2212;

/// Whether a PDG code sits in the baryon block.
pub fn is_baryon(pid: i32) -> bool {
    (1000..10_000).contains(&pid.abs())
}

/// Parent-PID sections that are physically meaningful for the channel.
///
/// For a neutral pion the second hadron's direct parent is the pi0 itself,
/// so its grandparent section is the informative one.
fn sections(pair: HadronPair) -> [&'static str; 2] {
    if pair.contains_pi0() {
        ["trueparentpid_1", "trueparentparentpid_2"]
    } else {
        ["trueparentpid_1", "trueparentpid_2"]
    }
}

/// Relative error from baryonic contamination.
///
/// Pools the channel-appropriate sections, forms
/// `ratio = baryon counts / pooled total` and returns `ratio / (1 - ratio)`.
/// An empty table contributes 0 with a warning; `ratio >= 1` is a
/// data-integrity violation and returns NaN so the caller cannot aggregate
/// it silently.
pub fn relative_error(table: &MeasurementTable, pair: HadronPair) -> f64 {
    let mut baryons = 0.0;
    let mut total = 0.0;
    for section in sections(pair) {
        let spectrum = PidSpectrum::parse(table, section);
        baryons += spectrum.sum_where(|pid| is_baryon(pid) && pid != PROTON);
        total += spectrum.total();
    }

    if total <= 0.0 {
        log::warn!("baryonContamination: no parent-PID counts; contributing 0");
        return 0.0;
    }
    let ratio = baryons / total;
    if ratio >= 1.0 {
        log::error!("baryonContamination: contamination fraction {ratio} >= 1");
        return f64::NAN;
    }
    ratio / (1.0 - ratio)
}
