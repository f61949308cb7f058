//! Particle misidentification estimator.
//!
//! Compares the true PID spectrum of every detected final-state slot to
//! the PID that slot should hold for the channel, pools the mismatch
//! counts, and propagates the misID fraction as `f / (1 - f)`.

use crate::tables::PidSpectrum;
use dh_core::{HadronPair, MeasurementTable};

const ELECTRON: i32 = 11;
const PHOTON: i32 = 22;

/// (section, expected PID) per detected slot for the channel.
///
/// A neutral pion is reconstructed from two photons, so the pi0 channels
/// replace the second-hadron slot with the two photon slots.
fn expected_slots(pair: HadronPair) -> Vec<(&'static str, i32)> {
    let (pid1, pid2) = pair.pids();
    let mut slots = vec![("truepid_e", ELECTRON), ("truepid_1", pid1)];
    if pair.contains_pi0() {
        slots.push(("truepid_21", PHOTON));
        slots.push(("truepid_22", PHOTON));
    } else {
        slots.push(("truepid_2", pid2));
    }
    slots
}

/// Relative error from particle misidentification.
///
/// Empty spectra contribute 0 with a warning. A pooled mismatch fraction
/// at or above 1 is a data error and returns NaN with an error log.
pub fn relative_error(table: &MeasurementTable, pair: HadronPair) -> f64 {
    let mut mismatched = 0.0;
    let mut total = 0.0;
    for (section, expected) in expected_slots(pair) {
        let spectrum = PidSpectrum::parse(table, section);
        if spectrum.is_empty() {
            continue;
        }
        mismatched += spectrum.sum_where(|pid| pid != expected);
        total += spectrum.total();
    }

    if total <= 0.0 {
        log::warn!("particleMisidentification: no true-PID counts; contributing 0");
        return 0.0;
    }
    let fraction = mismatched / total;
    if fraction >= 1.0 {
        log::error!("particleMisidentification: misID fraction {fraction} >= 1");
        return f64::NAN;
    }
    fraction / (1.0 - fraction)
}
