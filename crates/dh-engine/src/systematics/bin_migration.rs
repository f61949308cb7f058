//! Local (per-term) bin-migration estimator.
//!
//! Estimates the shift of one bin's asymmetry from the net flow exchanged
//! with its neighbors inside a fixed window along the ordered bin sequence:
//!
//! `ΔA_i = Σ_j ( f_{j→i}·A_j − f_{i→j}·A_i )`
//!
//! with `f_{a→b}` the fraction of events generated in `a` reconstructed in
//! `b`. The relative error is `|ΔA_i| / |A_i|`. When global unfolding has
//! already corrected the whole vector, this estimator is skipped entirely
//! by the aggregator.

use crate::dataset::{modules, Dataset};
use crate::registry::BinRegistry;
use crate::systematics::ASYM_EPSILON;
use crate::tables::MigrationCounts;
use std::collections::BTreeMap;

/// Neighbors considered on each side of a bin.
pub const DEFAULT_WINDOW: usize = 3;

/// Relative migration error for one bin, given the current per-bin
/// asymmetries for the (region, term) being processed.
///
/// Returns 0 when no correction is derivable: the bin's asymmetry is
/// consistent with zero, its counts are missing, or its generated total is
/// not positive. Neighbors outside the ordering or without counts are
/// skipped.
pub fn relative_error(
    data: &Dataset,
    registry: &BinRegistry,
    asym: &BTreeMap<String, f64>,
    bin: &str,
    window: usize,
) -> f64 {
    let Some(&a_i) = asym.get(bin) else {
        return 0.0;
    };
    if a_i.abs() < ASYM_EPSILON {
        return 0.0;
    }
    let Some(pos) = registry.position(bin) else {
        log::warn!("bin '{bin}' not in registry; no migration estimate");
        return 0.0;
    };
    let own = match migration_counts(data, bin) {
        Some(c) => c,
        None => return 0.0,
    };

    let names = registry.names();
    let lo = pos.saturating_sub(window);
    let hi = (pos + window).min(names.len().saturating_sub(1));

    let mut delta = 0.0;
    for j in lo..=hi {
        if j == pos {
            continue;
        }
        let neighbor = &names[j];
        let f_out = own.fraction_to(neighbor);
        let f_in = migration_counts(data, neighbor)
            .map(|c| c.fraction_to(bin))
            .unwrap_or(0.0);
        let a_j = asym.get(neighbor).copied().unwrap_or(0.0);
        delta += f_in * a_j - f_out * a_i;
    }

    delta.abs() / a_i.abs()
}

fn migration_counts(data: &Dataset, bin: &str) -> Option<MigrationCounts> {
    data.table(bin, modules::BIN_MIGRATION)
        .and_then(MigrationCounts::parse)
        .filter(|c| c.generated > 0.0)
}
