//! Deterministic ordering of kinematic bins.

use crate::dataset::{modules, Dataset};

/// Ordered view of a dataset's bins, sorted ascending by the canonical
/// bin-value scalar (`full___<binVariable>` in the `kinematicBins` table).
///
/// Computed once per dataset and reused by every pass; re-running
/// registration on the same input yields the same order.
#[derive(Debug, Clone)]
pub struct BinRegistry {
    ordered: Vec<String>,
}

impl BinRegistry {
    /// Build the ordering from a dataset.
    ///
    /// A bin whose lookup fails gets a NaN bin value: it is reported with a
    /// warning and sorted after every orderable bin (ties broken by name) so
    /// the run still completes. Strict harnesses treat any NaN bin value as
    /// a configuration error.
    pub fn from_dataset(data: &Dataset) -> Self {
        let mut keyed: Vec<(f64, String)> = data
            .bins()
            .map(|cfg| (Self::resolve_bin_value(data, &cfg.name, "full"), cfg.name.clone()))
            .collect();
        keyed.sort_by(|a, b| {
            match (a.0.is_nan(), b.0.is_nan()) {
                (false, false) => a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal),
                (true, true) => std::cmp::Ordering::Equal,
                (true, false) => std::cmp::Ordering::Greater,
                (false, true) => std::cmp::Ordering::Less,
            }
            .then_with(|| a.1.cmp(&b.1))
        });
        Self { ordered: keyed.into_iter().map(|(_, name)| name).collect() }
    }

    /// Resolve the bin-value scalar for one bin at a given prefix
    /// (`full`, `signal`, `background`). NaN when the lookup fails.
    pub fn resolve_bin_value(data: &Dataset, bin: &str, prefix: &str) -> f64 {
        let Some(cfg) = data.bin(bin) else {
            log::warn!("unknown bin '{bin}'");
            return f64::NAN;
        };
        let key = format!("{prefix}___{}", cfg.bin_variable);
        match data.table(bin, modules::KINEMATIC_BINS).and_then(|t| t.get(&key)) {
            Some(v) => v,
            None => {
                log::warn!("no kinematicBins scalar '{key}' for bin '{bin}'");
                f64::NAN
            }
        }
    }

    /// Bin names in ascending bin-value order.
    pub fn names(&self) -> &[String] {
        &self.ordered
    }

    /// Position of a bin in the ordering.
    pub fn position(&self, bin: &str) -> Option<usize> {
        self.ordered.iter().position(|n| n == bin)
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
