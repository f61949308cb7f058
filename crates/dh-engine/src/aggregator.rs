//! Per-(region, term) asymmetry aggregation.

use crate::dataset::{modules, Dataset};
use crate::migration::MigrationMatrix;
use crate::registry::BinRegistry;
use crate::systematics::{
    baryon_contamination, bin_migration, dispersion, normalization, particle_misid,
    SystematicSource,
};
use crate::tables;
use dh_core::{
    term, Error, FitTable, OutputRecord, Result, SourceError, SystematicsBreakdown,
};
use nalgebra::DVector;
use std::collections::BTreeMap;

/// Orchestrates one dataset: iterates bins in registry order, queries every
/// applicable systematic estimator, optionally unfolds bin migration
/// globally, and emits one [`OutputRecord`] per (bin, region, term).
///
/// Stateless across bins within a pass; the only pass-level state is
/// whether unfolding ran, which gates the local migration estimator.
#[derive(Debug)]
pub struct Aggregator<'a> {
    data: &'a Dataset,
    registry: BinRegistry,
    window: usize,
    unfold: bool,
}

impl<'a> Aggregator<'a> {
    /// Build an aggregator (and its bin ordering) over a dataset.
    pub fn new(data: &'a Dataset) -> Self {
        let registry = BinRegistry::from_dataset(data);
        Self { data, registry, window: bin_migration::DEFAULT_WINDOW, unfold: false }
    }

    /// Neighbor window for the local migration estimator.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Enable global matrix unfolding. When it succeeds, the local
    /// migration estimator is skipped for the pass to avoid correcting the
    /// same effect twice.
    pub fn with_unfolding(mut self, unfold: bool) -> Self {
        self.unfold = unfold;
        self
    }

    /// The bin ordering in use.
    pub fn registry(&self) -> &BinRegistry {
        &self.registry
    }

    /// Run one (region, term) pass and return the records in bin order.
    ///
    /// `bin_prefix` selects which bin-value estimate goes into the record
    /// (`full`, `signal`, `background`). Bins without a fit result are
    /// skipped with a warning; the pass always completes.
    pub fn run(&self, region: &str, term_index: usize, bin_prefix: &str) -> Result<Vec<OutputRecord>> {
        let pw = term(term_index).ok_or_else(|| {
            Error::Validation(format!("partial-wave term index {term_index} out of range"))
        })?;

        // Current asymmetry per bin for this pass. Unfolding replaces the
        // whole map before any estimator sees it.
        let mut asym: BTreeMap<String, f64> = BTreeMap::new();
        for name in self.registry.names() {
            if let Some(t) = self.data.table(name, modules::ASYMMETRY) {
                if let Some(v) = FitTable(t).value(region, term_index) {
                    asym.insert(name.clone(), v);
                }
            }
        }
        let unfolded = self.unfold && self.apply_unfolding(&mut asym);

        let mut records = Vec::new();
        for name in self.registry.names() {
            let Some(fit_table) = self.data.table(name, modules::ASYMMETRY) else {
                log::warn!("no {} result for bin '{name}'; skipping", modules::ASYMMETRY);
                continue;
            };
            let fit = FitTable(fit_table);
            let (Some(&a), Some(stat)) =
                (asym.get(name.as_str()), fit.stat_error(region, term_index))
            else {
                log::warn!("no fit value for bin '{name}', region '{region}', b_{term_index}; skipping");
                continue;
            };

            let breakdown = self.collect_systematics(name, region, term_index, a, &asym, unfolded);
            let sys_error = quadrature(&breakdown);
            let cfg = self.data.bin(name).cloned().ok_or_else(|| {
                Error::Validation(format!("bin '{name}' has tables but no configuration"))
            })?;

            records.push(OutputRecord {
                config: cfg.name,
                pair: cfg.pair,
                run_period: cfg.run_period,
                bin_variable: cfg.bin_variable,
                bin_value: BinRegistry::resolve_bin_value(self.data, name, bin_prefix),
                region: region.to_string(),
                term: term_index,
                l: pw.l,
                m: pw.m,
                twist: pw.twist,
                modulation: pw.modulation(),
                value: a,
                stat_error: stat,
                sys_error,
                systematics: breakdown,
            });
        }
        Ok(records)
    }

    /// Replace the pass-local asymmetry map with unfolded values.
    /// Returns whether unfolding actually ran.
    fn apply_unfolding(&self, asym: &mut BTreeMap<String, f64>) -> bool {
        let names = self.registry.names();
        if names.iter().any(|n| !asym.contains_key(n.as_str())) {
            log::warn!("unfolding skipped: not every bin has a fit value");
            return false;
        }
        let matrix = match MigrationMatrix::build(self.data, &self.registry) {
            Ok(m) => m,
            Err(e) => {
                log::error!("unfolding skipped: {e}");
                return false;
            }
        };
        let reco = DVector::from_iterator(names.len(), names.iter().map(|n| asym[n.as_str()]));
        match matrix.unfold(&reco) {
            Ok(truth) => {
                for (name, v) in names.iter().zip(truth.iter()) {
                    asym.insert(name.clone(), *v);
                }
                true
            }
            Err(e) => {
                // correctness-critical fallback: keep reconstructed values
                log::error!("unfolding failed, keeping reconstructed values: {e}");
                false
            }
        }
    }

    fn collect_systematics(
        &self,
        bin: &str,
        region: &str,
        term_index: usize,
        a: f64,
        asym: &BTreeMap<String, f64>,
        unfolded: bool,
    ) -> SystematicsBreakdown {
        let pair = self.data.pair();
        let mut b = SystematicsBreakdown::default();

        // bin migration is already accounted for once unfolding ran
        if !unfolded && SystematicSource::BinMigration.applies_to(pair) {
            let rel =
                bin_migration::relative_error(self.data, &self.registry, asym, bin, self.window);
            b.bin_migration = SourceError::from_relative(rel, a);
        }

        if let Some(t) = self.data.table(bin, modules::BARYON_CONTAMINATION) {
            b.baryon_contamination =
                SourceError::from_relative(baryon_contamination::relative_error(t, pair), a);
        }

        if let Some(t) = self.data.table(bin, modules::PARTICLE_MISID) {
            b.particle_misid =
                SourceError::from_relative(particle_misid::relative_error(t, pair), a);
        }

        b.normalization = normalization::components(self.data.run_period(), pair, a);
        b.normalization_total =
            SourceError::from_relative(normalization::total_relative(&b.normalization), a);

        if SystematicSource::SidebandRegion.applies_to(pair) {
            if let Some(t) = self.data.table(bin, modules::SIDEBAND_REGION) {
                let values = tables::sideband_values(t, region, term_index);
                b.sideband_region = SourceError::from_relative(
                    dispersion::relative_error(&values, a, "sidebandRegion"),
                    a,
                );
            }
        }

        if SystematicSource::PurityBinning.applies_to(pair) {
            if let Some(t) = self.data.table(bin, modules::ASYMMETRY) {
                let values = tables::purity_values(t, term_index);
                b.purity_binning = SourceError::from_relative(
                    dispersion::relative_error(&values, a, "purityBinning"),
                    a,
                );
            }
        }

        b
    }
}

/// Total systematic error: quadrature over the per-source absolute
/// contributions, normalization entering through its quadrature total.
pub fn quadrature(b: &SystematicsBreakdown) -> f64 {
    let terms = [
        b.bin_migration.absolute(),
        b.baryon_contamination.absolute(),
        b.particle_misid.absolute(),
        b.normalization_total.absolute(),
        b.sideband_region.absolute(),
        b.purity_binning.absolute(),
    ];
    terms.iter().map(|t| t * t).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dh_core::{BinConfig, HadronPair, MeasurementTable};

    fn charged_dataset() -> Dataset {
        let mut ds = Dataset::new(HadronPair::PiplusPiminus, "Fall2018_RGA_inbending");
        for (i, (name, a, stat)) in
            [("x0.1-0.2", 0.05, 0.011), ("x0.2-0.3", 0.06, 0.012), ("x0.3-0.4", 0.055, 0.013)]
                .iter()
                .enumerate()
        {
            ds.insert_bin(BinConfig {
                name: (*name).into(),
                pair: HadronPair::PiplusPiminus,
                run_period: "Fall2018_RGA_inbending".into(),
                bin_variable: "x".into(),
            });
            let mut kin = MeasurementTable::new(modules::KINEMATIC_BINS);
            kin.insert("full___x", 0.1 * (i as f64 + 1.0));
            ds.insert_table(name, kin);
            let mut fit = MeasurementTable::new(modules::ASYMMETRY);
            fit.insert("signal.b_0", *a);
            fit.insert("signal.b_0_err", *stat);
            ds.insert_table(name, fit);
        }
        ds
    }

    #[test]
    fn records_preserve_registry_order() {
        let ds = charged_dataset();
        let records = Aggregator::new(&ds).run("signal", 0, "full").unwrap();
        assert_eq!(records.len(), 3);
        let names: Vec<&str> = records.iter().map(|r| r.config.as_str()).collect();
        assert_eq!(names, ["x0.1-0.2", "x0.2-0.3", "x0.3-0.4"]);
        assert!(records.windows(2).all(|w| w[0].bin_value <= w[1].bin_value));
    }

    #[test]
    fn normalization_only_scenario() {
        // only normalization presets contribute: 0.031/0.001/0.05 in quadrature
        let ds = charged_dataset();
        let records = Aggregator::new(&ds).run("signal", 0, "full").unwrap();
        let rel = (0.031f64 * 0.031 + 0.001 * 0.001 + 0.05 * 0.05).sqrt();
        for r in &records {
            assert!((r.sys_error - r.value.abs() * rel).abs() < 1e-12);
            assert_eq!(r.systematics.bin_migration, SourceError::default());
            // pi0-only sources never contribute on a charged channel
            assert_eq!(r.systematics.sideband_region, SourceError::default());
            assert_eq!(r.systematics.purity_binning, SourceError::default());
        }
        assert!((records[0].stat_error - 0.011).abs() < 1e-15);
    }

    #[test]
    fn relative_absolute_round_trip() {
        let ds = charged_dataset();
        let records = Aggregator::new(&ds).run("signal", 0, "full").unwrap();
        for r in &records {
            for s in [
                r.systematics.bin_migration,
                r.systematics.baryon_contamination,
                r.systematics.particle_misid,
                r.systematics.normalization_total,
            ] {
                assert!((s.absolute() - r.value.abs() * s.relative()).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn missing_fit_bin_is_skipped() {
        let mut ds = charged_dataset();
        ds.insert_bin(BinConfig {
            name: "x0.4-0.5".into(),
            pair: HadronPair::PiplusPiminus,
            run_period: "Fall2018_RGA_inbending".into(),
            bin_variable: "x".into(),
        });
        let mut kin = MeasurementTable::new(modules::KINEMATIC_BINS);
        kin.insert("full___x", 0.45);
        ds.insert_table("x0.4-0.5", kin);

        let records = Aggregator::new(&ds).run("signal", 0, "full").unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn bad_term_index_is_an_error() {
        let ds = charged_dataset();
        assert!(Aggregator::new(&ds).run("signal", 12, "full").is_err());
    }

    #[test]
    fn term_quantum_numbers_attached() {
        let mut ds = charged_dataset();
        for name in ["x0.1-0.2", "x0.2-0.3", "x0.3-0.4"] {
            let mut fit = MeasurementTable::new(modules::ASYMMETRY);
            fit.insert("signal.b_7", 0.02);
            fit.insert("signal.b_7_err", 0.01);
            ds.insert_table(name, fit);
        }
        let records = Aggregator::new(&ds).run("signal", 7, "full").unwrap();
        assert_eq!((records[0].l, records[0].m, records[0].twist), (2, -2, 3));
        assert!(!records[0].modulation.is_empty());
    }
}
