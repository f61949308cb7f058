//! End-to-end aggregation over in-memory datasets.

use dh_core::{BinConfig, HadronPair, MeasurementTable};
use dh_engine::dataset::modules;
use dh_engine::{Aggregator, Dataset};

fn bin(ds: &mut Dataset, name: &str, pair: HadronPair, x: f64) {
    ds.insert_bin(BinConfig {
        name: name.into(),
        pair,
        run_period: ds.run_period().to_string(),
        bin_variable: "x".into(),
    });
    let mut kin = MeasurementTable::new(modules::KINEMATIC_BINS);
    kin.insert("full___x", x);
    if pair.contains_pi0() {
        kin.insert("signal___x", x + 0.005);
        kin.insert("background___x", x - 0.005);
    }
    ds.insert_table(name, kin);
}

fn fit(ds: &mut Dataset, name: &str, region: &str, term: usize, a: f64, stat: f64) {
    let mut t = ds
        .table(name, modules::ASYMMETRY)
        .cloned()
        .unwrap_or_else(|| MeasurementTable::new(modules::ASYMMETRY));
    t.insert(format!("{region}.b_{term}"), a);
    t.insert(format!("{region}.b_{term}_err"), stat);
    ds.insert_table(name, t);
}

const BINS: [(&str, f64); 3] = [("x0.1-0.2", 0.15), ("x0.2-0.3", 0.25), ("x0.3-0.4", 0.35)];

fn charged_dataset() -> Dataset {
    let mut ds = Dataset::new(HadronPair::PiplusPiminus, "Fall2018_RGA_inbending");
    for ((name, x), a) in BINS.iter().zip([0.05, 0.06, 0.055]) {
        bin(&mut ds, name, HadronPair::PiplusPiminus, *x);
        fit(&mut ds, name, "signal", 0, a, 0.01);
    }
    ds
}

#[test]
fn charged_channel_normalization_only() {
    let ds = charged_dataset();
    let records = Aggregator::new(&ds).run("signal", 0, "full").unwrap();

    assert_eq!(records.len(), 3);
    let expected_rel = (0.031f64 * 0.031 + 0.001 * 0.001 + 0.05 * 0.05).sqrt();
    assert!((expected_rel - 0.0588).abs() < 1e-4);

    for (record, (name, x)) in records.iter().zip(BINS) {
        assert_eq!(record.config, name);
        assert!((record.bin_value - x).abs() < 1e-12);
        assert_eq!(record.stat_error, 0.01);
        assert!((record.sys_error - record.value.abs() * expected_rel).abs() < 1e-12);
        assert!(
            (record.systematics.normalization_total.relative() - expected_rel).abs() < 1e-12
        );
    }
    assert_eq!(records[0].value, 0.05);
    assert_eq!(records[1].value, 0.06);
    assert_eq!(records[2].value, 0.055);
}

#[test]
fn unfolding_recovers_truth_and_skips_local_migration() {
    // response M (reco rows x true columns):
    //   [0.90 0.05 0.00]
    //   [0.10 0.90 0.10]
    //   [0.00 0.05 0.90]
    // reconstructed values below are M applied to truth {0.05, 0.06, 0.055}.
    let mut ds = Dataset::new(HadronPair::PiplusPiminus, "Fall2018_RGA_inbending");
    let reco = [0.048, 0.0645, 0.0525];
    for ((name, x), a) in BINS.iter().zip(reco) {
        bin(&mut ds, name, HadronPair::PiplusPiminus, *x);
        fit(&mut ds, name, "signal", 0, a, 0.01);
    }
    let flows: [(&str, f64, &[(&str, f64)]); 3] = [
        ("x0.1-0.2", 900.0, &[("x0.2-0.3", 100.0)]),
        ("x0.2-0.3", 900.0, &[("x0.1-0.2", 50.0), ("x0.3-0.4", 50.0)]),
        ("x0.3-0.4", 900.0, &[("x0.2-0.3", 100.0)]),
    ];
    for (name, own, out) in flows {
        let mut t = MeasurementTable::new(modules::BIN_MIGRATION);
        t.insert("entries", 1000.0);
        t.insert(format!("primary___{name}"), own);
        for (dest, count) in out {
            t.insert(format!("other___{dest}"), *count);
        }
        ds.insert_table(name, t);
    }

    let records =
        Aggregator::new(&ds).with_unfolding(true).run("signal", 0, "full").unwrap();
    let truth = [0.05, 0.06, 0.055];
    for (record, expected) in records.iter().zip(truth) {
        assert!((record.value - expected).abs() < 1e-10);
        // unfolding replaces the local neighbor estimate
        assert_eq!(record.systematics.bin_migration.relative(), 0.0);
    }
}

#[test]
fn singular_response_keeps_reconstructed_values() {
    // both bins exchange half their events: the response matrix has two
    // identical rows and cannot be inverted
    let mut ds = Dataset::new(HadronPair::PiplusPiminus, "Fall2018_RGA_inbending");
    for ((name, x), a) in BINS[..2].iter().zip([0.05, 0.06]) {
        bin(&mut ds, name, HadronPair::PiplusPiminus, *x);
        fit(&mut ds, name, "signal", 0, a, 0.01);
    }
    for (name, dest) in [("x0.1-0.2", "x0.2-0.3"), ("x0.2-0.3", "x0.1-0.2")] {
        let mut t = MeasurementTable::new(modules::BIN_MIGRATION);
        t.insert("entries", 1000.0);
        t.insert(format!("other___{dest}"), 500.0);
        ds.insert_table(name, t);
    }

    let records =
        Aggregator::new(&ds).with_unfolding(true).run("signal", 0, "full").unwrap();
    assert_eq!(records[0].value, 0.05);
    assert_eq!(records[1].value, 0.06);
    // with unfolding abandoned, the neighbor-flow estimate still applies:
    // |0.5*0.06 - 0.5*0.05| / 0.05
    assert!((records[0].systematics.bin_migration.relative() - 0.1).abs() < 1e-12);
    assert!(records[1].systematics.bin_migration.relative() > 0.0);
}

#[test]
fn without_unfolding_local_migration_contributes() {
    let mut ds = charged_dataset();
    for (name, own, out) in [
        ("x0.1-0.2", 900.0, ("x0.2-0.3", 100.0)),
        ("x0.2-0.3", 950.0, ("x0.3-0.4", 50.0)),
        ("x0.3-0.4", 1000.0, ("x0.2-0.3", 0.0)),
    ] {
        let mut t = MeasurementTable::new(modules::BIN_MIGRATION);
        t.insert("entries", 1000.0);
        t.insert(format!("primary___{name}"), own);
        t.insert(format!("other___{}", out.0), out.1);
        ds.insert_table(name, t);
    }
    let records = Aggregator::new(&ds).run("signal", 0, "full").unwrap();
    assert!(records[0].systematics.bin_migration.relative() > 0.0);
}

#[test]
fn pi0_channel_enables_dispersion_sources() {
    let mut ds = Dataset::new(HadronPair::PiplusPi0, "Fall2018_RGA_inbending");
    let region = "signal_purity_2_2";
    for ((name, x), a) in BINS.iter().zip([0.05, 0.06, 0.055]) {
        bin(&mut ds, name, HadronPair::PiplusPi0, *x);
        fit(&mut ds, name, region, 0, a, 0.01);
        // alternate purity grids fitted on the same sample
        fit(&mut ds, name, "signal_purity_3_3", 0, a + 0.004, 0.01);

        let mut sb = MeasurementTable::new(modules::SIDEBAND_REGION);
        sb.insert(format!("asymmetry_sideband_M2_0.2_0.4___{region}.b_0"), a - 0.005);
        sb.insert(format!("asymmetry_sideband_M2_0.2_0.45___{region}.b_0"), a + 0.005);
        ds.insert_table(name, sb);
    }

    let records = Aggregator::new(&ds).run(region, 0, "signal").unwrap();
    for (record, (_, x)) in records.iter().zip(BINS) {
        assert!(record.systematics.sideband_region.relative() > 0.0);
        assert!(record.systematics.purity_binning.relative() > 0.0);
        // bin value read from the signal-sample kinematics
        assert!((record.bin_value - (x + 0.005)).abs() < 1e-12);
    }

    // spread of {a - 0.005, a + 0.005} has stdev 0.005 * sqrt(2)
    let sigma = 0.005 * 2f64.sqrt();
    let r0 = &records[0];
    assert!((r0.systematics.sideband_region.relative() - sigma / 0.05).abs() < 1e-12);
}

#[test]
fn charged_channel_never_reports_dispersion_sources() {
    let mut ds = charged_dataset();
    // even with a stray sideband table, the channel gate wins
    for (name, _) in BINS {
        let mut sb = MeasurementTable::new(modules::SIDEBAND_REGION);
        sb.insert("asymmetry_sideband_M2_0.2_0.4___signal.b_0", 0.01);
        sb.insert("asymmetry_sideband_M2_0.2_0.45___signal.b_0", 0.03);
        ds.insert_table(name, sb);
    }
    let records = Aggregator::new(&ds).run("signal", 0, "full").unwrap();
    for record in &records {
        assert_eq!(record.systematics.sideband_region.relative(), 0.0);
        assert_eq!(record.systematics.purity_binning.relative(), 0.0);
    }
}

#[test]
fn contamination_and_misid_enter_the_quadrature() {
    let mut ds = charged_dataset();
    for (name, _) in BINS {
        let mut bary = MeasurementTable::new(modules::BARYON_CONTAMINATION);
        bary.insert("trueparentpid_1_2212", 85.0);
        bary.insert("trueparentpid_1_3122", 10.0);
        bary.insert("trueparentpid_2_2212", 5.0);
        ds.insert_table(name, bary);

        let mut misid = MeasurementTable::new(modules::PARTICLE_MISID);
        misid.insert("truepid_e_11", 98.0);
        misid.insert("truepid_e_-211", 2.0);
        misid.insert("truepid_1_211", 100.0);
        misid.insert("truepid_2_-211", 100.0);
        ds.insert_table(name, misid);
    }
    let records = Aggregator::new(&ds).run("signal", 0, "full").unwrap();
    let r0 = &records[0];
    // lambda fraction 10/100 -> 0.1/0.9
    assert!((r0.systematics.baryon_contamination.relative() - 0.1 / 0.9).abs() < 1e-12);
    // misID fraction 2/300
    let f = 2.0 / 300.0;
    assert!((r0.systematics.particle_misid.relative() - f / (1.0 - f)).abs() < 1e-12);

    let quad = [
        r0.systematics.baryon_contamination.absolute(),
        r0.systematics.particle_misid.absolute(),
        r0.systematics.normalization_total.absolute(),
    ]
    .iter()
    .map(|t| t * t)
    .sum::<f64>()
    .sqrt();
    assert!((r0.sys_error - quad).abs() < 1e-12);
}
