//! Project-directory loader.
//!
//! Reads the on-disk layout produced by the upstream data-reduction
//! pipeline into a [`Dataset`]:
//!
//! ```text
//! <project>/config_<bin>/<bin>.yaml
//! <project>/config_<bin>/<pair>/<period>/module-out___<module>/...
//! ```
//!
//! Monte-Carlo-derived modules (bin migration, contamination, misID) are
//! read from the matching MC period directory. Missing files degrade to
//! missing tables with a diagnostic; only a bin without its configuration
//! YAML is dropped entirely.

use crate::dataset::{modules, Dataset};
use dh_core::{BinConfig, HadronPair, MeasurementTable, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const CONFIG_PREFIX: &str = "config_";
const MODULE_OUT_PREFIX: &str = "module-out___";
const SIDEBAND_STEM: &str = "asymmetry_sideband";

/// MC period matching a data run period, where one is defined.
pub fn mc_period(run_period: &str) -> Option<&'static str> {
    match run_period {
        "Fall2018_RGA_inbending"
        | "Spring2019_RGA_inbending"
        | "Fall2018Spring2019_RGA_inbending" => Some("MC_RGA_inbending"),
        "Fall2018_RGA_outbending" => Some("MC_RGA_outbending"),
        _ => None,
    }
}

/// Load one (channel, run-period) snapshot from a project directory.
pub fn load_project(project: &Path, pair: HadronPair, run_period: &str) -> Result<Dataset> {
    let mut data = Dataset::new(pair, run_period);

    let mut config_dirs: Vec<PathBuf> = std::fs::read_dir(project)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(CONFIG_PREFIX))
        })
        .collect();
    config_dirs.sort();

    for config_dir in config_dirs {
        let Some(bin_name) = config_dir
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n[CONFIG_PREFIX.len()..].to_string())
        else {
            continue;
        };

        let config_yaml = config_dir.join(format!("{bin_name}.yaml"));
        let Some(bin_variable) = read_bin_variable(&config_yaml) else {
            log::warn!("no config YAML for '{bin_name}' (looked for {}); dropping bin", config_yaml.display());
            continue;
        };
        data.insert_bin(BinConfig {
            name: bin_name.clone(),
            pair,
            run_period: run_period.to_string(),
            bin_variable,
        });

        let data_dir = config_dir.join(pair.as_str()).join(run_period);
        let mc_dir = mc_period(run_period).map(|p| config_dir.join(pair.as_str()).join(p));
        if mc_dir.is_none() {
            log::warn!("no MC period mapped for run period '{run_period}'; MC-derived tables unavailable");
        }

        if let Some(t) = load_fit_results(
            &data_dir.join(module_dir(modules::ASYMMETRY)).join("asymmetry_results.yaml"),
            modules::ASYMMETRY,
        ) {
            data.insert_table(&bin_name, t);
        }

        if let Some(mc) = &mc_dir {
            if let Some(t) = load_migration(&mc.join(module_dir(modules::BIN_MIGRATION))) {
                data.insert_table(&bin_name, t);
            }
            for module in [modules::BARYON_CONTAMINATION, modules::PARTICLE_MISID] {
                let path = mc.join(module_dir(module)).join(format!("{module}.yaml"));
                if let Some(t) = load_pid_counts(&path, module) {
                    data.insert_table(&bin_name, t);
                }
            }
        }

        if let Some(t) =
            load_kinematic_bins(&data_dir.join(module_dir(modules::KINEMATIC_BINS)), pair)
        {
            data.insert_table(&bin_name, t);
        }

        if pair.contains_pi0() {
            if let Some(t) = load_sidebands(&data_dir) {
                data.insert_table(&bin_name, t);
            }
        }
    }

    Ok(data)
}

fn module_dir(module: &str) -> String {
    format!("{MODULE_OUT_PREFIX}{module}")
}

#[derive(Debug, Deserialize)]
struct ConfigDoc {
    #[serde(rename = "binVariable")]
    bin_variable: String,
}

fn read_bin_variable(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_yaml_ng::from_str::<ConfigDoc>(&text) {
        Ok(doc) => Some(doc.bin_variable),
        Err(e) => {
            log::warn!("unreadable config YAML {}: {e}", path.display());
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct FitDoc {
    results: Vec<BTreeMap<String, serde_yaml_ng::Value>>,
}

/// Flatten an `asymmetry_results.yaml` into `region.<key>` scalars.
/// Regions flagged `fit_failed` keep only their entry count.
fn load_fit_results(path: &Path, module: &str) -> Option<MeasurementTable> {
    let text = read_optional(path)?;
    let doc: FitDoc = match serde_yaml_ng::from_str(&text) {
        Ok(d) => d,
        Err(e) => {
            log::warn!("unreadable fit results {}: {e}", path.display());
            return None;
        }
    };

    let mut table = MeasurementTable::new(module);
    for block in doc.results {
        let Some(region) = block.get("region").and_then(|v| v.as_str()).map(String::from) else {
            log::warn!("fit-result block without a region in {}", path.display());
            continue;
        };
        if let Some(entries) = block.get("entries").and_then(as_f64) {
            table.insert(format!("{region}.entries"), entries);
        }
        if block.get("fit_failed").and_then(|v| v.as_bool()).unwrap_or(false) {
            log::warn!("fit failed for region '{region}' in {}", path.display());
            continue;
        }
        for (key, value) in &block {
            if matches!(key.as_str(), "region" | "entries" | "fit_failed") {
                continue;
            }
            if let Some(v) = as_f64(value) {
                table.insert(format!("{region}.{key}"), v);
            }
        }
    }
    Some(table)
}

#[derive(Debug, Deserialize)]
struct MigrationDoc {
    entries: f64,
    primary_config: Option<String>,
    primary_passing: Option<f64>,
    #[serde(default)]
    other_configs: Vec<MigrationFlow>,
}

#[derive(Debug, Deserialize)]
struct MigrationFlow {
    config: String,
    passing: Option<f64>,
}

/// Flatten a `binMigration.yaml` into `entries` / `primary___<stem>` /
/// `other___<stem>` scalars, keyed by the config file stems.
fn load_migration(dir: &Path) -> Option<MeasurementTable> {
    let path = dir.join("binMigration.yaml");
    let text = read_optional(&path)?;
    let doc: MigrationDoc = match serde_yaml_ng::from_str(&text) {
        Ok(d) => d,
        Err(e) => {
            log::warn!("unreadable migration counts {}: {e}", path.display());
            return None;
        }
    };

    let mut table = MeasurementTable::new(modules::BIN_MIGRATION);
    table.insert("entries", doc.entries);
    if let (Some(cfg), Some(passing)) = (&doc.primary_config, doc.primary_passing) {
        table.insert(format!("primary___{}", yaml_stem(cfg)), passing);
    }
    for flow in &doc.other_configs {
        if let Some(passing) = flow.passing {
            table.insert(format!("other___{}", yaml_stem(&flow.config)), passing);
        }
    }
    Some(table)
}

fn yaml_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Flatten a PID-count document (`total_entries` plus `<section>:` maps of
/// `pid: count`) into `total_entries` and `<section>_<pid>` scalars.
fn load_pid_counts(path: &Path, module: &str) -> Option<MeasurementTable> {
    let text = read_optional(path)?;
    let doc: BTreeMap<String, serde_yaml_ng::Value> = match serde_yaml_ng::from_str(&text) {
        Ok(d) => d,
        Err(e) => {
            log::warn!("unreadable PID counts {}: {e}", path.display());
            return None;
        }
    };

    let mut table = MeasurementTable::new(module);
    for (key, value) in &doc {
        if let Some(v) = as_f64(value) {
            table.insert(key.clone(), v);
            continue;
        }
        if let Some(section) = value.as_mapping() {
            for (pid, count) in section {
                let (Some(pid), Some(count)) = (pid.as_str(), as_f64(count)) else {
                    continue;
                };
                table.insert(format!("{key}_{pid}"), count);
            }
        }
    }
    Some(table)
}

/// Flatten the single-record kinematics CSVs into `<prefix>___<column>`
/// scalars.
fn load_kinematic_bins(dir: &Path, pair: HadronPair) -> Option<MeasurementTable> {
    let mut table = MeasurementTable::new(modules::KINEMATIC_BINS);
    let mut any = false;
    let mut prefixes = vec!["full"];
    if pair.contains_pi0() {
        prefixes.extend(["signal", "background"]);
    }
    for prefix in prefixes {
        let path = dir.join(format!("{prefix}.csv"));
        let Some((headers, record)) = read_csv_record(&path) else {
            continue;
        };
        for (name, field) in headers.iter().zip(record.iter()) {
            match field.parse::<f64>() {
                Ok(v) => {
                    table.insert(format!("{prefix}___{name}"), v);
                    any = true;
                }
                Err(_) => {
                    log::warn!("non-numeric value '{field}' for column {prefix}___{name}");
                }
            }
        }
    }
    any.then_some(table)
}

/// Read the header row and first data record of a CSV file.
fn read_csv_record(path: &Path) -> Option<(csv::StringRecord, csv::StringRecord)> {
    let mut rdr = match csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
    {
        Ok(r) => r,
        Err(e) => {
            if let csv::ErrorKind::Io(io) = e.kind() {
                if io.kind() == std::io::ErrorKind::NotFound {
                    log::debug!("not found: {}", path.display());
                    return None;
                }
            }
            log::warn!("cannot open {}: {e}", path.display());
            return None;
        }
    };
    let headers = match rdr.headers() {
        Ok(h) => h.clone(),
        Err(e) => {
            log::warn!("unreadable CSV header in {}: {e}", path.display());
            return None;
        }
    };
    match rdr.records().next() {
        Some(Ok(record)) => Some((headers, record)),
        Some(Err(e)) => {
            log::warn!("unreadable CSV record in {}: {e}", path.display());
            None
        }
        None => {
            log::warn!("CSV missing its data record: {}", path.display());
            None
        }
    }
}

/// Combine every sibling `module-out___asymmetry_sideband*` directory into
/// one table, prefixing each flattened key with the sample name.
fn load_sidebands(data_dir: &Path) -> Option<MeasurementTable> {
    let entries = std::fs::read_dir(data_dir).ok()?;
    let mut sample_dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| {
                        n.strip_prefix(MODULE_OUT_PREFIX)
                            .is_some_and(|rest| rest.starts_with(SIDEBAND_STEM))
                    })
        })
        .collect();
    sample_dirs.sort();

    let mut combined = MeasurementTable::new(modules::SIDEBAND_REGION);
    let mut any = false;
    for dir in sample_dirs {
        let Some(sample) = dir
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n[MODULE_OUT_PREFIX.len()..].to_string())
        else {
            continue;
        };
        let Some(t) =
            load_fit_results(&dir.join("asymmetry_results.yaml"), modules::SIDEBAND_REGION)
        else {
            continue;
        };
        for (key, value) in &t.scalars {
            combined.insert(format!("{sample}___{key}"), *value);
            any = true;
        }
    }
    any.then_some(combined)
}

fn read_optional(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("not found: {}", path.display());
            None
        }
        Err(e) => {
            log::warn!("cannot read {}: {e}", path.display());
            None
        }
    }
}

fn as_f64(value: &serde_yaml_ng::Value) -> Option<f64> {
    value.as_f64().or_else(|| value.as_i64().map(|v| v as f64))
}
