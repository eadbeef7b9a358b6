//! Per-run persistence.
//!
//! One directory per named run under an explicit root (no process-global
//! paths): a manifest, the metric record, the decomposition state, and
//! optionally a portable copy of the network. The decomposition record never
//! embeds the live graph — it carries edge-id sets that are re-bound to a
//! freshly loaded network via [`Decomposition::check_against`].

use anyhow::Context;
use chrono::{DateTime, Utc};
use ltn_algo::{Decomposition, Metric};
use ltn_core::{LtnError, LtnResult, StreetNetwork};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::record::NetworkRecord;

const MANIFEST_FILE: &str = "manifest.json";
const METRIC_FILE: &str = "metric.json";
const DECOMPOSITION_FILE: &str = "decomposition.json";
const NETWORK_FILE: &str = "network.json";

/// Summary record written alongside every saved run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub name: String,
    pub saved_at: DateTime<Utc>,
    pub graph_junctions: usize,
    pub graph_streets: usize,
    /// Whether a portable network copy sits next to the run records.
    pub has_network_copy: bool,
}

/// Filesystem store addressing runs by name.
#[derive(Debug, Clone)]
pub struct RunStore {
    root: PathBuf,
}

impl RunStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run_dir(&self, run: &str) -> LtnResult<PathBuf> {
        if run.is_empty() || run.contains(['/', '\\']) {
            return Err(LtnError::Validation(format!(
                "invalid run name '{run}': must be non-empty and contain no path separators"
            )));
        }
        Ok(self.root.join(run))
    }

    /// Persist one run: manifest, metric, decomposition state, and optionally
    /// a portable network copy.
    pub fn save_run(
        &self,
        run: &str,
        network: &StreetNetwork,
        decomposition: &Decomposition,
        metric: &Metric,
        save_network_copy: bool,
    ) -> LtnResult<RunManifest> {
        let dir = self.run_dir(run)?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating run directory '{}'", dir.display()))?;

        let manifest = RunManifest {
            name: run.to_string(),
            saved_at: Utc::now(),
            graph_junctions: network.num_junctions(),
            graph_streets: network.num_streets(),
            has_network_copy: save_network_copy,
        };
        write_json(&dir.join(DECOMPOSITION_FILE), decomposition)?;
        write_json(&dir.join(METRIC_FILE), metric)?;
        if save_network_copy {
            write_json(&dir.join(NETWORK_FILE), &NetworkRecord::from_network(network))?;
        }
        write_json(&dir.join(MANIFEST_FILE), &manifest)?;
        info!(
            run,
            dir = %dir.display(),
            network_copy = save_network_copy,
            "saved run"
        );
        Ok(manifest)
    }

    pub fn load_manifest(&self, run: &str) -> LtnResult<RunManifest> {
        read_json(&self.run_dir(run)?.join(MANIFEST_FILE))
    }

    pub fn load_metric(&self, run: &str) -> LtnResult<Metric> {
        read_json(&self.run_dir(run)?.join(METRIC_FILE))
    }

    pub fn load_decomposition(&self, run: &str) -> LtnResult<Decomposition> {
        read_json(&self.run_dir(run)?.join(DECOMPOSITION_FILE))
    }

    /// Load the portable network copy saved with the run, if any.
    pub fn load_network(&self, run: &str) -> LtnResult<StreetNetwork> {
        let record: NetworkRecord = read_json(&self.run_dir(run)?.join(NETWORK_FILE))?;
        record.to_network()
    }

    /// Load decomposition state and re-bind it against a freshly loaded
    /// network, verifying every stored street id still resolves.
    pub fn load_decomposition_for(
        &self,
        run: &str,
        network: &StreetNetwork,
    ) -> LtnResult<Decomposition> {
        let decomposition = self.load_decomposition(run)?;
        decomposition.check_against(network)?;
        Ok(decomposition)
    }

    /// Names of all saved runs (directories carrying a manifest), sorted.
    pub fn list_runs(&self) -> LtnResult<Vec<String>> {
        let mut runs = Vec::new();
        if !self.root.exists() {
            return Ok(runs);
        }
        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("reading store root '{}'", self.root.display()))?
        {
            let entry = entry.with_context(|| "reading store entry".to_string())?;
            if entry.path().join(MANIFEST_FILE).is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    runs.push(name.to_string());
                }
            }
        }
        runs.sort();
        Ok(runs)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> LtnResult<()> {
    let file =
        File::create(path).with_context(|| format!("creating '{}'", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> LtnResult<T> {
    let file = File::open(path).with_context(|| format!("opening '{}'", path.display()))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ltn_algo::test_utils::spine_and_cells;
    use ltn_algo::{DecomposeOptions, LabelPartitioner, MatrixOptions};

    fn analyzed_run() -> (StreetNetwork, Decomposition, Metric) {
        let mut network = spine_and_cells();
        let mut decomposition = Decomposition::new("store_test");
        decomposition
            .run(&mut network, &LabelPartitioner, &DecomposeOptions::default())
            .unwrap();
        let mut metric = Metric::new();
        metric
            .calculate_all(&network, &decomposition, &MatrixOptions::default())
            .unwrap();
        (network, decomposition, metric)
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let (network, decomposition, metric) = analyzed_run();
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path());

        let manifest = store
            .save_run("adliswil", &network, &decomposition, &metric, true)
            .unwrap();
        assert_eq!(manifest.graph_junctions, 6);
        assert!(manifest.has_network_copy);

        assert_eq!(store.load_metric("adliswil").unwrap(), metric);
        assert_eq!(store.load_decomposition("adliswil").unwrap(), decomposition);
        assert_eq!(store.load_manifest("adliswil").unwrap(), manifest);

        // reattach against the freshly loaded network copy
        let reloaded_network = store.load_network("adliswil").unwrap();
        let rebound = store
            .load_decomposition_for("adliswil", &reloaded_network)
            .unwrap();
        assert_eq!(
            rebound.ordered_junctions().unwrap(),
            decomposition.ordered_junctions().unwrap()
        );
    }

    #[test]
    fn test_reattach_fails_against_mismatched_network() {
        let (network, decomposition, metric) = analyzed_run();
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path());
        store
            .save_run("run", &network, &decomposition, &metric, false)
            .unwrap();

        let unrelated = StreetNetwork::new();
        assert!(matches!(
            store.load_decomposition_for("run", &unrelated),
            Err(LtnError::Network(_))
        ));
    }

    #[test]
    fn test_list_runs() {
        let (network, decomposition, metric) = analyzed_run();
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path());
        assert!(store.list_runs().unwrap().is_empty());

        store
            .save_run("beta", &network, &decomposition, &metric, false)
            .unwrap();
        store
            .save_run("alpha", &network, &decomposition, &metric, false)
            .unwrap();
        assert_eq!(store.list_runs().unwrap(), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_invalid_run_name_rejected() {
        let store = RunStore::new("/tmp/never-created");
        let (network, decomposition, metric) = analyzed_run();
        for name in ["", "a/b", "a\\b"] {
            assert!(matches!(
                store.save_run(name, &network, &decomposition, &metric, false),
                Err(LtnError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_missing_run_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path());
        assert!(store.load_metric("absent").is_err());
    }
}
