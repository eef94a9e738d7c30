//! Run storage API.
//!
//! Layout: `<root>/<run_id>/manifest.json` plus `records.jsonl`, one
//! record per line.

use std::fs;
use std::path::{Path, PathBuf};

use odmr_project::RunOutput;
use tracing::debug;

use crate::types::{Record, RunManifest, assemble_output, output_records};
use crate::{ResultsError, ResultsResult};

#[derive(Debug, Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    /// Store next to a study file, under `.odmr/runs`.
    pub fn for_study(study_path: &Path) -> ResultsResult<Self> {
        let study_dir = study_path
            .parent()
            .ok_or_else(|| ResultsError::InvalidPath {
                message: "study path has no parent directory".to_string(),
            })?;
        Self::new(study_dir.join(".odmr").join("runs"))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join("manifest.json").exists()
    }

    pub fn save_run(&self, manifest: &RunManifest, output: &RunOutput) -> ResultsResult<()> {
        let run_dir = self.run_dir(&manifest.run_id);
        fs::create_dir_all(&run_dir)?;

        let manifest_json = serde_json::to_string_pretty(manifest)?;
        fs::write(run_dir.join("manifest.json"), manifest_json)?;

        let mut content = String::new();
        for record in output_records(output) {
            content.push_str(&serde_json::to_string(&record)?);
            content.push('\n');
        }
        fs::write(run_dir.join("records.jsonl"), content)?;

        debug!(run_id = manifest.run_id.as_str(), run = manifest.run.as_str(), "Saved run");
        Ok(())
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let manifest_path = self.run_dir(run_id).join("manifest.json");

        if !manifest_path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let content = fs::read_to_string(manifest_path)?;
        let manifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    pub fn load_records(&self, run_id: &str) -> ResultsResult<Vec<Record>> {
        let records_path = self.run_dir(run_id).join("records.jsonl");

        if !records_path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let content = fs::read_to_string(records_path)?;
        let mut records = Vec::new();
        for line in content.lines() {
            if !line.trim().is_empty() {
                records.push(serde_json::from_str(line)?);
            }
        }
        Ok(records)
    }

    /// Manifest and reassembled output of a stored run.
    pub fn load_run(&self, run_id: &str) -> ResultsResult<(RunManifest, RunOutput)> {
        let manifest = self.load_manifest(run_id)?;
        let records = self.load_records(run_id)?;
        let output = assemble_output(&manifest.run_type, records).ok_or_else(|| {
            ResultsError::Corrupt {
                run_id: run_id.to_string(),
                reason: "records do not match the manifest".to_string(),
            }
        })?;
        Ok((manifest, output))
    }

    /// Manifests of every stored run of `study`, oldest first.
    pub fn list_runs(&self, study: &str) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();

        if !self.root_dir.exists() {
            return Ok(runs);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let run_id = entry.file_name().to_string_lossy().to_string();
            if let Ok(manifest) = self.load_manifest(&run_id) {
                if manifest.study == study {
                    runs.push(manifest);
                }
            }
        }

        runs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }
}
