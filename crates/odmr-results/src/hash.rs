//! Content-based hashing for run IDs.

use odmr_project::schema::{ModelDef, RunKindDef, SolverDef};
use sha2::{Digest, Sha256};

/// Stamped into manifests and run IDs; bump invalidates cached runs.
pub const SOLVER_VERSION: &str = concat!("odmr-", env!("CARGO_PKG_VERSION"));

/// SHA-256 over everything that determines a run's output. Run ids and
/// display names are excluded, so renaming a run keeps its cache entry.
pub fn compute_run_id(
    model: &ModelDef,
    solver: Option<&SolverDef>,
    run: &RunKindDef,
    solver_version: &str,
) -> String {
    let mut hasher = Sha256::new();

    let model_json = serde_json::to_string(model).unwrap_or_default();
    hasher.update(model_json.as_bytes());

    let solver_json = serde_json::to_string(&solver).unwrap_or_default();
    hasher.update(solver_json.as_bytes());

    let run_json = serde_json::to_string(run).unwrap_or_default();
    hasher.update(run_json.as_bytes());

    hasher.update(solver_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use odmr_project::schema::ContrastMethodDef;
    use std::collections::BTreeMap;

    fn preset(name: &str) -> ModelDef {
        ModelDef::Preset {
            name: name.to_string(),
            overrides: BTreeMap::new(),
        }
    }

    fn contrast(gamma: f64) -> RunKindDef {
        RunKindDef::Contrast {
            gamma,
            kmw_minus: 1.0,
            kmw_plus: 0.0,
            method: ContrastMethodDef::SteadyState,
            initial: None,
        }
    }

    #[test]
    fn hash_stability() {
        let model = preset("nv_bulk");
        let run = contrast(0.1);

        let hash1 = compute_run_id(&model, None, &run, "v1");
        let hash2 = compute_run_id(&model, None, &run, "v1");

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        let base = compute_run_id(&preset("nv_bulk"), None, &contrast(0.1), "v1");

        assert_ne!(base, compute_run_id(&preset("g4_g9_90dp"), None, &contrast(0.1), "v1"));
        assert_ne!(base, compute_run_id(&preset("nv_bulk"), None, &contrast(0.2), "v1"));
        assert_ne!(base, compute_run_id(&preset("nv_bulk"), None, &contrast(0.1), "v2"));

        let solver = SolverDef {
            rtol: Some(1e-6),
            ..SolverDef::default()
        };
        assert_ne!(
            base,
            compute_run_id(&preset("nv_bulk"), Some(&solver), &contrast(0.1), "v1")
        );
    }
}
