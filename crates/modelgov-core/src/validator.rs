//! Validator - structural completeness checks for a candidate manifest
//!
//! Every rule is checked, never short-circuited, so one run reports every
//! defect. A non-empty error list makes the candidate un-promotable until a
//! corrected document is resubmitted; there is no partial accept.

use crate::config::Requirements;
use crate::manifest::Manifest;
use crate::store::ManifestStore;

/// Validate a candidate manifest against the required coverage.
///
/// Returns a (possibly empty) list of human-readable errors. A missing
/// `models` mapping is a single fatal entry that replaces the per-pair model
/// checks; the remaining rules still run.
pub fn validate(manifest: &Manifest, req: &Requirements, store: &ManifestStore) -> Vec<String> {
    let mut errors = Vec::new();

    match &manifest.models {
        None => errors.push("models: required mapping is missing".to_string()),
        Some(models) => {
            for (target, horizon) in req.pairs() {
                match models.get(target).and_then(|h| h.get(horizon)) {
                    None => errors.push(format!(
                        "models[{}][{}]: missing model-file reference",
                        target, horizon
                    )),
                    Some(name) if name.is_empty() => errors.push(format!(
                        "models[{}][{}]: empty model-file reference",
                        target, horizon
                    )),
                    Some(name) if !store.model_file_exists(name) => errors.push(format!(
                        "models[{}][{}]: file '{}' not found in models directory",
                        target, horizon, name
                    )),
                    Some(_) => {}
                }
            }
        }
    }

    for (target, horizon) in req.pairs() {
        match manifest.threshold(target, horizon) {
            None => errors.push(format!(
                "thresholds[{}][{}]: missing threshold",
                target, horizon
            )),
            Some(t) if !(0.0..=1.0).contains(&t) => errors.push(format!(
                "thresholds[{}][{}]: {} outside [0, 1]",
                target, horizon, t
            )),
            Some(_) => {}
        }
    }

    if let Some(ts) = manifest.trained_end_ts {
        if ts <= 0 {
            errors.push(format!("trained_end_ts: must be positive, got {}", ts));
        }
    }

    errors
}
