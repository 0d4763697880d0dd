//! Manifest - typed description of one trained model generation
//!
//! A manifest is written once by the training job and never mutated by
//! governance; it becomes active only by byte-copy into the active slot.
//! Parsing is two-phase: unreadable JSON is a fatal error at the store layer,
//! while a parseable document that does not fit this schema is reported as a
//! single validation error via [`Manifest::from_value`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Favorable-excursion metric name (basis points, higher is better)
pub const METRIC_MFE: &str = "mfe_bps";

/// Adverse-excursion metric name (basis points, more negative is worse)
pub const METRIC_MAE: &str = "mae_bps";

/// Named numeric metrics for one (horizon, target) cell
pub type MetricMap = BTreeMap<String, f64>;

/// Immutable-once-written description of one trained generation
///
/// Map keys are opaque identifiers: targets are target names, horizons are
/// the string form the training job uses (e.g. `"15m"`). Unknown extra
/// fields from the trainer are tolerated and ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Opaque generation identifier, conventionally increasing
    pub version: String,

    /// Feature contract the models were trained against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_version: Option<String>,

    /// target -> horizon -> model-file reference
    ///
    /// `None` when the document omits the mapping entirely; the validator
    /// turns that into a single fatal validation entry.
    #[serde(default)]
    pub models: Option<BTreeMap<String, BTreeMap<String, String>>>,

    /// target -> horizon -> decision threshold in [0, 1]
    #[serde(default)]
    pub thresholds: BTreeMap<String, BTreeMap<String, f64>>,

    /// horizon -> target -> named metrics, consumed by the gate evaluator
    #[serde(default)]
    pub stats: BTreeMap<String, BTreeMap<String, MetricMap>>,

    /// End-of-training-data timestamp (ms); absent only for bootstrap-era
    /// candidates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trained_end_ts: Option<i64>,
}

impl Manifest {
    /// Typed conversion from an already-parsed JSON document.
    ///
    /// A schema misfit (wrong type, missing `version`) is a validation
    /// failure of the candidate, not a process failure, so the error side is
    /// a plain message suitable for the rejection reason.
    pub fn from_value(value: serde_json::Value) -> std::result::Result<Self, String> {
        serde_json::from_value(value).map_err(|e| format!("manifest schema: {}", e))
    }

    /// Model-file reference for a (target, horizon) pair, if any
    pub fn model_file(&self, target: &str, horizon: &str) -> Option<&str> {
        self.models
            .as_ref()?
            .get(target)?
            .get(horizon)
            .map(String::as_str)
    }

    /// Decision threshold for a (target, horizon) pair, if any
    pub fn threshold(&self, target: &str, horizon: &str) -> Option<f64> {
        self.thresholds.get(target)?.get(horizon).copied()
    }

    /// Named metric for a (horizon, target) cell, if present
    pub fn stat(&self, horizon: &str, target: &str, metric: &str) -> Option<f64> {
        self.stats.get(horizon)?.get(target)?.get(metric).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "version": "v010",
            "feature_version": "v3",
            "models": { "reject": { "15m": "reject_15m.bin" } },
            "thresholds": { "reject": { "15m": 0.62 } },
            "stats": { "15m": { "reject": { "mfe_bps": 12.0, "mae_bps": -8.0 } } },
            "trained_end_ts": 1700000000000i64
        })
    }

    #[test]
    fn test_parse_full_manifest() {
        let m = Manifest::from_value(sample()).unwrap();
        assert_eq!(m.version, "v010");
        assert_eq!(m.feature_version.as_deref(), Some("v3"));
        assert_eq!(m.model_file("reject", "15m"), Some("reject_15m.bin"));
        assert_eq!(m.threshold("reject", "15m"), Some(0.62));
        assert_eq!(m.stat("15m", "reject", METRIC_MFE), Some(12.0));
        assert_eq!(m.stat("15m", "reject", METRIC_MAE), Some(-8.0));
        assert_eq!(m.trained_end_ts, Some(1700000000000));
    }

    #[test]
    fn test_missing_models_parses_as_none() {
        let m = Manifest::from_value(json!({ "version": "v1" })).unwrap();
        assert!(m.models.is_none());
        assert!(m.model_file("reject", "15m").is_none());
        assert!(m.trained_end_ts.is_none());
    }

    #[test]
    fn test_schema_misfit_is_message_not_panic() {
        let err = Manifest::from_value(json!({ "version": "v1", "models": "oops" })).unwrap_err();
        assert!(err.starts_with("manifest schema:"), "got: {}", err);
    }

    #[test]
    fn test_missing_version_is_schema_error() {
        let err = Manifest::from_value(json!({ "models": {} })).unwrap_err();
        assert!(err.contains("version"));
    }

    #[test]
    fn test_unknown_fields_tolerated() {
        let mut v = sample();
        v["trainer_host"] = json!("gpu-7");
        assert!(Manifest::from_value(v).is_ok());
    }
}
