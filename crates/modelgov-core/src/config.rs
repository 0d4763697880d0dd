//! Governance configuration - required coverage and gate tolerances

use serde::{Deserialize, Serialize};

/// The (target, horizon) coverage a candidate must provide.
///
/// Empty lists mean no coverage requirement: only structural manifest checks
/// run. The scheduler owns this policy and passes it per invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Requirements {
    pub targets: Vec<String>,
    pub horizons: Vec<String>,
}

impl Requirements {
    pub fn new(targets: Vec<String>, horizons: Vec<String>) -> Self {
        Self { targets, horizons }
    }

    /// Every required (target, horizon) pair, in declaration order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.targets.iter().flat_map(move |t| {
            self.horizons
                .iter()
                .map(move |h| (t.as_str(), h.as_str()))
        })
    }
}

/// Tolerances and switches for the promotion gates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Candidate `trained_end_ts` must be at least active's plus this delta
    /// (ms). The default of 0 rejects candidates trained on older data.
    pub min_trained_end_delta_ms: i64,

    /// Allowed drop of the favorable-excursion metric (basis points)
    pub max_mfe_regression_bps: f64,

    /// Allowed worsening of the adverse-excursion metric (basis points);
    /// more negative is worse
    pub max_mae_worsening_bps: f64,

    /// Permit a candidate trained against a different feature contract
    pub allow_feature_version_change: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_trained_end_delta_ms: 0,
            max_mfe_regression_bps: 1.5,
            max_mae_worsening_bps: 2.0,
            allow_feature_version_change: false,
        }
    }
}
