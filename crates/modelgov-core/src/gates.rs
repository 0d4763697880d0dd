//! Gate evaluator - promotion rules comparing candidate against active
//!
//! Gates are advisory: a non-empty failure list blocks promotion unless the
//! operator forces it, and forced promotions still carry the failures into
//! the result and history. A missing stat on either side skips that specific
//! comparison; governance trusts explicit numbers and never guesses.

use crate::config::{GateConfig, Requirements};
use crate::manifest::{Manifest, METRIC_MAE, METRIC_MFE};

/// Evaluate all promotion gates. Empty result means pass.
///
/// Failure strings name the gate and the `target:horizon` pair so a
/// rejection reason pinpoints the offending cell.
pub fn evaluate_gates(
    active: &Manifest,
    candidate: &Manifest,
    cfg: &GateConfig,
    req: &Requirements,
) -> Vec<String> {
    let mut failures = Vec::new();

    if let (Some(a), Some(c)) = (&active.feature_version, &candidate.feature_version) {
        if a != c && !cfg.allow_feature_version_change {
            failures.push(format!(
                "feature_version: candidate '{}' differs from active '{}'",
                c, a
            ));
        }
    }

    if let (Some(a), Some(c)) = (active.trained_end_ts, candidate.trained_end_ts) {
        if c < a + cfg.min_trained_end_delta_ms {
            failures.push(format!(
                "freshness: candidate trained_end_ts {} behind active {} (min delta {} ms)",
                c, a, cfg.min_trained_end_delta_ms
            ));
        }
    }

    for (target, horizon) in req.pairs() {
        if let (Some(a), Some(c)) = (
            active.stat(horizon, target, METRIC_MFE),
            candidate.stat(horizon, target, METRIC_MFE),
        ) {
            if c < a - cfg.max_mfe_regression_bps {
                failures.push(format!(
                    "mfe_regression {}:{}: candidate {} vs active {} exceeds tolerance {}",
                    target, horizon, c, a, cfg.max_mfe_regression_bps
                ));
            }
        }

        if let (Some(a), Some(c)) = (
            active.stat(horizon, target, METRIC_MAE),
            candidate.stat(horizon, target, METRIC_MAE),
        ) {
            if c < a - cfg.max_mae_worsening_bps {
                failures.push(format!(
                    "mae_worsening {}:{}: candidate {} vs active {} exceeds tolerance {}",
                    target, horizon, c, a, cfg.max_mae_worsening_bps
                ));
            }
        }
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn req() -> Requirements {
        Requirements::new(vec!["reject".into()], vec!["15m".into()])
    }

    fn manifest(version: &str, feature: &str, ts: i64, mfe: f64, mae: f64) -> Manifest {
        Manifest::from_value(json!({
            "version": version,
            "feature_version": feature,
            "models": { "reject": { "15m": "reject_15m.bin" } },
            "thresholds": { "reject": { "15m": 0.5 } },
            "stats": { "15m": { "reject": { "mfe_bps": mfe, "mae_bps": mae } } },
            "trained_end_ts": ts
        }))
        .unwrap()
    }

    #[test]
    fn test_equal_manifests_pass() {
        let a = manifest("v010", "v3", 1000, 12.0, -8.0);
        let c = manifest("v011", "v3", 1000, 12.0, -8.0);
        assert!(evaluate_gates(&a, &c, &GateConfig::default(), &req()).is_empty());
    }

    #[test]
    fn test_feature_version_change_blocked_unless_allowed() {
        let a = manifest("v010", "v3", 1000, 12.0, -8.0);
        let c = manifest("v011", "v4", 1000, 12.0, -8.0);

        let failures = evaluate_gates(&a, &c, &GateConfig::default(), &req());
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("feature_version"));

        let cfg = GateConfig {
            allow_feature_version_change: true,
            ..GateConfig::default()
        };
        assert!(evaluate_gates(&a, &c, &cfg, &req()).is_empty());
    }

    #[test]
    fn test_freshness_rejects_older_training_data() {
        let a = manifest("v010", "v3", 2000, 12.0, -8.0);
        let c = manifest("v011", "v3", 1000, 12.0, -8.0);

        let failures = evaluate_gates(&a, &c, &GateConfig::default(), &req());
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("freshness"));
    }

    #[test]
    fn test_freshness_min_delta() {
        let a = manifest("v010", "v3", 1000, 12.0, -8.0);
        let c = manifest("v011", "v3", 1500, 12.0, -8.0);
        let cfg = GateConfig {
            min_trained_end_delta_ms: 1000,
            ..GateConfig::default()
        };

        let failures = evaluate_gates(&a, &c, &cfg, &req());
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("min delta 1000"));
    }

    #[test]
    fn test_mfe_regression_beyond_tolerance_fails() {
        // The v010/v011 scenario: favorable drops 12.0 -> 9.0, tolerance 1.5.
        let a = manifest("v010", "v3", 1000, 12.0, -8.0);
        let c = manifest("v011", "v3", 1000, 9.0, -8.0);

        let failures = evaluate_gates(&a, &c, &GateConfig::default(), &req());
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("mfe_regression reject:15m"));
    }

    #[test]
    fn test_mfe_regression_within_tolerance_passes() {
        let a = manifest("v010", "v3", 1000, 12.0, -8.0);
        let c = manifest("v011", "v3", 1000, 11.0, -8.0);
        assert!(evaluate_gates(&a, &c, &GateConfig::default(), &req()).is_empty());
    }

    #[test]
    fn test_mae_worsening_fails() {
        // More negative adverse excursion is worse: -8.0 -> -11.0 with
        // tolerance 2.0 fails.
        let a = manifest("v010", "v3", 1000, 12.0, -8.0);
        let c = manifest("v011", "v3", 1000, 12.0, -11.0);

        let failures = evaluate_gates(&a, &c, &GateConfig::default(), &req());
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("mae_worsening reject:15m"));
    }

    #[test]
    fn test_missing_stats_skip_that_check() {
        let a = manifest("v010", "v3", 1000, 12.0, -8.0);
        let mut doc = json!({
            "version": "v011",
            "feature_version": "v3",
            "models": { "reject": { "15m": "reject_15m.bin" } },
            "trained_end_ts": 1000
        });
        doc["thresholds"] = json!({ "reject": { "15m": 0.5 } });
        let c = Manifest::from_value(doc).unwrap();

        assert!(evaluate_gates(&a, &c, &GateConfig::default(), &req()).is_empty());
    }

    proptest! {
        // Monotonicity: a candidate at least as good as active on every
        // required metric never fails performance gates; pushing one metric
        // past its tolerance always yields a failure naming the pair.
        #[test]
        fn prop_gate_monotonicity(
            mfe in -50.0f64..50.0,
            mae in -50.0f64..0.0,
            mfe_gain in 0.0f64..10.0,
            mae_gain in 0.0f64..10.0,
            excess in 0.01f64..25.0,
        ) {
            let cfg = GateConfig::default();
            let a = manifest("v010", "v3", 1000, mfe, mae);

            let good = manifest("v011", "v3", 1000, mfe + mfe_gain, mae + mae_gain);
            prop_assert!(evaluate_gates(&a, &good, &cfg, &req()).is_empty());

            let bad_mfe = manifest(
                "v011", "v3", 1000,
                mfe - cfg.max_mfe_regression_bps - excess,
                mae,
            );
            let failures = evaluate_gates(&a, &bad_mfe, &cfg, &req());
            prop_assert!(failures.iter().any(|f| f.contains("reject:15m")));

            let bad_mae = manifest(
                "v011", "v3", 1000,
                mfe,
                mae - cfg.max_mae_worsening_bps - excess,
            );
            let failures = evaluate_gates(&a, &bad_mae, &cfg, &req());
            prop_assert!(failures.iter().any(|f| f.contains("reject:15m")));
        }
    }
}
