use anyhow::Context;
use clap::{Parser, Subcommand};
use modelgov_core::{
    EvaluateOptions, GateConfig, GovernanceController, ManifestStore, OpsStatusSink, Requirements,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Modelgov - governance control plane for trained model artifacts
#[derive(Parser)]
#[command(name = "modelgov", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding manifests, model payload files and governance state
    #[arg(long, value_name = "DIR", default_value = ".")]
    models_dir: PathBuf,

    /// Candidate manifest name, written by the training job
    #[arg(long, default_value = "manifest_latest.json")]
    candidate_manifest: String,

    /// Active manifest name, read by the serving layer
    #[arg(long, default_value = "manifest_active.json")]
    active_manifest: String,

    /// Previous-active manifest name, the implicit rollback target
    #[arg(long, default_value = "manifest_active_prev.json")]
    prev_active_manifest: String,

    /// Registry state document name, relative to the models directory
    #[arg(long, default_value = "governance_state.json")]
    state_file: String,

    /// Operational-status key/value document to mirror summaries into
    #[arg(long, value_name = "FILE")]
    ops_status_file: Option<PathBuf>,

    /// Enable debug-level tracing
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Report registry state and manifest slot existence (read-only)
    Status,

    /// Validate the candidate manifest and promote it when gates pass.
    /// Rejection is a normal outcome and exits 0.
    Evaluate {
        /// Targets every candidate must cover (CSV)
        #[arg(long, value_delimiter = ',')]
        required_targets: Vec<String>,

        /// Horizons every candidate must cover (CSV)
        #[arg(long, value_delimiter = ',')]
        required_horizons: Vec<String>,

        /// Minimum advance of candidate trained_end_ts over active (ms)
        #[arg(long, default_value_t = 0)]
        min_trained_end_delta_ms: i64,

        /// Allowed drop of the favorable-excursion metric (bps)
        #[arg(long, default_value_t = 1.5)]
        max_mfe_regression_bps: f64,

        /// Allowed worsening of the adverse-excursion metric (bps)
        #[arg(long, default_value_t = 2.0)]
        max_mae_worsening_bps: f64,

        /// Permit a candidate trained against a different feature contract
        #[arg(long)]
        allow_feature_version_change: bool,

        /// Promote even when gates fail; failures stay on record
        #[arg(long)]
        force_promote: bool,
    },

    /// Restore a previously active manifest. Exits non-zero when no
    /// rollback target resolves.
    Rollback {
        /// Explicit version to restore through its permanent archive
        #[arg(long, value_name = "VERSION")]
        to_version: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(dir = %cli.models_dir.display(), "modelgov starting");

    let store = ManifestStore::with_names(
        &cli.models_dir,
        cli.candidate_manifest.as_str(),
        cli.active_manifest.as_str(),
        cli.prev_active_manifest.as_str(),
    );
    let controller = GovernanceController::new(
        store,
        cli.models_dir.join(&cli.state_file),
        cli.ops_status_file.as_ref().map(OpsStatusSink::new),
    );

    match cli.command {
        Commands::Status => {
            let report = controller.status();
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Evaluate {
            required_targets,
            required_horizons,
            min_trained_end_delta_ms,
            max_mfe_regression_bps,
            max_mae_worsening_bps,
            allow_feature_version_change,
            force_promote,
        } => {
            let opts = EvaluateOptions {
                requirements: Requirements::new(required_targets, required_horizons),
                gates: GateConfig {
                    min_trained_end_delta_ms,
                    max_mfe_regression_bps,
                    max_mae_worsening_bps,
                    allow_feature_version_change,
                },
                force_promote,
            };
            let outcome = controller
                .evaluate(&opts)
                .context("evaluate failed")?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Rollback { to_version } => {
            let outcome = controller
                .rollback(to_version.as_deref())
                .context("rollback failed")?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}
