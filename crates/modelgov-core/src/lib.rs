//! Modelgov Core - the model governance control plane
//!
//! Decides which trained model generation is authoritative for live scoring
//! and transitions safely between generations. A training job deposits a
//! candidate manifest plus model payload files; a scheduled `evaluate` run
//! validates the candidate, compares it against the active generation
//! through promotion gates, and either promotes it (atomic pointer swap),
//! rejects it with the reasons recorded, or no-ops when it is already
//! active. `rollback` reverses the swap. The serving layer only ever reads
//! the active manifest and never observes a torn document: every persisted
//! file goes through temp-write plus atomic rename.
//!
//! # Quick start
//!
//! ```no_run
//! use modelgov_core::{
//!     EvaluateOptions, GovernanceController, ManifestStore, OpsStatusSink,
//! };
//!
//! let store = ManifestStore::new("/var/lib/models");
//! let controller = GovernanceController::new(
//!     store,
//!     "/var/lib/models/governance_state.json".into(),
//!     Some(OpsStatusSink::new("/var/lib/models/ops_status.json")),
//! );
//!
//! let outcome = controller.evaluate(&EvaluateOptions::default())?;
//! println!("{}: {}", outcome.action, outcome.reason);
//! # Ok::<(), modelgov_core::GovernanceError>(())
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod gates;
pub mod lock;
pub mod manifest;
pub mod ops_status;
pub mod registry;
pub mod store;
pub mod validator;

pub use config::{GateConfig, Requirements};
pub use controller::{
    EvaluateOptions, EvaluateOutcome, GovernanceController, RollbackOutcome, SlotReport,
    StatusReport,
};
pub use error::{GovernanceError, Result};
pub use manifest::{Manifest, METRIC_MAE, METRIC_MFE};
pub use ops_status::OpsStatusSink;
pub use registry::{GovernanceAction, HistoryEntry, RegistryState, HISTORY_CAP};
pub use store::{ManifestStore, Slot};
