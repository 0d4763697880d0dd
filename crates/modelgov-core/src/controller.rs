//! Governance controller - orchestrates status, evaluate and rollback
//!
//! Each operation is one short-lived invocation: load state, decide fully in
//! memory, then persist. File writes happen only after the decision is
//! finalized, so a fatal error part-way through decision-making leaves
//! nothing applied. Every decision branch persists the registry and mirrors
//! a condensed status to the operational sink before returning.

use crate::config::{GateConfig, Requirements};
use crate::error::{GovernanceError, Result};
use crate::gates::evaluate_gates;
use crate::lock::GovernanceLock;
use crate::manifest::Manifest;
use crate::ops_status::OpsStatusSink;
use crate::registry::{GovernanceAction, RegistryState};
use crate::store::{ManifestStore, Slot};
use crate::validator::validate;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Per-invocation inputs to `evaluate`
#[derive(Debug, Clone, Default)]
pub struct EvaluateOptions {
    pub requirements: Requirements,
    pub gates: GateConfig,
    pub force_promote: bool,
}

/// Existence and version of one manifest slot
#[derive(Debug, Clone, Serialize)]
pub struct SlotReport {
    pub path: String,
    pub exists: bool,
    pub version: Option<String>,
}

/// Read-only report returned by `status`
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub registry: Option<RegistryState>,
    pub registry_error: Option<String>,
    pub candidate: SlotReport,
    pub active: SlotReport,
    pub previous_active: SlotReport,
}

/// Structured result of one `evaluate` invocation
#[derive(Debug, Clone, Serialize)]
pub struct EvaluateOutcome {
    pub action: GovernanceAction,
    pub promoted: bool,
    pub forced: bool,
    pub candidate_version: Option<String>,
    pub active_version: Option<String>,
    pub validation_errors: Vec<String>,
    pub gate_failures: Vec<String>,
    pub reason: String,
}

/// Structured result of one `rollback` invocation
#[derive(Debug, Clone, Serialize)]
pub struct RollbackOutcome {
    pub action: GovernanceAction,
    pub active_version: Option<String>,
    pub previous_active_version: Option<String>,
    pub reason: String,
}

/// The governance control plane over one models directory
pub struct GovernanceController {
    store: ManifestStore,
    state_path: PathBuf,
    lock_path: PathBuf,
    sink: Option<OpsStatusSink>,
}

impl GovernanceController {
    pub fn new(store: ManifestStore, state_path: PathBuf, sink: Option<OpsStatusSink>) -> Self {
        let lock_path = store.dir().join(".governance.lock");
        Self {
            store,
            state_path,
            lock_path,
            sink,
        }
    }

    /// Pure read: registry snapshot plus per-slot existence and version.
    ///
    /// Never fails; a corrupt registry document is folded into
    /// `registry_error` so monitoring can still see the manifest slots.
    pub fn status(&self) -> StatusReport {
        let (registry, registry_error) = match RegistryState::load(&self.state_path) {
            Ok(r) => (Some(r), None),
            Err(e) => (None, Some(e.to_string())),
        };
        StatusReport {
            registry,
            registry_error,
            candidate: self.slot_report(Slot::Candidate),
            active: self.slot_report(Slot::Active),
            previous_active: self.slot_report(Slot::PreviousActive),
        }
    }

    fn slot_report(&self, slot: Slot) -> SlotReport {
        let path = self.store.path(slot);
        let exists = path.exists();
        let version = exists
            .then(|| self.store.load_manifest(&path).ok())
            .flatten()
            .map(|m| m.version);
        SlotReport {
            path: path.display().to_string(),
            exists,
            version,
        }
    }

    /// Validate the candidate and promote it when gates pass.
    ///
    /// Rejections are a normal outcome, returned as `Ok`; only filesystem
    /// and parse failures are `Err`.
    pub fn evaluate(&self, opts: &EvaluateOptions) -> Result<EvaluateOutcome> {
        let _lock = GovernanceLock::acquire(&self.lock_path)?;
        let now = Utc::now().timestamp_millis();
        let mut registry = RegistryState::load(&self.state_path)?;

        let candidate_path = self.store.path(Slot::Candidate);
        let value = self.store.load_value(&candidate_path)?;
        let candidate = match Manifest::from_value(value) {
            Ok(m) => m,
            Err(schema_err) => {
                registry.candidate_version = None;
                return self.finish_rejected(registry, None, vec![schema_err], now);
            }
        };
        registry.candidate_version = Some(candidate.version.clone());
        debug!(candidate = %candidate.version, "loaded candidate manifest");

        let validation_errors = validate(&candidate, &opts.requirements, &self.store);
        if !validation_errors.is_empty() {
            return self.finish_rejected(registry, Some(&candidate), validation_errors, now);
        }

        let active_path = self.store.path(Slot::Active);
        if !active_path.exists() {
            // Bootstrap: first-ever promotion, gates do not apply.
            self.store.copy(&candidate_path, &active_path)?;
            self.store
                .archive_if_absent(&candidate.version, &candidate_path)?;
            registry.previous_active_version = None;
            registry.active_version = Some(candidate.version.clone());
            registry.last_promoted_at_ms = Some(now);
            let reason = format!("bootstrap: {} is the first active manifest", candidate.version);
            registry.record(GovernanceAction::Bootstrap, &reason, false, now);
            self.persist_and_mirror(&registry, now)?;
            info!(version = %candidate.version, "bootstrap promotion");
            return Ok(self.outcome(
                &registry,
                GovernanceAction::Bootstrap,
                true,
                false,
                Vec::new(),
                Vec::new(),
                reason,
            ));
        }

        let active = self.store.load_manifest(&active_path)?;
        if active.version == candidate.version {
            let reason = format!("candidate {} already active", candidate.version);
            registry.record(GovernanceAction::NoChange, &reason, false, now);
            self.persist_and_mirror(&registry, now)?;
            debug!(version = %candidate.version, "no change");
            return Ok(self.outcome(
                &registry,
                GovernanceAction::NoChange,
                false,
                false,
                Vec::new(),
                Vec::new(),
                reason,
            ));
        }

        let gate_failures = evaluate_gates(&active, &candidate, &opts.gates, &opts.requirements);
        if !gate_failures.is_empty() && !opts.force_promote {
            let reason = format!("gates failed: {}", gate_failures.join("; "));
            registry.record(GovernanceAction::Rejected, &reason, false, now);
            self.persist_and_mirror(&registry, now)?;
            info!(candidate = %candidate.version, failures = gate_failures.len(), "rejected");
            return Ok(self.outcome(
                &registry,
                GovernanceAction::Rejected,
                false,
                false,
                Vec::new(),
                gate_failures,
                reason,
            ));
        }

        // Promote: outgoing active goes to the previous-active slot first.
        let forced = !gate_failures.is_empty();
        self.store
            .copy(&active_path, &self.store.path(Slot::PreviousActive))?;
        self.store.copy(&candidate_path, &active_path)?;
        self.store
            .archive_if_absent(&candidate.version, &candidate_path)?;
        registry.previous_active_version = Some(active.version.clone());
        registry.active_version = Some(candidate.version.clone());
        registry.last_promoted_at_ms = Some(now);
        let reason = if forced {
            format!(
                "forced promotion of {} past failing gates: {}",
                candidate.version,
                gate_failures.join("; ")
            )
        } else {
            format!("promoted {} over {}", candidate.version, active.version)
        };
        registry.record(GovernanceAction::Promoted, &reason, forced, now);
        self.persist_and_mirror(&registry, now)?;
        info!(from = %active.version, to = %candidate.version, forced, "promoted");
        Ok(self.outcome(
            &registry,
            GovernanceAction::Promoted,
            true,
            forced,
            Vec::new(),
            gate_failures,
            reason,
        ))
    }

    /// Restore a previously active manifest.
    ///
    /// An explicit version resolves through its permanent archive; otherwise
    /// the previous-active slot is the fallback. No resolvable target is a
    /// fatal error.
    pub fn rollback(&self, to_version: Option<&str>) -> Result<RollbackOutcome> {
        let _lock = GovernanceLock::acquire(&self.lock_path)?;
        let now = Utc::now().timestamp_millis();
        let mut registry = RegistryState::load(&self.state_path)?;

        let (target_path, target) = match to_version {
            Some(version) => {
                let path = self.store.archive_path(version);
                if !path.exists() {
                    return Err(GovernanceError::RollbackTargetMissing(version.to_string()));
                }
                let manifest = self.store.load_manifest(&path)?;
                (path, manifest)
            }
            None => {
                let path = self.store.path(Slot::PreviousActive);
                if !path.exists() {
                    return Err(GovernanceError::NoRollbackTarget);
                }
                let manifest = self.store.load_manifest(&path)?;
                (path, manifest)
            }
        };

        let active_path = self.store.path(Slot::Active);
        let current = if active_path.exists() {
            Some(self.store.load_manifest(&active_path)?)
        } else {
            None
        };

        if let Some(active) = &current {
            if active.version == target.version {
                let reason = format!("rollback target {} already active", target.version);
                registry.record(GovernanceAction::NoChange, &reason, false, now);
                self.persist_and_mirror(&registry, now)?;
                return Ok(RollbackOutcome {
                    action: GovernanceAction::NoChange,
                    active_version: registry.active_version.clone(),
                    previous_active_version: registry.previous_active_version.clone(),
                    reason,
                });
            }
        }

        // Read the target bytes before the outgoing active overwrites the
        // previous-active slot, which may itself be the target.
        let target_bytes = self.store.read_bytes(&target_path)?;
        if let Some(active) = &current {
            self.store
                .copy(&active_path, &self.store.path(Slot::PreviousActive))?;
            registry.previous_active_version = Some(active.version.clone());
        }
        crate::store::write_atomic(&active_path, &target_bytes)?;
        self.store.archive_if_absent(&target.version, &active_path)?;
        registry.active_version = Some(target.version.clone());
        let reason = match &current {
            Some(active) => format!("rollback from {} to {}", active.version, target.version),
            None => format!("rollback to {} with no active manifest", target.version),
        };
        registry.record(GovernanceAction::Rollback, &reason, false, now);
        self.persist_and_mirror(&registry, now)?;
        info!(to = %target.version, "rollback applied");
        Ok(RollbackOutcome {
            action: GovernanceAction::Rollback,
            active_version: registry.active_version.clone(),
            previous_active_version: registry.previous_active_version.clone(),
            reason,
        })
    }

    fn finish_rejected(
        &self,
        mut registry: RegistryState,
        candidate: Option<&Manifest>,
        validation_errors: Vec<String>,
        now: i64,
    ) -> Result<EvaluateOutcome> {
        let reason = format!("validation failed: {}", validation_errors.join("; "));
        registry.record(GovernanceAction::Rejected, &reason, false, now);
        self.persist_and_mirror(&registry, now)?;
        info!(
            candidate = candidate.map(|m| m.version.as_str()).unwrap_or("<unparsed>"),
            errors = validation_errors.len(),
            "candidate rejected by validator"
        );
        Ok(self.outcome(
            &registry,
            GovernanceAction::Rejected,
            false,
            false,
            validation_errors,
            Vec::new(),
            reason,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn outcome(
        &self,
        registry: &RegistryState,
        action: GovernanceAction,
        promoted: bool,
        forced: bool,
        validation_errors: Vec<String>,
        gate_failures: Vec<String>,
        reason: String,
    ) -> EvaluateOutcome {
        EvaluateOutcome {
            action,
            promoted,
            forced,
            candidate_version: registry.candidate_version.clone(),
            active_version: registry.active_version.clone(),
            validation_errors,
            gate_failures,
            reason,
        }
    }

    /// Persist the registry, then mirror the condensed status. The registry
    /// is the authoritative record; a sink failure is logged and swallowed.
    fn persist_and_mirror(&self, registry: &RegistryState, now: i64) -> Result<()> {
        registry.persist(&self.state_path)?;
        if let Some(sink) = &self.sink {
            let fields = [
                ("governance_active_version", json!(registry.active_version)),
                (
                    "governance_candidate_version",
                    json!(registry.candidate_version),
                ),
                (
                    "governance_last_action",
                    json!(registry.last_action.as_str()),
                ),
                ("governance_last_reason", json!(registry.last_reason)),
                ("governance_last_checked_at_ms", json!(now)),
            ];
            if let Err(e) = sink.upsert(&fields, now) {
                warn!("ops-status mirror failed: {}", e);
            }
        }
        Ok(())
    }
}
