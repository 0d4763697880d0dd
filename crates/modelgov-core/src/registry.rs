//! State registry - the durable singleton governance record
//!
//! Loaded at the start of an invocation, mutated in memory, persisted once
//! per decision via the atomic temp-file-then-rename discipline. History is
//! a sliding window of recent transitions, not a full audit trail; the full
//! trail belongs to an external collaborator.

use crate::error::Result;
use crate::store::write_atomic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Maximum retained history entries; older entries are dropped FIFO
pub const HISTORY_CAP: usize = 200;

/// Outcome class of one governance invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceAction {
    #[default]
    None,
    Bootstrap,
    NoChange,
    Rejected,
    Promoted,
    Rollback,
}

impl GovernanceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bootstrap => "bootstrap",
            Self::NoChange => "no_change",
            Self::Rejected => "rejected",
            Self::Promoted => "promoted",
            Self::Rollback => "rollback",
        }
    }
}

impl fmt::Display for GovernanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub at_ms: i64,
    pub action: GovernanceAction,
    pub active_version: Option<String>,
    pub previous_active_version: Option<String>,
    pub candidate_version: Option<String>,
    pub reason: String,
    #[serde(default)]
    pub forced: bool,
}

/// Singleton durable governance state
///
/// `active_version` is `None` only before the first bootstrap; afterwards
/// every mutation first copies the outgoing active manifest into the
/// previous-active slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryState {
    pub active_version: Option<String>,
    pub previous_active_version: Option<String>,
    pub candidate_version: Option<String>,
    #[serde(default)]
    pub last_action: GovernanceAction,
    #[serde(default)]
    pub last_reason: String,
    pub last_checked_at_ms: Option<i64>,
    pub last_promoted_at_ms: Option<i64>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl RegistryState {
    /// Load from disk, or the default record when no document exists yet
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Persist atomically
    pub fn persist(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &bytes)
    }

    /// Append a transition, trimming to the last [`HISTORY_CAP`] entries
    pub fn push_history(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
        if self.history.len() > HISTORY_CAP {
            let excess = self.history.len() - HISTORY_CAP;
            self.history.drain(..excess);
        }
    }

    /// Stamp the outcome of an invocation and append the matching history
    /// entry in one step, so no branch can record one half without the other.
    pub fn record(&mut self, action: GovernanceAction, reason: &str, forced: bool, at_ms: i64) {
        self.last_action = action;
        self.last_reason = reason.to_string();
        self.last_checked_at_ms = Some(at_ms);
        self.push_history(HistoryEntry {
            at_ms,
            action,
            active_version: self.active_version.clone(),
            previous_active_version: self.previous_active_version.clone(),
            candidate_version: self.candidate_version.clone(),
            reason: reason.to_string(),
            forced,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_default_when_absent() {
        let dir = tempdir().unwrap();
        let state = RegistryState::load(&dir.path().join("governance_state.json")).unwrap();
        assert!(state.active_version.is_none());
        assert_eq!(state.last_action, GovernanceAction::None);
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_persist_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("governance_state.json");

        let mut state = RegistryState::default();
        state.active_version = Some("v010".into());
        state.record(GovernanceAction::Bootstrap, "bootstrap", false, 42);
        state.persist(&path).unwrap();

        let loaded = RegistryState::load(&path).unwrap();
        assert_eq!(loaded.active_version.as_deref(), Some("v010"));
        assert_eq!(loaded.last_action, GovernanceAction::Bootstrap);
        assert_eq!(loaded.last_checked_at_ms, Some(42));
        assert_eq!(loaded.history.len(), 1);
        assert_eq!(loaded.history[0].reason, "bootstrap");
    }

    #[test]
    fn test_history_capped_fifo() {
        let mut state = RegistryState::default();
        for i in 0..(HISTORY_CAP as i64 + 25) {
            state.record(GovernanceAction::NoChange, &format!("run {}", i), false, i);
        }
        assert_eq!(state.history.len(), HISTORY_CAP);
        assert_eq!(state.history[0].at_ms, 25);
        assert_eq!(state.history.last().unwrap().at_ms, HISTORY_CAP as i64 + 24);
    }

    #[test]
    fn test_action_serializes_snake_case() {
        let json = serde_json::to_string(&GovernanceAction::NoChange).unwrap();
        assert_eq!(json, "\"no_change\"");
        assert_eq!(GovernanceAction::Rollback.to_string(), "rollback");
    }
}
