//! Operational-status sink - key/value mirror for monitoring
//!
//! A small JSON document of named fields shared with other operational
//! scripts. Each field carries the timestamp of its last write; an upsert
//! only replaces a field when its timestamp is not newer (last-write-wins).
//! This is the controller's only coupling to that collaborator.

use crate::error::Result;
use crate::store::write_atomic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One mirrored field with its write timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusField {
    pub value: serde_json::Value,
    pub updated_at_ms: i64,
}

/// Handle on the shared key/value status document
#[derive(Debug, Clone)]
pub struct OpsStatusSink {
    path: PathBuf,
}

impl OpsStatusSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Merge a set of fields into the document, last-write-wins by
    /// timestamp, and persist atomically.
    pub fn upsert(&self, fields: &[(&str, serde_json::Value)], at_ms: i64) -> Result<()> {
        let mut doc: BTreeMap<String, StatusField> = if self.path.exists() {
            let bytes = std::fs::read(&self.path)?;
            serde_json::from_slice(&bytes)?
        } else {
            BTreeMap::new()
        };

        for (key, value) in fields {
            let stale = doc
                .get(*key)
                .map(|existing| existing.updated_at_ms > at_ms)
                .unwrap_or(false);
            if !stale {
                doc.insert(
                    key.to_string(),
                    StatusField {
                        value: value.clone(),
                        updated_at_ms: at_ms,
                    },
                );
            }
        }

        let bytes = serde_json::to_vec_pretty(&doc)?;
        write_atomic(&self.path, &bytes)
    }
}
