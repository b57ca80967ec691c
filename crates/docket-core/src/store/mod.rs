//! Repositories consumed by the pipeline.
//!
//! Persistence technology is up to the host platform; the pipeline only sees
//! these traits. [`InMemoryStore`] backs the CLI and the tests.

mod memory;

pub use memory::{InMemoryStore, StoreSnapshot};

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::models::document::{DocumentId, FieldKey, FieldValue};
use crate::models::shipment::{DocumentRecord, Shipment, ShipmentId};

/// Read access to uploaded documents.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn get_document(&self, id: &DocumentId) -> Result<DocumentRecord>;

    /// Documents attached to a shipment, in upload order.
    async fn documents_for_shipment(&self, shipment_id: &ShipmentId) -> Result<Vec<DocumentRecord>>;
}

/// Outcome of a compare-and-swap write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WriteOutcome {
    /// All fields were written; the shipment now has this version.
    Written { version: u64 },
    /// The shipment moved past the expected version; nothing was written.
    VersionConflict { current_version: u64 },
}

/// Shipment records with an optimistic-concurrency version token.
#[async_trait]
pub trait ShipmentRepository: Send + Sync {
    async fn get_shipment(&self, id: &ShipmentId) -> Result<Shipment>;

    /// Write all `updates` at once if the stored version is still
    /// `expected_version`, leaving the shipment at `expected_version + 1`.
    ///
    /// `audit` is committed in the same unit as the fields: when either part
    /// cannot be persisted, neither is, and the error is returned.
    async fn write_fields(
        &self,
        id: &ShipmentId,
        expected_version: u64,
        updates: &BTreeMap<FieldKey, FieldValue>,
        audit: &[AuditEntry],
    ) -> Result<WriteOutcome>;
}

/// Append-only audit trail.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> Result<()>;
}

/// One audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    /// Who triggered the change (`user:...`, `system:auto-sync`).
    pub actor: String,
    /// Event name, e.g. `shipment.field_synced`.
    pub action: String,
    pub resource_id: String,
    #[serde(default)]
    pub before: serde_json::Value,
    #[serde(default)]
    pub after: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub context: serde_json::Value,
}

impl AuditEntry {
    pub fn new(
        actor: impl Into<String>,
        action: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor: actor.into(),
            action: action.into(),
            resource_id: resource_id.into(),
            before: serde_json::Value::Null,
            after: serde_json::Value::Null,
            timestamp: Utc::now(),
            context: serde_json::Value::Null,
        }
    }

    pub fn with_change(mut self, before: serde_json::Value, after: serde_json::Value) -> Self {
        self.before = before;
        self.after = after;
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_audit_entries_have_unique_ids() {
        let a = AuditEntry::new("user:ana", "shipment.field_synced", "S-1");
        let b = AuditEntry::new("user:ana", "shipment.field_synced", "S-1");
        assert_ne!(a.id, b.id);
        assert_eq!(a.before, serde_json::Value::Null);
    }

    #[test]
    fn test_write_outcome_json() {
        let json = serde_json::to_value(WriteOutcome::VersionConflict { current_version: 4 }).unwrap();
        assert_eq!(json, json!({"outcome": "version_conflict", "current_version": 4}));
    }
}
