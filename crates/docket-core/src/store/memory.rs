//! In-process repositories with JSON snapshots.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use super::{AuditEntry, AuditLog, DocumentRepository, ShipmentRepository, WriteOutcome};
use crate::error::{DocketError, Result};
use crate::models::document::{DocumentId, FieldKey, FieldValue};
use crate::models::shipment::{DocumentRecord, Shipment, ShipmentId};

/// Serializable contents of an [`InMemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSnapshot {
    pub shipments: Vec<Shipment>,
    pub documents: Vec<DocumentRecord>,
    pub audit: Vec<AuditEntry>,
}

impl StoreSnapshot {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Shipments, documents and audit log held in memory.
///
/// Every repository trait is implemented on the same value so one `Arc`
/// can serve all of them.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    shipments: RwLock<BTreeMap<ShipmentId, Shipment>>,
    /// Documents in insertion order.
    documents: RwLock<Vec<DocumentRecord>>,
    audit: RwLock<Vec<AuditEntry>>,
    audit_offline: AtomicBool,
    shipments_offline: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            shipments: RwLock::new(
                snapshot
                    .shipments
                    .into_iter()
                    .map(|s| (s.id.clone(), s))
                    .collect(),
            ),
            documents: RwLock::new(snapshot.documents),
            audit: RwLock::new(snapshot.audit),
            ..Self::default()
        }
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            shipments: self.shipments.read().await.values().cloned().collect(),
            documents: self.documents.read().await.clone(),
            audit: self.audit.read().await.clone(),
        }
    }

    /// Insert or replace a shipment as is, version included.
    pub async fn put_shipment(&self, shipment: Shipment) {
        self.shipments
            .write()
            .await
            .insert(shipment.id.clone(), shipment);
    }

    /// Insert or replace a document.
    pub async fn put_document(&self, document: DocumentRecord) {
        let mut documents = self.documents.write().await;
        match documents.iter_mut().find(|d| d.id == document.id) {
            Some(existing) => *existing = document,
            None => documents.push(document),
        }
    }

    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.read().await.clone()
    }

    /// Make the audit log refuse writes, as an unreachable backend would.
    pub fn set_audit_offline(&self, offline: bool) {
        self.audit_offline.store(offline, Ordering::SeqCst);
    }

    /// Make shipment reads and writes fail.
    pub fn set_shipments_offline(&self, offline: bool) {
        self.shipments_offline.store(offline, Ordering::SeqCst);
    }

    fn check_shipments(&self) -> Result<()> {
        if self.shipments_offline.load(Ordering::SeqCst) {
            return Err(DocketError::unavailable("shipments", "store offline"));
        }
        Ok(())
    }

    fn check_audit(&self) -> Result<()> {
        if self.audit_offline.load(Ordering::SeqCst) {
            return Err(DocketError::unavailable("audit log", "store offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentRepository for InMemoryStore {
    async fn get_document(&self, id: &DocumentId) -> Result<DocumentRecord> {
        self.documents
            .read()
            .await
            .iter()
            .find(|d| &d.id == id)
            .cloned()
            .ok_or_else(|| DocketError::NotFound {
                kind: "document",
                id: id.to_string(),
            })
    }

    async fn documents_for_shipment(&self, shipment_id: &ShipmentId) -> Result<Vec<DocumentRecord>> {
        Ok(self
            .documents
            .read()
            .await
            .iter()
            .filter(|d| &d.shipment_id == shipment_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ShipmentRepository for InMemoryStore {
    async fn get_shipment(&self, id: &ShipmentId) -> Result<Shipment> {
        self.check_shipments()?;
        self.shipments
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| DocketError::NotFound {
                kind: "shipment",
                id: id.to_string(),
            })
    }

    async fn write_fields(
        &self,
        id: &ShipmentId,
        expected_version: u64,
        updates: &BTreeMap<FieldKey, FieldValue>,
        audit: &[AuditEntry],
    ) -> Result<WriteOutcome> {
        self.check_shipments()?;
        if !audit.is_empty() {
            self.check_audit()?;
        }
        let mut shipments = self.shipments.write().await;
        let shipment = shipments.get_mut(id).ok_or_else(|| DocketError::NotFound {
            kind: "shipment",
            id: id.to_string(),
        })?;

        if shipment.version != expected_version {
            debug!(
                "Version conflict on {}: expected {}, found {}",
                id, expected_version, shipment.version
            );
            return Ok(WriteOutcome::VersionConflict {
                current_version: shipment.version,
            });
        }

        // Validate every update before touching the record.
        let mut updated = shipment.clone();
        for (key, value) in updates {
            if !updated.set_field(*key, value.clone()) {
                return Err(DocketError::Config(format!(
                    "cannot write {} value '{}' to shipment",
                    key, value
                )));
            }
        }
        updated.version += 1;
        let version = updated.version;
        self.audit.write().await.extend(audit.iter().cloned());
        *shipment = updated;
        Ok(WriteOutcome::Written { version })
    }
}

#[async_trait]
impl AuditLog for InMemoryStore {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        self.check_audit()?;
        self.audit.write().await.push(entry);
        Ok(())
    }
}
