//! Sync previews, apply requests, and results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::document::{DocumentId, FieldKey, FieldValue};
use super::shipment::{Shipment, ShipmentId};

/// Classification of a proposed field change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Shipment attribute is empty.
    Fill,
    /// Shipment attribute holds a synthetic stand-in value.
    ReplacePlaceholder,
    /// Shipment attribute holds a real value that differs.
    Update,
    /// Values already agree.
    Unchanged,
    /// Extraction found nothing.
    NoValue,
}

/// One field of a sync preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncChange {
    pub field: FieldKey,
    pub current_value: Option<FieldValue>,
    pub new_value: Option<FieldValue>,
    /// Confidence of `new_value`.
    pub confidence: f32,
    pub kind: ChangeKind,
    pub is_placeholder: bool,
    /// Locked by a prior human confirmation.
    pub locked: bool,
    pub will_update: bool,
}

/// Read-only diff between a document's extraction and its shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPreview {
    pub document_id: DocumentId,
    pub shipment_id: ShipmentId,
    /// Shipment version the preview was computed against.
    pub shipment_version: u64,
    pub changes: Vec<SyncChange>,
    /// Every proposed change only fills blanks or replaces placeholders, so
    /// the sync may be applied without operator confirmation.
    pub auto_synced: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
}

impl SyncPreview {
    pub fn change(&self, field: FieldKey) -> Option<&SyncChange> {
        self.changes.iter().find(|c| c.field == field)
    }

    /// Fields the reconciler proposes to write.
    pub fn proposed_fields(&self) -> Vec<FieldKey> {
        self.changes
            .iter()
            .filter(|c| c.will_update)
            .map(|c| c.field)
            .collect()
    }
}

/// Operator confirmation of a sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplySyncRequest {
    pub document_id: DocumentId,
    /// Shipment version the operator decided against.
    pub shipment_version: u64,
    pub accepted_fields: Vec<FieldKey>,
    pub actor: String,
    /// Shipment values the operator saw when accepting. A field whose current
    /// value no longer matches is reported as conflicted. Accepted fields
    /// missing here are conflicted once the shipment moves past
    /// `shipment_version`.
    #[serde(default)]
    pub baseline: BTreeMap<FieldKey, Option<FieldValue>>,
    /// Extracted values the operator accepted. A field that re-extracts to
    /// something else is reported as conflicted.
    #[serde(default)]
    pub accepted_values: BTreeMap<FieldKey, Option<FieldValue>>,
}

impl ApplySyncRequest {
    /// Request against a known shipment version, without pinned values.
    pub fn new(
        document_id: DocumentId,
        shipment_version: u64,
        accepted_fields: Vec<FieldKey>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            document_id,
            shipment_version,
            accepted_fields,
            actor: actor.into(),
            baseline: BTreeMap::new(),
            accepted_values: BTreeMap::new(),
        }
    }

    /// Accept fields of a preview, pinning both sides of every accepted change.
    pub fn from_preview(
        preview: &SyncPreview,
        accepted_fields: Vec<FieldKey>,
        actor: impl Into<String>,
    ) -> Self {
        let accepted: Vec<&SyncChange> = preview
            .changes
            .iter()
            .filter(|c| accepted_fields.contains(&c.field))
            .collect();
        Self {
            document_id: preview.document_id.clone(),
            shipment_version: preview.shipment_version,
            baseline: accepted
                .iter()
                .map(|c| (c.field, c.current_value.clone()))
                .collect(),
            accepted_values: accepted
                .iter()
                .map(|c| (c.field, c.new_value.clone()))
                .collect(),
            accepted_fields,
            actor: actor.into(),
        }
    }

    /// Fill the baseline of unpinned accepted fields from `shipment`, provided
    /// it is still at the version the request was made against.
    pub fn pin_baseline(&mut self, shipment: &Shipment) {
        if shipment.version != self.shipment_version {
            return;
        }
        for field in &self.accepted_fields {
            self.baseline
                .entry(*field)
                .or_insert_with(|| shipment.field(*field));
        }
    }
}

/// What happened to one accepted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    Written,
    /// The shipment changed since the preview; nothing was written.
    Conflicted,
    /// Locked by a human confirmation.
    Protected,
    Unchanged,
    NoValue,
    NotInDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOutcome {
    pub field: FieldKey,
    pub status: FieldStatus,
    pub before: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<FieldValue>,
}

/// Result of applying a sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    pub document_id: DocumentId,
    pub shipment_id: ShipmentId,
    /// One entry per accepted field.
    pub outcomes: Vec<FieldOutcome>,
    /// Shipment version after the write (unchanged when nothing was written).
    pub shipment_version: u64,
}

impl SyncResult {
    pub fn fields_with(&self, status: FieldStatus) -> Vec<FieldKey> {
        self.outcomes
            .iter()
            .filter(|o| o.status == status)
            .map(|o| o.field)
            .collect()
    }

    pub fn written(&self) -> Vec<FieldKey> {
        self.fields_with(FieldStatus::Written)
    }

    pub fn conflicted(&self) -> Vec<FieldKey> {
        self.fields_with(FieldStatus::Conflicted)
    }

    pub fn protected(&self) -> Vec<FieldKey> {
        self.fields_with(FieldStatus::Protected)
    }

    pub fn outcome(&self, field: FieldKey) -> Option<&FieldOutcome> {
        self.outcomes.iter().find(|o| o.field == field)
    }
}

/// Outcome of the upload-time auto-sync hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoSyncOutcome {
    pub preview: SyncPreview,
    /// Present when the preview qualified and was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<SyncResult>,
}
