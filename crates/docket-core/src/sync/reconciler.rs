//! Diffing a canonical document against its shipment and planning writes.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::Result;
use crate::models::config::SyncConfig;
use crate::models::document::{CanonicalDocument, DocumentId, FieldKey, FieldValue};
use crate::models::report::{Decision, Severity, ValidationReport};
use crate::models::shipment::Shipment;
use crate::models::sync::{
    ApplySyncRequest, ChangeKind, FieldOutcome, FieldStatus, SyncChange, SyncPreview,
};

use super::placeholder::PlaceholderDetector;

/// Field writes decided for one apply attempt.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApplyPlan {
    /// One outcome per accepted field, in acceptance order.
    pub outcomes: Vec<FieldOutcome>,
    /// Values to write, keyed by field.
    pub updates: BTreeMap<FieldKey, FieldValue>,
}

impl ApplyPlan {
    pub fn has_updates(&self) -> bool {
        !self.updates.is_empty()
    }

    /// Turn every pending write into a conflict, keeping the shipment as is.
    pub fn into_conflicted(mut self) -> Self {
        for outcome in &mut self.outcomes {
            if outcome.status == FieldStatus::Written {
                outcome.status = FieldStatus::Conflicted;
                outcome.after = None;
            }
        }
        self.updates.clear();
        self
    }
}

/// Compares extractions with shipment records.
#[derive(Debug, Clone)]
pub struct SyncReconciler {
    config: SyncConfig,
    block_on_reject: bool,
    placeholders: PlaceholderDetector,
}

impl SyncReconciler {
    /// Build a reconciler; fails on an invalid extra placeholder pattern.
    pub fn new(config: SyncConfig, block_on_reject: bool) -> Result<Self> {
        let placeholders = PlaceholderDetector::with_patterns(&config.extra_placeholder_patterns)?;
        Ok(Self {
            config,
            block_on_reject,
            placeholders,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn placeholders(&self) -> &PlaceholderDetector {
        &self.placeholders
    }

    /// Diff a document against its shipment.
    pub fn preview(
        &self,
        document_id: DocumentId,
        document: &CanonicalDocument,
        shipment: &Shipment,
    ) -> SyncPreview {
        self.preview_gated(document_id, document, shipment, None)
    }

    /// Diff a document against its shipment, letting a validation report
    /// block auto-sync.
    pub fn preview_gated(
        &self,
        document_id: DocumentId,
        document: &CanonicalDocument,
        shipment: &Shipment,
        gate: Option<&ValidationReport>,
    ) -> SyncPreview {
        let changes: Vec<SyncChange> = document
            .fields
            .iter()
            .filter(|(key, _)| key.is_shipment_attribute())
            .map(|(key, field)| {
                self.change(*key, field.value.clone(), field.confidence, shipment)
            })
            .collect();

        let updating: Vec<&SyncChange> = changes.iter().filter(|c| c.will_update).collect();
        let eligible = !updating.is_empty()
            && updating.iter().all(|c| {
                matches!(c.kind, ChangeKind::Fill | ChangeKind::ReplacePlaceholder)
            });

        let blocked_reason = if !eligible {
            None
        } else if !self.config.auto_apply {
            Some("auto-apply is disabled".to_string())
        } else {
            gate.filter(|r| self.block_on_reject && r.decision == Decision::Reject)
                .map(|r| {
                    format!(
                        "validation rejected the shipment ({} error(s))",
                        r.failure_count(Severity::Error)
                    )
                })
        };

        debug!(
            "Previewed {} changes for {} ({} updating, eligible: {})",
            changes.len(),
            document_id,
            updating.len(),
            eligible
        );

        SyncPreview {
            document_id,
            shipment_id: shipment.id.clone(),
            shipment_version: shipment.version,
            auto_synced: eligible && blocked_reason.is_none(),
            changes,
            blocked_reason,
        }
    }

    fn change(
        &self,
        field: FieldKey,
        new_value: Option<FieldValue>,
        confidence: f32,
        shipment: &Shipment,
    ) -> SyncChange {
        let current_value = shipment.field(field);
        let is_placeholder = current_value
            .as_ref()
            .is_some_and(|v| self.placeholders.is_placeholder(v));
        let locked = shipment.is_confirmed(field);

        let kind = match (&new_value, &current_value) {
            (None, _) => ChangeKind::NoValue,
            (Some(new), Some(current)) if new.same_as(current, field) => ChangeKind::Unchanged,
            (Some(_), None) => ChangeKind::Fill,
            (Some(_), Some(_)) if is_placeholder => ChangeKind::ReplacePlaceholder,
            (Some(_), Some(_)) => ChangeKind::Update,
        };

        let will_update = !locked
            && match kind {
                ChangeKind::Fill | ChangeKind::ReplacePlaceholder => true,
                ChangeKind::Update => confidence >= self.config.auto_sync_threshold,
                ChangeKind::Unchanged | ChangeKind::NoValue => false,
            };

        SyncChange {
            field,
            current_value,
            new_value,
            confidence,
            kind,
            is_placeholder,
            locked,
            will_update,
        }
    }

    /// Decide the outcome of every accepted field against the shipment as
    /// currently stored.
    ///
    /// A field is conflicted when the document no longer yields the value the
    /// operator accepted, or when its stored value moved since the request was
    /// made. Fields already holding the extracted value are unchanged either
    /// way. Explicit acceptance overrides the confidence threshold but never a
    /// confirmation lock.
    pub fn plan_apply(
        &self,
        document: &CanonicalDocument,
        shipment: &Shipment,
        request: &ApplySyncRequest,
    ) -> ApplyPlan {
        let mut plan = ApplyPlan::default();
        for &field in &request.accepted_fields {
            if plan.outcomes.iter().any(|o| o.field == field) {
                continue;
            }
            let before = shipment.field(field);
            let extracted = document.value(field);
            let status = if !field.is_shipment_attribute() || document.field(field).is_none() {
                FieldStatus::NotInDocument
            } else if shipment.is_confirmed(field) {
                FieldStatus::Protected
            } else if request
                .accepted_values
                .get(&field)
                .is_some_and(|accepted| !same_value(accepted.as_ref(), extracted, field))
            {
                FieldStatus::Conflicted
            } else {
                match extracted {
                    None => FieldStatus::NoValue,
                    Some(new) if before.as_ref().is_some_and(|b| new.same_as(b, field)) => {
                        FieldStatus::Unchanged
                    }
                    Some(_) if moved_since(request, shipment, before.as_ref(), field) => {
                        FieldStatus::Conflicted
                    }
                    Some(new) => {
                        plan.updates.insert(field, new.clone());
                        FieldStatus::Written
                    }
                }
            };
            let after = match status {
                FieldStatus::Written => plan.updates.get(&field).cloned(),
                _ => None,
            };
            plan.outcomes.push(FieldOutcome {
                field,
                status,
                before,
                after,
            });
        }
        plan
    }
}

fn same_value(a: Option<&FieldValue>, b: Option<&FieldValue>, field: FieldKey) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.same_as(b, field),
        _ => false,
    }
}

/// Whether the stored value differs from the one the request was made
/// against. Without a pinned value, any newer shipment version counts.
fn moved_since(
    request: &ApplySyncRequest,
    shipment: &Shipment,
    current: Option<&FieldValue>,
    field: FieldKey,
) -> bool {
    match request.baseline.get(&field) {
        Some(seen) => !same_value(seen.as_ref(), current, field),
        None => shipment.version != request.shipment_version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::{DocumentType, ExtractedField, FieldSource};
    use crate::models::report::{RuleCategory, RuleResult};
    use crate::models::shipment::ProductType;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn reconciler() -> SyncReconciler {
        SyncReconciler::new(SyncConfig::default(), true).unwrap()
    }

    fn bol(values: &[(FieldKey, FieldValue, f32)]) -> CanonicalDocument {
        let mut doc = CanonicalDocument::empty(DocumentType::BillOfLading);
        for (key, value, confidence) in values {
            doc.fields.insert(
                *key,
                ExtractedField::new(value.clone(), *confidence, FieldSource::Pattern),
            );
        }
        doc
    }

    fn shipment() -> Shipment {
        let mut shipment = Shipment::new("S-1", ProductType::General);
        shipment.version = 3;
        shipment.container_number = Some("TBD".to_string());
        shipment
    }

    fn request(fields: &[FieldKey]) -> ApplySyncRequest {
        ApplySyncRequest::new(DocumentId::new("D-1"), 3, fields.to_vec(), "user:ana")
    }

    fn reject_report() -> ValidationReport {
        let result = RuleResult {
            rule_id: "PRES-001".to_string(),
            rule_name: "Required documents present".to_string(),
            category: RuleCategory::Presence,
            passed: false,
            severity: Severity::Error,
            message: "missing".to_string(),
            details: Default::default(),
            subject_document_id: None,
        };
        ValidationReport::new(
            shipment().id,
            ProductType::General,
            Utc::now(),
            vec![result],
        )
    }

    #[test]
    fn test_placeholder_replacement_auto_syncs() {
        let doc = bol(&[
            (FieldKey::ContainerNumber, FieldValue::text("MSCU1234566"), 0.95),
            (FieldKey::VesselName, FieldValue::text("RHINE MAERSK"), 0.6),
        ]);
        let preview = reconciler().preview(DocumentId::new("D-1"), &doc, &shipment());

        let container = preview.change(FieldKey::ContainerNumber).unwrap();
        assert_eq!(container.kind, ChangeKind::ReplacePlaceholder);
        assert!(container.is_placeholder);
        assert!(container.will_update);

        let vessel = preview.change(FieldKey::VesselName).unwrap();
        assert_eq!(vessel.kind, ChangeKind::Fill);
        assert!(vessel.will_update);

        assert!(preview.auto_synced);
        assert_eq!(preview.shipment_version, 3);
        assert_eq!(
            preview.proposed_fields(),
            vec![FieldKey::ContainerNumber, FieldKey::VesselName]
        );
    }

    #[test]
    fn test_one_change_per_shipment_attribute() {
        let doc = bol(&[]);
        let preview = reconciler().preview(DocumentId::new("D-1"), &doc, &shipment());
        // issue_date is not a shipment attribute
        assert_eq!(preview.changes.len(), 11);
        assert!(preview.changes.iter().all(|c| c.kind == ChangeKind::NoValue));
        assert!(!preview.auto_synced);
    }

    #[test]
    fn test_update_needs_confidence_and_blocks_auto_sync() {
        let mut current = shipment();
        current.vessel_name = Some("NAVIOS".to_string());
        let low = bol(&[(FieldKey::VesselName, FieldValue::text("RHINE MAERSK"), 0.6)]);
        let preview = reconciler().preview(DocumentId::new("D-1"), &low, &current);
        let vessel = preview.change(FieldKey::VesselName).unwrap();
        assert_eq!(vessel.kind, ChangeKind::Update);
        assert!(!vessel.will_update);

        let high = bol(&[(FieldKey::VesselName, FieldValue::text("RHINE MAERSK"), 0.9)]);
        let preview = reconciler().preview(DocumentId::new("D-1"), &high, &current);
        assert!(preview.change(FieldKey::VesselName).unwrap().will_update);
        assert!(!preview.auto_synced);
        assert_eq!(preview.blocked_reason, None);
    }

    #[test]
    fn test_unchanged_and_locked() {
        let mut current = shipment();
        current.container_number = Some("MSCU 123456 6".to_string());
        current.vessel_name = Some("TBD".to_string());
        current.confirmed_fields.insert(FieldKey::VesselName);
        let doc = bol(&[
            (FieldKey::ContainerNumber, FieldValue::text("MSCU1234566"), 0.95),
            (FieldKey::VesselName, FieldValue::text("RHINE MAERSK"), 0.9),
        ]);
        let preview = reconciler().preview(DocumentId::new("D-1"), &doc, &current);
        assert_eq!(
            preview.change(FieldKey::ContainerNumber).unwrap().kind,
            ChangeKind::Unchanged
        );
        let vessel = preview.change(FieldKey::VesselName).unwrap();
        assert!(vessel.locked);
        assert!(!vessel.will_update);
        assert!(!preview.auto_synced);
    }

    #[test]
    fn test_reject_report_blocks_auto_sync() {
        let doc = bol(&[(FieldKey::ContainerNumber, FieldValue::text("MSCU1234566"), 0.95)]);
        let report = reject_report();
        let preview =
            reconciler().preview_gated(DocumentId::new("D-1"), &doc, &shipment(), Some(&report));
        assert!(!preview.auto_synced);
        assert!(preview.blocked_reason.unwrap().contains("rejected"));

        let lenient = SyncReconciler::new(SyncConfig::default(), false).unwrap();
        let preview =
            lenient.preview_gated(DocumentId::new("D-1"), &doc, &shipment(), Some(&report));
        assert!(preview.auto_synced);
    }

    #[test]
    fn test_auto_apply_disabled() {
        let config = SyncConfig {
            auto_apply: false,
            ..SyncConfig::default()
        };
        let doc = bol(&[(FieldKey::ContainerNumber, FieldValue::text("MSCU1234566"), 0.95)]);
        let preview = SyncReconciler::new(config, true).unwrap().preview(
            DocumentId::new("D-1"),
            &doc,
            &shipment(),
        );
        assert!(!preview.auto_synced);
        assert_eq!(preview.blocked_reason.as_deref(), Some("auto-apply is disabled"));
    }

    #[test]
    fn test_plan_apply_statuses() {
        let mut current = shipment();
        current.vessel_name = Some("NAVIOS".to_string());
        current.shipper = Some("ACME".to_string());
        current.consignee = Some("Nordic Foods".to_string());
        current.confirmed_fields.insert(FieldKey::Shipper);
        let doc = bol(&[
            (FieldKey::ContainerNumber, FieldValue::text("MSCU1234566"), 0.95),
            (FieldKey::VesselName, FieldValue::text("RHINE MAERSK"), 0.6),
            (FieldKey::Shipper, FieldValue::text("OTHER"), 0.9),
            (FieldKey::Consignee, FieldValue::text("NORDIC FOODS"), 0.8),
        ]);
        let accepted = [
            FieldKey::ContainerNumber,
            FieldKey::VesselName,
            FieldKey::Shipper,
            FieldKey::Consignee,
            FieldKey::GrossWeight,
            FieldKey::ExpiryDate,
            FieldKey::ContainerNumber,
        ];
        let plan = reconciler().plan_apply(&doc, &current, &request(&accepted));
        let statuses: Vec<_> = plan.outcomes.iter().map(|o| (o.field, o.status)).collect();
        assert_eq!(
            statuses,
            vec![
                (FieldKey::ContainerNumber, FieldStatus::Written),
                // explicit acceptance overrides the confidence threshold
                (FieldKey::VesselName, FieldStatus::Written),
                (FieldKey::Shipper, FieldStatus::Protected),
                (FieldKey::Consignee, FieldStatus::Unchanged),
                (FieldKey::GrossWeight, FieldStatus::NoValue),
                (FieldKey::ExpiryDate, FieldStatus::NotInDocument),
            ]
        );
        assert_eq!(plan.updates.len(), 2);
        assert_eq!(
            plan.outcomes[0].after,
            Some(FieldValue::text("MSCU1234566"))
        );
    }

    #[test]
    fn test_plan_apply_detects_moved_baseline() {
        let doc = bol(&[(FieldKey::ContainerNumber, FieldValue::text("MSCU1234566"), 0.95)]);
        let mut current = shipment();
        current.container_number = Some("MAEU1234567".to_string());
        let mut pinned = request(&[FieldKey::ContainerNumber]);
        pinned.baseline.insert(FieldKey::ContainerNumber, Some(FieldValue::text("TBD")));
        let plan = reconciler().plan_apply(&doc, &current, &pinned);
        assert_eq!(plan.outcomes[0].status, FieldStatus::Conflicted);
        assert!(!plan.has_updates());

        pinned.baseline.insert(FieldKey::ContainerNumber, None);
        let plan = reconciler().plan_apply(&doc, &current, &pinned);
        assert_eq!(plan.outcomes[0].status, FieldStatus::Conflicted);
    }

    #[test]
    fn test_plan_apply_without_baseline_uses_version() {
        let doc = bol(&[(FieldKey::ContainerNumber, FieldValue::text("MSCU1234566"), 0.95)]);
        let plan = reconciler().plan_apply(&doc, &shipment(), &request(&[FieldKey::ContainerNumber]));
        assert_eq!(plan.outcomes[0].status, FieldStatus::Written);

        let mut moved = shipment();
        moved.version = 4;
        let plan = reconciler().plan_apply(&doc, &moved, &request(&[FieldKey::ContainerNumber]));
        assert_eq!(plan.outcomes[0].status, FieldStatus::Conflicted);

        // a value already in place is unchanged whatever the version
        moved.container_number = Some("MSCU1234566".to_string());
        let plan = reconciler().plan_apply(&doc, &moved, &request(&[FieldKey::ContainerNumber]));
        assert_eq!(plan.outcomes[0].status, FieldStatus::Unchanged);
    }

    #[test]
    fn test_plan_apply_rejects_different_extraction() {
        let doc = bol(&[(FieldKey::VesselName, FieldValue::text("RHINE MAERSK"), 0.9)]);
        let mut accepted = request(&[FieldKey::VesselName]);
        accepted
            .accepted_values
            .insert(FieldKey::VesselName, Some(FieldValue::text("NAVIOS")));
        let plan = reconciler().plan_apply(&doc, &shipment(), &accepted);
        assert_eq!(plan.outcomes[0].status, FieldStatus::Conflicted);
        assert!(!plan.has_updates());

        accepted
            .accepted_values
            .insert(FieldKey::VesselName, Some(FieldValue::text("Rhine Maersk")));
        let plan = reconciler().plan_apply(&doc, &shipment(), &accepted);
        assert_eq!(plan.outcomes[0].status, FieldStatus::Written);
    }

    #[test]
    fn test_into_conflicted() {
        let doc = bol(&[(FieldKey::GrossWeight, FieldValue::Number(Decimal::new(25000, 0)), 0.9)]);
        let plan = reconciler()
            .plan_apply(&doc, &shipment(), &request(&[FieldKey::GrossWeight]))
            .into_conflicted();
        assert_eq!(plan.outcomes[0].status, FieldStatus::Conflicted);
        assert!(plan.updates.is_empty());
    }
}
