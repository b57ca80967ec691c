//! The compliance pipeline: extraction, validation and shipment sync over
//! the repositories.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::extract::{DocumentExtractor, FallbackStrategy};
use crate::models::config::DocketConfig;
use crate::models::document::{CanonicalDocument, DocumentId};
use crate::models::report::{Severity, ValidationReport};
use crate::models::shipment::{DocumentRecord, ShipmentId};
use crate::models::sync::{ApplySyncRequest, AutoSyncOutcome, FieldStatus, SyncPreview, SyncResult};
use crate::rules::{ContextDocument, RuleEngine, RuleRegistry, ValidationContext};
use crate::store::{AuditEntry, AuditLog, DocumentRepository, ShipmentRepository, WriteOutcome};
use crate::sync::{ApplyPlan, SyncReconciler};

/// Audit actor for validation runs.
pub const VALIDATION_ACTOR: &str = "system:validation";

/// Compare-and-swap attempts per apply before pending fields are reported
/// as conflicted.
const MAX_WRITE_ATTEMPTS: usize = 2;

/// Entry point for the four pipeline operations.
pub struct CompliancePipeline {
    config: DocketConfig,
    documents: Arc<dyn DocumentRepository>,
    shipments: Arc<dyn ShipmentRepository>,
    audit: Arc<dyn AuditLog>,
    extractor: DocumentExtractor,
    engine: RuleEngine,
    reconciler: SyncReconciler,
    locks: Mutex<HashMap<ShipmentId, Arc<Mutex<()>>>>,
}

impl CompliancePipeline {
    /// Build a pipeline with the standard rule catalog and no AI fallback.
    pub fn new(
        config: DocketConfig,
        documents: Arc<dyn DocumentRepository>,
        shipments: Arc<dyn ShipmentRepository>,
        audit: Arc<dyn AuditLog>,
    ) -> Result<Self> {
        config.validate()?;
        let extractor = DocumentExtractor::new(config.extraction.clone());
        let engine = RuleEngine::new(Arc::new(RuleRegistry::standard(&config.validation)?));
        let reconciler = SyncReconciler::new(
            config.sync.clone(),
            config.validation.block_auto_sync_on_reject,
        )?;
        Ok(Self {
            config,
            documents,
            shipments,
            audit,
            extractor,
            engine,
            reconciler,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Build a pipeline over one store serving every repository.
    pub fn from_store<S>(config: DocketConfig, store: Arc<S>) -> Result<Self>
    where
        S: DocumentRepository + ShipmentRepository + AuditLog + 'static,
    {
        Self::new(config, store.clone(), store.clone(), store)
    }

    /// Use a custom rule registry.
    pub fn with_registry(mut self, registry: Arc<RuleRegistry>) -> Self {
        self.engine = RuleEngine::new(registry);
        self
    }

    /// Consult an AI fallback for low-confidence fields.
    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackStrategy>) -> Self {
        self.extractor = DocumentExtractor::new(self.config.extraction.clone()).with_fallback(fallback);
        self
    }

    pub fn config(&self) -> &DocketConfig {
        &self.config
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    /// Extract the canonical fields of a stored document.
    pub async fn extract(&self, document_id: &DocumentId) -> Result<CanonicalDocument> {
        let record = self.documents.get_document(document_id).await?;
        Ok(self.extract_record(&record).await)
    }

    async fn extract_record(&self, record: &DocumentRecord) -> CanonicalDocument {
        self.extractor
            .extract(&record.raw_text, record.document_type)
            .await
    }

    /// Evaluate the shipment and all of its documents against the rules
    /// that apply to its product type.
    pub async fn validate(&self, shipment_id: &ShipmentId) -> Result<ValidationReport> {
        info!("Validating shipment {}", shipment_id);
        let shipment = self.shipments.get_shipment(shipment_id).await?;
        let records = self.documents.documents_for_shipment(shipment_id).await?;

        let canonicals = join_all(records.iter().map(|r| self.extract_record(r))).await;
        let documents: Vec<ContextDocument> = records
            .into_iter()
            .zip(canonicals)
            .map(|(record, canonical)| {
                ContextDocument::new(record.id, record.document_type, canonical)
            })
            .collect();
        let document_count = documents.len();

        let ctx = ValidationContext::new(shipment, documents);
        let report = self.engine.evaluate(&ctx);

        let entry = AuditEntry::new(VALIDATION_ACTOR, "shipment.validated", shipment_id.as_str())
            .with_change(
                serde_json::Value::Null,
                json!({
                    "decision": report.decision,
                    "rules": report.results.len(),
                    "errors": report.failure_count(Severity::Error),
                    "warnings": report.failure_count(Severity::Warning),
                    "faults": report.failure_count(Severity::Info),
                }),
            )
            .with_context(json!({
                "product_type": report.product_type,
                "documents": document_count,
            }));
        self.audit.record(entry).await?;

        info!("Shipment {} validated: {}", shipment_id, report.decision);
        Ok(report)
    }

    /// Diff a document's extraction against its shipment without writing.
    pub async fn preview_sync(&self, document_id: &DocumentId) -> Result<SyncPreview> {
        self.preview_gated(document_id, None).await.map(|(preview, _, _)| preview)
    }

    async fn preview_gated(
        &self,
        document_id: &DocumentId,
        gate: Option<&ValidationReport>,
    ) -> Result<(SyncPreview, DocumentRecord, CanonicalDocument)> {
        let record = self.documents.get_document(document_id).await?;
        let canonical = self.extract_record(&record).await;
        let shipment = self.shipments.get_shipment(&record.shipment_id).await?;
        let preview =
            self.reconciler
                .preview_gated(record.id.clone(), &canonical, &shipment, gate);
        Ok((preview, record, canonical))
    }

    /// Write operator-accepted fields to the shipment.
    ///
    /// The document is re-extracted; every accepted field gets exactly one
    /// outcome. Written fields are audited in the same unit as the write.
    pub async fn apply_sync(&self, request: &ApplySyncRequest) -> Result<SyncResult> {
        let record = self.documents.get_document(&request.document_id).await?;
        let canonical = self.extract_record(&record).await;
        self.apply_extracted(request, &record, &canonical).await
    }

    /// Apply a document's sync automatically when every proposed change only
    /// fills blanks or replaces placeholders.
    pub async fn auto_sync(
        &self,
        document_id: &DocumentId,
        gate: Option<&ValidationReport>,
    ) -> Result<AutoSyncOutcome> {
        let (preview, record, canonical) = self.preview_gated(document_id, gate).await?;
        if !preview.auto_synced {
            debug!(
                "Auto-sync skipped for {}: {}",
                document_id,
                preview.blocked_reason.as_deref().unwrap_or("changes need review")
            );
            return Ok(AutoSyncOutcome {
                preview,
                result: None,
            });
        }

        let request = ApplySyncRequest::from_preview(
            &preview,
            preview.proposed_fields(),
            self.config.sync.auto_sync_actor.clone(),
        );
        let result = self.apply_extracted(&request, &record, &canonical).await?;
        Ok(AutoSyncOutcome {
            preview,
            result: Some(result),
        })
    }

    async fn apply_extracted(
        &self,
        request: &ApplySyncRequest,
        record: &DocumentRecord,
        canonical: &CanonicalDocument,
    ) -> Result<SyncResult> {
        let lock = self.shipment_lock(&record.shipment_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.apply_locked(request, record, canonical).await
        };
        self.release_lock(&record.shipment_id, lock).await;
        result
    }

    async fn apply_locked(
        &self,
        request: &ApplySyncRequest,
        record: &DocumentRecord,
        canonical: &CanonicalDocument,
    ) -> Result<SyncResult> {
        let shipment_id = &record.shipment_id;
        let mut request = request.clone();

        let mut attempt = 0;
        loop {
            attempt += 1;
            let shipment = self.shipments.get_shipment(shipment_id).await?;
            if attempt == 1 {
                request.pin_baseline(&shipment);
            }
            let plan = self.reconciler.plan_apply(canonical, &shipment, &request);
            if !plan.has_updates() {
                return Ok(sync_result(record, plan, shipment.version));
            }

            let entries = sync_audit_entries(&request, record, &plan, shipment.version + 1);
            match self
                .shipments
                .write_fields(shipment_id, shipment.version, &plan.updates, &entries)
                .await?
            {
                WriteOutcome::Written { version } => {
                    info!(
                        "Synced {} field(s) from {} into {} (version {})",
                        plan.updates.len(),
                        record.id,
                        shipment_id,
                        version
                    );
                    return Ok(sync_result(record, plan, version));
                }
                WriteOutcome::VersionConflict { current_version } => {
                    if attempt >= MAX_WRITE_ATTEMPTS {
                        warn!(
                            "Shipment {} kept changing (version {}), reporting {} field(s) as conflicted",
                            shipment_id,
                            current_version,
                            plan.updates.len()
                        );
                        return Ok(sync_result(record, plan.into_conflicted(), current_version));
                    }
                    debug!(
                        "Version conflict on {} (now {}), re-planning",
                        shipment_id, current_version
                    );
                }
            }
        }
    }

    async fn shipment_lock(&self, shipment_id: &ShipmentId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(shipment_id.clone()).or_default())
    }

    /// Drop the map entry once no other apply holds or awaits the lock.
    async fn release_lock(&self, shipment_id: &ShipmentId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        drop(lock);
        if locks
            .get(shipment_id)
            .is_some_and(|held| Arc::strong_count(held) == 1)
        {
            locks.remove(shipment_id);
        }
    }
}

/// One `shipment.field_synced` entry per written field.
fn sync_audit_entries(
    request: &ApplySyncRequest,
    record: &DocumentRecord,
    plan: &ApplyPlan,
    version: u64,
) -> Vec<AuditEntry> {
    plan.outcomes
        .iter()
        .filter(|o| o.status == FieldStatus::Written)
        .map(|outcome| {
            let field = outcome.field.as_str();
            AuditEntry::new(
                request.actor.as_str(),
                "shipment.field_synced",
                record.shipment_id.as_str(),
            )
            .with_change(json!({ field: outcome.before }), json!({ field: outcome.after }))
            .with_context(json!({
                "document_id": record.id,
                "document_type": record.document_type,
                "field": field,
                "shipment_version": version,
            }))
        })
        .collect()
}

fn sync_result(record: &DocumentRecord, plan: ApplyPlan, version: u64) -> SyncResult {
    SyncResult {
        document_id: record.id.clone(),
        shipment_id: record.shipment_id.clone(),
        outcomes: plan.outcomes,
        shipment_version: version,
    }
}
