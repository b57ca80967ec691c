//! Core library for shipping document compliance.
//!
//! This crate provides:
//! - Field extraction from shipping document text (container numbers, B/L
//!   numbers, vessel/voyage, parties, ports, weights, dates, TRACES references)
//! - A pluggable, severity-tiered rule engine producing validation reports
//! - Placeholder-aware reconciliation of extracted fields into shipment records
//! - A pipeline service wiring the above to document, shipment and audit
//!   repositories

pub mod error;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod rules;
pub mod store;
pub mod sync;

pub use error::{DocketError, FallbackError, Result, RuleFault};
pub use extract::{classify, DocumentExtractor, FallbackStrategy, PatternParser};
pub use models::config::DocketConfig;
pub use models::document::{
    CanonicalDocument, DocumentId, DocumentType, ExtractedField, FieldKey, FieldSource, FieldValue,
};
pub use models::report::{Decision, RuleResult, Severity, ValidationReport};
pub use models::shipment::{DocumentRecord, ProductType, Shipment, ShipmentId};
pub use models::sync::{ApplySyncRequest, AutoSyncOutcome, SyncPreview, SyncResult};
pub use pipeline::CompliancePipeline;
pub use rules::{Rule, RuleEngine, RuleRegistry, ValidationContext};
pub use store::{AuditEntry, InMemoryStore, StoreSnapshot};
pub use sync::{PlaceholderDetector, SyncReconciler};
