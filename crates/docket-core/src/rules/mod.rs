//! Compliance rules evaluated against a shipment and its documents.

pub mod catalog;
mod context;
mod engine;
mod registry;

pub use context::{ContextDocument, ValidationContext};
pub use engine::RuleEngine;
pub use registry::RuleRegistry;

use serde_json::{Map, Value};

use crate::error::RuleFault;
use crate::models::document::DocumentId;
use crate::models::report::{RuleCategory, Severity};
use crate::models::shipment::ProductType;

/// A single, independent compliance check.
///
/// Rules are stateless: everything they look at comes from the context.
pub trait Rule: Send + Sync {
    /// Stable, unique identifier (e.g. `TOL-001`).
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    fn category(&self) -> RuleCategory;

    /// Severity of a failure.
    fn severity(&self) -> Severity;

    /// Whether the rule runs for shipments of this product type.
    fn applies_to(&self, _product_type: ProductType) -> bool {
        true
    }

    /// Check the context.
    fn evaluate(&self, ctx: &ValidationContext) -> Result<RuleOutcome, RuleFault>;
}

/// What a rule concluded, before the engine attaches identity and severity.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub passed: bool,
    pub message: String,
    pub details: Map<String, Value>,
    pub subject_document_id: Option<DocumentId>,
}

impl RuleOutcome {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Map::new(),
            subject_document_id: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            ..Self::pass(message)
        }
    }

    /// Passing outcome for a rule whose inputs are missing.
    pub fn not_evaluated(reason: impl Into<String>) -> Self {
        Self::pass(format!("Not evaluated: {}", reason.into())).with_detail("evaluated", false)
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn with_subject(mut self, document_id: DocumentId) -> Self {
        self.subject_document_id = Some(document_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_evaluated_passes() {
        let outcome = RuleOutcome::not_evaluated("no bill of lading");
        assert!(outcome.passed);
        assert_eq!(outcome.message, "Not evaluated: no bill of lading");
        assert_eq!(outcome.details["evaluated"], Value::Bool(false));
    }

    #[test]
    fn test_fail_keeps_details() {
        let outcome = RuleOutcome::fail("mismatch")
            .with_detail("expected", "A")
            .with_subject(DocumentId::new("D-1"));
        assert!(!outcome.passed);
        assert_eq!(outcome.details["expected"], Value::from("A"));
        assert_eq!(outcome.subject_document_id, Some(DocumentId::new("D-1")));
    }
}
