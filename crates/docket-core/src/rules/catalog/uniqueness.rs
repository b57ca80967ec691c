//! UNIQ-001: at most one document per single-instance type.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::error::RuleFault;
use crate::models::document::DocumentType;
use crate::models::report::{RuleCategory, Severity};
use crate::rules::{Rule, RuleOutcome, ValidationContext};

pub struct UniqueDocumentTypeRule;

impl Rule for UniqueDocumentTypeRule {
    fn id(&self) -> &str {
        "UNIQ-001"
    }

    fn name(&self) -> &str {
        "No duplicate documents"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Uniqueness
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn evaluate(&self, ctx: &ValidationContext) -> Result<RuleOutcome, RuleFault> {
        let mut by_type: BTreeMap<DocumentType, Vec<&str>> = BTreeMap::new();
        for doc in &ctx.documents {
            by_type
                .entry(doc.document_type)
                .or_default()
                .push(doc.id.as_str());
        }

        let duplicates: Map<String, Value> = by_type
            .into_iter()
            .filter(|(t, ids)| ids.len() > 1 && !t.allows_multiple())
            .map(|(t, ids)| (t.as_str().to_string(), json!(ids)))
            .collect();

        if duplicates.is_empty() {
            return Ok(RuleOutcome::pass("No duplicate documents"));
        }
        let types: Vec<&str> = duplicates.keys().map(String::as_str).collect();
        Ok(
            RuleOutcome::fail(format!("Duplicate documents of type: {}", types.join(", ")))
                .with_detail("duplicates", duplicates),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::shipment::ProductType;
    use crate::rules::catalog::fixtures::{context, doc};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_duplicate_bill_of_lading_fails() {
        let ctx = context(
            ProductType::General,
            vec![
                doc("D-1", DocumentType::BillOfLading, &[]),
                doc("D-2", DocumentType::BillOfLading, &[]),
            ],
        );
        let outcome = UniqueDocumentTypeRule.evaluate(&ctx).unwrap();
        assert!(!outcome.passed);
        assert_eq!(
            outcome.details["duplicates"]["bill_of_lading"],
            json!(["D-1", "D-2"])
        );
    }

    #[test]
    fn test_multiple_invoices_are_allowed() {
        let ctx = context(
            ProductType::General,
            vec![
                doc("D-1", DocumentType::CommercialInvoice, &[]),
                doc("D-2", DocumentType::CommercialInvoice, &[]),
                doc("D-3", DocumentType::Other, &[]),
                doc("D-4", DocumentType::Other, &[]),
            ],
        );
        assert!(UniqueDocumentTypeRule.evaluate(&ctx).unwrap().passed);
    }
}
