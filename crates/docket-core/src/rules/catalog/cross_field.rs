//! Cross-field rules: values that must agree between documents.

use serde_json::{json, Value};

use crate::error::RuleFault;
use crate::models::document::{normalize_identifier, DocumentType, FieldKey, FieldValue};
use crate::models::report::{RuleCategory, Severity};
use crate::rules::{Rule, RuleOutcome, ValidationContext};
use crate::sync::PlaceholderDetector;

use super::decimal_json;

/// XF-001: BoL container number equals the shipment's container number.
pub struct ContainerMatchesShipmentRule {
    placeholders: PlaceholderDetector,
}

impl ContainerMatchesShipmentRule {
    pub fn new() -> Self {
        Self {
            placeholders: PlaceholderDetector::new(),
        }
    }

    pub fn with_detector(placeholders: PlaceholderDetector) -> Self {
        Self { placeholders }
    }
}

impl Default for ContainerMatchesShipmentRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ContainerMatchesShipmentRule {
    fn id(&self) -> &str {
        "XF-001"
    }

    fn name(&self) -> &str {
        "Container matches shipment"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::CrossField
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn evaluate(&self, ctx: &ValidationContext) -> Result<RuleOutcome, RuleFault> {
        let Some(bol) = ctx.bill_of_lading() else {
            return Ok(RuleOutcome::not_evaluated("no bill of lading"));
        };
        let Some(extracted) = bol.canonical.value(FieldKey::ContainerNumber) else {
            return Ok(RuleOutcome::not_evaluated("no container number on bill of lading"));
        };
        let Some(recorded) = ctx.shipment.field(FieldKey::ContainerNumber) else {
            return Ok(RuleOutcome::not_evaluated("no container number on shipment"));
        };
        if self.placeholders.is_placeholder(&recorded) {
            return Ok(RuleOutcome::not_evaluated(
                "shipment container number is a placeholder",
            ));
        }
        let extracted_text = expect_text(extracted, FieldKey::ContainerNumber)?;

        let outcome = if extracted.same_as(&recorded, FieldKey::ContainerNumber) {
            RuleOutcome::pass("Container number matches shipment")
        } else {
            RuleOutcome::fail(format!(
                "Bill of lading container {} differs from shipment container {}",
                extracted_text, recorded
            ))
        };
        Ok(outcome
            .with_detail("bill_of_lading", extracted_text)
            .with_detail("shipment", recorded.to_string())
            .with_subject(bol.id.clone()))
    }
}

/// XF-002: container numbers on the other documents agree with the BoL.
pub struct ContainerConsistencyRule;

impl Rule for ContainerConsistencyRule {
    fn id(&self) -> &str {
        "XF-002"
    }

    fn name(&self) -> &str {
        "Container consistent across documents"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::CrossField
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn evaluate(&self, ctx: &ValidationContext) -> Result<RuleOutcome, RuleFault> {
        let Some(bol) = ctx.bill_of_lading() else {
            return Ok(RuleOutcome::not_evaluated("no bill of lading"));
        };
        let Some(reference) = bol.canonical.value(FieldKey::ContainerNumber) else {
            return Ok(RuleOutcome::not_evaluated("no container number on bill of lading"));
        };
        let reference_text = expect_text(reference, FieldKey::ContainerNumber)?;

        let mut mismatches = Vec::new();
        let mut first_mismatch = None;
        for doc in ctx.documents.iter().filter(|d| d.id != bol.id) {
            let Some(value) = doc.canonical.value(FieldKey::ContainerNumber) else {
                continue;
            };
            if !value.same_as(reference, FieldKey::ContainerNumber) {
                mismatches.push(json!({
                    "document_id": doc.id.as_str(),
                    "document_type": doc.document_type.as_str(),
                    "container_number": value.to_string(),
                }));
                first_mismatch.get_or_insert_with(|| doc.id.clone());
            }
        }

        match first_mismatch {
            None => Ok(RuleOutcome::pass("Container numbers agree across documents")
                .with_detail("bill_of_lading", reference_text)),
            Some(subject) => Ok(RuleOutcome::fail(format!(
                "{} document(s) carry a container number other than {}",
                mismatches.len(),
                reference_text
            ))
            .with_detail("bill_of_lading", reference_text)
            .with_detail("mismatches", mismatches)
            .with_subject(subject)),
        }
    }
}

/// XF-003: consignee on the BoL and the commercial invoice agree.
pub struct ConsigneeMatchRule;

impl Rule for ConsigneeMatchRule {
    fn id(&self) -> &str {
        "XF-003"
    }

    fn name(&self) -> &str {
        "Consignee consistent"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::CrossField
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn evaluate(&self, ctx: &ValidationContext) -> Result<RuleOutcome, RuleFault> {
        let Some(bol) = ctx.bill_of_lading() else {
            return Ok(RuleOutcome::not_evaluated("no bill of lading"));
        };
        let Some(bol_consignee) = bol.canonical.value(FieldKey::Consignee) else {
            return Ok(RuleOutcome::not_evaluated("no consignee on bill of lading"));
        };
        let bol_consignee = expect_text(bol_consignee, FieldKey::Consignee)?;

        let invoices: Vec<_> = ctx
            .documents_of(DocumentType::CommercialInvoice)
            .filter_map(|d| d.canonical.text(FieldKey::Consignee).map(|c| (d, c)))
            .collect();
        if invoices.is_empty() {
            return Ok(RuleOutcome::not_evaluated("no consignee on commercial invoice"));
        }

        let expected = normalize_identifier(bol_consignee);
        let mismatch = invoices
            .iter()
            .find(|(_, consignee)| normalize_identifier(consignee) != expected);

        match mismatch {
            None => Ok(RuleOutcome::pass("Consignee matches between bill of lading and invoice")
                .with_detail("bill_of_lading", bol_consignee)),
            Some((invoice, consignee)) => Ok(RuleOutcome::fail(format!(
                "Invoice consignee '{}' differs from bill of lading consignee '{}'",
                consignee, bol_consignee
            ))
            .with_detail("bill_of_lading", bol_consignee)
            .with_detail("commercial_invoice", *consignee)
            .with_subject(invoice.id.clone())),
        }
    }
}

/// XF-004: net weight does not exceed gross weight on any document.
pub struct NetNotAboveGrossRule;

impl Rule for NetNotAboveGrossRule {
    fn id(&self) -> &str {
        "XF-004"
    }

    fn name(&self) -> &str {
        "Net weight not above gross weight"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::CrossField
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn evaluate(&self, ctx: &ValidationContext) -> Result<RuleOutcome, RuleFault> {
        let mut checked = 0;
        let mut violations: Vec<Value> = Vec::new();
        let mut subject = None;

        for doc in &ctx.documents {
            let (Some(net), Some(gross)) = (
                doc.canonical.number(FieldKey::NetWeight),
                doc.canonical.number(FieldKey::GrossWeight),
            ) else {
                continue;
            };
            checked += 1;
            if net > gross {
                violations.push(json!({
                    "document_id": doc.id.as_str(),
                    "net_weight": decimal_json(net),
                    "gross_weight": decimal_json(gross),
                }));
                subject.get_or_insert_with(|| doc.id.clone());
            }
        }

        if checked == 0 {
            return Ok(RuleOutcome::not_evaluated("no document carries both weights"));
        }
        match subject {
            None => Ok(RuleOutcome::pass(format!(
                "Net weight within gross weight on {} document(s)",
                checked
            ))),
            Some(subject) => Ok(RuleOutcome::fail(format!(
                "Net weight exceeds gross weight on {} document(s)",
                violations.len()
            ))
            .with_detail("violations", violations)
            .with_subject(subject)),
        }
    }
}

fn expect_text(value: &FieldValue, key: FieldKey) -> Result<&str, RuleFault> {
    value.as_text().ok_or_else(|| RuleFault::Uninterpretable {
        field: key.as_str().to_string(),
        reason: format!("expected text, got {}", value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::shipment::ProductType;
    use crate::rules::catalog::fixtures::{context, doc};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn bol_with_container(container: &str) -> crate::rules::ContextDocument {
        doc(
            "BOL",
            DocumentType::BillOfLading,
            &[(FieldKey::ContainerNumber, FieldValue::text(container))],
        )
    }

    #[test]
    fn test_container_matches_shipment() {
        let mut ctx = context(ProductType::General, vec![bol_with_container("MSCU1234566")]);
        ctx.shipment.container_number = Some("MSCU 123456-6".to_string());
        assert!(ContainerMatchesShipmentRule::new().evaluate(&ctx).unwrap().passed);

        ctx.shipment.container_number = Some("MAEU1234567".to_string());
        let outcome = ContainerMatchesShipmentRule::new().evaluate(&ctx).unwrap();
        assert!(!outcome.passed);
        assert_eq!(outcome.subject_document_id.unwrap().as_str(), "BOL");
    }

    #[test]
    fn test_container_rule_skips_placeholder() {
        let mut ctx = context(ProductType::General, vec![bol_with_container("MSCU1234566")]);
        ctx.shipment.container_number = Some("TBD".to_string());
        let outcome = ContainerMatchesShipmentRule::new().evaluate(&ctx).unwrap();
        assert!(outcome.passed);
        assert_eq!(outcome.details["evaluated"], Value::Bool(false));
    }

    #[test]
    fn test_container_consistency() {
        let ctx = context(
            ProductType::General,
            vec![
                bol_with_container("MSCU1234566"),
                doc(
                    "PL",
                    DocumentType::PackingList,
                    &[(FieldKey::ContainerNumber, FieldValue::text("MAEU1234567"))],
                ),
                doc(
                    "CI",
                    DocumentType::CommercialInvoice,
                    &[(FieldKey::ContainerNumber, FieldValue::text("mscu1234566"))],
                ),
            ],
        );
        let outcome = ContainerConsistencyRule.evaluate(&ctx).unwrap();
        assert!(!outcome.passed);
        assert_eq!(outcome.subject_document_id.unwrap().as_str(), "PL");
        assert_eq!(outcome.details["mismatches"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_consignee_match_ignores_case_and_punctuation() {
        let ctx = context(
            ProductType::General,
            vec![
                doc(
                    "BOL",
                    DocumentType::BillOfLading,
                    &[(FieldKey::Consignee, FieldValue::text("Nordic Foods GmbH"))],
                ),
                doc(
                    "CI",
                    DocumentType::CommercialInvoice,
                    &[(FieldKey::Consignee, FieldValue::text("NORDIC FOODS G.M.B.H."))],
                ),
            ],
        );
        assert!(ConsigneeMatchRule.evaluate(&ctx).unwrap().passed);
    }

    #[test]
    fn test_consignee_mismatch() {
        let ctx = context(
            ProductType::General,
            vec![
                doc(
                    "BOL",
                    DocumentType::BillOfLading,
                    &[(FieldKey::Consignee, FieldValue::text("Nordic Foods GmbH"))],
                ),
                doc(
                    "CI",
                    DocumentType::CommercialInvoice,
                    &[(FieldKey::Consignee, FieldValue::text("Baltic Trading AB"))],
                ),
            ],
        );
        let outcome = ConsigneeMatchRule.evaluate(&ctx).unwrap();
        assert!(!outcome.passed);
        assert_eq!(outcome.details["commercial_invoice"], "Baltic Trading AB");
    }

    #[test]
    fn test_net_above_gross() {
        let ctx = context(
            ProductType::General,
            vec![doc(
                "PL",
                DocumentType::PackingList,
                &[
                    (FieldKey::NetWeight, FieldValue::Number(Decimal::new(21000, 0))),
                    (FieldKey::GrossWeight, FieldValue::Number(Decimal::new(20000, 0))),
                ],
            )],
        );
        let outcome = NetNotAboveGrossRule.evaluate(&ctx).unwrap();
        assert!(!outcome.passed);
        assert_eq!(outcome.details["violations"][0]["net_weight"], "21000");

        let empty = context(ProductType::General, Vec::new());
        assert!(NetNotAboveGrossRule.evaluate(&empty).unwrap().passed);
    }

    #[test]
    fn test_non_text_container_is_a_fault() {
        let ctx = context(
            ProductType::General,
            vec![doc(
                "BOL",
                DocumentType::BillOfLading,
                &[(FieldKey::ContainerNumber, FieldValue::Number(Decimal::ONE))],
            )],
        );
        assert!(matches!(
            ContainerConsistencyRule.evaluate(&ctx),
            Err(RuleFault::Uninterpretable { .. })
        ));
    }
}
