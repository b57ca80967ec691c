//! Presence rules: required documents and key fields.

use serde_json::Value;

use crate::error::RuleFault;
use crate::models::document::FieldKey;
use crate::models::report::{RuleCategory, Severity};
use crate::rules::{Rule, RuleOutcome, ValidationContext};

/// PRES-001: every document type required for the product is present.
pub struct RequiredDocumentsRule;

impl Rule for RequiredDocumentsRule {
    fn id(&self) -> &str {
        "PRES-001"
    }

    fn name(&self) -> &str {
        "Required documents present"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Presence
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn evaluate(&self, ctx: &ValidationContext) -> Result<RuleOutcome, RuleFault> {
        let missing: Vec<&str> = ctx
            .product_type()
            .required_documents()
            .into_iter()
            .filter(|t| !ctx.has(*t))
            .map(|t| t.as_str())
            .collect();

        if missing.is_empty() {
            return Ok(RuleOutcome::pass("All required documents are present"));
        }
        Ok(RuleOutcome::fail(format!("Missing required documents: {}", missing.join(", ")))
            .with_detail("missing", missing)
            .with_detail("product_type", ctx.product_type().as_str()))
    }
}

/// PRES-002: the bill of lading yields a container number and a B/L number.
pub struct BolKeyFieldsRule;

impl Rule for BolKeyFieldsRule {
    fn id(&self) -> &str {
        "PRES-002"
    }

    fn name(&self) -> &str {
        "Bill of lading key fields extracted"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Presence
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn evaluate(&self, ctx: &ValidationContext) -> Result<RuleOutcome, RuleFault> {
        let Some(bol) = ctx.bill_of_lading() else {
            return Ok(RuleOutcome::not_evaluated("no bill of lading"));
        };

        let missing: Vec<Value> = [FieldKey::ContainerNumber, FieldKey::BlNumber]
            .into_iter()
            .filter(|k| bol.canonical.value(*k).is_none())
            .map(|k| Value::from(k.as_str()))
            .collect();

        if missing.is_empty() {
            return Ok(RuleOutcome::pass("Container and B/L numbers extracted")
                .with_subject(bol.id.clone()));
        }
        Ok(RuleOutcome::fail("Bill of lading is missing key fields")
            .with_detail("missing_fields", missing)
            .with_subject(bol.id.clone()))
    }
}
