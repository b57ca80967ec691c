//! Product-specific rules for animal-origin goods and plants.

use serde_json::json;

use crate::error::RuleFault;
use crate::models::document::{DocumentType, FieldKey};
use crate::models::report::{RuleCategory, Severity};
use crate::models::shipment::ProductType;
use crate::rules::{Rule, RuleOutcome, ValidationContext};

/// PROD-001: animal-origin shipments carry a TRACES reference.
pub struct TracesReferenceRule;

impl Rule for TracesReferenceRule {
    fn id(&self) -> &str {
        "PROD-001"
    }

    fn name(&self) -> &str {
        "TRACES reference recorded"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::ProductSpecific
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn applies_to(&self, product_type: ProductType) -> bool {
        product_type.is_animal_origin()
    }

    fn evaluate(&self, ctx: &ValidationContext) -> Result<RuleOutcome, RuleFault> {
        if let Some(reference) = ctx
            .shipment
            .traces_reference
            .as_deref()
            .filter(|r| !r.trim().is_empty())
        {
            return Ok(RuleOutcome::pass("TRACES reference recorded on shipment")
                .with_detail("traces_reference", reference)
                .with_detail("source", "shipment"));
        }

        let from_certificate = ctx
            .documents_of(DocumentType::VeterinaryCertificate)
            .find_map(|d| d.canonical.text(FieldKey::TracesReference).map(|r| (d, r)));
        match from_certificate {
            Some((cert, reference)) => Ok(RuleOutcome::pass(
                "TRACES reference found on veterinary certificate",
            )
            .with_detail("traces_reference", reference)
            .with_detail("source", "veterinary_certificate")
            .with_subject(cert.id.clone())),
            None => Ok(RuleOutcome::fail(format!(
                "No TRACES reference for {} shipment",
                ctx.product_type()
            ))),
        }
    }
}

/// PROD-002: the veterinary certificate predates departure.
pub struct VetCertBeforeDepartureRule;

impl Rule for VetCertBeforeDepartureRule {
    fn id(&self) -> &str {
        "PROD-002"
    }

    fn name(&self) -> &str {
        "Veterinary certificate issued before departure"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::ProductSpecific
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn applies_to(&self, product_type: ProductType) -> bool {
        product_type.is_animal_origin()
    }

    fn evaluate(&self, ctx: &ValidationContext) -> Result<RuleOutcome, RuleFault> {
        let Some((cert, cert_date)) = ctx
            .documents_of(DocumentType::VeterinaryCertificate)
            .find_map(|d| d.canonical.date(FieldKey::VeterinaryCertDate).map(|v| (d, v)))
        else {
            return Ok(RuleOutcome::not_evaluated("no veterinary certificate date"));
        };
        let Some(departure) = ctx.departure_date() else {
            return Ok(RuleOutcome::not_evaluated("no departure date"));
        };

        let outcome = if cert_date <= departure {
            RuleOutcome::pass("Veterinary certificate issued before departure")
        } else {
            RuleOutcome::fail(format!(
                "Veterinary certificate dated {} is later than departure on {}",
                cert_date, departure
            ))
        };
        Ok(outcome
            .with_detail("veterinary_cert_date", cert_date.to_string())
            .with_detail("departure_date", departure.to_string())
            .with_subject(cert.id.clone()))
    }
}

/// PROD-003: no certificate expires before departure.
pub struct CertificateExpiryRule;

impl Rule for CertificateExpiryRule {
    fn id(&self) -> &str {
        "PROD-003"
    }

    fn name(&self) -> &str {
        "Certificates valid at departure"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::ProductSpecific
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn applies_to(&self, product_type: ProductType) -> bool {
        product_type.is_animal_origin() || product_type == ProductType::Plants
    }

    fn evaluate(&self, ctx: &ValidationContext) -> Result<RuleOutcome, RuleFault> {
        let Some(departure) = ctx.departure_date() else {
            return Ok(RuleOutcome::not_evaluated("no departure date"));
        };

        let dated: Vec<_> = ctx
            .documents
            .iter()
            .filter(|d| d.document_type.is_certificate())
            .filter_map(|d| d.canonical.date(FieldKey::ExpiryDate).map(|e| (d, e)))
            .collect();
        if dated.is_empty() {
            return Ok(RuleOutcome::not_evaluated("no certificate expiry date"));
        }

        let expired: Vec<_> = dated.iter().filter(|(_, expiry)| *expiry < departure).collect();
        let Some((first, _)) = expired.first() else {
            return Ok(RuleOutcome::pass(format!(
                "{} certificate(s) valid at departure",
                dated.len()
            ))
            .with_detail("departure_date", departure.to_string()));
        };

        let listed: Vec<_> = expired
            .iter()
            .map(|(d, expiry)| {
                json!({
                    "document_id": d.id.as_str(),
                    "document_type": d.document_type.as_str(),
                    "expiry_date": expiry.to_string(),
                })
            })
            .collect();
        Ok(RuleOutcome::fail(format!(
            "{} certificate(s) expire before departure on {}",
            listed.len(),
            departure
        ))
        .with_detail("departure_date", departure.to_string())
        .with_detail("expired", listed)
        .with_subject(first.id.clone()))
    }
}
