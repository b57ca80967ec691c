//! Pattern-based parser producing canonical documents.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::models::document::{CanonicalDocument, DocumentType, ExtractedField, FieldKey};

use super::fields::{
    BlNumberExtractor, CertificateNumberExtractor, ContainerExtractor, DateLabel,
    LabeledDateExtractor, PartyExtractor, PartyRole, PortExtractor, PortRole, TracesExtractor,
    VesselExtractor, VoyageExtractor, WeightExtractor, WeightKind,
};
use super::{ExtractionMatch, FieldExtractor};

/// Share of garbage characters above which text is treated as unreadable.
const MAX_GARBAGE_RATIO: f32 = 0.3;

/// Runs the per-field pattern extractors for a document type.
pub struct PatternParser {
    /// Whether container numbers are scored by their check digit.
    verify_check_digit: bool,
}

impl PatternParser {
    pub fn new() -> Self {
        Self {
            verify_check_digit: true,
        }
    }

    /// Set ISO 6346 check digit verification.
    pub fn with_check_digit_verification(mut self, verify: bool) -> Self {
        self.verify_check_digit = verify;
        self
    }

    /// Parse raw text into the canonical field set of `document_type`.
    ///
    /// Never fails: unreadable input yields a degraded document with every
    /// field missing.
    pub fn parse(&self, text: &str, document_type: DocumentType) -> CanonicalDocument {
        let start = Instant::now();
        let mut doc = CanonicalDocument::empty(document_type);

        info!(
            "Parsing {} from {} characters of text",
            document_type,
            text.len()
        );

        if let Some(reason) = unreadable_reason(text) {
            warn!("Extraction degraded: {}", reason);
            doc.warnings.push(reason);
            doc.degraded = true;
            return doc;
        }

        for key in document_type.field_set() {
            let field = self.extract_field(text, document_type, *key);
            if !field.is_present() {
                doc.warnings.push(format!("Could not extract {}", key));
            }
            doc.fields.insert(*key, field);
        }

        if doc.present_count() == 0 {
            doc.warnings.push("No fields matched".to_string());
            doc.degraded = true;
        }

        debug!(
            "Extracted {}/{} fields from {} in {} ms",
            doc.present_count(),
            doc.fields.len(),
            document_type,
            start.elapsed().as_millis()
        );

        doc
    }

    /// Run the pattern extractor for one field.
    pub fn extract_field(
        &self,
        text: &str,
        document_type: DocumentType,
        key: FieldKey,
    ) -> ExtractedField {
        match key {
            FieldKey::ContainerNumber => {
                let extractor = if self.verify_check_digit {
                    ContainerExtractor::new()
                } else {
                    ContainerExtractor::new().without_check_digit()
                };
                to_field(extractor.extract(text))
            }
            FieldKey::BlNumber => to_field(BlNumberExtractor::new().extract(text)),
            FieldKey::VesselName => to_field(VesselExtractor::new().extract(text)),
            FieldKey::VoyageNumber => to_field(VoyageExtractor::new().extract(text)),
            FieldKey::Shipper => to_field(PartyExtractor::new(PartyRole::Shipper).extract(text)),
            FieldKey::Consignee => {
                to_field(PartyExtractor::new(PartyRole::Consignee).extract(text))
            }
            FieldKey::Issuer => to_field(PartyExtractor::new(PartyRole::Issuer).extract(text)),
            FieldKey::PortOfLoading => {
                to_field(PortExtractor::new(PortRole::Loading).extract(text))
            }
            FieldKey::PortOfDischarge => {
                to_field(PortExtractor::new(PortRole::Discharge).extract(text))
            }
            FieldKey::GrossWeight => {
                to_field(WeightExtractor::new(WeightKind::Gross).extract(text))
            }
            FieldKey::NetWeight => to_field(WeightExtractor::new(WeightKind::Net).extract(text)),
            FieldKey::IssueDate => {
                let labeled = LabeledDateExtractor::new(DateLabel::Issue);
                if document_type.is_certificate() {
                    // Certificates often only carry a signature date
                    let found = labeled.extract(text).or_else(|| {
                        LabeledDateExtractor::new(DateLabel::Certification).extract(text)
                    });
                    to_field(found)
                } else {
                    to_field(labeled.with_unlabeled_fallback().extract(text))
                }
            }
            FieldKey::DepartureDate => {
                to_field(LabeledDateExtractor::new(DateLabel::Departure).extract(text))
            }
            FieldKey::VeterinaryCertDate => {
                to_field(LabeledDateExtractor::new(DateLabel::Certification).extract(text))
            }
            FieldKey::ExpiryDate => {
                to_field(LabeledDateExtractor::new(DateLabel::Expiry).extract(text))
            }
            FieldKey::TracesReference => to_field(TracesExtractor::new().extract(text)),
            FieldKey::CertificateNumber => {
                to_field(CertificateNumberExtractor::new().extract(text))
            }
        }
    }
}

impl Default for PatternParser {
    fn default() -> Self {
        Self::new()
    }
}

fn to_field<T: Into<crate::models::document::FieldValue>>(
    found: Option<ExtractionMatch<T>>,
) -> ExtractedField {
    found
        .map(ExtractionMatch::into_field)
        .unwrap_or_else(ExtractedField::missing)
}

/// Why text cannot be parsed, if it cannot.
pub(super) fn unreadable_reason(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return Some("Document text is empty".to_string());
    }

    let total = text.chars().count();
    let garbage = text
        .chars()
        .filter(|c| *c == '\u{fffd}' || (c.is_control() && !c.is_whitespace()))
        .count();
    let ratio = garbage as f32 / total as f32;
    if ratio > MAX_GARBAGE_RATIO {
        return Some(format!(
            "Document text is unreadable ({:.0}% non-printable characters)",
            ratio * 100.0
        ));
    }
    None
}
