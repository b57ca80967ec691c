//! Keyword-based document type detection for files without a declared type.

use serde::Serialize;

use crate::models::document::DocumentType;

/// Keywords per document type with their weights.
const KEYWORDS: &[(DocumentType, &[(&str, u32)])] = &[
    (
        DocumentType::BillOfLading,
        &[
            ("bill of lading", 5),
            ("b/l no", 4),
            ("shipped on board", 3),
            ("port of loading", 2),
            ("port of discharge", 2),
            ("notify party", 2),
            ("freight", 1),
            ("vessel", 1),
        ],
    ),
    (
        DocumentType::CommercialInvoice,
        &[
            ("commercial invoice", 5),
            ("invoice no", 3),
            ("invoice date", 3),
            ("unit price", 2),
            ("incoterms", 2),
            ("total amount", 2),
            ("invoice", 1),
        ],
    ),
    (
        DocumentType::PackingList,
        &[
            ("packing list", 5),
            ("packing date", 2),
            ("cartons", 2),
            ("packages", 1),
            ("net weight", 1),
            ("gross weight", 1),
        ],
    ),
    (
        DocumentType::VeterinaryCertificate,
        &[
            ("veterinary", 5),
            ("health certificate", 4),
            ("official veterinarian", 4),
            ("traces", 3),
            ("ched", 3),
            ("animal", 1),
        ],
    ),
    (
        DocumentType::PhytosanitaryCertificate,
        &[
            ("phytosanitary", 6),
            ("plant protection", 4),
            ("plants", 1),
            ("pests", 2),
        ],
    ),
    (
        DocumentType::CertificateOfOrigin,
        &[
            ("certificate of origin", 6),
            ("country of origin", 2),
            ("chamber of commerce", 3),
        ],
    ),
];

/// Minimum score for a type to be assigned.
const MIN_SCORE: u32 = 3;

/// Outcome of document classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub document_type: DocumentType,
    pub score: u32,
}

/// Guess the document type from its text; `Other` when nothing stands out.
pub fn classify(text: &str) -> Classification {
    let lower = text.to_lowercase();

    let mut best = Classification {
        document_type: DocumentType::Other,
        score: 0,
    };
    for (document_type, keywords) in KEYWORDS {
        let score: u32 = keywords
            .iter()
            .filter(|(keyword, _)| lower.contains(keyword))
            .map(|(_, weight)| weight)
            .sum();
        if score > best.score {
            best = Classification {
                document_type: *document_type,
                score,
            };
        }
    }

    if best.score < MIN_SCORE {
        best.document_type = DocumentType::Other;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_bill_of_lading() {
        let text = "BILL OF LADING\nB/L No: MEDU1234\nPort of Loading: Santos";
        assert_eq!(classify(text).document_type, DocumentType::BillOfLading);
    }

    #[test]
    fn test_classify_certificates() {
        assert_eq!(
            classify("VETERINARY HEALTH CERTIFICATE for export of meat").document_type,
            DocumentType::VeterinaryCertificate
        );
        assert_eq!(
            classify("Phytosanitary Certificate - Plant Protection Organization").document_type,
            DocumentType::PhytosanitaryCertificate
        );
    }

    #[test]
    fn test_classify_packing_list_over_invoice_mentions() {
        let text = "PACKING LIST\nRef invoice 4411\n120 cartons";
        assert_eq!(classify(text).document_type, DocumentType::PackingList);
    }

    #[test]
    fn test_unknown_text_is_other() {
        let result = classify("Dear customer, thank you");
        assert_eq!(result.document_type, DocumentType::Other);
    }
}
