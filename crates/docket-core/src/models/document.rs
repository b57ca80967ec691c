//! Extracted document data: field keys, values, and canonical documents.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier of an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identifier of a canonical field.
///
/// The snake_case names are shared by canonical documents, sync changes and
/// shipment attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    ContainerNumber,
    BlNumber,
    VesselName,
    VoyageNumber,
    Shipper,
    Consignee,
    PortOfLoading,
    PortOfDischarge,
    GrossWeight,
    NetWeight,
    IssueDate,
    DepartureDate,
    TracesReference,
    VeterinaryCertDate,
    CertificateNumber,
    Issuer,
    ExpiryDate,
}

impl FieldKey {
    /// All keys in declaration order.
    pub const ALL: [FieldKey; 17] = [
        FieldKey::ContainerNumber,
        FieldKey::BlNumber,
        FieldKey::VesselName,
        FieldKey::VoyageNumber,
        FieldKey::Shipper,
        FieldKey::Consignee,
        FieldKey::PortOfLoading,
        FieldKey::PortOfDischarge,
        FieldKey::GrossWeight,
        FieldKey::NetWeight,
        FieldKey::IssueDate,
        FieldKey::DepartureDate,
        FieldKey::TracesReference,
        FieldKey::VeterinaryCertDate,
        FieldKey::CertificateNumber,
        FieldKey::Issuer,
        FieldKey::ExpiryDate,
    ];

    /// The stable string name of this key.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::ContainerNumber => "container_number",
            FieldKey::BlNumber => "bl_number",
            FieldKey::VesselName => "vessel_name",
            FieldKey::VoyageNumber => "voyage_number",
            FieldKey::Shipper => "shipper",
            FieldKey::Consignee => "consignee",
            FieldKey::PortOfLoading => "port_of_loading",
            FieldKey::PortOfDischarge => "port_of_discharge",
            FieldKey::GrossWeight => "gross_weight",
            FieldKey::NetWeight => "net_weight",
            FieldKey::IssueDate => "issue_date",
            FieldKey::DepartureDate => "departure_date",
            FieldKey::TracesReference => "traces_reference",
            FieldKey::VeterinaryCertDate => "veterinary_cert_date",
            FieldKey::CertificateNumber => "certificate_number",
            FieldKey::Issuer => "issuer",
            FieldKey::ExpiryDate => "expiry_date",
        }
    }

    /// Parse a key from its stable name.
    pub fn from_str(s: &str) -> Option<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|k| k.as_str() == wanted)
    }

    /// Whether the shipment record carries an attribute of the same name.
    pub fn is_shipment_attribute(&self) -> bool {
        matches!(
            self,
            FieldKey::ContainerNumber
                | FieldKey::BlNumber
                | FieldKey::VesselName
                | FieldKey::VoyageNumber
                | FieldKey::Shipper
                | FieldKey::Consignee
                | FieldKey::PortOfLoading
                | FieldKey::PortOfDischarge
                | FieldKey::GrossWeight
                | FieldKey::NetWeight
                | FieldKey::DepartureDate
                | FieldKey::TracesReference
        )
    }

    /// Identifier-like fields compare without separators.
    pub fn is_identifier(&self) -> bool {
        matches!(
            self,
            FieldKey::ContainerNumber
                | FieldKey::BlNumber
                | FieldKey::VoyageNumber
                | FieldKey::TracesReference
                | FieldKey::CertificateNumber
        )
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    /// Decimal quantity; weights are kilograms.
    Number(Decimal),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Equality after normalization.
    ///
    /// Text compares case-insensitively with whitespace collapsed; identifiers
    /// additionally ignore separators. Numbers compare by value, so
    /// `25000` equals `25000.00`.
    pub fn same_as(&self, other: &FieldValue, key: FieldKey) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => {
                if key.is_identifier() {
                    normalize_identifier(a) == normalize_identifier(b)
                } else {
                    normalize_text(a) == normalize_text(b)
                }
            }
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{}", n),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Uppercase and collapse runs of whitespace.
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Uppercase and keep only alphanumerics.
pub fn normalize_identifier(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Where a field value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    #[default]
    Pattern,
    Ai,
    Manual,
}

/// A single extracted field with its confidence and provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    /// Extracted value, `None` when nothing was detected.
    pub value: Option<FieldValue>,
    /// Confidence score (0.0 - 1.0), 0.0 when `value` is `None`.
    pub confidence: f32,
    /// Extraction provenance.
    pub source: FieldSource,
    /// Source text that was matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_text: Option<String>,
}

impl ExtractedField {
    /// A field with nothing detected.
    pub fn missing() -> Self {
        Self {
            value: None,
            confidence: 0.0,
            source: FieldSource::Pattern,
            matched_text: None,
        }
    }

    /// Create a field with a value.
    ///
    /// Confidence is clamped to [0, 1]. A value whose confidence ends up at
    /// zero (or is NaN) is not kept: the result is a missing field.
    pub fn new(value: FieldValue, confidence: f32, source: FieldSource) -> Self {
        let confidence = clamp_confidence(confidence);
        if confidence <= 0.0 {
            return Self::missing();
        }
        Self {
            value: Some(value),
            confidence,
            source,
            matched_text: None,
        }
    }

    pub fn with_matched_text(mut self, text: impl Into<String>) -> Self {
        if self.value.is_some() {
            self.matched_text = Some(text.into());
        }
        self
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    /// Re-establish the field invariants after deserialization or hand
    /// construction.
    pub fn sanitized(self) -> Self {
        match self.value {
            Some(value) => {
                let matched = self.matched_text;
                let mut field = Self::new(value, self.confidence, self.source);
                field.matched_text = if field.is_present() { matched } else { None };
                field
            }
            None => Self::missing(),
        }
    }
}

impl Default for ExtractedField {
    fn default() -> Self {
        Self::missing()
    }
}

/// Clamp a confidence into [0, 1], mapping NaN to 0.
pub fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Declared type of a shipping document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    BillOfLading,
    CommercialInvoice,
    PackingList,
    VeterinaryCertificate,
    PhytosanitaryCertificate,
    CertificateOfOrigin,
    Other,
}

impl DocumentType {
    pub const ALL: [DocumentType; 7] = [
        DocumentType::BillOfLading,
        DocumentType::CommercialInvoice,
        DocumentType::PackingList,
        DocumentType::VeterinaryCertificate,
        DocumentType::PhytosanitaryCertificate,
        DocumentType::CertificateOfOrigin,
        DocumentType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::BillOfLading => "bill_of_lading",
            DocumentType::CommercialInvoice => "commercial_invoice",
            DocumentType::PackingList => "packing_list",
            DocumentType::VeterinaryCertificate => "veterinary_certificate",
            DocumentType::PhytosanitaryCertificate => "phytosanitary_certificate",
            DocumentType::CertificateOfOrigin => "certificate_of_origin",
            DocumentType::Other => "other",
        }
    }

    /// Parse a document type from its name or a common abbreviation.
    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase().replace(['-', ' '], "_");
        match s.as_str() {
            "bol" | "bl" | "b/l" | "bill_of_lading" => Some(Self::BillOfLading),
            "invoice" | "ci" | "commercial_invoice" => Some(Self::CommercialInvoice),
            "pl" | "packing_list" => Some(Self::PackingList),
            "vet" | "health_certificate" | "veterinary_certificate" => {
                Some(Self::VeterinaryCertificate)
            }
            "phyto" | "phytosanitary_certificate" => Some(Self::PhytosanitaryCertificate),
            "coo" | "certificate_of_origin" => Some(Self::CertificateOfOrigin),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// The fields an extractor looks for in this type of document.
    pub fn field_set(&self) -> &'static [FieldKey] {
        use FieldKey::*;
        match self {
            DocumentType::BillOfLading => &[
                ContainerNumber,
                BlNumber,
                VesselName,
                VoyageNumber,
                Shipper,
                Consignee,
                PortOfLoading,
                PortOfDischarge,
                GrossWeight,
                NetWeight,
                IssueDate,
                DepartureDate,
            ],
            DocumentType::CommercialInvoice => &[
                ContainerNumber,
                Shipper,
                Consignee,
                GrossWeight,
                NetWeight,
                IssueDate,
            ],
            DocumentType::PackingList => &[ContainerNumber, GrossWeight, NetWeight, IssueDate],
            DocumentType::VeterinaryCertificate => &[
                CertificateNumber,
                Issuer,
                VeterinaryCertDate,
                ExpiryDate,
                TracesReference,
                ContainerNumber,
            ],
            DocumentType::PhytosanitaryCertificate | DocumentType::CertificateOfOrigin => &[
                CertificateNumber,
                Issuer,
                IssueDate,
                ExpiryDate,
                ContainerNumber,
            ],
            DocumentType::Other => &[ContainerNumber, IssueDate],
        }
    }

    /// Whether a shipment may carry more than one document of this type.
    pub fn allows_multiple(&self) -> bool {
        matches!(self, DocumentType::CommercialInvoice | DocumentType::Other)
    }

    /// Certificates whose validity window matters for departure.
    pub fn is_certificate(&self) -> bool {
        matches!(
            self,
            DocumentType::VeterinaryCertificate
                | DocumentType::PhytosanitaryCertificate
                | DocumentType::CertificateOfOrigin
        )
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized, confidence-scored fields extracted from one document.
///
/// Produced by a single extraction run and never edited afterwards; running
/// extraction again yields a new document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalDocument {
    /// Declared type used to select the field set.
    pub document_type: DocumentType,
    /// One entry per field of the type's field set.
    pub fields: BTreeMap<FieldKey, ExtractedField>,
    /// Extraction warnings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Text was unreadable or nothing matched.
    #[serde(default)]
    pub degraded: bool,
}

impl CanonicalDocument {
    /// A document where every field of the type is missing.
    pub fn empty(document_type: DocumentType) -> Self {
        Self {
            document_type,
            fields: document_type
                .field_set()
                .iter()
                .map(|k| (*k, ExtractedField::missing()))
                .collect(),
            warnings: Vec::new(),
            degraded: false,
        }
    }

    pub fn field(&self, key: FieldKey) -> Option<&ExtractedField> {
        self.fields.get(&key)
    }

    /// The value of a field, if one was extracted.
    pub fn value(&self, key: FieldKey) -> Option<&FieldValue> {
        self.fields.get(&key).and_then(|f| f.value.as_ref())
    }

    pub fn text(&self, key: FieldKey) -> Option<&str> {
        self.value(key).and_then(FieldValue::as_text)
    }

    pub fn number(&self, key: FieldKey) -> Option<Decimal> {
        self.value(key).and_then(FieldValue::as_number)
    }

    pub fn date(&self, key: FieldKey) -> Option<NaiveDate> {
        self.value(key).and_then(FieldValue::as_date)
    }

    /// Confidence of a field, 0.0 when absent.
    pub fn confidence(&self, key: FieldKey) -> f32 {
        self.fields.get(&key).map(|f| f.confidence).unwrap_or(0.0)
    }

    /// Number of fields with a value.
    pub fn present_count(&self) -> usize {
        self.fields.values().filter(|f| f.is_present()).count()
    }

    /// Fields of the type's field set that have no value.
    pub fn missing_fields(&self) -> Vec<FieldKey> {
        self.fields
            .iter()
            .filter(|(_, f)| !f.is_present())
            .map(|(k, _)| *k)
            .collect()
    }
}
