//! Shipment records and the documents attached to them.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::document::{DocumentId, DocumentType, FieldKey, FieldValue};

/// Identifier of a shipment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipmentId(pub String);

impl ShipmentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShipmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Product family of the goods, which drives rule applicability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    #[default]
    General,
    Meat,
    Seafood,
    Dairy,
    Plants,
}

impl ProductType {
    pub const ALL: [ProductType; 5] = [
        ProductType::General,
        ProductType::Meat,
        ProductType::Seafood,
        ProductType::Dairy,
        ProductType::Plants,
    ];

    /// Products of animal origin need veterinary certification and TRACES.
    pub fn is_animal_origin(&self) -> bool {
        matches!(self, ProductType::Meat | ProductType::Seafood | ProductType::Dairy)
    }

    /// Document types every shipment of this product must carry.
    pub fn required_documents(&self) -> Vec<DocumentType> {
        let mut required = vec![
            DocumentType::BillOfLading,
            DocumentType::CommercialInvoice,
            DocumentType::PackingList,
        ];
        if self.is_animal_origin() {
            required.push(DocumentType::VeterinaryCertificate);
        }
        if *self == ProductType::Plants {
            required.push(DocumentType::PhytosanitaryCertificate);
        }
        required
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::General => "general",
            ProductType::Meat => "meat",
            ProductType::Seafood => "seafood",
            ProductType::Dairy => "dairy",
            ProductType::Plants => "plants",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authoritative shipment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,

    /// Customer-facing reference.
    #[serde(default)]
    pub reference: String,

    #[serde(default)]
    pub product_type: ProductType,

    /// Optimistic-concurrency token, bumped on every write.
    #[serde(default)]
    pub version: u64,

    /// Fields confirmed by a human; sync never overwrites them.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub confirmed_fields: BTreeSet<FieldKey>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bl_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vessel_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voyage_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipper: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_of_loading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_of_discharge: Option<String>,

    /// Declared gross weight in kilograms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gross_weight: Option<Decimal>,
    /// Declared net weight in kilograms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_weight: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traces_reference: Option<String>,
}

impl Shipment {
    /// Create an empty shipment.
    pub fn new(id: impl Into<String>, product_type: ProductType) -> Self {
        Self {
            id: ShipmentId::new(id),
            reference: String::new(),
            product_type,
            version: 0,
            confirmed_fields: BTreeSet::new(),
            container_number: None,
            bl_number: None,
            vessel_name: None,
            voyage_number: None,
            shipper: None,
            consignee: None,
            port_of_loading: None,
            port_of_discharge: None,
            gross_weight: None,
            net_weight: None,
            departure_date: None,
            traces_reference: None,
        }
    }

    /// Read a mapped attribute by field key.
    ///
    /// Returns `None` both for empty attributes and for keys that are not
    /// shipment attributes.
    pub fn field(&self, key: FieldKey) -> Option<FieldValue> {
        let text = |v: &Option<String>| v.clone().map(FieldValue::Text);
        match key {
            FieldKey::ContainerNumber => text(&self.container_number),
            FieldKey::BlNumber => text(&self.bl_number),
            FieldKey::VesselName => text(&self.vessel_name),
            FieldKey::VoyageNumber => text(&self.voyage_number),
            FieldKey::Shipper => text(&self.shipper),
            FieldKey::Consignee => text(&self.consignee),
            FieldKey::PortOfLoading => text(&self.port_of_loading),
            FieldKey::PortOfDischarge => text(&self.port_of_discharge),
            FieldKey::TracesReference => text(&self.traces_reference),
            FieldKey::GrossWeight => self.gross_weight.map(FieldValue::Number),
            FieldKey::NetWeight => self.net_weight.map(FieldValue::Number),
            FieldKey::DepartureDate => self.departure_date.map(FieldValue::Date),
            _ => None,
        }
    }

    /// Write a mapped attribute.
    ///
    /// Returns `false` (and leaves the record untouched) when the key is not a
    /// shipment attribute or the value has the wrong type.
    pub fn set_field(&mut self, key: FieldKey, value: FieldValue) -> bool {
        match (key, value) {
            (FieldKey::ContainerNumber, FieldValue::Text(s)) => self.container_number = Some(s),
            (FieldKey::BlNumber, FieldValue::Text(s)) => self.bl_number = Some(s),
            (FieldKey::VesselName, FieldValue::Text(s)) => self.vessel_name = Some(s),
            (FieldKey::VoyageNumber, FieldValue::Text(s)) => self.voyage_number = Some(s),
            (FieldKey::Shipper, FieldValue::Text(s)) => self.shipper = Some(s),
            (FieldKey::Consignee, FieldValue::Text(s)) => self.consignee = Some(s),
            (FieldKey::PortOfLoading, FieldValue::Text(s)) => self.port_of_loading = Some(s),
            (FieldKey::PortOfDischarge, FieldValue::Text(s)) => self.port_of_discharge = Some(s),
            (FieldKey::TracesReference, FieldValue::Text(s)) => self.traces_reference = Some(s),
            (FieldKey::GrossWeight, FieldValue::Number(n)) => self.gross_weight = Some(n),
            (FieldKey::NetWeight, FieldValue::Number(n)) => self.net_weight = Some(n),
            (FieldKey::DepartureDate, FieldValue::Date(d)) => self.departure_date = Some(d),
            _ => return false,
        }
        true
    }

    /// Whether a field is locked by a prior human confirmation.
    pub fn is_confirmed(&self, key: FieldKey) -> bool {
        self.confirmed_fields.contains(&key)
    }
}

/// A stored document: its raw text layer and declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub shipment_id: ShipmentId,
    pub document_type: DocumentType,
    /// Text produced by the upstream OCR/text-layer step.
    #[serde(default)]
    pub raw_text: String,
}

impl DocumentRecord {
    pub fn new(
        id: impl Into<String>,
        shipment_id: impl Into<String>,
        document_type: DocumentType,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            id: DocumentId::new(id),
            shipment_id: ShipmentId::new(shipment_id),
            document_type,
            raw_text: raw_text.into(),
        }
    }
}
