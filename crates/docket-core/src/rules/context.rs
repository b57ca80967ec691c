//! Read-only input of one validation run.

use chrono::NaiveDate;

use crate::models::document::{CanonicalDocument, DocumentId, DocumentType, FieldKey};
use crate::models::shipment::{ProductType, Shipment};

/// One document of the shipment with its extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextDocument {
    pub id: DocumentId,
    /// Declared type, taken as ground truth.
    pub document_type: DocumentType,
    pub canonical: CanonicalDocument,
}

impl ContextDocument {
    pub fn new(id: DocumentId, document_type: DocumentType, canonical: CanonicalDocument) -> Self {
        Self {
            id,
            document_type,
            canonical,
        }
    }
}

/// A shipment and its documents, assembled fresh for every run.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationContext {
    pub shipment: Shipment,
    pub documents: Vec<ContextDocument>,
}

impl ValidationContext {
    pub fn new(shipment: Shipment, documents: Vec<ContextDocument>) -> Self {
        Self {
            shipment,
            documents,
        }
    }

    pub fn product_type(&self) -> ProductType {
        self.shipment.product_type
    }

    /// Documents of one type, in context order.
    pub fn documents_of(&self, document_type: DocumentType) -> impl Iterator<Item = &ContextDocument> {
        self.documents
            .iter()
            .filter(move |d| d.document_type == document_type)
    }

    pub fn first_of(&self, document_type: DocumentType) -> Option<&ContextDocument> {
        self.documents_of(document_type).next()
    }

    pub fn has(&self, document_type: DocumentType) -> bool {
        self.first_of(document_type).is_some()
    }

    pub fn bill_of_lading(&self) -> Option<&ContextDocument> {
        self.first_of(DocumentType::BillOfLading)
    }

    /// Departure date: the shipment's own, else the one on the bill of lading.
    pub fn departure_date(&self) -> Option<NaiveDate> {
        self.shipment.departure_date.or_else(|| {
            self.bill_of_lading()
                .and_then(|bol| bol.canonical.date(FieldKey::DepartureDate))
        })
    }
}
