//! The standard rule catalog.

mod cross_field;
mod presence;
mod product;
mod tolerance;
mod uniqueness;

pub use cross_field::{
    ConsigneeMatchRule, ContainerConsistencyRule, ContainerMatchesShipmentRule,
    NetNotAboveGrossRule,
};
pub use presence::{BolKeyFieldsRule, RequiredDocumentsRule};
pub use product::{CertificateExpiryRule, TracesReferenceRule, VetCertBeforeDepartureRule};
pub use tolerance::{BolPackingListWeightRule, ShipmentWeightRule};
pub use uniqueness::UniqueDocumentTypeRule;

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::models::config::ValidationConfig;

use super::Rule;

/// Every rule of the standard catalog.
pub fn standard_rules(config: &ValidationConfig) -> Vec<Arc<dyn Rule>> {
    let tolerance = config.weight_tolerance;
    let rules: [Arc<dyn Rule>; 12] = [
        Arc::new(RequiredDocumentsRule),
        Arc::new(BolKeyFieldsRule),
        Arc::new(UniqueDocumentTypeRule),
        Arc::new(ContainerMatchesShipmentRule::new()),
        Arc::new(ContainerConsistencyRule),
        Arc::new(ConsigneeMatchRule),
        Arc::new(NetNotAboveGrossRule),
        Arc::new(BolPackingListWeightRule::new(tolerance)),
        Arc::new(ShipmentWeightRule::new(tolerance)),
        Arc::new(TracesReferenceRule),
        Arc::new(VetCertBeforeDepartureRule),
        Arc::new(CertificateExpiryRule),
    ];
    rules.into_iter().collect()
}

/// Decimal rendered as a JSON string without trailing zeros.
pub(crate) fn decimal_json(value: Decimal) -> Value {
    Value::String(value.normalize().to_string())
}
