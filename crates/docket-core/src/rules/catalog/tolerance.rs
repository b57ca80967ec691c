//! Tolerance rules: weights that must agree within a relative margin.

use rust_decimal::Decimal;

use crate::error::RuleFault;
use crate::models::document::{DocumentType, FieldKey};
use crate::models::report::{RuleCategory, Severity};
use crate::rules::{Rule, RuleOutcome, ValidationContext};

use super::decimal_json;

/// Difference between two weights relative to the larger one.
#[derive(Debug, Clone, Copy, PartialEq)]
struct WeightDeviation {
    difference: Decimal,
    relative: Decimal,
}

impl WeightDeviation {
    fn between(a: Decimal, b: Decimal) -> Result<Self, RuleFault> {
        let difference = (a - b).abs();
        let larger = a.max(b);
        if larger.is_zero() {
            return Ok(Self {
                difference,
                relative: Decimal::ZERO,
            });
        }
        let relative = difference.checked_div(larger).ok_or_else(|| {
            RuleFault::Internal(format!("cannot divide {} by {}", difference, larger))
        })?;
        Ok(Self {
            difference,
            relative,
        })
    }

    fn within(&self, tolerance: Decimal) -> bool {
        self.relative <= tolerance
    }
}

fn compare_weights(
    left_label: &str,
    left: Decimal,
    right_label: &str,
    right: Decimal,
    tolerance: Decimal,
) -> Result<RuleOutcome, RuleFault> {
    let deviation = WeightDeviation::between(left, right)?;
    let outcome = if deviation.within(tolerance) {
        RuleOutcome::pass(format!(
            "Gross weights agree within {}%",
            (tolerance * Decimal::ONE_HUNDRED).normalize()
        ))
    } else {
        RuleOutcome::fail(format!(
            "Gross weight {} kg differs from {} kg by {}%, above the {}% tolerance",
            left.normalize(),
            right.normalize(),
            (deviation.relative * Decimal::ONE_HUNDRED).round_dp(2).normalize(),
            (tolerance * Decimal::ONE_HUNDRED).normalize()
        ))
    };
    Ok(outcome
        .with_detail(left_label, decimal_json(left))
        .with_detail(right_label, decimal_json(right))
        .with_detail("difference", decimal_json(deviation.difference))
        .with_detail("relative_difference", decimal_json(deviation.relative.round_dp(6)))
        .with_detail("tolerance", decimal_json(tolerance)))
}

/// TOL-001: BoL gross weight against the packing list's.
pub struct BolPackingListWeightRule {
    tolerance: Decimal,
}

impl BolPackingListWeightRule {
    pub fn new(tolerance: Decimal) -> Self {
        Self { tolerance }
    }
}

impl Rule for BolPackingListWeightRule {
    fn id(&self) -> &str {
        "TOL-001"
    }

    fn name(&self) -> &str {
        "BoL and packing list gross weight"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Tolerance
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn evaluate(&self, ctx: &ValidationContext) -> Result<RuleOutcome, RuleFault> {
        let Some(bol) = ctx.bill_of_lading() else {
            return Ok(RuleOutcome::not_evaluated("no bill of lading"));
        };
        let Some(bol_gross) = bol.canonical.number(FieldKey::GrossWeight) else {
            return Ok(RuleOutcome::not_evaluated("no gross weight on bill of lading"));
        };
        let Some((packing_list, pl_gross)) = ctx
            .documents_of(DocumentType::PackingList)
            .find_map(|d| d.canonical.number(FieldKey::GrossWeight).map(|w| (d, w)))
        else {
            return Ok(RuleOutcome::not_evaluated("no gross weight on packing list"));
        };

        let outcome = compare_weights(
            "bol_gross_weight",
            bol_gross,
            "packing_list_gross_weight",
            pl_gross,
            self.tolerance,
        )?;
        Ok(outcome.with_subject(packing_list.id.clone()))
    }
}

/// TOL-002: declared shipment gross weight against the BoL's.
pub struct ShipmentWeightRule {
    tolerance: Decimal,
}

impl ShipmentWeightRule {
    pub fn new(tolerance: Decimal) -> Self {
        Self { tolerance }
    }
}

impl Rule for ShipmentWeightRule {
    fn id(&self) -> &str {
        "TOL-002"
    }

    fn name(&self) -> &str {
        "Declared gross weight"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Tolerance
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn evaluate(&self, ctx: &ValidationContext) -> Result<RuleOutcome, RuleFault> {
        let Some(declared) = ctx.shipment.gross_weight else {
            return Ok(RuleOutcome::not_evaluated("no declared gross weight"));
        };
        let Some(bol) = ctx.bill_of_lading() else {
            return Ok(RuleOutcome::not_evaluated("no bill of lading"));
        };
        let Some(bol_gross) = bol.canonical.number(FieldKey::GrossWeight) else {
            return Ok(RuleOutcome::not_evaluated("no gross weight on bill of lading"));
        };

        let outcome = compare_weights(
            "shipment_gross_weight",
            declared,
            "bol_gross_weight",
            bol_gross,
            self.tolerance,
        )?;
        Ok(outcome.with_subject(bol.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::FieldValue;
    use crate::models::shipment::ProductType;
    use crate::rules::catalog::fixtures::{context, doc};
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    fn weights(bol: i64, packing_list: i64) -> ValidationContext {
        context(
            ProductType::General,
            vec![
                doc(
                    "BOL",
                    DocumentType::BillOfLading,
                    &[(FieldKey::GrossWeight, FieldValue::Number(Decimal::new(bol * 100, 2)))],
                ),
                doc(
                    "PL",
                    DocumentType::PackingList,
                    &[(
                        FieldKey::GrossWeight,
                        FieldValue::Number(Decimal::new(packing_list * 100, 2)),
                    )],
                ),
            ],
        )
    }

    #[test]
    fn test_gross_weight_outside_tolerance() {
        let rule = BolPackingListWeightRule::new(Decimal::new(5, 2));
        let outcome = rule.evaluate(&weights(25_000, 20_000)).unwrap();
        assert!(!outcome.passed);
        assert_eq!(outcome.details["bol_gross_weight"], Value::from("25000"));
        assert_eq!(outcome.details["packing_list_gross_weight"], Value::from("20000"));
        assert_eq!(outcome.details["difference"], Value::from("5000"));
        assert_eq!(outcome.details["relative_difference"], Value::from("0.2"));
        assert_eq!(outcome.details["tolerance"], Value::from("0.05"));
        assert_eq!(outcome.subject_document_id.unwrap().as_str(), "PL");
    }

    #[test]
    fn test_gross_weight_within_tolerance() {
        let rule = BolPackingListWeightRule::new(Decimal::new(5, 2));
        assert!(rule.evaluate(&weights(25_000, 24_000)).unwrap().passed);
        // exactly 5% apart
        assert!(rule.evaluate(&weights(20_000, 19_000)).unwrap().passed);
        assert!(rule.evaluate(&weights(0, 0)).unwrap().passed);
    }

    #[test]
    fn test_missing_packing_list_is_not_evaluated() {
        let ctx = context(
            ProductType::General,
            vec![doc(
                "BOL",
                DocumentType::BillOfLading,
                &[(FieldKey::GrossWeight, FieldValue::Number(Decimal::new(1000, 0)))],
            )],
        );
        let outcome = BolPackingListWeightRule::new(Decimal::new(5, 2))
            .evaluate(&ctx)
            .unwrap();
        assert!(outcome.passed);
        assert_eq!(outcome.details["evaluated"], Value::Bool(false));
    }

    #[test]
    fn test_declared_weight() {
        let mut ctx = weights(25_000, 25_000);
        ctx.shipment.gross_weight = Some(Decimal::new(30_000, 0));
        let rule = ShipmentWeightRule::new(Decimal::new(5, 2));
        let outcome = rule.evaluate(&ctx).unwrap();
        assert!(!outcome.passed);
        assert_eq!(outcome.details["shipment_gross_weight"], Value::from("30000"));

        ctx.shipment.gross_weight = Some(Decimal::new(25_500, 0));
        assert!(rule.evaluate(&ctx).unwrap().passed);
    }
}
