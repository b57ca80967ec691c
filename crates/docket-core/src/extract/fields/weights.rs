//! Gross and net weight extraction, normalized to kilograms.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::extract::patterns::{GROSS_WEIGHT, NET_WEIGHT};
use crate::extract::{select_best, ExtractionMatch, FieldExtractor};

const WITH_UNIT: f32 = 0.9;
const WITHOUT_UNIT: f32 = 0.75;

/// Kilograms per avoirdupois pound.
const KG_PER_LB: Decimal = Decimal::from_parts(45_359_237, 0, 0, false, 8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightKind {
    Gross,
    Net,
}

/// Weight extractor.
pub struct WeightExtractor {
    kind: WeightKind,
}

impl WeightExtractor {
    pub fn new(kind: WeightKind) -> Self {
        Self { kind }
    }
}

impl FieldExtractor for WeightExtractor {
    type Output = ExtractionMatch<Decimal>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        select_best(self.extract_all(text))
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let pattern = match self.kind {
            WeightKind::Gross => &*GROSS_WEIGHT,
            WeightKind::Net => &*NET_WEIGHT,
        };

        let mut results = Vec::new();
        for caps in pattern.captures_iter(text) {
            let Some(quantity) = parse_quantity(&caps[2]) else {
                continue;
            };
            if quantity <= Decimal::ZERO {
                continue;
            }

            let unit = caps.get(1).or_else(|| caps.get(3)).map(|m| m.as_str());
            let (kilograms, confidence) = match unit {
                Some(unit) => match to_kilograms(quantity, unit) {
                    Some(kilograms) => (kilograms, WITH_UNIT),
                    None => continue,
                },
                None => (quantity, WITHOUT_UNIT),
            };

            let full_match = caps.get(0).unwrap();
            results.push(
                ExtractionMatch::new(kilograms, confidence, full_match.as_str())
                    .with_position(full_match.start(), full_match.end()),
            );
        }
        results
    }
}

/// Parse a quantity written with either `,` or `.` as decimal separator.
///
/// When both separators appear, the last one is the decimal separator. A lone
/// separator followed by exactly three digits is a thousands separator, so
/// `1,500` and `1.500` both read as 1500.
pub fn parse_quantity(raw: &str) -> Option<Decimal> {
    let digits: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{00a0}' | '\''))
        .collect();

    let commas = digits.matches(',').count();
    let dots = digits.matches('.').count();

    let normalized = match (commas, dots) {
        (0, 0) => digits,
        (c, d) if c > 0 && d > 0 => {
            let last_comma = digits.rfind(',')?;
            let last_dot = digits.rfind('.')?;
            if last_comma > last_dot {
                digits.replace('.', "").replace(',', ".")
            } else {
                digits.replace(',', "")
            }
        }
        (c, d) => {
            let sep = if c > 0 { ',' } else { '.' };
            if c + d > 1 {
                digits.replace(sep, "")
            } else {
                let fraction_len = digits.len() - digits.rfind(sep)? - 1;
                if fraction_len == 3 {
                    digits.replace(sep, "")
                } else {
                    digits.replace(sep, ".")
                }
            }
        }
    };

    Decimal::from_str(&normalized).ok()
}

/// `None` when the converted weight does not fit a `Decimal`.
fn to_kilograms(quantity: Decimal, unit: &str) -> Option<Decimal> {
    let unit = unit.to_lowercase();
    if unit.starts_with("lb") || unit.starts_with("pound") {
        quantity.checked_mul(KG_PER_LB).map(|kg| kg.round_dp(3))
    } else if unit == "t" || unit == "mt" || unit.starts_with("tonne") {
        quantity.checked_mul(Decimal::ONE_THOUSAND)
    } else {
        Some(quantity)
    }
}
