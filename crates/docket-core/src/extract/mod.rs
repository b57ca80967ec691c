//! Field extraction from raw shipping document text.

pub mod classify;
mod extractor;
pub mod fallback;
pub mod fields;
mod parser;
pub mod patterns;

pub use classify::{classify, Classification};
pub use extractor::DocumentExtractor;
pub use fallback::{FallbackStrategy, NoFallback};
pub use parser::PatternParser;

use crate::models::document::{ExtractedField, FieldSource, FieldValue};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// Extraction context with confidence scores.
#[derive(Debug, Clone)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Position in source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}

impl<T: Into<FieldValue>> ExtractionMatch<T> {
    /// Convert into a pattern-sourced canonical field.
    pub fn into_field(self) -> ExtractedField {
        ExtractedField::new(self.value.into(), self.confidence, FieldSource::Pattern)
            .with_matched_text(self.source.trim())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<rust_decimal::Decimal> for FieldValue {
    fn from(n: rust_decimal::Decimal) -> Self {
        FieldValue::Number(n)
    }
}

impl From<chrono::NaiveDate> for FieldValue {
    fn from(d: chrono::NaiveDate) -> Self {
        FieldValue::Date(d)
    }
}

/// Pick one candidate among several matches for the same field.
///
/// The first candidate in reading order wins unless a later one has strictly
/// higher confidence.
pub fn select_best<T>(mut candidates: Vec<ExtractionMatch<T>>) -> Option<ExtractionMatch<T>> {
    candidates.sort_by_key(|c| c.position.map(|(start, _)| start).unwrap_or(usize::MAX));

    let mut best: Option<ExtractionMatch<T>> = None;
    for candidate in candidates {
        match &best {
            Some(current) if candidate.confidence <= current.confidence => {}
            _ => best = Some(candidate),
        }
    }
    best
}

/// Normalize a free-text value taken from a labeled line.
///
/// Cuts at the next inline label or the first wide gap (two spaces or a tab,
/// typical of columnar layouts), collapses whitespace, and strips trailing
/// punctuation.
pub fn clean_value(raw: &str) -> String {
    let raw = match patterns::INLINE_LABEL.find(raw) {
        Some(m) => &raw[..m.start()],
        None => raw,
    };
    let first_column = raw
        .trim_start()
        .split('\t')
        .next()
        .unwrap_or("")
        .split("  ")
        .next()
        .unwrap_or("");

    first_column
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '.' | '-') || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_best_prefers_reading_order() {
        let candidates = vec![
            ExtractionMatch::new("late", 0.9, "").with_position(50, 54),
            ExtractionMatch::new("early", 0.9, "").with_position(10, 15),
        ];
        assert_eq!(select_best(candidates).unwrap().value, "early");
    }

    #[test]
    fn test_select_best_takes_strictly_higher_confidence() {
        let candidates = vec![
            ExtractionMatch::new("bare", 0.4, "").with_position(0, 11),
            ExtractionMatch::new("labeled", 0.95, "").with_position(30, 41),
        ];
        assert_eq!(select_best(candidates).unwrap().value, "labeled");

        let empty: Vec<ExtractionMatch<&str>> = Vec::new();
        assert!(select_best(empty).is_none());
    }

    #[test]
    fn test_clean_value() {
        assert_eq!(clean_value("  HAMBURG   Port of Discharge: SANTOS"), "HAMBURG");
        assert_eq!(clean_value("ACME  Foods\tGmbH"), "ACME");
        assert_eq!(clean_value("Nordic Seafood AS,"), "Nordic Seafood AS");
        assert_eq!(clean_value(" SANTOS Port of Discharge: HAMBURG"), "SANTOS");
        assert_eq!(clean_value("   "), "");
    }
}
