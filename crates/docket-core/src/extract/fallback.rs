//! Optional AI fallback for fields the patterns could not read confidently.

use async_trait::async_trait;

use crate::error::FallbackError;
use crate::models::document::{
    normalize_identifier, normalize_text, DocumentType, ExtractedField, FieldKey, FieldValue,
};

use super::fields::DateExtractor;
use super::FieldExtractor;

/// A second-opinion extractor, typically backed by a language model.
///
/// Implementations return `Ok(None)` when they have no answer. Results are
/// only advisory: the extractor accepts them after checking they are grounded
/// in the source text.
#[async_trait]
pub trait FallbackStrategy: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Try to read one field from the document text.
    async fn attempt(
        &self,
        text: &str,
        document_type: DocumentType,
        field: FieldKey,
    ) -> Result<Option<ExtractedField>, FallbackError>;
}

/// Fallback that never answers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFallback;

#[async_trait]
impl FallbackStrategy for NoFallback {
    fn name(&self) -> &str {
        "none"
    }

    async fn attempt(
        &self,
        _text: &str,
        _document_type: DocumentType,
        _field: FieldKey,
    ) -> Result<Option<ExtractedField>, FallbackError> {
        Ok(None)
    }
}

/// Whether a fallback value actually occurs in the source text.
pub fn is_grounded(value: &FieldValue, key: FieldKey, text: &str) -> bool {
    match value {
        FieldValue::Text(s) => {
            if key.is_identifier() {
                let needle = normalize_identifier(s);
                !needle.is_empty() && normalize_identifier(text).contains(&needle)
            } else {
                let needle = normalize_text(s);
                !needle.is_empty() && normalize_text(text).contains(&needle)
            }
        }
        FieldValue::Date(date) => DateExtractor::new()
            .extract_all(text)
            .iter()
            .any(|m| m.value == *date),
        FieldValue::Number(n) => {
            let integer_digits: String = n
                .trunc()
                .abs()
                .to_string()
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect();
            let text_digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
            !integer_digits.is_empty() && text_digits.contains(&integer_digits)
        }
    }
}
