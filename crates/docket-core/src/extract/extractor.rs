//! Document extractor: pattern parsing plus the optional AI fallback.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::models::config::ExtractionConfig;
use crate::models::document::{
    CanonicalDocument, DocumentType, ExtractedField, FieldKey, FieldSource, FieldValue,
};

use super::fallback::{is_grounded, FallbackStrategy};
use super::parser::{unreadable_reason, PatternParser};

/// Extracts canonical documents from raw text.
pub struct DocumentExtractor {
    config: ExtractionConfig,
    parser: PatternParser,
    fallback: Option<Arc<dyn FallbackStrategy>>,
}

impl DocumentExtractor {
    /// Create a pattern-only extractor.
    pub fn new(config: ExtractionConfig) -> Self {
        let parser = PatternParser::new().with_check_digit_verification(config.verify_check_digit);
        Self {
            config,
            parser,
            fallback: None,
        }
    }

    /// Consult `fallback` for fields the patterns could not read confidently.
    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackStrategy>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Pattern extraction only.
    pub fn parse(&self, text: &str, document_type: DocumentType) -> CanonicalDocument {
        self.parser.parse(text, document_type)
    }

    /// Full extraction: patterns, then the fallback for low-confidence fields.
    pub async fn extract(&self, text: &str, document_type: DocumentType) -> CanonicalDocument {
        let mut doc = self.parser.parse(text, document_type);

        let fallback = match &self.fallback {
            Some(fallback) if self.config.enable_fallback => fallback,
            _ => return doc,
        };
        if unreadable_reason(text).is_some() {
            return doc;
        }

        let candidates: Vec<(FieldKey, f32)> = doc
            .fields
            .iter()
            .filter(|(_, f)| f.confidence < self.config.fallback_threshold)
            .map(|(k, f)| (*k, f.confidence))
            .collect();
        if candidates.is_empty() {
            return doc;
        }

        debug!(
            "Consulting fallback '{}' for {} fields",
            fallback.name(),
            candidates.len()
        );

        let timeout = self.config.fallback_timeout();
        let attempts = candidates.iter().map(|(key, _)| {
            let fallback = Arc::clone(fallback);
            let key = *key;
            async move {
                tokio::time::timeout(timeout, fallback.attempt(text, document_type, key)).await
            }
        });
        let outcomes = join_all(attempts).await;

        let mut accepted = 0;
        for ((key, pattern_confidence), outcome) in candidates.into_iter().zip(outcomes) {
            let proposed = match outcome {
                Err(_) => {
                    warn!("Fallback timed out for {} after {:?}", key, timeout);
                    continue;
                }
                Ok(Err(e)) => {
                    warn!("Fallback failed for {}: {}", key, e);
                    continue;
                }
                Ok(Ok(None)) => {
                    debug!("Fallback had no answer for {}", key);
                    continue;
                }
                Ok(Ok(Some(field))) => field.sanitized(),
            };

            let Some(value) = proposed.value.clone() else {
                debug!("Fallback returned no value for {}", key);
                continue;
            };
            if !has_expected_type(&value, key) {
                warn!("Fallback returned a value of the wrong type for {}", key);
                continue;
            }
            if proposed.confidence < pattern_confidence {
                debug!(
                    "Fallback confidence {:.2} below pattern confidence {:.2} for {}",
                    proposed.confidence, pattern_confidence, key
                );
                continue;
            }
            if !is_grounded(&value, key, text) {
                warn!("Rejected fallback value for {}: not present in source text", key);
                continue;
            }

            let field = ExtractedField {
                source: FieldSource::Ai,
                ..proposed
            };
            let missing = format!("Could not extract {}", key);
            doc.warnings.retain(|w| *w != missing);
            doc.fields.insert(key, field);
            accepted += 1;
        }

        if accepted > 0 && doc.degraded && doc.present_count() > 0 {
            doc.degraded = false;
            doc.warnings.retain(|w| w != "No fields matched");
        }

        info!("Fallback accepted {} fields for {}", accepted, document_type);
        doc
    }
}

fn has_expected_type(value: &FieldValue, key: FieldKey) -> bool {
    match key {
        FieldKey::GrossWeight | FieldKey::NetWeight => matches!(value, FieldValue::Number(_)),
        FieldKey::IssueDate
        | FieldKey::DepartureDate
        | FieldKey::VeterinaryCertDate
        | FieldKey::ExpiryDate => matches!(value, FieldValue::Date(_)),
        _ => matches!(value, FieldValue::Text(_)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FallbackError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers every field with a fixed value after an optional delay.
    struct FixedFallback {
        value: FieldValue,
        confidence: f32,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl FixedFallback {
        fn new(value: FieldValue, confidence: f32) -> Self {
            Self {
                value,
                confidence,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl FallbackStrategy for FixedFallback {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn attempt(
            &self,
            _text: &str,
            _document_type: DocumentType,
            field: FieldKey,
        ) -> Result<Option<ExtractedField>, FallbackError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if field != FieldKey::VesselName {
                return Ok(None);
            }
            Ok(Some(ExtractedField::new(
                self.value.clone(),
                self.confidence,
                FieldSource::Ai,
            )))
        }
    }

    struct FailingFallback;

    #[async_trait]
    impl FallbackStrategy for FailingFallback {
        fn name(&self) -> &str {
            "failing"
        }

        async fn attempt(
            &self,
            _text: &str,
            _document_type: DocumentType,
            _field: FieldKey,
        ) -> Result<Option<ExtractedField>, FallbackError> {
            Err(FallbackError::Provider("quota exceeded".to_string()))
        }
    }

    const TEXT: &str = "Container No: CSQU3054383\nCarrier vessel RHINE MAERSK sailing weekly";

    #[tokio::test]
    async fn test_grounded_fallback_value_is_accepted() {
        let fallback = Arc::new(FixedFallback::new(FieldValue::text("Rhine Maersk"), 0.7));
        let extractor =
            DocumentExtractor::new(ExtractionConfig::default()).with_fallback(fallback.clone());

        let doc = extractor.extract(TEXT, DocumentType::BillOfLading).await;
        let vessel = doc.field(FieldKey::VesselName).unwrap();
        assert_eq!(vessel.value, Some(FieldValue::text("Rhine Maersk")));
        assert_eq!(vessel.source, FieldSource::Ai);
        assert!(!doc.warnings.iter().any(|w| w.contains("vessel_name")));

        // Container was read with high confidence and is not re-asked
        let missing = doc.fields.len() - 1;
        assert_eq!(fallback.calls.load(Ordering::SeqCst), missing);
    }

    #[tokio::test]
    async fn test_hallucinated_value_is_rejected() {
        let fallback = Arc::new(FixedFallback::new(FieldValue::text("EVER GIVEN"), 0.9));
        let extractor = DocumentExtractor::new(ExtractionConfig::default()).with_fallback(fallback);

        let doc = extractor.extract(TEXT, DocumentType::BillOfLading).await;
        assert!(doc.value(FieldKey::VesselName).is_none());
        assert_eq!(doc.confidence(FieldKey::VesselName), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_fallback_keeps_pattern_result() {
        let fallback = Arc::new(
            FixedFallback::new(FieldValue::text("RHINE MAERSK"), 0.9)
                .delayed(Duration::from_secs(60)),
        );
        let extractor = DocumentExtractor::new(ExtractionConfig::default()).with_fallback(fallback);

        let doc = extractor.extract(TEXT, DocumentType::BillOfLading).await;
        assert!(doc.value(FieldKey::VesselName).is_none());
        assert_eq!(doc.text(FieldKey::ContainerNumber), Some("CSQU3054383"));
    }

    #[tokio::test]
    async fn test_failing_fallback_keeps_pattern_result() {
        let extractor =
            DocumentExtractor::new(ExtractionConfig::default()).with_fallback(Arc::new(FailingFallback));
        let doc = extractor.extract(TEXT, DocumentType::BillOfLading).await;
        assert_eq!(doc.text(FieldKey::ContainerNumber), Some("CSQU3054383"));
        assert!(doc.value(FieldKey::VesselName).is_none());
    }

    #[tokio::test]
    async fn test_wrong_type_is_rejected() {
        let fallback = Arc::new(FixedFallback::new(
            FieldValue::Number(rust_decimal::Decimal::new(3054383, 0)),
            0.9,
        ));
        let extractor = DocumentExtractor::new(ExtractionConfig::default()).with_fallback(fallback);
        let doc = extractor.extract(TEXT, DocumentType::BillOfLading).await;
        assert!(doc.value(FieldKey::VesselName).is_none());
    }

    #[tokio::test]
    async fn test_disabled_fallback_is_not_called() {
        let fallback = Arc::new(FixedFallback::new(FieldValue::text("RHINE MAERSK"), 0.9));
        let config = ExtractionConfig {
            enable_fallback: false,
            ..ExtractionConfig::default()
        };
        let extractor = DocumentExtractor::new(config).with_fallback(fallback.clone());
        let doc = extractor.extract(TEXT, DocumentType::BillOfLading).await;
        assert!(doc.value(FieldKey::VesselName).is_none());
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unreadable_text_skips_fallback() {
        let fallback = Arc::new(FixedFallback::new(FieldValue::text("RHINE MAERSK"), 0.9));
        let extractor =
            DocumentExtractor::new(ExtractionConfig::default()).with_fallback(fallback.clone());
        let doc = extractor.extract("", DocumentType::BillOfLading).await;
        assert!(doc.degraded);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }
}
