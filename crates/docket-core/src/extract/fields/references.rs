//! Document reference numbers: B/L number, TRACES/CHED reference,
//! certificate number.

use lazy_static::lazy_static;
use regex::Regex;

use crate::extract::patterns::{
    BL_NUMBER, BL_SHORT, CERTIFICATE_NUMBER, CHED_REFERENCE, TRACES_LABELED,
};
use crate::extract::{select_best, ExtractionMatch, FieldExtractor};

const BL_LABELED: f32 = 0.9;
const BL_SHORT_LABEL: f32 = 0.85;
const CHED_LABELED: f32 = 0.95;
const CHED_BARE: f32 = 0.85;
const TRACES_FREE_FORM: f32 = 0.7;
const CERTIFICATE_LABELED: f32 = 0.85;

lazy_static! {
    static ref CHED_EXACT: Regex = Regex::new(
        r"(?i)^CHED(?:-?(?:A|PP|P|D))?\.[A-Z]{2}\.\d{4}\.\d{7}$"
    ).unwrap();
}

/// Bill of lading number extractor.
pub struct BlNumberExtractor;

impl BlNumberExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BlNumberExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for BlNumberExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        select_best(self.extract_all(text))
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results: Vec<ExtractionMatch<String>> = Vec::new();

        for (pattern, confidence) in [(&*BL_NUMBER, BL_LABELED), (&*BL_SHORT, BL_SHORT_LABEL)] {
            for caps in pattern.captures_iter(text) {
                let Some(reference) = normalize_reference(&caps[1]) else {
                    continue;
                };
                if results.iter().any(|r| r.value == reference) {
                    continue;
                }
                let full_match = caps.get(0).unwrap();
                results.push(
                    ExtractionMatch::new(reference, confidence, full_match.as_str())
                        .with_position(full_match.start(), full_match.end()),
                );
            }
        }
        results
    }
}

/// TRACES reference extractor (CHED numbers or labeled free-form references).
pub struct TracesExtractor;

impl TracesExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracesExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for TracesExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        select_best(self.extract_all(text))
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results: Vec<ExtractionMatch<String>> = Vec::new();

        for caps in TRACES_LABELED.captures_iter(text) {
            let Some(reference) = normalize_reference(&caps[1]) else {
                continue;
            };
            let confidence = if is_ched(&reference) {
                CHED_LABELED
            } else {
                TRACES_FREE_FORM
            };
            let full_match = caps.get(0).unwrap();
            results.push(
                ExtractionMatch::new(reference, confidence, full_match.as_str())
                    .with_position(full_match.start(), full_match.end()),
            );
        }

        for caps in CHED_REFERENCE.captures_iter(text) {
            let reference = caps[1].to_uppercase();
            if results.iter().any(|r| r.value == reference) {
                continue;
            }
            let full_match = caps.get(0).unwrap();
            results.push(
                ExtractionMatch::new(reference, CHED_BARE, full_match.as_str())
                    .with_position(full_match.start(), full_match.end()),
            );
        }

        results
    }
}

/// Certificate number extractor.
pub struct CertificateNumberExtractor;

impl CertificateNumberExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CertificateNumberExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for CertificateNumberExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        select_best(self.extract_all(text))
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        CERTIFICATE_NUMBER
            .captures_iter(text)
            .filter_map(|caps| {
                let reference = normalize_reference(&caps[1])?;
                let full_match = caps.get(0)?;
                Some(
                    ExtractionMatch::new(reference, CERTIFICATE_LABELED, full_match.as_str())
                        .with_position(full_match.start(), full_match.end()),
                )
            })
            .collect()
    }
}

/// Check whether a reference follows the CHED numbering scheme.
pub fn is_ched(reference: &str) -> bool {
    CHED_EXACT.is_match(reference)
}

/// Uppercase a reference and trim dangling separators; references must carry a digit.
fn normalize_reference(raw: &str) -> Option<String> {
    let reference = raw
        .trim_end_matches(['-', '/', '.'])
        .to_uppercase();
    if reference.chars().any(|c| c.is_ascii_digit()) {
        Some(reference)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bl_number() {
        let found = BlNumberExtractor::new()
            .extract("B/L No: MEDUSA123456")
            .unwrap();
        assert_eq!(found.value, "MEDUSA123456");
        assert_eq!(found.confidence, BL_LABELED);

        let found = BlNumberExtractor::new()
            .extract("Bill of Lading Number: hlcusss240312")
            .unwrap();
        assert_eq!(found.value, "HLCUSSS240312");
    }

    #[test]
    fn test_bl_number_requires_digit() {
        assert!(BlNumberExtractor::new().extract("B/L No: ORIGINAL").is_none());
    }

    #[test]
    fn test_traces_ched_labeled() {
        let found = TracesExtractor::new()
            .extract("TRACES Reference: CHEDP.FR.2024.0001234")
            .unwrap();
        assert_eq!(found.value, "CHEDP.FR.2024.0001234");
        assert_eq!(found.confidence, CHED_LABELED);
    }

    #[test]
    fn test_traces_bare_and_free_form() {
        let found = TracesExtractor::new()
            .extract("Reference CHEDP.NL.2023.1234567 attached")
            .unwrap();
        assert_eq!(found.confidence, CHED_BARE);

        let found = TracesExtractor::new()
            .extract("TRACES No: INTRA.BR.2024.55")
            .unwrap();
        assert_eq!(found.value, "INTRA.BR.2024.55");
        assert_eq!(found.confidence, TRACES_FREE_FORM);
    }

    #[test]
    fn test_certificate_number() {
        let found = CertificateNumberExtractor::new()
            .extract("Certificate No.: BR-2024/00871")
            .unwrap();
        assert_eq!(found.value, "BR-2024/00871");
    }
}
