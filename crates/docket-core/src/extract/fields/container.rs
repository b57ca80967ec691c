//! ISO 6346 container number extraction.

use crate::extract::patterns::{CONTAINER_LABELED, CONTAINER_STANDALONE};
use crate::extract::{ExtractionMatch, FieldExtractor};

const LABELED_VALID: f32 = 0.95;
const LABELED_UNVERIFIED: f32 = 0.85;
const BARE_VALID: f32 = 0.7;
const BARE_UNVERIFIED: f32 = 0.4;

/// Container number extractor.
pub struct ContainerExtractor {
    verify_check_digit: bool,
}

impl ContainerExtractor {
    pub fn new() -> Self {
        Self {
            verify_check_digit: true,
        }
    }

    /// Treat every syntactically valid code as if its check digit passed.
    pub fn without_check_digit(mut self) -> Self {
        self.verify_check_digit = false;
        self
    }

    fn passes(&self, code: &str) -> bool {
        !self.verify_check_digit || validate_container(code)
    }
}

impl Default for ContainerExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for ContainerExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        crate::extract::select_best(self.extract_all(text))
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results: Vec<ExtractionMatch<String>> = Vec::new();

        for caps in CONTAINER_LABELED.captures_iter(text) {
            let code = format!("{}{}{}", caps[1].to_uppercase(), &caps[2], &caps[3]);
            if results.iter().any(|r| r.value == code) {
                continue;
            }
            let confidence = if self.passes(&code) {
                LABELED_VALID
            } else {
                LABELED_UNVERIFIED
            };
            let full_match = caps.get(0).unwrap();
            results.push(
                ExtractionMatch::new(code, confidence, full_match.as_str())
                    .with_position(full_match.start(), full_match.end()),
            );
        }

        for caps in CONTAINER_STANDALONE.captures_iter(text) {
            let code = format!("{}{}{}", &caps[1], &caps[2], &caps[3]);
            // Already found behind a label
            if results.iter().any(|r| r.value == code) {
                continue;
            }
            let confidence = if self.passes(&code) {
                BARE_VALID
            } else {
                BARE_UNVERIFIED
            };
            let full_match = caps.get(0).unwrap();
            results.push(
                ExtractionMatch::new(code, confidence, full_match.as_str())
                    .with_position(full_match.start(), full_match.end()),
            );
        }

        results.sort_by_key(|r| r.position.map(|(start, _)| start));
        results
    }
}

/// Numeric value of an owner-code letter: A=10, skipping multiples of 11.
fn letter_value(c: char) -> Option<u32> {
    if !c.is_ascii_uppercase() {
        return None;
    }
    let mut value = 10;
    for letter in 'A'..=c {
        if value % 11 == 0 {
            value += 1;
        }
        if letter == c {
            return Some(value);
        }
        value += 1;
    }
    None
}

/// Compute the ISO 6346 check digit for the first ten characters of a code.
pub fn iso6346_check_digit(code: &str) -> Option<u32> {
    let chars: Vec<char> = code.chars().collect();
    if chars.len() < 10 {
        return None;
    }

    let mut sum = 0u32;
    for (i, c) in chars.iter().take(10).enumerate() {
        let value = if i < 4 {
            letter_value(*c)?
        } else {
            c.to_digit(10)?
        };
        sum += value << i;
    }
    Some(sum % 11 % 10)
}

/// Validate an 11-character container code (4 letters, 7 digits) by its check digit.
pub fn validate_container(code: &str) -> bool {
    let code: String = code.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if code.len() != 11 {
        return false;
    }
    let expected = match code.chars().last().and_then(|c| c.to_digit(10)) {
        Some(d) => d,
        None => return false,
    };
    iso6346_check_digit(&code) == Some(expected)
}
