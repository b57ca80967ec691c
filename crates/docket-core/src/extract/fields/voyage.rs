//! Vessel, voyage and port extraction.

use crate::extract::patterns::{
    POD_SHORT, POL_SHORT, PORT_OF_DISCHARGE, PORT_OF_LOADING, VESSEL_LABELED, VESSEL_MV_PREFIX,
    VESSEL_VOYAGE_COMBINED, VOYAGE_LABELED,
};
use crate::extract::{clean_value, select_best, ExtractionMatch, FieldExtractor};

const COMBINED_LABEL: f32 = 0.9;
const SAME_LINE_LABEL: f32 = 0.85;
const SHORT_LABEL: f32 = 0.8;
const MV_PREFIX: f32 = 0.6;

const MAX_VESSEL_LEN: usize = 40;

/// Vessel name extractor.
pub struct VesselExtractor;

impl VesselExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for VesselExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for VesselExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        select_best(self.extract_all(text))
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for caps in VESSEL_VOYAGE_COMBINED.captures_iter(text) {
            if let Some(name) = normalize_vessel(&caps[1]) {
                let full_match = caps.get(0).unwrap();
                results.push(
                    ExtractionMatch::new(name, COMBINED_LABEL, full_match.as_str())
                        .with_position(full_match.start(), full_match.end()),
                );
            }
        }

        for caps in VESSEL_LABELED.captures_iter(text) {
            if let Some(name) = normalize_vessel(&caps[1]) {
                let full_match = caps.get(0).unwrap();
                results.push(
                    ExtractionMatch::new(name, SAME_LINE_LABEL, full_match.as_str())
                        .with_position(full_match.start(), full_match.end()),
                );
            }
        }

        for caps in VESSEL_MV_PREFIX.captures_iter(text) {
            if let Some(name) = normalize_vessel(&caps[1]) {
                if results.iter().any(|r| r.value == name) {
                    continue;
                }
                let full_match = caps.get(0).unwrap();
                results.push(
                    ExtractionMatch::new(name, MV_PREFIX, full_match.as_str())
                        .with_position(full_match.start(), full_match.end()),
                );
            }
        }

        results
    }
}

/// Voyage number extractor.
pub struct VoyageExtractor;

impl VoyageExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for VoyageExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for VoyageExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        select_best(self.extract_all(text))
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for caps in VESSEL_VOYAGE_COMBINED.captures_iter(text) {
            let voyage = caps[2].to_uppercase();
            if voyage.chars().any(|c| c.is_ascii_digit()) {
                let full_match = caps.get(0).unwrap();
                results.push(
                    ExtractionMatch::new(voyage, COMBINED_LABEL, full_match.as_str())
                        .with_position(full_match.start(), full_match.end()),
                );
            }
        }

        for caps in VOYAGE_LABELED.captures_iter(text) {
            let voyage = caps[1].trim_matches('-').to_uppercase();
            if voyage.is_empty() {
                continue;
            }
            let full_match = caps.get(0).unwrap();
            results.push(
                ExtractionMatch::new(voyage, SAME_LINE_LABEL, full_match.as_str())
                    .with_position(full_match.start(), full_match.end()),
            );
        }

        results
    }
}

/// Which end of the sea leg a port belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortRole {
    Loading,
    Discharge,
}

/// Port of loading / discharge extractor.
pub struct PortExtractor {
    role: PortRole,
}

impl PortExtractor {
    pub fn new(role: PortRole) -> Self {
        Self { role }
    }
}

impl FieldExtractor for PortExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        select_best(self.extract_all(text))
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let (long, short) = match self.role {
            PortRole::Loading => (&*PORT_OF_LOADING, &*POL_SHORT),
            PortRole::Discharge => (&*PORT_OF_DISCHARGE, &*POD_SHORT),
        };

        let mut results = Vec::new();
        for (pattern, confidence) in [(long, SAME_LINE_LABEL), (short, SHORT_LABEL)] {
            for caps in pattern.captures_iter(text) {
                let port = clean_value(&caps[1]);
                if !port.chars().any(|c| c.is_alphabetic()) {
                    continue;
                }
                let full_match = caps.get(0).unwrap();
                results.push(
                    ExtractionMatch::new(port, confidence, full_match.as_str())
                        .with_position(full_match.start(), full_match.end()),
                );
            }
        }
        results
    }
}

/// Uppercase a vessel name, dropping an M/V prefix; rejects implausible names.
fn normalize_vessel(raw: &str) -> Option<String> {
    let cleaned = clean_value(raw).to_uppercase();
    let name = ["M/V ", "M.V. ", "MV. ", "MV "]
        .iter()
        .find_map(|prefix| cleaned.strip_prefix(prefix))
        .unwrap_or(&cleaned)
        .trim()
        .to_string();

    let letters = name.chars().filter(|c| c.is_alphabetic()).count();
    if letters < 2 || name.chars().count() > MAX_VESSEL_LEN {
        return None;
    }
    Some(name)
}
