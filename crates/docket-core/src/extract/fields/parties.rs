//! Shipper, consignee and certificate issuer extraction.
//!
//! Party blocks are usually a label followed by a multi-line address, so the
//! scan works line by line: the value is either the rest of the label line or
//! the first line after it.

use crate::extract::patterns::{LABEL_LINE, PARTY_LINE};
use crate::extract::{clean_value, select_best, ExtractionMatch, FieldExtractor};

const SAME_LINE: f32 = 0.8;
const NEXT_LINE: f32 = 0.6;

/// Party named by a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyRole {
    Shipper,
    Consignee,
    Issuer,
}

impl PartyRole {
    fn from_label(label: &str) -> Self {
        let label = label.to_lowercase();
        match label.as_str() {
            "shipper" | "exporter" | "consignor" => PartyRole::Shipper,
            "consignee" => PartyRole::Consignee,
            _ => PartyRole::Issuer,
        }
    }
}

/// Party name extractor for one role.
pub struct PartyExtractor {
    role: PartyRole,
}

impl PartyExtractor {
    pub fn new(role: PartyRole) -> Self {
        Self { role }
    }
}

impl FieldExtractor for PartyExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        select_best(self.extract_all(text))
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let lines: Vec<(usize, &str)> = line_offsets(text);
        let mut results = Vec::new();

        for (idx, (offset, line)) in lines.iter().enumerate() {
            let trimmed = line.trim();
            let Some(caps) = PARTY_LINE.captures(trimmed) else {
                continue;
            };
            if PartyRole::from_label(&caps[1]) != self.role {
                continue;
            }

            let same_line = caps.get(2).map(|m| clean_value(m.as_str())).unwrap_or_default();
            if is_name(&same_line) {
                results.push(
                    ExtractionMatch::new(same_line, SAME_LINE, trimmed)
                        .with_position(*offset, offset + line.len()),
                );
                continue;
            }

            // Label alone on its line: the name is on the next non-empty line
            let next = lines[idx + 1..]
                .iter()
                .find(|(_, l)| !l.trim().is_empty());
            if let Some((next_offset, next_line)) = next {
                let candidate = next_line.trim();
                if LABEL_LINE.is_match(candidate) || PARTY_LINE.is_match(candidate) {
                    continue;
                }
                let name = clean_value(candidate);
                if is_name(&name) {
                    results.push(
                        ExtractionMatch::new(name, NEXT_LINE, candidate)
                            .with_position(*next_offset, next_offset + next_line.len()),
                    );
                }
            }
        }

        results
    }
}

fn line_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut offset = 0;
    text.split('\n')
        .map(|line| {
            let start = offset;
            offset += line.len() + 1;
            (start, line.trim_end_matches('\r'))
        })
        .collect()
}

fn is_name(value: &str) -> bool {
    value.chars().filter(|c| c.is_alphabetic()).count() >= 2
}
