//! Recognition of synthetic stand-in values on shipment records.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{DocketError, Result};
use crate::models::document::FieldValue;

lazy_static! {
    static ref PLACEHOLDER_WORD: Regex = Regex::new(
        r"(?i)^(?:TBD|TBA|TBC|N/?A|PENDING|UNKNOWN|PLACEHOLDER|NONE|NULL|-+|\?+)$"
    ).unwrap();

    static ref PLACEHOLDER_PREFIX: Regex = Regex::new(
        r"(?i)^(?:TEMP|TMP|AUTO|DRAFT|PH|PLACEHOLDER)-"
    ).unwrap();

    static ref ALL_X: Regex = Regex::new(r"(?i)^X+$").unwrap();

    static ref ZERO_SERIAL_CONTAINER: Regex = Regex::new(r"^[A-Z]{3}[UJZ]0{6}\d?$").unwrap();
}

/// Decides whether a shipment value is a placeholder rather than real data.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderDetector {
    extra: Vec<Regex>,
}

impl PlaceholderDetector {
    /// Detector with the built-in patterns only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Detector with additional regexes; an invalid pattern is a config error.
    pub fn with_patterns(patterns: &[String]) -> Result<Self> {
        let extra = patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    DocketError::Config(format!("invalid placeholder pattern {:?}: {}", p, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { extra })
    }

    pub fn is_placeholder(&self, value: &FieldValue) -> bool {
        match value {
            FieldValue::Text(s) => self.is_placeholder_text(s),
            FieldValue::Number(n) => n.is_zero(),
            FieldValue::Date(d) => Some(*d) == NaiveDate::from_ymd_opt(1970, 1, 1),
        }
    }

    fn is_placeholder_text(&self, raw: &str) -> bool {
        let s = raw.trim();
        if s.is_empty() {
            return true;
        }
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .flat_map(|c| c.to_uppercase())
            .collect();

        PLACEHOLDER_WORD.is_match(s)
            || PLACEHOLDER_PREFIX.is_match(s)
            || ALL_X.is_match(&compact)
            || ZERO_SERIAL_CONTAINER.is_match(&compact)
            || self.extra.iter().any(|re| re.is_match(s))
    }
}
