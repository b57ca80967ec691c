//! Date extraction for shipping documents.
//!
//! Numeric dates are read day-first (`05/03/2024` is 5 March), which is the
//! convention on the documents this crate handles.

use chrono::NaiveDate;
use regex::Regex;

use crate::extract::patterns::{
    CERTIFICATION_DATE, DATE_DMY, DATE_LONG, DATE_MONTH_FIRST, DATE_YMD, DEPARTURE_DATE,
    EXPIRY_DATE, ISSUE_DATE,
};
use crate::extract::{select_best, ExtractionMatch, FieldExtractor};

const LABELED: f32 = 0.9;
const NEXT_LINE: f32 = 0.6;
const UNLABELED: f32 = 0.4;

/// Date field extractor.
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<NaiveDate>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    /// All dates in reading order.
    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results: Vec<ExtractionMatch<NaiveDate>> = Vec::new();

        // DD.MM.YYYY or DD/MM/YYYY or DD-MM-YYYY
        for caps in DATE_DMY.captures_iter(text) {
            let day: u32 = caps[1].parse().unwrap_or(0);
            let month: u32 = caps[2].parse().unwrap_or(0);
            let year = parse_year(&caps[3]);
            push_date(&mut results, NaiveDate::from_ymd_opt(year, month, day), caps.get(0));
        }

        // YYYY-MM-DD or YYYY/MM/DD
        for caps in DATE_YMD.captures_iter(text) {
            let year: i32 = caps[1].parse().unwrap_or(0);
            let month: u32 = caps[2].parse().unwrap_or(0);
            let day: u32 = caps[3].parse().unwrap_or(0);
            push_date(&mut results, NaiveDate::from_ymd_opt(year, month, day), caps.get(0));
        }

        // "15 Jan 2024", "15-JAN-24"
        for caps in DATE_LONG.captures_iter(text) {
            let day: u32 = caps[1].parse().unwrap_or(0);
            let month = month_to_number(&caps[2]);
            let year = parse_year(&caps[3]);
            push_date(&mut results, NaiveDate::from_ymd_opt(year, month, day), caps.get(0));
        }

        // "January 15, 2024"
        for caps in DATE_MONTH_FIRST.captures_iter(text) {
            let month = month_to_number(&caps[1]);
            let day: u32 = caps[2].parse().unwrap_or(0);
            let year: i32 = caps[3].parse().unwrap_or(0);
            push_date(&mut results, NaiveDate::from_ymd_opt(year, month, day), caps.get(0));
        }

        results.sort_by_key(|r| r.position.map(|(start, _)| start));
        results
    }
}

fn push_date(
    results: &mut Vec<ExtractionMatch<NaiveDate>>,
    date: Option<NaiveDate>,
    full_match: Option<regex::Match<'_>>,
) {
    let (Some(date), Some(full_match)) = (date, full_match) else {
        return;
    };
    let overlaps = results.iter().any(|r| {
        r.position
            .is_some_and(|(start, end)| start < full_match.end() && full_match.start() < end)
    });
    if overlaps {
        return;
    }
    results.push(
        ExtractionMatch::new(date, LABELED, full_match.as_str())
            .with_position(full_match.start(), full_match.end()),
    );
}

/// Label that introduces a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLabel {
    Issue,
    Departure,
    Certification,
    Expiry,
}

impl DateLabel {
    fn pattern(&self) -> &'static Regex {
        match self {
            DateLabel::Issue => &*ISSUE_DATE,
            DateLabel::Departure => &*DEPARTURE_DATE,
            DateLabel::Certification => &*CERTIFICATION_DATE,
            DateLabel::Expiry => &*EXPIRY_DATE,
        }
    }
}

/// Extracts the date following a label, on the same line or the next one.
pub struct LabeledDateExtractor {
    label: DateLabel,
    unlabeled_fallback: bool,
}

impl LabeledDateExtractor {
    pub fn new(label: DateLabel) -> Self {
        Self {
            label,
            unlabeled_fallback: false,
        }
    }

    /// Fall back to the first date anywhere in the text, at low confidence.
    pub fn with_unlabeled_fallback(mut self) -> Self {
        self.unlabeled_fallback = true;
        self
    }
}

impl FieldExtractor for LabeledDateExtractor {
    type Output = ExtractionMatch<NaiveDate>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        let labeled = select_best(self.extract_all(text));
        if labeled.is_some() || !self.unlabeled_fallback {
            return labeled;
        }

        DateExtractor::new().extract(text).map(|mut first| {
            first.confidence = UNLABELED;
            first
        })
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let dates = DateExtractor::new();
        let mut results = Vec::new();

        for caps in self.label.pattern().captures_iter(text) {
            let full_match = caps.get(0).unwrap();
            let rest = caps.get(1).map(|m| m.as_str()).unwrap_or("");

            if let Some(date) = dates.extract(rest) {
                results.push(
                    ExtractionMatch::new(date.value, LABELED, full_match.as_str().trim())
                        .with_position(full_match.start(), full_match.end()),
                );
                continue;
            }

            // Label alone on its line: accept a date that opens the next line
            let after = &text[full_match.end()..];
            let next_line = after
                .split('\n')
                .skip(1)
                .map(str::trim)
                .find(|l| !l.is_empty());
            if let Some(line) = next_line {
                if let Some(date) = dates.extract(line) {
                    if date.position.map(|(start, _)| start) == Some(0) {
                        let start = full_match.end();
                        results.push(
                            ExtractionMatch::new(date.value, NEXT_LINE, line)
                                .with_position(start, start + line.len()),
                        );
                    }
                }
            }
        }

        results
    }
}

fn parse_year(s: &str) -> i32 {
    let year: i32 = s.parse().unwrap_or(0);
    if year < 100 {
        // Two-digit year: assume 2000s for 00-50, 1900s for 51-99
        if year <= 50 { 2000 + year } else { 1900 + year }
    } else {
        year
    }
}

fn month_to_number(month: &str) -> u32 {
    let prefix: String = month.to_lowercase().chars().take(3).collect();
    match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_extract_date_formats() {
        let extractor = DateExtractor::new();
        for (text, expected) in [
            ("15.01.2024", ymd(2024, 1, 15)),
            ("15/01/2024", ymd(2024, 1, 15)),
            ("2024-01-15", ymd(2024, 1, 15)),
            ("15 Jan 2024", ymd(2024, 1, 15)),
            ("15-JAN-2024", ymd(2024, 1, 15)),
            ("January 15, 2024", ymd(2024, 1, 15)),
            ("15.01.24", ymd(2024, 1, 15)),
        ] {
            assert_eq!(extractor.extract(text).unwrap().value, expected, "{}", text);
        }
    }

    #[test]
    fn test_day_first() {
        let found = DateExtractor::new().extract("05/03/2024").unwrap();
        assert_eq!(found.value, ymd(2024, 3, 5));
    }

    #[test]
    fn test_invalid_dates_are_skipped() {
        assert!(DateExtractor::new().extract("31.02.2024").is_none());
    }

    #[test]
    fn test_dates_in_reading_order() {
        let all = DateExtractor::new().extract_all("from 2024-03-01 to 15.02.2024");
        let values: Vec<NaiveDate> = all.into_iter().map(|m| m.value).collect();
        assert_eq!(values, vec![ymd(2024, 3, 1), ymd(2024, 2, 15)]);
    }

    #[test]
    fn test_labeled_dates() {
        let text = "\
Date of Issue: 10.03.2024
Shipped on Board: 12 Mar 2024
Valid until: 2024-06-30
";
        let issue = LabeledDateExtractor::new(DateLabel::Issue).extract(text).unwrap();
        assert_eq!(issue.value, ymd(2024, 3, 10));
        assert_eq!(issue.confidence, LABELED);

        let departure = LabeledDateExtractor::new(DateLabel::Departure)
            .extract(text)
            .unwrap();
        assert_eq!(departure.value, ymd(2024, 3, 12));

        let expiry = LabeledDateExtractor::new(DateLabel::Expiry).extract(text).unwrap();
        assert_eq!(expiry.value, ymd(2024, 6, 30));
    }

    #[test]
    fn test_date_on_next_line() {
        let text = "Date of signature:\n  01.03.2024  Official stamp";
        let found = LabeledDateExtractor::new(DateLabel::Certification)
            .extract(text)
            .unwrap();
        assert_eq!(found.value, ymd(2024, 3, 1));
        assert_eq!(found.confidence, NEXT_LINE);
    }

    #[test]
    fn test_unlabeled_fallback_only_when_enabled() {
        let text = "Santos, 02.03.2024";
        assert!(LabeledDateExtractor::new(DateLabel::Issue).extract(text).is_none());

        let found = LabeledDateExtractor::new(DateLabel::Issue)
            .with_unlabeled_fallback()
            .extract(text)
            .unwrap();
        assert_eq!(found.value, ymd(2024, 3, 2));
        assert_eq!(found.confidence, UNLABELED);
    }
}
