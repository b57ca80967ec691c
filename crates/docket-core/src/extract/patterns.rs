//! Common regex patterns for shipping document extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Container numbers (ISO 6346: owner code, category U/J/Z, 6-digit serial, check digit)
    pub static ref CONTAINER_LABELED: Regex = Regex::new(
        r"(?i)\b(?:container|cntr|ctr)\.?\s*(?:no\.?|number|nr\.?|#)?\s*[:#.]?\s*([A-Z]{3}[UJZ])\s?-?\s?(\d{6})\s?-?\s?(\d)\b"
    ).unwrap();

    pub static ref CONTAINER_STANDALONE: Regex = Regex::new(
        r"\b([A-Z]{3}[UJZ])\s?(\d{6})\s?-?\s?(\d)\b"
    ).unwrap();

    // Bill of lading numbers
    pub static ref BL_NUMBER: Regex = Regex::new(
        r"(?i)\b(?:b/l|bl|bol|bill\s+of\s+lading)\s*(?:no\.?|number|nr\.?|#)\s*[:#]?\s*([A-Z0-9][A-Z0-9\-/]{4,24})"
    ).unwrap();

    pub static ref BL_SHORT: Regex = Regex::new(
        r"(?i)\bb/l\s*[:#]\s*([A-Z0-9][A-Z0-9\-]{4,24})"
    ).unwrap();

    // Vessel and voyage
    pub static ref VESSEL_VOYAGE_COMBINED: Regex = Regex::new(
        r"(?im)\bvessel\s*(?:&|/|and)\s*voy(?:age)?(?:\s*no\.?)?\s*[:#]?\s*([A-Z0-9][^\n/]*?)\s*/\s*([A-Z0-9][A-Z0-9\-]*)[ \t]*$"
    ).unwrap();

    pub static ref VESSEL_LABELED: Regex = Regex::new(
        r"(?im)\b(?:ocean\s+)?vessel(?:\s+name)?\s*[:#]\s*([^\n/]+?)\s*(?:/|\bvoy(?:age)?\b|\bport\b|\bflag\b|$)"
    ).unwrap();

    pub static ref VESSEL_MV_PREFIX: Regex = Regex::new(
        r"(?m)\b(?:M/V|MV\.|M\.V\.|MV)\s+([A-Z][A-Z0-9 .'\-]{2,38}?)[ \t]*(?:/|\bVOY|$)"
    ).unwrap();

    pub static ref VOYAGE_LABELED: Regex = Regex::new(
        r"(?i)\bvoy(?:age)?\.?\s*(?:no\.?|number|#)?\s*[:#]\s*([A-Z0-9\-]*\d[A-Z0-9\-]*)"
    ).unwrap();

    // Ports
    pub static ref PORT_OF_LOADING: Regex = Regex::new(
        r"(?im)\bport\s+of\s+loading\s*[:#]?[ \t]*([^\n]+?)[ \t]*$"
    ).unwrap();

    pub static ref POL_SHORT: Regex = Regex::new(
        r"(?m)\bPOL\s*[:#][ \t]*([^\n]+?)[ \t]*$"
    ).unwrap();

    pub static ref PORT_OF_DISCHARGE: Regex = Regex::new(
        r"(?im)\bport\s+of\s+discharge\s*[:#]?[ \t]*([^\n]+?)[ \t]*$"
    ).unwrap();

    pub static ref POD_SHORT: Regex = Regex::new(
        r"(?m)\bPOD\s*[:#][ \t]*([^\n]+?)[ \t]*$"
    ).unwrap();

    // Party lines (applied to a single trimmed line)
    pub static ref PARTY_LINE: Regex = Regex::new(
        r"(?i)^(shipper|exporter|consignor|consignee|issued\s+by|issuing\s+authority|competent\s+authority|issuer)\b(?:\s*/\s*exporter)?(?:\s*\([^)]*\))?\s*(?:[:.]\s*(.*))?$"
    ).unwrap();

    pub static ref LABEL_LINE: Regex = Regex::new(
        r"^[A-Za-z][A-Za-z .'/()&\-]{1,40}:"
    ).unwrap();

    // A second label on the same line ends the value of the first
    pub static ref INLINE_LABEL: Regex = Regex::new(
        r"(?i)\s(?:port\s+of\s+(?:loading|discharge)|place\s+of\s+\w+|pol|pod|vessel|voyage|voy\.?|shipper|consignee|notify\s+party|date)\s*[:#]"
    ).unwrap();

    // Weights (quantity group accepts 25,000.00 / 25.000,00 / 20 000)
    pub static ref GROSS_WEIGHT: Regex = Regex::new(
        r"(?i)\b(?:gross\s*(?:weight|wt\.?|mass)|g\.\s?w\.|gw)\s*(?:\((kgs?|lbs?|mt|t)\))?\s*[:#]?\s*(\d{1,3}(?:[ \u{00a0}]\d{3})+(?:[.,]\d{1,3})?|\d[\d,.']*\d|\d)(?:\s*(kgs?|kilograms?|lbs?|pounds?|mt|tonnes?|t)\b)?"
    ).unwrap();

    pub static ref NET_WEIGHT: Regex = Regex::new(
        r"(?i)\b(?:net\s*(?:weight|wt\.?|mass)|n\.\s?w\.|nw)\s*(?:\((kgs?|lbs?|mt|t)\))?\s*[:#]?\s*(\d{1,3}(?:[ \u{00a0}]\d{3})+(?:[.,]\d{1,3})?|\d[\d,.']*\d|\d)(?:\s*(kgs?|kilograms?|lbs?|pounds?|mt|tonnes?|t)\b)?"
    ).unwrap();

    // Dates
    pub static ref DATE_DMY: Regex = Regex::new(
        r"\b(\d{1,2})[./\-](\d{1,2})[./\-](\d{4}|\d{2})\b"
    ).unwrap();

    pub static ref DATE_YMD: Regex = Regex::new(
        r"\b(\d{4})[./\-](\d{1,2})[./\-](\d{1,2})\b"
    ).unwrap();

    pub static ref DATE_LONG: Regex = Regex::new(
        r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?[\s\-]+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?[\s\-]+(\d{4}|\d{2})\b"
    ).unwrap();

    pub static ref DATE_MONTH_FIRST: Regex = Regex::new(
        r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b"
    ).unwrap();

    // Labeled dates (rest of the line is searched for a date)
    pub static ref ISSUE_DATE: Regex = Regex::new(
        r"(?im)(?:place\s+and\s+date\s+of\s+issue|date\s+of\s+issue|issue\s+date|issued\s+on|date\s+issued|invoice\s+date|date\s+of\s+invoice|packing\s+date)\s*[:#]?(.*)$"
    ).unwrap();

    pub static ref DEPARTURE_DATE: Regex = Regex::new(
        r"(?im)(?:shipped\s+on\s+board(?:\s+date)?|on\s+board\s+date|laden\s+on\s+board|date\s+of\s+shipment|shipment\s+date|departure\s+date|date\s+of\s+departure|sailing\s+date|\bETD\b)\s*[:#]?(.*)$"
    ).unwrap();

    pub static ref CERTIFICATION_DATE: Regex = Regex::new(
        r"(?im)(?:date\s+of\s+signature|signed\s+on|date\s+of\s+certification|certification\s+date|date\s+of\s+issue|issue\s+date|done\s+at\s+[^\n]*?\bon\b)\s*[:#]?(.*)$"
    ).unwrap();

    pub static ref EXPIRY_DATE: Regex = Regex::new(
        r"(?im)(?:expiry\s+date|date\s+of\s+expiry|expiration\s+date|expires(?:\s+on)?|valid\s+until|valid\s+to)\s*[:#]?(.*)$"
    ).unwrap();

    // References
    pub static ref CHED_REFERENCE: Regex = Regex::new(
        r"(?i)\b(CHED(?:-?(?:A|PP|P|D))?\.[A-Z]{2}\.\d{4}\.\d{7})\b"
    ).unwrap();

    pub static ref TRACES_LABELED: Regex = Regex::new(
        r"(?i)\btraces\b[^\n:#]{0,20}[:#]\s*([A-Z0-9][A-Z0-9.\-/]{5,40})"
    ).unwrap();

    pub static ref CERTIFICATE_NUMBER: Regex = Regex::new(
        r"(?i)\b(?:certificate|cert\.?)\s*(?:no\.?|number|nr\.?|#|reference|ref\.?)\s*[:#]?\s*([A-Z0-9][A-Z0-9.\-/]{3,40})"
    ).unwrap();
}
