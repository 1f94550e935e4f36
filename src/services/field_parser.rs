use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::ExtractedFields;
use crate::services::text_extraction::FilenameHints;

/// Confidence reported when a native or OCR pass actually produced the text.
/// The filename-heuristic path reports 0.
const TEXT_CONFIDENCE: u8 = 85;

static RE_PRODUCT_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bprodu(?:ct|it)\s*:?\s*([A-Z0-9][A-Z0-9 \-]{2,40})").unwrap()
});

// Two or more consecutive all-caps words, the way product names appear on
// declaration-of-conformity headers.
static RE_PRODUCT_CAPS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Z]{3,}\d*(?:\s+[A-Z]{2,}\d*)+)\b").unwrap()
});

static RE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\br[ée]f(?:[ée]rence)?\.?\s*:?\s*([A-Z0-9][A-Z0-9/\-]{3,})").unwrap()
});

static RE_SERIAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:serial(?:\s+number)?|s/n|n[o°]\s*de\s*s[ée]rie|s[ée]rie)\s*:?\s*([A-Z0-9][A-Z0-9\-]{3,})")
        .unwrap()
});

static RE_STANDARD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:EN|ISO)\s?\d{3,5}(?::\d{4})?\b").unwrap()
});

static RE_MANUFACTURER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b([A-Z][A-Za-z&'.\-]+(?:\s+[A-Z][A-Za-z&'.\-]+)*\s+(?:Distribution|Industries?|Manufacturing|SAS|GmbH|S\.?p\.?A\.?|Ltd|Inc))\b",
    )
    .unwrap()
});

static RE_COUNTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(FRANCE|GERMANY|ITALY|SPAIN|AUSTRIA|SWITZERLAND|UNITED KINGDOM|USA)\b")
        .unwrap()
});

static RE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2}[/.]\d{1,2}[/.]\d{4}|\d{4}-\d{2}-\d{2}|\d{1,2}(?:er)?\s+[A-Za-zéèêûà]{3,9}\s+\d{4})\b")
        .unwrap()
});

static RE_SIGNATORY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[Ss]ign(?:ed|é)e?\s*(?:by|par)?|[Ss]ignataire)\s*:?\s*([A-Z][a-zà-ÿ]+(?:\s+[A-Z][a-zà-ÿ]+)+)")
        .unwrap()
});

// Header words that look like product names but never are.
const PRODUCT_STOPWORDS: [&str; 9] = [
    "DECLARATION",
    "OF",
    "CONFORMITY",
    "CONFORMITE",
    "ATTESTATION",
    "CERTIFICATE",
    "CERTIFICAT",
    "NOTIFIED",
    "EUROPEAN",
];

// Leading qualifiers that precede the actual product name on certificates.
const PRODUCT_NOISE: [&str; 4] = ["PPE", "EPI", "CE", "UE"];

/// Maps normalized certificate text onto the fixed field set. Pure and
/// deterministic; every field that fails to match keeps the sentinel.
pub fn parse(text: &str) -> ExtractedFields {
    let mut fields = ExtractedFields::empty();
    fields.raw_text = text.to_string();
    fields.confidence = TEXT_CONFIDENCE;

    if let Some(product) = find_product(text) {
        fields.product = product;
    }

    let reference = RE_REFERENCE
        .captures(text)
        .map(|c| c[1].trim_end_matches(['/', '-']).to_string());
    let serial = RE_SERIAL
        .captures(text)
        .map(|c| c[1].trim_end_matches('-').to_string());

    // When both are present the persisted reference carries the serial too,
    // so one field distinguishes identical models across physical units.
    match (reference, serial) {
        (Some(r), Some(s)) => {
            fields.internal_reference = format!("{} - {}", r, s);
            fields.serial_number = s;
        }
        (Some(r), None) => fields.internal_reference = r,
        (None, Some(s)) => fields.serial_number = s,
        (None, None) => {}
    }

    let standards: Vec<&str> = RE_STANDARD.find_iter(text).map(|m| m.as_str()).collect();
    if !standards.is_empty() {
        fields.standards = standards.join(" ");
    }

    if let Some(manufacturer) = find_manufacturer(text) {
        fields.manufacturer = manufacturer;
    }

    if let Some(date) = RE_DATE.find(text) {
        fields.issue_date = date.as_str().to_string();
    }

    if let Some(captures) = RE_SIGNATORY.captures(text) {
        fields.signatory = captures[1].to_string();
    }

    fields
}

/// Structured hints recovered from the filename alone; confidence stays 0
/// because no document text backed them.
pub fn from_filename_hints(hints: &FilenameHints) -> ExtractedFields {
    let mut fields = ExtractedFields::empty();
    if let Some(manufacturer) = &hints.manufacturer {
        fields.manufacturer = manufacturer.clone();
    }
    if let Some(reference) = &hints.reference {
        fields.internal_reference = reference.clone();
    }
    fields
}

fn find_product(text: &str) -> Option<String> {
    if let Some(captures) = RE_PRODUCT_LABEL.captures(text) {
        return Some(captures[1].trim().to_string());
    }

    for captures in RE_PRODUCT_CAPS.captures_iter(text) {
        let words: Vec<&str> = captures[1]
            .split_whitespace()
            .skip_while(|w| PRODUCT_NOISE.contains(w))
            .collect();
        if words.is_empty() || words.iter().any(|w| PRODUCT_STOPWORDS.contains(w)) {
            continue;
        }
        return Some(words.join(" "));
    }
    None
}

fn find_manufacturer(text: &str) -> Option<String> {
    let anchor = RE_MANUFACTURER.find(text)?;

    // Extend the match through the address block up to a trailing country
    // name when one follows within a plausible distance.
    let window_end = (anchor.end() + 120).min(text.len());
    let window_end = ceil_char_boundary(text, window_end);
    if let Some(country) = RE_COUNTRY.find(&text[anchor.end()..window_end]) {
        let end = anchor.end() + country.end();
        return Some(text[anchor.start()..end].to_string());
    }
    Some(anchor.as_str().to_string())
}

fn ceil_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NOT_DETECTED;

    const PETZL_CERT: &str = "DECLARATION OF CONFORMITY The manufacturer declares that the PPE \
        VERTEX VENT Référence: A010CA12 No de série: 23H0042517 conforms to EN 397:2012 and \
        EN 12492:2012 Petzl Distribution ZI Cidex 105A 38920 Crolles FRANCE Signed by \
        Bernard Durand on 14/03/2023";

    #[test]
    fn parses_the_conformity_certificate() {
        let fields = parse(PETZL_CERT);
        assert_eq!(fields.product, "VERTEX VENT");
        assert!(fields.internal_reference.contains("A010CA12"));
        assert!(fields.standards.contains("EN 397:2012"));
        assert!(fields.standards.contains("EN 12492:2012"));
        assert!(fields.manufacturer.contains("Petzl Distribution"));
        assert_eq!(fields.issue_date, "14/03/2023");
        assert_eq!(fields.signatory, "Bernard Durand");
        assert_eq!(fields.confidence, 85);
        assert_eq!(fields.raw_text, PETZL_CERT);
    }

    #[test]
    fn reference_and_serial_are_combined_when_both_detected() {
        let fields = parse(PETZL_CERT);
        assert_eq!(fields.internal_reference, "A010CA12 - 23H0042517");
        assert_eq!(fields.serial_number, "23H0042517");
    }

    #[test]
    fn lone_reference_stays_raw() {
        let fields = parse("helmet Référence: A010CA12 conforming to EN 397:2012");
        assert_eq!(fields.internal_reference, "A010CA12");
        assert_eq!(fields.serial_number, NOT_DETECTED);
    }

    #[test]
    fn misses_fall_back_to_the_sentinel() {
        let fields = parse("nothing useful in here at all");
        assert_eq!(fields.product, NOT_DETECTED);
        assert_eq!(fields.internal_reference, NOT_DETECTED);
        assert_eq!(fields.serial_number, NOT_DETECTED);
        assert_eq!(fields.standards, NOT_DETECTED);
        assert_eq!(fields.manufacturer, NOT_DETECTED);
        assert_eq!(fields.issue_date, NOT_DETECTED);
        assert_eq!(fields.signatory, NOT_DETECTED);
        assert_eq!(fields.confidence, 85);
    }

    #[test]
    fn parsing_is_deterministic() {
        assert_eq!(parse(PETZL_CERT), parse(PETZL_CERT));
    }

    #[test]
    fn header_words_are_not_mistaken_for_products() {
        let fields = parse("DECLARATION OF CONFORMITY nothing else capitalized");
        assert_eq!(fields.product, NOT_DETECTED);
    }

    #[test]
    fn filename_hints_report_zero_confidence() {
        let hints = FilenameHints {
            manufacturer: Some("Petzl".to_string()),
            reference: Some("A010CA12".to_string()),
        };
        let fields = from_filename_hints(&hints);
        assert_eq!(fields.manufacturer, "Petzl");
        assert_eq!(fields.internal_reference, "A010CA12");
        assert_eq!(fields.confidence, 0);
        assert_eq!(fields.product, NOT_DETECTED);
    }
}
