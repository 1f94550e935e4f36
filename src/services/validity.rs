use chrono::{Months, NaiveDate};

use crate::models::{ComplianceState, InspectionRecord, InspectionSchema, SectionMap};

/// Overall-result value that counts as conforming. Anything else, including
/// an empty string, quarantines the item.
pub const RESULT_OK: &str = "OK";

/// Detailed inspections recur every 6 calendar months.
const INSPECTION_INTERVAL_MONTHS: u32 = 6;

const FRENCH_MONTHS: [&str; 12] = [
    "janvier", "fevrier", "mars", "avril", "mai", "juin", "juillet", "aout",
    "septembre", "octobre", "novembre", "decembre",
];

const ENGLISH_MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august",
    "september", "october", "november", "december",
];

/// Parses the date shapes operators actually enter: `DD/MM/YYYY`,
/// `DD.MM.YYYY`, ISO `YYYY-MM-DD`, and long dates with French or English
/// month names ("12 janvier 2024"). Returns None instead of erroring so the
/// compliance rule can fail closed.
pub fn parse_inspection_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let formats = ["%d/%m/%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d"];
    for fmt in formats.iter() {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date);
        }
    }

    parse_long_date(trimmed)
}

fn parse_long_date(text: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = text.split_whitespace().collect();
    if parts.len() != 3 {
        return None;
    }

    // "1er janvier 2024" is common in French sources.
    let day_part = parts[0].trim_end_matches("er");
    let day: u32 = day_part.parse().ok()?;
    let year: i32 = parts[2].parse().ok()?;
    let month = month_number(parts[1])?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_number(name: &str) -> Option<u32> {
    let folded: String = name
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'é' | 'è' | 'ê' => 'e',
            'û' | 'ù' => 'u',
            'à' | 'â' => 'a',
            'î' => 'i',
            'ô' => 'o',
            other => other,
        })
        .collect();

    for table in [&FRENCH_MONTHS, &ENGLISH_MONTHS] {
        if let Some(idx) = table.iter().position(|m| *m == folded) {
            return Some(idx as u32 + 1);
        }
    }
    None
}

/// True when the last detailed inspection is no older than the recurrence
/// window. Unparseable input is treated as out of date, never as an error.
pub fn is_currently_valid(date_text: &str, today: NaiveDate) -> bool {
    match parse_inspection_date(date_text) {
        Some(date) => match date.checked_add_months(Months::new(INSPECTION_INTERVAL_MONTHS)) {
            Some(due) => due >= today,
            None => false,
        },
        None => false,
    }
}

/// The read-time compliance derivation: the declared result must be the
/// explicit OK value and the inspection date must be inside the window.
/// Recomputed on every read, never persisted.
pub fn compliance_state(
    overall_result: &str,
    last_inspection_date: Option<&str>,
    today: NaiveDate,
) -> ComplianceState {
    let in_window = last_inspection_date
        .map(|d| is_currently_valid(d, today))
        .unwrap_or(false);

    if overall_result == RESULT_OK && in_window {
        ComplianceState::Valid
    } else {
        ComplianceState::Quarantined
    }
}

pub fn record_compliance(record: &InspectionRecord, today: NaiveDate) -> ComplianceState {
    compliance_state(
        &record.overall_result,
        record.last_inspection_date.as_deref(),
        today,
    )
}

/// Write-time sparse filter: only subsections the operator actually touched
/// are persisted. Untouched entries are dropped so that widening a template
/// never fabricates data on old records; at read time, presence alone means
/// "real data".
pub fn filter_sections(sections: SectionMap) -> SectionMap {
    sections
        .into_iter()
        .map(|(section_id, subsections)| {
            let kept = subsections
                .into_iter()
                .filter(|(_, entry)| entry.is_touched())
                .collect::<std::collections::BTreeMap<_, _>>();
            (section_id, kept)
        })
        .filter(|(_, subsections)| !subsections.is_empty())
        .collect()
}

/// Runs the sparse filter on a templated schema; legacy findings pass
/// through untouched.
pub fn filter_schema(schema: InspectionSchema) -> InspectionSchema {
    match schema {
        InspectionSchema::Templated { template_id, sections } => InspectionSchema::Templated {
            template_id,
            sections: filter_sections(sections),
        },
        legacy => legacy,
    }
}
