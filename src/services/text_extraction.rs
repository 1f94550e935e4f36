use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::NoTextReason;
use crate::models::MediaKind;
use crate::services::ocr::OcrClient;
use crate::utils::normalize_whitespace;

/// Anything shorter is a scanned document with no real text layer, not a
/// successful extraction.
const MIN_NATIVE_TEXT_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Native,
    RemoteOcr,
    FilenameHeuristic,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Native => "native",
            Strategy::RemoteOcr => "remote-ocr",
            Strategy::FilenameHeuristic => "filename-heuristic",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilenameHints {
    pub manufacturer: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    /// A usable, whitespace-normalized text block.
    Text { text: String, strategy: Strategy },
    /// Last resort: structured hints from the filename, never a text block.
    Hints(FilenameHints),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractError {
    /// Raster image and no recognition service configured at all.
    OcrNotEntitled,
    /// Every applicable strategy ran and produced nothing.
    NoText(NoTextReason),
}

static RE_FILENAME_MANUFACTURER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(petzl|camp|beal|edelrid|kask|skylotec|singing.?rock)\b").unwrap()
});

static RE_FILENAME_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z]\d{3}[A-Z]{0,2}\d{0,4})\b").unwrap());

/// Runs the strategy chain: native text layer, then remote OCR, then the
/// filename heuristic. Each step is attempted only when the previous one
/// failed or does not apply, and a native success short-circuits before any
/// network call.
pub async fn extract(
    bytes: &[u8],
    kind: MediaKind,
    filename: &str,
    ocr: Option<&OcrClient>,
) -> Result<ExtractionOutcome, ExtractError> {
    if kind == MediaKind::NativeText {
        if let Some(text) = native_text(bytes) {
            return Ok(ExtractionOutcome::Text {
                text,
                strategy: Strategy::Native,
            });
        }
        tracing::info!("no usable text layer, falling through to remote OCR");
    }

    if let Some(ocr) = ocr {
        match ocr.recognize(bytes, kind).await {
            Ok(Some(text)) if !text.trim().is_empty() => {
                return Ok(ExtractionOutcome::Text {
                    text: normalize_whitespace(&text),
                    strategy: Strategy::RemoteOcr,
                });
            }
            Ok(_) => tracing::warn!("OCR returned no text, falling through"),
            Err(err) => tracing::warn!("OCR call failed, falling through: {err:#}"),
        }
    }

    if let Some(hints) = filename_hints(filename) {
        return Ok(ExtractionOutcome::Hints(hints));
    }

    if kind == MediaKind::RasterImage && ocr.is_none() {
        return Err(ExtractError::OcrNotEntitled);
    }
    Err(ExtractError::NoText(match kind {
        MediaKind::NativeText => NoTextReason::ScannedNoTextLayer,
        MediaKind::RasterImage => NoTextReason::OcrNotAvailable,
    }))
}

fn native_text(bytes: &[u8]) -> Option<String> {
    match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) => {
            let normalized = normalize_whitespace(&text);
            if normalized.len() >= MIN_NATIVE_TEXT_LEN {
                Some(normalized)
            } else {
                None
            }
        }
        Err(err) => {
            tracing::info!("native extraction failed: {err}");
            None
        }
    }
}

/// Coarse pattern matching against the original filename; recovers a
/// manufacturer and/or reference hint when no strategy produced text.
pub fn filename_hints(filename: &str) -> Option<FilenameHints> {
    let stem = filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename)
        .replace(['_', '-'], " ");

    let manufacturer = RE_FILENAME_MANUFACTURER.captures(&stem).map(|c| {
        let raw = &c[1];
        let mut chars = raw.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
            None => raw.to_string(),
        }
    });
    let reference = RE_FILENAME_REFERENCE
        .captures(&stem)
        .map(|c| c[1].to_string());

    if manufacturer.is_none() && reference.is_none() {
        return None;
    }
    Some(FilenameHints {
        manufacturer,
        reference,
    })
}
