use anyhow::anyhow;
use serde::Serialize;

use crate::error::ApiError;
use crate::models::{EquipmentRecord, MediaKind};
use crate::services::field_parser;
use crate::services::registry;
use crate::services::state::AppState;
use crate::services::text_extraction::{self, ExtractError, ExtractionOutcome, Strategy};
use crate::utils::sha256_bytes;

#[derive(Debug, Serialize)]
pub struct IngestResult {
    #[serde(flatten)]
    pub record: EquipmentRecord,
    pub lookup_url: String,
}

/// The ingestion pipeline: size gate, document store, extraction chain,
/// field parsing, registry write, audit log. Failures before the registry
/// write are recovered into structured errors; the write itself is
/// append-only, so the caller may safely resubmit after any failure.
pub async fn ingest_document(
    state: &AppState,
    bytes: Vec<u8>,
    kind_raw: &str,
    filename: &str,
    created_by: &str,
) -> Result<IngestResult, ApiError> {
    // Every attempt leaves an audit row, including ones rejected before
    // extraction.
    let file_hash = sha256_bytes(&bytes);

    let kind = match MediaKind::parse(kind_raw) {
        Some(kind) => kind,
        None => {
            log_outcome(state, None, &file_hash, "failed", Some("unsupported media kind"));
            return Err(ApiError::UnsupportedMediaKind(kind_raw.to_string()));
        }
    };

    // Rejected before any storage or extraction work.
    if bytes.len() > state.config.max_upload_bytes {
        log_outcome(state, None, &file_hash, "failed", Some("payload too large"));
        return Err(ApiError::PayloadTooLarge {
            actual: bytes.len(),
            limit: state.config.max_upload_bytes,
        });
    }

    let document_url = match state.store.store(&bytes, filename) {
        Ok(url) => url,
        Err(err) => {
            log_outcome(state, None, &file_hash, "failed", Some("document store write failed"));
            return Err(ApiError::Internal(err));
        }
    };

    let outcome = match text_extraction::extract(&bytes, kind, filename, state.ocr.as_ref()).await
    {
        Ok(outcome) => outcome,
        Err(err) => {
            log_outcome(state, None, &file_hash, "failed", Some(&format!("{err:?}")));
            return Err(match err {
                ExtractError::OcrNotEntitled => ApiError::ExtractionUnavailable,
                ExtractError::NoText(reason) => ApiError::NoTextRecoverable(reason),
            });
        }
    };

    let (fields, strategy) = match outcome {
        ExtractionOutcome::Text { text, strategy } => (field_parser::parse(&text), strategy),
        ExtractionOutcome::Hints(hints) => (
            field_parser::from_filename_hints(&hints),
            Strategy::FilenameHeuristic,
        ),
    };

    let record = {
        let db = state
            .db
            .lock()
            .map_err(|_| ApiError::Internal(anyhow!("DB lock poisoned")))?;
        registry::register(&db, fields, &document_url, created_by)?
    };

    tracing::info!(
        code = %record.code,
        strategy = strategy.as_str(),
        confidence = record.fields.confidence,
        "registered equipment"
    );
    log_outcome(
        state,
        Some(&record.code),
        &file_hash,
        "success",
        Some(strategy.as_str()),
    );

    let lookup_url = registry::lookup_url(&state.config.base_url, &record.code);
    Ok(IngestResult { record, lookup_url })
}

fn log_outcome(
    state: &AppState,
    code: Option<&str>,
    file_hash: &str,
    status: &str,
    message: Option<&str>,
) {
    // Audit logging must never mask the real outcome.
    if let Ok(db) = state.db.lock() {
        if let Err(err) = db.log_processing(code, Some(file_hash), "ingest", status, message) {
            tracing::warn!("processing log write failed: {err}");
        }
    }
}
