use anyhow::anyhow;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::Json;
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::{EquipmentRecord, EquipmentSummary};
use crate::services::processor::{self, IngestResult};
use crate::services::registry;
use crate::services::state::AppState;

use super::{operator, ApiJson};

#[derive(Deserialize)]
pub struct IngestPayload {
    pub filename: String,
    pub kind: String,
    pub data_base64: String,
}

pub async fn ingest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<IngestPayload>,
) -> Result<Json<IngestResult>, ApiError> {
    let bytes = general_purpose::STANDARD
        .decode(payload.data_base64.as_bytes())
        .map_err(|e| ApiError::BadRequest(format!("data_base64 is not valid base64: {e}")))?;

    let created_by = operator(&headers);
    let result =
        processor::ingest_document(&state, bytes, &payload.kind, &payload.filename, &created_by)
            .await?;
    Ok(Json(result))
}

pub async fn get_equipment(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<EquipmentRecord>, ApiError> {
    let db = state
        .db
        .lock()
        .map_err(|_| ApiError::Internal(anyhow!("DB lock poisoned")))?;
    registry::lookup(&db, &code)?
        .map(Json)
        .ok_or(ApiError::NotFound("equipment"))
}

pub async fn list_equipment(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<EquipmentSummary>>, ApiError> {
    let db = state
        .db
        .lock()
        .map_err(|_| ApiError::Internal(anyhow!("DB lock poisoned")))?;
    let summaries = db
        .get_equipment_summaries()
        .map_err(|e| ApiError::Internal(e.into()))?;
    Ok(Json(summaries))
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state
        .store
        .fetch(&name)
        .map_err(|_| ApiError::NotFound("document"))?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    ))
}
