use anyhow::anyhow;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::{ComplianceState, InspectionRecord, InspectionSchema, InspectionSummary};
use crate::services::state::AppState;
use crate::services::validity;
use crate::utils::now_rfc3339;

use super::{operator, ApiJson};

#[derive(Deserialize)]
pub struct InspectionPayload {
    pub equipment_code: Option<String>,
    pub reference: Option<String>,
    pub serial_number: Option<String>,
    pub manufacture_date: Option<String>,
    pub purchase_date: Option<String>,
    pub first_use_date: Option<String>,
    pub size: Option<String>,
    #[serde(default)]
    pub overall_result: String,
    pub last_inspection_date: Option<String>,
    #[serde(flatten)]
    pub schema: InspectionSchema,
}

/// Read view: the compliance flag is derived fresh on every read and never
/// stored.
#[derive(Serialize)]
pub struct InspectionView {
    #[serde(flatten)]
    pub record: InspectionRecord,
    pub compliance: ComplianceState,
}

fn view(record: InspectionRecord) -> InspectionView {
    let compliance = validity::record_compliance(&record, Utc::now().date_naive());
    InspectionView { record, compliance }
}

fn record_from_payload(
    payload: InspectionPayload,
    id: String,
    created_by: String,
    created_at: String,
) -> InspectionRecord {
    InspectionRecord {
        id,
        equipment_code: payload.equipment_code,
        reference: payload.reference,
        serial_number: payload.serial_number,
        manufacture_date: payload.manufacture_date,
        purchase_date: payload.purchase_date,
        first_use_date: payload.first_use_date,
        size: payload.size,
        overall_result: payload.overall_result,
        last_inspection_date: payload.last_inspection_date,
        // Untouched subsections are dropped at write time, always.
        schema: validity::filter_schema(payload.schema),
        created_by,
        created_at,
        updated_at: now_rfc3339(),
    }
}

pub async fn create_inspection(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<InspectionPayload>,
) -> Result<Json<InspectionView>, ApiError> {
    let record = record_from_payload(
        payload,
        uuid::Uuid::new_v4().to_string(),
        operator(&headers),
        now_rfc3339(),
    );

    let db = state
        .db
        .lock()
        .map_err(|_| ApiError::Internal(anyhow!("DB lock poisoned")))?;
    db.upsert_inspection(&record)
        .map_err(|e| ApiError::Internal(e.into()))?;
    Ok(Json(view(record)))
}

pub async fn update_inspection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<InspectionPayload>,
) -> Result<Json<InspectionView>, ApiError> {
    let db = state
        .db
        .lock()
        .map_err(|_| ApiError::Internal(anyhow!("DB lock poisoned")))?;
    let existing = db
        .get_inspection_by_id(&id)
        .map_err(|e| ApiError::Internal(e.into()))?
        .ok_or(ApiError::NotFound("inspection"))?;

    // Full replacement; identity and creation audit survive.
    let record = record_from_payload(payload, existing.id, existing.created_by, existing.created_at);
    db.upsert_inspection(&record)
        .map_err(|e| ApiError::Internal(e.into()))?;
    Ok(Json(view(record)))
}

pub async fn duplicate_inspection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<InspectionView>, ApiError> {
    let db = state
        .db
        .lock()
        .map_err(|_| ApiError::Internal(anyhow!("DB lock poisoned")))?;
    let source = db
        .get_inspection_by_id(&id)
        .map_err(|e| ApiError::Internal(e.into()))?
        .ok_or(ApiError::NotFound("inspection"))?;

    // Copy without identity or audit fields; the sections go through the
    // sparse filter again.
    let now = now_rfc3339();
    let copy = InspectionRecord {
        id: uuid::Uuid::new_v4().to_string(),
        equipment_code: source.equipment_code,
        reference: source.reference,
        serial_number: source.serial_number,
        manufacture_date: source.manufacture_date,
        purchase_date: source.purchase_date,
        first_use_date: source.first_use_date,
        size: source.size,
        overall_result: source.overall_result,
        last_inspection_date: source.last_inspection_date,
        schema: validity::filter_schema(source.schema),
        created_by: operator(&headers),
        created_at: now.clone(),
        updated_at: now,
    };
    db.upsert_inspection(&copy)
        .map_err(|e| ApiError::Internal(e.into()))?;
    Ok(Json(view(copy)))
}

pub async fn get_inspection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<InspectionView>, ApiError> {
    let db = state
        .db
        .lock()
        .map_err(|_| ApiError::Internal(anyhow!("DB lock poisoned")))?;
    let record = db
        .get_inspection_by_id(&id)
        .map_err(|e| ApiError::Internal(e.into()))?
        .ok_or(ApiError::NotFound("inspection"))?;
    Ok(Json(view(record)))
}

pub async fn list_inspections(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<InspectionSummary>>, ApiError> {
    let db = state
        .db
        .lock()
        .map_err(|_| ApiError::Internal(anyhow!("DB lock poisoned")))?;
    let today = Utc::now().date_naive();
    let summaries = db
        .get_inspections()
        .map_err(|e| ApiError::Internal(e.into()))?
        .into_iter()
        .map(|record| InspectionSummary {
            compliance: validity::record_compliance(&record, today),
            id: record.id,
            equipment_code: record.equipment_code,
            reference: record.reference,
            overall_result: record.overall_result,
            last_inspection_date: record.last_inspection_date,
            updated_at: record.updated_at,
        })
        .collect();
    Ok(Json(summaries))
}
