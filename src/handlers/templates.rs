use anyhow::anyhow;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::{Template, TemplateSection};
use crate::services::state::AppState;
use crate::utils::now_rfc3339;

use super::ApiJson;

#[derive(Deserialize)]
pub struct TemplatePayload {
    pub name: String,
    pub sections: Vec<TemplateSection>,
}

pub async fn create_template(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<TemplatePayload>,
) -> Result<Json<Template>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("template name is required".to_string()));
    }

    let template = Template {
        id: uuid::Uuid::new_v4().to_string(),
        name: payload.name,
        sections: payload.sections,
        created_at: now_rfc3339(),
    };

    let db = state
        .db
        .lock()
        .map_err(|_| ApiError::Internal(anyhow!("DB lock poisoned")))?;
    db.insert_template(&template)
        .map_err(|e| ApiError::Internal(e.into()))?;
    Ok(Json(template))
}

pub async fn get_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Template>, ApiError> {
    let db = state
        .db
        .lock()
        .map_err(|_| ApiError::Internal(anyhow!("DB lock poisoned")))?;
    db.get_template_by_id(&id)
        .map_err(|e| ApiError::Internal(e.into()))?
        .map(Json)
        .ok_or(ApiError::NotFound("template"))
}
