pub mod equipment;
pub mod inspections;
pub mod templates;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, FromRequest, Request};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

use crate::error::ApiError;
use crate::services::state::AppState;

pub fn app_router(state: Arc<AppState>) -> Router {
    // Base64 inflates uploads by a third; leave headroom so the handler's
    // own size gate produces the structured 413 body.
    let body_limit = state.config.max_upload_bytes * 2;

    Router::new()
        .route("/health", get(health))
        .route(
            "/equipment",
            post(equipment::ingest).get(equipment::list_equipment),
        )
        .route("/equipment/:code", get(equipment::get_equipment))
        .route("/documents/:name", get(equipment::get_document))
        .route(
            "/inspections",
            post(inspections::create_inspection).get(inspections::list_inspections),
        )
        .route(
            "/inspections/:id",
            get(inspections::get_inspection).put(inspections::update_inspection),
        )
        .route(
            "/inspections/:id/duplicate",
            post(inspections::duplicate_inspection),
        )
        .route("/templates", post(templates::create_template))
        .route("/templates/:id", get(templates::get_template))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Caller identity comes from the fronting auth layer; out of scope here
/// beyond picking up the forwarded header.
pub(crate) fn operator(headers: &HeaderMap) -> String {
    headers
        .get("x-operator")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// `Json` with its rejections mapped into [`ApiError`], so a malformed body
/// gets the same `{code, message, suggestion}` shape as every other failure
/// instead of axum's plain-text rejection.
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;

    use crate::handlers::inspections::InspectionPayload;

    fn json_request(body: &'static str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn unparseable_body_becomes_a_structured_bad_request() {
        let err = ApiJson::<InspectionPayload>::from_request(json_request("{not json"), &())
            .await
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(!err.suggestion().is_empty());
    }

    #[tokio::test]
    async fn body_missing_the_schema_tag_becomes_a_structured_bad_request() {
        let err = ApiJson::<InspectionPayload>::from_request(
            json_request(r#"{"overall_result": "OK"}"#),
            &(),
        )
        .await
        .map(|_| ())
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
