use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Reason reported when every extraction strategy came up empty. Callers
/// turn this into an actionable message, so the variant must say what was
/// actually missing rather than "extraction failed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoTextReason {
    /// Raster image and no remote recognition entitlement/endpoint.
    OcrNotAvailable,
    /// Native document whose text layer was absent or unusable.
    ScannedNoTextLayer,
}

impl NoTextReason {
    pub fn code(self) -> &'static str {
        match self {
            NoTextReason::OcrNotAvailable => "OCR_NOT_AVAILABLE",
            NoTextReason::ScannedNoTextLayer => "SCANNED_NO_TEXT_LAYER",
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("document is {actual} bytes, the maximum accepted size is {limit} bytes")]
    PayloadTooLarge { actual: usize, limit: usize },

    #[error("unsupported media kind: {0}")]
    UnsupportedMediaKind(String),

    #[error("optical recognition is not available for this account")]
    ExtractionUnavailable,

    #[error("no text could be recovered from the document ({})", .0.code())]
    NoTextRecoverable(NoTextReason),

    #[error("registry code allocation kept colliding; the id space looks misconfigured")]
    RegistryCollision,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::PayloadTooLarge { .. } => "PayloadTooLarge",
            ApiError::UnsupportedMediaKind(_) => "UnsupportedMediaKind",
            ApiError::ExtractionUnavailable => "ExtractionUnavailable",
            ApiError::NoTextRecoverable(_) => "NoTextRecoverable",
            ApiError::RegistryCollision => "RegistryCollision",
            ApiError::NotFound(_) => "NotFound",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::Internal(_) => "Internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaKind(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::ExtractionUnavailable => StatusCode::PAYMENT_REQUIRED,
            ApiError::NoTextRecoverable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::RegistryCollision => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn suggestion(&self) -> &'static str {
        match self {
            ApiError::PayloadTooLarge { .. } => {
                "Compress the PDF or export it at a lower resolution before uploading."
            }
            ApiError::UnsupportedMediaKind(_) => {
                "Declare the document as 'native-text' or 'raster-image'."
            }
            ApiError::ExtractionUnavailable => {
                "Upload a PDF with selectable text, or enable optical recognition for this account."
            }
            ApiError::NoTextRecoverable(NoTextReason::OcrNotAvailable) => {
                "Upload a PDF with selectable text, or enable optical recognition for this account."
            }
            ApiError::NoTextRecoverable(NoTextReason::ScannedNoTextLayer) => {
                "This looks like a scan with no text layer. Upload a PDF with selectable text instead."
            }
            ApiError::RegistryCollision => {
                "Contact the administrator; the code generator needs attention."
            }
            ApiError::NotFound(_) => "Check the identifier and try again.",
            ApiError::BadRequest(_) => "Check the request body and try again.",
            ApiError::Internal(_) => "Retry the request; resubmitting an upload is safe and mints a new record.",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "request failed: {:#}", self);
        } else {
            tracing::warn!(kind = self.kind(), "request rejected: {}", self);
        }
        let body = json!({
            "code": self.kind(),
            "message": self.to_string(),
            "suggestion": self.suggestion(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            ApiError::PayloadTooLarge { actual: 15_000_000, limit: 10_485_760 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::ExtractionUnavailable.status(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            ApiError::NoTextRecoverable(NoTextReason::ScannedNoTextLayer).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn every_error_carries_a_suggestion() {
        let errors = [
            ApiError::PayloadTooLarge { actual: 1, limit: 0 },
            ApiError::UnsupportedMediaKind("tiff".into()),
            ApiError::ExtractionUnavailable,
            ApiError::NoTextRecoverable(NoTextReason::OcrNotAvailable),
            ApiError::RegistryCollision,
            ApiError::NotFound("equipment"),
        ];
        for err in errors {
            assert!(!err.suggestion().is_empty());
        }
    }
}
