use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::models::MediaKind;

/// Responses shorter than this are noise (page numbers, stray labels), not a
/// transcription.
const MIN_RECOGNIZED_LEN: usize = 50;

#[derive(Serialize)]
struct RecognizeRequest {
    document: String,
    media_type: String,
    mode: String,
}

/// Client for the external optical-recognition service. The response shape
/// is treated as untrusted: documented keys are tried first, then a generic
/// search over the JSON tree.
pub struct OcrClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl OcrClient {
    pub fn new(endpoint: String, api_key: Option<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| anyhow!("OCR client init: {}", e))?;
        Ok(OcrClient {
            client,
            endpoint,
            api_key,
        })
    }

    /// Submits the document for a full-page transcription. Native documents
    /// go up as-is; the service rasterizes server-side. A timeout surfaces
    /// as an Err and is handled like any other OCR unavailability.
    pub async fn recognize(&self, bytes: &[u8], kind: MediaKind) -> Result<Option<String>> {
        let request = RecognizeRequest {
            document: general_purpose::STANDARD.encode(bytes),
            media_type: match kind {
                MediaKind::NativeText => "application/pdf".to_string(),
                MediaKind::RasterImage => "image/*".to_string(),
            },
            mode: "full-page".to_string(),
        };

        let mut call = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }

        let response = call.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("OCR service error {}: {}", status, body));
        }

        let body: Value = response.json().await?;
        Ok(extract_text_from_response(&body))
    }
}

/// Pulls the transcription out of a polymorphic response: documented keys
/// first, then the longest sufficiently-long string anywhere in the tree.
pub fn extract_text_from_response(body: &Value) -> Option<String> {
    let documented = [
        &body["text"],
        &body["fullTextAnnotation"]["text"],
        &body["responses"][0]["fullTextAnnotation"]["text"],
        &body["ParsedResults"][0]["ParsedText"],
    ];
    for candidate in documented {
        if let Some(text) = candidate.as_str() {
            if !text.trim().is_empty() {
                return Some(text.to_string());
            }
        }
    }

    longest_string(body)
        .filter(|s| s.len() > MIN_RECOGNIZED_LEN)
        .map(|s| s.to_string())
}

/// Depth-first walk for the longest string value in an untyped JSON tree.
fn longest_string(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s.as_str()),
        Value::Array(items) => items
            .iter()
            .filter_map(longest_string)
            .max_by_key(|s| s.len()),
        Value::Object(map) => map
            .values()
            .filter_map(longest_string)
            .max_by_key(|s| s.len()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn documented_keys_win() {
        let body = json!({"text": "the transcription", "other": "x".repeat(200)});
        assert_eq!(
            extract_text_from_response(&body).as_deref(),
            Some("the transcription")
        );
    }

    #[test]
    fn nested_documented_keys_are_tried() {
        let long = "recognized page content ".repeat(5);
        let body = json!({"responses": [{"fullTextAnnotation": {"text": long}}]});
        assert!(extract_text_from_response(&body).is_some());

        let body = json!({"ParsedResults": [{"ParsedText": "scanned words here"}]});
        assert_eq!(
            extract_text_from_response(&body).as_deref(),
            Some("scanned words here")
        );
    }

    #[test]
    fn falls_back_to_longest_string_in_unknown_shapes() {
        let long = "a".repeat(120);
        let body = json!({
            "status": "done",
            "result": {"pages": [{"blocks": ["short", long.clone()]}]}
        });
        assert_eq!(extract_text_from_response(&body).as_deref(), Some(long.as_str()));
    }

    #[test]
    fn short_strings_are_not_a_transcription() {
        let body = json!({"status": "ok", "note": "too short"});
        assert_eq!(extract_text_from_response(&body), None);
    }

    #[test]
    fn empty_or_scalar_bodies_yield_nothing() {
        assert_eq!(extract_text_from_response(&json!({})), None);
        assert_eq!(extract_text_from_response(&json!(42)), None);
        assert_eq!(extract_text_from_response(&json!(null)), None);
    }
}
