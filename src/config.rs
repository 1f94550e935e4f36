use std::env;
use std::path::PathBuf;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    /// Public base URL embedded in lookup links and document URLs.
    pub base_url: String,
    pub data_dir: PathBuf,
    pub ocr_endpoint: Option<String>,
    pub ocr_api_key: Option<String>,
    pub ocr_timeout_secs: u64,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let data_dir = env::var("EQUIPTRACE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        Config {
            listen_addr: env::var("EQUIPTRACE_LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            base_url: env::var("EQUIPTRACE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            data_dir,
            ocr_endpoint: env::var("EQUIPTRACE_OCR_ENDPOINT").ok(),
            ocr_api_key: env::var("EQUIPTRACE_OCR_API_KEY").ok(),
            ocr_timeout_secs: env::var("EQUIPTRACE_OCR_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            max_upload_bytes: env::var("EQUIPTRACE_MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        }
    }
}
