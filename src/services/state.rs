use anyhow::Result;
use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::db::Database;
use crate::services::document_store::DocumentStore;
use crate::services::ocr::OcrClient;

pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub config: Config,
    pub store: DocumentStore,
    /// None means no recognition entitlement; the extractor falls through.
    pub ocr: Option<OcrClient>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Result<Self> {
        let store = DocumentStore::new(
            config.data_dir.join("documents"),
            config.base_url.clone(),
            config.max_upload_bytes,
        )?;

        let ocr = match &config.ocr_endpoint {
            Some(endpoint) => Some(OcrClient::new(
                endpoint.clone(),
                config.ocr_api_key.clone(),
                config.ocr_timeout_secs,
            )?),
            None => None,
        };

        Ok(AppState {
            db: Arc::new(Mutex::new(db)),
            config,
            store,
            ocr,
        })
    }
}
