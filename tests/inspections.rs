use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue};

use equiptrace::config::Config;
use equiptrace::db::Database;
use equiptrace::handlers::inspections::duplicate_inspection;
use equiptrace::models::{
    CheckStatus, InspectionRecord, InspectionSchema, SectionMap, SubsectionEntry,
};
use equiptrace::services::state::AppState;

fn test_state() -> Arc<AppState> {
    let data_dir: PathBuf =
        std::env::temp_dir().join(format!("equiptrace-test-{}", uuid::Uuid::new_v4()));
    let config = Config {
        listen_addr: "127.0.0.1:0".to_string(),
        base_url: "http://localhost:3000".to_string(),
        data_dir,
        ocr_endpoint: None,
        ocr_api_key: None,
        ocr_timeout_secs: 1,
        max_upload_bytes: 1024,
    };
    let db = Database::in_memory().expect("in-memory db");
    Arc::new(AppState::new(db, config).expect("state"))
}

fn operator_headers(name: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-operator", HeaderValue::from_str(name).unwrap());
    headers
}

/// A stored record whose sections still carry one pristine template default
/// next to one entry an operator actually touched.
fn source_record() -> InspectionRecord {
    let mut subsections = BTreeMap::new();
    subsections.insert(
        "left_default".to_string(),
        SubsectionEntry {
            status: CheckStatus::V,
            comment: None,
            crossed_words: Vec::new(),
        },
    );
    subsections.insert(
        "marked".to_string(),
        SubsectionEntry {
            status: CheckStatus::X,
            comment: Some("cracked shell".to_string()),
            crossed_words: Vec::new(),
        },
    );
    let mut sections: SectionMap = BTreeMap::new();
    sections.insert("shell".to_string(), subsections);

    InspectionRecord {
        id: "insp-src".to_string(),
        equipment_code: Some("TESTCODE234567".to_string()),
        reference: Some("A010CA12".to_string()),
        serial_number: Some("23H0042517".to_string()),
        manufacture_date: None,
        purchase_date: None,
        first_use_date: None,
        size: None,
        overall_result: "OK".to_string(),
        last_inspection_date: Some("01/06/2026".to_string()),
        schema: InspectionSchema::Templated {
            template_id: "tpl-1".to_string(),
            sections,
        },
        created_by: "original-inspector".to_string(),
        created_at: "2026-01-01T00:00:00Z".to_string(),
        updated_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

#[tokio::test]
async fn duplicating_mints_a_new_identity_and_refilters_sections() {
    let state = test_state();
    {
        let db = state.db.lock().unwrap();
        db.upsert_inspection(&source_record()).unwrap();
    }

    let copy = duplicate_inspection(
        State(state.clone()),
        Path("insp-src".to_string()),
        operator_headers("duplicator"),
    )
    .await
    .expect("duplicated inspection")
    .0;

    // Fresh identity and audit fields.
    assert_ne!(copy.record.id, "insp-src");
    assert_eq!(copy.record.created_by, "duplicator");
    assert_ne!(copy.record.created_at, "2026-01-01T00:00:00Z");
    assert_eq!(copy.record.created_at, copy.record.updated_at);

    // Scalar content carries over untouched.
    assert_eq!(copy.record.equipment_code.as_deref(), Some("TESTCODE234567"));
    assert_eq!(copy.record.overall_result, "OK");

    // The copy goes through the sparse filter again: pristine defaults are
    // dropped, real findings survive.
    match &copy.record.schema {
        InspectionSchema::Templated { template_id, sections } => {
            assert_eq!(template_id, "tpl-1");
            let shell = sections.get("shell").expect("shell section kept");
            assert!(shell.contains_key("marked"));
            assert!(!shell.contains_key("left_default"));
        }
        InspectionSchema::Legacy { .. } => panic!("copy lost its template"),
    }

    // The source stays exactly as stored.
    let db = state.db.lock().unwrap();
    let stored = db
        .get_inspection_by_id("insp-src")
        .unwrap()
        .expect("source still present");
    match stored.schema {
        InspectionSchema::Templated { sections, .. } => {
            assert!(sections["shell"].contains_key("left_default"));
        }
        InspectionSchema::Legacy { .. } => panic!("source lost its template"),
    }

    // Both rows are now listed.
    assert_eq!(db.get_inspections().unwrap().len(), 2);
}

#[tokio::test]
async fn duplicating_a_missing_inspection_is_not_found() {
    let state = test_state();
    let err = duplicate_inspection(
        State(state),
        Path("no-such-id".to_string()),
        operator_headers("duplicator"),
    )
    .await
    .map(|_| ())
    .unwrap_err();
    assert!(matches!(
        err,
        equiptrace::error::ApiError::NotFound("inspection")
    ));
}
