use rand::Rng;

use crate::db::Database;
use crate::error::ApiError;
use crate::models::{EquipmentRecord, ExtractedFields};
use crate::utils::now_rfc3339;

/// No 0/O, 1/I/L: codes end up on printed labels and get read back by
/// humans when the scan fails.
const CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";
pub const CODE_LENGTH: usize = 14;

/// A collision on a 14-symbol code from a 31-symbol alphabet means the id
/// space is misconfigured, not bad luck; give up early and loudly.
const MAX_MINT_ATTEMPTS: usize = 5;

pub fn mint_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

pub fn lookup_url(base_url: &str, code: &str) -> String {
    format!("{}/equipment/{}", base_url.trim_end_matches('/'), code)
}

/// Persists a new equipment record under a freshly minted code. Uniqueness
/// rests on the database's unique constraint; a constraint hit regenerates
/// the code and retries.
pub fn register(
    db: &Database,
    fields: ExtractedFields,
    document_url: &str,
    created_by: &str,
) -> Result<EquipmentRecord, ApiError> {
    let mut record = EquipmentRecord {
        id: uuid::Uuid::new_v4().to_string(),
        code: mint_code(),
        fields,
        document_url: document_url.to_string(),
        created_by: created_by.to_string(),
        created_at: now_rfc3339(),
    };

    for attempt in 0..MAX_MINT_ATTEMPTS {
        match db.insert_equipment(&record) {
            Ok(()) => return Ok(record),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                tracing::warn!(attempt, "equipment code collision, regenerating");
                record.code = mint_code();
            }
            Err(err) => return Err(ApiError::Internal(err.into())),
        }
    }

    Err(ApiError::RegistryCollision)
}

/// Read path: idempotent and side-effect-free.
pub fn lookup(db: &Database, code: &str) -> Result<Option<EquipmentRecord>, ApiError> {
    db.get_equipment_by_code(code)
        .map_err(|e| ApiError::Internal(e.into()))
}
