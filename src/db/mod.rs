use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use std::path::PathBuf;

use crate::models::{
    EquipmentRecord, EquipmentSummary, ExtractedFields, InspectionRecord, InspectionSchema,
    LegacyFindings, SectionMap, Template, TemplateSection,
};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new(db_path: PathBuf) -> SqlResult<Self> {
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> SqlResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> SqlResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let mut db = Database { conn };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&mut self) -> SqlResult<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL
            );",
        )?;

        let migrations = vec![
            (
                "001_create_equipment.sql",
                include_str!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/migrations/001_create_equipment.sql"
                )),
            ),
            (
                "002_create_templates.sql",
                include_str!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/migrations/002_create_templates.sql"
                )),
            ),
            (
                "003_create_inspections.sql",
                include_str!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/migrations/003_create_inspections.sql"
                )),
            ),
            (
                "004_create_processing_logs.sql",
                include_str!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/migrations/004_create_processing_logs.sql"
                )),
            ),
        ];

        for (name, sql) in migrations {
            let applied: Option<String> = self
                .conn
                .query_row(
                    "SELECT name FROM schema_migrations WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;

            if applied.is_none() {
                let tx = self.conn.transaction()?;
                tx.execute_batch(sql)?;
                tx.execute(
                    "INSERT INTO schema_migrations (name, applied_at) VALUES (?1, datetime('now'))",
                    params![name],
                )?;
                tx.commit()?;
            }
        }

        Ok(())
    }

    /// Plain INSERT so a code collision surfaces as a constraint violation
    /// the registry can retry on.
    pub fn insert_equipment(&self, record: &EquipmentRecord) -> SqlResult<()> {
        self.conn.execute(
            "INSERT INTO equipment (
                id, code, product, internal_reference, serial_number, standards,
                manufacturer, issue_date, signatory, confidence, raw_text,
                document_url, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                record.id,
                record.code,
                record.fields.product,
                record.fields.internal_reference,
                record.fields.serial_number,
                record.fields.standards,
                record.fields.manufacturer,
                record.fields.issue_date,
                record.fields.signatory,
                record.fields.confidence,
                record.fields.raw_text,
                record.document_url,
                record.created_by,
                record.created_at
            ],
        )?;
        Ok(())
    }

    pub fn get_equipment_by_code(&self, code: &str) -> SqlResult<Option<EquipmentRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, code, product, internal_reference, serial_number, standards,
                    manufacturer, issue_date, signatory, confidence, raw_text,
                    document_url, created_by, created_at
             FROM equipment WHERE code = ?1",
        )?;

        stmt.query_row(params![code], |row| {
            Ok(EquipmentRecord {
                id: row.get(0)?,
                code: row.get(1)?,
                fields: ExtractedFields {
                    product: row.get(2)?,
                    internal_reference: row.get(3)?,
                    serial_number: row.get(4)?,
                    standards: row.get(5)?,
                    manufacturer: row.get(6)?,
                    issue_date: row.get(7)?,
                    signatory: row.get(8)?,
                    confidence: row.get(9)?,
                    raw_text: row.get(10)?,
                },
                document_url: row.get(11)?,
                created_by: row.get(12)?,
                created_at: row.get(13)?,
            })
        })
        .optional()
    }

    pub fn get_equipment_summaries(&self) -> SqlResult<Vec<EquipmentSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT code, product, manufacturer, created_at
             FROM equipment ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(EquipmentSummary {
                code: row.get(0)?,
                product: row.get(1)?,
                manufacturer: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;

        rows.collect()
    }

    pub fn upsert_inspection(&self, record: &InspectionRecord) -> SqlResult<()> {
        let (template_id, findings_json, sections_json) = split_schema(&record.schema)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO inspections (
                id, equipment_code, reference, serial_number, manufacture_date,
                purchase_date, first_use_date, size, overall_result,
                last_inspection_date, template_id, findings_json, sections_json,
                created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                record.id,
                record.equipment_code,
                record.reference,
                record.serial_number,
                record.manufacture_date,
                record.purchase_date,
                record.first_use_date,
                record.size,
                record.overall_result,
                record.last_inspection_date,
                template_id,
                findings_json,
                sections_json,
                record.created_by,
                record.created_at,
                record.updated_at
            ],
        )?;
        Ok(())
    }

    pub fn get_inspection_by_id(&self, id: &str) -> SqlResult<Option<InspectionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, equipment_code, reference, serial_number, manufacture_date,
                    purchase_date, first_use_date, size, overall_result,
                    last_inspection_date, template_id, findings_json, sections_json,
                    created_by, created_at, updated_at
             FROM inspections WHERE id = ?1",
        )?;

        stmt.query_row(params![id], map_inspection_row).optional()
    }

    pub fn get_inspections(&self) -> SqlResult<Vec<InspectionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, equipment_code, reference, serial_number, manufacture_date,
                    purchase_date, first_use_date, size, overall_result,
                    last_inspection_date, template_id, findings_json, sections_json,
                    created_by, created_at, updated_at
             FROM inspections ORDER BY updated_at DESC",
        )?;

        let rows = stmt.query_map([], map_inspection_row)?;
        rows.collect()
    }

    pub fn insert_template(&self, template: &Template) -> SqlResult<()> {
        let structure = serde_json::to_string(&template.sections).map_err(to_sql_error)?;
        self.conn.execute(
            "INSERT INTO templates (id, name, structure_json, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![template.id, template.name, structure, template.created_at],
        )?;
        Ok(())
    }

    pub fn get_template_by_id(&self, id: &str) -> SqlResult<Option<Template>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, structure_json, created_at FROM templates WHERE id = ?1",
        )?;

        stmt.query_row(params![id], |row| {
            let structure: String = row.get(2)?;
            let sections: Vec<TemplateSection> = serde_json::from_str(&structure)
                .map_err(|e| from_sql_error(2, e))?;
            Ok(Template {
                id: row.get(0)?,
                name: row.get(1)?,
                sections,
                created_at: row.get(3)?,
            })
        })
        .optional()
    }

    pub fn count_processing_logs(&self, status: &str) -> SqlResult<i64> {
        self.conn.query_row(
            "SELECT COUNT(*) FROM processing_logs WHERE status = ?1",
            params![status],
            |row| row.get(0),
        )
    }

    pub fn log_processing(
        &self,
        equipment_code: Option<&str>,
        file_hash: Option<&str>,
        process_type: &str,
        status: &str,
        message: Option<&str>,
    ) -> SqlResult<()> {
        self.conn.execute(
            "INSERT INTO processing_logs (id, equipment_code, file_hash, process_type, status, message, created_at)
             VALUES (hex(randomblob(16)), ?1, ?2, ?3, ?4, ?5, datetime('now'))",
            params![equipment_code, file_hash, process_type, status, message],
        )?;
        Ok(())
    }
}

fn split_schema(schema: &InspectionSchema) -> SqlResult<(Option<String>, String, String)> {
    match schema {
        InspectionSchema::Legacy { findings } => {
            let findings_json = serde_json::to_string(findings).map_err(to_sql_error)?;
            Ok((None, findings_json, "{}".to_string()))
        }
        InspectionSchema::Templated { template_id, sections } => {
            let sections_json = serde_json::to_string(sections).map_err(to_sql_error)?;
            Ok((Some(template_id.clone()), "{}".to_string(), sections_json))
        }
    }
}

fn map_inspection_row(row: &rusqlite::Row<'_>) -> SqlResult<InspectionRecord> {
    let template_id: Option<String> = row.get(10)?;
    let findings_json: String = row.get(11)?;
    let sections_json: String = row.get(12)?;

    // Null template id means the record predates templates and keeps the
    // fixed legacy findings shape.
    let schema = match template_id {
        Some(template_id) => {
            let sections: SectionMap =
                serde_json::from_str(&sections_json).map_err(|e| from_sql_error(12, e))?;
            InspectionSchema::Templated { template_id, sections }
        }
        None => {
            let findings: LegacyFindings =
                serde_json::from_str(&findings_json).map_err(|e| from_sql_error(11, e))?;
            InspectionSchema::Legacy { findings }
        }
    };

    Ok(InspectionRecord {
        id: row.get(0)?,
        equipment_code: row.get(1)?,
        reference: row.get(2)?,
        serial_number: row.get(3)?,
        manufacture_date: row.get(4)?,
        purchase_date: row.get(5)?,
        first_use_date: row.get(6)?,
        size: row.get(7)?,
        overall_result: row.get(8)?,
        last_inspection_date: row.get(9)?,
        schema,
        created_by: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

fn to_sql_error(e: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(e))
}

fn from_sql_error(column: usize, e: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        Box::new(e),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CheckStatus, SubsectionEntry};
    use std::collections::BTreeMap;

    fn sample_equipment(code: &str) -> EquipmentRecord {
        EquipmentRecord {
            id: "eq-1".to_string(),
            code: code.to_string(),
            fields: ExtractedFields::empty(),
            document_url: "http://localhost/documents/abc.pdf".to_string(),
            created_by: "tester".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn equipment_round_trip() {
        let db = Database::in_memory().unwrap();
        let mut record = sample_equipment("ABCDEFGH2345");
        record.fields.product = "VERTEX VENT".to_string();
        db.insert_equipment(&record).unwrap();

        let loaded = db.get_equipment_by_code("ABCDEFGH2345").unwrap().unwrap();
        assert_eq!(loaded.fields.product, "VERTEX VENT");
        assert_eq!(loaded.code, record.code);
        assert!(db.get_equipment_by_code("missing").unwrap().is_none());
    }

    #[test]
    fn duplicate_code_is_a_constraint_violation() {
        let db = Database::in_memory().unwrap();
        db.insert_equipment(&sample_equipment("SAMECODE2345")).unwrap();
        let mut second = sample_equipment("SAMECODE2345");
        second.id = "eq-2".to_string();
        let err = db.insert_equipment(&second).unwrap_err();
        match err {
            rusqlite::Error::SqliteFailure(e, _) => {
                assert_eq!(e.code, rusqlite::ErrorCode::ConstraintViolation);
            }
            other => panic!("expected constraint violation, got {other:?}"),
        }
    }

    #[test]
    fn templated_inspection_round_trip() {
        let db = Database::in_memory().unwrap();
        let mut sections: SectionMap = BTreeMap::new();
        let mut sub = BTreeMap::new();
        sub.insert(
            "s1".to_string(),
            SubsectionEntry {
                status: CheckStatus::X,
                comment: Some("cracked shell".to_string()),
                crossed_words: vec![],
            },
        );
        sections.insert("head".to_string(), sub);

        let record = InspectionRecord {
            id: "insp-1".to_string(),
            equipment_code: Some("ABCDEFGH2345".to_string()),
            reference: Some("A010CA12".to_string()),
            serial_number: None,
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
            created_by: "tester".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        };
        db.upsert_inspection(&record).unwrap();

        let loaded = db.get_inspection_by_id("insp-1").unwrap().unwrap();
        match &loaded.schema {
            InspectionSchema::Templated { template_id, sections } => {
                assert_eq!(template_id, "tpl-1");
                assert_eq!(sections["head"]["s1"].status, CheckStatus::X);
            }
            other => panic!("expected templated schema, got {other:?}"),
        }
    }

    #[test]
    fn legacy_inspection_round_trip() {
        let db = Database::in_memory().unwrap();
        let record = InspectionRecord {
            id: "insp-2".to_string(),
            equipment_code: None,
            reference: None,
            serial_number: None,
            manufacture_date: None,
            purchase_date: None,
            first_use_date: None,
            size: None,
            overall_result: "KO".to_string(),
            last_inspection_date: None,
            schema: InspectionSchema::Legacy {
                findings: LegacyFindings {
                    shell: Some("scratched".to_string()),
                    ..LegacyFindings::default()
                },
            },
            created_by: "tester".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        };
        db.upsert_inspection(&record).unwrap();

        let loaded = db.get_inspection_by_id("insp-2").unwrap().unwrap();
        match &loaded.schema {
            InspectionSchema::Legacy { findings } => {
                assert_eq!(findings.shell.as_deref(), Some("scratched"));
            }
            other => panic!("expected legacy schema, got {other:?}"),
        }
    }
}
