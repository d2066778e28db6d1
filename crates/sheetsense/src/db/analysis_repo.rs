//! Analysis repository — CRUD for the `analysis` table and its metadata.

use std::collections::HashMap;

use chrono::Utc;
use rusqlite::{params, Row};
use serde_json::Value;

use super::{Database, DatabaseError};

/// A raw analysis row from the database.
#[derive(Debug, Clone)]
pub struct AnalysisRow {
    pub id: i64,
    pub filename: String,
    pub vendor_code: Option<String>,
    pub report: String,
    pub content_hash: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl AnalysisRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            filename: row.get("filename")?,
            vendor_code: row.get("vendor_code")?,
            report: row.get("report")?,
            content_hash: row.get("content_hash")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Encodes a metadata value for storage: compound values as JSON text,
/// scalars as their plain string form.
fn encode_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
        other => other.to_string(),
    }
}

/// Inserts a new analysis record together with its metadata entries in one
/// transaction. Fails with [`DatabaseError::Duplicate`] if a record with the
/// same `(filename, content_hash)` pair already exists; the transaction is
/// rolled back fully, leaving no partial metadata behind.
pub fn insert(
    db: &Database,
    filename: &str,
    report: &str,
    vendor_code: Option<&str>,
    content_hash: Option<&str>,
    metadata: Option<&HashMap<String, Value>>,
) -> Result<i64, DatabaseError> {
    let now = Utc::now().to_rfc3339();
    db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT INTO analysis (filename, vendor_code, report, content_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![filename, vendor_code, report, content_hash, now],
        );
        if let Err(e) = inserted {
            if is_unique_violation(&e) {
                return Err(DatabaseError::Duplicate {
                    filename: filename.to_string(),
                });
            }
            return Err(e.into());
        }

        let id = tx.last_insert_rowid();

        if let Some(metadata) = metadata {
            for (key, value) in metadata {
                tx.execute(
                    "INSERT INTO analysis_metadata (analysis_id, key, value) VALUES (?1, ?2, ?3)",
                    params![id, key, encode_value(value)],
                )?;
            }
        }

        tx.commit()?;
        Ok(id)
    })
}

/// Partially updates an analysis record. Only the supplied fields change;
/// `updated_at` is always touched. Metadata keys are upserted individually.
pub fn update(
    db: &Database,
    id: i64,
    report: Option<&str>,
    vendor_code: Option<&str>,
    metadata: Option<&HashMap<String, Value>>,
) -> Result<(), DatabaseError> {
    let now = Utc::now().to_rfc3339();
    db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;

        let mut sets = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(report) = report {
            sets.push(format!("report = ?{}", values.len() + 1));
            values.push(Box::new(report.to_string()));
        }
        if let Some(vendor_code) = vendor_code {
            sets.push(format!("vendor_code = ?{}", values.len() + 1));
            values.push(Box::new(vendor_code.to_string()));
        }
        sets.push(format!("updated_at = ?{}", values.len() + 1));
        values.push(Box::new(now));

        let sql = format!(
            "UPDATE analysis SET {} WHERE id = ?{}",
            sets.join(", "),
            values.len() + 1
        );
        values.push(Box::new(id));

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(|p| p.as_ref()).collect();
        tx.execute(&sql, params_ref.as_slice())?;

        if let Some(metadata) = metadata {
            for (key, value) in metadata {
                tx.execute(
                    "INSERT OR REPLACE INTO analysis_metadata (analysis_id, key, value)
                     VALUES (?1, ?2, ?3)",
                    params![id, key, encode_value(value)],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    })
}

/// Finds an analysis record by its ID.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<AnalysisRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM analysis WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], AnalysisRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Finds the most recent analysis record for a filename.
pub fn find_by_filename(db: &Database, filename: &str) -> Result<Option<AnalysisRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM analysis WHERE filename = ?1
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![filename], AnalysisRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Searches analysis records whose vendor code contains the given fragment.
pub fn search_by_vendor(db: &Database, vendor_code: &str) -> Result<Vec<AnalysisRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM analysis WHERE vendor_code LIKE ?1 ORDER BY created_at DESC",
        )?;
        let pattern = format!("%{}%", vendor_code);
        let rows: Vec<AnalysisRow> = stmt
            .query_map(params![pattern], AnalysisRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Lists analysis records, newest first, with paging.
pub fn list(db: &Database, limit: u64, offset: u64) -> Result<Vec<AnalysisRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM analysis ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
        )?;
        let rows: Vec<AnalysisRow> = stmt
            .query_map(params![limit as i64, offset as i64], AnalysisRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Deletes an analysis record. Metadata and checkpoints cascade.
pub fn delete(db: &Database, id: i64) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute("DELETE FROM analysis WHERE id = ?1", params![id])?;
        Ok(())
    })
}

/// Returns the metadata map for an analysis record. Values are JSON-decoded
/// opportunistically; anything that fails to decode is kept as a raw string.
pub fn metadata(db: &Database, id: i64) -> Result<HashMap<String, Value>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT key, value FROM analysis_metadata WHERE analysis_id = ?1")?;
        let entries: Vec<(String, Option<String>)> = stmt
            .query_map(params![id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut map = HashMap::new();
        for (key, value) in entries {
            let raw = value.unwrap_or_default();
            let decoded = match serde_json::from_str::<Value>(&raw) {
                Ok(value) => value,
                Err(_) => Value::String(raw),
            };
            map.insert(key, decoded);
        }
        Ok(map)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    #[test]
    fn test_insert_and_find_round_trip() {
        let db = test_db();
        let report = "## 1. Datasheet analysis\nInput range: 7.5 V to 76 V\n";
        let id = insert(&db, "max5033.pdf", report, Some("MAX5033A"), Some("hash-1"), None)
            .unwrap();

        let row = find_by_filename(&db, "max5033.pdf").unwrap().unwrap();
        assert_eq!(row.id, id);
        assert_eq!(row.report, report);
        assert_eq!(row.vendor_code.as_deref(), Some("MAX5033A"));
        assert_eq!(row.content_hash.as_deref(), Some("hash-1"));
        assert_eq!(row.status, "Finish");
    }

    #[test]
    fn test_duplicate_insert_fails_and_leaves_store_unchanged() {
        let db = test_db();
        insert(
            &db,
            "sheet.pdf",
            "first",
            None,
            Some("same-hash"),
            Some(&HashMap::from([("Model".to_string(), json!("LM317"))])),
        )
        .unwrap();

        let err = insert(
            &db,
            "sheet.pdf",
            "second",
            None,
            Some("same-hash"),
            Some(&HashMap::from([("Model".to_string(), json!("LM317"))])),
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::Duplicate { .. }));

        db.with_conn(|conn| {
            let rows: u32 = conn.query_row("SELECT COUNT(*) FROM analysis", [], |r| r.get(0))?;
            assert_eq!(rows, 1);
            let entries: u32 =
                conn.query_row("SELECT COUNT(*) FROM analysis_metadata", [], |r| r.get(0))?;
            assert_eq!(entries, 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_same_filename_different_hash_allowed() {
        let db = test_db();
        let first = insert(&db, "sheet.pdf", "rev A", None, Some("hash-a"), None).unwrap();
        let second = insert(&db, "sheet.pdf", "rev B", None, Some("hash-b"), None).unwrap();
        assert_ne!(first, second);

        // Latest record wins for the filename lookup.
        let row = find_by_filename(&db, "sheet.pdf").unwrap().unwrap();
        assert_eq!(row.id, second);
    }

    #[test]
    fn test_metadata_round_trip() {
        let db = test_db();
        let metadata = HashMap::from([
            ("Model".to_string(), json!("MAX5033A")),
            ("Input voltage".to_string(), json!("10.5V DC")),
            (
                "Pins".to_string(),
                json!({ "VIN": "supply input", "LX": "switch node" }),
            ),
            ("Ratings".to_string(), json!([76, 500])),
        ]);

        let id = insert(&db, "sheet.pdf", "report", None, None, Some(&metadata)).unwrap();
        let loaded = super::metadata(&db, id).unwrap();

        assert_eq!(loaded.get("Model"), Some(&json!("MAX5033A")));
        assert_eq!(loaded.get("Input voltage"), Some(&json!("10.5V DC")));
        assert_eq!(
            loaded.get("Pins"),
            Some(&json!({ "VIN": "supply input", "LX": "switch node" }))
        );
        assert_eq!(loaded.get("Ratings"), Some(&json!([76, 500])));
    }

    #[test]
    fn test_update_partial_fields() {
        let db = test_db();
        let id = insert(&db, "sheet.pdf", "original", Some("OLD-CODE"), None, None).unwrap();

        update(&db, id, Some("revised"), None, None).unwrap();

        let row = find_by_id(&db, id).unwrap().unwrap();
        assert_eq!(row.report, "revised");
        // Vendor code untouched by the partial update.
        assert_eq!(row.vendor_code.as_deref(), Some("OLD-CODE"));
    }

    #[test]
    fn test_update_upserts_metadata() {
        let db = test_db();
        let id = insert(
            &db,
            "sheet.pdf",
            "report",
            None,
            None,
            Some(&HashMap::from([("Model".to_string(), json!("LM317"))])),
        )
        .unwrap();

        update(
            &db,
            id,
            None,
            None,
            Some(&HashMap::from([
                ("Model".to_string(), json!("LM317T")),
                ("Package".to_string(), json!("TO-220")),
            ])),
        )
        .unwrap();

        let loaded = metadata(&db, id).unwrap();
        assert_eq!(loaded.get("Model"), Some(&json!("LM317T")));
        assert_eq!(loaded.get("Package"), Some(&json!("TO-220")));
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_delete_cascades_to_metadata_and_checkpoints() {
        let db = test_db();
        let id = insert(
            &db,
            "sheet.pdf",
            "report",
            None,
            None,
            Some(&HashMap::from([("Model".to_string(), json!("LM317"))])),
        )
        .unwrap();
        crate::db::checklist_repo::insert(&db, id, "check VIN decoupling", "").unwrap();

        delete(&db, id).unwrap();

        db.with_conn(|conn| {
            let entries: u32 =
                conn.query_row("SELECT COUNT(*) FROM analysis_metadata", [], |r| r.get(0))?;
            assert_eq!(entries, 0);
            let checkpoints: u32 =
                conn.query_row("SELECT COUNT(*) FROM checkpoints", [], |r| r.get(0))?;
            assert_eq!(checkpoints, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_delete_then_reinsert_same_hash() {
        let db = test_db();
        let first = insert(&db, "sheet.pdf", "report", None, Some("hash"), None).unwrap();
        delete(&db, first).unwrap();

        let second = insert(&db, "sheet.pdf", "report", None, Some("hash"), None).unwrap();
        assert_ne!(first, second);

        db.with_conn(|conn| {
            let rows: u32 = conn.query_row("SELECT COUNT(*) FROM analysis", [], |r| r.get(0))?;
            assert_eq!(rows, 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_search_by_vendor() {
        let db = test_db();
        insert(&db, "a.pdf", "r", Some("MAX5033A"), Some("h1"), None).unwrap();
        insert(&db, "b.pdf", "r", Some("LM317"), Some("h2"), None).unwrap();

        let hits = search_by_vendor(&db, "5033").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].filename, "a.pdf");
    }

    #[test]
    fn test_list_paging() {
        let db = test_db();
        for i in 0..5 {
            insert(&db, &format!("doc{}.pdf", i), "r", None, Some(&format!("h{}", i)), None)
                .unwrap();
        }

        let page = list(&db, 2, 0).unwrap();
        assert_eq!(page.len(), 2);
        let rest = list(&db, 10, 2).unwrap();
        assert_eq!(rest.len(), 3);
    }

    #[test]
    fn test_find_missing_returns_none() {
        let db = test_db();
        assert!(find_by_filename(&db, "nope.pdf").unwrap().is_none());
        assert!(find_by_id(&db, 42).unwrap().is_none());
    }
}
