//! Checklist repository — CRUD for the `checkpoints` table.
//!
//! Each checkpoint couples a generated verification instruction with its
//! synthesized code artifact. The code may be empty (synthesis failed) but
//! is never NULL.

use chrono::Utc;
use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw checkpoint row from the database.
#[derive(Debug, Clone)]
pub struct CheckpointRow {
    pub id: i64,
    pub analysis_id: i64,
    pub text: String,
    pub code: String,
    pub created_at: String,
}

impl CheckpointRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            analysis_id: row.get("analysis_id")?,
            text: row.get("text")?,
            code: row.get("code")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a checkpoint for an analysis record.
pub fn insert(
    db: &Database,
    analysis_id: i64,
    text: &str,
    code: &str,
) -> Result<i64, DatabaseError> {
    let now = Utc::now().to_rfc3339();
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO checkpoints (analysis_id, text, code, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![analysis_id, text, code, now],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Lists all checkpoints for an analysis record in creation order.
pub fn list_for_analysis(
    db: &Database,
    analysis_id: i64,
) -> Result<Vec<CheckpointRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM checkpoints WHERE analysis_id = ?1
             ORDER BY created_at ASC, id ASC",
        )?;
        let rows: Vec<CheckpointRow> = stmt
            .query_map(params![analysis_id], CheckpointRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Finds a checkpoint by its ID.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<CheckpointRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM checkpoints WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], CheckpointRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Partially updates a checkpoint. Only the supplied fields change.
pub fn update(
    db: &Database,
    id: i64,
    text: Option<&str>,
    code: Option<&str>,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let mut sets = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(text) = text {
            sets.push(format!("text = ?{}", values.len() + 1));
            values.push(Box::new(text.to_string()));
        }
        if let Some(code) = code {
            sets.push(format!("code = ?{}", values.len() + 1));
            values.push(Box::new(code.to_string()));
        }

        if sets.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "UPDATE checkpoints SET {} WHERE id = ?{}",
            sets.join(", "),
            values.len() + 1
        );
        values.push(Box::new(id));

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_ref.as_slice())?;
        Ok(())
    })
}

/// Deletes a checkpoint.
pub fn delete(db: &Database, id: i64) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute("DELETE FROM checkpoints WHERE id = ?1", params![id])?;
        Ok(())
    })
}

/// Deletes all checkpoints for an analysis record.
pub fn delete_for_analysis(db: &Database, analysis_id: i64) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "DELETE FROM checkpoints WHERE analysis_id = ?1",
            params![analysis_id],
        )?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::analysis_repo;

    fn test_db_with_analysis() -> (Database, i64) {
        let db = Database::open_in_memory().expect("Failed to create test database");
        let id = analysis_repo::insert(&db, "sheet.pdf", "report", None, None, None).unwrap();
        (db, id)
    }

    #[test]
    fn test_insert_and_list_in_creation_order() {
        let (db, analysis_id) = test_db_with_analysis();
        insert(&db, analysis_id, "check VIN decoupling", "import check\n").unwrap();
        insert(&db, analysis_id, "check LX inductor", "").unwrap();
        insert(&db, analysis_id, "check GND plane", "print('gnd')\n").unwrap();

        let rows = list_for_analysis(&db, analysis_id).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].text, "check VIN decoupling");
        assert_eq!(rows[1].text, "check LX inductor");
        assert_eq!(rows[1].code, "");
        assert_eq!(rows[2].text, "check GND plane");
    }

    #[test]
    fn test_find_by_id() {
        let (db, analysis_id) = test_db_with_analysis();
        let id = insert(&db, analysis_id, "check pull-ups", "code").unwrap();

        let row = find_by_id(&db, id).unwrap().unwrap();
        assert_eq!(row.text, "check pull-ups");
        assert_eq!(row.code, "code");
        assert_eq!(row.analysis_id, analysis_id);

        assert!(find_by_id(&db, 9999).unwrap().is_none());
    }

    #[test]
    fn test_update_partial() {
        let (db, analysis_id) = test_db_with_analysis();
        let id = insert(&db, analysis_id, "original text", "original code").unwrap();

        update(&db, id, None, Some("new code")).unwrap();

        let row = find_by_id(&db, id).unwrap().unwrap();
        assert_eq!(row.text, "original text");
        assert_eq!(row.code, "new code");
    }

    #[test]
    fn test_delete_single() {
        let (db, analysis_id) = test_db_with_analysis();
        let id = insert(&db, analysis_id, "text", "code").unwrap();

        delete(&db, id).unwrap();
        assert!(find_by_id(&db, id).unwrap().is_none());
    }

    #[test]
    fn test_delete_for_analysis() {
        let (db, analysis_id) = test_db_with_analysis();
        insert(&db, analysis_id, "one", "").unwrap();
        insert(&db, analysis_id, "two", "").unwrap();

        delete_for_analysis(&db, analysis_id).unwrap();
        assert!(list_for_analysis(&db, analysis_id).unwrap().is_empty());
    }
}
