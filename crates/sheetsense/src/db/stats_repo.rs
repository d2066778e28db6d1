//! Statistics repository — aggregate queries over stored analyses.

use rusqlite::params;
use serde::Serialize;

use super::{Database, DatabaseError};

/// Per-vendor record count.
#[derive(Debug, Clone, Serialize)]
pub struct VendorCount {
    pub vendor_code: String,
    pub count: i64,
}

/// Aggregate view of the store.
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total: i64,
    /// Top vendors by record count, descending.
    pub vendors: Vec<VendorCount>,
    pub latest_created_at: Option<String>,
}

/// Maximum number of vendors reported in the histogram.
const VENDOR_HISTOGRAM_LIMIT: u32 = 10;

/// Returns the store statistics: total record count, a top-10 vendor-code
/// histogram and the most recent creation timestamp.
pub fn statistics(db: &Database) -> Result<Statistics, DatabaseError> {
    db.with_conn(|conn| {
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM analysis", [], |r| r.get(0))?;

        let mut stmt = conn.prepare(
            "SELECT vendor_code, COUNT(*) as count
             FROM analysis
             WHERE vendor_code IS NOT NULL
             GROUP BY vendor_code
             ORDER BY count DESC
             LIMIT ?1",
        )?;
        let vendors: Vec<VendorCount> = stmt
            .query_map(params![VENDOR_HISTOGRAM_LIMIT], |row| {
                Ok(VendorCount {
                    vendor_code: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let latest_created_at: Option<String> =
            conn.query_row("SELECT MAX(created_at) FROM analysis", [], |r| r.get(0))?;

        Ok(Statistics {
            total,
            vendors,
            latest_created_at,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::analysis_repo;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    #[test]
    fn test_statistics_empty_store() {
        let db = test_db();
        let stats = statistics(&db).unwrap();
        assert_eq!(stats.total, 0);
        assert!(stats.vendors.is_empty());
        assert!(stats.latest_created_at.is_none());
    }

    #[test]
    fn test_statistics_counts_and_histogram() {
        let db = test_db();
        for i in 0..3 {
            analysis_repo::insert(
                &db,
                &format!("max-{}.pdf", i),
                "r",
                Some("MAX5033A"),
                Some(&format!("hm{}", i)),
                None,
            )
            .unwrap();
        }
        analysis_repo::insert(&db, "lm317.pdf", "r", Some("LM317"), Some("hl"), None).unwrap();
        // No vendor code — excluded from the histogram, counted in total.
        analysis_repo::insert(&db, "unknown.pdf", "r", None, Some("hu"), None).unwrap();

        let stats = statistics(&db).unwrap();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.vendors.len(), 2);
        assert_eq!(stats.vendors[0].vendor_code, "MAX5033A");
        assert_eq!(stats.vendors[0].count, 3);
        assert_eq!(stats.vendors[1].vendor_code, "LM317");
        assert!(stats.latest_created_at.is_some());
    }

    #[test]
    fn test_histogram_limited_to_ten() {
        let db = test_db();
        for i in 0..12 {
            analysis_repo::insert(
                &db,
                &format!("part-{}.pdf", i),
                "r",
                Some(&format!("VEND-{}", i)),
                Some(&format!("h{}", i)),
                None,
            )
            .unwrap();
        }

        let stats = statistics(&db).unwrap();
        assert_eq!(stats.total, 12);
        assert_eq!(stats.vendors.len(), 10);
    }
}
