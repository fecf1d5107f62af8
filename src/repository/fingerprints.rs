//! Structure fingerprint persistence.

use chrono::{DateTime, Utc};
use rusqlite::params;

use super::helpers::row_to_fingerprint;
use super::{to_option, Repository, Result};
use crate::models::{fingerprint_id, StructureFingerprint};

impl Repository {
    /// Record an observed field set.
    ///
    /// First sighting inserts a row; repeats bump the occurrence count and
    /// last-seen time. Returns true when the structure is new.
    pub fn record_fingerprint(
        &self,
        fields: &[String],
        example_url: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<bool> {
        let id = fingerprint_id(fields);
        let conn = self.connect()?;

        let updated = conn.execute(
            "UPDATE structure_fingerprints
             SET occurrence_count = occurrence_count + 1, last_seen_at = ?1
             WHERE id = ?2",
            params![seen_at.to_rfc3339(), id],
        )?;
        if updated > 0 {
            return Ok(false);
        }

        conn.execute(
            r#"
            INSERT INTO structure_fingerprints (
                id, fields, structure_label, occurrence_count,
                first_seen_at, last_seen_at, example_url
            ) VALUES (?1, ?2, NULL, 1, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                occurrence_count = occurrence_count + 1,
                last_seen_at = excluded.last_seen_at
            "#,
            params![
                id,
                serde_json::to_string(fields)?,
                seen_at.to_rfc3339(),
                seen_at.to_rfc3339(),
                example_url,
            ],
        )?;
        Ok(true)
    }

    pub fn get_fingerprint(&self, id: &str) -> Result<Option<StructureFingerprint>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM structure_fingerprints WHERE id = ?")?;
        to_option(stmt.query_row(params![id], row_to_fingerprint))
    }

    /// All known structures, most common first.
    pub fn list_fingerprints(&self) -> Result<Vec<StructureFingerprint>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM structure_fingerprints ORDER BY occurrence_count DESC, last_seen_at DESC",
        )?;
        let rows = stmt
            .query_map([], row_to_fingerprint)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn set_fingerprint_label(&self, id: &str, label: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE structure_fingerprints SET structure_label = ?1 WHERE id = ?2",
            params![label, id],
        )?;
        Ok(())
    }
}
