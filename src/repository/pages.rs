//! Stored-page persistence with optimistic version checks.

use rusqlite::params;

use super::helpers::row_to_stored_page;
use super::{to_option, Repository, Result, StoreError};
use crate::models::StoredPage;

impl Repository {
    /// Insert the first stored page for a URL.
    ///
    /// Returns false if a row already exists for the URL (conditional create).
    pub fn create_stored_page_if_absent(&self, page: &StoredPage) -> Result<bool> {
        let conn = self.connect()?;
        let inserted = conn.execute(
            r#"
            INSERT INTO stored_pages (
                id, scrape_url, entity_id, tournament_id,
                blob_key, content_hash, content_size, etag, last_modified,
                http_status, scraped_at, stored_at,
                version_number, total_versions, previous_versions,
                is_parsed, parsed_data_hash, extracted_fields,
                data_changed_at, data_change_count, parse_count, rescrape_count
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22
            )
            ON CONFLICT(scrape_url) DO NOTHING
            "#,
            params![
                page.id,
                page.scrape_url,
                page.entity_id,
                page.tournament_id,
                page.blob_key,
                page.content_hash,
                page.content_size,
                page.etag,
                page.last_modified,
                page.http_status.map(|s| s as i64),
                page.scraped_at.to_rfc3339(),
                page.stored_at.to_rfc3339(),
                page.version_number,
                page.total_versions,
                serde_json::to_string(&page.previous_versions)?,
                page.is_parsed,
                page.parsed_data_hash,
                serde_json::to_string(&page.extracted_fields)?,
                page.data_changed_at.map(|dt| dt.to_rfc3339()),
                page.data_change_count,
                page.parse_count,
                page.rescrape_count,
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Get the stored page for a URL.
    pub fn get_stored_page(&self, scrape_url: &str) -> Result<Option<StoredPage>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM stored_pages WHERE scrape_url = ?")?;
        to_option(stmt.query_row(params![scrape_url], row_to_stored_page))
    }

    /// Get a stored page by its current head blob key.
    pub fn get_stored_page_by_blob_key(&self, blob_key: &str) -> Result<Option<StoredPage>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM stored_pages WHERE blob_key = ? LIMIT 1")?;
        to_option(stmt.query_row(params![blob_key], row_to_stored_page))
    }

    /// Write back a stored page, conditioned on the version number the
    /// caller read.
    ///
    /// Returns `Conflict` if another writer advanced the version first;
    /// callers re-read the head and retry.
    pub fn update_stored_page(&self, page: &StoredPage, expected_version: i64) -> Result<()> {
        let conn = self.connect()?;
        let updated = conn.execute(
            r#"
            UPDATE stored_pages SET
                blob_key = ?1,
                content_hash = ?2,
                content_size = ?3,
                etag = ?4,
                last_modified = ?5,
                http_status = ?6,
                scraped_at = ?7,
                stored_at = ?8,
                version_number = ?9,
                total_versions = ?10,
                previous_versions = ?11,
                is_parsed = ?12,
                parsed_data_hash = ?13,
                extracted_fields = ?14,
                data_changed_at = ?15,
                data_change_count = ?16,
                parse_count = ?17,
                rescrape_count = ?18
            WHERE id = ?19 AND version_number = ?20
            "#,
            params![
                page.blob_key,
                page.content_hash,
                page.content_size,
                page.etag,
                page.last_modified,
                page.http_status.map(|s| s as i64),
                page.scraped_at.to_rfc3339(),
                page.stored_at.to_rfc3339(),
                page.version_number,
                page.total_versions,
                serde_json::to_string(&page.previous_versions)?,
                page.is_parsed,
                page.parsed_data_hash,
                serde_json::to_string(&page.extracted_fields)?,
                page.data_changed_at.map(|dt| dt.to_rfc3339()),
                page.data_change_count,
                page.parse_count,
                page.rescrape_count,
                page.id,
                expected_version,
            ],
        )?;

        if updated == 0 {
            return Err(StoreError::Conflict(format!(
                "stored page {} version {} was superseded",
                page.id, expected_version
            )));
        }
        Ok(())
    }
}
