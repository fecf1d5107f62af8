//! ScrapeUrl persistence.

use rusqlite::params;

use super::helpers::row_to_scrape_url;
use super::{to_option, Repository, Result};
use crate::models::ScrapeUrl;

impl Repository {
    /// Insert a scrape URL only if none exists for that URL.
    ///
    /// Returns true if the row was created. Losers of a concurrent create
    /// race get false and should read the row back.
    pub fn create_scrape_url_if_absent(&self, record: &ScrapeUrl) -> Result<bool> {
        let conn = self.connect()?;
        let inserted = conn.execute(
            r#"
            INSERT INTO scrape_urls (
                url, entity_id, tournament_id, source_system, status,
                do_not_scrape, game_status, latest_blob_key, latest_page_id,
                times_scraped, times_successful, times_failed, consecutive_failures,
                first_scraped_at, last_scraped_at, last_successful_scrape_at,
                etag, last_modified_header, content_hash, content_size,
                last_interaction, last_error, last_error_at, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25
            )
            ON CONFLICT(url) DO NOTHING
            "#,
            params![
                record.url,
                record.entity_id,
                record.tournament_id,
                record.source_system,
                record.status.as_str(),
                record.do_not_scrape,
                record.game_status,
                record.latest_blob_key,
                record.latest_page_id,
                record.times_scraped,
                record.times_successful,
                record.times_failed,
                record.consecutive_failures,
                record.first_scraped_at.map(|dt| dt.to_rfc3339()),
                record.last_scraped_at.map(|dt| dt.to_rfc3339()),
                record.last_successful_scrape_at.map(|dt| dt.to_rfc3339()),
                record.etag,
                record.last_modified_header,
                record.content_hash,
                record.content_size,
                record.last_interaction.as_str(),
                record.last_error,
                record.last_error_at.map(|dt| dt.to_rfc3339()),
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Get a scrape URL by its primary key (the URL itself).
    pub fn get_scrape_url(&self, url: &str) -> Result<Option<ScrapeUrl>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM scrape_urls WHERE url = ?")?;
        to_option(stmt.query_row(params![url], row_to_scrape_url))
    }

    /// Look up by the (entity, tournament) secondary index.
    pub fn find_scrape_url_by_entity_tournament(
        &self,
        entity_id: &str,
        tournament_id: &str,
    ) -> Result<Option<ScrapeUrl>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM scrape_urls WHERE entity_id = ? AND tournament_id = ? LIMIT 1",
        )?;
        to_option(stmt.query_row(params![entity_id, tournament_id], row_to_scrape_url))
    }

    /// Look up by tournament id alone.
    pub fn find_scrape_urls_by_tournament(&self, tournament_id: &str) -> Result<Vec<ScrapeUrl>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM scrape_urls WHERE tournament_id = ?")?;
        let rows = stmt
            .query_map(params![tournament_id], row_to_scrape_url)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// List URLs for a source system, paginated.
    pub fn list_scrape_urls_by_source_system(
        &self,
        source_system: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ScrapeUrl>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM scrape_urls WHERE source_system = ? ORDER BY url LIMIT ? OFFSET ?",
        )?;
        let rows = stmt
            .query_map(params![source_system, limit, offset], row_to_scrape_url)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Write back the full state of a scrape URL.
    pub fn update_scrape_url(&self, record: &ScrapeUrl) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            UPDATE scrape_urls SET
                entity_id = ?1,
                tournament_id = ?2,
                source_system = ?3,
                status = ?4,
                do_not_scrape = ?5,
                game_status = ?6,
                latest_blob_key = ?7,
                latest_page_id = ?8,
                times_scraped = ?9,
                times_successful = ?10,
                times_failed = ?11,
                consecutive_failures = ?12,
                first_scraped_at = ?13,
                last_scraped_at = ?14,
                last_successful_scrape_at = ?15,
                etag = ?16,
                last_modified_header = ?17,
                content_hash = ?18,
                content_size = ?19,
                last_interaction = ?20,
                last_error = ?21,
                last_error_at = ?22,
                updated_at = ?23
            WHERE url = ?24
            "#,
            params![
                record.entity_id,
                record.tournament_id,
                record.source_system,
                record.status.as_str(),
                record.do_not_scrape,
                record.game_status,
                record.latest_blob_key,
                record.latest_page_id,
                record.times_scraped,
                record.times_successful,
                record.times_failed,
                record.consecutive_failures,
                record.first_scraped_at.map(|dt| dt.to_rfc3339()),
                record.last_scraped_at.map(|dt| dt.to_rfc3339()),
                record.last_successful_scrape_at.map(|dt| dt.to_rfc3339()),
                record.etag,
                record.last_modified_header,
                record.content_hash,
                record.content_size,
                record.last_interaction.as_str(),
                record.last_error,
                record.last_error_at.map(|dt| dt.to_rfc3339()),
                record.updated_at.to_rfc3339(),
                record.url,
            ],
        )?;
        Ok(())
    }

    /// Set the do-not-scrape flag with a reason.
    pub fn set_do_not_scrape(&self, url: &str, flag: bool, reason: Option<&str>) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            UPDATE scrape_urls
            SET do_not_scrape = ?1,
                last_error = COALESCE(?2, last_error),
                updated_at = ?3
            WHERE url = ?4
            "#,
            params![flag, reason, chrono::Utc::now().to_rfc3339(), url],
        )?;
        Ok(())
    }

    /// Link the latest stored blob to a scrape URL.
    pub fn link_latest_blob(&self, url: &str, blob_key: &str, page_id: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            UPDATE scrape_urls
            SET latest_blob_key = ?1, latest_page_id = ?2, updated_at = ?3
            WHERE url = ?4
            "#,
            params![blob_key, page_id, chrono::Utc::now().to_rfc3339(), url],
        )?;
        Ok(())
    }

    /// Count scrape URL records.
    pub fn count_scrape_urls(&self) -> Result<i64> {
        let conn = self.connect()?;
        let count = conn.query_row("SELECT COUNT(*) FROM scrape_urls", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_is_conditional() {
        let dir = tempdir().unwrap();
        let repo = Repository::open(&dir.path().join("t.db")).unwrap();
        let record = ScrapeUrl::new("https://host/t.php?id=1", "E1", Some("1".into()), "clockwork");

        assert!(repo.create_scrape_url_if_absent(&record).unwrap());
        assert!(!repo.create_scrape_url_if_absent(&record).unwrap());
        assert_eq!(repo.count_scrape_urls().unwrap(), 1);
    }

    #[test]
    fn test_secondary_lookups() {
        let dir = tempdir().unwrap();
        let repo = Repository::open(&dir.path().join("t.db")).unwrap();
        let record = ScrapeUrl::new("https://host/t.php?id=7", "E1", Some("7".into()), "clockwork");
        repo.create_scrape_url_if_absent(&record).unwrap();

        let by_pk = repo.get_scrape_url("https://host/t.php?id=7").unwrap();
        assert!(by_pk.is_some());

        let by_et = repo
            .find_scrape_url_by_entity_tournament("E1", "7")
            .unwrap();
        assert_eq!(by_et.unwrap().url, "https://host/t.php?id=7");

        let by_t = repo.find_scrape_urls_by_tournament("7").unwrap();
        assert_eq!(by_t.len(), 1);
    }

    #[test]
    fn test_link_latest_blob() {
        let dir = tempdir().unwrap();
        let repo = Repository::open(&dir.path().join("t.db")).unwrap();
        let record = ScrapeUrl::new("https://host/t.php?id=9", "E1", Some("9".into()), "clockwork");
        repo.create_scrape_url_if_absent(&record).unwrap();

        repo.link_latest_blob("https://host/t.php?id=9", "E1/9/1.html", "page-1")
            .unwrap();
        let updated = repo.get_scrape_url("https://host/t.php?id=9").unwrap().unwrap();
        assert_eq!(updated.latest_blob_key.as_deref(), Some("E1/9/1.html"));
        assert!(updated.has_stored_content());
    }
}
