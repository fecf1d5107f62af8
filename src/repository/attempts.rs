//! Scrape attempt audit log and range-job summaries.

use rusqlite::params;

use super::helpers::{row_to_attempt, row_to_job};
use super::{to_option, Repository, Result};
use crate::models::{ScrapeAttempt, ScraperJob};

impl Repository {
    /// Append an attempt record. The log is append-only.
    pub fn record_attempt(&self, attempt: &ScrapeAttempt) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO scrape_attempts (
                id, scrape_url, scraper_job_id, attempt_time, status,
                processing_time_ms, error_type, error_message, data_hash,
                has_changes, found_fields, blob_key, source
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                attempt.id,
                attempt.scrape_url,
                attempt.scraper_job_id,
                attempt.attempt_time.to_rfc3339(),
                attempt.status.as_str(),
                attempt.processing_time_ms,
                attempt.error_type,
                attempt.error_message,
                attempt.data_hash,
                attempt.has_changes,
                serde_json::to_string(&attempt.found_fields)?,
                attempt.blob_key,
                attempt.source.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Most recent attempts for a URL, newest first.
    pub fn recent_attempts(&self, scrape_url: &str, limit: u32) -> Result<Vec<ScrapeAttempt>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM scrape_attempts WHERE scrape_url = ? ORDER BY attempt_time DESC LIMIT ?",
        )?;
        let rows = stmt
            .query_map(params![scrape_url, limit], row_to_attempt)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Attempts recorded under a range-scrape job.
    pub fn attempts_for_job(&self, job_id: &str) -> Result<Vec<ScrapeAttempt>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM scrape_attempts WHERE scraper_job_id = ? ORDER BY attempt_time",
        )?;
        let rows = stmt
            .query_map(params![job_id], row_to_attempt)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Insert a new range-scrape job row.
    pub fn insert_job(&self, job: &ScraperJob) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO scraper_jobs (
                job_id, entity_id, start_id, end_id, force_refresh,
                started_at, finished_at, status,
                total_urls, success_count, error_count, skipped_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                job.job_id,
                job.entity_id,
                job.start_id as i64,
                job.end_id as i64,
                job.force_refresh,
                job.started_at.to_rfc3339(),
                job.finished_at.map(|dt| dt.to_rfc3339()),
                job.status.as_str(),
                job.total_urls,
                job.success_count,
                job.error_count,
                job.skipped_count,
            ],
        )?;
        Ok(())
    }

    /// Write back job progress and status.
    pub fn update_job(&self, job: &ScraperJob) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            UPDATE scraper_jobs SET
                finished_at = ?1,
                status = ?2,
                total_urls = ?3,
                success_count = ?4,
                error_count = ?5,
                skipped_count = ?6
            WHERE job_id = ?7
            "#,
            params![
                job.finished_at.map(|dt| dt.to_rfc3339()),
                job.status.as_str(),
                job.total_urls,
                job.success_count,
                job.error_count,
                job.skipped_count,
                job.job_id,
            ],
        )?;
        Ok(())
    }

    /// Get a job by id.
    pub fn get_job(&self, job_id: &str) -> Result<Option<ScraperJob>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM scraper_jobs WHERE job_id = ?")?;
        to_option(stmt.query_row(params![job_id], row_to_job))
    }

    /// Recent jobs, newest first.
    pub fn list_jobs(&self, limit: u32) -> Result<Vec<ScraperJob>> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT * FROM scraper_jobs ORDER BY started_at DESC LIMIT ?")?;
        let rows = stmt
            .query_map(params![limit], row_to_job)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
