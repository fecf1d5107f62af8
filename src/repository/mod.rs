//! SQLite repository for all persisted records.
//!
//! One `Repository` handle owns the database path; each call opens its own
//! connection. Conditional creates use `INSERT ... ON CONFLICT DO NOTHING`
//! plus read-back; stored-page updates are conditioned on the version number
//! so concurrent writers detect races instead of clobbering each other.

mod attempts;
mod entities;
mod fingerprints;
mod games;
mod helpers;
mod pages;
mod recurring;
mod urls;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use thiserror::Error;

/// Repository error kinds.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("write conflict: {0}")]
    Conflict(String),
    #[error("invariant violation: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// SQLite-backed repository.
#[derive(Debug, Clone)]
pub struct Repository {
    db_path: PathBuf,
}

impl Repository {
    /// Open (creating if needed) the database and ensure the schema exists.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let repo = Self {
            db_path: db_path.to_path_buf(),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    pub(crate) fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(std::time::Duration::from_secs(10))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            -- Canonical per-URL state
            CREATE TABLE IF NOT EXISTS scrape_urls (
                url TEXT PRIMARY KEY,
                entity_id TEXT NOT NULL,
                tournament_id TEXT,
                source_system TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'PENDING',
                do_not_scrape INTEGER NOT NULL DEFAULT 0,
                game_status TEXT,
                latest_blob_key TEXT,
                latest_page_id TEXT,

                times_scraped INTEGER NOT NULL DEFAULT 0,
                times_successful INTEGER NOT NULL DEFAULT 0,
                times_failed INTEGER NOT NULL DEFAULT 0,
                consecutive_failures INTEGER NOT NULL DEFAULT 0,
                first_scraped_at TEXT,
                last_scraped_at TEXT,
                last_successful_scrape_at TEXT,

                etag TEXT,
                last_modified_header TEXT,
                content_hash TEXT,
                content_size INTEGER,

                last_interaction TEXT NOT NULL DEFAULT 'NEVER_CHECKED',
                last_error TEXT,
                last_error_at TEXT,

                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Blob metadata with version history (one row per URL)
            CREATE TABLE IF NOT EXISTS stored_pages (
                id TEXT PRIMARY KEY,
                scrape_url TEXT NOT NULL UNIQUE,
                entity_id TEXT NOT NULL,
                tournament_id TEXT,

                blob_key TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                content_size INTEGER NOT NULL,
                etag TEXT,
                last_modified TEXT,
                http_status INTEGER,
                scraped_at TEXT NOT NULL,
                stored_at TEXT NOT NULL,

                version_number INTEGER NOT NULL DEFAULT 1,
                total_versions INTEGER NOT NULL DEFAULT 1,
                previous_versions TEXT NOT NULL DEFAULT '[]',

                is_parsed INTEGER NOT NULL DEFAULT 0,
                parsed_data_hash TEXT,
                extracted_fields TEXT NOT NULL DEFAULT '[]',
                data_changed_at TEXT,
                data_change_count INTEGER NOT NULL DEFAULT 0,
                parse_count INTEGER NOT NULL DEFAULT 0,
                rescrape_count INTEGER NOT NULL DEFAULT 0
            );

            -- Append-only scrape attempt audit log
            CREATE TABLE IF NOT EXISTS scrape_attempts (
                id TEXT PRIMARY KEY,
                scrape_url TEXT NOT NULL,
                scraper_job_id TEXT,
                attempt_time TEXT NOT NULL,
                status TEXT NOT NULL,
                processing_time_ms INTEGER NOT NULL DEFAULT 0,
                error_type TEXT,
                error_message TEXT,
                data_hash TEXT,
                has_changes INTEGER NOT NULL DEFAULT 0,
                found_fields TEXT NOT NULL DEFAULT '[]',
                blob_key TEXT,
                source TEXT NOT NULL
            );

            -- Range-scrape job summaries
            CREATE TABLE IF NOT EXISTS scraper_jobs (
                job_id TEXT PRIMARY KEY,
                entity_id TEXT NOT NULL,
                start_id INTEGER NOT NULL,
                end_id INTEGER NOT NULL,
                force_refresh INTEGER NOT NULL DEFAULT 0,
                started_at TEXT NOT NULL,
                finished_at TEXT,
                status TEXT NOT NULL,
                total_urls INTEGER NOT NULL DEFAULT 0,
                success_count INTEGER NOT NULL DEFAULT 0,
                error_count INTEGER NOT NULL DEFAULT 0,
                skipped_count INTEGER NOT NULL DEFAULT 0
            );

            -- Tenants and venues (externally managed, read-mostly)
            CREATE TABLE IF NOT EXISTS entities (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                game_url_domain TEXT NOT NULL,
                game_url_path TEXT NOT NULL,
                default_venue_id TEXT
            );

            CREATE TABLE IF NOT EXISTS venues (
                id TEXT PRIMARY KEY,
                entity_id TEXT NOT NULL,
                name TEXT NOT NULL,
                aliases TEXT NOT NULL DEFAULT '[]',
                fee INTEGER
            );

            -- Parsed games; the full record is JSON with indexed columns
            CREATE TABLE IF NOT EXISTS games (
                entity_id TEXT NOT NULL,
                tournament_id TEXT NOT NULL,
                venue_id TEXT,
                recurring_game_id TEXT,
                game_date TEXT,
                game_status TEXT,
                record TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (entity_id, tournament_id)
            );

            -- Recurring schedule templates
            CREATE TABLE IF NOT EXISTS recurring_games (
                id TEXT PRIMARY KEY,
                entity_id TEXT NOT NULL,
                venue_id TEXT NOT NULL,
                display_name TEXT NOT NULL,
                day_of_week TEXT NOT NULL,
                frequency TEXT NOT NULL,
                start_date TEXT,
                end_date TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                is_paused INTEGER NOT NULL DEFAULT 0
            );

            -- Scheduled occurrences of recurring templates
            CREATE TABLE IF NOT EXISTS recurring_instances (
                id TEXT PRIMARY KEY,
                recurring_game_id TEXT NOT NULL,
                game_id TEXT,
                expected_date TEXT NOT NULL,
                day_of_week TEXT NOT NULL,
                week_key TEXT NOT NULL,
                venue_id TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'UNKNOWN',
                needs_review INTEGER NOT NULL DEFAULT 0,
                review_reason TEXT,
                cancellation_reason TEXT,
                notes TEXT,
                admin_notes TEXT,
                has_deviation INTEGER NOT NULL DEFAULT 0,
                deviation_type TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(recurring_game_id, expected_date)
            );

            -- Observed page structures for drift detection
            CREATE TABLE IF NOT EXISTS structure_fingerprints (
                id TEXT PRIMARY KEY,
                fields TEXT NOT NULL,
                structure_label TEXT,
                occurrence_count INTEGER NOT NULL DEFAULT 1,
                first_seen_at TEXT NOT NULL,
                last_seen_at TEXT NOT NULL,
                example_url TEXT NOT NULL
            );

            -- Secondary indexes
            CREATE INDEX IF NOT EXISTS idx_scrape_urls_entity_tournament
                ON scrape_urls(entity_id, tournament_id);
            CREATE INDEX IF NOT EXISTS idx_scrape_urls_tournament
                ON scrape_urls(tournament_id);
            CREATE INDEX IF NOT EXISTS idx_scrape_urls_source_system
                ON scrape_urls(source_system);
            CREATE INDEX IF NOT EXISTS idx_stored_pages_blob_key
                ON stored_pages(blob_key);
            CREATE INDEX IF NOT EXISTS idx_attempts_url
                ON scrape_attempts(scrape_url, attempt_time);
            CREATE INDEX IF NOT EXISTS idx_attempts_job
                ON scrape_attempts(scraper_job_id);
            CREATE INDEX IF NOT EXISTS idx_venues_entity
                ON venues(entity_id);
            CREATE INDEX IF NOT EXISTS idx_games_venue_date
                ON games(venue_id, game_date);
            CREATE INDEX IF NOT EXISTS idx_games_recurring
                ON games(recurring_game_id, game_date);
            CREATE INDEX IF NOT EXISTS idx_recurring_games_venue
                ON recurring_games(venue_id);
            CREATE INDEX IF NOT EXISTS idx_instances_venue_date
                ON recurring_instances(venue_id, expected_date);
            CREATE INDEX IF NOT EXISTS idx_instances_week
                ON recurring_instances(week_key);
            "#,
        )?;
        Ok(())
    }
}

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string from the database.
pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

/// Collapse a "no rows" query result into `None`.
pub(crate) fn to_option<T>(result: std::result::Result<T, rusqlite::Error>) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
