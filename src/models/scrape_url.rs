//! ScrapeUrl - the single source of truth for every tracked URL.
//!
//! One record exists per URL (the URL is the primary key). All scrape
//! statistics, conditional-fetch hints, and the link to the latest stored
//! page version live here; nothing else duplicates these fields.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a scrape URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScrapeUrlStatus {
    Pending,
    Cached,
    Active,
    Error,
    Skipped,
}

impl ScrapeUrlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Cached => "CACHED",
            Self::Active => "ACTIVE",
            Self::Error => "ERROR",
            Self::Skipped => "SKIPPED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "CACHED" => Some(Self::Cached),
            "ACTIVE" => Some(Self::Active),
            "ERROR" => Some(Self::Error),
            "SKIPPED" => Some(Self::Skipped),
            _ => None,
        }
    }
}

/// Outcome of the last interaction with a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionType {
    ScrapedWithHtml,
    ScrapedNotPublished,
    ScrapedNotInUse,
    ScrapedError,
    ManualUpload,
    NeverChecked,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScrapedWithHtml => "SCRAPED_WITH_HTML",
            Self::ScrapedNotPublished => "SCRAPED_NOT_PUBLISHED",
            Self::ScrapedNotInUse => "SCRAPED_NOT_IN_USE",
            Self::ScrapedError => "SCRAPED_ERROR",
            Self::ManualUpload => "MANUAL_UPLOAD",
            Self::NeverChecked => "NEVER_CHECKED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SCRAPED_WITH_HTML" => Some(Self::ScrapedWithHtml),
            "SCRAPED_NOT_PUBLISHED" => Some(Self::ScrapedNotPublished),
            "SCRAPED_NOT_IN_USE" => Some(Self::ScrapedNotInUse),
            "SCRAPED_ERROR" => Some(Self::ScrapedError),
            "MANUAL_UPLOAD" => Some(Self::ManualUpload),
            "NEVER_CHECKED" => Some(Self::NeverChecked),
            _ => None,
        }
    }

    /// How long a cached result of this kind stays fresh.
    ///
    /// `None` means always stale (never checked).
    pub fn freshness_window(&self) -> Option<Duration> {
        match self {
            Self::ScrapedWithHtml | Self::ManualUpload => Some(Duration::minutes(5)),
            Self::ScrapedNotPublished => Some(Duration::minutes(60)),
            Self::ScrapedNotInUse => Some(Duration::hours(24)),
            Self::ScrapedError => Some(Duration::minutes(15)),
            Self::NeverChecked => None,
        }
    }
}

/// Canonical state record for a source URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeUrl {
    /// The URL itself; primary key.
    pub url: String,
    pub entity_id: String,
    pub tournament_id: Option<String>,
    /// Which source-site schema produced this URL.
    pub source_system: String,

    pub status: ScrapeUrlStatus,
    pub do_not_scrape: bool,
    /// Last observed game status text.
    pub game_status: Option<String>,
    /// Blob key of the current head version, if content has been stored.
    pub latest_blob_key: Option<String>,
    /// Row id of the stored-page record holding version history.
    pub latest_page_id: Option<String>,

    pub times_scraped: i64,
    pub times_successful: i64,
    pub times_failed: i64,
    pub consecutive_failures: i64,
    pub first_scraped_at: Option<DateTime<Utc>>,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub last_successful_scrape_at: Option<DateTime<Utc>>,

    // Conditional-fetch hints
    pub etag: Option<String>,
    pub last_modified_header: Option<String>,
    pub content_hash: Option<String>,
    pub content_size: Option<i64>,

    pub last_interaction: InteractionType,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScrapeUrl {
    /// Create a fresh, never-scraped record.
    pub fn new(url: &str, entity_id: &str, tournament_id: Option<String>, source_system: &str) -> Self {
        let now = Utc::now();
        Self {
            url: url.to_string(),
            entity_id: entity_id.to_string(),
            tournament_id,
            source_system: source_system.to_string(),
            status: ScrapeUrlStatus::Pending,
            do_not_scrape: false,
            game_status: None,
            latest_blob_key: None,
            latest_page_id: None,
            times_scraped: 0,
            times_successful: 0,
            times_failed: 0,
            consecutive_failures: 0,
            first_scraped_at: None,
            last_scraped_at: None,
            last_successful_scrape_at: None,
            etag: None,
            last_modified_header: None,
            content_hash: None,
            content_size: None,
            last_interaction: InteractionType::NeverChecked,
            last_error: None,
            last_error_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `latest_blob_key` is non-null iff content has been stored.
    pub fn has_stored_content(&self) -> bool {
        self.latest_blob_key.is_some()
    }

    /// Whether the cached result has aged out and the URL should be fetched.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        let Some(window) = self.last_interaction.freshness_window() else {
            return true;
        };
        match self.last_scraped_at {
            Some(at) => now - at >= window,
            None => true,
        }
    }

    /// Record a successful scrape outcome.
    pub fn mark_success(&mut self, interaction: InteractionType, now: DateTime<Utc>) {
        self.times_scraped += 1;
        self.times_successful += 1;
        self.consecutive_failures = 0;
        self.first_scraped_at.get_or_insert(now);
        self.last_scraped_at = Some(now);
        self.last_successful_scrape_at = Some(now);
        self.last_interaction = interaction;
        self.status = ScrapeUrlStatus::Active;
        self.updated_at = now;
    }

    /// Record a failed scrape outcome.
    pub fn mark_failure(&mut self, error: &str, now: DateTime<Utc>) {
        self.times_scraped += 1;
        self.times_failed += 1;
        self.consecutive_failures += 1;
        self.first_scraped_at.get_or_insert(now);
        self.last_scraped_at = Some(now);
        self.last_interaction = InteractionType::ScrapedError;
        self.last_error = Some(error.to_string());
        self.last_error_at = Some(now);
        self.status = ScrapeUrlStatus::Error;
        self.updated_at = now;
    }
}
