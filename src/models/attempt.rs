//! Scrape attempt audit trail and job records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one scrape attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    Success,
    Failed,
    SkippedDonotscrape,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::SkippedDonotscrape => "SKIPPED_DONOTSCRAPE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SUCCESS" => Some(Self::Success),
            "FAILED" => Some(Self::Failed),
            "SKIPPED_DONOTSCRAPE" => Some(Self::SkippedDonotscrape),
            _ => None,
        }
    }
}

/// What triggered an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptSource {
    SingleScrape,
    RangeScrape,
    Job,
}

impl AttemptSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleScrape => "SINGLE_SCRAPE",
            Self::RangeScrape => "RANGE_SCRAPE",
            Self::Job => "JOB",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SINGLE_SCRAPE" => Some(Self::SingleScrape),
            "RANGE_SCRAPE" => Some(Self::RangeScrape),
            "JOB" => Some(Self::Job),
            _ => None,
        }
    }
}

/// Append-only record of a single scrape attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeAttempt {
    pub id: String,
    pub scrape_url: String,
    pub scraper_job_id: Option<String>,
    pub attempt_time: DateTime<Utc>,
    pub status: AttemptStatus,
    pub processing_time_ms: i64,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
    pub data_hash: Option<String>,
    pub has_changes: bool,
    pub found_fields: Vec<String>,
    pub blob_key: Option<String>,
    pub source: AttemptSource,
}

impl ScrapeAttempt {
    pub fn new(scrape_url: &str, status: AttemptStatus, source: AttemptSource) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            scrape_url: scrape_url.to_string(),
            scraper_job_id: None,
            attempt_time: Utc::now(),
            status,
            processing_time_ms: 0,
            error_type: None,
            error_message: None,
            data_hash: None,
            has_changes: false,
            found_fields: Vec::new(),
            blob_key: None,
            source,
        }
    }
}

/// Scraper job lifecycle state.
///
/// `QUEUED -> RUNNING -> {SUCCEEDED, FAILED, CANCELLED}`; the right-hand
/// states are terminal. SUCCEEDED requires a zero error count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Running,
    Cancelled,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Cancelled => "CANCELLED",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "QUEUED" => Some(Self::Queued),
            "RUNNING" => Some(Self::Running),
            "CANCELLED" => Some(Self::Cancelled),
            "SUCCEEDED" => Some(Self::Succeeded),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Succeeded | Self::Failed)
    }
}

/// Summary record for one range-scrape job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperJob {
    pub job_id: String,
    pub entity_id: String,
    pub start_id: u64,
    pub end_id: u64,
    pub force_refresh: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: JobStatus,
    pub total_urls: i64,
    pub success_count: i64,
    pub error_count: i64,
    pub skipped_count: i64,
}

impl ScraperJob {
    pub fn new(entity_id: &str, start_id: u64, end_id: u64, force_refresh: bool) -> Self {
        Self {
            job_id: uuid::Uuid::new_v4().to_string(),
            entity_id: entity_id.to_string(),
            start_id,
            end_id,
            force_refresh,
            started_at: Utc::now(),
            finished_at: None,
            status: JobStatus::Queued,
            total_urls: end_id.saturating_sub(start_id) as i64 + 1,
            success_count: 0,
            error_count: 0,
            skipped_count: 0,
        }
    }

    /// Move into the terminal state appropriate for the final counters.
    pub fn finish(&mut self, cancelled: bool, now: DateTime<Utc>) {
        self.finished_at = Some(now);
        self.status = if cancelled {
            JobStatus::Cancelled
        } else if self.error_count == 0 {
            JobStatus::Succeeded
        } else {
            JobStatus::Failed
        };
    }
}
