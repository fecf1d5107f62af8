//! URL-state manager.
//!
//! Owns the lifecycle of `ScrapeUrl` records: lookup, conditional creation
//! with a salvage path for orphaned stored pages, and scrape-outcome
//! bookkeeping.

use chrono::Utc;
use tracing::{debug, info};

use crate::models::{InteractionType, ScrapeUrl, ScrapeUrlStatus};
use crate::repository::{Repository, Result};

/// Outcome of one scrape pass, as seen by URL state.
#[derive(Debug)]
pub enum FetchOutcome {
    Success(InteractionType),
    Failure(String),
}

#[derive(Clone)]
pub struct UrlStateManager {
    repo: Repository,
    source_system: String,
}

impl UrlStateManager {
    pub fn new(repo: Repository, source_system: &str) -> Self {
        Self {
            repo,
            source_system: source_system.to_string(),
        }
    }

    /// Find or create the state record for a URL.
    ///
    /// Lookup order: `(entityId, tournamentId)` index, then the URL primary
    /// key. Creation is conditional; a concurrent creator winning the race
    /// is resolved by re-reading. If a stored page already exists for the
    /// URL (state row lost, content kept), the new record is salvaged as
    /// `CACHED` with the head blob restored.
    pub fn get_or_create(
        &self,
        url: &str,
        entity_id: &str,
        tournament_id: Option<&str>,
    ) -> Result<ScrapeUrl> {
        if let Some(tid) = tournament_id {
            if let Some(existing) = self
                .repo
                .find_scrape_url_by_entity_tournament(entity_id, tid)?
            {
                return Ok(existing);
            }
        }
        if let Some(existing) = self.repo.get_scrape_url(url)? {
            return Ok(existing);
        }

        let mut record = ScrapeUrl::new(
            url,
            entity_id,
            tournament_id.map(|t| t.to_string()),
            &self.source_system,
        );

        // Salvage path: content exists but the state row was lost
        if let Some(page) = self.repo.get_stored_page(url)? {
            info!(url, blob_key = %page.blob_key, "restoring url state from stored page");
            record.status = ScrapeUrlStatus::Cached;
            record.latest_blob_key = Some(page.blob_key.clone());
            record.latest_page_id = Some(page.id.clone());
            record.content_hash = Some(page.content_hash.clone());
            record.content_size = Some(page.content_size);
            record.etag = page.etag.clone();
            record.last_modified_header = page.last_modified.clone();
            record.last_interaction = InteractionType::ScrapedWithHtml;
            record.last_scraped_at = Some(page.scraped_at);
        }

        if self.repo.create_scrape_url_if_absent(&record)? {
            debug!(url, "created scrape url");
            return Ok(record);
        }

        // Lost the create race; the winner's row is authoritative
        match self.repo.get_scrape_url(url)? {
            Some(existing) => Ok(existing),
            None => Ok(record),
        }
    }

    /// Apply a scrape outcome and persist the record.
    pub fn mark_fetched(&self, record: &mut ScrapeUrl, outcome: FetchOutcome) -> Result<()> {
        let now = Utc::now();
        match outcome {
            FetchOutcome::Success(interaction) => record.mark_success(interaction, now),
            FetchOutcome::Failure(error) => record.mark_failure(&error, now),
        }
        self.repo.update_scrape_url(record)
    }

    pub fn set_do_not_scrape(&self, url: &str, reason: &str) -> Result<()> {
        info!(url, reason, "marking url do-not-scrape");
        self.repo.set_do_not_scrape(url, true, Some(reason))
    }

    pub fn link_latest_blob(&self, url: &str, blob_key: &str, page_id: &str) -> Result<()> {
        self.repo.link_latest_blob(url, blob_key, page_id)
    }
}
