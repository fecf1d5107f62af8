//! Scrape pipeline orchestrator.
//!
//! One `ingest` call per URL: resolve URL state, decide between cache and
//! live fetch, version the raw HTML blob, parse, fingerprint, and write
//! back URL state plus an attempt record. The pipeline never propagates
//! errors past its boundary; every outcome is an `IngestResult`.

pub mod job;
pub mod url_state;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::blobstore::{page_blob_key, BlobStore};
use crate::config::Settings;
use crate::fetch::{FetchConditions, Fetcher};
use crate::models::{
    extract_tournament_id, AttemptSource, AttemptStatus, Game, InteractionType, ScrapeAttempt,
    ScrapeUrl, StoredPage,
};
use crate::parser::{self, page_state, ParseError};
use crate::repository::{Repository, StoreError};
use url_state::{FetchOutcome, UrlStateManager};

pub use job::RangeJobRunner;

/// Where the parsed HTML came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestSource {
    Live,
    Cache,
    RescrapeCache,
}

impl IngestSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "LIVE",
            Self::Cache => "CACHE",
            Self::RescrapeCache => "RESCRAPE_CACHE",
        }
    }
}

/// Options for one ingest call.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub force_refresh: bool,
    pub override_do_not_scrape: bool,
    pub scraper_job_id: Option<String>,
    pub attempt_source: Option<AttemptSource>,
}

/// The typed outcome of one ingest call. `success == false` carries the
/// error kind and message instead of a panic or a propagated error.
#[derive(Debug)]
pub struct IngestResult {
    pub url: String,
    pub tournament_id: Option<String>,
    pub success: bool,
    pub skipped: bool,
    pub game: Option<Game>,
    pub blob_key: Option<String>,
    pub source: IngestSource,
    pub used_cache: bool,
    pub data_changed: bool,
    pub found_fields: Vec<String>,
    pub error_type: Option<String>,
    pub error: Option<String>,
}

impl IngestResult {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            tournament_id: extract_tournament_id(url),
            success: false,
            skipped: false,
            game: None,
            blob_key: None,
            source: IngestSource::Live,
            used_cache: false,
            data_changed: false,
            found_fields: Vec::new(),
            error_type: None,
            error: None,
        }
    }

    fn failed(mut self, error_type: &str, message: String) -> Self {
        self.success = false;
        self.error_type = Some(error_type.to_string());
        self.error = Some(message);
        self
    }
}

pub struct ScrapePipeline {
    repo: Repository,
    blobs: Arc<dyn BlobStore>,
    fetcher: Arc<dyn Fetcher>,
    url_state: UrlStateManager,
    guarantee_inference_min_cents: i64,
}

impl ScrapePipeline {
    pub fn new(
        repo: Repository,
        blobs: Arc<dyn BlobStore>,
        fetcher: Arc<dyn Fetcher>,
        settings: &Settings,
    ) -> Self {
        let url_state = UrlStateManager::new(repo.clone(), &settings.source_system);
        Self {
            repo,
            blobs,
            fetcher,
            url_state,
            guarantee_inference_min_cents: settings.guarantee_inference_min_cents,
        }
    }

    /// Ingest one URL end to end.
    pub async fn ingest(&self, url: &str, entity_id: &str, opts: IngestOptions) -> IngestResult {
        let started = Instant::now();
        let mut result = IngestResult::new(url);
        let tournament_id = result.tournament_id.clone();

        let mut record = match self
            .url_state
            .get_or_create(url, entity_id, tournament_id.as_deref())
        {
            Ok(r) => r,
            Err(e) => return result.failed("STORAGE", e.to_string()),
        };

        if record.do_not_scrape && !opts.override_do_not_scrape && !opts.force_refresh {
            debug!(url, "skipping do-not-scrape url");
            result.skipped = true;
            result.success = true;
            self.record_attempt(
                url,
                AttemptStatus::SkippedDonotscrape,
                &opts,
                started,
                |_| {},
            );
            return result;
        }

        let venues = self
            .repo
            .venues_for_entity(entity_id)
            .unwrap_or_else(|e| {
                warn!(entity_id, error = %e, "venue catalog unavailable");
                Vec::new()
            });

        // Decide fetch path
        let use_cache = !opts.force_refresh
            && record.has_stored_content()
            && !record.is_stale(Utc::now());

        let (html, fetched_live) = if use_cache {
            match self.load_cached_html(&record).await {
                Some(html) => (html, false),
                // Cache said fresh but the blob is gone; fall back to live
                None => match self.fetch_live(url, &mut record, &opts, started, &mut result).await {
                    Some(outcome) => outcome,
                    None => return result,
                },
            }
        } else {
            match self.fetch_live(url, &mut record, &opts, started, &mut result).await {
                Some(outcome) => outcome,
                None => return result,
            }
        };

        result.source = if fetched_live {
            IngestSource::Live
        } else {
            IngestSource::Cache
        };
        result.used_cache = !fetched_live;

        // Bot challenge bodies are transient fetch failures; never store
        // or parse them as content
        if let Some(kind) = page_state::detect_bot_block(&html) {
            warn!(url, kind = kind.as_str(), "bot challenge page");
            let _ = self
                .url_state
                .mark_fetched(&mut record, FetchOutcome::Failure(kind.as_str().to_string()));
            self.record_attempt(url, AttemptStatus::Failed, &opts, started, |a| {
                a.error_type = Some("BOT_BLOCKED".to_string());
                a.error_message = Some(kind.as_str().to_string());
            });
            return result.failed("BOT_BLOCKED", format!("bot challenge: {}", kind.as_str()));
        }

        // Version the blob only for live fetches
        let mut page = if fetched_live {
            match self
                .store_page_version(url, entity_id, tournament_id.as_deref(), &record, &html)
                .await
            {
                Ok(page) => Some(page),
                Err(e) => {
                    let _ = self
                        .url_state
                        .mark_fetched(&mut record, FetchOutcome::Failure(e.clone()));
                    self.record_attempt(url, AttemptStatus::Failed, &opts, started, |a| {
                        a.error_type = Some("STORAGE".to_string());
                        a.error_message = Some(e.clone());
                    });
                    return result.failed("STORAGE", e);
                }
            }
        } else {
            self.repo.get_stored_page(url).ok().flatten()
        };

        if let Some(p) = &page {
            result.blob_key = Some(p.blob_key.clone());
            let _ = self.url_state.link_latest_blob(url, &p.blob_key, &p.id);
            record.latest_blob_key = Some(p.blob_key.clone());
            record.latest_page_id = Some(p.id.clone());
            record.content_hash = Some(p.content_hash.clone());
            record.content_size = Some(p.content_size);
            record.etag = p.etag.clone();
            record.last_modified_header = p.last_modified.clone();
        }

        // Parse
        let mut parsed = match parser::parse_tournament_page(
            &html,
            url,
            entity_id,
            &venues,
            self.guarantee_inference_min_cents,
        ) {
            Ok(parsed) => parsed,
            Err(ParseError::BotBlocked(kind)) => {
                let _ = self
                    .url_state
                    .mark_fetched(&mut record, FetchOutcome::Failure(kind.as_str().to_string()));
                self.record_attempt(url, AttemptStatus::Failed, &opts, started, |a| {
                    a.error_type = Some("BOT_BLOCKED".to_string());
                });
                return result.failed("BOT_BLOCKED", kind.as_str().to_string());
            }
        };
        self.apply_default_venue(entity_id, &mut parsed.game);

        let now = Utc::now();
        let _ = self
            .repo
            .record_fingerprint(&parsed.found_fields, url, now);

        // Dead pages stop future scraping
        let status = parsed.game.game_status;
        let interaction = if status == crate::models::GameStatus::NotPublished {
            let _ = self.url_state.set_do_not_scrape(url, "page not published");
            record.do_not_scrape = true;
            InteractionType::ScrapedNotPublished
        } else if status.is_dead_page() {
            let _ = self.url_state.set_do_not_scrape(url, "page not in use");
            record.do_not_scrape = true;
            InteractionType::ScrapedNotInUse
        } else {
            InteractionType::ScrapedWithHtml
        };

        // Parse bookkeeping on the stored page
        let data_hash = parsed.game.data_hash();
        let mut data_changed = false;
        if let Some(p) = page.as_mut() {
            let read_version = p.version_number;
            data_changed = p.record_parse(&data_hash, parsed.found_fields.clone(), now);
            if let Err(StoreError::Conflict(_)) = self.repo.update_stored_page(p, read_version) {
                // A concurrent ingest advanced the head; its parse result wins
                debug!(url, "stored page superseded during parse write-back");
            }
        }

        // Minimal records for dead pages still land so downstream stops
        // retrying the id
        if let Err(e) = self.repo.upsert_game(&parsed.game) {
            warn!(url, error = %e, "game upsert failed");
        }

        record.game_status = Some(status.as_str().to_string());
        let _ = self
            .url_state
            .mark_fetched(&mut record, FetchOutcome::Success(interaction));

        let blob_key = result.blob_key.clone();
        let fields = parsed.found_fields.clone();
        self.record_attempt(url, AttemptStatus::Success, &opts, started, |a| {
            a.data_hash = Some(data_hash.clone());
            a.has_changes = data_changed;
            a.found_fields = fields.clone();
            a.blob_key = blob_key.clone();
        });

        info!(
            url,
            source = result.source.as_str(),
            status = status.as_str(),
            changed = data_changed,
            "ingested"
        );

        result.success = true;
        result.data_changed = data_changed;
        result.found_fields = parsed.found_fields;
        result.game = Some(parsed.game);
        result
    }

    /// Re-parse previously stored content by blob key, without fetching.
    pub async fn ingest_from_cache(&self, blob_key: &str, entity_id: &str) -> IngestResult {
        let started = Instant::now();

        let page = match self.repo.get_stored_page_by_blob_key(blob_key) {
            Ok(Some(page)) => page,
            Ok(None) => {
                return IngestResult::new(blob_key)
                    .failed("NOT_FOUND", format!("no stored page for blob {blob_key}"))
            }
            Err(e) => return IngestResult::new(blob_key).failed("STORAGE", e.to_string()),
        };

        let url = page.scrape_url.clone();
        let mut result = IngestResult::new(&url);

        let html = match self.blobs.get(blob_key).await {
            Ok(content) => String::from_utf8_lossy(&content.bytes).into_owned(),
            Err(e) => return result.failed("BLOB", e.to_string()),
        };

        let venues = self.repo.venues_for_entity(entity_id).unwrap_or_default();
        let mut parsed = match parser::parse_tournament_page(
            &html,
            &url,
            entity_id,
            &venues,
            self.guarantee_inference_min_cents,
        ) {
            Ok(parsed) => parsed,
            Err(ParseError::BotBlocked(kind)) => {
                return result.failed("BOT_BLOCKED", kind.as_str().to_string())
            }
        };
        self.apply_default_venue(entity_id, &mut parsed.game);

        let now = Utc::now();
        let _ = self.repo.record_fingerprint(&parsed.found_fields, &url, now);

        let data_hash = parsed.game.data_hash();
        let mut page = page;
        let read_version = page.version_number;
        let data_changed = page.record_parse(&data_hash, parsed.found_fields.clone(), now);
        let _ = self.repo.update_stored_page(&page, read_version);

        if let Err(e) = self.repo.upsert_game(&parsed.game) {
            warn!(url = %url, error = %e, "game upsert failed");
        }

        let opts = IngestOptions::default();
        let fields = parsed.found_fields.clone();
        self.record_attempt(&url, AttemptStatus::Success, &opts, started, |a| {
            a.data_hash = Some(data_hash.clone());
            a.has_changes = data_changed;
            a.found_fields = fields.clone();
            a.blob_key = Some(blob_key.to_string());
        });

        result.success = true;
        result.source = IngestSource::RescrapeCache;
        result.used_cache = true;
        result.data_changed = data_changed;
        result.blob_key = Some(blob_key.to_string());
        result.found_fields = parsed.found_fields;
        result.game = Some(parsed.game);
        result
    }

    async fn load_cached_html(&self, record: &ScrapeUrl) -> Option<String> {
        let key = record.latest_blob_key.as_deref()?;
        match self.blobs.get(key).await {
            Ok(content) => Some(String::from_utf8_lossy(&content.bytes).into_owned()),
            Err(e) => {
                warn!(key, error = %e, "cached blob unavailable");
                None
            }
        }
    }

    /// Perform the conditional fetch. Returns `(html, fetched_live)`;
    /// `fetched_live == false` means a 304 revalidation served the cached
    /// head. `None` means the failure was already recorded into `result`.
    async fn fetch_live(
        &self,
        url: &str,
        record: &mut ScrapeUrl,
        opts: &IngestOptions,
        started: Instant,
        result: &mut IngestResult,
    ) -> Option<(String, bool)> {
        let conditions = FetchConditions {
            if_none_match: record.etag.clone(),
            if_modified_since: record.last_modified_header.clone(),
        };

        match self.fetcher.fetch(url, &conditions).await {
            Ok(response) if response.is_not_modified() => {
                debug!(url, "304 not modified");
                match self.load_cached_html(record).await {
                    // Revalidated head; the caller parses the cached body
                    // and records the single success for this run
                    Some(html) => Some((html, false)),
                    None => {
                        let message = "304 received but cached blob missing".to_string();
                        let _ = self
                            .url_state
                            .mark_fetched(record, FetchOutcome::Failure(message.clone()));
                        self.record_attempt(url, AttemptStatus::Failed, opts, started, |a| {
                            a.error_type = Some("CACHE_MISS".to_string());
                            a.error_message = Some(message.clone());
                        });
                        *result = IngestResult::new(url).failed("CACHE_MISS", message);
                        None
                    }
                }
            }
            Ok(response) => {
                record.etag = response.etag.clone();
                record.last_modified_header = response.last_modified.clone();
                match response.body {
                    Some(body) => Some((body, true)),
                    None => {
                        let message = format!("empty body with status {}", response.status);
                        let _ = self
                            .url_state
                            .mark_fetched(record, FetchOutcome::Failure(message.clone()));
                        self.record_attempt(url, AttemptStatus::Failed, opts, started, |a| {
                            a.error_type = Some("EMPTY_BODY".to_string());
                            a.error_message = Some(message.clone());
                        });
                        *result = IngestResult::new(url).failed("EMPTY_BODY", message);
                        None
                    }
                }
            }
            Err(e) => {
                let kind = e.kind();
                let message = e.to_string();
                let _ = self
                    .url_state
                    .mark_fetched(record, FetchOutcome::Failure(message.clone()));
                // Permanent content outcomes retire the URL
                if !e.is_transient() {
                    let _ = self.url_state.set_do_not_scrape(url, &message);
                }
                self.record_attempt(url, AttemptStatus::Failed, opts, started, |a| {
                    a.error_type = Some(kind.to_string());
                    a.error_message = Some(message.clone());
                });
                *result = IngestResult::new(url).failed(kind, message);
                None
            }
        }
    }

    /// Write the fetched body into the versioned page record, deduplicating
    /// identical content. Retries once on a version-number race.
    async fn store_page_version(
        &self,
        url: &str,
        entity_id: &str,
        tournament_id: Option<&str>,
        record: &ScrapeUrl,
        html: &str,
    ) -> std::result::Result<StoredPage, String> {
        let now = Utc::now();
        let key = page_blob_key(entity_id, tournament_id.unwrap_or("unknown"), now);

        let existing = self.repo.get_stored_page(url).map_err(|e| e.to_string())?;
        match existing {
            None => {
                self.blobs
                    .put(&key, html.as_bytes())
                    .await
                    .map_err(|e| e.to_string())?;
                let page = StoredPage::new(
                    url,
                    entity_id,
                    tournament_id.map(|t| t.to_string()),
                    key,
                    html.as_bytes(),
                    record.etag.clone(),
                    record.last_modified_header.clone(),
                    Some(200),
                );
                if self
                    .repo
                    .create_stored_page_if_absent(&page)
                    .map_err(|e| e.to_string())?
                {
                    return Ok(page);
                }
                // Lost the create race; fold into the winner's row
                let head = self
                    .repo
                    .get_stored_page(url)
                    .map_err(|e| e.to_string())?
                    .ok_or_else(|| "stored page vanished after create race".to_string())?;
                self.apply_fetch_to_head(head, url, entity_id, record, html, now)
                    .await
            }
            Some(head) => {
                self.apply_fetch_to_head(head, url, entity_id, record, html, now)
                    .await
            }
        }
    }

    async fn apply_fetch_to_head(
        &self,
        mut head: StoredPage,
        url: &str,
        entity_id: &str,
        record: &ScrapeUrl,
        html: &str,
        now: chrono::DateTime<Utc>,
    ) -> std::result::Result<StoredPage, String> {
        for _ in 0..2 {
            let read_version = head.version_number;
            let key = page_blob_key(entity_id, head.tournament_id.as_deref().unwrap_or("unknown"), now);

            let changed = head.record_fetch(
                key.clone(),
                html.as_bytes(),
                record.etag.clone(),
                record.last_modified_header.clone(),
                Some(200),
                now,
            );
            if changed {
                self.blobs
                    .put(&key, html.as_bytes())
                    .await
                    .map_err(|e| e.to_string())?;
            }

            match self.repo.update_stored_page(&head, read_version) {
                Ok(()) => return Ok(head),
                Err(StoreError::Conflict(_)) => {
                    debug!(url, "version race on stored page, re-reading head");
                    head = self
                        .repo
                        .get_stored_page(url)
                        .map_err(|e| e.to_string())?
                        .ok_or_else(|| "stored page vanished during version race".to_string())?;
                }
                Err(e) => return Err(e.to_string()),
            }
        }
        Err("stored page update kept losing version races".to_string())
    }

    /// Fall back to the entity's default venue when alias matching found
    /// nothing.
    fn apply_default_venue(&self, entity_id: &str, game: &mut Game) {
        if game.venue_id.is_some() {
            return;
        }
        if let Ok(Some(entity)) = self.repo.get_entity(entity_id) {
            game.venue_id = entity.default_venue_id;
        }
    }

    fn record_attempt<F>(
        &self,
        url: &str,
        status: AttemptStatus,
        opts: &IngestOptions,
        started: Instant,
        fill: F,
    ) where
        F: FnOnce(&mut ScrapeAttempt),
    {
        let source = opts.attempt_source.unwrap_or(AttemptSource::SingleScrape);
        let mut attempt = ScrapeAttempt::new(url, status, source);
        attempt.scraper_job_id = opts.scraper_job_id.clone();
        attempt.processing_time_ms = started.elapsed().as_millis() as i64;
        fill(&mut attempt);
        if let Err(e) = self.repo.record_attempt(&attempt) {
            warn!(url, error = %e, "attempt record failed");
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }
}
