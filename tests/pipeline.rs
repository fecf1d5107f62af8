//! End-to-end pipeline tests with a stub fetcher and a temp-dir blob store.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::{tempdir, TempDir};

use railbird::blobstore::FsBlobStore;
use railbird::config::Settings;
use railbird::fetch::{FetchConditions, FetchError, FetchResponse, Fetcher};
use railbird::models::{AttemptStatus, GameStatus, InteractionType};
use railbird::pipeline::{IngestOptions, IngestSource, ScrapePipeline};
use railbird::repository::Repository;

const URL: &str = "https://poker.example.com/tournament.php?id=42";

/// Returns canned responses in order and records the conditions of each
/// request. Panics on an unexpected fetch.
struct StubFetcher {
    responses: Mutex<VecDeque<Result<FetchResponse, FetchError>>>,
    conditions: Mutex<Vec<FetchConditions>>,
}

impl StubFetcher {
    fn new(responses: Vec<Result<FetchResponse, FetchError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            conditions: Mutex::new(Vec::new()),
        })
    }

    fn seen_conditions(&self) -> Vec<FetchConditions> {
        self.conditions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(
        &self,
        url: &str,
        conditions: &FetchConditions,
    ) -> Result<FetchResponse, FetchError> {
        self.conditions.lock().unwrap().push(conditions.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected fetch of {url}"))
    }
}

fn ok_page(body: &str, etag: &str) -> Result<FetchResponse, FetchError> {
    Ok(FetchResponse {
        body: Some(body.to_string()),
        status: 200,
        etag: Some(etag.to_string()),
        last_modified: None,
        content_length: Some(body.len() as u64),
    })
}

fn not_modified(etag: &str) -> Result<FetchResponse, FetchError> {
    Ok(FetchResponse {
        body: None,
        status: 304,
        etag: Some(etag.to_string()),
        last_modified: None,
        content_length: None,
    })
}

fn tournament_page(title: &str) -> String {
    format!(
        r#"<html><head><title>{title}</title></head><body>
        <div class="cw-game-title">{title}</div>
        <span id="cw_clock_buyin">$100 + $20</span>
        <div><label>Status</label><strong>Running</strong></div>
        </body></html>"#
    )
}

struct Harness {
    pipeline: ScrapePipeline,
    repo: Repository,
    fetcher: Arc<StubFetcher>,
    _dir: TempDir,
}

fn harness(responses: Vec<Result<FetchResponse, FetchError>>) -> Harness {
    let dir = tempdir().unwrap();
    let settings = Settings::with_data_dir(dir.path().to_path_buf());
    let repo = Repository::open(&settings.database_path()).unwrap();
    let blobs = Arc::new(FsBlobStore::new(&settings.pages_dir()));
    let fetcher = StubFetcher::new(responses);
    let pipeline = ScrapePipeline::new(repo.clone(), blobs, fetcher.clone() as Arc<dyn Fetcher>, &settings);
    Harness {
        pipeline,
        repo,
        fetcher,
        _dir: dir,
    }
}

fn force() -> IngestOptions {
    IngestOptions {
        force_refresh: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_first_scrape_stores_version_and_game() {
    let h = harness(vec![ok_page(&tournament_page("Tuesday Deepstack"), "\"v1\"")]);

    let result = h.pipeline.ingest(URL, "E1", IngestOptions::default()).await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.source, IngestSource::Live);
    assert!(!result.used_cache);
    assert!(result.data_changed);
    assert!(result.blob_key.is_some());

    let page = h.repo.get_stored_page(URL).unwrap().unwrap();
    assert_eq!(page.version_number, 1);
    assert!(page.previous_versions.is_empty());
    assert!(page.is_parsed);

    let record = h.repo.get_scrape_url(URL).unwrap().unwrap();
    assert_eq!(record.times_scraped, 1);
    assert_eq!(record.times_successful, 1);
    assert_eq!(record.etag.as_deref(), Some("\"v1\""));
    assert_eq!(record.last_interaction, InteractionType::ScrapedWithHtml);
    assert_eq!(record.latest_blob_key, result.blob_key);

    let game = h.repo.get_game("E1", "42").unwrap().unwrap();
    assert_eq!(game.name.as_deref(), Some("Tuesday Deepstack"));
    assert_eq!(game.buy_in, Some(10_000));
    assert_eq!(game.rake, Some(2_000));

    let attempts = h.repo.recent_attempts(URL, 10).unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status, AttemptStatus::Success);
}

#[tokio::test]
async fn test_revalidation_serves_cached_head() {
    let body = tournament_page("Tuesday Deepstack");
    let h = harness(vec![ok_page(&body, "\"v1\""), not_modified("\"v1\"")]);

    h.pipeline.ingest(URL, "E1", IngestOptions::default()).await;
    let result = h.pipeline.ingest(URL, "E1", force()).await;

    assert!(result.success);
    assert_eq!(result.source, IngestSource::Cache);
    assert!(result.used_cache);
    assert!(!result.data_changed);

    // The second request carried the stored validator
    let conditions = h.fetcher.seen_conditions();
    assert_eq!(conditions.len(), 2);
    assert_eq!(conditions[1].if_none_match.as_deref(), Some("\"v1\""));

    // No new version, one more scrape, one more attempt
    let page = h.repo.get_stored_page(URL).unwrap().unwrap();
    assert_eq!(page.version_number, 1);
    let record = h.repo.get_scrape_url(URL).unwrap().unwrap();
    assert_eq!(record.times_scraped, 2);
    assert_eq!(record.times_successful, 2);
    let attempts = h.repo.recent_attempts(URL, 10).unwrap();
    assert_eq!(attempts.len(), 2);
    assert!(attempts.iter().all(|a| a.status == AttemptStatus::Success));
}

#[tokio::test]
async fn test_changed_content_appends_version() {
    let h = harness(vec![
        ok_page(&tournament_page("Tuesday Deepstack"), "\"v1\""),
        ok_page(&tournament_page("Tuesday Deepstack $5K GTD"), "\"v2\""),
    ]);

    h.pipeline.ingest(URL, "E1", IngestOptions::default()).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let result = h.pipeline.ingest(URL, "E1", force()).await;

    assert!(result.success);
    assert!(result.data_changed);

    let page = h.repo.get_stored_page(URL).unwrap().unwrap();
    assert_eq!(page.version_number, 2);
    assert_eq!(page.previous_versions.len(), 1);
    assert_eq!(page.data_change_count, 2);

    let game = h.repo.get_game("E1", "42").unwrap().unwrap();
    assert_eq!(game.name.as_deref(), Some("Tuesday Deepstack $5K GTD"));
    assert!(game.has_guarantee);
}

#[tokio::test]
async fn test_identical_content_deduplicates() {
    let body = tournament_page("Tuesday Deepstack");
    let h = harness(vec![ok_page(&body, "\"v1\""), ok_page(&body, "\"v1\"")]);

    h.pipeline.ingest(URL, "E1", IngestOptions::default()).await;
    let result = h.pipeline.ingest(URL, "E1", force()).await;

    assert!(result.success);
    assert!(!result.data_changed);

    let page = h.repo.get_stored_page(URL).unwrap().unwrap();
    assert_eq!(page.version_number, 1);
    assert!(page.previous_versions.is_empty());
    assert_eq!(page.rescrape_count, 1);
}

#[tokio::test]
async fn test_fresh_cache_skips_network() {
    let h = harness(vec![ok_page(&tournament_page("Tuesday Deepstack"), "\"v1\"")]);

    h.pipeline.ingest(URL, "E1", IngestOptions::default()).await;
    // Within the freshness window; the stub would panic on a second fetch
    let result = h.pipeline.ingest(URL, "E1", IngestOptions::default()).await;

    assert!(result.success);
    assert_eq!(result.source, IngestSource::Cache);
    assert!(result.used_cache);
    assert_eq!(h.fetcher.seen_conditions().len(), 1);
}

#[tokio::test]
async fn test_bot_challenge_is_never_stored() {
    let challenge = r#"<html><head><meta http-equiv="refresh"
        content="0;url=/.well-known/sgcaptcha/?r=%2Ftournament.php"></head></html>"#;
    let h = harness(vec![ok_page(challenge, "\"v1\"")]);

    let result = h.pipeline.ingest(URL, "E1", IngestOptions::default()).await;

    assert!(!result.success);
    assert_eq!(result.error_type.as_deref(), Some("BOT_BLOCKED"));

    // Challenge bodies are not content: no stored page, no game, URL stays
    // scrapeable
    assert!(h.repo.get_stored_page(URL).unwrap().is_none());
    assert!(h.repo.get_game("E1", "42").unwrap().is_none());
    let record = h.repo.get_scrape_url(URL).unwrap().unwrap();
    assert!(!record.do_not_scrape);
    assert_eq!(record.consecutive_failures, 1);

    let attempts = h.repo.recent_attempts(URL, 10).unwrap();
    assert_eq!(attempts[0].status, AttemptStatus::Failed);
    assert_eq!(attempts[0].error_type.as_deref(), Some("BOT_BLOCKED"));
}

#[tokio::test]
async fn test_dead_page_retires_url() {
    let body = r#"<html><head><title>Tournament</title></head><body>
        <span class="cw-badge cw-bg-warning">Tournament not published</span>
        </body></html>"#;
    let h = harness(vec![ok_page(body, "\"v1\"")]);

    let result = h.pipeline.ingest(URL, "E1", IngestOptions::default()).await;
    assert!(result.success);

    let record = h.repo.get_scrape_url(URL).unwrap().unwrap();
    assert!(record.do_not_scrape);
    assert_eq!(record.last_interaction, InteractionType::ScrapedNotPublished);

    // A minimal game record still lands so downstream stops retrying the id
    let game = h.repo.get_game("E1", "42").unwrap().unwrap();
    assert_eq!(game.game_status, GameStatus::NotPublished);

    // Subsequent ingests skip without fetching
    let skipped = h.pipeline.ingest(URL, "E1", IngestOptions::default()).await;
    assert!(skipped.success);
    assert!(skipped.skipped);
    assert_eq!(h.fetcher.seen_conditions().len(), 1);
    let attempts = h.repo.recent_attempts(URL, 10).unwrap();
    assert_eq!(attempts[0].status, AttemptStatus::SkippedDonotscrape);
}

#[tokio::test]
async fn test_permanent_error_retires_url_transient_does_not() {
    let h = harness(vec![Err(FetchError::ServerError(503))]);
    let result = h.pipeline.ingest(URL, "E1", IngestOptions::default()).await;
    assert!(!result.success);
    assert_eq!(result.error_type.as_deref(), Some("SERVER_ERROR"));
    let record = h.repo.get_scrape_url(URL).unwrap().unwrap();
    assert!(!record.do_not_scrape);

    let h = harness(vec![Err(FetchError::NotFound)]);
    let result = h.pipeline.ingest(URL, "E1", IngestOptions::default()).await;
    assert!(!result.success);
    assert_eq!(result.error_type.as_deref(), Some("NOT_FOUND"));
    let record = h.repo.get_scrape_url(URL).unwrap().unwrap();
    assert!(record.do_not_scrape);
}

#[tokio::test]
async fn test_reparse_from_cache_needs_no_network() {
    let h = harness(vec![ok_page(&tournament_page("Tuesday Deepstack"), "\"v1\"")]);

    let first = h.pipeline.ingest(URL, "E1", IngestOptions::default()).await;
    let blob_key = first.blob_key.unwrap();

    let result = h.pipeline.ingest_from_cache(&blob_key, "E1").await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.source, IngestSource::RescrapeCache);
    assert!(result.used_cache);
    // Same content parses to the same data hash
    assert!(!result.data_changed);
    assert_eq!(h.fetcher.seen_conditions().len(), 1);

    let game = h.repo.get_game("E1", "42").unwrap().unwrap();
    assert_eq!(game.name.as_deref(), Some("Tuesday Deepstack"));
}

#[tokio::test]
async fn test_fingerprint_recorded_per_parse() {
    let h = harness(vec![ok_page(&tournament_page("Tuesday Deepstack"), "\"v1\"")]);
    h.pipeline.ingest(URL, "E1", IngestOptions::default()).await;

    let fingerprints = h.repo.list_fingerprints().unwrap();
    assert_eq!(fingerprints.len(), 1);
    assert_eq!(fingerprints[0].occurrence_count, 1);
    assert_eq!(fingerprints[0].example_url, URL);
    assert!(fingerprints[0].fields.contains(&"buy_in".to_string()));
}
