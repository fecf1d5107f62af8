//! Range-scrape job runner.
//!
//! Enumerates tournament ids across an inclusive range, builds each URL
//! from the entity's template, and drives the pipeline through a bounded
//! worker pool. Ids are processed in fixed-size chunks so one bad chunk
//! never blocks the rest, and a watch channel provides cooperative
//! cancellation: in-flight calls finish, no new ones start.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use super::{IngestOptions, ScrapePipeline};
use crate::config::Settings;
use crate::models::{AttemptSource, Entity, JobStatus, ScraperJob};
use crate::repository::Repository;

/// Per-id outcome of a range job.
#[derive(Debug, Clone)]
pub struct RangeItemResult {
    pub tournament_id: u64,
    pub url: String,
    pub success: bool,
    pub skipped: bool,
    pub error: Option<String>,
}

/// Aggregate outcome of a range job.
#[derive(Debug)]
pub struct RangeJobOutcome {
    pub job: ScraperJob,
    pub results: Vec<RangeItemResult>,
}

pub struct RangeJobRunner {
    pipeline: Arc<ScrapePipeline>,
    repo: Repository,
    workers: usize,
    chunk_size: usize,
    pipeline_timeout: Duration,
}

impl RangeJobRunner {
    pub fn new(pipeline: Arc<ScrapePipeline>, repo: Repository, settings: &Settings) -> Self {
        Self {
            pipeline,
            repo,
            workers: settings.workers,
            chunk_size: settings.chunk_size,
            pipeline_timeout: Duration::from_secs(settings.pipeline_timeout),
        }
    }

    /// Run the job to completion (or cancellation).
    ///
    /// The runner always finishes: per-id failures are aggregated into the
    /// job counters, never propagated.
    pub async fn run(
        &self,
        entity: &Entity,
        start_id: u64,
        end_id: u64,
        force_refresh: bool,
        cancel: watch::Receiver<bool>,
    ) -> crate::repository::Result<RangeJobOutcome> {
        let mut job = ScraperJob::new(&entity.id, start_id, end_id, force_refresh);
        self.repo.insert_job(&job)?;

        job.status = JobStatus::Running;
        self.repo.update_job(&job)?;
        info!(
            job_id = %job.job_id,
            entity = %entity.id,
            start_id,
            end_id,
            "range job started"
        );

        let successes = Arc::new(AtomicI64::new(0));
        let errors = Arc::new(AtomicI64::new(0));
        let skips = Arc::new(AtomicI64::new(0));
        let results = Arc::new(Mutex::new(Vec::new()));
        let mut cancelled = false;

        let ids: Vec<u64> = (start_id..=end_id).collect();
        for chunk in ids.chunks(self.chunk_size.max(1)) {
            if *cancel.borrow() {
                cancelled = true;
                break;
            }

            stream::iter(chunk.iter().copied())
                .for_each_concurrent(self.workers.max(1), |id| {
                    let pipeline = Arc::clone(&self.pipeline);
                    let successes = Arc::clone(&successes);
                    let errors = Arc::clone(&errors);
                    let skips = Arc::clone(&skips);
                    let results = Arc::clone(&results);
                    let cancel = cancel.clone();
                    let job_id = job.job_id.clone();
                    let entity = entity.clone();
                    async move {
                        if *cancel.borrow() {
                            return;
                        }
                        let url = entity.game_url(id);
                        let opts = IngestOptions {
                            force_refresh,
                            override_do_not_scrape: false,
                            scraper_job_id: Some(job_id),
                            attempt_source: Some(AttemptSource::RangeScrape),
                        };

                        let item = match tokio::time::timeout(
                            self.pipeline_timeout,
                            pipeline.ingest(&url, &entity.id, opts),
                        )
                        .await
                        {
                            Ok(outcome) => RangeItemResult {
                                tournament_id: id,
                                url: url.clone(),
                                success: outcome.success,
                                skipped: outcome.skipped,
                                error: outcome.error,
                            },
                            Err(_) => RangeItemResult {
                                tournament_id: id,
                                url: url.clone(),
                                success: false,
                                skipped: false,
                                error: Some("pipeline timeout".to_string()),
                            },
                        };

                        if item.skipped {
                            skips.fetch_add(1, Ordering::Relaxed);
                        } else if item.success {
                            successes.fetch_add(1, Ordering::Relaxed);
                        } else {
                            warn!(url = %item.url, error = ?item.error, "range item failed");
                            errors.fetch_add(1, Ordering::Relaxed);
                        }
                        results.lock().await.push(item);
                    }
                })
                .await;

            // Checkpoint counters after every chunk
            job.success_count = successes.load(Ordering::Relaxed);
            job.error_count = errors.load(Ordering::Relaxed);
            job.skipped_count = skips.load(Ordering::Relaxed);
            self.repo.update_job(&job)?;
        }

        job.success_count = successes.load(Ordering::Relaxed);
        job.error_count = errors.load(Ordering::Relaxed);
        job.skipped_count = skips.load(Ordering::Relaxed);
        job.finish(cancelled, Utc::now());
        self.repo.update_job(&job)?;

        info!(
            job_id = %job.job_id,
            status = job.status.as_str(),
            success = job.success_count,
            errors = job.error_count,
            skipped = job.skipped_count,
            "range job finished"
        );

        let mut results = Arc::try_unwrap(results)
            .map(|m| m.into_inner())
            .unwrap_or_default();
        results.sort_by_key(|r| r.tournament_id);
        Ok(RangeJobOutcome { job, results })
    }
}
