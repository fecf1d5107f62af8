//! Scrape, scrape-range, and cache re-parse commands.

use std::sync::Arc;
use std::time::Duration;

use console::style;
use tokio::sync::watch;

use super::open_repository;
use crate::blobstore::FsBlobStore;
use crate::config::Settings;
use crate::fetch::HttpFetcher;
use crate::pipeline::{IngestOptions, IngestResult, RangeJobRunner, ScrapePipeline};

fn build_pipeline(settings: &Settings) -> anyhow::Result<(ScrapePipeline, crate::repository::Repository)> {
    let repo = open_repository(settings)?;
    let blobs = Arc::new(FsBlobStore::new(&settings.pages_dir()));
    let fetcher = Arc::new(HttpFetcher::new(
        &settings.user_agent,
        Duration::from_secs(settings.fetch_timeout),
        Duration::from_millis(settings.request_delay_ms),
    )?);
    Ok((
        ScrapePipeline::new(repo.clone(), blobs, fetcher, settings),
        repo,
    ))
}

fn print_result(result: &IngestResult) {
    if result.skipped {
        println!("{} {} (do-not-scrape)", style("skipped").yellow(), result.url);
        return;
    }
    if !result.success {
        println!(
            "{} {}: {} ({})",
            style("failed").red(),
            result.url,
            result.error.as_deref().unwrap_or("unknown error"),
            result.error_type.as_deref().unwrap_or("?")
        );
        return;
    }

    println!("{} {}", style("✓").green(), result.url);
    println!("  source:  {}", result.source.as_str());
    if let Some(key) = &result.blob_key {
        println!("  blob:    {key}");
    }
    println!("  changed: {}", result.data_changed);
    if let Some(game) = &result.game {
        if let Some(name) = &game.name {
            println!("  name:    {name}");
        }
        println!("  status:  {}", game.game_status.as_str());
        if let Some(buy_in) = game.buy_in {
            println!("  buy-in:  ${:.2}", buy_in as f64 / 100.0);
        }
    }
    println!("  fields:  {}", result.found_fields.len());
}

pub async fn cmd_scrape(
    settings: &Settings,
    entity_id: &str,
    target: &str,
    force: bool,
    override_do_not_scrape: bool,
) -> anyhow::Result<()> {
    let (pipeline, repo) = build_pipeline(settings)?;

    // A bare number is a tournament id on the entity's site
    let url = if target.chars().all(|c| c.is_ascii_digit()) {
        let entity = repo
            .get_entity(entity_id)?
            .ok_or_else(|| anyhow::anyhow!("unknown entity {entity_id}"))?;
        entity.game_url(target.parse()?)
    } else {
        url::Url::parse(target)
            .map_err(|e| anyhow::anyhow!("invalid url {target}: {e}"))?
            .to_string()
    };

    let opts = IngestOptions {
        force_refresh: force,
        override_do_not_scrape,
        ..Default::default()
    };
    let result = pipeline.ingest(&url, entity_id, opts).await;
    print_result(&result);

    if result.success {
        Ok(())
    } else {
        anyhow::bail!("scrape failed")
    }
}

pub async fn cmd_scrape_range(
    settings: &Settings,
    entity_id: &str,
    start_id: u64,
    end_id: u64,
    force: bool,
) -> anyhow::Result<()> {
    if end_id < start_id {
        anyhow::bail!("end id {end_id} is before start id {start_id}");
    }

    let (pipeline, repo) = build_pipeline(settings)?;
    let entity = repo
        .get_entity(entity_id)?
        .ok_or_else(|| anyhow::anyhow!("unknown entity {entity_id}"))?;

    let runner = RangeJobRunner::new(Arc::new(pipeline), repo, settings);

    // Ctrl-C requests cancellation; in-flight scrapes finish first
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("cancelling after in-flight scrapes finish...");
            let _ = cancel_tx.send(true);
        }
    });

    println!(
        "Scraping ids {start_id}..={end_id} for {} ({} urls)",
        entity.name,
        end_id - start_id + 1
    );
    let outcome = runner
        .run(&entity, start_id, end_id, force, cancel_rx)
        .await?;

    let job = &outcome.job;
    println!();
    println!(
        "{} Job {} {}",
        style("✓").green(),
        job.job_id,
        job.status.as_str()
    );
    println!(
        "  success {}  errors {}  skipped {}",
        style(job.success_count).green(),
        style(job.error_count).red(),
        style(job.skipped_count).yellow()
    );
    for item in outcome.results.iter().filter(|r| !r.success && !r.skipped) {
        println!(
            "  {} {}: {}",
            style("failed").red(),
            item.tournament_id,
            item.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

pub async fn cmd_reparse(
    settings: &Settings,
    entity_id: &str,
    blob_key: &str,
) -> anyhow::Result<()> {
    let (pipeline, _) = build_pipeline(settings)?;
    let result = pipeline.ingest_from_cache(blob_key, entity_id).await;
    print_result(&result);

    if result.success {
        Ok(())
    } else {
        anyhow::bail!("reparse failed")
    }
}
