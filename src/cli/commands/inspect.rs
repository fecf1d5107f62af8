//! Read-only inspection commands: URL state, jobs, fingerprints.

use console::style;

use super::open_repository;
use crate::config::Settings;
use crate::models::AttemptStatus;

pub fn cmd_url(settings: &Settings, url: &str, attempts: u32) -> anyhow::Result<()> {
    let repo = open_repository(settings)?;
    let Some(record) = repo.get_scrape_url(url)? else {
        println!("No scrape state for {url}");
        return Ok(());
    };

    println!("{}", style(&record.url).cyan());
    println!("  entity:        {}", record.entity_id);
    if let Some(tid) = &record.tournament_id {
        println!("  tournament:    {tid}");
    }
    println!("  status:        {}", record.status.as_str());
    println!("  interaction:   {}", record.last_interaction.as_str());
    if let Some(status) = &record.game_status {
        println!("  game status:   {status}");
    }
    println!(
        "  scraped:       {} times ({} ok, {} failed)",
        record.times_scraped, record.times_successful, record.times_failed
    );
    if record.do_not_scrape {
        println!("  {}", style("do-not-scrape").yellow());
    }
    if let Some(err) = &record.last_error {
        println!("  last error:    {err}");
    }
    if let Some(key) = &record.latest_blob_key {
        println!("  head blob:     {key}");
    }
    if let Some(hash) = &record.content_hash {
        println!("  content hash:  {}", &hash[..16.min(hash.len())]);
    }
    if let Some(at) = record.last_scraped_at {
        println!("  last scraped:  {}", at.to_rfc3339());
    }

    let recent = repo.recent_attempts(url, attempts)?;
    if !recent.is_empty() {
        println!();
        println!("Recent attempts:");
        for attempt in recent {
            let status = match attempt.status {
                AttemptStatus::Success => style(attempt.status.as_str()).green(),
                AttemptStatus::Failed => style(attempt.status.as_str()).red(),
                AttemptStatus::SkippedDonotscrape => style(attempt.status.as_str()).yellow(),
            };
            let detail = attempt
                .error_message
                .as_deref()
                .unwrap_or(if attempt.has_changes { "changed" } else { "" });
            println!(
                "  {}  {}  {}ms  {}",
                attempt.attempt_time.to_rfc3339(),
                status,
                attempt.processing_time_ms,
                detail
            );
        }
    }
    Ok(())
}

pub fn cmd_jobs(settings: &Settings, limit: u32) -> anyhow::Result<()> {
    let repo = open_repository(settings)?;
    let jobs = repo.list_jobs(limit)?;
    if jobs.is_empty() {
        println!("No jobs recorded");
        return Ok(());
    }
    for job in jobs {
        println!(
            "{}  {}  {}..={}  {}  ok {} err {} skip {}",
            style(&job.job_id[..8]).cyan(),
            job.entity_id,
            job.start_id,
            job.end_id,
            job.status.as_str(),
            job.success_count,
            job.error_count,
            job.skipped_count
        );
    }
    Ok(())
}

pub fn cmd_fingerprints(settings: &Settings, limit: usize) -> anyhow::Result<()> {
    let repo = open_repository(settings)?;
    let fingerprints = repo.list_fingerprints()?;
    if fingerprints.is_empty() {
        println!("No fingerprints recorded");
        return Ok(());
    }
    for fp in fingerprints.into_iter().take(limit) {
        let label = fp.structure_label.as_deref().unwrap_or("-");
        println!(
            "{}  x{}  {} fields  [{}]",
            style(&fp.id[..12]).cyan(),
            fp.occurrence_count,
            fp.fields.len(),
            label
        );
        println!("    {}", fp.fields.join(", "));
        println!("    e.g. {}", fp.example_url);
    }
    Ok(())
}
