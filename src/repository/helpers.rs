//! Row parsing helpers.

use chrono::{NaiveDate, Weekday};

use super::{parse_datetime, parse_datetime_opt};
use crate::models::{
    parse_weekday, AttemptSource, AttemptStatus, Entity, Frequency, Game, InstanceStatus,
    InteractionType, JobStatus, PageVersion, RecurringGame, RecurringGameInstance, ScrapeAttempt,
    ScrapeUrl, ScrapeUrlStatus, ScraperJob, StoredPage, StructureFingerprint, Venue,
};

fn parse_date_opt(s: Option<String>) -> Option<NaiveDate> {
    s.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

/// Parse a database row into a ScrapeUrl.
pub fn row_to_scrape_url(row: &rusqlite::Row) -> rusqlite::Result<ScrapeUrl> {
    Ok(ScrapeUrl {
        url: row.get("url")?,
        entity_id: row.get("entity_id")?,
        tournament_id: row.get("tournament_id")?,
        source_system: row.get("source_system")?,
        status: ScrapeUrlStatus::parse(&row.get::<_, String>("status")?)
            .unwrap_or(ScrapeUrlStatus::Pending),
        do_not_scrape: row.get::<_, i64>("do_not_scrape")? != 0,
        game_status: row.get("game_status")?,
        latest_blob_key: row.get("latest_blob_key")?,
        latest_page_id: row.get("latest_page_id")?,
        times_scraped: row.get("times_scraped")?,
        times_successful: row.get("times_successful")?,
        times_failed: row.get("times_failed")?,
        consecutive_failures: row.get("consecutive_failures")?,
        first_scraped_at: parse_datetime_opt(row.get("first_scraped_at")?),
        last_scraped_at: parse_datetime_opt(row.get("last_scraped_at")?),
        last_successful_scrape_at: parse_datetime_opt(row.get("last_successful_scrape_at")?),
        etag: row.get("etag")?,
        last_modified_header: row.get("last_modified_header")?,
        content_hash: row.get("content_hash")?,
        content_size: row.get("content_size")?,
        last_interaction: InteractionType::parse(&row.get::<_, String>("last_interaction")?)
            .unwrap_or(InteractionType::NeverChecked),
        last_error: row.get("last_error")?,
        last_error_at: parse_datetime_opt(row.get("last_error_at")?),
        created_at: parse_datetime(&row.get::<_, String>("created_at")?),
        updated_at: parse_datetime(&row.get::<_, String>("updated_at")?),
    })
}

/// Parse a database row into a StoredPage.
pub fn row_to_stored_page(row: &rusqlite::Row) -> rusqlite::Result<StoredPage> {
    let previous: String = row.get("previous_versions")?;
    let previous_versions: Vec<PageVersion> = serde_json::from_str(&previous).unwrap_or_default();
    let fields: String = row.get("extracted_fields")?;
    let extracted_fields: Vec<String> = serde_json::from_str(&fields).unwrap_or_default();

    Ok(StoredPage {
        id: row.get("id")?,
        scrape_url: row.get("scrape_url")?,
        entity_id: row.get("entity_id")?,
        tournament_id: row.get("tournament_id")?,
        blob_key: row.get("blob_key")?,
        content_hash: row.get("content_hash")?,
        content_size: row.get("content_size")?,
        etag: row.get("etag")?,
        last_modified: row.get("last_modified")?,
        http_status: row.get::<_, Option<i64>>("http_status")?.map(|s| s as u16),
        scraped_at: parse_datetime(&row.get::<_, String>("scraped_at")?),
        stored_at: parse_datetime(&row.get::<_, String>("stored_at")?),
        version_number: row.get("version_number")?,
        total_versions: row.get("total_versions")?,
        previous_versions,
        is_parsed: row.get::<_, i64>("is_parsed")? != 0,
        parsed_data_hash: row.get("parsed_data_hash")?,
        extracted_fields,
        data_changed_at: parse_datetime_opt(row.get("data_changed_at")?),
        data_change_count: row.get("data_change_count")?,
        parse_count: row.get("parse_count")?,
        rescrape_count: row.get("rescrape_count")?,
    })
}

/// Parse a database row into a ScrapeAttempt.
pub fn row_to_attempt(row: &rusqlite::Row) -> rusqlite::Result<ScrapeAttempt> {
    let fields: String = row.get("found_fields")?;
    Ok(ScrapeAttempt {
        id: row.get("id")?,
        scrape_url: row.get("scrape_url")?,
        scraper_job_id: row.get("scraper_job_id")?,
        attempt_time: parse_datetime(&row.get::<_, String>("attempt_time")?),
        status: AttemptStatus::parse(&row.get::<_, String>("status")?)
            .unwrap_or(AttemptStatus::Failed),
        processing_time_ms: row.get("processing_time_ms")?,
        error_type: row.get("error_type")?,
        error_message: row.get("error_message")?,
        data_hash: row.get("data_hash")?,
        has_changes: row.get::<_, i64>("has_changes")? != 0,
        found_fields: serde_json::from_str(&fields).unwrap_or_default(),
        blob_key: row.get("blob_key")?,
        source: AttemptSource::parse(&row.get::<_, String>("source")?)
            .unwrap_or(AttemptSource::SingleScrape),
    })
}

/// Parse a database row into a ScraperJob.
pub fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<ScraperJob> {
    Ok(ScraperJob {
        job_id: row.get("job_id")?,
        entity_id: row.get("entity_id")?,
        start_id: row.get::<_, i64>("start_id")? as u64,
        end_id: row.get::<_, i64>("end_id")? as u64,
        force_refresh: row.get::<_, i64>("force_refresh")? != 0,
        started_at: parse_datetime(&row.get::<_, String>("started_at")?),
        finished_at: parse_datetime_opt(row.get("finished_at")?),
        status: JobStatus::parse(&row.get::<_, String>("status")?).unwrap_or(JobStatus::Failed),
        total_urls: row.get("total_urls")?,
        success_count: row.get("success_count")?,
        error_count: row.get("error_count")?,
        skipped_count: row.get("skipped_count")?,
    })
}

/// Parse a database row into an Entity.
pub fn row_to_entity(row: &rusqlite::Row) -> rusqlite::Result<Entity> {
    Ok(Entity {
        id: row.get("id")?,
        name: row.get("name")?,
        game_url_domain: row.get("game_url_domain")?,
        game_url_path: row.get("game_url_path")?,
        default_venue_id: row.get("default_venue_id")?,
    })
}

/// Parse a database row into a Venue.
pub fn row_to_venue(row: &rusqlite::Row) -> rusqlite::Result<Venue> {
    let aliases: String = row.get("aliases")?;
    Ok(Venue {
        id: row.get("id")?,
        entity_id: row.get("entity_id")?,
        name: row.get("name")?,
        aliases: serde_json::from_str(&aliases).unwrap_or_default(),
        fee: row.get("fee")?,
    })
}

/// Parse a database row into a Game (stored as a JSON record column).
pub fn row_to_game(row: &rusqlite::Row) -> rusqlite::Result<Game> {
    let record: String = row.get("record")?;
    serde_json::from_str(&record).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parse a database row into a RecurringGame.
pub fn row_to_recurring_game(row: &rusqlite::Row) -> rusqlite::Result<RecurringGame> {
    Ok(RecurringGame {
        id: row.get("id")?,
        entity_id: row.get("entity_id")?,
        venue_id: row.get("venue_id")?,
        display_name: row.get("display_name")?,
        day_of_week: parse_weekday(&row.get::<_, String>("day_of_week")?)
            .unwrap_or(Weekday::Mon),
        frequency: Frequency::parse(&row.get::<_, String>("frequency")?)
            .unwrap_or(Frequency::Weekly),
        start_date: parse_date_opt(row.get("start_date")?),
        end_date: parse_date_opt(row.get("end_date")?),
        is_active: row.get::<_, i64>("is_active")? != 0,
        is_paused: row.get::<_, i64>("is_paused")? != 0,
    })
}

/// Parse a database row into a RecurringGameInstance.
pub fn row_to_instance(row: &rusqlite::Row) -> rusqlite::Result<RecurringGameInstance> {
    let expected: String = row.get("expected_date")?;
    let expected_date = NaiveDate::parse_from_str(&expected, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(RecurringGameInstance {
        id: row.get("id")?,
        recurring_game_id: row.get("recurring_game_id")?,
        game_id: row.get("game_id")?,
        expected_date,
        day_of_week: parse_weekday(&row.get::<_, String>("day_of_week")?)
            .unwrap_or(Weekday::Mon),
        week_key: row.get("week_key")?,
        venue_id: row.get("venue_id")?,
        entity_id: row.get("entity_id")?,
        status: InstanceStatus::parse(&row.get::<_, String>("status")?)
            .unwrap_or(InstanceStatus::Unknown),
        needs_review: row.get::<_, i64>("needs_review")? != 0,
        review_reason: row.get("review_reason")?,
        cancellation_reason: row.get("cancellation_reason")?,
        notes: row.get("notes")?,
        admin_notes: row.get("admin_notes")?,
        has_deviation: row.get::<_, i64>("has_deviation")? != 0,
        deviation_type: row.get("deviation_type")?,
        created_at: parse_datetime(&row.get::<_, String>("created_at")?),
        updated_at: parse_datetime(&row.get::<_, String>("updated_at")?),
    })
}

/// Parse a database row into a StructureFingerprint.
pub fn row_to_fingerprint(row: &rusqlite::Row) -> rusqlite::Result<StructureFingerprint> {
    let fields: String = row.get("fields")?;
    Ok(StructureFingerprint {
        id: row.get("id")?,
        fields: serde_json::from_str(&fields).unwrap_or_default(),
        structure_label: row.get("structure_label")?,
        occurrence_count: row.get("occurrence_count")?,
        first_seen_at: parse_datetime(&row.get::<_, String>("first_seen_at")?),
        last_seen_at: parse_datetime(&row.get::<_, String>("last_seen_at")?),
        example_url: row.get("example_url")?,
    })
}
