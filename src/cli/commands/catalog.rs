//! Entity, venue, and recurring-template administration.

use chrono::NaiveDate;
use console::style;

use super::open_repository;
use crate::config::Settings;
use crate::models::{parse_weekday, Entity, Frequency, RecurringGame, Venue};

pub fn cmd_entity_add(
    settings: &Settings,
    id: String,
    name: String,
    domain: String,
    path: String,
    default_venue: Option<String>,
) -> anyhow::Result<()> {
    let repo = open_repository(settings)?;
    let entity = Entity {
        id,
        name,
        game_url_domain: domain,
        game_url_path: path,
        default_venue_id: default_venue,
    };
    repo.upsert_entity(&entity)?;
    println!("{} Saved entity {}", style("✓").green(), entity.id);
    Ok(())
}

pub fn cmd_entity_list(settings: &Settings) -> anyhow::Result<()> {
    let repo = open_repository(settings)?;
    let entities = repo.list_entities()?;
    if entities.is_empty() {
        println!("No entities configured");
        return Ok(());
    }
    for entity in entities {
        println!(
            "{}  {}  {}{}",
            style(&entity.id).cyan(),
            entity.name,
            entity.game_url_domain,
            entity.game_url_path
        );
    }
    Ok(())
}

pub fn cmd_venue_add(
    settings: &Settings,
    id: String,
    entity_id: String,
    name: String,
    aliases: Vec<String>,
    fee: Option<i64>,
) -> anyhow::Result<()> {
    let repo = open_repository(settings)?;
    if repo.get_entity(&entity_id)?.is_none() {
        anyhow::bail!("unknown entity {entity_id}");
    }
    let venue = Venue {
        id,
        entity_id,
        name,
        aliases,
        fee,
    };
    repo.upsert_venue(&venue)?;
    println!("{} Saved venue {}", style("✓").green(), venue.id);
    Ok(())
}

pub fn cmd_venue_list(settings: &Settings, entity_id: &str) -> anyhow::Result<()> {
    let repo = open_repository(settings)?;
    for venue in repo.venues_for_entity(entity_id)? {
        let aliases = if venue.aliases.is_empty() {
            String::new()
        } else {
            format!("  (aka {})", venue.aliases.join(", "))
        };
        println!("{}  {}{}", style(&venue.id).cyan(), venue.name, aliases);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_recurring_add(
    settings: &Settings,
    id: String,
    entity_id: String,
    venue_id: String,
    name: String,
    day: &str,
    frequency: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let repo = open_repository(settings)?;
    let day_of_week = parse_weekday(&day.to_uppercase())
        .ok_or_else(|| anyhow::anyhow!("invalid day of week: {day}"))?;
    let frequency = Frequency::parse(&frequency.to_uppercase())
        .ok_or_else(|| anyhow::anyhow!("invalid frequency: {frequency}"))?;
    if repo.get_venue(&venue_id)?.is_none() {
        anyhow::bail!("unknown venue {venue_id}");
    }

    let template = RecurringGame {
        id,
        entity_id,
        venue_id,
        display_name: name,
        day_of_week,
        frequency,
        start_date: start,
        end_date: end,
        is_active: true,
        is_paused: false,
    };
    repo.upsert_recurring_game(&template)?;
    println!("{} Saved template {}", style("✓").green(), template.id);
    Ok(())
}

pub fn cmd_recurring_list(settings: &Settings, venue_id: &str) -> anyhow::Result<()> {
    let repo = open_repository(settings)?;
    for template in repo.active_templates_for_venue(venue_id)? {
        println!(
            "{}  {}  {} {}",
            style(&template.id).cyan(),
            template.display_name,
            crate::models::weekday_to_str(template.day_of_week),
            template.frequency.as_str()
        );
    }
    Ok(())
}
