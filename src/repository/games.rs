//! Parsed game persistence.
//!
//! The full record is stored as a JSON column; venue, recurring link,
//! civil date, and status are mirrored into indexed columns for the
//! compliance queries.

use chrono::NaiveDate;
use rusqlite::params;

use super::helpers::row_to_game;
use super::{to_option, Repository, Result};
use crate::models::Game;
use crate::parser::timezone::venue_civil_date;

impl Repository {
    /// Insert or replace a game keyed by (entity, tournament).
    pub fn upsert_game(&self, game: &Game) -> Result<()> {
        let tournament_id = match &game.tournament_id {
            Some(id) => id.clone(),
            None => return Ok(()),
        };
        let game_date = game
            .game_start
            .map(|dt| venue_civil_date(dt).format("%Y-%m-%d").to_string());

        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO games (
                entity_id, tournament_id, venue_id, recurring_game_id,
                game_date, game_status, record, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(entity_id, tournament_id) DO UPDATE SET
                venue_id = excluded.venue_id,
                recurring_game_id = excluded.recurring_game_id,
                game_date = excluded.game_date,
                game_status = excluded.game_status,
                record = excluded.record,
                updated_at = excluded.updated_at
            "#,
            params![
                game.entity_id,
                tournament_id,
                game.venue_id,
                game.recurring_game_id,
                game_date,
                game.game_status.as_str(),
                serde_json::to_string(game)?,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_game(&self, entity_id: &str, tournament_id: &str) -> Result<Option<Game>> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT * FROM games WHERE entity_id = ? AND tournament_id = ?")?;
        to_option(stmt.query_row(params![entity_id, tournament_id], row_to_game))
    }

    /// Find the game linked to a recurring template on a civil date.
    pub fn find_game_by_recurring_and_date(
        &self,
        recurring_game_id: &str,
        date: NaiveDate,
    ) -> Result<Option<Game>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM games WHERE recurring_game_id = ? AND game_date = ? LIMIT 1",
        )?;
        to_option(stmt.query_row(
            params![recurring_game_id, date.format("%Y-%m-%d").to_string()],
            row_to_game,
        ))
    }

    /// Games at a venue whose civil date falls in [start, end].
    pub fn games_for_venue_in_range(
        &self,
        venue_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Game>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM games
             WHERE venue_id = ? AND game_date >= ? AND game_date <= ?
             ORDER BY game_date",
        )?;
        let rows = stmt
            .query_map(
                params![
                    venue_id,
                    start.format("%Y-%m-%d").to_string(),
                    end.format("%Y-%m-%d").to_string(),
                ],
                row_to_game,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
