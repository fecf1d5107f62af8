//! Recurring templates and their scheduled instances.

use chrono::NaiveDate;
use rusqlite::params;

use super::helpers::{row_to_instance, row_to_recurring_game};
use super::{to_option, Repository, Result};
use crate::models::{weekday_to_str, RecurringGame, RecurringGameInstance};

impl Repository {
    pub fn upsert_recurring_game(&self, template: &RecurringGame) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO recurring_games (
                id, entity_id, venue_id, display_name, day_of_week,
                frequency, start_date, end_date, is_active, is_paused
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                entity_id = excluded.entity_id,
                venue_id = excluded.venue_id,
                display_name = excluded.display_name,
                day_of_week = excluded.day_of_week,
                frequency = excluded.frequency,
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                is_active = excluded.is_active,
                is_paused = excluded.is_paused
            "#,
            params![
                template.id,
                template.entity_id,
                template.venue_id,
                template.display_name,
                weekday_to_str(template.day_of_week),
                template.frequency.as_str(),
                template.start_date.map(|d| d.format("%Y-%m-%d").to_string()),
                template.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
                template.is_active,
                template.is_paused,
            ],
        )?;
        Ok(())
    }

    pub fn get_recurring_game(&self, id: &str) -> Result<Option<RecurringGame>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM recurring_games WHERE id = ?")?;
        to_option(stmt.query_row(params![id], row_to_recurring_game))
    }

    /// Active, unpaused templates for a venue.
    pub fn active_templates_for_venue(&self, venue_id: &str) -> Result<Vec<RecurringGame>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM recurring_games
             WHERE venue_id = ? AND is_active = 1 AND is_paused = 0
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![venue_id], row_to_recurring_game)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Insert an instance only if none exists for (template, date).
    ///
    /// Returns true if the row was created. This is the idempotence anchor
    /// for gap detection and reconciliation.
    pub fn create_instance_if_absent(&self, instance: &RecurringGameInstance) -> Result<bool> {
        let conn = self.connect()?;
        let inserted = conn.execute(
            r#"
            INSERT INTO recurring_instances (
                id, recurring_game_id, game_id, expected_date, day_of_week,
                week_key, venue_id, entity_id, status,
                needs_review, review_reason, cancellation_reason, notes, admin_notes,
                has_deviation, deviation_type, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9,
                ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18
            )
            ON CONFLICT(recurring_game_id, expected_date) DO NOTHING
            "#,
            params![
                instance.id,
                instance.recurring_game_id,
                instance.game_id,
                instance.expected_date.format("%Y-%m-%d").to_string(),
                weekday_to_str(instance.day_of_week),
                instance.week_key,
                instance.venue_id,
                instance.entity_id,
                instance.status.as_str(),
                instance.needs_review,
                instance.review_reason,
                instance.cancellation_reason,
                instance.notes,
                instance.admin_notes,
                instance.has_deviation,
                instance.deviation_type,
                instance.created_at.to_rfc3339(),
                instance.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(inserted > 0)
    }

    pub fn get_instance(
        &self,
        recurring_game_id: &str,
        expected_date: NaiveDate,
    ) -> Result<Option<RecurringGameInstance>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM recurring_instances WHERE recurring_game_id = ? AND expected_date = ?",
        )?;
        to_option(stmt.query_row(
            params![
                recurring_game_id,
                expected_date.format("%Y-%m-%d").to_string()
            ],
            row_to_instance,
        ))
    }

    pub fn get_instance_by_id(&self, id: &str) -> Result<Option<RecurringGameInstance>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM recurring_instances WHERE id = ?")?;
        to_option(stmt.query_row(params![id], row_to_instance))
    }

    /// Write back instance state.
    pub fn update_instance(&self, instance: &RecurringGameInstance) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            UPDATE recurring_instances SET
                game_id = ?1,
                status = ?2,
                needs_review = ?3,
                review_reason = ?4,
                cancellation_reason = ?5,
                notes = ?6,
                admin_notes = ?7,
                has_deviation = ?8,
                deviation_type = ?9,
                updated_at = ?10
            WHERE id = ?11
            "#,
            params![
                instance.game_id,
                instance.status.as_str(),
                instance.needs_review,
                instance.review_reason,
                instance.cancellation_reason,
                instance.notes,
                instance.admin_notes,
                instance.has_deviation,
                instance.deviation_type,
                chrono::Utc::now().to_rfc3339(),
                instance.id,
            ],
        )?;
        Ok(())
    }

    /// All instances for a venue in an ISO week.
    pub fn instances_for_week(
        &self,
        venue_id: &str,
        week_key: &str,
    ) -> Result<Vec<RecurringGameInstance>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM recurring_instances
             WHERE venue_id = ? AND week_key = ?
             ORDER BY expected_date",
        )?;
        let rows = stmt
            .query_map(params![venue_id, week_key], row_to_instance)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Instances for a venue whose expected date falls in [start, end].
    pub fn instances_in_range(
        &self,
        venue_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RecurringGameInstance>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM recurring_instances
             WHERE venue_id = ? AND expected_date >= ? AND expected_date <= ?
             ORDER BY expected_date",
        )?;
        let rows = stmt
            .query_map(
                params![
                    venue_id,
                    start.format("%Y-%m-%d").to_string(),
                    end.format("%Y-%m-%d").to_string(),
                ],
                row_to_instance,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Frequency, InstanceStatus};
    use chrono::Weekday;
    use tempfile::tempdir;

    fn template() -> RecurringGame {
        RecurringGame {
            id: "R1".into(),
            entity_id: "E1".into(),
            venue_id: "V1".into(),
            display_name: "Tuesday Deepstack".into(),
            day_of_week: Weekday::Tue,
            frequency: Frequency::Weekly,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 7),
            end_date: None,
            is_active: true,
            is_paused: false,
        }
    }

    #[test]
    fn test_template_roundtrip() {
        let dir = tempdir().unwrap();
        let repo = Repository::open(&dir.path().join("t.db")).unwrap();
        repo.upsert_recurring_game(&template()).unwrap();

        let stored = repo.get_recurring_game("R1").unwrap().unwrap();
        assert_eq!(stored.day_of_week, Weekday::Tue);
        assert_eq!(stored.frequency, Frequency::Weekly);
        assert_eq!(repo.active_templates_for_venue("V1").unwrap().len(), 1);
    }

    #[test]
    fn test_paused_templates_excluded() {
        let dir = tempdir().unwrap();
        let repo = Repository::open(&dir.path().join("t.db")).unwrap();
        let mut t = template();
        t.is_paused = true;
        repo.upsert_recurring_game(&t).unwrap();
        assert!(repo.active_templates_for_venue("V1").unwrap().is_empty());
    }

    #[test]
    fn test_instance_create_is_idempotent() {
        let dir = tempdir().unwrap();
        let repo = Repository::open(&dir.path().join("t.db")).unwrap();
        let t = template();
        repo.upsert_recurring_game(&t).unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();
        let first = RecurringGameInstance::new(&t, date, InstanceStatus::Unknown);
        let second = RecurringGameInstance::new(&t, date, InstanceStatus::Confirmed);

        assert!(repo.create_instance_if_absent(&first).unwrap());
        assert!(!repo.create_instance_if_absent(&second).unwrap());

        let stored = repo.get_instance("R1", date).unwrap().unwrap();
        assert_eq!(stored.status, InstanceStatus::Unknown);
        assert_eq!(stored.id, first.id);
    }

    #[test]
    fn test_week_and_range_queries() {
        let dir = tempdir().unwrap();
        let repo = Repository::open(&dir.path().join("t.db")).unwrap();
        let t = template();
        repo.upsert_recurring_game(&t).unwrap();

        for day in [3u32, 10, 17] {
            let date = NaiveDate::from_ymd_opt(2025, 6, day).unwrap();
            let instance = RecurringGameInstance::new(&t, date, InstanceStatus::Unknown);
            repo.create_instance_if_absent(&instance).unwrap();
        }

        let week = repo.instances_for_week("V1", "2025-W23").unwrap();
        assert_eq!(week.len(), 1);
        assert_eq!(
            week[0].expected_date,
            NaiveDate::from_ymd_opt(2025, 6, 3).unwrap()
        );

        let range = repo
            .instances_in_range(
                "V1",
                NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 6, 14).unwrap(),
            )
            .unwrap();
        assert_eq!(range.len(), 2);
    }
}
