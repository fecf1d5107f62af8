//! Entity (tenant) and venue persistence.

use rusqlite::params;

use super::helpers::{row_to_entity, row_to_venue};
use super::{to_option, Repository, Result};
use crate::models::{Entity, Venue};

impl Repository {
    pub fn upsert_entity(&self, entity: &Entity) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO entities (id, name, game_url_domain, game_url_path, default_venue_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                game_url_domain = excluded.game_url_domain,
                game_url_path = excluded.game_url_path,
                default_venue_id = excluded.default_venue_id
            "#,
            params![
                entity.id,
                entity.name,
                entity.game_url_domain,
                entity.game_url_path,
                entity.default_venue_id,
            ],
        )?;
        Ok(())
    }

    pub fn get_entity(&self, id: &str) -> Result<Option<Entity>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM entities WHERE id = ?")?;
        to_option(stmt.query_row(params![id], row_to_entity))
    }

    pub fn list_entities(&self) -> Result<Vec<Entity>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM entities ORDER BY id")?;
        let rows = stmt
            .query_map([], row_to_entity)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn upsert_venue(&self, venue: &Venue) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO venues (id, entity_id, name, aliases, fee)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                entity_id = excluded.entity_id,
                name = excluded.name,
                aliases = excluded.aliases,
                fee = excluded.fee
            "#,
            params![
                venue.id,
                venue.entity_id,
                venue.name,
                serde_json::to_string(&venue.aliases)?,
                venue.fee,
            ],
        )?;
        Ok(())
    }

    pub fn get_venue(&self, id: &str) -> Result<Option<Venue>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM venues WHERE id = ?")?;
        to_option(stmt.query_row(params![id], row_to_venue))
    }

    pub fn venues_for_entity(&self, entity_id: &str) -> Result<Vec<Venue>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM venues WHERE entity_id = ? ORDER BY name")?;
        let rows = stmt
            .query_map(params![entity_id], row_to_venue)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_entity_and_venue_roundtrip() {
        let dir = tempdir().unwrap();
        let repo = Repository::open(&dir.path().join("t.db")).unwrap();

        let entity = Entity {
            id: "E1".into(),
            name: "Crown Poker".into(),
            game_url_domain: "poker.example.com".into(),
            game_url_path: "/tournament.php".into(),
            default_venue_id: Some("V1".into()),
        };
        repo.upsert_entity(&entity).unwrap();

        let venue = Venue {
            id: "V1".into(),
            entity_id: "E1".into(),
            name: "Main Room".into(),
            aliases: vec!["The Main".into(), "MR".into()],
            fee: Some(1000),
        };
        repo.upsert_venue(&venue).unwrap();

        assert_eq!(repo.get_entity("E1").unwrap().unwrap().name, "Crown Poker");
        let venues = repo.venues_for_entity("E1").unwrap();
        assert_eq!(venues.len(), 1);
        assert_eq!(venues[0].aliases.len(), 2);
    }

    #[test]
    fn test_upsert_overwrites() {
        let dir = tempdir().unwrap();
        let repo = Repository::open(&dir.path().join("t.db")).unwrap();

        let mut entity = Entity {
            id: "E1".into(),
            name: "Old Name".into(),
            game_url_domain: "a".into(),
            game_url_path: "/t".into(),
            default_venue_id: None,
        };
        repo.upsert_entity(&entity).unwrap();
        entity.name = "New Name".into();
        repo.upsert_entity(&entity).unwrap();

        assert_eq!(repo.get_entity("E1").unwrap().unwrap().name, "New Name");
        assert_eq!(repo.list_entities().unwrap().len(), 1);
    }
}
