//! Entity (tenant) and venue models.
//!
//! Both are externally managed and read-only to the ingestion core.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A tenant operating one or more venues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier for this entity.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Domain the schedule site serves this entity's pages from.
    pub game_url_domain: String,
    /// URL path prefix, up to and including the id query parameter.
    pub game_url_path: String,
    /// Venue used when the venue matcher finds no alias match.
    pub default_venue_id: Option<String>,
}

impl Entity {
    /// Build the tournament page URL for a numeric tournament id.
    pub fn game_url(&self, tournament_id: u64) -> String {
        format!("{}{}{}", self.game_url_domain, self.game_url_path, tournament_id)
    }
}

/// A physical poker room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    pub id: String,
    pub entity_id: String,
    pub name: String,
    /// Alternate names the schedule site uses for this venue.
    pub aliases: Vec<String>,
    /// Standard per-entry fee in cents, if known.
    pub fee: Option<i64>,
}

/// Recover a tournament id from a schedule-site URL.
pub fn extract_tournament_id(url: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"[?&]id=(\d+)").expect("valid regex"));
    re.captures(url).map(|c| c[1].to_string())
}
