//! Tournament page parser.
//!
//! Pure and deterministic: `(html, url, venue catalog) -> parsed record`
//! with no I/O. Stages run in order and any stage may short-circuit:
//! bot detection, special-status detection, embedded JSON, DOM fields,
//! classification, guarantee detection, derived economics.

mod classify;
mod economics;
mod embedded;
mod fields;
mod guarantee;
pub mod page_state;
mod text;
pub mod timezone;
mod venues;

use scraper::Html;
use thiserror::Error;

pub use page_state::BotBlockKind;
pub use venues::match_venue;

use crate::models::{extract_tournament_id, Game, GameStatus, Venue};

/// Parse failures that mean "this is not a tournament page".
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("bot challenge page ({})", .0.as_str())]
    BotBlocked(BotBlockKind),
}

/// The set of field names a parse actually populated.
#[derive(Debug, Default)]
pub struct FieldSet(Vec<String>);

impl FieldSet {
    pub fn mark(&mut self, name: &str) {
        if !self.0.iter().any(|f| f == name) {
            self.0.push(name.to_string());
        }
    }

    pub fn into_sorted(mut self) -> Vec<String> {
        self.0.sort_unstable();
        self.0
    }
}

/// A successfully parsed page.
#[derive(Debug)]
pub struct ParsedPage {
    pub game: Game,
    pub found_fields: Vec<String>,
    /// True when the page carried a special status (not published, not in
    /// use) and field extraction was skipped.
    pub special_status: bool,
}

/// Parse a tournament page body.
///
/// `inference_min_cents` is the guarantee-inference margin from config.
pub fn parse_tournament_page(
    html: &str,
    url: &str,
    entity_id: &str,
    venues: &[Venue],
    inference_min_cents: i64,
) -> Result<ParsedPage, ParseError> {
    if let Some(kind) = page_state::detect_bot_block(html) {
        return Err(ParseError::BotBlocked(kind));
    }

    let document = Html::parse_document(html);
    let mut game = Game::empty(entity_id, url, extract_tournament_id(url));
    let mut found = FieldSet::default();

    if let Some(status) = page_state::detect_special_status(&document) {
        game.game_status = status;
        found.mark("game_status");
        return Ok(ParsedPage {
            game,
            found_fields: found.into_sorted(),
            special_status: true,
        });
    }

    // Embedded JSON first; the DOM fills whatever is missing
    if let Some(header) = embedded::extract_header(html) {
        if let Some(name) = header.name {
            game.name = Some(name);
            found.mark("name");
        }
        if let Some(status) = header.status {
            game.game_status = GameStatus::from_site_text(&status);
            found.mark("game_status");
        }
        if let Some(buy_in) = header.buy_in {
            game.buy_in = Some(buy_in);
            found.mark("buy_in");
        }
        if let Some(rake) = header.rake {
            game.rake = Some(rake);
            found.mark("rake");
        }
        if let Some(stack) = header.starting_stack {
            game.starting_stack = Some(stack);
            found.mark("starting_stack");
        }
        if let Some(guarantee) = header.guarantee {
            game.guarantee_amount = Some(guarantee);
            game.has_guarantee = true;
            found.mark("guarantee_amount");
        }
        if let Some(jackpot) = header.jackpot_per_entry {
            game.jackpot_per_entry = Some(jackpot);
            found.mark("jackpot_per_entry");
        }
    }

    let (levels, breaks) = embedded::extract_levels(html);
    if !levels.is_empty() {
        game.levels = levels;
        found.mark("levels");
    }
    if !breaks.is_empty() {
        game.breaks = breaks;
        found.mark("breaks");
    }

    let subtitle = fields::extract(&document, &mut game, &mut found);

    let mut classification_text = String::new();
    if let Some(name) = &game.name {
        classification_text.push_str(name);
    }
    for tag in &game.game_tags {
        classification_text.push(' ');
        classification_text.push_str(tag);
    }
    if let Some(sub) = &subtitle {
        classification_text.push(' ');
        classification_text.push_str(sub);
    }

    if let Some(venue) = venues::match_venue(&classification_text, venues) {
        game.venue_id = Some(venue.id.clone());
        found.mark("venue_id");
    }

    classify::classify(&mut game, subtitle.as_deref());

    if !game.has_guarantee && guarantee::has_guarantee_keyword(&classification_text) {
        game.has_guarantee = true;
    }
    if game.has_guarantee && game.guarantee_amount.is_none() {
        game.guarantee_amount = guarantee::guarantee_amount_cents(&classification_text);
    }
    if game.has_guarantee {
        found.mark("guarantee_amount");
    }

    economics::compute(&mut game, inference_min_cents);
    if game.economics.is_some() {
        found.mark("economics");
    }
    if game.guarantee_was_inferred {
        found.mark("guarantee_amount");
    }

    Ok(ParsedPage {
        game,
        found_fields: found.into_sorted(),
        special_status: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BountyType, SpeedType};

    const URL: &str = "https://poker.example.com/tournament.php?id=42";

    const FULL_PAGE: &str = r#"
        <html><head><title>Tuesday Deepstack</title></head><body>
        <div class="cw-game-title">Tuesday $10K GTD PKO Deepstack</div>
        <div class="cw-game-buyins">
            <span class="cw-badge">NLHE</span>
            <span class="cw-badge">Turbo</span>
        </div>
        <span id="cw_clock_start_date_time_local">2025-06-03 19:30</span>
        <span id="cw_clock_buyin">$150 + $25</span>
        <span id="cw_clock_playersentries">23/87</span>
        <span id="cw_clock_shortlimitgame">NLHE</span>
        <div><label>Status</label><strong>Running</strong></div>
        <script>
        const cw_tt = {"name": "Tuesday $10K GTD PKO Deepstack", "startchips": 25000};
        const cw_tt_levels = [
            {"level": 1, "sb": 100, "bb": 200, "ante": 200, "duration": 30}
        ];
        </script>
        </body></html>
    "#;

    #[test]
    fn test_full_page_parse() {
        let page = parse_tournament_page(FULL_PAGE, URL, "E1", &[], 100).unwrap();
        assert!(!page.special_status);

        let g = &page.game;
        assert_eq!(g.tournament_id.as_deref(), Some("42"));
        assert_eq!(g.buy_in, Some(15000));
        assert_eq!(g.rake, Some(2500));
        assert_eq!(g.starting_stack, Some(25000));
        assert_eq!(g.levels.len(), 1);
        assert_eq!(g.bounty_type, BountyType::Progressive);
        assert_eq!(g.speed_type, SpeedType::Turbo);
        assert!(g.has_guarantee);
        assert_eq!(g.guarantee_amount, Some(1_000_000));
        assert!(g.economics.is_some());

        assert!(page.found_fields.contains(&"buy_in".to_string()));
        assert!(page.found_fields.contains(&"levels".to_string()));
    }

    #[test]
    fn test_bot_blocked_short_circuits() {
        let html = r#"<meta http-equiv="refresh" content="0;url=/.well-known/sgcaptcha/x">"#;
        let err = parse_tournament_page(html, URL, "E1", &[], 100).unwrap_err();
        assert!(matches!(
            err,
            ParseError::BotBlocked(BotBlockKind::SiteGroundCaptcha)
        ));
    }

    #[test]
    fn test_special_status_aborts_extraction() {
        let html = r#"<html><body>
            <span class="cw-badge cw-bg-warning">Tournament not published</span>
            <div class="cw-game-title">Should not be read</div>
            </body></html>"#;
        let page = parse_tournament_page(html, URL, "E1", &[], 100).unwrap();
        assert!(page.special_status);
        assert_eq!(page.game.game_status, GameStatus::NotPublished);
        assert!(page.game.name.is_none());
    }

    #[test]
    fn test_venue_matched_from_name() {
        let venues = vec![Venue {
            id: "V1".into(),
            entity_id: "E1".into(),
            name: "Crown".into(),
            aliases: vec![],
            fee: None,
        }];
        let html = r#"<html><body>
            <div class="cw-game-title">Crown Tuesday Freezeout</div>
            </body></html>"#;
        let page = parse_tournament_page(html, URL, "E1", &venues, 100).unwrap();
        assert_eq!(page.game.venue_id.as_deref(), Some("V1"));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let a = parse_tournament_page(FULL_PAGE, URL, "E1", &[], 100).unwrap();
        let b = parse_tournament_page(FULL_PAGE, URL, "E1", &[], 100).unwrap();
        assert_eq!(a.found_fields, b.found_fields);
        assert_eq!(a.game.data_hash(), b.game.data_hash());
    }
}
