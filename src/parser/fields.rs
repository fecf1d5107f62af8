//! DOM field extraction.
//!
//! Selector ids and classes here are the de-facto wire format with the
//! schedule site; changing them breaks the contract. Everything is
//! best-effort: a missing anchor just leaves the field unset, and the
//! structure fingerprint surfaces the drift.

use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::text::{normalize_whitespace, parse_int, parse_money_cents};
use super::timezone::civil_to_utc;
use super::FieldSet;
use crate::models::{Game, GameStatus, PayoutResult, RegistrationStatus, SeatingEntry, TableInfo};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %I:%M %p",
    "%d %b %Y %H:%M",
];

/// Extract DOM-anchored fields into the game record.
///
/// Returns the page subtitle text, which feeds classification alongside
/// the name and tags.
pub fn extract(document: &Html, game: &mut Game, found: &mut FieldSet) -> Option<String> {
    if game.name.is_none() {
        if let Some(title) = select_text(document, ".cw-game-title") {
            game.name = Some(title);
        }
    }
    if game.name.is_some() {
        found.mark("name");
    }

    let subtitle = select_text(document, ".cw-game-shortdesc");

    if let Ok(tag_sel) = Selector::parse(".cw-game-buyins .cw-badge") {
        for badge in document.select(&tag_sel) {
            let tag = normalize_whitespace(&badge.text().collect::<String>());
            if !tag.is_empty() {
                game.game_tags.push(tag);
            }
        }
    }
    if !game.game_tags.is_empty() {
        found.mark("game_tags");
    }

    extract_clock_fields(document, game, found);
    extract_labeled_fields(document, game, found);
    extract_tables(document, game, found);

    subtitle
}

fn extract_clock_fields(document: &Html, game: &mut Game, found: &mut FieldSet) {
    if let Some(text) = select_text(document, "#cw_clock_start_date_time_local") {
        if let Some(local) = parse_local_datetime(&text) {
            game.game_start = Some(civil_to_utc(local));
            found.mark("game_start");
        }
    }

    if let Some(text) = select_text(document, "#cw_clock_prizepool") {
        if let Some(cents) = parse_money_cents(&text) {
            game.prizepool_paid = Some(cents);
            found.mark("prizepool_paid");
        }
    }

    // Published as "remaining/total"
    if let Some(text) = select_text(document, "#cw_clock_playersentries") {
        if let Some((remaining, total)) = text.split_once('/') {
            if let Some(n) = parse_int(remaining) {
                game.players_remaining = Some(n);
                found.mark("players_remaining");
            }
            if let Some(n) = parse_int(total) {
                game.total_initial_entries = Some(n);
                found.mark("total_initial_entries");
            }
        }
    }

    // Either a plain count or "rebuys/addons"
    if let Some(text) = select_text(document, "#cw_clock_rebuys") {
        if let Some((rebuys, addons)) = text.split_once('/') {
            if let Some(n) = parse_int(rebuys) {
                game.total_rebuys = Some(n);
                found.mark("total_rebuys");
            }
            if let Some(n) = parse_int(addons) {
                game.total_addons = Some(n);
                found.mark("total_addons");
            }
        } else if let Some(n) = parse_int(&text) {
            game.total_rebuys = Some(n);
            found.mark("total_rebuys");
        }
    }

    // "$150 + $25" is buy-in plus rake
    if let Some(text) = select_text(document, "#cw_clock_buyin") {
        if let Some((buy_in, rake)) = text.split_once('+') {
            if game.buy_in.is_none() {
                game.buy_in = parse_money_cents(buy_in);
            }
            if game.rake.is_none() {
                game.rake = parse_money_cents(rake);
            }
        } else if game.buy_in.is_none() {
            game.buy_in = parse_money_cents(&text);
        }
    }
    if game.buy_in.is_some() {
        found.mark("buy_in");
    }
    if game.rake.is_some() {
        found.mark("rake");
    }

    if game.starting_stack.is_none() {
        if let Some(text) = select_text(document, "#cw_clock_startchips") {
            game.starting_stack = parse_int(&text);
        }
    }
    if game.starting_stack.is_some() {
        found.mark("starting_stack");
    }

    if let Some(code) = select_text(document, "#cw_clock_shortlimitgame") {
        let code = code.to_uppercase();
        if !code.is_empty() {
            game.variant_code = Some(code);
            found.mark("variant_code");
        }
    }
}

/// The site renders scalar facts as `<label>Status</label><strong>…</strong>`.
fn extract_labeled_fields(document: &Html, game: &mut Game, found: &mut FieldSet) {
    let Ok(label_sel) = Selector::parse("label") else {
        return;
    };

    for label in document.select(&label_sel) {
        let key = normalize_whitespace(&label.text().collect::<String>()).to_lowercase();
        let Some(value_el) = next_element(label) else {
            continue;
        };
        if value_el.value().name() != "strong" {
            continue;
        }
        let value = normalize_whitespace(&value_el.text().collect::<String>());
        if value.is_empty() {
            continue;
        }

        if key.contains("registration") {
            game.registration_status = RegistrationStatus::from_site_text(&value);
            found.mark("registration_status");
        } else if key.contains("status") {
            game.game_status = GameStatus::from_site_text(&value);
            found.mark("game_status");
        } else if key.contains("duration") {
            if let Some(minutes) = parse_duration_minutes(&value) {
                game.total_duration_minutes = Some(minutes);
                found.mark("total_duration_minutes");
            }
        } else if key.contains("unique") || key.contains("players") {
            if let Some(n) = parse_int(&value) {
                game.unique_players = Some(n);
                found.mark("unique_players");
            }
        } else if key.contains("add-on") || key.contains("addon") {
            if let Some(n) = parse_int(&value) {
                game.total_addons = Some(n);
                found.mark("total_addons");
            }
        } else if key.contains("rebuy") && game.total_rebuys.is_none() {
            if let Some(n) = parse_int(&value) {
                game.total_rebuys = Some(n);
                found.mark("total_rebuys");
            }
        }
    }
}

/// Entries, result, and live-table listings sit in tables following
/// `h4.cw-text-center` headers.
fn extract_tables(document: &Html, game: &mut Game, found: &mut FieldSet) {
    let Ok(header_sel) = Selector::parse("h4.cw-text-center") else {
        return;
    };

    for header in document.select(&header_sel) {
        let heading = normalize_whitespace(&header.text().collect::<String>()).to_lowercase();
        let Some(table) = following_table(header) else {
            continue;
        };
        let rows = table_rows(table);

        if heading.contains("entries") {
            for cells in &rows {
                let Some(player) = cells.first().filter(|p| !p.is_empty()) else {
                    continue;
                };
                game.seating.push(SeatingEntry {
                    player: player.clone(),
                    table: cells.get(1).and_then(|c| parse_int(c)),
                    seat: cells.get(2).and_then(|c| parse_int(c)),
                    stack: cells.get(3).and_then(|c| parse_int(c)),
                });
            }
            if !game.seating.is_empty() {
                found.mark("seating");
            }
        } else if heading.contains("result") {
            for cells in &rows {
                let Some(place) = cells.first().and_then(|c| parse_int(c)) else {
                    continue;
                };
                let Some(player) = cells.get(1).filter(|p| !p.is_empty()) else {
                    continue;
                };
                game.results.push(PayoutResult {
                    place,
                    player: player.clone(),
                    amount: cells.get(2).and_then(|c| parse_money_cents(c)),
                });
            }
            if !game.results.is_empty() {
                found.mark("results");
            }
        } else if heading.contains("tables") {
            for cells in &rows {
                let (Some(table_no), Some(players)) = (
                    cells.first().and_then(|c| parse_int(c)),
                    cells.get(1).and_then(|c| parse_int(c)),
                ) else {
                    continue;
                };
                game.tables.push(TableInfo {
                    table: table_no,
                    players,
                });
            }
            if !game.tables.is_empty() {
                found.mark("tables");
            }
        }
    }
}

fn select_text(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let element = document.select(&sel).next()?;
    let text = normalize_whitespace(&element.text().collect::<String>());
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn next_element(element: ElementRef) -> Option<ElementRef> {
    let mut node = element.next_sibling();
    while let Some(n) = node {
        if let Some(el) = ElementRef::wrap(n) {
            return Some(el);
        }
        node = n.next_sibling();
    }
    None
}

/// The table either directly follows the header or sits inside the next
/// wrapper element.
fn following_table(header: ElementRef) -> Option<ElementRef> {
    let sibling = next_element(header)?;
    if sibling.value().name() == "table" {
        return Some(sibling);
    }
    let table_sel = Selector::parse("table").ok()?;
    sibling.select(&table_sel).next()
}

fn table_rows(table: ElementRef) -> Vec<Vec<String>> {
    let Ok(row_sel) = Selector::parse("tr") else {
        return Vec::new();
    };
    let Ok(cell_sel) = Selector::parse("td") else {
        return Vec::new();
    };

    table
        .select(&row_sel)
        .map(|row| {
            row.select(&cell_sel)
                .map(|cell| normalize_whitespace(&cell.text().collect::<String>()))
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect()
}

fn parse_local_datetime(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

fn parse_duration_minutes(text: &str) -> Option<i64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?:(\d+)\s*h)?\s*(?:(\d+)\s*m)?").expect("duration pattern")
    });

    if let Some(captures) = re.captures(&text.to_lowercase()) {
        let hours: i64 = captures
            .get(1)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        let minutes: i64 = captures
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        if hours > 0 || minutes > 0 {
            return Some(hours * 60 + minutes);
        }
    }
    parse_int(text)
}
