//! Embedded JSON extraction.
//!
//! The site inlines two script literals: `const cw_tt = {...};` with the
//! game header and `const cw_tt_levels = [...];` with the blind structure.
//! Both are best-effort; DOM extraction fills anything missing.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::models::{BlindLevel, BreakInfo};

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)const\s+cw_tt\s*=\s*(\{.*?\})\s*;").expect("embedded header pattern")
    })
}

fn levels_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)const\s+cw_tt_levels\s*=\s*(\[.*?\])\s*;").expect("embedded levels pattern")
    })
}

/// Game header fields lifted from `cw_tt`.
#[derive(Debug, Default)]
pub struct EmbeddedHeader {
    pub name: Option<String>,
    pub status: Option<String>,
    pub buy_in: Option<i64>,
    pub rake: Option<i64>,
    pub starting_stack: Option<i64>,
    pub guarantee: Option<i64>,
    pub jackpot_per_entry: Option<i64>,
}

/// Extract the game header literal, if present and well-formed.
pub fn extract_header(html: &str) -> Option<EmbeddedHeader> {
    let captures = header_re().captures(html)?;
    let value: Value = serde_json::from_str(captures.get(1)?.as_str()).ok()?;
    let obj = value.as_object()?;

    Some(EmbeddedHeader {
        name: string_field(obj, &["name", "title", "tournament_name"]),
        status: string_field(obj, &["status", "game_status"]),
        buy_in: money_field(obj, &["buyin", "buy_in"]),
        rake: money_field(obj, &["rake", "fee"]),
        starting_stack: int_field(obj, &["startchips", "starting_stack", "start_stack"]),
        guarantee: money_field(obj, &["guarantee", "gtd"]),
        jackpot_per_entry: money_field(obj, &["jackpot", "jackpot_per_entry"]),
    })
}

/// Extract the blind structure literal.
///
/// Break entries carry `is_break` (or a BREAK type tag); everything else is
/// a playing level.
pub fn extract_levels(html: &str) -> (Vec<BlindLevel>, Vec<BreakInfo>) {
    let mut levels = Vec::new();
    let mut breaks = Vec::new();

    let Some(captures) = levels_re().captures(html) else {
        return (levels, breaks);
    };
    let Some(raw) = captures.get(1) else {
        return (levels, breaks);
    };
    let Ok(Value::Array(entries)) = serde_json::from_str::<Value>(raw.as_str()) else {
        return (levels, breaks);
    };

    let mut level_number = 0i64;
    for entry in &entries {
        let Some(obj) = entry.as_object() else {
            continue;
        };
        let duration = int_field(obj, &["duration", "duration_minutes", "minutes"]).unwrap_or(0);

        let is_break = obj
            .get("is_break")
            .and_then(|v| v.as_bool())
            .unwrap_or_else(|| {
                string_field(obj, &["type"])
                    .map(|t| t.eq_ignore_ascii_case("break"))
                    .unwrap_or(false)
            });
        if is_break {
            breaks.push(BreakInfo {
                after_level: level_number,
                duration_minutes: duration,
            });
            continue;
        }

        level_number += 1;
        levels.push(BlindLevel {
            level: int_field(obj, &["level"]).unwrap_or(level_number),
            small_blind: int_field(obj, &["sb", "small_blind"]).unwrap_or(0),
            big_blind: int_field(obj, &["bb", "big_blind"]).unwrap_or(0),
            ante: int_field(obj, &["ante"]).unwrap_or(0),
            duration_minutes: duration,
        });
    }

    (levels, breaks)
}

fn string_field(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| obj.get(*k))
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn int_field(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<i64> {
    let value = keys.iter().find_map(|k| obj.get(*k))?;
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

/// Like `int_field` but the site publishes dollars; stored as cents.
fn money_field(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<i64> {
    let value = keys.iter().find_map(|k| obj.get(*k))?;
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(|dollars| (dollars * 100.0).round() as i64),
        Value::String(s) => super::text::parse_money_cents(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <script>
        const cw_tt = {"name": "Tuesday Deepstack", "status": "Running",
                       "buyin": 150, "rake": 25, "startchips": 25000};
        const cw_tt_levels = [
            {"level": 1, "sb": 100, "bb": 200, "ante": 200, "duration": 30},
            {"level": 2, "sb": 200, "bb": 400, "ante": 400, "duration": 30},
            {"is_break": true, "duration": 15},
            {"level": 3, "sb": 300, "bb": 600, "ante": 600, "duration": 30}
        ];
        </script>
    "#;

    #[test]
    fn test_header_extraction() {
        let header = extract_header(PAGE).unwrap();
        assert_eq!(header.name.as_deref(), Some("Tuesday Deepstack"));
        assert_eq!(header.buy_in, Some(15000));
        assert_eq!(header.rake, Some(2500));
        assert_eq!(header.starting_stack, Some(25000));
    }

    #[test]
    fn test_levels_and_breaks() {
        let (levels, breaks) = extract_levels(PAGE);
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[1].big_blind, 400);
        assert_eq!(breaks.len(), 1);
        assert_eq!(breaks[0].after_level, 2);
        assert_eq!(breaks[0].duration_minutes, 15);
    }

    #[test]
    fn test_missing_literals_tolerated() {
        assert!(extract_header("<html></html>").is_none());
        let (levels, breaks) = extract_levels("<html></html>");
        assert!(levels.is_empty());
        assert!(breaks.is_empty());
    }

    #[test]
    fn test_malformed_json_tolerated() {
        let html = "const cw_tt = {broken; const cw_tt_levels = [not json];";
        assert!(extract_header(html).is_none());
    }
}
