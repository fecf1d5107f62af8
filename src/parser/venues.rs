//! Venue matching against the alias catalog.

use crate::models::Venue;

fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Match a tournament name against the venue catalog.
///
/// A venue matches when its name or any alias appears in the normalized
/// text; the longest matching alias wins, so "Star Gold Coast" beats
/// "Star" when both are in the catalog.
pub fn match_venue<'a>(text: &str, venues: &'a [Venue]) -> Option<&'a Venue> {
    let haystack = normalize(text);
    if haystack.is_empty() {
        return None;
    }

    let mut best: Option<(&Venue, usize)> = None;
    for venue in venues {
        let mut candidates = vec![venue.name.as_str()];
        candidates.extend(venue.aliases.iter().map(|a| a.as_str()));

        for candidate in candidates {
            let needle = normalize(candidate);
            if needle.is_empty() || !haystack.contains(&needle) {
                continue;
            }
            if best.map(|(_, len)| needle.len() > len).unwrap_or(true) {
                best = Some((venue, needle.len()));
            }
        }
    }
    best.map(|(venue, _)| venue)
}
