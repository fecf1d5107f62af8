//! Bot-challenge and special-status detection.
//!
//! Runs before any field extraction. A challenge page must never be stored
//! or parsed as tournament content.

use scraper::{Html, Selector};

use crate::models::GameStatus;

/// The kind of challenge page that blocked the fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotBlockKind {
    SiteGroundCaptcha,
    CloudflareChallenge,
    GenericCaptcha,
    ChallengeRedirect,
}

impl BotBlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SiteGroundCaptcha => "SITEGROUND_CAPTCHA",
            Self::CloudflareChallenge => "CLOUDFLARE_CHALLENGE",
            Self::GenericCaptcha => "GENERIC_CAPTCHA",
            Self::ChallengeRedirect => "CHALLENGE_REDIRECT",
        }
    }
}

/// Detect challenge pages in the raw body.
pub fn detect_bot_block(html: &str) -> Option<BotBlockKind> {
    if html.contains("/.well-known/sgcaptcha/") {
        return Some(BotBlockKind::SiteGroundCaptcha);
    }

    let lower = html.to_lowercase();
    if lower.contains("cf-challenge")
        || lower.contains("cf_chl_opt")
        || lower.contains("checking your browser before accessing")
        || lower.contains("cloudflare ray id")
    {
        return Some(BotBlockKind::CloudflareChallenge);
    }
    if lower.contains("complete the captcha")
        || lower.contains("verify you are human")
        || lower.contains("are you a robot")
    {
        return Some(BotBlockKind::GenericCaptcha);
    }

    // A tiny body whose only content is a meta refresh is a challenge
    // redirect even without recognizable vendor markers.
    if html.len() < 1024 && lower.contains("http-equiv=\"refresh\"") {
        return Some(BotBlockKind::ChallengeRedirect);
    }

    None
}

/// Detect pages the site serves for unpublished or retired tournament ids.
///
/// Returns the status to record; the URL should not be scraped again.
pub fn detect_special_status(document: &Html) -> Option<GameStatus> {
    let mut markers = Vec::new();

    if let Ok(badge_sel) = Selector::parse(".cw-badge.cw-bg-warning") {
        for badge in document.select(&badge_sel) {
            markers.push(badge.text().collect::<String>());
        }
    }
    if let Ok(title_sel) = Selector::parse("title") {
        if let Some(title) = document.select(&title_sel).next() {
            markers.push(title.text().collect::<String>());
        }
    }

    for marker in &markers {
        let t = marker.to_lowercase();
        if t.contains("not published") {
            return Some(GameStatus::NotPublished);
        }
        if t.contains("not found") || t.contains("not in use") || t.contains("not available") {
            return Some(GameStatus::NotInUse);
        }
        if t.contains("error") {
            return Some(GameStatus::Unknown);
        }
    }
    None
}
