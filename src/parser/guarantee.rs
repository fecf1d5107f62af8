//! Guarantee detection from marketing text.

use std::sync::OnceLock;

use regex::Regex;

const KEYWORDS: &[&str] = &["gtd", "guaranteed", "g'teed", "guarantee"];

fn patterns() -> &'static [Regex; 5] {
    static PATTERNS: OnceLock<[Regex; 5]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let gtd = r"(?:gtd|guaranteed|g'teed|guarantee)";
        [
            // $12,500 GTD
            Regex::new(&format!(r"\$([\d,]+(?:\.\d+)?)\s*{gtd}")).expect("guarantee pattern"),
            // $1.5M
            Regex::new(r"\$(\d+(?:\.\d+)?)\s*m\b").expect("guarantee pattern"),
            // $50K
            Regex::new(r"\$(\d+(?:\.\d+)?)\s*k\b").expect("guarantee pattern"),
            // 1.5M GTD
            Regex::new(&format!(r"(\d+(?:\.\d+)?)\s*m\s*{gtd}")).expect("guarantee pattern"),
            // 50K GTD
            Regex::new(&format!(r"(\d+(?:\.\d+)?)\s*k\s*{gtd}")).expect("guarantee pattern"),
        ]
    })
}

fn bare_amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$([\d,]+(?:\.\d+)?)").expect("guarantee pattern"))
}

/// Whether the text advertises a guarantee at all.
pub fn has_guarantee_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Extract the guaranteed amount in cents. First matching pattern wins;
/// a bare dollar amount only counts when a guarantee keyword appears
/// somewhere in the text.
pub fn guarantee_amount_cents(text: &str) -> Option<i64> {
    let lower = text.to_lowercase();

    for (index, pattern) in patterns().iter().enumerate() {
        if let Some(captures) = pattern.captures(&lower) {
            let raw = captures.get(1)?.as_str().replace(',', "");
            let value: f64 = raw.parse().ok()?;
            let multiplier = match index {
                1 | 3 => 1_000_000.0,
                2 | 4 => 1_000.0,
                _ => 1.0,
            };
            return Some((value * multiplier * 100.0).round() as i64);
        }
    }

    if has_guarantee_keyword(&lower) {
        if let Some(captures) = bare_amount_re().captures(&lower) {
            let raw = captures.get(1)?.as_str().replace(',', "");
            let value: f64 = raw.parse().ok()?;
            return Some((value * 100.0).round() as i64);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_detection() {
        assert!(has_guarantee_keyword("$10K GTD Deepstack"));
        assert!(has_guarantee_keyword("Fully Guaranteed"));
        assert!(has_guarantee_keyword("G'teed prizepool"));
        assert!(!has_guarantee_keyword("Tuesday Freezeout"));
    }

    #[test]
    fn test_dollar_gtd() {
        assert_eq!(guarantee_amount_cents("$12,500 GTD"), Some(1_250_000));
    }

    #[test]
    fn test_abbreviated_amounts() {
        assert_eq!(guarantee_amount_cents("$1.5M main event"), Some(150_000_000));
        assert_eq!(guarantee_amount_cents("$50K GTD"), Some(5_000_000));
        assert_eq!(guarantee_amount_cents("200K guaranteed"), Some(20_000_000));
    }

    #[test]
    fn test_bare_amount_needs_keyword() {
        assert_eq!(guarantee_amount_cents("$5,000 buy-in satellite"), None);
        assert_eq!(
            guarantee_amount_cents("guaranteed prizepool of $5,000"),
            Some(500_000)
        );
    }

    #[test]
    fn test_no_amount() {
        assert_eq!(guarantee_amount_cents("Tuesday Deepstack"), None);
        assert_eq!(guarantee_amount_cents("guaranteed fun"), None);
    }
}
