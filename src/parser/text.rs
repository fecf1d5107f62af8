//! Small text normalization and number parsing helpers.

/// Parse a money string ("$1,500", "150.50", "$150 GTD") into cents.
pub fn parse_money_cents(text: &str) -> Option<i64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let dollars: f64 = cleaned.parse().ok()?;
    Some((dollars * 100.0).round() as i64)
}

/// Parse an integer, tolerating commas and surrounding text.
pub fn parse_int(text: &str) -> Option<i64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Collapse runs of whitespace to single spaces and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_money_cents() {
        assert_eq!(parse_money_cents("$1,500"), Some(150000));
        assert_eq!(parse_money_cents("150.50"), Some(15050));
        assert_eq!(parse_money_cents("$150 GTD"), Some(15000));
        assert_eq!(parse_money_cents("TBA"), None);
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("1,234 players"), Some(1234));
        assert_eq!(parse_int(""), None);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n b\t c "), "a b c");
    }
}
