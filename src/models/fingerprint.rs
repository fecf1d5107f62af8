//! Structure fingerprints for schema-drift detection.
//!
//! Each parse emits the sorted set of field names it actually populated;
//! the hash of that set identifies a page structure. A new hash appearing
//! in the wild means the source site changed shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Compute the fingerprint id for a set of extracted field names.
///
/// The id is the SHA-256 of the sorted field list joined by commas.
pub fn fingerprint_id(fields: &[String]) -> String {
    let mut sorted: Vec<&str> = fields.iter().map(|s| s.as_str()).collect();
    sorted.sort_unstable();
    sorted.dedup();
    let mut hasher = Sha256::new();
    hasher.update(sorted.join(",").as_bytes());
    hex::encode(hasher.finalize())
}

/// An observed page structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureFingerprint {
    pub id: String,
    pub fields: Vec<String>,
    pub structure_label: Option<String>,
    pub occurrence_count: i64,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub example_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_order_independent() {
        let a = fingerprint_id(&["name".to_string(), "buy_in".to_string()]);
        let b = fingerprint_id(&["buy_in".to_string(), "name".to_string()]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_distinguishes_field_sets() {
        let a = fingerprint_id(&["name".to_string()]);
        let b = fingerprint_id(&["name".to_string(), "buy_in".to_string()]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_dedupes() {
        let a = fingerprint_id(&["name".to_string(), "name".to_string()]);
        let b = fingerprint_id(&["name".to_string()]);
        assert_eq!(a, b);
    }
}
