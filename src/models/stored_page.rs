//! Stored page metadata with content-addressed version history.
//!
//! Raw HTML blobs live in the blob store; this record tracks the head
//! version plus an append-only list of prior versions, so updates from the
//! schedule site can be detected over time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Compute the SHA-256 content hash used for version deduplication.
pub fn compute_content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Snapshot of a superseded page version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageVersion {
    pub blob_key: String,
    pub scraped_at: DateTime<Utc>,
    pub content_hash: String,
    pub content_size: i64,
    pub game_status: Option<String>,
    pub version_number: i64,
}

/// Blob metadata record attached to a scrape URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPage {
    pub id: String,
    pub scrape_url: String,
    pub entity_id: String,
    pub tournament_id: Option<String>,

    // Head version
    pub blob_key: String,
    pub content_hash: String,
    pub content_size: i64,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub http_status: Option<u16>,
    pub scraped_at: DateTime<Utc>,
    pub stored_at: DateTime<Utc>,

    // Version history: version_number == 1 + previous_versions.len()
    pub version_number: i64,
    pub total_versions: i64,
    pub previous_versions: Vec<PageVersion>,

    // Parse bookkeeping
    pub is_parsed: bool,
    pub parsed_data_hash: Option<String>,
    pub extracted_fields: Vec<String>,
    pub data_changed_at: Option<DateTime<Utc>>,
    pub data_change_count: i64,
    pub parse_count: i64,
    pub rescrape_count: i64,
}

impl StoredPage {
    /// Create the first version of a stored page.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scrape_url: &str,
        entity_id: &str,
        tournament_id: Option<String>,
        blob_key: String,
        content: &[u8],
        etag: Option<String>,
        last_modified: Option<String>,
        http_status: Option<u16>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            scrape_url: scrape_url.to_string(),
            entity_id: entity_id.to_string(),
            tournament_id,
            blob_key,
            content_hash: compute_content_hash(content),
            content_size: content.len() as i64,
            etag,
            last_modified,
            http_status,
            scraped_at: now,
            stored_at: now,
            version_number: 1,
            total_versions: 1,
            previous_versions: Vec::new(),
            is_parsed: false,
            parsed_data_hash: None,
            extracted_fields: Vec::new(),
            data_changed_at: None,
            data_change_count: 0,
            parse_count: 0,
            rescrape_count: 0,
        }
    }

    /// Whether new content would create a new version.
    ///
    /// A new version is created iff the content hash differs from the head,
    /// or the hash is unknown and the size differs.
    pub fn content_changed(&self, content_hash: &str, content_size: i64) -> bool {
        if self.content_hash.is_empty() {
            return self.content_size != content_size;
        }
        self.content_hash != content_hash
    }

    /// Advance the head to new content, appending the old head to history.
    ///
    /// Returns true if a new version was recorded, false if the content was
    /// identical to the current head (only the rescrape counter advances).
    #[allow(clippy::too_many_arguments)]
    pub fn record_fetch(
        &mut self,
        blob_key: String,
        content: &[u8],
        etag: Option<String>,
        last_modified: Option<String>,
        http_status: Option<u16>,
        now: DateTime<Utc>,
    ) -> bool {
        let hash = compute_content_hash(content);
        if !self.content_changed(&hash, content.len() as i64) {
            self.rescrape_count += 1;
            self.scraped_at = now;
            return false;
        }

        self.previous_versions.push(PageVersion {
            blob_key: std::mem::take(&mut self.blob_key),
            scraped_at: self.scraped_at,
            content_hash: std::mem::take(&mut self.content_hash),
            content_size: self.content_size,
            game_status: None,
            version_number: self.version_number,
        });

        self.blob_key = blob_key;
        self.content_hash = hash;
        self.content_size = content.len() as i64;
        self.etag = etag;
        self.last_modified = last_modified;
        self.http_status = http_status;
        self.scraped_at = now;
        self.stored_at = now;
        self.version_number += 1;
        self.total_versions = self.version_number;
        self.is_parsed = false;
        true
    }

    /// Record a parse pass over the head version.
    ///
    /// Returns true if the parsed data hash changed from the previous parse.
    pub fn record_parse(
        &mut self,
        parsed_data_hash: &str,
        extracted_fields: Vec<String>,
        now: DateTime<Utc>,
    ) -> bool {
        let changed = self.parsed_data_hash.as_deref() != Some(parsed_data_hash);
        if changed {
            self.data_changed_at = Some(now);
            self.data_change_count += 1;
        }
        self.parsed_data_hash = Some(parsed_data_hash.to_string());
        self.extracted_fields = extracted_fields;
        self.is_parsed = true;
        self.parse_count += 1;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(content: &[u8]) -> StoredPage {
        StoredPage::new(
            "https://host/t.php?id=1",
            "E1",
            Some("1".to_string()),
            "E1/1/1000.html".to_string(),
            content,
            None,
            None,
            Some(200),
        )
    }

    #[test]
    fn test_compute_content_hash() {
        let hash = compute_content_hash(b"<html></html>");
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_new_page_invariants() {
        let p = page(b"v1");
        assert_eq!(p.version_number, 1);
        assert_eq!(p.total_versions, 1);
        assert!(p.previous_versions.is_empty());
    }

    #[test]
    fn test_record_fetch_same_content_no_new_version() {
        let mut p = page(b"v1");
        let changed = p.record_fetch(
            "E1/1/2000.html".to_string(),
            b"v1",
            None,
            None,
            Some(200),
            Utc::now(),
        );
        assert!(!changed);
        assert_eq!(p.version_number, 1);
        assert_eq!(p.rescrape_count, 1);
        // Head key is unchanged; the new blob was never linked
        assert_eq!(p.blob_key, "E1/1/1000.html");
    }

    #[test]
    fn test_record_fetch_new_content_appends_history() {
        let mut p = page(b"v1");
        let changed = p.record_fetch(
            "E1/1/2000.html".to_string(),
            b"v2",
            Some("\"abc\"".to_string()),
            None,
            Some(200),
            Utc::now(),
        );
        assert!(changed);
        assert_eq!(p.version_number, 2);
        assert_eq!(p.total_versions, 2);
        assert_eq!(p.previous_versions.len(), 1);
        assert_eq!(p.previous_versions[0].blob_key, "E1/1/1000.html");
        assert_eq!(p.previous_versions[0].version_number, 1);
        assert_eq!(p.blob_key, "E1/1/2000.html");
        // version_number == 1 + len(previous_versions)
        assert_eq!(p.version_number, 1 + p.previous_versions.len() as i64);
    }

    #[test]
    fn test_record_parse_tracks_data_changes() {
        let mut p = page(b"v1");
        let now = Utc::now();
        assert!(p.record_parse("hash-a", vec!["name".to_string()], now));
        assert!(!p.record_parse("hash-a", vec!["name".to_string()], now));
        assert!(p.record_parse("hash-b", vec!["name".to_string()], now));
        assert_eq!(p.data_change_count, 2);
        assert_eq!(p.parse_count, 3);
    }
}
