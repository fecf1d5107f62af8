//! Configuration management.
//!
//! Settings are loaded from a `railbird.toml` file in the data directory,
//! with environment variable overrides (`RAILBIRD_DATA_DIR`, `DATABASE_PATH`).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const DEFAULT_DATABASE_FILENAME: &str = "railbird.db";
const PAGES_SUBDIR: &str = "pages";
const CONFIG_FILENAME: &str = "railbird.toml";

/// Application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename within the data directory.
    pub database_filename: String,
    /// Directory for storing raw page blobs (defaults to `{data_dir}/pages`).
    pub pages_dir: Option<PathBuf>,
    /// User agent for HTTP requests.
    pub user_agent: String,
    /// Per-fetch timeout in seconds.
    pub fetch_timeout: u64,
    /// Per-pipeline timeout in seconds.
    pub pipeline_timeout: u64,
    /// Delay between requests in milliseconds.
    pub request_delay_ms: u64,
    /// Worker pool size for range jobs.
    pub workers: usize,
    /// Chunk size for range jobs.
    pub chunk_size: usize,
    /// Source system label recorded on scrape URLs.
    pub source_system: String,
    /// Minimum overlay (in cents) before a guarantee is inferred from a
    /// prizepool that exceeds player contributions.
    pub guarantee_inference_min_cents: i64,
}

impl Default for Settings {
    fn default() -> Self {
        // Default to ~/.local/share-ish data under the home directory,
        // falling back to the current directory.
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("railbird");

        Self {
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            pages_dir: None,
            user_agent: "Railbird/0.3 (schedule compliance)".to_string(),
            fetch_timeout: 30,
            pipeline_timeout: 60,
            request_delay_ms: 250,
            workers: 10,
            chunk_size: 25,
            source_system: "clockwork".to_string(),
            guarantee_inference_min_cents: 100,
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Load settings from a config file, falling back to defaults.
    ///
    /// Resolution order: explicit path, `$RAILBIRD_DATA_DIR/railbird.toml`,
    /// `{default data dir}/railbird.toml`, built-in defaults.
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let env_data_dir = std::env::var_os("RAILBIRD_DATA_DIR").map(PathBuf::from);

        let candidate = match config_path {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let base = env_data_dir
                    .clone()
                    .unwrap_or_else(|| Settings::default().data_dir);
                let p = base.join(CONFIG_FILENAME);
                p.exists().then_some(p)
            }
        };

        let mut settings = match candidate {
            Some(path) => {
                let text = fs::read_to_string(&path)?;
                toml::from_str(&text)?
            }
            None => Settings::default(),
        };

        if let Some(dir) = env_data_dir {
            settings.data_dir = dir;
        }
        if let Some(path) = std::env::var_os("DATABASE_PATH") {
            let path = PathBuf::from(path);
            if let Some(parent) = path.parent() {
                settings.data_dir = parent.to_path_buf();
            }
            if let Some(name) = path.file_name() {
                settings.database_filename = name.to_string_lossy().into_owned();
            }
        }

        Ok(settings)
    }

    /// Get the full path to the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Get the directory raw page blobs are stored under.
    pub fn pages_dir(&self) -> PathBuf {
        self.pages_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join(PAGES_SUBDIR))
    }

    /// Check if the database appears to be initialized.
    pub fn is_initialized(&self) -> bool {
        self.database_path().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.workers, 10);
        assert_eq!(settings.fetch_timeout, 30);
        assert!(settings.data_dir.ends_with("railbird"));
    }

    #[test]
    fn test_database_path() {
        let settings = Settings::with_data_dir(PathBuf::from("/tmp/rb"));
        assert_eq!(settings.database_path(), PathBuf::from("/tmp/rb/railbird.db"));
    }

    #[test]
    fn test_pages_dir_default() {
        let settings = Settings::with_data_dir(PathBuf::from("/tmp/rb"));
        assert_eq!(settings.pages_dir(), PathBuf::from("/tmp/rb/pages"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let settings = Settings::default();
        let text = toml::to_string(&settings).unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed.workers, settings.workers);
        assert_eq!(parsed.source_system, settings.source_system);
    }
}
