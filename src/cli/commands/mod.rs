//! Command implementations, one module per command group.

pub mod catalog;
pub mod ingest;
pub mod init;
pub mod inspect;
pub mod schedule;

use crate::config::Settings;
use crate::repository::Repository;

/// Open the repository for a command, failing with a hint when the data
/// directory has not been initialized.
pub(crate) fn open_repository(settings: &Settings) -> anyhow::Result<Repository> {
    if !settings.is_initialized() {
        anyhow::bail!(
            "no database at {} (run `railbird init` first)",
            settings.database_path().display()
        );
    }
    Ok(Repository::open(&settings.database_path())?)
}
