//! Initialize command.

use console::style;

use crate::config::Settings;
use crate::repository::Repository;

/// Create the data directory, page store, and database schema.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    std::fs::create_dir_all(&settings.data_dir)?;
    std::fs::create_dir_all(settings.pages_dir())?;

    Repository::open(&settings.database_path())?;

    println!(
        "{} Initialized railbird in {}",
        style("✓").green(),
        settings.data_dir.display()
    );
    println!("  database: {}", settings.database_path().display());
    println!("  pages:    {}", settings.pages_dir().display());
    println!();
    println!("Next: add an entity and its venues, e.g.");
    println!("  railbird entity add E1 \"Example Poker\" --domain https://poker.example.com --path \"/tournament.php?id=\"");
    println!("  railbird venue add V1 E1 \"Main Room\" --alias \"The Room\"");

    Ok(())
}
