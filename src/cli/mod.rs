//! CLI parser and command dispatch.

mod commands;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "railbird")]
#[command(about = "Poker tournament schedule ingestion and compliance tracking")]
#[command(version)]
pub struct Cli {
    /// Data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Manage entities (tenants)
    Entity {
        #[command(subcommand)]
        command: EntityCommands,
    },

    /// Manage venues
    Venue {
        #[command(subcommand)]
        command: VenueCommands,
    },

    /// Manage recurring-game templates
    Recurring {
        #[command(subcommand)]
        command: RecurringCommands,
    },

    /// Scrape a single tournament page by URL or numeric id
    Scrape {
        /// Entity id the page belongs to
        entity_id: String,
        /// Tournament URL or numeric tournament id
        target: String,
        /// Re-fetch even when the cached copy is still fresh
        #[arg(short, long)]
        force: bool,
        /// Scrape even when the URL is marked do-not-scrape
        #[arg(long)]
        override_do_not_scrape: bool,
    },

    /// Scrape an inclusive range of tournament ids
    ScrapeRange {
        /// Entity id the pages belong to
        entity_id: String,
        /// First tournament id
        start_id: u64,
        /// Last tournament id (inclusive)
        end_id: u64,
        /// Re-fetch even when cached copies are still fresh
        #[arg(short, long)]
        force: bool,
    },

    /// Re-parse previously stored content by blob key (no network)
    Reparse {
        /// Entity id the page belongs to
        entity_id: String,
        /// Blob key of the stored version to parse
        blob_key: String,
    },

    /// Show scrape state and recent attempts for a URL
    Url {
        url: String,
        /// Number of recent attempts to show
        #[arg(short, long, default_value = "5")]
        attempts: u32,
    },

    /// List recent range-scrape jobs
    Jobs {
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// List observed page-structure fingerprints
    Fingerprints {
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Detect missing recurring-game instances in a date window
    Gaps {
        #[arg(long)]
        venue: String,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        /// Create instances for the gaps found
        #[arg(long)]
        create: bool,
    },

    /// Reconcile parsed games against the instance index
    Reconcile {
        #[arg(long)]
        venue: String,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        /// Apply the actions (default is a read-only preview)
        #[arg(long)]
        apply: bool,
    },

    /// Record a missed occurrence (CANCELLED, SKIPPED, or NO_SHOW)
    Missed {
        recurring_id: String,
        date: NaiveDate,
        /// One of CANCELLED, SKIPPED, NO_SHOW
        status: String,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Weekly compliance report for a venue
    Report {
        #[arg(long)]
        venue: String,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },

    /// List instances for a venue in one ISO week (e.g. 2025-W03)
    Week { venue: String, week_key: String },

    /// Update one instance's status by id
    Instance {
        instance_id: String,
        /// New status (UNKNOWN, CONFIRMED, CANCELLED, SKIPPED, NO_SHOW)
        #[arg(long)]
        status: String,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        admin_notes: Option<String>,
    },
}

#[derive(Subcommand)]
enum EntityCommands {
    /// Add or update an entity
    Add {
        id: String,
        name: String,
        /// Schedule-site domain, e.g. https://poker.example.com
        #[arg(long)]
        domain: String,
        /// URL path up to and including the id parameter, e.g. /tournament.php?id=
        #[arg(long)]
        path: String,
        /// Venue used when alias matching finds nothing
        #[arg(long)]
        default_venue: Option<String>,
    },
    /// List configured entities
    List,
}

#[derive(Subcommand)]
enum VenueCommands {
    /// Add or update a venue
    Add {
        id: String,
        entity_id: String,
        name: String,
        /// Alternate names the schedule site uses (repeatable)
        #[arg(long = "alias")]
        aliases: Vec<String>,
        /// Standard per-entry fee in cents
        #[arg(long)]
        fee: Option<i64>,
    },
    /// List venues for an entity
    List { entity_id: String },
}

#[derive(Subcommand)]
enum RecurringCommands {
    /// Add or update a recurring-game template
    Add {
        id: String,
        entity_id: String,
        venue_id: String,
        name: String,
        /// Day of week (MONDAY..SUNDAY)
        #[arg(long)]
        day: String,
        /// WEEKLY, FORTNIGHTLY, MONTHLY, QUARTERLY, or YEARLY
        #[arg(long, default_value = "WEEKLY")]
        frequency: String,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// List active templates for a venue
    List { venue_id: String },
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(None)?;
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }

    match cli.command {
        Commands::Init => commands::init::cmd_init(&settings).await,
        Commands::Entity { command } => match command {
            EntityCommands::Add {
                id,
                name,
                domain,
                path,
                default_venue,
            } => commands::catalog::cmd_entity_add(&settings, id, name, domain, path, default_venue),
            EntityCommands::List => commands::catalog::cmd_entity_list(&settings),
        },
        Commands::Venue { command } => match command {
            VenueCommands::Add {
                id,
                entity_id,
                name,
                aliases,
                fee,
            } => commands::catalog::cmd_venue_add(&settings, id, entity_id, name, aliases, fee),
            VenueCommands::List { entity_id } => {
                commands::catalog::cmd_venue_list(&settings, &entity_id)
            }
        },
        Commands::Recurring { command } => match command {
            RecurringCommands::Add {
                id,
                entity_id,
                venue_id,
                name,
                day,
                frequency,
                start,
                end,
            } => commands::catalog::cmd_recurring_add(
                &settings, id, entity_id, venue_id, name, &day, &frequency, start, end,
            ),
            RecurringCommands::List { venue_id } => {
                commands::catalog::cmd_recurring_list(&settings, &venue_id)
            }
        },
        Commands::Scrape {
            entity_id,
            target,
            force,
            override_do_not_scrape,
        } => {
            commands::ingest::cmd_scrape(&settings, &entity_id, &target, force, override_do_not_scrape)
                .await
        }
        Commands::ScrapeRange {
            entity_id,
            start_id,
            end_id,
            force,
        } => commands::ingest::cmd_scrape_range(&settings, &entity_id, start_id, end_id, force).await,
        Commands::Reparse {
            entity_id,
            blob_key,
        } => commands::ingest::cmd_reparse(&settings, &entity_id, &blob_key).await,
        Commands::Url { url, attempts } => commands::inspect::cmd_url(&settings, &url, attempts),
        Commands::Jobs { limit } => commands::inspect::cmd_jobs(&settings, limit),
        Commands::Fingerprints { limit } => commands::inspect::cmd_fingerprints(&settings, limit),
        Commands::Gaps {
            venue,
            from,
            to,
            create,
        } => commands::schedule::cmd_gaps(&settings, &venue, from, to, create),
        Commands::Reconcile {
            venue,
            from,
            to,
            apply,
        } => commands::schedule::cmd_reconcile(&settings, &venue, from, to, apply),
        Commands::Missed {
            recurring_id,
            date,
            status,
            reason,
            notes,
        } => commands::schedule::cmd_missed(
            &settings,
            &recurring_id,
            date,
            &status,
            reason.as_deref(),
            notes.as_deref(),
        ),
        Commands::Report { venue, from, to } => {
            commands::schedule::cmd_report(&settings, &venue, from, to)
        }
        Commands::Week { venue, week_key } => {
            commands::schedule::cmd_week(&settings, &venue, &week_key)
        }
        Commands::Instance {
            instance_id,
            status,
            reason,
            notes,
            admin_notes,
        } => commands::schedule::cmd_instance(
            &settings,
            &instance_id,
            &status,
            reason.as_deref(),
            notes.as_deref(),
            admin_notes.as_deref(),
        ),
    }
}
