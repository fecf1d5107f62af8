//! Data models for railbird.

mod attempt;
mod entity;
mod fingerprint;
mod game;
mod recurring;
mod scrape_url;
mod stored_page;

pub use attempt::{AttemptSource, AttemptStatus, JobStatus, ScrapeAttempt, ScraperJob};
pub use entity::{extract_tournament_id, Entity, Venue};
pub use fingerprint::{fingerprint_id, StructureFingerprint};
pub use game::{
    BettingStructure, BlindLevel, BountyType, BreakInfo, EntryStructure, Game, GameEconomics,
    GameStatus, PayoutResult, RegistrationStatus, ScheduleType, SeatingEntry, SpeedType,
    StackDepth, TableInfo, TournamentPurpose, TournamentType, Variant,
};
pub use recurring::{
    parse_weekday, week_key, weekday_to_str, Frequency, InstanceStatus, RecurringGame,
    RecurringGameInstance,
};
pub use scrape_url::{InteractionType, ScrapeUrl, ScrapeUrlStatus};
pub use stored_page::{compute_content_hash, PageVersion, StoredPage};
