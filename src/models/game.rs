//! Parsed tournament records and classification taxonomy.
//!
//! All monetary fields are integer cents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a tournament as published by the schedule site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Blank,
    NotPublished,
    NotInUse,
    Scheduled,
    Registering,
    Running,
    Finished,
    Cancelled,
    Unknown,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blank => "BLANK",
            Self::NotPublished => "NOT_PUBLISHED",
            Self::NotInUse => "NOT_IN_USE",
            Self::Scheduled => "SCHEDULED",
            Self::Registering => "REGISTERING",
            Self::Running => "RUNNING",
            Self::Finished => "FINISHED",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BLANK" => Some(Self::Blank),
            "NOT_PUBLISHED" => Some(Self::NotPublished),
            "NOT_IN_USE" => Some(Self::NotInUse),
            "SCHEDULED" => Some(Self::Scheduled),
            "REGISTERING" => Some(Self::Registering),
            "RUNNING" => Some(Self::Running),
            "FINISHED" => Some(Self::Finished),
            "CANCELLED" => Some(Self::Cancelled),
            "UNKNOWN" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Statuses that mean the URL should not be scraped again.
    pub fn is_dead_page(&self) -> bool {
        matches!(self, Self::Blank | Self::NotPublished | Self::NotInUse)
    }

    /// Map free text from the page to a status.
    pub fn from_site_text(text: &str) -> Self {
        let t = text.trim().to_lowercase();
        match t.as_str() {
            "" => Self::Blank,
            s if s.contains("regist") => Self::Registering,
            s if s.contains("running") || s.contains("in progress") || s.contains("live") => {
                Self::Running
            }
            s if s.contains("finish") || s.contains("complete") || s.contains("ended") => {
                Self::Finished
            }
            s if s.contains("cancel") => Self::Cancelled,
            s if s.contains("schedul") || s.contains("upcoming") => Self::Scheduled,
            _ => Self::Unknown,
        }
    }
}

/// Registration window state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Open,
    Closed,
    Unknown,
}

impl RegistrationStatus {
    pub fn from_site_text(text: &str) -> Self {
        let t = text.trim().to_lowercase();
        if t.contains("open") {
            Self::Open
        } else if t.contains("closed") || t.contains("ended") {
            Self::Closed
        } else {
            Self::Unknown
        }
    }
}

/// Poker variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Variant {
    HoldEm,
    OmahaHi,
    OmahaHiLo,
    Stud,
    Razz,
    MixedGame,
    Other,
}

/// Betting structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BettingStructure {
    NoLimit,
    PotLimit,
    FixedLimit,
    MixedLimit,
    Other,
}

/// Bounty format, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BountyType {
    Mystery,
    Progressive,
    SuperKnockout,
    TotalKnockout,
    Standard,
    None,
}

/// Blind-level pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpeedType {
    SuperTurbo,
    Hyper,
    Turbo,
    Slow,
    Regular,
}

/// Relative starting-stack depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StackDepth {
    Super,
    Mega,
    Deep,
    Shallow,
    Standard,
}

/// Re-entry / rebuy structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStructure {
    UnlimitedReEntry,
    ReEntry,
    RebuyAddon,
    UnlimitedRebuy,
    SingleRebuy,
    AddOnOnly,
    Freezeout,
}

/// Why the tournament exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentPurpose {
    MegaSatellite,
    SuperSatellite,
    StepSatellite,
    Satellite,
    Qualifier,
    Freeroll,
    Charity,
    LeaguePoints,
    Standard,
}

/// Where the game sits in the venue's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleType {
    Daily,
    Weekly,
    Monthly,
    Special,
    OneOff,
}

/// Legacy coarse tournament type.
///
/// Restricted to four values; bounty and speed qualities never map here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentType {
    Freezeout,
    Rebuy,
    Satellite,
    Deepstack,
}

/// A blind level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlindLevel {
    pub level: i64,
    pub small_blind: i64,
    pub big_blind: i64,
    pub ante: i64,
    pub duration_minutes: i64,
}

/// A scheduled break in the structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakInfo {
    pub after_level: i64,
    pub duration_minutes: i64,
}

/// A paid finishing place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutResult {
    pub place: i64,
    pub player: String,
    pub amount: Option<i64>,
}

/// A player's seat assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatingEntry {
    pub player: String,
    pub table: Option<i64>,
    pub seat: Option<i64>,
    pub stack: Option<i64>,
}

/// A live table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub table: i64,
    pub players: i64,
}

/// Derived per-game economics (all cents).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameEconomics {
    pub entries_for_rake: i64,
    pub total_entries: i64,
    pub rake_revenue: i64,
    pub total_buy_ins_collected: i64,
    pub prizepool_player_contributions: i64,
    pub overlay_cost: i64,
    pub prizepool_surplus: Option<i64>,
    pub game_profit: i64,
}

/// A parsed tournament occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    // Identifiers
    pub tournament_id: Option<String>,
    pub entity_id: String,
    pub venue_id: Option<String>,
    pub recurring_game_id: Option<String>,
    pub source_url: String,

    // Descriptive
    pub name: Option<String>,
    pub game_tags: Vec<String>,

    // Times (UTC; the site publishes venue-civil times)
    pub game_start: Option<DateTime<Utc>>,
    pub game_end: Option<DateTime<Utc>>,
    pub total_duration_minutes: Option<i64>,

    // Status
    pub game_status: GameStatus,
    pub registration_status: RegistrationStatus,

    // Economics inputs (cents)
    pub buy_in: Option<i64>,
    pub rake: Option<i64>,
    pub starting_stack: Option<i64>,
    pub total_initial_entries: Option<i64>,
    pub total_rebuys: Option<i64>,
    pub total_addons: Option<i64>,
    pub unique_players: Option<i64>,
    pub players_remaining: Option<i64>,
    pub guarantee_amount: Option<i64>,
    pub has_guarantee: bool,
    pub guarantee_was_inferred: bool,
    pub prizepool_paid: Option<i64>,
    pub jackpot_per_entry: Option<i64>,
    /// Planned promotional value added to the prizepool; never inferred
    /// from overlay.
    pub prizepool_added_value: Option<i64>,

    // Derived economics
    pub economics: Option<GameEconomics>,

    // Classification
    pub variant_code: Option<String>,
    pub variant: Variant,
    pub betting_structure: BettingStructure,
    pub bounty_type: BountyType,
    pub speed_type: SpeedType,
    pub stack_depth: StackDepth,
    pub entry_structure: EntryStructure,
    pub tournament_purpose: TournamentPurpose,
    pub schedule_type: ScheduleType,
    pub tournament_type: TournamentType,

    // Nested structures
    pub levels: Vec<BlindLevel>,
    pub breaks: Vec<BreakInfo>,
    pub results: Vec<PayoutResult>,
    pub seating: Vec<SeatingEntry>,
    pub tables: Vec<TableInfo>,
}

impl Game {
    /// Create an empty record for a URL before parsing.
    pub fn empty(entity_id: &str, source_url: &str, tournament_id: Option<String>) -> Self {
        Self {
            tournament_id,
            entity_id: entity_id.to_string(),
            venue_id: None,
            recurring_game_id: None,
            source_url: source_url.to_string(),
            name: None,
            game_tags: Vec::new(),
            game_start: None,
            game_end: None,
            total_duration_minutes: None,
            game_status: GameStatus::Unknown,
            registration_status: RegistrationStatus::Unknown,
            buy_in: None,
            rake: None,
            starting_stack: None,
            total_initial_entries: None,
            total_rebuys: None,
            total_addons: None,
            unique_players: None,
            players_remaining: None,
            guarantee_amount: None,
            has_guarantee: false,
            guarantee_was_inferred: false,
            prizepool_paid: None,
            jackpot_per_entry: None,
            prizepool_added_value: None,
            economics: None,
            variant_code: None,
            variant: Variant::Other,
            betting_structure: BettingStructure::Other,
            bounty_type: BountyType::None,
            speed_type: SpeedType::Regular,
            stack_depth: StackDepth::Standard,
            entry_structure: EntryStructure::Freezeout,
            tournament_purpose: TournamentPurpose::Standard,
            schedule_type: ScheduleType::OneOff,
            tournament_type: TournamentType::Freezeout,
            levels: Vec::new(),
            breaks: Vec::new(),
            results: Vec::new(),
            seating: Vec::new(),
            tables: Vec::new(),
        }
    }

    /// Stable hash of the parsed data, used for change detection.
    pub fn data_hash(&self) -> String {
        let serialized = serde_json::to_string(self).unwrap_or_default();
        super::compute_content_hash(serialized.as_bytes())
    }
}
