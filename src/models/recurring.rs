//! Recurring-game templates and their scheduled instances.
//!
//! Expected dates are civil (venue-local) dates, not UTC, since they are
//! compared against a day-of-week.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};

/// How often a recurring game runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Weekly,
    Fortnightly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "WEEKLY",
            Self::Fortnightly => "FORTNIGHTLY",
            Self::Monthly => "MONTHLY",
            Self::Quarterly => "QUARTERLY",
            Self::Yearly => "YEARLY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WEEKLY" => Some(Self::Weekly),
            "FORTNIGHTLY" => Some(Self::Fortnightly),
            "MONTHLY" => Some(Self::Monthly),
            "QUARTERLY" => Some(Self::Quarterly),
            "YEARLY" => Some(Self::Yearly),
            _ => None,
        }
    }
}

/// Serialize a weekday the way the database stores it.
pub fn weekday_to_str(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MONDAY",
        Weekday::Tue => "TUESDAY",
        Weekday::Wed => "WEDNESDAY",
        Weekday::Thu => "THURSDAY",
        Weekday::Fri => "FRIDAY",
        Weekday::Sat => "SATURDAY",
        Weekday::Sun => "SUNDAY",
    }
}

/// Parse a stored weekday string.
pub fn parse_weekday(s: &str) -> Option<Weekday> {
    match s {
        "MONDAY" => Some(Weekday::Mon),
        "TUESDAY" => Some(Weekday::Tue),
        "WEDNESDAY" => Some(Weekday::Wed),
        "THURSDAY" => Some(Weekday::Thu),
        "FRIDAY" => Some(Weekday::Fri),
        "SATURDAY" => Some(Weekday::Sat),
        "SUNDAY" => Some(Weekday::Sun),
        _ => None,
    }
}

/// The `YYYY-Www` grouping key for a civil date.
pub fn week_key(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

/// A schedule template, e.g. "Tuesday 7pm NLHE at V1".
#[derive(Debug, Clone)]
pub struct RecurringGame {
    pub id: String,
    pub entity_id: String,
    pub venue_id: String,
    pub display_name: String,
    pub day_of_week: Weekday,
    pub frequency: Frequency,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub is_paused: bool,
}

/// Lifecycle state of one scheduled occurrence.
///
/// `UNKNOWN -> {CONFIRMED, CANCELLED, SKIPPED, NO_SHOW}`; CONFIRMED may be
/// manually overridden to CANCELLED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    Unknown,
    Confirmed,
    Cancelled,
    Skipped,
    NoShow,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
            Self::Skipped => "SKIPPED",
            Self::NoShow => "NO_SHOW",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UNKNOWN" => Some(Self::Unknown),
            "CONFIRMED" => Some(Self::Confirmed),
            "CANCELLED" => Some(Self::Cancelled),
            "SKIPPED" => Some(Self::Skipped),
            "NO_SHOW" => Some(Self::NoShow),
            _ => None,
        }
    }
}

/// One scheduled occurrence of a recurring template on a specific date.
///
/// `(recurring_game_id, expected_date)` is unique; a CONFIRMED instance
/// always carries the id of the game that realized it.
#[derive(Debug, Clone)]
pub struct RecurringGameInstance {
    pub id: String,
    pub recurring_game_id: String,
    pub game_id: Option<String>,
    pub expected_date: NaiveDate,
    pub day_of_week: Weekday,
    pub week_key: String,
    pub venue_id: String,
    pub entity_id: String,
    pub status: InstanceStatus,
    pub needs_review: bool,
    pub review_reason: Option<String>,
    pub cancellation_reason: Option<String>,
    pub notes: Option<String>,
    pub admin_notes: Option<String>,
    pub has_deviation: bool,
    pub deviation_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringGameInstance {
    /// Create an instance for a template on an expected civil date.
    pub fn new(template: &RecurringGame, expected_date: NaiveDate, status: InstanceStatus) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            recurring_game_id: template.id.clone(),
            game_id: None,
            expected_date,
            day_of_week: expected_date.weekday(),
            week_key: week_key(expected_date),
            venue_id: template.venue_id.clone(),
            entity_id: template.entity_id.clone(),
            status,
            needs_review: false,
            review_reason: None,
            cancellation_reason: None,
            notes: None,
            admin_notes: None,
            has_deviation: false,
            deviation_type: None,
            created_at: now,
            updated_at: now,
        }
    }
}
