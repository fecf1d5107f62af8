//! Classification taxonomy.
//!
//! Every dimension is derived from the normalized name + tags text with an
//! ordered first-match-wins cascade, so classification is a pure function
//! of its inputs.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{
    BettingStructure, BountyType, EntryStructure, Game, ScheduleType, SpeedType, StackDepth,
    TournamentPurpose, TournamentType, Variant,
};

fn re(pattern: &'static str, slot: &'static OnceLock<Regex>) -> &'static Regex {
    slot.get_or_init(|| Regex::new(pattern).expect("classification pattern"))
}

macro_rules! cascade {
    ($text:expr, $( $pattern:literal => $value:expr ),+ ; $default:expr) => {{
        $(
            {
                static SLOT: OnceLock<Regex> = OnceLock::new();
                if re($pattern, &SLOT).is_match($text) {
                    return $value;
                }
            }
        )+
        $default
    }};
}

/// Variant and betting structure from the short code.
pub fn variant_from_code(code: &str) -> (Variant, BettingStructure) {
    match code.to_uppercase().as_str() {
        "NLHE" | "NLH" | "NL" => (Variant::HoldEm, BettingStructure::NoLimit),
        "PLH" => (Variant::HoldEm, BettingStructure::PotLimit),
        "LHE" | "FLH" => (Variant::HoldEm, BettingStructure::FixedLimit),
        "PLO" | "PLO4" | "PLO5" | "PLO6" => (Variant::OmahaHi, BettingStructure::PotLimit),
        "PLO8" | "O8" | "PLOHILO" => (Variant::OmahaHiLo, BettingStructure::PotLimit),
        "STUD" => (Variant::Stud, BettingStructure::FixedLimit),
        "RAZZ" => (Variant::Razz, BettingStructure::FixedLimit),
        "HORSE" | "HOSE" | "MIX" | "MIXED" | "8GAME" => {
            (Variant::MixedGame, BettingStructure::MixedLimit)
        }
        _ => (Variant::Other, BettingStructure::Other),
    }
}

fn bounty_type(text: &str) -> BountyType {
    cascade!(text,
        r"mystery" => BountyType::Mystery,
        r"progressive|\bpko\b" => BountyType::Progressive,
        r"super\s*knockout" => BountyType::SuperKnockout,
        r"total\s*knockout|\btko\b" => BountyType::TotalKnockout,
        r"knockout|bounty|\bko\b" => BountyType::Standard
        ; BountyType::None
    )
}

fn speed_type(text: &str) -> SpeedType {
    cascade!(text,
        r"super\s*turbo" => SpeedType::SuperTurbo,
        r"hyper" => SpeedType::Hyper,
        r"turbo" => SpeedType::Turbo,
        r"slow|marathon" => SpeedType::Slow
        ; SpeedType::Regular
    )
}

fn stack_depth(text: &str) -> StackDepth {
    cascade!(text,
        r"super\s*stack" => StackDepth::Super,
        r"mega\s*stack" => StackDepth::Mega,
        r"deep\s*stack|\bdeep\b" => StackDepth::Deep,
        r"shallow|short\s*stack" => StackDepth::Shallow
        ; StackDepth::Standard
    )
}

fn entry_structure(text: &str) -> EntryStructure {
    cascade!(text,
        r"unlimited\s*re-?entry" => EntryStructure::UnlimitedReEntry,
        r"re-?entry" => EntryStructure::ReEntry,
        r"rebuy.{0,20}add-?on|add-?on.{0,20}rebuy" => EntryStructure::RebuyAddon,
        r"unlimited\s*rebuy" => EntryStructure::UnlimitedRebuy,
        r"(?:single|1|one)\s*rebuy" => EntryStructure::SingleRebuy,
        r"add-?on\s*only" => EntryStructure::AddOnOnly,
        r"rebuy" => EntryStructure::UnlimitedRebuy
        ; EntryStructure::Freezeout
    )
}

fn tournament_purpose(text: &str) -> TournamentPurpose {
    cascade!(text,
        r"mega\s*sat" => TournamentPurpose::MegaSatellite,
        r"super\s*sat" => TournamentPurpose::SuperSatellite,
        r"step\s*sat" => TournamentPurpose::StepSatellite,
        r"satellite|\bsat\b" => TournamentPurpose::Satellite,
        r"qualifier" => TournamentPurpose::Qualifier,
        r"freeroll" => TournamentPurpose::Freeroll,
        r"charity" => TournamentPurpose::Charity,
        r"league" => TournamentPurpose::LeaguePoints
        ; TournamentPurpose::Standard
    )
}

fn schedule_type(text: &str) -> ScheduleType {
    cascade!(text,
        r"daily" => ScheduleType::Daily,
        r"weekly|monday|tuesday|wednesday|thursday|friday|saturday|sunday" => ScheduleType::Weekly,
        r"monthly" => ScheduleType::Monthly,
        r"series|championship|main\s*event|special" => ScheduleType::Special
        ; ScheduleType::OneOff
    )
}

/// Legacy coarse type. Satellite wins over rebuy wins over deepstack;
/// bounty and speed qualities never map here.
fn tournament_type(text: &str) -> TournamentType {
    cascade!(text,
        r"satellite|\bsat\b" => TournamentType::Satellite,
        r"rebuy" => TournamentType::Rebuy,
        r"deep\s*stack|\bdeep\b" => TournamentType::Deepstack
        ; TournamentType::Freezeout
    )
}

/// Derive every classification dimension on the record.
pub fn classify(game: &mut Game, extra_text: Option<&str>) {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(name) = &game.name {
        parts.push(name);
    }
    for tag in &game.game_tags {
        parts.push(tag);
    }
    if let Some(extra) = extra_text {
        parts.push(extra);
    }
    let text = parts.join(" ").to_lowercase();

    if let Some(code) = &game.variant_code {
        let (variant, betting) = variant_from_code(code);
        game.variant = variant;
        game.betting_structure = betting;
    }
    game.bounty_type = bounty_type(&text);
    game.speed_type = speed_type(&text);
    game.stack_depth = stack_depth(&text);
    game.entry_structure = entry_structure(&text);
    game.tournament_purpose = tournament_purpose(&text);
    game.schedule_type = schedule_type(&text);
    game.tournament_type = tournament_type(&text);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classified(name: &str, tags: &[&str]) -> Game {
        let mut game = Game::empty("E1", "https://host/t.php?id=1", Some("1".into()));
        game.name = Some(name.to_string());
        game.game_tags = tags.iter().map(|t| t.to_string()).collect();
        classify(&mut game, None);
        game
    }

    #[test]
    fn test_variant_code_mapping() {
        assert_eq!(variant_from_code("NLHE"), (Variant::HoldEm, BettingStructure::NoLimit));
        assert_eq!(variant_from_code("plo"), (Variant::OmahaHi, BettingStructure::PotLimit));
        assert_eq!(variant_from_code("PLO8"), (Variant::OmahaHiLo, BettingStructure::PotLimit));
        assert_eq!(variant_from_code("???"), (Variant::Other, BettingStructure::Other));
    }

    #[test]
    fn test_bounty_cascade_order() {
        let g = classified("Mystery Bounty Special", &[]);
        assert_eq!(g.bounty_type, BountyType::Mystery);

        let g = classified("PKO Knockout", &[]);
        assert_eq!(g.bounty_type, BountyType::Progressive);

        let g = classified("Standard Bounty", &[]);
        assert_eq!(g.bounty_type, BountyType::Standard);

        let g = classified("Tuesday Deepstack", &[]);
        assert_eq!(g.bounty_type, BountyType::None);
    }

    #[test]
    fn test_speed_and_depth() {
        let g = classified("Super Turbo Shootout", &[]);
        assert_eq!(g.speed_type, SpeedType::SuperTurbo);

        let g = classified("Friday Megastack", &["Turbo"]);
        assert_eq!(g.speed_type, SpeedType::Turbo);
        assert_eq!(g.stack_depth, StackDepth::Mega);
    }

    #[test]
    fn test_entry_structures() {
        assert_eq!(classified("Unlimited Re-Entry", &[]).entry_structure, EntryStructure::UnlimitedReEntry);
        assert_eq!(classified("Single Re-Entry", &[]).entry_structure, EntryStructure::ReEntry);
        assert_eq!(classified("Rebuy + Add-on", &[]).entry_structure, EntryStructure::RebuyAddon);
        assert_eq!(classified("Tuesday Freezeout", &[]).entry_structure, EntryStructure::Freezeout);
    }

    #[test]
    fn test_purpose_and_legacy_type() {
        let g = classified("Mega Satellite to Main Event", &[]);
        assert_eq!(g.tournament_purpose, TournamentPurpose::MegaSatellite);
        assert_eq!(g.tournament_type, TournamentType::Satellite);

        // speed quality never leaks into the legacy enum
        let g = classified("Turbo Deepstack", &[]);
        assert_eq!(g.tournament_type, TournamentType::Deepstack);

        let g = classified("Mystery Bounty Turbo", &[]);
        assert_eq!(g.tournament_type, TournamentType::Freezeout);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let a = classified("Tuesday PKO Deepstack", &["NLHE", "Turbo"]);
        let b = classified("Tuesday PKO Deepstack", &["NLHE", "Turbo"]);
        assert_eq!(a.bounty_type, b.bounty_type);
        assert_eq!(a.speed_type, b.speed_type);
        assert_eq!(a.stack_depth, b.stack_depth);
        assert_eq!(a.tournament_type, b.tournament_type);
    }
}
