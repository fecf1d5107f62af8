//! Compliance engine tests over a temp SQLite database.

use chrono::{NaiveDate, TimeZone, Utc, Weekday};
use tempfile::tempdir;

use railbird::models::{Frequency, Game, InstanceStatus, RecurringGame};
use railbird::repository::Repository;
use railbird::schedule::{ComplianceEngine, ReconcileAction};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn template() -> RecurringGame {
    RecurringGame {
        id: "R1".into(),
        entity_id: "E1".into(),
        venue_id: "V1".into(),
        display_name: "Tuesday Deepstack".into(),
        day_of_week: Weekday::Tue,
        frequency: Frequency::Weekly,
        start_date: Some(d(2025, 1, 1)),
        end_date: None,
        is_active: true,
        is_paused: false,
    }
}

/// A game observed on 2025-01-14 (19:30 venue time is 08:30 UTC under
/// summer time).
fn game_on_jan_14(tournament_id: &str, recurring: Option<&str>) -> Game {
    let url = format!("https://poker.example.com/tournament.php?id={tournament_id}");
    let mut game = Game::empty("E1", &url, Some(tournament_id.to_string()));
    game.venue_id = Some("V1".into());
    game.recurring_game_id = recurring.map(|r| r.to_string());
    game.game_start = Some(Utc.with_ymd_and_hms(2025, 1, 14, 8, 30, 0).unwrap());
    game.name = Some("Tuesday Deepstack".into());
    game
}

fn setup() -> (ComplianceEngine, Repository, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let repo = Repository::open(&dir.path().join("t.db")).unwrap();
    repo.upsert_recurring_game(&template()).unwrap();
    (ComplianceEngine::new(repo.clone()), repo, dir)
}

#[test]
fn test_gap_detection_counts_and_matches() {
    let (engine, repo, _dir) = setup();
    repo.upsert_game(&game_on_jan_14("101", Some("R1"))).unwrap();

    let report = engine
        .detect_gaps("V1", d(2025, 1, 1), d(2025, 1, 31), false)
        .unwrap();

    assert_eq!(report.expected, 4);
    assert_eq!(report.confirmed, 0);
    assert_eq!(report.gaps.len(), 4);
    assert_eq!(report.created, 0);

    let jan14 = report
        .gaps
        .iter()
        .find(|g| g.expected_date == d(2025, 1, 14))
        .unwrap();
    assert_eq!(jan14.matched_game_id.as_deref(), Some("E1:101"));
    assert_eq!(jan14.match_confidence, 90);

    let jan7 = report
        .gaps
        .iter()
        .find(|g| g.expected_date == d(2025, 1, 7))
        .unwrap();
    assert!(jan7.matched_game_id.is_none());
    assert_eq!(jan7.match_confidence, 0);

    // Read-only run wrote nothing
    assert!(repo
        .instances_in_range("V1", d(2025, 1, 1), d(2025, 1, 31))
        .unwrap()
        .is_empty());
}

#[test]
fn test_gap_creation_is_idempotent() {
    let (engine, repo, _dir) = setup();
    repo.upsert_game(&game_on_jan_14("101", Some("R1"))).unwrap();

    let first = engine
        .detect_gaps("V1", d(2025, 1, 1), d(2025, 1, 31), true)
        .unwrap();
    assert_eq!(first.created, 4);

    let confirmed = repo.get_instance("R1", d(2025, 1, 14)).unwrap().unwrap();
    assert_eq!(confirmed.status, InstanceStatus::Confirmed);
    assert_eq!(confirmed.game_id.as_deref(), Some("E1:101"));
    assert!(!confirmed.needs_review);

    let unknown = repo.get_instance("R1", d(2025, 1, 7)).unwrap().unwrap();
    assert_eq!(unknown.status, InstanceStatus::Unknown);
    assert!(unknown.needs_review);
    assert_eq!(
        unknown.review_reason.as_deref(),
        Some("Auto-created gap instance")
    );

    // Re-running finds nothing to do
    let second = engine
        .detect_gaps("V1", d(2025, 1, 1), d(2025, 1, 31), true)
        .unwrap();
    assert_eq!(second.expected, 4);
    assert_eq!(second.gaps.len(), 0);
    assert_eq!(second.created, 0);
    assert_eq!(second.confirmed, 1);
    assert_eq!(
        repo.instances_in_range("V1", d(2025, 1, 1), d(2025, 1, 31))
            .unwrap()
            .len(),
        4
    );
}

#[test]
fn test_reconcile_creates_then_settles() {
    let (engine, repo, _dir) = setup();
    repo.upsert_game(&game_on_jan_14("101", Some("R1"))).unwrap();

    let report = engine
        .reconcile("V1", d(2025, 1, 1), d(2025, 1, 31), false)
        .unwrap();

    let kinds: Vec<&str> = report.actions.iter().map(|a| a.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            "CREATE_CONFIRMED",
            "CREATE_UNKNOWN",
            "CREATE_UNKNOWN",
            "CREATE_UNKNOWN"
        ]
    );
    assert_eq!(report.created_confirmed, 1);
    assert_eq!(report.created_unknown, 3);

    match &report.actions[0] {
        ReconcileAction::CreateConfirmed { date, game_id, .. } => {
            assert_eq!(*date, d(2025, 1, 14));
            assert_eq!(game_id, "E1:101");
        }
        other => panic!("expected CreateConfirmed, got {other:?}"),
    }

    // A second run over the same window is all NO_CHANGE
    let second = engine
        .reconcile("V1", d(2025, 1, 1), d(2025, 1, 31), false)
        .unwrap();
    assert_eq!(second.actions.len(), 4);
    assert!(second
        .actions
        .iter()
        .all(|a| matches!(a, ReconcileAction::NoChange { .. })));
    assert_eq!(second.created_confirmed, 0);
    assert_eq!(second.created_unknown, 0);
}

#[test]
fn test_reconcile_preview_writes_nothing() {
    let (engine, repo, _dir) = setup();
    repo.upsert_game(&game_on_jan_14("101", Some("R1"))).unwrap();

    let report = engine
        .reconcile("V1", d(2025, 1, 1), d(2025, 1, 31), true)
        .unwrap();

    assert!(report.preview);
    assert_eq!(report.actions.len(), 4);
    assert_eq!(report.created_confirmed, 0);
    assert_eq!(report.created_unknown, 0);
    assert!(repo
        .instances_in_range("V1", d(2025, 1, 1), d(2025, 1, 31))
        .unwrap()
        .is_empty());
}

#[test]
fn test_reconcile_links_existing_unlinked_instance() {
    let (engine, repo, _dir) = setup();
    repo.upsert_game(&game_on_jan_14("101", Some("R1"))).unwrap();

    let instance = railbird::models::RecurringGameInstance::new(
        &template(),
        d(2025, 1, 14),
        InstanceStatus::Unknown,
    );
    repo.create_instance_if_absent(&instance).unwrap();

    let report = engine
        .reconcile("V1", d(2025, 1, 14), d(2025, 1, 14), false)
        .unwrap();
    assert_eq!(report.linked, 1);

    let linked = repo.get_instance("R1", d(2025, 1, 14)).unwrap().unwrap();
    assert_eq!(linked.status, InstanceStatus::Confirmed);
    assert_eq!(linked.game_id.as_deref(), Some("E1:101"));
    assert!(!linked.needs_review);
}

#[test]
fn test_reconcile_reports_orphan_games() {
    let (engine, repo, _dir) = setup();
    // Observed game with no recurring link
    repo.upsert_game(&game_on_jan_14("102", None)).unwrap();

    let report = engine
        .reconcile("V1", d(2025, 1, 14), d(2025, 1, 14), true)
        .unwrap();

    assert_eq!(report.orphans, 1);
    assert!(report
        .actions
        .iter()
        .any(|a| matches!(a, ReconcileAction::Orphan { game_id } if game_id == "E1:102")));
}

#[test]
fn test_record_missed_is_idempotent_and_clears_review() {
    let (engine, repo, _dir) = setup();
    engine
        .detect_gaps("V1", d(2025, 1, 1), d(2025, 1, 31), true)
        .unwrap();

    engine
        .record_missed(
            "R1",
            d(2025, 1, 7),
            InstanceStatus::Cancelled,
            Some("venue closed"),
            None,
        )
        .unwrap();

    let instance = repo.get_instance("R1", d(2025, 1, 7)).unwrap().unwrap();
    assert_eq!(instance.status, InstanceStatus::Cancelled);
    assert_eq!(instance.cancellation_reason.as_deref(), Some("venue closed"));
    assert!(!instance.needs_review);

    // Replaying updates in place instead of duplicating
    engine
        .record_missed(
            "R1",
            d(2025, 1, 7),
            InstanceStatus::Skipped,
            Some("holiday"),
            Some("confirmed by floor"),
        )
        .unwrap();
    let updated = repo.get_instance("R1", d(2025, 1, 7)).unwrap().unwrap();
    assert_eq!(updated.id, instance.id);
    assert_eq!(updated.status, InstanceStatus::Skipped);
    assert_eq!(updated.cancellation_reason.as_deref(), Some("holiday"));
    assert_eq!(updated.notes.as_deref(), Some("confirmed by floor"));
}

#[test]
fn test_record_missed_creates_instance_when_absent() {
    let (engine, repo, _dir) = setup();

    let created = engine
        .record_missed("R1", d(2025, 1, 21), InstanceStatus::NoShow, None, None)
        .unwrap();
    assert!(created);

    let instance = repo.get_instance("R1", d(2025, 1, 21)).unwrap().unwrap();
    assert_eq!(instance.status, InstanceStatus::NoShow);
}

#[test]
fn test_record_missed_rejects_non_missed_status() {
    let (engine, _repo, _dir) = setup();
    let err = engine
        .record_missed("R1", d(2025, 1, 7), InstanceStatus::Confirmed, None, None)
        .unwrap_err();
    assert!(err.to_string().contains("CANCELLED"));
}

#[test]
fn test_update_instance_status_override() {
    let (engine, repo, _dir) = setup();
    engine
        .detect_gaps("V1", d(2025, 1, 1), d(2025, 1, 31), true)
        .unwrap();
    let instance = repo.get_instance("R1", d(2025, 1, 28)).unwrap().unwrap();

    let updated = engine
        .update_instance_status(
            &instance.id,
            InstanceStatus::Cancelled,
            Some("flood"),
            None,
            Some("per venue manager"),
        )
        .unwrap();

    assert_eq!(updated.status, InstanceStatus::Cancelled);
    assert_eq!(updated.admin_notes.as_deref(), Some("per venue manager"));
    let stored = repo.get_instance_by_id(&instance.id).unwrap().unwrap();
    assert_eq!(stored.status, InstanceStatus::Cancelled);
    assert!(!stored.needs_review);
}

#[test]
fn test_compliance_report_rates_and_weeks() {
    let (engine, repo, _dir) = setup();
    repo.upsert_game(&game_on_jan_14("101", Some("R1"))).unwrap();
    engine
        .detect_gaps("V1", d(2025, 1, 1), d(2025, 1, 31), true)
        .unwrap();
    engine
        .record_missed(
            "R1",
            d(2025, 1, 7),
            InstanceStatus::Cancelled,
            Some("venue closed"),
            None,
        )
        .unwrap();

    let report = engine
        .compliance_report("V1", d(2025, 1, 1), d(2025, 1, 31))
        .unwrap();

    assert_eq!(report.expected, 4);
    assert_eq!(report.observed, 4);
    assert_eq!(report.confirmed, 1);
    assert!((report.overall_compliance_rate - 0.25).abs() < 1e-9);

    assert_eq!(report.per_week.len(), 4);
    let w02 = report.per_week.iter().find(|w| w.week_key == "2025-W02").unwrap();
    assert_eq!(w02.expected, 1);
    assert_eq!(w02.cancelled, 1);
    assert_eq!(w02.compliance_rate, 0.0);

    let w03 = report.per_week.iter().find(|w| w.week_key == "2025-W03").unwrap();
    assert_eq!(w03.confirmed, 1);
    assert_eq!(w03.compliance_rate, 1.0);
}

#[test]
fn test_week_instances_lookup() {
    let (engine, repo, _dir) = setup();
    repo.upsert_game(&game_on_jan_14("101", Some("R1"))).unwrap();
    engine
        .detect_gaps("V1", d(2025, 1, 1), d(2025, 1, 31), true)
        .unwrap();

    let week = engine.week_instances("V1", "2025-W03").unwrap();
    assert_eq!(week.len(), 1);
    assert_eq!(week[0].expected_date, d(2025, 1, 14));
    assert_eq!(week[0].status, InstanceStatus::Confirmed);
}
