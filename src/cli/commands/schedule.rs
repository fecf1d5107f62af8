//! Compliance commands: gaps, reconcile, missed, report, week, instance.

use chrono::NaiveDate;
use console::style;

use super::open_repository;
use crate::config::Settings;
use crate::models::{InstanceStatus, RecurringGameInstance};
use crate::schedule::{ComplianceEngine, ReconcileAction};

fn engine(settings: &Settings) -> anyhow::Result<ComplianceEngine> {
    Ok(ComplianceEngine::new(open_repository(settings)?))
}

fn parse_status(s: &str) -> anyhow::Result<InstanceStatus> {
    InstanceStatus::parse(&s.to_uppercase())
        .ok_or_else(|| anyhow::anyhow!("invalid instance status: {s}"))
}

fn print_instance(instance: &RecurringGameInstance) {
    let status = match instance.status {
        InstanceStatus::Confirmed => style(instance.status.as_str()).green(),
        InstanceStatus::Unknown => style(instance.status.as_str()).yellow(),
        _ => style(instance.status.as_str()).red(),
    };
    let review = if instance.needs_review {
        "  needs review"
    } else {
        ""
    };
    println!(
        "  {}  {}  {}  {}{}",
        instance.expected_date,
        style(&instance.id[..8]).cyan(),
        instance.recurring_game_id,
        status,
        review
    );
    if let Some(reason) = &instance.cancellation_reason {
        println!("      reason: {reason}");
    }
}

pub fn cmd_gaps(
    settings: &Settings,
    venue: &str,
    from: NaiveDate,
    to: NaiveDate,
    create: bool,
) -> anyhow::Result<()> {
    let report = engine(settings)?.detect_gaps(venue, from, to, create)?;

    println!(
        "Expected {} occurrences, {} confirmed, {} gaps",
        report.expected,
        style(report.confirmed).green(),
        style(report.gaps.len()).yellow()
    );
    for gap in &report.gaps {
        let matched = match &gap.matched_game_id {
            Some(id) => format!("  game {id} ({}%)", gap.match_confidence),
            None => String::new(),
        };
        println!("  {}  {}{}", gap.expected_date, gap.display_name, matched);
    }
    if create {
        println!("{} Created {} instances", style("✓").green(), report.created);
    } else if !report.gaps.is_empty() {
        println!("(re-run with --create to record these)");
    }
    Ok(())
}

pub fn cmd_reconcile(
    settings: &Settings,
    venue: &str,
    from: NaiveDate,
    to: NaiveDate,
    apply: bool,
) -> anyhow::Result<()> {
    let report = engine(settings)?.reconcile(venue, from, to, !apply)?;

    for action in &report.actions {
        match action {
            ReconcileAction::CreateConfirmed { date, game_id, .. } => {
                println!("  {}  {}  game {}", style("CREATE_CONFIRMED").green(), date, game_id)
            }
            ReconcileAction::CreateUnknown { date, .. } => {
                println!("  {}  {}", style("CREATE_UNKNOWN").yellow(), date)
            }
            ReconcileAction::LinkGame {
                instance_id,
                game_id,
            } => println!(
                "  {}  {}  game {}",
                style("LINK_GAME").green(),
                &instance_id[..8],
                game_id
            ),
            ReconcileAction::Orphan { game_id } => {
                println!("  {}  game {}", style("ORPHAN").red(), game_id)
            }
            ReconcileAction::NoChange { .. } => {}
        }
    }

    println!(
        "{} actions: {} create-confirmed, {} create-unknown, {} linked, {} unchanged, {} orphans",
        report.actions.len(),
        report.created_confirmed,
        report.created_unknown,
        report.linked,
        report.unchanged,
        report.orphans
    );
    if report.preview {
        println!("(preview only; re-run with --apply to write)");
    }
    Ok(())
}

pub fn cmd_missed(
    settings: &Settings,
    recurring_id: &str,
    date: NaiveDate,
    status: &str,
    reason: Option<&str>,
    notes: Option<&str>,
) -> anyhow::Result<()> {
    let status = parse_status(status)?;
    engine(settings)?.record_missed(recurring_id, date, status, reason, notes)?;
    println!(
        "{} Recorded {} for {} on {}",
        style("✓").green(),
        status.as_str(),
        recurring_id,
        date
    );
    Ok(())
}

pub fn cmd_report(
    settings: &Settings,
    venue: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> anyhow::Result<()> {
    let report = engine(settings)?.compliance_report(venue, from, to)?;

    println!(
        "Compliance for {} ({from} to {to}): {:.0}%",
        style(venue).cyan(),
        report.overall_compliance_rate * 100.0
    );
    println!(
        "  expected {}  observed {}  confirmed {}",
        report.expected, report.observed, report.confirmed
    );
    println!();
    for week in &report.per_week {
        println!(
            "  {}  expected {}  confirmed {}  cancelled {}  unknown {}  {:.0}%",
            week.week_key,
            week.expected,
            style(week.confirmed).green(),
            week.cancelled,
            style(week.unknown).yellow(),
            week.compliance_rate * 100.0
        );
    }
    Ok(())
}

pub fn cmd_week(settings: &Settings, venue: &str, week_key: &str) -> anyhow::Result<()> {
    let instances = engine(settings)?.week_instances(venue, week_key)?;
    if instances.is_empty() {
        println!("No instances for {venue} in {week_key}");
        return Ok(());
    }
    println!("{} {}", style(venue).cyan(), week_key);
    for instance in &instances {
        print_instance(instance);
    }
    Ok(())
}

pub fn cmd_instance(
    settings: &Settings,
    instance_id: &str,
    status: &str,
    reason: Option<&str>,
    notes: Option<&str>,
    admin_notes: Option<&str>,
) -> anyhow::Result<()> {
    let status = parse_status(status)?;
    let instance =
        engine(settings)?.update_instance_status(instance_id, status, reason, notes, admin_notes)?;
    println!("{} Updated instance", style("✓").green());
    print_instance(&instance);
    Ok(())
}
