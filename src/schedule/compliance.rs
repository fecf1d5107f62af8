//! Compliance engine: gap detection, reconciliation, manual overrides, and
//! per-venue reporting over recurring-game instances.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{info, warn};

use super::expected::expected_dates;
use crate::models::{week_key, InstanceStatus, RecurringGame, RecurringGameInstance};
use crate::repository::{Repository, Result, StoreError};

/// One expected date with no instance on record.
#[derive(Debug, Clone)]
pub struct Gap {
    pub recurring_game_id: String,
    pub display_name: String,
    pub expected_date: NaiveDate,
    pub matched_game_id: Option<String>,
    /// 90 when an unlinked game already exists on the date, 0 otherwise.
    pub match_confidence: u8,
}

/// Summary of one gap-detection run.
#[derive(Debug, Default)]
pub struct GapReport {
    pub expected: usize,
    pub confirmed: usize,
    pub gaps: Vec<Gap>,
    pub created: usize,
}

/// What reconcile decided for one (template, date) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// A game exists but no instance did; create a CONFIRMED instance.
    CreateConfirmed {
        recurring_game_id: String,
        date: NaiveDate,
        game_id: String,
    },
    /// An instance exists but is not linked/confirmed; link it.
    LinkGame {
        instance_id: String,
        game_id: String,
    },
    /// Instance already correct.
    NoChange { instance_id: String },
    /// Game in range carries no recurring link.
    Orphan { game_id: String },
    /// Expected date with neither game nor instance; create UNKNOWN.
    CreateUnknown {
        recurring_game_id: String,
        date: NaiveDate,
    },
}

impl ReconcileAction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateConfirmed { .. } => "CREATE_CONFIRMED",
            Self::LinkGame { .. } => "LINK_GAME",
            Self::NoChange { .. } => "NO_CHANGE",
            Self::Orphan { .. } => "ORPHAN",
            Self::CreateUnknown { .. } => "CREATE_UNKNOWN",
        }
    }
}

/// Outcome of a reconcile run.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub actions: Vec<ReconcileAction>,
    pub created_confirmed: usize,
    pub created_unknown: usize,
    pub linked: usize,
    pub unchanged: usize,
    pub orphans: usize,
    pub preview: bool,
}

/// Weekly rollup line of a compliance report.
#[derive(Debug)]
pub struct WeekCompliance {
    pub week_key: String,
    pub expected: usize,
    pub confirmed: usize,
    pub cancelled: usize,
    pub unknown: usize,
    pub compliance_rate: f64,
}

/// Per-venue compliance rollup.
#[derive(Debug)]
pub struct ComplianceReport {
    pub venue_id: String,
    pub expected: usize,
    pub observed: usize,
    pub confirmed: usize,
    pub overall_compliance_rate: f64,
    pub per_week: Vec<WeekCompliance>,
}

pub struct ComplianceEngine {
    repo: Repository,
}

impl ComplianceEngine {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Find expected dates with no instance on record, optionally creating
    /// instances for them.
    pub fn detect_gaps(
        &self,
        venue_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        create_instances: bool,
    ) -> Result<GapReport> {
        let templates = self.repo.active_templates_for_venue(venue_id)?;
        let mut report = GapReport::default();

        for template in &templates {
            for date in expected_dates(template, start, end) {
                report.expected += 1;

                if let Some(instance) = self.repo.get_instance(&template.id, date)? {
                    if instance.status == InstanceStatus::Confirmed {
                        report.confirmed += 1;
                    }
                    continue;
                }

                let matched_game = self
                    .repo
                    .find_game_by_recurring_and_date(&template.id, date)?;
                let matched_game_id = matched_game
                    .and_then(|g| g.tournament_id)
                    .map(|tid| format!("{}:{}", template.entity_id, tid));
                let gap = Gap {
                    recurring_game_id: template.id.clone(),
                    display_name: template.display_name.clone(),
                    expected_date: date,
                    match_confidence: if matched_game_id.is_some() { 90 } else { 0 },
                    matched_game_id,
                };

                if create_instances {
                    report.created += self.create_gap_instance(template, &gap)? as usize;
                    if gap.matched_game_id.is_some() {
                        report.confirmed += 1;
                    }
                }
                report.gaps.push(gap);
            }
        }

        info!(
            venue_id,
            expected = report.expected,
            gaps = report.gaps.len(),
            created = report.created,
            "gap detection finished"
        );
        Ok(report)
    }

    fn create_gap_instance(&self, template: &RecurringGame, gap: &Gap) -> Result<bool> {
        let instance = match &gap.matched_game_id {
            Some(game_id) => {
                let mut i = RecurringGameInstance::new(
                    template,
                    gap.expected_date,
                    InstanceStatus::Confirmed,
                );
                i.game_id = Some(game_id.clone());
                i
            }
            None => {
                let mut i = RecurringGameInstance::new(
                    template,
                    gap.expected_date,
                    InstanceStatus::Unknown,
                );
                i.needs_review = true;
                i.review_reason = Some("Auto-created gap instance".to_string());
                i
            }
        };
        self.repo.create_instance_if_absent(&instance)
    }

    /// Reconcile games in a window against the instance index.
    ///
    /// With `preview` no mutation happens; without it, replaying the same
    /// window after the first run emits only NO_CHANGE actions.
    pub fn reconcile(
        &self,
        venue_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        preview: bool,
    ) -> Result<ReconcileReport> {
        let mut report = ReconcileReport {
            preview,
            ..Default::default()
        };

        // Game-driven pass
        let games = self.repo.games_for_venue_in_range(venue_id, start, end)?;
        let mut covered: Vec<(String, NaiveDate)> = Vec::new();

        for game in &games {
            let Some(tid) = &game.tournament_id else {
                continue;
            };
            let game_ref = format!("{}:{}", game.entity_id, tid);

            let Some(recurring_id) = &game.recurring_game_id else {
                report.orphans += 1;
                report.actions.push(ReconcileAction::Orphan { game_id: game_ref });
                continue;
            };
            let Some(date) = game
                .game_start
                .map(crate::parser::timezone::venue_civil_date)
            else {
                warn!(game = %game_ref, "game has no start time, skipping");
                continue;
            };
            covered.push((recurring_id.clone(), date));

            match self.repo.get_instance(recurring_id, date)? {
                None => {
                    report.actions.push(ReconcileAction::CreateConfirmed {
                        recurring_game_id: recurring_id.clone(),
                        date,
                        game_id: game_ref.clone(),
                    });
                    if !preview {
                        let template = self.template(recurring_id)?;
                        let mut instance =
                            RecurringGameInstance::new(&template, date, InstanceStatus::Confirmed);
                        instance.game_id = Some(game_ref);
                        self.repo.create_instance_if_absent(&instance)?;
                        report.created_confirmed += 1;
                    }
                }
                Some(mut instance)
                    if instance.game_id.as_deref() != Some(game_ref.as_str())
                        || instance.status != InstanceStatus::Confirmed =>
                {
                    report.actions.push(ReconcileAction::LinkGame {
                        instance_id: instance.id.clone(),
                        game_id: game_ref.clone(),
                    });
                    if !preview {
                        instance.game_id = Some(game_ref);
                        instance.status = InstanceStatus::Confirmed;
                        instance.needs_review = false;
                        instance.review_reason = None;
                        self.repo.update_instance(&instance)?;
                        report.linked += 1;
                    }
                }
                Some(instance) => {
                    report.unchanged += 1;
                    report
                        .actions
                        .push(ReconcileAction::NoChange { instance_id: instance.id });
                }
            }
        }

        // Coverage pass: expected dates no game or instance accounted for
        for template in self.repo.active_templates_for_venue(venue_id)? {
            for date in expected_dates(&template, start, end) {
                if covered.iter().any(|(id, d)| id == &template.id && *d == date) {
                    continue;
                }
                if let Some(instance) = self.repo.get_instance(&template.id, date)? {
                    report.unchanged += 1;
                    report
                        .actions
                        .push(ReconcileAction::NoChange { instance_id: instance.id });
                    continue;
                }
                report.actions.push(ReconcileAction::CreateUnknown {
                    recurring_game_id: template.id.clone(),
                    date,
                });
                if !preview {
                    let mut instance =
                        RecurringGameInstance::new(&template, date, InstanceStatus::Unknown);
                    instance.needs_review = true;
                    instance.review_reason = Some("Auto-created gap instance".to_string());
                    self.repo.create_instance_if_absent(&instance)?;
                    report.created_unknown += 1;
                }
            }
        }

        info!(
            venue_id,
            preview,
            created_confirmed = report.created_confirmed,
            created_unknown = report.created_unknown,
            linked = report.linked,
            unchanged = report.unchanged,
            orphans = report.orphans,
            "reconcile finished"
        );
        Ok(report)
    }

    /// Record a missed occurrence. Idempotent upsert keyed by
    /// `(recurringGameId, expectedDate)`; always clears the review flag.
    pub fn record_missed(
        &self,
        recurring_game_id: &str,
        expected_date: NaiveDate,
        status: InstanceStatus,
        reason: Option<&str>,
        notes: Option<&str>,
    ) -> Result<bool> {
        if !matches!(
            status,
            InstanceStatus::Cancelled | InstanceStatus::Skipped | InstanceStatus::NoShow
        ) {
            return Err(StoreError::Invariant(format!(
                "missed-instance status must be CANCELLED, SKIPPED, or NO_SHOW, got {}",
                status.as_str()
            )));
        }

        let mut created = false;
        let mut instance = match self.repo.get_instance(recurring_game_id, expected_date)? {
            Some(existing) => existing,
            None => {
                let template = self.template(recurring_game_id)?;
                let instance =
                    RecurringGameInstance::new(&template, expected_date, InstanceStatus::Unknown);
                created = self.repo.create_instance_if_absent(&instance)?;
                // Re-read in case a concurrent writer beat the create
                self.repo
                    .get_instance(recurring_game_id, expected_date)?
                    .ok_or_else(|| {
                        StoreError::Invariant("instance vanished after create".to_string())
                    })?
            }
        };

        instance.status = status;
        instance.cancellation_reason = reason.map(|r| r.to_string());
        if let Some(n) = notes {
            instance.notes = Some(n.to_string());
        }
        instance.needs_review = false;
        instance.review_reason = None;
        self.repo.update_instance(&instance)?;
        Ok(created)
    }

    /// Manual status override for one instance.
    pub fn update_instance_status(
        &self,
        instance_id: &str,
        status: InstanceStatus,
        reason: Option<&str>,
        notes: Option<&str>,
        admin_notes: Option<&str>,
    ) -> Result<RecurringGameInstance> {
        let mut instance = self
            .repo
            .get_instance_by_id(instance_id)?
            .ok_or_else(|| StoreError::Invariant(format!("no instance {instance_id}")))?;

        instance.status = status;
        if let Some(r) = reason {
            instance.cancellation_reason = Some(r.to_string());
        }
        if let Some(n) = notes {
            instance.notes = Some(n.to_string());
        }
        if let Some(a) = admin_notes {
            instance.admin_notes = Some(a.to_string());
        }
        instance.needs_review = false;
        self.repo.update_instance(&instance)?;
        Ok(instance)
    }

    /// Per-venue compliance rollup grouped by ISO week.
    ///
    /// The denominator is the larger of the expected count and the observed
    /// instance count, so out-of-template instances depress the rate
    /// instead of inflating it.
    pub fn compliance_report(
        &self,
        venue_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ComplianceReport> {
        let templates = self.repo.active_templates_for_venue(venue_id)?;
        let mut expected_by_week: BTreeMap<String, usize> = BTreeMap::new();
        let mut expected_total = 0usize;
        for template in &templates {
            for date in expected_dates(template, start, end) {
                *expected_by_week.entry(week_key(date)).or_default() += 1;
                expected_total += 1;
            }
        }

        let instances = self.repo.instances_in_range(venue_id, start, end)?;
        let mut weeks: BTreeMap<String, (usize, usize, usize, usize)> = BTreeMap::new();
        for (key, expected) in &expected_by_week {
            weeks.insert(key.clone(), (*expected, 0, 0, 0));
        }

        let mut confirmed_total = 0usize;
        for instance in &instances {
            let entry = weeks.entry(instance.week_key.clone()).or_insert((0, 0, 0, 0));
            match instance.status {
                InstanceStatus::Confirmed => {
                    entry.1 += 1;
                    confirmed_total += 1;
                }
                InstanceStatus::Cancelled | InstanceStatus::Skipped | InstanceStatus::NoShow => {
                    entry.2 += 1;
                }
                InstanceStatus::Unknown => entry.3 += 1,
            }
        }

        let per_week = weeks
            .into_iter()
            .map(|(key, (expected, confirmed, cancelled, unknown))| {
                let observed = confirmed + cancelled + unknown;
                let denominator = expected.max(observed);
                WeekCompliance {
                    week_key: key,
                    expected,
                    confirmed,
                    cancelled,
                    unknown,
                    compliance_rate: rate(confirmed, denominator),
                }
            })
            .collect();

        let observed = instances.len();
        Ok(ComplianceReport {
            venue_id: venue_id.to_string(),
            expected: expected_total,
            observed,
            confirmed: confirmed_total,
            overall_compliance_rate: rate(confirmed_total, expected_total.max(observed)),
            per_week,
        })
    }

    /// All instances for a venue in one ISO week.
    pub fn week_instances(
        &self,
        venue_id: &str,
        week: &str,
    ) -> Result<Vec<RecurringGameInstance>> {
        self.repo.instances_for_week(venue_id, week)
    }

    fn template(&self, recurring_game_id: &str) -> Result<RecurringGame> {
        self.repo
            .get_recurring_game(recurring_game_id)?
            .ok_or_else(|| {
                StoreError::Invariant(format!("no recurring template {recurring_game_id}"))
            })
    }
}

fn rate(confirmed: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        1.0
    } else {
        confirmed as f64 / denominator as f64
    }
}
