//! Recurring-schedule compliance: expected-date generation, gap detection,
//! reconciliation against parsed games, and reporting.

pub mod compliance;
pub mod expected;

pub use compliance::{
    ComplianceEngine, ComplianceReport, Gap, GapReport, ReconcileAction, ReconcileReport,
    WeekCompliance,
};
pub use expected::expected_dates;
