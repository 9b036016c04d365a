//! Project phase lifecycle.
//!
//! Every project owns five fixed phases. Custom phases are inserted between
//! `contract` (order 3) and `acceptance` (order 100), so their orders live in
//! the half-open range `[4, 100)`. Completing a phase activates the next phase
//! by order; completing the last phase completes the project.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

pub const STATUS_NOT_STARTED: &str = "not_started";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_REJECTED: &str = "rejected";

/// Statuses shared by projects, phases and tasks.
pub const WORK_STATUSES: &[&str] = &[
    STATUS_NOT_STARTED,
    STATUS_IN_PROGRESS,
    STATUS_COMPLETED,
    STATUS_REJECTED,
];

/// Upper bound on the length of a free-text phase status.
pub const MAX_PHASE_STATUS_LEN: usize = 50;

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

pub const PHASE_INITIATION: &str = "initiation";
pub const PHASE_BIDDING: &str = "bidding";
pub const PHASE_CONTRACT: &str = "contract";
pub const PHASE_ACCEPTANCE: &str = "acceptance";
pub const PHASE_CLOSING: &str = "closing";

/// A phase that every project is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPhase {
    pub name: &'static str,
    pub order: i32,
}

impl FixedPhase {
    /// Status the phase starts in when the project is created.
    pub fn initial_status(&self) -> &'static str {
        if self.order == FIXED_PHASES[0].order {
            STATUS_IN_PROGRESS
        } else {
            STATUS_NOT_STARTED
        }
    }
}

pub const FIXED_PHASES: [FixedPhase; 5] = [
    FixedPhase { name: PHASE_INITIATION, order: 1 },
    FixedPhase { name: PHASE_BIDDING, order: 2 },
    FixedPhase { name: PHASE_CONTRACT, order: 3 },
    FixedPhase { name: PHASE_ACCEPTANCE, order: 100 },
    FixedPhase { name: PHASE_CLOSING, order: 101 },
];

/// First order assigned to a custom phase.
pub const CUSTOM_ORDER_START: i32 = 4;

/// Exclusive upper bound for custom phase orders (the `acceptance` phase).
pub const CUSTOM_ORDER_END: i32 = 100;

pub fn is_custom_order(order: i32) -> bool {
    (CUSTOM_ORDER_START..CUSTOM_ORDER_END).contains(&order)
}

/// Compute the order of the next custom phase from the highest existing
/// custom order (`None` when the project has no custom phases yet).
pub fn next_custom_order(max_custom_order: Option<i32>) -> Result<i32, CoreError> {
    let next = max_custom_order.unwrap_or(CUSTOM_ORDER_START - 1) + 1;
    if next >= CUSTOM_ORDER_END {
        return Err(CoreError::Validation(format!(
            "No room for another custom phase: orders {CUSTOM_ORDER_START}..{CUSTOM_ORDER_END} are exhausted"
        )));
    }
    Ok(next)
}

/// A phase cannot be deleted if it is fixed or still referenced by tasks.
pub fn ensure_phase_deletable(is_fixed: bool, referencing_tasks: i64) -> Result<(), CoreError> {
    if is_fixed {
        return Err(CoreError::Validation("Fixed phases cannot be deleted".into()));
    }
    if referencing_tasks > 0 {
        return Err(CoreError::Validation(format!(
            "Phase is referenced by {referencing_tasks} task(s) and cannot be deleted"
        )));
    }
    Ok(())
}

/// Phase statuses are free text at the update endpoint; only blank and
/// oversized values are refused.
pub fn validate_phase_status(status: &str) -> Result<String, CoreError> {
    let trimmed = status.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Phase status must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_PHASE_STATUS_LEN {
        return Err(CoreError::Validation(format!(
            "Phase status must be at most {MAX_PHASE_STATUS_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// The subset of a phase row needed to plan a status change.
#[derive(Debug, Clone)]
pub struct PhaseState {
    pub id: DbId,
    pub name: String,
    pub order: i32,
    pub start_date: Option<Timestamp>,
}

/// Side effect on the rest of the project after a phase status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cascade {
    /// Nothing else changes.
    None,
    /// The successor becomes `in_progress` and the project's current phase.
    ActivateSuccessor { phase_id: DbId, phase_name: String },
    /// There is no successor; the project itself is completed.
    CompleteProject,
}

/// Everything the persistence layer must write for one phase status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTransition {
    pub status: String,
    pub stamp_completed_at: bool,
    pub stamp_start_date: bool,
    pub cascade: Cascade,
}

/// Plan a phase status change.
///
/// `siblings` are all phases of the same project (the target may be among
/// them). The successor of a completed phase is the phase whose order is
/// exactly `order + 1`; when there is none the project is complete.
pub fn plan_phase_transition(
    target: &PhaseState,
    new_status: &str,
    siblings: &[PhaseState],
) -> Result<PhaseTransition, CoreError> {
    let status = validate_phase_status(new_status)?;

    let stamp_completed_at = status == STATUS_COMPLETED;
    let stamp_start_date = status == STATUS_IN_PROGRESS && target.start_date.is_none();

    let cascade = if stamp_completed_at {
        match successor_of(target, siblings) {
            Some(next) => Cascade::ActivateSuccessor {
                phase_id: next.id,
                phase_name: next.name.clone(),
            },
            None => Cascade::CompleteProject,
        }
    } else {
        Cascade::None
    };

    Ok(PhaseTransition {
        status,
        stamp_completed_at,
        stamp_start_date,
        cascade,
    })
}

fn successor_of<'a>(target: &PhaseState, siblings: &'a [PhaseState]) -> Option<&'a PhaseState> {
    let next_order = target.order.checked_add(1)?;
    siblings
        .iter()
        .find(|p| p.id != target.id && p.order == next_order)
}

// ---------------------------------------------------------------------------
// Project type
// ---------------------------------------------------------------------------

/// Budget classification of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Cost,
    Capital,
}

impl ProjectType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectType::Cost => "cost",
            ProjectType::Capital => "capital",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProjectType::Cost => "成本性",
            ProjectType::Capital => "资本性",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts both the stored codes and the display labels.
impl FromStr for ProjectType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cost" | "成本性" => Ok(ProjectType::Cost),
            "capital" | "资本性" => Ok(ProjectType::Capital),
            other => Err(CoreError::Validation(format!(
                "Invalid project type '{other}'. Must be one of: cost (成本性), capital (资本性)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn phase(id: DbId, name: &str, order: i32) -> PhaseState {
        PhaseState {
            id,
            name: name.to_string(),
            order,
            start_date: None,
        }
    }

    fn fixed_plan() -> Vec<PhaseState> {
        FIXED_PHASES
            .iter()
            .enumerate()
            .map(|(i, p)| phase(i as DbId + 1, p.name, p.order))
            .collect()
    }

    #[test]
    fn fixed_phases_have_expected_orders() {
        let orders: Vec<i32> = FIXED_PHASES.iter().map(|p| p.order).collect();
        assert_eq!(orders, vec![1, 2, 3, 100, 101]);
    }

    #[test]
    fn only_initiation_starts_in_progress() {
        for p in FIXED_PHASES {
            let expected = if p.name == PHASE_INITIATION {
                STATUS_IN_PROGRESS
            } else {
                STATUS_NOT_STARTED
            };
            assert_eq!(p.initial_status(), expected, "phase {}", p.name);
        }
    }

    #[test]
    fn first_custom_order_is_four() {
        assert_eq!(next_custom_order(None).unwrap(), 4);
    }

    #[test]
    fn custom_orders_increase_strictly() {
        let mut max = None;
        let mut seen = Vec::new();
        for _ in 0..10 {
            let next = next_custom_order(max).unwrap();
            assert!(is_custom_order(next));
            seen.push(next);
            max = Some(next);
        }
        assert_eq!(seen, (4..14).collect::<Vec<_>>());
    }

    #[test]
    fn custom_range_exhaustion_is_rejected() {
        assert_eq!(next_custom_order(Some(98)).unwrap(), 99);
        assert_matches!(next_custom_order(Some(99)), Err(CoreError::Validation(_)));
    }

    #[test]
    fn fixed_phase_cannot_be_deleted() {
        assert_matches!(ensure_phase_deletable(true, 0), Err(CoreError::Validation(_)));
    }

    #[test]
    fn referenced_phase_cannot_be_deleted() {
        assert_matches!(ensure_phase_deletable(false, 2), Err(CoreError::Validation(_)));
        assert!(ensure_phase_deletable(false, 0).is_ok());
    }

    #[test]
    fn completing_initiation_activates_bidding() {
        let phases = fixed_plan();
        let plan = plan_phase_transition(&phases[0], STATUS_COMPLETED, &phases).unwrap();
        assert!(plan.stamp_completed_at);
        assert_eq!(
            plan.cascade,
            Cascade::ActivateSuccessor {
                phase_id: 2,
                phase_name: PHASE_BIDDING.to_string()
            }
        );
    }

    #[test]
    fn completing_closing_completes_project() {
        let phases = fixed_plan();
        let plan = plan_phase_transition(&phases[4], STATUS_COMPLETED, &phases).unwrap();
        assert_eq!(plan.cascade, Cascade::CompleteProject);
    }

    #[test]
    fn completing_contract_activates_first_custom_phase() {
        let mut phases = fixed_plan();
        phases.push(phase(10, "prototype", 4));
        phases.push(phase(11, "pilot", 5));
        let plan = plan_phase_transition(&phases[2], STATUS_COMPLETED, &phases).unwrap();
        assert_eq!(
            plan.cascade,
            Cascade::ActivateSuccessor {
                phase_id: 10,
                phase_name: "prototype".to_string()
            }
        );
    }

    #[test]
    fn completing_last_custom_phase_completes_project() {
        let mut phases = fixed_plan();
        phases.push(phase(10, "prototype", 4));
        let plan = plan_phase_transition(&phases[5], STATUS_COMPLETED, &phases).unwrap();
        assert_eq!(plan.cascade, Cascade::CompleteProject);
    }

    #[test]
    fn completing_contract_without_custom_phases_completes_project() {
        let phases = fixed_plan();
        let plan = plan_phase_transition(&phases[2], STATUS_COMPLETED, &phases).unwrap();
        assert_eq!(plan.cascade, Cascade::CompleteProject);
    }

    #[test]
    fn gap_in_custom_orders_is_not_skipped() {
        let mut phases = fixed_plan();
        phases.push(phase(11, "prototype", 4));
        phases.push(phase(12, "pilot", 6));
        let plan = plan_phase_transition(&phases[5], STATUS_COMPLETED, &phases).unwrap();
        assert_eq!(plan.cascade, Cascade::CompleteProject);
    }

    #[test]
    fn acceptance_hands_over_to_closing() {
        let phases = fixed_plan();
        let plan = plan_phase_transition(&phases[3], STATUS_COMPLETED, &phases).unwrap();
        assert_eq!(
            plan.cascade,
            Cascade::ActivateSuccessor {
                phase_id: 5,
                phase_name: PHASE_CLOSING.to_string()
            }
        );
    }

    #[test]
    fn in_progress_stamps_start_only_when_absent() {
        let phases = fixed_plan();
        let plan = plan_phase_transition(&phases[1], STATUS_IN_PROGRESS, &phases).unwrap();
        assert!(plan.stamp_start_date);
        assert_eq!(plan.cascade, Cascade::None);

        let mut started = phases[1].clone();
        started.start_date = Some(chrono::Utc::now());
        let plan = plan_phase_transition(&started, STATUS_IN_PROGRESS, &phases).unwrap();
        assert!(!plan.stamp_start_date);
    }

    #[test]
    fn free_text_status_is_accepted_verbatim() {
        let phases = fixed_plan();
        let plan = plan_phase_transition(&phases[1], "on_hold", &phases).unwrap();
        assert_eq!(plan.status, "on_hold");
        assert!(!plan.stamp_completed_at);
        assert_eq!(plan.cascade, Cascade::None);
    }

    #[test]
    fn blank_status_is_rejected() {
        let phases = fixed_plan();
        assert_matches!(
            plan_phase_transition(&phases[1], "   ", &phases),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn project_type_accepts_codes_and_labels() {
        assert_eq!("成本性".parse::<ProjectType>().unwrap(), ProjectType::Cost);
        assert_eq!("capital".parse::<ProjectType>().unwrap(), ProjectType::Capital);
        assert_eq!(ProjectType::Cost.as_str(), "cost");
        assert!("operating".parse::<ProjectType>().is_err());
    }
}
