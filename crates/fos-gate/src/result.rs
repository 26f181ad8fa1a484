//! Gate result shapes.
//!
//! These are the caller-facing output of a closeout evaluation. Field names
//! here are the wire contract; identifiers are plain UUIDs at this layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// The rule a blocker was emitted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BlockerKind {
    /// A critical task has not reached `DONE`.
    CriticalTaskIncomplete,
    /// A task requires evidence and has none attached.
    EvidenceRequiredMissing,
}

impl BlockerKind {
    /// Return the canonical wire representation of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CriticalTaskIncomplete => "critical_task_incomplete",
            Self::EvidenceRequiredMissing => "evidence_required_missing",
        }
    }
}

/// One itemized reason a visit cannot be closed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GateBlocker {
    /// Which rule failed.
    pub kind: BlockerKind,
    /// The task the rule failed on.
    pub task_id: Uuid,
    /// Human-readable description naming the task title.
    pub message: String,
}

/// Tally of critical tasks on the visit's work order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CriticalTally {
    /// Tasks flagged critical.
    pub total: usize,
    /// Of those, tasks not yet `DONE`.
    pub incomplete: usize,
}

/// Tally of evidence-requiring tasks on the visit's work order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EvidenceTally {
    /// Tasks flagged as requiring evidence.
    pub total: usize,
    /// Of those, tasks with no evidence attached.
    pub missing: usize,
}

/// Aggregate view accompanying the blocker list.
///
/// Tallies are computed from the qualifying task set directly, not derived
/// from the blocker list. A task that is both critical-incomplete and
/// evidence-missing counts once in each tally while emitting two blockers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GateSummary {
    /// The visit that was evaluated.
    pub visit_id: Uuid,
    /// Critical-task tally.
    pub critical_tasks: CriticalTally,
    /// Evidence-requirement tally.
    pub evidence_required: EvidenceTally,
}

/// Outcome of a closeout gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GateResult {
    /// True exactly when `blockers` is empty.
    pub can_closeout: bool,
    /// Every unmet requirement, in task order, critical before evidence
    /// within a task.
    pub blockers: Vec<GateBlocker>,
    /// Independent tallies over the qualifying tasks.
    pub summary: GateSummary,
}
