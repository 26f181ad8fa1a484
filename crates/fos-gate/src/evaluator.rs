//! The pure gate computation.
//!
//! [`evaluate_tasks`] is a total function from a loaded task slice to a
//! [`GateResult`]. It performs no I/O, holds no state, and preserves input
//! order, so output determinism reduces to loader determinism.

use fos_core::VisitId;

use crate::result::{BlockerKind, CriticalTally, EvidenceTally, GateBlocker, GateResult, GateSummary};
use crate::source::GateTask;

/// Evaluate the closeout gate over a loaded task slice.
///
/// Each task is checked against two independent rules, critical first.
/// A task can emit zero, one, or two blockers. Tallies count qualifying
/// tasks, not blockers, so the two views stay independent.
pub fn evaluate_tasks(visit_id: &VisitId, tasks: &[GateTask]) -> GateResult {
    let mut blockers = Vec::new();
    let mut critical_tasks = CriticalTally {
        total: 0,
        incomplete: 0,
    };
    let mut evidence_required = EvidenceTally {
        total: 0,
        missing: 0,
    };

    for task in tasks {
        if task.is_critical {
            critical_tasks.total += 1;
            if !task.status.is_done() {
                critical_tasks.incomplete += 1;
            }
        }
        if task.requires_evidence {
            evidence_required.total += 1;
            if !task.has_evidence {
                evidence_required.missing += 1;
            }
        }
        blockers.extend(critical_blocker(task));
        blockers.extend(evidence_blocker(task));
    }

    GateResult {
        can_closeout: blockers.is_empty(),
        blockers,
        summary: GateSummary {
            visit_id: *visit_id.as_uuid(),
            critical_tasks,
            evidence_required,
        },
    }
}

/// The critical-completion rule, in isolation.
fn critical_blocker(task: &GateTask) -> Option<GateBlocker> {
    if task.is_critical && !task.status.is_done() {
        Some(GateBlocker {
            kind: BlockerKind::CriticalTaskIncomplete,
            task_id: *task.task_id.as_uuid(),
            message: format!("Critical task \"{}\" is not done", task.title),
        })
    } else {
        None
    }
}

/// The evidence-presence rule, in isolation.
fn evidence_blocker(task: &GateTask) -> Option<GateBlocker> {
    if task.requires_evidence && !task.has_evidence {
        Some(GateBlocker {
            kind: BlockerKind::EvidenceRequiredMissing,
            task_id: *task.task_id.as_uuid(),
            message: format!("Task \"{}\" requires evidence and has none", task.title),
        })
    } else {
        None
    }
}
