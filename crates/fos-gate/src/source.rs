//! The read seam between the evaluator and whatever holds the records.

use fos_access::ScopeFilter;
use fos_core::{OrgId, TaskId, TaskStatus, VisitId, WorkOrderId};

/// One qualifying task, as loaded for gating.
///
/// `has_evidence` is an existence flag. The loader answers "is there at
/// least one evidence record" with a bounded check; evidence content never
/// reaches the evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateTask {
    /// The task's identifier.
    pub task_id: TaskId,
    /// Title, used verbatim in blocker messages.
    pub title: String,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Whether the task must be `DONE` before closeout.
    pub is_critical: bool,
    /// Whether the task must carry evidence before closeout.
    pub requires_evidence: bool,
    /// Whether at least one evidence record exists.
    pub has_evidence: bool,
}

/// What the evaluator needs to read, and nothing more.
///
/// Implementations answer two synchronous questions against already-held
/// data. The directory in the API crate is the production implementation;
/// tests supply fixtures.
pub trait GateSource {
    /// Resolve a visit through `filter` and return its work order.
    ///
    /// `None` covers both a visit that does not exist and one outside the
    /// filter. Callers cannot tell the difference, which is the point.
    fn visit_work_order(&self, filter: &ScopeFilter, visit_id: &VisitId) -> Option<WorkOrderId>;

    /// Load the work order's tasks where `is_critical` or
    /// `requires_evidence`, sorted by task id, each with its evidence
    /// existence flag.
    fn gate_tasks(&self, org_id: &OrgId, work_order_id: &WorkOrderId) -> Vec<GateTask>;
}
