//! # fos-gate: Visit Closeout Gate
//!
//! Decides whether a visit may be closed out, and itemizes every reason it
//! may not. This crate provides:
//!
//! - [`evaluate_closeout_gate`]: The scoped entry point. Resolves the visit
//!   through the caller's visit filter, loads the qualifying tasks of its
//!   work order, and evaluates them.
//!
//! - [`evaluate_tasks`]: The pure core. A total, stateless function from a
//!   loaded task slice to a [`GateResult`].
//!
//! - [`GateSource`]: The narrow read seam between the evaluator and
//!   whatever holds the records.
//!
//! ## Evaluation model
//!
//! A task qualifies for gating when it is critical or requires evidence.
//! Two independent rules apply per task: a critical task must be `DONE`,
//! and an evidence-requiring task must have at least one evidence record.
//! One task can violate both. The gate re-reads fresh state on every call
//! and never writes, so concurrent evidence inserts can only move a task
//! from missing to present, never back.

pub mod evaluator;
pub mod result;
pub mod source;

pub use evaluator::evaluate_tasks;
pub use result::{BlockerKind, CriticalTally, EvidenceTally, GateBlocker, GateResult, GateSummary};
pub use source::{GateSource, GateTask};

use fos_access::ResourceKind;
use fos_core::{Principal, VisitId};
use thiserror::Error;

/// Failures a gate evaluation can produce.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    /// The visit is absent, or present but outside the caller's scope.
    /// Deliberately uniform: callers cannot distinguish the two cases.
    #[error("visit not found")]
    VisitNotFound,
}

/// Evaluate the closeout gate for a visit, as seen by `principal`.
///
/// Resolution goes through the principal's visit scope, so a technician
/// asking about someone else's visit gets [`GateError::VisitNotFound`],
/// exactly as if the visit did not exist. On success the result is a pure
/// function of the qualifying tasks: calling again with no intervening
/// state change returns an identical [`GateResult`].
pub fn evaluate_closeout_gate<S>(
    principal: &Principal,
    visit_id: &VisitId,
    source: &S,
) -> Result<GateResult, GateError>
where
    S: GateSource + ?Sized,
{
    let filter = fos_access::scope_filter(principal, ResourceKind::Visit);
    let work_order_id = source
        .visit_work_order(&filter, visit_id)
        .ok_or(GateError::VisitNotFound)?;
    let tasks = source.gate_tasks(filter.org_id(), &work_order_id);
    Ok(evaluate_tasks(visit_id, &tasks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fos_access::{AccessReach, ScopeFilter};
    use fos_core::{OrgId, Role, TaskId, TaskStatus, UserId, WorkOrderId};

    struct FixtureVisit {
        id: VisitId,
        org_id: OrgId,
        work_order_id: WorkOrderId,
        assigned_tech_id: Option<UserId>,
    }

    /// In-memory stand-in for the directory, interpreting the visit filter
    /// the same way the production data layer does.
    struct Fixture {
        visits: Vec<FixtureVisit>,
        tasks: Vec<(WorkOrderId, GateTask)>,
    }

    impl Fixture {
        fn empty() -> Self {
            Self {
                visits: Vec::new(),
                tasks: Vec::new(),
            }
        }
    }

    impl GateSource for Fixture {
        fn visit_work_order(
            &self,
            filter: &ScopeFilter,
            visit_id: &VisitId,
        ) -> Option<WorkOrderId> {
            self.visits
                .iter()
                .find(|v| {
                    &v.id == visit_id
                        && &v.org_id == filter.org_id()
                        && match filter.reach() {
                            AccessReach::Tenant => true,
                            AccessReach::Technician(u) => v.assigned_tech_id.as_ref() == Some(u),
                        }
                })
                .map(|v| v.work_order_id.clone())
        }

        fn gate_tasks(&self, _org_id: &OrgId, work_order_id: &WorkOrderId) -> Vec<GateTask> {
            let mut out: Vec<GateTask> = self
                .tasks
                .iter()
                .filter(|(wo, _)| wo == work_order_id)
                .map(|(_, t)| t.clone())
                .collect();
            out.sort_by_key(|t| *t.task_id.as_uuid());
            out
        }
    }

    fn gate_task(
        title: &str,
        status: TaskStatus,
        is_critical: bool,
        requires_evidence: bool,
        has_evidence: bool,
    ) -> GateTask {
        GateTask {
            task_id: TaskId::new(),
            title: title.to_string(),
            status,
            is_critical,
            requires_evidence,
            has_evidence,
        }
    }

    /// One org, one work order, one visit, plus a dispatcher who can see it.
    fn single_visit_fixture(tasks: Vec<GateTask>) -> (Fixture, Principal, VisitId) {
        let org = OrgId::new();
        let work_order = WorkOrderId::new();
        let visit = VisitId::new();
        let fixture = Fixture {
            visits: vec![FixtureVisit {
                id: visit.clone(),
                org_id: org.clone(),
                work_order_id: work_order.clone(),
                assigned_tech_id: Some(UserId::new()),
            }],
            tasks: tasks.into_iter().map(|t| (work_order.clone(), t)).collect(),
        };
        let dispatcher = Principal::new(org, UserId::new(), Role::Dispatcher);
        (fixture, dispatcher, visit)
    }

    // -- Gate scenarios -----------------------------------------------------

    #[test]
    fn incomplete_critical_task_yields_single_blocker() {
        let (fixture, caller, visit) = single_visit_fixture(vec![gate_task(
            "Replace compressor",
            TaskStatus::Todo,
            true,
            false,
            false,
        )]);
        let result = evaluate_closeout_gate(&caller, &visit, &fixture).unwrap();
        assert!(!result.can_closeout);
        assert_eq!(result.blockers.len(), 1);
        assert_eq!(result.blockers[0].kind, BlockerKind::CriticalTaskIncomplete);
        assert_eq!(result.summary.critical_tasks.total, 1);
        assert_eq!(result.summary.critical_tasks.incomplete, 1);
        assert_eq!(result.summary.evidence_required.total, 0);
        assert_eq!(result.summary.evidence_required.missing, 0);
    }

    #[test]
    fn completed_critical_task_clears_the_gate() {
        let (fixture, caller, visit) = single_visit_fixture(vec![gate_task(
            "Replace compressor",
            TaskStatus::Done,
            true,
            false,
            false,
        )]);
        let result = evaluate_closeout_gate(&caller, &visit, &fixture).unwrap();
        assert!(result.can_closeout);
        assert!(result.blockers.is_empty());
    }

    #[test]
    fn missing_evidence_blocks_until_one_record_exists() {
        let (fixture, caller, visit) = single_visit_fixture(vec![gate_task(
            "Pressure test",
            TaskStatus::Done,
            false,
            true,
            false,
        )]);
        let blocked = evaluate_closeout_gate(&caller, &visit, &fixture).unwrap();
        assert!(!blocked.can_closeout);
        assert_eq!(blocked.blockers.len(), 1);
        assert_eq!(
            blocked.blockers[0].kind,
            BlockerKind::EvidenceRequiredMissing
        );

        let (fixture, caller, visit) = single_visit_fixture(vec![gate_task(
            "Pressure test",
            TaskStatus::Done,
            false,
            true,
            true,
        )]);
        let cleared = evaluate_closeout_gate(&caller, &visit, &fixture).unwrap();
        assert!(cleared.can_closeout);
        assert!(cleared.blockers.is_empty());
    }

    #[test]
    fn doubly_violating_task_emits_exactly_two_blockers() {
        let (fixture, caller, visit) = single_visit_fixture(vec![gate_task(
            "Install meter",
            TaskStatus::Todo,
            true,
            true,
            false,
        )]);
        let result = evaluate_closeout_gate(&caller, &visit, &fixture).unwrap();
        assert_eq!(result.blockers.len(), 2);
        assert_eq!(result.blockers[0].kind, BlockerKind::CriticalTaskIncomplete);
        assert_eq!(result.blockers[1].kind, BlockerKind::EvidenceRequiredMissing);
        assert_eq!(result.blockers[0].task_id, result.blockers[1].task_id);
    }

    #[test]
    fn tech_cannot_gate_a_colleagues_visit() {
        let org = OrgId::new();
        let assigned = UserId::new();
        let other = UserId::new();
        let work_order = WorkOrderId::new();
        let visit = VisitId::new();
        let fixture = Fixture {
            visits: vec![FixtureVisit {
                id: visit.clone(),
                org_id: org.clone(),
                work_order_id: work_order,
                assigned_tech_id: Some(assigned.clone()),
            }],
            tasks: Vec::new(),
        };

        let colleague = Principal::new(org.clone(), other, Role::Tech);
        let err = evaluate_closeout_gate(&colleague, &visit, &fixture).unwrap_err();
        assert_eq!(err, GateError::VisitNotFound);

        // Indistinguishable from asking about a visit that does not exist.
        let absent = evaluate_closeout_gate(&colleague, &VisitId::new(), &fixture).unwrap_err();
        assert_eq!(err, absent);

        // The assigned technician sees it.
        let owner = Principal::new(org, assigned, Role::Tech);
        assert!(evaluate_closeout_gate(&owner, &visit, &fixture).is_ok());
    }

    #[test]
    fn gate_never_crosses_organizations() {
        let (fixture, _, visit) = single_visit_fixture(vec![]);
        let outsider = Principal::new(OrgId::new(), UserId::new(), Role::Admin);
        let err = evaluate_closeout_gate(&outsider, &visit, &fixture).unwrap_err();
        assert_eq!(err, GateError::VisitNotFound);
    }

    #[test]
    fn absent_visit_is_not_found_even_for_admin() {
        let fixture = Fixture::empty();
        let admin = Principal::new(OrgId::new(), UserId::new(), Role::Admin);
        let err = evaluate_closeout_gate(&admin, &VisitId::new(), &fixture).unwrap_err();
        assert_eq!(err, GateError::VisitNotFound);
    }

    #[test]
    fn repeated_evaluation_is_byte_identical() {
        let (fixture, caller, visit) = single_visit_fixture(vec![
            gate_task("a", TaskStatus::Todo, true, true, false),
            gate_task("b", TaskStatus::Done, true, false, false),
            gate_task("c", TaskStatus::InProgress, false, true, true),
        ]);
        let first = evaluate_closeout_gate(&caller, &visit, &fixture).unwrap();
        let second = evaluate_closeout_gate(&caller, &visit, &fixture).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn blockers_follow_loader_order_not_insertion_order() {
        let org = OrgId::new();
        let work_order = WorkOrderId::new();
        let visit = VisitId::new();
        // Insert tasks in scrambled order; the loader sorts by task id.
        let mut tasks: Vec<GateTask> = (0..5)
            .map(|i| gate_task(&format!("t{i}"), TaskStatus::Todo, true, false, false))
            .collect();
        tasks.reverse();
        let fixture = Fixture {
            visits: vec![FixtureVisit {
                id: visit.clone(),
                org_id: org.clone(),
                work_order_id: work_order.clone(),
                assigned_tech_id: None,
            }],
            tasks: tasks.into_iter().map(|t| (work_order.clone(), t)).collect(),
        };
        let caller = Principal::new(org, UserId::new(), Role::Dispatcher);
        let result = evaluate_closeout_gate(&caller, &visit, &fixture).unwrap();
        let ids: Vec<_> = result.blockers.iter().map(|b| b.task_id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert_eq!(ids.len(), 5);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use fos_core::{TaskId, TaskStatus};
    use proptest::prelude::*;
    use uuid::Uuid;

    fn any_status() -> impl Strategy<Value = TaskStatus> {
        prop_oneof![
            Just(TaskStatus::Todo),
            Just(TaskStatus::InProgress),
            Just(TaskStatus::Done),
            Just(TaskStatus::Blocked),
            Just(TaskStatus::Skipped),
        ]
    }

    fn any_gate_task() -> impl Strategy<Value = GateTask> {
        (
            any::<u128>(),
            "[a-zA-Z0-9 ]{1,24}",
            any_status(),
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(id, title, status, crit, req, has)| GateTask {
                task_id: TaskId::from_uuid(Uuid::from_u128(id)),
                title,
                status,
                is_critical: crit,
                requires_evidence: req,
                has_evidence: has,
            })
    }

    fn any_task_list() -> impl Strategy<Value = Vec<GateTask>> {
        proptest::collection::vec(any_gate_task(), 0..12)
    }

    proptest! {
        /// A clean pass is exactly an empty blocker list.
        #[test]
        fn can_closeout_iff_no_blockers(tasks in any_task_list()) {
            let result = evaluate_tasks(&fos_core::VisitId::new(), &tasks);
            prop_assert_eq!(result.can_closeout, result.blockers.is_empty());
        }

        /// Evaluation over unchanged input is deterministic to the byte.
        #[test]
        fn evaluation_is_idempotent(tasks in any_task_list()) {
            let visit = fos_core::VisitId::new();
            let a = evaluate_tasks(&visit, &tasks);
            let b = evaluate_tasks(&visit, &tasks);
            prop_assert_eq!(serde_json::to_vec(&a).unwrap(), serde_json::to_vec(&b).unwrap());
        }

        /// Attaching evidence to one task removes at most that task's
        /// evidence blocker and never introduces a new blocker.
        #[test]
        fn evidence_is_monotonic(tasks in any_task_list(), seed in any::<prop::sample::Index>()) {
            prop_assume!(!tasks.is_empty());
            let visit = fos_core::VisitId::new();
            let index = seed.index(tasks.len());

            let before = evaluate_tasks(&visit, &tasks);

            let mut after_tasks = tasks.clone();
            after_tasks[index].has_evidence = true;
            let after = evaluate_tasks(&visit, &after_tasks);

            let flipped = *tasks[index].task_id.as_uuid();
            let expected: Vec<_> = before
                .blockers
                .iter()
                .filter(|b| {
                    !(b.task_id == flipped && b.kind == BlockerKind::EvidenceRequiredMissing)
                })
                .cloned()
                .collect();
            prop_assert_eq!(after.blockers, expected);

            // Tallies move the same direction: missing never grows.
            prop_assert!(after.summary.evidence_required.missing
                <= before.summary.evidence_required.missing);
            prop_assert_eq!(
                after.summary.evidence_required.total,
                before.summary.evidence_required.total
            );
        }

        /// Critical and evidence tallies count qualifying tasks exactly.
        #[test]
        fn tallies_match_direct_counts(tasks in any_task_list()) {
            let result = evaluate_tasks(&fos_core::VisitId::new(), &tasks);
            let critical = tasks.iter().filter(|t| t.is_critical).count();
            let incomplete = tasks
                .iter()
                .filter(|t| t.is_critical && !t.status.is_done())
                .count();
            let required = tasks.iter().filter(|t| t.requires_evidence).count();
            let missing = tasks
                .iter()
                .filter(|t| t.requires_evidence && !t.has_evidence)
                .count();
            prop_assert_eq!(result.summary.critical_tasks.total, critical);
            prop_assert_eq!(result.summary.critical_tasks.incomplete, incomplete);
            prop_assert_eq!(result.summary.evidence_required.total, required);
            prop_assert_eq!(result.summary.evidence_required.missing, missing);
        }
    }
}
