//! # Scope Interpretation
//!
//! The one place where a [`ScopeFilter`] is evaluated against records.
//!
//! Route handlers describe *who is asking* by building a filter through
//! `fos_access::scope_filter`; this module decides *what they can see*.
//! Every read the API serves goes through a `scoped_*` accessor here, so
//! the reachability rules live in exactly one file:
//!
//! - `Tenant` reach: every record in the caller's organization.
//! - `Technician` reach, per resource:
//!   - **Work order**: a task assigned to the technician, a visit assigned
//!     to them, or a work package they lead, anywhere under the order.
//!   - **Customer / Site**: referenced by a work order the technician
//!     can reach.
//!   - **Work package**: led by the technician, or containing a task
//!     assigned to them.
//!   - **Task**: assigned to the technician, or inside a package they lead.
//!   - **Visit**: assigned to the technician. Directly, and only directly;
//!     leading a package or holding a task on the same work order is not
//!     enough to see (or close) a colleague's visit.
//!
//! Out-of-scope and nonexistent records are both reported as absent. The
//! accessors return `None` for either, and handlers turn that into a 404,
//! never a 403, so responses do not reveal whether a probed ID exists in
//! another organization.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use fos_access::{scope_filter, AccessReach, ResourceKind, ScopeFilter};
use fos_core::{OrgId, Principal, TaskId, VisitId, WorkOrderId};
use fos_gate::{GateSource, GateTask};
use uuid::Uuid;

use crate::state::{
    AppState, CustomerRecord, EvidenceRecord, SiteRecord, TaskRecord, UserRecord, VisitRecord,
    WorkOrderRecord, WorkPackageRecord,
};

/// Order a listing by creation time, tie-broken by ID so responses are
/// stable even when records share a timestamp.
fn sorted_by_creation<T>(mut records: Vec<T>, key: impl Fn(&T) -> (DateTime<Utc>, Uuid)) -> Vec<T> {
    records.sort_by_key(|r| key(r));
    records
}

impl AppState {
    // -- Technician reachability ------------------------------------------------

    /// Work orders a technician can reach: any order with a task assigned
    /// to them, a visit assigned to them, or a work package they lead.
    fn technician_work_order_ids(&self, org_id: Uuid, tech_id: Uuid) -> HashSet<Uuid> {
        let mut ids = HashSet::new();
        for task in self
            .tasks
            .filter(|t| t.org_id == org_id && t.assigned_to == Some(tech_id))
        {
            ids.insert(task.work_order_id);
        }
        for visit in self
            .visits
            .filter(|v| v.org_id == org_id && v.assigned_tech_id == Some(tech_id))
        {
            ids.insert(visit.work_order_id);
        }
        for package in self
            .work_packages
            .filter(|p| p.org_id == org_id && p.lead_tech_id == Some(tech_id))
        {
            ids.insert(package.work_order_id);
        }
        ids
    }

    /// Work packages a technician leads.
    fn technician_led_package_ids(&self, org_id: Uuid, tech_id: Uuid) -> HashSet<Uuid> {
        self.work_packages
            .filter(|p| p.org_id == org_id && p.lead_tech_id == Some(tech_id))
            .into_iter()
            .map(|p| p.id)
            .collect()
    }

    // -- Customers ----------------------------------------------------------------

    /// List customers visible to the caller.
    pub fn scoped_customers(&self, principal: &Principal) -> Vec<CustomerRecord> {
        let filter = scope_filter(principal, ResourceKind::Customer);
        let org = *filter.org_id().as_uuid();
        let records = match filter.reach() {
            AccessReach::Tenant => self.customers.filter(|c| c.org_id == org),
            AccessReach::Technician(tech) => {
                let reachable = self.technician_work_order_ids(org, *tech.as_uuid());
                let customer_ids: HashSet<Uuid> = self
                    .work_orders
                    .filter(|wo| wo.org_id == org && reachable.contains(&wo.id))
                    .into_iter()
                    .map(|wo| wo.customer_id)
                    .collect();
                self.customers
                    .filter(|c| c.org_id == org && customer_ids.contains(&c.id))
            }
        };
        sorted_by_creation(records, |c| (c.created_at, c.id))
    }

    /// Fetch one customer if the caller can see it. Absent and out-of-scope
    /// are indistinguishable.
    pub fn scoped_customer(&self, principal: &Principal, id: &Uuid) -> Option<CustomerRecord> {
        let filter = scope_filter(principal, ResourceKind::Customer);
        let customer = self.customers.get(id)?;
        if customer.org_id != *filter.org_id().as_uuid() {
            return None;
        }
        match filter.reach() {
            AccessReach::Tenant => Some(customer),
            AccessReach::Technician(tech) => {
                let org = customer.org_id;
                let reachable = self.technician_work_order_ids(org, *tech.as_uuid());
                self.work_orders
                    .any(|wo| {
                        wo.org_id == org
                            && wo.customer_id == customer.id
                            && reachable.contains(&wo.id)
                    })
                    .then_some(customer)
            }
        }
    }

    // -- Sites ----------------------------------------------------------------------

    /// List sites visible to the caller.
    pub fn scoped_sites(&self, principal: &Principal) -> Vec<SiteRecord> {
        let filter = scope_filter(principal, ResourceKind::Site);
        let org = *filter.org_id().as_uuid();
        let records = match filter.reach() {
            AccessReach::Tenant => self.sites.filter(|s| s.org_id == org),
            AccessReach::Technician(tech) => {
                let reachable = self.technician_work_order_ids(org, *tech.as_uuid());
                let site_ids: HashSet<Uuid> = self
                    .work_orders
                    .filter(|wo| wo.org_id == org && reachable.contains(&wo.id))
                    .into_iter()
                    .map(|wo| wo.site_id)
                    .collect();
                self.sites
                    .filter(|s| s.org_id == org && site_ids.contains(&s.id))
            }
        };
        sorted_by_creation(records, |s| (s.created_at, s.id))
    }

    /// Fetch one site if the caller can see it.
    pub fn scoped_site(&self, principal: &Principal, id: &Uuid) -> Option<SiteRecord> {
        let filter = scope_filter(principal, ResourceKind::Site);
        let site = self.sites.get(id)?;
        if site.org_id != *filter.org_id().as_uuid() {
            return None;
        }
        match filter.reach() {
            AccessReach::Tenant => Some(site),
            AccessReach::Technician(tech) => {
                let org = site.org_id;
                let reachable = self.technician_work_order_ids(org, *tech.as_uuid());
                self.work_orders
                    .any(|wo| wo.org_id == org && wo.site_id == site.id && reachable.contains(&wo.id))
                    .then_some(site)
            }
        }
    }

    // -- Work orders -----------------------------------------------------------------

    /// List work orders visible to the caller.
    pub fn scoped_work_orders(&self, principal: &Principal) -> Vec<WorkOrderRecord> {
        let filter = scope_filter(principal, ResourceKind::WorkOrder);
        let org = *filter.org_id().as_uuid();
        let records = match filter.reach() {
            AccessReach::Tenant => self.work_orders.filter(|wo| wo.org_id == org),
            AccessReach::Technician(tech) => {
                let reachable = self.technician_work_order_ids(org, *tech.as_uuid());
                self.work_orders
                    .filter(|wo| wo.org_id == org && reachable.contains(&wo.id))
            }
        };
        sorted_by_creation(records, |wo| (wo.created_at, wo.id))
    }

    /// Fetch one work order if the caller can see it.
    pub fn scoped_work_order(&self, principal: &Principal, id: &Uuid) -> Option<WorkOrderRecord> {
        let filter = scope_filter(principal, ResourceKind::WorkOrder);
        let order = self.work_orders.get(id)?;
        if order.org_id != *filter.org_id().as_uuid() {
            return None;
        }
        match filter.reach() {
            AccessReach::Tenant => Some(order),
            AccessReach::Technician(tech) => self
                .technician_work_order_ids(order.org_id, *tech.as_uuid())
                .contains(&order.id)
                .then_some(order),
        }
    }

    // -- Work packages ----------------------------------------------------------------

    /// List work packages visible to the caller.
    pub fn scoped_work_packages(&self, principal: &Principal) -> Vec<WorkPackageRecord> {
        let filter = scope_filter(principal, ResourceKind::WorkPackage);
        let org = *filter.org_id().as_uuid();
        let records = match filter.reach() {
            AccessReach::Tenant => self.work_packages.filter(|p| p.org_id == org),
            AccessReach::Technician(tech) => {
                let tech = *tech.as_uuid();
                let assigned_in: HashSet<Uuid> = self
                    .tasks
                    .filter(|t| t.org_id == org && t.assigned_to == Some(tech))
                    .into_iter()
                    .filter_map(|t| t.work_package_id)
                    .collect();
                self.work_packages.filter(|p| {
                    p.org_id == org
                        && (p.lead_tech_id == Some(tech) || assigned_in.contains(&p.id))
                })
            }
        };
        sorted_by_creation(records, |p| (p.created_at, p.id))
    }

    /// Fetch one work package if the caller can see it.
    pub fn scoped_work_package(
        &self,
        principal: &Principal,
        id: &Uuid,
    ) -> Option<WorkPackageRecord> {
        let filter = scope_filter(principal, ResourceKind::WorkPackage);
        let package = self.work_packages.get(id)?;
        if package.org_id != *filter.org_id().as_uuid() {
            return None;
        }
        match filter.reach() {
            AccessReach::Tenant => Some(package),
            AccessReach::Technician(tech) => {
                let tech = *tech.as_uuid();
                let visible = package.lead_tech_id == Some(tech)
                    || self.tasks.any(|t| {
                        t.org_id == package.org_id
                            && t.work_package_id == Some(package.id)
                            && t.assigned_to == Some(tech)
                    });
                visible.then_some(package)
            }
        }
    }

    // -- Tasks ---------------------------------------------------------------------------

    /// List tasks visible to the caller.
    pub fn scoped_tasks(&self, principal: &Principal) -> Vec<TaskRecord> {
        let filter = scope_filter(principal, ResourceKind::Task);
        let org = *filter.org_id().as_uuid();
        let records = match filter.reach() {
            AccessReach::Tenant => self.tasks.filter(|t| t.org_id == org),
            AccessReach::Technician(tech) => {
                let tech = *tech.as_uuid();
                let led = self.technician_led_package_ids(org, tech);
                self.tasks.filter(|t| {
                    t.org_id == org
                        && (t.assigned_to == Some(tech)
                            || t.work_package_id.map_or(false, |p| led.contains(&p)))
                })
            }
        };
        sorted_by_creation(records, |t| (t.created_at, t.id))
    }

    /// Fetch one task if the caller can see it.
    pub fn scoped_task(&self, principal: &Principal, id: &Uuid) -> Option<TaskRecord> {
        let filter = scope_filter(principal, ResourceKind::Task);
        let task = self.tasks.get(id)?;
        if task.org_id != *filter.org_id().as_uuid() {
            return None;
        }
        match filter.reach() {
            AccessReach::Tenant => Some(task),
            AccessReach::Technician(tech) => {
                let tech = *tech.as_uuid();
                let visible = task.assigned_to == Some(tech)
                    || task.work_package_id.map_or(false, |package_id| {
                        self.work_packages
                            .get(&package_id)
                            .map_or(false, |p| p.lead_tech_id == Some(tech))
                    });
                visible.then_some(task)
            }
        }
    }

    /// Evidence attached to a task the caller can see. `None` means the
    /// task itself is not visible; an empty list means it is visible and
    /// has no evidence yet.
    pub fn scoped_task_evidence(
        &self,
        principal: &Principal,
        task_id: &Uuid,
    ) -> Option<Vec<EvidenceRecord>> {
        let task = self.scoped_task(principal, task_id)?;
        let records = self.evidence.filter(|e| e.task_id == task.id);
        Some(sorted_by_creation(records, |e| (e.created_at, e.id)))
    }

    // -- Visits --------------------------------------------------------------------------

    /// List visits visible to the caller.
    pub fn scoped_visits(&self, principal: &Principal) -> Vec<VisitRecord> {
        let filter = scope_filter(principal, ResourceKind::Visit);
        let org = *filter.org_id().as_uuid();
        let records = match filter.reach() {
            AccessReach::Tenant => self.visits.filter(|v| v.org_id == org),
            AccessReach::Technician(tech) => {
                let tech = *tech.as_uuid();
                self.visits
                    .filter(|v| v.org_id == org && v.assigned_tech_id == Some(tech))
            }
        };
        sorted_by_creation(records, |v| (v.created_at, v.id))
    }

    /// Fetch one visit if the caller can see it. Technicians only see
    /// visits assigned to them, however much else they can reach on the
    /// same work order.
    pub fn scoped_visit(&self, principal: &Principal, id: &Uuid) -> Option<VisitRecord> {
        let filter = scope_filter(principal, ResourceKind::Visit);
        let visit = self.visits.get(id)?;
        self.visit_in_filter(&filter, &visit).then_some(visit)
    }

    fn visit_in_filter(&self, filter: &ScopeFilter, visit: &VisitRecord) -> bool {
        if visit.org_id != *filter.org_id().as_uuid() {
            return false;
        }
        match filter.reach() {
            AccessReach::Tenant => true,
            AccessReach::Technician(tech) => visit.assigned_tech_id == Some(*tech.as_uuid()),
        }
    }

    // -- Users ----------------------------------------------------------------------------

    /// List the caller's organization members. Role floors for this listing
    /// are enforced at the route layer; scope here is the organization cut.
    pub fn org_users(&self, principal: &Principal) -> Vec<UserRecord> {
        let org = *principal.org_id.as_uuid();
        let records = self.users.filter(|u| u.org_id == org);
        sorted_by_creation(records, |u| (u.created_at, u.id))
    }

    /// Fetch one organization member.
    pub fn org_user(&self, principal: &Principal, id: &Uuid) -> Option<UserRecord> {
        let user = self.users.get(id)?;
        (user.org_id == *principal.org_id.as_uuid()).then_some(user)
    }
}

// -- Gate data source ---------------------------------------------------------------------

impl GateSource for AppState {
    /// Resolve a visit through the caller's filter. `None` for a missing
    /// visit and for a visible-to-someone-else visit alike.
    fn visit_work_order(&self, filter: &ScopeFilter, visit_id: &VisitId) -> Option<WorkOrderId> {
        let visit = self.visits.get(visit_id.as_uuid())?;
        self.visit_in_filter(filter, &visit)
            .then(|| WorkOrderId::from_uuid(visit.work_order_id))
    }

    /// Qualifying tasks of a work order, ordered by task ID.
    fn gate_tasks(&self, org_id: &OrgId, work_order_id: &WorkOrderId) -> Vec<GateTask> {
        let org = *org_id.as_uuid();
        let order = *work_order_id.as_uuid();
        let mut rows: Vec<GateTask> = self
            .tasks
            .filter(|t| {
                t.org_id == org
                    && t.work_order_id == order
                    && (t.is_critical || t.requires_evidence)
            })
            .into_iter()
            .map(|t| GateTask {
                task_id: TaskId::from_uuid(t.id),
                title: t.title,
                status: t.status,
                is_critical: t.is_critical,
                requires_evidence: t.requires_evidence,
                has_evidence: self.evidence.any(|e| e.task_id == t.id),
            })
            .collect();
        rows.sort_by_key(|t| *t.task_id.as_uuid());
        rows
    }
}
