//! Scope filter values.
//!
//! A [`ScopeFilter`] describes visibility without executing it. The data
//! layer owns the interpretation; see the reachability table on
//! [`AccessReach`].

use fos_core::{OrgId, UserId};

/// The resource kinds access resolution is defined over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Customer accounts.
    Customer,
    /// Service locations belonging to customers.
    Site,
    /// Top-level jobs.
    WorkOrder,
    /// Task groupings within a work order, optionally led by a technician.
    WorkPackage,
    /// Individual work items.
    Task,
    /// Scheduled technician appearances.
    Visit,
}

impl ResourceKind {
    /// All resource kinds, in a fixed order. Useful for exhaustive checks.
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Customer,
        ResourceKind::Site,
        ResourceKind::WorkOrder,
        ResourceKind::WorkPackage,
        ResourceKind::Task,
        ResourceKind::Visit,
    ];
}

/// How far a principal's visibility reaches within its organization.
///
/// `Tenant` is the whole organization. `Technician(u)` restricts each kind
/// to records reachable through `u`'s assignments:
///
/// | kind        | reachable when                                              |
/// |-------------|-------------------------------------------------------------|
/// | WorkOrder   | a task or visit on it is assigned to `u`, or `u` leads one of its work packages |
/// | Customer    | some visible work order references the customer              |
/// | Site        | some visible work order references the site                  |
/// | WorkPackage | `u` leads it, or a task inside it is assigned to `u`         |
/// | Task        | assigned to `u`, or `u` leads its work package               |
/// | Visit       | assigned to `u` directly. No indirect route exists           |
///
/// The visit row is the narrowest: seeing sibling tasks on a work order
/// grants no visibility into visits someone else is driving to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessReach {
    /// Everything inside the organization.
    Tenant,
    /// Only records reachable through the named technician's assignments.
    Technician(UserId),
}

/// A resolved visibility scope for one principal and one resource kind.
///
/// Opaque by design. Holders can read the parts back but cannot evaluate
/// membership; that belongs to the data layer, in one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeFilter {
    org_id: OrgId,
    kind: ResourceKind,
    reach: AccessReach,
}

impl ScopeFilter {
    /// Assemble a filter from its parts.
    pub fn new(org_id: OrgId, kind: ResourceKind, reach: AccessReach) -> Self {
        Self {
            org_id,
            kind,
            reach,
        }
    }

    /// The organization every match must belong to.
    pub fn org_id(&self) -> &OrgId {
        &self.org_id
    }

    /// The resource kind this filter applies to.
    pub fn resource_kind(&self) -> ResourceKind {
        self.kind
    }

    /// The reach within the organization.
    pub fn reach(&self) -> &AccessReach {
        &self.reach
    }

    /// Whether this filter covers the whole organization.
    pub fn is_tenant_wide(&self) -> bool {
        matches!(self.reach, AccessReach::Tenant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_lists_each_kind_once() {
        for kind in ResourceKind::ALL {
            assert_eq!(
                ResourceKind::ALL.iter().filter(|k| **k == kind).count(),
                1
            );
        }
    }

    #[test]
    fn accessors_return_what_was_assembled() {
        let org = OrgId::new();
        let user = UserId::new();
        let f = ScopeFilter::new(
            org.clone(),
            ResourceKind::Task,
            AccessReach::Technician(user.clone()),
        );
        assert_eq!(f.org_id(), &org);
        assert_eq!(f.resource_kind(), ResourceKind::Task);
        assert_eq!(f.reach(), &AccessReach::Technician(user));
        assert!(!f.is_tenant_wide());
    }

    #[test]
    fn tenant_reach_is_tenant_wide() {
        let f = ScopeFilter::new(OrgId::new(), ResourceKind::Customer, AccessReach::Tenant);
        assert!(f.is_tenant_wide());
    }
}
