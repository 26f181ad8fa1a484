//! # fos-access: Role-Scoped Visibility Resolution
//!
//! Maps an authenticated principal to the visibility scope it holds over a
//! resource kind. This crate provides:
//!
//! - [`ScopeFilter`]: An opaque, query-free description of what a principal
//!   may see for one resource kind. Data layers interpret it; nothing here
//!   touches storage.
//!
//! - [`scope_filter`]: The single resolution function. Every read path in
//!   the stack obtains its filter here, so visibility rules have exactly
//!   one home.
//!
//! ## Architecture
//!
//! ```text
//! fos-core (actor)   -->  fos-access (resolution)  -->  data layer (interpretation)
//!   Principal               scope_filter()                 scoped reads
//!   Role                    ScopeFilter / AccessReach      scoped gate loads
//! ```
//!
//! Resolution is pure: same principal and kind, same filter, no I/O. The
//! role enumeration is closed in `fos-core`, so resolution is total and
//! cannot fail.

pub mod filter;

pub use filter::{AccessReach, ResourceKind, ScopeFilter};

use fos_core::{Principal, Role};

/// Resolve the visibility scope a principal holds over one resource kind.
///
/// This is the primary entry point for access resolution:
/// - `ADMIN` and `DISPATCHER` see everything inside their organization, for
///   every resource kind.
/// - `TECH` sees only records reachable through their own assignments. The
///   returned filter carries the technician's user id; the interpreting
///   data layer applies the kind-specific reachability rule for that user.
///
/// Organization scoping is unconditional. No role, for no kind, yields a
/// filter that crosses organizations.
pub fn scope_filter(principal: &Principal, kind: ResourceKind) -> ScopeFilter {
    let reach = match principal.role {
        Role::Admin | Role::Dispatcher => AccessReach::Tenant,
        Role::Tech => AccessReach::Technician(principal.user_id.clone()),
    };
    ScopeFilter::new(principal.org_id.clone(), kind, reach)
}
