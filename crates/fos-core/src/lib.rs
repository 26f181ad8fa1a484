#![deny(missing_docs)]

//! # fos-core: Foundational Types for the FieldOps Stack
//!
//! This crate defines the foundational types that every other crate in the
//! workspace depends on. It has no internal crate dependencies, only
//! `serde`, `thiserror`, `uuid`, and `utoipa` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** Every identifier is a distinct
//!    type. You cannot pass a [`CustomerId`] where a [`WorkOrderId`] is
//!    expected, and assignment fields ([`UserId`]) cannot be confused with
//!    record keys.
//!
//! 2. **Closed role enumeration.** [`Role`] has exactly three variants and
//!    an ordering that encodes privilege. Roles enter the system as strings
//!    only at trust boundaries (bearer tokens, stored user rows), where
//!    [`Role::from_str`] rejects anything unrecognized. Past that boundary
//!    an invalid role is unrepresentable.
//!
//! 3. **[`ValidationError`] hierarchy.** Structured errors with `thiserror`.
//!    No `Box<dyn Error>`, no `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod principal;
pub mod status;

// Re-export primary types at crate root for ergonomic imports.
pub use error::ValidationError;
pub use identity::{
    CustomerId, EvidenceId, OrgId, SiteId, TaskId, UserId, VisitId, WorkOrderId, WorkPackageId,
};
pub use principal::{Principal, Role};
pub use status::{TaskStatus, VisitStatus, WorkOrderStatus};
