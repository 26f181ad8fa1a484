//! # API Route Modules
//!
//! Route modules for the FieldOps API surface:
//!
//! - `customers` — Customer accounts the organization does work for.
//! - `sites` — Service locations, each belonging to a customer.
//! - `users` — Organization member directory (admin-managed).
//! - `work_orders` — Work order creation and scoped reads.
//! - `work_packages` — Task groupings under a work order, optionally
//!   led by a technician.
//! - `tasks` — Tasks, status updates, and evidence records.
//! - `visits` — Scheduled visits, the closeout gate, and closeout.
//!
//! Every read goes through the scoped accessors in [`crate::scope`];
//! handlers never filter records by role themselves.

pub mod customers;
pub mod sites;
pub mod tasks;
pub mod users;
pub mod visits;
pub mod work_orders;
pub mod work_packages;
