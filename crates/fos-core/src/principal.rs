//! # Principal & Role
//!
//! The authenticated actor model. A [`Principal`] is supplied per request by
//! the authentication layer (organization id, user id, role) and is immutable
//! for the request's duration. [`Role`] is a closed enumeration whose
//! string forms are parsed exactly once, at the boundary, via
//! [`Role::from_str`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ValidationError;
use crate::identity::{OrgId, UserId};

/// Roles in the FieldOps Stack, ordered by privilege level.
///
/// The `Ord` derivation respects variant declaration order:
/// `Tech < Dispatcher < Admin`. This enables `>=` comparison for
/// role-floor checks on write endpoints.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Field technician. Sees only assignment-reachable records.
    Tech,
    /// Dispatcher. Full tenant visibility; creates and schedules work.
    Dispatcher,
    /// Organization administrator. Full tenant visibility plus user administration.
    Admin,
}

impl Role {
    /// Return the canonical wire representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tech => "TECH",
            Self::Dispatcher => "DISPATCHER",
            Self::Admin => "ADMIN",
        }
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    /// Parse a role string, case-insensitively.
    ///
    /// This is the `InvalidRole` defense: anything outside the three
    /// recognized values is rejected here, before a [`Principal`] can exist.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("admin") {
            Ok(Self::Admin)
        } else if s.eq_ignore_ascii_case("dispatcher") {
            Ok(Self::Dispatcher)
        } else if s.eq_ignore_ascii_case("tech") {
            Ok(Self::Tech)
        } else {
            Err(ValidationError::InvalidRole(s.to_string()))
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The authenticated actor issuing a request.
///
/// Supplied by the authentication collaborator; trusted completely past the
/// token boundary. Every scoped read and write derives its visibility from
/// these three fields and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Organization (tenant) the principal acts within.
    pub org_id: OrgId,
    /// The user behind this principal.
    pub user_id: UserId,
    /// The principal's role within the organization.
    pub role: Role,
}

impl Principal {
    /// Construct a principal from its parts.
    pub fn new(org_id: OrgId, user_id: UserId, role: Role) -> Self {
        Self {
            org_id,
            user_id,
            role,
        }
    }

    /// Check whether this principal meets a minimum role floor.
    ///
    /// Since `Role` derives `Ord` with `Tech < Dispatcher < Admin`, this is
    /// a single comparison.
    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }
}
