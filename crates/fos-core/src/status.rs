//! # Lifecycle Statuses
//!
//! Closed status enumerations for tasks, visits, and work orders. Stored
//! and transmitted as SCREAMING_SNAKE_CASE strings; parsed back through
//! `FromStr` at the same boundaries where roles are parsed.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ValidationError;

/// Lifecycle of a single task within a work order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Not started.
    Todo,
    /// A technician is working on it.
    InProgress,
    /// Finished. The only state that satisfies a critical-task gate check.
    Done,
    /// Cannot proceed; waiting on something outside the task.
    Blocked,
    /// Deliberately not performed.
    Skipped,
}

impl TaskStatus {
    /// Return the canonical wire representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
            Self::Blocked => "BLOCKED",
            Self::Skipped => "SKIPPED",
        }
    }

    /// Whether the task is complete. `BLOCKED` and `SKIPPED` are not
    /// completion states; a critical task in either still blocks closeout.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl FromStr for TaskStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TODO" => Ok(Self::Todo),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "DONE" => Ok(Self::Done),
            "BLOCKED" => Ok(Self::Blocked),
            "SKIPPED" => Ok(Self::Skipped),
            other => Err(ValidationError::InvalidTaskStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of a technician visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitStatus {
    /// On the calendar, nobody is en route yet.
    Scheduled,
    /// The technician is traveling to the site.
    EnRoute,
    /// The technician is at the site.
    OnSite,
    /// The visit has been closed out.
    Completed,
    /// The visit was called off.
    Cancelled,
}

impl VisitStatus {
    /// Return the canonical wire representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::EnRoute => "EN_ROUTE",
            Self::OnSite => "ON_SITE",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether the visit has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl FromStr for VisitStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(Self::Scheduled),
            "EN_ROUTE" => Ok(Self::EnRoute),
            "ON_SITE" => Ok(Self::OnSite),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(ValidationError::InvalidVisitStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of a work order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkOrderStatus {
    /// Accepted, not yet started.
    Open,
    /// Work is underway.
    InProgress,
    /// All work finished.
    Completed,
    /// Abandoned before completion.
    Cancelled,
}

impl WorkOrderStatus {
    /// Return the canonical wire representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for WorkOrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(Self::Open),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(ValidationError::InvalidWorkOrderStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
