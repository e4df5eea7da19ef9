//! Authorization layer: per-resource, per-role policies.
//!
//! Every resource type has one policy that answers two questions:
//! - may this actor perform this action on the resource (class-level) or on
//!   a specific record?
//! - which records of a collection may this actor observe? (the scope)
//!
//! Policies are pure functions of the actor and the already-loaded record.
//! The [`PolicyRegistry`] dispatches to the right policy for a resource type,
//! audits decisions, and hands out [`Authorized`] capabilities that the
//! repositories require before mutating or listing anything.
//!
//! An actor whose role could not be resolved is denied everything.

mod decision;
mod error;
mod grant;
pub mod policies;
mod policy;
mod registry;

use std::fmt;

pub use decision::AuthzResult;
pub use error::AuthzError;
pub use grant::Authorized;
pub use policies::{Dashboard, DashboardPolicy, MessagePolicy, PatientPolicy, TaskPolicy};
pub use policy::{RecordPolicy, ResourcePolicy, Target};
pub use registry::{PolicyFor, PolicyRegistry};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, Patient, Task};

/// An action an actor may attempt on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Reach a listing (index)
    List,
    /// Show a single record
    View,
    Create,
    Update,
    Destroy,
    /// Mark a task completed
    Complete,
    /// Move a completed task back to pending
    Reopen,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::List,
        Action::View,
        Action::Create,
        Action::Update,
        Action::Destroy,
        Action::Complete,
        Action::Reopen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::View => "view",
            Self::Create => "create",
            Self::Update => "update",
            Self::Destroy => "destroy",
            Self::Complete => "complete",
            Self::Reopen => "reopen",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "list" | "index" => Some(Self::List),
            "view" | "show" => Some(Self::View),
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "destroy" => Some(Self::Destroy),
            "complete" => Some(Self::Complete),
            "reopen" => Some(Self::Reopen),
            _ => None,
        }
    }

    /// Whether the action targets one specific record.
    pub fn is_record_level(&self) -> bool {
        !matches!(self, Self::List | Self::Create)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resource type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Patient,
    Task,
    Message,
    Dashboard,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Patient,
        ResourceKind::Task,
        ResourceKind::Message,
        ResourceKind::Dashboard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Task => "task",
            Self::Message => "message",
            Self::Dashboard => "dashboard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "patient" | "patients" => Some(Self::Patient),
            "task" | "tasks" => Some(Self::Task),
            "message" | "messages" => Some(Self::Message),
            "dashboard" => Some(Self::Dashboard),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A type guarded by a policy.
pub trait Resource: Send + Sync + 'static {
    const KIND: ResourceKind;

    /// Identifier of this record, if it is one.
    fn record_id(&self) -> Option<Uuid>;
}

impl Resource for Patient {
    const KIND: ResourceKind = ResourceKind::Patient;

    fn record_id(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

impl Resource for Task {
    const KIND: ResourceKind = ResourceKind::Task;

    fn record_id(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

impl Resource for Message {
    const KIND: ResourceKind = ResourceKind::Message;

    fn record_id(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_aliases() {
        assert_eq!(Action::from_str("index"), Some(Action::List));
        assert_eq!(Action::from_str("show"), Some(Action::View));
        assert_eq!(Action::from_str("archive"), None);
        for action in Action::ALL {
            assert_eq!(Action::from_str(action.as_str()), Some(action));
        }
    }

    #[test]
    fn test_record_level_actions() {
        assert!(!Action::List.is_record_level());
        assert!(!Action::Create.is_record_level());
        assert!(Action::View.is_record_level());
        assert!(Action::Complete.is_record_level());
    }

    #[test]
    fn test_resource_kind_parse() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(ResourceKind::from_str("tasks"), Some(ResourceKind::Task));
        assert_eq!(ResourceKind::from_str("users"), None);
    }
}
