//! Authorization errors.

use thiserror::Error;

use super::{Action, ResourceKind};

/// The single way an authorization check fails.
///
/// The resource and action are kept for logging and status mapping only. The
/// message shown to the actor is the same for every denial, so it never
/// reveals why the check failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    #[error("Not authorized")]
    Unauthorized {
        resource: ResourceKind,
        action: Action,
    },
}

impl AuthzError {
    pub fn unauthorized(resource: ResourceKind, action: Action) -> Self {
        Self::Unauthorized { resource, action }
    }

    pub fn resource(&self) -> ResourceKind {
        match self {
            Self::Unauthorized { resource, .. } => *resource,
        }
    }

    pub fn action(&self) -> Action {
        match self {
            Self::Unauthorized { action, .. } => *action,
        }
    }
}
