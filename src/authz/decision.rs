//! Authorization decisions.

use serde::Serialize;

/// Result of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthzResult {
    /// Whether access is allowed
    pub allowed: bool,
    /// The policy that made this decision
    pub policy_name: Option<&'static str>,
    /// Human-readable reason, for logs and diagnostics only
    pub reason: Option<String>,
}

impl AuthzResult {
    pub fn allow_by_policy(name: &'static str) -> Self {
        Self {
            allowed: true,
            policy_name: Some(name),
            reason: None,
        }
    }

    pub fn deny_by_policy(name: &'static str, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            policy_name: Some(name),
            reason: Some(reason.into()),
        }
    }

    /// Deny an actor whose role could not be resolved.
    pub fn deny_unresolved_role(name: &'static str) -> Self {
        Self::deny_by_policy(name, "Actor role is missing or invalid (fail-closed)")
    }
}
