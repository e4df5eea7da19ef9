use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Baseline authorization class of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Staff member with full access to every resource
    Admin,
    /// Self-registered or admin-onboarded patient
    Patient,
}

impl Role {
    /// Convert to string for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Patient => "patient",
        }
    }

    /// Parse from a stored string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "patient" => Some(Self::Patient),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The authenticated principal performing a request.
///
/// `role` is `None` when the stored role could not be resolved. Every policy
/// denies such an actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub email: String,
    pub role: Option<Role>,
    /// Linked patient record, only ever set for patient-role actors
    pub patient_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Actor {
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            role: Some(role),
            patient_id: None,
            created_at: Utc::now(),
        }
    }

    /// Build an actor from a raw role string, leaving the role unresolved if
    /// the string is not a known role.
    pub fn from_stored(id: Uuid, email: impl Into<String>, role: &str) -> Self {
        let parsed = Role::from_str(role);
        if parsed.is_none() {
            tracing::warn!(actor_id = %id, stored_role = role, "Unknown actor role");
        }
        Self {
            id,
            email: email.into(),
            role: parsed,
            patient_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_patient(mut self, patient_id: Uuid) -> Self {
        self.patient_id = Some(patient_id);
        self
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    pub fn is_patient(&self) -> bool {
        self.role == Some(Role::Patient)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateActor {
    #[validate(email)]
    pub email: String,
    pub role: Role,
}
