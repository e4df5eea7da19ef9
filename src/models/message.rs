use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::validators::validate_not_blank;

/// Whether a message was received from or sent to the patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    Incoming,
    #[default]
    Outgoing,
}

impl MessageDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "incoming" => Some(Self::Incoming),
            "outgoing" => Some(Self::Outgoing),
            _ => None,
        }
    }
}

impl fmt::Display for MessageDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub patient_id: Uuid,
    /// Author
    pub user_id: Uuid,
    pub content: String,
    pub direction: MessageDirection,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    pub fn is_authored_by(&self, actor_id: Uuid) -> bool {
        self.user_id == actor_id
    }

    /// Sent within the last hour.
    pub fn is_recent(&self, now: DateTime<Utc>) -> bool {
        self.created_at > now - Duration::hours(1)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMessage {
    #[validate(length(min = 1, max = 2000), custom(function = "validate_not_blank"))]
    pub content: String,
    #[serde(default)]
    pub direction: MessageDirection,
}

impl CreateMessage {
    /// Build a new record in `patient_id`'s thread. Does not validate.
    pub fn build(&self, patient_id: Uuid, author: Uuid, now: DateTime<Utc>) -> Message {
        Message {
            id: Uuid::new_v4(),
            patient_id,
            user_id: author,
            content: self.content.clone(),
            direction: self.direction,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateMessage {
    #[validate(length(min = 1, max = 2000), custom(function = "validate_not_blank"))]
    pub content: Option<String>,
    pub direction: Option<MessageDirection>,
}

impl UpdateMessage {
    pub fn apply_to(self, message: &mut Message, now: DateTime<Utc>) {
        if let Some(v) = self.content {
            message.content = v;
        }
        if let Some(v) = self.direction {
            message.direction = v;
        }
        message.updated_at = now;
    }
}
