use std::fmt;

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::validators::validate_not_blank;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub patient_id: Uuid,
    /// Creator / assignee
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_date: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Move the task to `status`, stamping `completed_at` on completion and
    /// clearing it on reopen. Re-applying the current status is a no-op.
    pub fn set_status(&mut self, status: TaskStatus, now: DateTime<Utc>) {
        if self.status == status {
            return;
        }
        self.status = status;
        self.completed_at = match status {
            TaskStatus::Completed => Some(now),
            TaskStatus::Pending => None,
        };
        self.updated_at = now;
    }

    /// Pending and already past its due time.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && self.due_date < now
    }

    /// Pending and due before the start of `now`'s day. Used for listing
    /// filters and dashboard counts, which work in whole days.
    pub fn is_overdue_by_day(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && self.due_date < start_of_day(now)
    }

    pub fn is_due_today(&self, now: DateTime<Utc>) -> bool {
        self.due_date.date_naive() == now.date_naive()
    }

    pub fn is_due_this_week(&self, now: DateTime<Utc>) -> bool {
        let due = self.due_date.date_naive().iso_week();
        let current = now.date_naive().iso_week();
        due.week() == current.week() && due.year() == current.year()
    }

    /// Time between creation and completion, if completed.
    pub fn completion_time(&self) -> Option<Duration> {
        self.completed_at.map(|done| done - self.created_at)
    }

    /// Whole days past due, zero unless overdue.
    pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
        if !self.is_overdue(now) {
            return 0;
        }
        (now - self.due_date).num_days()
    }
}

pub(crate) fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(now)
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTask {
    pub patient_id: Uuid,
    #[validate(length(min = 3, max = 100), custom(function = "validate_not_blank"))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    pub due_date: DateTime<Utc>,
}

impl CreateTask {
    /// Build a new record authored by `author`. Does not validate.
    pub fn build(&self, author: Uuid, now: DateTime<Utc>) -> Task {
        Task {
            id: Uuid::new_v4(),
            patient_id: self.patient_id,
            user_id: author,
            title: self.title.trim().to_string(),
            description: self.description.clone(),
            status: self.status,
            due_date: self.due_date,
            completed_at: (self.status == TaskStatus::Completed).then_some(now),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTask {
    #[validate(length(min = 3, max = 100), custom(function = "validate_not_blank"))]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<DateTime<Utc>>,
}

impl UpdateTask {
    pub fn apply_to(self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(v) = self.title {
            task.title = v;
        }
        if self.description.is_some() {
            task.description = self.description;
        }
        if let Some(v) = self.due_date {
            task.due_date = v;
        }
        if let Some(status) = self.status {
            task.set_status(status, now);
        }
        task.updated_at = now;
    }
}
