use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    authz::Authorized,
    db::{
        error::DbResult,
        query::{Page, Query, Record},
    },
    models::{Task, TaskStatus},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFilter {
    Status(TaskStatus),
    /// Pending and due before today
    Overdue,
    DueToday,
    DueThisWeek,
    ForPatient(Uuid),
    AssignedTo(Uuid),
}

impl TaskFilter {
    /// Parse a listing status filter.
    pub fn from_status_param(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Status(TaskStatus::Pending)),
            "completed" => Some(Self::Status(TaskStatus::Completed)),
            "overdue" => Some(Self::Overdue),
            "due_today" => Some(Self::DueToday),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSort {
    /// Soonest due first
    DueDate,
    /// Newest first
    Recent,
}

impl TaskSort {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "due_date" => Some(Self::DueDate),
            "recent" => Some(Self::Recent),
            _ => None,
        }
    }
}

impl Record for Task {
    type Filter = TaskFilter;
    type Sort = TaskSort;

    fn matches(&self, filter: &TaskFilter, now: DateTime<Utc>) -> bool {
        match filter {
            TaskFilter::Status(status) => self.status == *status,
            TaskFilter::Overdue => self.is_overdue_by_day(now),
            TaskFilter::DueToday => self.is_due_today(now),
            TaskFilter::DueThisWeek => self.is_due_this_week(now),
            TaskFilter::ForPatient(id) => self.patient_id == *id,
            TaskFilter::AssignedTo(id) => self.user_id == *id,
        }
    }

    // Default: most recently updated first.
    fn compare(a: &Self, b: &Self, sort: Option<TaskSort>) -> Ordering {
        let default = b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id));
        match sort {
            Some(TaskSort::DueDate) => a.due_date.cmp(&b.due_date).then(default),
            Some(TaskSort::Recent) => b.created_at.cmp(&a.created_at).then(default),
            None => default,
        }
    }
}

#[async_trait]
pub trait TaskRepo: Send + Sync {
    /// Insert a new task. Its patient must exist.
    async fn create(&self, grant: Authorized<Task>) -> DbResult<Task>;
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Task>>;
    async fn list(&self, query: Authorized<Query<Task>>) -> DbResult<Page<Task>>;
    async fn count(&self, query: &Authorized<Query<Task>>) -> DbResult<usize>;
    /// Persist an update, complete or reopen under the granted id.
    async fn update(&self, grant: Authorized<Task>) -> DbResult<Task>;
    async fn delete(&self, grant: Authorized<Task>) -> DbResult<()>;
}
