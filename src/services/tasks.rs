use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use super::{ServiceError, ServiceResult};
use crate::{
    authz::{Action, Authorized, PolicyRegistry, Target},
    config::ListingConfig,
    db::{DbPool, Page, PageRequest, Query, TaskFilter, TaskSort},
    models::{Actor, CreateTask, Task, TaskStatus, UpdateTask},
};

#[derive(Debug, Clone, Default)]
pub struct TaskListParams {
    /// Parsed status filter (pending, completed, overdue, due_today)
    pub filter: Option<TaskFilter>,
    pub sort: Option<TaskSort>,
    pub page: Option<usize>,
    pub patient_id: Option<Uuid>,
}

/// Counts over the tasks an actor can see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub overdue: usize,
    pub due_today: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskListing {
    pub tasks: Page<Task>,
    pub stats: TaskStats,
}

#[derive(Clone)]
pub struct TaskService {
    db: Arc<DbPool>,
    authz: Arc<PolicyRegistry>,
    listing: ListingConfig,
}

impl TaskService {
    pub fn new(db: Arc<DbPool>, authz: Arc<PolicyRegistry>, listing: ListingConfig) -> Self {
        Self { db, authz, listing }
    }

    async fn load(&self, id: Uuid) -> ServiceResult<Task> {
        self.db
            .tasks()
            .get_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    /// A page of visible tasks plus counts over everything visible.
    pub async fn list(&self, actor: &Actor, params: TaskListParams) -> ServiceResult<TaskListing> {
        let scope = self.authz.authorized_scope::<Task>(actor, Query::all())?;
        let stats = self.count_by_status(&scope).await?;

        let per_page = self.listing.per_page;
        let query = scope.refine(|mut q| {
            if let Some(filter) = params.filter {
                q = q.filter(filter);
            }
            if let Some(patient_id) = params.patient_id {
                q = q.filter(TaskFilter::ForPatient(patient_id));
            }
            if let Some(sort) = params.sort {
                q = q.sort_by(sort);
            }
            q.paginate(PageRequest::new(params.page.unwrap_or(1), per_page))
        });
        let tasks = self.db.tasks().list(query).await?;
        Ok(TaskListing { tasks, stats })
    }

    pub async fn stats(&self, actor: &Actor) -> ServiceResult<TaskStats> {
        let scope = self.authz.authorized_scope::<Task>(actor, Query::all())?;
        self.count_by_status(&scope).await
    }

    async fn count_by_status(&self, scope: &Authorized<Query<Task>>) -> ServiceResult<TaskStats> {
        let repo = self.db.tasks();
        let count = |filter: TaskFilter| {
            let query = scope.clone().refine(|q| q.filter(filter));
            let repo = repo.clone();
            async move { repo.count(&query).await }
        };
        Ok(TaskStats {
            total: repo.count(scope).await?,
            pending: count(TaskFilter::Status(TaskStatus::Pending)).await?,
            completed: count(TaskFilter::Status(TaskStatus::Completed)).await?,
            overdue: count(TaskFilter::Overdue).await?,
            due_today: count(TaskFilter::DueToday).await?,
        })
    }

    pub async fn show(&self, actor: &Actor, id: Uuid) -> ServiceResult<Task> {
        let task = self.load(id).await?;
        self.authz.authorize(actor, Action::View, Target::Record(&task))?;
        Ok(task)
    }

    /// Create a task authored by `actor`.
    pub async fn create(&self, actor: &Actor, input: CreateTask) -> ServiceResult<Task> {
        let grant = self
            .authz
            .grant(actor, Action::Create, input.build(actor.id, Utc::now()))?;
        input.validate()?;
        let task = self.db.tasks().create(grant).await?;
        tracing::debug!(task_id = %task.id, patient_id = %task.patient_id, "Task created");
        Ok(task)
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, input: UpdateTask) -> ServiceResult<Task> {
        let task = self.load(id).await?;
        let grant = self.authz.grant_record(actor, Action::Update, task)?;
        input.validate()?;
        let grant = grant.update(|t| input.apply_to(t, Utc::now()));
        Ok(self.db.tasks().update(grant).await?)
    }

    pub async fn destroy(&self, actor: &Actor, id: Uuid) -> ServiceResult<()> {
        let task = self.load(id).await?;
        let grant = self.authz.grant_record(actor, Action::Destroy, task)?;
        Ok(self.db.tasks().delete(grant).await?)
    }

    /// Mark a task completed. Completing a completed task changes nothing.
    pub async fn complete(&self, actor: &Actor, id: Uuid) -> ServiceResult<Task> {
        self.set_status(actor, id, Action::Complete, TaskStatus::Completed)
            .await
    }

    /// Move a task back to pending.
    pub async fn reopen(&self, actor: &Actor, id: Uuid) -> ServiceResult<Task> {
        self.set_status(actor, id, Action::Reopen, TaskStatus::Pending)
            .await
    }

    async fn set_status(
        &self,
        actor: &Actor,
        id: Uuid,
        action: Action,
        status: TaskStatus,
    ) -> ServiceResult<Task> {
        let task = self.load(id).await?;
        let grant = self.authz.grant_record(actor, action, task)?;
        if grant.get().status == status {
            return Ok(grant.into_inner());
        }
        let grant = grant.update(|t| t.set_status(status, Utc::now()));
        let task = self.db.tasks().update(grant).await?;
        tracing::debug!(task_id = %task.id, status = %task.status, actor_id = %actor.id, "Task status changed");
        Ok(task)
    }
}
