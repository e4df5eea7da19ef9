use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::MemoryStore;
use crate::{
    authz::{Action, Authorized},
    db::{
        error::{DbError, DbResult},
        query::{Page, Query},
        repos::{TaskRepo, granted_record_id},
    },
    models::Task,
};

pub struct MemoryTaskRepo {
    store: Arc<MemoryStore>,
}

impl MemoryTaskRepo {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TaskRepo for MemoryTaskRepo {
    async fn create(&self, grant: Authorized<Task>) -> DbResult<Task> {
        let id = granted_record_id(&grant, &[Action::Create])?;
        if grant.get().user_id != grant.actor_id() {
            return Err(DbError::Internal(format!(
                "Create grant issued to {} cannot author a task as {}",
                grant.actor_id(),
                grant.get().user_id
            )));
        }
        let mut task = grant.into_inner();
        task.id = id;

        // Held across the patient check: a cascading delete must not run in
        // between.
        let _guard = self.store.write_lock.lock().await;
        if !self.store.patients.contains_key(&task.patient_id) {
            return Err(DbError::Validation(format!(
                "Patient {} does not exist",
                task.patient_id
            )));
        }
        if self.store.tasks.contains_key(&id) {
            return Err(DbError::Conflict(format!("Task {id} already exists")));
        }
        self.store.tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Task>> {
        Ok(self.store.tasks.get(&id).map(|t| t.clone()))
    }

    async fn list(&self, query: Authorized<Query<Task>>) -> DbResult<Page<Task>> {
        let records = MemoryStore::snapshot(&self.store.tasks);
        Ok(query.get().run(records, Utc::now()))
    }

    async fn count(&self, query: &Authorized<Query<Task>>) -> DbResult<usize> {
        let records = MemoryStore::snapshot(&self.store.tasks);
        Ok(query.get().count(records.iter(), Utc::now()))
    }

    async fn update(&self, grant: Authorized<Task>) -> DbResult<Task> {
        let id = granted_record_id(&grant, &[Action::Update, Action::Complete, Action::Reopen])?;
        let mut task = grant.into_inner();
        task.id = id;

        let mut current = self.store.tasks.get_mut(&id).ok_or(DbError::NotFound)?;
        // A task never moves to another patient.
        task.patient_id = current.patient_id;
        task.created_at = current.created_at;
        *current = task.clone();
        Ok(task)
    }

    async fn delete(&self, grant: Authorized<Task>) -> DbResult<()> {
        let id = granted_record_id(&grant, &[Action::Destroy])?;
        self.store.tasks.remove(&id).ok_or(DbError::NotFound)?;
        Ok(())
    }
}
