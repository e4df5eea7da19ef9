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
        repos::{MessageRepo, granted_record_id},
    },
    models::Message,
};

pub struct MemoryMessageRepo {
    store: Arc<MemoryStore>,
}

impl MemoryMessageRepo {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MessageRepo for MemoryMessageRepo {
    async fn create(&self, grant: Authorized<Message>) -> DbResult<Message> {
        let id = granted_record_id(&grant, &[Action::Create])?;
        if grant.get().user_id != grant.actor_id() {
            return Err(DbError::Internal(format!(
                "Create grant issued to {} cannot author a message as {}",
                grant.actor_id(),
                grant.get().user_id
            )));
        }
        let mut message = grant.into_inner();
        message.id = id;

        // Held across the patient check: a cascading delete must not run in
        // between.
        let _guard = self.store.write_lock.lock().await;
        if !self.store.patients.contains_key(&message.patient_id) {
            return Err(DbError::Validation(format!(
                "Patient {} does not exist",
                message.patient_id
            )));
        }
        if self.store.messages.contains_key(&id) {
            return Err(DbError::Conflict(format!("Message {id} already exists")));
        }
        self.store.messages.insert(id, message.clone());
        Ok(message)
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Message>> {
        Ok(self.store.messages.get(&id).map(|m| m.clone()))
    }

    async fn list(&self, query: Authorized<Query<Message>>) -> DbResult<Page<Message>> {
        let records = MemoryStore::snapshot(&self.store.messages);
        Ok(query.get().run(records, Utc::now()))
    }

    async fn count(&self, query: &Authorized<Query<Message>>) -> DbResult<usize> {
        let records = MemoryStore::snapshot(&self.store.messages);
        Ok(query.get().count(records.iter(), Utc::now()))
    }

    async fn update(&self, grant: Authorized<Message>) -> DbResult<Message> {
        let id = granted_record_id(&grant, &[Action::Update])?;
        let mut message = grant.into_inner();
        message.id = id;

        let mut current = self.store.messages.get_mut(&id).ok_or(DbError::NotFound)?;
        // Authorship and thread are fixed at creation.
        message.patient_id = current.patient_id;
        message.user_id = current.user_id;
        message.created_at = current.created_at;
        *current = message.clone();
        Ok(message)
    }

    async fn delete(&self, grant: Authorized<Message>) -> DbResult<()> {
        let id = granted_record_id(&grant, &[Action::Destroy])?;
        self.store.messages.remove(&id).ok_or(DbError::NotFound)?;
        Ok(())
    }
}
