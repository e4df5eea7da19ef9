use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::{ServiceError, ServiceResult};
use crate::{
    authz::{Action, PolicyRegistry, Target},
    config::ListingConfig,
    db::{DbPool, MessageFilter, Page, PageRequest, Query},
    models::{Actor, CreateMessage, Message, UpdateMessage},
};

/// Messages live in a patient's thread and are always addressed through it.
#[derive(Clone)]
pub struct MessageService {
    db: Arc<DbPool>,
    authz: Arc<PolicyRegistry>,
    listing: ListingConfig,
}

impl MessageService {
    pub fn new(db: Arc<DbPool>, authz: Arc<PolicyRegistry>, listing: ListingConfig) -> Self {
        Self { db, authz, listing }
    }

    async fn ensure_patient(&self, patient_id: Uuid) -> ServiceResult<()> {
        match self.db.patients().get_by_id(patient_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::NotFound),
        }
    }

    /// Load a message, treating one from another thread as missing.
    async fn load(&self, patient_id: Uuid, id: Uuid) -> ServiceResult<Message> {
        self.ensure_patient(patient_id).await?;
        self.db
            .messages()
            .get_by_id(id)
            .await?
            .filter(|m| m.patient_id == patient_id)
            .ok_or(ServiceError::NotFound)
    }

    /// A patient's thread, newest first.
    pub async fn list_for_patient(
        &self,
        actor: &Actor,
        patient_id: Uuid,
        page: Option<usize>,
    ) -> ServiceResult<Page<Message>> {
        self.ensure_patient(patient_id).await?;
        let per_page = self.listing.per_page;
        let query = self
            .authz
            .authorized_scope::<Message>(actor, Query::all())?
            .refine(|q| {
                q.filter(MessageFilter::ForPatient(patient_id))
                    .paginate(PageRequest::new(page.unwrap_or(1), per_page))
            });
        Ok(self.db.messages().list(query).await?)
    }

    pub async fn show(&self, actor: &Actor, patient_id: Uuid, id: Uuid) -> ServiceResult<Message> {
        let message = self.load(patient_id, id).await?;
        self.authz
            .authorize(actor, Action::View, Target::Record(&message))?;
        Ok(message)
    }

    /// Post a message to a patient's thread as `actor`.
    pub async fn create(
        &self,
        actor: &Actor,
        patient_id: Uuid,
        input: CreateMessage,
    ) -> ServiceResult<Message> {
        self.ensure_patient(patient_id).await?;
        let grant = self.authz.grant(
            actor,
            Action::Create,
            input.build(patient_id, actor.id, Utc::now()),
        )?;
        input.validate()?;
        Ok(self.db.messages().create(grant).await?)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        patient_id: Uuid,
        id: Uuid,
        input: UpdateMessage,
    ) -> ServiceResult<Message> {
        let message = self.load(patient_id, id).await?;
        let grant = self.authz.grant_record(actor, Action::Update, message)?;
        input.validate()?;
        let grant = grant.update(|m| input.apply_to(m, Utc::now()));
        Ok(self.db.messages().update(grant).await?)
    }

    pub async fn destroy(&self, actor: &Actor, patient_id: Uuid, id: Uuid) -> ServiceResult<()> {
        let message = self.load(patient_id, id).await?;
        let grant = self.authz.grant_record(actor, Action::Destroy, message)?;
        Ok(self.db.messages().delete(grant).await?)
    }
}
