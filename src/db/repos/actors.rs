use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{Actor, CreateActor},
};

/// Actor accounts. Not guarded by a policy: actors are resolved before any
/// authorization happens.
#[async_trait]
pub trait ActorRepo: Send + Sync {
    /// Create an actor. Emails are unique.
    async fn create(&self, input: CreateActor) -> DbResult<Actor>;
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Actor>>;
    async fn get_by_email(&self, email: &str) -> DbResult<Option<Actor>>;
    /// The earliest-created admin, if any.
    async fn first_admin(&self) -> DbResult<Option<Actor>>;
    /// Link an actor to a patient record, setting both sides.
    ///
    /// Re-linking the same pair is a no-op. Linking an actor that already owns
    /// another patient, or a patient already owned by another actor, is a
    /// `Conflict`.
    async fn link_patient(&self, actor_id: Uuid, patient_id: Uuid) -> DbResult<Actor>;
    async fn delete(&self, id: Uuid) -> DbResult<()>;
}
