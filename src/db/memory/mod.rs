//! In-memory store backed by `DashMap`.
//!
//! All four collections live in one [`MemoryStore`] shared by the repository
//! implementations, so cascading deletes and actor/patient links can touch
//! several collections. Multi-step writes that must stay consistent (unique
//! emails and medical record numbers, links) are serialized through
//! `write_lock`.
//!
//! Never hold a `DashMap` guard while touching the same map again: shards are
//! locked per guard.

mod actors;
mod messages;
mod patients;
mod tasks;

pub use actors::MemoryActorRepo;
use dashmap::{DashMap, DashSet};
pub use messages::MemoryMessageRepo;
pub use patients::MemoryPatientRepo;
pub use tasks::MemoryTaskRepo;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    db::error::{DbError, DbResult},
    models::{Actor, Message, Patient, Task},
};

#[derive(Default)]
pub struct MemoryStore {
    actors: DashMap<Uuid, Actor>,
    patients: DashMap<Uuid, Patient>,
    tasks: DashMap<Uuid, Task>,
    messages: DashMap<Uuid, Message>,
    /// Patients created through the repository and not yet claimed by an
    /// actor. Only these may be discarded.
    unclaimed: DashSet<Uuid>,
    write_lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn email_taken(&self, email: &str) -> bool {
        self.actors
            .iter()
            .any(|a| a.email.eq_ignore_ascii_case(email))
    }

    fn mrn_taken(&self, mrn: &str) -> bool {
        self.patients
            .iter()
            .any(|p| p.medical_record_number == mrn)
    }

    fn snapshot<T: Clone>(map: &DashMap<Uuid, T>) -> Vec<T> {
        map.iter().map(|entry| entry.value().clone()).collect()
    }

    // Bulk loading. These skip the capability checks and are only reachable
    // through seeding, which runs before any actor exists.

    pub(crate) fn insert_actor(&self, actor: Actor) -> DbResult<()> {
        if self.actors.contains_key(&actor.id) || self.email_taken(&actor.email) {
            return Err(DbError::Conflict(format!(
                "Actor '{}' already exists",
                actor.email
            )));
        }
        self.actors.insert(actor.id, actor);
        Ok(())
    }

    pub(crate) fn insert_patient(&self, patient: Patient) -> DbResult<()> {
        if self.patients.contains_key(&patient.id) || self.mrn_taken(&patient.medical_record_number)
        {
            return Err(DbError::Conflict(format!(
                "Patient with medical record number '{}' already exists",
                patient.medical_record_number
            )));
        }
        if let Some(owner) = patient.user_id
            && !self.actors.contains_key(&owner)
        {
            return Err(DbError::Validation(format!(
                "Patient {} is owned by unknown actor {owner}",
                patient.id
            )));
        }
        self.patients.insert(patient.id, patient);
        Ok(())
    }

    pub(crate) fn insert_task(&self, task: Task) -> DbResult<()> {
        self.check_references(task.patient_id, task.user_id, "Task", task.id)?;
        self.tasks.insert(task.id, task);
        Ok(())
    }

    pub(crate) fn insert_message(&self, message: Message) -> DbResult<()> {
        self.check_references(message.patient_id, message.user_id, "Message", message.id)?;
        self.messages.insert(message.id, message);
        Ok(())
    }

    /// Set `actor.patient_id` from the patients' `user_id` side after a
    /// bulk load.
    pub(crate) fn sync_links(&self) -> DbResult<()> {
        let owned: Vec<(Uuid, Uuid)> = self
            .patients
            .iter()
            .filter_map(|p| p.user_id.map(|owner| (owner, p.id)))
            .collect();
        for (owner, patient_id) in owned {
            let Some(mut actor) = self.actors.get_mut(&owner) else {
                continue;
            };
            match actor.patient_id {
                Some(existing) if existing != patient_id => {
                    return Err(DbError::Conflict(format!(
                        "Actor {owner} owns more than one patient"
                    )));
                }
                _ => actor.patient_id = Some(patient_id),
            }
        }
        Ok(())
    }

    fn check_references(&self, patient_id: Uuid, user_id: Uuid, kind: &str, id: Uuid) -> DbResult<()> {
        if !self.patients.contains_key(&patient_id) {
            return Err(DbError::Validation(format!(
                "{kind} {id} references unknown patient {patient_id}"
            )));
        }
        if !self.actors.contains_key(&user_id) {
            return Err(DbError::Validation(format!(
                "{kind} {id} references unknown actor {user_id}"
            )));
        }
        Ok(())
    }
}
