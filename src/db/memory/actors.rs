use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::MemoryStore;
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::ActorRepo,
    },
    models::{Actor, CreateActor},
};

pub struct MemoryActorRepo {
    store: Arc<MemoryStore>,
}

impl MemoryActorRepo {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ActorRepo for MemoryActorRepo {
    async fn create(&self, input: CreateActor) -> DbResult<Actor> {
        let _guard = self.store.write_lock.lock().await;
        if self.store.email_taken(&input.email) {
            return Err(DbError::Conflict(format!(
                "Actor with email '{}' already exists",
                input.email
            )));
        }
        let actor = Actor::new(input.email, input.role);
        self.store.actors.insert(actor.id, actor.clone());
        Ok(actor)
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Actor>> {
        Ok(self.store.actors.get(&id).map(|a| a.clone()))
    }

    async fn get_by_email(&self, email: &str) -> DbResult<Option<Actor>> {
        Ok(self
            .store
            .actors
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .map(|a| a.clone()))
    }

    async fn first_admin(&self) -> DbResult<Option<Actor>> {
        Ok(MemoryStore::snapshot(&self.store.actors)
            .into_iter()
            .filter(Actor::is_admin)
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))))
    }

    async fn link_patient(&self, actor_id: Uuid, patient_id: Uuid) -> DbResult<Actor> {
        let _guard = self.store.write_lock.lock().await;

        let actor = self
            .store
            .actors
            .get(&actor_id)
            .map(|a| a.clone())
            .ok_or(DbError::NotFound)?;
        let owner = self
            .store
            .patients
            .get(&patient_id)
            .map(|p| p.user_id)
            .ok_or(DbError::NotFound)?;

        if let Some(existing) = actor.patient_id
            && existing != patient_id
        {
            return Err(DbError::Conflict(format!(
                "Actor {actor_id} is already linked to patient {existing}"
            )));
        }
        if let Some(other) = owner
            && other != actor_id
        {
            return Err(DbError::Conflict(format!(
                "Patient {patient_id} is already owned by actor {other}"
            )));
        }

        if let Some(mut patient) = self.store.patients.get_mut(&patient_id) {
            patient.user_id = Some(actor_id);
        }
        self.store.unclaimed.remove(&patient_id);
        let linked = actor.with_patient(patient_id);
        self.store.actors.insert(actor_id, linked.clone());
        Ok(linked)
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let _guard = self.store.write_lock.lock().await;
        let (_, actor) = self.store.actors.remove(&id).ok_or(DbError::NotFound)?;
        if let Some(patient_id) = actor.patient_id
            && let Some(mut patient) = self.store.patients.get_mut(&patient_id)
        {
            patient.user_id = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, Utc};

    use super::*;
    use crate::models::{Patient, PatientStatus, Role};

    fn stored_patient(store: &MemoryStore) -> Uuid {
        let now = Utc::now();
        let patient = Patient {
            id: Uuid::new_v4(),
            first_name: "Rosalind".to_string(),
            last_name: "Franklin".to_string(),
            email: "rosalind@example.com".to_string(),
            phone: "5551112222".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1980, 7, 25).unwrap(),
            medical_record_number: format!("MR{}", &Uuid::new_v4().simple().to_string()[..8]),
            status: PatientStatus::Active,
            user_id: None,
            health_question_one: None,
            health_question_two: None,
            health_question_three: None,
            created_at: now,
            updated_at: now,
        };
        let id = patient.id;
        store.insert_patient(patient).unwrap();
        id
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let repo = MemoryActorRepo::new(Arc::new(MemoryStore::new()));
        let input = CreateActor {
            email: "dup@example.com".to_string(),
            role: Role::Patient,
        };
        repo.create(input.clone()).await.unwrap();
        let err = repo
            .create(CreateActor {
                email: "DUP@example.com".to_string(),
                ..input
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_link_is_idempotent_and_exclusive() {
        let store = Arc::new(MemoryStore::new());
        let repo = MemoryActorRepo::new(store.clone());
        let first = stored_patient(&store);
        let second = stored_patient(&store);
        let actor = repo
            .create(CreateActor {
                email: "link@example.com".to_string(),
                role: Role::Patient,
            })
            .await
            .unwrap();

        let linked = repo.link_patient(actor.id, first).await.unwrap();
        assert_eq!(linked.patient_id, Some(first));
        assert_eq!(store.patients.get(&first).unwrap().user_id, Some(actor.id));

        // Same pair again is fine
        repo.link_patient(actor.id, first).await.unwrap();

        let err = repo.link_patient(actor.id, second).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));

        let other = repo
            .create(CreateActor {
                email: "other@example.com".to_string(),
                role: Role::Patient,
            })
            .await
            .unwrap();
        let err = repo.link_patient(other.id, first).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_first_admin_is_oldest() {
        let store = Arc::new(MemoryStore::new());
        let repo = MemoryActorRepo::new(store.clone());
        let mut older = Actor::new("older@example.com", Role::Admin);
        older.created_at = Utc::now() - Duration::days(30);
        let newer = Actor::new("newer@example.com", Role::Admin);
        let patient = Actor::new("pat@example.com", Role::Patient);
        let older_id = older.id;
        for actor in [newer, patient, older] {
            store.insert_actor(actor).unwrap();
        }

        let admin = repo.first_admin().await.unwrap().unwrap();
        assert_eq!(admin.id, older_id);
    }

    #[tokio::test]
    async fn test_no_admin() {
        let repo = MemoryActorRepo::new(Arc::new(MemoryStore::new()));
        assert!(repo.first_admin().await.unwrap().is_none());
    }
}
