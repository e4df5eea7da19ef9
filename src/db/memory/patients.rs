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
        repos::{PatientRepo, granted_record_id},
    },
    models::Patient,
};

pub struct MemoryPatientRepo {
    store: Arc<MemoryStore>,
}

impl MemoryPatientRepo {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PatientRepo for MemoryPatientRepo {
    async fn create(&self, grant: Authorized<Patient>) -> DbResult<Patient> {
        let id = granted_record_id(&grant, &[Action::Create])?;
        let mut patient = grant.into_inner();
        patient.id = id;

        let _guard = self.store.write_lock.lock().await;
        if self.store.patients.contains_key(&id) {
            return Err(DbError::Conflict(format!("Patient {id} already exists")));
        }
        if self.store.mrn_taken(&patient.medical_record_number) {
            return Err(DbError::Conflict(format!(
                "Medical record number '{}' is already taken",
                patient.medical_record_number
            )));
        }
        self.store.patients.insert(id, patient.clone());
        self.store.unclaimed.insert(id);
        Ok(patient)
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Patient>> {
        Ok(self.store.patients.get(&id).map(|p| p.clone()))
    }

    async fn get_by_owner(&self, user_id: Uuid) -> DbResult<Option<Patient>> {
        Ok(self
            .store
            .patients
            .iter()
            .find(|p| p.user_id == Some(user_id))
            .map(|p| p.clone()))
    }

    async fn mrn_exists(&self, medical_record_number: &str) -> DbResult<bool> {
        Ok(self.store.mrn_taken(medical_record_number))
    }

    async fn list(&self, query: Authorized<Query<Patient>>) -> DbResult<Page<Patient>> {
        let records = MemoryStore::snapshot(&self.store.patients);
        Ok(query.get().run(records, Utc::now()))
    }

    async fn count(&self, query: &Authorized<Query<Patient>>) -> DbResult<usize> {
        let records = MemoryStore::snapshot(&self.store.patients);
        Ok(query.get().count(records.iter(), Utc::now()))
    }

    async fn update(&self, grant: Authorized<Patient>) -> DbResult<Patient> {
        let id = granted_record_id(&grant, &[Action::Update])?;
        let mut patient = grant.into_inner();
        patient.id = id;

        let _guard = self.store.write_lock.lock().await;
        let current = self
            .store
            .patients
            .get(&id)
            .map(|p| p.clone())
            .ok_or(DbError::NotFound)?;
        if current.medical_record_number != patient.medical_record_number
            && self.store.mrn_taken(&patient.medical_record_number)
        {
            return Err(DbError::Conflict(format!(
                "Medical record number '{}' is already taken",
                patient.medical_record_number
            )));
        }
        // Ownership changes only through actor linking.
        patient.user_id = current.user_id;
        patient.created_at = current.created_at;
        self.store.patients.insert(id, patient.clone());
        Ok(patient)
    }

    async fn delete(&self, grant: Authorized<Patient>) -> DbResult<()> {
        let id = granted_record_id(&grant, &[Action::Destroy])?;
        let _guard = self.store.write_lock.lock().await;
        self.store.patients.remove(&id).ok_or(DbError::NotFound)?;
        self.store.unclaimed.remove(&id);

        let tasks_before = self.store.tasks.len();
        self.store.tasks.retain(|_, t| t.patient_id != id);
        let messages_before = self.store.messages.len();
        self.store.messages.retain(|_, m| m.patient_id != id);
        for mut actor in self.store.actors.iter_mut() {
            if actor.patient_id == Some(id) {
                actor.patient_id = None;
            }
        }

        tracing::debug!(
            patient_id = %id,
            tasks_removed = tasks_before - self.store.tasks.len(),
            messages_removed = messages_before - self.store.messages.len(),
            "Patient deleted"
        );
        Ok(())
    }

    async fn discard(&self, grant: Authorized<Patient>) -> DbResult<()> {
        let id = granted_record_id(&grant, &[Action::Create])?;
        let _guard = self.store.write_lock.lock().await;
        let owned = self
            .store
            .patients
            .get(&id)
            .map(|p| p.user_id.is_some())
            .ok_or(DbError::NotFound)?;
        // Only an unclaimed row with nothing hanging off it can be rolled back.
        if owned
            || !self.store.unclaimed.contains(&id)
            || self.store.actors.iter().any(|a| a.patient_id == Some(id))
            || self.store.tasks.iter().any(|t| t.patient_id == id)
            || self.store.messages.iter().any(|m| m.patient_id == id)
        {
            return Err(DbError::Conflict(format!(
                "Patient {id} is in use and cannot be discarded"
            )));
        }
        self.store.patients.remove(&id);
        self.store.unclaimed.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::{
        authz::PolicyRegistry,
        db::{PatientFilter, PatientSort},
        models::{Actor, Message, MessageDirection, PatientStatus, Role, Task, TaskStatus},
    };

    fn patient(first: &str, last: &str, mrn: &str, age_days: i64) -> Patient {
        let created = Utc::now() - Duration::days(age_days);
        Patient {
            id: Uuid::new_v4(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{}@example.com", first.to_lowercase()),
            phone: "5550001234".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1975, 4, 1).unwrap(),
            medical_record_number: mrn.to_string(),
            status: PatientStatus::Active,
            user_id: None,
            health_question_one: None,
            health_question_two: None,
            health_question_three: None,
            created_at: created,
            updated_at: created,
        }
    }

    fn setup() -> (Arc<MemoryStore>, MemoryPatientRepo, PolicyRegistry, Actor) {
        let store = Arc::new(MemoryStore::new());
        let admin = Actor::new("admin@example.com", Role::Admin);
        store.insert_actor(admin.clone()).unwrap();
        (
            store.clone(),
            MemoryPatientRepo::new(store),
            PolicyRegistry::default(),
            admin,
        )
    }

    #[tokio::test]
    async fn test_duplicate_mrn_conflicts() {
        let (_, repo, registry, admin) = setup();
        let first = registry
            .grant(&admin, Action::Create, patient("Ada", "Lovelace", "MR10001", 0))
            .unwrap();
        repo.create(first).await.unwrap();

        let second = registry
            .grant(&admin, Action::Create, patient("Bob", "Byron", "MR10001", 0))
            .unwrap();
        assert!(matches!(
            repo.create(second).await.unwrap_err(),
            DbError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn test_update_keys_on_granted_record() {
        let (_, repo, registry, admin) = setup();
        let created = repo
            .create(
                registry
                    .grant(&admin, Action::Create, patient("Ada", "Lovelace", "MR10001", 0))
                    .unwrap(),
            )
            .await
            .unwrap();
        let other = repo
            .create(
                registry
                    .grant(&admin, Action::Create, patient("Bob", "Byron", "MR10002", 0))
                    .unwrap(),
            )
            .await
            .unwrap();

        // Point the payload at another record; the write still lands on the
        // record the grant was issued for.
        let grant = registry
            .grant_record(&admin, Action::Update, created.clone())
            .unwrap()
            .update(|p| {
                p.id = other.id;
                p.first_name = "Augusta".to_string();
            });
        let updated = repo.update(grant).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(repo.get_by_id(created.id).await.unwrap().unwrap().first_name, "Augusta");
        assert_eq!(repo.get_by_id(other.id).await.unwrap().unwrap().first_name, "Bob");
    }

    #[tokio::test]
    async fn test_view_grant_cannot_write() {
        let (_, repo, registry, admin) = setup();
        let created = repo
            .create(
                registry
                    .grant(&admin, Action::Create, patient("Ada", "Lovelace", "MR10001", 0))
                    .unwrap(),
            )
            .await
            .unwrap();
        let view = registry.grant_record(&admin, Action::View, created).unwrap();
        assert!(matches!(repo.delete(view).await.unwrap_err(), DbError::Internal(_)));
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let (store, repo, registry, admin) = setup();
        let target = patient("Ada", "Lovelace", "MR10001", 0);
        let keep = patient("Bob", "Byron", "MR10002", 0);
        let owner = Actor::new("ada@example.com", Role::Patient).with_patient(target.id);
        store.insert_actor(owner.clone()).unwrap();
        store.insert_patient(target.clone()).unwrap();
        store.insert_patient(keep.clone()).unwrap();

        let now = Utc::now();
        for patient_id in [target.id, keep.id] {
            store
                .insert_task(Task {
                    id: Uuid::new_v4(),
                    patient_id,
                    user_id: admin.id,
                    title: "Follow up".to_string(),
                    description: None,
                    status: TaskStatus::Pending,
                    due_date: now,
                    completed_at: None,
                    created_at: now,
                    updated_at: now,
                })
                .unwrap();
            store
                .insert_message(Message {
                    id: Uuid::new_v4(),
                    patient_id,
                    user_id: admin.id,
                    content: "Hello".to_string(),
                    direction: MessageDirection::Outgoing,
                    created_at: now,
                    updated_at: now,
                })
                .unwrap();
        }

        let grant = registry.grant_record(&admin, Action::Destroy, target.clone()).unwrap();
        repo.delete(grant).await.unwrap();

        assert!(repo.get_by_id(target.id).await.unwrap().is_none());
        assert!(store.tasks.iter().all(|t| t.patient_id == keep.id));
        assert!(store.messages.iter().all(|m| m.patient_id == keep.id));
        assert_eq!(store.tasks.len(), 1);
        assert_eq!(store.actors.get(&owner.id).unwrap().patient_id, None);
    }

    #[tokio::test]
    async fn test_discard_removes_fresh_record() {
        let (_, repo, registry, admin) = setup();
        let grant = registry
            .grant(&admin, Action::Create, patient("Ada", "Lovelace", "MR10001", 0))
            .unwrap();
        let created = repo.create(grant.clone()).await.unwrap();

        repo.discard(grant).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_discard_refuses_established_record() {
        let (store, repo, registry, admin) = setup();
        let seeded = patient("Ada", "Lovelace", "MR10001", 30);
        store.insert_patient(seeded.clone()).unwrap();
        let now = Utc::now();
        store
            .insert_task(Task {
                id: Uuid::new_v4(),
                patient_id: seeded.id,
                user_id: admin.id,
                title: "Follow up".to_string(),
                description: None,
                status: TaskStatus::Pending,
                due_date: now,
                completed_at: None,
                created_at: now,
                updated_at: now,
            })
            .unwrap();

        let grant = registry.grant_onboarding(seeded.clone(), None);
        assert!(matches!(
            repo.discard(grant).await.unwrap_err(),
            DbError::Conflict(_)
        ));
        assert!(repo.get_by_id(seeded.id).await.unwrap().is_some());
        assert_eq!(store.tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_discard_refuses_claimed_record() {
        let (store, repo, registry, admin) = setup();
        let grant = registry
            .grant(&admin, Action::Create, patient("Ada", "Lovelace", "MR10001", 0))
            .unwrap();
        let created = repo.create(grant.clone()).await.unwrap();
        let owner = Actor::new("ada@example.com", Role::Patient).with_patient(created.id);
        store.insert_actor(owner).unwrap();

        assert!(matches!(
            repo.discard(grant).await.unwrap_err(),
            DbError::Conflict(_)
        ));
        assert!(repo.get_by_id(created.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_filters_sorts_and_scopes() {
        let (store, repo, registry, admin) = setup();
        let mut inactive = patient("Carl", "Adams", "MR10003", 1);
        inactive.status = PatientStatus::Inactive;
        for p in [
            patient("Zed", "Young", "MR10001", 3),
            patient("Amy", "Young", "MR10002", 2),
            inactive,
        ] {
            store.insert_patient(p).unwrap();
        }

        let by_name = repo
            .list(
                registry
                    .authorized_scope(&admin, Query::all())
                    .unwrap()
                    .refine(|q| {
                        q.filter(PatientFilter::Status(PatientStatus::Active))
                            .sort_by(PatientSort::Name)
                    }),
            )
            .await
            .unwrap();
        let names: Vec<_> = by_name.items.iter().map(Patient::full_name).collect();
        assert_eq!(names, vec!["Amy Young", "Zed Young"]);

        let newest = repo
            .list(registry.authorized_scope(&admin, Query::all()).unwrap())
            .await
            .unwrap();
        assert_eq!(newest.items[0].first_name, "Carl");

        let search = registry
            .authorized_scope(&admin, Query::all())
            .unwrap()
            .refine(|q| q.filter(PatientFilter::Search("mr1000".to_string())));
        assert_eq!(repo.count(&search).await.unwrap(), 3);
    }
}
