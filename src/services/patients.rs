use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use super::{ServiceError, ServiceResult};
use crate::{
    authz::{Action, Authorized, PolicyRegistry, Target},
    config::ListingConfig,
    db::{
        DbPool, MessageFilter, Page, PageRequest, PatientFilter, PatientSort, Query, TaskFilter,
    },
    models::{
        Actor, CreateActor, CreatePatient, Message, Patient, PatientStatus, Role, Task,
        TaskStatus, UpdatePatient,
    },
};

#[derive(Debug, Clone, Default)]
pub struct PatientListParams {
    pub status: Option<PatientStatus>,
    pub sort: Option<PatientSort>,
    /// 1-based page number
    pub page: Option<usize>,
}

/// A patient with the activity shown alongside it.
#[derive(Debug, Clone, Serialize)]
pub struct PatientDetail {
    pub patient: Patient,
    pub recent_messages: Vec<Message>,
    pub pending_tasks: Vec<Task>,
    pub completed_tasks: Vec<Task>,
}

/// Compact search hit.
#[derive(Debug, Clone, Serialize)]
pub struct PatientSearchResult {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub medical_record_number: String,
    pub status: PatientStatus,
}

impl From<Patient> for PatientSearchResult {
    fn from(patient: Patient) -> Self {
        Self {
            id: patient.id,
            full_name: patient.full_name(),
            email: patient.email,
            medical_record_number: patient.medical_record_number,
            status: patient.status,
        }
    }
}

const DETAIL_MESSAGES: usize = 10;
const DETAIL_PENDING_TASKS: usize = 10;
const DETAIL_COMPLETED_TASKS: usize = 5;

/// Service layer for patient records
#[derive(Clone)]
pub struct PatientService {
    db: Arc<DbPool>,
    authz: Arc<PolicyRegistry>,
    listing: ListingConfig,
}

impl PatientService {
    pub fn new(db: Arc<DbPool>, authz: Arc<PolicyRegistry>, listing: ListingConfig) -> Self {
        Self { db, authz, listing }
    }

    async fn load(&self, id: Uuid) -> ServiceResult<Patient> {
        self.db
            .patients()
            .get_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    /// Paginated listing, newest first unless a sort is given.
    pub async fn list(&self, actor: &Actor, params: PatientListParams) -> ServiceResult<Page<Patient>> {
        let per_page = self.listing.per_page;
        let query = self
            .authz
            .authorized_scope::<Patient>(actor, Query::all())?
            .refine(|mut q| {
                if let Some(status) = params.status {
                    q = q.filter(PatientFilter::Status(status));
                }
                if let Some(sort) = params.sort {
                    q = q.sort_by(sort);
                }
                q.paginate(PageRequest::new(params.page.unwrap_or(1), per_page))
            });
        Ok(self.db.patients().list(query).await?)
    }

    /// A patient with recent messages and tasks from the actor's task scope.
    pub async fn show(&self, actor: &Actor, id: Uuid) -> ServiceResult<PatientDetail> {
        let patient = self.load(id).await?;
        self.authz
            .authorize(actor, Action::View, Target::Record(&patient))?;

        let messages = self
            .authz
            .authorized_scope::<Message>(actor, Query::all())?
            .refine(|q| {
                q.filter(MessageFilter::ForPatient(patient.id))
                    .limit(DETAIL_MESSAGES)
            });
        let tasks = self
            .authz
            .authorized_scope::<Task>(actor, Query::all())?
            .refine(|q| q.filter(TaskFilter::ForPatient(patient.id)));
        let pending = tasks.clone().refine(|q| {
            q.filter(TaskFilter::Status(TaskStatus::Pending))
                .limit(DETAIL_PENDING_TASKS)
        });
        let completed = tasks.refine(|q| {
            q.filter(TaskFilter::Status(TaskStatus::Completed))
                .limit(DETAIL_COMPLETED_TASKS)
        });

        Ok(PatientDetail {
            recent_messages: self.db.messages().list(messages).await?.items,
            pending_tasks: self.db.tasks().list(pending).await?.items,
            completed_tasks: self.db.tasks().list(completed).await?.items,
            patient,
        })
    }

    /// Create a patient together with its patient-role account.
    pub async fn create(&self, actor: &Actor, input: CreatePatient) -> ServiceResult<Patient> {
        let grant = self
            .authz
            .grant(actor, Action::Create, input.build(Utc::now()))?;
        input.validate()?;
        let (patient, _account) = create_with_account(&self.db, grant).await?;
        Ok(patient)
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, input: UpdatePatient) -> ServiceResult<Patient> {
        let patient = self.load(id).await?;
        let grant = self.authz.grant_record(actor, Action::Update, patient)?;
        input.validate()?;
        let grant = grant.update(|p| input.apply_to(p));
        Ok(self.db.patients().update(grant).await?)
    }

    /// Delete a patient with its tasks and messages.
    pub async fn destroy(&self, actor: &Actor, id: Uuid) -> ServiceResult<()> {
        let patient = self.load(id).await?;
        let grant = self.authz.grant_record(actor, Action::Destroy, patient)?;
        self.db.patients().delete(grant).await?;
        tracing::info!(patient_id = %id, actor_id = %actor.id, "Patient deleted");
        Ok(())
    }

    /// Case-insensitive search on name, email and medical record number.
    /// Requires permission to list patients even for a blank term.
    pub async fn search(&self, actor: &Actor, term: &str) -> ServiceResult<Vec<PatientSearchResult>> {
        let scope = self.authz.authorized_scope::<Patient>(actor, Query::all())?;
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let limit = self.listing.search_limit;
        let query = scope.refine(|q| {
            q.filter(PatientFilter::Search(term.to_string()))
                .sort_by(PatientSort::Name)
                .limit(limit)
        });
        let page = self.db.patients().list(query).await?;
        Ok(page.items.into_iter().map(PatientSearchResult::from).collect())
    }
}

/// Insert a granted patient, then create and link its patient-role account.
/// The patient is removed again if the account cannot be created.
pub(crate) async fn create_with_account(
    db: &DbPool,
    grant: Authorized<Patient>,
) -> ServiceResult<(Patient, Actor)> {
    let patient = db.patients().create(grant.clone()).await?;

    let account = db
        .actors()
        .create(CreateActor {
            email: patient.email.clone(),
            role: Role::Patient,
        })
        .await;
    let account = match account {
        Ok(account) => account,
        Err(e) => {
            tracing::warn!(
                patient_id = %patient.id,
                error = %e,
                "Account creation failed, rolling back patient"
            );
            db.patients().discard(grant).await?;
            return Err(e.into());
        }
    };

    let actor = match db.actors().link_patient(account.id, patient.id).await {
        Ok(actor) => actor,
        Err(e) => {
            db.actors().delete(account.id).await?;
            db.patients().discard(grant).await?;
            return Err(e.into());
        }
    };
    let patient = db
        .patients()
        .get_by_id(patient.id)
        .await?
        .ok_or(ServiceError::NotFound)?;

    // Welcome e-mail delivery is handled outside this crate.
    tracing::info!(
        patient_id = %patient.id,
        actor_id = %actor.id,
        email = %actor.email,
        "Patient account created, welcome email pending"
    );
    Ok((patient, actor))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{
        models::{CreateMessage, CreateTask, MessageDirection},
        services::testing::{fixture, patient_input},
    };

    #[tokio::test]
    async fn test_create_links_account() {
        let fx = fixture().await;
        assert_eq!(fx.patient.user_id, Some(fx.patient_actor.id));
        assert_eq!(fx.patient_actor.patient_id, Some(fx.patient.id));
        assert_eq!(fx.patient_actor.role(), Some(Role::Patient));
    }

    #[tokio::test]
    async fn test_create_rolls_back_on_duplicate_email() {
        let fx = fixture().await;
        let mut input = patient_input("Second", "MR20002");
        input.email = fx.patient.email.clone();

        let err = fx.services.patients.create(&fx.admin, input).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert!(!fx.db.patients().mrn_exists("MR20002").await.unwrap());
    }

    #[tokio::test]
    async fn test_patient_role_cannot_create() {
        let fx = fixture().await;
        let err = fx
            .services
            .patients
            .create(&fx.patient_actor, patient_input("Other", "MR20003"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
        assert!(!fx.db.patients().mrn_exists("MR20003").await.unwrap());
    }

    #[tokio::test]
    async fn test_unauthorized_before_validation() {
        let fx = fixture().await;
        let mut input = patient_input("X", "bad");
        input.phone = "nope".to_string();
        let err = fx
            .services
            .patients
            .create(&fx.patient_actor, input)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_invalid_input_rejected_for_admin() {
        let fx = fixture().await;
        let mut input = patient_input("Valid", "MR20004");
        input.date_of_birth = (Utc::now() + Duration::days(2)).date_naive();
        let err = fx.services.patients.create(&fx.admin, input).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_patient_denied_own_record() {
        let fx = fixture().await;
        let err = fx
            .services
            .patients
            .show(&fx.patient_actor, fx.patient.id)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_missing_patient_not_found() {
        let fx = fixture().await;
        let err = fx
            .services
            .patients
            .show(&fx.admin, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound));
    }

    #[tokio::test]
    async fn test_show_collects_activity() {
        let fx = fixture().await;
        for i in 0..12 {
            fx.services
                .messages
                .create(
                    &fx.admin,
                    fx.patient.id,
                    CreateMessage {
                        content: format!("message {i}"),
                        direction: MessageDirection::Outgoing,
                    },
                )
                .await
                .unwrap();
        }
        let task = fx
            .services
            .tasks
            .create(
                &fx.admin,
                CreateTask {
                    patient_id: fx.patient.id,
                    title: "Call back".to_string(),
                    description: None,
                    status: TaskStatus::Pending,
                    due_date: Utc::now() + Duration::days(1),
                },
            )
            .await
            .unwrap();
        fx.services.tasks.complete(&fx.admin, task.id).await.unwrap();

        let detail = fx.services.patients.show(&fx.admin, fx.patient.id).await.unwrap();
        assert_eq!(detail.recent_messages.len(), 10);
        assert!(detail.pending_tasks.is_empty());
        assert_eq!(detail.completed_tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_list_paginates_and_filters() {
        let fx = fixture().await;
        for i in 0..3 {
            let mut input = patient_input(&format!("Extra{i}"), &format!("MR3000{i}"));
            input.status = PatientStatus::Inactive;
            fx.services.patients.create(&fx.admin, input).await.unwrap();
        }

        let inactive = fx
            .services
            .patients
            .list(
                &fx.admin,
                PatientListParams {
                    status: Some(PatientStatus::Inactive),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(inactive.total, 3);
        assert_eq!(inactive.per_page, Some(20));

        let err = fx
            .services
            .patients
            .list(&fx.patient_actor, PatientListParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_update_and_destroy() {
        let fx = fixture().await;
        let updated = fx
            .services
            .patients
            .update(
                &fx.admin,
                fx.patient.id,
                UpdatePatient {
                    last_name: Some("Byron".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.last_name, "Byron");
        assert_eq!(updated.user_id, Some(fx.patient_actor.id));

        fx.services.patients.destroy(&fx.admin, fx.patient.id).await.unwrap();
        let actor = fx.db.actors().get_by_id(fx.patient_actor.id).await.unwrap().unwrap();
        assert_eq!(actor.patient_id, None);
    }

    #[tokio::test]
    async fn test_search() {
        let fx = fixture().await;
        let hits = fx.services.patients.search(&fx.admin, "  love ").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].full_name, "Ada Lovelace");

        let by_mrn = fx.services.patients.search(&fx.admin, "mr1000").await.unwrap();
        assert_eq!(by_mrn.len(), 1);

        assert!(fx.services.patients.search(&fx.admin, "   ").await.unwrap().is_empty());

        let err = fx
            .services
            .patients
            .search(&fx.patient_actor, "")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_search_limit() {
        let fx = fixture().await;
        for i in 0..12 {
            fx.services
                .patients
                .create(&fx.admin, patient_input(&format!("Smith{i:02}"), &format!("MR400{i:02}")))
                .await
                .unwrap();
        }
        let hits = fx.services.patients.search(&fx.admin, "smith").await.unwrap();
        assert_eq!(hits.len(), 10);
    }
}
