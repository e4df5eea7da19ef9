//! Patient onboarding.
//!
//! Two paths create a patient without an admin granting it: public
//! self-registration and the first login of a patient-role actor that has no
//! linked record yet. Both go through [`PolicyRegistry::grant_onboarding`].

use std::sync::Arc;

use chrono::{DateTime, Duration, Months, Utc};
use rand::{Rng, RngCore};
use serde::Serialize;
use validator::Validate;

use super::{ServiceError, ServiceResult, patients::create_with_account};
use crate::{
    authz::{Action, PolicyRegistry},
    config::RegistrationConfig,
    db::{DbError, DbPool},
    models::{Actor, CreateTask, Patient, PatientApplication, PatientStatus, Task, TaskStatus},
};

const MRN_ATTEMPTS: usize = 10;
const PLACEHOLDER_PHONE: &str = "0000000000";
const PLACEHOLDER_AGE_MONTHS: u32 = 18 * 12;
const PLACEHOLDER_HEALTH_ANSWERS: [&str; 3] =
    ["health answer 1", "health answer 2", "health answer 3"];

/// Result of a self-registration.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub patient: Patient,
    pub actor: Actor,
    /// Follow-up task for staff, absent when it could not be created
    pub applicant_task: Option<Task>,
}

#[derive(Clone)]
pub struct RegistrationService {
    db: Arc<DbPool>,
    authz: Arc<PolicyRegistry>,
    config: RegistrationConfig,
}

impl RegistrationService {
    pub fn new(db: Arc<DbPool>, authz: Arc<PolicyRegistry>, config: RegistrationConfig) -> Self {
        Self { db, authz, config }
    }

    /// Register a new patient and their account.
    ///
    /// The patient is active and gets a random 9-digit medical record
    /// number. If the account cannot be created the patient is removed
    /// again. Staff get a follow-up task, but failing to create it does not
    /// fail the registration.
    pub async fn register(&self, application: PatientApplication) -> ServiceResult<Registration> {
        application.validate()?;
        let mrn = self.allocate_mrn(random_mrn).await?;
        let input = application.into_create(mrn);
        input.validate()?;

        let grant = self.authz.grant_onboarding(input.build(Utc::now()), None);
        let (patient, actor) = create_with_account(&self.db, grant).await?;
        tracing::info!(
            patient_id = %patient.id,
            actor_id = %actor.id,
            "Patient self-registered"
        );

        let applicant_task = match self.create_applicant_task(&patient).await {
            Ok(task) => task,
            Err(e) => {
                tracing::warn!(
                    patient_id = %patient.id,
                    error = %e,
                    "Failed to create applicant task"
                );
                None
            }
        };

        Ok(Registration {
            patient,
            actor,
            applicant_task,
        })
    }

    /// Draw medical record numbers from `generate` until one is free.
    async fn allocate_mrn(&self, generate: fn() -> String) -> ServiceResult<String> {
        for _ in 0..MRN_ATTEMPTS {
            let candidate = generate();
            if !self.db.patients().mrn_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(ServiceError::Internal(
            "Could not allocate a medical record number".to_string(),
        ))
    }

    /// Task for the first admin to verify the applicant.
    async fn create_applicant_task(&self, patient: &Patient) -> ServiceResult<Option<Task>> {
        let Some(admin) = self.db.actors().first_admin().await? else {
            tracing::warn!(patient_id = %patient.id, "No admin to assign the applicant task to");
            return Ok(None);
        };

        let now = Utc::now();
        let input = CreateTask {
            patient_id: patient.id,
            title: format!("New Applicant - {}", patient.full_name()),
            description: Some(self.config.applicant_task_description.clone()),
            status: TaskStatus::Pending,
            due_date: now + Duration::days(i64::from(self.config.applicant_task_due_days)),
        };
        let grant = self
            .authz
            .grant(&admin, Action::Create, input.build(admin.id, now))?;
        input.validate()?;
        Ok(Some(self.db.tasks().create(grant).await?))
    }

    /// Find or create the patient record of a patient-role actor.
    ///
    /// A missing record is replaced by an active placeholder that staff
    /// complete later. Returns `None` for actors that are not patients.
    pub async fn ensure_patient_record(&self, actor: &Actor) -> ServiceResult<Option<Patient>> {
        if !actor.is_patient() {
            return Ok(None);
        }
        if let Some(patient_id) = actor.patient_id
            && let Some(patient) = self.db.patients().get_by_id(patient_id).await?
        {
            return Ok(Some(patient));
        }
        if let Some(patient) = self.db.patients().get_by_owner(actor.id).await? {
            return Ok(Some(patient));
        }

        let mrn = self.allocate_mrn(placeholder_mrn).await?;
        let placeholder = self.placeholder_for(actor, mrn, Utc::now());
        let grant = self.authz.grant_onboarding(placeholder, Some(actor.id));
        let patient = self.db.patients().create(grant.clone()).await?;

        match self.db.actors().link_patient(actor.id, patient.id).await {
            Ok(_) => {}
            // Linked concurrently: keep the record that won.
            Err(DbError::Conflict(reason)) => {
                tracing::debug!(actor_id = %actor.id, reason = %reason, "Placeholder lost link race");
                self.db.patients().discard(grant).await?;
                return Ok(self.db.patients().get_by_owner(actor.id).await?);
            }
            Err(e) => {
                self.db.patients().discard(grant).await?;
                return Err(e.into());
            }
        }

        tracing::info!(
            actor_id = %actor.id,
            patient_id = %patient.id,
            "Created placeholder patient record"
        );
        Ok(self.db.patients().get_by_id(patient.id).await?)
    }

    fn placeholder_for(&self, actor: &Actor, mrn: String, now: DateTime<Utc>) -> Patient {
        let today = now.date_naive();
        let [one, two, three] = PLACEHOLDER_HEALTH_ANSWERS.map(|a| Some(a.to_string()));
        Patient {
            id: uuid::Uuid::new_v4(),
            first_name: self.config.placeholder_first_name.clone(),
            last_name: self.config.placeholder_last_name.clone(),
            email: actor.email.clone(),
            phone: PLACEHOLDER_PHONE.to_string(),
            date_of_birth: today
                .checked_sub_months(Months::new(PLACEHOLDER_AGE_MONTHS))
                .unwrap_or(today),
            medical_record_number: mrn,
            status: PatientStatus::Active,
            user_id: None,
            health_question_one: one,
            health_question_two: two,
            health_question_three: three,
            created_at: now,
            updated_at: now,
        }
    }
}

fn random_mrn() -> String {
    format!("{:09}", rand::thread_rng().gen_range(0..1_000_000_000u32))
}

/// "MR" followed by 8 upper-case hex digits.
fn placeholder_mrn() -> String {
    let mut bytes = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("MR{}", hex::encode_upper(bytes))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        models::Role,
        services::testing::{fixture, services_for},
    };

    fn application(email: &str) -> PatientApplication {
        PatientApplication {
            first_name: "Mary".to_string(),
            last_name: "Seacole".to_string(),
            email: email.to_string(),
            phone: "5550001111".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
            health_question_one: Some("None".to_string()),
            health_question_two: None,
            health_question_three: None,
        }
    }

    #[test]
    fn test_mrn_formats() {
        let mrn = random_mrn();
        assert_eq!(mrn.len(), 9);
        assert!(mrn.chars().all(|c| c.is_ascii_digit()));

        let placeholder = placeholder_mrn();
        assert_eq!(placeholder.len(), 10);
        assert!(placeholder.starts_with("MR"));
        assert!(
            placeholder[2..]
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[tokio::test]
    async fn test_register_creates_account_and_applicant_task() {
        let fx = fixture().await;
        let registration = fx
            .services
            .registration
            .register(application("mary@example.com"))
            .await
            .unwrap();

        assert_eq!(registration.patient.status, PatientStatus::Active);
        assert_eq!(registration.patient.medical_record_number.len(), 9);
        assert_eq!(registration.patient.user_id, Some(registration.actor.id));
        assert_eq!(registration.actor.role(), Some(Role::Patient));

        let task = registration.applicant_task.unwrap();
        assert_eq!(task.title, "New Applicant - Mary Seacole");
        assert_eq!(task.user_id, fx.admin.id);
        assert_eq!(task.description.as_deref(), Some("Verify ID & prep for provider"));
        let due_in = task.due_date - task.created_at;
        assert_eq!(due_in.num_days(), 3);
    }

    #[tokio::test]
    async fn test_register_duplicate_email_rolls_back() {
        let fx = fixture().await;
        let err = fx
            .services
            .registration
            .register(application(&fx.patient_actor.email))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let all = fx
            .services
            .patients
            .search(&fx.admin, "seacole")
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_register_without_admin_still_succeeds() {
        let services = services_for(Arc::new(DbPool::in_memory()));
        let registration = services
            .registration
            .register(application("solo@example.com"))
            .await
            .unwrap();
        assert!(registration.applicant_task.is_none());
    }

    #[tokio::test]
    async fn test_register_validates_application() {
        let fx = fixture().await;
        let mut bad = application("not-an-email");
        bad.phone = "12".to_string();
        let err = fx.services.registration.register(bad).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_ensure_patient_record_creates_placeholder_once() {
        let fx = fixture().await;
        let actor = fx
            .db
            .actors()
            .create(crate::models::CreateActor {
                email: "late@example.com".to_string(),
                role: Role::Patient,
            })
            .await
            .unwrap();

        let first = fx
            .services
            .registration
            .ensure_patient_record(&actor)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.first_name, "New");
        assert_eq!(first.last_name, "Patient");
        assert_eq!(first.phone, "0000000000");
        assert_eq!(first.user_id, Some(actor.id));
        assert!(first.medical_record_number.starts_with("MR"));
        assert_eq!(first.age_on(Utc::now().date_naive()), 18);
        assert_eq!(first.health_question_one.as_deref(), Some("health answer 1"));
        assert_eq!(first.health_question_two.as_deref(), Some("health answer 2"));
        assert_eq!(first.health_question_three.as_deref(), Some("health answer 3"));

        let second = fx
            .services
            .registration
            .ensure_patient_record(&actor)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_mrn_allocation_gives_up_when_every_draw_is_taken() {
        fn taken() -> String {
            "MR10001".to_string()
        }
        let fx = fixture().await;
        let err = fx
            .services
            .registration
            .allocate_mrn(taken)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Internal(_)));

        let fresh = fx
            .services
            .registration
            .allocate_mrn(placeholder_mrn)
            .await
            .unwrap();
        assert_ne!(fresh, fx.patient.medical_record_number);
    }

    #[tokio::test]
    async fn test_ensure_patient_record_existing_and_admin() {
        let fx = fixture().await;
        let existing = fx
            .services
            .registration
            .ensure_patient_record(&fx.patient_actor)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(existing.id, fx.patient.id);

        let none = fx
            .services
            .registration
            .ensure_patient_record(&fx.admin)
            .await
            .unwrap();
        assert!(none.is_none());
    }
}
