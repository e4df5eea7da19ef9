mod dashboard;
mod error;
mod messages;
mod patients;
mod registration;
mod tasks;

use std::sync::Arc;

pub use dashboard::{DashboardService, DashboardSummary};
pub use error::{ServiceError, ServiceResult};
pub use messages::MessageService;
pub use patients::{PatientDetail, PatientListParams, PatientSearchResult, PatientService};
pub use registration::{Registration, RegistrationService};
pub use tasks::{TaskListParams, TaskListing, TaskService, TaskStats};

use crate::{authz::PolicyRegistry, config::AppConfig, db::DbPool};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub patients: PatientService,
    pub tasks: TaskService,
    pub messages: MessageService,
    pub dashboard: DashboardService,
    pub registration: RegistrationService,
}

impl Services {
    pub fn new(db: Arc<DbPool>, authz: Arc<PolicyRegistry>, config: &AppConfig) -> Self {
        let tasks = TaskService::new(db.clone(), authz.clone(), config.listing.clone());
        Self {
            patients: PatientService::new(db.clone(), authz.clone(), config.listing.clone()),
            messages: MessageService::new(db.clone(), authz.clone(), config.listing.clone()),
            dashboard: DashboardService::new(db.clone(), authz.clone(), tasks.clone()),
            registration: RegistrationService::new(db, authz, config.registration.clone()),
            tasks,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{Actor, CreateActor, CreatePatient, Patient, PatientStatus, Role};

    /// A store with one admin and one linked patient.
    pub(crate) struct Fixture {
        pub db: Arc<DbPool>,
        pub services: Services,
        pub admin: Actor,
        pub patient_actor: Actor,
        pub patient: Patient,
    }

    pub(crate) fn services_for(db: Arc<DbPool>) -> Services {
        Services::new(db, Arc::new(PolicyRegistry::default()), &AppConfig::default())
    }

    pub(crate) fn patient_input(last_name: &str, mrn: &str) -> CreatePatient {
        CreatePatient {
            first_name: "Test".to_string(),
            last_name: last_name.to_string(),
            email: format!("{}@example.com", last_name.to_lowercase()),
            phone: "5551234567".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1980, 1, 15).unwrap(),
            medical_record_number: mrn.to_string(),
            status: PatientStatus::Active,
            health_question_one: None,
            health_question_two: None,
            health_question_three: None,
        }
    }

    pub(crate) async fn fixture() -> Fixture {
        let db = Arc::new(DbPool::in_memory());
        let services = services_for(db.clone());
        let admin = db
            .actors()
            .create(CreateActor {
                email: "admin@example.com".to_string(),
                role: Role::Admin,
            })
            .await
            .unwrap();

        let mut input = patient_input("Lovelace", "MR10001");
        input.first_name = "Ada".to_string();
        input.email = "ada@example.com".to_string();
        let patient = services.patients.create(&admin, input).await.unwrap();
        let patient_actor = db
            .actors()
            .get_by_email("ada@example.com")
            .await
            .unwrap()
            .unwrap();

        Fixture {
            db,
            services,
            admin,
            patient_actor,
            patient,
        }
    }
}
