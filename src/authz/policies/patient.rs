//! Patient records are staff-only.
//!
//! Patient-role actors cannot list, view, create, update or destroy any
//! patient record, including the one linked to their own account.

use crate::{
    authz::{RecordPolicy, ResourcePolicy},
    db::Query,
    models::{Actor, Patient, Role},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct PatientPolicy;

impl PatientPolicy {
    fn admin_only(actor: &Actor) -> bool {
        match actor.role() {
            Some(Role::Admin) => true,
            Some(Role::Patient) | None => false,
        }
    }
}

impl ResourcePolicy<Patient> for PatientPolicy {
    fn name(&self) -> &'static str {
        "patient"
    }

    fn can_list(&self, actor: &Actor) -> bool {
        Self::admin_only(actor)
    }

    fn can_view(&self, actor: &Actor, _record: &Patient) -> bool {
        Self::admin_only(actor)
    }

    fn can_create(&self, actor: &Actor) -> bool {
        Self::admin_only(actor)
    }

    fn can_update(&self, actor: &Actor, _record: &Patient) -> bool {
        Self::admin_only(actor)
    }

    fn can_destroy(&self, actor: &Actor, _record: &Patient) -> bool {
        Self::admin_only(actor)
    }
}

impl RecordPolicy<Patient> for PatientPolicy {
    fn scope(&self, actor: &Actor, query: Query<Patient>) -> Query<Patient> {
        match actor.role() {
            Some(Role::Admin) => query,
            Some(Role::Patient) | None => query.none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rstest::rstest;
    use uuid::Uuid;

    use super::*;
    use crate::{authz::Action, authz::Target, models::PatientStatus};

    fn patient_record(owner: Option<Uuid>) -> Patient {
        let now = Utc::now();
        Patient {
            id: Uuid::new_v4(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: "grace@example.com".to_string(),
            phone: "5550001111".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
            medical_record_number: "MR00042".to_string(),
            status: PatientStatus::Active,
            user_id: owner,
            health_question_one: None,
            health_question_two: None,
            health_question_three: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[rstest]
    #[case(Action::List)]
    #[case(Action::View)]
    #[case(Action::Create)]
    #[case(Action::Update)]
    #[case(Action::Destroy)]
    fn test_admin_allowed(#[case] action: Action) {
        let admin = Actor::new("admin@example.com", Role::Admin);
        let record = patient_record(None);
        assert!(PatientPolicy.permits(&admin, action, Target::Record(&record)));
    }

    #[rstest]
    #[case(Action::List)]
    #[case(Action::View)]
    #[case(Action::Create)]
    #[case(Action::Update)]
    #[case(Action::Destroy)]
    fn test_patient_denied_even_on_own_record(#[case] action: Action) {
        let mut actor = Actor::new("pat@example.com", Role::Patient);
        let own = patient_record(Some(actor.id));
        actor = actor.with_patient(own.id);
        assert!(!PatientPolicy.permits(&actor, action, Target::Record(&own)));
        assert!(!PatientPolicy.permits(&actor, action, Target::Kind));
    }

    #[test]
    fn test_custom_actions_denied_for_admin() {
        let admin = Actor::new("admin@example.com", Role::Admin);
        let record = patient_record(None);
        assert!(!PatientPolicy.permits(&admin, Action::Complete, Target::Record(&record)));
        assert!(!PatientPolicy.permits(&admin, Action::Reopen, Target::Record(&record)));
    }

    #[test]
    fn test_scope() {
        let admin = Actor::new("admin@example.com", Role::Admin);
        let patient = Actor::new("pat@example.com", Role::Patient);
        assert!(!PatientPolicy.scope(&admin, Query::all()).is_nothing());
        assert!(PatientPolicy.scope(&patient, Query::all()).is_nothing());
    }
}
