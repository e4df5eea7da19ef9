//! Messages: both roles read and write, patients edit only what they wrote.
//!
//! As with tasks, a patient-role actor may reach the listing but its scope
//! is empty.

use crate::{
    authz::{RecordPolicy, ResourcePolicy},
    db::Query,
    models::{Actor, Message, Role},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct MessagePolicy;

impl ResourcePolicy<Message> for MessagePolicy {
    fn name(&self) -> &'static str {
        "message"
    }

    fn can_list(&self, actor: &Actor) -> bool {
        actor.role().is_some()
    }

    // No ownership check: any patient-role actor may read a message it is
    // handed directly.
    fn can_view(&self, actor: &Actor, _record: &Message) -> bool {
        actor.role().is_some()
    }

    fn can_create(&self, actor: &Actor) -> bool {
        actor.role().is_some()
    }

    fn can_update(&self, actor: &Actor, record: &Message) -> bool {
        match actor.role() {
            Some(Role::Admin) => true,
            Some(Role::Patient) => record.is_authored_by(actor.id),
            None => false,
        }
    }

    fn can_destroy(&self, actor: &Actor, _record: &Message) -> bool {
        actor.is_admin()
    }
}

impl RecordPolicy<Message> for MessagePolicy {
    fn scope(&self, actor: &Actor, query: Query<Message>) -> Query<Message> {
        match actor.role() {
            Some(Role::Admin) => query,
            Some(Role::Patient) | None => query.none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::{
        authz::{Action, Target},
        models::MessageDirection,
    };

    fn message_by(author: Uuid) -> Message {
        let now = Utc::now();
        Message {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            user_id: author,
            content: "Your results are in".to_string(),
            direction: MessageDirection::Outgoing,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_admin_can_do_everything() {
        let admin = Actor::new("admin@example.com", Role::Admin);
        let msg = message_by(Uuid::new_v4());
        for action in [
            Action::List,
            Action::View,
            Action::Create,
            Action::Update,
            Action::Destroy,
        ] {
            assert!(MessagePolicy.permits(&admin, action, Target::Record(&msg)), "{action}");
        }
    }

    #[test]
    fn test_patient_updates_only_own_messages() {
        let admin = Actor::new("admin@example.com", Role::Admin);
        let patient = Actor::new("pat@example.com", Role::Patient);
        let own = message_by(patient.id);
        let admins = message_by(admin.id);
        let someone_elses = message_by(Uuid::new_v4());

        assert!(MessagePolicy.can_update(&patient, &own));
        assert!(!MessagePolicy.can_update(&patient, &admins));
        assert!(!MessagePolicy.can_update(&patient, &someone_elses));
    }

    #[test]
    fn test_patient_cannot_destroy_even_own_message() {
        let patient = Actor::new("pat@example.com", Role::Patient);
        let own = message_by(patient.id);
        assert!(!MessagePolicy.can_destroy(&patient, &own));
    }

    #[test]
    fn test_patient_reads_and_creates() {
        let patient = Actor::new("pat@example.com", Role::Patient);
        let foreign = message_by(Uuid::new_v4());
        assert!(MessagePolicy.can_list(&patient));
        assert!(MessagePolicy.can_view(&patient, &foreign));
        assert!(MessagePolicy.can_create(&patient));
    }

    #[test]
    fn test_task_actions_not_defined_for_messages() {
        let admin = Actor::new("admin@example.com", Role::Admin);
        let msg = message_by(admin.id);
        assert!(!MessagePolicy.permits(&admin, Action::Complete, Target::Record(&msg)));
    }

    #[test]
    fn test_patient_scope_is_empty() {
        let patient = Actor::new("pat@example.com", Role::Patient);
        assert!(MessagePolicy.scope(&patient, Query::all()).is_nothing());
    }
}
