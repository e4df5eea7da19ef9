//! Tasks are visible to both roles, but only staff create or delete them.
//!
//! Patient-role actors may reach the task listing, yet their scope is empty:
//! they only act on tasks they are handed directly.

use crate::{
    authz::{Action, RecordPolicy, ResourcePolicy},
    db::Query,
    models::{Actor, Role, Task},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct TaskPolicy;

impl TaskPolicy {
    fn any_role(actor: &Actor) -> bool {
        match actor.role() {
            Some(Role::Admin | Role::Patient) => true,
            None => false,
        }
    }

    fn admin_only(actor: &Actor) -> bool {
        match actor.role() {
            Some(Role::Admin) => true,
            Some(Role::Patient) | None => false,
        }
    }

    /// Allowed for both roles whatever the task's current status.
    pub fn can_complete(&self, actor: &Actor, _record: &Task) -> bool {
        Self::any_role(actor)
    }

    /// Allowed for both roles whatever the task's current status.
    pub fn can_reopen(&self, actor: &Actor, _record: &Task) -> bool {
        Self::any_role(actor)
    }
}

impl ResourcePolicy<Task> for TaskPolicy {
    fn name(&self) -> &'static str {
        "task"
    }

    fn can_list(&self, actor: &Actor) -> bool {
        Self::any_role(actor)
    }

    // No ownership check on the specific task.
    fn can_view(&self, actor: &Actor, _record: &Task) -> bool {
        Self::any_role(actor)
    }

    fn can_create(&self, actor: &Actor) -> bool {
        Self::admin_only(actor)
    }

    fn can_update(&self, actor: &Actor, _record: &Task) -> bool {
        Self::any_role(actor)
    }

    fn can_destroy(&self, actor: &Actor, _record: &Task) -> bool {
        Self::admin_only(actor)
    }

    fn can_perform(&self, actor: &Actor, action: Action, record: Option<&Task>) -> bool {
        match (action, record) {
            (Action::Complete, Some(task)) => self.can_complete(actor, task),
            (Action::Reopen, Some(task)) => self.can_reopen(actor, task),
            _ => false,
        }
    }
}

impl RecordPolicy<Task> for TaskPolicy {
    fn scope(&self, actor: &Actor, query: Query<Task>) -> Query<Task> {
        match actor.role() {
            Some(Role::Admin) => query,
            // Listing is allowed but shows nothing.
            Some(Role::Patient) | None => query.none(),
        }
    }
}
