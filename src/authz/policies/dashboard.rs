//! The landing page. Not backed by records.

use uuid::Uuid;

use crate::{
    authz::{Resource, ResourceKind, ResourcePolicy},
    models::Actor,
};

/// Marker for the dashboard pseudo-resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dashboard;

impl Resource for Dashboard {
    const KIND: ResourceKind = ResourceKind::Dashboard;

    fn record_id(&self) -> Option<Uuid> {
        None
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardPolicy;

impl ResourcePolicy<Dashboard> for DashboardPolicy {
    fn name(&self) -> &'static str {
        "dashboard"
    }

    /// The index gate: any signed-in actor with a resolved role.
    fn can_list(&self, actor: &Actor) -> bool {
        actor.role().is_some()
    }

    fn can_view(&self, _actor: &Actor, _record: &Dashboard) -> bool {
        false
    }

    fn can_create(&self, _actor: &Actor) -> bool {
        false
    }

    fn can_update(&self, _actor: &Actor, _record: &Dashboard) -> bool {
        false
    }

    fn can_destroy(&self, _actor: &Actor, _record: &Dashboard) -> bool {
        false
    }
}
