//! Capability tokens proving an authorization check succeeded.
//!
//! Repository methods that mutate or list records take an [`Authorized`]
//! value instead of a bare record or query. The only way to build one is
//! through [`PolicyRegistry`](super::PolicyRegistry), so skipping the check
//! does not compile.

use uuid::Uuid;

use super::{Action, ResourceKind};

/// A value the actor has been authorized to act on.
#[derive(Debug, Clone)]
pub struct Authorized<T> {
    inner: T,
    resource: ResourceKind,
    action: Action,
    actor_id: Uuid,
    /// Record the check was made against, for record-level grants
    record_id: Option<Uuid>,
}

impl<T> Authorized<T> {
    pub(super) fn new(
        inner: T,
        resource: ResourceKind,
        action: Action,
        actor_id: Uuid,
        record_id: Option<Uuid>,
    ) -> Self {
        Self {
            inner,
            resource,
            action,
            actor_id,
            record_id,
        }
    }

    pub fn get(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn resource(&self) -> ResourceKind {
        self.resource
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// The actor the grant was issued to.
    pub fn actor_id(&self) -> Uuid {
        self.actor_id
    }

    /// The record the grant covers. Repositories key writes on this rather
    /// than on whatever id the inner value carries.
    pub fn record_id(&self) -> Option<Uuid> {
        self.record_id
    }

    /// Modify the granted value in place. The grant still covers only the
    /// original record. Crate-private: callers outside the services cannot
    /// rewrite a payload after the check.
    pub(crate) fn update(mut self, f: impl FnOnce(&mut T)) -> Self {
        f(&mut self.inner);
        self
    }
}
