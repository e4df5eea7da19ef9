//! Policy traits.

use super::{Action, Resource};
use crate::{
    db::{Query, Record},
    models::Actor,
};

/// What an authorization check is made against.
#[derive(Debug)]
pub enum Target<'a, R> {
    /// The resource type as a whole: listings, creation.
    Kind,
    /// One already-loaded record.
    Record(&'a R),
}

impl<R> Clone for Target<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Target<'_, R> {}

impl<'a, R> Target<'a, R> {
    pub fn record(&self) -> Option<&'a R> {
        match self {
            Self::Kind => None,
            Self::Record(r) => Some(r),
        }
    }
}

/// Action predicates for one resource type.
///
/// Every predicate is a pure function of the actor and the record. None of
/// them may load anything.
pub trait ResourcePolicy<R: Resource>: Send + Sync {
    /// Name used in audit logs.
    fn name(&self) -> &'static str;

    fn can_list(&self, actor: &Actor) -> bool;

    fn can_view(&self, actor: &Actor, record: &R) -> bool;

    fn can_create(&self, actor: &Actor) -> bool;

    fn can_update(&self, actor: &Actor, record: &R) -> bool;

    fn can_destroy(&self, actor: &Actor, record: &R) -> bool;

    /// Resource-specific actions. Denied unless the policy defines them.
    fn can_perform(&self, _actor: &Actor, _action: Action, _record: Option<&R>) -> bool {
        false
    }

    /// Dispatch an action to its predicate.
    ///
    /// Record-level actions against [`Target::Kind`] are denied: view, update
    /// and destroy always need the record they apply to.
    fn permits(&self, actor: &Actor, action: Action, target: Target<'_, R>) -> bool {
        match (action, target) {
            (Action::List, _) => self.can_list(actor),
            (Action::Create, _) => self.can_create(actor),
            (Action::View, Target::Record(r)) => self.can_view(actor, r),
            (Action::Update, Target::Record(r)) => self.can_update(actor, r),
            (Action::Destroy, Target::Record(r)) => self.can_destroy(actor, r),
            (Action::View | Action::Update | Action::Destroy, Target::Kind) => false,
            (action, target) => self.can_perform(actor, action, target.record()),
        }
    }
}

/// A policy over a queryable collection, adding the scope resolver.
pub trait RecordPolicy<R: Record>: ResourcePolicy<R> {
    /// Narrow `query` to the records `actor` may observe in listings.
    fn scope(&self, actor: &Actor, query: Query<R>) -> Query<R>;
}
