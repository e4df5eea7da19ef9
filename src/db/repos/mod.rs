mod actors;
mod messages;
mod patients;
mod tasks;

pub use actors::*;
pub use messages::*;
pub use patients::*;
pub use tasks::*;

use super::error::{DbError, DbResult};
use crate::authz::{Action, Authorized, Resource};

/// Check that a capability was issued for one of `allowed` and for a
/// concrete record, returning the record id writes must be keyed on.
pub(crate) fn granted_record_id<R: Resource>(
    grant: &Authorized<R>,
    allowed: &[Action],
) -> DbResult<uuid::Uuid> {
    if grant.resource() != R::KIND || !allowed.contains(&grant.action()) {
        return Err(DbError::Internal(format!(
            "{} grant for '{}' cannot be used here",
            grant.resource(),
            grant.action()
        )));
    }
    grant
        .record_id()
        .ok_or_else(|| DbError::Internal(format!("{} grant has no record", grant.resource())))
}
