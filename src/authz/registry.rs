//! Policy registry: maps each resource type to its policy and is the single
//! entry point for authorization decisions.
//!
//! # Usage
//!
//! ```rust,ignore
//! let registry = PolicyRegistry::new(&config.authz);
//!
//! // Class-level check
//! registry.authorize::<Task>(&actor, Action::Create, Target::Kind)?;
//!
//! // Record-level capability, required by the task repository
//! let grant = registry.grant_record(&actor, Action::Complete, task)?;
//!
//! // Scoped listing, required by repository list calls
//! let query = registry.authorized_scope(&actor, Query::<Task>::all())?;
//! ```
//!
//! Adding a resource type takes one [`ResourcePolicy`] implementation and one
//! [`PolicyFor`] entry here. Call sites need no changes.

use uuid::Uuid;

use super::{
    Action, AuthzError, AuthzResult, Authorized, Dashboard, DashboardPolicy, MessagePolicy,
    PatientPolicy, RecordPolicy, Resource, ResourceKind, ResourcePolicy, Target, TaskPolicy,
};
use crate::{
    config::{AuthzAuditConfig, AuthzConfig},
    db::{Query, Record},
    models::{Actor, Message, Patient, Task},
};

/// Compile-time lookup of the policy for resource type `R`.
pub trait PolicyFor<R: Resource> {
    type Policy: ResourcePolicy<R>;

    fn policy(&self) -> &Self::Policy;
}

/// Holds one policy per resource type.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    patients: PatientPolicy,
    tasks: TaskPolicy,
    messages: MessagePolicy,
    dashboard: DashboardPolicy,
    audit: AuthzAuditConfig,
}

impl PolicyFor<Patient> for PolicyRegistry {
    type Policy = PatientPolicy;

    fn policy(&self) -> &PatientPolicy {
        &self.patients
    }
}

impl PolicyFor<Task> for PolicyRegistry {
    type Policy = TaskPolicy;

    fn policy(&self) -> &TaskPolicy {
        &self.tasks
    }
}

impl PolicyFor<Message> for PolicyRegistry {
    type Policy = MessagePolicy;

    fn policy(&self) -> &MessagePolicy {
        &self.messages
    }
}

impl PolicyFor<Dashboard> for PolicyRegistry {
    type Policy = DashboardPolicy;

    fn policy(&self) -> &DashboardPolicy {
        &self.dashboard
    }
}

impl PolicyRegistry {
    pub fn new(config: &AuthzConfig) -> Self {
        Self {
            audit: config.audit.clone(),
            ..Default::default()
        }
    }

    /// The policy registered for `R`.
    pub fn policy_for<R: Resource>(&self) -> &<Self as PolicyFor<R>>::Policy
    where
        Self: PolicyFor<R>,
    {
        <Self as PolicyFor<R>>::policy(self)
    }

    /// Evaluate a decision without turning it into an error.
    pub fn check<R: Resource>(
        &self,
        actor: &Actor,
        action: Action,
        target: Target<'_, R>,
    ) -> AuthzResult
    where
        Self: PolicyFor<R>,
    {
        let policy = self.policy_for::<R>();
        let name = policy.name();

        let result = match actor.role() {
            None => AuthzResult::deny_unresolved_role(name),
            Some(role) => {
                if policy.permits(actor, action, target) {
                    AuthzResult::allow_by_policy(name)
                } else if action.is_record_level() && target.record().is_none() {
                    AuthzResult::deny_by_policy(
                        name,
                        format!("'{action}' on {} requires a record", R::KIND),
                    )
                } else {
                    AuthzResult::deny_by_policy(
                        name,
                        format!("Role '{role}' may not {action} {}", R::KIND),
                    )
                }
            }
        };

        let record_id = target.record().and_then(Resource::record_id);
        self.log_decision(actor, R::KIND, action, record_id, &result);
        result
    }

    /// Authorize `action`, failing with the generic unauthorized error.
    pub fn authorize<R: Resource>(
        &self,
        actor: &Actor,
        action: Action,
        target: Target<'_, R>,
    ) -> Result<(), AuthzError>
    where
        Self: PolicyFor<R>,
    {
        if self.check(actor, action, target).allowed {
            Ok(())
        } else {
            Err(AuthzError::unauthorized(R::KIND, action))
        }
    }

    /// Narrow `query` to what `actor` may observe. Does not check `List`.
    pub fn scope_for<R: Record>(&self, actor: &Actor, query: Query<R>) -> Query<R>
    where
        Self: PolicyFor<R>,
        <Self as PolicyFor<R>>::Policy: RecordPolicy<R>,
    {
        self.policy_for::<R>().scope(actor, query)
    }

    /// Authorize a class-level action (typically `Create`) and wrap the
    /// payload it applies to.
    pub fn grant<R: Resource>(
        &self,
        actor: &Actor,
        action: Action,
        payload: R,
    ) -> Result<Authorized<R>, AuthzError>
    where
        Self: PolicyFor<R>,
    {
        self.authorize::<R>(actor, action, Target::Kind)?;
        let record_id = payload.record_id();
        Ok(Authorized::new(payload, R::KIND, action, actor.id, record_id))
    }

    /// Authorize a record-level action against an already-loaded record.
    pub fn grant_record<R: Resource>(
        &self,
        actor: &Actor,
        action: Action,
        record: R,
    ) -> Result<Authorized<R>, AuthzError>
    where
        Self: PolicyFor<R>,
    {
        self.authorize(actor, action, Target::Record(&record))?;
        let record_id = record.record_id();
        Ok(Authorized::new(record, R::KIND, action, actor.id, record_id))
    }

    /// Authorize `List` and apply the scope in one step.
    pub fn authorized_scope<R: Record>(
        &self,
        actor: &Actor,
        base: Query<R>,
    ) -> Result<Authorized<Query<R>>, AuthzError>
    where
        Self: PolicyFor<R>,
        <Self as PolicyFor<R>>::Policy: RecordPolicy<R>,
    {
        self.authorize::<R>(actor, Action::List, Target::Kind)?;
        let scoped = self.scope_for(actor, base);
        Ok(Authorized::new(scoped, R::KIND, Action::List, actor.id, None))
    }

    /// Capability for the onboarding flows, which insert a patient record
    /// that no actor could be granted through a policy: self-registration
    /// (no actor yet) and first-login linking of a patient-role actor.
    ///
    /// `on_behalf_of` is the actor being onboarded, if one exists.
    pub(crate) fn grant_onboarding(
        &self,
        patient: Patient,
        on_behalf_of: Option<Uuid>,
    ) -> Authorized<Patient> {
        tracing::debug!(
            patient_id = %patient.id,
            actor_id = ?on_behalf_of,
            "Issuing onboarding grant"
        );
        let record_id = Some(patient.id);
        Authorized::new(
            patient,
            ResourceKind::Patient,
            Action::Create,
            on_behalf_of.unwrap_or_else(Uuid::nil),
            record_id,
        )
    }

    fn log_decision(
        &self,
        actor: &Actor,
        resource: ResourceKind,
        action: Action,
        record_id: Option<Uuid>,
        result: &AuthzResult,
    ) {
        let role = actor.role().map(|r| r.as_str()).unwrap_or("unresolved");
        let record_id = record_id.map(|id| id.to_string());
        if result.allowed {
            if self.audit.log_allowed {
                tracing::debug!(
                    actor_id = %actor.id,
                    role,
                    resource = %resource,
                    action = %action,
                    record_id = record_id.as_deref(),
                    policy = result.policy_name,
                    "Authorization allowed"
                );
            }
        } else if self.audit.log_denied {
            tracing::info!(
                actor_id = %actor.id,
                role,
                resource = %resource,
                action = %action,
                record_id = record_id.as_deref(),
                policy = result.policy_name,
                reason = result.reason.as_deref(),
                "Authorization denied"
            );
        }
    }
}
