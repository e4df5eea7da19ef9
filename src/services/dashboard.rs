use std::sync::Arc;

use serde::Serialize;

use super::{ServiceResult, TaskService, TaskStats};
use crate::{
    authz::{Action, Dashboard, PolicyRegistry, ResourcePolicy, Target},
    db::{DbPool, MessageFilter, PatientFilter, Query},
    models::{Actor, Message, Patient, PatientStatus},
};

/// Landing-page counts, each drawn from the actor's own scopes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardSummary {
    /// `None` when the actor may not list patients at all
    pub patients: Option<usize>,
    pub active_patients: Option<usize>,
    pub tasks: TaskStats,
    pub messages: usize,
    pub messages_last_hour: usize,
}

#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DbPool>,
    authz: Arc<PolicyRegistry>,
    tasks: TaskService,
}

impl DashboardService {
    pub fn new(db: Arc<DbPool>, authz: Arc<PolicyRegistry>, tasks: TaskService) -> Self {
        Self { db, authz, tasks }
    }

    pub async fn summary(&self, actor: &Actor) -> ServiceResult<DashboardSummary> {
        self.authz
            .authorize::<Dashboard>(actor, Action::List, Target::Kind)?;

        let (patients, active_patients) = if self.authz.policy_for::<Patient>().can_list(actor) {
            let scope = self.authz.authorized_scope::<Patient>(actor, Query::all())?;
            let active = scope
                .clone()
                .refine(|q| q.filter(PatientFilter::Status(PatientStatus::Active)));
            let repo = self.db.patients();
            (
                Some(repo.count(&scope).await?),
                Some(repo.count(&active).await?),
            )
        } else {
            (None, None)
        };

        let messages = self.authz.authorized_scope::<Message>(actor, Query::all())?;
        let last_hour = messages.clone().refine(|q| q.filter(MessageFilter::Recent));
        let repo = self.db.messages();

        Ok(DashboardSummary {
            patients,
            active_patients,
            tasks: self.tasks.stats(actor).await?,
            messages: repo.count(&messages).await?,
            messages_last_hour: repo.count(&last_hour).await?,
        })
    }
}
