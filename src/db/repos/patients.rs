use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    authz::Authorized,
    db::{
        error::DbResult,
        query::{Page, Query, Record},
    },
    models::{Patient, PatientStatus},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatientFilter {
    Status(PatientStatus),
    /// Case-insensitive substring match on first name, last name, email or
    /// medical record number
    Search(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientSort {
    /// Last name, then first name
    Name,
    /// Newest first
    Recent,
}

impl PatientSort {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "name" => Some(Self::Name),
            "recent" => Some(Self::Recent),
            _ => None,
        }
    }
}

impl Record for Patient {
    type Filter = PatientFilter;
    type Sort = PatientSort;

    fn matches(&self, filter: &PatientFilter, _now: DateTime<Utc>) -> bool {
        match filter {
            PatientFilter::Status(status) => self.status == *status,
            PatientFilter::Search(term) => {
                let term = term.to_lowercase();
                [
                    &self.first_name,
                    &self.last_name,
                    &self.email,
                    &self.medical_record_number,
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(&term))
            }
        }
    }

    fn compare(a: &Self, b: &Self, sort: Option<PatientSort>) -> Ordering {
        let newest_first = b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id));
        match sort {
            Some(PatientSort::Name) => a
                .last_name
                .to_lowercase()
                .cmp(&b.last_name.to_lowercase())
                .then_with(|| a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()))
                .then(newest_first),
            Some(PatientSort::Recent) | None => newest_first,
        }
    }
}

#[async_trait]
pub trait PatientRepo: Send + Sync {
    /// Insert a new patient. Medical record numbers are unique.
    async fn create(&self, grant: Authorized<Patient>) -> DbResult<Patient>;
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Patient>>;
    async fn get_by_owner(&self, user_id: Uuid) -> DbResult<Option<Patient>>;
    async fn mrn_exists(&self, medical_record_number: &str) -> DbResult<bool>;
    async fn list(&self, query: Authorized<Query<Patient>>) -> DbResult<Page<Patient>>;
    async fn count(&self, query: &Authorized<Query<Patient>>) -> DbResult<usize>;
    /// Persist the granted record under the id the grant was issued for.
    async fn update(&self, grant: Authorized<Patient>) -> DbResult<Patient>;
    /// Delete a patient with its tasks and messages, unlinking its owner.
    async fn delete(&self, grant: Authorized<Patient>) -> DbResult<()>;
    /// Undo a creation made with the same grant. Refused with a conflict once
    /// the record is claimed by an actor or has tasks or messages.
    async fn discard(&self, grant: Authorized<Patient>) -> DbResult<()>;
}
