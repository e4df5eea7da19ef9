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
    models::{Message, MessageDirection},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageFilter {
    ForPatient(Uuid),
    Direction(MessageDirection),
    ByAuthor(Uuid),
    /// Sent within the last hour
    Recent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSort {
    /// Newest first
    Recent,
    /// Oldest first, for conversation views
    Oldest,
}

impl MessageSort {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "recent" => Some(Self::Recent),
            "oldest" => Some(Self::Oldest),
            _ => None,
        }
    }
}

impl Record for Message {
    type Filter = MessageFilter;
    type Sort = MessageSort;

    fn matches(&self, filter: &MessageFilter, now: DateTime<Utc>) -> bool {
        match filter {
            MessageFilter::ForPatient(id) => self.patient_id == *id,
            MessageFilter::Direction(direction) => self.direction == *direction,
            MessageFilter::ByAuthor(id) => self.is_authored_by(*id),
            MessageFilter::Recent => self.is_recent(now),
        }
    }

    fn compare(a: &Self, b: &Self, sort: Option<MessageSort>) -> Ordering {
        let newest_first = b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id));
        match sort {
            Some(MessageSort::Oldest) => a
                .created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id)),
            Some(MessageSort::Recent) | None => newest_first,
        }
    }
}

#[async_trait]
pub trait MessageRepo: Send + Sync {
    /// Insert a new message. Its patient must exist.
    async fn create(&self, grant: Authorized<Message>) -> DbResult<Message>;
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Message>>;
    async fn list(&self, query: Authorized<Query<Message>>) -> DbResult<Page<Message>>;
    async fn count(&self, query: &Authorized<Query<Message>>) -> DbResult<usize>;
    async fn update(&self, grant: Authorized<Message>) -> DbResult<Message>;
    async fn delete(&self, grant: Authorized<Message>) -> DbResult<()>;
}
