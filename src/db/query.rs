//! Collection query descriptions.
//!
//! A [`Query`] describes which records a listing should contain without
//! materializing anything. Policies narrow it through their scope resolver,
//! services add filters, sorting and pagination on top, and the store
//! evaluates it. Evaluation order is fixed regardless of the order in which
//! the builder methods were called:
//!
//! 1. scope (all records, or none)
//! 2. filters (all must match)
//! 3. sort (with the record type's default order as tie-breaker)
//! 4. limit / pagination
//!
//! Applying the scope after pagination would yield short or wrong pages, so
//! callers cannot reorder these steps.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::authz::{Authorized, Resource};

/// A resource whose collections can be queried.
pub trait Record: Resource + Clone {
    /// Row-level predicate supported by this record type.
    type Filter: Clone + std::fmt::Debug + Send + Sync;
    /// Sort key supported by this record type.
    type Sort: Copy + std::fmt::Debug + Send + Sync;

    fn matches(&self, filter: &Self::Filter, now: DateTime<Utc>) -> bool;

    /// Order two records by `sort`, or by the record type's default order
    /// when no sort was requested. Implementations must fall back to the
    /// default order on ties so pagination is deterministic.
    fn compare(a: &Self, b: &Self, sort: Option<Self::Sort>) -> Ordering;
}

/// Row-level visibility decided by a policy scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Every record is visible
    #[default]
    All,
    /// No record is visible
    Nothing,
}

/// Page request (1-based page number).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub per_page: usize,
}

impl PageRequest {
    pub fn new(page: usize, per_page: usize) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

/// One page of query results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number (1 when unpaginated)
    pub page: usize,
    pub per_page: Option<usize>,
    /// Number of records matching scope and filters, before pagination
    pub total: usize,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            per_page: None,
            total: 0,
            has_more: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// A description of a collection listing.
#[derive(Debug, Clone)]
pub struct Query<R: Record> {
    visibility: Visibility,
    filters: Vec<R::Filter>,
    sort: Option<R::Sort>,
    limit: Option<usize>,
    page: Option<PageRequest>,
}

impl<R: Record> Default for Query<R> {
    fn default() -> Self {
        Self::all()
    }
}

impl<R: Record> Query<R> {
    /// Unfiltered query over every record.
    pub fn all() -> Self {
        Self {
            visibility: Visibility::All,
            filters: Vec::new(),
            sort: None,
            limit: None,
            page: None,
        }
    }

    /// Restrict the query to nothing. Irreversible: no later builder call
    /// widens the result again.
    pub fn none(mut self) -> Self {
        self.visibility = Visibility::Nothing;
        self
    }

    pub fn filter(mut self, filter: R::Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort_by(mut self, sort: R::Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Cap the number of results (applied when no page is requested).
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn paginate(mut self, page: PageRequest) -> Self {
        self.page = Some(page);
        self
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_nothing(&self) -> bool {
        self.visibility == Visibility::Nothing
    }

    pub fn filters(&self) -> &[R::Filter] {
        &self.filters
    }

    pub fn sort(&self) -> Option<R::Sort> {
        self.sort
    }

    pub fn page_request(&self) -> Option<PageRequest> {
        self.page
    }

    fn admits(&self, record: &R, now: DateTime<Utc>) -> bool {
        self.filters.iter().all(|f| record.matches(f, now))
    }

    /// Number of records passing scope and filters.
    pub fn count<'a, I>(&self, records: I, now: DateTime<Utc>) -> usize
    where
        I: IntoIterator<Item = &'a R>,
        R: 'a,
    {
        if self.is_nothing() {
            return 0;
        }
        records
            .into_iter()
            .filter(|r| self.admits(r, now))
            .count()
    }

    /// Evaluate the query against a collection.
    pub fn run<I>(&self, records: I, now: DateTime<Utc>) -> Page<R>
    where
        I: IntoIterator<Item = R>,
    {
        if self.is_nothing() {
            return Page {
                per_page: self.page.map(|p| p.per_page),
                page: self.page.map(|p| p.page).unwrap_or(1),
                ..Page::empty()
            };
        }

        let mut matched: Vec<R> = records
            .into_iter()
            .filter(|r| self.admits(r, now))
            .collect();
        matched.sort_by(|a, b| R::compare(a, b, self.sort));
        let total = matched.len();

        match self.page {
            Some(page) => {
                let offset = page.offset();
                let items: Vec<R> = matched
                    .into_iter()
                    .skip(offset)
                    .take(page.per_page)
                    .collect();
                let has_more = offset.saturating_add(items.len()) < total;
                Page {
                    items,
                    page: page.page,
                    per_page: Some(page.per_page),
                    total,
                    has_more,
                }
            }
            None => {
                let limit = self.limit.unwrap_or(total);
                let has_more = total > limit;
                matched.truncate(limit);
                Page {
                    items: matched,
                    page: 1,
                    per_page: None,
                    total,
                    has_more,
                }
            }
        }
    }
}

impl<R: Record> Authorized<Query<R>> {
    /// Add filters, sorting or pagination to an authorized listing. A query
    /// scoped to nothing stays scoped to nothing whatever `f` returns.
    pub fn refine(self, f: impl FnOnce(Query<R>) -> Query<R>) -> Self {
        self.update(|query| {
            let scoped_out = query.is_nothing();
            let mut refined = f(std::mem::take(query));
            if scoped_out {
                refined = refined.none();
            }
            *query = refined;
        })
    }
}
