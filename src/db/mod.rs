mod error;
pub mod memory;
mod query;
pub mod repos;
pub mod seed;

use std::sync::Arc;

pub use error::{DbError, DbResult};
pub use query::{Page, PageRequest, Query, Record, Visibility};
pub use repos::*;

use self::{
    memory::{MemoryActorRepo, MemoryMessageRepo, MemoryPatientRepo, MemoryStore, MemoryTaskRepo},
    seed::SeedData,
};

/// Cached repository trait objects, created once at construction.
struct CachedRepos {
    actors: Arc<dyn ActorRepo>,
    patients: Arc<dyn PatientRepo>,
    tasks: Arc<dyn TaskRepo>,
    messages: Arc<dyn MessageRepo>,
}

/// Handle to the record store.
pub struct DbPool {
    repos: CachedRepos,
}

impl DbPool {
    /// Empty in-memory store.
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::new()))
    }

    /// In-memory store preloaded with a seed dataset.
    pub fn from_seed(seed: SeedData) -> DbResult<Self> {
        let store = MemoryStore::new();
        seed.load_into(&store)?;
        Ok(Self::from_store(Arc::new(store)))
    }

    fn from_store(store: Arc<MemoryStore>) -> Self {
        let repos = CachedRepos {
            actors: Arc::new(MemoryActorRepo::new(store.clone())),
            patients: Arc::new(MemoryPatientRepo::new(store.clone())),
            tasks: Arc::new(MemoryTaskRepo::new(store.clone())),
            messages: Arc::new(MemoryMessageRepo::new(store)),
        };
        DbPool { repos }
    }

    /// Get actor repository
    pub fn actors(&self) -> Arc<dyn ActorRepo> {
        Arc::clone(&self.repos.actors)
    }

    /// Get patient repository
    pub fn patients(&self) -> Arc<dyn PatientRepo> {
        Arc::clone(&self.repos.patients)
    }

    /// Get task repository
    pub fn tasks(&self) -> Arc<dyn TaskRepo> {
        Arc::clone(&self.repos.tasks)
    }

    /// Get message repository
    pub fn messages(&self) -> Arc<dyn MessageRepo> {
        Arc::clone(&self.repos.messages)
    }
}
