//! Seed datasets.
//!
//! A seed file is TOML with one array of tables per collection. Every row
//! carries an explicit id so tasks and messages can reference patients and
//! actors:
//!
//! ```toml
//! [[actors]]
//! id = "7d0c6f0e-4c55-4c1e-9d8e-2f1f5d2c0a01"
//! email = "admin@clinic.test"
//! role = "admin"
//!
//! [[patients]]
//! id = "..."
//! first_name = "Ada"
//! # ...
//! ```
//!
//! Actor roles are kept as raw strings and resolved on load, so a seed can
//! contain an actor whose role does not resolve.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use super::{DbError, memory::MemoryStore};
use crate::models::{Actor, Message, Patient, Task};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read seed file {1}: {0}")]
    Io(std::io::Error, PathBuf),

    #[error("Failed to parse seed file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid seed data: {0}")]
    Invalid(#[from] DbError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedActor {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl SeedActor {
    fn into_actor(self) -> Actor {
        let mut actor = Actor::from_stored(self.id, self.email, &self.role);
        if let Some(created_at) = self.created_at {
            actor.created_at = created_at;
        }
        actor
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedData {
    #[serde(default)]
    pub actors: Vec<SeedActor>,
    #[serde(default)]
    pub patients: Vec<Patient>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl SeedData {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SeedError::Io(e, path.to_path_buf()))?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, SeedError> {
        Ok(toml::from_str(content)?)
    }

    /// Insert every row, checking uniqueness and references. Actors first,
    /// then patients, then the records hanging off them.
    pub(crate) fn load_into(self, store: &MemoryStore) -> Result<(), DbError> {
        let counts = (
            self.actors.len(),
            self.patients.len(),
            self.tasks.len(),
            self.messages.len(),
        );
        for actor in self.actors {
            store.insert_actor(actor.into_actor())?;
        }
        for patient in self.patients {
            store.insert_patient(patient)?;
        }
        store.sync_links()?;
        for task in self.tasks {
            store.insert_task(task)?;
        }
        for message in self.messages {
            store.insert_message(message)?;
        }
        tracing::debug!(
            actors = counts.0,
            patients = counts.1,
            tasks = counts.2,
            messages = counts.3,
            "Seed data loaded"
        );
        Ok(())
    }
}
