//! End-to-end tests over the demo dataset.


use std::sync::Arc;

use uuid::Uuid;

use crate::{
    authz::PolicyRegistry,
    config::AppConfig,
    db::{DbPool, seed::SeedData},
    models::Actor,
    services::Services,
};

const DEMO_SEED: &str = include_str!("../../demos/seed.toml");
const DEMO_CONFIG: &str = include_str!("../../demos/config.toml");

pub(super) const ADMIN: Uuid = Uuid::from_u128(0xa);
pub(super) const PATIENT_ACTOR: Uuid = Uuid::from_u128(0xb);
pub(super) const UNRESOLVED_ACTOR: Uuid = Uuid::from_u128(0xc);
pub(super) const PATIENT_7: Uuid = Uuid::from_u128(0x7);
pub(super) const PATIENT_42: Uuid = Uuid::from_u128(0x42);
pub(super) const MESSAGE_9: Uuid = Uuid::from_u128(0x9);
pub(super) const MESSAGE_10: Uuid = Uuid::from_u128(0x10);

pub(super) struct Demo {
    pub db: Arc<DbPool>,
    pub authz: Arc<PolicyRegistry>,
    pub services: Services,
}

impl Demo {
    pub fn load() -> Self {
        let config = AppConfig::from_str(DEMO_CONFIG).unwrap();
        let db = Arc::new(DbPool::from_seed(SeedData::from_str(DEMO_SEED).unwrap()).unwrap());
        let authz = Arc::new(PolicyRegistry::new(&config.authz));
        let services = Services::new(db.clone(), authz.clone(), &config);
        Self { db, authz, services }
    }

    pub async fn actor(&self, id: Uuid) -> Actor {
        self.db.actors().get_by_id(id).await.unwrap().unwrap()
    }
}
