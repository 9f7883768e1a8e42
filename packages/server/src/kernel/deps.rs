//! Server dependencies for domain actions (traits for testability)
//!
//! Central dependency container handed to every action. All infrastructure
//! sits behind the `Base*` traits so the workflow runs unchanged against
//! Postgres in production and the in-memory doubles in tests.

use sqlx::PgPool;
use std::sync::Arc;

use crate::domains::buyer::models::{PgBuyerStore, PgDomainRegistry};
use crate::kernel::notifications::PgNotificationDispatcher;
use crate::kernel::{BaseBuyerStore, BaseDomainRegistry, BaseNotificationDispatcher};

/// Dependencies accessible to domain actions.
#[derive(Clone)]
pub struct ServerDeps {
    pub store: Arc<dyn BaseBuyerStore>,
    pub registry: Arc<dyn BaseDomainRegistry>,
    pub notifications: Arc<dyn BaseNotificationDispatcher>,
}

impl ServerDeps {
    /// Production wiring: everything backed by the one Postgres pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            store: Arc::new(PgBuyerStore::new(pool.clone())),
            registry: Arc::new(PgDomainRegistry::new(pool.clone())),
            notifications: Arc::new(PgNotificationDispatcher::new(pool)),
        }
    }
}
