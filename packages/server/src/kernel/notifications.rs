//! Postgres-backed notification queue.
//!
//! The engine enqueues a `(kind, application_id)` row; a delivery worker
//! (out of scope here) drains the table. Enqueueing is fire-and-forget:
//! failures are logged and never fail the action that triggered them.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, error};

use crate::common::BuyerId;
use crate::domains::buyer::events::NotificationKind;
use crate::kernel::BaseNotificationDispatcher;

#[derive(Clone)]
pub struct PgNotificationDispatcher {
    pool: PgPool,
}

impl PgNotificationDispatcher {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseNotificationDispatcher for PgNotificationDispatcher {
    async fn enqueue(&self, kind: NotificationKind, application_id: BuyerId) {
        let result = sqlx::query(
            "INSERT INTO notification_requests (kind, application_id) VALUES ($1, $2)",
        )
        .bind(kind.as_str())
        .bind(application_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => debug!(%kind, %application_id, "notification queued"),
            // Never surfaced: a lost notification must not fail the action.
            Err(e) => error!(%kind, %application_id, error = %e, "failed to queue notification"),
        }
    }
}
