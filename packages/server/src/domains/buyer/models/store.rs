//! Postgres persistence for buyer applications.
//!
//! Row-level serialization of concurrent actions comes from the
//! expected-state predicate on the UPDATE: the losing writer matches zero
//! rows, the transaction rolls back, and `StaleState` bubbles up.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::common::{BuyerId, UserId};
use crate::domains::buyer::machines::State;
use crate::domains::buyer::models::{AuditEvent, Buyer, NewAuditEvent};
use crate::kernel::{BaseBuyerStore, BuyerStats, StoreError};

#[derive(Clone)]
pub struct PgBuyerStore {
    pool: PgPool,
}

impl PgBuyerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseBuyerStore for PgBuyerStore {
    async fn find_by_id(&self, id: BuyerId) -> Result<Option<Buyer>, StoreError> {
        sqlx::query_as::<_, Buyer>(
            "SELECT * FROM buyer_applications WHERE id = $1 AND discarded_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Buyer>, StoreError> {
        sqlx::query_as::<_, Buyer>(
            "SELECT * FROM buyer_applications WHERE user_id = $1 AND discarded_at IS NULL",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn find_by_approval_token(&self, token: &str) -> Result<Option<Buyer>, StoreError> {
        sqlx::query_as::<_, Buyer>(
            "SELECT * FROM buyer_applications
             WHERE manager_approval_token = $1 AND discarded_at IS NULL",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn insert(&self, buyer: &Buyer) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO buyer_applications (
                id, user_id, state,
                name, organisation, application_body,
                cloud_purchase, contactable, contact_number,
                employment_status, manager_name, manager_email,
                assigned_to_id, manager_approval_token, decision_body,
                started_at, submitted_at, manager_approved_at, decided_at,
                discarded_at, created_at
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                     $13, $14, $15, $16, $17, $18, $19, $20, $21)",
        )
        .bind(buyer.id)
        .bind(buyer.user_id)
        .bind(buyer.state)
        .bind(&buyer.name)
        .bind(&buyer.organisation)
        .bind(&buyer.application_body)
        .bind(buyer.cloud_purchase)
        .bind(buyer.contactable)
        .bind(&buyer.contact_number)
        .bind(buyer.employment_status)
        .bind(&buyer.manager_name)
        .bind(&buyer.manager_email)
        .bind(buyer.assigned_to_id)
        .bind(&buyer.manager_approval_token)
        .bind(&buyer.decision_body)
        .bind(buyer.started_at)
        .bind(buyer.submitted_at)
        .bind(buyer.manager_approved_at)
        .bind(buyer.decided_at)
        .bind(buyer.discarded_at)
        .bind(buyer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn commit_action(
        &self,
        buyer: &Buyer,
        expected_state: State,
        event: Option<NewAuditEvent>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE buyer_applications SET
                state = $2,
                name = $3,
                organisation = $4,
                application_body = $5,
                cloud_purchase = $6,
                contactable = $7,
                contact_number = $8,
                employment_status = $9,
                manager_name = $10,
                manager_email = $11,
                assigned_to_id = $12,
                manager_approval_token = $13,
                decision_body = $14,
                started_at = $15,
                submitted_at = $16,
                manager_approved_at = $17,
                decided_at = $18
             WHERE id = $1 AND state = $19 AND discarded_at IS NULL",
        )
        .bind(buyer.id)
        .bind(buyer.state)
        .bind(&buyer.name)
        .bind(&buyer.organisation)
        .bind(&buyer.application_body)
        .bind(buyer.cloud_purchase)
        .bind(buyer.contactable)
        .bind(&buyer.contact_number)
        .bind(buyer.employment_status)
        .bind(&buyer.manager_name)
        .bind(&buyer.manager_email)
        .bind(buyer.assigned_to_id)
        .bind(&buyer.manager_approval_token)
        .bind(&buyer.decision_body)
        .bind(buyer.started_at)
        .bind(buyer.submitted_at)
        .bind(buyer.manager_approved_at)
        .bind(buyer.decided_at)
        .bind(expected_state)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::StaleState);
        }

        if let Some(event) = event {
            sqlx::query(
                "INSERT INTO buyer_events (entity_id, entity_type, actor_id, note)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(event.entity_id)
            .bind(event.entity_type)
            .bind(event.actor_id)
            .bind(&event.note)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn save_unchecked(&self, buyer: &Buyer) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO buyer_applications (
                id, user_id, state,
                name, organisation, application_body,
                cloud_purchase, contactable, contact_number,
                employment_status, manager_name, manager_email,
                assigned_to_id, manager_approval_token, decision_body,
                started_at, submitted_at, manager_approved_at, decided_at,
                discarded_at, created_at
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                     $13, $14, $15, $16, $17, $18, $19, $20, $21)
             ON CONFLICT (id) DO UPDATE SET
                state = EXCLUDED.state,
                name = EXCLUDED.name,
                organisation = EXCLUDED.organisation,
                decision_body = EXCLUDED.decision_body,
                started_at = EXCLUDED.started_at,
                submitted_at = EXCLUDED.submitted_at,
                decided_at = EXCLUDED.decided_at",
        )
        .bind(buyer.id)
        .bind(buyer.user_id)
        .bind(buyer.state)
        .bind(&buyer.name)
        .bind(&buyer.organisation)
        .bind(&buyer.application_body)
        .bind(buyer.cloud_purchase)
        .bind(buyer.contactable)
        .bind(&buyer.contact_number)
        .bind(buyer.employment_status)
        .bind(&buyer.manager_name)
        .bind(&buyer.manager_email)
        .bind(buyer.assigned_to_id)
        .bind(&buyer.manager_approval_token)
        .bind(&buyer.decision_body)
        .bind(buyer.started_at)
        .bind(buyer.submitted_at)
        .bind(buyer.manager_approved_at)
        .bind(buyer.decided_at)
        .bind(buyer.discarded_at)
        .bind(buyer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn events_for(&self, id: BuyerId) -> Result<Vec<AuditEvent>, StoreError> {
        sqlx::query_as::<_, AuditEvent>(
            "SELECT * FROM buyer_events
             WHERE entity_id = $1 AND entity_type = $2
             ORDER BY id",
        )
        .bind(id)
        .bind(crate::domains::buyer::models::BUYER_ENTITY_TYPE)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn stats(&self) -> Result<BuyerStats, StoreError> {
        let (pending, approved): (i64, i64) = sqlx::query_as(
            "SELECT
                COUNT(*) FILTER (WHERE state IN
                    ('awaiting_manager_approval', 'awaiting_assignment', 'ready_for_review')),
                COUNT(*) FILTER (WHERE state = 'approved')
             FROM buyer_applications
             WHERE discarded_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(BuyerStats { pending, approved })
    }
}
