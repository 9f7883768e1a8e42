// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic. The action
// engine in domains/buyer speaks to persistence and notification delivery
// exclusively through these seams, which is what lets the whole workflow
// run against the in-memory doubles in test_dependencies.
//
// Naming convention: Base* for trait names (e.g., BaseBuyerStore)

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::common::{BuyerId, UserId};
use crate::domains::buyer::events::NotificationKind;
use crate::domains::buyer::machines::State;
use crate::domains::buyer::models::{AuditEvent, Buyer, NewAuditEvent};

/// Failures surfaced by a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The entity's state changed between read and commit; the caller is
    /// acting on a stale row.
    #[error("entity state is stale")]
    StaleState,

    /// The store refused or lost the transaction. Safe to retry.
    #[error("backing store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Headline counts for the admin dashboard.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BuyerStats {
    pub pending: i64,
    pub approved: i64,
}

// =============================================================================
// Buyer Store (Infrastructure - transactional persistence)
// =============================================================================

/// Persistence for buyer applications and their audit trail.
///
/// All lookups exclude soft-deleted rows. `commit_action` is the only way
/// state leaves the store mutated: entity update and audit append happen in
/// one transaction, guarded by the state the caller read.
#[async_trait]
pub trait BaseBuyerStore: Send + Sync {
    async fn find_by_id(&self, id: BuyerId) -> Result<Option<Buyer>, StoreError>;

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Buyer>, StoreError>;

    async fn find_by_approval_token(&self, token: &str) -> Result<Option<Buyer>, StoreError>;

    /// Insert a fresh application (state `created`).
    async fn insert(&self, buyer: &Buyer) -> Result<(), StoreError>;

    /// Atomically persist an action's entity mutation plus its audit event.
    ///
    /// The update only applies while the stored row is still in
    /// `expected_state`; otherwise nothing is written and `StaleState` is
    /// returned. Two concurrent actions on the same application therefore
    /// serialize: exactly one commit wins.
    async fn commit_action(
        &self,
        buyer: &Buyer,
        expected_state: State,
        event: Option<NewAuditEvent>,
    ) -> Result<(), StoreError>;

    /// Privileged upsert used by auto-registration. Bypasses the
    /// expected-state check by design (trusted caller only).
    async fn save_unchecked(&self, buyer: &Buyer) -> Result<(), StoreError>;

    /// Audit trail for one application, oldest first.
    async fn events_for(&self, id: BuyerId) -> Result<Vec<AuditEvent>, StoreError>;

    async fn stats(&self) -> Result<BuyerStats, StoreError>;
}

// =============================================================================
// Domain Registry (Infrastructure - read-only lookup)
// =============================================================================

/// Lookup table mapping email domains to sponsoring organisations, plus an
/// explicitly allow-listed email registry. Read-only at application time.
#[async_trait]
pub trait BaseDomainRegistry: Send + Sync {
    /// Resolve a domain to its sponsoring organisation.
    async fn lookup_domain(&self, domain: &str) -> Result<Option<String>, StoreError>;

    /// True if the exact email or its domain is registered.
    async fn email_allowed(&self, email: &str) -> Result<bool, StoreError>;
}

// =============================================================================
// Notification Dispatcher (Infrastructure - fire-and-forget)
// =============================================================================

/// Queues outbound notifications for asynchronous delivery.
///
/// Fire-and-forget: implementations log failures and never surface them.
/// Enqueueing happens outside the action's transaction boundary - a
/// notification failure must never roll back a state transition.
#[async_trait]
pub trait BaseNotificationDispatcher: Send + Sync {
    async fn enqueue(&self, kind: NotificationKind, application_id: BuyerId);
}
