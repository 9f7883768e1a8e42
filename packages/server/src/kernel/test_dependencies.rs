// TestDependencies - in-memory implementations for testing
//
// The whole workflow runs against these doubles: a mutex-serialized store
// with injectable commit failure, a fixture-backed registry, and a spy
// dispatcher that records what would have been sent.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::common::{BuyerId, UserId};
use crate::domains::buyer::events::NotificationKind;
use crate::domains::buyer::machines::State;
use crate::domains::buyer::models::{AuditEvent, Buyer, NewAuditEvent};
use crate::kernel::{
    BaseBuyerStore, BaseDomainRegistry, BaseNotificationDispatcher, BuyerStats, ServerDeps,
    StoreError,
};

// =============================================================================
// In-memory Buyer Store
// =============================================================================

#[derive(Default)]
pub struct MemBuyerStore {
    buyers: Mutex<HashMap<Uuid, Buyer>>,
    events: Mutex<Vec<AuditEvent>>,
    next_event_id: AtomicI64,
    fail_commits: AtomicBool,
}

impl MemBuyerStore {
    pub fn new() -> Self {
        Self {
            next_event_id: AtomicI64::new(1),
            ..Default::default()
        }
    }

    /// Seed an application.
    pub fn with_buyer(self, buyer: Buyer) -> Self {
        self.buyers
            .lock()
            .unwrap()
            .insert(buyer.id.into_uuid(), buyer);
        self
    }

    /// Make every subsequent `commit_action` fail without mutating
    /// anything, simulating a store outage mid-transaction.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Current snapshot of one application.
    pub fn get(&self, id: BuyerId) -> Option<Buyer> {
        self.buyers.lock().unwrap().get(id.as_uuid()).cloned()
    }

    /// Everything appended to the audit log so far.
    pub fn recorded_events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseBuyerStore for MemBuyerStore {
    async fn find_by_id(&self, id: BuyerId) -> Result<Option<Buyer>, StoreError> {
        Ok(self
            .buyers
            .lock()
            .unwrap()
            .get(id.as_uuid())
            .filter(|b| !b.discarded())
            .cloned())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Buyer>, StoreError> {
        Ok(self
            .buyers
            .lock()
            .unwrap()
            .values()
            .find(|b| b.user_id == user_id && !b.discarded())
            .cloned())
    }

    async fn find_by_approval_token(&self, token: &str) -> Result<Option<Buyer>, StoreError> {
        Ok(self
            .buyers
            .lock()
            .unwrap()
            .values()
            .find(|b| b.manager_approval_token.as_deref() == Some(token) && !b.discarded())
            .cloned())
    }

    async fn insert(&self, buyer: &Buyer) -> Result<(), StoreError> {
        self.buyers
            .lock()
            .unwrap()
            .insert(buyer.id.into_uuid(), buyer.clone());
        Ok(())
    }

    async fn commit_action(
        &self,
        buyer: &Buyer,
        expected_state: State,
        event: Option<NewAuditEvent>,
    ) -> Result<(), StoreError> {
        // One lock for the whole commit: concurrent actions serialize here
        // the way row locking serializes them in Postgres.
        let mut buyers = self.buyers.lock().unwrap();

        let current = buyers
            .get(buyer.id.as_uuid())
            .ok_or(StoreError::StaleState)?;
        if current.state != expected_state {
            return Err(StoreError::StaleState);
        }

        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected commit failure".into()));
        }

        buyers.insert(buyer.id.into_uuid(), buyer.clone());

        if let Some(event) = event {
            self.events.lock().unwrap().push(AuditEvent {
                id: self.next_event_id.fetch_add(1, Ordering::SeqCst),
                entity_id: event.entity_id,
                entity_type: event.entity_type.to_string(),
                actor_id: event.actor_id,
                note: event.note,
                created_at: Utc::now(),
            });
        }

        Ok(())
    }

    async fn save_unchecked(&self, buyer: &Buyer) -> Result<(), StoreError> {
        self.buyers
            .lock()
            .unwrap()
            .insert(buyer.id.into_uuid(), buyer.clone());
        Ok(())
    }

    async fn events_for(&self, id: BuyerId) -> Result<Vec<AuditEvent>, StoreError> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.entity_id == id.into_uuid())
            .cloned()
            .collect())
    }

    async fn stats(&self) -> Result<BuyerStats, StoreError> {
        let buyers = self.buyers.lock().unwrap();
        let pending = buyers
            .values()
            .filter(|b| {
                !b.discarded()
                    && matches!(
                        b.state,
                        State::AwaitingManagerApproval
                            | State::AwaitingAssignment
                            | State::ReadyForReview
                    )
            })
            .count() as i64;
        let approved = buyers
            .values()
            .filter(|b| !b.discarded() && b.state == State::Approved)
            .count() as i64;
        Ok(BuyerStats { pending, approved })
    }
}

// =============================================================================
// Fixture-backed Domain Registry
// =============================================================================

#[derive(Default)]
pub struct MockDomainRegistry {
    domains: Mutex<HashMap<String, String>>,
    emails: Mutex<HashSet<String>>,
}

impl MockDomainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domain(self, domain: &str, organisation: &str) -> Self {
        self.domains
            .lock()
            .unwrap()
            .insert(domain.to_string(), organisation.to_string());
        self
    }

    pub fn with_email(self, email: &str) -> Self {
        self.emails.lock().unwrap().insert(email.to_string());
        self
    }
}

#[async_trait]
impl BaseDomainRegistry for MockDomainRegistry {
    async fn lookup_domain(&self, domain: &str) -> Result<Option<String>, StoreError> {
        Ok(self.domains.lock().unwrap().get(domain).cloned())
    }

    async fn email_allowed(&self, email: &str) -> Result<bool, StoreError> {
        if self.emails.lock().unwrap().contains(email) {
            return Ok(true);
        }
        let domain = email.rsplit_once('@').map(|(_, d)| d).unwrap_or(email);
        Ok(self.domains.lock().unwrap().contains_key(domain))
    }
}

// =============================================================================
// Spy Notification Dispatcher
// =============================================================================

#[derive(Default)]
pub struct SpyNotificationDispatcher {
    sent: Mutex<Vec<(NotificationKind, BuyerId)>>,
}

impl SpyNotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(NotificationKind, BuyerId)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.sent.lock().unwrap().iter().map(|(k, _)| *k).collect()
    }
}

#[async_trait]
impl BaseNotificationDispatcher for SpyNotificationDispatcher {
    async fn enqueue(&self, kind: NotificationKind, application_id: BuyerId) {
        self.sent.lock().unwrap().push((kind, application_id));
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Bundle of doubles plus handles to inspect them after the fact.
pub struct TestDependencies {
    pub store: Arc<MemBuyerStore>,
    pub registry: Arc<MockDomainRegistry>,
    pub notifications: Arc<SpyNotificationDispatcher>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemBuyerStore::new()),
            registry: Arc::new(MockDomainRegistry::new()),
            notifications: Arc::new(SpyNotificationDispatcher::new()),
        }
    }

    pub fn with_store(store: MemBuyerStore) -> Self {
        Self {
            store: Arc::new(store),
            ..Self::new()
        }
    }

    pub fn with_registry(mut self, registry: MockDomainRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// The `ServerDeps` view handed to actions.
    pub fn server_deps(&self) -> ServerDeps {
        ServerDeps {
            store: self.store.clone(),
            registry: self.registry.clone(),
            notifications: self.notifications.clone(),
        }
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
