//! Append-only audit trail.
//!
//! Audit events are an independent aggregate: they reference the entity
//! they describe by `(entity_id, entity_type)` but are owned by the log,
//! never embedded in the entity. Rows are inserted in the same transaction
//! as the entity mutation and never updated or deleted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::common::{BuyerId, UserId};

/// Entity type recorded for buyer-application events.
pub const BUYER_ENTITY_TYPE: &str = "BuyerApplication";

/// A recorded audit event, as read back from the log.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub id: i64,
    pub entity_id: Uuid,
    pub entity_type: String,
    pub actor_id: Option<Uuid>,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

/// An event about to be appended.
#[derive(Debug, Clone)]
pub struct NewAuditEvent {
    pub entity_id: Uuid,
    pub entity_type: &'static str,
    pub actor_id: Option<Uuid>,
    pub note: String,
}

impl NewAuditEvent {
    pub fn for_buyer(buyer_id: BuyerId, actor_id: UserId, note: impl Into<String>) -> Self {
        Self {
            entity_id: buyer_id.into_uuid(),
            entity_type: BUYER_ENTITY_TYPE,
            actor_id: Some(actor_id.into_uuid()),
            note: note.into(),
        }
    }
}
