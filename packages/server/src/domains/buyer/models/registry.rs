//! Domain and email registries - read-only lookups.
//!
//! `buyer_domains` maps an email domain to its sponsoring organisation and
//! drives auto-qualification; `buyer_emails` is an explicit per-address
//! allow list consulted by the email-validity check.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::kernel::{BaseDomainRegistry, StoreError};

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct BuyerDomain {
    pub id: Uuid,
    pub domain: String,
    pub organisation: String,
    pub discarded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct BuyerEmail {
    pub id: Uuid,
    pub email: String,
    pub organisation: String,
    pub discarded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct PgDomainRegistry {
    pool: PgPool,
}

impl PgDomainRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseDomainRegistry for PgDomainRegistry {
    async fn lookup_domain(&self, domain: &str) -> Result<Option<String>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT organisation FROM buyer_domains
             WHERE domain = $1 AND discarded_at IS NULL",
        )
        .bind(domain)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(organisation,)| organisation))
    }

    async fn email_allowed(&self, email: &str) -> Result<bool, StoreError> {
        let domain = email.rsplit_once('@').map(|(_, d)| d).unwrap_or(email);

        let (allowed,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (
                SELECT 1 FROM buyer_emails
                WHERE email = $1 AND discarded_at IS NULL
             ) OR EXISTS (
                SELECT 1 FROM buyer_domains
                WHERE domain = $2 AND discarded_at IS NULL
             )",
        )
        .bind(email)
        .bind(domain)
        .fetch_one(&self.pool)
        .await?;

        Ok(allowed)
    }
}
