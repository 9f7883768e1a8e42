//! Auto-registration - privileged shortcut for sponsored domains.
//!
//! Not a transition: a trusted caller creates (or reuses) the application
//! and forces it straight to `approved`, bypassing guards and field
//! validation by design. The email's domain must resolve in the registry.

use chrono::Utc;
use tracing::info;

use crate::common::UserId;
use crate::domains::buyer::errors::ActionError;
use crate::domains::buyer::machines::State;
use crate::domains::buyer::models::Buyer;
use crate::kernel::{BaseBuyerStore, BaseDomainRegistry, ServerDeps};

#[derive(Debug, Clone)]
pub struct AutoRegisterRequest {
    pub email: String,
    pub user_id: UserId,
    pub name: String,
}

pub async fn auto_register(
    deps: &ServerDeps,
    request: AutoRegisterRequest,
) -> Result<Buyer, ActionError> {
    let email = request.email.trim().to_lowercase();
    let domain = email.rsplit_once('@').map(|(_, d)| d).unwrap_or(&email);

    let organisation = deps
        .registry
        .lookup_domain(domain)
        .await?
        .ok_or_else(|| ActionError::DomainNotRegistered(domain.to_string()))?;

    let now = Utc::now();
    let mut buyer = deps
        .store
        .find_by_user(request.user_id)
        .await?
        .unwrap_or_else(|| Buyer::blank(request.user_id));

    buyer.state = State::Approved;
    buyer.started_at.get_or_insert(now);
    buyer.submitted_at.get_or_insert(now);
    buyer.decided_at = Some(now);
    buyer.decision_body = Some("Auto approved".into());
    buyer.name = Some(request.name.trim().to_string());
    buyer.organisation = Some(organisation);

    deps.store.save_unchecked(&buyer).await?;

    info!(buyer_id = %buyer.id, user_id = %buyer.user_id, %domain, "buyer auto-registered");
    Ok(buyer)
}
