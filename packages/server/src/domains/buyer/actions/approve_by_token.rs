//! Manager approval by token.
//!
//! The approval email carries a single-use secret; whoever presents it is
//! the manager. No actor identity is involved, so the engine runs with
//! `AuthMode::ApprovalToken`. An unknown token and a token whose
//! application can no longer be manager-approved are indistinguishable to
//! the caller: both are `NotFound`.

use crate::domains::buyer::actions::{run_action, ActionOutcome, AuthMode, BuyerAction};
use crate::domains::buyer::errors::ActionError;
use crate::domains::buyer::machines::ActionKind;
use crate::kernel::{BaseBuyerStore, ServerDeps};

pub async fn approve_by_token(
    deps: &ServerDeps,
    token: &str,
) -> Result<ActionOutcome, ActionError> {
    let buyer = deps
        .store
        .find_by_approval_token(token)
        .await?
        .ok_or(ActionError::NotFound)?;

    if !buyer.state.allows(ActionKind::ManagerApproval) {
        return Err(ActionError::NotFound);
    }

    run_action(deps, buyer, BuyerAction::ManagerApproval, AuthMode::ApprovalToken).await
}
