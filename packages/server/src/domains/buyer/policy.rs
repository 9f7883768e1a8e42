//! Authorization policy for buyer-application actions.
//!
//! Decoupled from the transition table so it can be tested independently
//! of state logic: legality ("is this action possible here") lives in the
//! machine, permission ("may this actor do it") lives here.

use crate::common::Actor;
use crate::domains::buyer::machines::ActionKind;
use crate::domains::buyer::models::Buyer;

/// May `actor` run `action` on `buyer`?
///
/// Administrators may run any action; an applicant may act on their own
/// application. The token-authenticated manager-approval path never reaches
/// this function - possession of the secret is its own authentication mode.
pub fn can_run(actor: &Actor, buyer: &Buyer, _action: ActionKind) -> bool {
    actor.admin || (actor.buyer && buyer.user_id == actor.id)
}
