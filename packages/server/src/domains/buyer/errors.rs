use thiserror::Error;

use crate::domains::buyer::machines::{ActionKind, State};
use crate::kernel::StoreError;

/// Everything the action engine can refuse with.
///
/// All variants are recovered at the action boundary and translated to a
/// structured HTTP response; nothing here propagates as an unhandled fault.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Requested action is not legal in the entity's current state. The
    /// caller is acting on a stale view and should refresh.
    #[error("invalid action {action} in state {state}, please refresh the page")]
    InvalidAction { action: ActionKind, state: State },

    #[error("unauthorized access {action} by {email}")]
    Unauthorized { action: ActionKind, email: String },

    #[error("buyer application not found")]
    NotFound,

    /// Auto-registration email domain is not in the registry.
    #[error("email domain {0} is not registered")]
    DomainNotRegistered(String),

    /// Malformed or missing required payload field.
    #[error("validation failed on {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Backing-store failure; the whole action rolled back. Safe to retry.
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}
