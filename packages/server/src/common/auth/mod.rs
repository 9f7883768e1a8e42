//! Authenticated principal handed to the action engine.
//!
//! Session/JWT verification happens upstream; by the time a request reaches
//! domain code the actor is already authenticated and carries its role
//! flags. Authorization decisions live in `domains::buyer::policy`, not
//! here.

use serde::{Deserialize, Serialize};

use crate::common::UserId;

/// The authenticated principal requesting an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub email: String,
    /// Administrator role flag (set during authentication).
    pub admin: bool,
    /// Applicant role flag - the actor holds (or may hold) a buyer application.
    pub buyer: bool,
}

impl Actor {
    pub fn admin(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            admin: true,
            buyer: false,
        }
    }

    pub fn applicant(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            admin: false,
            buyer: true,
        }
    }
}
