//! Buyer application domain.
//!
//! - `machines` - pure state machine: states, guards, transition table
//! - `actions` - the action engine and privileged paths
//! - `policy` - who may run what
//! - `models` - sqlx persistence (entity, registries, audit log, store)
//! - `events` - notification kinds the engine emits
//! - `data` - read-only projections for callers
//! - `errors` - the engine's error taxonomy

pub mod actions;
pub mod data;
pub mod errors;
pub mod events;
pub mod machines;
pub mod models;
pub mod policy;

pub use actions::{run_action, ActionOutcome, AuthMode, BuyerAction};
pub use errors::ActionError;
pub use machines::{ActionKind, State};
