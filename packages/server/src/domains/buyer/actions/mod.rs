pub mod approve_by_token;
pub mod auto_register;
pub mod check_email;
pub mod run_action;

pub use approve_by_token::approve_by_token;
pub use auto_register::{auto_register, AutoRegisterRequest};
pub use check_email::check_email;
pub use run_action::{run_action, ActionOutcome, AuthMode, BuyerAction};
