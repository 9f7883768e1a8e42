// Buyer Application Service - API Core
//
// Backend for the buyer-application workflow: applicants apply to become
// buyers, managers approve contractors out of band, administrators assign
// and decide applications. The lifecycle lives in domains/buyer; everything
// else is infrastructure and thin HTTP glue.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
