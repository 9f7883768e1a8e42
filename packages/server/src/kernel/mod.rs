//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod notifications;
pub mod test_dependencies;
pub mod traits;

pub use deps::ServerDeps;
pub use notifications::PgNotificationDispatcher;
pub use test_dependencies::{
    MemBuyerStore, MockDomainRegistry, SpyNotificationDispatcher, TestDependencies,
};
pub use traits::*;
