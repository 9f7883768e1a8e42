// HTTP routes
pub mod buyers;
pub mod health;

pub use buyers::*;
pub use health::*;
