//! Typed ID definitions for all domain entities.
//!
//! Type aliases over `Id<T>` provide compile-time safety for ID usage
//! throughout the application: a `UserId` cannot be handed to code that
//! expects a `BuyerId`.

pub use super::id::{Id, V4, V7};

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for buyer applications.
pub struct BuyerApplication;

/// Marker type for user accounts (applicants, reviewers, administrators).
pub struct User;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

/// Typed ID for buyer applications.
pub type BuyerId = Id<BuyerApplication>;

/// Typed ID for users. Users are minted elsewhere, so random V4.
pub type UserId = Id<User, V4>;
