//! Taskdeck Core Library
//!
//! Domain primitives shared by the Taskdeck backend:
//! - Opaque invitation tokens and numeric one-time codes
//! - Expiry policy for time-limited records
//! - Workspace roles and email normalization

pub mod email;
pub mod error;
pub mod expiry;
pub mod role;
pub mod token;

pub use error::Error;
pub use expiry::ExpiryPolicy;
pub use role::WorkspaceRole;

/// Result type for taskdeck-core operations
pub type Result<T> = std::result::Result<T, Error>;
