//! Error types for Taskdeck core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Invalid workspace role: {0}")]
    InvalidRole(String),
}
