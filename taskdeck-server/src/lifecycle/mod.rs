//! Lifecycle coordinators for the token-bearing, time-limited entities
//!
//! Each coordinator runs to completion inside a single request handler.
//! There is no in-process locking: concurrent issues for the same
//! (email, purpose) race benignly because the store's delete-then-insert
//! leaves at most one active code (last writer wins). Expiry is checked
//! lazily on every access path; the periodic sweep is advisory cleanup.

pub mod otp;
