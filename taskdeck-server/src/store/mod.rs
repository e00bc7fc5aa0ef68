//! Storage abstractions for the Taskdeck backend
//!
//! Two backends implement these traits: `MemoryStore` for development and
//! tests, `SqliteStore` for persistence. The backend is chosen at startup
//! and injected through generics; business logic never branches on it.

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::MemoryStore;
pub use models::*;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::ApiError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, ApiError>;

/// Accounts, pending registrations and one-time codes
pub trait DirectoryStore: Send + Sync {
    /// Create a permanent account. Fails with `Conflict` if an account
    /// already exists for the email.
    fn create_account(&self, new: NewAccount) -> StoreResult<AccountId>;

    /// Get an account by ID
    fn get_account(&self, id: AccountId) -> StoreResult<Option<Account>>;

    /// Get an account by normalized email
    fn get_account_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    /// Replace an account's password hash
    fn update_password(&self, id: AccountId, password_hash: &str) -> StoreResult<()>;

    /// Append a workspace to the account's workspace list (idempotent)
    fn link_workspace(&self, id: AccountId, workspace_id: WorkspaceId) -> StoreResult<()>;

    /// Remove a workspace from the account's workspace list
    fn unlink_workspace(&self, id: AccountId, workspace_id: WorkspaceId) -> StoreResult<()>;

    /// Delete an account (compensation path only)
    fn delete_account(&self, id: AccountId) -> StoreResult<()>;

    /// Store a pending registration, deleting any prior one for the same
    /// email (at most one per email)
    fn replace_pending_registration(&self, pending: PendingRegistration) -> StoreResult<()>;

    /// Get the pending registration for an email
    fn get_pending_registration(&self, email: &str) -> StoreResult<Option<PendingRegistration>>;

    /// Delete the pending registration for an email
    fn delete_pending_registration(&self, email: &str) -> StoreResult<()>;

    /// Delete pending registrations past expiry, returning how many
    fn cleanup_expired_registrations(&self, now: DateTime<Utc>) -> StoreResult<u64>;

    /// Store a one-time code, deleting any prior code for the same
    /// (email, purpose) pair (at most one active code per pair)
    fn replace_code(&self, code: OneTimeCode) -> StoreResult<()>;

    /// Look up a code by the exact (email, code, purpose) triple
    fn find_code(
        &self,
        email: &str,
        code: &str,
        purpose: CodePurpose,
    ) -> StoreResult<Option<OneTimeCode>>;

    /// Get the stored code for an (email, purpose) pair, whatever its state
    fn get_code(&self, email: &str, purpose: CodePurpose) -> StoreResult<Option<OneTimeCode>>;

    /// Atomically increment the attempt counter for the pair's code, if any
    fn increment_code_attempts(&self, email: &str, purpose: CodePurpose) -> StoreResult<()>;

    /// Mark the code matching the exact triple as used
    fn mark_code_used(&self, email: &str, code: &str, purpose: CodePurpose) -> StoreResult<()>;

    /// Delete the code for an (email, purpose) pair
    fn delete_code(&self, email: &str, purpose: CodePurpose) -> StoreResult<()>;

    /// Delete codes past expiry, returning how many
    fn cleanup_expired_codes(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

/// Workspaces, memberships and invitations
pub trait WorkspaceStore: Send + Sync {
    /// Create a workspace with the owner as its sole Admin member
    fn create_workspace(&self, new: NewWorkspace) -> StoreResult<Workspace>;

    /// Get a workspace with its member list
    fn get_workspace(&self, id: WorkspaceId) -> StoreResult<Option<Workspace>>;

    /// Delete a workspace and its members (compensation path only)
    fn delete_workspace(&self, id: WorkspaceId) -> StoreResult<()>;

    /// Add a member if absent. Fails with `AlreadyMember` when present.
    fn add_member(&self, id: WorkspaceId, member: WorkspaceMember) -> StoreResult<()>;

    /// Remove a member. Fails with `NotFound` when absent.
    fn remove_member(&self, id: WorkspaceId, user_id: AccountId) -> StoreResult<()>;

    /// Get a single membership entry
    fn get_member(
        &self,
        id: WorkspaceId,
        user_id: AccountId,
    ) -> StoreResult<Option<WorkspaceMember>>;

    /// Persist a new invitation keyed by its token
    fn create_invitation(&self, invitation: Invitation) -> StoreResult<()>;

    /// Get an invitation by token, whatever its state
    fn get_invitation(&self, token: &str) -> StoreResult<Option<Invitation>>;

    /// Get the pending invitation for an (email, workspace) pair, if any
    fn get_pending_invitation(
        &self,
        email: &str,
        workspace_id: WorkspaceId,
    ) -> StoreResult<Option<Invitation>>;

    /// Transition an invitation's status, recording acceptance details
    fn update_invitation_status(
        &self,
        token: &str,
        status: InvitationStatus,
        accepted_by: Option<AccountId>,
        accepted_at: Option<DateTime<Utc>>,
    ) -> StoreResult<()>;

    /// Delete an invitation (delivery-failure compensation)
    fn delete_invitation(&self, token: &str) -> StoreResult<()>;

    /// Flip overdue pending invitations to expired, returning how many
    fn expire_overdue_invitations(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

/// Trait for session storage
pub trait SessionStore: Send + Sync {
    /// Create a new session for a user
    fn create(&self, user_id: AccountId) -> StoreResult<Session>;

    /// Get a session by ID
    fn get(&self, session_id: &SessionId) -> StoreResult<Option<Session>>;

    /// Delete a session
    fn delete(&self, session_id: &SessionId) -> StoreResult<()>;
}
