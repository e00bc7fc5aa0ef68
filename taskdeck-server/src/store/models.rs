//! Data models for Taskdeck storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskdeck_core::WorkspaceRole;

/// Failed attempts allowed against a one-time code before it locks
pub const MAX_CODE_ATTEMPTS: u32 = 5;

/// Unique account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub u64);

/// Unique workspace identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceId(pub u64);

/// Unique session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// Lifecycle status of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    /// Registered but not yet verified (only exists transiently)
    Pending,
    /// Verified, usable account
    Active,
    /// Deactivated account
    Inactive,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AccountStatus::Pending),
            "active" => Some(AccountStatus::Active),
            "inactive" => Some(AccountStatus::Inactive),
            _ => None,
        }
    }
}

/// What a one-time code proves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodePurpose {
    EmailVerification,
    PasswordReset,
}

impl CodePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodePurpose::EmailVerification => "email_verification",
            CodePurpose::PasswordReset => "password_reset",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "email_verification" => Some(CodePurpose::EmailVerification),
            "password_reset" => Some(CodePurpose::PasswordReset),
            _ => None,
        }
    }
}

/// A permanent user account
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    /// Normalized (lowercase) email, unique across accounts
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub email_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub status: AccountStatus,
    /// Denormalized back-reference to workspace membership, kept in sync
    /// on every membership change
    pub workspaces: Vec<WorkspaceId>,
    pub created_at: DateTime<Utc>,
}

/// Fields permitted when creating an account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    /// Already hashed; stores copy this verbatim
    pub password_hash: String,
    pub display_name: String,
    pub email_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub status: AccountStatus,
}

/// An unverified registration, keyed by email, auto-expiring
#[derive(Debug, Clone)]
pub struct PendingRegistration {
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A numeric one-time code guarding email verification or password reset.
///
/// At most one code exists per (email, purpose); issuing replaces any
/// previous one.
#[derive(Debug, Clone)]
pub struct OneTimeCode {
    pub email: String,
    pub purpose: CodePurpose,
    pub code: String,
    pub attempts: u32,
    pub used: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl OneTimeCode {
    /// Whether the attempt cap has been reached
    pub fn locked(&self) -> bool {
        self.attempts >= MAX_CODE_ATTEMPTS
    }
}

/// Resolution state of an invitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
            InvitationStatus::Expired => "expired",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(InvitationStatus::Pending),
            "accepted" => Some(InvitationStatus::Accepted),
            "declined" => Some(InvitationStatus::Declined),
            "expired" => Some(InvitationStatus::Expired),
            _ => None,
        }
    }
}

/// A workspace membership invitation, keyed by its opaque token
#[derive(Debug, Clone)]
pub struct Invitation {
    pub token: String,
    pub email: String,
    pub workspace_id: WorkspaceId,
    pub inviter_id: AccountId,
    pub role: WorkspaceRole,
    pub status: InvitationStatus,
    /// Denormalized for display to the unauthenticated token holder
    pub inviter_name: String,
    pub workspace_name: String,
    pub message: Option<String>,
    pub accepted_by: Option<AccountId>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A workspace member entry
#[derive(Debug, Clone)]
pub struct WorkspaceMember {
    pub user_id: AccountId,
    pub role: WorkspaceRole,
    pub joined_at: DateTime<Utc>,
}

/// A task status in a workspace's taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDef {
    pub name: String,
    pub color: String,
}

/// A task priority in a workspace's taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityDef {
    pub name: String,
    pub level: u8,
}

/// Per-workspace taxonomies, seeded with defaults at creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    pub statuses: Vec<StatusDef>,
    pub priorities: Vec<PriorityDef>,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            statuses: vec![
                StatusDef { name: "to do".to_string(), color: "#d3d3d3".to_string() },
                StatusDef { name: "in progress".to_string(), color: "#4194f6".to_string() },
                StatusDef { name: "complete".to_string(), color: "#6bc950".to_string() },
            ],
            priorities: vec![
                PriorityDef { name: "urgent".to_string(), level: 1 },
                PriorityDef { name: "high".to_string(), level: 2 },
                PriorityDef { name: "normal".to_string(), level: 3 },
                PriorityDef { name: "low".to_string(), level: 4 },
            ],
        }
    }
}

/// A workspace and its member list
#[derive(Debug, Clone)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    pub owner_id: AccountId,
    /// Ordered by join time; always contains the owner as Admin
    pub members: Vec<WorkspaceMember>,
    pub color: String,
    pub icon: String,
    pub settings: WorkspaceSettings,
    pub created_at: DateTime<Utc>,
}

impl Workspace {
    pub fn member(&self, user_id: AccountId) -> Option<&WorkspaceMember> {
        self.members.iter().find(|m| m.user_id == user_id)
    }
}

/// Fields permitted when creating a workspace
#[derive(Debug, Clone)]
pub struct NewWorkspace {
    pub name: String,
    pub owner_id: AccountId,
    pub color: String,
    pub icon: String,
}

/// A user session
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub user_id: AccountId,
    pub csrf_token: String,
    pub created_at: DateTime<Utc>,
}
