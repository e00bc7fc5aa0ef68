//! In-memory storage implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    Account, AccountId, CodePurpose, DirectoryStore, Invitation, InvitationStatus, NewAccount,
    NewWorkspace, OneTimeCode, PendingRegistration, Session, SessionId, SessionStore, StoreResult,
    Workspace, WorkspaceId, WorkspaceMember, WorkspaceSettings, WorkspaceStore,
};
use crate::error::ApiError;
use taskdeck_core::WorkspaceRole;

/// In-memory store implementing all storage traits, for development and
/// tests. Each map is guarded by its own lock; compound operations stay
/// consistent because every mutation happens under a single write lock.
pub struct MemoryStore {
    accounts: RwLock<HashMap<AccountId, Account>>,
    pending: RwLock<HashMap<String, PendingRegistration>>,
    codes: RwLock<HashMap<(String, CodePurpose), OneTimeCode>>,
    workspaces: RwLock<HashMap<WorkspaceId, Workspace>>,
    invitations: RwLock<HashMap<String, Invitation>>,
    sessions: RwLock<HashMap<SessionId, Session>>,
    next_account_id: AtomicU64,
    next_workspace_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            pending: RwLock::new(HashMap::new()),
            codes: RwLock::new(HashMap::new()),
            workspaces: RwLock::new(HashMap::new()),
            invitations: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            next_account_id: AtomicU64::new(1),
            next_workspace_id: AtomicU64::new(1),
        }
    }

    /// Backdate a record's expiry (for testing expiry paths)
    pub fn set_code_expiry(
        &self,
        email: &str,
        purpose: CodePurpose,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut codes = self.codes.write().unwrap();
        if let Some(code) = codes.get_mut(&(email.to_string(), purpose)) {
            code.expires_at = expires_at;
            Ok(())
        } else {
            Err(ApiError::NotFound)
        }
    }

    /// Backdate an invitation's expiry (for testing expiry paths)
    pub fn set_invitation_expiry(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut invitations = self.invitations.write().unwrap();
        if let Some(invitation) = invitations.get_mut(token) {
            invitation.expires_at = expires_at;
            Ok(())
        } else {
            Err(ApiError::NotFound)
        }
    }

    /// Backdate a pending registration's expiry (for testing expiry paths)
    pub fn set_registration_expiry(
        &self,
        email: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut pending = self.pending.write().unwrap();
        if let Some(registration) = pending.get_mut(email) {
            registration.expires_at = expires_at;
            Ok(())
        } else {
            Err(ApiError::NotFound)
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryStore for MemoryStore {
    fn create_account(&self, new: NewAccount) -> StoreResult<AccountId> {
        let mut accounts = self.accounts.write().unwrap();
        if accounts.values().any(|a| a.email == new.email) {
            return Err(ApiError::Conflict);
        }
        let id = AccountId(self.next_account_id.fetch_add(1, Ordering::SeqCst));
        accounts.insert(
            id,
            Account {
                id,
                email: new.email,
                password_hash: new.password_hash,
                display_name: new.display_name,
                email_verified: new.email_verified,
                verified_at: new.verified_at,
                status: new.status,
                workspaces: Vec::new(),
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    fn get_account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        Ok(self.accounts.read().unwrap().get(&id).cloned())
    }

    fn get_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let normalized = email.to_lowercase();
        Ok(self
            .accounts
            .read()
            .unwrap()
            .values()
            .find(|a| a.email == normalized)
            .cloned())
    }

    fn update_password(&self, id: AccountId, password_hash: &str) -> StoreResult<()> {
        let mut accounts = self.accounts.write().unwrap();
        let account = accounts.get_mut(&id).ok_or(ApiError::NotFound)?;
        account.password_hash = password_hash.to_string();
        Ok(())
    }

    fn link_workspace(&self, id: AccountId, workspace_id: WorkspaceId) -> StoreResult<()> {
        let mut accounts = self.accounts.write().unwrap();
        let account = accounts.get_mut(&id).ok_or(ApiError::NotFound)?;
        if !account.workspaces.contains(&workspace_id) {
            account.workspaces.push(workspace_id);
        }
        Ok(())
    }

    fn unlink_workspace(&self, id: AccountId, workspace_id: WorkspaceId) -> StoreResult<()> {
        let mut accounts = self.accounts.write().unwrap();
        let account = accounts.get_mut(&id).ok_or(ApiError::NotFound)?;
        account.workspaces.retain(|w| *w != workspace_id);
        Ok(())
    }

    fn delete_account(&self, id: AccountId) -> StoreResult<()> {
        self.accounts.write().unwrap().remove(&id);
        Ok(())
    }

    fn replace_pending_registration(&self, pending: PendingRegistration) -> StoreResult<()> {
        // Insertion replaces any prior registration for the email
        self.pending
            .write()
            .unwrap()
            .insert(pending.email.clone(), pending);
        Ok(())
    }

    fn get_pending_registration(&self, email: &str) -> StoreResult<Option<PendingRegistration>> {
        let normalized = email.to_lowercase();
        Ok(self.pending.read().unwrap().get(&normalized).cloned())
    }

    fn delete_pending_registration(&self, email: &str) -> StoreResult<()> {
        let normalized = email.to_lowercase();
        self.pending.write().unwrap().remove(&normalized);
        Ok(())
    }

    fn cleanup_expired_registrations(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut pending = self.pending.write().unwrap();
        let before = pending.len();
        pending.retain(|_, p| p.expires_at >= now);
        Ok((before - pending.len()) as u64)
    }

    fn replace_code(&self, code: OneTimeCode) -> StoreResult<()> {
        // Keyed by (email, purpose), so insertion deletes the prior code
        self.codes
            .write()
            .unwrap()
            .insert((code.email.clone(), code.purpose), code);
        Ok(())
    }

    fn find_code(
        &self,
        email: &str,
        code: &str,
        purpose: CodePurpose,
    ) -> StoreResult<Option<OneTimeCode>> {
        let normalized = email.to_lowercase();
        let codes = self.codes.read().unwrap();
        Ok(codes
            .get(&(normalized, purpose))
            .filter(|c| c.code == code)
            .cloned())
    }

    fn get_code(&self, email: &str, purpose: CodePurpose) -> StoreResult<Option<OneTimeCode>> {
        let normalized = email.to_lowercase();
        Ok(self.codes.read().unwrap().get(&(normalized, purpose)).cloned())
    }

    fn increment_code_attempts(&self, email: &str, purpose: CodePurpose) -> StoreResult<()> {
        let normalized = email.to_lowercase();
        let mut codes = self.codes.write().unwrap();
        if let Some(code) = codes.get_mut(&(normalized, purpose)) {
            code.attempts += 1;
        }
        Ok(())
    }

    fn mark_code_used(&self, email: &str, code: &str, purpose: CodePurpose) -> StoreResult<()> {
        let normalized = email.to_lowercase();
        let mut codes = self.codes.write().unwrap();
        match codes.get_mut(&(normalized, purpose)) {
            Some(record) if record.code == code => {
                record.used = true;
                Ok(())
            }
            _ => Err(ApiError::NotFound),
        }
    }

    fn delete_code(&self, email: &str, purpose: CodePurpose) -> StoreResult<()> {
        let normalized = email.to_lowercase();
        self.codes.write().unwrap().remove(&(normalized, purpose));
        Ok(())
    }

    fn cleanup_expired_codes(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut codes = self.codes.write().unwrap();
        let before = codes.len();
        codes.retain(|_, c| c.expires_at >= now);
        Ok((before - codes.len()) as u64)
    }
}

impl WorkspaceStore for MemoryStore {
    fn create_workspace(&self, new: NewWorkspace) -> StoreResult<Workspace> {
        let id = WorkspaceId(self.next_workspace_id.fetch_add(1, Ordering::SeqCst));
        let workspace = Workspace {
            id,
            name: new.name,
            owner_id: new.owner_id,
            members: vec![WorkspaceMember {
                user_id: new.owner_id,
                role: WorkspaceRole::Admin,
                joined_at: Utc::now(),
            }],
            color: new.color,
            icon: new.icon,
            settings: WorkspaceSettings::default(),
            created_at: Utc::now(),
        };
        self.workspaces
            .write()
            .unwrap()
            .insert(id, workspace.clone());
        Ok(workspace)
    }

    fn get_workspace(&self, id: WorkspaceId) -> StoreResult<Option<Workspace>> {
        Ok(self.workspaces.read().unwrap().get(&id).cloned())
    }

    fn delete_workspace(&self, id: WorkspaceId) -> StoreResult<()> {
        self.workspaces.write().unwrap().remove(&id);
        Ok(())
    }

    fn add_member(&self, id: WorkspaceId, member: WorkspaceMember) -> StoreResult<()> {
        // Add-if-absent under the write lock
        let mut workspaces = self.workspaces.write().unwrap();
        let workspace = workspaces.get_mut(&id).ok_or(ApiError::NotFound)?;
        if workspace.members.iter().any(|m| m.user_id == member.user_id) {
            return Err(ApiError::AlreadyMember);
        }
        workspace.members.push(member);
        Ok(())
    }

    fn remove_member(&self, id: WorkspaceId, user_id: AccountId) -> StoreResult<()> {
        let mut workspaces = self.workspaces.write().unwrap();
        let workspace = workspaces.get_mut(&id).ok_or(ApiError::NotFound)?;
        let before = workspace.members.len();
        workspace.members.retain(|m| m.user_id != user_id);
        if workspace.members.len() == before {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }

    fn get_member(
        &self,
        id: WorkspaceId,
        user_id: AccountId,
    ) -> StoreResult<Option<WorkspaceMember>> {
        let workspaces = self.workspaces.read().unwrap();
        let workspace = workspaces.get(&id).ok_or(ApiError::NotFound)?;
        Ok(workspace.member(user_id).cloned())
    }

    fn create_invitation(&self, invitation: Invitation) -> StoreResult<()> {
        self.invitations
            .write()
            .unwrap()
            .insert(invitation.token.clone(), invitation);
        Ok(())
    }

    fn get_invitation(&self, token: &str) -> StoreResult<Option<Invitation>> {
        Ok(self.invitations.read().unwrap().get(token).cloned())
    }

    fn get_pending_invitation(
        &self,
        email: &str,
        workspace_id: WorkspaceId,
    ) -> StoreResult<Option<Invitation>> {
        let normalized = email.to_lowercase();
        let invitations = self.invitations.read().unwrap();
        Ok(invitations
            .values()
            .find(|i| {
                i.email == normalized
                    && i.workspace_id == workspace_id
                    && i.status == InvitationStatus::Pending
            })
            .cloned())
    }

    fn update_invitation_status(
        &self,
        token: &str,
        status: InvitationStatus,
        accepted_by: Option<AccountId>,
        accepted_at: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        let mut invitations = self.invitations.write().unwrap();
        let invitation = invitations.get_mut(token).ok_or(ApiError::NotFound)?;
        invitation.status = status;
        invitation.accepted_by = accepted_by;
        invitation.accepted_at = accepted_at;
        Ok(())
    }

    fn delete_invitation(&self, token: &str) -> StoreResult<()> {
        self.invitations.write().unwrap().remove(token);
        Ok(())
    }

    fn expire_overdue_invitations(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut invitations = self.invitations.write().unwrap();
        let mut flipped = 0;
        for invitation in invitations.values_mut() {
            if invitation.status == InvitationStatus::Pending && invitation.expires_at < now {
                invitation.status = InvitationStatus::Expired;
                flipped += 1;
            }
        }
        Ok(flipped)
    }
}

impl SessionStore for MemoryStore {
    fn create(&self, user_id: AccountId) -> StoreResult<Session> {
        let session = Session {
            id: SessionId(Uuid::new_v4().to_string()),
            user_id,
            csrf_token: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
        };
        self.sessions
            .write()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn get(&self, session_id: &SessionId) -> StoreResult<Option<Session>> {
        Ok(self.sessions.read().unwrap().get(session_id).cloned())
    }

    fn delete(&self, session_id: &SessionId) -> StoreResult<()> {
        self.sessions.write().unwrap().remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AccountStatus;

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            password_hash: "hashed".to_string(),
            display_name: "Test".to_string(),
            email_verified: true,
            verified_at: Some(Utc::now()),
            status: AccountStatus::Active,
        }
    }

    #[test]
    fn test_create_account_and_lookup() {
        let store = MemoryStore::new();

        let id = store.create_account(new_account("test@example.com")).unwrap();
        let account = store.get_account_by_email("Test@Example.com").unwrap();
        assert!(account.is_some());
        assert_eq!(account.unwrap().id, id);
    }

    #[test]
    fn test_duplicate_account_conflicts() {
        let store = MemoryStore::new();

        store.create_account(new_account("dup@example.com")).unwrap();
        let err = store.create_account(new_account("dup@example.com")).unwrap_err();
        assert!(matches!(err, ApiError::Conflict));
    }

    #[test]
    fn test_replace_code_keeps_one_per_pair() {
        let store = MemoryStore::new();
        let now = Utc::now();

        for code in ["111111", "222222"] {
            store
                .replace_code(OneTimeCode {
                    email: "a@example.com".to_string(),
                    purpose: CodePurpose::EmailVerification,
                    code: code.to_string(),
                    attempts: 0,
                    used: false,
                    expires_at: now + chrono::Duration::minutes(10),
                    created_at: now,
                })
                .unwrap();
        }

        assert!(store
            .find_code("a@example.com", "111111", CodePurpose::EmailVerification)
            .unwrap()
            .is_none());
        assert!(store
            .find_code("a@example.com", "222222", CodePurpose::EmailVerification)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_add_member_rejects_duplicates() {
        let store = MemoryStore::new();
        let owner = store.create_account(new_account("owner@example.com")).unwrap();
        let workspace = store
            .create_workspace(NewWorkspace {
                name: "Team".to_string(),
                owner_id: owner,
                color: "#7b68ee".to_string(),
                icon: "grid".to_string(),
            })
            .unwrap();

        let err = store
            .add_member(
                workspace.id,
                WorkspaceMember {
                    user_id: owner,
                    role: WorkspaceRole::Admin,
                    joined_at: Utc::now(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, ApiError::AlreadyMember));
    }

    #[test]
    fn test_session_lifecycle() {
        let store = MemoryStore::new();

        let session = store.create(AccountId(1)).unwrap();
        assert!(store.get(&session.id).unwrap().is_some());

        store.delete(&session.id).unwrap();
        assert!(store.get(&session.id).unwrap().is_none());
    }
}
