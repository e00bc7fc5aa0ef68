//! SQLite-based storage implementation

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{
    Account, AccountId, AccountStatus, CodePurpose, DirectoryStore, Invitation, InvitationStatus,
    NewAccount, NewWorkspace, OneTimeCode, PendingRegistration, Session, SessionId, SessionStore,
    StoreResult, Workspace, WorkspaceId, WorkspaceMember, WorkspaceSettings, WorkspaceStore,
};
use crate::error::ApiError;
use taskdeck_core::WorkspaceRole;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// SQLite-based store implementing all storage traits
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> Result<Self, ApiError> {
        let conn = Connection::open(path).map_err(|e| ApiError::Internal(e.to_string()))?;

        // Enable foreign keys
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        // Run migrations
        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run database migrations
    fn migrate(conn: &Connection) -> Result<(), ApiError> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(|e| ApiError::Internal(e.to_string()))?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &Connection) -> Result<i32, ApiError> {
        let table_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
                [],
                |row| row.get(0),
            )
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        if !table_exists {
            return Ok(0);
        }

        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })
        .map_err(|e| ApiError::Internal(e.to_string()))
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &Connection) -> Result<(), ApiError> {
        conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Permanent accounts
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                display_name TEXT NOT NULL,
                email_verified INTEGER NOT NULL DEFAULT 0,
                verified_at TEXT,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            -- Denormalized back-reference: workspaces an account belongs to
            CREATE TABLE IF NOT EXISTS account_workspaces (
                account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                workspace_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (account_id, workspace_id)
            );

            -- Unverified registrations, at most one per email
            CREATE TABLE IF NOT EXISTS pending_registrations (
                email TEXT PRIMARY KEY,
                password_hash TEXT NOT NULL,
                display_name TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_pending_expires ON pending_registrations(expires_at);

            -- One-time codes, at most one per (email, purpose)
            CREATE TABLE IF NOT EXISTS one_time_codes (
                email TEXT NOT NULL,
                purpose TEXT NOT NULL,
                code TEXT NOT NULL,
                attempts INTEGER NOT NULL DEFAULT 0,
                used INTEGER NOT NULL DEFAULT 0,
                expires_at TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (email, purpose)
            );
            CREATE INDEX IF NOT EXISTS idx_codes_expires ON one_time_codes(expires_at);

            -- Workspaces
            CREATE TABLE IF NOT EXISTS workspaces (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                owner_id INTEGER NOT NULL REFERENCES accounts(id),
                color TEXT NOT NULL,
                icon TEXT NOT NULL,
                settings TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            -- Membership rows; the primary key is the add-if-absent primitive
            CREATE TABLE IF NOT EXISTS workspace_members (
                workspace_id INTEGER NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
                user_id INTEGER NOT NULL,
                role TEXT NOT NULL,
                joined_at TEXT NOT NULL,
                PRIMARY KEY (workspace_id, user_id)
            );

            -- Invitations keyed by their opaque token
            CREATE TABLE IF NOT EXISTS invitations (
                token TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                workspace_id INTEGER NOT NULL,
                inviter_id INTEGER NOT NULL,
                role TEXT NOT NULL,
                status TEXT NOT NULL,
                inviter_name TEXT NOT NULL,
                workspace_name TEXT NOT NULL,
                message TEXT,
                accepted_by INTEGER,
                accepted_at TEXT,
                expires_at TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_invitations_pair ON invitations(email, workspace_id);
            CREATE INDEX IF NOT EXISTS idx_invitations_expires ON invitations(expires_at);

            -- Sessions
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                csrf_token TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    let id: i64 = row.get(0)?;
    let email: String = row.get(1)?;
    let password_hash: String = row.get(2)?;
    let display_name: String = row.get(3)?;
    let email_verified: i32 = row.get(4)?;
    let verified_at: Option<String> = row.get(5)?;
    let status: String = row.get(6)?;
    let created_at: String = row.get(7)?;
    Ok(Account {
        id: AccountId(id as u64),
        email,
        password_hash,
        display_name,
        email_verified: email_verified != 0,
        verified_at: verified_at.as_deref().map(parse_timestamp),
        status: AccountStatus::from_str(&status).unwrap_or(AccountStatus::Pending),
        workspaces: Vec::new(),
        created_at: parse_timestamp(&created_at),
    })
}

fn row_to_invitation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Invitation> {
    let token: String = row.get(0)?;
    let email: String = row.get(1)?;
    let workspace_id: i64 = row.get(2)?;
    let inviter_id: i64 = row.get(3)?;
    let role: String = row.get(4)?;
    let status: String = row.get(5)?;
    let inviter_name: String = row.get(6)?;
    let workspace_name: String = row.get(7)?;
    let message: Option<String> = row.get(8)?;
    let accepted_by: Option<i64> = row.get(9)?;
    let accepted_at: Option<String> = row.get(10)?;
    let expires_at: String = row.get(11)?;
    let created_at: String = row.get(12)?;
    Ok(Invitation {
        token,
        email,
        workspace_id: WorkspaceId(workspace_id as u64),
        inviter_id: AccountId(inviter_id as u64),
        role: role.parse().unwrap_or(WorkspaceRole::Member),
        status: InvitationStatus::from_str(&status).unwrap_or(InvitationStatus::Pending),
        inviter_name,
        workspace_name,
        message,
        accepted_by: accepted_by.map(|id| AccountId(id as u64)),
        accepted_at: accepted_at.as_deref().map(parse_timestamp),
        expires_at: parse_timestamp(&expires_at),
        created_at: parse_timestamp(&created_at),
    })
}

const SELECT_ACCOUNT: &str = "SELECT id, email, password_hash, display_name, email_verified, \
     verified_at, status, created_at FROM accounts";

const SELECT_INVITATION: &str = "SELECT token, email, workspace_id, inviter_id, role, status, \
     inviter_name, workspace_name, message, accepted_by, accepted_at, expires_at, created_at \
     FROM invitations";

impl SqliteStore {
    fn load_workspace_links(
        conn: &Connection,
        account_id: AccountId,
    ) -> Result<Vec<WorkspaceId>, ApiError> {
        let mut stmt = conn
            .prepare(
                "SELECT workspace_id FROM account_workspaces WHERE account_id = ?1 ORDER BY position",
            )
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        let ids = stmt
            .query_map(params![account_id.0 as i64], |row| {
                let id: i64 = row.get(0)?;
                Ok(WorkspaceId(id as u64))
            })
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(ids)
    }

    fn load_members(
        conn: &Connection,
        workspace_id: WorkspaceId,
    ) -> Result<Vec<WorkspaceMember>, ApiError> {
        let mut stmt = conn
            .prepare(
                "SELECT user_id, role, joined_at FROM workspace_members \
                 WHERE workspace_id = ?1 ORDER BY joined_at, user_id",
            )
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        let members = stmt
            .query_map(params![workspace_id.0 as i64], |row| {
                let user_id: i64 = row.get(0)?;
                let role: String = row.get(1)?;
                let joined_at: String = row.get(2)?;
                Ok(WorkspaceMember {
                    user_id: AccountId(user_id as u64),
                    role: role.parse().unwrap_or(WorkspaceRole::Member),
                    joined_at: parse_timestamp(&joined_at),
                })
            })
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(members)
    }
}

impl DirectoryStore for SqliteStore {
    fn create_account(&self, new: NewAccount) -> StoreResult<AccountId> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO accounts (email, password_hash, display_name, email_verified, \
             verified_at, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                new.email,
                new.password_hash,
                new.display_name,
                new.email_verified as i32,
                new.verified_at.map(|t| t.to_rfc3339()),
                new.status.as_str(),
                now,
            ],
        )
        .map_err(|e| {
            if let rusqlite::Error::SqliteFailure(ref err, _) = e {
                if err.code == rusqlite::ErrorCode::ConstraintViolation {
                    return ApiError::Conflict;
                }
            }
            ApiError::Internal(e.to_string())
        })?;

        let id = conn.last_insert_rowid() as u64;
        Ok(AccountId(id))
    }

    fn get_account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        let conn = self.conn.lock().unwrap();

        let account = conn
            .query_row(
                &format!("{SELECT_ACCOUNT} WHERE id = ?1"),
                params![id.0 as i64],
                row_to_account,
            )
            .optional()
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        match account {
            Some(mut account) => {
                account.workspaces = Self::load_workspace_links(&conn, account.id)?;
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    fn get_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();

        let account = conn
            .query_row(
                &format!("{SELECT_ACCOUNT} WHERE email = ?1"),
                params![normalized],
                row_to_account,
            )
            .optional()
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        match account {
            Some(mut account) => {
                account.workspaces = Self::load_workspace_links(&conn, account.id)?;
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    fn update_password(&self, id: AccountId, password_hash: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "UPDATE accounts SET password_hash = ?1 WHERE id = ?2",
                params![password_hash, id.0 as i64],
            )
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        if rows_affected == 0 {
            return Err(ApiError::NotFound);
        }

        Ok(())
    }

    fn link_workspace(&self, id: AccountId, workspace_id: WorkspaceId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        // Position preserves insertion order; INSERT OR IGNORE makes the
        // link idempotent
        conn.execute(
            "INSERT OR IGNORE INTO account_workspaces (account_id, workspace_id, position) \
             VALUES (?1, ?2, (SELECT COALESCE(MAX(position), 0) + 1 FROM account_workspaces \
             WHERE account_id = ?1))",
            params![id.0 as i64, workspace_id.0 as i64],
        )
        .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(())
    }

    fn unlink_workspace(&self, id: AccountId, workspace_id: WorkspaceId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "DELETE FROM account_workspaces WHERE account_id = ?1 AND workspace_id = ?2",
            params![id.0 as i64, workspace_id.0 as i64],
        )
        .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(())
    }

    fn delete_account(&self, id: AccountId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        // Foreign keys with ON DELETE CASCADE handle links and sessions
        conn.execute("DELETE FROM accounts WHERE id = ?1", params![id.0 as i64])
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(())
    }

    fn replace_pending_registration(&self, pending: PendingRegistration) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        // Keyed by email, so the insert replaces any prior registration
        conn.execute(
            "INSERT OR REPLACE INTO pending_registrations \
             (email, password_hash, display_name, expires_at, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                pending.email,
                pending.password_hash,
                pending.display_name,
                pending.expires_at.to_rfc3339(),
                pending.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(())
    }

    fn get_pending_registration(&self, email: &str) -> StoreResult<Option<PendingRegistration>> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT email, password_hash, display_name, expires_at, created_at \
             FROM pending_registrations WHERE email = ?1",
            params![normalized],
            |row| {
                let email: String = row.get(0)?;
                let password_hash: String = row.get(1)?;
                let display_name: String = row.get(2)?;
                let expires_at: String = row.get(3)?;
                let created_at: String = row.get(4)?;
                Ok(PendingRegistration {
                    email,
                    password_hash,
                    display_name,
                    expires_at: parse_timestamp(&expires_at),
                    created_at: parse_timestamp(&created_at),
                })
            },
        )
        .optional()
        .map_err(|e| ApiError::Internal(e.to_string()))
    }

    fn delete_pending_registration(&self, email: &str) -> StoreResult<()> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "DELETE FROM pending_registrations WHERE email = ?1",
            params![normalized],
        )
        .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(())
    }

    fn cleanup_expired_registrations(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();

        let rows_deleted = conn
            .execute(
                "DELETE FROM pending_registrations WHERE expires_at < ?1",
                params![now.to_rfc3339()],
            )
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(rows_deleted as u64)
    }

    fn replace_code(&self, code: OneTimeCode) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        // Keyed by (email, purpose), so the insert deletes the prior code
        conn.execute(
            "INSERT OR REPLACE INTO one_time_codes \
             (email, purpose, code, attempts, used, expires_at, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                code.email,
                code.purpose.as_str(),
                code.code,
                code.attempts,
                code.used as i32,
                code.expires_at.to_rfc3339(),
                code.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(())
    }

    fn find_code(
        &self,
        email: &str,
        code: &str,
        purpose: CodePurpose,
    ) -> StoreResult<Option<OneTimeCode>> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT email, purpose, code, attempts, used, expires_at, created_at \
             FROM one_time_codes WHERE email = ?1 AND purpose = ?2 AND code = ?3",
            params![normalized, purpose.as_str(), code],
            row_to_code,
        )
        .optional()
        .map_err(|e| ApiError::Internal(e.to_string()))
    }

    fn get_code(&self, email: &str, purpose: CodePurpose) -> StoreResult<Option<OneTimeCode>> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT email, purpose, code, attempts, used, expires_at, created_at \
             FROM one_time_codes WHERE email = ?1 AND purpose = ?2",
            params![normalized, purpose.as_str()],
            row_to_code,
        )
        .optional()
        .map_err(|e| ApiError::Internal(e.to_string()))
    }

    fn increment_code_attempts(&self, email: &str, purpose: CodePurpose) -> StoreResult<()> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();

        // Atomic in-store increment, safe across server instances
        conn.execute(
            "UPDATE one_time_codes SET attempts = attempts + 1 \
             WHERE email = ?1 AND purpose = ?2",
            params![normalized, purpose.as_str()],
        )
        .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(())
    }

    fn mark_code_used(&self, email: &str, code: &str, purpose: CodePurpose) -> StoreResult<()> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "UPDATE one_time_codes SET used = 1 \
                 WHERE email = ?1 AND purpose = ?2 AND code = ?3",
                params![normalized, purpose.as_str(), code],
            )
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        if rows_affected == 0 {
            return Err(ApiError::NotFound);
        }

        Ok(())
    }

    fn delete_code(&self, email: &str, purpose: CodePurpose) -> StoreResult<()> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "DELETE FROM one_time_codes WHERE email = ?1 AND purpose = ?2",
            params![normalized, purpose.as_str()],
        )
        .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(())
    }

    fn cleanup_expired_codes(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();

        let rows_deleted = conn
            .execute(
                "DELETE FROM one_time_codes WHERE expires_at < ?1",
                params![now.to_rfc3339()],
            )
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(rows_deleted as u64)
    }
}

fn row_to_code(row: &rusqlite::Row<'_>) -> rusqlite::Result<OneTimeCode> {
    let email: String = row.get(0)?;
    let purpose: String = row.get(1)?;
    let code: String = row.get(2)?;
    let attempts: u32 = row.get(3)?;
    let used: i32 = row.get(4)?;
    let expires_at: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    Ok(OneTimeCode {
        email,
        purpose: CodePurpose::from_str(&purpose).unwrap_or(CodePurpose::EmailVerification),
        code,
        attempts,
        used: used != 0,
        expires_at: parse_timestamp(&expires_at),
        created_at: parse_timestamp(&created_at),
    })
}

impl WorkspaceStore for SqliteStore {
    fn create_workspace(&self, new: NewWorkspace) -> StoreResult<Workspace> {
        let mut conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let settings = WorkspaceSettings::default();
        let settings_json =
            serde_json::to_string(&settings).map_err(|e| ApiError::Internal(e.to_string()))?;

        let tx = conn
            .transaction()
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        tx.execute(
            "INSERT INTO workspaces (name, owner_id, color, icon, settings, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new.name,
                new.owner_id.0 as i64,
                new.color,
                new.icon,
                settings_json,
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| ApiError::Internal(e.to_string()))?;

        let id = WorkspaceId(tx.last_insert_rowid() as u64);

        // The owner joins as Admin in the same transaction
        tx.execute(
            "INSERT INTO workspace_members (workspace_id, user_id, role, joined_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                id.0 as i64,
                new.owner_id.0 as i64,
                WorkspaceRole::Admin.as_str(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| ApiError::Internal(e.to_string()))?;

        tx.commit().map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(Workspace {
            id,
            name: new.name,
            owner_id: new.owner_id,
            members: vec![WorkspaceMember {
                user_id: new.owner_id,
                role: WorkspaceRole::Admin,
                joined_at: now,
            }],
            color: new.color,
            icon: new.icon,
            settings,
            created_at: now,
        })
    }

    fn get_workspace(&self, id: WorkspaceId) -> StoreResult<Option<Workspace>> {
        let conn = self.conn.lock().unwrap();

        let workspace = conn
            .query_row(
                "SELECT id, name, owner_id, color, icon, settings, created_at \
                 FROM workspaces WHERE id = ?1",
                params![id.0 as i64],
                |row| {
                    let id: i64 = row.get(0)?;
                    let name: String = row.get(1)?;
                    let owner_id: i64 = row.get(2)?;
                    let color: String = row.get(3)?;
                    let icon: String = row.get(4)?;
                    let settings: String = row.get(5)?;
                    let created_at: String = row.get(6)?;
                    Ok((id, name, owner_id, color, icon, settings, created_at))
                },
            )
            .optional()
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        let Some((id, name, owner_id, color, icon, settings, created_at)) = workspace else {
            return Ok(None);
        };

        let workspace_id = WorkspaceId(id as u64);
        let members = Self::load_members(&conn, workspace_id)?;

        Ok(Some(Workspace {
            id: workspace_id,
            name,
            owner_id: AccountId(owner_id as u64),
            members,
            color,
            icon,
            settings: serde_json::from_str(&settings).unwrap_or_default(),
            created_at: parse_timestamp(&created_at),
        }))
    }

    fn delete_workspace(&self, id: WorkspaceId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        // Members cascade with the workspace row
        conn.execute("DELETE FROM workspaces WHERE id = ?1", params![id.0 as i64])
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(())
    }

    fn add_member(&self, id: WorkspaceId, member: WorkspaceMember) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM workspaces WHERE id = ?1)",
                params![id.0 as i64],
                |row| row.get(0),
            )
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        if !exists {
            return Err(ApiError::NotFound);
        }

        // The (workspace, user) primary key is the add-if-absent primitive
        conn.execute(
            "INSERT INTO workspace_members (workspace_id, user_id, role, joined_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                id.0 as i64,
                member.user_id.0 as i64,
                member.role.as_str(),
                member.joined_at.to_rfc3339(),
            ],
        )
        .map_err(|e| {
            if let rusqlite::Error::SqliteFailure(ref err, _) = e {
                if err.code == rusqlite::ErrorCode::ConstraintViolation {
                    return ApiError::AlreadyMember;
                }
            }
            ApiError::Internal(e.to_string())
        })?;

        Ok(())
    }

    fn remove_member(&self, id: WorkspaceId, user_id: AccountId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "DELETE FROM workspace_members WHERE workspace_id = ?1 AND user_id = ?2",
                params![id.0 as i64, user_id.0 as i64],
            )
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        if rows_affected == 0 {
            return Err(ApiError::NotFound);
        }

        Ok(())
    }

    fn get_member(
        &self,
        id: WorkspaceId,
        user_id: AccountId,
    ) -> StoreResult<Option<WorkspaceMember>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT user_id, role, joined_at FROM workspace_members \
             WHERE workspace_id = ?1 AND user_id = ?2",
            params![id.0 as i64, user_id.0 as i64],
            |row| {
                let user_id: i64 = row.get(0)?;
                let role: String = row.get(1)?;
                let joined_at: String = row.get(2)?;
                Ok(WorkspaceMember {
                    user_id: AccountId(user_id as u64),
                    role: role.parse().unwrap_or(WorkspaceRole::Member),
                    joined_at: parse_timestamp(&joined_at),
                })
            },
        )
        .optional()
        .map_err(|e| ApiError::Internal(e.to_string()))
    }

    fn create_invitation(&self, invitation: Invitation) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO invitations (token, email, workspace_id, inviter_id, role, status, \
             inviter_name, workspace_name, message, accepted_by, accepted_at, expires_at, \
             created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                invitation.token,
                invitation.email,
                invitation.workspace_id.0 as i64,
                invitation.inviter_id.0 as i64,
                invitation.role.as_str(),
                invitation.status.as_str(),
                invitation.inviter_name,
                invitation.workspace_name,
                invitation.message,
                invitation.accepted_by.map(|id| id.0 as i64),
                invitation.accepted_at.map(|t| t.to_rfc3339()),
                invitation.expires_at.to_rfc3339(),
                invitation.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(())
    }

    fn get_invitation(&self, token: &str) -> StoreResult<Option<Invitation>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!("{SELECT_INVITATION} WHERE token = ?1"),
            params![token],
            row_to_invitation,
        )
        .optional()
        .map_err(|e| ApiError::Internal(e.to_string()))
    }

    fn get_pending_invitation(
        &self,
        email: &str,
        workspace_id: WorkspaceId,
    ) -> StoreResult<Option<Invitation>> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!(
                "{SELECT_INVITATION} WHERE email = ?1 AND workspace_id = ?2 AND status = ?3"
            ),
            params![
                normalized,
                workspace_id.0 as i64,
                InvitationStatus::Pending.as_str()
            ],
            row_to_invitation,
        )
        .optional()
        .map_err(|e| ApiError::Internal(e.to_string()))
    }

    fn update_invitation_status(
        &self,
        token: &str,
        status: InvitationStatus,
        accepted_by: Option<AccountId>,
        accepted_at: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "UPDATE invitations SET status = ?1, accepted_by = ?2, accepted_at = ?3 \
                 WHERE token = ?4",
                params![
                    status.as_str(),
                    accepted_by.map(|id| id.0 as i64),
                    accepted_at.map(|t| t.to_rfc3339()),
                    token,
                ],
            )
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        if rows_affected == 0 {
            return Err(ApiError::NotFound);
        }

        Ok(())
    }

    fn delete_invitation(&self, token: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute("DELETE FROM invitations WHERE token = ?1", params![token])
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(())
    }

    fn expire_overdue_invitations(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "UPDATE invitations SET status = ?1 WHERE status = ?2 AND expires_at < ?3",
                params![
                    InvitationStatus::Expired.as_str(),
                    InvitationStatus::Pending.as_str(),
                    now.to_rfc3339(),
                ],
            )
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(rows_affected as u64)
    }
}

impl SessionStore for SqliteStore {
    fn create(&self, user_id: AccountId) -> StoreResult<Session> {
        let conn = self.conn.lock().unwrap();
        let session = Session {
            id: SessionId(Uuid::new_v4().to_string()),
            user_id,
            csrf_token: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
        };

        conn.execute(
            "INSERT INTO sessions (id, user_id, csrf_token, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id.0,
                session.user_id.0 as i64,
                session.csrf_token,
                session.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(session)
    }

    fn get(&self, session_id: &SessionId) -> StoreResult<Option<Session>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, user_id, csrf_token, created_at FROM sessions WHERE id = ?1",
            params![session_id.0],
            |row| {
                let id: String = row.get(0)?;
                let user_id: i64 = row.get(1)?;
                let csrf_token: String = row.get(2)?;
                let created_at: String = row.get(3)?;
                Ok(Session {
                    id: SessionId(id),
                    user_id: AccountId(user_id as u64),
                    csrf_token,
                    created_at: parse_timestamp(&created_at),
                })
            },
        )
        .optional()
        .map_err(|e| ApiError::Internal(e.to_string()))
    }

    fn delete(&self, session_id: &SessionId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id.0])
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        (store, dir) // Return dir to keep it alive
    }

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
        let (store, _dir) = create_test_store();

        let id = store.create_account(new_account("test@example.com")).unwrap();
        let account = store.get_account_by_email("test@example.com").unwrap();
        assert!(account.is_some());
        assert_eq!(account.unwrap().id, id);
    }

    #[test]
    fn test_duplicate_account_conflicts() {
        let (store, _dir) = create_test_store();

        store.create_account(new_account("dup@example.com")).unwrap();
        let result = store.create_account(new_account("dup@example.com"));
        assert!(matches!(result, Err(ApiError::Conflict)));
    }

    #[test]
    fn test_workspace_link_round_trip() {
        let (store, _dir) = create_test_store();

        let id = store.create_account(new_account("link@example.com")).unwrap();
        let workspace = store
            .create_workspace(NewWorkspace {
                name: "Team".to_string(),
                owner_id: id,
                color: "#7b68ee".to_string(),
                icon: "grid".to_string(),
            })
            .unwrap();

        store.link_workspace(id, workspace.id).unwrap();
        let account = store.get_account(id).unwrap().unwrap();
        assert_eq!(account.workspaces, vec![workspace.id]);

        store.unlink_workspace(id, workspace.id).unwrap();
        let account = store.get_account(id).unwrap().unwrap();
        assert!(account.workspaces.is_empty());
    }

    #[test]
    fn test_workspace_created_with_owner_as_admin() {
        let (store, _dir) = create_test_store();

        let owner = store.create_account(new_account("owner@example.com")).unwrap();
        let workspace = store
            .create_workspace(NewWorkspace {
                name: "Team".to_string(),
                owner_id: owner,
                color: "#7b68ee".to_string(),
                icon: "grid".to_string(),
            })
            .unwrap();

        let loaded = store.get_workspace(workspace.id).unwrap().unwrap();
        assert_eq!(loaded.members.len(), 1);
        assert_eq!(loaded.members[0].user_id, owner);
        assert_eq!(loaded.members[0].role, WorkspaceRole::Admin);
        assert!(!loaded.settings.statuses.is_empty());
    }

    #[test]
    fn test_add_member_rejects_duplicates() {
        let (store, _dir) = create_test_store();

        let owner = store.create_account(new_account("owner2@example.com")).unwrap();
        let workspace = store
            .create_workspace(NewWorkspace {
                name: "Team".to_string(),
                owner_id: owner,
                color: "#7b68ee".to_string(),
                icon: "grid".to_string(),
            })
            .unwrap();

        let result = store.add_member(
            workspace.id,
            WorkspaceMember {
                user_id: owner,
                role: WorkspaceRole::Admin,
                joined_at: Utc::now(),
            },
        );
        assert!(matches!(result, Err(ApiError::AlreadyMember)));
    }

    #[test]
    fn test_replace_code_keeps_one_per_pair() {
        let (store, _dir) = create_test_store();
        let now = Utc::now();

        for code in ["111111", "222222"] {
            store
                .replace_code(OneTimeCode {
                    email: "a@example.com".to_string(),
                    purpose: CodePurpose::EmailVerification,
                    code: code.to_string(),
                    attempts: 0,
                    used: false,
                    expires_at: now + Duration::minutes(10),
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
    fn test_increment_attempts_persists() {
        let (store, _dir) = create_test_store();
        let now = Utc::now();

        store
            .replace_code(OneTimeCode {
                email: "b@example.com".to_string(),
                purpose: CodePurpose::EmailVerification,
                code: "333333".to_string(),
                attempts: 0,
                used: false,
                expires_at: now + Duration::minutes(10),
                created_at: now,
            })
            .unwrap();

        store
            .increment_code_attempts("b@example.com", CodePurpose::EmailVerification)
            .unwrap();
        store
            .increment_code_attempts("b@example.com", CodePurpose::EmailVerification)
            .unwrap();

        let code = store
            .get_code("b@example.com", CodePurpose::EmailVerification)
            .unwrap()
            .unwrap();
        assert_eq!(code.attempts, 2);
    }

    #[test]
    fn test_invitation_round_trip_and_expiry_sweep() {
        let (store, _dir) = create_test_store();
        let now = Utc::now();
        let owner = store.create_account(new_account("inviter@example.com")).unwrap();

        store
            .create_invitation(Invitation {
                token: "tok-1".to_string(),
                email: "invitee@example.com".to_string(),
                workspace_id: WorkspaceId(1),
                inviter_id: owner,
                role: WorkspaceRole::Member,
                status: InvitationStatus::Pending,
                inviter_name: "Owner".to_string(),
                workspace_name: "Team".to_string(),
                message: Some("join us".to_string()),
                accepted_by: None,
                accepted_at: None,
                expires_at: now - Duration::hours(1),
                created_at: now - Duration::hours(73),
            })
            .unwrap();

        let loaded = store.get_invitation("tok-1").unwrap().unwrap();
        assert_eq!(loaded.email, "invitee@example.com");
        assert_eq!(loaded.status, InvitationStatus::Pending);

        let flipped = store.expire_overdue_invitations(now).unwrap();
        assert_eq!(flipped, 1);
        let loaded = store.get_invitation("tok-1").unwrap().unwrap();
        assert_eq!(loaded.status, InvitationStatus::Expired);
    }

    #[test]
    fn test_pending_registration_cleanup() {
        let (store, _dir) = create_test_store();
        let now = Utc::now();

        store
            .replace_pending_registration(PendingRegistration {
                email: "old@example.com".to_string(),
                password_hash: "hashed".to_string(),
                display_name: "Old".to_string(),
                expires_at: now - Duration::hours(1),
                created_at: now - Duration::hours(25),
            })
            .unwrap();
        store
            .replace_pending_registration(PendingRegistration {
                email: "fresh@example.com".to_string(),
                password_hash: "hashed".to_string(),
                display_name: "Fresh".to_string(),
                expires_at: now + Duration::hours(23),
                created_at: now,
            })
            .unwrap();

        let purged = store.cleanup_expired_registrations(now).unwrap();
        assert_eq!(purged, 1);
        assert!(store.get_pending_registration("old@example.com").unwrap().is_none());
        assert!(store.get_pending_registration("fresh@example.com").unwrap().is_some());
    }

    #[test]
    fn test_session_lifecycle() {
        let (store, _dir) = create_test_store();

        let user_id = store.create_account(new_account("sess@example.com")).unwrap();
        let session = store.create(user_id).unwrap();

        assert!(store.get(&session.id).unwrap().is_some());

        store.delete(&session.id).unwrap();
        assert!(store.get(&session.id).unwrap().is_none());
    }

    #[test]
    fn test_schema_migration_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("migrate.db");

        {
            let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
            store.create_account(new_account("persist@example.com")).unwrap();
        }

        // Reopening runs migrations again against the existing schema
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        assert!(store
            .get_account_by_email("persist@example.com")
            .unwrap()
            .is_some());
    }
}
