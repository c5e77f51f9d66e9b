//! Storage seams used by the role mutation service.
//!
//! Each concern is its own trait so tests can wrap the SQLite backend and
//! inject a failure into exactly one of the two writes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::audit;
use crate::authz::OwnRecordLookup;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::account::Account;
use crate::models::audit::{AuditLogEntry, ClaimSyncIssue};
use crate::store::{accounts, credentials};

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_account(&self, id: Uuid) -> AppResult<Option<Account>>;

    async fn count_enabled_admins(&self) -> AppResult<i64>;

    async fn write_admin_flag(&self, id: Uuid, is_admin: bool, at: DateTime<Utc>) -> AppResult<()>;

    async fn write_disabled_flag(&self, id: Uuid, disabled: bool, actor: Uuid, at: DateTime<Utc>) -> AppResult<()>;
}

/// The identity layer: signed claims and the session-level disable flag.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn set_admin_claim(&self, id: Uuid, is_admin: bool) -> AppResult<()>;

    async fn set_disabled(&self, id: Uuid, disabled: bool) -> AppResult<()>;
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: &AuditLogEntry) -> AppResult<()>;
}

#[async_trait]
pub trait SyncIssueLog: Send + Sync {
    async fn record_sync_issue(&self, issue: &ClaimSyncIssue) -> AppResult<()>;
}

#[derive(Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
    audit_lock: Arc<Mutex<()>>,
}

impl SqliteBackend {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            audit_lock: Arc::new(Mutex::new(())),
        }
    }
}

fn require_row(affected: u64, id: Uuid) -> AppResult<()> {
    if affected == 0 {
        return Err(AppError::not_found(format!("account {} not found", id)));
    }
    Ok(())
}

#[async_trait]
impl AccountDirectory for SqliteBackend {
    async fn find_account(&self, id: Uuid) -> AppResult<Option<Account>> {
        accounts::find_account(&self.pool, id).await
    }

    async fn count_enabled_admins(&self) -> AppResult<i64> {
        accounts::count_enabled_admins(&self.pool).await
    }

    async fn write_admin_flag(&self, id: Uuid, is_admin: bool, at: DateTime<Utc>) -> AppResult<()> {
        let affected = accounts::write_admin_flag(&self.pool, id, is_admin, at).await?;
        require_row(affected, id)
    }

    async fn write_disabled_flag(&self, id: Uuid, disabled: bool, actor: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let affected = accounts::write_disabled_flag(&self.pool, id, disabled, actor, at).await?;
        require_row(affected, id)
    }
}

#[async_trait]
impl CredentialStore for SqliteBackend {
    async fn set_admin_claim(&self, id: Uuid, is_admin: bool) -> AppResult<()> {
        credentials::set_admin_claim(&self.pool, id, is_admin).await
    }

    async fn set_disabled(&self, id: Uuid, disabled: bool) -> AppResult<()> {
        credentials::set_disabled(&self.pool, id, disabled).await
    }
}

#[async_trait]
impl AuditSink for SqliteBackend {
    async fn append(&self, entry: &AuditLogEntry) -> AppResult<()> {
        let _guard = self.audit_lock.lock().await;
        audit::append_entry(&self.pool, entry).await
    }
}

#[async_trait]
impl SyncIssueLog for SqliteBackend {
    async fn record_sync_issue(&self, issue: &ClaimSyncIssue) -> AppResult<()> {
        audit::insert_sync_issue(&self.pool, issue).await
    }
}

#[async_trait]
impl OwnRecordLookup for SqliteBackend {
    async fn own_admin_flag(&self, caller: &AuthUser) -> AppResult<Option<bool>> {
        accounts::admin_flag(&self.pool, caller.user_id).await
    }

    async fn own_session_disabled(&self, caller: &AuthUser) -> AppResult<Option<bool>> {
        credentials::disabled_flag(&self.pool, caller.user_id).await
    }
}
