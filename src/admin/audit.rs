//! Append-only audit log with a SHA-256 hash chain.
//!
//! Every row stores the hash of the row before it, so editing or deleting a
//! row in the middle breaks `verify_chain` from that point on.

use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::row_parsers;
use crate::errors::{AppError, AppResult};
use crate::models::audit::{AuditLogEntry, ClaimSyncIssue};

const AUDIT_COLUMNS: &str = "id, action, actor_id, actor_email, actor_was_admin, target_id, target_email, \
     previous_value, new_value, occurred_at, success, error_message";

const SYNC_ISSUE_COLUMNS: &str = "id, target_id, field, claim_value, record_value, detail, detected_at";

/// Result of walking the chain from the first row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainReport {
    pub entries: usize,
    /// First row whose stored hashes do not match its content.
    pub first_broken: Option<Uuid>,
}

impl ChainReport {
    pub fn is_intact(&self) -> bool {
        self.first_broken.is_none()
    }
}

fn chain_hash(prev_hash: Option<&str>, entry: &AuditLogEntry) -> AppResult<String> {
    let payload = serde_json::to_string(entry)
        .map_err(|e| AppError::internal(format!("failed to encode audit entry: {e}")))?;

    let mut hasher = Sha256::new();
    if let Some(prev) = prev_hash {
        hasher.update(prev.as_bytes());
    }
    hasher.update(payload.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Appends one entry. Callers serialize appends; two concurrent writers
/// would otherwise both chain onto the same predecessor.
pub async fn append_entry(pool: &SqlitePool, entry: &AuditLogEntry) -> AppResult<()> {
    let prev_hash: Option<String> = sqlx::query_scalar("SELECT hash FROM audit_log ORDER BY seq DESC LIMIT 1")
        .fetch_optional(pool)
        .await?;

    let hash = chain_hash(prev_hash.as_deref(), entry)?;

    sqlx::query(
        r#"
        INSERT INTO audit_log (id, action, actor_id, actor_email, actor_was_admin, target_id, target_email,
                               previous_value, new_value, occurred_at, success, error_message, prev_hash, hash)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.id.to_string())
    .bind(entry.action.as_str())
    .bind(entry.actor_id.to_string())
    .bind(&entry.actor_email)
    .bind(entry.actor_was_admin)
    .bind(entry.target_id.to_string())
    .bind(&entry.target_email)
    .bind(entry.previous_value)
    .bind(entry.new_value)
    .bind(entry.timestamp)
    .bind(entry.success)
    .bind(&entry.error_message)
    .bind(&prev_hash)
    .bind(&hash)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent entries first.
pub async fn list_entries(pool: &SqlitePool, limit: i64) -> AppResult<Vec<AuditLogEntry>> {
    let sql = format!("SELECT {} FROM audit_log ORDER BY seq DESC LIMIT ?", AUDIT_COLUMNS);
    let rows = sqlx::query(&sql).bind(limit.max(0)).fetch_all(pool).await?;

    rows.iter().map(row_parsers::audit_entry_from_row).collect()
}

pub async fn entries_for_target(pool: &SqlitePool, target_id: Uuid) -> AppResult<Vec<AuditLogEntry>> {
    let sql = format!("SELECT {} FROM audit_log WHERE target_id = ? ORDER BY seq", AUDIT_COLUMNS);
    let rows = sqlx::query(&sql)
        .bind(target_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_parsers::audit_entry_from_row).collect()
}

pub async fn verify_chain(pool: &SqlitePool) -> AppResult<ChainReport> {
    let sql = format!("SELECT {}, prev_hash, hash FROM audit_log ORDER BY seq", AUDIT_COLUMNS);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    let mut expected_prev: Option<String> = None;
    for (index, row) in rows.iter().enumerate() {
        let entry = row_parsers::audit_entry_from_row(row)?;
        let stored_prev: Option<String> = row_parsers::column(row, "prev_hash")?;
        let stored_hash: String = row_parsers::column(row, "hash")?;

        let recomputed = chain_hash(expected_prev.as_deref(), &entry)?;
        if stored_prev != expected_prev || stored_hash != recomputed {
            tracing::warn!(entry_id = %entry.id, position = index, "audit chain broken");
            return Ok(ChainReport {
                entries: rows.len(),
                first_broken: Some(entry.id),
            });
        }
        expected_prev = Some(stored_hash);
    }

    Ok(ChainReport {
        entries: rows.len(),
        first_broken: None,
    })
}

pub async fn insert_sync_issue(pool: &SqlitePool, issue: &ClaimSyncIssue) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO claim_sync_issues (id, target_id, field, claim_value, record_value, detail, detected_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(issue.id.to_string())
    .bind(issue.target_id.to_string())
    .bind(&issue.field)
    .bind(issue.claim_value)
    .bind(issue.record_value)
    .bind(&issue.detail)
    .bind(issue.detected_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn list_sync_issues(pool: &SqlitePool) -> AppResult<Vec<ClaimSyncIssue>> {
    let sql = format!("SELECT {} FROM claim_sync_issues ORDER BY detected_at DESC", SYNC_ISSUE_COLUMNS);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    rows.iter().map(row_parsers::sync_issue_from_row).collect()
}
