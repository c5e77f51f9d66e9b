use chrono::Utc;
use serde_json::Value;
use sqlx::{Executor, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::db::row_parsers;
use crate::errors::{AppError, AppResult};
use crate::models::credential::{Credential, ADMIN_CLAIM};

const CREDENTIAL_COLUMNS: &str = "id, email, password_hash, custom_claims, disabled, created_at, updated_at";

/// Inserts a credential inside the caller's transaction or on the pool. A
/// duplicate email surfaces as `already-exists`.
pub async fn insert_credential<'e, E>(executor: E, id: Uuid, email: &str, password_hash: &str) -> AppResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO credentials (id, email, password_hash, custom_claims, disabled, created_at, updated_at) VALUES (?, ?, ?, '{}', 0, ?, ?)",
    )
    .bind(id.to_string())
    .bind(email)
    .bind(password_hash)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await
    .map_err(|err| match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::conflict("email already in use"),
        other => AppError::from(other),
    })?;

    Ok(())
}

pub async fn email_taken(pool: &SqlitePool, email: &str) -> AppResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM credentials WHERE lower(email) = lower(?)")
        .bind(email)
        .fetch_one(pool)
        .await?;

    Ok(count > 0)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<Credential>> {
    let sql = format!("SELECT {} FROM credentials WHERE lower(email) = lower(?)", CREDENTIAL_COLUMNS);
    let row = sqlx::query(&sql).bind(email).fetch_optional(pool).await?;

    row.map(|r| row_parsers::credential_from_row(&r)).transpose()
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> AppResult<Option<Credential>> {
    let sql = format!("SELECT {} FROM credentials WHERE id = ?", CREDENTIAL_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|r| row_parsers::credential_from_row(&r)).transpose()
}

pub async fn disabled_flag(pool: &SqlitePool, id: Uuid) -> AppResult<Option<bool>> {
    let flag: Option<i64> = sqlx::query_scalar("SELECT disabled FROM credentials WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    Ok(flag.map(|v| v != 0))
}

pub async fn list_credentials(pool: &SqlitePool) -> AppResult<Vec<Credential>> {
    let sql = format!("SELECT {} FROM credentials ORDER BY created_at", CREDENTIAL_COLUMNS);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    rows.iter().map(row_parsers::credential_from_row).collect()
}

/// Replaces the admin claim, keeping any other custom claims.
pub async fn set_admin_claim(pool: &SqlitePool, id: Uuid, is_admin: bool) -> AppResult<()> {
    let credential = find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("credential not found"))?;

    let mut claims = credential.custom_claims;
    claims.insert(ADMIN_CLAIM.to_string(), Value::Bool(is_admin));
    let encoded = serde_json::to_string(&claims)
        .map_err(|e| AppError::internal(format!("failed to encode claims: {e}")))?;

    sqlx::query("UPDATE credentials SET custom_claims = ?, updated_at = ? WHERE id = ?")
        .bind(encoded)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn set_disabled(pool: &SqlitePool, id: Uuid, disabled: bool) -> AppResult<()> {
    let affected = sqlx::query("UPDATE credentials SET disabled = ?, updated_at = ? WHERE id = ?")
        .bind(disabled)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("credential not found"));
    }

    Ok(())
}
