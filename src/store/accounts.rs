use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::db::row_parsers;
use crate::db::sql::{account_columns, flag_is_clear, flag_is_set, normalized_flag};
use crate::errors::AppResult;
use crate::models::account::Account;

pub async fn insert_account<'e, E>(executor: E, account: &Account) -> AppResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO accounts (id, email, display_name, is_admin, disabled, disabled_at, disabled_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(account.id.to_string())
    .bind(&account.email)
    .bind(&account.display_name)
    .bind(account.is_admin)
    .bind(account.disabled)
    .bind(account.disabled_at)
    .bind(account.disabled_by.map(|id| id.to_string()))
    .bind(account.created_at)
    .bind(account.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn find_account<'e, E>(executor: E, id: Uuid) -> AppResult<Option<Account>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM accounts WHERE id = ?", account_columns());
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?;

    row.map(|r| row_parsers::account_from_row(&r)).transpose()
}

pub async fn list_accounts(pool: &SqlitePool) -> AppResult<Vec<Account>> {
    let sql = format!("SELECT {} FROM accounts ORDER BY created_at", account_columns());
    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    rows.iter().map(row_parsers::account_from_row).collect()
}

/// Normalized admin flag of one account, read by primary key only.
pub async fn admin_flag(pool: &SqlitePool, id: Uuid) -> AppResult<Option<bool>> {
    let sql = format!("SELECT {} FROM accounts WHERE id = ?", normalized_flag("is_admin"));
    let flag: Option<Option<i64>> = sqlx::query_scalar(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    Ok(flag.flatten().map(|v| v == 1))
}

pub async fn update_profile(pool: &SqlitePool, account: &Account) -> AppResult<()> {
    sqlx::query("UPDATE accounts SET display_name = ?, updated_at = ? WHERE id = ?")
        .bind(&account.display_name)
        .bind(account.updated_at)
        .bind(account.id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Returns the number of rows touched; zero means the account vanished.
pub async fn write_admin_flag(pool: &SqlitePool, id: Uuid, is_admin: bool, at: DateTime<Utc>) -> AppResult<u64> {
    let result = sqlx::query("UPDATE accounts SET is_admin = ?, updated_at = ? WHERE id = ?")
        .bind(is_admin)
        .bind(at)
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Sets or clears the disabled flag. Re-enabling clears the disable metadata.
pub async fn write_disabled_flag(
    pool: &SqlitePool,
    id: Uuid,
    disabled: bool,
    actor: Uuid,
    at: DateTime<Utc>,
) -> AppResult<u64> {
    let (disabled_at, disabled_by) = if disabled {
        (Some(at), Some(actor.to_string()))
    } else {
        (None, None)
    };

    let result = sqlx::query(
        "UPDATE accounts SET disabled = ?, disabled_at = ?, disabled_by = ?, updated_at = ? WHERE id = ?",
    )
    .bind(disabled)
    .bind(disabled_at)
    .bind(disabled_by)
    .bind(at)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Accounts that are admins and not disabled. Malformed flags count as unset.
pub async fn count_enabled_admins(pool: &SqlitePool) -> AppResult<i64> {
    let sql = format!(
        "SELECT COUNT(1) FROM accounts WHERE {} AND {}",
        flag_is_set("is_admin"),
        flag_is_clear("disabled")
    );
    let count: i64 = sqlx::query_scalar(&sql).fetch_one(pool).await?;
    Ok(count)
}

/// Rewrites missing or malformed role flags to 0. Returns rows changed.
pub async fn normalize_legacy_flags(pool: &SqlitePool) -> AppResult<u64> {
    let mut changed = 0;
    for col in ["is_admin", "disabled"] {
        let sql = format!(
            "UPDATE accounts SET {c} = 0 WHERE NOT (typeof({c})='integer' AND {c} IN (0, 1))",
            c = col
        );
        changed += sqlx::query(&sql).execute(pool).await?.rows_affected();
    }
    Ok(changed)
}
