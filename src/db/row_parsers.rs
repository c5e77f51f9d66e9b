use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::account::Account;
use crate::models::audit::{AuditAction, AuditLogEntry, ClaimSyncIssue};
use crate::models::credential::{parse_claims, Credential};
use crate::models::order::Order;

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, AppError> {
    let s = s.trim();

    // Try RFC3339 first (e.g. 2025-11-19T12:34:56Z)
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // SQLite default timestamp format: "YYYY-MM-DD HH:MM:SS" (optional fraction)
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    if let Ok(naive_date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let ndt = naive_date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| AppError::internal("invalid datetime: date out of range".to_string()))?;
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(AppError::internal(format!("invalid datetime: {}", s)))
}

fn parse_opt_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, AppError> {
    match s {
        Some(s) if !s.trim().is_empty() => parse_datetime(&s).map(Some),
        _ => Ok(None),
    }
}

fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(s.trim()).map_err(|e| AppError::internal(format!("invalid uuid: {}", e)))
}

fn parse_opt_uuid(s: Option<String>) -> Result<Option<Uuid>, AppError> {
    match s {
        Some(s) if !s.trim().is_empty() => parse_uuid(&s).map(Some),
        _ => Ok(None),
    }
}

pub fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, AppError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| AppError::internal(format!("missing {}: {}", name, e)))
}

/// Reads a column projected through `sql::normalized_flag`: anything other
/// than 1 is false.
fn flag(row: &SqliteRow, name: &str) -> Result<bool, AppError> {
    let value: Option<i64> = column(row, name)?;
    Ok(value == Some(1))
}

pub fn account_from_row(row: &SqliteRow) -> Result<Account, AppError> {
    let id_s: String = column(row, "id")?;
    let email: String = column(row, "email")?;
    let display_name: Option<String> = column(row, "display_name")?;
    let is_admin = flag(row, "is_admin")?;
    let disabled = flag(row, "disabled")?;
    let disabled_at_s: Option<String> = column(row, "disabled_at")?;
    let disabled_by_s: Option<String> = column(row, "disabled_by")?;
    let created_at_s: String = column(row, "created_at")?;
    let updated_at_s: String = column(row, "updated_at")?;

    Ok(Account {
        id: parse_uuid(&id_s)?,
        email,
        display_name: display_name.unwrap_or_default(),
        is_admin,
        disabled,
        disabled_at: parse_opt_datetime(disabled_at_s)?,
        disabled_by: parse_opt_uuid(disabled_by_s)?,
        created_at: parse_datetime(&created_at_s)?,
        updated_at: parse_datetime(&updated_at_s)?,
    })
}

pub fn order_from_row(row: &SqliteRow) -> Result<Order, AppError> {
    let id_s: String = column(row, "id")?;
    let creator_id_s: String = column(row, "creator_id")?;
    let creator_email: String = column(row, "creator_email")?;
    let created_at_s: String = column(row, "created_at")?;
    let updated_at_s: String = column(row, "updated_at")?;
    let status_s: String = column(row, "status")?;
    let option_codes_s: Option<String> = column(row, "option_codes")?;

    let status = status_s
        .parse()
        .map_err(|_| AppError::internal(format!("invalid order status: {}", status_s)))?;
    let option_codes: Vec<String> = match option_codes_s {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)
            .map_err(|e| AppError::internal(format!("invalid option_codes: {}", e)))?,
        _ => Vec::new(),
    };

    Ok(Order {
        id: parse_uuid(&id_s)?,
        creator_id: parse_uuid(&creator_id_s)?,
        creator_email,
        created_at: parse_datetime(&created_at_s)?,
        updated_at: parse_datetime(&updated_at_s)?,
        status,
        customer_name: column(row, "customer_name")?,
        customer_phone: column(row, "customer_phone")?,
        customer_email: column(row, "customer_email")?,
        vehicle_model: column(row, "vehicle_model")?,
        trim_level: column(row, "trim_level")?,
        exterior_color: column(row, "exterior_color")?,
        interior_color: column(row, "interior_color")?,
        option_codes,
        msrp_cents: column(row, "msrp_cents")?,
        selling_price_cents: column(row, "selling_price_cents")?,
        deposit_cents: column(row, "deposit_cents")?,
        notes: column(row, "notes")?,
    })
}

pub fn credential_from_row(row: &SqliteRow) -> Result<Credential, AppError> {
    let id_s: String = column(row, "id")?;
    let claims_s: Option<String> = column(row, "custom_claims")?;
    let disabled: Option<i64> = column(row, "disabled")?;
    let created_at_s: String = column(row, "created_at")?;
    let updated_at_s: String = column(row, "updated_at")?;

    Ok(Credential {
        id: parse_uuid(&id_s)?,
        email: column(row, "email")?,
        password_hash: column(row, "password_hash")?,
        custom_claims: parse_claims(claims_s.as_deref().unwrap_or("{}")),
        disabled: disabled == Some(1),
        created_at: parse_datetime(&created_at_s)?,
        updated_at: parse_datetime(&updated_at_s)?,
    })
}

pub fn audit_entry_from_row(row: &SqliteRow) -> Result<AuditLogEntry, AppError> {
    let id_s: String = column(row, "id")?;
    let action_s: String = column(row, "action")?;
    let actor_id_s: String = column(row, "actor_id")?;
    let target_id_s: String = column(row, "target_id")?;
    let previous_value: Option<i64> = column(row, "previous_value")?;
    let new_value: i64 = column(row, "new_value")?;
    let actor_was_admin: i64 = column(row, "actor_was_admin")?;
    let success: i64 = column(row, "success")?;
    let occurred_at_s: String = column(row, "occurred_at")?;

    let action = AuditAction::parse(&action_s)
        .ok_or_else(|| AppError::internal(format!("invalid audit action: {}", action_s)))?;

    Ok(AuditLogEntry {
        id: parse_uuid(&id_s)?,
        action,
        actor_id: parse_uuid(&actor_id_s)?,
        actor_email: column(row, "actor_email")?,
        actor_was_admin: actor_was_admin == 1,
        target_id: parse_uuid(&target_id_s)?,
        target_email: column(row, "target_email")?,
        previous_value: previous_value.map(|v| v == 1),
        new_value: new_value == 1,
        timestamp: parse_datetime(&occurred_at_s)?,
        success: success == 1,
        error_message: column(row, "error_message")?,
    })
}

pub fn sync_issue_from_row(row: &SqliteRow) -> Result<ClaimSyncIssue, AppError> {
    let id_s: String = column(row, "id")?;
    let target_id_s: String = column(row, "target_id")?;
    let claim_value: i64 = column(row, "claim_value")?;
    let record_value: Option<i64> = column(row, "record_value")?;
    let detected_at_s: String = column(row, "detected_at")?;

    Ok(ClaimSyncIssue {
        id: parse_uuid(&id_s)?,
        target_id: parse_uuid(&target_id_s)?,
        field: column(row, "field")?,
        claim_value: claim_value == 1,
        record_value: record_value.map(|v| v == 1),
        detail: column(row, "detail")?,
        detected_at: parse_datetime(&detected_at_s)?,
    })
}
