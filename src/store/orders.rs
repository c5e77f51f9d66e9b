use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::row_parsers;
use crate::db::sql::ORDER_COLUMNS;
use crate::errors::{AppError, AppResult};
use crate::models::order::Order;

fn option_codes_json(order: &Order) -> AppResult<String> {
    serde_json::to_string(&order.option_codes)
        .map_err(|e| AppError::internal(format!("failed to encode option codes: {e}")))
}

pub async fn insert_order(pool: &SqlitePool, order: &Order) -> AppResult<()> {
    let sql = format!(
        "INSERT INTO orders ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        ORDER_COLUMNS
    );

    sqlx::query(&sql)
        .bind(order.id.to_string())
        .bind(order.creator_id.to_string())
        .bind(&order.creator_email)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.status.as_str())
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(&order.customer_email)
        .bind(&order.vehicle_model)
        .bind(&order.trim_level)
        .bind(&order.exterior_color)
        .bind(&order.interior_color)
        .bind(option_codes_json(order)?)
        .bind(order.msrp_cents)
        .bind(order.selling_price_cents)
        .bind(order.deposit_cents)
        .bind(&order.notes)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn find_order(pool: &SqlitePool, id: Uuid) -> AppResult<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE id = ?", ORDER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|r| row_parsers::order_from_row(&r)).transpose()
}

pub async fn list_orders(pool: &SqlitePool, creator: Option<Uuid>) -> AppResult<Vec<Order>> {
    let rows = match creator {
        Some(creator_id) => {
            let sql = format!("SELECT {} FROM orders WHERE creator_id = ? ORDER BY created_at DESC", ORDER_COLUMNS);
            sqlx::query(&sql)
                .bind(creator_id.to_string())
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!("SELECT {} FROM orders ORDER BY created_at DESC", ORDER_COLUMNS);
            sqlx::query(&sql).fetch_all(pool).await?
        }
    };

    rows.iter().map(row_parsers::order_from_row).collect()
}

/// Writes every mutable column. Creator columns and created_at are never
/// part of the SET list.
pub async fn update_order(pool: &SqlitePool, order: &Order) -> AppResult<()> {
    let affected = sqlx::query(
        "UPDATE orders SET updated_at = ?, status = ?, customer_name = ?, customer_phone = ?, customer_email = ?, \
         vehicle_model = ?, trim_level = ?, exterior_color = ?, interior_color = ?, option_codes = ?, \
         msrp_cents = ?, selling_price_cents = ?, deposit_cents = ?, notes = ? WHERE id = ?",
    )
    .bind(order.updated_at)
    .bind(order.status.as_str())
    .bind(&order.customer_name)
    .bind(&order.customer_phone)
    .bind(&order.customer_email)
    .bind(&order.vehicle_model)
    .bind(&order.trim_level)
    .bind(&order.exterior_color)
    .bind(&order.interior_color)
    .bind(option_codes_json(order)?)
    .bind(order.msrp_cents)
    .bind(order.selling_price_cents)
    .bind(order.deposit_cents)
    .bind(&order.notes)
    .bind(order.id.to_string())
    .execute(pool)
    .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("order not found"));
    }

    Ok(())
}

pub async fn delete_order(pool: &SqlitePool, id: Uuid) -> AppResult<()> {
    let affected = sqlx::query("DELETE FROM orders WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("order not found"));
    }

    Ok(())
}
