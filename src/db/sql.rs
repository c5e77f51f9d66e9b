/// Projects a boolean column as 0/1, or NULL when the stored value is missing
/// or not an integer flag. Rows written before the column existed, or by
/// older clients that stored text, read back as NULL and are treated as false.
pub fn normalized_flag(col: &str) -> String {
    let alias = col.split('.').last().unwrap_or(col);
    format!(
        "CASE WHEN typeof({c})='integer' AND {c} IN (0, 1) THEN {c} ELSE NULL END as {a}",
        c = col,
        a = alias
    )
}

/// Predicate matching rows whose flag is set to exactly 1.
pub fn flag_is_set(col: &str) -> String {
    format!("(typeof({c})='integer' AND {c} = 1)", c = col)
}

/// Predicate matching rows whose flag is unset, missing or malformed.
pub fn flag_is_clear(col: &str) -> String {
    format!("NOT (typeof({c})='integer' AND {c} = 1)", c = col)
}

pub fn account_columns() -> String {
    format!(
        "id, email, display_name, {}, {}, disabled_at, disabled_by, created_at, updated_at",
        normalized_flag("is_admin"),
        normalized_flag("disabled")
    )
}

pub const ORDER_COLUMNS: &str = "id, creator_id, creator_email, created_at, updated_at, status, \
     customer_name, customer_phone, customer_email, vehicle_model, trim_level, exterior_color, \
     interior_color, option_codes, msrp_cents, selling_price_cents, deposit_cents, notes";
