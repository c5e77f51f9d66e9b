//! Order ownership: who created an order and what they may still change.

use serde_json::Value;
use uuid::Uuid;

use super::document::Document;
use super::evaluator::{DenyReason, EvaluationContext};
use super::fields::order::{CREATED_AT, CREATOR_EMAIL, CREATOR_ID, CUSTOMER_EMAIL, CUSTOMER_NAME, CUSTOMER_PHONE, NOTES, STATUS, UPDATED_AT};
use crate::models::order::OrderStatus;

/// Fields fixed at creation for the life of the order.
pub const IMMUTABLE_FIELDS: [&str; 3] = [CREATOR_ID, CREATOR_EMAIL, CREATED_AT];

/// Fields a non-admin creator may edit after creation.
const OWNER_MUTABLE_FIELDS: [&str; 5] = [CUSTOMER_NAME, CUSTOMER_PHONE, CUSTOMER_EMAIL, NOTES, UPDATED_AT];

pub fn owner_mutable_fields() -> &'static [&'static str] {
    &OWNER_MUTABLE_FIELDS
}

/// Whether `caller_id` created the order. A record without a readable
/// `creatorId` has no owner.
pub fn is_owner(order: &Document, caller_id: Uuid) -> bool {
    order.uuid_field(CREATOR_ID) == Some(caller_id)
}

/// Writes the creator identity and server timestamps onto a new order,
/// replacing whatever the client sent for them.
pub fn stamp_creation(order: &mut Document, ctx: &EvaluationContext) {
    let now = Value::String(ctx.request_time.to_rfc3339());

    order.set(CREATOR_ID, ctx.caller_id.to_string());
    order.set(CREATOR_EMAIL, ctx.caller_email.clone());
    order.set(CREATED_AT, now.clone());
    order.set(UPDATED_AT, now);

    if !order.has(STATUS) {
        order.set(STATUS, OrderStatus::default().as_str());
    }
}

/// Rejects any owner edit that leaves the mutable set or touches status.
pub fn check_owner_update(existing: &Document, proposed: &Document) -> Result<(), DenyReason> {
    if !existing.unchanged(proposed, STATUS) {
        return Err(DenyReason::StatusChangeRequiresAdmin);
    }

    match existing
        .changed_fields(proposed)
        .into_iter()
        .find(|field| !owner_mutable_fields().contains(&field.as_str()))
    {
        Some(field) => Err(DenyReason::FieldNotMutable(field)),
        None => Ok(()),
    }
}
