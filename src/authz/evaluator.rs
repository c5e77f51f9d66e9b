use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::document::Document;
use super::fields::{account, order};
use super::ownership;
use crate::jwt::AuthUser;
use crate::models::order::OrderStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Account,
    Order,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Account => "account",
            RecordType::Order => "order",
        }
    }
}

/// Everything the policy knows about the caller, with admin status already
/// resolved by the claim resolver.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    pub caller_id: Uuid,
    pub caller_email: String,
    pub is_admin: bool,
    pub request_time: DateTime<Utc>,
}

impl EvaluationContext {
    pub fn new(caller_id: Uuid, caller_email: impl Into<String>, is_admin: bool, request_time: DateTime<Utc>) -> Self {
        Self {
            caller_id,
            caller_email: caller_email.into(),
            is_admin,
            request_time,
        }
    }

    pub fn for_caller(caller: &AuthUser, is_admin: bool, request_time: DateTime<Utc>) -> Self {
        Self::new(caller.user_id, caller.email.clone(), is_admin, request_time)
    }
}

/// Why a request was denied. Logged server side only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    MissingRecord,
    RecordExists,
    NotSubject,
    NotOwner,
    NotAdmin,
    EmailMismatch,
    CreatorMismatch,
    CreatedAtMismatch,
    SelfEscalation,
    SelfPrivilegeChange,
    MalformedFlag(&'static str),
    ImmutableField(&'static str),
    FieldNotMutable(String),
    InvalidStatus,
    StatusChangeRequiresAdmin,
    IllegalTransition { from: OrderStatus, to: OrderStatus },
    DeleteForbidden,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::MissingRecord => write!(f, "record missing"),
            DenyReason::RecordExists => write!(f, "record already exists"),
            DenyReason::NotSubject => write!(f, "caller is not the account subject"),
            DenyReason::NotOwner => write!(f, "caller did not create this order"),
            DenyReason::NotAdmin => write!(f, "admin required"),
            DenyReason::EmailMismatch => write!(f, "email does not match the verified credential"),
            DenyReason::CreatorMismatch => write!(f, "creator does not match caller"),
            DenyReason::CreatedAtMismatch => write!(f, "createdAt is not the request time"),
            DenyReason::SelfEscalation => write!(f, "accounts may not be created as admin"),
            DenyReason::SelfPrivilegeChange => write!(f, "callers may not change their own role or disabled flag"),
            DenyReason::MalformedFlag(field) => write!(f, "{field} must be a boolean"),
            DenyReason::ImmutableField(field) => write!(f, "{field} is immutable"),
            DenyReason::FieldNotMutable(field) => write!(f, "{field} may not be changed by this caller"),
            DenyReason::InvalidStatus => write!(f, "invalid order status"),
            DenyReason::StatusChangeRequiresAdmin => write!(f, "only admins change order status"),
            DenyReason::IllegalTransition { from, to } => write!(f, "illegal status transition {from} -> {to}"),
            DenyReason::DeleteForbidden => write!(f, "delete is not allowed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl From<Result<(), DenyReason>> for Decision {
    fn from(result: Result<(), DenyReason>) -> Self {
        match result {
            Ok(()) => Decision::Allow,
            Err(reason) => Decision::Deny(reason),
        }
    }
}

/// Decides allow/deny for one operation against one record.
///
/// Implementations must be pure: no I/O, no shared state.
pub trait PolicyEvaluator: Send + Sync {
    fn evaluate(
        &self,
        op: Operation,
        record_type: RecordType,
        existing: Option<&Document>,
        proposed: Option<&Document>,
        ctx: &EvaluationContext,
    ) -> Decision;
}

/// The fixed rule set for accounts and orders.
#[derive(Debug, Clone, Default)]
pub struct DefaultPolicyEvaluator;

/// Account fields an owner may change on their own record.
const ACCOUNT_OWNER_FIELDS: [&str; 2] = [account::DISPLAY_NAME, account::UPDATED_AT];

/// Account fields an admin may change on somebody else's record.
const ACCOUNT_ADMIN_FIELDS: [&str; 5] = [
    account::IS_ADMIN,
    account::DISABLED,
    account::DISABLED_AT,
    account::DISABLED_BY,
    account::UPDATED_AT,
];

const ACCOUNT_IMMUTABLE_FIELDS: [&str; 3] = [account::ID, account::EMAIL, account::CREATED_AT];

impl DefaultPolicyEvaluator {
    pub fn new() -> Self {
        Self
    }

    fn account_create(existing: Option<&Document>, proposed: Option<&Document>, ctx: &EvaluationContext) -> Result<(), DenyReason> {
        if existing.is_some() {
            return Err(DenyReason::RecordExists);
        }
        let proposed = proposed.ok_or(DenyReason::MissingRecord)?;

        if proposed.uuid_field(account::ID) != Some(ctx.caller_id) {
            return Err(DenyReason::NotSubject);
        }
        if !proposed.str_eq(account::EMAIL, &ctx.caller_email) {
            return Err(DenyReason::EmailMismatch);
        }
        for field in [account::IS_ADMIN, account::DISABLED] {
            if !proposed.is_bool_or_absent(field) {
                return Err(DenyReason::MalformedFlag(field));
            }
        }
        if proposed.flag(account::IS_ADMIN) {
            return Err(DenyReason::SelfEscalation);
        }
        if proposed.flag(account::DISABLED) {
            return Err(DenyReason::FieldNotMutable(account::DISABLED.to_string()));
        }

        Ok(())
    }

    fn account_read(existing: Option<&Document>, ctx: &EvaluationContext) -> Result<(), DenyReason> {
        let existing = existing.ok_or(DenyReason::MissingRecord)?;

        // The owner check comes first and needs no admin status.
        if existing.uuid_field(account::ID) == Some(ctx.caller_id) || ctx.is_admin {
            return Ok(());
        }
        Err(DenyReason::NotSubject)
    }

    fn account_update(existing: Option<&Document>, proposed: Option<&Document>, ctx: &EvaluationContext) -> Result<(), DenyReason> {
        let existing = existing.ok_or(DenyReason::MissingRecord)?;
        let proposed = proposed.ok_or(DenyReason::MissingRecord)?;

        for field in ACCOUNT_IMMUTABLE_FIELDS {
            if !existing.unchanged(proposed, field) {
                return Err(DenyReason::ImmutableField(field));
            }
        }
        for field in [account::IS_ADMIN, account::DISABLED] {
            if !proposed.is_bool_or_absent(field) {
                return Err(DenyReason::MalformedFlag(field));
            }
        }

        let changed = existing.changed_fields(proposed);
        let is_subject = existing.uuid_field(account::ID) == Some(ctx.caller_id);

        let allowed: &[&str] = if is_subject {
            // Compared as flags so a legacy record missing the field is not
            // seen as changing when the owner writes back `false`.
            if existing.flag(account::IS_ADMIN) != proposed.flag(account::IS_ADMIN)
                || existing.flag(account::DISABLED) != proposed.flag(account::DISABLED)
            {
                return Err(DenyReason::SelfPrivilegeChange);
            }
            &ACCOUNT_OWNER_FIELDS
        } else if ctx.is_admin {
            &ACCOUNT_ADMIN_FIELDS
        } else {
            return Err(DenyReason::NotSubject);
        };

        for field in changed {
            if allowed.contains(&field.as_str()) {
                continue;
            }
            // isAdmin/disabled written back as false on a legacy record
            if is_subject && (field == account::IS_ADMIN || field == account::DISABLED) {
                continue;
            }
            return Err(DenyReason::FieldNotMutable(field));
        }

        Ok(())
    }

    fn order_create(existing: Option<&Document>, proposed: Option<&Document>, ctx: &EvaluationContext) -> Result<(), DenyReason> {
        if existing.is_some() {
            return Err(DenyReason::RecordExists);
        }
        let proposed = proposed.ok_or(DenyReason::MissingRecord)?;

        if !ownership::is_owner(proposed, ctx.caller_id) || !proposed.str_eq(order::CREATOR_EMAIL, &ctx.caller_email) {
            return Err(DenyReason::CreatorMismatch);
        }
        if proposed.datetime_field(order::CREATED_AT) != Some(ctx.request_time) {
            return Err(DenyReason::CreatedAtMismatch);
        }

        match status_of(proposed) {
            Some(status) if status.is_initial() => Ok(()),
            _ => Err(DenyReason::InvalidStatus),
        }
    }

    fn order_read(existing: Option<&Document>, ctx: &EvaluationContext) -> Result<(), DenyReason> {
        let existing = existing.ok_or(DenyReason::MissingRecord)?;

        if ctx.is_admin || ownership::is_owner(existing, ctx.caller_id) {
            return Ok(());
        }
        Err(DenyReason::NotOwner)
    }

    fn order_update(existing: Option<&Document>, proposed: Option<&Document>, ctx: &EvaluationContext) -> Result<(), DenyReason> {
        let existing = existing.ok_or(DenyReason::MissingRecord)?;
        let proposed = proposed.ok_or(DenyReason::MissingRecord)?;

        if !existing.unchanged(proposed, order::ID) {
            return Err(DenyReason::ImmutableField(order::ID));
        }
        for field in ownership::IMMUTABLE_FIELDS {
            if !existing.unchanged(proposed, field) {
                return Err(DenyReason::ImmutableField(field));
            }
        }

        if ctx.is_admin {
            if existing.unchanged(proposed, order::STATUS) {
                return Ok(());
            }
            let from = status_of(existing).ok_or(DenyReason::InvalidStatus)?;
            let to = status_of(proposed).ok_or(DenyReason::InvalidStatus)?;
            if !from.can_transition_to(to) {
                return Err(DenyReason::IllegalTransition { from, to });
            }
            return Ok(());
        }

        if !ownership::is_owner(existing, ctx.caller_id) {
            return Err(DenyReason::NotOwner);
        }
        ownership::check_owner_update(existing, proposed)
    }
}

fn status_of(doc: &Document) -> Option<OrderStatus> {
    doc.str_field(order::STATUS).and_then(|s| s.parse().ok())
}

impl PolicyEvaluator for DefaultPolicyEvaluator {
    fn evaluate(
        &self,
        op: Operation,
        record_type: RecordType,
        existing: Option<&Document>,
        proposed: Option<&Document>,
        ctx: &EvaluationContext,
    ) -> Decision {
        let result = match (record_type, op) {
            (RecordType::Account, Operation::Create) => Self::account_create(existing, proposed, ctx),
            (RecordType::Account, Operation::Read) => Self::account_read(existing, ctx),
            (RecordType::Account, Operation::Update) => Self::account_update(existing, proposed, ctx),
            (RecordType::Account, Operation::Delete) => Err(DenyReason::DeleteForbidden),
            (RecordType::Order, Operation::Create) => Self::order_create(existing, proposed, ctx),
            (RecordType::Order, Operation::Read) => Self::order_read(existing, ctx),
            (RecordType::Order, Operation::Update) => Self::order_update(existing, proposed, ctx),
            (RecordType::Order, Operation::Delete) => {
                if ctx.is_admin {
                    Ok(())
                } else {
                    Err(DenyReason::NotAdmin)
                }
            }
        };

        let decision = Decision::from(result);
        match &decision {
            Decision::Allow => tracing::debug!(
                caller_id = %ctx.caller_id,
                op = op.as_str(),
                record_type = record_type.as_str(),
                "policy allow"
            ),
            Decision::Deny(reason) => tracing::debug!(
                caller_id = %ctx.caller_id,
                op = op.as_str(),
                record_type = record_type.as_str(),
                reason = %reason,
                "policy deny"
            ),
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(id: Uuid, email: &str, is_admin: bool) -> EvaluationContext {
        EvaluationContext::new(id, email, is_admin, Utc::now())
    }

    fn account_doc(id: Uuid, email: &str, is_admin: bool) -> Document {
        Document::from_value(json!({
            "id": id.to_string(),
            "email": email,
            "displayName": "Someone",
            "isAdmin": is_admin,
            "disabled": false,
            "createdAt": "2025-01-01T00:00:00+00:00",
            "updatedAt": "2025-01-01T00:00:00+00:00"
        }))
        .unwrap()
    }

    fn order_doc(creator: Uuid, email: &str, created_at: DateTime<Utc>, status: &str) -> Document {
        Document::from_value(json!({
            "id": Uuid::new_v4().to_string(),
            "creatorId": creator.to_string(),
            "creatorEmail": email,
            "createdAt": created_at.to_rfc3339(),
            "updatedAt": created_at.to_rfc3339(),
            "status": status,
            "customerName": "Grace",
            "vehicleModel": "Model Y",
            "msrpCents": 4_500_000,
            "notes": null
        }))
        .unwrap()
    }

    fn eval(op: Operation, rt: RecordType, existing: Option<&Document>, proposed: Option<&Document>, ctx: &EvaluationContext) -> Decision {
        DefaultPolicyEvaluator::new().evaluate(op, rt, existing, proposed, ctx)
    }

    // --- accounts ---

    #[test]
    fn account_create_as_admin_is_always_denied() {
        for caller_is_admin in [false, true] {
            let id = Uuid::new_v4();
            let c = ctx(id, "u@example.com", caller_is_admin);
            let doc = account_doc(id, "u@example.com", true);
            assert_eq!(
                eval(Operation::Create, RecordType::Account, None, Some(&doc), &c),
                Decision::Deny(DenyReason::SelfEscalation)
            );
        }
    }

    #[test]
    fn account_create_with_flag_omitted_or_false_is_allowed() {
        let id = Uuid::new_v4();
        let c = ctx(id, "u@example.com", false);
        let with_false = account_doc(id, "u@example.com", false);
        let omitted = with_false.clone().without("isAdmin").without("disabled");

        assert!(eval(Operation::Create, RecordType::Account, None, Some(&with_false), &c).is_allowed());
        assert!(eval(Operation::Create, RecordType::Account, None, Some(&omitted), &c).is_allowed());
    }

    #[test]
    fn account_create_for_someone_else_or_other_email_is_denied() {
        let id = Uuid::new_v4();
        let c = ctx(id, "u@example.com", true);

        let other = account_doc(Uuid::new_v4(), "u@example.com", false);
        assert_eq!(eval(Operation::Create, RecordType::Account, None, Some(&other), &c), Decision::Deny(DenyReason::NotSubject));

        let wrong_email = account_doc(id, "x@example.com", false);
        assert_eq!(eval(Operation::Create, RecordType::Account, None, Some(&wrong_email), &c), Decision::Deny(DenyReason::EmailMismatch));
    }

    #[test]
    fn account_create_with_string_flag_is_denied() {
        let id = Uuid::new_v4();
        let c = ctx(id, "u@example.com", false);
        let doc = account_doc(id, "u@example.com", false).with("isAdmin", "false");
        assert_eq!(
            eval(Operation::Create, RecordType::Account, None, Some(&doc), &c),
            Decision::Deny(DenyReason::MalformedFlag("isAdmin"))
        );
    }

    #[test]
    fn account_read_owner_or_admin() {
        let owner = Uuid::new_v4();
        let doc = account_doc(owner, "o@example.com", false);

        assert!(eval(Operation::Read, RecordType::Account, Some(&doc), None, &ctx(owner, "o@example.com", false)).is_allowed());
        assert!(eval(Operation::Read, RecordType::Account, Some(&doc), None, &ctx(Uuid::new_v4(), "a@example.com", true)).is_allowed());
        assert!(!eval(Operation::Read, RecordType::Account, Some(&doc), None, &ctx(Uuid::new_v4(), "x@example.com", false)).is_allowed());
    }

    #[test]
    fn owner_may_rename_but_not_promote_or_disable() {
        let id = Uuid::new_v4();
        let existing = account_doc(id, "o@example.com", false);

        for caller_is_admin in [false, true] {
            let c = ctx(id, "o@example.com", caller_is_admin);
            let renamed = existing.clone().with("displayName", "New").with("updatedAt", "2025-02-01T00:00:00+00:00");
            assert!(eval(Operation::Update, RecordType::Account, Some(&existing), Some(&renamed), &c).is_allowed());

            let promoted = existing.clone().with("isAdmin", true);
            assert_eq!(
                eval(Operation::Update, RecordType::Account, Some(&existing), Some(&promoted), &c),
                Decision::Deny(DenyReason::SelfPrivilegeChange)
            );

            let disabled = existing.clone().with("disabled", true);
            assert_eq!(
                eval(Operation::Update, RecordType::Account, Some(&existing), Some(&disabled), &c),
                Decision::Deny(DenyReason::SelfPrivilegeChange)
            );
        }
    }

    #[test]
    fn admin_cannot_demote_themselves() {
        let id = Uuid::new_v4();
        let existing = account_doc(id, "a@example.com", true);
        let demoted = existing.clone().with("isAdmin", false);
        assert_eq!(
            eval(Operation::Update, RecordType::Account, Some(&existing), Some(&demoted), &ctx(id, "a@example.com", true)),
            Decision::Deny(DenyReason::SelfPrivilegeChange)
        );
    }

    #[test]
    fn admin_may_change_role_of_another_account() {
        let admin = ctx(Uuid::new_v4(), "a@example.com", true);
        let target = account_doc(Uuid::new_v4(), "b@example.com", false);

        let promoted = target.clone().with("isAdmin", true);
        assert!(eval(Operation::Update, RecordType::Account, Some(&target), Some(&promoted), &admin).is_allowed());

        let disabled = target.clone().with("disabled", true).with("disabledBy", admin.caller_id.to_string());
        assert!(eval(Operation::Update, RecordType::Account, Some(&target), Some(&disabled), &admin).is_allowed());

        let renamed = target.clone().with("displayName", "Hijacked");
        assert_eq!(
            eval(Operation::Update, RecordType::Account, Some(&target), Some(&renamed), &admin),
            Decision::Deny(DenyReason::FieldNotMutable("displayName".into()))
        );
    }

    #[test]
    fn non_admin_cannot_touch_other_accounts() {
        let target = account_doc(Uuid::new_v4(), "b@example.com", false);
        let promoted = target.clone().with("isAdmin", true);
        assert_eq!(
            eval(Operation::Update, RecordType::Account, Some(&target), Some(&promoted), &ctx(Uuid::new_v4(), "c@example.com", false)),
            Decision::Deny(DenyReason::NotSubject)
        );
    }

    #[test]
    fn email_and_id_are_immutable() {
        let id = Uuid::new_v4();
        let existing = account_doc(id, "o@example.com", false);
        let c = ctx(id, "o@example.com", false);

        let new_email = existing.clone().with("email", "p@example.com");
        assert_eq!(
            eval(Operation::Update, RecordType::Account, Some(&existing), Some(&new_email), &c),
            Decision::Deny(DenyReason::ImmutableField("email"))
        );
    }

    #[test]
    fn legacy_account_without_role_fields_is_evaluated_safely() {
        let id = Uuid::new_v4();
        let legacy = account_doc(id, "o@example.com", false).without("isAdmin").without("disabled");
        let c = ctx(id, "o@example.com", false);

        // Writing the defaults back is not a privilege change.
        let normalized = legacy.clone().with("isAdmin", false).with("disabled", false).with("displayName", "N");
        assert!(eval(Operation::Update, RecordType::Account, Some(&legacy), Some(&normalized), &c).is_allowed());

        let escalated = legacy.clone().with("isAdmin", true);
        assert_eq!(
            eval(Operation::Update, RecordType::Account, Some(&legacy), Some(&escalated), &c),
            Decision::Deny(DenyReason::SelfPrivilegeChange)
        );
    }

    #[test]
    fn accounts_are_never_deleted() {
        let id = Uuid::new_v4();
        let doc = account_doc(id, "o@example.com", true);
        assert_eq!(
            eval(Operation::Delete, RecordType::Account, Some(&doc), None, &ctx(Uuid::new_v4(), "a@example.com", true)),
            Decision::Deny(DenyReason::DeleteForbidden)
        );
    }

    // --- orders ---

    #[test]
    fn order_create_requires_stamped_identity_and_time() {
        let caller = Uuid::new_v4();
        let c = ctx(caller, "u1@example.com", false);

        let good = order_doc(caller, "u1@example.com", c.request_time, "FactoryOrder");
        assert!(eval(Operation::Create, RecordType::Order, None, Some(&good), &c).is_allowed());

        let forged = order_doc(Uuid::new_v4(), "u1@example.com", c.request_time, "FactoryOrder");
        assert_eq!(eval(Operation::Create, RecordType::Order, None, Some(&forged), &c), Decision::Deny(DenyReason::CreatorMismatch));

        let back_dated = order_doc(caller, "u1@example.com", c.request_time - chrono::Duration::seconds(5), "FactoryOrder");
        assert_eq!(eval(Operation::Create, RecordType::Order, None, Some(&back_dated), &c), Decision::Deny(DenyReason::CreatedAtMismatch));

        let delivered = order_doc(caller, "u1@example.com", c.request_time, "Delivered");
        assert_eq!(eval(Operation::Create, RecordType::Order, None, Some(&delivered), &c), Decision::Deny(DenyReason::InvalidStatus));
    }

    #[test]
    fn non_admin_cannot_read_foreign_order() {
        let u1 = Uuid::new_v4();
        let o1 = order_doc(u1, "u1@example.com", Utc::now(), "Locate");

        assert!(eval(Operation::Read, RecordType::Order, Some(&o1), None, &ctx(u1, "u1@example.com", false)).is_allowed());
        assert_eq!(
            eval(Operation::Read, RecordType::Order, Some(&o1), None, &ctx(Uuid::new_v4(), "u2@example.com", false)),
            Decision::Deny(DenyReason::NotOwner)
        );
        assert!(eval(Operation::Read, RecordType::Order, Some(&o1), None, &ctx(Uuid::new_v4(), "admin@example.com", true)).is_allowed());
    }

    #[test]
    fn immutable_order_fields_hold_for_owner_and_admin() {
        let u1 = Uuid::new_v4();
        let existing = order_doc(u1, "u1@example.com", Utc::now(), "Locate");

        for c in [ctx(u1, "u1@example.com", false), ctx(Uuid::new_v4(), "admin@example.com", true)] {
            for (field, value) in [
                ("creatorId", json!(Uuid::new_v4().to_string())),
                ("creatorEmail", json!("x@example.com")),
                ("createdAt", json!("2020-01-01T00:00:00+00:00")),
            ] {
                let changed = existing.clone().with(field, value);
                assert!(matches!(
                    eval(Operation::Update, RecordType::Order, Some(&existing), Some(&changed), &c),
                    Decision::Deny(DenyReason::ImmutableField(_))
                ));
            }
        }
    }

    #[test]
    fn owner_updates_are_limited_to_mutable_fields() {
        let u1 = Uuid::new_v4();
        let c = ctx(u1, "u1@example.com", false);
        let existing = order_doc(u1, "u1@example.com", Utc::now(), "Locate");

        let notes = existing.clone().with("notes", "call on Friday");
        assert!(eval(Operation::Update, RecordType::Order, Some(&existing), Some(&notes), &c).is_allowed());

        let price = existing.clone().with("msrpCents", 1);
        assert!(!eval(Operation::Update, RecordType::Order, Some(&existing), Some(&price), &c).is_allowed());

        let received = existing.clone().with("status", "Received");
        assert_eq!(
            eval(Operation::Update, RecordType::Order, Some(&existing), Some(&received), &c),
            Decision::Deny(DenyReason::StatusChangeRequiresAdmin)
        );
    }

    #[test]
    fn non_owner_non_admin_update_is_denied() {
        let existing = order_doc(Uuid::new_v4(), "u1@example.com", Utc::now(), "Locate");
        let notes = existing.clone().with("notes", "mine now");
        assert_eq!(
            eval(Operation::Update, RecordType::Order, Some(&existing), Some(&notes), &ctx(Uuid::new_v4(), "u2@example.com", false)),
            Decision::Deny(DenyReason::NotOwner)
        );
    }

    #[test]
    fn admin_status_changes_follow_the_state_machine() {
        let admin = ctx(Uuid::new_v4(), "admin@example.com", true);
        let existing = order_doc(Uuid::new_v4(), "u1@example.com", Utc::now(), "DealerExchange");

        let received = existing.clone().with("status", "Received").with("msrpCents", 10);
        assert!(eval(Operation::Update, RecordType::Order, Some(&existing), Some(&received), &admin).is_allowed());

        let skipped = existing.clone().with("status", "Delivered");
        assert_eq!(
            eval(Operation::Update, RecordType::Order, Some(&existing), Some(&skipped), &admin),
            Decision::Deny(DenyReason::IllegalTransition { from: OrderStatus::DealerExchange, to: OrderStatus::Delivered })
        );

        let delivered = order_doc(Uuid::new_v4(), "u1@example.com", Utc::now(), "Delivered");
        let reopened = delivered.clone().with("status", "Received");
        assert!(!eval(Operation::Update, RecordType::Order, Some(&delivered), Some(&reopened), &admin).is_allowed());
    }

    #[test]
    fn only_admins_delete_orders() {
        let u1 = Uuid::new_v4();
        let o = order_doc(u1, "u1@example.com", Utc::now(), "Locate");
        assert_eq!(
            eval(Operation::Delete, RecordType::Order, Some(&o), None, &ctx(u1, "u1@example.com", false)),
            Decision::Deny(DenyReason::NotAdmin)
        );
        assert!(eval(Operation::Delete, RecordType::Order, Some(&o), None, &ctx(Uuid::new_v4(), "a@example.com", true)).is_allowed());
    }

    #[test]
    fn legacy_order_without_creator_is_admin_only() {
        let legacy = order_doc(Uuid::new_v4(), "u1@example.com", Utc::now(), "Locate").without("creatorId");
        let anyone = ctx(Uuid::new_v4(), "u@example.com", false);
        assert!(!eval(Operation::Read, RecordType::Order, Some(&legacy), None, &anyone).is_allowed());
    }
}
