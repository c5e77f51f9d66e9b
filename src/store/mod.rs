//! Record storage with the policy evaluator at its boundary.
//!
//! The free functions in the submodules are raw SQLite access. Everything
//! reachable from a request goes through `RecordStore`, which evaluates the
//! policy before reading or writing a record.

pub mod accounts;
pub mod credentials;
pub mod orders;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authz::fields::account::{DISABLED, IS_ADMIN, UPDATED_AT};
use crate::authz::fields::order as order_fields;
use crate::authz::{
    ownership, ClaimResolver, Decision, Document, EvaluationContext, Operation, PolicyEvaluator, RecordType,
};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::account::Account;
use crate::models::order::{Order, OrderCreateRequest};

#[derive(Clone)]
pub struct RecordStore {
    pool: SqlitePool,
    resolver: ClaimResolver,
    policy: Arc<dyn PolicyEvaluator>,
}

impl RecordStore {
    pub fn new(pool: SqlitePool, resolver: ClaimResolver, policy: Arc<dyn PolicyEvaluator>) -> Self {
        Self { pool, resolver, policy }
    }

    /// Evaluation context for a caller whose session is still active.
    async fn context(&self, caller: &AuthUser, now: DateTime<Utc>) -> AppResult<EvaluationContext> {
        self.resolver.ensure_active(caller).await?;
        let is_admin = self.resolver.resolve_is_admin(caller).await;
        Ok(EvaluationContext::for_caller(caller, is_admin, now))
    }

    fn enforce(
        &self,
        op: Operation,
        record_type: RecordType,
        existing: Option<&Document>,
        proposed: Option<&Document>,
        ctx: &EvaluationContext,
    ) -> AppResult<()> {
        match self.policy.evaluate(op, record_type, existing, proposed, ctx) {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => {
                tracing::info!(
                    caller_id = %ctx.caller_id,
                    op = op.as_str(),
                    record_type = record_type.as_str(),
                    reason = %reason,
                    "record operation denied"
                );
                Err(AppError::not_permitted())
            }
        }
    }

    // --- accounts ---

    /// Registers the caller: credential and own account record are written in
    /// one transaction, so a failed record insert leaves no credential behind.
    pub async fn register_account(
        &self,
        caller: &AuthUser,
        password_hash: &str,
        display_name: &str,
    ) -> AppResult<Account> {
        let now = Utc::now();
        let account = Account {
            id: caller.user_id,
            email: caller.email.clone(),
            display_name: display_name.trim().to_string(),
            is_admin: false,
            disabled: false,
            disabled_at: None,
            disabled_by: None,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;
        credentials::insert_credential(&mut *tx, caller.user_id, &caller.email, password_hash).await?;

        let existing = accounts::find_account(&mut *tx, caller.user_id).await?;
        let existing = existing.as_ref().map(Document::from_record).transpose()?;
        let proposed = Document::from_record(&account)?;

        // A brand new caller has no record yet, so there is nothing to resolve.
        let ctx = EvaluationContext::for_caller(caller, false, now);
        self.enforce(Operation::Create, RecordType::Account, existing.as_ref(), Some(&proposed), &ctx)?;

        accounts::insert_account(&mut *tx, &account).await?;
        tx.commit().await?;
        Ok(account)
    }

    pub async fn get_account(&self, caller: &AuthUser, id: Uuid) -> AppResult<Account> {
        let account = accounts::find_account(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::not_found("account not found"))?;

        // Reading one's own record is decided by identity alone; admin status
        // is only resolved for somebody else's record.
        let ctx = if id == caller.user_id {
            self.resolver.ensure_active(caller).await?;
            EvaluationContext::for_caller(caller, false, Utc::now())
        } else {
            self.context(caller, Utc::now()).await?
        };

        let existing = Document::from_record(&account)?;
        self.enforce(Operation::Read, RecordType::Account, Some(&existing), None, &ctx)?;
        Ok(account)
    }

    pub async fn list_accounts(&self, caller: &AuthUser) -> AppResult<Vec<Account>> {
        let ctx = self.context(caller, Utc::now()).await?;

        let candidates = if ctx.is_admin {
            accounts::list_accounts(&self.pool).await?
        } else {
            accounts::find_account(&self.pool, caller.user_id).await?.into_iter().collect()
        };

        let mut visible = Vec::with_capacity(candidates.len());
        for account in candidates {
            let doc = Document::from_record(&account)?;
            if self.policy.evaluate(Operation::Read, RecordType::Account, Some(&doc), None, &ctx).is_allowed() {
                visible.push(account);
            }
        }
        Ok(visible)
    }

    /// Applies a merge patch to an account.
    ///
    /// Role and disable changes are rejected here even when the policy would
    /// allow them: only the role mutation service runs the lockout check and
    /// keeps the claim in step.
    pub async fn update_account(&self, caller: &AuthUser, id: Uuid, patch: Document) -> AppResult<Account> {
        let current = accounts::find_account(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::not_found("account not found"))?;

        let now = Utc::now();
        let existing = Document::from_record(&current)?;
        let mut proposed = existing.merged(&patch);
        proposed.set(UPDATED_AT, now.to_rfc3339());

        let ctx = self.context(caller, now).await?;
        self.enforce(Operation::Update, RecordType::Account, Some(&existing), Some(&proposed), &ctx)?;

        if existing.flag(IS_ADMIN) != proposed.flag(IS_ADMIN) || existing.flag(DISABLED) != proposed.flag(DISABLED) {
            return Err(AppError::failed_precondition(
                "role and disabled changes must go through the administration endpoints",
            ));
        }

        let updated: Account = proposed.into_record()?;
        accounts::update_profile(&self.pool, &updated).await?;
        Ok(updated)
    }

    pub async fn delete_account(&self, caller: &AuthUser, id: Uuid) -> AppResult<()> {
        let current = accounts::find_account(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::not_found("account not found"))?;

        let ctx = self.context(caller, Utc::now()).await?;
        let existing = Document::from_record(&current)?;
        self.enforce(Operation::Delete, RecordType::Account, Some(&existing), None, &ctx)?;

        // No account delete is ever allowed; reaching this point means the
        // policy was swapped for a more permissive one.
        Err(AppError::failed_precondition("accounts can not be deleted"))
    }

    // --- orders ---

    pub async fn create_order(&self, caller: &AuthUser, request: &OrderCreateRequest) -> AppResult<Order> {
        let now = Utc::now();
        let ctx = self.context(caller, now).await?;

        let mut proposed = Document::from_record(request)?;
        proposed.set(order_fields::ID, Uuid::new_v4().to_string());
        ownership::stamp_creation(&mut proposed, &ctx);

        self.enforce(Operation::Create, RecordType::Order, None, Some(&proposed), &ctx)?;

        let order: Order = proposed.into_record()?;
        orders::insert_order(&self.pool, &order).await?;

        tracing::info!(order_id = %order.id, creator_id = %order.creator_id, "order created");
        Ok(order)
    }

    pub async fn get_order(&self, caller: &AuthUser, id: Uuid) -> AppResult<Order> {
        let order = orders::find_order(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::not_found("order not found"))?;

        let ctx = self.context(caller, Utc::now()).await?;
        let existing = Document::from_record(&order)?;
        self.enforce(Operation::Read, RecordType::Order, Some(&existing), None, &ctx)?;
        Ok(order)
    }

    pub async fn list_orders(&self, caller: &AuthUser) -> AppResult<Vec<Order>> {
        let ctx = self.context(caller, Utc::now()).await?;
        let creator = if ctx.is_admin { None } else { Some(caller.user_id) };

        let mut visible = Vec::new();
        for order in orders::list_orders(&self.pool, creator).await? {
            let doc = Document::from_record(&order)?;
            if self.policy.evaluate(Operation::Read, RecordType::Order, Some(&doc), None, &ctx).is_allowed() {
                visible.push(order);
            }
        }
        Ok(visible)
    }

    pub async fn update_order(&self, caller: &AuthUser, id: Uuid, patch: Document) -> AppResult<Order> {
        let current = orders::find_order(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::not_found("order not found"))?;

        let now = Utc::now();
        let ctx = self.context(caller, now).await?;

        let existing = Document::from_record(&current)?;
        let mut proposed = existing.merged(&patch);
        proposed.set(order_fields::UPDATED_AT, now.to_rfc3339());

        self.enforce(Operation::Update, RecordType::Order, Some(&existing), Some(&proposed), &ctx)?;

        let updated: Order = proposed.into_record()?;
        orders::update_order(&self.pool, &updated).await?;
        Ok(updated)
    }

    pub async fn delete_order(&self, caller: &AuthUser, id: Uuid) -> AppResult<()> {
        let current = orders::find_order(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::not_found("order not found"))?;

        let ctx = self.context(caller, Utc::now()).await?;
        let existing = Document::from_record(&current)?;
        self.enforce(Operation::Delete, RecordType::Order, Some(&existing), None, &ctx)?;

        orders::delete_order(&self.pool, id).await?;
        tracing::info!(order_id = %id, deleted_by = %caller.user_id, "order deleted");
        Ok(())
    }
}
