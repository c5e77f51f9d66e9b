use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::backend::{AccountDirectory, AuditSink, CredentialStore, SqliteBackend, SyncIssueLog};
use crate::authz::{ClaimResolver, Decision, Document, EvaluationContext, Operation, PolicyEvaluator, RecordType};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::account::Account;
use crate::models::audit::{AuditAction, AuditLogEntry, ClaimSyncIssue};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SetAdminRoleRequest {
    #[schema(example = "9f1c2f7e-5a4b-4c1d-8e2f-0a1b2c3d4e5f")]
    pub target_id: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DisableUserRequest {
    #[schema(example = "9f1c2f7e-5a4b-4c1d-8e2f-0a1b2c3d4e5f")]
    pub target_id: String,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetAdminRoleResponse {
    pub success: bool,
    pub target_id: Uuid,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisableUserResponse {
    pub success: bool,
    pub target_id: Uuid,
    pub disabled: bool,
}

#[derive(Debug, Clone, Copy)]
enum Mutation {
    Role(bool),
    Disable(bool),
}

impl Mutation {
    fn action(self) -> AuditAction {
        match self {
            Mutation::Role(_) => AuditAction::RoleChange,
            Mutation::Disable(_) => AuditAction::DisableChange,
        }
    }

    fn new_value(self) -> bool {
        match self {
            Mutation::Role(v) | Mutation::Disable(v) => v,
        }
    }

    fn field(self) -> &'static str {
        match self {
            Mutation::Role(_) => "isAdmin",
            Mutation::Disable(_) => "disabled",
        }
    }

    fn current(self, account: &Account) -> bool {
        match self {
            Mutation::Role(_) => account.is_admin,
            Mutation::Disable(_) => account.disabled,
        }
    }

    /// True when applying this leaves one fewer enabled admin.
    fn removes_enabled_admin(self, target: &Account) -> bool {
        target.is_enabled_admin()
            && match self {
                Mutation::Role(v) => !v,
                Mutation::Disable(v) => v,
            }
    }

    fn self_message(self) -> &'static str {
        match self {
            Mutation::Role(_) => "cannot modify your own admin status",
            Mutation::Disable(_) => "cannot disable your own account",
        }
    }

    fn lockout_message(self) -> &'static str {
        match self {
            Mutation::Role(_) => "cannot demote the last admin",
            Mutation::Disable(_) => "cannot disable the last admin",
        }
    }

    fn applied_to(self, account: &Account, actor: Uuid, at: DateTime<Utc>) -> Account {
        let mut next = account.clone();
        match self {
            Mutation::Role(v) => next.is_admin = v,
            Mutation::Disable(true) => {
                next.disabled = true;
                next.disabled_at = Some(at);
                next.disabled_by = Some(actor);
            }
            Mutation::Disable(false) => {
                next.disabled = false;
                next.disabled_at = None;
                next.disabled_by = None;
            }
        }
        next.updated_at = at;
        next
    }
}

/// The only path that changes `isAdmin` or `disabled` on an account.
///
/// Each accepted call writes the credential layer first and the account
/// record second, then appends one audit entry whatever the outcome.
#[derive(Clone)]
pub struct RoleMutationService {
    accounts: Arc<dyn AccountDirectory>,
    credentials: Arc<dyn CredentialStore>,
    audit: Arc<dyn AuditSink>,
    sync_issues: Arc<dyn SyncIssueLog>,
    resolver: ClaimResolver,
    policy: Arc<dyn PolicyEvaluator>,
}

impl RoleMutationService {
    pub fn new(backend: SqliteBackend, resolver: ClaimResolver, policy: Arc<dyn PolicyEvaluator>) -> Self {
        let backend = Arc::new(backend);
        Self {
            accounts: backend.clone(),
            credentials: backend.clone(),
            audit: backend.clone(),
            sync_issues: backend,
            resolver,
            policy,
        }
    }

    pub fn with_accounts(mut self, accounts: Arc<dyn AccountDirectory>) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_sync_issues(mut self, sync_issues: Arc<dyn SyncIssueLog>) -> Self {
        self.sync_issues = sync_issues;
        self
    }

    pub async fn set_admin_role(&self, caller: &AuthUser, request: SetAdminRoleRequest) -> AppResult<SetAdminRoleResponse> {
        self.resolver.ensure_active(caller).await?;
        let target_id = parse_target_id(&request.target_id)?;
        self.run(caller, target_id, Mutation::Role(request.is_admin)).await?;

        Ok(SetAdminRoleResponse {
            success: true,
            target_id,
            is_admin: request.is_admin,
        })
    }

    pub async fn disable_user(&self, caller: &AuthUser, request: DisableUserRequest) -> AppResult<DisableUserResponse> {
        self.resolver.ensure_active(caller).await?;
        let target_id = parse_target_id(&request.target_id)?;
        self.run(caller, target_id, Mutation::Disable(request.disabled)).await?;

        Ok(DisableUserResponse {
            success: true,
            target_id,
            disabled: request.disabled,
        })
    }

    /// Grants admin to a freshly created account whose email is on the
    /// operator allow-list. Not audited: there is no acting admin.
    pub async fn bootstrap_admin(&self, account_id: Uuid) -> AppResult<()> {
        let mutation = Mutation::Role(true);
        self.credentials.set_admin_claim(account_id, true).await?;

        if let Err(err) = self.accounts.write_admin_flag(account_id, true, Utc::now()).await {
            tracing::error!(
                account_id = %account_id,
                field = mutation.field(),
                error = %err,
                "claims and record out of sync; manual reconciliation required"
            );
            let record_value = match self.accounts.find_account(account_id).await {
                Ok(account) => account.map(|a| mutation.current(&a)),
                Err(_) => None,
            };
            self.flag_divergence(account_id, mutation, record_value, &err).await;
            return Err(AppError::internal(
                "admin claim granted but the account record was not updated; flagged for reconciliation",
            ));
        }

        tracing::info!(account_id = %account_id, "allow-listed account seeded as admin");
        Ok(())
    }

    /// Rejects callers whose credential is disabled or gone.
    pub async fn ensure_active(&self, caller: &AuthUser) -> AppResult<()> {
        self.resolver.ensure_active(caller).await
    }

    /// Admin status for privileged operations. A claim saying "no" is
    /// double-checked against the caller's record, which is authoritative.
    pub async fn caller_is_admin(&self, caller: &AuthUser) -> bool {
        if self.resolver.resolve_is_admin(caller).await {
            return true;
        }
        caller.admin_claim.is_some() && self.resolver.record_is_admin(caller).await
    }

    async fn run(&self, caller: &AuthUser, target_id: Uuid, mutation: Mutation) -> AppResult<()> {
        let now = Utc::now();
        let actor_was_admin = self.caller_is_admin(caller).await;

        let mut entry = AuditLogEntry {
            id: Uuid::new_v4(),
            action: mutation.action(),
            actor_id: caller.user_id,
            actor_email: caller.email.clone(),
            actor_was_admin,
            target_id,
            target_email: None,
            previous_value: None,
            new_value: mutation.new_value(),
            timestamp: now,
            success: false,
            error_message: None,
        };

        let result = self.apply(caller, actor_was_admin, target_id, mutation, now, &mut entry).await;

        entry.success = result.is_ok();
        entry.error_message = result.as_ref().err().map(AppError::detail);
        self.write_audit(&entry).await;

        result
    }

    async fn apply(
        &self,
        caller: &AuthUser,
        actor_is_admin: bool,
        target_id: Uuid,
        mutation: Mutation,
        now: DateTime<Utc>,
        entry: &mut AuditLogEntry,
    ) -> AppResult<()> {
        if !actor_is_admin {
            tracing::info!(caller_id = %caller.user_id, action = mutation.action().as_str(), "non-admin role mutation rejected");
            return Err(AppError::permission_denied("admin privileges required"));
        }

        if target_id == caller.user_id {
            return Err(AppError::failed_precondition(mutation.self_message()));
        }

        let target = self
            .accounts
            .find_account(target_id)
            .await?
            .ok_or_else(|| AppError::not_found("target account not found"))?;
        entry.target_email = Some(target.email.clone());
        entry.previous_value = Some(mutation.current(&target));

        // Racy by nature: two concurrent demotions can both see two admins.
        if mutation.removes_enabled_admin(&target) {
            let enabled_admins = self.accounts.count_enabled_admins().await?;
            if enabled_admins <= 1 {
                tracing::info!(target_id = %target_id, enabled_admins, "last admin protection triggered");
                return Err(AppError::failed_precondition(mutation.lockout_message()));
            }
        }

        let existing = Document::from_record(&target)?;
        let proposed = Document::from_record(&mutation.applied_to(&target, caller.user_id, now))?;
        let ctx = EvaluationContext::for_caller(caller, true, now);
        if let Decision::Deny(reason) =
            self.policy
                .evaluate(Operation::Update, RecordType::Account, Some(&existing), Some(&proposed), &ctx)
        {
            tracing::warn!(target_id = %target_id, reason = %reason, "policy rejected an admin mutation");
            return Err(AppError::not_permitted());
        }

        let credential_write = match mutation {
            Mutation::Role(v) => self.credentials.set_admin_claim(target_id, v).await,
            Mutation::Disable(v) => self.credentials.set_disabled(target_id, v).await,
        };
        if let Err(err) = credential_write {
            tracing::error!(target_id = %target_id, error = %err, "credential update failed");
            return Err(AppError::internal("failed to update credentials"));
        }

        let record_write = match mutation {
            Mutation::Role(v) => self.accounts.write_admin_flag(target_id, v, now).await,
            Mutation::Disable(v) => self.accounts.write_disabled_flag(target_id, v, caller.user_id, now).await,
        };
        if let Err(err) = record_write {
            tracing::error!(
                target_id = %target_id,
                field = mutation.field(),
                claim_value = mutation.new_value(),
                error = %err,
                "claims and record out of sync; manual reconciliation required"
            );
            self.flag_divergence(target_id, mutation, Some(mutation.current(&target)), &err).await;
            return Err(AppError::internal(
                "credentials updated but the account record was not; flagged for reconciliation",
            ));
        }

        tracing::info!(
            actor_id = %caller.user_id,
            target_id = %target_id,
            field = mutation.field(),
            value = mutation.new_value(),
            "account privileges updated"
        );
        Ok(())
    }

    async fn flag_divergence(&self, target_id: Uuid, mutation: Mutation, record_value: Option<bool>, err: &AppError) {
        let issue = ClaimSyncIssue {
            id: Uuid::new_v4(),
            target_id,
            field: mutation.field().to_string(),
            claim_value: mutation.new_value(),
            record_value,
            detail: err.detail(),
            detected_at: Utc::now(),
        };

        if let Err(log_err) = self.sync_issues.record_sync_issue(&issue).await {
            tracing::error!(target_id = %target_id, error = %log_err, "failed to record claim sync issue");
        }
    }

    async fn write_audit(&self, entry: &AuditLogEntry) {
        if let Err(err) = self.audit.append(entry).await {
            tracing::error!(
                entry_id = %entry.id,
                action = entry.action.as_str(),
                target_id = %entry.target_id,
                error = %err,
                "failed to write audit entry"
            );
        }
    }
}

fn parse_target_id(raw: &str) -> AppResult<Uuid> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::invalid_argument("targetId is required"));
    }
    Uuid::parse_str(raw).map_err(|_| AppError::invalid_argument("targetId must be a valid account id"))
}
