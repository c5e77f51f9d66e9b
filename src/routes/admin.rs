use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::admin::{audit, DisableUserRequest, DisableUserResponse, SetAdminRoleRequest, SetAdminRoleResponse};
use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::audit::{AuditLogEntry, ClaimSyncIssue};
use crate::utils::parse_json_body;

const DEFAULT_AUDIT_LIMIT: i64 = 100;
const MAX_AUDIT_LIMIT: i64 = 1000;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditLogQuery {
    /// Number of entries, newest first (default 100, max 1000)
    pub limit: Option<i64>,
}

#[utoipa::path(
    post,
    path = "/admin/set-admin-role",
    tag = "Admin",
    request_body = SetAdminRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = SetAdminRoleResponse),
        (status = 400, description = "Malformed payload"),
        (status = 401, description = "Missing token or disabled account"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Target account not found"),
        (status = 412, description = "Self-modification or last admin")
    ),
    security(("bearerAuth" = []))
)]
pub async fn set_admin_role(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Bytes,
) -> AppResult<Json<SetAdminRoleResponse>> {
    state.roles.ensure_active(&auth).await?;
    let request: SetAdminRoleRequest = parse_json_body(&body)?;
    let response = state.roles.set_admin_role(&auth, request).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/admin/disable-user",
    tag = "Admin",
    request_body = DisableUserRequest,
    responses(
        (status = 200, description = "Disabled flag updated", body = DisableUserResponse),
        (status = 400, description = "Malformed payload"),
        (status = 401, description = "Missing token or disabled account"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Target account not found"),
        (status = 412, description = "Self-disable or last admin")
    ),
    security(("bearerAuth" = []))
)]
pub async fn disable_user(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Bytes,
) -> AppResult<Json<DisableUserResponse>> {
    state.roles.ensure_active(&auth).await?;
    let request: DisableUserRequest = parse_json_body(&body)?;
    let response = state.roles.disable_user(&auth, request).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/admin/audit-log",
    tag = "Admin",
    params(AuditLogQuery),
    responses(
        (status = 200, description = "Audit entries, newest first", body = [AuditLogEntry]),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearerAuth" = []))
)]
pub async fn audit_log(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<AuditLogQuery>,
) -> AppResult<Json<Vec<AuditLogEntry>>> {
    require_admin(&state, &auth).await?;

    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).clamp(1, MAX_AUDIT_LIMIT);
    let entries = audit::list_entries(&state.pool, limit).await?;
    Ok(Json(entries))
}

#[utoipa::path(
    get,
    path = "/admin/claim-sync-issues",
    tag = "Admin",
    responses(
        (status = 200, description = "Recorded claim/record divergences", body = [ClaimSyncIssue]),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearerAuth" = []))
)]
pub async fn claim_sync_issues(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<ClaimSyncIssue>>> {
    require_admin(&state, &auth).await?;

    let issues = audit::list_sync_issues(&state.pool).await?;
    Ok(Json(issues))
}

async fn require_admin(state: &AppState, auth: &AuthUser) -> AppResult<()> {
    state.roles.ensure_active(auth).await?;
    if state.roles.caller_is_admin(auth).await {
        Ok(())
    } else {
        Err(AppError::permission_denied("admin privileges required"))
    }
}
