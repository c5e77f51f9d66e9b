use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Document;
use crate::errors::AppResult;
use crate::jwt::AuthUser;
use crate::models::account::{Account, AccountPatch};
use crate::utils::parse_json_body;

#[utoipa::path(
    get,
    path = "/accounts",
    tag = "Accounts",
    responses((status = 200, description = "Accounts visible to the caller", body = [Account])),
    security(("bearerAuth" = []))
)]
pub async fn list_accounts(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<Account>>> {
    let accounts = state.records.list_accounts(&auth).await?;
    Ok(Json(accounts))
}

#[utoipa::path(
    get,
    path = "/accounts/{id}",
    tag = "Accounts",
    params(("id" = Uuid, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account detail", body = Account),
        (status = 403, description = "Not permitted"),
        (status = 404, description = "Account not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Account>> {
    let account = state.records.get_account(&auth, id).await?;
    Ok(Json(account))
}

/// Merge patch. Any field may be sent; the policy decides what may change.
#[utoipa::path(
    put,
    path = "/accounts/{id}",
    tag = "Accounts",
    params(("id" = Uuid, Path, description = "Account id")),
    request_body = AccountPatch,
    responses(
        (status = 200, description = "Account updated", body = Account),
        (status = 403, description = "Not permitted"),
        (status = 412, description = "Role or disabled change sent to the record endpoint")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> AppResult<Json<Account>> {
    let patch = Document::from_value(parse_json_body::<Value>(&body)?)?;
    let account = state.records.update_account(&auth, id, patch).await?;
    Ok(Json(account))
}

#[utoipa::path(
    delete,
    path = "/accounts/{id}",
    tag = "Accounts",
    params(("id" = Uuid, Path, description = "Account id")),
    responses((status = 403, description = "Accounts are never deleted")),
    security(("bearerAuth" = []))
)]
pub async fn delete_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.records.delete_account(&auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
