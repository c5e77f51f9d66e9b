use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::account::{Account, AuthResponse, LoginRequest, RegisterRequest};
use crate::models::credential::Credential;
use crate::store::credentials;
use crate::utils::{hash_password, normalize_email, verify_password};

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account registered", body = AuthResponse),
        (status = 400, description = "Invalid registration data"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::invalid_argument("a valid email is required"));
    }
    if payload.display_name.trim().is_empty() {
        return Err(AppError::invalid_argument("displayName is required"));
    }
    if credentials::email_taken(&state.pool, &email).await? {
        return Err(AppError::conflict("email already in use"));
    }

    let password_hash = hash_password(&payload.password)?;
    let user_id = uuid::Uuid::new_v4();
    let caller = AuthUser::new(user_id, email.clone());
    let mut account = state
        .records
        .register_account(&caller, &password_hash, &payload.display_name)
        .await?;

    // The account exists from here on; a failed seed leaves it as a regular
    // user and any claim/record split is already flagged.
    if state.admin_allow_list.contains(&email) {
        if let Err(err) = state.roles.bootstrap_admin(user_id).await {
            tracing::error!(user_id = %user_id, error = %err, "admin seeding failed");
        }
        account = state.records.get_account(&caller, user_id).await?;
    }

    let credential = load_credential(&state, user_id).await?;
    let token = issue_token(&state, &credential)?;
    tracing::info!(user_id = %user_id, is_admin = account.is_admin, "account registered");

    Ok((StatusCode::CREATED, Json(AuthResponse { token, account })))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials or account disabled")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let credential = credentials::find_by_email(&state.pool, &normalize_email(&payload.email))
        .await?
        .ok_or_else(|| AppError::unauthenticated("invalid credentials"))?;

    if !verify_password(&payload.password, &credential.password_hash)? {
        return Err(AppError::unauthenticated("invalid credentials"));
    }

    session_response(&state, &credential).await.map(Json)
}

/// Re-issues the caller's token from the credential's current claims, so a
/// role change made by an admin reaches the caller's session.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "Auth",
    responses(
        (status = 200, description = "Fresh token with current claims", body = AuthResponse),
        (status = 401, description = "Missing or invalid token, or account disabled")
    ),
    security(("bearerAuth" = []))
)]
pub async fn refresh(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<AuthResponse>> {
    let credential = credentials::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::unauthenticated("credential no longer exists"))?;

    session_response(&state, &credential).await.map(Json)
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses((status = 200, description = "Caller's own account", body = Account)),
    security(("bearerAuth" = []))
)]
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Account>> {
    let account = state.records.get_account(&auth, auth.user_id).await?;
    Ok(Json(account))
}

async fn session_response(state: &AppState, credential: &Credential) -> AppResult<AuthResponse> {
    if credential.disabled {
        tracing::info!(user_id = %credential.id, "sign-in refused for disabled account");
        return Err(AppError::unauthenticated("account disabled"));
    }

    let token = issue_token(state, credential)?;
    let caller = AuthUser::new(credential.id, credential.email.clone());
    let account = state.records.get_account(&caller, credential.id).await?;

    Ok(AuthResponse { token, account })
}

async fn load_credential(state: &AppState, user_id: uuid::Uuid) -> AppResult<Credential> {
    credentials::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::internal("credential missing after registration"))
}

fn issue_token(state: &AppState, credential: &Credential) -> AppResult<String> {
    state
        .jwt
        .encode(credential.id, &credential.email, credential.admin_claim())
}
