#![allow(dead_code)]

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

use preorder::config::{AdminAllowList, AppConfig};
use preorder::jwt::JwtConfig;

pub const ROOT_EMAIL: &str = "root@example.com";
pub const PASSWORD: &str = "password123";

/// Keeps the temp dir alive for as long as the pool is used.
pub struct TestDb {
    pub pool: SqlitePool,
    _dir: TempDir,
}

pub async fn test_db() -> Result<TestDb> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("test.db");

    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator =
        sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
    migrator.run(&pool).await?;

    Ok(TestDb { pool, _dir: dir })
}

pub fn test_config() -> AppConfig {
    AppConfig::new(JwtConfig::new("test-secret", 1), AdminAllowList::new([ROOT_EMAIL]))
}

pub fn app(pool: &SqlitePool) -> Router {
    preorder::create_app_with_config(pool.clone(), test_config())
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let resp = app.clone().oneshot(req).await?;
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    Ok((status, value))
}

pub struct Registered {
    pub id: Uuid,
    pub email: String,
    pub token: String,
    pub account: Value,
}

pub async fn register(app: &Router, email: &str, display_name: &str) -> Result<Registered> {
    let (status, body) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "displayName": display_name, "email": email, "password": PASSWORD })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "register {email} failed: {body}");

    let account = body["account"].clone();
    Ok(Registered {
        id: account["id"].as_str().unwrap_or_default().parse()?,
        email: email.to_string(),
        token: body["token"].as_str().unwrap_or_default().to_string(),
        account,
    })
}

pub async fn login(app: &Router, email: &str) -> Result<(StatusCode, Value)> {
    send(app, "POST", "/auth/login", None, Some(json!({ "email": email, "password": PASSWORD }))).await
}

pub async fn refresh(app: &Router, token: &str) -> Result<String> {
    let (status, body) = send(app, "POST", "/auth/refresh", Some(token), None).await?;
    assert_eq!(status, StatusCode::OK, "refresh failed: {body}");
    Ok(body["token"].as_str().unwrap_or_default().to_string())
}

pub async fn set_admin_role(app: &Router, token: &str, target: Uuid, is_admin: bool) -> Result<(StatusCode, Value)> {
    send(
        app,
        "POST",
        "/admin/set-admin-role",
        Some(token),
        Some(json!({ "targetId": target.to_string(), "isAdmin": is_admin })),
    )
    .await
}

pub async fn disable_user(app: &Router, token: &str, target: Uuid, disabled: bool) -> Result<(StatusCode, Value)> {
    send(
        app,
        "POST",
        "/admin/disable-user",
        Some(token),
        Some(json!({ "targetId": target.to_string(), "disabled": disabled })),
    )
    .await
}

pub async fn audit_count(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(1) FROM audit_log").fetch_one(pool).await?)
}
