use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::admin::{RoleMutationService, SqliteBackend};
use crate::authz::{ClaimResolver, DefaultPolicyEvaluator, PolicyEvaluator};
use crate::config::{AdminAllowList, AppConfig};
use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{accounts, admin, auth, health, orders};
use crate::store::RecordStore;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub records: RecordStore,
    pub roles: Arc<RoleMutationService>,
    pub admin_allow_list: Arc<AdminAllowList>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: AppConfig) -> Self {
        let backend = SqliteBackend::new(pool.clone());
        let resolver = ClaimResolver::new(Arc::new(backend.clone()));
        let policy: Arc<dyn PolicyEvaluator> = Arc::new(DefaultPolicyEvaluator::new());

        let records = RecordStore::new(pool.clone(), resolver.clone(), policy.clone());
        let roles = RoleMutationService::new(backend, resolver, policy);

        Self {
            pool,
            jwt: Arc::new(config.jwt),
            records,
            roles: Arc::new(roles),
            admin_allow_list: Arc::new(config.admin_allow_list),
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let config = AppConfig::from_env()?;
    Ok(router(AppState::new(pool, config)))
}

pub fn create_app_with_config(pool: SqlitePool, config: AppConfig) -> Router {
    router(AppState::new(pool, config))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/me", get(auth::me));

    let account_routes = Router::new()
        .route("/", get(accounts::list_accounts))
        .route(
            "/:id",
            get(accounts::get_account)
                .put(accounts::update_account)
                .delete(accounts::delete_account),
        );

    let order_routes = Router::new()
        .route("/", get(orders::list_orders).post(orders::create_order))
        .route(
            "/:id",
            get(orders::get_order)
                .put(orders::update_order)
                .delete(orders::delete_order),
        );

    let admin_routes = Router::new()
        .route("/set-admin-role", post(admin::set_admin_role))
        .route("/disable-user", post(admin::disable_user))
        .route("/audit-log", get(admin::audit_log))
        .route("/claim-sync-issues", get(admin::claim_sync_issues));

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/auth", auth_routes)
        .nest("/accounts", account_routes)
        .nest("/orders", order_routes)
        .nest("/admin", admin_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
