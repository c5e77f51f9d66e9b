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
use crate::models::order::{Order, OrderCreateRequest, OrderPatch};
use crate::utils::parse_json_body;

#[utoipa::path(
    get,
    path = "/orders",
    tag = "Orders",
    responses((status = 200, description = "Own orders, or every order for admins", body = [Order])),
    security(("bearerAuth" = []))
)]
pub async fn list_orders(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<Order>>> {
    let orders = state.records.list_orders(&auth).await?;
    Ok(Json(orders))
}

#[utoipa::path(
    post,
    path = "/orders",
    tag = "Orders",
    request_body = OrderCreateRequest,
    responses(
        (status = 201, description = "Order created", body = Order),
        (status = 400, description = "Malformed order"),
        (status = 403, description = "Not permitted")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Bytes,
) -> AppResult<(StatusCode, Json<Order>)> {
    let request: OrderCreateRequest = parse_json_body(&body)?;
    let order = state.records.create_order(&auth, &request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[utoipa::path(
    get,
    path = "/orders/{id}",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order detail", body = Order),
        (status = 403, description = "Not permitted"),
        (status = 404, description = "Order not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    let order = state.records.get_order(&auth, id).await?;
    Ok(Json(order))
}

#[utoipa::path(
    put,
    path = "/orders/{id}",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = OrderPatch,
    responses(
        (status = 200, description = "Order updated", body = Order),
        (status = 403, description = "Not permitted"),
        (status = 404, description = "Order not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> AppResult<Json<Order>> {
    let patch = Document::from_value(parse_json_body::<Value>(&body)?)?;
    let order = state.records.update_order(&auth, id, patch).await?;
    Ok(Json(order))
}

#[utoipa::path(
    delete,
    path = "/orders/{id}",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 403, description = "Not permitted"),
        (status = 404, description = "Order not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.records.delete_order(&auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
