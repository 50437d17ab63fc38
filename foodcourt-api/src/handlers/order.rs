use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post, put},
};
use foodcourt_service::order::CheckoutDetails;
use tracing::instrument;

use crate::error::ApiError;
use crate::models::*;

use super::{AppState, authenticate, blocking, parse_id};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/user", get(user_orders))
        .route("/orders/all", get(all_orders))
        .route("/orders/{id}/status", put(update_order_status))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order placed from the caller's cart", body = OrderResponse),
        (status = 400, description = "Empty cart or invalid items", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "orders"
)]
#[instrument(skip(state, headers))]
pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let actor = authenticate(&state, &headers).await?;
    let Json(payload) = payload?;

    let orders = state.orders.clone();
    let order = blocking(move || {
        orders.create_order(
            actor.user_id,
            CheckoutDetails {
                delivery_address: payload.delivery_address,
                payment_method: payload.payment_method,
            },
        )
    })
    .await?;

    Ok((StatusCode::CREATED, Json(order.into())))
}

#[utoipa::path(
    get,
    path = "/api/orders/user",
    responses(
        (status = 200, description = "The caller's orders, newest first", body = [OrderResponse]),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "orders"
)]
#[instrument(skip(state, headers))]
pub async fn user_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    let orders = state.orders.clone();
    let list = blocking(move || orders.user_orders(actor.user_id)).await?;
    Ok(Json(list.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/orders/all",
    responses(
        (status = 200, description = "All orders for admins, the restaurant's orders for owners", body = [OrderResponse]),
        (status = 401, description = "Customers may not list all orders", body = ApiErrorResponse),
        (status = 404, description = "Owner has no restaurant profile", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "orders"
)]
#[instrument(skip(state, headers))]
pub async fn all_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    let orders = state.orders.clone();
    let list = blocking(move || orders.orders_for_actor(&actor)).await?;
    Ok(Json(list.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    put,
    path = "/api/orders/{id}/status",
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 401, description = "Not allowed to update this order", body = ApiErrorResponse),
        (status = 404, description = "Order not found", body = ApiErrorResponse),
        (status = 409, description = "Illegal status transition", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Order ID")
    ),
    security(
        ("bearer" = []),
    ),
    tag = "orders"
)]
#[instrument(skip(state, headers))]
pub async fn update_order_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<UpdateOrderStatusRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    let id = parse_id(&id, "order")?;
    let Json(payload) = payload?;

    let orders = state.orders.clone();
    let order = blocking(move || orders.update_status(&actor, id, payload.status)).await?;
    Ok(Json(order.into()))
}
