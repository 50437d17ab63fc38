use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::HeaderMap,
    response::Json,
    routing::{delete, get, post},
};
use tracing::instrument;

use crate::error::ApiError;
use crate::models::*;

use super::{AppState, authenticate, blocking, parse_id};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cart", get(get_cart))
        .route("/cart/add", post(add_to_cart))
        .route("/cart/remove/{food_id}", delete(remove_from_cart))
}

#[utoipa::path(
    post,
    path = "/api/cart/add",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 400, description = "Invalid quantity or item from another restaurant", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "Food item not found", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "cart"
)]
#[instrument(skip(state, headers))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AddToCartRequest>, JsonRejection>,
) -> Result<Json<CartResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    let Json(payload) = payload?;
    let quantity = payload.quantity.unwrap_or(1);

    let carts = state.carts.clone();
    let cart =
        blocking(move || carts.add_item(actor.user_id, payload.food_id, quantity)).await?;
    Ok(Json(cart.into()))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "The caller's cart, empty if none exists", body = CartResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "cart"
)]
#[instrument(skip(state, headers))]
pub async fn get_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CartResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    let carts = state.carts.clone();
    let cart = blocking(move || carts.get_cart(actor.user_id)).await?;
    Ok(Json(cart.into()))
}

#[utoipa::path(
    delete,
    path = "/api/cart/remove/{food_id}",
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "Cart not found", body = ApiErrorResponse),
    ),
    params(
        ("food_id" = String, Path, description = "Menu item ID")
    ),
    security(
        ("bearer" = []),
    ),
    tag = "cart"
)]
#[instrument(skip(state, headers))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(food_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    let food_id = parse_id(&food_id, "food")?;
    let carts = state.carts.clone();
    let cart = blocking(move || carts.remove_item(actor.user_id, food_id)).await?;
    Ok(Json(cart.into()))
}
