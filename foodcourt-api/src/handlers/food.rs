use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::post,
};
use foodcourt_service::catalog::{MenuItemChanges, NewMenuItem};
use tracing::instrument;

use crate::error::ApiError;
use crate::models::*;

use super::{AppState, authenticate, blocking, parse_id};

pub fn router() -> Router<AppState> {
    // POST and GET take a restaurant id, PUT and DELETE a menu item id.
    Router::new().route(
        "/foods/{id}",
        post(create_food)
            .get(list_foods)
            .put(update_food)
            .delete(delete_food),
    )
}

#[utoipa::path(
    post,
    path = "/api/foods/{restaurant_id}",
    request_body = CreateFoodRequest,
    responses(
        (status = 201, description = "Menu item created", body = FoodResponse),
        (status = 400, description = "Invalid payload or price", body = ApiErrorResponse),
        (status = 401, description = "Not the owner", body = ApiErrorResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    params(
        ("restaurant_id" = String, Path, description = "Restaurant ID")
    ),
    security(
        ("bearer" = []),
    ),
    tag = "foods"
)]
#[instrument(skip(state, headers))]
pub async fn create_food(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(restaurant_id): Path<String>,
    payload: Result<Json<CreateFoodRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<FoodResponse>), ApiError> {
    let actor = authenticate(&state, &headers).await?;
    let restaurant_id = parse_id(&restaurant_id, "restaurant")?;
    let Json(payload) = payload?;
    let price = payload.price.to_decimal()?;

    let catalog = state.catalog.clone();
    let item = blocking(move || {
        catalog.create_menu_item(
            &actor,
            restaurant_id,
            NewMenuItem {
                name: payload.name,
                price,
                category: payload.category,
                is_available: payload.is_available,
                image: payload.image,
            },
        )
    })
    .await?;

    Ok((StatusCode::CREATED, Json(item.into())))
}

#[utoipa::path(
    get,
    path = "/api/foods/{restaurant_id}",
    responses(
        (status = 200, description = "Menu of the restaurant", body = [FoodResponse]),
        (status = 400, description = "Malformed id", body = ApiErrorResponse),
    ),
    params(
        ("restaurant_id" = String, Path, description = "Restaurant ID")
    ),
    tag = "foods"
)]
#[instrument(skip(state))]
pub async fn list_foods(
    State(state): State<AppState>,
    Path(restaurant_id): Path<String>,
) -> Result<Json<Vec<FoodResponse>>, ApiError> {
    let restaurant_id = parse_id(&restaurant_id, "restaurant")?;
    let catalog = state.catalog.clone();
    let items = blocking(move || catalog.list_menu_items(restaurant_id)).await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    put,
    path = "/api/foods/{id}",
    request_body = UpdateFoodRequest,
    responses(
        (status = 200, description = "Menu item updated", body = FoodResponse),
        (status = 400, description = "Invalid price", body = ApiErrorResponse),
        (status = 401, description = "Not the owner", body = ApiErrorResponse),
        (status = 404, description = "Menu item not found", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Menu item ID")
    ),
    security(
        ("bearer" = []),
    ),
    tag = "foods"
)]
#[instrument(skip(state, headers))]
pub async fn update_food(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<UpdateFoodRequest>, JsonRejection>,
) -> Result<Json<FoodResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    let id = parse_id(&id, "food")?;
    let Json(payload) = payload?;
    let price = payload
        .price
        .as_ref()
        .map(PriceInput::to_decimal)
        .transpose()?;

    let catalog = state.catalog.clone();
    let item = blocking(move || {
        catalog.update_menu_item(
            &actor,
            id,
            MenuItemChanges {
                name: payload.name,
                price,
                category: payload.category,
                is_available: payload.is_available,
                image: payload.image,
            },
        )
    })
    .await?;

    Ok(Json(item.into()))
}

#[utoipa::path(
    delete,
    path = "/api/foods/{id}",
    responses(
        (status = 200, description = "Menu item deleted", body = MessageResponse),
        (status = 401, description = "Not the owner", body = ApiErrorResponse),
        (status = 404, description = "Menu item not found", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Menu item ID")
    ),
    security(
        ("bearer" = []),
    ),
    tag = "foods"
)]
#[instrument(skip(state, headers))]
pub async fn delete_food(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    let id = parse_id(&id, "food")?;
    let catalog = state.catalog.clone();
    blocking(move || catalog.delete_menu_item(&actor, id)).await?;
    Ok(Json(MessageResponse {
        message: "Food item removed".to_string(),
    }))
}
