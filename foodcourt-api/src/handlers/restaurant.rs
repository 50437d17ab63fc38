use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post, put},
};
use foodcourt_service::catalog::{NewRestaurant, RestaurantChanges};
use tracing::instrument;

use crate::error::ApiError;
use crate::models::*;

use super::{AppState, authenticate, blocking, optional_actor, parse_id};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/restaurants", post(create_restaurant).get(list_restaurants))
        .route("/restaurants/my/profile", get(my_restaurant))
        .route(
            "/restaurants/{id}",
            get(get_restaurant)
                .put(update_restaurant)
                .delete(delete_restaurant),
        )
        .route("/restaurants/{id}/approve", put(approve_restaurant))
        .route("/restaurants/{id}/status", put(set_restaurant_status))
}

#[utoipa::path(
    post,
    path = "/api/restaurants",
    request_body = CreateRestaurantRequest,
    responses(
        (status = 201, description = "Restaurant created", body = RestaurantResponse),
        (status = 400, description = "Invalid payload or profile already exists", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "restaurants"
)]
#[instrument(skip(state, headers))]
pub async fn create_restaurant(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateRestaurantRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RestaurantResponse>), ApiError> {
    let actor = authenticate(&state, &headers).await?;
    let Json(payload) = payload?;

    let catalog = state.catalog.clone();
    let restaurant = blocking(move || {
        catalog.create_restaurant(
            &actor,
            NewRestaurant {
                name: payload.name,
                description: payload.description,
                address: payload.address,
                image: payload.image,
            },
        )
    })
    .await?;

    Ok((StatusCode::CREATED, Json(restaurant.into())))
}

#[utoipa::path(
    get,
    path = "/api/restaurants",
    responses(
        (status = 200, description = "Approved and online restaurants; admins see all", body = [RestaurantResponse]),
    ),
    security(
        (),
        ("bearer" = []),
    ),
    tag = "restaurants"
)]
#[instrument(skip(state, headers))]
pub async fn list_restaurants(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<RestaurantResponse>>, ApiError> {
    let actor = optional_actor(&state, &headers).await;
    let catalog = state.catalog.clone();
    let restaurants = blocking(move || catalog.list_restaurants(actor.as_ref())).await?;
    Ok(Json(restaurants.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/restaurants/my/profile",
    responses(
        (status = 200, description = "The caller's restaurant", body = RestaurantResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "No restaurant profile", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "restaurants"
)]
#[instrument(skip(state, headers))]
pub async fn my_restaurant(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    let catalog = state.catalog.clone();
    let restaurant = blocking(move || catalog.my_restaurant(&actor)).await?;
    Ok(Json(restaurant.into()))
}

#[utoipa::path(
    get,
    path = "/api/restaurants/{id}",
    responses(
        (status = 200, description = "Restaurant details", body = RestaurantResponse),
        (status = 400, description = "Malformed id", body = ApiErrorResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Restaurant ID")
    ),
    tag = "restaurants"
)]
#[instrument(skip(state))]
pub async fn get_restaurant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let id = parse_id(&id, "restaurant")?;
    let catalog = state.catalog.clone();
    let restaurant = blocking(move || catalog.get_restaurant(id)).await?;
    Ok(Json(restaurant.into()))
}

#[utoipa::path(
    put,
    path = "/api/restaurants/{id}",
    request_body = UpdateRestaurantRequest,
    responses(
        (status = 200, description = "Restaurant updated", body = RestaurantResponse),
        (status = 401, description = "Not the owner", body = ApiErrorResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Restaurant ID")
    ),
    security(
        ("bearer" = []),
    ),
    tag = "restaurants"
)]
#[instrument(skip(state, headers))]
pub async fn update_restaurant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<UpdateRestaurantRequest>, JsonRejection>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    let id = parse_id(&id, "restaurant")?;
    let Json(payload) = payload?;

    let catalog = state.catalog.clone();
    let restaurant = blocking(move || {
        catalog.update_restaurant(
            &actor,
            id,
            RestaurantChanges {
                name: payload.name,
                description: payload.description,
                address: payload.address,
                image: payload.image,
            },
        )
    })
    .await?;

    Ok(Json(restaurant.into()))
}

#[utoipa::path(
    put,
    path = "/api/restaurants/{id}/approve",
    request_body = ApproveRestaurantRequest,
    responses(
        (status = 200, description = "Approval changed", body = RestaurantResponse),
        (status = 401, description = "Not an admin", body = ApiErrorResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Restaurant ID")
    ),
    security(
        ("bearer" = []),
    ),
    tag = "restaurants"
)]
#[instrument(skip(state, headers))]
pub async fn approve_restaurant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<ApproveRestaurantRequest>, JsonRejection>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    let id = parse_id(&id, "restaurant")?;
    let Json(payload) = payload?;

    let catalog = state.catalog.clone();
    let restaurant =
        blocking(move || catalog.approve_restaurant(&actor, id, payload.is_active)).await?;
    Ok(Json(restaurant.into()))
}

#[utoipa::path(
    put,
    path = "/api/restaurants/{id}/status",
    request_body = RestaurantStatusRequest,
    responses(
        (status = 200, description = "Online status changed", body = RestaurantResponse),
        (status = 401, description = "Not the owner", body = ApiErrorResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Restaurant ID")
    ),
    security(
        ("bearer" = []),
    ),
    tag = "restaurants"
)]
#[instrument(skip(state, headers))]
pub async fn set_restaurant_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<RestaurantStatusRequest>, JsonRejection>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    let id = parse_id(&id, "restaurant")?;
    let Json(payload) = payload?;

    let catalog = state.catalog.clone();
    let restaurant = blocking(move || catalog.set_online(&actor, id, payload.is_online)).await?;
    Ok(Json(restaurant.into()))
}

#[utoipa::path(
    delete,
    path = "/api/restaurants/{id}",
    responses(
        (status = 200, description = "Restaurant and its menu deleted", body = MessageResponse),
        (status = 401, description = "Not an admin", body = ApiErrorResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    params(
        ("id" = String, Path, description = "Restaurant ID")
    ),
    security(
        ("bearer" = []),
    ),
    tag = "restaurants"
)]
#[instrument(skip(state, headers))]
pub async fn delete_restaurant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    let id = parse_id(&id, "restaurant")?;
    let catalog = state.catalog.clone();
    blocking(move || catalog.delete_restaurant(&actor, id)).await?;
    Ok(Json(MessageResponse {
        message: "Restaurant removed".to_string(),
    }))
}
