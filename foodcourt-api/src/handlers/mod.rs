pub mod auth;
pub mod cart;
pub mod food;
pub mod order;
pub mod restaurant;

pub use auth::router as auth_router;
pub use cart::router as cart_router;
pub use food::router as food_router;
pub use order::router as order_router;
pub use restaurant::router as restaurant_router;

use std::sync::Arc;

use axum::{Router, http::HeaderMap, routing::get};
use chrono::TimeDelta;
use foodcourt_service::{
    auth::{Actor, AuthService},
    cart::CartService,
    catalog::CatalogService,
    models::User,
    order::{OrderService, StatusPolicy},
    store::Store,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub catalog: CatalogService,
    pub carts: CartService,
    pub orders: OrderService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        secret_key: &str,
        access_token_expires: TimeDelta,
        order_status_policy: StatusPolicy,
    ) -> Self {
        Self {
            auth: AuthService::new(store.clone(), secret_key, access_token_expires),
            catalog: CatalogService::new(store.clone()),
            carts: CartService::new(store.clone()),
            orders: OrderService::new(store, order_status_policy),
        }
    }
}

pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth_router())
        .merge(restaurant_router())
        .merge(food_router())
        .merge(cart_router())
        .merge(order_router());

    Router::new()
        .route("/", get(health))
        .nest("/api", api)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is up", body = String)),
    tag = "health"
)]
pub async fn health() -> &'static str {
    "API is running..."
}

/// Runs a store-backed service call off the async executor.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, foodcourt_service::Error> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("Worker task failed: {e}")))?
        .map_err(ApiError::from)
}

fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(header) = headers.get("authorization") else {
        return Ok(None);
    };
    let token = header
        .to_str()
        .map_err(|_| ApiError::InvalidToken)?
        .strip_prefix("Bearer ")
        .ok_or(ApiError::MissingToken)?;
    Ok(Some(token))
}

async fn authenticated_user(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let token = bearer_token(headers)?
        .ok_or(ApiError::MissingToken)?
        .to_string();
    let auth = state.auth.clone();
    blocking(move || auth.authenticate(&token))
        .await
        .map_err(|e| match e {
            ApiError::Service(foodcourt_service::Error::Unauthorized(_)) => ApiError::InvalidToken,
            other => other,
        })
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Actor, ApiError> {
    authenticated_user(state, headers)
        .await
        .map(|user| Actor::from(&user))
}

/// Like [`authenticate`], but a missing or unusable token means an anonymous
/// caller instead of an error.
async fn optional_actor(state: &AppState, headers: &HeaderMap) -> Option<Actor> {
    match bearer_token(headers) {
        Ok(Some(_)) => authenticate(state, headers).await.ok(),
        _ => None,
    }
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid {what} id")))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        auth::register,
        auth::login,
        auth::me,
        restaurant::create_restaurant,
        restaurant::list_restaurants,
        restaurant::my_restaurant,
        restaurant::get_restaurant,
        restaurant::update_restaurant,
        restaurant::approve_restaurant,
        restaurant::set_restaurant_status,
        restaurant::delete_restaurant,
        food::create_food,
        food::list_foods,
        food::update_food,
        food::delete_food,
        cart::add_to_cart,
        cart::get_cart,
        cart::remove_from_cart,
        order::create_order,
        order::user_orders,
        order::all_orders,
        order::update_order_status,
    ),
    components(
        schemas(
            crate::models::RegisterRequest,
            crate::models::LoginRequest,
            crate::models::AuthResponse,
            crate::models::UserProfile,
            crate::models::CreateRestaurantRequest,
            crate::models::UpdateRestaurantRequest,
            crate::models::ApproveRestaurantRequest,
            crate::models::RestaurantStatusRequest,
            crate::models::ContactResponse,
            crate::models::RestaurantResponse,
            crate::models::CreateFoodRequest,
            crate::models::UpdateFoodRequest,
            crate::models::FoodResponse,
            crate::models::AddToCartRequest,
            crate::models::CartItemResponse,
            crate::models::CartResponse,
            crate::models::CreateOrderRequest,
            crate::models::UpdateOrderStatusRequest,
            crate::models::OrderItemResponse,
            crate::models::OrderResponse,
            crate::models::MessageResponse,
            crate::models::ApiErrorResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness check"),
        (name = "auth", description = "Registration and login"),
        (name = "restaurants", description = "Restaurant management endpoints"),
        (name = "foods", description = "Menu item endpoints"),
        (name = "cart", description = "Shopping cart endpoints"),
        (name = "orders", description = "Checkout and order tracking")
    ),
    info(
        title = "Foodcourt API",
        description = "Food ordering backend",
        version = "1.0.0"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            use utoipa::openapi::security::*;
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
