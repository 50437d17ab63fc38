use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use foodcourt_service::{
    auth::Session,
    cart::{CartLine, CartView},
    catalog::RestaurantListing,
    models::{Contact, MenuItem, OrderDetails, OrderItem, OrderStatus, Restaurant, Role, User},
    order::ManagedOrder,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// `user` (default) or `restaurant`
    #[schema(value_type = Option<String>, example = "user")]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[schema(value_type = String, example = "user")]
    pub role: Role,
    /// Bearer token for the `Authorization` header
    pub token: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
}

impl From<Session> for AuthResponse {
    fn from(session: Session) -> Self {
        Self {
            id: session.user.id,
            name: session.user.name,
            email: session.user.email,
            role: session.user.role,
            token: session.access_token,
            expires_in: session.expires_in,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[schema(value_type = String, example = "restaurant")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRestaurantRequest {
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    /// Image URL
    pub image: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRestaurantRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRestaurantRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantStatusRequest {
    pub is_online: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContactResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<Contact> for ContactResponse {
    fn from(contact: Contact) -> Self {
        Self {
            id: contact.id,
            name: contact.name,
            email: contact.email,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub image: Option<String>,
    /// Approved by an admin
    pub is_active: bool,
    /// Accepting orders
    pub is_online: bool,
    pub created_at: DateTime<Utc>,
    /// Only in the admin listing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<ContactResponse>,
}

impl From<RestaurantListing> for RestaurantResponse {
    fn from(listing: RestaurantListing) -> Self {
        Self {
            owner: listing.owner.map(Into::into),
            ..Self::from(listing.restaurant)
        }
    }
}

impl From<Restaurant> for RestaurantResponse {
    fn from(r: Restaurant) -> Self {
        Self {
            id: r.id,
            owner_id: r.owner_id,
            name: r.name,
            description: r.description,
            address: r.address,
            image: r.image,
            is_active: r.is_active,
            is_online: r.is_online,
            created_at: r.created_at,
            owner: None,
        }
    }
}

/// A price given either as a JSON number or as a decimal string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

impl PriceInput {
    pub fn to_decimal(&self) -> Result<BigDecimal, ApiError> {
        let text = match self {
            PriceInput::Number(n) if n.is_finite() => n.to_string(),
            PriceInput::Number(_) => return Err(ApiError::BadRequest("Invalid price".to_string())),
            PriceInput::Text(s) => s.trim().to_string(),
        };
        BigDecimal::from_str(&text).map_err(|_| ApiError::BadRequest("Invalid price".to_string()))
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFoodRequest {
    pub name: String,
    #[schema(value_type = String, example = "12.50")]
    pub price: PriceInput,
    pub category: String,
    pub is_available: Option<bool>,
    pub image: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFoodRequest {
    pub name: Option<String>,
    #[schema(value_type = Option<String>, example = "12.50")]
    pub price: Option<PriceInput>,
    pub category: Option<String>,
    pub is_available: Option<bool>,
    pub image: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FoodResponse {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    /// Decimal string
    pub price: String,
    pub category: String,
    pub image: Option<String>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

impl From<MenuItem> for FoodResponse {
    fn from(item: MenuItem) -> Self {
        Self {
            id: item.id,
            restaurant_id: item.restaurant_id,
            name: item.name,
            price: item.price.to_string(),
            category: item.category,
            image: item.image,
            is_available: item.is_available,
            created_at: item.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub food_id: Uuid,
    /// Defaults to 1
    pub quantity: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemResponse {
    pub food_id: Uuid,
    pub quantity: i32,
    /// `null` when the menu item no longer exists
    pub food: Option<FoodResponse>,
}

impl From<CartLine> for CartItemResponse {
    fn from(line: CartLine) -> Self {
        Self {
            food_id: line.menu_item_id,
            quantity: line.quantity,
            food: line.menu_item.map(FoodResponse::from),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub user_id: Uuid,
    pub items: Vec<CartItemResponse>,
    /// Decimal string
    pub total_amount: String,
}

impl From<CartView> for CartResponse {
    fn from(cart: CartView) -> Self {
        Self {
            user_id: cart.user_id,
            items: cart.lines.into_iter().map(CartItemResponse::from).collect(),
            total_amount: cart.total_amount.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub delivery_address: String,
    /// Defaults to `COD`
    pub payment_method: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    #[schema(value_type = String, example = "Preparing")]
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub food_id: Uuid,
    pub name: String,
    /// Price at checkout
    pub price: String,
    pub quantity: i32,
    pub image: Option<String>,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            food_id: item.menu_item_id,
            name: item.name,
            price: item.price.to_string(),
            quantity: item.quantity,
            image: item.image,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub items: Vec<OrderItemResponse>,
    pub total_amount: String,
    pub delivery_address: String,
    pub payment_method: String,
    #[schema(value_type = String, example = "Out for Delivery")]
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Who placed the order; only in the staff listing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<ContactResponse>,
}

impl From<ManagedOrder> for OrderResponse {
    fn from(order: ManagedOrder) -> Self {
        Self {
            customer: order.customer.map(Into::into),
            ..Self::from(order.details)
        }
    }
}

impl From<OrderDetails> for OrderResponse {
    fn from(details: OrderDetails) -> Self {
        let order = details.order;
        Self {
            id: order.id,
            user_id: order.user_id,
            restaurant_id: order.restaurant_id,
            items: details
                .items
                .into_iter()
                .map(OrderItemResponse::from)
                .collect(),
            total_amount: order.total_amount.to_string(),
            delivery_address: order.delivery_address,
            payment_method: order.payment_method,
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
            customer: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Error message
    pub message: String,
}
