use std::fmt;
use std::io::Write;

use bigdecimal::BigDecimal;
use chrono::{DateTime, SubsecRound, Utc};
use diesel::{
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    pg::{Pg, PgValue},
    prelude::*,
    serialize::{self, IsNull, Output, ToSql},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{cart_items, carts, menu_items, order_items, orders, restaurants, users};

/// The current time at the microsecond precision Postgres stores, so a
/// record echoed back right after a write matches what a later read returns.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[derive(
    FromSqlRow, AsExpression, Serialize, Deserialize, PartialEq, Eq, Hash, Copy, Clone, Debug,
)]
#[diesel(sql_type = crate::schema::sql_types::UserRole)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A customer.
    User,
    /// A restaurant owner.
    Restaurant,
    Admin,
}

impl ToSql<crate::schema::sql_types::UserRole, Pg> for Role {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            Role::User => out.write_all(b"USER")?,
            Role::Restaurant => out.write_all(b"RESTAURANT")?,
            Role::Admin => out.write_all(b"ADMIN")?,
        }
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::UserRole, Pg> for Role {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"USER" => Ok(Role::User),
            b"RESTAURANT" => Ok(Role::Restaurant),
            b"ADMIN" => Ok(Role::Admin),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

#[derive(
    FromSqlRow, AsExpression, Serialize, Deserialize, PartialEq, Eq, Hash, Copy, Clone, Debug,
)]
#[diesel(sql_type = crate::schema::sql_types::OrderStatus)]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Preparing => "Preparing",
            OrderStatus::Ready => "Ready",
            OrderStatus::OutForDelivery => "Out for Delivery",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl ToSql<crate::schema::sql_types::OrderStatus, Pg> for OrderStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            OrderStatus::Pending => out.write_all(b"PENDING")?,
            OrderStatus::Preparing => out.write_all(b"PREPARING")?,
            OrderStatus::Ready => out.write_all(b"READY")?,
            OrderStatus::OutForDelivery => out.write_all(b"OUT_FOR_DELIVERY")?,
            OrderStatus::Delivered => out.write_all(b"DELIVERED")?,
            OrderStatus::Cancelled => out.write_all(b"CANCELLED")?,
        }
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::OrderStatus, Pg> for OrderStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"PENDING" => Ok(OrderStatus::Pending),
            b"PREPARING" => Ok(OrderStatus::Preparing),
            b"READY" => Ok(OrderStatus::Ready),
            b"OUT_FOR_DELIVERY" => Ok(OrderStatus::OutForDelivery),
            b"DELIVERED" => Ok(OrderStatus::Delivered),
            b"CANCELLED" => Ok(OrderStatus::Cancelled),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// The public face of a user, attached to orders and restaurants listed for
/// staff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for Contact {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(
    Queryable, Selectable, Identifiable, Insertable, AsChangeset, Clone, Debug, PartialEq,
)]
#[diesel(table_name = restaurants, treat_none_as_null = true)]
pub struct Restaurant {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub image: Option<String>,
    pub is_active: bool,
    pub is_online: bool,
    pub created_at: DateTime<Utc>,
}

impl Restaurant {
    /// Customers only see restaurants that are approved and switched online.
    pub fn is_visible(&self) -> bool {
        self.is_active && self.is_online
    }
}

#[derive(
    Queryable,
    Selectable,
    Identifiable,
    Associations,
    Insertable,
    AsChangeset,
    Clone,
    Debug,
    PartialEq,
)]
#[diesel(belongs_to(Restaurant))]
#[diesel(table_name = menu_items, treat_none_as_null = true)]
pub struct MenuItem {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub category: String,
    pub image: Option<String>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = carts, primary_key(user_id))]
pub struct Cart {
    pub user_id: Uuid,
    pub total_amount: BigDecimal,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            total_amount: BigDecimal::from(0),
            updated_at: now(),
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = cart_items)]
pub struct CartItem {
    pub user_id: Uuid,
    pub menu_item_id: Uuid,
    pub quantity: i32,
    pub position: i32,
}

#[derive(Queryable, Selectable, Identifiable, Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = orders)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub total_amount: BigDecimal,
    pub delivery_address: String,
    pub payment_method: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Queryable, Selectable, Identifiable, Associations, Insertable, Clone, Debug, PartialEq,
)]
#[diesel(belongs_to(Order))]
#[diesel(table_name = order_items)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub menu_item_id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub quantity: i32,
    pub image: Option<String>,
}

/// An order together with its line snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
}
