use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::auth::Actor;
use crate::cart::menu_index;
use crate::error::Error;
use crate::models::{self, Contact, Order, OrderDetails, OrderItem, OrderStatus, Role};
use crate::store::{contact_index, OrderFilter, Store};

pub const DEFAULT_PAYMENT_METHOD: &str = "COD";

/// How status updates are checked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Forward through the lifecycle, or cancel while still open.
    #[default]
    Strict,
    /// Any status may follow any other.
    Permissive,
}

impl FromStr for StatusPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(StatusPolicy::Strict),
            "permissive" => Ok(StatusPolicy::Permissive),
            other => Err(format!(
                "unknown order status policy `{other}`, expected `strict` or `permissive`"
            )),
        }
    }
}

impl fmt::Display for StatusPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusPolicy::Strict => f.write_str("strict"),
            StatusPolicy::Permissive => f.write_str("permissive"),
        }
    }
}

impl OrderStatus {
    fn step(self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Preparing => Some(1),
            OrderStatus::Ready => Some(2),
            OrderStatus::OutForDelivery => Some(3),
            OrderStatus::Delivered => Some(4),
            OrderStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Staying put is always allowed. Otherwise an open order may move to any
    /// later step, or be cancelled.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match (self.step(), next.step()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => false,
        }
    }
}

pub fn validate_transition(
    policy: StatusPolicy,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<(), Error> {
    match policy {
        StatusPolicy::Permissive => Ok(()),
        StatusPolicy::Strict if from.can_transition_to(to) => Ok(()),
        StatusPolicy::Strict => Err(Error::InvalidTransition { from, to }),
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutDetails {
    pub delivery_address: String,
    pub payment_method: Option<String>,
}

/// An order as seen by staff, with the contact details of who placed it.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedOrder {
    pub details: OrderDetails,
    pub customer: Option<Contact>,
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    policy: StatusPolicy,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, policy: StatusPolicy) -> Self {
        Self { store, policy }
    }

    /// Turns the caller's cart into an order and deletes the cart, in one
    /// transaction.
    pub fn create_order(
        &self,
        user_id: Uuid,
        checkout: CheckoutDetails,
    ) -> Result<OrderDetails, Error> {
        let delivery_address = checkout.delivery_address.trim().to_string();
        if delivery_address.is_empty() {
            return Err(Error::bad_request("deliveryAddress is required"));
        }
        let payment_method = checkout
            .payment_method
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string());

        let details = self.store.run(|repo| {
            let Some(cart) = repo.lock_cart(user_id)? else {
                return Err(Error::bad_request("No order items"));
            };
            let lines = repo.cart_items(user_id)?;
            if lines.is_empty() {
                return Err(Error::bad_request("No order items"));
            }

            let menu = menu_index(repo, &lines)?;
            let resolved = lines
                .iter()
                .map(|line| menu.get(&line.menu_item_id).map(|item| (line, item)))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| Error::bad_request("Invalid items in cart"))?;
            let restaurant_id = resolved[0].1.restaurant_id;

            let now = models::now();
            let order = Order {
                id: Uuid::new_v4(),
                user_id,
                restaurant_id,
                total_amount: cart.total_amount.clone(),
                delivery_address: delivery_address.clone(),
                payment_method: payment_method.clone(),
                status: OrderStatus::Pending,
                created_at: now,
                updated_at: now,
            };
            let items: Vec<OrderItem> = resolved
                .iter()
                .enumerate()
                .map(|(position, (line, item))| OrderItem {
                    id: Uuid::new_v4(),
                    order_id: order.id,
                    position: position as i32,
                    menu_item_id: item.id,
                    name: item.name.clone(),
                    price: item.price.clone(),
                    quantity: line.quantity,
                    image: item.image.clone(),
                })
                .collect();

            repo.insert_order(&order, &items)?;
            repo.delete_cart(user_id)?;
            Ok(OrderDetails { order, items })
        })?;

        info!(
            order_id = %details.order.id,
            user_id = %user_id,
            restaurant_id = %details.order.restaurant_id,
            total_amount = %details.order.total_amount,
            "order created"
        );
        Ok(details)
    }

    pub fn user_orders(&self, user_id: Uuid) -> Result<Vec<OrderDetails>, Error> {
        self.store
            .run(|repo| repo.list_orders(OrderFilter::User(user_id)))
    }

    /// Admins see every order, restaurant owners the orders of their own
    /// restaurant.
    pub fn orders_for_actor(&self, actor: &Actor) -> Result<Vec<ManagedOrder>, Error> {
        self.store.run(|repo| {
            let orders = match actor.role {
                Role::Admin => repo.list_orders(OrderFilter::All)?,
                Role::Restaurant => {
                    let restaurant = repo
                        .find_restaurant_by_owner(actor.user_id)?
                        .ok_or_else(|| Error::not_found("Restaurant profile not found"))?;
                    repo.list_orders(OrderFilter::Restaurant(restaurant.id))?
                }
                Role::User => {
                    return Err(Error::unauthorized("Not authorized to view all orders"));
                }
            };

            let ids: Vec<Uuid> = orders.iter().map(|d| d.order.user_id).collect();
            let customers = contact_index(repo, &ids)?;
            Ok(orders
                .into_iter()
                .map(|details| ManagedOrder {
                    customer: customers.get(&details.order.user_id).cloned(),
                    details,
                })
                .collect())
        })
    }

    pub fn update_status(
        &self,
        actor: &Actor,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<OrderDetails, Error> {
        let policy = self.policy;
        let (previous, details) = self.store.run(|repo| {
            let order = repo
                .lock_order(order_id)?
                .ok_or_else(|| Error::not_found("Order not found"))?;

            match actor.role {
                Role::Admin => {}
                Role::Restaurant => {
                    let owns = repo
                        .find_restaurant_by_owner(actor.user_id)?
                        .is_some_and(|r| r.id == order.restaurant_id);
                    if !owns {
                        return Err(Error::unauthorized("Not authorized to update this order"));
                    }
                }
                Role::User => {
                    return Err(Error::unauthorized("Not authorized to update orders"));
                }
            }

            validate_transition(policy, order.status, status)?;
            if order.status != status {
                repo.update_order_status(order_id, status, models::now())?;
            }
            let details = repo
                .find_order(order_id)?
                .ok_or_else(|| Error::not_found("Order not found"))?;
            Ok((order.status, details))
        })?;

        if previous != status {
            info!(%order_id, from = %previous, to = %status, "order status changed");
        }
        Ok(details)
    }
}
