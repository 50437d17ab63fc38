use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Error;
use crate::models::{
    Cart, CartItem, Contact, MenuItem, Order, OrderDetails, OrderItem, OrderStatus, Restaurant,
    User,
};

pub mod memory;
pub mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderFilter {
    All,
    User(Uuid),
    Restaurant(Uuid),
}

/// Record access available inside one transaction.
///
/// Every `lock_*` method takes a row lock that is held until the transaction
/// ends, so read-modify-write sequences on carts and orders are serialized per
/// row.
pub trait Repo {
    fn insert_user(&mut self, user: &User) -> Result<(), Error>;
    fn find_user(&mut self, id: Uuid) -> Result<Option<User>, Error>;
    fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, Error>;
    fn find_users(&mut self, ids: &[Uuid]) -> Result<Vec<User>, Error>;

    fn insert_restaurant(&mut self, restaurant: &Restaurant) -> Result<(), Error>;
    fn update_restaurant(&mut self, restaurant: &Restaurant) -> Result<(), Error>;
    /// Deletes the restaurant and its menu. Returns false if nothing was deleted.
    fn delete_restaurant(&mut self, id: Uuid) -> Result<bool, Error>;
    fn find_restaurant(&mut self, id: Uuid) -> Result<Option<Restaurant>, Error>;
    fn find_restaurant_by_owner(&mut self, owner_id: Uuid) -> Result<Option<Restaurant>, Error>;
    /// Oldest first.
    fn list_restaurants(&mut self, visible_only: bool) -> Result<Vec<Restaurant>, Error>;

    fn insert_menu_item(&mut self, item: &MenuItem) -> Result<(), Error>;
    fn update_menu_item(&mut self, item: &MenuItem) -> Result<(), Error>;
    fn delete_menu_item(&mut self, id: Uuid) -> Result<bool, Error>;
    fn find_menu_item(&mut self, id: Uuid) -> Result<Option<MenuItem>, Error>;
    fn find_menu_items(&mut self, ids: &[Uuid]) -> Result<Vec<MenuItem>, Error>;
    fn list_menu_items(&mut self, restaurant_id: Uuid) -> Result<Vec<MenuItem>, Error>;

    fn find_cart(&mut self, user_id: Uuid) -> Result<Option<Cart>, Error>;
    fn lock_cart(&mut self, user_id: Uuid) -> Result<Option<Cart>, Error>;
    /// Inserts `cart` unless its user already has one, then locks and returns
    /// the stored row. A user's first add to cart has nothing to lock otherwise.
    fn lock_cart_or_insert(&mut self, cart: &Cart) -> Result<Cart, Error>;
    /// Lines in insertion order.
    fn cart_items(&mut self, user_id: Uuid) -> Result<Vec<CartItem>, Error>;
    /// Upserts the cart row and replaces all of its lines.
    fn save_cart(&mut self, cart: &Cart, items: &[CartItem]) -> Result<(), Error>;
    fn delete_cart(&mut self, user_id: Uuid) -> Result<bool, Error>;

    fn insert_order(&mut self, order: &Order, items: &[OrderItem]) -> Result<(), Error>;
    fn find_order(&mut self, id: Uuid) -> Result<Option<OrderDetails>, Error>;
    fn lock_order(&mut self, id: Uuid) -> Result<Option<Order>, Error>;
    /// Newest first.
    fn list_orders(&mut self, filter: OrderFilter) -> Result<Vec<OrderDetails>, Error>;
    fn update_order_status(
        &mut self,
        id: Uuid,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), Error>;
}

/// Contact details of the given users, keyed by id. Unknown ids are skipped.
pub fn contact_index(repo: &mut dyn Repo, ids: &[Uuid]) -> Result<HashMap<Uuid, Contact>, Error> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    Ok(repo
        .find_users(&ids)?
        .iter()
        .map(|user| (user.id, Contact::from(user)))
        .collect())
}

/// A transactional record store.
///
/// `transaction` commits only when the callback returns `Ok`; any error rolls
/// back every write made through the `Repo`.
pub trait Store: Send + Sync {
    fn transaction(
        &self,
        f: &mut dyn FnMut(&mut dyn Repo) -> Result<(), Error>,
    ) -> Result<(), Error>;
}

impl dyn Store {
    pub fn run<T, F>(&self, mut f: F) -> Result<T, Error>
    where
        F: FnMut(&mut dyn Repo) -> Result<T, Error>,
    {
        let mut output = None;
        self.transaction(&mut |repo: &mut dyn Repo| {
            output = Some(f(repo)?);
            Ok(())
        })?;
        output.ok_or_else(|| Error::Internal("transaction produced no result".to_string()))
    }
}
