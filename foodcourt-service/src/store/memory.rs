use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Error;
use crate::models::{
    Cart, CartItem, MenuItem, Order, OrderDetails, OrderItem, OrderStatus, Restaurant, User,
};
use crate::store::{OrderFilter, Repo, Store};

/// In-process store used by tests and local demos.
///
/// Transactions run against a copy of the tables which replaces the
/// committed state only on success, and the mutex serializes them.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn transaction(
        &self,
        f: &mut dyn FnMut(&mut dyn Repo) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let mut committed = self
            .tables
            .lock()
            .map_err(|_| Error::Internal("memory store lock poisoned".to_string()))?;
        let mut working = committed.clone();
        f(&mut working)?;
        *committed = working;
        Ok(())
    }
}

#[derive(Default, Clone)]
struct Tables {
    users: HashMap<Uuid, User>,
    restaurants: HashMap<Uuid, Restaurant>,
    menu_items: HashMap<Uuid, MenuItem>,
    carts: HashMap<Uuid, (Cart, Vec<CartItem>)>,
    orders: HashMap<Uuid, OrderDetails>,
}

impl Repo for Tables {
    fn insert_user(&mut self, user: &User) -> Result<(), Error> {
        if self.users.contains_key(&user.id) || self.users.values().any(|u| u.email == user.email)
        {
            return Err(Error::Conflict("Record already exists".to_string()));
        }
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    fn find_user(&mut self, id: Uuid) -> Result<Option<User>, Error> {
        Ok(self.users.get(&id).cloned())
    }

    fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, Error> {
        Ok(self.users.values().find(|u| u.email == email).cloned())
    }

    fn find_users(&mut self, ids: &[Uuid]) -> Result<Vec<User>, Error> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id))
            .cloned()
            .collect())
    }

    fn insert_restaurant(&mut self, restaurant: &Restaurant) -> Result<(), Error> {
        self.restaurants.insert(restaurant.id, restaurant.clone());
        Ok(())
    }

    fn update_restaurant(&mut self, restaurant: &Restaurant) -> Result<(), Error> {
        if let Some(existing) = self.restaurants.get_mut(&restaurant.id) {
            *existing = restaurant.clone();
        }
        Ok(())
    }

    fn delete_restaurant(&mut self, id: Uuid) -> Result<bool, Error> {
        self.menu_items.retain(|_, item| item.restaurant_id != id);
        Ok(self.restaurants.remove(&id).is_some())
    }

    fn find_restaurant(&mut self, id: Uuid) -> Result<Option<Restaurant>, Error> {
        Ok(self.restaurants.get(&id).cloned())
    }

    fn find_restaurant_by_owner(&mut self, owner_id: Uuid) -> Result<Option<Restaurant>, Error> {
        Ok(self
            .restaurants
            .values()
            .filter(|r| r.owner_id == owner_id)
            .min_by_key(|r| r.created_at)
            .cloned())
    }

    fn list_restaurants(&mut self, visible_only: bool) -> Result<Vec<Restaurant>, Error> {
        let mut results: Vec<Restaurant> = self
            .restaurants
            .values()
            .filter(|r| !visible_only || r.is_visible())
            .cloned()
            .collect();
        results.sort_by_key(|r| (r.created_at, r.id));
        Ok(results)
    }

    fn insert_menu_item(&mut self, item: &MenuItem) -> Result<(), Error> {
        self.menu_items.insert(item.id, item.clone());
        Ok(())
    }

    fn update_menu_item(&mut self, item: &MenuItem) -> Result<(), Error> {
        if let Some(existing) = self.menu_items.get_mut(&item.id) {
            *existing = item.clone();
        }
        Ok(())
    }

    fn delete_menu_item(&mut self, id: Uuid) -> Result<bool, Error> {
        Ok(self.menu_items.remove(&id).is_some())
    }

    fn find_menu_item(&mut self, id: Uuid) -> Result<Option<MenuItem>, Error> {
        Ok(self.menu_items.get(&id).cloned())
    }

    fn find_menu_items(&mut self, ids: &[Uuid]) -> Result<Vec<MenuItem>, Error> {
        Ok(ids
            .iter()
            .filter_map(|id| self.menu_items.get(id))
            .cloned()
            .collect())
    }

    fn list_menu_items(&mut self, restaurant_id: Uuid) -> Result<Vec<MenuItem>, Error> {
        let mut results: Vec<MenuItem> = self
            .menu_items
            .values()
            .filter(|item| item.restaurant_id == restaurant_id)
            .cloned()
            .collect();
        results.sort_by_key(|item| (item.created_at, item.id));
        Ok(results)
    }

    fn find_cart(&mut self, user_id: Uuid) -> Result<Option<Cart>, Error> {
        Ok(self.carts.get(&user_id).map(|(cart, _)| cart.clone()))
    }

    fn lock_cart(&mut self, user_id: Uuid) -> Result<Option<Cart>, Error> {
        self.find_cart(user_id)
    }

    fn lock_cart_or_insert(&mut self, cart: &Cart) -> Result<Cart, Error> {
        let (stored, _) = self
            .carts
            .entry(cart.user_id)
            .or_insert_with(|| (cart.clone(), vec![]));
        Ok(stored.clone())
    }

    fn cart_items(&mut self, user_id: Uuid) -> Result<Vec<CartItem>, Error> {
        let mut items = self
            .carts
            .get(&user_id)
            .map(|(_, items)| items.clone())
            .unwrap_or_default();
        items.sort_by_key(|item| item.position);
        Ok(items)
    }

    fn save_cart(&mut self, cart: &Cart, items: &[CartItem]) -> Result<(), Error> {
        self.carts
            .insert(cart.user_id, (cart.clone(), items.to_vec()));
        Ok(())
    }

    fn delete_cart(&mut self, user_id: Uuid) -> Result<bool, Error> {
        Ok(self.carts.remove(&user_id).is_some())
    }

    fn insert_order(&mut self, order: &Order, items: &[OrderItem]) -> Result<(), Error> {
        if self.orders.contains_key(&order.id) {
            return Err(Error::Conflict("Record already exists".to_string()));
        }
        self.orders.insert(
            order.id,
            OrderDetails {
                order: order.clone(),
                items: items.to_vec(),
            },
        );
        Ok(())
    }

    fn find_order(&mut self, id: Uuid) -> Result<Option<OrderDetails>, Error> {
        Ok(self.orders.get(&id).cloned())
    }

    fn lock_order(&mut self, id: Uuid) -> Result<Option<Order>, Error> {
        Ok(self.orders.get(&id).map(|details| details.order.clone()))
    }

    fn list_orders(&mut self, filter: OrderFilter) -> Result<Vec<OrderDetails>, Error> {
        let mut results: Vec<OrderDetails> = self
            .orders
            .values()
            .filter(|details| match filter {
                OrderFilter::All => true,
                OrderFilter::User(user_id) => details.order.user_id == user_id,
                OrderFilter::Restaurant(restaurant_id) => {
                    details.order.restaurant_id == restaurant_id
                }
            })
            .cloned()
            .collect();
        results.sort_by(|a, b| {
            b.order
                .created_at
                .cmp(&a.order.created_at)
                .then_with(|| a.order.id.cmp(&b.order.id))
        });
        Ok(results)
    }

    fn update_order_status(
        &mut self,
        id: Uuid,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        if let Some(details) = self.orders.get_mut(&id) {
            details.order.status = status;
            details.order.updated_at = updated_at;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: crate::models::Role::User,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let store: Box<dyn Store> = Box::new(MemoryStore::new());
        let alice = user("alice@example.com");

        let result: Result<(), Error> = store.run(|repo| {
            repo.insert_user(&alice)?;
            Err(Error::bad_request("abort"))
        });
        assert!(matches!(result, Err(Error::BadRequest(_))));

        let found = store.run(|repo| repo.find_user(alice.id)).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_duplicate_email_is_conflict() {
        let store: Box<dyn Store> = Box::new(MemoryStore::new());
        store
            .run(|repo| repo.insert_user(&user("bob@example.com")))
            .unwrap();

        let result = store.run(|repo| repo.insert_user(&user("bob@example.com")));
        assert!(matches!(result, Err(Error::Conflict(_))));
    }
}
