use std::collections::HashMap;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::error::Error;
use crate::models::{self, Cart, CartItem, MenuItem};
use crate::pricing;
use crate::store::{Repo, Store};

/// A cart line with its menu item resolved. `menu_item` is `None` when the
/// item was deleted after it was added.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub menu_item_id: Uuid,
    pub quantity: i32,
    pub menu_item: Option<MenuItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CartView {
    pub user_id: Uuid,
    pub lines: Vec<CartLine>,
    pub total_amount: BigDecimal,
}

impl CartView {
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            lines: vec![],
            total_amount: BigDecimal::from(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn Store>,
}

impl CartService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn add_item(
        &self,
        user_id: Uuid,
        menu_item_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, Error> {
        if quantity < 1 {
            return Err(Error::bad_request("Quantity must be at least 1"));
        }

        self.store.run(|repo| {
            let item = repo
                .find_menu_item(menu_item_id)?
                .ok_or_else(|| Error::not_found("Food item not found"))?;

            let mut cart = repo.lock_cart_or_insert(&Cart::new(user_id))?;
            let mut lines = repo.cart_items(user_id)?;

            let menu = menu_index(repo, &lines)?;
            let other_restaurant = lines
                .iter()
                .filter_map(|line| menu.get(&line.menu_item_id))
                .any(|existing| existing.restaurant_id != item.restaurant_id);
            if other_restaurant {
                return Err(Error::bad_request(
                    "Cart already contains items from another restaurant",
                ));
            }

            match lines.iter_mut().find(|line| line.menu_item_id == menu_item_id) {
                Some(line) => {
                    line.quantity = line
                        .quantity
                        .checked_add(quantity)
                        .ok_or_else(|| Error::bad_request("Quantity is too large"))?;
                }
                None => {
                    let position = lines.iter().map(|l| l.position + 1).max().unwrap_or(0);
                    lines.push(CartItem {
                        user_id,
                        menu_item_id,
                        quantity,
                        position,
                    });
                }
            }

            save(repo, &mut cart, &lines)
        })
    }

    pub fn get_cart(&self, user_id: Uuid) -> Result<CartView, Error> {
        self.store.run(|repo| {
            let Some(cart) = repo.find_cart(user_id)? else {
                return Ok(CartView::empty(user_id));
            };
            let lines = repo.cart_items(user_id)?;
            let menu = menu_index(repo, &lines)?;
            Ok(resolve(&cart, &lines, &menu))
        })
    }

    pub fn remove_item(&self, user_id: Uuid, menu_item_id: Uuid) -> Result<CartView, Error> {
        self.store.run(|repo| {
            let mut cart = repo
                .lock_cart(user_id)?
                .ok_or_else(|| Error::not_found("Cart not found"))?;
            let mut lines = repo.cart_items(user_id)?;
            lines.retain(|line| line.menu_item_id != menu_item_id);
            save(repo, &mut cart, &lines)
        })
    }
}

/// Looks up the current menu item of every line, keyed by id.
pub(crate) fn menu_index(
    repo: &mut dyn Repo,
    lines: &[CartItem],
) -> Result<HashMap<Uuid, MenuItem>, Error> {
    let ids: Vec<Uuid> = lines.iter().map(|line| line.menu_item_id).collect();
    Ok(repo
        .find_menu_items(&ids)?
        .into_iter()
        .map(|item| (item.id, item))
        .collect())
}

/// Reprices every line at the current menu price and persists the cart.
fn save(repo: &mut dyn Repo, cart: &mut Cart, lines: &[CartItem]) -> Result<CartView, Error> {
    let menu = menu_index(repo, lines)?;
    cart.total_amount = pricing::total(
        lines
            .iter()
            .filter_map(|line| menu.get(&line.menu_item_id).map(|m| (&m.price, line.quantity))),
    );
    cart.updated_at = models::now();
    repo.save_cart(cart, lines)?;
    Ok(resolve(cart, lines, &menu))
}

fn resolve(cart: &Cart, lines: &[CartItem], menu: &HashMap<Uuid, MenuItem>) -> CartView {
    CartView {
        user_id: cart.user_id,
        lines: lines
            .iter()
            .map(|line| CartLine {
                menu_item_id: line.menu_item_id,
                quantity: line.quantity,
                menu_item: menu.get(&line.menu_item_id).cloned(),
            })
            .collect(),
        total_amount: cart.total_amount.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogService, MenuItemChanges};
    use crate::models::Role;
    use crate::store::MemoryStore;
    use crate::test_support::{insert_menu_item, insert_restaurant, insert_user, money};

    struct Fixture {
        store: Arc<dyn Store>,
        carts: CartService,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        Fixture {
            carts: CartService::new(store.clone()),
            store,
        }
    }

    #[test]
    fn test_total_follows_add_and_remove() {
        let f = fixture();
        let customer = insert_user(&f.store, Role::User);
        let restaurant = insert_restaurant(&f.store, Uuid::new_v4());
        let a = insert_menu_item(&f.store, restaurant.id, "A", "100");
        let b = insert_menu_item(&f.store, restaurant.id, "B", "50");

        f.carts.add_item(customer.user_id, a.id, 2).unwrap();
        let cart = f.carts.add_item(customer.user_id, b.id, 1).unwrap();
        assert_eq!(cart.total_amount, money("250"));
        assert_eq!(cart.lines.len(), 2);

        let cart = f.carts.remove_item(customer.user_id, a.id).unwrap();
        assert_eq!(cart.total_amount, money("50"));
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].menu_item_id, b.id);
    }

    #[test]
    fn test_adding_same_item_increments_quantity() {
        let f = fixture();
        let customer = insert_user(&f.store, Role::User);
        let restaurant = insert_restaurant(&f.store, Uuid::new_v4());
        let pizza = insert_menu_item(&f.store, restaurant.id, "Pizza", "12.50");

        f.carts.add_item(customer.user_id, pizza.id, 1).unwrap();
        let cart = f.carts.add_item(customer.user_id, pizza.id, 2).unwrap();

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 3);
        assert_eq!(cart.total_amount, money("37.50"));
    }

    #[test]
    fn test_lines_keep_insertion_order() {
        let f = fixture();
        let customer = insert_user(&f.store, Role::User);
        let restaurant = insert_restaurant(&f.store, Uuid::new_v4());
        let first = insert_menu_item(&f.store, restaurant.id, "First", "1");
        let second = insert_menu_item(&f.store, restaurant.id, "Second", "2");

        f.carts.add_item(customer.user_id, first.id, 1).unwrap();
        f.carts.add_item(customer.user_id, second.id, 1).unwrap();
        f.carts.add_item(customer.user_id, first.id, 1).unwrap();

        let cart = f.carts.get_cart(customer.user_id).unwrap();
        let ids: Vec<Uuid> = cart.lines.iter().map(|l| l.menu_item_id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[test]
    fn test_unknown_item_is_not_found() {
        let f = fixture();
        let customer = insert_user(&f.store, Role::User);

        let result = f.carts.add_item(customer.user_id, Uuid::new_v4(), 1);
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(f.carts.get_cart(customer.user_id).unwrap().is_empty());
    }

    #[test]
    fn test_quantity_must_be_positive() {
        let f = fixture();
        let customer = insert_user(&f.store, Role::User);
        let restaurant = insert_restaurant(&f.store, Uuid::new_v4());
        let item = insert_menu_item(&f.store, restaurant.id, "Tea", "3");

        let result = f.carts.add_item(customer.user_id, item.id, 0);
        assert!(matches!(result, Err(Error::BadRequest(_))));
    }

    #[test]
    fn test_missing_cart_reads_as_empty() {
        let f = fixture();
        let cart = f.carts.get_cart(Uuid::new_v4()).unwrap();
        assert!(cart.lines.is_empty());
        assert_eq!(cart.total_amount, BigDecimal::from(0));
    }

    #[test]
    fn test_remove_without_cart_is_not_found() {
        let f = fixture();
        let result = f.carts.remove_item(Uuid::new_v4(), Uuid::new_v4());
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_price_change_reprices_cart_on_next_mutation() {
        let f = fixture();
        let admin = insert_user(&f.store, Role::Admin);
        let customer = insert_user(&f.store, Role::User);
        let restaurant = insert_restaurant(&f.store, Uuid::new_v4());
        let burger = insert_menu_item(&f.store, restaurant.id, "Burger", "10");
        let fries = insert_menu_item(&f.store, restaurant.id, "Fries", "4");

        f.carts.add_item(customer.user_id, burger.id, 2).unwrap();

        CatalogService::new(f.store.clone())
            .update_menu_item(
                &admin,
                burger.id,
                MenuItemChanges {
                    price: Some(money("15")),
                    ..Default::default()
                },
            )
            .unwrap();

        let cart = f.carts.add_item(customer.user_id, fries.id, 1).unwrap();
        assert_eq!(cart.total_amount, money("34"));
    }

    #[test]
    fn test_deleted_item_drops_out_of_total() {
        let f = fixture();
        let admin = insert_user(&f.store, Role::Admin);
        let customer = insert_user(&f.store, Role::User);
        let restaurant = insert_restaurant(&f.store, Uuid::new_v4());
        let soup = insert_menu_item(&f.store, restaurant.id, "Soup", "6");
        let bread = insert_menu_item(&f.store, restaurant.id, "Bread", "2");

        f.carts.add_item(customer.user_id, soup.id, 1).unwrap();
        f.carts.add_item(customer.user_id, bread.id, 1).unwrap();
        CatalogService::new(f.store.clone())
            .delete_menu_item(&admin, soup.id)
            .unwrap();

        let cart = f.carts.get_cart(customer.user_id).unwrap();
        assert_eq!(cart.lines.len(), 2);
        assert!(cart.lines[0].menu_item.is_none());

        let cart = f.carts.add_item(customer.user_id, bread.id, 1).unwrap();
        assert_eq!(cart.total_amount, money("4"));
    }

    #[test]
    fn test_items_from_another_restaurant_are_rejected() {
        let f = fixture();
        let customer = insert_user(&f.store, Role::User);
        let first = insert_restaurant(&f.store, Uuid::new_v4());
        let second = insert_restaurant(&f.store, Uuid::new_v4());
        let noodles = insert_menu_item(&f.store, first.id, "Noodles", "8");
        let tacos = insert_menu_item(&f.store, second.id, "Tacos", "9");

        f.carts.add_item(customer.user_id, noodles.id, 1).unwrap();
        let result = f.carts.add_item(customer.user_id, tacos.id, 1);
        assert!(matches!(result, Err(Error::BadRequest(_))));

        let cart = f.carts.get_cart(customer.user_id).unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.total_amount, money("8"));
    }
}
