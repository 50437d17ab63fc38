use chrono::{DateTime, Utc};
use diesel::upsert::excluded;
use diesel::{delete, insert_into, prelude::*, update, PgConnection};
use uuid::Uuid;

use crate::error::Error;
use crate::models::{
    Cart, CartItem, MenuItem, Order, OrderDetails, OrderItem, OrderStatus, Restaurant, User,
};
use crate::schema::{cart_items, carts, menu_items, order_items, orders, restaurants, users};
use crate::store::{OrderFilter, Repo, Store};

/// Postgres-backed store. Each transaction runs on its own connection.
pub struct PgStore {
    database_url: String,
}

impl PgStore {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }
}

impl Store for PgStore {
    fn transaction(
        &self,
        f: &mut dyn FnMut(&mut dyn Repo) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let conn = &mut crate::establish_connection(&self.database_url)?;
        conn.transaction::<_, Error, _>(|conn| f(&mut PgRepo { conn }))
    }
}

struct PgRepo<'c> {
    conn: &'c mut PgConnection,
}

impl Repo for PgRepo<'_> {
    fn insert_user(&mut self, user: &User) -> Result<(), Error> {
        insert_into(users::table).values(user).execute(self.conn)?;
        Ok(())
    }

    fn find_user(&mut self, id: Uuid) -> Result<Option<User>, Error> {
        Ok(users::table
            .find(id)
            .select(User::as_select())
            .first(self.conn)
            .optional()?)
    }

    fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, Error> {
        Ok(users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first(self.conn)
            .optional()?)
    }

    fn find_users(&mut self, ids: &[Uuid]) -> Result<Vec<User>, Error> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        Ok(users::table
            .filter(users::id.eq_any(ids.to_vec()))
            .select(User::as_select())
            .load(self.conn)?)
    }

    fn insert_restaurant(&mut self, restaurant: &Restaurant) -> Result<(), Error> {
        insert_into(restaurants::table)
            .values(restaurant)
            .execute(self.conn)?;
        Ok(())
    }

    fn update_restaurant(&mut self, restaurant: &Restaurant) -> Result<(), Error> {
        update(restaurants::table.find(restaurant.id))
            .set(restaurant)
            .execute(self.conn)?;
        Ok(())
    }

    fn delete_restaurant(&mut self, id: Uuid) -> Result<bool, Error> {
        delete(menu_items::table.filter(menu_items::restaurant_id.eq(id))).execute(self.conn)?;
        let deleted = delete(restaurants::table.find(id)).execute(self.conn)?;
        Ok(deleted > 0)
    }

    fn find_restaurant(&mut self, id: Uuid) -> Result<Option<Restaurant>, Error> {
        Ok(restaurants::table
            .find(id)
            .select(Restaurant::as_select())
            .first(self.conn)
            .optional()?)
    }

    fn find_restaurant_by_owner(&mut self, owner_id: Uuid) -> Result<Option<Restaurant>, Error> {
        Ok(restaurants::table
            .filter(restaurants::owner_id.eq(owner_id))
            .order(restaurants::created_at.asc())
            .select(Restaurant::as_select())
            .first(self.conn)
            .optional()?)
    }

    fn list_restaurants(&mut self, visible_only: bool) -> Result<Vec<Restaurant>, Error> {
        let mut query = restaurants::table
            .select(Restaurant::as_select())
            .into_boxed();
        if visible_only {
            query = query.filter(
                restaurants::is_active
                    .eq(true)
                    .and(restaurants::is_online.eq(true)),
            );
        }
        Ok(query
            .order((restaurants::created_at.asc(), restaurants::id.asc()))
            .load(self.conn)?)
    }

    fn insert_menu_item(&mut self, item: &MenuItem) -> Result<(), Error> {
        insert_into(menu_items::table)
            .values(item)
            .execute(self.conn)?;
        Ok(())
    }

    fn update_menu_item(&mut self, item: &MenuItem) -> Result<(), Error> {
        update(menu_items::table.find(item.id))
            .set(item)
            .execute(self.conn)?;
        Ok(())
    }

    fn delete_menu_item(&mut self, id: Uuid) -> Result<bool, Error> {
        let deleted = delete(menu_items::table.find(id)).execute(self.conn)?;
        Ok(deleted > 0)
    }

    fn find_menu_item(&mut self, id: Uuid) -> Result<Option<MenuItem>, Error> {
        Ok(menu_items::table
            .find(id)
            .select(MenuItem::as_select())
            .first(self.conn)
            .optional()?)
    }

    fn find_menu_items(&mut self, ids: &[Uuid]) -> Result<Vec<MenuItem>, Error> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        Ok(menu_items::table
            .filter(menu_items::id.eq_any(ids.to_vec()))
            .select(MenuItem::as_select())
            .load(self.conn)?)
    }

    fn list_menu_items(&mut self, restaurant_id: Uuid) -> Result<Vec<MenuItem>, Error> {
        Ok(menu_items::table
            .filter(menu_items::restaurant_id.eq(restaurant_id))
            .order((menu_items::created_at.asc(), menu_items::id.asc()))
            .select(MenuItem::as_select())
            .load(self.conn)?)
    }

    fn find_cart(&mut self, user_id: Uuid) -> Result<Option<Cart>, Error> {
        Ok(carts::table
            .find(user_id)
            .select(Cart::as_select())
            .first(self.conn)
            .optional()?)
    }

    fn lock_cart(&mut self, user_id: Uuid) -> Result<Option<Cart>, Error> {
        Ok(carts::table
            .find(user_id)
            .select(Cart::as_select())
            .for_update()
            .first(self.conn)
            .optional()?)
    }

    fn lock_cart_or_insert(&mut self, cart: &Cart) -> Result<Cart, Error> {
        insert_into(carts::table)
            .values(cart)
            .on_conflict_do_nothing()
            .execute(self.conn)?;
        self.lock_cart(cart.user_id)?
            .ok_or_else(|| Error::Internal("cart row vanished after insert".to_string()))
    }

    fn cart_items(&mut self, user_id: Uuid) -> Result<Vec<CartItem>, Error> {
        Ok(cart_items::table
            .filter(cart_items::user_id.eq(user_id))
            .order(cart_items::position.asc())
            .select(CartItem::as_select())
            .load(self.conn)?)
    }

    fn save_cart(&mut self, cart: &Cart, items: &[CartItem]) -> Result<(), Error> {
        insert_into(carts::table)
            .values(cart)
            .on_conflict(carts::user_id)
            .do_update()
            .set((
                carts::total_amount.eq(excluded(carts::total_amount)),
                carts::updated_at.eq(excluded(carts::updated_at)),
            ))
            .execute(self.conn)?;
        delete(cart_items::table.filter(cart_items::user_id.eq(cart.user_id)))
            .execute(self.conn)?;
        if !items.is_empty() {
            insert_into(cart_items::table)
                .values(items)
                .execute(self.conn)?;
        }
        Ok(())
    }

    fn delete_cart(&mut self, user_id: Uuid) -> Result<bool, Error> {
        delete(cart_items::table.filter(cart_items::user_id.eq(user_id))).execute(self.conn)?;
        let deleted = delete(carts::table.find(user_id)).execute(self.conn)?;
        Ok(deleted > 0)
    }

    fn insert_order(&mut self, order: &Order, items: &[OrderItem]) -> Result<(), Error> {
        insert_into(orders::table).values(order).execute(self.conn)?;
        if !items.is_empty() {
            insert_into(order_items::table)
                .values(items)
                .execute(self.conn)?;
        }
        Ok(())
    }

    fn find_order(&mut self, id: Uuid) -> Result<Option<OrderDetails>, Error> {
        let Some(order) = orders::table
            .find(id)
            .select(Order::as_select())
            .first::<Order>(self.conn)
            .optional()?
        else {
            return Ok(None);
        };
        let items = OrderItem::belonging_to(&order)
            .order(order_items::position.asc())
            .select(OrderItem::as_select())
            .load(self.conn)?;
        Ok(Some(OrderDetails { order, items }))
    }

    fn lock_order(&mut self, id: Uuid) -> Result<Option<Order>, Error> {
        Ok(orders::table
            .find(id)
            .select(Order::as_select())
            .for_update()
            .first(self.conn)
            .optional()?)
    }

    fn list_orders(&mut self, filter: OrderFilter) -> Result<Vec<OrderDetails>, Error> {
        let mut query = orders::table.select(Order::as_select()).into_boxed();
        match filter {
            OrderFilter::All => {}
            OrderFilter::User(user_id) => query = query.filter(orders::user_id.eq(user_id)),
            OrderFilter::Restaurant(restaurant_id) => {
                query = query.filter(orders::restaurant_id.eq(restaurant_id))
            }
        }
        let results: Vec<Order> = query
            .order((orders::created_at.desc(), orders::id.asc()))
            .load(self.conn)?;

        let items = OrderItem::belonging_to(&results)
            .order(order_items::position.asc())
            .select(OrderItem::as_select())
            .load::<OrderItem>(self.conn)?
            .grouped_by(&results);

        Ok(results
            .into_iter()
            .zip(items)
            .map(|(order, items)| OrderDetails { order, items })
            .collect())
    }

    fn update_order_status(
        &mut self,
        id: Uuid,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        update(orders::table.find(id))
            .set((
                orders::status.eq(status),
                orders::updated_at.eq(updated_at),
            ))
            .execute(self.conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier, Once};
    use std::thread;

    use chrono::TimeDelta;

    use super::*;
    use crate::cart::CartService;
    use crate::models::{self, Role};
    use crate::order::{CheckoutDetails, OrderService, StatusPolicy};
    use crate::test_support::{insert_menu_item, insert_restaurant, insert_user, money};

    static MIGRATIONS: Once = Once::new();

    // Runs against the database named by DATABASE_URL; skipped when unset.
    // Every test works on freshly generated ids, so they can share a database.
    fn test_store() -> Option<Arc<dyn Store>> {
        dotenvy::dotenv().ok();
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL is not set, skipping Postgres test");
            return None;
        };
        MIGRATIONS.call_once(|| {
            crate::run_migrations(&database_url).unwrap();
        });
        Some(Arc::new(PgStore::new(database_url)))
    }

    fn order(user_id: Uuid, restaurant_id: Uuid, minutes_ago: i64) -> (Order, Vec<OrderItem>) {
        let created_at = models::now() - TimeDelta::minutes(minutes_ago);
        let order = Order {
            id: Uuid::new_v4(),
            user_id,
            restaurant_id,
            total_amount: money("21.50"),
            delivery_address: "7 Harbour Road".to_string(),
            payment_method: "COD".to_string(),
            status: OrderStatus::Pending,
            created_at,
            updated_at: created_at,
        };
        let items = (0..2)
            .map(|position| OrderItem {
                id: Uuid::new_v4(),
                order_id: order.id,
                position,
                menu_item_id: Uuid::new_v4(),
                name: format!("Dish {position}"),
                price: money("10.75"),
                quantity: 1,
                image: None,
            })
            .collect();
        (order, items)
    }

    #[test]
    fn test_cart_upsert_reload_and_delete() {
        let Some(store) = test_store() else { return };
        let customer = insert_user(&store, Role::User);
        let owner = insert_user(&store, Role::Restaurant);
        let restaurant = insert_restaurant(&store, owner.user_id);
        let soup = insert_menu_item(&store, restaurant.id, "Soup", "6.50");
        let bread = insert_menu_item(&store, restaurant.id, "Bread", "2.25");

        let line = |menu_item_id, quantity, position| CartItem {
            user_id: customer.user_id,
            menu_item_id,
            quantity,
            position,
        };
        let mut cart = Cart::new(customer.user_id);
        cart.total_amount = money("15.25");
        let lines = vec![line(soup.id, 2, 0), line(bread.id, 1, 1)];
        store.run(|repo| repo.save_cart(&cart, &lines)).unwrap();

        let (stored, stored_lines) = store
            .run(|repo| {
                let cart = repo.find_cart(customer.user_id)?;
                Ok((cart, repo.cart_items(customer.user_id)?))
            })
            .unwrap();
        assert_eq!(stored, Some(cart.clone()));
        assert_eq!(stored_lines, lines);

        cart.total_amount = money("2.25");
        cart.updated_at = models::now();
        let remaining = vec![line(bread.id, 1, 1)];
        store.run(|repo| repo.save_cart(&cart, &remaining)).unwrap();
        let (stored, stored_lines) = store
            .run(|repo| {
                let cart = repo.lock_cart(customer.user_id)?;
                Ok((cart, repo.cart_items(customer.user_id)?))
            })
            .unwrap();
        assert_eq!(stored, Some(cart));
        assert_eq!(stored_lines, remaining);

        assert!(store.run(|repo| repo.delete_cart(customer.user_id)).unwrap());
        assert!(!store.run(|repo| repo.delete_cart(customer.user_id)).unwrap());
        assert_eq!(store.run(|repo| repo.find_cart(customer.user_id)).unwrap(), None);
        assert!(store
            .run(|repo| repo.cart_items(customer.user_id))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_lock_cart_or_insert_keeps_existing_cart() {
        let Some(store) = test_store() else { return };
        let customer = insert_user(&store, Role::User);

        let created = store
            .run(|repo| repo.lock_cart_or_insert(&Cart::new(customer.user_id)))
            .unwrap();
        assert_eq!(created.total_amount, money("0"));

        let mut priced = created.clone();
        priced.total_amount = money("4");
        store.run(|repo| repo.save_cart(&priced, &[])).unwrap();

        let locked = store
            .run(|repo| repo.lock_cart_or_insert(&Cart::new(customer.user_id)))
            .unwrap();
        assert_eq!(locked, priced);
    }

    #[test]
    fn test_checkout_persists_snapshot_and_clears_cart() {
        let Some(store) = test_store() else { return };
        let carts = CartService::new(store.clone());
        let orders = OrderService::new(store.clone(), StatusPolicy::Strict);
        let customer = insert_user(&store, Role::User);
        let owner = insert_user(&store, Role::Restaurant);
        let restaurant = insert_restaurant(&store, owner.user_id);
        let a = insert_menu_item(&store, restaurant.id, "A", "100");
        let b = insert_menu_item(&store, restaurant.id, "B", "50");
        carts.add_item(customer.user_id, a.id, 2).unwrap();
        carts.add_item(customer.user_id, b.id, 1).unwrap();

        let placed = orders
            .create_order(
                customer.user_id,
                CheckoutDetails {
                    delivery_address: "42 Elm Road".to_string(),
                    payment_method: None,
                },
            )
            .unwrap();
        assert_eq!(placed.order.total_amount, money("250"));

        let stored = store.run(|repo| repo.find_order(placed.order.id)).unwrap();
        assert_eq!(stored, Some(placed.clone()));
        assert_eq!(orders.user_orders(customer.user_id).unwrap(), vec![placed]);

        assert_eq!(store.run(|repo| repo.find_cart(customer.user_id)).unwrap(), None);
        assert!(carts.get_cart(customer.user_id).unwrap().is_empty());
    }

    #[test]
    fn test_orders_list_newest_first_with_their_items() {
        let Some(store) = test_store() else { return };
        let customer = insert_user(&store, Role::User);
        let restaurant_id = Uuid::new_v4();
        let (older, older_items) = order(customer.user_id, restaurant_id, 30);
        let (newer, newer_items) = order(customer.user_id, restaurant_id, 5);
        let (elsewhere, elsewhere_items) = order(customer.user_id, Uuid::new_v4(), 1);
        store
            .run(|repo| {
                repo.insert_order(&older, &older_items)?;
                repo.insert_order(&newer, &newer_items)?;
                repo.insert_order(&elsewhere, &elsewhere_items)
            })
            .unwrap();

        let listed = store
            .run(|repo| repo.list_orders(OrderFilter::Restaurant(restaurant_id)))
            .unwrap();
        assert_eq!(
            listed,
            vec![
                OrderDetails {
                    order: newer,
                    items: newer_items,
                },
                OrderDetails {
                    order: older,
                    items: older_items,
                },
            ]
        );

        let mine = store
            .run(|repo| repo.list_orders(OrderFilter::User(customer.user_id)))
            .unwrap();
        assert_eq!(mine.len(), 3);
        assert_eq!(mine[0].order.id, elsewhere.id);
    }

    #[test]
    fn test_every_status_survives_a_round_trip() {
        let Some(store) = test_store() else { return };
        let customer = insert_user(&store, Role::User);
        let (placed, items) = order(customer.user_id, Uuid::new_v4(), 0);
        store.run(|repo| repo.insert_order(&placed, &items)).unwrap();

        for status in [
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Pending,
        ] {
            let updated_at = models::now();
            let locked = store
                .run(|repo| {
                    repo.update_order_status(placed.id, status, updated_at)?;
                    repo.lock_order(placed.id)
                })
                .unwrap()
                .unwrap();
            assert_eq!(locked.status, status);
            assert_eq!(locked.updated_at, updated_at);
        }
    }

    #[test]
    fn test_find_users_and_roles() {
        let Some(store) = test_store() else { return };
        let admin = insert_user(&store, Role::Admin);
        let owner = insert_user(&store, Role::Restaurant);

        let mut found = store
            .run(|repo| repo.find_users(&[admin.user_id, owner.user_id, Uuid::new_v4()]))
            .unwrap();
        found.sort_by_key(|user| user.role == Role::Restaurant);
        assert_eq!(found.len(), 2);
        assert_eq!((found[0].id, found[0].role), (admin.user_id, Role::Admin));
        assert_eq!((found[1].id, found[1].role), (owner.user_id, Role::Restaurant));
    }

    #[test]
    fn test_concurrent_first_adds_keep_every_line() {
        let Some(store) = test_store() else { return };
        let carts = CartService::new(store.clone());
        let customer = insert_user(&store, Role::User);
        let owner = insert_user(&store, Role::Restaurant);
        let restaurant = insert_restaurant(&store, owner.user_id);
        let items: Vec<Uuid> = (0..8)
            .map(|i| insert_menu_item(&store, restaurant.id, &format!("Dish {i}"), "10").id)
            .collect();

        let barrier = Arc::new(Barrier::new(items.len()));
        let handles: Vec<_> = items
            .iter()
            .map(|&item_id| {
                let carts = carts.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    carts.add_item(customer.user_id, item_id, 1)
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let cart = carts.get_cart(customer.user_id).unwrap();
        assert_eq!(cart.lines.len(), items.len());
        assert_eq!(cart.total_amount, money("80"));
        let mut added: Vec<Uuid> = cart.lines.iter().map(|l| l.menu_item_id).collect();
        added.sort();
        let mut expected = items.clone();
        expected.sort();
        assert_eq!(added, expected);
    }
}
