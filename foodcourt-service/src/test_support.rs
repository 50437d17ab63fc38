use std::str::FromStr;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::Utc;
use uuid::Uuid;

use crate::auth::Actor;
use crate::catalog::NewMenuItem;
use crate::models::{MenuItem, Restaurant, Role, User};
use crate::store::Store;

pub fn money(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

/// Inserts a user directly, skipping password hashing.
pub fn insert_user(store: &Arc<dyn Store>, role: Role) -> Actor {
    let id = Uuid::new_v4();
    let user = User {
        id,
        name: format!("{role:?} {id}"),
        email: format!("{id}@example.com"),
        password_hash: "not-a-hash".to_string(),
        role,
        created_at: Utc::now(),
    };
    store.run(|repo| repo.insert_user(&user)).unwrap();
    Actor::from(&user)
}

/// Inserts an approved, online restaurant.
pub fn insert_restaurant(store: &Arc<dyn Store>, owner_id: Uuid) -> Restaurant {
    let restaurant = Restaurant {
        id: Uuid::new_v4(),
        owner_id,
        name: "Test Kitchen".to_string(),
        description: None,
        address: "1 Main Street".to_string(),
        image: None,
        is_active: true,
        is_online: true,
        created_at: Utc::now(),
    };
    store
        .run(|repo| repo.insert_restaurant(&restaurant))
        .unwrap();
    restaurant
}

pub fn insert_menu_item(
    store: &Arc<dyn Store>,
    restaurant_id: Uuid,
    name: &str,
    price: &str,
) -> MenuItem {
    let item = MenuItem {
        id: Uuid::new_v4(),
        restaurant_id,
        name: name.to_string(),
        price: money(price),
        category: "Mains".to_string(),
        image: Some(format!("{}.jpg", name.to_lowercase())),
        is_available: true,
        created_at: Utc::now(),
    };
    store.run(|repo| repo.insert_menu_item(&item)).unwrap();
    item
}

pub fn menu_payload(name: &str, price: &str) -> NewMenuItem {
    NewMenuItem {
        name: name.to_string(),
        price: money(price),
        category: "Mains".to_string(),
        is_available: None,
        image: None,
    }
}
