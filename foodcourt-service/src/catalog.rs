use std::sync::Arc;

use bigdecimal::BigDecimal;
use tracing::info;
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::Error;
use crate::models::{self, Contact, MenuItem, Restaurant, Role};
use crate::store::{contact_index, Store};

#[derive(Debug, Clone)]
pub struct NewRestaurant {
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub image: Option<String>,
}

/// Partial update; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct RestaurantChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMenuItem {
    pub name: String,
    pub price: BigDecimal,
    pub category: String,
    pub is_available: Option<bool>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MenuItemChanges {
    pub name: Option<String>,
    pub price: Option<BigDecimal>,
    pub category: Option<String>,
    pub is_available: Option<bool>,
    pub image: Option<String>,
}

/// A restaurant as listed; admins also get the owner's contact details.
#[derive(Debug, Clone, PartialEq)]
pub struct RestaurantListing {
    pub restaurant: Restaurant,
    pub owner: Option<Contact>,
}

/// Restaurants and their menus.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn create_restaurant(
        &self,
        actor: &Actor,
        payload: NewRestaurant,
    ) -> Result<Restaurant, Error> {
        if actor.role == Role::User {
            return Err(Error::unauthorized("Not authorized as a restaurant"));
        }
        require("name", &payload.name)?;
        require("address", &payload.address)?;

        self.store.run(|repo| {
            if actor.role != Role::Admin && repo.find_restaurant_by_owner(actor.user_id)?.is_some()
            {
                return Err(Error::bad_request(
                    "User already has a restaurant profile",
                ));
            }

            let restaurant = Restaurant {
                id: Uuid::new_v4(),
                owner_id: actor.user_id,
                name: payload.name.clone(),
                description: payload.description.clone(),
                address: payload.address.clone(),
                image: payload.image.clone(),
                is_active: actor.role == Role::Admin,
                is_online: true,
                created_at: models::now(),
            };
            repo.insert_restaurant(&restaurant)?;
            info!(restaurant_id = %restaurant.id, owner_id = %actor.user_id, "restaurant created");
            Ok(restaurant)
        })
    }

    /// Admins see every restaurant; everybody else only approved, online ones.
    pub fn list_restaurants(
        &self,
        actor: Option<&Actor>,
    ) -> Result<Vec<RestaurantListing>, Error> {
        let is_admin = actor.is_some_and(Actor::is_admin);
        self.store.run(|repo| {
            let restaurants = repo.list_restaurants(!is_admin)?;
            let owners = if is_admin {
                let ids: Vec<Uuid> = restaurants.iter().map(|r| r.owner_id).collect();
                contact_index(repo, &ids)?
            } else {
                Default::default()
            };
            Ok(restaurants
                .into_iter()
                .map(|restaurant| RestaurantListing {
                    owner: owners.get(&restaurant.owner_id).cloned(),
                    restaurant,
                })
                .collect())
        })
    }

    pub fn get_restaurant(&self, id: Uuid) -> Result<Restaurant, Error> {
        self.store
            .run(|repo| repo.find_restaurant(id))?
            .ok_or_else(|| Error::not_found("Restaurant not found"))
    }

    pub fn my_restaurant(&self, actor: &Actor) -> Result<Restaurant, Error> {
        self.store
            .run(|repo| repo.find_restaurant_by_owner(actor.user_id))?
            .ok_or_else(|| Error::not_found("No restaurant profile found for this user"))
    }

    pub fn update_restaurant(
        &self,
        actor: &Actor,
        id: Uuid,
        changes: RestaurantChanges,
    ) -> Result<Restaurant, Error> {
        self.store.run(|repo| {
            let mut restaurant = repo
                .find_restaurant(id)?
                .ok_or_else(|| Error::not_found("Restaurant not found"))?;
            ensure_owner_or_admin(actor, &restaurant)?;

            if let Some(name) = non_blank(&changes.name) {
                restaurant.name = name;
            }
            if let Some(description) = non_blank(&changes.description) {
                restaurant.description = Some(description);
            }
            if let Some(address) = non_blank(&changes.address) {
                restaurant.address = address;
            }
            if let Some(image) = non_blank(&changes.image) {
                restaurant.image = Some(image);
            }
            repo.update_restaurant(&restaurant)?;
            Ok(restaurant)
        })
    }

    pub fn approve_restaurant(
        &self,
        actor: &Actor,
        id: Uuid,
        is_active: bool,
    ) -> Result<Restaurant, Error> {
        ensure_admin(actor)?;
        self.store.run(|repo| {
            let mut restaurant = repo
                .find_restaurant(id)?
                .ok_or_else(|| Error::not_found("Restaurant not found"))?;
            restaurant.is_active = is_active;
            repo.update_restaurant(&restaurant)?;
            info!(restaurant_id = %id, is_active, "restaurant approval changed");
            Ok(restaurant)
        })
    }

    pub fn set_online(&self, actor: &Actor, id: Uuid, is_online: bool) -> Result<Restaurant, Error> {
        self.store.run(|repo| {
            let mut restaurant = repo
                .find_restaurant(id)?
                .ok_or_else(|| Error::not_found("Restaurant not found"))?;
            ensure_owner_or_admin(actor, &restaurant)?;
            restaurant.is_online = is_online;
            repo.update_restaurant(&restaurant)?;
            Ok(restaurant)
        })
    }

    pub fn delete_restaurant(&self, actor: &Actor, id: Uuid) -> Result<(), Error> {
        ensure_admin(actor)?;
        let deleted = self.store.run(|repo| repo.delete_restaurant(id))?;
        if !deleted {
            return Err(Error::not_found("Restaurant not found"));
        }
        info!(restaurant_id = %id, "restaurant deleted");
        Ok(())
    }

    pub fn create_menu_item(
        &self,
        actor: &Actor,
        restaurant_id: Uuid,
        payload: NewMenuItem,
    ) -> Result<MenuItem, Error> {
        require("name", &payload.name)?;
        require("category", &payload.category)?;
        ensure_valid_price(&payload.price)?;

        self.store.run(|repo| {
            let restaurant = repo
                .find_restaurant(restaurant_id)?
                .ok_or_else(|| Error::not_found("Restaurant not found"))?;
            ensure_owner_or_admin(actor, &restaurant)?;

            let item = MenuItem {
                id: Uuid::new_v4(),
                restaurant_id,
                name: payload.name.clone(),
                price: payload.price.clone(),
                category: payload.category.clone(),
                image: payload.image.clone(),
                is_available: payload.is_available.unwrap_or(true),
                created_at: models::now(),
            };
            repo.insert_menu_item(&item)?;
            Ok(item)
        })
    }

    pub fn list_menu_items(&self, restaurant_id: Uuid) -> Result<Vec<MenuItem>, Error> {
        self.store.run(|repo| repo.list_menu_items(restaurant_id))
    }

    pub fn update_menu_item(
        &self,
        actor: &Actor,
        id: Uuid,
        changes: MenuItemChanges,
    ) -> Result<MenuItem, Error> {
        if let Some(price) = &changes.price {
            ensure_valid_price(price)?;
        }

        self.store.run(|repo| {
            let mut item = repo
                .find_menu_item(id)?
                .ok_or_else(|| Error::not_found("Food item not found"))?;
            let restaurant = repo
                .find_restaurant(item.restaurant_id)?
                .ok_or_else(|| Error::not_found("Restaurant not found"))?;
            ensure_owner_or_admin(actor, &restaurant)?;

            if let Some(name) = non_blank(&changes.name) {
                item.name = name;
            }
            if let Some(price) = &changes.price {
                item.price = price.clone();
            }
            if let Some(category) = non_blank(&changes.category) {
                item.category = category;
            }
            if let Some(is_available) = changes.is_available {
                item.is_available = is_available;
            }
            if let Some(image) = non_blank(&changes.image) {
                item.image = Some(image);
            }
            repo.update_menu_item(&item)?;
            Ok(item)
        })
    }

    pub fn delete_menu_item(&self, actor: &Actor, id: Uuid) -> Result<(), Error> {
        self.store.run(|repo| {
            let item = repo
                .find_menu_item(id)?
                .ok_or_else(|| Error::not_found("Food item not found"))?;
            let restaurant = repo
                .find_restaurant(item.restaurant_id)?
                .ok_or_else(|| Error::not_found("Restaurant not found"))?;
            ensure_owner_or_admin(actor, &restaurant)?;
            repo.delete_menu_item(id)?;
            Ok(())
        })
    }
}

fn ensure_admin(actor: &Actor) -> Result<(), Error> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(Error::unauthorized("Not authorized as an admin"))
    }
}

fn ensure_owner_or_admin(actor: &Actor, restaurant: &Restaurant) -> Result<(), Error> {
    if actor.is_admin() || restaurant.owner_id == actor.user_id {
        Ok(())
    } else {
        Err(Error::unauthorized("Not authorized"))
    }
}

fn ensure_valid_price(price: &BigDecimal) -> Result<(), Error> {
    if *price < BigDecimal::from(0) {
        return Err(Error::bad_request("Price must not be negative"));
    }
    Ok(())
}

fn require(field: &str, value: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::bad_request(format!("{field} is required")));
    }
    Ok(())
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
