use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, PasswordHash};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::Error;
use crate::models::{self, Role, User};
use crate::store::Store;

/// The authenticated caller of an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
        }
    }
}

/// Access token payload. `sub` is the user id.
///
/// `role` is informational for clients deciding which screens to show.
/// Authorization never trusts it: the role is re-read from the store on
/// every request, so a demotion takes effect before the token expires.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    exp: usize,
    iat: usize,
    sub: String,
    role: Role,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

/// A user together with a freshly issued access token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expires: TimeDelta,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, secret_key: &str, access_token_expires: TimeDelta) -> Self {
        Self {
            store,
            encoding_key: EncodingKey::from_secret(secret_key.as_ref()),
            decoding_key: DecodingKey::from_secret(secret_key.as_ref()),
            access_token_expires,
        }
    }

    /// Self-service sign-up. Admin accounts can only be created with
    /// [`create_admin`].
    pub fn register(&self, payload: Registration) -> Result<Session, Error> {
        let role = payload.role.unwrap_or(Role::User);
        if role == Role::Admin {
            return Err(Error::bad_request("Cannot register as an admin"));
        }
        let user = create_user(
            &self.store,
            &payload.name,
            &payload.email,
            &payload.password,
            role,
        )?;
        self.session(user)
    }

    pub fn login(&self, email: &str, password: &str) -> Result<Session, Error> {
        let invalid_credentials = || Error::unauthorized("Invalid email or password");
        let email = normalize_email(email);
        let user = self
            .store
            .run(|repo| repo.find_user_by_email(&email))?
            .ok_or_else(invalid_credentials)?;

        let verified = PasswordHash::new(&user.password_hash)
            .map(|hash| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &hash)
                    .is_ok()
            })
            .unwrap_or(false);
        if !verified {
            return Err(invalid_credentials());
        }
        self.session(user)
    }

    pub fn issue_token(&self, user: &User) -> Result<String, Error> {
        let now = Utc::now();
        let claims = Claims {
            exp: (now + self.access_token_expires).timestamp() as usize,
            iat: now.timestamp() as usize,
            sub: user.id.to_string(),
            role: user.role,
        };
        jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("Cannot issue token: {e}")))
    }

    /// Resolves a bearer token to the user it was issued for. The role is
    /// read from the store, not the token, so role changes apply immediately.
    pub fn authenticate(&self, token: &str) -> Result<User, Error> {
        let token_failed = || Error::unauthorized("Not authorized, token failed");
        let token = jsonwebtoken::decode::<Claims>(
            token,
            &self.decoding_key,
            &jsonwebtoken::Validation::default(),
        )
        .map_err(|_| token_failed())?;
        let user_id = Uuid::parse_str(&token.claims.sub).map_err(|_| token_failed())?;

        self.store
            .run(|repo| repo.find_user(user_id))?
            .ok_or_else(token_failed)
    }

    fn session(&self, user: User) -> Result<Session, Error> {
        let access_token = self.issue_token(&user)?;
        Ok(Session {
            user,
            access_token,
            expires_in: self.access_token_expires.num_seconds(),
        })
    }
}

/// Creates an administrator account. Used by the `create-admin` command.
pub fn create_admin(
    store: &Arc<dyn Store>,
    name: &str,
    email: &str,
    password: &str,
) -> Result<User, Error> {
    create_user(store, name, email, password, Role::Admin)
}

fn create_user(
    store: &Arc<dyn Store>,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<User, Error> {
    let email = normalize_email(email);
    if name.trim().is_empty() {
        return Err(Error::bad_request("name is required"));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(Error::bad_request("A valid email is required"));
    }
    if password.is_empty() {
        return Err(Error::bad_request("password is required"));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Internal(format!("Cannot hash password: {e}")))?
        .to_string();

    let user = User {
        id: Uuid::new_v4(),
        name: name.trim().to_string(),
        email,
        password_hash,
        role,
        created_at: models::now(),
    };
    store.run(|repo| {
        if repo.find_user_by_email(&user.email)?.is_some() {
            return Err(Error::Conflict("User already exists".to_string()));
        }
        repo.insert_user(&user)
    })?;
    info!(user_id = %user.id, role = ?user.role, "user created");
    Ok(user)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
