use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::API_PREFIX;

/// A registered user as stored
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub token: Option<String>,
    pub token_expiration: Option<DateTime<Utc>>,
}

impl User {
    /// Returns the current token if it stays valid past `not_before`
    pub fn token_valid_until(&self, not_before: DateTime<Utc>) -> Option<&str> {
        match (&self.token, self.token_expiration) {
            (Some(token), Some(expiration)) if expiration > not_before => Some(token),
            _ => None,
        }
    }

    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.id,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            links: UserLinks {
                self_link: user_location(self.id),
                watched: format!("{}/movie/watched/{}", API_PREFIX, self.id),
                recommended: format!("{}/movie/recommended/{}", API_PREFIX, self.id),
            },
        }
    }
}

pub fn user_location(id: i64) -> String {
    format!("{}/user/{}", API_PREFIX, id)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    #[serde(rename = "_links")]
    pub links: UserLinks,
}

#[derive(Debug, Serialize)]
pub struct UserLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    pub watched: String,
    pub recommended: String,
}

/// Body of `POST /user`; required fields are checked by the handler
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Body of `PUT /user/{id}`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Validated user ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: String,
}

/// Column changes for an update. `None` leaves the column as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: Option<String>,
}

impl UserChanges {
    pub fn apply(&self, user: &mut User) {
        if let Some(username) = &self.username {
            user.username = username.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(first_name) = &self.first_name {
            user.first_name = Some(first_name.clone());
        }
        if let Some(last_name) = &self.last_name {
            user.last_name = Some(last_name.clone());
        }
        if let Some(password_hash) = &self.password_hash {
            user.password_hash = password_hash.clone();
        }
    }
}
