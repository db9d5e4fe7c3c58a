use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::User,
};

/// A token expiring sooner than this is replaced instead of reused
pub const TOKEN_RENEW_MARGIN_SECS: i64 = 60;

/// Tokens are opaque random strings kept on the user row with their expiry
const TOKEN_BYTES: usize = 24;

/// Hash a plaintext password using Argon2id with a random salt.
///
/// The result is a PHC string, stored as is on the user row.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// Verify a plaintext password against a stored PHC hash.
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("stored password hash is invalid: {}", e)))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::Internal(format!("password verification failed: {}", e))),
    }
}

/// Fresh opaque token: random bytes, base64 encoded
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

/// Returns the user's token, issuing a new one unless the current one
/// stays valid for more than [`TOKEN_RENEW_MARGIN_SECS`]
pub async fn issue_token(
    store: &dyn Store,
    user: &User,
    expires_in: i64,
    now: DateTime<Utc>,
) -> AppResult<String> {
    if let Some(token) = user.token_valid_until(now + Duration::seconds(TOKEN_RENEW_MARGIN_SECS)) {
        tracing::debug!(user_id = user.id, "Reusing current token");
        return Ok(token.to_string());
    }

    let token = generate_token();
    let expiration = now + Duration::seconds(expires_in);
    store.set_token(user.id, &token, expiration).await?;
    tracing::info!(user_id = user.id, expires_at = %expiration, "Issued token");
    Ok(token)
}

/// Expires the user's token immediately
///
/// The token stays on the row; only its expiry moves into the past.
pub async fn revoke_token(store: &dyn Store, user: &User, now: DateTime<Utc>) -> AppResult<()> {
    store
        .set_token_expiration(user.id, now - Duration::seconds(1))
        .await?;
    tracing::info!(user_id = user.id, "Revoked token");
    Ok(())
}

/// Resolves an `Authorization: Basic ..` value to a user
pub async fn authenticate_basic(store: &dyn Store, header: &str) -> AppResult<User> {
    let unauthorized = || AppError::Unauthorized("Invalid credentials".to_string());

    let encoded = header.strip_prefix("Basic ").ok_or_else(unauthorized)?;
    let decoded = STANDARD.decode(encoded.trim()).map_err(|_| unauthorized())?;
    let decoded = String::from_utf8(decoded).map_err(|_| unauthorized())?;
    let (username, password) = decoded.split_once(':').ok_or_else(unauthorized)?;

    let user = store
        .user_by_username(username)
        .await?
        .ok_or_else(unauthorized)?;

    if !verify_password(password, &user.password_hash)? {
        tracing::warn!(username = %username, "Rejected basic credentials");
        return Err(unauthorized());
    }

    Ok(user)
}

/// Resolves an `Authorization: Bearer ..` value to a user holding a live token
pub async fn authenticate_bearer(
    store: &dyn Store,
    header: &str,
    now: DateTime<Utc>,
) -> AppResult<User> {
    let unauthorized = || AppError::Unauthorized("Invalid or expired token".to_string());

    let token = header.strip_prefix("Bearer ").ok_or_else(unauthorized)?.trim();
    let user = store.user_by_token(token).await?.ok_or_else(unauthorized)?;

    if user.token_valid_until(now).is_none() {
        return Err(unauthorized());
    }

    Ok(user)
}
