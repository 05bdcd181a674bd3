use std::sync::LazyLock;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Json, extract::State};
use rand_core::OsRng;
use tracing::{info, warn};

use pictor_db::Database;
use pictor_types::api::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error::ApiError;
use crate::state::{AppState, with_db};

/// Verified against when the username is unknown, so that a missing user
/// costs the same Argon2 work as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("pictor-dummy-password").ok());

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

/// Constant-time check of `password` against a PHC hash string.
fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("stored hash is unreadable: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Create a user with an Argon2id-hashed password. Returns the new user id.
pub fn register_user(db: &Database, name: &str, username: &str, password: &str) -> Result<i64, ApiError> {
    if db.get_user_by_username(username)?.is_some() {
        return Err(ApiError::Conflict);
    }

    let password_hash = hash_password(password)?;

    // The insert itself is the authority on uniqueness; the lookup above only
    // saves a hash on the common path.
    db.create_user(name, username, &password_hash)?
        .ok_or(ApiError::Conflict)
}

/// Check credentials and return the user id. Unknown usernames and wrong
/// passwords fail with the same error.
pub fn login_user(db: &Database, username: &str, password: &str) -> Result<i64, ApiError> {
    let Some(user) = db.get_user_by_username(username)? else {
        if let Some(dummy) = DUMMY_HASH.as_deref() {
            let _ = verify_password(password, dummy);
        }
        return Err(ApiError::Auth);
    };

    if !verify_password(password, &user.password)? {
        return Err(ApiError::Auth);
    }
    Ok(user.id)
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let username = req.username.clone();
    let user_id = with_db(&state, move |db| {
        register_user(db, &req.name, &req.username, &req.password)
    })
    .await
    .inspect_err(|e| {
        if matches!(e, ApiError::Conflict) {
            warn!("Registration rejected, username {} taken", username);
        }
    })?;

    info!("Registered user {} ({})", username, user_id);
    Ok(Json(RegisterResponse {
        msg: "User created successfully".into(),
        user_id,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user_id = with_db(&state, move |db| login_user(db, &req.username, &req.password)).await?;

    Ok(Json(LoginResponse {
        msg: "Login successful".into(),
        user_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_login_returns_same_id() {
        let db = Database::open_in_memory().unwrap();
        let id = register_user(&db, "Al", "al", "pw1").unwrap();
        assert_eq!(login_user(&db, "al", "pw1").unwrap(), id);
    }

    #[test]
    fn second_registration_conflicts_and_keeps_first_password() {
        let db = Database::open_in_memory().unwrap();
        let id = register_user(&db, "Al", "al", "pw1").unwrap();

        assert!(matches!(register_user(&db, "Al2", "al", "pw2"), Err(ApiError::Conflict)));
        assert_eq!(login_user(&db, "al", "pw1").unwrap(), id);
        assert!(matches!(login_user(&db, "al", "pw2"), Err(ApiError::Auth)));
    }

    #[test]
    fn bad_credentials_fail_uniformly() {
        let db = Database::open_in_memory().unwrap();
        register_user(&db, "Al", "al", "pw1").unwrap();

        let wrong_password = login_user(&db, "al", "nope").unwrap_err();
        let unknown_user = login_user(&db, "bo", "pw1").unwrap_err();
        assert!(matches!(wrong_password, ApiError::Auth));
        assert!(matches!(unknown_user, ApiError::Auth));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[test]
    fn stored_hash_is_salted_argon2() {
        let db = Database::open_in_memory().unwrap();
        register_user(&db, "Al", "al", "pw1").unwrap();
        register_user(&db, "Bo", "bo", "pw1").unwrap();

        let al = db.get_user_by_username("al").unwrap().unwrap().password;
        let bo = db.get_user_by_username("bo").unwrap().unwrap().password;
        assert!(al.starts_with("$argon2id$"));
        assert_ne!(al, bo);
    }
}
