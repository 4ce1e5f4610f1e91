use axum::{extract::State, Json};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use tracing::info;
use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    middleware::auth::{AuthUser, Claims},
    models::{AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest},
    state::AppState,
};

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if req.username.trim().is_empty() {
        return Err(AppError::InvalidInput("missing username".into()));
    }
    if req.password.is_empty() {
        return Err(AppError::InvalidInput("missing password".into()));
    }

    let password_hash =
        hash(&req.password, DEFAULT_COST).map_err(|e| AppError::Internal(e.to_string()))?;

    let mut tx = state.pool.begin().await?;

    let user_id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING id",
    )
    .bind(&req.username)
    .bind(&password_hash)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.constraint().is_some() {
                return AppError::UsernameTaken;
            }
        }
        AppError::Database(e)
    })?;

    // New accounts start with simulated cash to trade against.
    sqlx::query("INSERT INTO wallets (user_id, balance) VALUES ($1, 10000.00)")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!("registered user {}", req.username);

    let token = create_jwt(user_id, &req.username, &state.config)?;

    Ok(Json(AuthResponse {
        token,
        user_id,
        username: req.username,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let row: Option<(Uuid, String)> =
        sqlx::query_as("SELECT id, password_hash FROM users WHERE username = $1")
            .bind(&req.username)
            .fetch_optional(&state.pool)
            .await?;

    let (user_id, password_hash) = row.ok_or(AppError::InvalidCredentials)?;

    if !verify(&req.password, &password_hash).map_err(|e| AppError::Internal(e.to_string()))? {
        return Err(AppError::InvalidCredentials);
    }

    let token = create_jwt(user_id, &req.username, &state.config)?;

    Ok(Json(AuthResponse {
        token,
        user_id,
        username: req.username,
    }))
}

pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.new_password != req.confirmation {
        return Err(AppError::InvalidInput("passwords do not match".into()));
    }
    validate_new_password(&req.new_password)?;

    let (username, password_hash): (String, String) =
        sqlx::query_as("SELECT username, password_hash FROM users WHERE id = $1")
            .bind(auth.0)
            .fetch_optional(&state.pool)
            .await?
            .ok_or(AppError::Unauthorized)?;

    if !verify(&req.current_password, &password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?
    {
        return Err(AppError::InvalidCredentials);
    }

    let new_hash =
        hash(&req.new_password, DEFAULT_COST).map_err(|e| AppError::Internal(e.to_string()))?;

    sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(&new_hash)
        .bind(auth.0)
        .execute(&state.pool)
        .await?;

    info!("password changed for {}", username);

    Ok(Json(serde_json::json!({ "changed": true })))
}

/// New passwords must be at least 9 characters with at least one letter, one
/// digit, and one symbol.
fn validate_new_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() <= 8 {
        return Err(AppError::InvalidInput(
            "password must be at least 9 characters".into(),
        ));
    }

    let letters = password.chars().filter(|c| c.is_alphabetic()).count();
    let digits = password.chars().filter(|c| c.is_ascii_digit()).count();
    let symbols = password.chars().count() - letters - digits;

    if letters < 1 || digits < 1 || symbols < 1 {
        return Err(AppError::InvalidInput(
            "password must contain at least 1 letter, digit and symbol".into(),
        ));
    }

    Ok(())
}

fn create_jwt(user_id: Uuid, username: &str, config: &Config) -> Result<String, AppError> {
    let exp = (Utc::now() + Duration::hours(config.jwt_expiry_hours)).timestamp();
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_password_with_letter_digit_and_symbol() {
        assert!(validate_new_password("correct0-horse").is_ok());
    }

    #[test]
    fn rejects_short_passwords() {
        assert!(validate_new_password("a1!").is_err());
        assert!(validate_new_password("abcd123!").is_err()); // exactly 8
    }

    #[test]
    fn rejects_passwords_missing_a_class() {
        assert!(validate_new_password("onlyletters!").is_err());
        assert!(validate_new_password("letters123abc").is_err());
        assert!(validate_new_password("123456789!").is_err());
    }
}
