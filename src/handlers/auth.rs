// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, PlayLoginRequest, RegisterRequest, User},
    utils::{
        hash::{hash_password, verify_password},
        jwt::{SessionScope, sign_jwt},
    },
};

/// Registers a new creator account.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding the hash).
pub async fn register(
    State(pool): State<PgPool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING id, name, email, password_hash, created_at
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&hashed_password)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.as_database_error()
            .is_some_and(|db| db.is_unique_violation())
        {
            AppError::Conflict(format!("Email '{}' is already registered", payload.email))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a creator and returns a creator-scope JWT.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password_hash, created_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(&payload.email)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::Internal(e.to_string())
    })?;

    let user = user.ok_or(AppError::Authorization("User not found".to_string()))?;

    // Participant-only rows have no password and cannot use creator login.
    let stored_hash = user
        .password_hash
        .as_deref()
        .ok_or(AppError::Authorization("Invalid password".to_string()))?;

    let is_valid = verify_password(&payload.password, stored_hash)?;

    if !is_valid {
        return Err(AppError::Authorization("Invalid password".to_string()));
    }

    let token = sign_jwt(
        user.id,
        &user.email,
        SessionScope::Creator,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "scope": "creator",
        "name": user.name,
    })))
}

/// Lightweight login for the quiz-taking route: email only.
///
/// Upserts a password-less user row and returns a participant-scope JWT.
/// The token does not grant access to any authoring endpoint.
pub async fn play_login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<PlayLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let name = payload
        .name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(&payload.email)
        .to_string();

    // The no-op conflict update lets RETURNING yield the existing row.
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email)
        VALUES ($1, $2)
        ON CONFLICT (email) DO UPDATE SET name = users.name
        RETURNING id, name, email, password_hash, created_at
        "#,
    )
    .bind(&name)
    .bind(&payload.email)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert participant: {:?}", e);
        AppError::Internal(e.to_string())
    })?;

    let token = sign_jwt(
        user.id,
        &user.email,
        SessionScope::Participant,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "scope": "participant",
        "name": user.name,
    })))
}
