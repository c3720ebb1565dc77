// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'users' table in the database.
///
/// One table backs both identity contexts: creators register with a
/// password, quiz participants get a password-less row from the
/// lightweight email-only login.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    pub name: String,

    /// Unique email address.
    pub email: String,

    /// Argon2 password hash. NULL for participant-only identities.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password_hash: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new creator account (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name length must be between 1 and 100 characters."
    ))]
    pub name: String,
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password length must be between 8 and 128 characters."
    ))]
    pub password: String,
}

/// DTO for creator login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for the lightweight participant login on the quiz-taking route.
/// Email only; a display name is optional.
#[derive(Debug, Deserialize, Validate)]
pub struct PlayLoginRequest {
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(max = 100))]
    pub name: Option<String>,
}
