// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Minimum allowed value for a quiz-wide (global) timer, in seconds.
pub const MIN_GLOBAL_TIMER_SECONDS: i32 = 60;

/// Maximum quiz title length, in characters.
pub const MAX_TITLE_LENGTH: usize = 80;

/// Minimum question text length, in characters.
pub const MIN_QUESTION_TEXT_LENGTH: usize = 5;

/// Allowed range for question point values.
pub const MIN_QUESTION_POINTS: i32 = 1;
pub const MAX_QUESTION_POINTS: i32 = 10;

/// A multiple-choice question must offer at least this many choices.
pub const MIN_CHOICES: usize = 2;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
        }
    }
}
