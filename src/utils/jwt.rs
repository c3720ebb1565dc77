// src/utils/jwt.rs

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

/// Session scope carried inside the token.
///
/// The app runs two independent identity contexts over one signing setup:
/// `Creator` for the authoring dashboard (email + password login) and
/// `Participant` for the lightweight quiz-taking login (email only).
/// A token signed for one scope never passes the other scope's middleware.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionScope {
    Creator,
    Participant,
}

impl fmt::Display for SessionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionScope::Creator => write!(f, "creator"),
            SessionScope::Participant => write!(f, "participant"),
        }
    }
}

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    /// Session scope this token was issued for.
    pub scope: SessionScope,
    /// Email of the identity, for display purposes.
    pub email: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    /// The user id encoded in `sub`, or 0 when the claim is malformed.
    pub fn user_id(&self) -> i64 {
        self.sub.parse::<i64>().unwrap_or(0)
    }
}

/// Signs a new JWT for the given identity and scope.
pub fn sign_jwt(
    id: i64,
    email: &str,
    scope: SessionScope,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    // Calculate expiration: current time + expiration_seconds
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: id.to_string(), // Store User ID in 'sub' claim
        scope,
        email: email.to_owned(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Authorization("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Shared middleware body: validates the 'Authorization: Bearer <token>'
/// header against the expected session scope.
/// If valid, injects `Claims` into the request extensions for handlers to use.
async fn scoped_auth(
    config: Config,
    expected: SessionScope,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => return Err(StatusCode::UNAUTHORIZED),
    };

    match verify_jwt(token, &config.jwt_secret) {
        Ok(claims) if claims.scope == expected => {
            req.extensions_mut().insert(claims);
            Ok(next.run(req).await)
        }
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Axum Middleware: creator (dashboard) authentication.
pub async fn creator_middleware(
    State(config): State<Config>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    scoped_auth(config, SessionScope::Creator, req, next).await
}

/// Axum Middleware: participant (quiz-taking) authentication.
pub async fn participant_middleware(
    State(config): State<Config>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    scoped_auth(config, SessionScope::Participant, req, next).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let token = sign_jwt(42, "a@b.c", SessionScope::Creator, "secret", 600).unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();
        assert_eq!(claims.user_id(), 42);
        assert_eq!(claims.scope, SessionScope::Creator);
        assert_eq!(claims.email, "a@b.c");
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let token = sign_jwt(1, "a@b.c", SessionScope::Participant, "secret", 600).unwrap();
        assert!(verify_jwt(&token, "other").is_err());
    }

    #[test]
    fn scopes_are_distinct_in_claims() {
        let token = sign_jwt(7, "p@q.r", SessionScope::Participant, "secret", 600).unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();
        assert_ne!(claims.scope, SessionScope::Creator);
    }
}
