// src/utils/jwt.rs

//! Session tokens.
//!
//! A session is a signed JWT carrying the user id. There is no server-side
//! session table, so logging out is the client forgetting its token.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

const LOGIN_REQUIRED: &str = "You must be logged in to do that!";

/// Session claims, injected into request extensions by `auth_middleware`.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    /// Issued at, Unix seconds.
    pub iat: u64,
    /// Expiry, Unix seconds.
    pub exp: u64,
}

impl Claims {
    pub fn user_id(&self) -> i64 {
        self.sub
    }
}

fn unix_now() -> Result<u64, AppError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Signs a session token for `user_id`, valid for `ttl_seconds`.
pub fn sign_jwt(user_id: i64, secret: &str, ttl_seconds: u64) -> Result<String, AppError> {
    let now = unix_now()?;
    let claims = Claims {
        sub: user_id,
        iat: now,
        exp: now.saturating_add(ttl_seconds),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Checks signature and expiry.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::AuthError(LOGIN_REQUIRED.to_string()))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Guards the logged-in routes.
///
/// A missing, malformed or expired bearer token is a 401 and the handler never
/// runs. Otherwise the decoded `Claims` are available as `Extension<Claims>`.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| AppError::AuthError(LOGIN_REQUIRED.to_string()))?;

    let claims = verify_jwt(token, &config.jwt_secret).inspect_err(|_| {
        tracing::debug!("Rejected request to {} with an invalid session token", req.uri().path());
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
