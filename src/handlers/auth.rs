// src/handlers/auth.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    mail::{Mailer, password_reset_email},
    models::user::{
        ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, User,
        normalize_email,
    },
    repository::users,
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
        token::{issue_reset_token, now_millis},
    },
};

/// Same answer whether or not the email belongs to an account.
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been mailed to it.";

pub const INVALID_RESET_MESSAGE: &str = "Password reset is invalid or has expired";

/// Signs a session token and wraps it with the user, the shape every login path returns.
fn session_response(user: &User, config: &Config, message: &str) -> Result<serde_json::Value, AppError> {
    let token = sign_jwt(user.id, &config.jwt_secret, config.jwt_expiration)?;
    Ok(json!({
        "token": token,
        "type": "Bearer",
        "user": user,
        "message": message,
    }))
}

pub async fn login_form() -> impl IntoResponse {
    Json(json!({ "title": "Login" }))
}

pub async fn register_form() -> impl IntoResponse {
    Json(json!({ "title": "Register" }))
}

/// Registers a new user and logs them in.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created with a session token and the user (excluding password).
pub async fn register(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let email = normalize_email(&payload.email);
    let hashed_password = hash_password(&payload.password)?;
    let user = users::create(&pool, payload.name.trim(), &email, &hashed_password).await?;

    tracing::info!("Registered user {}", user.id);

    let body = session_response(&user, &config, "You are now registered and logged in")?;
    Ok((StatusCode::CREATED, Json(body)))
}

/// Authenticates a user by email and password and returns a JWT.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|_| AppError::AuthError("Failed Login!".to_string()))?;

    let user = users::find_by_email(&pool, &normalize_email(&payload.email))
        .await?
        .ok_or(AppError::AuthError("Failed Login!".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Failed Login!".to_string()));
    }

    Ok(Json(session_response(&user, &config, "You are logged in")?))
}

/// Sessions are bearer tokens, so logging out is the client dropping its token.
pub async fn logout() -> impl IntoResponse {
    Json(json!({ "message": "You are now logged out!" }))
}

/// Starts a password reset.
///
/// For a known email the user gets a token valid for one hour and a mail with
/// the reset link, built from `PUBLIC_URL` and never from request headers.
/// The response never reveals whether the account exists.
pub async fn forgot(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    State(mailer): State<Arc<dyn Mailer>>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&payload.email);

    match users::find_by_email(&pool, &email).await? {
        Some(user) => {
            let issued = issue_reset_token(now_millis());
            users::set_reset_token(&pool, user.id, &issued.token, issued.expires_at).await?;

            let reset_url = format!("{}/account/reset/{}", config.public_url, issued.token);

            let message = password_reset_email(&user.email, &user.name, &reset_url);
            if let Err(e) = mailer.send(message).await {
                tracing::error!("Failed to send password reset mail to user {}: {}", user.id, e);
            }
        }
        None => {
            tracing::info!("Password reset requested for an unknown email");
        }
    }

    Ok(Json(json!({ "message": FORGOT_PASSWORD_MESSAGE })))
}

/// Shows the reset form if the token is live.
pub async fn reset_form(
    State(pool): State<SqlitePool>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    users::find_by_reset_token(&pool, &token, now_millis())
        .await?
        .ok_or(AppError::AuthError(INVALID_RESET_MESSAGE.to_string()))?;

    Ok(Json(json!({ "title": "Reset your Password" })))
}

/// Completes a password reset and logs the user in.
///
/// The two password fields must match exactly before the token is even looked
/// up. The token is consumed by the same update that stores the new password,
/// so it works exactly once.
pub async fn reset(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.password != payload.password_confirm {
        return Err(AppError::BadRequest("Passwords do not match".to_string()));
    }
    if payload.password.is_empty() {
        return Err(AppError::BadRequest("Password can not be empty".to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let user = users::consume_reset_token(&pool, &token, now_millis(), &hashed_password)
        .await?
        .ok_or(AppError::AuthError(INVALID_RESET_MESSAGE.to_string()))?;

    tracing::info!("Password reset completed for user {}", user.id);

    Ok(Json(session_response(
        &user,
        &config,
        "Nice! New password saved, you are now logged in!",
    )?))
}
