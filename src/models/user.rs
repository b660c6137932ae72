// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique, stored lower-cased.
    pub email: String,

    /// Display name.
    pub name: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// Pending password reset token (40 hex chars).
    #[serde(skip)]
    pub reset_password_token: Option<String>,

    /// Expiry of the reset token, Unix milliseconds.
    #[serde(skip)]
    pub reset_password_expires: Option<i64>,

    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Ids of the stores this user has hearted.
    /// Populated only by queries that load the heart set.
    #[sqlx(skip)]
    #[serde(default)]
    pub hearts: Vec<i64>,
}

/// What anyone may see of a user: reviewers and store owners on public pages.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "You must supply a name!"))]
    pub name: String,
    #[validate(email(message = "Your email is not valid!"))]
    pub email: String,
    #[validate(length(min = 1, max = 128, message = "Password can not be empty"))]
    pub password: String,
    #[validate(
        length(min = 1, message = "Confirm-password can not be empty"),
        must_match(other = "password", message = "Oops! Your passwords do not match")
    )]
    pub password_confirm: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for the profile edit form. Only name and email can change here.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAccountRequest {
    #[validate(length(min = 1, max = 100, message = "You must supply a name!"))]
    pub name: String,
    #[validate(email(message = "Your email is not valid!"))]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// The two fields are compared byte for byte before the token is looked up.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
    pub password_confirm: String,
}

/// Lower-cases and trims an email so lookups and the unique index agree.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
