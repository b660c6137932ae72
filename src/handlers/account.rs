use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{UpdateAccountRequest, normalize_email},
    repository::users,
    utils::jwt::Claims,
};

/// Current user's profile, with the ids of the stores they hearted.
pub async fn account(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = users::find_with_hearts(&pool, claims.user_id())
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "title": "Edit your profile",
        "user": user,
    })))
}

/// Edits name and email. Nothing else about the account changes here.
pub async fn update_account(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = users::update_profile(
        &pool,
        claims.user_id(),
        payload.name.trim(),
        &normalize_email(&payload.email),
    )
    .await?;

    Ok(Json(json!({
        "message": "Profile updated!",
        "user": user,
    })))
}
