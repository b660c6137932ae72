use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::review::CreateReviewRequest,
    repository::{reviews, stores},
    utils::jwt::Claims,
};

/// Posts a review of a store. Reviews cannot be edited or deleted afterwards.
pub async fn add_review(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(store_id): Path<i64>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if !stores::exists(&pool, store_id).await? {
        return Err(AppError::NotFound("Store not found".to_string()));
    }

    let review = reviews::create(&pool, claims.user_id(), store_id, &payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Your review has been saved!",
            "review": review,
        })),
    ))
}
