// src/handlers/api.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::store::{NearParams, SearchParams},
    repository::{stores, users},
    utils::jwt::Claims,
};

/// Full-text search over store names and descriptions, top 5 by relevance.
pub async fn search_stores(
    State(pool): State<SqlitePool>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let q = params.q.unwrap_or_default();
    let found = stores::search(&pool, &q).await?;
    Ok(Json(found))
}

/// Stores within 10 km of `(lng, lat)`, nearest first.
pub async fn map_stores(
    State(pool): State<SqlitePool>,
    Query(params): Query<NearParams>,
) -> Result<impl IntoResponse, AppError> {
    if !(-180.0..=180.0).contains(&params.lng) || !(-90.0..=90.0).contains(&params.lat) {
        return Err(AppError::BadRequest("Coordinates out of range".to_string()));
    }

    let found = stores::near(&pool, params.lng, params.lat).await?;
    Ok(Json(found))
}

/// Toggles the store in the current user's heart set and returns the user.
pub async fn heart_store(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(store_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !stores::exists(&pool, store_id).await? {
        return Err(AppError::NotFound("Store not found".to_string()));
    }

    let user = users::toggle_heart(&pool, claims.user_id(), store_id).await?;
    Ok(Json(user))
}
