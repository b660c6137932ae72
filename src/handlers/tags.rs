use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::{Value, json};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    repository::{aggregation, stores},
};

/// Tag rollup plus every store that has at least one tag.
pub async fn list_tags(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    render_tags(&pool, None).await
}

/// Tag rollup plus the stores carrying `tag`.
pub async fn stores_by_tag(
    State(pool): State<SqlitePool>,
    Path(tag): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    render_tags(&pool, Some(tag)).await
}

async fn render_tags(pool: &SqlitePool, tag: Option<String>) -> Result<Json<Value>, AppError> {
    // Both queries only read, so they can run side by side.
    let (tags, list) = tokio::try_join!(
        aggregation::tag_counts(pool),
        stores::list_by_tag(pool, tag.as_deref()),
    )?;

    Ok(Json(json!({
        "title": "Tags",
        "tags": tags,
        "tag": tag,
        "stores": list,
    })))
}
