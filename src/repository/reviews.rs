//! Review store. Every read expands the review's author.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::{
    error::AppError,
    models::{
        review::{CreateReviewRequest, Review, ReviewWithAuthor},
        user::Author,
    },
    utils::html::clean_html,
};

const REVIEW_WITH_AUTHOR_COLUMNS: &str = r#"
    r.id, r.author_id, r.store_id, r.rating, r.text, r.created_at,
    u.name AS author_name
"#;

/// A review joined with its author's public columns. Email and credentials are never selected.
#[derive(Debug, FromRow)]
struct ReviewAuthorRow {
    id: i64,
    author_id: i64,
    store_id: i64,
    rating: i64,
    text: String,
    created_at: chrono::DateTime<chrono::Utc>,
    author_name: String,
}

impl From<ReviewAuthorRow> for ReviewWithAuthor {
    fn from(row: ReviewAuthorRow) -> Self {
        Self {
            author: Author {
                id: row.author_id,
                name: row.author_name,
            },
            review: Review {
                id: row.id,
                author_id: row.author_id,
                store_id: row.store_id,
                rating: row.rating,
                text: row.text,
                created_at: row.created_at,
            },
        }
    }
}

/// Stores a review. The caller has already checked that the store exists.
pub async fn create(
    pool: &SqlitePool,
    author_id: i64,
    store_id: i64,
    req: &CreateReviewRequest,
) -> Result<ReviewWithAuthor, AppError> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO reviews (author_id, store_id, rating, text, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(author_id)
    .bind(store_id)
    .bind(req.rating)
    .bind(clean_html(&req.text))
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create review: {:?}", e);
        AppError::from(e)
    })?;

    find_by_id(pool, id)
        .await?
        .ok_or(AppError::NotFound("Review not found".to_string()))
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<ReviewWithAuthor>, AppError> {
    let row = sqlx::query_as::<_, ReviewAuthorRow>(&format!(
        "SELECT {} FROM reviews r JOIN users u ON u.id = r.author_id WHERE r.id = $1",
        REVIEW_WITH_AUTHOR_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(ReviewWithAuthor::from))
}

/// Reviews of the given stores, newest first, grouped by store id.
pub async fn for_stores(
    pool: &SqlitePool,
    store_ids: &[i64],
) -> Result<HashMap<i64, Vec<ReviewWithAuthor>>, AppError> {
    let mut grouped: HashMap<i64, Vec<ReviewWithAuthor>> = HashMap::new();
    if store_ids.is_empty() {
        return Ok(grouped);
    }

    let mut query_builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {} FROM reviews r JOIN users u ON u.id = r.author_id WHERE r.store_id IN (",
        REVIEW_WITH_AUTHOR_COLUMNS
    ));
    let mut separated = query_builder.separated(",");
    for id in store_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY r.created_at DESC, r.id DESC");

    let rows: Vec<ReviewAuthorRow> = query_builder.build_query_as().fetch_all(pool).await?;

    for row in rows {
        grouped
            .entry(row.store_id)
            .or_default()
            .push(ReviewWithAuthor::from(row));
    }
    Ok(grouped)
}
