//! Read-only rollups over the catalog: tag frequency and top-rated stores.

use sqlx::{FromRow, SqlitePool};

use crate::{
    config::TOP_STORES_LIMIT,
    error::AppError,
    models::store::{TagCount, TopStore},
    repository::reviews,
};

/// Every tag in use with the number of stores carrying it, most used first.
pub async fn tag_counts(pool: &SqlitePool) -> Result<Vec<TagCount>, AppError> {
    let counts = sqlx::query_as::<_, TagCount>(
        r#"
        SELECT tag, COUNT(*) AS count
        FROM store_tags
        GROUP BY tag
        ORDER BY count DESC, tag ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(counts)
}

#[derive(Debug, FromRow)]
struct RatedStoreRow {
    id: i64,
    name: String,
    slug: String,
    photo: Option<String>,
    average_rating: f64,
}

/// The best-rated stores among those with at least two reviews.
///
/// Stores with zero or one review are left out entirely rather than scored.
pub async fn top_stores(pool: &SqlitePool) -> Result<Vec<TopStore>, AppError> {
    let rows = sqlx::query_as::<_, RatedStoreRow>(
        r#"
        SELECT s.id, s.name, s.slug, s.photo, AVG(CAST(r.rating AS REAL)) AS average_rating
        FROM stores s
        JOIN reviews r ON r.store_id = s.id
        GROUP BY s.id
        HAVING COUNT(r.id) >= 2
        ORDER BY average_rating DESC, s.id ASC
        LIMIT $1
        "#,
    )
    .bind(TOP_STORES_LIMIT)
    .fetch_all(pool)
    .await?;

    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut reviews_by_store = reviews::for_stores(pool, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| TopStore {
            reviews: reviews_by_store.remove(&row.id).unwrap_or_default(),
            id: row.id,
            name: row.name,
            slug: row.slug,
            photo: row.photo,
            average_rating: row.average_rating,
        })
        .collect())
}
