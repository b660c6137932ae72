//! Catalog store: listings, their tags, slug assignment, search and map lookups.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::{
    config::{NEAR_LIMIT, NEAR_MAX_DISTANCE_METRES, SEARCH_LIMIT},
    error::{AppError, is_unique_violation},
    models::store::{Location, NearbyStore, Store, StoreForm, StoreRow},
    repository::{StoreQueryOptions, reviews, users},
    utils::{
        geo::{BoundingBox, haversine_metres},
        html::clean_html,
        slug::{choose_slug, slugify},
    },
};

const STORE_COLUMNS: &str =
    "s.id, s.name, s.slug, s.description, s.lng, s.lat, s.address, s.photo, s.author_id, s.created_at";

/// Attempts at writing a slug before giving up on a hot name.
const SLUG_WRITE_ATTEMPTS: usize = 3;

/// Validated, sanitized values ready to be written.
struct StoreValues {
    name: String,
    description: String,
    tags: Vec<String>,
    lng: f64,
    lat: f64,
    address: String,
}

impl StoreValues {
    fn from_form(form: &StoreForm) -> Result<Self, AppError> {
        let (Some(lng), Some(lat)) = (form.lng, form.lat) else {
            return Err(AppError::BadRequest("You must supply coordinates".to_string()));
        };
        Ok(Self {
            name: form.name.trim().to_string(),
            description: clean_html(&form.description),
            tags: form.normalized_tags(),
            lng,
            lat,
            address: form.address.trim().to_string(),
        })
    }
}

/// Computes the base slug for a name, refusing names with nothing URL-safe in them.
fn base_slug(name: &str) -> Result<String, AppError> {
    let base = slugify(name);
    if base.is_empty() {
        return Err(AppError::BadRequest(
            "Store name must contain at least one letter or digit".to_string(),
        ));
    }
    Ok(base)
}

/// Slugs of other stores that could collide with `base`.
///
/// The LIKE prefilter is index-friendly and case-insensitive; the exact
/// `^(base)(-[0-9]*)?$` match happens in `choose_slug`.
async fn candidate_slugs(
    conn: &mut SqliteConnection,
    base: &str,
    exclude_id: Option<i64>,
) -> Result<Vec<String>, AppError> {
    let slugs = sqlx::query_scalar::<_, String>(
        "SELECT slug FROM stores WHERE slug LIKE $1 AND ($2 IS NULL OR id != $2)",
    )
    .bind(format!("{}%", base))
    .bind(exclude_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(slugs)
}

/// Picks a unique slug for `name`, ignoring the store being renamed.
async fn assign_slug(
    conn: &mut SqliteConnection,
    name: &str,
    exclude_id: Option<i64>,
) -> Result<String, AppError> {
    let base = base_slug(name)?;
    let existing = candidate_slugs(conn, &base, exclude_id).await?;
    Ok(choose_slug(&base, &existing))
}

async fn replace_tags(
    conn: &mut SqliteConnection,
    store_id: i64,
    tags: &[String],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM store_tags WHERE store_id = $1")
        .bind(store_id)
        .execute(&mut *conn)
        .await?;

    for tag in tags {
        sqlx::query("INSERT OR IGNORE INTO store_tags (store_id, tag) VALUES ($1, $2)")
            .bind(store_id)
            .bind(tag)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Creates a store owned by `author_id`.
///
/// The slug is derived from the name. A concurrent writer that grabbed the same
/// slug trips the unique index, in which case the slug is recomputed and the
/// insert retried.
pub async fn create(
    pool: &SqlitePool,
    author_id: i64,
    form: &StoreForm,
    photo: Option<String>,
) -> Result<Store, AppError> {
    let values = StoreValues::from_form(form)?;

    for attempt in 1..=SLUG_WRITE_ATTEMPTS {
        let mut tx = pool.begin().await?;
        let slug = assign_slug(&mut *tx, &values.name, None).await?;

        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO stores (name, slug, description, lng, lat, address, photo, author_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&values.name)
        .bind(&slug)
        .bind(&values.description)
        .bind(values.lng)
        .bind(values.lat)
        .bind(&values.address)
        .bind(&photo)
        .bind(author_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await;

        let id = match inserted {
            Ok(id) => id,
            Err(e) if is_unique_violation(&e) => {
                tracing::warn!("Slug '{}' taken concurrently (attempt {})", slug, attempt);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        replace_tags(&mut *tx, id, &values.tags).await?;
        tx.commit().await?;

        tracing::info!("Created store {} ({})", id, slug);
        return find_by_id(pool, id, StoreQueryOptions::default())
            .await?
            .ok_or(AppError::NotFound("Store not found".to_string()));
    }

    Err(AppError::Conflict(format!(
        "Could not assign a unique slug to '{}', please retry",
        values.name
    )))
}

/// Replaces every field of an existing store. The slug is only recomputed when
/// the name changed, and the old photo is kept when `photo` is `None`.
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    form: &StoreForm,
    photo: Option<String>,
) -> Result<Store, AppError> {
    let values = StoreValues::from_form(form)?;

    for attempt in 1..=SLUG_WRITE_ATTEMPTS {
        let mut tx = pool.begin().await?;

        let current = sqlx::query_as::<_, (String, String)>("SELECT name, slug FROM stores WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Store not found".to_string()))?;

        let (current_name, current_slug) = current;
        let slug = if current_name == values.name {
            current_slug
        } else {
            assign_slug(&mut *tx, &values.name, Some(id)).await?
        };

        let updated = sqlx::query(
            r#"
            UPDATE stores
            SET name = $1, slug = $2, description = $3, lng = $4, lat = $5, address = $6,
                photo = COALESCE($7, photo)
            WHERE id = $8
            "#,
        )
        .bind(&values.name)
        .bind(&slug)
        .bind(&values.description)
        .bind(values.lng)
        .bind(values.lat)
        .bind(&values.address)
        .bind(&photo)
        .bind(id)
        .execute(&mut *tx)
        .await;

        match updated {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                tracing::warn!("Slug '{}' taken concurrently (attempt {})", slug, attempt);
                continue;
            }
            Err(e) => return Err(e.into()),
        }

        replace_tags(&mut *tx, id, &values.tags).await?;
        tx.commit().await?;

        tracing::info!("Updated store {} ({})", id, slug);
        return find_by_id(pool, id, StoreQueryOptions::default())
            .await?
            .ok_or(AppError::NotFound("Store not found".to_string()));
    }

    Err(AppError::Conflict(format!(
        "Could not assign a unique slug to '{}', please retry",
        values.name
    )))
}

/// Owner id of a store, for the mutation guard.
pub async fn author_of(pool: &SqlitePool, id: i64) -> Result<Option<i64>, AppError> {
    let author = sqlx::query_scalar::<_, i64>("SELECT author_id FROM stores WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(author)
}

pub async fn exists(pool: &SqlitePool, id: i64) -> Result<bool, AppError> {
    Ok(author_of(pool, id).await?.is_some())
}

pub async fn find_by_id(
    pool: &SqlitePool,
    id: i64,
    options: StoreQueryOptions,
) -> Result<Option<Store>, AppError> {
    let row = sqlx::query_as::<_, StoreRow>(&format!(
        "SELECT {} FROM stores s WHERE s.id = $1",
        STORE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    first_hydrated(pool, row, options).await
}

pub async fn find_by_slug(
    pool: &SqlitePool,
    slug: &str,
    options: StoreQueryOptions,
) -> Result<Option<Store>, AppError> {
    let row = sqlx::query_as::<_, StoreRow>(&format!(
        "SELECT {} FROM stores s WHERE s.slug = $1",
        STORE_COLUMNS
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    first_hydrated(pool, row, options).await
}

pub async fn count(pool: &SqlitePool) -> Result<i64, AppError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stores")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// One page of the feed, oldest store first.
pub async fn list(
    pool: &SqlitePool,
    limit: i64,
    offset: i64,
    options: StoreQueryOptions,
) -> Result<Vec<Store>, AppError> {
    let rows = sqlx::query_as::<_, StoreRow>(&format!(
        "SELECT {} FROM stores s ORDER BY s.created_at ASC, s.id ASC LIMIT $1 OFFSET $2",
        STORE_COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    hydrate(pool, rows, options).await
}

/// Stores carrying `tag`, or every store with at least one tag when `tag` is `None`.
pub async fn list_by_tag(pool: &SqlitePool, tag: Option<&str>) -> Result<Vec<Store>, AppError> {
    let rows = sqlx::query_as::<_, StoreRow>(&format!(
        r#"
        SELECT {} FROM stores s
        WHERE EXISTS (
            SELECT 1 FROM store_tags t
            WHERE t.store_id = s.id AND ($1 IS NULL OR t.tag = $1)
        )
        ORDER BY s.created_at ASC, s.id ASC
        "#,
        STORE_COLUMNS
    ))
    .bind(tag)
    .fetch_all(pool)
    .await?;

    hydrate(pool, rows, StoreQueryOptions::default()).await
}

/// Stores the user has hearted.
pub async fn list_hearted(pool: &SqlitePool, user_id: i64) -> Result<Vec<Store>, AppError> {
    let rows = sqlx::query_as::<_, StoreRow>(&format!(
        r#"
        SELECT {} FROM stores s
        JOIN hearts h ON h.store_id = s.id
        WHERE h.user_id = $1
        ORDER BY s.created_at ASC, s.id ASC
        "#,
        STORE_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    hydrate(pool, rows, StoreQueryOptions::default()).await
}

/// Builds an FTS5 query that ORs every word of `input` as a quoted term,
/// so user input cannot smuggle in FTS operators.
pub fn fts_query(input: &str) -> Option<String> {
    let terms: Vec<String> = input
        .split_whitespace()
        .map(|word| format!("\"{}\"", word.replace('"', "\"\"")))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

/// Full-text search over name and description, best match first.
pub async fn search(pool: &SqlitePool, q: &str) -> Result<Vec<Store>, AppError> {
    let Some(query) = fts_query(q) else {
        return Ok(Vec::new());
    };

    let rows = sqlx::query_as::<_, StoreRow>(&format!(
        r#"
        SELECT {} FROM stores_fts
        JOIN stores s ON s.id = stores_fts.rowid
        WHERE stores_fts MATCH $1
        ORDER BY bm25(stores_fts) ASC, s.id ASC
        LIMIT $2
        "#,
        STORE_COLUMNS
    ))
    .bind(query)
    .bind(SEARCH_LIMIT)
    .fetch_all(pool)
    .await?;

    hydrate(pool, rows, StoreQueryOptions::default()).await
}

/// Stores within `NEAR_MAX_DISTANCE_METRES` of the point, nearest first.
///
/// The (lat, lng) index narrows candidates to a bounding box; the exact
/// great-circle distance decides membership and order.
pub async fn near(pool: &SqlitePool, lng: f64, lat: f64) -> Result<Vec<NearbyStore>, AppError> {
    let bounds = BoundingBox::around(lng, lat, NEAR_MAX_DISTANCE_METRES);

    let rows = sqlx::query_as::<_, StoreRow>(&format!(
        r#"
        SELECT {} FROM stores s
        WHERE s.lat BETWEEN $1 AND $2 AND s.lng BETWEEN $3 AND $4
        "#,
        STORE_COLUMNS
    ))
    .bind(bounds.min_lat)
    .bind(bounds.max_lat)
    .bind(bounds.min_lng)
    .bind(bounds.max_lng)
    .fetch_all(pool)
    .await?;

    let mut scored: Vec<(f64, StoreRow)> = rows
        .into_iter()
        .map(|row| (haversine_metres((lng, lat), (row.lng, row.lat)), row))
        .filter(|(distance, _)| *distance <= NEAR_MAX_DISTANCE_METRES)
        .collect();

    scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.id.cmp(&b.1.id)));

    Ok(scored
        .into_iter()
        .take(NEAR_LIMIT)
        .map(|(_, row)| NearbyStore {
            id: row.id,
            slug: row.slug,
            name: row.name,
            description: row.description,
            location: Location::point(row.lng, row.lat, row.address),
            photo: row.photo,
        })
        .collect())
}

async fn first_hydrated(
    pool: &SqlitePool,
    row: Option<StoreRow>,
    options: StoreQueryOptions,
) -> Result<Option<Store>, AppError> {
    match row {
        Some(row) => Ok(hydrate(pool, vec![row], options).await?.into_iter().next()),
        None => Ok(None),
    }
}

/// Turns rows into stores with their tags, plus whatever `options` asks for.
/// Each relation costs one batched query regardless of the number of rows.
pub(crate) async fn hydrate(
    pool: &SqlitePool,
    rows: Vec<StoreRow>,
    options: StoreQueryOptions,
) -> Result<Vec<Store>, AppError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut tags = tags_for(pool, &ids).await?;

    let mut reviews_by_store = if options.include_reviews {
        Some(reviews::for_stores(pool, &ids).await?)
    } else {
        None
    };

    let authors = if options.include_author {
        let mut author_ids: Vec<i64> = rows.iter().map(|r| r.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        users::authors_by_ids(pool, &author_ids).await?
    } else {
        HashMap::new()
    };

    Ok(rows
        .into_iter()
        .map(|row| {
            let id = row.id;
            let author_id = row.author_id;
            let mut store = Store::from(row);
            store.tags = tags.remove(&id).unwrap_or_default();
            if let Some(by_store) = reviews_by_store.as_mut() {
                store.reviews = Some(by_store.remove(&id).unwrap_or_default());
            }
            if options.include_author {
                store.author = authors.get(&author_id).cloned();
            }
            store
        })
        .collect())
}

async fn tags_for(pool: &SqlitePool, ids: &[i64]) -> Result<HashMap<i64, Vec<String>>, AppError> {
    let mut query_builder =
        QueryBuilder::<Sqlite>::new("SELECT store_id, tag FROM store_tags WHERE store_id IN (");
    let mut separated = query_builder.separated(",");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY store_id, rowid");

    let pairs: Vec<(i64, String)> = query_builder.build_query_as().fetch_all(pool).await?;

    let mut tags: HashMap<i64, Vec<String>> = HashMap::new();
    for (store_id, tag) in pairs {
        tags.entry(store_id).or_default().push(tag);
    }
    Ok(tags)
}
