//! Identity store: user records, heart sets and reset tokens.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    error::{AppError, is_unique_violation},
    models::user::{Author, User},
};

const USER_COLUMNS: &str =
    "id, email, name, password, reset_password_token, reset_password_expires, created_at";

/// Inserts a new user. A taken email is a `Conflict`.
pub async fn create(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (email, name, password, created_at) VALUES ($1, $2, $3, $4) RETURNING {}",
        USER_COLUMNS
    ))
    .bind(email)
    .bind(name)
    .bind(password_hash)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Email '{}' is already registered", email))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE email = $1",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Public author records for the given ids, in one query.
pub async fn authors_by_ids(pool: &SqlitePool, ids: &[i64]) -> Result<HashMap<i64, Author>, AppError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query_builder = QueryBuilder::<Sqlite>::new("SELECT id, name FROM users WHERE id IN (");
    let mut separated = query_builder.separated(",");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let authors: Vec<Author> = query_builder.build_query_as().fetch_all(pool).await?;
    Ok(authors.into_iter().map(|a| (a.id, a)).collect())
}

/// Loads a user together with the ids of the stores they hearted.
pub async fn find_with_hearts(pool: &SqlitePool, id: i64) -> Result<Option<User>, AppError> {
    let Some(mut user) = find_by_id(pool, id).await? else {
        return Ok(None);
    };
    user.hearts = hearts_of(pool, id).await?;
    Ok(Some(user))
}

/// Updates name and email only.
pub async fn update_profile(
    pool: &SqlitePool,
    id: i64,
    name: &str,
    email: &str,
) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET name = $1, email = $2 WHERE id = $3 RETURNING {}",
        USER_COLUMNS
    ))
    .bind(name)
    .bind(email)
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Email '{}' is already registered", email))
        } else {
            AppError::from(e)
        }
    })?
    .ok_or(AppError::NotFound("User not found".to_string()))
}

/// Ids of the stores a user has hearted, oldest store first.
pub async fn hearts_of(pool: &SqlitePool, user_id: i64) -> Result<Vec<i64>, AppError> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT store_id FROM hearts WHERE user_id = $1 ORDER BY store_id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// Hearts the store if it is not in the user's set, un-hearts it otherwise.
///
/// Both branches run in one transaction: the delete decides which way the
/// toggle goes, so there is no separate read that a concurrent request could
/// invalidate. Returns the user with the updated heart set.
pub async fn toggle_heart(pool: &SqlitePool, user_id: i64, store_id: i64) -> Result<User, AppError> {
    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM hearts WHERE user_id = $1 AND store_id = $2")
        .bind(user_id)
        .bind(store_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if removed == 0 {
        sqlx::query("INSERT OR IGNORE INTO hearts (user_id, store_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(store_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::debug!(user_id, store_id, hearted = removed == 0, "Toggled heart");

    find_with_hearts(pool, user_id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))
}

/// Moves the user to the pending-reset state.
pub async fn set_reset_token(
    pool: &SqlitePool,
    user_id: i64,
    token: &str,
    expires_at: i64,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE users SET reset_password_token = $1, reset_password_expires = $2 WHERE id = $3",
    )
    .bind(token)
    .bind(expires_at)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// The user holding `token`, if it has not expired at `now_ms`.
pub async fn find_by_reset_token(
    pool: &SqlitePool,
    token: &str,
    now_ms: i64,
) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE reset_password_token = $1 AND reset_password_expires > $2",
        USER_COLUMNS
    ))
    .bind(token)
    .bind(now_ms)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Consumes a live reset token: sets the new credential and clears token and
/// expiry in the same conditional update.
///
/// `None` means no user holds a non-expired `token`; nothing was changed.
pub async fn consume_reset_token(
    pool: &SqlitePool,
    token: &str,
    now_ms: i64,
    password_hash: &str,
) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET password = $1, reset_password_token = NULL, reset_password_expires = NULL
        WHERE reset_password_token = $2 AND reset_password_expires > $3
        RETURNING {}
        "#,
        USER_COLUMNS
    ))
    .bind(password_hash)
    .bind(token)
    .bind(now_ms)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}
