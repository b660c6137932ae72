// src/handlers/stores.rs

use std::path::Path as FsPath;

use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::{Config, STORES_PER_PAGE},
    error::AppError,
    models::store::{SUGGESTED_TAGS, StoreForm},
    repository::{StoreQueryOptions, aggregation, stores},
    utils::{
        jwt::Claims,
        upload::{PhotoUpload, remove_photo, save_photo},
    },
};

/// Header carrying the informational notice on a pagination redirect.
pub const FLASH_INFO_HEADER: &str = "x-flash-info";

/// What to do with a requested feed page.
#[derive(Debug, PartialEq, Eq)]
pub enum PagePlan {
    Show { page: i64, pages: i64, offset: i64 },
    Redirect { last_page: i64 },
}

/// Decides between rendering `page` and sending the reader to the last page.
pub fn plan_page(page: i64, count: i64) -> PagePlan {
    let pages = (count + STORES_PER_PAGE - 1) / STORES_PER_PAGE;
    let last_page = pages.max(1);

    if page > last_page {
        PagePlan::Redirect { last_page }
    } else {
        PagePlan::Show {
            page,
            pages,
            offset: (page - 1) * STORES_PER_PAGE,
        }
    }
}

/// Feed, first page.
pub async fn list_stores(State(pool): State<SqlitePool>) -> Result<Response, AppError> {
    render_page(&pool, 1).await
}

/// Feed, given page. Pages past the end redirect to the last one.
pub async fn list_stores_page(
    State(pool): State<SqlitePool>,
    Path(page): Path<String>,
) -> Result<Response, AppError> {
    let page = page
        .parse::<i64>()
        .ok()
        .filter(|p| *p >= 1)
        .ok_or(AppError::BadRequest("Page must be a positive number".to_string()))?;

    render_page(&pool, page).await
}

async fn render_page(pool: &SqlitePool, page: i64) -> Result<Response, AppError> {
    let count = stores::count(pool).await?;

    match plan_page(page, count) {
        PagePlan::Redirect { last_page } => {
            let notice = format!(
                "You asked for page {}. But that doesn't exist, so you are on page {}.",
                page, last_page
            );
            tracing::info!("{}", notice);
            Ok((
                [(FLASH_INFO_HEADER, notice)],
                Redirect::to(&format!("/stores/page/{}", last_page)),
            )
                .into_response())
        }
        PagePlan::Show { page, pages, offset } => {
            let list = stores::list(pool, STORES_PER_PAGE, offset, StoreQueryOptions::default()).await?;
            Ok(Json(json!({
                "title": "Stores",
                "stores": list,
                "count": count,
                "page": page,
                "pages": pages,
            }))
            .into_response())
        }
    }
}

pub async fn add_store_form() -> impl IntoResponse {
    Json(json!({
        "title": "Add Store",
        "tags": SUGGESTED_TAGS,
    }))
}

/// Creates a store from the multipart form. The photo, if any, is resized and
/// written only after every field has been validated.
pub async fn create_store(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let author_id = claims.user_id();
    let (form, upload) = read_store_form(multipart).await?;
    form.validate()?;

    let photo = store_photo(&config, upload).await?;
    let store = stores::create(&pool, author_id, &form, photo.clone()).await;
    let store = discard_photo_on_error(&config, photo.as_deref(), store).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Successfully created {}. Care to leave a review?", store.name),
            "store": store,
        })),
    ))
}

/// Edit form; owner only.
pub async fn edit_store(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    confirm_owner(&pool, id, claims.user_id()).await?;

    let store = stores::find_by_id(&pool, id, StoreQueryOptions::default())
        .await?
        .ok_or(AppError::NotFound("Store not found".to_string()))?;

    Ok(Json(json!({
        "title": format!("Edit {}", store.name),
        "store": store,
        "tags": SUGGESTED_TAGS,
    })))
}

/// Applies an edit; owner only. Ownership is checked before the body is read.
pub async fn update_store(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    confirm_owner(&pool, id, claims.user_id()).await?;

    let (form, upload) = read_store_form(multipart).await?;
    form.validate()?;

    let photo = store_photo(&config, upload).await?;
    let store = stores::update(&pool, id, &form, photo.clone()).await;
    let store = discard_photo_on_error(&config, photo.as_deref(), store).await?;

    Ok(Json(json!({
        "message": format!("Successfully updated {}.", store.name),
        "store": store,
    })))
}

/// Public detail page, with author and reviews.
pub async fn get_store_by_slug(
    State(pool): State<SqlitePool>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let store = stores::find_by_slug(&pool, &slug, StoreQueryOptions::DETAIL)
        .await?
        .ok_or(AppError::NotFound("Store not found".to_string()))?;

    Ok(Json(json!({
        "title": format!("Welcome to {}", store.name),
        "store": store,
    })))
}

pub async fn map_page() -> impl IntoResponse {
    Json(json!({ "title": "Map" }))
}

/// Stores hearted by the current user.
pub async fn hearted_stores(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let list = stores::list_hearted(&pool, claims.user_id()).await?;

    Ok(Json(json!({
        "title": "Hearted Stores",
        "stores": list,
    })))
}

pub async fn top_stores(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let list = aggregation::top_stores(&pool).await?;

    Ok(Json(json!({
        "title": "Top Stores!",
        "stores": list,
    })))
}

/// Rejects the edit unless `user_id` owns the store.
pub fn ensure_owner(author_id: i64, user_id: i64) -> Result<(), AppError> {
    if author_id != user_id {
        return Err(AppError::Forbidden(
            "You must own a store in order to edit it!".to_string(),
        ));
    }
    Ok(())
}

async fn confirm_owner(pool: &SqlitePool, store_id: i64, user_id: i64) -> Result<(), AppError> {
    let author_id = stores::author_of(pool, store_id)
        .await?
        .ok_or(AppError::NotFound("Store not found".to_string()))?;

    ensure_owner(author_id, user_id).inspect_err(|_| {
        tracing::warn!("User {} tried to edit store {} owned by {}", user_id, store_id, author_id);
    })
}

async fn store_photo(config: &Config, upload: Option<PhotoUpload>) -> Result<Option<String>, AppError> {
    match upload {
        Some(upload) => Ok(Some(save_photo(FsPath::new(&config.uploads_dir), upload).await?)),
        None => Ok(None),
    }
}

/// A photo is written before its store row; if the row never lands, the file goes too.
async fn discard_photo_on_error<T>(
    config: &Config,
    photo: Option<&str>,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    if result.is_err() {
        if let Some(filename) = photo {
            tracing::warn!("Store write failed, discarding photo {}", filename);
            remove_photo(FsPath::new(&config.uploads_dir), filename).await;
        }
    }
    result
}

fn parse_coordinate(raw: &str) -> Result<Option<f64>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or(AppError::BadRequest(format!("Invalid coordinate '{}'", raw)))
}

/// Collects the store form fields from a multipart body.
///
/// Field names follow the HTML form: `location[address]`,
/// `location[coordinates][0]` (longitude) and `location[coordinates][1]`
/// (latitude). An empty `photo` part means no new photo. A non-image photo
/// fails here, before anything is written.
async fn read_store_form(
    mut multipart: Multipart,
) -> Result<(StoreForm, Option<PhotoUpload>), AppError> {
    let mut form = StoreForm::default();
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "photo" => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    upload = Some(PhotoUpload::new(content_type.as_deref(), bytes.to_vec())?);
                }
            }
            "name" => form.name = field.text().await?,
            "description" => form.description = field.text().await?,
            "tags" | "tags[]" => form.tags.push(field.text().await?),
            "location[address]" => form.address = field.text().await?,
            "location[coordinates][0]" => form.lng = parse_coordinate(&field.text().await?)?,
            "location[coordinates][1]" => form.lat = parse_coordinate(&field.text().await?)?,
            other => tracing::debug!("Ignoring unknown store form field '{}'", other),
        }
    }

    Ok((form, upload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_of_empty_catalog_is_shown() {
        assert_eq!(
            plan_page(1, 0),
            PagePlan::Show { page: 1, pages: 0, offset: 0 }
        );
    }

    #[test]
    fn pages_round_up() {
        assert_eq!(
            plan_page(2, 5),
            PagePlan::Show { page: 2, pages: 2, offset: 4 }
        );
        assert_eq!(
            plan_page(2, 8),
            PagePlan::Show { page: 2, pages: 2, offset: 4 }
        );
    }

    #[test]
    fn page_past_the_end_redirects_to_last() {
        assert_eq!(plan_page(99, 8), PagePlan::Redirect { last_page: 2 });
        assert_eq!(plan_page(3, 9), PagePlan::Show { page: 3, pages: 3, offset: 8 });
        assert_eq!(plan_page(2, 0), PagePlan::Redirect { last_page: 1 });
    }

    #[test]
    fn owner_check() {
        assert!(ensure_owner(7, 7).is_ok());
        assert!(matches!(ensure_owner(7, 8), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn coordinates_parse() {
        assert_eq!(parse_coordinate(" 2.35 ").unwrap(), Some(2.35));
        assert_eq!(parse_coordinate("").unwrap(), None);
        assert!(parse_coordinate("east").is_err());
        assert!(parse_coordinate("NaN").is_err());
    }
}
