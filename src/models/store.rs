// src/models/store.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{
    models::{review::ReviewWithAuthor, user::Author},
    utils::slug::slugify,
};

/// Tags offered by the store form. Any other non-empty tag is accepted too.
pub const SUGGESTED_TAGS: [&str; 5] = [
    "Wifi",
    "Open Late",
    "Family Friendly",
    "Vegetarian",
    "Licensed",
];

/// Represents the 'stores' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct StoreRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub lng: f64,
    pub lat: f64,
    pub address: String,
    pub photo: Option<String>,
    pub author_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// GeoJSON-style point plus a street address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
    pub address: String,
}

impl Location {
    pub fn point(lng: f64, lat: f64, address: String) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [lng, lat],
            address,
        }
    }
}

/// A store with its tags, and optionally its author and reviews.
#[derive(Debug, Clone, Serialize)]
pub struct Store {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub tags: Vec<String>,
    pub location: Location,
    pub photo: Option<String>,
    pub author_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Loaded only with `StoreQueryOptions::include_author`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,

    /// Loaded only with `StoreQueryOptions::include_reviews`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<ReviewWithAuthor>>,
}

impl From<StoreRow> for Store {
    fn from(row: StoreRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            tags: Vec::new(),
            location: Location::point(row.lng, row.lat, row.address),
            photo: row.photo,
            author_id: row.author_id,
            created_at: row.created_at,
            author: None,
            reviews: None,
        }
    }
}

/// Fields of the add/edit store form, collected from the multipart body.
#[derive(Debug, Default, Validate)]
pub struct StoreForm {
    #[validate(
        length(min = 1, max = 100, message = "Please enter a store name"),
        custom(function = validate_sluggable)
    )]
    pub name: String,

    #[validate(length(max = 5000))]
    pub description: String,

    #[validate(custom(function = validate_tags))]
    pub tags: Vec<String>,

    #[validate(length(min = 1, max = 200, message = "You must supply an address!"))]
    pub address: String,

    #[validate(
        required(message = "You must supply coordinates"),
        range(min = -180.0, max = 180.0)
    )]
    pub lng: Option<f64>,

    #[validate(
        required(message = "You must supply coordinates"),
        range(min = -90.0, max = 90.0)
    )]
    pub lat: Option<f64>,
}

impl StoreForm {
    /// Trimmed, de-duplicated tags in submission order.
    pub fn normalized_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for tag in &self.tags {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        tags
    }
}

/// The name must yield a non-empty slug.
fn validate_sluggable(name: &str) -> Result<(), validator::ValidationError> {
    if slugify(name).is_empty() {
        return Err(validator::ValidationError::new("name_has_no_letters_or_digits"));
    }
    Ok(())
}

fn validate_tags(tags: &[String]) -> Result<(), validator::ValidationError> {
    for tag in tags {
        if tag.trim().len() > 50 {
            return Err(validator::ValidationError::new("tag_too_long"));
        }
    }
    Ok(())
}

/// One row of the tag rollup.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}

/// A store scored by its reviews. Only stores with two or more reviews qualify.
#[derive(Debug, Clone, Serialize)]
pub struct TopStore {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub photo: Option<String>,
    pub reviews: Vec<ReviewWithAuthor>,
    pub average_rating: f64,
}

/// Projection returned by the map endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyStore {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub location: Location,
    pub photo: Option<String>,
}

/// Query parameters for the search endpoint.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// Query parameters for the map endpoint.
#[derive(Debug, Deserialize)]
pub struct NearParams {
    pub lng: f64,
    pub lat: f64,
}
