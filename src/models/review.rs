use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::user::Author;

/// Represents the 'reviews' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub author_id: i64,
    pub store_id: i64,
    pub rating: i64,
    pub text: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A review with its author record expanded. Every review read returns this shape.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewWithAuthor {
    #[serde(flatten)]
    pub review: Review,
    pub author: Author,
}

/// DTO for posting a review.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub rating: i64,

    #[validate(length(
        min = 1,
        max = 2000,
        message = "Your review must have text"
    ))]
    pub text: String,
}
