//! Storage access, one module per collection plus the read-only rollups.
//!
//! Related records are never loaded implicitly: callers say what they need
//! through `StoreQueryOptions`, so the I/O cost of a query is visible at the
//! call site.

pub mod aggregation;
pub mod reviews;
pub mod stores;
pub mod users;

/// Which relations to load alongside a store.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreQueryOptions {
    /// Attach the store's reviews, each with its author expanded.
    pub include_reviews: bool,
    /// Attach the owning user record.
    pub include_author: bool,
}

impl StoreQueryOptions {
    /// Everything the store detail page shows.
    pub const DETAIL: Self = Self {
        include_reviews: true,
        include_author: true,
    };
}
