// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Stores shown per page on the feed.
pub const STORES_PER_PAGE: i64 = 4;

/// Lifetime of a password reset token, in seconds.
pub const RESET_TOKEN_TTL_SECS: i64 = 3600;

/// Maximum results returned by the full-text search endpoint.
pub const SEARCH_LIMIT: i64 = 5;

/// Maximum results returned by the map endpoint.
pub const NEAR_LIMIT: usize = 10;

/// Radius of the map endpoint, in metres.
pub const NEAR_MAX_DISTANCE_METRES: f64 = 10_000.0;

/// Size of the top-rated list.
pub const TOP_STORES_LIMIT: i64 = 10;

/// Uploaded photos are resized to this width.
pub const PHOTO_WIDTH: u32 = 800;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: String,
    pub uploads_dir: String,
    /// Externally visible base URL, used for links in outgoing mail.
    pub public_url: String,
    pub mail: MailConfig,
}

/// SMTP settings. Mail is only sent when `host` is set.
#[derive(Debug, Clone, Default)]
pub struct MailConfig {
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub from: String,
}

impl MailConfig {
    pub fn is_configured(&self) -> bool {
        self.host.is_some()
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://storefront.db?mode=rwc".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:7777".to_string());

        let uploads_dir = env::var("UPLOADS_DIR")
            .unwrap_or_else(|_| "public/uploads".to_string());

        let public_url = env::var("PUBLIC_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| "http://localhost:7777".to_string());

        let mail = MailConfig {
            host: env::var("MAIL_HOST").ok().filter(|h| !h.is_empty()),
            port: env::var("MAIL_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(587),
            user: env::var("MAIL_USER").ok(),
            pass: env::var("MAIL_PASS").ok(),
            from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "Storefront <noreply@storefront.local>".to_string()),
        };

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            uploads_dir,
            public_url,
            mail,
        }
    }
}
