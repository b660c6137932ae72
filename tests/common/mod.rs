// tests/common/mod.rs

#![allow(dead_code)]

use std::{
    path::PathBuf,
    str::FromStr,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use storefront::{
    config::{Config, MailConfig},
    error::AppError,
    mail::{MailMessage, Mailer},
    routes,
    state::AppState,
};

/// Base URL the test app puts in outgoing links.
pub const PUBLIC_URL: &str = "http://storefront.test";

/// Records every message instead of delivering it.
#[derive(Default)]
pub struct CapturingMailer {
    pub sent: Mutex<Vec<MailMessage>>,
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send(&self, message: MailMessage) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub mailer: Arc<CapturingMailer>,
    pub uploads_dir: PathBuf,
    pub client: reqwest::Client,
}

/// Spawns the app on a random port against a fresh in-memory database.
pub async fn spawn_app() -> TestApp {
    // A single connection that never expires keeps the in-memory database alive.
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let uploads_dir = std::env::temp_dir().join(format!("storefront-test-{}", uuid::Uuid::new_v4()));

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        uploads_dir: uploads_dir.to_string_lossy().into_owned(),
        public_url: PUBLIC_URL.to_string(),
        mail: MailConfig::default(),
    };

    let mailer = Arc::new(CapturingMailer::default());

    let state = AppState {
        pool: pool.clone(),
        config,
        mailer: mailer.clone(),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        address,
        pool,
        mailer,
        uploads_dir,
        client,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers a user with a unique email and returns `(token, user_id, email)`.
    pub async fn register(&self, name: &str) -> (String, i64, String) {
        let email = format!("{}_{}@example.com", name.to_lowercase(), &uuid::Uuid::new_v4().to_string()[..8]);
        let response = self
            .client
            .post(self.url("/register"))
            .json(&serde_json::json!({
                "name": name,
                "email": email,
                "password": "password123",
                "password_confirm": "password123"
            }))
            .send()
            .await
            .expect("Register failed");
        assert_eq!(response.status().as_u16(), 201);

        let body = response.json::<serde_json::Value>().await.unwrap();
        let token = body["token"].as_str().unwrap().to_string();
        let id = body["user"]["id"].as_i64().unwrap();
        (token, id, email)
    }

    /// Minimal valid store form.
    pub fn store_form(name: &str, lng: f64, lat: f64) -> reqwest::multipart::Form {
        reqwest::multipart::Form::new()
            .text("name", name.to_string())
            .text("description", format!("All about {}", name))
            .text("location[address]", "1 Main Street")
            .text("location[coordinates][0]", lng.to_string())
            .text("location[coordinates][1]", lat.to_string())
    }

    pub async fn post_store(&self, token: &str, form: reqwest::multipart::Form) -> reqwest::Response {
        self.client
            .post(self.url("/add"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .expect("Create store failed")
    }

    /// Creates a store and returns its JSON.
    pub async fn create_store(&self, token: &str, form: reqwest::multipart::Form) -> serde_json::Value {
        let response = self.post_store(token, form).await;
        assert_eq!(response.status().as_u16(), 201);
        let body = response.json::<serde_json::Value>().await.unwrap();
        body["store"].clone()
    }

    pub async fn review(&self, token: &str, store_id: i64, rating: i64) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/reviews/{}", store_id)))
            .bearer_auth(token)
            .json(&serde_json::json!({ "rating": rating, "text": "Lovely place" }))
            .send()
            .await
            .expect("Review failed")
    }

    pub async fn get_json(&self, path: &str) -> serde_json::Value {
        self.client
            .get(self.url(path))
            .send()
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap()
    }
}
