// src/main.rs

use std::{str::FromStr, sync::Arc, time::Duration};

use dotenvy::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use storefront::config::Config;
use storefront::mail::{LogMailer, Mailer, SmtpMailer};
use storefront::routes;
use storefront::state::AppState;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .expect("DATABASE_URL is not a valid SQLite URL")
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(connect_options)
        .await
        .expect("Failed to open the database");

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    if let Err(e) = tokio::fs::create_dir_all(&config.uploads_dir).await {
        tracing::warn!("Could not create uploads dir {}: {}", config.uploads_dir, e);
    }

    let mailer: Arc<dyn Mailer> = if config.mail.is_configured() {
        match SmtpMailer::new(&config.mail) {
            Ok(mailer) => Arc::new(mailer),
            Err(e) => panic!("Invalid mail configuration: {}", e),
        }
    } else {
        tracing::warn!("MAIL_HOST not set, outgoing mail will only be logged");
        Arc::new(LogMailer)
    };

    let addr = config.bind_addr.clone();

    // Create AppState
    let state = AppState {
        pool,
        config,
        mailer,
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listening address");
    tracing::info!("Listening on {}", addr);

    // Start the server
    axum::serve(listener, app).await.expect("Server error");
}
