// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Method,
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{account, api, auth, reviews, stores, tags},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Upper bound on request bodies, sized for a photo upload.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Assembles the main application router.
///
/// * Public views: feed, store pages, tags, top, map, login/register, password reset.
/// * Logged-in views: add/edit store, account, hearts, reviews.
/// * JSON API: search, map lookup, heart toggle.
/// * Applies global middleware (Trace, CORS) and serves uploaded photos.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let public_routes = Router::new()
        .route("/", get(stores::list_stores))
        .route("/stores", get(stores::list_stores))
        .route("/stores/page/{page}", get(stores::list_stores_page))
        .route("/store/{slug}", get(stores::get_store_by_slug))
        .route("/tags", get(tags::list_tags))
        .route("/tags/", get(tags::list_tags))
        .route("/tags/{tag}", get(tags::stores_by_tag))
        .route("/top", get(stores::top_stores))
        .route("/map", get(stores::map_page))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/register", get(auth::register_form).post(auth::register))
        .route("/logout", get(auth::logout))
        .route("/account/forgot", post(auth::forgot))
        .route(
            "/account/reset/{token}",
            get(auth::reset_form).post(auth::reset),
        )
        .route("/api/v1/search", get(api::search_stores))
        .route("/api/v1/stores/near", get(api::map_stores));

    let protected_routes = Router::new()
        .route("/add", get(stores::add_store_form).post(stores::create_store))
        .route("/add/{id}", post(stores::update_store))
        .route("/stores/{id}/edit", get(stores::edit_store))
        .route(
            "/account",
            get(account::account).post(account::update_account),
        )
        .route("/hearts", get(stores::hearted_stores))
        .route("/reviews/{store_id}", post(reviews::add_review))
        .route("/api/stores/{id}/heart", post(api::heart_store))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/uploads", ServeDir::new(&state.config.uploads_dir))
        // Global Middleware (applied from outside in)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
