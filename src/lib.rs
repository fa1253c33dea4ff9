pub mod config;
pub mod db;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use models::asset::AssetKind;
use services::auth::RefreshTokenValidator;
use services::email::EmailService;
use services::store::TokenStore;
use services::tokens::TokenCodec;

/// Application state shared across all handlers. Constructed once at startup
/// and torn down with the process; the store and the refresh-token validator
/// are injected here, never reached through globals.
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub store: TokenStore,
    pub codec: TokenCodec,
    pub validator: Arc<dyn RefreshTokenValidator>,
    pub config: Arc<Config>,
    pub email: Option<Arc<EmailService>>,
}

/// Assembles the full route table. Lives in the library so integration tests
/// can drive the router directly with `tower::ServiceExt`.
pub fn build_router(state: AppState) -> Router {
    let cors_origin = {
        let frontend = state.config.frontend_url.clone();
        AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            let Ok(o) = origin.to_str() else { return false };
            o == frontend || o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1")
        })
    };
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_origin(cors_origin);

    Router::new()
        .route("/health", get(routes::health::health_check))
        // Auth — user variant at the root, CMS admin variant under /cms.
        .route("/login", post(routes::auth::login_user))
        .route("/refresh-token", post(routes::auth::refresh_user))
        .route("/logout", post(routes::auth::logout))
        .route("/register", post(routes::auth::register_user))
        .route("/protected", get(routes::auth::protected_user))
        .route("/cms/login", post(routes::auth::login_admin))
        .route("/cms/refresh-token", post(routes::auth::refresh_admin))
        .route("/cms/logout", post(routes::auth::logout))
        .route("/cms/register", post(routes::auth::register_admin))
        .route("/cms/protected", get(routes::auth::protected_admin))
        // Profile & password flows.
        .route(
            "/users/me",
            get(routes::users::get_profile)
                .put(routes::users::update_profile)
                .delete(routes::users::delete_account),
        )
        .route("/users/me/password", put(routes::users::update_password))
        .route("/users/remind-password", post(routes::users::remind_password))
        .route(
            "/users/renew-password/{id}",
            post(routes::users::renew_password),
        )
        // Narrative assets — four resources, one handler set.
        .nest("/acts", routes::assets::router(AssetKind::Act))
        .nest("/scenes", routes::assets::router(AssetKind::Scene))
        .nest("/characters", routes::assets::router(AssetKind::Character))
        .nest("/sceneries", routes::assets::router(AssetKind::Scenery))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
