use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fabula_api::config::{Config, RefreshTokenMode};
use fabula_api::services::auth::{RefreshTokenValidator, StatefulValidator, StatelessValidator};
use fabula_api::services::email::EmailService;
use fabula_api::services::store::TokenStore;
use fabula_api::services::tokens::TokenCodec;
use fabula_api::{build_router, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let store = match &config.redis_url {
        Some(url) => {
            let store = TokenStore::connect_redis(url).await?;
            info!("Redis token store connected");
            store
        }
        None => {
            info!("REDIS_URL not set — using the in-process token store (single instance only)");
            TokenStore::memory()
        }
    };

    let codec = TokenCodec::new(
        &config.access_token_secret,
        &config.refresh_token_secret,
        config.access_token_ttl_seconds,
        config.refresh_token_ttl_seconds,
    );

    let validator: Arc<dyn RefreshTokenValidator> = match config.refresh_token_mode {
        RefreshTokenMode::Stateful => {
            info!("Refresh tokens: stateful (server-side records)");
            Arc::new(StatefulValidator::new(store.clone(), codec.clone()))
        }
        RefreshTokenMode::Stateless => {
            info!("Refresh tokens: stateless (signature + denylist)");
            Arc::new(StatelessValidator::new(store.clone(), codec.clone()))
        }
    };

    let email = EmailService::new(&config).map(Arc::new);
    if email.is_some() {
        info!("SMTP email service configured");
    } else {
        info!("SMTP not configured — password-reset email disabled");
    }

    let state = AppState {
        db: pool,
        store,
        codec,
        validator,
        config: config.clone(),
        email,
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Fabula API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
