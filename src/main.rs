mod config;
mod db;
mod engine;
mod error;
mod handlers;
mod middleware;
mod models;
mod quotes;
mod state;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use handlers::{
    change_password, deposit, get_history, get_portfolio, get_quote, login, place_order, register,
};
use quotes::QuoteClient;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let pool = db::create_pool(&config).await?;

    db::run_migrations(&pool).await?;

    let quotes = QuoteClient::new(config.quote_api_url.clone(), config.quote_api_key.clone());

    let state = AppState {
        pool,
        config: config.clone(),
        quotes,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/password", post(change_password))
        .route("/api/quote/:symbol", get(get_quote))
        .route("/api/portfolio", get(get_portfolio))
        .route("/api/history", get(get_history))
        .route("/api/orders", post(place_order))
        .route("/api/deposit", post(deposit))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> &'static str {
    "OK"
}
