use anyhow::Context;
use axum::{http::Method, Extension};
use club_hub::{
    auth::ensure_jwt_secret_is_valid,
    store::{Store, StoreKind},
};
use envconfig::Envconfig;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

#[derive(Envconfig)]
struct Config {
    #[envconfig(from = "DATABASE_URL")]
    pub db_url: Option<String>,
    #[envconfig(from = "STORE", default = "postgres")]
    pub store: StoreKind,
    #[envconfig(from = "PORT", default = "8080")]
    pub port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::init_from_env().context("failed to read configuration")?;
    ensure_jwt_secret_is_valid();

    let store = Store::connect(config.store, config.db_url.as_deref())?;
    tracing::info!(store = ?config.store, port = config.port, "starting club hub");

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .allow_origin(Any);
    let app = club_hub::app()
        .layer(Extension(store))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    axum::Server::bind(&([0, 0, 0, 0], config.port).into())
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
