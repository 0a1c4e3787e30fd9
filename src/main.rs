use anyhow::Context;
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::sync::Arc;
use taskboard_rest::{SharedData, api, app_env, logging, persistence, security};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let env_filter = logging::init_env_filter();
    let otel_exporters = logging::try_init_exporters();
    logging::setup_logging_and_tracing(env_filter, otel_exporters);

    let db_url = env::var(app_env::DB_URL)
        .with_context(|| format!("{} must point at the PostgreSQL database", app_env::DB_URL))?;
    let jwt_secret = env::var(app_env::JWT_SECRET)
        .with_context(|| format!("{} is required to sign bearer tokens", app_env::JWT_SECRET))?;
    let port: u16 = env::var(app_env::PORT)
        .ok()
        .and_then(|raw_port| raw_port.parse().ok())
        .unwrap_or(3000);

    let db_pool = PgPoolOptions::new()
        .max_connections(16)
        .connect(&db_url)
        .await
        .context("connecting to the database")?;

    let shared_data = Arc::new(SharedData {
        ext_cxn: persistence::ExternalConnectivity::new(db_pool),
        tokens: security::TokenAuthority::new(&jwt_secret),
    });
    let router = logging::attach_tracing_http(api::router()).with_state(shared_data);

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("binding port {port}"))?;
    info!("Starting server on port {port}.");
    axum::serve(listener, router)
        .await
        .context("serving the API")?;

    Ok(())
}
