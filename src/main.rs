use std::sync::Arc;

mod app;
mod auth;
mod buses;
mod config;
mod error;
mod mail;
mod seed;
mod state;
#[cfg(test)]
mod testing;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "smartbus=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);
    let db = state::connect(&config.database_url).await?;

    sqlx::migrate!("./migrations").run(&db).await?;

    if std::env::args().nth(1).as_deref() == Some("seed") {
        return seed::run(&db).await;
    }

    let state = AppState::from_pool(db, config.clone())?;
    app::serve(app::build_app(state), &config.host, config.port).await
}
