use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    auth::repo::{PgUserRepo, UserRepo},
    buses::repo::{BusRepo, PgBusRepo},
    config::AppConfig,
    mail::{mailer_from_config, Mailer},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub buses: Arc<dyn BusRepo>,
    pub mailer: Arc<dyn Mailer>,
}

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to postgres")
}

impl AppState {
    /// Wires the Postgres repositories and the configured mail transport.
    pub fn from_pool(db: PgPool, config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let mailer = mailer_from_config(&config.mail)?;
        Ok(Self::from_parts(
            config,
            Arc::new(PgUserRepo::new(db.clone())),
            Arc::new(PgBusRepo::new(db)),
            mailer,
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRepo>,
        buses: Arc<dyn BusRepo>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            config,
            users,
            buses,
            mailer,
        }
    }
}
