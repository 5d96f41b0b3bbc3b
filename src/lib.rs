//! Reviewer Service - assigns pull request reviewers across teams.
//!
//! Reviewers are picked at random from the author's active teammates,
//! swapped one at a time on request, and repaired in bulk when a whole
//! team is deactivated. State lives in SQLite; the service is exposed over
//! a small JSON HTTP API.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

use config::Config;
use error::AppError;
use services::{App, RandomSelector, SystemClock};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Open the database, build the services and serve HTTP until `shutdown`
/// is cancelled.
pub async fn run(config: Config, shutdown: CancellationToken) -> Result<(), AppError> {
    let pool = db::initialize(&config.database.path, config.database.max_connections).await?;
    log::info!(
        "[db] Opened {} (max {} connections)",
        config.database.path.display(),
        config.database.max_connections
    );

    let app = App::new(
        db::SqliteStore::new(pool.clone()),
        Arc::new(RandomSelector),
        Arc::new(SystemClock),
    );

    let listener = services::server::bind(&config.server.addr).await?;
    services::server::serve(listener, app, shutdown).await?;

    pool.close().await;
    Ok(())
}
