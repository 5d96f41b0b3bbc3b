//! Business logic services.
//!
//! The reviewer assignment engine lives in [`pr_service`], built from the
//! pure pieces in [`candidates`] and [`reassignment`]. The HTTP layer in
//! [`api`] only talks to the services bundled in [`App`].

pub mod api;
pub mod candidates;
pub mod clock;
pub mod pr_service;
pub mod reassignment;
pub mod server;
pub mod stats_service;
pub mod team_service;
pub mod user_service;

pub use candidates::{RandomSelector, ReviewerSelector, SeededSelector};
pub use clock::{Clock, FixedClock, SystemClock};
pub use pr_service::{PullRequestService, Reassignment};
pub use stats_service::StatsService;
pub use team_service::TeamService;
pub use user_service::UserService;

use crate::db::SqliteStore;
use std::sync::Arc;

/// All services, sharing one store, selector and clock.
#[derive(Clone)]
pub struct App {
    pub pull_requests: PullRequestService,
    pub teams: TeamService,
    pub users: UserService,
    pub stats: StatsService,
}

impl App {
    pub fn new(
        store: SqliteStore,
        selector: Arc<dyn ReviewerSelector>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = Arc::new(store);
        Self {
            pull_requests: PullRequestService::new(
                store.clone(),
                store.clone(),
                selector,
                clock.clone(),
            ),
            teams: TeamService::new(store.clone(), clock.clone()),
            users: UserService::new(store.clone(), store.clone(), clock),
            stats: StatsService::new(store),
        }
    }
}
