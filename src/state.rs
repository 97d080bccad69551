use std::sync::Arc;

use crate::config::Config;
use crate::db::SharedRepository;
use crate::models::user::User;

/// Shared state handed to every handler via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Data-access handle; handlers pass it down explicitly.
    pub repo: SharedRepository,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(repo: SharedRepository, config: Config) -> Self {
        Self {
            repo,
            config: Arc::new(config),
        }
    }

    /// Staff accounts and configured privileged usernames carry the admin claim.
    pub fn is_admin(&self, user: &User) -> bool {
        user.is_staff || self.config.privileged_usernames.contains(&user.username)
    }
}
