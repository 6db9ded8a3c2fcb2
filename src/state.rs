use std::sync::Arc;

use crate::auth::CredentialService;
use crate::config::Config;
use crate::store::{TaskStore, UserStore};
use crate::tasks::TaskService;

/// Shared application state, registered once as `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub credentials: CredentialService,
    pub users: Arc<dyn UserStore>,
    pub tasks: TaskService,
}

impl AppState {
    pub fn new(config: &Config, users: Arc<dyn UserStore>, tasks: Arc<dyn TaskStore>) -> Self {
        Self {
            credentials: CredentialService::from_config(config),
            users,
            tasks: TaskService::new(tasks, config.task_list_scope),
        }
    }
}
