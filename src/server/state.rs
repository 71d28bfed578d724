use axum::extract::FromRef;

use crate::library::LibraryManager;
use crate::user::AuthManager;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedAuthManager = Arc<AuthManager>;
pub type GuardedLibraryManager = Arc<LibraryManager>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub auth_manager: GuardedAuthManager,
    pub library_manager: GuardedLibraryManager,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        auth_manager: GuardedAuthManager,
        library_manager: GuardedLibraryManager,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            auth_manager,
            library_manager,
        }
    }
}

impl FromRef<ServerState> for GuardedAuthManager {
    fn from_ref(input: &ServerState) -> Self {
        input.auth_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedLibraryManager {
    fn from_ref(input: &ServerState) -> Self {
        input.library_manager.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
