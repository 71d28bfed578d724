pub mod config;
mod http_layers;
mod json;
mod library_routes;
pub mod server;
mod session;
pub mod state;
mod user_routes;

pub use config::ServerConfig;
pub use http_layers::*;
pub use json::{MessageResponse, INTERNAL_SERVER_ERROR};
pub use server::{make_app, run_server};
pub use session::{Session, AUTHENTICATION_REQUIRED};
