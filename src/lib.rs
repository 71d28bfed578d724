//! Wavenote Server Library
//!
//! Collaborative music feedback: projects, songs, numbered versions and
//! comments pinned to a moment in a version's audio. This library exposes the
//! internal modules for the binary, the end-to-end tests and client code.

pub mod client;
pub mod config;
pub mod error;
pub mod library;
pub mod server;
pub mod sqlite_persistence;
pub mod user;

// Re-export commonly used types for convenience
pub use error::{AppError, AppResult};
pub use library::{LibraryManager, SqliteLibraryStore};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
pub use sqlite_persistence::{DbPool, MigrationRunner, PoolConfig};
pub use user::{AuthManager, SqliteUserStore, TokenIssuer};
