pub mod auth;
pub mod auth_manager;
mod sqlite_user_store;
pub mod user_models;
mod user_store;
pub mod validation;

pub use auth::{Claims, TokenIssuer, WavenoteHasher};
pub use auth_manager::{AuthManager, AuthOutcome, AuthenticatedUser};
pub use sqlite_user_store::SqliteUserStore;
pub use user_models::{ProfileUpdate, PublicProfile, User, UserProfile};
pub use user_store::UserStore;
