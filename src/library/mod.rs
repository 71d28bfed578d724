mod manager;
mod models;
mod store;
mod trait_def;
pub mod validation;

pub use manager::{
    LibraryManager, FEEDBACK_NOT_FOUND, NO_VERSIONS, PROJECT_NOT_FOUND, SONG_NOT_FOUND,
    VERSION_NOT_FOUND,
};
pub use models::*;
pub use store::SqliteLibraryStore;
pub use trait_def::LibraryStore;
