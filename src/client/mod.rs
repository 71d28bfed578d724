//! Client-side counterpart of the server: a typed API client, a normalized
//! state store and waveform helpers.

pub mod api;
pub mod store;
pub mod waveform;

pub use api::{ApiClient, AuthSession, ClientError, ClientResult};
pub use store::{AuthState, ClientStore, FetchKey, RequestGenerations, Ticket};
