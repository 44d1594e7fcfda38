// idsdash-api: Async Rust client for the IDS dashboard backend (REST + server-sent events)

pub mod auth;
pub mod client;
mod endpoints;
pub mod error;
pub mod events;
pub mod models;
pub mod query;
pub mod transport;

pub use auth::{AuthMode, KeyValueStore, MemoryStore, TokenStore};
pub use client::ApiClient;
pub use endpoints::DEFAULT_BACKUP_NAME;
pub use error::Error;
pub use events::{EventSource, PushFrame, PushMessage, PushStatus, ReconnectConfig};
pub use query::{LogFilter, QueryParams};
pub use transport::{TlsMode, TransportConfig};
