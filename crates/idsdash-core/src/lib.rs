// idsdash-core: Event stream fan-out, scan tracking and the dashboard facade

pub mod dashboard;
pub mod error;
pub mod event_stream;
pub mod push_event;
pub mod scan;

pub use dashboard::{DEFAULT_API_BASE, Dashboard, DashboardConfig};
pub use error::CoreError;
pub use event_stream::{
    EventStreamClient, Handler, PushConnection, PushConnector, SseConnector, StreamStatus,
    Subscription,
};
pub use push_event::{EventKind, PushEvent};
pub use scan::{ScanPollConfig, run_scan, wait_for_scan};

// Re-export the API crate for consumers that only depend on core.
pub use idsdash_api as api;
