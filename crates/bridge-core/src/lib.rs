pub mod cache;
pub mod config;
pub mod error;
pub mod event_bus;
pub mod shared;
pub mod snapshot;

pub const DEFAULT_EVENT_BUFFER: usize = 256;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_LOG_RETENTION_DAYS: u64 = 7;

pub use cache::*;
pub use config::*;
pub use error::*;
pub use event_bus::*;
pub use shared::*;
pub use snapshot::*;
