//! Client, execution handle, and per-client counters.

pub mod core;
pub mod handle;
pub mod stats;

pub use self::core::HttpClient;
pub use handle::{Cancelled, ExecutionError, ExecutionHandle};
pub use stats::{ClientStats, ClientStatsSnapshot};
