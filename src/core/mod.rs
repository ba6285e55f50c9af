//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod connectivity;
pub mod debounce;
pub mod error;
pub mod fallback;
pub mod log;
pub mod provider;
pub mod rate;
pub mod resolver;

// Re-export main types for cleaner imports
pub use connectivity::{ConnectivityMonitor, ConnectivityState};
pub use error::RateError;
pub use provider::{HealthCheck, RateTableProvider};
pub use rate::{ConversionRequest, ConversionResult, DataSource, RateTable, convert, resolve_rate};
pub use resolver::{RateResolver, with_fallback};
