//! Observability: structured logging and process-wide metrics

pub mod logging;
pub mod metrics;

pub use logging::{init_default_logging, init_logging, init_logging_at, LogFormat};
pub use metrics::{metrics, MetricsCollector, MetricsSnapshot};
