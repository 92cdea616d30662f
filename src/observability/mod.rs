//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! net / datasource produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (query counters and latency histograms)
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
