//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch driver, route table, HTTP boundary produce:
//!     → logging.rs (structured log events, resolver traces)
//!     → metrics.rs (dispatch outcomes, latency, route table size)
//!
//! Consumers:
//!     → Log aggregation (stderr, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows into every log line of a request
//! - Metrics are cheap (atomic increments); recording works with or without
//!   an installed exporter

pub mod logging;
pub mod metrics;
