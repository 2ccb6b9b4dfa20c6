//! HTTP boundary.
//!
//! # Data Flow
//! ```text
//! Client Request
//!     → TraceLayer → request ID (set + propagate) → TimeoutLayer
//!     → server.rs: strip root prefix, build PathCursor
//!     → spawn_blocking: DispatchContext + BufferedResponse walk the graph
//!     → response.rs: BufferedResponse → axum Response
//!     → outcome → status code (404 / rejection status / 500)
//! ```
//!
//! # Design Decisions
//! - One fallback route: the dispatch graph owns all routing
//! - Dispatch is synchronous; it never runs on the async worker threads
//! - A timed out request simply abandons its context

pub mod request;
pub mod response;
pub mod server;

pub use server::HttpServer;
