//! Resource dispatch library.
//!
//! Requests walk a graph of nodes, each consuming part of the path and
//! binding it to a named attribute before handing over to its successor.
//! The same graph is enumerated once at startup to build the reverse
//! mapping from resource ids to URLs.

pub mod config;
pub mod demo;
pub mod dispatch;
pub mod enumerate;
pub mod http;
pub mod observability;
pub mod resources;

pub use config::schema::AppConfig;
pub use dispatch::{DispatchContext, GraphBuilder, NodeGraph, NodeId};
pub use enumerate::RouteTable;
pub use http::HttpServer;
