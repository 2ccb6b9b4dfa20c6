//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     GraphBuilder (leaves first, then the nodes forwarding to them)
//!     → build(): check successor ids and resource ids
//!     → NodeGraph (immutable, shared via Arc)
//!
//! Per request:
//!     PathCursor (segments of the request path)
//!     → DispatchContext (cursor + attributes + response sink + URL mapper)
//!     → graph.rs: for each node
//!         consume (nothing | one segment | all remaining) and bind
//!         → leaf: require a fully consumed path, run handler
//!         → delegator / folder: run handler, forward unless handled,
//!           run post-dispatch hook on every exit path
//!     → Handled | NotFound | Rejected | Fatal
//! ```
//!
//! # Design Decisions
//! - Node variants are data (`NodeKind`), behaviour is the driver's
//! - Per-request state is never shared; the graph is never mutated
//! - `NotFound` is a request outcome; `DuplicateBinding` is a defect

pub mod context;
pub mod cursor;
pub mod error;
pub mod graph;
pub mod node;

pub use context::{Binding, DispatchContext, ResponseSink, UrlMapper};
pub use cursor::PathCursor;
pub use error::{DispatchError, DispatchResult, GraphError, MapError};
pub use graph::{GraphBuilder, NodeGraph, NodeId, RequestState};
pub use node::{handler_fn, Flow, Handler, Node, NodeKind, Pass};
