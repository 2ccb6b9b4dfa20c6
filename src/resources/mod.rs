//! Stock node handlers.
//!
//! # Responsibilities
//! - Handlers most applications need: redirects, request logging,
//!   base-path removal, fixed bodies, binding validation
//! - A plain-text listing of the route table
//!
//! # Design Decisions
//! - Handlers only implement `Handler`; the node variant they are mounted
//!   on decides whether they act as leaves or delegators

pub mod listing;
pub mod misc;

pub use listing::RouteListing;
pub use misc::{LogRequests, Redirect, RemoveBase, StaticText, ValidateBinding};
