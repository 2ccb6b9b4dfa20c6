//! Route table listing.

use crate::dispatch::context::DispatchContext;
use crate::dispatch::error::DispatchResult;
use crate::dispatch::node::{Flow, Handler};

/// Serve the text rendition of the URL mapper, one resource per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteListing;

impl Handler for RouteListing {
    fn handle(&self, ctx: &mut DispatchContext<'_>) -> DispatchResult<Flow> {
        let mut body = ctx.mapper().render().join("\n");
        body.push('\n');

        let response = ctx.response();
        response.set_content_type("text/plain; charset=utf-8");
        response.write(body.as_bytes());
        Ok(Flow::Handled)
    }

    fn describe(&self) -> Option<&str> {
        Some("Lists every resource served by this application.")
    }
}
