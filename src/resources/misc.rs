//! General purpose handlers.

use crate::dispatch::context::DispatchContext;
use crate::dispatch::error::{DispatchError, DispatchResult};
use crate::dispatch::node::{Flow, Handler};

/// Redirect to a fixed resource, resolved through the request's URL mapper.
#[derive(Debug, Clone)]
pub struct Redirect {
    target: String,
    args: Vec<String>,
}

impl Redirect {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            args: Vec::new(),
        }
    }

    /// Positional arguments passed to the mapper.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl Handler for Redirect {
    fn handle(&self, ctx: &mut DispatchContext<'_>) -> DispatchResult<Flow> {
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        let url = ctx.map_url(&self.target, &args, &[])?;
        ctx.response().redirect(&url);
        Ok(Flow::Handled)
    }

    fn describe(&self) -> Option<&str> {
        Some("Redirects to a fixed resource.")
    }
}

/// Log a banner with the request URI, then let the chain continue.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRequests;

impl Handler for LogRequests {
    fn handle(&self, ctx: &mut DispatchContext<'_>) -> DispatchResult<Flow> {
        let line = format!("----------------------------- {}", ctx.cursor().uri());
        tracing::info!(uri = %ctx.cursor().uri(), "Request");
        ctx.response().log(&line);
        Ok(Flow::Continue)
    }
}

/// Drop a fixed number of leading segments before continuing.
#[derive(Debug, Clone, Copy)]
pub struct RemoveBase {
    count: usize,
}

impl RemoveBase {
    pub fn new(count: usize) -> Self {
        Self { count }
    }
}

impl Handler for RemoveBase {
    fn handle(&self, ctx: &mut DispatchContext<'_>) -> DispatchResult<Flow> {
        ctx.cursor_mut()
            .skip(self.count)
            .map_err(|_| DispatchError::NotFound {
                uri: ctx.cursor().uri().to_string(),
            })?;
        Ok(Flow::Continue)
    }
}

/// Serve a fixed body.
#[derive(Debug, Clone)]
pub struct StaticText {
    content_type: String,
    body: String,
    description: Option<String>,
}

impl StaticText {
    pub fn new(content_type: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            body: body.into(),
            description: None,
        }
    }

    pub fn plain(body: impl Into<String>) -> Self {
        Self::new("text/plain; charset=utf-8", body)
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Handler for StaticText {
    fn handle(&self, ctx: &mut DispatchContext<'_>) -> DispatchResult<Flow> {
        let response = ctx.response();
        response.set_content_type(&self.content_type);
        response.write(self.body.as_bytes());
        Ok(Flow::Handled)
    }

    fn describe(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Reject the request unless an already bound attribute passes `check`.
///
/// Meant as the local handler of a variable delegator: the segment has been
/// bound by the time the handler runs, and forwarding only happens on success.
pub struct ValidateBinding {
    name: String,
    status: u16,
    check: Box<dyn Fn(&str) -> bool + Send + Sync>,
}

impl ValidateBinding {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            status: 404,
            check: Box::new(check),
        }
    }

    /// Status used when the check fails (404 by default).
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Accept only non-empty ASCII digit strings.
    pub fn digits(name: impl Into<String>) -> Self {
        Self::new(name, |value| {
            !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
        })
    }
}

impl Handler for ValidateBinding {
    fn handle(&self, ctx: &mut DispatchContext<'_>) -> DispatchResult<Flow> {
        match ctx.get_str(&self.name) {
            Some(value) if (self.check)(value) => Ok(Flow::Continue),
            Some(value) => Err(DispatchError::rejected(
                self.status,
                format!("invalid value '{}' for '{}'", value, self.name),
            )),
            None => Err(DispatchError::rejected(
                self.status,
                format!("'{}' is not bound", self.name),
            )),
        }
    }
}

impl std::fmt::Debug for ValidateBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidateBinding")
            .field("name", &self.name)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
