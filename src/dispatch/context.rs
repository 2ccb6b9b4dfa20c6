//! Per-request dispatch context.
//!
//! # Responsibilities
//! - Own the request's `PathCursor`
//! - Accumulate attributes bound from path segments
//! - Hand nodes the response sink and the URL mapper
//!
//! # Design Decisions
//! - Attributes are append-only; rebinding a name is a fatal configuration error
//! - The duplicate check lives here, not in the individual nodes
//! - The context borrows the sink and mapper, it never outlives the request

use std::collections::BTreeMap;

use serde::Serialize;

use crate::dispatch::cursor::PathCursor;
use crate::dispatch::error::{DispatchError, DispatchResult, MapError};

/// A value bound from the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Binding {
    /// One segment.
    Single(String),
    /// Zero or more trailing segments, in path order.
    Many(Vec<String>),
}

impl Binding {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Binding::Single(value) => Some(value),
            Binding::Many(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Binding::Single(_) => None,
            Binding::Many(values) => Some(values),
        }
    }
}

/// Response primitives offered by the transport to node handlers.
pub trait ResponseSink {
    /// Mark the response as "not found".
    fn signal_not_found(&mut self);

    /// Write a diagnostic message to the server log.
    fn log(&mut self, message: &str);

    /// Answer with a redirect to `url`.
    fn redirect(&mut self, url: &str);

    /// Append bytes to the response body.
    fn write(&mut self, bytes: &[u8]);

    fn set_content_type(&mut self, content_type: &str);

    /// Override the response status code.
    fn set_status(&mut self, _status: u16) {}
}

/// Reverse URL generation, as seen from inside a handler.
pub trait UrlMapper: Send + Sync {
    /// Build the URL of `resource_id`, filling its variables from the
    /// positional arguments first and then from the named ones.
    fn map_url(
        &self,
        resource_id: &str,
        positional: &[&str],
        named: &[(&str, &str)],
    ) -> Result<String, MapError>;

    /// Text rendition of the whole table, one resource per line.
    fn render(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Mutable state of one request while it walks the node graph.
pub struct DispatchContext<'a> {
    cursor: PathCursor,
    attributes: BTreeMap<String, Binding>,
    response: &'a mut dyn ResponseSink,
    mapper: &'a dyn UrlMapper,
}

impl<'a> DispatchContext<'a> {
    pub fn new(
        cursor: PathCursor,
        response: &'a mut dyn ResponseSink,
        mapper: &'a dyn UrlMapper,
    ) -> Self {
        Self {
            cursor,
            attributes: BTreeMap::new(),
            response,
            mapper,
        }
    }

    pub fn cursor(&self) -> &PathCursor {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut PathCursor {
        &mut self.cursor
    }

    pub fn response(&mut self) -> &mut dyn ResponseSink {
        &mut *self.response
    }

    pub fn mapper(&self) -> &dyn UrlMapper {
        self.mapper
    }

    /// Fail with `DuplicateBinding` if `name` is already bound.
    pub fn ensure_unbound(&self, name: &str) -> DispatchResult<()> {
        if self.attributes.contains_key(name) {
            return Err(DispatchError::DuplicateBinding {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Bind `value` under `name`. A name can be bound once per request.
    pub fn bind(&mut self, name: &str, value: Binding) -> DispatchResult<()> {
        self.ensure_unbound(name)?;
        self.attributes.insert(name.to_string(), value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.attributes.get(name)
    }

    /// Shortcut for single-segment bindings.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Binding::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attributes(&self) -> &BTreeMap<String, Binding> {
        &self.attributes
    }

    /// Build an outbound URL through the request's mapper.
    pub fn map_url(
        &self,
        resource_id: &str,
        positional: &[&str],
        named: &[(&str, &str)],
    ) -> DispatchResult<String> {
        Ok(self.mapper.map_url(resource_id, positional, named)?)
    }

    /// Consume the context, keeping the cursor and the bound attributes.
    pub fn into_parts(self) -> (PathCursor, BTreeMap<String, Binding>) {
        (self.cursor, self.attributes)
    }
}

impl std::fmt::Debug for DispatchContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchContext")
            .field("cursor", &self.cursor)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Minimal collaborators for unit tests.

    use super::*;

    #[derive(Debug, Default)]
    pub struct NullSink {
        pub not_found: bool,
        pub body: Vec<u8>,
        pub logs: Vec<String>,
        pub redirect: Option<String>,
    }

    impl ResponseSink for NullSink {
        fn signal_not_found(&mut self) {
            self.not_found = true;
        }

        fn log(&mut self, message: &str) {
            self.logs.push(message.to_string());
        }

        fn redirect(&mut self, url: &str) {
            self.redirect = Some(url.to_string());
        }

        fn write(&mut self, bytes: &[u8]) {
            self.body.extend_from_slice(bytes);
        }

        fn set_content_type(&mut self, _content_type: &str) {}
    }

    /// Maps every resource id to `/<id>`.
    pub struct EchoMapper;

    impl UrlMapper for EchoMapper {
        fn map_url(
            &self,
            resource_id: &str,
            positional: &[&str],
            _named: &[(&str, &str)],
        ) -> Result<String, MapError> {
            let mut url = format!("/{}", resource_id.trim_start_matches('@'));
            for arg in positional {
                url.push('/');
                url.push_str(arg);
            }
            Ok(url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{EchoMapper, NullSink};
    use super::*;

    #[test]
    fn test_bind_once() {
        let mut sink = NullSink::default();
        let mut ctx = DispatchContext::new(PathCursor::new(["x"]), &mut sink, &EchoMapper);

        ctx.bind("user", Binding::Single("alice".into())).unwrap();
        assert_eq!(ctx.get_str("user"), Some("alice"));

        let err = ctx.bind("user", Binding::Single("bob".into())).unwrap_err();
        assert_eq!(err, DispatchError::DuplicateBinding { name: "user".into() });
        assert_eq!(ctx.get_str("user"), Some("alice"));
    }

    #[test]
    fn test_list_binding() {
        let mut sink = NullSink::default();
        let mut ctx = DispatchContext::new(PathCursor::new(Vec::<String>::new()), &mut sink, &EchoMapper);

        ctx.bind("rest", Binding::Many(vec!["a".into(), "b".into()])).unwrap();
        assert_eq!(ctx.get_str("rest"), None);
        assert_eq!(ctx.get("rest").and_then(Binding::as_list).map(<[String]>::len), Some(2));
    }

    #[test]
    fn test_map_url_through_context() {
        let mut sink = NullSink::default();
        let ctx = DispatchContext::new(PathCursor::new(["x"]), &mut sink, &EchoMapper);
        assert_eq!(ctx.map_url("@@Home", &["a"], &[]).unwrap(), "/Home/a");
    }

    #[test]
    fn test_binding_serializes_untagged() {
        let json = serde_json::to_string(&Binding::Many(vec!["a".into()])).unwrap();
        assert_eq!(json, r#"["a"]"#);
        let json = serde_json::to_string(&Binding::Single("a".into())).unwrap();
        assert_eq!(json, r#""a""#);
    }
}
