//! Path cursor for a single request.
//!
//! # Responsibilities
//! - Split the request path into segments once
//! - Track how many segments the nodes have consumed so far
//! - Keep the original URI around for logging
//!
//! # Design Decisions
//! - Empty segments are dropped: `/a//b/` and `/a/b` walk the same nodes
//! - Segments are kept exactly as received (no percent-decoding)
//! - The index never moves past the last segment

use url::Url;

use crate::dispatch::error::{DispatchError, DispatchResult};

/// Mutable cursor over the segments of one request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCursor {
    uri: String,
    segments: Vec<String>,
    index: usize,
}

impl PathCursor {
    /// Create a cursor over already split segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        let uri = format!("/{}", segments.join("/"));
        Self {
            uri,
            segments,
            index: 0,
        }
    }

    /// Create a cursor from a request path or an absolute URL.
    ///
    /// The query string and fragment are ignored.
    pub fn from_uri(uri: &str) -> Self {
        let path = if uri.contains("://") {
            match Url::parse(uri) {
                Ok(url) => url.path().to_string(),
                Err(_) => strip_query(uri).to_string(),
            }
        } else {
            strip_query(uri).to_string()
        };

        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            uri: uri.to_string(),
            segments,
            index: 0,
        }
    }

    /// The segment under the cursor.
    pub fn current(&self) -> DispatchResult<&str> {
        self.segments
            .get(self.index)
            .map(String::as_str)
            .ok_or(DispatchError::Exhausted { index: self.index })
    }

    /// Move past the current segment.
    pub fn advance(&mut self) -> DispatchResult<()> {
        if self.is_leaf() {
            return Err(DispatchError::Exhausted { index: self.index });
        }
        self.index += 1;
        Ok(())
    }

    /// Move past `count` segments, or not at all if fewer remain.
    pub fn skip(&mut self, count: usize) -> DispatchResult<()> {
        if self.remaining().len() < count {
            return Err(DispatchError::Exhausted {
                index: self.segments.len(),
            });
        }
        self.index += count;
        Ok(())
    }

    /// True once every segment has been consumed.
    pub fn is_leaf(&self) -> bool {
        self.index == self.segments.len()
    }

    /// The original URI, for diagnostics.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments not consumed yet.
    pub fn remaining(&self) -> &[String] {
        &self.segments[self.index..]
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

fn strip_query(uri: &str) -> &str {
    let end = uri.find(['?', '#']).unwrap_or(uri.len());
    &uri[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path() {
        let cursor = PathCursor::from_uri("/users/alice/profile");
        assert_eq!(cursor.segments(), ["users", "alice", "profile"]);
        assert_eq!(cursor.uri(), "/users/alice/profile");
        assert!(!cursor.is_leaf());
    }

    #[test]
    fn test_empty_segments_and_query_dropped() {
        let cursor = PathCursor::from_uri("//fold//greed/?page=2#top");
        assert_eq!(cursor.segments(), ["fold", "greed"]);

        let root = PathCursor::from_uri("/");
        assert!(root.is_leaf());
        assert!(root.is_empty());
    }

    #[test]
    fn test_absolute_url() {
        let cursor = PathCursor::from_uri("http://furius.ca/demo/lcomp/bli");
        assert_eq!(cursor.segments(), ["demo", "lcomp", "bli"]);
        assert_eq!(cursor.uri(), "http://furius.ca/demo/lcomp/bli");
    }

    #[test]
    fn test_advance_until_leaf() {
        let mut cursor = PathCursor::new(["a", "b"]);
        assert_eq!(cursor.current().unwrap(), "a");
        cursor.advance().unwrap();
        assert_eq!(cursor.current().unwrap(), "b");
        cursor.advance().unwrap();
        assert!(cursor.is_leaf());
        assert_eq!(cursor.index(), 2);

        assert_eq!(cursor.current(), Err(DispatchError::Exhausted { index: 2 }));
        assert!(cursor.advance().is_err());
        assert_eq!(cursor.index(), 2);
    }

    #[test]
    fn test_skip() {
        let mut cursor = PathCursor::new(["demo", "home"]);
        cursor.skip(1).unwrap();
        assert_eq!(cursor.remaining(), ["home"]);

        assert!(cursor.skip(2).is_err());
        assert_eq!(cursor.index(), 1);
    }
}
