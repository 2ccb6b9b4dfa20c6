//! Error types shared by live dispatch, graph construction and reverse mapping.

use thiserror::Error;

use crate::dispatch::graph::NodeId;

/// Errors that terminate the dispatch of a single request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The path has unconsumed or insufficient segments for the node reached.
    #[error("no resource at {uri}")]
    NotFound { uri: String },

    /// Two nodes on the same path bound the same attribute name.
    #[error("context already has attribute '{name}'")]
    DuplicateBinding { name: String },

    /// The cursor was read or advanced past its last segment.
    #[error("path exhausted at segment {index}")]
    Exhausted { index: usize },

    /// A handler refused the request (validation, authorization, ...).
    #[error("request rejected with status {status}: {reason}")]
    Rejected { status: u16, reason: String },

    /// A handler failed to build an outbound URL.
    #[error("url mapping failed: {0}")]
    Mapping(#[from] MapError),

    /// A node id that does not belong to the graph being dispatched.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
}

impl DispatchError {
    /// Build a handler-signalled rejection.
    pub fn rejected(status: u16, reason: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            reason: reason.into(),
        }
    }

    /// True for server-side defects that no request can recover from.
    ///
    /// A failed reverse mapping is one: handlers check their inputs before
    /// asking for a URL.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DuplicateBinding { .. } | Self::UnknownNode(_) | Self::Mapping(_)
        )
    }
}

/// Errors raised while generating a URL from a resource id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("unknown resource '{0}'")]
    UnknownResource(String),

    #[error("missing value for '{name}' of resource '{resource}'")]
    MissingArgument { resource: String, name: String },

    #[error("resource '{resource}' takes {expected} positional arguments, got {given}")]
    TooManyArguments {
        resource: String,
        expected: usize,
        given: usize,
    },

    #[error("resource '{resource}' has no component named '{name}'")]
    UnexpectedArgument { resource: String, name: String },

    #[error("value '{value}' for '{name}' does not fit format '{format}'")]
    Format {
        name: String,
        format: String,
        value: String,
    },

    #[error("resource '{0}' is already registered")]
    DuplicateResource(String),
}

/// Errors raised while assembling a node graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("node {0} is not a folder")]
    NotAFolder(NodeId),

    #[error("resource id '{0}' is used by more than one node")]
    DuplicateResourceId(String),

    #[error("folder {folder} already has a child named '{component}'")]
    DuplicateChild { folder: NodeId, component: String },

    #[error("variable nodes need a non-empty attribute name")]
    EmptyVariableName,
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(DispatchError::DuplicateBinding { name: "user".into() }.is_fatal());
        assert!(!DispatchError::NotFound { uri: "/x".into() }.is_fatal());
        assert!(!DispatchError::rejected(403, "nope").is_fatal());
        assert!(DispatchError::from(MapError::UnknownResource("@@Gone".into())).is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = DispatchError::DuplicateBinding { name: "user".into() };
        assert_eq!(err.to_string(), "context already has attribute 'user'");

        let err: DispatchError = MapError::UnknownResource("@@Home".into()).into();
        assert!(err.to_string().contains("@@Home"));
    }
}
