//! Dispatch node variants.
//!
//! # Responsibilities
//! - Define the local handler contract (`Handler`, `Flow`)
//! - Describe each node variant as a pair of capabilities:
//!   what it consumes from the path and where it goes next
//! - Declare each variant's structure to an `Enumerator`
//!
//! # Design Decisions
//! - Handlers never call successors; the graph driver does
//! - Variants are a closed enum instead of a trait hierarchy
//! - Each variant's structural declaration is self-contained

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::dispatch::context::DispatchContext;
use crate::dispatch::error::DispatchResult;
use crate::dispatch::graph::NodeId;
use crate::enumerate::{Enumerator, VarDecl};

/// What a local handler asks the driver to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep going: forward to the successor, if the node has one.
    Continue,
    /// The response is complete; stop here.
    Handled,
}

/// Local processing step of a node.
pub trait Handler: Send + Sync {
    /// Do this node's own work.
    fn handle(&self, ctx: &mut DispatchContext<'_>) -> DispatchResult<Flow>;

    /// Runs once after a forwarding node is done, on every exit path.
    fn post_dispatch(&self, _ctx: &mut DispatchContext<'_>) {}

    /// Human readable description, shown in route listings.
    fn describe(&self) -> Option<&str> {
        None
    }
}

/// Handler that does nothing and lets the chain continue.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pass;

impl Handler for Pass {
    fn handle(&self, _ctx: &mut DispatchContext<'_>) -> DispatchResult<Flow> {
        Ok(Flow::Continue)
    }
}

/// Adapter returned by [`handler_fn`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(&mut DispatchContext<'_>) -> DispatchResult<Flow> + Send + Sync,
{
    fn handle(&self, ctx: &mut DispatchContext<'_>) -> DispatchResult<Flow> {
        (self.f)(ctx)
    }
}

/// Turn a closure into a handler.
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&mut DispatchContext<'_>) -> DispatchResult<Flow> + Send + Sync,
{
    FnHandler { f }
}

/// What a node takes from the path before running its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumption<'a> {
    Nothing,
    /// Exactly one segment, bound under `name`.
    One { name: &'a str },
    /// Every remaining segment, bound as a list under `name`.
    Rest { name: &'a str },
}

/// Where a node goes after its handler asked to continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation<'a> {
    /// The node is a leaf; the path must be fully consumed.
    Terminal,
    /// Unconditional forwarding.
    Forward(NodeId),
    /// Pick a child by the next segment.
    Route {
        children: &'a BTreeMap<String, NodeId>,
        default: Option<NodeId>,
    },
}

/// The shape of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Leaf,
    Delegator {
        next: NodeId,
    },
    VarLeaf {
        name: String,
        format: Option<String>,
    },
    VarVarLeaf {
        name: String,
    },
    VarDelegator {
        name: String,
        format: Option<String>,
        next: NodeId,
    },
    Folder {
        children: BTreeMap<String, NodeId>,
        default: Option<NodeId>,
    },
}

impl NodeKind {
    pub fn consumption(&self) -> Consumption<'_> {
        match self {
            NodeKind::Leaf | NodeKind::Delegator { .. } | NodeKind::Folder { .. } => {
                Consumption::Nothing
            }
            NodeKind::VarLeaf { name, .. } | NodeKind::VarDelegator { name, .. } => {
                Consumption::One { name }
            }
            NodeKind::VarVarLeaf { name } => Consumption::Rest { name },
        }
    }

    pub fn continuation(&self) -> Continuation<'_> {
        match self {
            NodeKind::Leaf | NodeKind::VarLeaf { .. } | NodeKind::VarVarLeaf { .. } => {
                Continuation::Terminal
            }
            NodeKind::Delegator { next } | NodeKind::VarDelegator { next, .. } => {
                Continuation::Forward(*next)
            }
            NodeKind::Folder { children, default } => Continuation::Route {
                children,
                default: *default,
            },
        }
    }

    /// Every node id this node can forward to.
    pub fn successors(&self) -> Vec<NodeId> {
        match self.continuation() {
            Continuation::Terminal => Vec::new(),
            Continuation::Forward(next) => vec![next],
            Continuation::Route { children, default } => {
                children.values().copied().chain(default).collect()
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.continuation(), Continuation::Terminal)
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Leaf => "leaf",
            NodeKind::Delegator { .. } => "delegator",
            NodeKind::VarLeaf { .. } => "var-leaf",
            NodeKind::VarVarLeaf { .. } => "var-var-leaf",
            NodeKind::VarDelegator { .. } => "var-delegator",
            NodeKind::Folder { .. } => "folder",
        }
    }
}

/// A node of the dispatch graph.
#[derive(Clone)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) handler: Arc<dyn Handler>,
    pub(crate) resource_id: Option<String>,
}

impl Node {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }

    /// The symbolic id used for reverse mapping, if one was assigned.
    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    /// Tell `enumerator` what this node contributes to a URL pattern.
    pub fn declare_structure(&self, enumerator: &mut dyn Enumerator) {
        match &self.kind {
            NodeKind::Leaf => enumerator.declare_terminal(None),
            NodeKind::Delegator { next } => enumerator.declare_branch(*next),
            NodeKind::VarLeaf { name, format } => {
                enumerator.declare_terminal(Some(VarDecl::single(name, format.as_deref())))
            }
            NodeKind::VarVarLeaf { name } => {
                enumerator.declare_terminal(Some(VarDecl::variadic(name)))
            }
            NodeKind::VarDelegator { name, format, next } => enumerator
                .declare_variable_branch(VarDecl::single(name, format.as_deref()), *next),
            NodeKind::Folder { children, default } => {
                for (component, child) in children {
                    enumerator.declare_fixed_branch(component, *child);
                }
                if let Some(default) = default {
                    enumerator.declare_default_branch(*default);
                }
            }
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("resource_id", &self.resource_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enumerate::Declaration;

    fn node(kind: NodeKind) -> Node {
        Node {
            kind,
            handler: Arc::new(Pass),
            resource_id: None,
        }
    }

    #[test]
    fn test_capabilities() {
        let var = NodeKind::VarDelegator {
            name: "id".into(),
            format: None,
            next: NodeId(3),
        };
        assert_eq!(var.consumption(), Consumption::One { name: "id" });
        assert_eq!(var.continuation(), Continuation::Forward(NodeId(3)));
        assert!(!var.is_terminal());

        let rest = NodeKind::VarVarLeaf { name: "path".into() };
        assert_eq!(rest.consumption(), Consumption::Rest { name: "path" });
        assert!(rest.is_terminal());
    }

    #[test]
    fn test_folder_successors_include_default() {
        let mut children = BTreeMap::new();
        children.insert("b".to_string(), NodeId(2));
        children.insert("a".to_string(), NodeId(1));
        let folder = NodeKind::Folder {
            children,
            default: Some(NodeId(7)),
        };
        assert_eq!(folder.successors(), vec![NodeId(1), NodeId(2), NodeId(7)]);
    }

    #[test]
    fn test_declarations() {
        let mut decls: Vec<Declaration> = Vec::new();
        node(NodeKind::Leaf).declare_structure(&mut decls);
        node(NodeKind::VarLeaf {
            name: "uid".into(),
            format: Some("08d".into()),
        })
        .declare_structure(&mut decls);
        node(NodeKind::Delegator { next: NodeId(4) }).declare_structure(&mut decls);
        let mut children = BTreeMap::new();
        children.insert("menu".to_string(), NodeId(5));
        node(NodeKind::Folder {
            children,
            default: Some(NodeId(6)),
        })
        .declare_structure(&mut decls);

        assert_eq!(
            decls,
            vec![
                Declaration::Terminal { var: None },
                Declaration::Terminal {
                    var: Some(VarDecl::single("uid", Some("08d"))),
                },
                Declaration::Branch { successor: NodeId(4) },
                Declaration::FixedBranch {
                    component: "menu".into(),
                    successor: NodeId(5),
                },
                Declaration::DefaultBranch { successor: NodeId(6) },
            ]
        );
    }
}
