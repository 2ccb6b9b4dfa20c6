//! Node arena and live dispatch.
//!
//! # Responsibilities
//! - Own every node of the application, addressed by `NodeId`
//! - Build the graph once through `GraphBuilder`
//! - Walk a request through the graph (consume, handle, forward)
//!
//! # Design Decisions
//! - Successors are indices into the arena, so nodes can be shared by
//!   several parents without shared ownership of the nodes themselves
//! - The graph is immutable once built and `Send + Sync`; any number of
//!   requests may walk it at the same time
//! - Post-dispatch hooks of forwarding nodes run even when the subtree panics

use std::collections::{BTreeMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::dispatch::context::{Binding, DispatchContext};
use crate::dispatch::error::{DispatchError, DispatchResult, GraphError};
use crate::dispatch::node::{Consumption, Continuation, Flow, Handler, Node, NodeKind};

/// Stable reference to a node inside a `NodeGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a request ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Active,
    Handled,
    NotFound,
    Rejected,
    Fatal,
}

impl RequestState {
    /// Final state for the result of `NodeGraph::dispatch`.
    pub fn from_result(result: &DispatchResult<Flow>) -> Self {
        match result {
            Ok(_) => RequestState::Handled,
            Err(DispatchError::NotFound { .. }) | Err(DispatchError::Exhausted { .. }) => {
                RequestState::NotFound
            }
            Err(e) if e.is_fatal() => RequestState::Fatal,
            Err(_) => RequestState::Rejected,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestState::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Active => "active",
            RequestState::Handled => "handled",
            RequestState::NotFound => "not_found",
            RequestState::Rejected => "rejected",
            RequestState::Fatal => "fatal",
        }
    }
}

/// Immutable arena of dispatch nodes.
#[derive(Debug, Clone, Default)]
pub struct NodeGraph {
    nodes: Vec<Node>,
}

impl NodeGraph {
    pub fn builder() -> GraphBuilder {
        GraphBuilder::default()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Find a node by its resource id.
    pub fn find(&self, resource_id: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.resource_id() == Some(resource_id))
            .map(NodeId)
    }

    /// Resource id of `id`, or a generated one for anonymous nodes.
    pub fn resource_id(&self, id: NodeId) -> String {
        self.node(id)
            .and_then(Node::resource_id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("@@node{}", id.0))
    }

    /// Walk a request through the graph, starting at `root`.
    ///
    /// A `NotFound` outcome is also signalled on the context's response sink.
    pub fn dispatch(&self, root: NodeId, ctx: &mut DispatchContext<'_>) -> DispatchResult<Flow> {
        let result = self.dispatch_node(root, ctx);

        match &result {
            Ok(_) => {
                tracing::debug!(uri = %ctx.cursor().uri(), "Request handled");
            }
            Err(DispatchError::NotFound { .. }) => {
                tracing::debug!(uri = %ctx.cursor().uri(), "No resource for path");
                ctx.response().signal_not_found();
            }
            Err(e) if e.is_fatal() => {
                tracing::error!(uri = %ctx.cursor().uri(), error = %e, "Dispatch configuration error");
            }
            Err(e) => {
                tracing::debug!(uri = %ctx.cursor().uri(), error = %e, "Request rejected");
            }
        }
        result
    }

    /// Dispatch one node and, through the driver, its successors.
    pub fn dispatch_node(&self, id: NodeId, ctx: &mut DispatchContext<'_>) -> DispatchResult<Flow> {
        let node = self.node(id).ok_or(DispatchError::UnknownNode(id))?;

        tracing::trace!(
            node = %id,
            kind = node.kind.label(),
            remaining = ?ctx.cursor().remaining(),
            "resolver"
        );

        consume(node.kind.consumption(), ctx)?;

        match node.kind.continuation() {
            Continuation::Terminal => {
                if !ctx.cursor().is_leaf() {
                    return Err(not_found(ctx));
                }
                node.handler.handle(ctx)?;
                Ok(Flow::Handled)
            }
            continuation => {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    self.forward(node.handler.as_ref(), continuation, ctx)
                }));
                node.handler.post_dispatch(ctx);
                match outcome {
                    Ok(result) => result,
                    Err(payload) => panic::resume_unwind(payload),
                }
            }
        }
    }

    fn forward(
        &self,
        handler: &dyn Handler,
        continuation: Continuation<'_>,
        ctx: &mut DispatchContext<'_>,
    ) -> DispatchResult<Flow> {
        if handler.handle(ctx)? == Flow::Handled {
            return Ok(Flow::Handled);
        }

        match continuation {
            Continuation::Terminal => Ok(Flow::Handled),
            Continuation::Forward(next) => self.dispatch_node(next, ctx),
            Continuation::Route { children, default } => {
                if ctx.cursor().is_leaf() {
                    return match default {
                        Some(next) => self.dispatch_node(next, ctx),
                        None => Err(not_found(ctx)),
                    };
                }
                let child = children.get(ctx.cursor().current()?).copied();
                match child {
                    Some(next) => {
                        ctx.cursor_mut().advance()?;
                        self.dispatch_node(next, ctx)
                    }
                    None => Err(not_found(ctx)),
                }
            }
        }
    }
}

/// Take what `consumption` asks for from the cursor and bind it.
///
/// Nothing is mutated when the step fails.
fn consume(consumption: Consumption<'_>, ctx: &mut DispatchContext<'_>) -> DispatchResult<()> {
    match consumption {
        Consumption::Nothing => Ok(()),
        Consumption::One { name } => {
            if ctx.cursor().is_leaf() {
                return Err(not_found(ctx));
            }
            let value = ctx.cursor().current()?.to_string();
            ctx.bind(name, Binding::Single(value))?;
            ctx.cursor_mut().advance()
        }
        Consumption::Rest { name } => {
            ctx.ensure_unbound(name)?;
            let values = ctx.cursor().remaining().to_vec();
            let count = values.len();
            ctx.bind(name, Binding::Many(values))?;
            ctx.cursor_mut().skip(count)
        }
    }
}

fn not_found(ctx: &DispatchContext<'_>) -> DispatchError {
    DispatchError::NotFound {
        uri: ctx.cursor().uri().to_string(),
    }
}

/// Assembles a `NodeGraph`.
///
/// Successors must be added before the nodes that reference them; folders
/// can also receive children afterwards through [`GraphBuilder::attach`].
#[derive(Default)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
    errors: Vec<GraphError>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: NodeKind, handler: Arc<dyn Handler>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            handler,
            resource_id: None,
        });
        id
    }

    fn check_name(&mut self, name: &str) {
        if name.is_empty() {
            self.errors.push(GraphError::EmptyVariableName);
        }
    }

    /// Terminal node; the path must be fully consumed.
    pub fn leaf(&mut self, handler: impl Handler + 'static) -> NodeId {
        self.push(NodeKind::Leaf, Arc::new(handler))
    }

    /// Runs `handler`, then forwards to `next`.
    pub fn delegator(&mut self, handler: impl Handler + 'static, next: NodeId) -> NodeId {
        self.push(NodeKind::Delegator { next }, Arc::new(handler))
    }

    /// Consumes one segment into `name`, then acts as a leaf.
    pub fn var_leaf(
        &mut self,
        name: &str,
        format: Option<&str>,
        handler: impl Handler + 'static,
    ) -> NodeId {
        self.check_name(name);
        let kind = NodeKind::VarLeaf {
            name: name.to_string(),
            format: format.map(str::to_string),
        };
        self.push(kind, Arc::new(handler))
    }

    /// Consumes every remaining segment into `name`, then acts as a leaf.
    pub fn var_var_leaf(&mut self, name: &str, handler: impl Handler + 'static) -> NodeId {
        self.check_name(name);
        let kind = NodeKind::VarVarLeaf {
            name: name.to_string(),
        };
        self.push(kind, Arc::new(handler))
    }

    /// Consumes one segment into `name`, runs `handler`, then forwards to `next`.
    pub fn var_delegator(
        &mut self,
        name: &str,
        format: Option<&str>,
        handler: impl Handler + 'static,
        next: NodeId,
    ) -> NodeId {
        self.check_name(name);
        let kind = NodeKind::VarDelegator {
            name: name.to_string(),
            format: format.map(str::to_string),
            next,
        };
        self.push(kind, Arc::new(handler))
    }

    /// Routes on fixed component names.
    pub fn folder<I, S>(
        &mut self,
        handler: impl Handler + 'static,
        children: I,
        default: Option<NodeId>,
    ) -> NodeId
    where
        I: IntoIterator<Item = (S, NodeId)>,
        S: Into<String>,
    {
        let id = self.push(
            NodeKind::Folder {
                children: BTreeMap::new(),
                default,
            },
            Arc::new(handler),
        );
        for (component, child) in children {
            self.attach(id, component, child);
        }
        id
    }

    /// Add a child to an existing folder.
    pub fn attach(&mut self, folder: NodeId, component: impl Into<String>, child: NodeId) {
        let component = component.into();
        match self.nodes.get_mut(folder.0).map(|n| &mut n.kind) {
            Some(NodeKind::Folder { children, .. }) => {
                if children.contains_key(&component) {
                    self.errors.push(GraphError::DuplicateChild { folder, component });
                } else {
                    children.insert(component, child);
                }
            }
            Some(_) => self.errors.push(GraphError::NotAFolder(folder)),
            None => self.errors.push(GraphError::UnknownNode(folder)),
        }
    }

    /// Give `id` a symbolic resource id for reverse mapping.
    pub fn name(&mut self, id: NodeId, resource_id: impl Into<String>) -> NodeId {
        match self.nodes.get_mut(id.0) {
            Some(node) => node.resource_id = Some(resource_id.into()),
            None => self.errors.push(GraphError::UnknownNode(id)),
        }
        id
    }

    /// Freeze the graph, checking every successor reference.
    pub fn build(self) -> Result<NodeGraph, GraphError> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }

        let len = self.nodes.len();
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if let Some(missing) = node.kind.successors().into_iter().find(|s| s.0 >= len) {
                return Err(GraphError::UnknownNode(missing));
            }
            if let Some(resource_id) = node.resource_id() {
                if !seen.insert(resource_id) {
                    return Err(GraphError::DuplicateResourceId(resource_id.to_string()));
                }
            }
        }

        tracing::debug!(nodes = len, "Dispatch graph built");
        Ok(NodeGraph { nodes: self.nodes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::context::testing::{EchoMapper, NullSink};
    use crate::dispatch::cursor::PathCursor;
    use crate::dispatch::error::MapError;
    use crate::dispatch::node::{handler_fn, Pass};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn run(graph: &NodeGraph, root: NodeId, path: &[&str]) -> (DispatchResult<Flow>, usize, BTreeMap<String, Binding>) {
        let mut sink = NullSink::default();
        let mut ctx = DispatchContext::new(PathCursor::new(path.iter().copied()), &mut sink, &EchoMapper);
        let result = graph.dispatch(root, &mut ctx);
        let (cursor, attributes) = ctx.into_parts();
        (result, cursor.index(), attributes)
    }

    fn counting(counter: &Arc<AtomicUsize>) -> impl Handler + 'static {
        let counter = counter.clone();
        handler_fn(move |_ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Flow::Continue)
        })
    }

    #[test]
    fn test_leaf_requires_consumed_path() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut b = GraphBuilder::new();
        let leaf = b.leaf(counting(&calls));
        let graph = b.build().unwrap();

        let (result, _, _) = run(&graph, leaf, &[]);
        assert_eq!(result, Ok(Flow::Handled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let (result, _, _) = run(&graph, leaf, &["extra"]);
        assert!(matches!(result, Err(DispatchError::NotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_var_leaf_binds_one_segment() {
        let mut b = GraphBuilder::new();
        let leaf = b.var_leaf("name", None, Pass);
        let graph = b.build().unwrap();

        let (result, index, attrs) = run(&graph, leaf, &["alice"]);
        assert_eq!(result, Ok(Flow::Handled));
        assert_eq!(index, 1);
        assert_eq!(attrs.get("name"), Some(&Binding::Single("alice".into())));

        let (result, index, attrs) = run(&graph, leaf, &[]);
        assert!(matches!(result, Err(DispatchError::NotFound { .. })));
        assert_eq!(index, 0);
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_var_var_leaf_takes_everything() {
        let mut b = GraphBuilder::new();
        let leaf = b.var_var_leaf("rest", Pass);
        let graph = b.build().unwrap();

        let (result, index, attrs) = run(&graph, leaf, &["a", "b", "c"]);
        assert_eq!(result, Ok(Flow::Handled));
        assert_eq!(index, 3);
        assert_eq!(
            attrs.get("rest"),
            Some(&Binding::Many(vec!["a".into(), "b".into(), "c".into()]))
        );

        let (result, _, attrs) = run(&graph, leaf, &[]);
        assert_eq!(result, Ok(Flow::Handled));
        assert_eq!(attrs.get("rest"), Some(&Binding::Many(Vec::new())));
    }

    #[test]
    fn test_delegator_stops_when_handled() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut b = GraphBuilder::new();
        let leaf = b.leaf(counting(&calls));
        let root = b.delegator(handler_fn(|_ctx| Ok(Flow::Handled)), leaf);
        let graph = b.build().unwrap();

        let (result, _, _) = run(&graph, root, &[]);
        assert_eq!(result, Ok(Flow::Handled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_folder_routing() {
        let mut b = GraphBuilder::new();
        let home = b.leaf(Pass);
        let greed = b.leaf(Pass);
        let root = b.folder(Pass, [("greed", greed)], Some(home));
        let graph = b.build().unwrap();

        assert_eq!(run(&graph, root, &[]).0, Ok(Flow::Handled));
        let (result, index, _) = run(&graph, root, &["greed"]);
        assert_eq!(result, Ok(Flow::Handled));
        assert_eq!(index, 1);
        assert!(matches!(run(&graph, root, &["nope"]).0, Err(DispatchError::NotFound { .. })));
    }

    #[test]
    fn test_folder_without_default_is_not_found_at_leaf() {
        let mut b = GraphBuilder::new();
        let leaf = b.leaf(Pass);
        let root = b.folder(Pass, [("x", leaf)], None);
        let graph = b.build().unwrap();

        assert!(matches!(run(&graph, root, &[]).0, Err(DispatchError::NotFound { .. })));
    }

    #[test]
    fn test_unknown_root() {
        let graph = GraphBuilder::new().build().unwrap();
        assert_eq!(run(&graph, NodeId(9), &[]).0, Err(DispatchError::UnknownNode(NodeId(9))));
    }

    #[test]
    fn test_builder_rejects_dangling_successor() {
        let mut b = GraphBuilder::new();
        b.delegator(Pass, NodeId(42));
        assert_eq!(b.build().unwrap_err(), GraphError::UnknownNode(NodeId(42)));
    }

    #[test]
    fn test_builder_rejects_duplicate_ids_and_children() {
        let mut b = GraphBuilder::new();
        let a = b.leaf(Pass);
        let c = b.leaf(Pass);
        b.name(a, "@@Same");
        b.name(c, "@@Same");
        assert_eq!(
            b.build().unwrap_err(),
            GraphError::DuplicateResourceId("@@Same".into())
        );

        let mut b = GraphBuilder::new();
        let a = b.leaf(Pass);
        let folder = b.folder(Pass, [("a", a)], None);
        b.attach(folder, "a", a);
        assert!(matches!(b.build(), Err(GraphError::DuplicateChild { .. })));

        let mut b = GraphBuilder::new();
        let a = b.leaf(Pass);
        b.attach(a, "x", a);
        assert_eq!(b.build().unwrap_err(), GraphError::NotAFolder(a));

        let mut b = GraphBuilder::new();
        b.var_leaf("", None, Pass);
        assert_eq!(b.build().unwrap_err(), GraphError::EmptyVariableName);
    }

    #[test]
    fn test_request_state() {
        assert_eq!(RequestState::from_result(&Ok(Flow::Handled)), RequestState::Handled);
        assert_eq!(
            RequestState::from_result(&Err(DispatchError::DuplicateBinding { name: "x".into() })),
            RequestState::Fatal
        );
        assert_eq!(
            RequestState::from_result(&Err(DispatchError::rejected(403, "no"))),
            RequestState::Rejected
        );
        let mapping = MapError::Format {
            name: "uid".into(),
            format: "08d".into(),
            value: "abc".into(),
        };
        assert_eq!(
            RequestState::from_result(&Err(DispatchError::Mapping(mapping))),
            RequestState::Fatal
        );
        assert!(RequestState::NotFound.is_terminal());
        assert!(!RequestState::Active.is_terminal());
    }

    #[test]
    fn test_graph_lookup() {
        let mut b = NodeGraph::builder();
        let leaf = b.leaf(Pass);
        b.name(leaf, "@@Home");
        let other = b.leaf(Pass);
        let graph = b.build().unwrap();

        assert_eq!(graph.find("@@Home"), Some(leaf));
        assert_eq!(graph.resource_id(other), "@@node1");
        assert_eq!(graph.ids().count(), 2);
    }
}
