//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use resource_dispatch::dispatch::{
    Binding, DispatchContext, DispatchError, DispatchResult, Flow, Handler, NodeGraph, NodeId,
    PathCursor, UrlMapper,
};
use resource_dispatch::enumerate::RouteTable;
use resource_dispatch::http::response::BufferedResponse;

/// What a [`Recorder`] does when its handler runs.
#[derive(Debug, Clone)]
pub enum Behaviour {
    Continue,
    Handle,
    Reject(u16),
    Panic,
}

/// Handler that counts its calls and records what it saw.
#[derive(Clone)]
pub struct Recorder {
    behaviour: Behaviour,
    pub handled: Arc<AtomicUsize>,
    pub hooks: Arc<AtomicUsize>,
    /// Attribute the handler reads when it runs.
    watch: Option<String>,
    pub seen: Arc<std::sync::Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            handled: Arc::new(AtomicUsize::new(0)),
            hooks: Arc::new(AtomicUsize::new(0)),
            watch: None,
            seen: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn watching(mut self, name: &str) -> Self {
        self.watch = Some(name.to_string());
        self
    }

    pub fn handled(&self) -> usize {
        self.handled.load(Ordering::SeqCst)
    }

    pub fn hooks(&self) -> usize {
        self.hooks.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl Handler for Recorder {
    fn handle(&self, ctx: &mut DispatchContext<'_>) -> DispatchResult<Flow> {
        self.handled.fetch_add(1, Ordering::SeqCst);
        if let Some(name) = &self.watch {
            if let Some(value) = ctx.get_str(name) {
                self.seen.lock().unwrap().push(value.to_string());
            }
        }
        match self.behaviour {
            Behaviour::Continue => Ok(Flow::Continue),
            Behaviour::Handle => {
                ctx.response().write(b"handled");
                Ok(Flow::Handled)
            }
            Behaviour::Reject(status) => Err(DispatchError::rejected(status, "rejected by recorder")),
            Behaviour::Panic => panic!("recorder panicked"),
        }
    }

    fn post_dispatch(&self, _ctx: &mut DispatchContext<'_>) {
        self.hooks.fetch_add(1, Ordering::SeqCst);
    }
}

/// Result of running one request through a graph.
pub struct Outcome {
    pub result: DispatchResult<Flow>,
    pub response: BufferedResponse,
    pub index: usize,
    pub attributes: BTreeMap<String, Binding>,
}

/// Dispatch `path` (already split into segments) from `root`.
pub fn run(graph: &NodeGraph, root: NodeId, mapper: &dyn UrlMapper, path: &[&str]) -> Outcome {
    run_cursor(graph, root, mapper, PathCursor::new(path.iter().copied()))
}

pub fn run_cursor(graph: &NodeGraph, root: NodeId, mapper: &dyn UrlMapper, cursor: PathCursor) -> Outcome {
    let mut response = BufferedResponse::new("test");
    let mut ctx = DispatchContext::new(cursor, &mut response, mapper);
    let result = graph.dispatch(root, &mut ctx);
    let (cursor, attributes) = ctx.into_parts();
    Outcome {
        result,
        response,
        index: cursor.index(),
        attributes,
    }
}

pub fn empty_table() -> RouteTable {
    RouteTable::new(None)
}
