//! Static enumeration of the dispatch graph.
//!
//! # Data Flow
//! ```text
//! NodeGraph (built once at startup)
//!     → walk(): ask every reachable node to declare its structure
//!     → Declaration per node (terminal, branch, variable, fixed or default branch)
//!     → Terminal { node, components } per reachable leaf
//!     → table.rs: RouteTable (resource id → URL pattern)
//! ```
//!
//! # Design Decisions
//! - Nodes only declare; the walker tracks paths, cycles and sharing
//! - A node seen twice on the same path is a cycle (error)
//! - A terminal reachable through several paths is recorded once, first path wins
//! - A node already walked in full is not walked again unless the current
//!   path binds one of the variables below it, so shared subgraphs cost one
//!   walk each instead of one per path
//! - A folder's default resource ends in a slash (`/fold/`), like the root
//! - A variable name declared twice on one path is rejected here, before any
//!   request could hit the same problem as a `DuplicateBinding`

pub mod table;

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dispatch::error::GraphError;
use crate::dispatch::graph::{NodeGraph, NodeId};

pub use table::{Route, RouteTable};

/// A variable contributed to a URL pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    pub format: Option<String>,
    /// Binds all remaining segments instead of one.
    pub variadic: bool,
}

impl VarDecl {
    pub fn single(name: &str, format: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            format: format.map(str::to_string),
            variadic: false,
        }
    }

    pub fn variadic(name: &str) -> Self {
        Self {
            name: name.to_string(),
            format: None,
            variadic: true,
        }
    }

    fn component(&self) -> Component {
        if self.variadic {
            Component::Rest {
                name: self.name.clone(),
            }
        } else {
            Component::Var {
                name: self.name.clone(),
                format: self.format.clone(),
            }
        }
    }
}

/// One structural declaration made by a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// The node is a leaf, optionally consuming a variable first.
    Terminal { var: Option<VarDecl> },
    /// Pass-through to `successor`, binding nothing.
    Branch { successor: NodeId },
    /// Binds `var`, then continues at `successor`.
    VariableBranch { var: VarDecl, successor: NodeId },
    /// A fixed path component leading to `successor`.
    FixedBranch { component: String, successor: NodeId },
    /// A folder's default, served at the folder's own path.
    DefaultBranch { successor: NodeId },
}

/// Receiver of structural declarations.
pub trait Enumerator {
    fn declare_terminal(&mut self, var: Option<VarDecl>);

    fn declare_branch(&mut self, successor: NodeId);

    fn declare_variable_branch(&mut self, var: VarDecl, successor: NodeId);

    fn declare_fixed_branch(&mut self, component: &str, successor: NodeId);

    fn declare_default_branch(&mut self, successor: NodeId);
}

impl Enumerator for Vec<Declaration> {
    fn declare_terminal(&mut self, var: Option<VarDecl>) {
        self.push(Declaration::Terminal { var });
    }

    fn declare_branch(&mut self, successor: NodeId) {
        self.push(Declaration::Branch { successor });
    }

    fn declare_variable_branch(&mut self, var: VarDecl, successor: NodeId) {
        self.push(Declaration::VariableBranch { var, successor });
    }

    fn declare_fixed_branch(&mut self, component: &str, successor: NodeId) {
        self.push(Declaration::FixedBranch {
            component: component.to_string(),
            successor,
        });
    }

    fn declare_default_branch(&mut self, successor: NodeId) {
        self.push(Declaration::DefaultBranch { successor });
    }
}

/// One component of a URL pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Component {
    Fixed { value: String },
    Var { name: String, format: Option<String> },
    Rest { name: String },
    /// The trailing slash of a folder reached through its default.
    Index,
}

impl Component {
    pub fn fixed(value: &str) -> Self {
        Component::Fixed {
            value: value.to_string(),
        }
    }

    /// Variable name, if the component is one.
    pub fn var_name(&self) -> Option<&str> {
        match self {
            Component::Fixed { .. } | Component::Index => None,
            Component::Var { name, .. } | Component::Rest { name } => Some(name),
        }
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Component::Fixed { value } => write!(f, "{}", value),
            Component::Var { name, format: None } => write!(f, "({})", name),
            Component::Var {
                name,
                format: Some(format),
            } => write!(f, "({}%{})", name, format),
            Component::Rest { name } => write!(f, "(*{})", name),
            Component::Index => Ok(()),
        }
    }
}

/// A reachable leaf and the components on the way to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminal {
    pub node: NodeId,
    pub components: Vec<Component>,
}

/// Errors found while enumerating a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnumerateError {
    #[error("node {0} is reachable from itself")]
    Cycle(NodeId),

    #[error("variable '{name}' is bound twice on the path to node {node}")]
    DuplicateVariable { node: NodeId, name: String },

    #[error("resource id '{0}' names more than one route")]
    DuplicateResource(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Walk every path from `root` and collect the reachable terminals.
pub fn walk(graph: &NodeGraph, root: NodeId) -> Result<Vec<Terminal>, EnumerateError> {
    let mut walker = Walker::new(graph, false);
    walker.visit(root)?;
    Ok(walker.terminals)
}

/// Every declaration made during a walk from `root`, in visiting order.
pub fn declarations(
    graph: &NodeGraph,
    root: NodeId,
) -> Result<Vec<(NodeId, Declaration)>, EnumerateError> {
    let mut walker = Walker::new(graph, true);
    walker.visit(root)?;
    Ok(walker.trace)
}

/// Check a graph before serving traffic.
///
/// Returns the first structural problem: a cycle, a dangling successor or a
/// variable name bound twice along some path.
pub fn validate(graph: &NodeGraph, root: NodeId) -> Result<usize, EnumerateError> {
    let terminals = walk(graph, root)?;
    Ok(terminals.len())
}

struct Walker<'g> {
    graph: &'g NodeGraph,
    components: Vec<Component>,
    on_path: Vec<NodeId>,
    emitted: HashSet<NodeId>,
    terminals: Vec<Terminal>,
    /// Variables bound at or below each node walked in full.
    finished: HashMap<NodeId, Rc<HashSet<String>>>,
    record: bool,
    trace: Vec<(NodeId, Declaration)>,
}

impl<'g> Walker<'g> {
    fn new(graph: &'g NodeGraph, record: bool) -> Self {
        Self {
            graph,
            components: Vec::new(),
            on_path: Vec::new(),
            emitted: HashSet::new(),
            terminals: Vec::new(),
            finished: HashMap::new(),
            record,
            trace: Vec::new(),
        }
    }

    fn visit(&mut self, id: NodeId) -> Result<Rc<HashSet<String>>, EnumerateError> {
        if self.on_path.contains(&id) {
            return Err(EnumerateError::Cycle(id));
        }
        if let Some(below) = self.revisit(id) {
            return Ok(below);
        }
        let node = self
            .graph
            .node(id)
            .ok_or(GraphError::UnknownNode(id))?;

        let mut decls = Vec::new();
        node.declare_structure(&mut decls);

        self.on_path.push(id);
        let mut below = HashSet::new();
        let result = decls
            .into_iter()
            .try_for_each(|decl| self.apply(id, decl, &mut below));
        self.on_path.pop();
        result?;

        let below = Rc::new(below);
        self.finished.insert(id, Rc::clone(&below));
        Ok(below)
    }

    /// A node walked in full has already emitted everything below it. It
    /// is walked again only when the current path binds one of its
    /// variables, so the duplicate is reported where it happens.
    fn revisit(&self, id: NodeId) -> Option<Rc<HashSet<String>>> {
        if self.record {
            return None;
        }
        let below = self.finished.get(&id)?;
        let clash = self
            .components
            .iter()
            .filter_map(Component::var_name)
            .any(|name| below.contains(name));
        (!clash).then(|| Rc::clone(below))
    }

    fn apply(
        &mut self,
        id: NodeId,
        decl: Declaration,
        below: &mut HashSet<String>,
    ) -> Result<(), EnumerateError> {
        if self.record {
            self.trace.push((id, decl.clone()));
        }

        let (component, successor) = match decl {
            Declaration::Terminal { var } => {
                let mut components = self.components.clone();
                if let Some(var) = var {
                    self.check_unique(id, &var.name)?;
                    below.insert(var.name.clone());
                    components.push(var.component());
                }
                if self.emitted.insert(id) {
                    self.terminals.push(Terminal { node: id, components });
                } else {
                    tracing::debug!(node = %id, "Terminal already reached through another path");
                }
                return Ok(());
            }
            Declaration::Branch { successor } => (None, successor),
            Declaration::VariableBranch { var, successor } => {
                self.check_unique(id, &var.name)?;
                below.insert(var.name.clone());
                (Some(var.component()), successor)
            }
            Declaration::FixedBranch { component, successor } => {
                (Some(Component::Fixed { value: component }), successor)
            }
            Declaration::DefaultBranch { successor } => (Some(Component::Index), successor),
        };

        let pushed = component.is_some();
        self.components.extend(component);
        let result = self.visit(successor);
        if pushed {
            self.components.pop();
        }
        below.extend(result?.iter().cloned());
        Ok(())
    }

    fn check_unique(&self, node: NodeId, name: &str) -> Result<(), EnumerateError> {
        if self.components.iter().any(|c| c.var_name() == Some(name)) {
            return Err(EnumerateError::DuplicateVariable {
                node,
                name: name.to_string(),
            });
        }
        Ok(())
    }
}
