//! Reverse-mapping table built from the dispatch graph.
//!
//! # Responsibilities
//! - Turn the walker's terminals into resource id → pattern entries
//! - Generate URLs from a resource id plus arguments
//! - Render the table as text or JSON for operators
//!
//! # Design Decisions
//! - Built once at startup, read-only afterwards (shared via Arc)
//! - Named arguments fill their variables; positional ones fill the rest
//!   in path order
//! - Surplus or unknown arguments are errors, not silently dropped
//! - A folder's default URL keeps its trailing slash (`/fold/`)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dispatch::context::UrlMapper;
use crate::dispatch::error::MapError;
use crate::dispatch::graph::{NodeGraph, NodeId};
use crate::enumerate::{walk, Component, EnumerateError};

/// A single reverse-mappable resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub resource_id: String,

    /// Path components below the table prefix.
    pub components: Vec<Component>,

    /// Fixed external location, for resources served elsewhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Route {
    /// Names of the variables, in path order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.components.iter().filter_map(Component::var_name)
    }

    /// Components that become URL segments.
    fn segments(&self) -> impl Iterator<Item = &Component> {
        self.components
            .iter()
            .filter(|c| !matches!(c, Component::Index))
    }

    fn ends_in_slash(&self) -> bool {
        matches!(self.components.last(), Some(Component::Index))
    }
}

/// Resource id → URL pattern table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteTable {
    prefix: String,
    routes: BTreeMap<String, Route>,
}

impl RouteTable {
    /// Create an empty table whose URLs all start with `prefix`.
    pub fn new(prefix: Option<&str>) -> Self {
        let prefix = prefix.unwrap_or_default().trim_end_matches('/').to_string();
        Self {
            prefix,
            routes: BTreeMap::new(),
        }
    }

    /// Enumerate `graph` from `root` and record every reachable terminal.
    pub fn from_graph(
        graph: &NodeGraph,
        root: NodeId,
        prefix: Option<&str>,
    ) -> Result<Self, EnumerateError> {
        let mut table = Self::new(prefix);

        for terminal in walk(graph, root)? {
            let resource_id = graph.resource_id(terminal.node);
            if table.routes.contains_key(&resource_id) {
                return Err(EnumerateError::DuplicateResource(resource_id));
            }
            let description = graph
                .node(terminal.node)
                .and_then(|n| n.handler().describe())
                .map(str::to_string);

            table.routes.insert(
                resource_id.clone(),
                Route {
                    resource_id,
                    components: terminal.components,
                    location: None,
                    description,
                },
            );
        }

        tracing::info!(routes = table.routes.len(), prefix = %table.prefix, "Route table built");
        Ok(table)
    }

    /// Register a resource that lives at a fixed URL.
    ///
    /// Relative locations are placed under the table prefix.
    pub fn add_static(&mut self, resource_id: &str, location: &str) -> Result<(), MapError> {
        if self.routes.contains_key(resource_id) {
            return Err(MapError::DuplicateResource(resource_id.to_string()));
        }
        let location = if location.starts_with('/') || location.contains("://") {
            location.to_string()
        } else {
            format!("{}/{}", self.prefix, location)
        };
        self.routes.insert(
            resource_id.to_string(),
            Route {
                resource_id: resource_id.to_string(),
                components: Vec::new(),
                location: Some(location),
                description: None,
            },
        );
        Ok(())
    }

    pub fn get(&self, resource_id: &str) -> Option<&Route> {
        self.routes.get(resource_id)
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The URL pattern of a resource, e.g. `/users/(username)/name`.
    pub fn pattern(&self, resource_id: &str) -> Result<String, MapError> {
        let route = self.lookup(resource_id)?;
        if let Some(location) = &route.location {
            return Ok(location.clone());
        }
        let parts: Vec<String> = route.segments().map(ToString::to_string).collect();
        Ok(self.join(&parts, route.ends_in_slash()))
    }

    /// Serialize every route, for tooling.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let routes: Vec<&Route> = self.routes.values().collect();
        serde_json::to_string_pretty(&routes)
    }

    fn lookup(&self, resource_id: &str) -> Result<&Route, MapError> {
        self.routes
            .get(resource_id)
            .ok_or_else(|| MapError::UnknownResource(resource_id.to_string()))
    }

    fn join(&self, parts: &[String], trailing_slash: bool) -> String {
        let mut url = format!("{}/{}", self.prefix, parts.join("/"));
        if trailing_slash && !parts.is_empty() {
            url.push('/');
        }
        url
    }
}

impl UrlMapper for RouteTable {
    fn map_url(
        &self,
        resource_id: &str,
        positional: &[&str],
        named: &[(&str, &str)],
    ) -> Result<String, MapError> {
        let route = self.lookup(resource_id)?;

        if let Some((name, _)) = named
            .iter()
            .find(|(name, _)| !route.variables().any(|v| v == *name))
        {
            return Err(MapError::UnexpectedArgument {
                resource: resource_id.to_string(),
                name: name.to_string(),
            });
        }
        let named_value = |name: &str| named.iter().find(|(n, _)| *n == name).map(|(_, v)| *v);

        // Positional arguments only fill what named ones left open.
        let expected = route
            .variables()
            .filter(|name| named_value(*name).is_none())
            .count();
        if positional.len() > expected {
            return Err(MapError::TooManyArguments {
                resource: resource_id.to_string(),
                expected,
                given: positional.len(),
            });
        }

        if let Some(location) = &route.location {
            return Ok(location.clone());
        }

        let mut positional = positional.iter().copied();
        let mut argument = |name: &str| {
            named_value(name)
                .or_else(|| positional.next())
                .ok_or_else(|| MapError::MissingArgument {
                    resource: resource_id.to_string(),
                    name: name.to_string(),
                })
        };

        let mut parts = Vec::with_capacity(route.components.len());
        for component in route.segments() {
            let part = match component {
                Component::Fixed { value } => value.clone(),
                Component::Var { name, format } => {
                    let value = argument(name.as_str())?;
                    match format {
                        Some(format) => apply_format(name, format, value)?,
                        None => value.to_string(),
                    }
                }
                Component::Rest { name } => argument(name.as_str())?.trim_matches('/').to_string(),
                Component::Index => continue,
            };
            parts.push(part);
        }

        Ok(self.join(&parts, route.ends_in_slash()))
    }

    fn render(&self) -> Vec<String> {
        self.routes
            .keys()
            .filter_map(|id| {
                self.pattern(id)
                    .ok()
                    .map(|pattern| format!("{} : {}", id, pattern))
            })
            .collect()
    }
}

/// Apply a printf-like format hint (`08d`, `5d`, `d`, `s`) to a value.
fn apply_format(name: &str, format: &str, value: &str) -> Result<String, MapError> {
    let err = || MapError::Format {
        name: name.to_string(),
        format: format.to_string(),
        value: value.to_string(),
    };

    if format == "s" {
        return Ok(value.to_string());
    }

    let padding = format.strip_suffix('d').ok_or_else(err)?;
    let number: i64 = value.parse().map_err(|_| err())?;
    if padding.is_empty() {
        return Ok(number.to_string());
    }

    let width: usize = padding.parse().map_err(|_| err())?;
    if padding.starts_with('0') {
        Ok(format!("{:0width$}", number, width = width))
    } else {
        Ok(format!("{:width$}", number, width = width))
    }
}
