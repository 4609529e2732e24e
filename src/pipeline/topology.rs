//! In-memory topology description.
//!
//! Nodes live in a flat `Vec` indexed by `NodeId`, each carrying the endpoints
//! declared on it. An endpoint names its peer as `node:port`; the peer is only
//! looked up when the endpoint is parsed, so a dangling reference shows up as
//! one malformed descriptor instead of failing the whole description.
//!
//! ```text
//! ov428  port 0 ──► nvcsi:0
//! nvcsi  port 0 ──► ov428:0
//! nvcsi  port 1 ──► vi:0
//! vi     port 0 ──► nvcsi:1
//! ```

use crate::pipeline::endpoint::EndpointDescriptor;
use crate::pipeline::id::NodeId;
use std::collections::HashMap;
use thiserror::Error;

/// Errors produced while reading the topology description.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Unknown topology node {0}")]
    UnknownNode(NodeId),

    #[error("Node {node} has no endpoint #{index}")]
    NoSuchEndpoint { node: NodeId, index: usize },

    #[error("Endpoint #{index} of {node} declares no local port")]
    MissingPort { node: NodeId, index: usize },

    #[error("Endpoint #{index} of {node} has a malformed remote '{remote}'")]
    MalformedRemote {
        node: NodeId,
        index: usize,
        remote: String,
    },

    #[error("Endpoint #{index} of {node} references unknown node '{remote}'")]
    DanglingRemote {
        node: NodeId,
        index: usize,
        remote: String,
    },

    #[error("Duplicate topology node '{0}'")]
    DuplicateNode(String),
}

/// The metadata source the resolver reads from. Treated as read-only input.
pub trait TopologySource {
    /// Whether `node` exists in the description.
    fn contains(&self, node: NodeId) -> bool;

    /// Number of endpoints declared on `node` (0 for unknown nodes).
    fn endpoint_count(&self, node: NodeId) -> usize;

    /// Parse endpoint `index` of `node` into a normalized descriptor.
    fn parse_endpoint(
        &self,
        node: NodeId,
        index: usize,
    ) -> Result<EndpointDescriptor, TopologyError>;

    /// Human-readable node name, for logs.
    fn node_name(&self, node: NodeId) -> Option<&str>;
}

/// One endpoint as written in the description, before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEndpoint {
    /// Local port number (`reg` of the enclosing port).
    pub port: Option<u32>,
    /// Peer reference in `node:port` form.
    pub remote: String,
}

impl RawEndpoint {
    pub fn new(port: u32, remote_node: &str, remote_port: u32) -> Self {
        Self {
            port: Some(port),
            remote: format!("{}:{}", remote_node, remote_port),
        }
    }
}

/// A single node of the description.
#[derive(Debug, Clone)]
pub struct TopologyNode {
    pub id: NodeId,
    pub name: String,
    pub endpoints: Vec<RawEndpoint>,
}

/// Flat-storage topology description.
///
/// - `NodeId` is a direct index into `nodes`.
/// - Name lookups are O(1) via HashMap.
#[derive(Debug, Default, Clone)]
pub struct Topology {
    nodes: Vec<TopologyNode>,
    name_index: HashMap<String, NodeId>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a node. Names must be unique.
    pub fn add_node(&mut self, name: impl Into<String>) -> Result<NodeId, TopologyError> {
        let name = name.into();
        if self.name_index.contains_key(&name) {
            return Err(TopologyError::DuplicateNode(name));
        }
        let id = NodeId(self.nodes.len() as u32);
        self.name_index.insert(name.clone(), id);
        self.nodes.push(TopologyNode {
            id,
            name,
            endpoints: Vec::new(),
        });
        Ok(id)
    }

    /// Append a raw endpoint to `node`.
    pub fn add_endpoint(&mut self, node: NodeId, endpoint: RawEndpoint) -> Result<(), TopologyError> {
        let slot = self
            .nodes
            .get_mut(node.index())
            .ok_or(TopologyError::UnknownNode(node))?;
        slot.endpoints.push(endpoint);
        Ok(())
    }

    /// Declare a connection from both ends, the way paired remote-endpoint
    /// references appear in a device tree.
    pub fn connect(
        &mut self,
        a: NodeId,
        a_port: u32,
        b: NodeId,
        b_port: u32,
    ) -> Result<(), TopologyError> {
        let a_name = self.name(a).ok_or(TopologyError::UnknownNode(a))?.to_string();
        let b_name = self.name(b).ok_or(TopologyError::UnknownNode(b))?.to_string();
        self.add_endpoint(a, RawEndpoint::new(a_port, &b_name, b_port))?;
        self.add_endpoint(b, RawEndpoint::new(b_port, &a_name, a_port))?;
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.name_index.get(name).copied()
    }

    pub fn name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.index()).map(|n| n.name.as_str())
    }

    pub fn node(&self, node: NodeId) -> Option<&TopologyNode> {
        self.nodes.get(node.index())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TopologyNode> {
        self.nodes.iter()
    }
}

/// Split `node:port`, taking the last colon so node names may contain colons.
fn split_remote(remote: &str) -> Option<(&str, u32)> {
    let (name, port) = remote.rsplit_once(':')?;
    if name.is_empty() {
        return None;
    }
    port.trim().parse().ok().map(|p| (name.trim(), p))
}

impl TopologySource for Topology {
    fn contains(&self, node: NodeId) -> bool {
        node.index() < self.nodes.len()
    }

    fn endpoint_count(&self, node: NodeId) -> usize {
        self.nodes
            .get(node.index())
            .map(|n| n.endpoints.len())
            .unwrap_or(0)
    }

    fn parse_endpoint(
        &self,
        node: NodeId,
        index: usize,
    ) -> Result<EndpointDescriptor, TopologyError> {
        let slot = self
            .nodes
            .get(node.index())
            .ok_or(TopologyError::UnknownNode(node))?;
        let raw = slot
            .endpoints
            .get(index)
            .ok_or(TopologyError::NoSuchEndpoint { node, index })?;

        let local_port = raw.port.ok_or(TopologyError::MissingPort { node, index })?;
        let (remote_name, remote_port) =
            split_remote(&raw.remote).ok_or_else(|| TopologyError::MalformedRemote {
                node,
                index,
                remote: raw.remote.clone(),
            })?;
        let remote_node = self
            .find(remote_name)
            .ok_or_else(|| TopologyError::DanglingRemote {
                node,
                index,
                remote: raw.remote.clone(),
            })?;

        Ok(EndpointDescriptor {
            local_port,
            remote_node,
            remote_port,
        })
    }

    fn node_name(&self, node: NodeId) -> Option<&str> {
        self.name(node)
    }
}
