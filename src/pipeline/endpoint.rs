//! Endpoint descriptor resolution.
//!
//! `resolve` turns the endpoints declared on one topology node into a lazy
//! stream of normalized `(local_port, remote_node, remote_port)` triples. The
//! stream re-scans the node on every call, so it can be restarted freely. A
//! descriptor that fails to parse is logged and skipped; only a missing node
//! is reported to the caller.

use crate::pipeline::error::{GraphError, GraphResult};
use crate::pipeline::id::NodeId;
use crate::pipeline::topology::TopologySource;
use serde::Serialize;

/// One parsed connection intent, immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EndpointDescriptor {
    pub local_port: u32,
    pub remote_node: NodeId,
    pub remote_port: u32,
}

/// Resolve the endpoints of `node`.
pub fn resolve<T: TopologySource + ?Sized>(
    topology: &T,
    node: NodeId,
) -> GraphResult<Endpoints<'_, T>> {
    if !topology.contains(node) {
        return Err(GraphError::MissingTopologyNode { node });
    }
    Ok(Endpoints {
        topology,
        node,
        next: 0,
        count: topology.endpoint_count(node),
        skipped: 0,
    })
}

/// Lazy iterator over the well-formed endpoints of one node.
pub struct Endpoints<'a, T: ?Sized> {
    topology: &'a T,
    node: NodeId,
    next: usize,
    count: usize,
    skipped: usize,
}

impl<T: TopologySource + ?Sized> Endpoints<'_, T> {
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Descriptors dropped as malformed so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Start over from the first endpoint.
    pub fn restart(&mut self) {
        self.next = 0;
        self.skipped = 0;
        self.count = self.topology.endpoint_count(self.node);
    }
}

impl<T: TopologySource + ?Sized> Iterator for Endpoints<'_, T> {
    type Item = EndpointDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.count {
            let index = self.next;
            self.next += 1;
            match self.topology.parse_endpoint(self.node, index) {
                Ok(descriptor) => return Some(descriptor),
                Err(e) => {
                    self.skipped += 1;
                    tracing::warn!(
                        "Failed to parse endpoint #{} of '{}': {}",
                        index,
                        self.topology.node_name(self.node).unwrap_or("?"),
                        e
                    );
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.count.saturating_sub(self.next)))
    }
}
