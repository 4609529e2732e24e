//! Device-visibility seam.
//!
//! Publishing a pipeline means making its capture node and its subdevices
//! visible to consumers. The core drives this through `DeviceVisibility`;
//! `NodeTable` is the in-process implementation used by the CLI and tests.

use crate::pipeline::id::NodeId;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use thiserror::Error;

/// Kind of device node exposed to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Video,
    Subdev,
}

/// A node about to become visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibleNode {
    pub kind: NodeKind,
    pub name: String,
    /// Topology node the device node belongs to.
    pub owner: NodeId,
}

impl VisibleNode {
    pub fn video(name: impl Into<String>, owner: NodeId) -> Self {
        Self {
            kind: NodeKind::Video,
            name: name.into(),
            owner,
        }
    }

    pub fn subdev(name: impl Into<String>, owner: NodeId) -> Self {
        Self {
            kind: NodeKind::Subdev,
            name: name.into(),
            owner,
        }
    }
}

/// Handle returned by a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeviceNumber {
    pub kind: NodeKind,
    pub minor: u32,
}

impl DeviceNumber {
    pub const fn video(minor: u32) -> Self {
        Self {
            kind: NodeKind::Video,
            minor,
        }
    }

    pub const fn subdev(minor: u32) -> Self {
        Self {
            kind: NodeKind::Subdev,
            minor,
        }
    }
}

impl fmt::Display for DeviceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            NodeKind::Video => write!(f, "/dev/video{}", self.minor),
            NodeKind::Subdev => write!(f, "/dev/v4l-subdev{}", self.minor),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VisibilityError {
    #[error("Failed to register {name}: {reason}")]
    Rejected { name: String, reason: String },

    #[error("{0} is not registered")]
    NotRegistered(DeviceNumber),
}

/// Operations the core needs from the device-visibility subsystem.
/// Both are synchronous and reversible.
#[cfg_attr(test, mockall::automock)]
pub trait DeviceVisibility: Send {
    fn register_node(&mut self, node: &VisibleNode) -> Result<DeviceNumber, VisibilityError>;

    fn unregister_node(&mut self, number: DeviceNumber) -> Result<(), VisibilityError>;
}

/// In-process visibility table. Minor numbers are allocated lowest-free per
/// kind, so a rebuilt pipeline gets the same device names.
#[derive(Debug, Default)]
pub struct NodeTable {
    nodes: BTreeMap<DeviceNumber, VisibleNode>,
    reject_once: HashSet<String>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next registration of `name` fail. Used to simulate a
    /// transient failure of the subsystem.
    pub fn reject_once(&mut self, name: impl Into<String>) {
        self.reject_once.insert(name.into());
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, number: DeviceNumber) -> Option<&VisibleNode> {
        self.nodes.get(&number)
    }

    pub fn visible(&self) -> impl Iterator<Item = (&DeviceNumber, &VisibleNode)> {
        self.nodes.iter()
    }

    fn lowest_free(&self, kind: NodeKind) -> u32 {
        let mut minor = 0;
        for number in self.nodes.keys().filter(|n| n.kind == kind) {
            if number.minor != minor {
                break;
            }
            minor += 1;
        }
        minor
    }
}

impl DeviceVisibility for NodeTable {
    fn register_node(&mut self, node: &VisibleNode) -> Result<DeviceNumber, VisibilityError> {
        if self.reject_once.remove(&node.name) {
            return Err(VisibilityError::Rejected {
                name: node.name.clone(),
                reason: "rejected by subsystem".to_string(),
            });
        }
        let number = DeviceNumber {
            kind: node.kind,
            minor: self.lowest_free(node.kind),
        };
        tracing::debug!("Registered {} as {}", node.name, number);
        self.nodes.insert(number, node.clone());
        Ok(number)
    }

    fn unregister_node(&mut self, number: DeviceNumber) -> Result<(), VisibilityError> {
        match self.nodes.remove(&number) {
            Some(node) => {
                tracing::debug!("Unregistered {} ({})", number, node.name);
                Ok(())
            }
            None => Err(VisibilityError::NotRegistered(number)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_allocation_per_kind() {
        let mut table = NodeTable::new();
        let v0 = table.register_node(&VisibleNode::video("vi-output", NodeId(0))).unwrap();
        let s0 = table.register_node(&VisibleNode::subdev("nvcsi", NodeId(1))).unwrap();
        let s1 = table.register_node(&VisibleNode::subdev("ov428", NodeId(2))).unwrap();

        assert_eq!(v0, DeviceNumber::video(0));
        assert_eq!(s0, DeviceNumber::subdev(0));
        assert_eq!(s1, DeviceNumber::subdev(1));
        assert_eq!(s1.to_string(), "/dev/v4l-subdev1");
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_lowest_free_minor_is_reused() {
        let mut table = NodeTable::new();
        let s0 = table.register_node(&VisibleNode::subdev("a", NodeId(0))).unwrap();
        table.register_node(&VisibleNode::subdev("b", NodeId(1))).unwrap();
        table.unregister_node(s0).unwrap();

        let again = table.register_node(&VisibleNode::subdev("c", NodeId(2))).unwrap();
        assert_eq!(again, DeviceNumber::subdev(0));
    }

    #[test]
    fn test_reject_once_is_transient() {
        let mut table = NodeTable::new();
        table.reject_once("vi-output");
        let node = VisibleNode::video("vi-output", NodeId(0));
        assert!(matches!(
            table.register_node(&node),
            Err(VisibilityError::Rejected { .. })
        ));
        assert!(table.register_node(&node).is_ok());
    }

    #[test]
    fn test_unregister_unknown() {
        let mut table = NodeTable::new();
        assert_eq!(
            table.unregister_node(DeviceNumber::video(3)),
            Err(VisibilityError::NotRegistered(DeviceNumber::video(3)))
        );
    }
}
