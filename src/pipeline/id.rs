//! Identity types for the media graph.
//!
//! `NodeId` names a node of the topology description and doubles as the key
//! of the entity registered for it. `EntityId` and `LinkId` are newtypes over
//! `u32` that serve as direct indices into their storage vectors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to a topology node. Index into `Topology::nodes`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Index into `EntityRegistry::entities`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl EntityId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

/// Index into `Pipeline::links`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LinkId(pub u32);

impl fmt::Debug for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinkId({})", self.0)
    }
}

/// One pad of one node. Links hold these by value and resolve them through
/// the registry; they never point at an entity directly.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PadRef {
    pub node: NodeId,
    pub pad: u16,
}

impl PadRef {
    pub const fn new(node: NodeId, pad: u16) -> Self {
        Self { node, pad }
    }
}

impl fmt::Debug for PadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PadRef(node={}, pad={})", self.node.0, self.pad)
    }
}

impl fmt::Display for PadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node.0, self.pad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        let id = NodeId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(format!("{}", id), "NodeId(42)");
    }

    #[test]
    fn test_entity_id() {
        assert_eq!(EntityId(3).index(), 3);
        assert_eq!(format!("{:?}", EntityId(3)), "EntityId(3)");
    }

    #[test]
    fn test_pad_ref_ordering() {
        let a = PadRef::new(NodeId(1), 3);
        let b = PadRef::new(NodeId(2), 0);
        let c = PadRef::new(NodeId(2), 1);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a.to_string(), "1:3");
    }
}
