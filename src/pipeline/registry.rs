//! Entity registry.
//!
//! Entities are stored in a flat `Vec` indexed by `EntityId`, with an O(1)
//! `NodeId` lookup on the side. Binding order is recorded separately so link
//! building walks entities deterministically in the order they registered.
//! Nothing is removed during a build; `reset` returns every entity to
//! `Unbound` when the pipeline is torn down.

use crate::pipeline::device::DeviceRef;
use crate::pipeline::error::{GraphError, GraphResult};
use crate::pipeline::id::{EntityId, NodeId};
use crate::pipeline::pad::PadDescriptor;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Registration state of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Unbound,
    Bound,
    /// Bound, but its link pass hit a hard failure (missing topology node).
    BuildFailed,
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityState::Unbound => write!(f, "Unbound"),
            EntityState::Bound => write!(f, "Bound"),
            EntityState::BuildFailed => write!(f, "BuildFailed"),
        }
    }
}

/// One pipeline component.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub node: NodeId,
    pub name: String,
    state: EntityState,
    device: Option<DeviceRef>,
    pads: Vec<PadDescriptor>,
}

impl Entity {
    fn new(id: EntityId, node: NodeId, name: String) -> Self {
        Self {
            id,
            node,
            name,
            state: EntityState::Unbound,
            device: None,
            pads: Vec::new(),
        }
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    /// True once a device is attached, including after a failed link pass.
    pub fn is_bound(&self) -> bool {
        self.state != EntityState::Unbound
    }

    pub fn device(&self) -> Option<&DeviceRef> {
        self.device.as_ref()
    }

    pub fn pads(&self) -> &[PadDescriptor] {
        &self.pads
    }

    pub fn pad_count(&self) -> usize {
        self.pads.len()
    }

    /// Pad at `port`. Pads are zero-indexed; `port == pad_count()` is out of range.
    pub fn pad(&self, port: u32) -> Option<&PadDescriptor> {
        self.pads.get(port as usize)
    }

    /// Whether the bound device exposes a connection surface.
    pub fn has_topology(&self) -> bool {
        self.device.as_ref().is_some_and(|d| d.has_topology())
    }
}

#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: Vec<Entity>,
    node_index: HashMap<NodeId, EntityId>,
    bind_order: Vec<EntityId>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entities, bound or not.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn bound_count(&self) -> usize {
        self.bind_order.len()
    }

    /// Declare an entity that is expected to register later. Idempotent.
    pub fn expect(&mut self, node: NodeId, name: impl Into<String>) -> EntityId {
        if let Some(&id) = self.node_index.get(&node) {
            return id;
        }
        let id = EntityId(self.entities.len() as u32);
        self.entities.push(Entity::new(id, node, name.into()));
        self.node_index.insert(node, id);
        id
    }

    /// Bind `device` to the entity for `node`, creating the entity if it was
    /// never declared. The pad list is queried from the device.
    pub fn register(&mut self, node: NodeId, device: DeviceRef) -> GraphResult<EntityId> {
        let id = self.expect(node, device.name());
        let entity = &mut self.entities[id.index()];
        if entity.is_bound() {
            return Err(GraphError::AlreadyBound { node });
        }

        entity.pads = device.pads().to_vec();
        entity.device = Some(device);
        entity.state = EntityState::Bound;
        self.bind_order.push(id);

        tracing::debug!(
            "Bound entity '{}' ({}) with {} pads",
            entity.name,
            node,
            entity.pads.len()
        );
        Ok(id)
    }

    pub fn find(&self, node: NodeId) -> GraphResult<&Entity> {
        self.node_index
            .get(&node)
            .map(|id| &self.entities[id.index()])
            .ok_or(GraphError::NotFound { node })
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.index())
    }

    pub fn is_bound(&self, node: NodeId) -> bool {
        self.find(node).is_ok_and(|e| e.is_bound())
    }

    /// Bound entities in registration order.
    pub fn all(&self) -> impl Iterator<Item = &Entity> {
        self.bind_order.iter().map(|id| &self.entities[id.index()])
    }

    /// Declared entities still waiting for their device.
    pub fn pending(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| !e.is_bound())
    }

    pub fn mark_build_failed(&mut self, node: NodeId) -> GraphResult<()> {
        let id = *self
            .node_index
            .get(&node)
            .ok_or(GraphError::NotFound { node })?;
        let entity = &mut self.entities[id.index()];
        if !entity.is_bound() {
            return Err(GraphError::EntityNotBound { node });
        }
        entity.state = EntityState::BuildFailed;
        Ok(())
    }

    /// Return `BuildFailed` entities to `Bound` so a new build may use them.
    pub fn clear_build_failures(&mut self) {
        for entity in &mut self.entities {
            if entity.state == EntityState::BuildFailed {
                entity.state = EntityState::Bound;
            }
        }
    }

    /// Unbind everything. Declared entities are kept, unbound.
    pub fn reset(&mut self) {
        for entity in &mut self.entities {
            entity.state = EntityState::Unbound;
            entity.device = None;
            entity.pads.clear();
        }
        self.bind_order.clear();
    }
}
