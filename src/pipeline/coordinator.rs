//! The coordinator: one pipeline, its entities and its collaborators.
//!
//! Every mutating operation takes `&mut self`, so registration, completion
//! and build are serialized by the caller. Callers receiving registrations
//! from several threads wrap the coordinator in a `Mutex`.

use crate::pipeline::device::DeviceRef;
use crate::pipeline::error::{GraphError, GraphResult};
use crate::pipeline::graph::{Pipeline, PipelineConfig, PipelineSnapshot, PipelineStatus};
use crate::pipeline::id::{EntityId, NodeId};
use crate::pipeline::publisher::PipelinePublisher;
use crate::pipeline::registry::EntityRegistry;
use crate::pipeline::topology::TopologySource;
use crate::pipeline::tracker::{BuildContext, CompletionAction, CompletionTracker, TrackerState};
use crate::pipeline::visibility::DeviceVisibility;
use crossbeam_channel::Sender;

/// Lifecycle notifications, sent when an event channel is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    EntityBound { node: NodeId, name: String },
    PipelineComplete { generation: u64, links: usize },
    PipelineFailed { error: String },
    PipelineTornDown,
}

/// Result of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub entity: EntityId,
    /// True if this registration completed the required set and the pipeline
    /// was published.
    pub completed: bool,
}

fn publish_action() -> CompletionAction {
    Box::new(PipelinePublisher::publish)
}

#[derive(Debug)]
pub struct Coordinator<T, V> {
    topology: T,
    visibility: V,
    registry: EntityRegistry,
    tracker: CompletionTracker,
    pipeline: Pipeline,
    events: Option<Sender<GraphEvent>>,
}

impl<T: TopologySource, V: DeviceVisibility> Coordinator<T, V> {
    /// Create a coordinator waiting for `required`. Every required node must
    /// exist in the topology; each is declared as an unbound entity.
    pub fn new(
        topology: T,
        visibility: V,
        config: PipelineConfig,
        required: impl IntoIterator<Item = NodeId>,
    ) -> GraphResult<Self> {
        let mut registry = EntityRegistry::new();
        let required: Vec<NodeId> = required.into_iter().collect();
        for &node in &required {
            let name = topology
                .node_name(node)
                .ok_or(GraphError::MissingTopologyNode { node })?;
            registry.expect(node, name);
        }

        let mut tracker = CompletionTracker::new(required);
        tracker.arm(publish_action())?;

        tracing::debug!(
            "Coordinator for '{}' waiting on {} entities",
            config.sink_name,
            tracker.required().len()
        );

        Ok(Self {
            topology,
            visibility,
            registry,
            tracker,
            pipeline: Pipeline::new(config),
            events: None,
        })
    }

    pub fn with_events(mut self, events: Sender<GraphEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn emit(&self, event: GraphEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// Bind `device` to `node`, then publish the pipeline if this completes
    /// the required set. A build error is returned here after rollback; the
    /// registration itself stays in effect.
    pub fn register(&mut self, node: NodeId, device: DeviceRef) -> GraphResult<Registration> {
        let entity = self.registry.register(node, device)?;
        if let Some(e) = self.registry.get(entity) {
            self.emit(GraphEvent::EntityBound {
                node,
                name: e.name.clone(),
            });
        }
        let completed = self.evaluate()?;
        Ok(Registration { entity, completed })
    }

    /// Run the completion check without a new registration.
    pub fn evaluate(&mut self) -> GraphResult<bool> {
        let mut ctx = BuildContext {
            registry: &mut self.registry,
            pipeline: &mut self.pipeline,
            topology: &self.topology,
            visibility: &mut self.visibility,
        };
        match self.tracker.notify(&mut ctx) {
            Ok(true) => {
                self.emit(GraphEvent::PipelineComplete {
                    generation: self.pipeline.generation(),
                    links: self.pipeline.link_count(),
                });
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(e) => {
                self.emit(GraphEvent::PipelineFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Build again after a failed build, keeping every registration.
    pub fn retry(&mut self) -> GraphResult<bool> {
        if self.pipeline.status() != PipelineStatus::Failed {
            return Err(GraphError::Busy {
                operation: "retry",
                status: self.pipeline.status(),
            });
        }
        tracing::info!("Retrying pipeline '{}'", self.pipeline.config().sink_name);
        self.pipeline.set_status(PipelineStatus::Empty);
        self.registry.clear_build_failures();
        self.tracker.rearm(publish_action())?;
        self.evaluate()
    }

    /// Unpublish the pipeline. Registrations are kept and the tracker does
    /// not fire again until `reset`.
    pub fn teardown(&mut self) -> GraphResult<()> {
        PipelinePublisher::teardown(&mut self.pipeline, &mut self.visibility)?;
        self.emit(GraphEvent::PipelineTornDown);
        Ok(())
    }

    /// Tear down, unbind every entity and start a new pipeline lifetime.
    pub fn reset(&mut self) -> GraphResult<()> {
        self.teardown()?;
        self.registry.reset();
        if self.tracker.state().is_terminal() {
            self.tracker.rearm(publish_action())?;
        }
        tracing::info!(
            "Coordinator reset, waiting on {} entities",
            self.tracker.required().len()
        );
        Ok(())
    }

    // ── Accessors ──

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn tracker_state(&self) -> TrackerState {
        self.tracker.state()
    }

    /// Required nodes still waiting for a device.
    pub fn missing(&self) -> Vec<NodeId> {
        self.tracker.missing(&self.registry)
    }

    pub fn topology(&self) -> &T {
        &self.topology
    }

    pub fn visibility(&self) -> &V {
        &self.visibility
    }

    pub fn visibility_mut(&mut self) -> &mut V {
        &mut self.visibility
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        self.pipeline.snapshot(&self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::device::StaticSubdevice;
    use crate::pipeline::registry::EntityState;
    use crate::pipeline::topology::Topology;
    use crate::pipeline::visibility::NodeTable;

    fn coordinator() -> (Coordinator<Topology, NodeTable>, [NodeId; 3]) {
        let mut topology = Topology::new();
        let vi = topology.add_node("vi").unwrap();
        let csi = topology.add_node("nvcsi").unwrap();
        let sensor = topology.add_node("ov428").unwrap();
        topology.connect(sensor, 0, csi, 0).unwrap();
        topology.connect(csi, 1, vi, 0).unwrap();

        let coordinator = Coordinator::new(
            topology,
            NodeTable::new(),
            PipelineConfig::new(vi, "vi-output"),
            [vi, csi, sensor],
        )
        .unwrap();
        (coordinator, [vi, csi, sensor])
    }

    fn device(node: usize) -> DeviceRef {
        match node {
            0 => StaticSubdevice::capture("vi").into_ref(),
            1 => StaticSubdevice::passthrough("nvcsi").into_ref(),
            _ => StaticSubdevice::sensor("ov428").into_ref(),
        }
    }

    #[test]
    fn test_unknown_required_node_rejected() {
        let result = Coordinator::new(
            Topology::new(),
            NodeTable::new(),
            PipelineConfig::new(NodeId(0), "vi-output"),
            [NodeId(0)],
        );
        assert!(matches!(result, Err(GraphError::MissingTopologyNode { .. })));
    }

    #[test]
    fn test_fires_on_last_registration() {
        let (mut c, nodes) = coordinator();
        assert_eq!(c.missing().len(), 3);

        assert!(!c.register(nodes[0], device(0)).unwrap().completed);
        assert!(!c.register(nodes[1], device(1)).unwrap().completed);
        assert!(c.register(nodes[2], device(2)).unwrap().completed);

        assert_eq!(c.tracker_state(), TrackerState::Complete);
        assert_eq!(c.pipeline().status(), PipelineStatus::Complete);
        assert_eq!(c.pipeline().link_count(), 2);
        assert!(c.missing().is_empty());
    }

    #[test]
    fn test_retry_after_transient_visibility_failure() {
        let (mut c, nodes) = coordinator();
        c.visibility_mut().reject_once("ov428");

        c.register(nodes[0], device(0)).unwrap();
        c.register(nodes[1], device(1)).unwrap();
        let err = c.register(nodes[2], device(2)).unwrap_err();
        assert!(matches!(err, GraphError::Visibility(_)));
        assert_eq!(c.pipeline().status(), PipelineStatus::Failed);
        assert!(c.visibility().is_empty());
        assert_eq!(
            c.registry().find(nodes[2]).unwrap().state(),
            EntityState::Bound
        );

        assert!(c.retry().unwrap());
        assert_eq!(c.pipeline().status(), PipelineStatus::Complete);
        assert_eq!(c.visibility().len(), 3);
    }

    #[test]
    fn test_retry_requires_failed_pipeline() {
        let (mut c, _) = coordinator();
        assert!(matches!(c.retry(), Err(GraphError::Busy { .. })));
    }

    #[test]
    fn test_reset_starts_new_lifetime() {
        let (mut c, nodes) = coordinator();
        for (i, &node) in nodes.iter().enumerate() {
            c.register(node, device(i)).unwrap();
        }
        let first = c.pipeline().link_set();

        c.reset().unwrap();
        assert_eq!(c.tracker_state(), TrackerState::Waiting);
        assert_eq!(c.registry().bound_count(), 0);
        assert!(c.visibility().is_empty());

        for (i, &node) in nodes.iter().enumerate().rev() {
            c.register(node, device(i)).unwrap();
        }
        assert_eq!(c.pipeline().link_set(), first);
        assert_eq!(c.pipeline().generation(), 2);
    }
}
