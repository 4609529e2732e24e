//! Completion-driven media graph.
//!
//! Pipeline components register independently and in any order. Once every
//! required entity is bound, the pipeline is built from the topology
//! description and published as a unit, or rolled back if any step fails.
//!
//! # Architecture
//!
//! ```text
//! register ──► [EntityRegistry] ──► [CompletionTracker] ──fires once──► [PipelinePublisher]
//!                                                                         │
//!                      [Topology] ──► resolve() ──► [LinkBuilder] ◄───────┘
//! ```
//!
//! # Design
//!
//! - **Arena + index**: entities live in a `Vec` indexed by `EntityId`;
//!   links are stored by value and name pads with `PadRef`.
//! - **Explicit context**: `Coordinator` owns every piece of state and lends
//!   it to the completion action through `BuildContext`.
//! - **One-shot completion**: the tracker runs its action once per pipeline
//!   lifetime and must be re-armed explicitly.
//! - **Undo stack**: publication records each completed step and unwinds
//!   them newest-first on failure.

pub mod coordinator;
pub mod device;
pub mod endpoint;
pub mod error;
pub mod graph;
pub mod id;
pub mod link;
pub mod pad;
pub mod publisher;
pub mod registry;
pub mod topology;
pub mod tracker;
pub mod visibility;

pub use coordinator::{Coordinator, GraphEvent, Registration};
pub use device::{DeviceRef, StaticSubdevice, Subdevice};
pub use endpoint::{resolve, EndpointDescriptor, Endpoints};
pub use error::{GraphError, GraphResult};
pub use graph::{Link, Pipeline, PipelineConfig, PipelineSnapshot, PipelineStatus, SinkNode};
pub use id::{EntityId, LinkId, NodeId, PadRef};
pub use link::LinkBuilder;
pub use pad::{PadDescriptor, PadDirection};
pub use publisher::PipelinePublisher;
pub use registry::{Entity, EntityRegistry, EntityState};
pub use topology::{RawEndpoint, Topology, TopologyError, TopologySource};
pub use tracker::{BuildContext, CompletionAction, CompletionTracker, TrackerState};
pub use visibility::{
    DeviceNumber, DeviceVisibility, NodeKind, NodeTable, VisibilityError, VisibleNode,
};
