//! # camgraph: completion-driven media graph coordinator
//!
//! Camera pipelines are made of independently probed components (image
//! sensors, CSI receivers, capture engines) that register in no particular
//! order. camgraph waits until every component a pipeline needs is bound,
//! then wires them into a directed pad-to-pad graph from a device-tree-like
//! topology description and publishes the result as a unit. A failure at any
//! step rolls the whole publication back.
//!
//! ## Architecture
//!
//! - **Pipeline**: registry, completion tracker, link builder and publisher,
//!   owned by a [`Coordinator`](pipeline::Coordinator)
//! - **Topology**: in-memory description of nodes and their endpoints
//! - **Visibility**: the subsystem that turns published nodes into
//!   `/dev/videoN` and `/dev/v4l-subdevN` entries
//! - **Config**: TOML topology files and runtime settings
//!
//! ## Example
//!
//! ```ignore
//! use camgraph::config::TopologyFile;
//! use camgraph::pipeline::{Coordinator, NodeTable};
//!
//! let loaded = TopologyFile::load("tegra.toml")?.build()?;
//! let mut coordinator = Coordinator::new(
//!     loaded.topology,
//!     NodeTable::new(),
//!     loaded.config,
//!     loaded.required,
//! )?;
//!
//! for binding in loaded.devices {
//!     coordinator.register(binding.node, binding.device)?;
//! }
//! println!("{}", coordinator.snapshot());
//! ```

pub mod config;
pub mod error;
pub mod pipeline;

// Re-export commonly used types
pub use config::{Settings, TopologyFile};
pub use error::{CamGraphError, Result};
pub use pipeline::{Coordinator, GraphError, GraphResult, NodeId, Pipeline, PipelineStatus};
