//! Configuration module for camgraph
//!
//! This module handles:
//! - Topology files (`.toml`) describing nodes, endpoints, devices and the
//!   pipeline to assemble
//! - Runtime settings (log filter, output format)
//!
//! # Topology file
//!
//! ```toml
//! [pipeline]
//! sink = "vi"
//! sink_name = "vi-output-0"
//! channel_port = 0
//! channels = 1
//! required = ["vi", "nvcsi", "ov428"]
//!
//! [[nodes]]
//! name = "ov428"
//! endpoints = [{ port = 0, remote = "nvcsi:0" }]
//!
//! [[devices]]
//! node = "ov428"
//! pads = ["source"]
//! ```
//!
//! When `required` is omitted every declared device is required.

pub mod settings;

pub use settings::*;

use crate::error::{CamGraphError, Result, ResultExt};
use crate::pipeline::{
    Coordinator, DeviceRef, DeviceVisibility, NodeId, PadDirection, PipelineConfig, RawEndpoint,
    StaticSubdevice, Topology,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "camgraph";

/// Topology file extension
pub const TOPOLOGY_FILE_EXTENSION: &str = "toml";

fn default_channels() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// The `[pipeline]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Node owning the pipeline
    pub sink: String,

    /// Capture node name
    pub sink_name: String,

    /// Channel port on the sink node
    #[serde(default)]
    pub channel_port: u32,

    /// Channels provided by the sink node
    #[serde(default = "default_channels")]
    pub channels: u32,

    /// Nodes that must be bound before the pipeline is built
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

/// One endpoint of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointEntry {
    /// Local port; an endpoint without one is kept and skipped at resolve time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,

    /// Peer as `node:port`
    pub remote: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub name: String,

    #[serde(default)]
    pub endpoints: Vec<EndpointEntry>,
}

/// A device that registers against a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Node the device binds to
    pub node: String,

    /// Device name, defaults to the node name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Pad directions, numbered by position
    pub pads: Vec<PadDirection>,

    /// Whether the device exposes a connection surface
    #[serde(default = "default_true")]
    pub has_topology: bool,
}

/// A parsed topology file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyFile {
    pub pipeline: PipelineSection,

    #[serde(default)]
    pub nodes: Vec<NodeEntry>,

    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

/// A device ready to register.
#[derive(Debug, Clone)]
pub struct DeviceBinding {
    pub node: NodeId,
    /// Name of the node, used to pick registration order
    pub node_name: String,
    pub device: DeviceRef,
}

/// Everything needed to construct a coordinator.
#[derive(Debug, Clone)]
pub struct LoadedTopology {
    pub topology: Topology,
    pub config: PipelineConfig,
    pub required: Vec<NodeId>,
    pub devices: Vec<DeviceBinding>,
}

impl TopologyFile {
    /// Load a topology file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CamGraphError::Config(format!("Failed to read topology file {:?}: {}", path, e))
        })?;
        Self::parse(&content).map_err(|e| e.with_context(format!("{:?}", path)))
    }

    /// Parse topology TOML
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| CamGraphError::Config(format!("Failed to parse topology: {}", e)))
    }

    /// Save as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CamGraphError::Config(format!("Failed to create topology directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| {
            CamGraphError::Config(format!("Failed to write topology file {:?}: {}", path, e))
        })
    }

    /// A sensor feeding a CSI receiver feeding a capture engine.
    pub fn sample() -> Self {
        let node = |name: &str, endpoints: &[(u32, &str)]| NodeEntry {
            name: name.to_string(),
            endpoints: endpoints
                .iter()
                .map(|&(port, remote)| EndpointEntry {
                    port: Some(port),
                    remote: remote.to_string(),
                })
                .collect(),
        };
        let device = |node: &str, pads: &[PadDirection]| DeviceEntry {
            node: node.to_string(),
            name: None,
            pads: pads.to_vec(),
            has_topology: true,
        };

        Self {
            pipeline: PipelineSection {
                sink: "vi".to_string(),
                sink_name: "vi-output-0".to_string(),
                channel_port: 0,
                channels: 1,
                required: vec!["vi".into(), "nvcsi".into(), "ov428".into()],
            },
            nodes: vec![
                node("vi", &[(0, "nvcsi:1")]),
                node("nvcsi", &[(0, "ov428:0"), (1, "vi:0")]),
                node("ov428", &[(0, "nvcsi:0")]),
            ],
            devices: vec![
                device("vi", &[PadDirection::Sink]),
                device("nvcsi", &[PadDirection::Sink, PadDirection::Source]),
                device("ov428", &[PadDirection::Source]),
            ],
        }
    }

    /// Build the in-memory topology, pipeline config and device list.
    pub fn build(&self) -> Result<LoadedTopology> {
        let mut topology = Topology::new();
        for node in &self.nodes {
            topology.add_node(node.name.as_str())?;
        }
        for node in &self.nodes {
            let id = self.lookup(&topology, &node.name)?;
            for ep in &node.endpoints {
                topology.add_endpoint(
                    id,
                    RawEndpoint {
                        port: ep.port,
                        remote: ep.remote.clone(),
                    },
                )?;
            }
        }

        let sink = self.lookup(&topology, &self.pipeline.sink)?;
        let config = PipelineConfig::new(sink, self.pipeline.sink_name.as_str())
            .with_channel(self.pipeline.channel_port, self.pipeline.channels);

        let mut devices = Vec::with_capacity(self.devices.len());
        for entry in &self.devices {
            let node = self.lookup(&topology, &entry.node)?;
            let name = entry.name.as_deref().unwrap_or(&entry.node);
            let mut device = StaticSubdevice::from_directions(name, &entry.pads);
            if !entry.has_topology {
                device = device.without_topology();
            }
            devices.push(DeviceBinding {
                node,
                node_name: entry.node.clone(),
                device: device.into_ref(),
            });
        }

        let required = if self.pipeline.required.is_empty() {
            devices.iter().map(|d| d.node).collect()
        } else {
            self.pipeline
                .required
                .iter()
                .map(|name| self.lookup(&topology, name))
                .collect::<Result<Vec<_>>>()?
        };

        tracing::debug!(
            "Loaded topology: {} nodes, {} devices, {} required",
            topology.len(),
            devices.len(),
            required.len()
        );

        Ok(LoadedTopology {
            topology,
            config,
            required,
            devices,
        })
    }

    fn lookup(&self, topology: &Topology, name: &str) -> Result<NodeId> {
        topology
            .find(name)
            .ok_or_else(|| CamGraphError::Config(format!("Unknown node '{}'", name)))
    }
}

impl LoadedTopology {
    /// Build a coordinator over the loaded topology. Returns it together with
    /// the devices still to register.
    pub fn into_coordinator<V: DeviceVisibility>(
        self,
        visibility: V,
    ) -> Result<(Coordinator<Topology, V>, Vec<DeviceBinding>)> {
        let coordinator = Coordinator::new(self.topology, visibility, self.config, self.required)
            .context("Failed to create coordinator")?;
        Ok((coordinator, self.devices))
    }
}

/// Resolve a topology path argument, appending the default extension when
/// the path has none.
pub fn topology_path(arg: impl Into<PathBuf>) -> PathBuf {
    let path = arg.into();
    if path.extension().is_none() {
        path.with_extension(TOPOLOGY_FILE_EXTENSION)
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{NodeTable, Subdevice, TopologySource};

    #[test]
    fn test_sample_builds() {
        let loaded = TopologyFile::sample().build().unwrap();
        assert_eq!(loaded.topology.len(), 3);
        assert_eq!(loaded.required.len(), 3);
        assert_eq!(loaded.devices.len(), 3);
        assert_eq!(loaded.config.sink_name, "vi-output-0");
        assert_eq!(loaded.config.sink, loaded.topology.find("vi").unwrap());
        assert_eq!(loaded.devices[1].device.pads().len(), 2);
    }

    #[test]
    fn test_parse_defaults() {
        let file = TopologyFile::parse(
            r#"
            [pipeline]
            sink = "vi"
            sink_name = "vi-output"

            [[nodes]]
            name = "vi"

            [[nodes]]
            name = "ov428"
            endpoints = [{ remote = "vi:0" }]

            [[devices]]
            node = "ov428"
            pads = ["source"]
            has_topology = false
            "#,
        )
        .unwrap();

        assert_eq!(file.pipeline.channel_port, 0);
        assert_eq!(file.pipeline.channels, 1);
        assert!(file.pipeline.required.is_empty());
        assert_eq!(file.nodes[1].endpoints[0].port, None);

        let loaded = file.build().unwrap();
        let ov428 = loaded.topology.find("ov428").unwrap();
        assert_eq!(loaded.required, vec![ov428]);
        assert!(!loaded.devices[0].device.has_topology());
        assert!(loaded.topology.parse_endpoint(ov428, 0).is_err());
    }

    #[test]
    fn test_unknown_node_reference() {
        let mut file = TopologyFile::sample();
        file.pipeline.required.push("imx219".to_string());
        let err = file.build().unwrap_err();
        assert!(err.to_string().contains("imx219"));
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut file = TopologyFile::sample();
        file.nodes.push(NodeEntry {
            name: "vi".to_string(),
            endpoints: Vec::new(),
        });
        assert!(matches!(file.build(), Err(CamGraphError::Topology(_))));
    }

    #[test]
    fn test_parse_error_is_config_error() {
        assert!(matches!(
            TopologyFile::parse("[pipeline]\nsink = 3"),
            Err(CamGraphError::Config(_))
        ));
    }

    #[test]
    fn test_into_coordinator_registers_sample() {
        let loaded = TopologyFile::sample().build().unwrap();
        let (mut coordinator, devices) = loaded.into_coordinator(NodeTable::new()).unwrap();
        let mut completed = false;
        for binding in devices {
            completed = coordinator.register(binding.node, binding.device).unwrap().completed;
        }
        assert!(completed);
    }

    #[test]
    fn test_into_coordinator_adds_context() {
        let mut loaded = TopologyFile::sample().build().unwrap();
        loaded.required.push(NodeId(99));
        let err = loaded.into_coordinator(NodeTable::new()).unwrap_err();
        assert!(matches!(err, CamGraphError::WithContext { .. }));
        assert!(err.to_string().starts_with("Failed to create coordinator"));
    }

    #[test]
    fn test_topology_path_extension() {
        assert_eq!(topology_path("tegra"), PathBuf::from("tegra.toml"));
        assert_eq!(topology_path("tegra.conf"), PathBuf::from("tegra.conf"));
    }
}
