//! The pipeline aggregate: sink node, links and status.
//!
//! Links are stored by value and name their endpoints with `PadRef`s, so the
//! graph has no owning cycles. After a successful build the pipeline records
//! the chain of entities feeding the sink, found by walking links backwards
//! from the sink pad.

use crate::pipeline::id::{LinkId, NodeId, PadRef};
use crate::pipeline::pad::PadDescriptor;
use crate::pipeline::registry::EntityRegistry;
use crate::pipeline::visibility::DeviceNumber;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Longest sink name accepted (the capture node name field is 32 bytes,
/// NUL included).
pub const MAX_SINK_NAME_LEN: usize = 31;

/// Overall build status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Empty,
    Building,
    Complete,
    Failed,
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStatus::Empty => write!(f, "Empty"),
            PipelineStatus::Building => write!(f, "Building"),
            PipelineStatus::Complete => write!(f, "Complete"),
            PipelineStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Static description of the pipeline being assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Topology node owning the pipeline; its endpoint on `channel_port`
    /// names the entity feeding the capture node.
    pub sink: NodeId,
    /// Name of the capture node.
    pub sink_name: String,
    /// Port on the sink node carrying this pipeline's channel.
    pub channel_port: u32,
    /// Number of channels the owner provides.
    pub channels: u32,
}

impl PipelineConfig {
    pub fn new(sink: NodeId, sink_name: impl Into<String>) -> Self {
        Self {
            sink,
            sink_name: sink_name.into(),
            channel_port: 0,
            channels: 1,
        }
    }

    pub fn with_channel(mut self, channel_port: u32, channels: u32) -> Self {
        self.channel_port = channel_port;
        self.channels = channels;
        self
    }
}

/// A directed pad-to-pad connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Link {
    pub id: LinkId,
    pub source: PadRef,
    pub sink: PadRef,
}

/// The externally visible capture node terminating the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkNode {
    pub name: String,
    pub owner: NodeId,
    pub pad: PadDescriptor,
    /// Set while the node is registered with the visibility subsystem.
    pub number: Option<DeviceNumber>,
}

#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    status: PipelineStatus,
    sink: Option<SinkNode>,
    links: Vec<Link>,
    /// Subdevice nodes made visible, in registration order.
    subdev_nodes: Vec<(NodeId, DeviceNumber)>,
    /// Entities feeding the sink, nearest first.
    chain: Vec<NodeId>,
    /// Number of successful publications of this pipeline.
    generation: u64,
    published_at: Option<DateTime<Utc>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            status: PipelineStatus::Empty,
            sink: None,
            links: Vec::new(),
            subdev_nodes: Vec::new(),
            chain: Vec::new(),
            generation: 0,
            published_at: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: PipelineStatus) {
        tracing::trace!("Pipeline status {} -> {}", self.status, status);
        self.status = status;
    }

    // ── Sink node ──

    pub fn sink(&self) -> Option<&SinkNode> {
        self.sink.as_ref()
    }

    pub(crate) fn sink_mut(&mut self) -> Option<&mut SinkNode> {
        self.sink.as_mut()
    }

    /// The sink's single, fixed input pad.
    pub fn sink_pad(&self) -> PadRef {
        PadRef::new(self.config.sink, 0)
    }

    /// Allocate the capture node. Returns `Ok(false)` if one already exists.
    pub(crate) fn allocate_sink(&mut self) -> Result<bool, String> {
        if self.sink.is_some() {
            return Ok(false);
        }
        let name = self.config.sink_name.trim();
        if name.is_empty() {
            return Err("capture node name is empty".to_string());
        }
        if name.len() > MAX_SINK_NAME_LEN {
            return Err(format!(
                "capture node name '{}' exceeds {} bytes",
                name, MAX_SINK_NAME_LEN
            ));
        }
        self.sink = Some(SinkNode {
            name: name.to_string(),
            owner: self.config.sink,
            pad: PadDescriptor::sink(0),
            number: None,
        });
        Ok(true)
    }

    pub(crate) fn release_sink(&mut self) -> Option<SinkNode> {
        self.sink.take()
    }

    // ── Links ──

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub(crate) fn add_link(&mut self, source: PadRef, sink: PadRef) -> LinkId {
        let id = LinkId(self.links.len() as u32);
        self.links.push(Link { id, source, sink });
        id
    }

    pub(crate) fn clear_links(&mut self) {
        self.links.clear();
        self.chain.clear();
    }

    /// Link endpoints as `(source, sink)` pairs, sorted. Independent of the
    /// order links were created in.
    pub fn link_set(&self) -> Vec<(PadRef, PadRef)> {
        let mut set: Vec<_> = self.links.iter().map(|l| (l.source, l.sink)).collect();
        set.sort();
        set
    }

    // ── Subdevice nodes ──

    pub fn subdev_nodes(&self) -> &[(NodeId, DeviceNumber)] {
        &self.subdev_nodes
    }

    pub(crate) fn push_subdev_node(&mut self, node: NodeId, number: DeviceNumber) {
        self.subdev_nodes.push((node, number));
    }

    pub(crate) fn pop_subdev_node(&mut self) -> Option<(NodeId, DeviceNumber)> {
        self.subdev_nodes.pop()
    }

    // ── Chain ──

    /// Entities feeding the sink, nearest first.
    pub fn chain(&self) -> &[NodeId] {
        &self.chain
    }

    /// Walk links backwards from the sink pad. At each hop the link arriving
    /// at the current node's lowest-numbered pad is followed, so the result
    /// does not depend on link creation order. A node already visited ends
    /// the walk.
    pub(crate) fn compute_chain(&mut self) {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let sink_pad = self.sink_pad();

        let mut current = self
            .links
            .iter()
            .find(|l| l.sink == sink_pad)
            .map(|l| l.source.node);

        while let Some(node) = current {
            if !visited.insert(node) {
                tracing::warn!("Loop detected at {} while walking pipeline chain", node);
                break;
            }
            chain.push(node);
            current = self
                .links
                .iter()
                .filter(|l| l.sink.node == node && l.sink != sink_pad)
                .min_by_key(|l| (l.sink.pad, l.source))
                .map(|l| l.source.node);
        }

        self.chain = chain;
    }

    // ── Lifecycle bookkeeping ──

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub(crate) fn mark_published(&mut self) {
        self.generation += 1;
        self.published_at = Some(Utc::now());
    }

    /// Serializable view of the pipeline, with entity names resolved.
    pub fn snapshot(&self, registry: &EntityRegistry) -> PipelineSnapshot {
        let name_of = |node: NodeId| -> String {
            if node == self.config.sink {
                if let Some(sink) = &self.sink {
                    return sink.name.clone();
                }
            }
            registry
                .find(node)
                .map(|e| e.name.clone())
                .unwrap_or_else(|_| node.to_string())
        };

        PipelineSnapshot {
            status: self.status,
            generation: self.generation,
            published_at: self.published_at,
            sink: self.sink.as_ref().map(|s| SinkSnapshot {
                name: s.name.clone(),
                device: s.number.map(|n| n.to_string()),
            }),
            chain: self.chain.iter().map(|&n| name_of(n)).collect(),
            links: self
                .links
                .iter()
                .map(|l| LinkSnapshot {
                    source: name_of(l.source.node),
                    source_pad: l.source.pad,
                    sink: name_of(l.sink.node),
                    sink_pad: l.sink.pad,
                })
                .collect(),
            subdevs: self
                .subdev_nodes
                .iter()
                .map(|&(node, number)| SubdevSnapshot {
                    entity: name_of(node),
                    device: number.to_string(),
                })
                .collect(),
        }
    }
}

/// Serializable pipeline summary.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSnapshot {
    pub status: PipelineStatus,
    pub generation: u64,
    pub published_at: Option<DateTime<Utc>>,
    pub sink: Option<SinkSnapshot>,
    pub chain: Vec<String>,
    pub links: Vec<LinkSnapshot>,
    pub subdevs: Vec<SubdevSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SinkSnapshot {
    pub name: String,
    pub device: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkSnapshot {
    pub source: String,
    pub source_pad: u16,
    pub sink: String,
    pub sink_pad: u16,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubdevSnapshot {
    pub entity: String,
    pub device: String,
}

impl PipelineSnapshot {
    /// Pretty-printed JSON rendering.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for PipelineSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "status: {} (generation {})", self.status, self.generation)?;
        if let Some(sink) = &self.sink {
            writeln!(
                f,
                "sink:   {} [{}]",
                sink.name,
                sink.device.as_deref().unwrap_or("not visible")
            )?;
        }
        if !self.chain.is_empty() {
            writeln!(f, "chain:  {}", self.chain.join(" <- "))?;
        }
        for link in &self.links {
            writeln!(
                f,
                "link:   {}:{} -> {}:{}",
                link.source, link.source_pad, link.sink, link.sink_pad
            )?;
        }
        for subdev in &self.subdevs {
            writeln!(f, "subdev: {} [{}]", subdev.entity, subdev.device)?;
        }
        Ok(())
    }
}
