//! Device seam for graph entities.
//!
//! Drivers hand the registry a `DeviceRef` when they bind. The core only asks
//! the device for its name and its fixed pad list; it never touches driver
//! state (register banks, controls, streaming).

use crate::pipeline::pad::{PadDescriptor, PadDirection};
use std::fmt;
use std::sync::Arc;

/// Interface every bound subdevice exposes to the graph core.
pub trait Subdevice: Send + Sync + fmt::Debug {
    /// Entity name used in logs and device node names.
    fn name(&self) -> &str;

    /// Fixed, ordered pad list.
    fn pads(&self) -> &[PadDescriptor];

    /// Whether the device exposes a connection surface in the topology.
    /// Devices without one are listed as peers but never originate links.
    fn has_topology(&self) -> bool {
        true
    }
}

/// Shared handle to a bound device.
pub type DeviceRef = Arc<dyn Subdevice>;

/// A subdevice with a fixed pad list and no driver state.
#[derive(Debug, Clone)]
pub struct StaticSubdevice {
    name: String,
    pads: Vec<PadDescriptor>,
    has_topology: bool,
}

impl StaticSubdevice {
    pub fn new(name: impl Into<String>, pads: Vec<PadDescriptor>) -> Self {
        Self {
            name: name.into(),
            pads,
            has_topology: true,
        }
    }

    /// Image sensor: a single source pad.
    pub fn sensor(name: impl Into<String>) -> Self {
        Self::new(name, vec![PadDescriptor::source(0)])
    }

    /// Passthrough block (CSI receiver, ISP): sink pad 0, source pad 1.
    pub fn passthrough(name: impl Into<String>) -> Self {
        Self::new(
            name,
            vec![PadDescriptor::sink(0), PadDescriptor::source(1)],
        )
    }

    /// Capture engine owning the pipeline: a single sink pad.
    pub fn capture(name: impl Into<String>) -> Self {
        Self::new(name, vec![PadDescriptor::sink(0)])
    }

    pub fn from_directions(name: impl Into<String>, directions: &[PadDirection]) -> Self {
        Self::new(name, crate::pipeline::pad::pads_from_directions(directions))
    }

    pub fn without_topology(mut self) -> Self {
        self.has_topology = false;
        self
    }

    pub fn into_ref(self) -> DeviceRef {
        Arc::new(self)
    }
}

impl Subdevice for StaticSubdevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn pads(&self) -> &[PadDescriptor] {
        &self.pads
    }

    fn has_topology(&self) -> bool {
        self.has_topology
    }
}
