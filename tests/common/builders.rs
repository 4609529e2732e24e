//! Test data builders for topologies and coordinators

use camgraph::pipeline::{
    Coordinator, DeviceRef, DeviceVisibility, NodeId, NodeTable, PipelineConfig, RawEndpoint,
    StaticSubdevice, Topology,
};

/// Builder for a topology plus the devices that register against it
pub struct GraphBuilder {
    topology: Topology,
    devices: Vec<(String, StaticSubdevice)>,
    sink: String,
    sink_name: String,
    channel: (u32, u32),
}

impl GraphBuilder {
    /// Start with the sink node `sink` already declared
    pub fn new(sink: &str) -> Self {
        let mut topology = Topology::new();
        topology.add_node(sink).unwrap();
        Self {
            topology,
            devices: Vec::new(),
            sink: sink.to_string(),
            sink_name: format!("{}-output-0", sink),
            channel: (0, 1),
        }
    }

    pub fn node(mut self, name: &str) -> Self {
        self.topology.add_node(name).unwrap();
        self
    }

    /// Declare a connection from both ends
    pub fn connect(mut self, a: &str, a_port: u32, b: &str, b_port: u32) -> Self {
        let a = self.id(a);
        let b = self.id(b);
        self.topology.connect(a, a_port, b, b_port).unwrap();
        self
    }

    /// Declare one end only
    pub fn endpoint(mut self, node: &str, port: u32, remote: &str, remote_port: u32) -> Self {
        let id = self.id(node);
        self.topology
            .add_endpoint(id, RawEndpoint::new(port, remote, remote_port))
            .unwrap();
        self
    }

    pub fn raw_endpoint(mut self, node: &str, endpoint: RawEndpoint) -> Self {
        let id = self.id(node);
        self.topology.add_endpoint(id, endpoint).unwrap();
        self
    }

    pub fn device(mut self, node: &str, device: StaticSubdevice) -> Self {
        self.devices.push((node.to_string(), device));
        self
    }

    pub fn channel(mut self, port: u32, channels: u32) -> Self {
        self.channel = (port, channels);
        self
    }

    pub fn build(self) -> Fixture {
        let sink = self.id(&self.sink);
        let config = PipelineConfig::new(sink, self.sink_name.as_str())
            .with_channel(self.channel.0, self.channel.1);
        let devices = self
            .devices
            .into_iter()
            .map(|(name, device)| {
                let node = self.topology.find(&name).unwrap();
                (node, name, device)
            })
            .collect();
        Fixture {
            topology: self.topology,
            config,
            devices,
        }
    }

    fn id(&self, name: &str) -> NodeId {
        self.topology
            .find(name)
            .unwrap_or_else(|| panic!("unknown node '{}'", name))
    }
}

/// A built topology with its devices
pub struct Fixture {
    pub topology: Topology,
    pub config: PipelineConfig,
    pub devices: Vec<(NodeId, String, StaticSubdevice)>,
}

impl Fixture {
    pub fn node(&self, name: &str) -> NodeId {
        self.topology.find(name).unwrap()
    }

    pub fn device(&self, name: &str) -> DeviceRef {
        self.devices
            .iter()
            .find(|(_, n, _)| n == name)
            .map(|(_, _, d)| d.clone().into_ref())
            .unwrap_or_else(|| panic!("no device for '{}'", name))
    }

    pub fn names(&self) -> Vec<String> {
        self.devices.iter().map(|(_, n, _)| n.clone()).collect()
    }

    /// Every node with a device is required
    pub fn required(&self) -> Vec<NodeId> {
        self.devices.iter().map(|(node, _, _)| *node).collect()
    }

    pub fn coordinator(&self) -> Coordinator<Topology, NodeTable> {
        self.coordinator_with(NodeTable::new())
    }

    pub fn coordinator_with<V: DeviceVisibility>(&self, visibility: V) -> Coordinator<Topology, V> {
        Coordinator::new(
            self.topology.clone(),
            visibility,
            self.config.clone(),
            self.required(),
        )
        .unwrap()
    }

    /// Register `names` in order, returning whether the last one completed
    /// the pipeline.
    pub fn register_all<V: DeviceVisibility>(
        &self,
        coordinator: &mut Coordinator<Topology, V>,
        names: &[&str],
    ) -> bool {
        let mut completed = false;
        for name in names {
            completed = coordinator
                .register(self.node(name), self.device(name))
                .unwrap()
                .completed;
        }
        completed
    }
}

/// Builder for the usual chain: ov428 -> nvcsi -> vi
pub fn tegra_builder() -> GraphBuilder {
    GraphBuilder::new("vi")
        .node("nvcsi")
        .node("ov428")
        .connect("ov428", 0, "nvcsi", 0)
        .connect("nvcsi", 1, "vi", 0)
        .device("vi", StaticSubdevice::capture("vi"))
        .device("nvcsi", StaticSubdevice::passthrough("nvcsi"))
        .device("ov428", StaticSubdevice::sensor("ov428"))
}

pub fn tegra() -> Fixture {
    tegra_builder().build()
}

/// Two sensors behind one CSI receiver with two sink ports, plus an ISP
/// between the receiver and the capture node.
pub fn dual_sensor() -> Fixture {
    use camgraph::pipeline::PadDirection::{Sink, Source};
    GraphBuilder::new("vi")
        .node("isp")
        .node("nvcsi")
        .node("ov428")
        .node("imx219")
        .connect("ov428", 0, "nvcsi", 0)
        .connect("imx219", 0, "nvcsi", 1)
        .connect("nvcsi", 2, "isp", 0)
        .connect("isp", 1, "vi", 0)
        .device("vi", StaticSubdevice::capture("vi"))
        .device("isp", StaticSubdevice::passthrough("isp"))
        .device(
            "nvcsi",
            StaticSubdevice::from_directions("nvcsi", &[Sink, Sink, Source]),
        )
        .device("ov428", StaticSubdevice::sensor("ov428"))
        .device("imx219", StaticSubdevice::sensor("imx219"))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tegra_fixture() {
        let fixture = tegra();
        assert_eq!(fixture.topology.len(), 3);
        assert_eq!(fixture.required().len(), 3);
        assert_eq!(fixture.config.sink, fixture.node("vi"));
    }
}
