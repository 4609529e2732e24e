//! Mock construction helpers

use camgraph::pipeline::{
    DeviceNumber, DeviceVisibility, GraphEvent, NodeTable, VisibilityError, VisibleNode,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::HashSet;

/// One call made to the visibility subsystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityCall {
    Register(String),
    Unregister(DeviceNumber),
}

/// `NodeTable` wrapper that records every call and can refuse names
#[derive(Debug, Default)]
pub struct RecordingVisibility {
    pub table: NodeTable,
    pub calls: Vec<VisibilityCall>,
    refuse: HashSet<String>,
}

impl RecordingVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every registration of `name` until `allow` is called
    pub fn refuse(mut self, name: &str) -> Self {
        self.refuse.insert(name.to_string());
        self
    }

    pub fn allow(&mut self, name: &str) {
        self.refuse.remove(name);
    }

    pub fn registered_names(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                VisibilityCall::Register(name) => Some(name.clone()),
                VisibilityCall::Unregister(_) => None,
            })
            .collect()
    }
}

impl DeviceVisibility for RecordingVisibility {
    fn register_node(&mut self, node: &VisibleNode) -> Result<DeviceNumber, VisibilityError> {
        self.calls.push(VisibilityCall::Register(node.name.clone()));
        if self.refuse.contains(&node.name) {
            return Err(VisibilityError::Rejected {
                name: node.name.clone(),
                reason: "refused by test".to_string(),
            });
        }
        self.table.register_node(node)
    }

    fn unregister_node(&mut self, number: DeviceNumber) -> Result<(), VisibilityError> {
        self.calls.push(VisibilityCall::Unregister(number));
        self.table.unregister_node(number)
    }
}

/// Create an event channel for a coordinator
pub fn event_channel() -> (Sender<GraphEvent>, Receiver<GraphEvent>) {
    unbounded()
}
