//! Graph-specific error types.

use crate::pipeline::graph::PipelineStatus;
use crate::pipeline::id::NodeId;
use crate::pipeline::pad::PadDirection;
use crate::pipeline::tracker::TrackerState;
use crate::pipeline::visibility::VisibilityError;
use thiserror::Error;

/// Errors raised while registering entities or building the pipeline.
///
/// Skippable problems (a malformed endpoint, an entity without a connection
/// surface) are logged and never reach this type.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Entity {node} is already bound")]
    AlreadyBound { node: NodeId },

    #[error("No entity registered for {node}")]
    NotFound { node: NodeId },

    #[error("No entity found for {remote} (declared by {local})")]
    UnresolvedRemote { local: NodeId, remote: NodeId },

    #[error("Entity {node} is not bound")]
    EntityNotBound { node: NodeId },

    #[error("Invalid port number {port} on {node} ({pad_count} pads)")]
    PortOutOfRange {
        node: NodeId,
        port: u32,
        pad_count: usize,
    },

    #[error("Pad {node}:{pad} is a {found} pad, expected {expected}")]
    PadDirectionMismatch {
        node: NodeId,
        pad: u32,
        expected: PadDirection,
        found: PadDirection,
    },

    #[error("Topology node {node} is missing")]
    MissingTopologyNode { node: NodeId },

    #[error("Wrong channel number {port} ({channels} channels)")]
    InvalidChannel { port: u32, channels: u32 },

    #[error("No channel endpoint on sink {node}")]
    MissingSinkEndpoint { node: NodeId },

    #[error("Sink node allocation failed: {0}")]
    SinkAllocation(String),

    #[error("Visibility error: {0}")]
    Visibility(#[from] VisibilityError),

    #[error("Cannot {operation} while pipeline is {status}")]
    Busy {
        operation: &'static str,
        status: PipelineStatus,
    },

    #[error("Completion tracker is {state}, cannot {operation}")]
    InvalidTrackerState {
        operation: &'static str,
        state: TrackerState,
    },
}

impl GraphError {
    /// Whether this error aborts a pipeline build (and triggers rollback).
    pub fn is_build_fatal(&self) -> bool {
        !matches!(
            self,
            GraphError::AlreadyBound { .. }
                | GraphError::NotFound { .. }
                | GraphError::Busy { .. }
                | GraphError::InvalidTrackerState { .. }
        )
    }
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_error_display() {
        let err = GraphError::PortOutOfRange {
            node: NodeId(2),
            port: 1,
            pad_count: 1,
        };
        assert_eq!(err.to_string(), "Invalid port number 1 on NodeId(2) (1 pads)");
        assert!(err.is_build_fatal());
    }

    #[test]
    fn test_protocol_errors_are_not_build_fatal() {
        assert!(!GraphError::AlreadyBound { node: NodeId(0) }.is_build_fatal());
        assert!(!GraphError::NotFound { node: NodeId(0) }.is_build_fatal());
        assert!(GraphError::MissingSinkEndpoint { node: NodeId(0) }.is_build_fatal());
        let busy = GraphError::Busy {
            operation: "tear down",
            status: PipelineStatus::Building,
        };
        assert!(!busy.is_build_fatal());
        assert!(busy.to_string().contains("Building"));
    }
}
